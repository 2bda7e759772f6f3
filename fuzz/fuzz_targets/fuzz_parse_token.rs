#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pdm_core::{ValueKind, parse_token};

#[derive(Debug, Arbitrary)]
enum Kind {
    Bool,
    Int,
    Double,
    Text,
    Enum,
    IntList,
    DoubleList,
    TextList,
}

impl From<Kind> for ValueKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Bool => Self::Bool,
            Kind::Int => Self::Int,
            Kind::Double => Self::Double,
            Kind::Text => Self::Text,
            Kind::Enum => Self::Enum,
            Kind::IntList => Self::IntList,
            Kind::DoubleList => Self::DoubleList,
            Kind::TextList => Self::TextList,
        }
    }
}

fuzz_target!(|input: (Kind, String)| {
    let (kind, token) = input;
    let kind = ValueKind::from(kind);

    // Any token is tolerated; whatever parses must write back to a token
    // that parses to the same value.
    let parsed = parse_token(kind, &token);
    if let Some(value) = parsed.value {
        assert_eq!(value.kind(), kind);
        let again = parse_token(kind, &value.to_token());
        assert!(again.is_clean(), "rewritten token did not parse cleanly: {value:?}");
        if !matches!(kind, ValueKind::Double | ValueKind::DoubleList) {
            assert_eq!(again.value, Some(value));
        }
    }
});
