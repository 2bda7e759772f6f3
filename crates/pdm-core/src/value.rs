#![forbid(unsafe_code)]

//! Typed field values and their portable text tokens.
//!
//! Every [`FieldValue`] renders to a single text token and parses back from
//! it. The token form is shared by persistence and by undo snapshots, so the
//! writer must be deterministic:
//!
//! | kind         | token                                   |
//! |--------------|-----------------------------------------|
//! | `Bool`       | `True` / `False`                        |
//! | `Int`        | decimal                                 |
//! | `Double`     | shortest form that parses back exactly  |
//! | `Text`       | the text itself                         |
//! | `Enum`       | the item text                           |
//! | `IntList`    | space separated decimals                |
//! | `DoubleList` | space separated doubles                 |
//! | `TextList`   | space separated `"quoted"` items        |
//!
//! # Tolerance
//!
//! [`parse_token`] never fails hard. A scalar that cannot be read yields no
//! value (the caller keeps what it had); list readers drop unreadable items
//! and report how many were skipped.

use std::fmt;

/// Shape of a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    Text,
    Enum,
    IntList,
    DoubleList,
    TextList,
}

impl ValueKind {
    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::Text => "text",
            Self::Enum => "enum",
            Self::IntList => "int list",
            Self::DoubleList => "double list",
            Self::TextList => "text list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value stored in a value field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    /// Enum values are stored by item text; see [`crate::EnumDef`].
    Enum(String),
    IntList(Vec<i64>),
    DoubleList(Vec<f64>),
    TextList(Vec<String>),
}

impl FieldValue {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Text(_) => ValueKind::Text,
            Self::Enum(_) => ValueKind::Enum,
            Self::IntList(_) => ValueKind::IntList,
            Self::DoubleList(_) => ValueKind::DoubleList,
            Self::TextList(_) => ValueKind::TextList,
        }
    }

    /// Render the value as its portable token.
    #[must_use]
    pub fn to_token(&self) -> String {
        match self {
            Self::Bool(b) => String::from(if *b { "True" } else { "False" }),
            Self::Int(i) => i.to_string(),
            Self::Double(d) => d.to_string(),
            Self::Text(s) | Self::Enum(s) => s.clone(),
            Self::IntList(items) => join(items.iter().map(i64::to_string)),
            Self::DoubleList(items) => join(items.iter().map(f64::to_string)),
            Self::TextList(items) => join(items.iter().map(|s| quote(s))),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Text of a `Text` or `Enum` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntList(v)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleList(v)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        Self::TextList(v)
    }
}

// ============================================================================
// Token parsing
// ============================================================================

/// Outcome of reading a token for a given [`ValueKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToken {
    /// `None` when nothing usable could be read.
    pub value: Option<FieldValue>,
    /// Number of list items (or scalar tokens) that were dropped.
    pub skipped: usize,
}

impl ParsedToken {
    fn full(value: FieldValue) -> Self {
        Self {
            value: Some(value),
            skipped: 0,
        }
    }

    fn rejected() -> Self {
        Self {
            value: None,
            skipped: 1,
        }
    }

    /// Returns `true` if the whole token was consumed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.value.is_some() && self.skipped == 0
    }
}

/// Read `token` as a value of `kind`.
#[must_use]
pub fn parse_token(kind: ValueKind, token: &str) -> ParsedToken {
    match kind {
        ValueKind::Bool => parse_bool(token.trim())
            .map(|b| ParsedToken::full(FieldValue::Bool(b)))
            .unwrap_or_else(ParsedToken::rejected),
        ValueKind::Int => token
            .trim()
            .parse::<i64>()
            .map(|i| ParsedToken::full(FieldValue::Int(i)))
            .unwrap_or_else(|_| ParsedToken::rejected()),
        ValueKind::Double => token
            .trim()
            .parse::<f64>()
            .map(|d| ParsedToken::full(FieldValue::Double(d)))
            .unwrap_or_else(|_| ParsedToken::rejected()),
        ValueKind::Text => ParsedToken::full(FieldValue::Text(token.to_string())),
        ValueKind::Enum => ParsedToken::full(FieldValue::Enum(token.trim().to_string())),
        ValueKind::IntList => {
            let (items, skipped) = parse_words(token, |w| w.parse::<i64>().ok());
            ParsedToken {
                value: Some(FieldValue::IntList(items)),
                skipped,
            }
        }
        ValueKind::DoubleList => {
            let (items, skipped) = parse_words(token, |w| w.parse::<f64>().ok());
            ParsedToken {
                value: Some(FieldValue::DoubleList(items)),
                skipped,
            }
        }
        ValueKind::TextList => {
            let (items, skipped) = unquote_all(token);
            ParsedToken {
                value: Some(FieldValue::TextList(items)),
                skipped,
            }
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Some(false)
    } else {
        None
    }
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(" ")
}

fn parse_words<T>(token: &str, parse: impl Fn(&str) -> Option<T>) -> (Vec<T>, usize) {
    let mut items = Vec::new();
    let mut skipped = 0;
    for word in token.split_whitespace() {
        match parse(word) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }
    (items, skipped)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Split a text-list token into items.
///
/// Bare words are accepted as single items. An unterminated quote drops the
/// trailing fragment.
fn unquote_all(token: &str) -> (Vec<String>, usize) {
    let mut items = Vec::new();
    let mut skipped = 0;
    let mut chars = token.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        if first != '"' {
            let mut word = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                word.push(c);
            }
            items.push(word);
            continue;
        }

        chars.next();
        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        item.push(escaped);
                    }
                }
                '"' => {
                    closed = true;
                    break;
                }
                other => item.push(other),
            }
        }
        if closed {
            items.push(item);
        } else {
            skipped += 1;
        }
    }

    (items, skipped)
}
