#![no_main]

use libfuzzer_sys::fuzz_target;
use pdm_core::testing::demo_factory;
use pdm_core::{ObjectGraph, document_from_str, document_to_string};

fuzz_target!(|data: &[u8]| {
    // Arbitrary documents must be rejected with an error, never a panic.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut graph = ObjectGraph::new(demo_factory());
    let Ok(root) = document_from_str(&mut graph, text) else {
        return;
    };

    // Whatever was accepted must save and load again.
    let saved = document_to_string(&mut graph, root).expect("accepted document must save");
    let mut again = ObjectGraph::new(demo_factory());
    document_from_str(&mut again, &saved).expect("saved document must load");
});
