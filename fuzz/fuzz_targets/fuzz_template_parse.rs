#![no_main]

use libfuzzer_sys::fuzz_target;
use rvm_template::{Segment, TextTemplate};

fuzz_target!(|source: &str| {
    let Ok(template) = TextTemplate::parse(source) else {
        return;
    };
    // Literal runs never sit next to each other.
    for pair in template.segments().windows(2) {
        assert!(!matches!(pair, [Segment::Literal(_), Segment::Literal(_)]));
    }
});
