#![no_main]

use libfuzzer_sys::fuzz_target;
use rvm_core::Path;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(path) = Path::parse(raw) {
        assert!(!path.is_empty());
        let reparsed = Path::parse(&path.to_string()).expect("display output parses");
        assert_eq!(reparsed, path);
    }
});
