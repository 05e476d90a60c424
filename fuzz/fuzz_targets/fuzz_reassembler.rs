//! Fuzz target: `Reassembler::feed`
//!
//! Splits the input into transport messages using its first byte as the
//! message size and feeds them in order. The reassembler must never panic,
//! never exceed its cap and never yield a payload longer than declared.
//!
//! cargo fuzz run fuzz_reassembler

#![no_main]

use bleremote::protocol::fragment::Reassembler;
use libfuzzer_sys::fuzz_target;

const CAP: usize = 1024;

fuzz_target!(|data: &[u8]| {
    let Some((&size, rest)) = data.split_first() else {
        return;
    };
    let size = usize::from(size.max(1));

    let mut r = Reassembler::new(CAP);
    for msg in rest.chunks(size) {
        if let Some(done) = r.feed(msg) {
            assert!(done.payload.len() <= CAP, "payload exceeds cap");
        }
    }

    // After a reset the reassembler must accept bytes cleanly again.
    r.reset();
    assert!(r.pending().is_none());
    let _ = r.feed(rest);
});
