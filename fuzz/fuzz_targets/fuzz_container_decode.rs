#![no_main]
use fuzzyof_core::MetricContainer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mc) = MetricContainer::decode(data) else {
        return;
    };
    // Whatever decodes must encode, and decode again to the same value.
    let bytes = mc.to_bytes().expect("decoded container encodes");
    assert_eq!(MetricContainer::decode(&bytes), Ok(mc));
});
