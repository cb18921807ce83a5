// cargo fuzz run decode corpus/decode -- -timeout=30

#![no_main]

use libfuzzer_sys::fuzz_target;

use gifkit::Decoder;

fuzz_target!(|data: &[u8]| {
    let _ = Decoder::new(data).max_image_sz(Some(1 << 20)).decode();
});
