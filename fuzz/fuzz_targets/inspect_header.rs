#![no_main]

use libfuzzer_sys::fuzz_target;
use rowgray::inspect_header_from_bytes;

fuzz_target!(|data: &[u8]| {
    let _ = inspect_header_from_bytes(data);
});
