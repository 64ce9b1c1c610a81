#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(instrs) = stencil::bytecode::decode(data) {
        let bytes = stencil::bytecode::encode(&instrs).unwrap();
        assert_eq!(stencil::bytecode::decode(&bytes).unwrap(), instrs);
    }
});
