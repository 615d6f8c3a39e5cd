#![no_main]

use irkit::{compiler::Optimizer, Program};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(program) = Program::from_json(text) else {
        return;
    };
    let optimizer = Optimizer::default();
    if let Ok(report) = optimizer.optimize_program(&program) {
        let _ = optimizer.allocate(&report.program);
    }
});
