#![no_main]

use libfuzzer_sys::fuzz_target;
use modeguard::companion::MemoryCompanionResolver;
use modeguard::config::ValidatorConfig;
use modeguard::pipeline::Pipeline;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let Ok(pipeline) = Pipeline::builtin(&ValidatorConfig::default()) else {
        return;
    };
    let companions = MemoryCompanionResolver::new();

    // Fatal errors are fine; panics are not. A completed run must be stable.
    let Ok(first) = pipeline.run(&s, &companions) else {
        return;
    };
    let second = pipeline
        .run(&s, &companions)
        .expect("second run of accepted input failed");
    if first != second {
        panic!(
            "Non-deterministic report.\nInput (lossy): {:?}",
            s.get(..200).unwrap_or(&s),
        );
    }
    if first.passed() != first.errors.is_empty() {
        panic!("outcome disagrees with error list: {:?}", first);
    }
});
