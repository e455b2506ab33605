#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject the input but must never panic.
    if let Ok(cfg) = toml::from_str::<scanner_config::Config>(data) {
        let _ = cfg.validate();
    }
});
