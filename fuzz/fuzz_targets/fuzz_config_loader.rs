#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    let Ok(cfg) = toml::from_str::<fuzzyof_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A config that validates must also convert into engine settings.
        let _ = fuzzyof_core::OfSettings::from(&cfg);
    }
});
