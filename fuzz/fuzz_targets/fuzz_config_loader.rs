#![no_main]

use libfuzzer_sys::fuzz_target;
use mcpconform_core::config::HarnessConfig;

fuzz_target!(|data: &[u8]| {
    // A `--config` file is attacker-adjacent in the same sense as wire
    // traffic: fed by whoever controls the CI job or repo checkout that
    // invokes the harness. Parsing an arbitrary byte string as YAML must
    // never panic, whatever it deserializes to.
    if let Ok(text) = std::str::from_utf8(data) {
        let _: Result<HarnessConfig, _> = serde_yaml::from_str(text);
    }
});
