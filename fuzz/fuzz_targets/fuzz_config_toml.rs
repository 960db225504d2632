//! Fuzz target for pipeline config parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mhs_core::config::PipelineConfig;

fuzz_target!(|data: &str| {
    if let Ok(config) = toml::from_str::<PipelineConfig>(data) {
        let _ = config.validate();
    }
});
