#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Whatever parses must serialize back and parse to the same records.
    if let Ok(file) = totalizer_config::TotalsFile::from_toml(data)
        && let Ok(text) = file.to_toml()
    {
        let again = totalizer_config::TotalsFile::from_toml(&text);
        assert!(again.is_ok(), "re-parse failed: {text}");
    }
});
