#![no_main]

use libfuzzer_sys::fuzz_target;
use std::time::Duration;

use pagewash::extractor::{ExtractionPipeline, SanitizePolicy};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);

    for policy in [SanitizePolicy::full(), SanitizePolicy::lean()] {
        let pipeline = ExtractionPipeline::new("http://localhost:5000", policy, Duration::ZERO);
        let _ = pipeline.transform(&html, "https://news.example");
    }
});
