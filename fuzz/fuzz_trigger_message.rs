//! Fuzz target for the navigation trigger wire format.
//!
//! Run with: cargo +nightly fuzz run fuzz_trigger_message
//!
//! Exercises message decoding and the URL scope rule with arbitrary byte
//! sequences: both take untrusted external input.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(issuetoc_trigger::NavigationMessage::MountOutline(details)) =
            issuetoc_trigger::NavigationMessage::from_json(s)
        {
            let _ = issuetoc_trigger::is_issue_url(&details.url);
        }
        let _ = issuetoc_trigger::is_issue_url(s);
    }
});
