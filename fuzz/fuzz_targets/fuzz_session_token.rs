#![no_main]

use bioguard_core::{GuardError, SessionConfig, SessionTokenIssuer};
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

const SECRET: &[u8] = b"bioguard-fuzz-session-secret-0123456789";

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(issuer) = SessionTokenIssuer::new(SECRET, SessionConfig::default()) else {
        return;
    };
    let now = Utc.timestamp_opt(1_800_000_000, 0).unwrap();

    // Arbitrary input must be rejected cleanly, never accepted
    match issuer.verify(token, now) {
        Ok(_) => panic!("forged token accepted"),
        Err(GuardError::InvalidToken) | Err(GuardError::ExpiredToken) => {}
        Err(other) => panic!("unexpected error kind: {other:?}"),
    }
});
