#![no_main]

use arbitrary::Arbitrary;
use bioguard_core::ResetChallenge;
use chrono::{Duration, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    code: String,
    guess: String,
    ttl_secs: u16,
    elapsed_secs: u16,
}

fuzz_target!(|input: Input| {
    let now = Utc.timestamp_opt(1_800_000_000, 0).unwrap();
    let challenge = ResetChallenge::issue(
        &input.code,
        Duration::seconds(i64::from(input.ttl_secs)),
        now,
    );
    let at = now + Duration::seconds(i64::from(input.elapsed_secs));

    if challenge.accepts(&input.guess, at) {
        assert_eq!(input.guess.trim(), input.code);
        assert!(input.elapsed_secs < input.ttl_secs);
    }

    let mut used = challenge.clone();
    used.consume();
    assert!(!used.accepts(&input.code, now));
});
