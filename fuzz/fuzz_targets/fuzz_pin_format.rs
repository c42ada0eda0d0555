#![no_main]

use bioguard_core::pin::{is_common_pin, validate_pin_format, PIN_LENGTH};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(pin) = std::str::from_utf8(data) else {
        return;
    };

    let valid = validate_pin_format(pin).is_ok();
    let expected = pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit());
    assert_eq!(valid, expected);

    // Denylisted PINs are always well-formed
    if is_common_pin(pin) {
        assert!(valid);
    }
});
