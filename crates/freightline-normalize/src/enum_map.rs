//! Case-insensitive raw-string to closed-enum mapping (§4.1 "Enum
//! normalization").
//!
//! The LLM returns JSON strings for every enum field; `strum`'s
//! `EnumString` (derived `ascii_case_insensitive`, `snake_case`) already
//! does the case-insensitive match these helpers need, so this module is
//! mostly a thin, typed front door plus the "unknown inputs pass through
//! unchanged" rule: a value that fails to parse is reported back to the
//! caller as-is rather than defaulted, so schema validation downstream can
//! reject it visibly instead of silently becoming `unknown`.

use std::str::FromStr;

/// Attempts to map `raw` onto `T` case-insensitively. Returns `Ok(value)`
/// on a match; `Err(raw)` (the original string, trimmed) when nothing in
/// the closed set matches, per "unknown inputs pass through unchanged".
pub fn map_enum<T: FromStr>(raw: &str) -> Result<T, String> {
    let trimmed = raw.trim();
    T::from_str(trimmed).map_err(|_| trimmed.to_string())
}

/// Like [`map_enum`] but collapses the unknown case to `default` instead of
/// surfacing the raw string, for fields where a closed default exists
/// (e.g. `TransportMode::Unknown`).
pub fn map_enum_or<T: FromStr + Copy>(raw: &str, default: T) -> T {
    map_enum(raw).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::enums::{DocumentType, TransportMode};

    #[test]
    fn maps_case_insensitively() {
        assert_eq!(
            map_enum::<DocumentType>("Booking_Confirmation"),
            Ok(DocumentType::BookingConfirmation)
        );
        assert_eq!(
            map_enum::<DocumentType>("BOOKING CONFIRMATION".replace(' ', "_").as_str()),
            Ok(DocumentType::BookingConfirmation)
        );
    }

    #[test]
    fn unknown_value_passes_through() {
        assert_eq!(
            map_enum::<DocumentType>("some_new_thing_the_vendor_invented"),
            Err("some_new_thing_the_vendor_invented".to_string())
        );
    }

    #[test]
    fn defaulting_variant_falls_back() {
        assert_eq!(
            map_enum_or::<TransportMode>("spaceship", TransportMode::Unknown),
            TransportMode::Unknown
        );
    }
}
