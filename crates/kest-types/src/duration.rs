//! Go-like duration strings.
//!
//! Timeouts and intervals are written the way `kubectl` users write them:
//! `"200ms"`, `"5s"`, `"1h30m"`. The grammar is a concatenation of
//! `<digits>[.<digits>]<unit>` segments with unit one of `ms`, `s`, `m`,
//! `h`, plus the special zero `"0"`. Whitespace, signs and any other unit
//! (`ns`, `us`, `d`, ...) are rejected. Values are millisecond-precise;
//! sub-millisecond fractions truncate toward zero.
//!
//! Rendering is the canonical compound form with zero components omitted:
//! `90061ms` renders as `"1m30.061s"` and `60000ms` as `"1m"`. For every
//! valid duration `d`, `parse_duration(&format_duration(d)) == d`.

use std::time::Duration;

use thiserror::Error;

/// A duration string that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {0:?}")]
pub struct InvalidDuration(pub String);

const MS_PER_SECOND: u128 = 1_000;
const MS_PER_MINUTE: u128 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u128 = 60 * MS_PER_MINUTE;

fn unit_millis(unit: &str) -> Option<u128> {
    match unit {
        "ms" => Some(1),
        "s" => Some(MS_PER_SECOND),
        "m" => Some(MS_PER_MINUTE),
        "h" => Some(MS_PER_HOUR),
        _ => None,
    }
}

/// Parses a Go-like duration string into a [`Duration`].
pub fn parse_duration(input: &str) -> Result<Duration, InvalidDuration> {
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err(InvalidDuration(input.to_string()));
    }

    let err = || InvalidDuration(input.to_string());
    let mut rest = input;
    let mut total_ms: u128 = 0;

    while !rest.is_empty() {
        // Integer part.
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if int_len == 0 {
            return Err(err());
        }
        let whole: u128 = rest[..int_len].parse().map_err(|_| err())?;
        rest = &rest[int_len..];

        // Optional fractional part.
        let mut frac: u128 = 0;
        let mut frac_scale: u128 = 1;
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            if frac_len == 0 {
                return Err(err());
            }
            // Twelve digits is already far below millisecond precision for
            // every unit; extra digits only truncate further.
            for b in after_dot[..frac_len.min(12)].bytes() {
                frac = frac * 10 + u128::from(b - b'0');
                frac_scale *= 10;
            }
            rest = &after_dot[frac_len..];
        }

        // Unit: longest match first so "ms" is not read as "m".
        let unit_len = if rest.starts_with("ms") {
            2
        } else if rest.starts_with('s') || rest.starts_with('m') || rest.starts_with('h') {
            1
        } else {
            return Err(err());
        };
        let unit = unit_millis(&rest[..unit_len]).ok_or_else(err)?;
        rest = &rest[unit_len..];

        total_ms = total_ms
            .checked_add(whole.checked_mul(unit).ok_or_else(err)?)
            .ok_or_else(err)?;
        total_ms = total_ms
            .checked_add(frac.checked_mul(unit).ok_or_else(err)? / frac_scale)
            .ok_or_else(err)?;
    }

    let ms = u64::try_from(total_ms).map_err(|_| err())?;
    Ok(Duration::from_millis(ms))
}

/// Renders a duration in the canonical compound form.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms == 0 {
        return "0s".to_string();
    }
    if ms < MS_PER_SECOND {
        return format!("{ms}ms");
    }

    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if millis > 0 {
        let frac = format!("{millis:03}");
        out.push_str(&format!("{seconds}.{}s", frac.trim_end_matches('0')));
    } else if seconds > 0 {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("0", 0)]
    #[test_case("200ms", 200)]
    #[test_case("5s", 5_000)]
    #[test_case("1m", 60_000)]
    #[test_case("1h30m", 5_400_000)]
    #[test_case("1m30.061s", 90_061)]
    #[test_case("1.5s", 1_500)]
    #[test_case("0.5h", 1_800_000)]
    #[test_case("2h3m4s5ms", 7_384_005)]
    fn parses_valid_strings(input: &str, expected_ms: u64) {
        assert_eq!(
            parse_duration(input).unwrap(),
            Duration::from_millis(expected_ms)
        );
    }

    #[test_case(""; "empty")]
    #[test_case(" 5s"; "leading whitespace")]
    #[test_case("5s "; "trailing whitespace")]
    #[test_case("+5s"; "sign prefix")]
    #[test_case("-5s"; "negative")]
    #[test_case("5"; "missing unit")]
    #[test_case("5ns"; "nanoseconds rejected")]
    #[test_case("5us"; "microseconds rejected")]
    #[test_case("1day"; "unknown unit")]
    #[test_case("1.s"; "dot without fraction")]
    #[test_case(".5s"; "fraction without integer")]
    #[test_case("1m 30s"; "inner whitespace")]
    fn rejects_invalid_strings(input: &str) {
        assert_eq!(
            parse_duration(input),
            Err(InvalidDuration(input.to_string()))
        );
    }

    #[test]
    fn sub_millisecond_fractions_truncate_toward_zero() {
        assert_eq!(parse_duration("0.0005s").unwrap(), Duration::ZERO);
        assert_eq!(
            parse_duration("0.0015s").unwrap(),
            Duration::from_millis(1)
        );
    }

    #[test_case(0, "0s")]
    #[test_case(200, "200ms")]
    #[test_case(999, "999ms")]
    #[test_case(1_000, "1s")]
    #[test_case(60_000, "1m")]
    #[test_case(90_061, "1m30.061s")]
    #[test_case(3_600_000, "1h")]
    #[test_case(3_600_500, "1h0.5s")]
    #[test_case(5_400_000, "1h30m")]
    fn renders_the_compound_form(ms: u64, expected: &str) {
        assert_eq!(format_duration(Duration::from_millis(ms)), expected);
    }

    proptest! {
        #[test]
        fn format_then_parse_round_trips(ms in 0u64..=48 * 3_600_000) {
            let duration = Duration::from_millis(ms);
            let rendered = format_duration(duration);
            prop_assert_eq!(parse_duration(&rendered).unwrap(), duration);
        }
    }
}
