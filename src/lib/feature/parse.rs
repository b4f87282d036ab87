//! Conversion of ASCII slot contents into numbers.
//!
//! Slots hold NUL terminated text written by firmware that knows nothing of
//! locales, so the conversion is byte based and always uses the "C" numeric
//! format. Only the first 19 characters of a slot are considered.
//!
//! A slot is rejected when nothing could be converted, or when the
//! conversion ran out of range and produced zero. The second rule cannot
//! tell an underflowing value from a corrupted one; both read as
//! unprogrammed.

use super::FeatureError;

const SCRATCH_SIZE: usize = 20;

struct Conversion<T> {
    value: T,
    consumed: usize,
    range_error: bool,
}

pub fn parse_double(raw: &[u8]) -> Result<f64, FeatureError> {
    let buffer = scratch(raw);
    accept(convert_double(terminated(&buffer)), "double")
}

pub fn parse_long(raw: &[u8]) -> Result<i64, FeatureError> {
    let buffer = scratch(raw);
    accept(convert_long(terminated(&buffer)), "int")
}

fn accept<T: PartialEq + Default>(c: Conversion<T>, what: &str) -> Result<T, FeatureError> {
    if c.consumed == 0 || (c.range_error && c.value == T::default()) {
        return Err(FeatureError::NumberFormat(format!(
            "could not parse {} out of EEPROM slot",
            what
        )));
    }
    Ok(c.value)
}

/// Copies at most 19 bytes up to the first NUL; the last byte stays NUL.
fn scratch(raw: &[u8]) -> [u8; SCRATCH_SIZE] {
    let mut buffer = [0u8; SCRATCH_SIZE];
    buffer[..SCRATCH_SIZE - 1]
        .iter_mut()
        .zip(raw.iter().take_while(|&&b| b != 0))
        .for_each(|(dst, &src)| *dst = src);
    buffer
}

fn terminated(buffer: &[u8]) -> &[u8] {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    &buffer[..end]
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

fn skip_space(s: &[u8]) -> usize {
    s.iter().take_while(|&&b| is_space(b)).count()
}

fn skip_digits(s: &[u8], pos: usize) -> usize {
    pos + s[pos..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Returns the position after an optional sign, and whether it was `-`.
fn sign(s: &[u8], pos: usize) -> (usize, bool) {
    match s.get(pos) {
        Some(b'-') => (pos + 1, true),
        Some(b'+') => (pos + 1, false),
        _ => (pos, false),
    }
}

fn nothing<T: Default>() -> Conversion<T> {
    Conversion {
        value: T::default(),
        consumed: 0,
        range_error: false,
    }
}

fn convert_long(s: &[u8]) -> Conversion<i64> {
    let (start, negative) = sign(s, skip_space(s));
    let end = skip_digits(s, start);

    if end == start {
        return nothing();
    }

    // accumulate towards the sign so i64::MIN stays representable
    let mut value: i64 = 0;
    let mut overflow = false;
    for &b in &s[start..end] {
        let digit = i64::from(b - b'0');
        let next = value.checked_mul(10).and_then(|v| {
            if negative {
                v.checked_sub(digit)
            } else {
                v.checked_add(digit)
            }
        });
        match next {
            Some(v) => value = v,
            None => {
                overflow = true;
                break;
            }
        }
    }

    if overflow {
        value = if negative { i64::MIN } else { i64::MAX };
    }

    Conversion {
        value,
        consumed: end,
        range_error: overflow,
    }
}

fn starts_with_word(s: &[u8], word: &[u8]) -> bool {
    s.get(..word.len())
        .map_or(false, |p| p.eq_ignore_ascii_case(word))
}

fn special_double(s: &[u8]) -> Option<(f64, usize)> {
    if starts_with_word(s, b"infinity") {
        Some((f64::INFINITY, 8))
    } else if starts_with_word(s, b"inf") {
        Some((f64::INFINITY, 3))
    } else if starts_with_word(s, b"nan") {
        Some((f64::NAN, 3))
    } else {
        None
    }
}

fn convert_double(s: &[u8]) -> Conversion<f64> {
    let (start, negative) = sign(s, skip_space(s));
    let apply_sign = |v: f64| if negative { -v } else { v };

    if let Some((value, len)) = special_double(&s[start..]) {
        return Conversion {
            value: apply_sign(value),
            consumed: start + len,
            range_error: false,
        };
    }

    let int_end = skip_digits(s, start);
    let mut end = int_end;
    let mut frac_end = int_end;
    if s.get(int_end) == Some(&b'.') {
        frac_end = skip_digits(s, int_end + 1);
        end = frac_end;
    }

    let mantissa_digits = (int_end - start) + frac_end.saturating_sub(int_end + 1);
    if mantissa_digits == 0 {
        return nothing();
    }

    if matches!(s.get(end), Some(b'e') | Some(b'E')) {
        let (exp_start, _) = sign(s, end + 1);
        let exp_end = skip_digits(s, exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    let lexeme = match std::str::from_utf8(&s[start..end]) {
        Ok(text) => text,
        Err(_) => return nothing(),
    };
    let magnitude: f64 = match lexeme.parse() {
        Ok(v) => v,
        Err(_) => return nothing(),
    };

    let nonzero_mantissa = s[start..frac_end]
        .iter()
        .any(|&b| b.is_ascii_digit() && b != b'0');
    let range_error = magnitude.is_infinite() || (magnitude == 0.0 && nonzero_mantissa);

    Conversion {
        value: apply_sign(magnitude),
        consumed: end,
        range_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_number_format<T: std::fmt::Debug>(res: Result<T, FeatureError>) -> bool {
        matches!(res, Err(FeatureError::NumberFormat(_)))
    }

    #[test]
    fn double_from_terminated_text() {
        assert_eq!(parse_double(b"3.14\0").unwrap(), 3.14);
        assert_eq!(parse_double(b"-2.5e-3\0\0\0").unwrap(), -2.5e-3);
        assert_eq!(parse_double(b"  \t1e2xyz").unwrap(), 100.0);
        assert_eq!(parse_double(b".5").unwrap(), 0.5);
        assert_eq!(parse_double(b"7.").unwrap(), 7.0);
        assert_eq!(parse_double(b"2e").unwrap(), 2.0);
    }

    #[test]
    fn long_from_terminated_text() {
        assert_eq!(parse_long(b"42\0").unwrap(), 42);
        assert_eq!(parse_long(b" -17abc").unwrap(), -17);
        assert_eq!(parse_long(b"+8").unwrap(), 8);
        assert_eq!(parse_long(b"3.99").unwrap(), 3);
        assert_eq!(parse_long(b"0x1A").unwrap(), 0);
    }

    #[test]
    fn zero_is_a_valid_value() {
        assert_eq!(parse_double(b"0\0").unwrap(), 0.0);
        assert_eq!(parse_double(b"0.000").unwrap(), 0.0);
        assert_eq!(parse_long(b"0\0").unwrap(), 0);
    }

    #[test]
    fn unprogrammed_slot_is_rejected() {
        let erased = [0xFFu8; 15];

        assert!(is_number_format(parse_double(&erased)));
        assert!(is_number_format(parse_long(&erased)));
    }

    #[test]
    fn garbage_is_rejected() {
        let cases: [&[u8]; 8] = [b"", b"\0", b"-", b"+.", b".", b"e5", b"   ", b"abc"];
        for raw in cases {
            assert!(is_number_format(parse_double(raw)), "{:?}", raw);
            assert!(is_number_format(parse_long(raw)), "{:?}", raw);
        }
    }

    #[test]
    fn only_first_nineteen_characters_count() {
        let nines = [b'9'; 25];

        assert_eq!(parse_double(&nines).unwrap(), 9999999999999999999.0);
        // 19 nines do not fit an i64 and saturate like strtol does
        assert_eq!(parse_long(&nines).unwrap(), i64::MAX);

        let mut long_tail = b"1234567890123456789".to_vec();
        long_tail.extend_from_slice(b"999");
        assert_eq!(parse_long(&long_tail).unwrap(), 1234567890123456789);
    }

    #[test]
    fn text_stops_at_nul() {
        assert_eq!(parse_long(b"12\034").unwrap(), 12);
        assert_eq!(parse_double(b"1.5\0e3").unwrap(), 1.5);
    }

    #[test]
    fn long_overflow_saturates() {
        assert_eq!(parse_long(b"9223372036854775807").unwrap(), i64::MAX);
        assert_eq!(parse_long(b"9223372036854775808").unwrap(), i64::MAX);
        // a sign leaves room for 18 digits only
        assert_eq!(
            parse_long(b"-9999999999999999999").unwrap(),
            -999999999999999999
        );

        let min = convert_long(b"-9223372036854775809");
        assert_eq!(min.value, i64::MIN);
        assert!(min.range_error);
        assert_eq!(convert_long(b"-9223372036854775808").value, i64::MIN);
    }

    #[test]
    fn double_range_errors() {
        // underflow to zero reads as corrupted
        assert!(is_number_format(parse_double(b"1e-400")));
        // overflow keeps the saturated value
        assert_eq!(parse_double(b"1e400").unwrap(), f64::INFINITY);
        assert_eq!(parse_double(b"-1e400").unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn double_special_values() {
        assert_eq!(parse_double(b"inf").unwrap(), f64::INFINITY);
        assert_eq!(parse_double(b"-Infinity").unwrap(), f64::NEG_INFINITY);
        assert!(parse_double(b"NaN").unwrap().is_nan());
        assert!(is_number_format(parse_long(b"inf")));
    }

    #[test]
    fn parsing_is_repeatable() {
        let raw = b"6.02e2\0junk".to_vec();

        assert_eq!(parse_double(&raw).unwrap(), parse_double(&raw).unwrap());
        assert_eq!(parse_long(&raw).unwrap(), parse_long(&raw).unwrap());
        assert_eq!(raw, b"6.02e2\0junk");
    }
}
