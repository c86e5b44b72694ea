//! Integer and float field parsers.

use num_traits::ops::overflowing::{OverflowingAdd, OverflowingMul, OverflowingSub};
use num_traits::{Bounded, FromPrimitive, Zero};
use sluice::Source;
use smallvec::SmallVec;

use crate::options::Options;
use crate::scan::Scan;
use crate::value::FromField;
use crate::Code;

/// Passes over an optionally signed run of ASCII digits and parses them as a
/// decimal number.
///
/// The value is accumulated negatively for signed negative input, so the
/// most negative representable value parses without a spurious overflow. On
/// overflow the digit extent is still consumed and recorded, the OVERFLOW
/// flag is set and `None` is returned. A lone sign is not consumed.
fn int_value<I, S>(src: &mut S, scan: &mut Scan) -> Option<I>
where
    I: Zero
        + FromPrimitive
        + Bounded
        + PartialOrd
        + OverflowingAdd
        + OverflowingSub
        + OverflowingMul,
    S: Source,
{
    let mut offset = 0;
    let mut negative = false;
    match src.peek() {
        Some(b'-') => {
            negative = true;
            offset = 1;
        }
        Some(b'+') => offset = 1,
        _ => {}
    }

    let signed = I::min_value() < I::zero();
    let mut value = I::zero();
    let mut overflow = false;
    let mut digits = 0usize;
    while let Some(digit @ b'0'..=b'9') = src.peek_at(offset) {
        offset += 1;
        digits += 1;

        let (next, overflowed) = value.overflowing_mul(&I::from_u8(10).unwrap());
        overflow |= overflowed;
        value = next;

        let step = I::from_u8(digit - b'0').unwrap();
        let (next, overflowed) = if negative && signed {
            value.overflowing_sub(&step)
        } else {
            value.overflowing_add(&step)
        };
        overflow |= overflowed;
        value = next;
    }

    if digits == 0 {
        return None;
    }
    src.advance(offset);
    scan.push_value_end(src.position());
    if negative && !signed {
        return None;
    }
    if overflow {
        scan.code |= Code::OVERFLOW;
        return None;
    }
    Some(value)
}

macro_rules! int_from_field {
    ($($int:ty),* $(,)?) => {$(
        impl FromField for $int {
            #[inline]
            fn parse_value<S: Source>(
                src: &mut S,
                scan: &mut Scan,
                _opts: &Options,
            ) -> Option<Self> {
                int_value(src, scan)
            }
        }
    )*};
}

int_from_field!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

fn ascii_eq_ignore_case<S: Source>(src: &mut S, offset: usize, token: &[u8]) -> bool {
    for (i, &expected) in token.iter().enumerate() {
        match src.peek_at(offset + i) {
            Some(byte) if byte.eq_ignore_ascii_case(&expected) => {}
            _ => return false,
        }
    }
    true
}

/// Passes over a float literal and converts it.
///
/// The extent covers an optional sign, digits around the configured decimal
/// byte, and an exponent only when digits follow it; with no digits at all,
/// the special values `nan`, `inf` and `infinity` are recognized in any
/// case. Conversion goes through `str::parse` for correctly rounded
/// results; the only copy ever made is the rewrite of a non-`.` decimal byte
/// into a small stack buffer.
fn float_value<F, S>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<F>
where
    F: std::str::FromStr,
    S: Source,
{
    let start = src.position();
    let mut offset = 0usize;
    if matches!(src.peek(), Some(b'+') | Some(b'-')) {
        offset = 1;
    }
    let sign_len = offset;

    let mut digits = 0usize;
    while let Some(b'0'..=b'9') = src.peek_at(offset) {
        offset += 1;
        digits += 1;
    }

    let mut decimal_at = None;
    if src.peek_at(offset) == Some(opts.decimal) {
        let mut end = offset + 1;
        let mut fraction = 0usize;
        while let Some(b'0'..=b'9') = src.peek_at(end) {
            end += 1;
            fraction += 1;
        }
        if digits > 0 || fraction > 0 {
            decimal_at = Some(offset);
            offset = end;
            digits += fraction;
        }
    }

    if digits == 0 {
        let mut matched = 0;
        for token in [&b"infinity"[..], &b"inf"[..], &b"nan"[..]] {
            if ascii_eq_ignore_case(src, sign_len, token) {
                matched = token.len();
                break;
            }
        }
        if matched == 0 {
            return None;
        }
        offset = sign_len + matched;
    } else if let Some(b'e') | Some(b'E') = src.peek_at(offset) {
        let mut end = offset + 1;
        if matches!(src.peek_at(end), Some(b'+') | Some(b'-')) {
            end += 1;
        }
        let mut exponent = 0usize;
        while let Some(b'0'..=b'9') = src.peek_at(end) {
            end += 1;
            exponent += 1;
        }
        if exponent > 0 {
            offset = end;
        }
    }

    src.advance(offset);
    scan.push_value_end(src.position());

    let raw = src.slice(start, offset);
    if let Some(at) = decimal_at {
        if opts.decimal != b'.' {
            let mut buf = SmallVec::<[u8; 32]>::from_slice(raw);
            buf[at] = b'.';
            return std::str::from_utf8(&buf).ok()?.parse().ok();
        }
    }
    std::str::from_utf8(raw).ok()?.parse().ok()
}

macro_rules! float_from_field {
    ($($float:ty),* $(,)?) => {$(
        impl FromField for $float {
            #[inline]
            fn parse_value<S: Source>(
                src: &mut S,
                scan: &mut Scan,
                opts: &Options,
            ) -> Option<Self> {
                float_value(src, scan, opts)
            }
        }
    )*};
}

float_from_field!(f32, f64);

#[cfg(test)]
mod tests {
    use sluice::SliceSource;

    use super::*;

    fn run<T: FromField>(input: &[u8], opts: &Options) -> (Option<T>, Scan, usize) {
        let mut src = SliceSource::new(input);
        let mut scan = Scan::new(0);
        let value = T::parse_value(&mut src, &mut scan, opts);
        let pos = src.position();
        (value, scan, pos)
    }

    fn opts() -> Options {
        Options::default()
    }

    #[test]
    fn plain_integers() {
        assert_eq!(run::<i64>(b"12,34", &opts()).0, Some(12));
        assert_eq!(run::<i64>(b"-7", &opts()).0, Some(-7));
        assert_eq!(run::<i64>(b"+7", &opts()).0, Some(7));
        assert_eq!(run::<u8>(b"255", &opts()).0, Some(255));
        assert_eq!(run::<i8>(b"-128", &opts()).0, Some(-128));
    }

    #[test]
    fn integer_extent() {
        let (_, scan, pos) = run::<i64>(b"00042 ", &opts());
        assert_eq!(scan.value_end(), 5);
        assert_eq!(pos, 5);
    }

    #[test]
    fn lone_sign_is_not_consumed() {
        let (value, _, pos) = run::<i64>(b"-", &opts());
        assert_eq!(value, None);
        assert_eq!(pos, 0);

        let (value, _, pos) = run::<i64>(b"-x", &opts());
        assert_eq!(value, None);
        assert_eq!(pos, 0);
    }

    #[test]
    fn integer_overflow_sets_the_flag() {
        let (value, scan, pos) = run::<i8>(b"300", &opts());
        assert_eq!(value, None);
        assert!(scan.code.overflow());
        assert!(scan.code.invalid());
        // The extent is still consumed for resynchronization.
        assert_eq!(pos, 3);
    }

    #[test]
    fn negative_into_unsigned_is_invalid_not_overflow() {
        let (value, scan, pos) = run::<u32>(b"-1", &opts());
        assert_eq!(value, None);
        assert!(!scan.code.overflow());
        assert_eq!(pos, 2);
    }

    #[test]
    fn most_negative_value_parses() {
        assert_eq!(run::<i64>(b"-9223372036854775808", &opts()).0, Some(i64::MIN));
        let (value, scan, _) = run::<i64>(b"-9223372036854775809", &opts());
        assert_eq!(value, None);
        assert!(scan.code.overflow());
    }

    #[test]
    fn plain_floats() {
        assert_eq!(run::<f64>(b"1.5", &opts()).0, Some(1.5));
        assert_eq!(run::<f64>(b"-0.25", &opts()).0, Some(-0.25));
        assert_eq!(run::<f64>(b".5", &opts()).0, Some(0.5));
        assert_eq!(run::<f64>(b"12.", &opts()).0, Some(12.0));
        assert_eq!(run::<f64>(b"42", &opts()).0, Some(42.0));
        assert_eq!(run::<f32>(b"1.5", &opts()).0, Some(1.5f32));
    }

    #[test]
    fn float_exponents() {
        assert_eq!(run::<f64>(b"1e3", &opts()).0, Some(1000.0));
        assert_eq!(run::<f64>(b"2.5E-2", &opts()).0, Some(0.025));
        // An exponent marker without digits stays unconsumed.
        let (value, _, pos) = run::<f64>(b"5e,", &opts());
        assert_eq!(value, Some(5.0));
        assert_eq!(pos, 1);
        let (value, _, pos) = run::<f64>(b"5e+,", &opts());
        assert_eq!(value, Some(5.0));
        assert_eq!(pos, 1);
    }

    #[test]
    fn float_specials() {
        assert_eq!(run::<f64>(b"inf", &opts()).0, Some(f64::INFINITY));
        assert_eq!(run::<f64>(b"-Infinity", &opts()).0, Some(f64::NEG_INFINITY));
        let (value, _, pos) = run::<f64>(b"NaN,", &opts());
        assert!(value.unwrap().is_nan());
        assert_eq!(pos, 3);
    }

    #[test]
    fn float_with_decimal_comma() {
        let options = Options::builder().decimal(b',').build().unwrap();
        let (value, _, pos) = run::<f64>(b"1,5", &options);
        assert_eq!(value, Some(1.5));
        assert_eq!(pos, 3);
    }

    #[test]
    fn not_a_float() {
        let (value, _, pos) = run::<f64>(b"x", &opts());
        assert_eq!(value, None);
        assert_eq!(pos, 0);
        assert_eq!(run::<f64>(b"", &opts()).0, None);
        let (value, _, pos) = run::<f64>(b".", &opts());
        assert_eq!(value, None);
        assert_eq!(pos, 0);
    }
}
