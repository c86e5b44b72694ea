//! The type-parser seam of the pipeline: the [`FromField`] trait, its
//! built-in implementations, and the via-str fallback for host types.

use bstr::BString;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sluice::Source;

use crate::options::Options;
use crate::scan::Scan;
use crate::{frame, Span};

/// A type whose values can be parsed out of a field.
///
/// Implementations consume the value bytes at the cursor and push the value
/// window end ([`Scan::push_value_end`]) over them. They must not consume
/// surrounding whitespace, quotes or the trailing delimiter; the pipeline
/// layers own those.
///
/// On failure the implementation returns `None`, recording any more specific
/// flag (such as [`Code::OVERFLOW`][crate::Code::OVERFLOW]) in `scan.code`
/// first; the pipeline adds the invalid bit. A failing implementation should
/// leave the cursor where resynchronization on the next delimiter makes
/// sense, usually either untouched or past the bytes it understood.
pub trait FromField: Sized {
    /// Greedy (string-like) types get their field extent from the framing
    /// layers instead of their own syntax.
    const GREEDY: bool = false;

    /// Consumes the value bytes at the cursor.
    fn parse_value<S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<Self>;
}

impl FromField for Span {
    const GREEDY: bool = true;

    fn parse_value<S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<Self> {
        if scan.code.quoted() {
            frame::find_close_quote(src, scan, opts, true);
        } else {
            // With no delimiter configured this consumes to a newline or the
            // end of the input.
            frame::find_delimiter(src, scan, opts, true);
        }
        if scan.code.invalid() {
            return None;
        }
        scan.try_span()
    }
}

impl FromField for String {
    const GREEDY: bool = true;

    fn parse_value<S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<Self> {
        let span = Span::parse_value(src, scan, opts)?;
        let bytes = crate::span::decode(&*src, span, opts.escape);
        String::from_utf8(bytes.into_owned()).ok()
    }
}

impl FromField for BString {
    const GREEDY: bool = true;

    fn parse_value<S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<Self> {
        let span = Span::parse_value(src, scan, opts)?;
        Some(crate::span::decode(&*src, span, opts.escape).into_owned().into())
    }
}

fn longest_token<S: Source, T: AsRef<[u8]>>(src: &mut S, tokens: &[T]) -> Option<usize> {
    let mut best = None;
    for token in tokens {
        let token = token.as_ref();
        if !token.is_empty() && best.map_or(true, |len| token.len() > len) && src.matches(token) {
            best = Some(token.len());
        }
    }
    best
}

impl FromField for bool {
    fn parse_value<S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<Self> {
        let true_len = match opts.trues() {
            Some(tokens) => longest_token(src, tokens),
            None => longest_token(src, &[&b"true"[..]]),
        };
        let false_len = match opts.falses() {
            Some(tokens) => longest_token(src, tokens),
            None => longest_token(src, &[&b"false"[..]]),
        };
        let (len, value) = match (true_len, false_len) {
            (Some(t), Some(f)) if t >= f => (t, true),
            (_, Some(f)) => (f, false),
            (Some(t), None) => (t, true),
            (None, None) => return None,
        };
        src.advance(len);
        scan.push_value_end(src.position());
        Some(value)
    }
}

/// Conversion from decoded field text, used by the via-str fallback.
///
/// Types implementing this get a greedy [`FromField`] implementation through
/// [`impl_from_field_via_str!`][crate::impl_from_field_via_str]: the field is
/// captured like a string, decoded, and handed to
/// [`from_field_str`][Self::from_field_str]. A `None` marks the field
/// invalid.
pub trait FromFieldStr: Sized {
    /// Converts the decoded field text into a value.
    fn from_field_str(text: &str, opts: &Options) -> Option<Self>;
}

/// Derives a greedy [`FromField`][crate::FromField] implementation from a
/// [`FromFieldStr`][crate::FromFieldStr] one.
///
/// The field extent is determined by the framing layers (quotes, delimiter,
/// newline), the captured bytes are decoded, and the via-str conversion runs
/// on the result.
#[macro_export]
macro_rules! impl_from_field_via_str {
    ($($type:ty),* $(,)?) => {$(
        impl $crate::FromField for $type {
            const GREEDY: bool = true;

            fn parse_value<S: $crate::Source>(
                src: &mut S,
                scan: &mut $crate::Scan,
                opts: &$crate::Options,
            ) -> Option<Self> {
                let span = <$crate::Span as $crate::FromField>::parse_value(src, scan, opts)?;
                let bytes = $crate::span::decode(&*src, span, opts.escape());
                let text = core::str::from_utf8(&bytes).ok()?;
                <$type as $crate::FromFieldStr>::from_field_str(text, opts)
            }
        }
    )*};
}

impl FromFieldStr for NaiveDate {
    fn from_field_str(text: &str, opts: &Options) -> Option<Self> {
        NaiveDate::parse_from_str(text, opts.date_format().unwrap_or("%Y-%m-%d")).ok()
    }
}

impl FromFieldStr for NaiveTime {
    fn from_field_str(text: &str, opts: &Options) -> Option<Self> {
        NaiveTime::parse_from_str(text, opts.date_format().unwrap_or("%H:%M:%S%.f")).ok()
    }
}

impl FromFieldStr for NaiveDateTime {
    fn from_field_str(text: &str, opts: &Options) -> Option<Self> {
        NaiveDateTime::parse_from_str(text, opts.date_format().unwrap_or("%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
    }
}

impl_from_field_via_str!(NaiveDate, NaiveTime, NaiveDateTime);

#[cfg(test)]
mod tests {
    use sluice::SliceSource;

    use super::*;

    fn run<T: FromField>(input: &[u8], opts: &Options) -> (Option<T>, Scan) {
        let mut src = SliceSource::new(input);
        let mut scan = Scan::new(0);
        let value = T::parse_value(&mut src, &mut scan, opts);
        (value, scan)
    }

    #[test]
    fn bool_defaults() {
        let opts = Options::default();
        assert_eq!(run::<bool>(b"true", &opts).0, Some(true));
        assert_eq!(run::<bool>(b"false,", &opts).0, Some(false));
        assert_eq!(run::<bool>(b"T", &opts).0, None);
        assert_eq!(run::<bool>(b"", &opts).0, None);
    }

    #[test]
    fn bool_custom_tokens() {
        let opts = Options::builder()
            .booleans(["T", "yes"], ["F", "no"])
            .build()
            .unwrap();
        assert_eq!(run::<bool>(b"yes", &opts).0, Some(true));
        assert_eq!(run::<bool>(b"no", &opts).0, Some(false));
        assert_eq!(run::<bool>(b"T", &opts).0, Some(true));
        assert_eq!(run::<bool>(b"true", &opts).0, None);
    }

    #[test]
    fn bool_prefers_longest_token() {
        // "no" would also match in front of "not available", but so would a
        // longer false token.
        let opts = Options::builder()
            .booleans(["n"], ["no"])
            .build()
            .unwrap();
        let (value, scan) = run::<bool>(b"no", &opts);
        assert_eq!(value, Some(false));
        assert_eq!(scan.value_end(), 2);
    }

    #[test]
    fn date_with_default_format() {
        let opts = Options::default();
        let (value, _) = run::<NaiveDate>(b"2024-02-29", &opts);
        assert_eq!(value, NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn date_with_custom_format() {
        let opts = Options::builder().date_format("%d/%m/%Y").build().unwrap();
        let (value, _) = run::<NaiveDate>(b"29/02/2024", &opts);
        assert_eq!(value, NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn datetime_with_default_format() {
        let opts = Options::default();
        let (value, _) = run::<NaiveDateTime>(b"2024-02-29T12:30:00", &opts);
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(12, 30, 0);
        assert_eq!(value, expected);
    }

    #[test]
    fn invalid_date_is_rejected() {
        let opts = Options::default();
        let (value, _) = run::<NaiveDate>(b"2024-13-01", &opts);
        assert_eq!(value, None);
    }
}
