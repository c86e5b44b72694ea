//! A composable field parser for delimited byte input.
//!
//! This crate extracts typed values (integers, floats, booleans, dates and
//! times, and strings) out of tabular or delimited text. One call parses one
//! *field*: the value bytes together with the framing around them, which is
//! where the actual work hides. Quoted fields with escape conventions,
//! single- and multi-byte delimiters, newline equivalence (LF, CR, CRLF),
//! sentinel tokens that mean "missing", collapsed delimiter runs, comment
//! lines and configurable whitespace stripping all interact, and the
//! pipeline here resolves those interactions byte by byte.
//!
//! Outcomes are not reported through `Result` in the hot path. Every parse
//! returns a [`FieldResult`] carrying a [`Code`] bitmask that records the
//! value outcome and the observed framing in one word, plus the number of
//! bytes consumed, so record-oriented callers can always resynchronize on
//! the next field, even after an invalid one. Field text is never copied
//! during parsing: string-like fields are captured as a [`Span`] into the
//! source, decoded on demand.
//!
//! Inputs are [`Source`] implementations from the `sluice` crate, either a
//! byte slice ([`SliceSource`]) or a buffered stream ([`ReadSource`]); the
//! pipeline is monomorphized over both.
//!
//! ```rust
//! use sluice::SliceSource;
//! use sluice_fields::{parse_field, span, Options, Span};
//!
//! let options = Options::builder()
//!     .delimiter(b',')
//!     .sentinel(["NA"])
//!     .build()?;
//!
//! let mut src = SliceSource::new(b"3,NA,\"a,b\"\n");
//!
//! let first = parse_field::<i64, _>(&mut src, &options);
//! assert_eq!(first.value, Some(3));
//! assert!(first.code.delimited());
//!
//! let missing = parse_field::<i64, _>(&mut src, &options);
//! assert!(missing.code.sentinel());
//!
//! let quoted = parse_field::<Span, _>(&mut src, &options);
//! let text = span::decode(&src, quoted.value.unwrap(), options.escape());
//! assert_eq!(text.as_ref(), b"a,b");
//! # Ok::<(), sluice_fields::OptionsError>(())
//! ```
//!
//! For parsing a single standalone value, [`parse`] and [`try_parse`] wrap
//! the condensed pipeline and translate failure into an error or `None`.
//! Custom types plug in through [`FromFieldStr`] and
//! [`impl_from_field_via_str!`].

#![warn(missing_docs)]

mod code;
mod error;
mod field;
mod frame;
mod num;
mod options;
mod scan;
pub mod span;
mod value;

use std::any::type_name;
use std::io::Read;

use bstr::BString;

pub use sluice::{ReadSource, SliceSource, Source};

pub use code::Code;
pub use error::{OptionsError, ParseError};
pub use field::{parse_field, parse_scalar, skip_delimiter, FieldResult};
pub use options::{Delimiter, Options, OptionsBuilder};
pub use scan::Scan;
pub use span::Span;
pub use value::{FromField, FromFieldStr};

const FRAGMENT_LIMIT: usize = 60;

fn fragment(bytes: &[u8]) -> BString {
    bytes[..bytes.len().min(FRAGMENT_LIMIT)].into()
}

/// Parses `input` in its entirety as a single `T`.
///
/// Runs the condensed pipeline (sentinels and the type parser, no record
/// framing) and errors when the value does not parse or does not span the
/// whole input. Note that a sentinel match is a *missing* value, not a
/// parsed one, and therefore also an error here.
pub fn parse<T: FromField>(input: &[u8], opts: &Options) -> Result<T, ParseError> {
    let mut src = SliceSource::new(input);
    let result = parse_scalar::<T, _>(&mut src, opts);
    match result.value {
        Some(value) if result.consumed == input.len() => Ok(value),
        Some(_) => Err(ParseError::Trailing {
            fragment: fragment(input),
            target: type_name::<T>(),
            code: result.code,
        }),
        None => Err(ParseError::Invalid {
            fragment: fragment(input),
            target: type_name::<T>(),
            code: result.code,
        }),
    }
}

/// Like [`parse`], but reports failure as `None`.
pub fn try_parse<T: FromField>(input: &[u8], opts: &Options) -> Option<T> {
    parse(input, opts).ok()
}

/// Parses the whole contents of a reader as a single `T`.
///
/// A deferred IO error takes precedence over whatever parse failure it
/// caused.
pub fn parse_from_read<T: FromField>(read: impl Read, opts: &Options) -> Result<T, ParseError> {
    let mut src = ReadSource::from_read(read);
    let result = parse_scalar::<T, _>(&mut src, opts);
    src.check_io_error()?;
    let code = result.code;
    if let Some(value) = result.value {
        if src.at_end() {
            return Ok(value);
        }
        return Err(ParseError::Trailing {
            fragment: read_fragment(&mut src, result.consumed),
            target: type_name::<T>(),
            code,
        });
    }
    Err(ParseError::Invalid {
        fragment: read_fragment(&mut src, result.consumed),
        target: type_name::<T>(),
        code,
    })
}

fn read_fragment(src: &mut ReadSource<'_>, consumed: usize) -> BString {
    let mut bytes = src.slice(0, consumed).to_vec();
    let mut offset = 0;
    while bytes.len() < FRAGMENT_LIMIT {
        match src.peek_at(offset) {
            Some(byte) => bytes.push(byte),
            None => break,
        }
        offset += 1;
    }
    bytes.into()
}

#[cfg(test)]
mod tests {
    use std::io;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_whole_values() {
        let opts = Options::default();
        assert_eq!(parse::<i64>(b"42", &opts).unwrap(), 42);
        assert_eq!(parse::<f64>(b"1.25", &opts).unwrap(), 1.25);
        assert_eq!(parse::<String>(b"plain", &opts).unwrap(), "plain");
        assert!(parse::<bool>(b"true", &opts).unwrap());
    }

    #[test]
    fn parse_rejects_trailing_bytes() {
        let opts = Options::default();
        let err = parse::<i64>(b"42x", &opts);
        assert_matches!(err, Err(ParseError::Trailing { .. }));
    }

    #[test]
    fn parse_rejects_invalid_input() {
        let opts = Options::default();
        let err = parse::<i64>(b"x", &opts);
        assert_matches!(err, Err(ParseError::Invalid { .. }));
        let err = parse::<i64>(b"", &opts);
        assert_matches!(err, Err(ParseError::Invalid { .. }));
    }

    #[test]
    fn parse_reports_overflow_in_the_code() {
        let opts = Options::default();
        let err = parse::<i8>(b"300", &opts).unwrap_err();
        assert_matches!(err, ParseError::Invalid { code, .. } if code.overflow());
    }

    #[test]
    fn sentinel_is_not_a_value() {
        let opts = Options::builder().sentinel(["NA"]).build().unwrap();
        let err = parse::<i64>(b"NA", &opts);
        assert_matches!(err, Err(ParseError::Invalid { code, .. }) if code.sentinel());
        assert_eq!(try_parse::<i64>(b"NA", &opts), None);
    }

    #[test]
    fn try_parse_mirrors_parse() {
        let opts = Options::default();
        assert_eq!(try_parse::<i64>(b"7", &opts), Some(7));
        assert_eq!(try_parse::<i64>(b"7up", &opts), None);
    }

    #[test]
    fn error_fragment_is_truncated() {
        let opts = Options::default();
        let input = vec![b'x'; 200];
        let err = parse::<i64>(&input, &opts).unwrap_err();
        assert_matches!(err, ParseError::Invalid { fragment, .. } if fragment.len() == 60);
    }

    #[test]
    fn parse_from_read_checks_the_whole_input() {
        let opts = Options::default();
        assert_eq!(parse_from_read::<i64>(&b"42"[..], &opts).unwrap(), 42);
        assert_matches!(
            parse_from_read::<i64>(&b"42x"[..], &opts),
            Err(ParseError::Trailing { .. })
        );
    }

    #[test]
    fn parse_from_read_surfaces_io_errors() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "gone"))
            }
        }
        let opts = Options::default();
        let err = parse_from_read::<i64>(Broken, &opts);
        assert_matches!(err, Err(ParseError::Io(_)));
    }
}
