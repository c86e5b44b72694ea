use std::io;

use bstr::BString;
use thiserror::Error;

use crate::Code;

/// An invalid combination of parsing options.
///
/// Returned by [`OptionsBuilder::build`][crate::OptionsBuilder::build].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    /// Quote and escape bytes must be ASCII.
    #[error("quote and escape bytes must be ASCII, got {byte:#04x}")]
    NonAsciiQuote {
        /// The offending byte.
        byte: u8,
    },
    /// The delimiter collides with a quote, escape or whitespace byte.
    #[error("delimiter byte {byte:#04x} collides with a quote, escape or whitespace byte")]
    DelimiterClash {
        /// The first delimiter byte.
        byte: u8,
    },
    /// A multi-byte delimiter must not be empty.
    #[error("the delimiter must not be empty")]
    EmptyDelimiter,
    /// The comment prefix must not be empty.
    #[error("the comment prefix must not be empty")]
    EmptyComment,
    /// Sentinel tokens must not be empty; use
    /// [`empty_sentinel`][crate::OptionsBuilder::empty_sentinel] to treat
    /// empty fields as missing.
    #[error("sentinel tokens must not be empty")]
    EmptySentinelToken,
    /// A sentinel token starts with a byte the framing layers claim.
    #[error("sentinel {token:?} starts with reserved byte {byte:#04x}")]
    SentinelPrefix {
        /// The offending token.
        token: BString,
        /// Its first byte.
        byte: u8,
    },
}

/// A failure reported by the [`parse`][crate::parse] family of wrappers.
///
/// The field pipeline itself never fails with an error value; outcomes live
/// in the [`Code`] bitmask. These wrappers translate a non-ok code or
/// leftover input into an error that names the offending bytes and the
/// target type.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The input did not parse as the requested type.
    #[error("cannot parse {fragment:?} as {target} ({code:?})")]
    Invalid {
        /// The input that was parsed, truncated for display.
        fragment: BString,
        /// Name of the requested type.
        target: &'static str,
        /// The outcome bitmask of the attempt.
        code: Code,
    },
    /// A value parsed but did not span the whole input.
    #[error("trailing bytes after parsing {fragment:?} as {target}")]
    Trailing {
        /// The input that was parsed, truncated for display.
        fragment: BString,
        /// Name of the requested type.
        target: &'static str,
        /// The outcome bitmask of the attempt.
        code: Code,
    },
    /// The underlying reader failed.
    #[error("IO error during parsing: {}", .0)]
    Io(#[source] io::Error),
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}
