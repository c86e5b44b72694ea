//! The field pipeline: a fixed stack of framing layers around a
//! [`FromField`] type parser.
//!
//! Control descends through the layers to the type parser and each layer
//! adjusts the shared [`Scan`] state on the way back out:
//!
//! ```text
//! result - delimited - empty sentinel - whitespace - quoted - whitespace
//!        - sentinel - type parser
//! ```
//!
//! [`parse_field`] runs the whole stack; [`parse_scalar`] runs the condensed
//! `sentinel - type parser` form used when the input is a single value with
//! no surrounding record structure.

use sluice::Source;

use crate::frame;
use crate::options::{Delimiter, Options};
use crate::scan::Scan;
use crate::value::FromField;
use crate::Code;

/// The outcome of parsing one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldResult<T> {
    /// The outcome bitmask.
    pub code: Code,
    /// Total bytes consumed from the entry position, framing included.
    ///
    /// This holds even for failed fields, so `entry + consumed` is always
    /// the position at which to resume with the next field.
    pub consumed: usize,
    /// The parsed value; present exactly when [`Code::ok`] holds.
    pub value: Option<T>,
}

/// Parses one delimited field at the cursor through the full layer stack.
///
/// The entry position is treated as a line start: configured comment and
/// blank lines are consumed before the value. The cursor ends up past the
/// field's trailing delimiter or newline, on the first byte of the next
/// field.
pub fn parse_field<T: FromField, S: Source>(src: &mut S, opts: &Options) -> FieldResult<T> {
    src.set_anchor();
    let start = src.position();
    if opts.comment.is_some() || opts.ignore_empty_lines {
        frame::skip_comment_and_empty_lines(src, opts);
    }
    let mut scan = Scan::new(src.position());
    let value = delimited::<T, S>(src, &mut scan, opts);
    finish(scan, start, src.position(), value)
}

/// Parses a single value with no surrounding record structure.
///
/// Only the sentinel layer wraps the type parser: no whitespace stripping,
/// no quote handling, no delimiter scan. This is the form behind the
/// [`parse`][crate::parse] wrappers.
pub fn parse_scalar<T: FromField, S: Source>(src: &mut S, opts: &Options) -> FieldResult<T> {
    src.set_anchor();
    let start = src.position();
    let mut scan = Scan::new(start);
    let value = sentinel::<T, S>(src, &mut scan, opts);
    finish(scan, start, src.position(), value)
}

/// Advances past a delimiter at the cursor, or a whole run of delimiters
/// and newlines when `ignore_repeated` is configured.
///
/// Returns whether anything was consumed.
pub fn skip_delimiter<S: Source>(src: &mut S, opts: &Options) -> bool {
    let Some(delimiter) = &opts.delimiter else {
        return false;
    };
    if opts.ignore_repeated {
        let mut scan = Scan::new(src.position());
        frame::consume_repeated(src, &mut scan, opts, delimiter)
    } else {
        match delimiter {
            Delimiter::Byte(delim) => {
                if src.peek() == Some(*delim) {
                    src.advance(1);
                    true
                } else {
                    false
                }
            }
            Delimiter::Seq(seq) => {
                if src.matches(seq) {
                    src.advance(seq.len());
                    true
                } else {
                    false
                }
            }
        }
    }
}

fn finish<T>(scan: Scan, start: usize, position: usize, value: Option<T>) -> FieldResult<T> {
    FieldResult {
        code: scan.code,
        consumed: position - start,
        value: if scan.code.ok() { value } else { None },
    }
}

fn delimited<T: FromField, S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<T> {
    let value = empty_sentinel::<T, S>(src, scan, opts);
    // A greedy type parser may already have scanned to the field end.
    if !scan.code.delimited() && !scan.code.newline() && !scan.code.eof() {
        frame::find_delimiter(src, scan, opts, T::GREEDY);
    }
    value
}

fn empty_sentinel<T: FromField, S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
) -> Option<T> {
    let empty_means_missing = matches!(&opts.sentinel, Some(tokens) if tokens.is_empty());
    if src.at_end() {
        if empty_means_missing {
            scan.code |= Code::SENTINEL | Code::EOF;
            scan.mark_missing();
        } else {
            scan.code |= Code::INVALID | Code::EOF;
        }
        return None;
    }
    let value = outer_whitespace::<T, S>(src, scan, opts);
    if empty_means_missing && scan.value_len() == 0 {
        scan.code &= !(Code::OK | Code::INVALID);
        scan.code |= Code::SENTINEL;
        scan.mark_missing();
        return None;
    }
    value
}

fn outer_whitespace<T: FromField, S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
) -> Option<T> {
    let move_start = opts.strip_whitespace || !T::GREEDY;
    if !frame::leading_whitespace(src, scan, opts, move_start) {
        return None;
    }
    let value = quoted::<T, S>(src, scan, opts);
    // Whitespace between the value and its separator is never content for
    // non-greedy types, and never content after a close quote.
    if !scan.code.eof()
        && !scan.code.delimited()
        && !scan.code.newline()
        && (!T::GREEDY || scan.code.quoted())
    {
        frame::trailing_whitespace(src, opts);
    }
    value
}

fn quoted<T: FromField, S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<T> {
    let mut is_quoted = false;
    if opts.quoted && src.peek() == Some(opts.open_quote) {
        is_quoted = true;
        scan.code |= Code::QUOTED;
        src.advance(1);
        scan.restart_value(src.position());
        if src.at_end() {
            scan.code |= Code::INVALID_QUOTED_FIELD | Code::EOF;
            return None;
        }
    }
    let value = inner_whitespace::<T, S>(src, scan, opts, is_quoted);
    if is_quoted && !T::GREEDY {
        // Greedy parsers walked to the close quote themselves.
        if src.at_end() {
            scan.code |= Code::INVALID_QUOTED_FIELD | Code::EOF;
        } else {
            frame::find_close_quote(src, scan, opts, false);
            // A sentinel that covered the value also covers stray bytes in
            // front of the close quote; only broken framing stays invalid.
            if scan.code.sentinel() && scan.code.invalid() && !scan.code.invalid_quoted_field() {
                scan.code &= !Code::INVALID;
            }
        }
    }
    value
}

fn inner_whitespace<T: FromField, S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
    is_quoted: bool,
) -> Option<T> {
    if is_quoted {
        let move_start = opts.strip_quoted || !T::GREEDY;
        if !frame::leading_whitespace(src, scan, opts, move_start) {
            return None;
        }
    }
    let value = sentinel::<T, S>(src, scan, opts);
    if is_quoted && !T::GREEDY && !src.at_end() {
        frame::trailing_whitespace(src, opts);
    }
    value
}

fn sentinel<T: FromField, S: Source>(src: &mut S, scan: &mut Scan, opts: &Options) -> Option<T> {
    let mut sentinel_end = None;
    if let Some(tokens) = &opts.sentinel {
        let pos = src.position();
        for token in tokens {
            // Longest first, so the first hit wins.
            if src.matches(token) {
                sentinel_end = Some(pos + token.len());
                break;
            }
        }
    }

    let value = match T::parse_value(src, scan, opts) {
        Some(value) => {
            scan.code |= Code::OK;
            Some(value)
        }
        None => {
            scan.code |= Code::INVALID;
            None
        }
    };

    if let Some(end) = sentinel_end {
        // The sentinel wins unless the parsed value extends past it.
        if end >= scan.value_end() {
            scan.code &= !(Code::OK | Code::INVALID | Code::OVERFLOW);
            scan.code |= Code::SENTINEL;
            scan.mark_missing();
            if end >= src.position() {
                src.seek(end);
            }
            if src.at_end() {
                scan.code |= Code::EOF;
            }
            return None;
        }
    }
    value
}
