//! The framing scanners: everything that recognizes the bytes *around* a
//! value. The close-quote scanner and the delimiter scanner are shared
//! between the pipeline layers and the greedy (string-like) type parsers,
//! which use them to find their own field extent.

use sluice::Source;

use crate::options::{Delimiter, Options};
use crate::scan::Scan;
use crate::Code;

#[inline]
pub(crate) fn is_whitespace(byte: u8, opts: &Options) -> bool {
    byte == opts.wh1 || byte == opts.wh2
}

/// Consumes leading whitespace in front of a value.
///
/// With `move_start` the value window is restarted past the stripped bytes.
/// Returns `false` when the input ended during the strip, in which case
/// INVALID|EOF is recorded and the value must not be parsed.
pub(crate) fn leading_whitespace<S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
    move_start: bool,
) -> bool {
    loop {
        match src.peek() {
            Some(byte) if is_whitespace(byte, opts) => src.advance(1),
            Some(_) => {
                if move_start {
                    scan.restart_value(src.position());
                }
                return true;
            }
            None => {
                if move_start {
                    scan.restart_value(src.position());
                }
                scan.code |= Code::INVALID | Code::EOF;
                return false;
            }
        }
    }
}

/// Consumes trailing whitespace after a value, leaving the value window
/// untouched.
pub(crate) fn trailing_whitespace<S: Source>(src: &mut S, opts: &Options) {
    while let Some(byte) = src.peek() {
        if !is_whitespace(byte, opts) {
            return;
        }
        src.advance(1);
    }
}

/// Consumes a newline at the cursor: LF, CRLF, or a lone CR.
fn consume_newline<S: Source>(src: &mut S) -> bool {
    match src.peek() {
        Some(b'\n') => {
            src.advance(1);
            true
        }
        Some(b'\r') => {
            src.advance(1);
            if src.peek() == Some(b'\n') {
                src.advance(1);
            }
            true
        }
        _ => false,
    }
}

fn consume_rest_of_line<S: Source>(src: &mut S) {
    while let Some(byte) = src.peek() {
        src.advance(1);
        if byte == b'\n' {
            return;
        }
        if byte == b'\r' {
            if src.peek() == Some(b'\n') {
                src.advance(1);
            }
            return;
        }
    }
}

/// At a line start: consumes blank lines (when configured) and comment
/// lines, in any interleaving, until neither applies.
pub(crate) fn skip_comment_and_empty_lines<S: Source>(src: &mut S, opts: &Options) {
    loop {
        let mut progressed = false;
        if opts.ignore_empty_lines && matches!(src.peek(), Some(b'\n') | Some(b'\r')) {
            progressed = consume_newline(src);
        }
        if let Some(comment) = &opts.comment {
            if src.matches(comment) {
                src.advance(comment.len());
                consume_rest_of_line(src);
                progressed = true;
            }
        }
        if !progressed {
            return;
        }
    }
}

/// Scans from just inside a quoted field to its close quote.
///
/// The cursor must sit on the first byte after the open quote (or after the
/// value, for non-greedy types). Handles the escape conventions: when the
/// escape byte equals the close quote, a doubled close quote is one literal
/// quote byte; otherwise the escape byte makes the following byte literal.
///
/// Greedy callers own the quoted bytes, so the value window is extended over
/// content (honoring `strip_quoted`). Non-greedy callers already consumed
/// their value, so anything but an immediate close quote is INVALID.
pub(crate) fn find_close_quote<S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
    greedy: bool,
) {
    let same = opts.close_quote == opts.escape;
    let mut first = true;
    loop {
        let Some(byte) = src.peek() else {
            scan.code |= Code::INVALID_QUOTED_FIELD | Code::EOF;
            return;
        };
        src.advance(1);
        if same && byte == opts.escape {
            match src.peek() {
                None => {
                    // `byte` closed the field right at the end of the input.
                    scan.code |= Code::EOF;
                    if !first && !greedy {
                        scan.code |= Code::INVALID;
                    }
                    return;
                }
                Some(next) if next == opts.close_quote => {
                    // Doubled close quote: one literal quote byte.
                    scan.code |= Code::ESCAPED_STRING;
                    scan.mark_escaped();
                    src.advance(1);
                    if greedy {
                        scan.push_value_end(src.position());
                    }
                }
                Some(_) => {
                    // `byte` was the close quote.
                    if !first && !greedy {
                        scan.code |= Code::INVALID;
                    }
                    return;
                }
            }
        } else if byte == opts.escape {
            scan.code |= Code::ESCAPED_STRING;
            scan.mark_escaped();
            if src.peek().is_none() {
                // Dangling escape.
                scan.code |= Code::INVALID_QUOTED_FIELD | Code::EOF;
                return;
            }
            src.advance(1);
            if greedy {
                scan.push_value_end(src.position());
            }
        } else if byte == opts.close_quote {
            if !first && !greedy {
                scan.code |= Code::INVALID;
            }
            return;
        } else if greedy && !(opts.strip_quoted && is_whitespace(byte, opts)) {
            scan.push_value_end(src.position());
        }
        first = false;
    }
}

/// Scans from just after a value to its terminating delimiter, newline or
/// the end of the input.
///
/// Greedy callers reach this with the cursor still on their content, so
/// unmatched bytes extend the value window (honoring `strip_whitespace`);
/// for every other caller, and for greedy quoted fields, unmatched bytes are
/// stray and flagged INVALID_DELIMITER while the scan keeps going so the
/// consumed length still lines up with the next field.
pub(crate) fn find_delimiter<S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
    greedy: bool,
) {
    loop {
        let Some(byte) = src.peek() else {
            scan.code |= Code::EOF;
            return;
        };
        match &opts.delimiter {
            Some(Delimiter::Byte(delim)) if !opts.ignore_repeated => {
                if byte == *delim {
                    src.advance(1);
                    scan.code |= Code::DELIMITED;
                    return;
                }
            }
            Some(Delimiter::Seq(seq)) if !opts.ignore_repeated => {
                if src.matches(seq) {
                    src.advance(seq.len());
                    scan.code |= Code::DELIMITED;
                    return;
                }
            }
            Some(delimiter) => {
                if consume_repeated(src, scan, opts, delimiter) {
                    return;
                }
            }
            None => {}
        }
        if byte == b'\n' || byte == b'\r' {
            consume_newline(src);
            skip_comment_and_empty_lines(src, opts);
            scan.code |= Code::NEWLINE;
            if src.at_end() {
                scan.code |= Code::EOF;
            }
            return;
        }
        let quoted = scan.code.quoted();
        if !greedy || quoted {
            scan.code |= Code::INVALID_DELIMITER;
        }
        src.advance(1);
        if greedy && !quoted && !(opts.strip_whitespace && is_whitespace(byte, opts)) {
            scan.push_value_end(src.position());
        }
    }
}

/// Consumes a run of delimiters and newlines as one separator.
///
/// Comment and blank lines are skipped once, after the first newline of the
/// run. Returns whether anything was consumed.
pub(crate) fn consume_repeated<S: Source>(
    src: &mut S,
    scan: &mut Scan,
    opts: &Options,
    delimiter: &Delimiter,
) -> bool {
    let mut any = false;
    let mut newline_seen = false;
    loop {
        let Some(byte) = src.peek() else { break };
        let matched = match delimiter {
            Delimiter::Byte(delim) => {
                if byte == *delim {
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
        };
        if matched {
            scan.code |= Code::DELIMITED;
            any = true;
            continue;
        }
        if byte == b'\n' || byte == b'\r' {
            consume_newline(src);
            if !newline_seen {
                skip_comment_and_empty_lines(src, opts);
                newline_seen = true;
            }
            scan.code |= Code::NEWLINE;
            any = true;
            continue;
        }
        break;
    }
    if any && src.at_end() {
        scan.code |= Code::EOF;
    }
    any
}
