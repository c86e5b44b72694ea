use bstr::BString;

use crate::error::OptionsError;

/// The byte or byte sequence that separates fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delimiter {
    /// A single separator byte, matched without lookahead.
    Byte(u8),
    /// A multi-byte separator, matched as a whole.
    Seq(BString),
}

impl Delimiter {
    #[inline]
    pub(crate) fn first_byte(&self) -> u8 {
        match self {
            Delimiter::Byte(byte) => *byte,
            Delimiter::Seq(seq) => seq[0],
        }
    }
}

/// An immutable snapshot of the parsing configuration.
///
/// Built once via [`Options::builder`] and shared by reference across all
/// fields of a parse (and across worker threads; nothing in here mutates).
/// The defaults describe the common delimited-text setup: space and tab as
/// whitespace, `"` as open quote, close quote and escape, `.` as the
/// decimal point, no delimiter and no sentinels.
#[derive(Clone, Debug)]
pub struct Options {
    pub(crate) sentinel: Option<Vec<BString>>,
    pub(crate) wh1: u8,
    pub(crate) wh2: u8,
    pub(crate) quoted: bool,
    pub(crate) open_quote: u8,
    pub(crate) close_quote: u8,
    pub(crate) escape: u8,
    pub(crate) delimiter: Option<Delimiter>,
    pub(crate) decimal: u8,
    pub(crate) trues: Option<Vec<BString>>,
    pub(crate) falses: Option<Vec<BString>>,
    pub(crate) date_format: Option<String>,
    pub(crate) ignore_repeated: bool,
    pub(crate) ignore_empty_lines: bool,
    pub(crate) comment: Option<BString>,
    pub(crate) strip_whitespace: bool,
    pub(crate) strip_quoted: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sentinel: None,
            wh1: b' ',
            wh2: b'\t',
            quoted: true,
            open_quote: b'"',
            close_quote: b'"',
            escape: b'"',
            delimiter: None,
            decimal: b'.',
            trues: None,
            falses: None,
            date_format: None,
            ignore_repeated: false,
            ignore_empty_lines: false,
            comment: None,
            strip_whitespace: false,
            strip_quoted: false,
        }
    }
}

impl Options {
    /// Starts building an options snapshot from the defaults.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder {
            options: Options::default(),
        }
    }

    /// The configured sentinel tokens, longest first.
    ///
    /// `None` disables sentinel checks, `Some` with no tokens treats empty
    /// fields as missing.
    #[inline]
    pub fn sentinel(&self) -> Option<&[BString]> {
        self.sentinel.as_deref()
    }

    /// The two whitespace bytes.
    #[inline]
    pub fn whitespace(&self) -> (u8, u8) {
        (self.wh1, self.wh2)
    }

    /// Whether quote handling is enabled.
    #[inline]
    pub fn quoted(&self) -> bool {
        self.quoted
    }

    /// The open quote, close quote and escape bytes.
    #[inline]
    pub fn quotes(&self) -> (u8, u8, u8) {
        (self.open_quote, self.close_quote, self.escape)
    }

    /// The escape byte, used when decoding captured spans.
    #[inline]
    pub fn escape(&self) -> u8 {
        self.escape
    }

    /// The configured field delimiter, if any.
    #[inline]
    pub fn delimiter(&self) -> Option<&Delimiter> {
        self.delimiter.as_ref()
    }

    /// The decimal point byte used by float fields.
    #[inline]
    pub fn decimal(&self) -> u8 {
        self.decimal
    }

    /// Tokens recognized as `true`, longest first, if configured.
    #[inline]
    pub fn trues(&self) -> Option<&[BString]> {
        self.trues.as_deref()
    }

    /// Tokens recognized as `false`, longest first, if configured.
    #[inline]
    pub fn falses(&self) -> Option<&[BString]> {
        self.falses.as_deref()
    }

    /// The date/time pattern used by date fields, if configured.
    #[inline]
    pub fn date_format(&self) -> Option<&str> {
        self.date_format.as_deref()
    }

    /// Whether runs of delimiters and newlines collapse into one separator.
    #[inline]
    pub fn ignore_repeated(&self) -> bool {
        self.ignore_repeated
    }

    /// Whether blank lines after a newline are consumed.
    #[inline]
    pub fn ignore_empty_lines(&self) -> bool {
        self.ignore_empty_lines
    }

    /// The comment prefix, if configured.
    #[inline]
    pub fn comment(&self) -> Option<&BString> {
        self.comment.as_ref()
    }

    /// Whether surrounding whitespace is excluded from captured fields.
    #[inline]
    pub fn strip_whitespace(&self) -> bool {
        self.strip_whitespace
    }

    /// Whether whitespace just inside the quotes is excluded as well.
    #[inline]
    pub fn strip_quoted(&self) -> bool {
        self.strip_quoted
    }
}

/// Builder for [`Options`].
///
/// Setters take and return the builder by value; [`build`][Self::build]
/// validates the combination.
#[derive(Clone, Debug)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Sets the sentinel tokens that mean "missing value".
    ///
    /// Matching prefers longer tokens; equal lengths keep their order here.
    pub fn sentinel<T: Into<BString>>(mut self, tokens: impl IntoIterator<Item = T>) -> Self {
        self.options.sentinel = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Treats zero-length fields as missing values.
    pub fn empty_sentinel(mut self) -> Self {
        self.options.sentinel = Some(vec![]);
        self
    }

    /// Sets the two bytes treated as field-surrounding whitespace.
    pub fn whitespace(mut self, wh1: u8, wh2: u8) -> Self {
        self.options.wh1 = wh1;
        self.options.wh2 = wh2;
        self
    }

    /// Enables quote handling with the given open quote, close quote and
    /// escape bytes.
    pub fn quotes(mut self, open: u8, close: u8, escape: u8) -> Self {
        self.options.quoted = true;
        self.options.open_quote = open;
        self.options.close_quote = close;
        self.options.escape = escape;
        self
    }

    /// Disables quote handling; quote bytes become ordinary data.
    pub fn no_quotes(mut self) -> Self {
        self.options.quoted = false;
        self
    }

    /// Sets a single-byte field delimiter.
    pub fn delimiter(mut self, byte: u8) -> Self {
        self.options.delimiter = Some(Delimiter::Byte(byte));
        self
    }

    /// Sets a multi-byte field delimiter.
    pub fn delimiter_seq(mut self, seq: impl Into<BString>) -> Self {
        self.options.delimiter = Some(Delimiter::Seq(seq.into()));
        self
    }

    /// Sets the decimal point byte used by float fields.
    pub fn decimal(mut self, byte: u8) -> Self {
        self.options.decimal = byte;
        self
    }

    /// Sets the token sets recognized as boolean values.
    pub fn booleans<T: Into<BString>>(
        mut self,
        trues: impl IntoIterator<Item = T>,
        falses: impl IntoIterator<Item = T>,
    ) -> Self {
        self.options.trues = Some(trues.into_iter().map(Into::into).collect());
        self.options.falses = Some(falses.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the chrono pattern used by date/time fields.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.options.date_format = Some(format.into());
        self
    }

    /// Collapses runs of delimiters and newlines into one separator.
    pub fn ignore_repeated(mut self, value: bool) -> Self {
        self.options.ignore_repeated = value;
        self
    }

    /// Consumes blank lines following a newline.
    pub fn ignore_empty_lines(mut self, value: bool) -> Self {
        self.options.ignore_empty_lines = value;
        self
    }

    /// Sets a comment prefix; lines starting with it are consumed whole.
    pub fn comment(mut self, prefix: impl Into<BString>) -> Self {
        self.options.comment = Some(prefix.into());
        self
    }

    /// Excludes surrounding whitespace from captured fields.
    pub fn strip_whitespace(mut self, value: bool) -> Self {
        self.options.strip_whitespace = value;
        self
    }

    /// Excludes whitespace just inside the quotes as well.
    ///
    /// Implies [`strip_whitespace`][Self::strip_whitespace].
    pub fn strip_quoted(mut self, value: bool) -> Self {
        self.options.strip_quoted = value;
        self
    }

    /// Validates the combination and produces the snapshot.
    pub fn build(self) -> Result<Options, OptionsError> {
        let mut options = self.options;

        if options.strip_quoted {
            options.strip_whitespace = true;
        }

        if options.quoted {
            for byte in [options.open_quote, options.close_quote, options.escape] {
                if !byte.is_ascii() {
                    return Err(OptionsError::NonAsciiQuote { byte });
                }
            }
        }

        if let Some(delimiter) = &options.delimiter {
            if let Delimiter::Seq(seq) = delimiter {
                if seq.is_empty() {
                    return Err(OptionsError::EmptyDelimiter);
                }
            }
            let first = delimiter.first_byte();
            let mut reserved = vec![options.wh1, options.wh2];
            if options.quoted {
                reserved.extend([options.open_quote, options.close_quote, options.escape]);
            }
            if reserved.contains(&first) {
                return Err(OptionsError::DelimiterClash { byte: first });
            }
        }

        if let Some(comment) = &options.comment {
            if comment.is_empty() {
                return Err(OptionsError::EmptyComment);
            }
        }

        if let Some(tokens) = &mut options.sentinel {
            let mut reserved = vec![options.wh1, options.wh2];
            if options.quoted {
                reserved.extend([options.open_quote, options.close_quote, options.escape]);
            }
            if let Some(delimiter) = &options.delimiter {
                reserved.push(delimiter.first_byte());
            }
            for token in tokens.iter() {
                match token.first() {
                    None => return Err(OptionsError::EmptySentinelToken),
                    Some(&byte) if reserved.contains(&byte) => {
                        return Err(OptionsError::SentinelPrefix {
                            token: token.clone(),
                            byte,
                        })
                    }
                    Some(_) => {}
                }
            }
            // Longest first; the stable sort keeps insertion order on ties.
            tokens.sort_by_key(|token| std::cmp::Reverse(token.len()));
        }

        Ok(options)
    }
}
