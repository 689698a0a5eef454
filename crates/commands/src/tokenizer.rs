use crate::code::{Code, CodeFlags, CodeKind, Keyword};
use crate::parameter::Parameter;

/// Malformed G-code input.
///
/// `offset` is the absolute byte position in the tokenizer's input. The
/// tokenizer reports and stops; it makes no attempt at recovery, since code
/// streams are trusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    /// Absolute byte offset of the offending character.
    pub offset: usize,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ParseError {
    /// Create a parse error at the given byte offset.
    pub fn new(offset: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            offset,
            message: message.into(),
        }
    }
}

/// M-codes whose argument is one unstructured trailing string (file names,
/// display messages) rather than letter-tagged parameters.
const UNPRECEDENTED_MCODES: [u32; 5] = [23, 30, 32, 36, 117];

/// A pull-based G-code tokenizer.
///
/// Produces one [`Code`] per call to [`Tokenizer::next_code`], filling a
/// caller-owned instance. The `enforcing_abs` carry bit is externalized so
/// callers can reason about physical-line boundaries themselves: it is set
/// when a bare `G53` prefixes further codes on the same line and reset when a
/// newline is consumed.
///
/// All scanning is done over the raw bytes; every byte test compares against
/// ASCII values, and UTF-8 continuation bytes (0x80–0xBF) never match any of
/// them, so multi-byte characters pass through values and comments intact.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line_indent: u8,
    line_number: Option<i64>,
    /// Whether the current physical line's prelude (indent and `N` number)
    /// has been consumed and the line is still being tokenized.
    in_line: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over the given input.
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            input,
            pos: 0,
            line_indent: 0,
            line_number: None,
            in_line: false,
        }
    }

    /// The current byte offset into the input.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Parse the next code into `code_out`.
    ///
    /// Returns `Ok(true)` when a code (possibly empty or comment-only) was
    /// produced and `Ok(false)` at the end of the input. A bare `G53`
    /// followed by further codes on the same line is not emitted itself; it
    /// sets `enforcing_abs` so its siblings carry
    /// [`CodeFlags::ENFORCE_ABSOLUTE_POSITION`].
    pub fn next_code(
        &mut self,
        code_out: &mut Code,
        enforcing_abs: &mut bool,
    ) -> Result<bool, ParseError> {
        loop {
            code_out.reset();
            if !self.parse_one(code_out, enforcing_abs)? {
                return Ok(false);
            }
            if Self::is_bare_g53(code_out) && self.in_line && self.pos < self.input.len() {
                *enforcing_abs = true;
                continue;
            }
            return Ok(true);
        }
    }

    fn is_bare_g53(code: &Code) -> bool {
        code.kind == CodeKind::GCode
            && code.major_number == Some(53)
            && code.minor_number.is_none()
            && code.parameters.is_empty()
    }

    /// Parse exactly one code. Returns `Ok(false)` at end of input. When this
    /// returns with `in_line` still set, a sibling code follows on the same
    /// physical line.
    fn parse_one(&mut self, code: &mut Code, enforcing_abs: &mut bool) -> Result<bool, ParseError> {
        if self.pos >= self.input.len() && !self.in_line {
            return Ok(false);
        }
        if !self.in_line {
            self.start_line()?;
        }
        code.indent = self.line_indent;
        code.line_number = self.line_number;
        if *enforcing_abs {
            code.flags.insert(CodeFlags::ENFORCE_ABSOLUTE_POSITION);
        }

        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else {
                // End of input ends the line and the pending code.
                self.in_line = false;
                return Ok(true);
            };
            match c {
                b'\n' | b'\r' => {
                    self.end_line(enforcing_abs);
                    return Ok(true);
                }
                b';' => self.read_line_comment(code),
                b'(' => self.read_paren_comment(code),
                _ => {
                    if code.major_number.is_none() && code.keyword.is_none() {
                        if self.read_command(code, enforcing_abs)? {
                            // Keyword codes consume the rest of the line.
                            return Ok(true);
                        }
                    } else if matches!(c, b'G' | b'g' | b'M' | b'm') {
                        // A sibling code begins on the same physical line.
                        // `T` is not a boundary here: it is a parameter of
                        // codes like M104 or M569.
                        return Ok(true);
                    } else if c.is_ascii_alphabetic() {
                        self.read_parameter(code)?;
                    } else {
                        return Err(ParseError::new(
                            self.pos,
                            format!("unexpected character {:?}", self.peek_char()),
                        ));
                    }
                }
            }
        }
    }

    // ── Line bookkeeping ────────────────────────────────────────────────

    /// Consume the line prelude: indentation and an optional `N` line number.
    /// Both apply to every code produced from this physical line.
    fn start_line(&mut self) -> Result<(), ParseError> {
        let bytes = self.input.as_bytes();
        let mut indent: u8 = 0;
        while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t') {
            indent = indent.saturating_add(1);
            self.pos += 1;
        }
        self.line_indent = indent;
        self.line_number = None;
        self.in_line = true;

        if matches!(self.peek(), Some(b'N' | b'n'))
            && bytes.get(self.pos + 1).is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;
            let start = self.pos;
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            let number = self.input[start..self.pos]
                .parse()
                .map_err(|_| ParseError::new(start, "line number out of range"))?;
            self.line_number = Some(number);
        }
        Ok(())
    }

    /// Consume a line break (`\n`, `\r\n`, or lone `\r`) and reset the
    /// per-line state, including the `G53` carry.
    fn end_line(&mut self, enforcing_abs: &mut bool) {
        let bytes = self.input.as_bytes();
        if self.pos < bytes.len() && bytes[self.pos] == b'\r' {
            self.pos += 1;
        }
        if self.pos < bytes.len() && bytes[self.pos] == b'\n' {
            self.pos += 1;
        }
        self.in_line = false;
        *enforcing_abs = false;
    }

    // ── Commands and keywords ───────────────────────────────────────────

    /// Parse the command head at the current position: a keyword or a
    /// `G`/`M`/`T` letter with its number. Returns `Ok(true)` when a keyword
    /// consumed the rest of the line.
    fn read_command(&mut self, code: &mut Code, enforcing_abs: &mut bool) -> Result<bool, ParseError> {
        let bytes = self.input.as_bytes();
        let c = bytes[self.pos];

        // Keywords are case-sensitive lowercase words. A single lowercase
        // g/m/t falls through to the type-letter path.
        if c.is_ascii_lowercase() {
            let start = self.pos;
            let mut end = self.pos;
            while end < bytes.len() && bytes[end].is_ascii_lowercase() {
                end += 1;
            }
            let word = &self.input[start..end];
            if let Some(keyword) = Keyword::from_word(word) {
                self.pos = end;
                code.kind = CodeKind::Keyword;
                code.keyword = Some(keyword);
                self.read_keyword_body(code, keyword, enforcing_abs)?;
                return Ok(true);
            }
            if word.len() > 1 || !matches!(c, b'g' | b'm' | b't') {
                return Err(ParseError::new(start, format!("unexpected token {word:?}")));
            }
        }

        code.kind = match c.to_ascii_uppercase() {
            b'G' => CodeKind::GCode,
            b'M' => CodeKind::MCode,
            b'T' => CodeKind::TCode,
            _ => {
                return Err(ParseError::new(
                    self.pos,
                    format!("unexpected character {:?}", self.peek_char()),
                ));
            }
        };
        self.pos += 1;

        if self.peek() == Some(b'-') {
            return Err(ParseError::new(
                self.pos,
                "command number must not be negative",
            ));
        }
        code.major_number = Some(self.read_number("command number")?);
        if self.peek() == Some(b'.') {
            self.pos += 1;
            code.minor_number = Some(self.read_number("minor command number")?);
        }

        if code.kind == CodeKind::MCode
            && code.minor_number.is_none()
            && code
                .major_number
                .is_some_and(|n| UNPRECEDENTED_MCODES.contains(&n))
        {
            self.read_unprecedented(code)?;
        }
        Ok(false)
    }

    /// Capture a keyword's argument: the rest of the line minus comments,
    /// with quoted sections passed through verbatim.
    fn read_keyword_body(
        &mut self,
        code: &mut Code,
        keyword: Keyword,
        enforcing_abs: &mut bool,
    ) -> Result<(), ParseError> {
        self.skip_spaces();
        let arg_offset = self.pos;
        let mut argument = String::new();
        let mut in_quotes = false;
        loop {
            let remainder = &self.input[self.pos..];
            let Some(c) = remainder.chars().next() else {
                break;
            };
            if in_quotes {
                if c == '"' {
                    if remainder[1..].starts_with('"') {
                        argument.push_str("\"\"");
                        self.pos += 2;
                        continue;
                    }
                    in_quotes = false;
                }
                argument.push(c);
                self.pos += c.len_utf8();
            } else {
                match c {
                    '\n' | '\r' => break,
                    ';' => {
                        self.read_line_comment(code);
                        break;
                    }
                    '(' => self.read_paren_comment(code),
                    '"' => {
                        in_quotes = true;
                        argument.push('"');
                        self.pos += 1;
                    }
                    _ => {
                        argument.push(c);
                        self.pos += c.len_utf8();
                    }
                }
            }
        }
        if self.at_line_break() {
            self.end_line(enforcing_abs);
        } else {
            self.in_line = false;
        }

        let trimmed = argument.trim();
        if keyword.takes_argument() {
            code.keyword_argument = Some(trimmed.to_string());
        } else if !trimmed.is_empty() {
            return Err(ParseError::new(
                arg_offset,
                format!("'{}' does not take an argument", keyword.word()),
            ));
        }
        Ok(())
    }

    /// Capture the unstructured trailing argument of codes like `M32`: one
    /// quoted string (outer quotes stripped, `""` collapsed), or the verbatim
    /// remainder of the line up to a `;` comment with outer whitespace
    /// removed.
    fn read_unprecedented(&mut self, code: &mut Code) -> Result<(), ParseError> {
        self.skip_spaces();
        let Some(c) = self.peek() else {
            return Ok(());
        };
        if matches!(c, b'\n' | b'\r' | b';' | b'(') {
            return Ok(());
        }
        if c == b'"' {
            let value = self.read_quoted()?;
            code.parameters.push(Parameter::new_string('@', value));
            return Ok(());
        }
        let bytes = self.input.as_bytes();
        let start = self.pos;
        while self.pos < bytes.len() && !matches!(bytes[self.pos], b'\n' | b'\r' | b';') {
            self.pos += 1;
        }
        let text = self.input[start..self.pos].trim_end();
        code.parameters.push(Parameter::new('@', text));
        Ok(())
    }

    // ── Parameters ──────────────────────────────────────────────────────

    /// Parse one `<letter><value?>` parameter at the current position.
    fn read_parameter(&mut self, code: &mut Code) -> Result<(), ParseError> {
        let letter = self.input.as_bytes()[self.pos] as char;
        self.pos += 1;
        match self.peek() {
            Some(b'"') => {
                let value = self.read_quoted()?;
                code.parameters.push(Parameter::new_string(letter, value));
            }
            Some(b'{') => {
                let value = self.read_expression()?;
                code.parameters.push(Parameter::new(letter, value));
            }
            _ => {
                // The value runs until the next parameter letter, separator,
                // comment, or end of line. A letter directly after another
                // (bare letter groups like `G92 XYZ`) therefore yields an
                // empty value, which coerces to numeric 0.
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_whitespace()
                        || c.is_ascii_alphabetic()
                        || matches!(c, b';' | b'(' | b'"' | b'{')
                    {
                        break;
                    }
                    self.pos += 1;
                }
                code.parameters
                    .push(Parameter::new(letter, &self.input[start..self.pos]));
            }
        }
        Ok(())
    }

    /// Decode a `"..."` string literal at the current position. Doubled `""`
    /// quotes collapse into one embedded quote.
    fn read_quoted(&mut self) -> Result<String, ParseError> {
        let open = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let remainder = &self.input[self.pos..];
            let Some(c) = remainder.chars().next() else {
                return Err(ParseError::new(open, "unterminated string literal"));
            };
            match c {
                '"' => {
                    if remainder[1..].starts_with('"') {
                        value.push('"');
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(value);
                    }
                }
                '\n' | '\r' => return Err(ParseError::new(open, "unterminated string literal")),
                _ => {
                    value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }

    /// Capture a `{...}` expression verbatim, including the braces. Nested
    /// braces are balanced and quoted sections inside are skipped.
    fn read_expression(&mut self) -> Result<String, ParseError> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        let mut in_quotes = false;
        while self.pos < bytes.len() {
            let c = bytes[self.pos];
            if in_quotes {
                if c == b'"' {
                    if bytes.get(self.pos + 1) == Some(&b'"') {
                        self.pos += 1;
                    } else {
                        in_quotes = false;
                    }
                }
            } else {
                match c {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            self.pos += 1;
                            return Ok(self.input[start..self.pos].to_string());
                        }
                    }
                    b'"' => in_quotes = true,
                    b'\n' | b'\r' => break,
                    _ => {}
                }
            }
            self.pos += 1;
        }
        Err(ParseError::new(start, "unterminated expression"))
    }

    // ── Comments ────────────────────────────────────────────────────────

    /// A `;` comment: everything up to the line break, verbatim.
    fn read_line_comment(&mut self, code: &mut Code) {
        let bytes = self.input.as_bytes();
        self.pos += 1;
        let start = self.pos;
        while self.pos < bytes.len() && !matches!(bytes[self.pos], b'\n' | b'\r') {
            self.pos += 1;
        }
        code.append_comment(&self.input[start..self.pos]);
        if code.kind == CodeKind::None {
            code.kind = CodeKind::Comment;
        }
    }

    /// A `(...)` inline comment with the parens stripped. An unterminated
    /// paren comment extends to the end of the line.
    fn read_paren_comment(&mut self, code: &mut Code) {
        let bytes = self.input.as_bytes();
        self.pos += 1;
        let start = self.pos;
        while self.pos < bytes.len() && !matches!(bytes[self.pos], b')' | b'\n' | b'\r') {
            self.pos += 1;
        }
        let end = self.pos;
        if self.pos < bytes.len() && bytes[self.pos] == b')' {
            self.pos += 1;
        }
        code.append_comment(&self.input[start..end]);
        if code.kind == CodeKind::None {
            code.kind = CodeKind::Comment;
        }
    }

    // ── Cursor helpers ──────────────────────────────────────────────────

    fn skip_spaces(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t') {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn at_line_break(&self) -> bool {
        matches!(self.peek(), Some(b'\n' | b'\r'))
    }

    fn read_number(&mut self, what: &str) -> Result<u32, ParseError> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ParseError::new(start, format!("expected {what}")));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| ParseError::new(start, format!("{what} out of range")))
    }
}
