use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::parameter::Parameter;

/// Classification of a parsed code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    /// An empty line with no content.
    #[default]
    None,
    /// A line carrying only a comment.
    Comment,
    /// A `G` code (motion and coordinate system commands).
    GCode,
    /// An `M` code (machine and miscellaneous commands).
    MCode,
    /// A `T` code (tool selection).
    TCode,
    /// A structured-programming keyword (`if`, `while`, `var`, ...).
    Keyword,
}

/// Structured-programming keywords understood by the command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    /// `if <condition>`
    If,
    /// `elif <condition>`
    ElseIf,
    /// `else`
    Else,
    /// `while <condition>`
    While,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return <expression>`
    Return,
    /// `abort <message>`
    Abort,
    /// `var <name> = <expression>`
    Var,
    /// `set <name> = <expression>`
    Set,
}

impl Keyword {
    /// Look up a keyword from its source word. Keywords are case-sensitive
    /// lowercase.
    pub fn from_word(word: &str) -> Option<Keyword> {
        match word {
            "if" => Some(Keyword::If),
            "elif" => Some(Keyword::ElseIf),
            "else" => Some(Keyword::Else),
            "while" => Some(Keyword::While),
            "break" => Some(Keyword::Break),
            "continue" => Some(Keyword::Continue),
            "return" => Some(Keyword::Return),
            "abort" => Some(Keyword::Abort),
            "var" => Some(Keyword::Var),
            "set" => Some(Keyword::Set),
            _ => None,
        }
    }

    /// The source word for this keyword.
    pub fn word(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::ElseIf => "elif",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Return => "return",
            Keyword::Abort => "abort",
            Keyword::Var => "var",
            Keyword::Set => "set",
        }
    }

    /// Whether this keyword is followed by an argument.
    ///
    /// `else`, `break`, and `continue` stand alone; everything else carries
    /// the remainder of the line (possibly empty).
    pub fn takes_argument(self) -> bool {
        !matches!(self, Keyword::Else | Keyword::Break | Keyword::Continue)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.word())
    }
}

/// Bitset of per-code markers.
///
/// Flags are combined with `|` and queried with [`CodeFlags::contains`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeFlags(u8);

impl CodeFlags {
    /// No flags set.
    pub const NONE: CodeFlags = CodeFlags(0);
    /// The code was preceded by a `G53` on the same physical line and must be
    /// executed in absolute (machine) coordinates.
    pub const ENFORCE_ABSOLUTE_POSITION: CodeFlags = CodeFlags(1);
    /// The code originates from a macro file rather than a live stream.
    pub const IS_FROM_MACRO: CodeFlags = CodeFlags(1 << 1);
    /// The code may complete asynchronously.
    pub const ASYNCHRONOUS: CodeFlags = CodeFlags(1 << 2);

    /// Whether all flags in `other` are set.
    pub fn contains(self, other: CodeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set all flags in `other`.
    pub fn insert(&mut self, other: CodeFlags) {
        self.0 |= other.0;
    }

    /// Clear all flags in `other`.
    pub fn remove(&mut self, other: CodeFlags) {
        self.0 &= !other.0;
    }

    /// Whether no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CodeFlags {
    type Output = CodeFlags;

    fn bitor(self, rhs: CodeFlags) -> CodeFlags {
        CodeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for CodeFlags {
    fn bitor_assign(&mut self, rhs: CodeFlags) {
        self.0 |= rhs.0;
    }
}

/// A single parsed command.
///
/// Codes are transient: the tokenizer clears and refills a caller-owned
/// instance via [`Code::reset`], so hot paths (like footer scans) can parse
/// without a per-code allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Code {
    /// The `N…` line number prefix, when present. Shared by all codes
    /// produced from the same physical line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    /// Count of leading spaces and tabs (a tab counts as one). Measured once
    /// per physical line and applied to every code from that line.
    pub indent: u8,
    /// The classification of this code.
    pub kind: CodeKind,
    /// The keyword, when `kind` is [`CodeKind::Keyword`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<Keyword>,
    /// Trimmed text following the keyword. `Some("")` when the keyword takes
    /// an argument but none was given; `None` when it takes none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_argument: Option<String>,
    /// The command number (e.g. `1` in `G1`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_number: Option<u32>,
    /// Digits after a decimal point in the command number (e.g. `6` in `G54.6`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_number: Option<u32>,
    /// Parameters in source order. Letters need not be unique.
    pub parameters: Vec<Parameter>,
    /// Joined comment text: `(...)` contents followed by anything after `;`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Per-code markers.
    pub flags: CodeFlags,
}

impl Code {
    /// Create an empty code.
    pub fn new() -> Code {
        Code::default()
    }

    /// Clear every field so the instance can be refilled by the tokenizer.
    /// Keeps the parameter vector's allocation.
    pub fn reset(&mut self) {
        self.line_number = None;
        self.indent = 0;
        self.kind = CodeKind::None;
        self.keyword = None;
        self.keyword_argument = None;
        self.major_number = None;
        self.minor_number = None;
        self.parameters.clear();
        self.comment = None;
        self.flags = CodeFlags::NONE;
    }

    /// Whether this code carries no content at all (a blank line).
    pub fn is_empty(&self) -> bool {
        self.kind == CodeKind::None
            && self.comment.is_none()
            && self.line_number.is_none()
            && self.parameters.is_empty()
    }

    /// The first parameter with the given letter (compared case-insensitively).
    pub fn parameter(&self, letter: char) -> Option<&Parameter> {
        let letter = letter.to_ascii_uppercase();
        self.parameters.iter().find(|p| p.letter() == letter)
    }

    /// Whether a parameter with the given letter exists.
    pub fn has_parameter(&self, letter: char) -> bool {
        self.parameter(letter).is_some()
    }

    /// The unstructured trailing argument of codes like `M32 some file.g`,
    /// stored by the tokenizer as a parameter with letter `@`.
    pub fn unprecedented_string(&self) -> Option<&str> {
        self.parameter('@').map(Parameter::raw)
    }

    /// Append comment text. Segments are concatenated without a separator so
    /// `(some nice)` followed by `; comment` joins to `some nice comment`.
    pub(crate) fn append_comment(&mut self, text: &str) {
        match &mut self.comment {
            Some(comment) => comment.push_str(text),
            None => self.comment = Some(text.to_string()),
        }
    }
}

impl fmt::Display for Code {
    /// Reconstruct a canonical text form of the code.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(n) = self.line_number {
            write!(f, "N{n}")?;
            wrote = true;
        }
        match self.kind {
            CodeKind::None | CodeKind::Comment => {}
            CodeKind::Keyword => {
                if wrote {
                    f.write_str(" ")?;
                }
                if let Some(keyword) = self.keyword {
                    f.write_str(keyword.word())?;
                    if let Some(argument) = &self.keyword_argument
                        && !argument.is_empty()
                    {
                        write!(f, " {argument}")?;
                    }
                }
                wrote = true;
            }
            CodeKind::GCode | CodeKind::MCode | CodeKind::TCode => {
                if wrote {
                    f.write_str(" ")?;
                }
                let letter = match self.kind {
                    CodeKind::GCode => 'G',
                    CodeKind::MCode => 'M',
                    _ => 'T',
                };
                write!(f, "{letter}")?;
                if let Some(major) = self.major_number {
                    write!(f, "{major}")?;
                }
                if let Some(minor) = self.minor_number {
                    write!(f, ".{minor}")?;
                }
                wrote = true;
            }
        }
        for parameter in &self.parameters {
            if wrote {
                f.write_str(" ")?;
            }
            write!(f, "{parameter}")?;
            wrote = true;
        }
        if let Some(comment) = &self.comment {
            if wrote {
                f.write_str(" ")?;
            }
            write!(f, ";{comment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_words_round_trip() {
        for word in [
            "if", "elif", "else", "while", "break", "continue", "return", "abort", "var", "set",
        ] {
            let keyword = Keyword::from_word(word).unwrap();
            assert_eq!(keyword.word(), word);
        }
        assert_eq!(Keyword::from_word("echo"), None);
        assert_eq!(Keyword::from_word("IF"), None);
    }

    #[test]
    fn bare_keywords_take_no_argument() {
        assert!(!Keyword::Else.takes_argument());
        assert!(!Keyword::Break.takes_argument());
        assert!(!Keyword::Continue.takes_argument());
        assert!(Keyword::If.takes_argument());
        assert!(Keyword::Set.takes_argument());
    }

    #[test]
    fn flags_insert_remove_contains() {
        let mut flags = CodeFlags::NONE;
        assert!(flags.is_empty());
        flags.insert(CodeFlags::ENFORCE_ABSOLUTE_POSITION);
        flags.insert(CodeFlags::IS_FROM_MACRO);
        assert!(flags.contains(CodeFlags::ENFORCE_ABSOLUTE_POSITION));
        assert!(flags.contains(CodeFlags::ENFORCE_ABSOLUTE_POSITION | CodeFlags::IS_FROM_MACRO));
        assert!(!flags.contains(CodeFlags::ASYNCHRONOUS));
        flags.remove(CodeFlags::IS_FROM_MACRO);
        assert!(!flags.contains(CodeFlags::IS_FROM_MACRO));
    }

    #[test]
    fn reset_clears_everything() {
        let mut code = Code {
            line_number: Some(10),
            indent: 4,
            kind: CodeKind::GCode,
            major_number: Some(1),
            minor_number: Some(2),
            comment: Some("x".into()),
            flags: CodeFlags::ENFORCE_ABSOLUTE_POSITION,
            ..Code::default()
        };
        code.parameters.push(Parameter::new('X', "5"));
        code.reset();
        assert_eq!(code, Code::default());
        assert!(code.is_empty());
    }

    #[test]
    fn display_reconstructs_command() {
        let mut code = Code {
            line_number: Some(123),
            kind: CodeKind::GCode,
            major_number: Some(54),
            minor_number: Some(6),
            ..Code::default()
        };
        code.parameters.push(Parameter::new('X', "5"));
        code.parameters.push(Parameter::new_string('C', "a \" b"));
        code.comment = Some(" done".into());
        assert_eq!(code.to_string(), "N123 G54.6 X5 C\"a \"\" b\" ; done");
    }

    #[test]
    fn code_serde_round_trip() {
        let mut code = Code {
            line_number: Some(3),
            kind: CodeKind::MCode,
            major_number: Some(106),
            flags: CodeFlags::ENFORCE_ABSOLUTE_POSITION,
            ..Code::default()
        };
        code.parameters.push(Parameter::new_string('C', "fan"));
        let json = serde_json::to_string(&code).unwrap();
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }

    #[test]
    fn display_keyword() {
        let code = Code {
            kind: CodeKind::Keyword,
            keyword: Some(Keyword::If),
            keyword_argument: Some("sensors.probes[0].value < 2".into()),
            ..Code::default()
        };
        assert_eq!(code.to_string(), "if sensors.probes[0].value < 2");
    }
}
