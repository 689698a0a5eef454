use crate::code::Code;
use crate::tokenizer::{ParseError, Tokenizer};

/// Split a text blob into a lazy stream of codes.
///
/// Blank lines are skipped; comment-only codes are kept. A single `G53`
/// carry is shared across the whole blob, with physical-line boundaries
/// resetting it inside the tokenizer.
pub fn split_codes(input: &str) -> CodeStream<'_> {
    CodeStream {
        tokenizer: Tokenizer::new(input),
        enforcing_abs: false,
        done: false,
    }
}

/// Iterator over the codes of a text blob. See [`split_codes`].
///
/// A parse error ends the stream: partial results from the failed line are
/// discarded and subsequent calls return `None`.
#[derive(Debug)]
pub struct CodeStream<'a> {
    tokenizer: Tokenizer<'a>,
    enforcing_abs: bool,
    done: bool,
}

impl Iterator for CodeStream<'_> {
    type Item = Result<Code, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut code = Code::new();
        loop {
            match self.tokenizer.next_code(&mut code, &mut self.enforcing_abs) {
                Ok(true) => {
                    if code.is_empty() {
                        continue;
                    }
                    return Some(Ok(code));
                }
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::CodeKind;

    #[test]
    fn skips_blank_lines() {
        let codes: Vec<Code> = split_codes("G28\n\n\nG1 X5\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].major_number, Some(28));
        assert_eq!(codes[1].major_number, Some(1));
    }

    #[test]
    fn keeps_comment_codes() {
        let codes: Vec<Code> = split_codes("; header\nG28\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].kind, CodeKind::Comment);
    }

    #[test]
    fn error_ends_the_stream() {
        let mut stream = split_codes("G28\n!bad\nG1\n");
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }
}
