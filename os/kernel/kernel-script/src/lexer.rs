//! Tokenizer for the script dialect.

use crate::source::Span;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Number(f64),
    Str(Rc<str>),
    /// Identifiers and keywords alike; the parser tells them apart.
    Ident(Rc<str>),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub tok: Tok,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Longest first, so that the first prefix match wins.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "===", "!==", ">>>", "<<=", ">>=", "==", "!=", "<=", ">=", "&&", "||", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "{", "}", "(", ")", "[", "]", ";",
    ",", ".", ":", "?", "+", "-", "*", "/", "%", "<", ">", "=", "!", "~", "&", "|", "^",
];

pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        let newline_before = lexer.skip_trivia()?;
        let start = lexer.pos;
        let tok = lexer.next_tok()?;
        let done = tok == Tok::Eof;
        tokens.push(Token {
            tok,
            span: span(start, lexer.pos),
            newline_before,
        });
        if done {
            return Ok(tokens);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn span(start: usize, end: usize) -> Span {
    Span::new(start as u32, end as u32)
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, start: usize, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            span: span(start, self.pos.max(start + 1)),
        }
    }

    /// Skips whitespace and comments; reports whether a line break was seen.
    fn skip_trivia(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        while let Some(b) = self.peek() {
            match b {
                b'\n' => {
                    newline = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0B | 0x0C => self.pos += 1,
                b'/' if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            None => return Err(self.error(start, "unterminated comment")),
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(b) => {
                                newline |= b == b'\n';
                                self.pos += 1;
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(newline)
    }

    fn next_tok(&mut self) -> Result<Tok, LexError> {
        let Some(b) = self.peek() else {
            return Ok(Tok::Eof);
        };
        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            return self.number();
        }
        if b == b'"' || b == b'\'' {
            return self.string(b);
        }
        if is_ident_start(b) {
            let start = self.pos;
            while self.peek().is_some_and(is_ident_continue) {
                self.pos += 1;
            }
            return Ok(Tok::Ident(Rc::from(&self.text[start..self.pos])));
        }
        let rest = &self.text[self.pos..];
        if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            self.pos += p.len();
            return Ok(Tok::Punct(p));
        }
        let start = self.pos;
        let c = rest.chars().next().unwrap_or('\u{FFFD}');
        self.pos += c.len_utf8();
        Err(self.error(start, alloc::format!("unexpected character '{c}'")))
    }

    fn number(&mut self) -> Result<Tok, LexError> {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            return u64::from_str_radix(&self.text[digits..self.pos], 16)
                .map(|v| {
                    #[allow(clippy::cast_precision_loss)]
                    Tok::Number(v as f64)
                })
                .map_err(|_| self.error(start, "malformed hex literal"));
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error(start, "identifier directly after number"));
        }
        self.text[start..self.pos]
            .parse::<f64>()
            .map(Tok::Number)
            .map_err(|_| self.error(start, "malformed number"))
    }

    fn string(&mut self, quote: u8) -> Result<Tok, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.text[self.pos..].chars().next() else {
                return Err(self.error(start, "unterminated string literal"));
            };
            self.pos += c.len_utf8();
            match c {
                '\n' => return Err(self.error(start, "unterminated string literal")),
                '\\' => {
                    let Some(e) = self.text[self.pos..].chars().next() else {
                        return Err(self.error(start, "unterminated string literal"));
                    };
                    self.pos += e.len_utf8();
                    match e {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{C}'),
                        'v' => out.push('\u{B}'),
                        '0' => out.push('\0'),
                        'x' => out.push(self.hex_escape(2)?),
                        'u' => out.push(self.hex_escape(4)?),
                        '\n' => {}
                        other => out.push(other),
                    }
                }
                c if c as u32 == u32::from(quote) => break,
                c => out.push(c),
            }
        }
        Ok(Tok::Str(Rc::from(out)))
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LexError> {
        let start = self.pos;
        let end = self.pos + digits;
        let code = self
            .text
            .get(start..end)
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .ok_or_else(|| self.error(start, "malformed escape sequence"))?;
        self.pos = end;
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
    }
}

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

const fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<Tok> {
        tokenize(text).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn longest_punctuator_wins() {
        assert_eq!(
            toks("a >>>= b !== c"),
            [
                Tok::Ident("a".into()),
                Tok::Punct(">>>="),
                Tok::Ident("b".into()),
                Tok::Punct("!=="),
                Tok::Ident("c".into()),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            toks(r#"0x1F 2.5e1 'a\x41\n' "B""#),
            [
                Tok::Number(31.0),
                Tok::Number(25.0),
                Tok::Str("aA\n".into()),
                Tok::Str("B".into()),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn comments_mark_newlines() {
        let tokens = tokenize("a /* x\n */ b // c\nd").unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
        assert_eq!(flags, [false, true, true, false]);
    }

    #[test]
    fn unterminated_string_is_reported() {
        let err = tokenize("x = 'abc").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.span.start, 4);
    }
}
