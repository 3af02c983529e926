//! Lua lexer with trivia.
//!
//! Comments and blank lines are not discarded. A comment on the same line
//! as the token before it becomes that token's trailing comment; all other
//! trivia is collected and attached as leading trivia of the next token.
//! The end-of-file token carries whatever trivia follows the last token.

use crate::ast::{Comment, CommentKind, Trivia};
use crate::error::ParseError;
use lua_inliner_diagnostics::{FileId, Span};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Eof,

    Name(String),
    /// Numeral as written.
    Number(String),
    /// String literal as written, including its delimiters.
    String(String),

    // Keywords
    And,
    Break,
    Do,
    Else,
    Elseif,
    End,
    False,
    For,
    Function,
    Goto,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Caret,
    Hash,
    Ampersand,
    Tilde,
    Pipe,
    ShiftLeft,
    ShiftRight,
    Eq,
    NotEq,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    Assign,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    DoubleColon,
    Semicolon,
    Colon,
    Comma,
    Dot,
    DotDot,
    DotDotDot,
}

impl TokenKind {
    fn keyword(name: &str) -> Option<TokenKind> {
        Some(match name {
            "and" => TokenKind::And,
            "break" => TokenKind::Break,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "elseif" => TokenKind::Elseif,
            "end" => TokenKind::End,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "goto" => TokenKind::Goto,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "local" => TokenKind::Local,
            "nil" => TokenKind::Nil,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "repeat" => TokenKind::Repeat,
            "return" => TokenKind::Return,
            "then" => TokenKind::Then,
            "true" => TokenKind::True,
            "until" => TokenKind::Until,
            "while" => TokenKind::While,
            _ => return None,
        })
    }

    fn text(&self) -> &str {
        match self {
            TokenKind::Eof => "<eof>",
            TokenKind::Name(text) | TokenKind::Number(text) | TokenKind::String(text) => text,
            TokenKind::And => "and",
            TokenKind::Break => "break",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::Elseif => "elseif",
            TokenKind::End => "end",
            TokenKind::False => "false",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::Goto => "goto",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::Local => "local",
            TokenKind::Nil => "nil",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Repeat => "repeat",
            TokenKind::Return => "return",
            TokenKind::Then => "then",
            TokenKind::True => "true",
            TokenKind::Until => "until",
            TokenKind::While => "while",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Hash => "#",
            TokenKind::Ampersand => "&",
            TokenKind::Tilde => "~",
            TokenKind::Pipe => "|",
            TokenKind::ShiftLeft => "<<",
            TokenKind::ShiftRight => ">>",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "~=",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Assign => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::DoubleColon => "::",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::DotDotDot => "...",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub leading: Vec<Trivia>,
    pub trailing: Option<Comment>,
}

/// Output of [`tokenize`].
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Always ends with an [`TokenKind::Eof`] token.
    pub tokens: Vec<Token>,
    /// Every comment in source order.
    pub comments: Vec<Comment>,
}

const PUNCTUATION: [(&str, TokenKind); 33] = [
    ("...", TokenKind::DotDotDot),
    ("..", TokenKind::DotDot),
    ("==", TokenKind::Eq),
    ("~=", TokenKind::NotEq),
    ("<=", TokenKind::LessEq),
    (">=", TokenKind::GreaterEq),
    ("<<", TokenKind::ShiftLeft),
    (">>", TokenKind::ShiftRight),
    ("//", TokenKind::DoubleSlash),
    ("::", TokenKind::DoubleColon),
    (".", TokenKind::Dot),
    ("=", TokenKind::Assign),
    ("~", TokenKind::Tilde),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("/", TokenKind::Slash),
    (":", TokenKind::Colon),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("%", TokenKind::Percent),
    ("^", TokenKind::Caret),
    ("#", TokenKind::Hash),
    ("&", TokenKind::Ampersand),
    ("|", TokenKind::Pipe),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
];

/// Split `source` into tokens with attached trivia.
pub fn tokenize(source: &str, file_id: FileId) -> Result<Tokens, ParseError> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        file_id,
        tokens: Vec::new(),
        comments: Vec::new(),
        pending: Vec::new(),
        same_line: false,
        line_has_content: false,
    };
    lexer.run()?;
    Ok(Tokens {
        tokens: lexer.tokens,
        comments: lexer.comments,
    })
}

struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
    file_id: FileId,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    /// Leading trivia for the next token.
    pending: Vec<Trivia>,
    /// No line break since the last token.
    same_line: bool,
    line_has_content: bool,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<(), ParseError> {
        if self.bytes.first() == Some(&b'#') {
            let end = self.line_end(0);
            self.add_comment(0, end, CommentKind::Shebang);
        }

        while let Some(b) = self.peek(0) {
            match b {
                b'\n' => {
                    self.end_line();
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'-' if self.peek(1) == Some(b'-') => self.comment()?,
                _ => self.token()?,
            }
        }

        let end = self.source.len() as u32;
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.file_id, end, end),
            leading: std::mem::take(&mut self.pending),
            trailing: None,
        });
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn span(&self, start: usize) -> Span {
        Span::new(self.file_id, start as u32, self.pos as u32)
    }

    fn end_line(&mut self) {
        if !self.line_has_content && self.pending.last() != Some(&Trivia::BlankLine) {
            self.pending.push(Trivia::BlankLine);
        }
        self.line_has_content = false;
        self.same_line = false;
    }

    /// Offset of the next `\n` at or after `from`, or the end of input.
    fn line_end(&self, from: usize) -> usize {
        self.source[from..]
            .find('\n')
            .map_or(self.source.len(), |i| from + i)
    }

    /// `[[`, `[=[`, ... starting at the current position; returns the level.
    fn long_bracket_level(&self, offset: usize) -> Option<usize> {
        if self.peek(offset) != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek(offset + 1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek(offset + 1 + level) == Some(b'[')).then_some(level)
    }

    /// Consume a long bracket of `level` whose opener starts at the current
    /// position. Returns `false` if it is never closed.
    fn skip_long_bracket(&mut self, level: usize) -> bool {
        let close = format!("]{}]", "=".repeat(level));
        let body = self.pos + level + 2;
        match self.source[body..].find(&close) {
            Some(i) => {
                self.pos = body + i + close.len();
                true
            }
            None => {
                self.pos = self.source.len();
                false
            }
        }
    }

    fn add_comment(&mut self, start: usize, end: usize, kind: CommentKind) {
        self.pos = end;
        let text = self.source[start..end].trim_end_matches('\r').to_string();
        let comment = Comment {
            text,
            kind,
            span: self.span(start),
        };
        self.comments.push(comment.clone());

        match self.tokens.last_mut() {
            Some(prev) if self.same_line && prev.trailing.is_none() => {
                prev.trailing = Some(comment);
            }
            _ => self.pending.push(Trivia::Comment(comment)),
        }
        self.line_has_content = true;
    }

    fn comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        if let Some(level) = self.long_bracket_level(2) {
            self.pos += 2;
            if !self.skip_long_bracket(level) {
                return Err(ParseError::UnfinishedLongComment {
                    span: self.span(start),
                });
            }
            let end = self.pos;
            self.add_comment(start, end, CommentKind::Block);
        } else {
            let end = self.line_end(start);
            self.add_comment(start, end, CommentKind::Line);
        }
        Ok(())
    }

    fn token(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let b = self.bytes[start];

        let kind = if b.is_ascii_alphabetic() || b == b'_' {
            while matches!(self.peek(0), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                self.pos += 1;
            }
            let word = &self.source[start..self.pos];
            TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Name(word.to_string()))
        } else if b.is_ascii_digit()
            || (b == b'.' && matches!(self.peek(1), Some(c) if c.is_ascii_digit()))
        {
            self.number()?
        } else if b == b'"' || b == b'\'' {
            self.short_string(b)?
        } else if let Some(level) = self.long_bracket_level(0) {
            if !self.skip_long_bracket(level) {
                return Err(ParseError::UnfinishedLongString {
                    span: self.span(start),
                });
            }
            TokenKind::String(self.source[start..self.pos].to_string())
        } else {
            let rest = &self.source[start..];
            let Some((text, kind)) = PUNCTUATION
                .iter()
                .find(|(text, _)| rest.starts_with(text))
            else {
                let ch = rest.chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::UnexpectedCharacter {
                    ch,
                    span: Span::new(
                        self.file_id,
                        start as u32,
                        (start + ch.len_utf8()) as u32,
                    ),
                });
            };
            self.pos += text.len();
            kind.clone()
        };

        self.tokens.push(Token {
            kind,
            span: self.span(start),
            leading: std::mem::take(&mut self.pending),
            trailing: None,
        });
        self.same_line = true;
        self.line_has_content = true;
        Ok(())
    }

    fn number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let hex = matches!(
            &self.source[start..self.source.len().min(start + 2)],
            "0x" | "0X"
        );
        let exponent = if hex { b'p' } else { b'e' };
        if hex {
            self.pos += 2;
        }

        while let Some(c) = self.peek(0) {
            if c.to_ascii_lowercase() == exponent && matches!(self.peek(1), Some(b'+' | b'-')) {
                self.pos += 2;
            } else if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = &self.source[start..self.pos];
        if is_valid_numeral(text) {
            Ok(TokenKind::Number(text.to_string()))
        } else {
            Err(ParseError::MalformedNumber {
                text: text.to_string(),
                span: self.span(start),
            })
        }
    }

    fn short_string(&mut self, quote: u8) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => {
                    return Err(ParseError::UnfinishedString {
                        span: self.span(start),
                    })
                }
                Some(b'\\') => {
                    let escaped = self.peek(1);
                    self.pos += 2;
                    if escaped == Some(b'z') {
                        while matches!(self.peek(0), Some(c) if c.is_ascii_whitespace()) {
                            self.pos += 1;
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(TokenKind::String(self.source[start..self.pos].to_string()))
    }
}

fn is_valid_numeral(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let (digits, exponent_marker, is_digit): (&str, char, fn(&u8) -> bool) =
        match lower.strip_prefix("0x") {
            Some(rest) => (rest, 'p', u8::is_ascii_hexdigit),
            None => (lower.as_str(), 'e', u8::is_ascii_digit),
        };
    let (mantissa, exponent) = match digits.split_once(exponent_marker) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (digits, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mantissa_ok = !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| is_digit(&b))
        && frac.bytes().all(|b| is_digit(&b));
    let exponent_ok = exponent.map_or(true, |exponent| {
        let exponent = exponent
            .strip_prefix(['+', '-'])
            .unwrap_or(exponent);
        !exponent.is_empty() && exponent.bytes().all(|b| b.is_ascii_digit())
    });
    mantissa_ok && exponent_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, FileId(0))
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_names_and_operators() {
        assert_eq!(
            kinds("local x = a.b..c // 2 ~= ..."),
            vec![
                TokenKind::Local,
                TokenKind::Name("x".into()),
                TokenKind::Assign,
                TokenKind::Name("a".into()),
                TokenKind::Dot,
                TokenKind::Name("b".into()),
                TokenKind::DotDot,
                TokenKind::Name("c".into()),
                TokenKind::DoubleSlash,
                TokenKind::Number("2".into()),
                TokenKind::NotEq,
                TokenKind::DotDotDot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        for numeral in ["3", "3.0", "3.1416", "314.16e-2", "0.31416E1", "34e1", "0x0.1E", "0xA23p-4", "0X1.921FB54442D18P+1", ".5"] {
            assert_eq!(kinds(numeral)[0], TokenKind::Number(numeral.into()), "{numeral}");
        }
        assert!(matches!(
            tokenize("3..2", FileId(0)),
            Err(ParseError::MalformedNumber { .. })
        ));
        assert!(matches!(
            tokenize("12abc", FileId(0)),
            Err(ParseError::MalformedNumber { .. })
        ));
    }

    #[test]
    fn test_strings_keep_their_delimiters() {
        assert_eq!(
            kinds(r#"'a\'b' "c\"d" [==[x]]y]==]"#),
            vec![
                TokenKind::String(r"'a\'b'".into()),
                TokenKind::String(r#""c\"d""#.into()),
                TokenKind::String("[==[x]]y]==]".into()),
                TokenKind::Eof,
            ]
        );
        assert!(matches!(
            tokenize("x = 'abc\n'", FileId(0)),
            Err(ParseError::UnfinishedString { .. })
        ));
        assert!(matches!(
            tokenize("x = [[abc", FileId(0)),
            Err(ParseError::UnfinishedLongString { .. })
        ));
    }

    #[test]
    fn test_trailing_comment_belongs_to_previous_token() {
        let lexed = tokenize("local a = 1 -- one\n-- two\nb = 2", FileId(0)).unwrap();
        let one = &lexed.tokens[3];
        assert_eq!(one.kind, TokenKind::Number("1".into()));
        assert_eq!(one.trailing.as_ref().map(|c| c.text.as_str()), Some("-- one"));

        let b = &lexed.tokens[4];
        assert_eq!(b.kind, TokenKind::Name("b".into()));
        assert_eq!(b.leading.len(), 1);
        assert_eq!(b.leading[0].as_comment().unwrap().text, "-- two");
        assert_eq!(lexed.comments.len(), 2);
    }

    #[test]
    fn test_blank_lines_collapse() {
        let lexed = tokenize("a()\n\n\n\nb()", FileId(0)).unwrap();
        let b = lexed
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::Name("b".into()))
            .unwrap();
        assert_eq!(b.leading, vec![Trivia::BlankLine]);
    }

    #[test]
    fn test_long_comment_and_shebang() {
        let lexed = tokenize("#!/usr/bin/lua\n--[==[ a\n ]] b ]==]\nx()", FileId(0)).unwrap();
        assert_eq!(lexed.comments[0].kind, CommentKind::Shebang);
        assert_eq!(lexed.comments[1].kind, CommentKind::Block);
        assert_eq!(lexed.comments[1].text, "--[==[ a\n ]] b ]==]");
        assert_eq!(lexed.tokens[0].leading.len(), 2);
        assert!(matches!(
            tokenize("--[[ never closed", FileId(0)),
            Err(ParseError::UnfinishedLongComment { .. })
        ));
    }

    #[test]
    fn test_dashes_inside_brackets_are_a_line_comment() {
        let lexed = tokenize("--[ not long\nx()", FileId(0)).unwrap();
        assert_eq!(lexed.comments[0].kind, CommentKind::Line);
        assert_eq!(lexed.comments[0].text, "--[ not long");
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("x = @", FileId(0)).unwrap_err();
        assert_eq!(err.to_string(), "unexpected character '@'");
    }
}
