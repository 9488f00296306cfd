//! Ritual lexer.
//!
//! `tokenize` is total: malformed input never fails here. Anything the lexer
//! does not recognize becomes an [`TokenKind::Unknown`] token and validity is
//! judged downstream by the semantic analyzer.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// `::school:operation`
    SchoolInvocation,
    /// `->`
    OutputBinding,
    /// `{`
    DataBlockStart,
    /// `}`
    DataBlockEnd,
    /// `"""`
    TripleQuote,
    /// `LANGUAGE[...]`, `PYTHON::`, `JAVASCRIPT::`, `JS::`
    LanguageParam,
    /// `WEB::selector`
    WebParam,
    /// `QUANTUM::...`
    QuantumParam,
    /// `///`
    CommentDoc,
    /// `//!?` hard stop
    CommentGuardian,
    /// `//!`
    CommentPrereq,
    /// `//<3`
    CommentLove,
    /// `//~`
    CommentDrift,
    /// `//*`
    CommentWild,
    /// `//`
    CommentStandard,
    /// Quoted literal; text holds the unescaped value
    String,
    Number,
    Identifier,
    Newline,
    Eof,
    Unknown,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::SchoolInvocation => "school_invocation",
            TokenKind::OutputBinding => "output_binding",
            TokenKind::DataBlockStart => "data_block_start",
            TokenKind::DataBlockEnd => "data_block_end",
            TokenKind::TripleQuote => "triple_quote",
            TokenKind::LanguageParam => "language_param",
            TokenKind::WebParam => "web_param",
            TokenKind::QuantumParam => "quantum_param",
            TokenKind::CommentDoc => "comment_doc",
            TokenKind::CommentGuardian => "comment_guardian",
            TokenKind::CommentPrereq => "comment_prereq",
            TokenKind::CommentLove => "comment_love",
            TokenKind::CommentDrift => "comment_drift",
            TokenKind::CommentWild => "comment_wild",
            TokenKind::CommentStandard => "comment_standard",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Identifier => "identifier",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "eof",
            TokenKind::Unknown => "unknown",
        }
    }

    /// Tokens that open a block in the parser.
    pub fn is_typed_param(self) -> bool {
        matches!(
            self,
            TokenKind::LanguageParam | TokenKind::WebParam | TokenKind::QuantumParam
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::CommentDoc
                | TokenKind::CommentGuardian
                | TokenKind::CommentPrereq
                | TokenKind::CommentLove
                | TokenKind::CommentDrift
                | TokenKind::CommentWild
                | TokenKind::CommentStandard
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte range of a token in the source (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<18} {:?} L{}:C{}",
            self.kind.as_str(),
            self.text,
            self.line,
            self.column
        )
    }
}

// ──────────────────────────────────────────────
// Scanner
// ──────────────────────────────────────────────

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            src,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Consume characters up to (not including) the next newline.
    fn take_to_eol(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn take_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.advance();
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn push(&mut self, kind: TokenKind, text: String, start: (usize, u32, u32)) {
        let (offset, line, column) = start;
        self.tokens.push(Token {
            kind,
            text,
            line,
            column,
            span: Span::new(offset, self.pos),
        });
    }

    /// Push a token whose text is exactly its source slice.
    fn push_raw(&mut self, kind: TokenKind, start: (usize, u32, u32)) {
        let text = self.src[start.0..self.pos].to_owned();
        self.push(kind, text, start);
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            // Insignificant whitespace; newlines are tokens
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
                continue;
            }

            let start = (self.pos, self.line, self.column);

            if c == '\n' {
                self.advance();
                self.push(TokenKind::Newline, "\n".to_owned(), start);
                continue;
            }

            if self.starts_with("::") {
                self.scan_invocation(start);
                continue;
            }

            if self.starts_with("->") {
                self.advance_by(2);
                self.push_raw(TokenKind::OutputBinding, start);
                continue;
            }

            match c {
                '{' => {
                    self.advance();
                    self.push_raw(TokenKind::DataBlockStart, start);
                    continue;
                }
                '}' => {
                    self.advance();
                    self.push_raw(TokenKind::DataBlockEnd, start);
                    continue;
                }
                _ => {}
            }

            if self.starts_with("\"\"\"") {
                self.advance_by(3);
                self.push_raw(TokenKind::TripleQuote, start);
                continue;
            }

            if c == '"' || c == '\'' {
                self.scan_string(c, start);
                continue;
            }

            // Any Unicode digit, so `²` and `٣` start numbers too
            if c.is_numeric() {
                self.scan_number(start);
                continue;
            }

            if self.starts_with("//") {
                self.scan_comment(start);
                continue;
            }

            if c.is_alphabetic() || c == '_' {
                self.scan_word(start);
                continue;
            }

            self.advance();
            self.push_raw(TokenKind::Unknown, start);
        }

        let end = (self.pos, self.line, self.column);
        self.push(TokenKind::Eof, String::new(), end);
        self.tokens
    }

    fn scan_invocation(&mut self, start: (usize, u32, u32)) {
        self.advance_by(2);
        self.take_identifier();
        if self.peek() != Some(':') {
            // `::school` without the operation half
            self.push_raw(TokenKind::Unknown, start);
            return;
        }
        self.advance();
        self.take_identifier();
        self.push_raw(TokenKind::SchoolInvocation, start);
    }

    fn scan_string(&mut self, quote: char, start: (usize, u32, u32)) {
        self.advance();
        let mut value = String::new();
        while let Some(c) = self.advance() {
            if c == quote {
                break;
            }
            if c != '\\' {
                value.push(c);
                continue;
            }
            match self.advance() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => break,
            }
        }
        self.push(TokenKind::String, value, start);
    }

    fn scan_number(&mut self, start: (usize, u32, u32)) {
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c == '.' {
                if seen_dot {
                    break;
                }
                seen_dot = true;
            } else if !c.is_numeric() {
                break;
            }
            self.advance();
        }
        self.push_raw(TokenKind::Number, start);
    }

    fn scan_comment(&mut self, start: (usize, u32, u32)) {
        // Longest sigil first; `//` always matches as the fallback.
        const SIGILS: [(&str, TokenKind); 6] = [
            ("//!?", TokenKind::CommentGuardian),
            ("//<3", TokenKind::CommentLove),
            ("///", TokenKind::CommentDoc),
            ("//!", TokenKind::CommentPrereq),
            ("//~", TokenKind::CommentDrift),
            ("//*", TokenKind::CommentWild),
        ];
        let kind = SIGILS
            .iter()
            .find(|(sigil, _)| self.starts_with(sigil))
            .map(|(_, kind)| *kind)
            .unwrap_or(TokenKind::CommentStandard);
        self.take_to_eol();
        self.push_raw(kind, start);
    }

    fn scan_word(&mut self, start: (usize, u32, u32)) {
        let word = self.take_identifier().to_ascii_uppercase();
        let double_colon = self.starts_with("::");

        match word.as_str() {
            "LANGUAGE" if self.peek() == Some('[') => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                    if c == ']' {
                        break;
                    }
                }
                self.push_raw(TokenKind::LanguageParam, start);
            }
            "WEB" if double_colon => {
                self.advance_by(2);
                while let Some(c) = self.peek() {
                    if c == '\n' || c == ' ' || c == ':' {
                        break;
                    }
                    self.advance();
                }
                self.push_raw(TokenKind::WebParam, start);
            }
            "QUANTUM" if double_colon => {
                self.advance_by(2);
                self.take_to_eol();
                self.push_raw(TokenKind::QuantumParam, start);
            }
            "PYTHON" | "JAVASCRIPT" | "JS" if double_colon => {
                self.advance_by(2);
                self.push_raw(TokenKind::LanguageParam, start);
            }
            _ => self.push_raw(TokenKind::Identifier, start),
        }
    }
}

/// Scan `src` into a token stream terminated by exactly one `Eof` token.
pub fn tokenize(src: &str) -> Vec<Token> {
    Scanner::new(src).run()
}
