//! Block parser: token stream -> [`ParseTree`].
//!
//! The grammar at this scope is a flat sequence of language-tagged segments.
//! A typed-parameter token opens a block and everything up to the next
//! typed-parameter token (or end of input) is that block's body. Parsing
//! never fails; unsupported tags are parse results for the analyzer to judge.

use crate::lexer::{Token, TokenKind};
use regex::Regex;
use std::sync::LazyLock;

/// Ritual id reported until rituals carry their own identifier.
pub const UNKNOWN_RITUAL_ID: &str = "unknown";

static LANG_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)lang\s*=\s*["'](\w+)["']"#).expect("static regex")
});

/// One contiguous language-tagged segment of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBlock {
    /// `<language>_block`, or `unknown_block`
    pub kind: String,
    pub language: String,
    pub body: String,
    /// Location of the tagging token
    pub line: u32,
    pub column: u32,
}

/// A `WEB::` or `QUANTUM::` tag that was recognized but produced no block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredBlock {
    pub language: &'static str,
    pub tag: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub ritual_id: String,
    pub blocks: Vec<ParseBlock>,
    pub deferred: Vec<DeferredBlock>,
}

/// How block body lines are rebuilt from tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reconstruction {
    /// Slice each line out of the original source. Byte-exact apart from
    /// trailing whitespace, and keeps indentation.
    #[default]
    Source,
    /// Join token texts heuristically; see [`reconstruct_line`]. Lossy.
    Tokens,
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    mode: Reconstruction,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: &'a [Token], mode: Reconstruction) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
            mode,
        }
    }

    /// Current token, or `None` once the stream is exhausted (or at `Eof`).
    fn cur(&self) -> Option<&'a Token> {
        self.tokens
            .get(self.pos)
            .filter(|t| t.kind != TokenKind::Eof)
    }

    fn skip_while(&mut self, pred: impl Fn(TokenKind) -> bool) {
        while self.cur().is_some_and(|t| pred(t.kind)) {
            self.pos += 1;
        }
    }

    fn parse_tree(mut self) -> ParseTree {
        let mut blocks = Vec::new();
        let mut deferred = Vec::new();

        self.skip_while(|k| {
            matches!(
                k,
                TokenKind::CommentDoc
                    | TokenKind::CommentStandard
                    | TokenKind::Newline
                    | TokenKind::Unknown
            )
        });

        while let Some(tok) = self.cur() {
            match tok.kind {
                TokenKind::LanguageParam => {
                    self.pos += 1;
                    blocks.push(self.parse_language_block(tok));
                }
                TokenKind::WebParam | TokenKind::QuantumParam => {
                    self.pos += 1;
                    deferred.push(DeferredBlock {
                        language: if tok.kind == TokenKind::WebParam {
                            "web"
                        } else {
                            "quantum"
                        },
                        tag: tok.text.clone(),
                        line: tok.line,
                        column: tok.column,
                    });
                }
                _ => self.pos += 1,
            }
        }

        ParseTree {
            ritual_id: UNKNOWN_RITUAL_ID.to_owned(),
            blocks,
            deferred,
        }
    }

    fn parse_language_block(&mut self, tag: &'a Token) -> ParseBlock {
        let language = infer_language(&tag.text);

        self.skip_while(|k| k == TokenKind::Newline);

        let mut lines: Vec<String> = Vec::new();
        let mut current: Vec<&Token> = Vec::new();
        while let Some(tok) = self.cur() {
            if tok.kind.is_typed_param() {
                break;
            }
            if tok.kind == TokenKind::Newline {
                lines.push(self.render_line(&current, tag));
                current.clear();
            } else {
                current.push(tok);
            }
            self.pos += 1;
        }
        if !current.is_empty() {
            lines.push(self.render_line(&current, tag));
        }

        let (kind, language) = match language {
            Some(lang) => (format!("{}_block", lang), lang),
            None => ("unknown_block".to_owned(), "unknown".to_owned()),
        };
        ParseBlock {
            kind,
            language,
            body: lines.join("\n"),
            line: tag.line,
            column: tag.column,
        }
    }

    fn render_line(&self, tokens: &[&Token], tag: &Token) -> String {
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return String::new();
        };
        if self.mode == Reconstruction::Tokens {
            return reconstruct_line(tokens);
        }
        // Code sharing the tag's line starts at its first token; otherwise
        // keep the line's indentation.
        let start = if first.line == tag.line {
            first.span.start
        } else {
            line_start(self.source, first.span.start)
        };
        match self.source.get(start..last.span.end) {
            Some(text) => text.to_owned(),
            // Tokens did not come from this source.
            None => reconstruct_line(tokens),
        }
    }
}

fn line_start(source: &str, offset: usize) -> usize {
    source
        .get(..offset)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |i| i + 1)
}

/// Language named by a typed-parameter tag, lowercased.
/// `None` when the tag names no recognizable language.
pub fn infer_language(tag: &str) -> Option<String> {
    let upper = tag.to_ascii_uppercase();
    if upper.starts_with("PYTHON") {
        Some("python".to_owned())
    } else if upper.starts_with("JAVASCRIPT") || upper.starts_with("JS") {
        Some("javascript".to_owned())
    } else if upper.starts_with("LANGUAGE[") {
        LANG_ATTR_RE
            .captures(tag)
            .map(|caps| caps[1].to_lowercase())
    } else {
        None
    }
}

/// Heuristic line rebuild from tokens: closing punctuation attaches to the
/// previous part, strings are re-quoted, everything else is space-joined.
/// Original spacing is not preserved.
pub fn reconstruct_line(tokens: &[&Token]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for tok in tokens {
        match tok.kind {
            TokenKind::String => parts.push(requote(&tok.text)),
            _ if is_attached_punct(&tok.text) && !parts.is_empty() => {
                if let Some(prev) = parts.last_mut() {
                    prev.push_str(&tok.text);
                }
            }
            _ => parts.push(tok.text.clone()),
        }
    }
    parts.join(" ")
}

fn is_attached_punct(text: &str) -> bool {
    matches!(
        text,
        "(" | ")" | "[" | "]" | "{" | "}" | "," | "." | ";" | ":"
    )
}

fn requote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Parse with the default [`Reconstruction::Source`] strategy.
pub fn parse(source: &str, tokens: &[Token]) -> ParseTree {
    parse_with(source, tokens, Reconstruction::default())
}

pub fn parse_with(source: &str, tokens: &[Token], mode: Reconstruction) -> ParseTree {
    Parser::new(source, tokens, mode).parse_tree()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> ParseTree {
        parse(src, &tokenize(src))
    }

    #[test]
    fn no_typed_params_gives_empty_tree() {
        let tree = parse_src("/// a ritual\n::alchemy:transmute -> gold\n");
        assert_eq!(tree.ritual_id, "unknown");
        assert!(tree.blocks.is_empty());
        assert!(tree.deferred.is_empty());
    }

    #[test]
    fn empty_source_and_empty_stream() {
        assert!(parse_src("").blocks.is_empty());
        assert!(parse("", &[]).blocks.is_empty());
    }

    #[test]
    fn python_block_body() {
        let tree = parse_src("PYTHON::\nx = 1\n");
        assert_eq!(tree.blocks.len(), 1);
        let b = &tree.blocks[0];
        assert_eq!(b.kind, "python_block");
        assert_eq!(b.language, "python");
        assert_eq!(b.body, "x = 1");
        assert_eq!((b.line, b.column), (1, 1));
    }

    #[test]
    fn source_reconstruction_is_exact() {
        let tree = parse_src("PYTHON::\nprint(\"hi\")\n");
        assert_eq!(tree.blocks[0].body, "print(\"hi\")");
    }

    #[test]
    fn source_reconstruction_keeps_indentation_and_blank_lines() {
        let src = "PYTHON::\n\ndef f(a, b):\n    return a+b   \n\nf(1, 2)";
        let tree = parse_src(src);
        assert_eq!(
            tree.blocks[0].body,
            "def f(a, b):\n    return a+b\n\nf(1, 2)"
        );
    }

    #[test]
    fn code_on_tag_line_starts_at_first_token() {
        let tree = parse_src("  PYTHON::   x = 1\ny = 2\n");
        assert_eq!(tree.blocks[0].body, "x = 1\ny = 2");
    }

    #[test]
    fn token_reconstruction_is_heuristic() {
        let src = "PYTHON::\nprint(\"hi\", x)\nx = 1\n";
        let tree = parse_with(src, &tokenize(src), Reconstruction::Tokens);
        assert_eq!(tree.blocks[0].body, "print( \"hi\", x)\nx = 1");
    }

    #[test]
    fn reconstruct_line_requotes_strings() {
        let toks = tokenize("say 'a\"b'");
        let refs: Vec<&Token> = toks.iter().filter(|t| t.kind != TokenKind::Eof).collect();
        assert_eq!(reconstruct_line(&refs), "say \"a\\\"b\"");
    }

    #[test]
    fn multiple_blocks_split_at_tags() {
        let src = "PYTHON::\na = 1\nJAVASCRIPT::\nlet b = 2;\n";
        let tree = parse_src(src);
        assert_eq!(tree.blocks.len(), 2);
        assert_eq!(tree.blocks[0].body, "a = 1");
        assert_eq!(tree.blocks[1].kind, "javascript_block");
        assert_eq!(tree.blocks[1].body, "let b = 2;");
        assert_eq!(tree.blocks[1].line, 3);
    }

    #[test]
    fn language_attribute_is_extracted() {
        let tree = parse_src("LANGUAGE[lang=\"Native\"]\nmov r0, 1\n");
        assert_eq!(tree.blocks[0].language, "native");
        assert_eq!(tree.blocks[0].kind, "native_block");
        assert_eq!(tree.blocks[0].body, "mov r0, 1");

        let tree = parse_src("language[ lang = 'blueprint' ]\nstep\n");
        assert_eq!(tree.blocks[0].language, "blueprint");
    }

    #[test]
    fn unrecognized_language_tag_is_unknown_block() {
        let tree = parse_src("LANGUAGE[flavor=\"x\"]\nbody\n");
        assert_eq!(tree.blocks[0].kind, "unknown_block");
        assert_eq!(tree.blocks[0].language, "unknown");
    }

    #[test]
    fn js_shorthand_is_javascript() {
        assert_eq!(infer_language("JS::").as_deref(), Some("javascript"));
        assert_eq!(infer_language("javascript::").as_deref(), Some("javascript"));
        assert_eq!(infer_language("QUANTUM::x"), None);
    }

    #[test]
    fn web_and_quantum_are_deferred_not_blocks() {
        let src = "WEB::#app\nclick\nQUANTUM::entangle\nPYTHON::\nx = 1\n";
        let tree = parse_src(src);
        assert_eq!(tree.blocks.len(), 1);
        assert_eq!(tree.blocks[0].body, "x = 1");
        assert_eq!(tree.deferred.len(), 2);
        assert_eq!(tree.deferred[0].language, "web");
        assert_eq!(tree.deferred[0].tag, "WEB::#app");
        assert_eq!(tree.deferred[1].language, "quantum");
        assert_eq!(tree.deferred[1].line, 3);
    }

    #[test]
    fn web_tag_ends_preceding_block() {
        let tree = parse_src("PYTHON::\nx = 1\nWEB::#app\n");
        assert_eq!(tree.blocks[0].body, "x = 1");
    }

    #[test]
    fn trailing_blank_lines_before_next_tag_are_kept() {
        let tree = parse_src("PYTHON::\nx = 1\n\nJS::\ny\n");
        assert_eq!(tree.blocks[0].body, "x = 1\n");
    }

    #[test]
    fn comments_inside_body_are_kept() {
        let tree = parse_src("PYTHON::\nx = 1 //! needs x\n");
        assert_eq!(tree.blocks[0].body, "x = 1 //! needs x");
    }

    #[test]
    fn multiline_string_stays_in_one_line_group() {
        let tree = parse_src("PYTHON::\ns = \"a\nb\"\nt = 2\n");
        assert_eq!(tree.blocks[0].body, "s = \"a\nb\"\nt = 2");
    }
}
