// Lexer for OpenACC-annotated C sources.
//
// Tokenizes the C subset accepted by the front end plus `#pragma acc` directive
// lines. Uses the `logos` crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
//   Newlines are dropped except the one terminating a `#pragma acc` line.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// C subset token types.
///
/// Identifiers and floating literals carry no value: use the span to
/// retrieve the text from the source.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+|\\\r?\n|//[^\n]*|/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // ── Directives ──
    /// `#pragma acc`, the start of an OpenACC directive line.
    #[regex(r"#[ \t]*pragma[ \t]+acc")]
    PragmaAcc,

    /// Any other preprocessor line, kept verbatim. Non-acc pragmas are
    /// spelled out so that `#pragma acc` always wins the longest match.
    #[regex(r"#[ \t]*(include|define|undef|ifdef|ifndef|if|elif|else|endif|error|warning|line)[^\n]*")]
    #[regex(r"#[ \t]*pragma[ \t]+([^a \t\n][^\n]*|a|a[^c\n][^\n]*|ac|ac[^c\n][^\n]*)")]
    PpLine,

    // ── Keywords ──
    #[token("void")]
    Void,
    #[token("char")]
    Char,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("unsigned")]
    Unsigned,
    #[token("signed")]
    Signed,
    #[token("const")]
    Const,
    #[token("static")]
    Static,
    #[token("extern")]
    Extern,
    #[token("struct")]
    Struct,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,

    // ── Punctuation ──
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,

    // ── Operators ──
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("^=")]
    CaretAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,

    // ── Literals ──
    //
    // FloatLit must match before IntLit claims the integer prefix; logos picks
    // the longest match so `1.5` lexes as one FloatLit.
    /// Floating literal (`1.0`, `.5`, `1e3`, `2.0f`).
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?[fFlL]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFlL]?")]
    FloatLit,

    /// Integer literal, decimal or hex, with optional suffix.
    #[regex(r"[0-9]+[uUlL]*", parse_int)]
    #[regex(r"0[xX][0-9a-fA-F]+[uUlL]*", parse_hex)]
    IntLit(u64),

    /// String literal, kept with its escapes unprocessed.
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StrLit(String),

    /// Character literal, kept with its escapes unprocessed.
    #[regex(r"'([^'\\\n]|\\.)+'", parse_char)]
    CharLit(String),

    // ── Identifier ──
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ── Structure ──
    /// Line break. Only the one terminating a directive line survives `lex()`.
    #[token("\n")]
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::PragmaAcc => "#pragma acc",
            Token::PpLine => "<preprocessor line>",
            Token::Void => "void",
            Token::Char => "char",
            Token::Short => "short",
            Token::Int => "int",
            Token::Long => "long",
            Token::Float => "float",
            Token::Double => "double",
            Token::Unsigned => "unsigned",
            Token::Signed => "signed",
            Token::Const => "const",
            Token::Static => "static",
            Token::Extern => "extern",
            Token::Struct => "struct",
            Token::For => "for",
            Token::While => "while",
            Token::If => "if",
            Token::Else => "else",
            Token::Return => "return",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Default => "default",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Colon => ":",
            Token::Question => "?",
            Token::Dot => ".",
            Token::Arrow => "->",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Bang => "!",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::PercentAssign => "%=",
            Token::AmpAssign => "&=",
            Token::PipeAssign => "|=",
            Token::CaretAssign => "^=",
            Token::ShlAssign => "<<=",
            Token::ShrAssign => ">>=",
            Token::FloatLit => "<float>",
            Token::IntLit(v) => return write!(f, "{v}"),
            Token::StrLit(s) => return write!(f, "\"{s}\""),
            Token::CharLit(s) => return write!(f, "'{s}'"),
            Token::Ident => "<ident>",
            Token::Newline => "<newline>",
        };
        write!(f, "{s}")
    }
}

// ── Callbacks ──

fn strip_int_suffix(slice: &str) -> &str {
    slice.trim_end_matches(['u', 'U', 'l', 'L'])
}

fn parse_int(lex: &mut logos::Lexer<'_, Token>) -> Option<u64> {
    strip_int_suffix(lex.slice()).parse().ok()
}

fn parse_hex(lex: &mut logos::Lexer<'_, Token>) -> Option<u64> {
    let digits = &strip_int_suffix(lex.slice())[2..];
    u64::from_str_radix(digits, 16).ok()
}

fn parse_string(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    Some(slice[1..slice.len() - 1].to_string())
}

fn parse_char(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    Some(slice[1..slice.len() - 1].to_string())
}

// ── Public API ──

/// Lex a source string into tokens.
///
/// Returns all successfully parsed tokens together with any errors for
/// unrecognised characters. Newlines are significant only as directive
/// terminators, so all others are discarded here.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut in_directive = false;

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(Token::Newline) => {
                if in_directive {
                    tokens.push((Token::Newline, span));
                    in_directive = false;
                }
            }
            Ok(Token::PragmaAcc) => {
                // An unterminated directive gets terminated by the next one.
                if in_directive {
                    tokens.push((Token::Newline, Span { start: span.start, end: span.start }));
                }
                in_directive = true;
                tokens.push((Token::PragmaAcc, span));
            }
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    if in_directive {
        let end = source.len();
        tokens.push((Token::Newline, Span { start: end, end }));
    }

    LexResult { tokens, errors }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(source: &str) -> Vec<Token> {
        let result = lex(source);
        assert!(
            result.errors.is_empty(),
            "unexpected lex errors: {:?}",
            result.errors
        );
        result.tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn keywords_and_idents() {
        let tokens = lex_ok("int for forward struct");
        assert_eq!(
            tokens,
            vec![Token::Int, Token::For, Token::Ident, Token::Struct]
        );
    }

    #[test]
    fn pragma_acc_keeps_terminating_newline() {
        let tokens = lex_ok("#pragma acc loop gang\nfor (;;) ;\n");
        assert_eq!(tokens[0], Token::PragmaAcc);
        assert_eq!(tokens[1], Token::Ident);
        assert_eq!(tokens[2], Token::Ident);
        assert_eq!(tokens[3], Token::Newline);
        assert_eq!(tokens[4], Token::For);
        assert!(!tokens[5..].contains(&Token::Newline));
    }

    #[test]
    fn pragma_with_spacing() {
        let tokens = lex_ok("  #  pragma   acc parallel\n");
        assert_eq!(tokens, vec![Token::PragmaAcc, Token::Ident, Token::Newline]);
    }

    #[test]
    fn directive_at_eof_is_terminated() {
        let tokens = lex_ok("#pragma acc data copy(a)");
        assert_eq!(tokens.last(), Some(&Token::Newline));
    }

    #[test]
    fn line_continuation_inside_directive() {
        let tokens = lex_ok("#pragma acc parallel \\\n copy(a)\n");
        assert_eq!(
            tokens,
            vec![
                Token::PragmaAcc,
                Token::Ident,
                Token::Ident,
                Token::LParen,
                Token::Ident,
                Token::RParen,
                Token::Newline
            ]
        );
    }

    #[test]
    fn other_preprocessor_lines() {
        let tokens = lex_ok("#include <stdio.h>\n#pragma once\nint x;");
        assert_eq!(
            tokens,
            vec![Token::PpLine, Token::PpLine, Token::Int, Token::Ident, Token::Semi]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex_ok("a /* block\n comment */ b // line\n c");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident, Token::Ident]);
    }

    #[test]
    fn numbers() {
        let tokens = lex_ok("42 0x1F 10u 1.5 .5 1e3 2.0f");
        assert_eq!(
            tokens,
            vec![
                Token::IntLit(42),
                Token::IntLit(31),
                Token::IntLit(10),
                Token::FloatLit,
                Token::FloatLit,
                Token::FloatLit,
                Token::FloatLit,
            ]
        );
    }

    #[test]
    fn compound_operators() {
        let tokens = lex_ok("a += b->c && d <<= 2");
        assert_eq!(
            tokens,
            vec![
                Token::Ident,
                Token::PlusAssign,
                Token::Ident,
                Token::Arrow,
                Token::Ident,
                Token::AmpAmp,
                Token::Ident,
                Token::ShlAssign,
                Token::IntLit(2),
            ]
        );
    }

    #[test]
    fn string_and_char_literals() {
        let tokens = lex_ok(r#"printf("%d\n", 'a');"#);
        assert_eq!(tokens[2], Token::StrLit(r"%d\n".to_string()));
        assert_eq!(tokens[4], Token::CharLit("a".to_string()));
    }

    #[test]
    fn unknown_character_is_error() {
        let result = lex("int @ x;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.tokens.len(), 3);
    }
}
