use logos::Logos;
use std::fmt;
use thiserror::Error;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\n\f]+")] // Whitespace
#[logos(skip r"//[^\n]*")] // Line comments
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")] // Block comments
pub enum Token {
    // --- Keywords ---
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("function")]
    Function,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // --- Identifiers and literals ---
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Decimal literal text, kept verbatim so the token stays `Eq + Hash`
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    /// BigInt literal digits without the trailing `n`
    #[regex(r"[0-9]+n", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].to_string()
    })]
    BigInt(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, unquote)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, unquote)]
    Str(String),

    // --- Operators ---
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNeq,
    #[token("==")]
    Eq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("=")]
    Assign,
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

    // --- Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
}

fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Let => write!(f, "let"),
            Token::Const => write!(f, "const"),
            Token::Var => write!(f, "var"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::For => write!(f, "for"),
            Token::While => write!(f, "while"),
            Token::Function => write!(f, "function"),
            Token::Return => write!(f, "return"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::BigInt(n) => write!(f, "{}n", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::StrictEq => write!(f, "==="),
            Token::StrictNeq => write!(f, "!=="),
            Token::Eq => write!(f, "=="),
            Token::Neq => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
        }
    }
}

/// A character no token rule accepts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected character '{unexpected_char}' at {line}:{column}\n  Context: {context}")]
pub struct LexicalError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub unexpected_char: char,
    pub context: String,
}

impl LexicalError {
    fn at(source: &str, offset: usize) -> Self {
        let (line, column) = line_col(source, offset);
        Self {
            offset,
            line,
            column,
            unexpected_char: source[offset..].chars().next().unwrap_or('\0'),
            context: line_at(source, offset),
        }
    }
}

/// `(start, token, end)` byte range of one token.
pub type SpannedToken = (usize, Token, usize);

/// Lex the whole input up front; the parser works on the token vector.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexicalError> {
    let mut lex = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lex.next() {
        let span = lex.span();
        match result {
            Ok(tok) => tokens.push((span.start, tok, span.end)),
            Err(_) => return Err(LexicalError::at(source, span.start)),
        }
    }
    Ok(tokens)
}

/// 1-based line and column of a byte offset. Columns count characters.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, col)
}

/// The trimmed source line containing `offset`.
pub fn line_at(source: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
    source[start..end].trim().to_string()
}
