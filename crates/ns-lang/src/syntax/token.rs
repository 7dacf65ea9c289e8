#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    StringLit(String),
    Ident(String),
    True,
    False,
    None,

    // Keywords
    Def,
    End,
    If,
    Elsif,
    Else,
    While,
    For,
    In,
    Return,
    Final,
    And,
    Or,
    Not,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Eq,         // =
    EqEq,       // ==
    BangEq,     // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=

    // Punctuation
    Colon,      // :
    Comma,      // ,
    LParen,     // (
    RParen,     // )
    LBracket,   // [
    RBracket,   // ]
    LBrace,     // {
    RBrace,     // }

    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Int(_) | Self::StringLit(_) | Self::True | Self::False | Self::None)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus | Self::Star | Self::Slash | Self::Percent)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::EqEq | Self::BangEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Def | Self::End | Self::If | Self::Elsif | Self::Else | Self::While | Self::For
            | Self::In | Self::Return | Self::Final | Self::And | Self::Or | Self::Not
            | Self::True | Self::False | Self::None
        )
    }

    /// Tokens that close a statement sequence without being part of it.
    pub fn ends_block(&self) -> bool {
        matches!(self, Self::End | Self::Elsif | Self::Else | Self::Eof)
    }

    /// Tokens that can open an expression. Used to decide whether a bare
    /// `return` carries a value.
    pub fn starts_expr(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::StringLit(_) | Self::Ident(_) | Self::True | Self::False | Self::None
            | Self::Minus | Self::Not | Self::LParen | Self::LBracket | Self::LBrace
        )
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "def"    => TokenKind::Def,
        "end"    => TokenKind::End,
        "if"     => TokenKind::If,
        "elsif"  => TokenKind::Elsif,
        "else"   => TokenKind::Else,
        "while"  => TokenKind::While,
        "for"    => TokenKind::For,
        "in"     => TokenKind::In,
        "return" => TokenKind::Return,
        "final"  => TokenKind::Final,
        "and"    => TokenKind::And,
        "or"     => TokenKind::Or,
        "not"    => TokenKind::Not,
        "True"   => TokenKind::True,
        "False"  => TokenKind::False,
        "None"   => TokenKind::None,
        _        => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
