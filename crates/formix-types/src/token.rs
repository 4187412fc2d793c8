//! Token-stream contract
//!
//! Tokens are produced by a tokenizer outside of the evaluation core and
//! consumed one statement at a time.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    QuotedString(String),
    Integer(i64),
    /// Fixed-point literal `digits / 10^scale`, kept exact
    Decimal { digits: i64, scale: u32 },
    Float(f64),
    Delimiter(String),
    EndOfStatement,
}

impl Token {
    pub fn delimiter(text: &str) -> Token {
        Token::Delimiter(text.to_string())
    }

    pub fn identifier(text: &str) -> Token {
        Token::Identifier(text.to_string())
    }

    pub fn is_delimiter(&self, text: &str) -> bool {
        matches!(self, Token::Delimiter(d) if d == text)
    }

    /// Name under which the token may appear in the symbol table
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Token::Identifier(name) | Token::Delimiter(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Token::Integer(n) => Some(*n as f64),
            Token::Decimal { digits, scale } => Some(*digits as f64 / 10f64.powi(*scale as i32)),
            Token::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) | Token::Delimiter(s) => write!(f, "{}", s),
            Token::QuotedString(s) => write!(f, "\"{}\"", s),
            Token::Integer(n) => write!(f, "{}", n),
            Token::Decimal { digits, scale } => {
                let sign = if *digits < 0 { "-" } else { "" };
                let text = format!("{:0>width$}", digits.unsigned_abs(), width = *scale as usize + 1);
                let (whole, frac) = text.split_at(text.len() - *scale as usize);
                write!(f, "{}{}.{}", sign, whole, frac)
            }
            Token::Float(x) => write!(f, "{:e}", x),
            Token::EndOfStatement => write!(f, ";"),
        }
    }
}

/// Anything that can hand out a token sequence for a piece of text
pub trait TokenSource {
    fn tokenize(&self, text: &str) -> crate::error::Result<Vec<Token>>;
}
