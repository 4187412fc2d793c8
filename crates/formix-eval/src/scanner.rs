//! Reference tokenizer
//!
//! Produces the token stream the session and the configuration interpreter
//! consume. Any other [`TokenSource`] can be used instead.

use formix_types::{FormixError, Result, Token, TokenSource};
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Lexeme {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Quoted,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[0-9]+\.[0-9]+")]
    Decimal,
    #[regex(r"[0-9]+(\.[0-9]+)?[eE][+-]?[0-9]+")]
    Float,
    #[token(";")]
    EndOfStatement,
    #[token("->")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[regex(r"[-+*/^(),\[\]=<>!\\%&|:~.'{}@$?#]")]
    Delimiter,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Scanner
    }
}

fn integer_token(slice: &str) -> Token {
    match slice.parse::<i64>() {
        Ok(n) => Token::Integer(n),
        Err(_) => Token::Float(slice.parse::<f64>().unwrap_or(f64::INFINITY)),
    }
}

/// `123.45` is kept exact as digits 12345 with scale 2
fn decimal_token(slice: &str) -> Token {
    let (whole, fraction) = slice.split_once('.').unwrap_or((slice, ""));
    let digits = format!("{}{}", whole, fraction);
    match digits.parse::<i64>() {
        Ok(digits) => Token::Decimal {
            digits,
            scale: fraction.len() as u32,
        },
        Err(_) => Token::Float(slice.parse::<f64>().unwrap_or(f64::INFINITY)),
    }
}

fn unquote(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            },
            c => out.push(c),
        }
    }
    out
}

impl TokenSource for Scanner {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexeme::lexer(text);
        let mut tokens = Vec::new();
        while let Some(lexeme) = lexer.next() {
            let slice = lexer.slice();
            let token = match lexeme {
                Ok(Lexeme::Identifier) => Token::Identifier(slice.to_string()),
                Ok(Lexeme::Quoted) => Token::QuotedString(unquote(slice)),
                Ok(Lexeme::Integer) => integer_token(slice),
                Ok(Lexeme::Decimal) => decimal_token(slice),
                Ok(Lexeme::Float) => Token::Float(slice.parse::<f64>().map_err(|e| {
                    FormixError::Syntax(format!("invalid number '{}': {}", slice, e))
                })?),
                Ok(Lexeme::EndOfStatement) => Token::EndOfStatement,
                Ok(Lexeme::Delimiter) => Token::Delimiter(slice.to_string()),
                Err(()) => {
                    return Err(FormixError::Syntax(format!(
                        "unexpected character '{}' at offset {}",
                        slice,
                        lexer.span().start
                    )))
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<Token> {
        Scanner::new().tokenize(text).unwrap()
    }

    #[test]
    fn test_numbers_keep_their_kind() {
        assert_eq!(
            scan("12 0.25 1e-3 2.5E2"),
            vec![
                Token::Integer(12),
                Token::Decimal { digits: 25, scale: 2 },
                Token::Float(1e-3),
                Token::Float(250.0),
            ]
        );
    }

    #[test]
    fn test_arrow_and_operators() {
        assert_eq!(
            scan("\\x -> x^2; y"),
            vec![
                Token::delimiter("\\"),
                Token::identifier("x"),
                Token::delimiter("->"),
                Token::identifier("x"),
                Token::delimiter("^"),
                Token::Integer(2),
                Token::EndOfStatement,
                Token::identifier("y"),
            ]
        );
    }

    #[test]
    fn test_quoted_strings_unescape() {
        assert_eq!(
            scan(r#"name="a \"b\"""#),
            vec![
                Token::identifier("name"),
                Token::delimiter("="),
                Token::QuotedString("a \"b\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_integer_overflow_becomes_float() {
        assert_eq!(scan("99999999999999999999"), vec![Token::Float(1e20)]);
    }

    #[test]
    fn test_unknown_character() {
        let err = Scanner::new().tokenize("1 + `").unwrap_err();
        assert!(matches!(err, FormixError::Syntax(_)));
    }
}
