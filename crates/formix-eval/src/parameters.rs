//! Configuration interpreter
//!
//! Maps config text such as `alpha=0.5, panels=64` onto an immutable
//! [`Parameterization`]. Each configured operator instance owns its own copy.

use crate::scanner::Scanner;
use formix_types::{FormixError, Result, Token, TokenSource};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Text(String),
    Double(f64),
    /// Exact fixed-point literal `digits / 10^scale`
    Decimal { digits: i64, scale: u32 },
    Integer(i64),
    /// Name resolved against the symbol table when the value is needed
    Symbol(String),
}

impl ParameterValue {
    /// Numeric value of a literal; `None` for text and symbols
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Double(x) => Some(*x),
            ParameterValue::Decimal { digits, scale } => Some(*digits as f64 / 10f64.powi(*scale as i32)),
            ParameterValue::Integer(n) => Some(*n as f64),
            ParameterValue::Text(_) | ParameterValue::Symbol(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Text(_) => "text",
            ParameterValue::Double(_) => "double",
            ParameterValue::Decimal { .. } => "decimal",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Symbol(_) => "symbol",
        }
    }

    fn negated(self) -> Option<Self> {
        match self {
            ParameterValue::Double(x) => Some(ParameterValue::Double(-x)),
            ParameterValue::Decimal { digits, scale } => Some(ParameterValue::Decimal {
                digits: -digits,
                scale,
            }),
            ParameterValue::Integer(n) => Some(ParameterValue::Integer(-n)),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Text(s) => write!(f, "\"{}\"", s),
            ParameterValue::Double(x) => write!(f, "{}", x),
            ParameterValue::Decimal { digits, scale } => {
                write!(f, "{}", Token::Decimal { digits: *digits, scale: *scale })
            }
            ParameterValue::Integer(n) => write!(f, "{}", n),
            ParameterValue::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// Immutable name -> value map captured from one config text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameterization {
    values: BTreeMap<String, ParameterValue>,
}

impl Parameterization {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse `key=value` pairs separated by commas or whitespace
    ///
    /// `element` names the owner in error messages.
    pub fn parse(element: &str, text: &str) -> Result<Self> {
        let tokens = Scanner::new().tokenize(text)?;
        Self::from_tokens(element, &tokens)
    }

    pub fn from_tokens(element: &str, tokens: &[Token]) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut position = 0;

        while position < tokens.len() {
            let key = match &tokens[position] {
                Token::Identifier(name) => name.clone(),
                Token::Delimiter(d) if d == "," => {
                    position += 1;
                    continue;
                }
                Token::EndOfStatement => {
                    position += 1;
                    continue;
                }
                other => {
                    return Err(FormixError::configuration(
                        element,
                        format!("expected a parameter name, found '{}'", other),
                    ))
                }
            };
            position += 1;

            if !tokens.get(position).is_some_and(|t| t.is_delimiter("=")) {
                return Err(FormixError::configuration(
                    element,
                    format!("parameter '{}' is missing '='", key),
                ));
            }
            position += 1;

            let negative = tokens.get(position).is_some_and(|t| t.is_delimiter("-"));
            if negative {
                position += 1;
            }
            let value = match tokens.get(position) {
                Some(Token::Integer(n)) => ParameterValue::Integer(*n),
                Some(Token::Decimal { digits, scale }) => ParameterValue::Decimal {
                    digits: *digits,
                    scale: *scale,
                },
                Some(Token::Float(x)) => ParameterValue::Double(*x),
                Some(Token::QuotedString(s)) => ParameterValue::Text(s.clone()),
                Some(Token::Identifier(name)) => ParameterValue::Symbol(name.clone()),
                _ => {
                    return Err(FormixError::configuration(
                        element,
                        format!("parameter '{}' has no value", key),
                    ))
                }
            };
            position += 1;

            let value = if negative {
                let kind = value.type_name();
                value.negated().ok_or_else(|| {
                    FormixError::configuration(element, format!("cannot negate {} parameter '{}'", kind, key))
                })?
            } else {
                value
            };

            if values.insert(key.clone(), value).is_some() {
                return Err(FormixError::configuration(
                    element,
                    format!("parameter '{}' given twice", key),
                ));
            }
        }

        Ok(Parameterization { values })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fail on any parameter name outside `allowed`
    pub fn restrict_to(&self, element: &str, allowed: &[&str]) -> Result<()> {
        match self.names().find(|name| !allowed.contains(name)) {
            Some(unknown) => Err(FormixError::configuration(
                element,
                format!(
                    "unknown parameter '{}' (accepted: {})",
                    unknown,
                    allowed.join(", ")
                ),
            )),
            None => Ok(()),
        }
    }

    pub fn require(&self, element: &str, name: &str) -> Result<&ParameterValue> {
        self.get(name).ok_or_else(|| {
            FormixError::configuration(element, format!("missing parameter '{}'", name))
        })
    }
}
