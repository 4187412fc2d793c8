//! Symbol table and dispatch data
//!
//! One flat, session-wide table. Redefinition replaces a binding outright;
//! there is no scoping. Keyword commands live in a separate dictionary keyed
//! by their lower-cased name.

use crate::commands::CommandFn;
use crate::operation::{Operation, ValueOf};
use formix_types::{Domain, FormixError, Result};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    UnaryOperator,
    BinaryOperator,
    ParameterizedFunction,
    Variable,
    Constant,
    Library,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::UnaryOperator => "unary operator",
            SymbolKind::BinaryOperator => "binary operator",
            SymbolKind::ParameterizedFunction => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Library => "library",
        };
        write!(f, "{}", name)
    }
}

/// Placement of an operator relative to its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notation {
    Prefix,
    Postfix,
    /// Left-associative binary
    Infix,
    /// Right-associative binary
    InfixRight,
}

impl Notation {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "prefix" => Some(Notation::Prefix),
            "postfix" => Some(Notation::Postfix),
            "infix" | "left" => Some(Notation::Infix),
            "right" => Some(Notation::InfixRight),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Notation::Infix | Notation::InfixRight)
    }
}

pub enum Implementation<D: Domain> {
    Operation(Rc<dyn Operation<D>>),
    Value(ValueOf<D>),
    /// Alias into the session's library map
    Library(String),
}

impl<D: Domain> Clone for Implementation<D> {
    fn clone(&self) -> Self {
        match self {
            Implementation::Operation(op) => Implementation::Operation(Rc::clone(op)),
            Implementation::Value(v) => Implementation::Value(v.clone()),
            Implementation::Library(alias) => Implementation::Library(alias.clone()),
        }
    }
}

pub struct NamedSymbol<D: Domain> {
    pub name: String,
    pub kind: SymbolKind,
    /// Binding strength; operators only, higher binds tighter
    pub precedence: Option<u32>,
    pub notation: Option<Notation>,
    pub description: String,
    pub implementation: Implementation<D>,
}

impl<D: Domain> Clone for NamedSymbol<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            precedence: self.precedence,
            notation: self.notation,
            description: self.description.clone(),
            implementation: self.implementation.clone(),
        }
    }
}

impl<D: Domain> fmt::Debug for NamedSymbol<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedSymbol")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("precedence", &self.precedence)
            .field("notation", &self.notation)
            .finish()
    }
}

impl<D: Domain> NamedSymbol<D> {
    pub fn operator(name: &str, operation: Rc<dyn Operation<D>>, precedence: u32, notation: Notation) -> Self {
        let kind = if notation.is_binary() {
            SymbolKind::BinaryOperator
        } else {
            SymbolKind::UnaryOperator
        };
        Self {
            name: name.to_string(),
            kind,
            precedence: Some(precedence),
            notation: Some(notation),
            description: String::new(),
            implementation: Implementation::Operation(operation),
        }
    }

    pub fn function(name: &str, operation: Rc<dyn Operation<D>>) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::ParameterizedFunction,
            precedence: None,
            notation: None,
            description: String::new(),
            implementation: Implementation::Operation(operation),
        }
    }

    /// Variables and constants never keep a calculus mark
    pub fn value(name: &str, kind: SymbolKind, value: ValueOf<D>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            precedence: None,
            notation: None,
            description: String::new(),
            implementation: Implementation::Value(value.without_mark().with_name(name)),
        }
    }

    pub fn library(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Library,
            precedence: None,
            notation: None,
            description: String::new(),
            implementation: Implementation::Library(alias.to_string()),
        }
    }

    pub fn operation(&self) -> Option<&Rc<dyn Operation<D>>> {
        match &self.implementation {
            Implementation::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.kind, SymbolKind::UnaryOperator | SymbolKind::BinaryOperator)
    }
}

pub struct SymbolTable<D: Domain> {
    symbols: HashMap<String, NamedSymbol<D>>,
    commands: HashMap<String, CommandFn<D>>,
}

impl<D: Domain> SymbolTable<D> {
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            commands: HashMap::new(),
        }
    }

    /// Register `symbol`, replacing any binding under the same name
    pub fn add(&mut self, mut symbol: NamedSymbol<D>, description: &str) {
        symbol.description = description.to_string();
        if let Implementation::Value(value) = &mut symbol.implementation {
            value.clear_mark();
        }
        debug!("registered {} '{}'", symbol.kind, symbol.name);
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Result<&NamedSymbol<D>> {
        self.symbols
            .get(name)
            .ok_or_else(|| FormixError::UndefinedSymbol(name.to_string()))
    }

    pub fn lookup(&self, name: &str) -> Option<&NamedSymbol<D>> {
        self.symbols.get(name)
    }

    /// Resolve a symbol to a value; operators and libraries do not produce one
    pub fn get_value(&self, name: &str) -> Result<ValueOf<D>> {
        match &self.get(name)?.implementation {
            Implementation::Value(value) => Ok(value.clone()),
            _ => Err(FormixError::NotValueProducing(name.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<NamedSymbol<D>> {
        let removed = self.symbols.remove(name);
        if removed.is_some() {
            debug!("removed symbol '{}'", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Sorted symbol names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn add_command(&mut self, keyword: &str, command: CommandFn<D>) {
        self.commands.insert(keyword.to_lowercase(), command);
    }

    /// Case-insensitive command lookup
    pub fn command(&self, keyword: &str) -> Option<CommandFn<D>> {
        self.commands.get(&keyword.to_lowercase()).copied()
    }

    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<D: Domain> Default for SymbolTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::UnaryFunction;
    use formix_types::{GenericValue, Metadata, RealDomain};

    fn negate() -> Rc<dyn Operation<RealDomain>> {
        Rc::new(UnaryFunction::new("neg", |_: &RealDomain, x: &f64| Ok(-x)))
    }

    #[test]
    fn test_get_and_lookup() {
        let mut table = SymbolTable::<RealDomain>::new();
        table.add(NamedSymbol::value("x", SymbolKind::Variable, GenericValue::discrete(2.0)), "x");
        assert!(table.get("x").is_ok());
        assert!(table.lookup("y").is_none());
        assert!(matches!(table.get("y"), Err(FormixError::UndefinedSymbol(_))));
    }

    #[test]
    fn test_operators_do_not_produce_values() {
        let mut table = SymbolTable::<RealDomain>::new();
        table.add(NamedSymbol::operator("~", negate(), 7, Notation::Prefix), "negation");
        assert_eq!(table.get("~").unwrap().kind, SymbolKind::UnaryOperator);
        assert!(matches!(table.get_value("~"), Err(FormixError::NotValueProducing(_))));
    }

    #[test]
    fn test_stored_values_lose_their_mark() {
        let mut table = SymbolTable::<RealDomain>::new();
        let mut v = GenericValue::discrete(1.0);
        v.set_metadata(Metadata::IntervalEvaluation { step: None });
        table.add(NamedSymbol::value("x", SymbolKind::Variable, v), "x");
        assert!(table.get_value("x").unwrap().metadata().is_none());
    }

    #[test]
    fn test_names_sorted() {
        let mut table = SymbolTable::<RealDomain>::new();
        for name in ["b", "a", "c"] {
            table.add(NamedSymbol::value(name, SymbolKind::Constant, GenericValue::discrete(0.0)), "");
        }
        assert_eq!(table.names(), vec!["a", "b", "c"]);
        assert_eq!(table.remove("b").map(|s| s.name), Some("b".to_string()));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_notation_parse() {
        assert_eq!(Notation::parse("RIGHT"), Some(Notation::InfixRight));
        assert_eq!(Notation::parse("left"), Some(Notation::Infix));
        assert_eq!(Notation::parse("sideways"), None);
    }
}
