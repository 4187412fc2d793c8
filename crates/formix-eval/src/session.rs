//! Evaluation session
//!
//! A [`Session`] owns everything one evaluation context needs: the domain,
//! the configuration, the symbol table, the imported libraries and the call
//! frames of running lambdas. It is passed by `&mut` into every operation;
//! there is no global state.

use crate::commands;
use crate::config::SessionConfig;
use crate::evaluator;
use crate::library::{Library, LibraryRegistry, COMPLEX_LIBRARY, STANDARD_LIBRARY};
use crate::loader::Loader;
use crate::operation::{EvaluationContext, ParameterRange, ValueOf};
use crate::scanner::Scanner;
use crate::symbols::{Implementation, NamedSymbol, SymbolKind, SymbolTable};
use formix_types::{Domain, FormixError, GenericValue, Procedure, ProcedureEvaluator, Result, TokenSource, ValueKind};
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// Nesting limit for procedure calls
pub const MAX_CALL_DEPTH: usize = 64;

/// Result of executing one statement
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Value(GenericValue<T>),
    /// `name = expr` or `name(p) = expr`
    Defined { name: String, value: GenericValue<T> },
    /// Message from a keyword command
    Command(String),
    Empty,
}

impl<T> Outcome<T> {
    pub fn value(&self) -> Option<&GenericValue<T>> {
        match self {
            Outcome::Value(value) | Outcome::Defined { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<GenericValue<T>> {
        match self {
            Outcome::Value(value) | Outcome::Defined { value, .. } => Some(value),
            _ => None,
        }
    }
}

type Frame<D> = HashMap<String, ValueOf<D>>;

pub struct Session<D: Domain> {
    domain: Rc<D>,
    config: SessionConfig,
    table: SymbolTable<D>,
    libraries: HashMap<String, Box<dyn Library<D>>>,
    registry: LibraryRegistry<D>,
    tokens: Box<dyn TokenSource>,
    frames: Vec<Frame<D>>,
}

impl<D: Domain> Session<D> {
    /// Session with the standard library and default configuration
    pub fn new(domain: D) -> Result<Self> {
        Self::with_config(domain, SessionConfig::default())
    }

    /// Session with the standard library, then `config.libraries`
    pub fn with_config(domain: D, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let extra = config.libraries.clone();
        let mut session = Self::empty(domain, config);
        session.import_all(STANDARD_LIBRARY.iter().copied())?;
        if session.domain.imaginary_unit().is_some() {
            session.import_all(COMPLEX_LIBRARY.iter().copied())?;
        }
        session.import_all(extra)?;
        info!(
            "{} session ready with {} symbols",
            session.domain.name(),
            session.table.len()
        );
        Ok(session)
    }

    /// Session with commands only; every symbol must be imported
    pub fn empty(domain: D, config: SessionConfig) -> Self {
        let mut table = SymbolTable::new();
        commands::register(&mut table);
        Self {
            domain: Rc::new(domain),
            config,
            table,
            libraries: HashMap::new(),
            registry: LibraryRegistry::standard(),
            tokens: Box::new(Scanner::new()),
            frames: Vec::new(),
        }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub(crate) fn domain_handle(&self) -> Rc<D> {
        Rc::clone(&self.domain)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn table(&self) -> &SymbolTable<D> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SymbolTable<D> {
        &mut self.table
    }

    pub fn registry_mut(&mut self) -> &mut LibraryRegistry<D> {
        &mut self.registry
    }

    /// Library bound under `alias` by a LIBRARY descriptor
    pub fn library(&self, alias: &str) -> Option<&dyn Library<D>> {
        self.libraries.get(alias).map(|l| l.as_ref())
    }

    /// Replace the tokenizer used by `evaluate` and `execute`
    pub fn set_token_source(&mut self, tokens: Box<dyn TokenSource>) {
        self.tokens = tokens;
    }

    pub fn init_special_functions(&mut self) {
        self.domain.init_special_functions();
        info!("special functions initialized for the {} domain", self.domain.name());
    }

    // ========================================================================
    // Imports
    // ========================================================================

    fn loader(&mut self) -> Loader<'_, D> {
        Loader::new(&*self.domain, &self.registry, &mut self.libraries, &mut self.table)
    }

    /// Apply one descriptor line
    pub fn import(&mut self, line: &str) -> Result<Option<String>> {
        self.loader().import_line(line)
    }

    /// Apply descriptor lines in order; earlier lines stay applied on failure
    pub fn import_all<I, S>(&mut self, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.loader().import_all(lines)
    }

    // ========================================================================
    // Evaluation entry points
    // ========================================================================

    /// Evaluate text and return the discrete result of its last statement
    pub fn evaluate(&mut self, text: &str) -> Result<D::Value> {
        self.evaluate_value(text)?.into_discrete()
    }

    /// Evaluate text and return the value of its last statement
    pub fn evaluate_value(&mut self, text: &str) -> Result<ValueOf<D>> {
        self.execute(text)?
            .into_value()
            .ok_or_else(|| FormixError::Evaluation(format!("'{}' produced no value", text.trim())))
    }

    /// Run text as statements or as a `!keyword` command
    pub fn execute(&mut self, text: &str) -> Result<Outcome<D::Value>> {
        let trimmed = text.trim();
        if let Some(command) = trimmed.strip_prefix('!') {
            return self.run_command(command);
        }
        let tokens = self.tokens.tokenize(trimmed)?;
        self.evaluate_tokens(&tokens)
    }

    /// Execute each statement in turn, returning the last outcome
    ///
    /// The first failing statement aborts the rest; definitions made by
    /// earlier statements are kept.
    pub fn evaluate_tokens(&mut self, tokens: &[formix_types::Token]) -> Result<Outcome<D::Value>> {
        let mut outcome = Outcome::Empty;
        for statement in evaluator::split_statements(tokens) {
            outcome = evaluator::execute_statement(self, statement)?;
        }
        Ok(outcome)
    }

    fn run_command(&mut self, text: &str) -> Result<Outcome<D::Value>> {
        let (keyword, arguments) = text.trim().split_once(char::is_whitespace).unwrap_or((text.trim(), ""));
        let command = self
            .table
            .command(keyword)
            .ok_or_else(|| FormixError::UndefinedSymbol(format!("!{}", keyword)))?;
        debug!("command !{}", keyword.to_lowercase());
        command(self, arguments).map(Outcome::Command)
    }

    /// Bind `name` as a variable; any mark on the value is dropped
    pub(crate) fn define(&mut self, name: &str, value: ValueOf<D>) -> Outcome<D::Value> {
        let value = value.without_mark().with_name(name);
        self.table.add(
            NamedSymbol::value(name, SymbolKind::Variable, value.clone()),
            "user definition",
        );
        Outcome::Defined {
            name: name.to_string(),
            value,
        }
    }

    // ========================================================================
    // Procedures
    // ========================================================================

    /// Innermost binding of a lambda parameter
    pub(crate) fn local(&self, name: &str) -> Option<ValueOf<D>> {
        self.frames.iter().rev().find_map(|frame| frame.get(name)).cloned()
    }

    /// Innermost binding of a lambda parameter, read as an operand
    ///
    /// A calculus mark is handed out once. The frame keeps the binding with
    /// its mark consumed, so a later read cannot feed a second consumer.
    pub(crate) fn read_local(&mut self, name: &str) -> Result<Option<ValueOf<D>>> {
        let stored = match self.frames.iter_mut().rev().find_map(|frame| frame.get_mut(name)) {
            Some(stored) => stored,
            None => return Ok(None),
        };
        let value = stored.clone();
        if stored.metadata().is_some() {
            stored.consume(name, "calculus mark")?;
        }
        Ok(Some(value))
    }

    pub(crate) fn is_local(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains_key(name))
    }

    pub fn call_procedure(&mut self, procedure: &Procedure, arguments: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(FormixError::Evaluation(format!(
                "call depth limit of {} exceeded in {}",
                MAX_CALL_DEPTH, procedure
            )));
        }
        match procedure {
            Procedure::Named(name) => {
                let implementation = self.table.get(name)?.implementation.clone();
                match implementation {
                    Implementation::Operation(op) => op.execute(self, arguments),
                    Implementation::Value(value) => match value.kind() {
                        ValueKind::Indirect(target) if target != procedure => {
                            self.frames.push(HashMap::new());
                            let result = self.call_procedure(target, arguments);
                            self.frames.pop();
                            result
                        }
                        _ => Err(FormixError::type_mismatch(name, "function", value.type_name())),
                    },
                    Implementation::Library(_) => Err(FormixError::NotValueProducing(name.clone())),
                }
            }
            Procedure::Lambda(lambda) => {
                let display = procedure.to_string();
                ParameterRange::exactly(lambda.parameters.len()).check(&display, arguments.len())?;
                let lambda = Rc::clone(lambda);
                let frame: Frame<D> = lambda.parameters.iter().cloned().zip(arguments).collect();
                self.frames.push(frame);
                let result = evaluator::evaluate_expression(self, &lambda.body);
                self.frames.pop();
                result
            }
        }
    }
}

impl<D: Domain> ProcedureEvaluator<D::Value> for Session<D> {
    fn call(&mut self, procedure: &Procedure, arguments: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        self.call_procedure(procedure, arguments)
    }
}

impl<D: Domain> EvaluationContext<D> for Session<D> {
    fn domain(&self) -> Rc<D> {
        Rc::clone(&self.domain)
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lookup_value(&self, name: &str) -> Result<ValueOf<D>> {
        match self.local(name) {
            Some(value) => Ok(value),
            None => self.table.get_value(name),
        }
    }
}
