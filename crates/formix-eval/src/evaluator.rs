//! Token-stream evaluation
//!
//! A precedence-climbing walk that evaluates while it reads. Operator
//! precedence and notation come from the symbol table, so importing an
//! operator changes what the next statement means without touching this
//! module.
//!
//! Statements:
//! - `expr`
//! - `name = expr` defines a variable
//! - `name(p, q) = expr` defines a function
//!
//! Expressions:
//! - literals, `(expr)`, arrays `[a, b]`, matrices `[a, b; c, d]`
//! - structures `{re: 1, im: 2}` and field access `s.re`
//! - lambdas `\x, y -> body`; the body runs when the lambda is called
//! - calls `f(a, b)`; a bare function name is an indirect value
//! - table operators in prefix, postfix and infix position
//! - unary minus, binding tighter than `*` and looser than `^`

use crate::operation::{map_elements, Operation, ValueOf};
use crate::session::{Outcome, Session};
use crate::symbols::{Implementation, Notation, SymbolKind};
use formix_types::{Domain, FormixError, GenericValue, Procedure, Result, Structure, Token, ValueKind};
use log::trace;
use ndarray::Array2;
use std::rc::Rc;

/// Binding strength of the built-in unary minus
pub const NEGATION_PRECEDENCE: u32 = 7;

// ============================================================================
// Statements
// ============================================================================

/// Split at end-of-statement tokens outside of brackets
pub fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Delimiter(d) if matches!(d.as_str(), "(" | "[" | "{") => depth += 1,
            Token::Delimiter(d) if matches!(d.as_str(), ")" | "]" | "}") => depth = depth.saturating_sub(1),
            Token::EndOfStatement if depth == 0 => {
                statements.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&tokens[start..]);
    statements.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Index of the bracket closing the one at `open`
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Delimiter(d) if matches!(d.as_str(), "(" | "[" | "{") => depth += 1,
            Token::Delimiter(d) if matches!(d.as_str(), ")" | "]" | "}") => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parameter names of a `name(p, q) = ...` head
fn parameter_list(tokens: &[Token]) -> Result<Vec<String>> {
    let mut parameters = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        match (i % 2, token) {
            (0, Token::Identifier(name)) => {
                if parameters.contains(name) {
                    return Err(FormixError::Syntax(format!("parameter '{}' given twice", name)));
                }
                parameters.push(name.clone());
            }
            (1, t) if t.is_delimiter(",") => {}
            (_, other) => {
                return Err(FormixError::Syntax(format!(
                    "unexpected '{}' in parameter list",
                    other
                )))
            }
        }
    }
    if tokens.last().is_some_and(|t| t.is_delimiter(",")) {
        return Err(FormixError::Syntax("parameter list ends with ','".to_string()));
    }
    Ok(parameters)
}

pub fn execute_statement<D: Domain>(session: &mut Session<D>, tokens: &[Token]) -> Result<Outcome<D::Value>> {
    if tokens.is_empty() {
        return Ok(Outcome::Empty);
    }

    if let Some(Token::Identifier(name)) = tokens.first() {
        // name = expr
        if tokens.get(1).is_some_and(|t| t.is_delimiter("=")) {
            let value = evaluate_expression(session, &tokens[2..])?;
            return Ok(session.define(name, value));
        }

        // name(p, q) = expr
        if tokens.get(1).is_some_and(|t| t.is_delimiter("(")) {
            if let Some(close) = matching_close(tokens, 1) {
                if tokens.get(close + 1).is_some_and(|t| t.is_delimiter("=")) {
                    let parameters = parameter_list(&tokens[2..close])?;
                    let body = tokens[close + 2..].to_vec();
                    if body.is_empty() {
                        return Err(FormixError::Syntax(format!("function '{}' has no body", name)));
                    }
                    let function = GenericValue::indirect(Procedure::lambda(parameters, body));
                    return Ok(session.define(name, function));
                }
            }
        }
    }

    evaluate_expression(session, tokens).map(Outcome::Value)
}

/// Evaluate one complete expression
pub fn evaluate_expression<D: Domain>(session: &mut Session<D>, tokens: &[Token]) -> Result<ValueOf<D>> {
    if tokens.is_empty() {
        return Err(FormixError::Syntax("empty expression".to_string()));
    }
    let mut evaluator = Evaluator::new(session, tokens);
    let value = evaluator.expression(0)?;
    evaluator.finish()?;
    Ok(value)
}

// ============================================================================
// Expressions
// ============================================================================

/// Operator found at the cursor
struct OperatorRef<D: Domain> {
    name: String,
    precedence: u32,
    notation: Notation,
    operation: Rc<dyn Operation<D>>,
}

struct Evaluator<'s, 't, D: Domain> {
    session: &'s mut Session<D>,
    tokens: &'t [Token],
    position: usize,
}

impl<'s, 't, D: Domain> Evaluator<'s, 't, D> {
    fn new(session: &'s mut Session<D>, tokens: &'t [Token]) -> Self {
        Self {
            session,
            tokens,
            position: 0,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Result<&'t Token> {
        let token = self
            .tokens
            .get(self.position)
            .ok_or_else(|| FormixError::Syntax("unexpected end of statement".to_string()))?;
        self.position += 1;
        Ok(token)
    }

    fn accept(&mut self, delimiter: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_delimiter(delimiter)) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, delimiter: &str) -> Result<()> {
        match self.peek() {
            Some(t) if t.is_delimiter(delimiter) => {
                self.position += 1;
                Ok(())
            }
            Some(t) => Err(FormixError::Syntax(format!("expected '{}', found '{}'", delimiter, t))),
            None => Err(FormixError::Syntax(format!("expected '{}' before end of statement", delimiter))),
        }
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(FormixError::Syntax(format!("unexpected '{}'", t))),
        }
    }

    /// Table operator named by the token at the cursor, if any
    fn operator_at_cursor(&self) -> Option<OperatorRef<D>> {
        let name = self.peek()?.symbol_name()?;
        if self.session.is_local(name) {
            return None;
        }
        let symbol = self.session.table().lookup(name)?;
        if !symbol.is_operator() {
            return None;
        }
        Some(OperatorRef {
            name: symbol.name.clone(),
            precedence: symbol.precedence?,
            notation: symbol.notation?,
            operation: Rc::clone(symbol.operation()?),
        })
    }

    fn apply(&mut self, operation: &Rc<dyn Operation<D>>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        trace!("apply {} to {} operand(s)", operation.name(), args.len());
        operation.execute(&mut *self.session, args)
    }

    fn expression(&mut self, min_precedence: u32) -> Result<ValueOf<D>> {
        let mut left = self.prefix()?;
        while let Some(op) = self.operator_at_cursor() {
            if op.precedence < min_precedence {
                break;
            }
            match op.notation {
                Notation::Postfix => {
                    self.position += 1;
                    left = self.apply(&op.operation, vec![left])?;
                }
                Notation::Infix | Notation::InfixRight => {
                    self.position += 1;
                    let next = if op.notation == Notation::Infix {
                        op.precedence + 1
                    } else {
                        op.precedence
                    };
                    let right = self.expression(next)?;
                    left = self.apply(&op.operation, vec![left, right])?;
                }
                Notation::Prefix => {
                    return Err(FormixError::Syntax(format!("prefix operator '{}' after an operand", op.name)))
                }
            }
        }
        Ok(left)
    }

    fn prefix(&mut self) -> Result<ValueOf<D>> {
        if let Some(op) = self.operator_at_cursor() {
            if op.notation == Notation::Prefix {
                self.position += 1;
                let operand = self.expression(op.precedence)?;
                return self.apply(&op.operation, vec![operand]);
            }
        }
        if self.accept("-") {
            let operand = self.expression(NEGATION_PRECEDENCE)?;
            let domain = self.session.domain_handle();
            return map_elements("negation", &operand, |x| Ok(domain.negate(x)));
        }
        if self.accept("+") {
            return self.expression(NEGATION_PRECEDENCE);
        }
        let value = self.primary()?;
        self.field_access(value)
    }

    fn field_access(&mut self, mut value: ValueOf<D>) -> Result<ValueOf<D>> {
        while self.peek().is_some_and(|t| t.is_delimiter(".")) {
            self.position += 1;
            let field = match self.next()? {
                Token::Identifier(name) => name,
                other => return Err(FormixError::Syntax(format!("expected a field name after '.', found '{}'", other))),
            };
            value = value.to_structure()?.field(field)?.clone();
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<ValueOf<D>> {
        let domain = self.session.domain_handle();
        match self.next()? {
            Token::Integer(n) => Ok(GenericValue::discrete(domain.from_integer(*n))),
            Token::Decimal { digits, scale } => {
                let value = match 10i64.checked_pow(*scale) {
                    Some(denominator) => domain.from_ratio(*digits, denominator)?,
                    None => domain.from_double(*digits as f64 / 10f64.powi(*scale as i32))?,
                };
                Ok(GenericValue::discrete(value))
            }
            Token::Float(x) => Ok(GenericValue::discrete(domain.from_double(*x)?)),
            Token::QuotedString(s) => Err(FormixError::Syntax(format!(
                "string \"{}\" is only allowed in configuration text",
                s
            ))),
            Token::Identifier(name) => self.identifier(name),
            Token::Delimiter(d) => match d.as_str() {
                "(" => {
                    let value = self.expression(0)?;
                    self.expect(")")?;
                    Ok(value)
                }
                "[" => self.array(),
                "{" => self.structure(),
                "\\" => self.lambda(),
                other => Err(FormixError::Syntax(format!("unexpected '{}'", other))),
            },
            Token::EndOfStatement => Err(FormixError::Syntax("unexpected ';'".to_string())),
        }
    }

    fn arguments(&mut self) -> Result<Vec<ValueOf<D>>> {
        let mut args = Vec::new();
        if self.accept(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression(0)?);
            if self.accept(",") {
                continue;
            }
            self.expect(")")?;
            return Ok(args);
        }
    }

    fn identifier(&mut self, name: &str) -> Result<ValueOf<D>> {
        if self.accept("(") {
            let args = self.arguments()?;
            return self.call(name, args);
        }
        if let Some(value) = self.session.read_local(name)? {
            return Ok(value);
        }
        let symbol = self.session.table().get(name)?;
        match &symbol.implementation {
            Implementation::Value(value) => Ok(value.clone()),
            Implementation::Operation(_) if symbol.kind == SymbolKind::ParameterizedFunction => {
                Ok(GenericValue::indirect(Procedure::Named(name.to_string())))
            }
            Implementation::Operation(_) => Err(FormixError::Syntax(format!("operator '{}' is missing an operand", name))),
            Implementation::Library(_) => Err(FormixError::NotValueProducing(name.to_string())),
        }
    }

    fn call(&mut self, name: &str, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        let target = match self.session.local(name) {
            Some(value) => value,
            None => {
                let symbol = self.session.table().get(name)?;
                match &symbol.implementation {
                    Implementation::Operation(op) => {
                        let op = Rc::clone(op);
                        return self.apply(&op, args);
                    }
                    Implementation::Value(value) => value.clone(),
                    Implementation::Library(_) => return Err(FormixError::NotValueProducing(name.to_string())),
                }
            }
        };
        match target.kind() {
            ValueKind::Indirect(procedure) => self.session.call_procedure(procedure, args),
            _ => Err(FormixError::type_mismatch(name, "function", target.type_name())),
        }
    }

    /// `\x, y -> body`; the body extends to the first unbalanced closer or
    /// top-level comma
    fn lambda(&mut self) -> Result<ValueOf<D>> {
        let mut parameters = Vec::new();
        loop {
            match self.next()? {
                Token::Identifier(name) => parameters.push(name.clone()),
                t if t.is_delimiter("->") && parameters.is_empty() => break,
                other => return Err(FormixError::Syntax(format!("expected a lambda parameter, found '{}'", other))),
            }
            if self.accept("->") {
                break;
            }
            self.expect(",")?;
        }

        let start = self.position;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Delimiter(d) if matches!(d.as_str(), "(" | "[" | "{") => depth += 1,
                Token::Delimiter(d) if matches!(d.as_str(), ")" | "]" | "}") => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::Delimiter(d) if d == "," && depth == 0 => break,
                Token::EndOfStatement if depth == 0 => break,
                _ => {}
            }
            self.position += 1;
        }
        if self.position == start {
            return Err(FormixError::Syntax("lambda has no body".to_string()));
        }
        let body = self.tokens[start..self.position].to_vec();
        Ok(GenericValue::indirect(Procedure::lambda(parameters, body)))
    }

    fn array(&mut self) -> Result<ValueOf<D>> {
        if self.accept("]") {
            return Ok(GenericValue::dimensioned(Vec::new()));
        }
        let mut rows: Vec<Vec<ValueOf<D>>> = Vec::new();
        let mut row = Vec::new();
        loop {
            row.push(self.expression(0)?);
            if self.accept(",") {
                continue;
            }
            if self.peek() == Some(&Token::EndOfStatement) {
                self.position += 1;
                rows.push(std::mem::take(&mut row));
                continue;
            }
            self.expect("]")?;
            rows.push(row);
            break;
        }

        if rows.len() == 1 {
            let items = rows.remove(0);
            if items.iter().all(GenericValue::is_discrete) {
                let values = items
                    .into_iter()
                    .map(GenericValue::into_discrete)
                    .collect::<Result<Vec<_>>>()?;
                return Ok(GenericValue::dimensioned(values));
            }
            // [[1, 2], [3, 4]]
            rows = items
                .into_iter()
                .map(|item| item.into_array().map(|xs| xs.into_iter().map(GenericValue::discrete).collect()))
                .collect::<Result<Vec<_>>>()?;
        }
        matrix_from_rows(rows)
    }

    fn structure(&mut self) -> Result<ValueOf<D>> {
        let mut structure = Structure::new();
        if self.accept("}") {
            return Ok(GenericValue::structured(structure));
        }
        loop {
            let field = match self.next()? {
                Token::Identifier(name) => name,
                other => return Err(FormixError::Syntax(format!("expected a field name, found '{}'", other))),
            };
            self.expect(":")?;
            let value = self.expression(0)?;
            structure.insert(field, value);
            if self.accept(",") {
                continue;
            }
            self.expect("}")?;
            return Ok(GenericValue::structured(structure));
        }
    }
}

fn matrix_from_rows<T: Clone>(rows: Vec<Vec<GenericValue<T>>>) -> Result<GenericValue<T>> {
    let columns = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|r| r.len() != columns) {
        return Err(FormixError::type_mismatch(
            "matrix",
            format!("rows of {} elements", columns),
            format!("a row of {}", row.len()),
        ));
    }
    let shape = (rows.len(), columns);
    let items = rows
        .into_iter()
        .flatten()
        .map(GenericValue::into_discrete)
        .collect::<Result<Vec<_>>>()?;
    Array2::from_shape_vec(shape, items)
        .map(GenericValue::matrix)
        .map_err(|e| FormixError::Evaluation(format!("matrix shape: {}", e)))
}
