//! Procedure references carried by indirect values
//!
//! Defines the seam through which numerical consumers call back into the
//! evaluator without depending on it.

use crate::error::Result;
use crate::token::Token;
use crate::value::GenericValue;
use std::fmt;
use std::rc::Rc;

/// Anonymous function: parameter names plus an unevaluated body
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub parameters: Vec<String>,
    pub body: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Procedure {
    /// A function registered in the symbol table
    Named(String),
    Lambda(Rc<Lambda>),
}

impl Procedure {
    pub fn lambda(parameters: Vec<String>, body: Vec<Token>) -> Self {
        Procedure::Lambda(Rc::new(Lambda { parameters, body }))
    }

    /// Name of the bound variable for single-parameter lambdas
    pub fn bound_variable(&self) -> Option<&str> {
        match self {
            Procedure::Lambda(l) => l.parameters.first().map(String::as_str),
            Procedure::Named(_) => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Named(name) => write!(f, "{}", name),
            Procedure::Lambda(l) => {
                let body: Vec<String> = l.body.iter().map(|t| t.to_string()).collect();
                write!(f, "\\{} -> {}", l.parameters.join(", "), body.join(" "))
            }
        }
    }
}

/// Trait for evaluating procedures at specific points
///
/// Implemented by the evaluator and used by calculus consumers so that the
/// algorithms never depend on the evaluator type directly.
pub trait ProcedureEvaluator<T> {
    /// Call `procedure` with a full argument list
    fn call(&mut self, procedure: &Procedure, arguments: Vec<GenericValue<T>>) -> Result<GenericValue<T>>;

    /// Evaluate a single-argument procedure at a discrete point
    fn eval_at(&mut self, procedure: &Procedure, x: &T) -> Result<T>
    where
        T: Clone,
    {
        let result = self.call(procedure, vec![GenericValue::discrete(x.clone())])?;
        result.to_discrete().cloned()
    }
}
