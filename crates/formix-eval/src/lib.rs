//! Formix evaluation core
//!
//! Everything between a token stream and a value: the operator framework,
//! the session-wide symbol table, the library descriptor loader, the standard
//! libraries (arithmetic, elementary, constants, calculus, special) and the
//! [`Session`] that evaluates statements.
//!
//! ```no_run
//! use formix_eval::Session;
//! use formix_types::RealDomain;
//!
//! let mut session = Session::new(RealDomain::new()).unwrap();
//! let area = session.evaluate("integrate(\\x -> x ^ 2, TRAP [0, 3])").unwrap();
//! ```

pub mod commands;
pub mod config;
pub mod evaluator;
pub mod library;
pub mod loader;
pub mod operation;
pub mod parameters;
pub mod scanner;
pub mod session;
pub mod symbols;

// Re-exports
pub use config::SessionConfig;
pub use library::{Library, LibraryRegistry, COMPLEX_LIBRARY, STANDARD_LIBRARY};
pub use loader::{DescriptorKind, LibraryDescriptor, Loader};
pub use operation::{
    Arity, EvaluationContext, MarkupFormatter, MathMlFormatter, Operation, ParameterRange, PlainFormatter, ValueOf,
};
pub use parameters::{ParameterValue, Parameterization};
pub use scanner::Scanner;
pub use session::{Outcome, Session};
pub use symbols::{NamedSymbol, Notation, SymbolKind, SymbolTable};
