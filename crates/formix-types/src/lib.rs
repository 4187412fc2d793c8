//! Formix core types
//!
//! Numeric domains, the generic value wrapper passed on the evaluation stack,
//! calculus marks, procedure references and the shared error taxonomy.

pub mod domain;
pub mod error;
pub mod metadata;
pub mod procedure;
pub mod token;
pub mod value;

// Re-exports
pub use domain::{
    Arithmetic, ComplexDomain, Convertible, Domain, Elementary, Factored, FactoredDomain,
    Ordered, RealDomain, SpecialFunctions,
};
pub use error::{DomainError, FormixError, Result};
pub use metadata::{MarkState, Metadata, MetadataKind};
pub use procedure::{Lambda, Procedure, ProcedureEvaluator};
pub use token::{Token, TokenSource};
pub use value::{GenericValue, Structure, ValueKind};
