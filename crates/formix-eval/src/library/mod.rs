//! Library collectors and their registry
//!
//! A collector exposes a batch of named factories. The registry maps collector
//! names to constructors and is filled at startup by each library module's
//! `register` function; the loader instantiates collectors by name.

pub mod arithmetic;
pub mod calculus;
pub mod constants;
pub mod consumers;
pub mod elementary;
pub mod special;

use crate::operation::{Operation, ValueOf};
use formix_types::{Domain, FormixError, Result};
use std::collections::{BTreeMap, HashMap};

/// Descriptor lines of the library every session starts with
pub const STANDARD_LIBRARY: &[&str] = &[
    "LIBRARY,formix.arithmetic,Arithmetic,arith,arith",
    "LIBRARY,formix.elementary,Elementary functions,elem,elem",
    "LIBRARY,formix.constants,Constants,const,const",
    "LIBRARY,formix.calculus,Calculus marks and consumers,calc,calc",
    "LIBRARY,formix.special,Special functions,special,special",
    "OPERATOR,arith,Addition,add,+,4,infix",
    "OPERATOR,arith,Subtraction,subtract,-,4,infix",
    "OPERATOR,arith,Multiplication,multiply,*,6,infix",
    "OPERATOR,arith,Division,divide,/,6,infix",
    "OPERATOR,arith,Exponentiation,power,^,8,right",
    "OPERATOR,arith,Factorial,factorial,!,10,postfix",
    "FUNCTION,arith,Minimum,min,min",
    "FUNCTION,arith,Maximum,max,max",
    "FUNCTION,arith,Apply to argument list,apply,apply",
    "FUNCTION,elem,Sine,sin,sin",
    "FUNCTION,elem,Cosine,cos,cos",
    "FUNCTION,elem,Tangent,tan,tan",
    "FUNCTION,elem,Exponential,exp,exp",
    "FUNCTION,elem,Natural logarithm,ln,ln",
    "FUNCTION,elem,Square root,sqrt,sqrt",
    "FUNCTION,elem,Absolute value,abs,abs",
    "VALUE,const,Pi,pi,pi",
    "VALUE,const,Euler's number,e,e",
    "OPERATOR,calc,Derivative mark,derivative_mark,D,90,prefix",
    "OPERATOR,calc,Interval mark,interval_mark,INTERVAL,90,prefix",
    "OPERATOR,calc,Tanh-Sinh mark,tanh_sinh_mark,TSQ,90,prefix",
    "OPERATOR,calc,Clenshaw-Curtis mark,clenshaw_curtis_mark,CCQ,90,prefix",
    "OPERATOR,calc,Trapezoid mark,trapezoid_mark,TRAP,90,prefix",
    "OPERATOR,calc,Adjusted trapezoid mark,trapezoid_adjustment_mark,TRAPADJ,90,prefix",
    "FUNCTION,calc,Derivative request,dmark,dmark",
    "FUNCTION,calc,Trapezoid request,trapezoid,trapezoid",
    "FUNCTION,calc,Tanh-Sinh request,tanhsinh,tanhsinh",
    "FUNCTION,calc,Clenshaw-Curtis request,clenshaw,clenshaw",
    "FUNCTION,calc,Derivative,derivative,derivative",
    "FUNCTION,calc,Definite integral,integrate,integrate",
    "FUNCTION,calc,Tabulation,tabulate,tabulate",
    "FUNCTION,calc,Sum,sum,sum",
    "FUNCTION,calc,Product,product,product",
    "FUNCTION,special,Gamma function,gamma,gamma",
    "FUNCTION,special,Log-gamma function,lngamma,lngamma",
    "FUNCTION,special,Bessel function J0,besselj,J0,,,alpha=0",
    "FUNCTION,special,Bessel function J1,besselj,J1,,,alpha=1",
];

/// Extra lines for domains with an imaginary unit
pub const COMPLEX_LIBRARY: &[&str] = &["VALUE,const,Imaginary unit,i,i"];

/// What a factory is invoked with
#[derive(Debug, Clone, Copy)]
pub struct FactoryRequest<'a> {
    pub symbol: &'a str,
    pub precedence: Option<u32>,
}

/// What a factory builds
pub enum Product<D: Domain> {
    Operation(Box<dyn Operation<D>>),
    Value(ValueOf<D>),
}

pub type Factory<D> = fn(&D, &FactoryRequest<'_>) -> Result<Product<D>>;

pub type LibraryConstructor<D> = fn() -> Box<dyn Library<D>>;

/// A configuration-time batch of named factories
pub trait Library<D: Domain> {
    fn name(&self) -> &str;

    fn factory(&self, name: &str) -> Option<Factory<D>>;

    /// Factory names, sorted
    fn exposed(&self) -> Vec<&str>;
}

pub struct Collector<D: Domain> {
    name: &'static str,
    factories: BTreeMap<&'static str, Factory<D>>,
}

impl<D: Domain> Collector<D> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            factories: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, factory: Factory<D>) -> Self {
        self.factories.insert(name, factory);
        self
    }
}

impl<D: Domain> Library<D> for Collector<D> {
    fn name(&self) -> &str {
        self.name
    }

    fn factory(&self, name: &str) -> Option<Factory<D>> {
        self.factories.get(name).copied()
    }

    fn exposed(&self) -> Vec<&str> {
        self.factories.keys().copied().collect()
    }
}

/// Startup-time table of library constructors
pub struct LibraryRegistry<D: Domain> {
    constructors: HashMap<String, LibraryConstructor<D>>,
}

impl<D: Domain> LibraryRegistry<D> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry holding every built-in collector
    pub fn standard() -> Self {
        let mut registry = Self::new();
        arithmetic::register(&mut registry);
        elementary::register(&mut registry);
        constants::register(&mut registry);
        calculus::register(&mut registry);
        special::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &str, constructor: LibraryConstructor<D>) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Library<D>>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| FormixError::configuration(name, "no library collector with this name"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<D: Domain> Default for LibraryRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Box an operation as a factory product
pub(crate) fn operation<D: Domain>(op: impl Operation<D> + 'static) -> Result<Product<D>> {
    Ok(Product::Operation(Box::new(op)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use formix_types::RealDomain;

    #[test]
    fn test_standard_registry() {
        let registry = LibraryRegistry::<RealDomain>::standard();
        assert_eq!(
            registry.names(),
            vec![
                "formix.arithmetic",
                "formix.calculus",
                "formix.constants",
                "formix.elementary",
                "formix.special"
            ]
        );
    }

    #[test]
    fn test_unknown_collector() {
        let registry = LibraryRegistry::<RealDomain>::standard();
        let err = registry.instantiate("formix.graphics").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Configuration error in formix.graphics: no library collector with this name"
        );
    }

    #[test]
    fn test_collector_exposes_factories() {
        let registry = LibraryRegistry::<RealDomain>::standard();
        let arith = registry.instantiate("formix.arithmetic").unwrap();
        assert!(arith.exposed().contains(&"add"));
        assert!(arith.factory("add").is_some());
        assert!(arith.factory("teleport").is_none());
    }
}
