use super::{operation, Collector, FactoryRequest, Library, LibraryRegistry, Product};
use crate::operation::UnaryFunction;
use formix_types::{Domain, Elementary, Result};

pub fn register<D: Domain>(registry: &mut LibraryRegistry<D>) {
    registry.register("formix.elementary", collector::<D>);
}

fn elementary<D: Domain>(request: &FactoryRequest<'_>, function: Elementary) -> Result<Product<D>> {
    operation(UnaryFunction::new(request.symbol, move |d: &D, x| d.elementary(function, x)))
}

pub fn collector<D: Domain>() -> Box<dyn Library<D>> {
    Box::new(
        Collector::new("formix.elementary")
            .with("sin", |_, r| elementary(r, Elementary::Sin))
            .with("cos", |_, r| elementary(r, Elementary::Cos))
            .with("tan", |_, r| elementary(r, Elementary::Tan))
            .with("exp", |_, r| elementary(r, Elementary::Exp))
            .with("ln", |_, r| elementary(r, Elementary::Ln))
            .with("sqrt", |_, r| elementary(r, Elementary::Sqrt))
            .with("abs", |_, r| elementary(r, Elementary::Abs)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::testing::StaticContext;
    use crate::operation::Operation;
    use formix_types::{Convertible, FactoredDomain, GenericValue, RealDomain};

    #[test]
    fn test_every_function_is_exposed() {
        let library = collector::<RealDomain>();
        assert_eq!(library.exposed(), vec!["abs", "cos", "exp", "ln", "sin", "sqrt", "tan"]);
    }

    #[test]
    fn test_exact_square_root_in_factored() {
        let d = FactoredDomain::new();
        let factory = collector::<FactoredDomain>().factory("sqrt").unwrap();
        let sqrt = match factory(&d, &FactoryRequest { symbol: "sqrt", precedence: None }).unwrap() {
            Product::Operation(op) => op,
            Product::Value(_) => unreachable!(),
        };
        let mut ctx = StaticContext::new(FactoredDomain::new());
        let quarter = GenericValue::discrete(d.from_ratio(9, 4).unwrap());
        let r = sqrt.execute(&mut ctx, vec![quarter]).unwrap();
        assert_eq!(r, GenericValue::discrete(d.from_ratio(3, 2).unwrap()));
    }
}
