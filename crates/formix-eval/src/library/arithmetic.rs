//! Arithmetic operators and list helpers
//!
//! Binary operators broadcast scalars over arrays and work elementwise on
//! equally shaped operands.

use super::{operation, Collector, FactoryRequest, Library, LibraryRegistry, Product};
use crate::operation::{
    map_elements, spread_arguments, Arity, BinaryFunction, EvaluationContext, MarkupFormatter, Operation,
    ParameterRange, ParameterizedFunction, ValueOf,
};
use formix_types::{Domain, FormixError, GenericValue, Result, ValueKind};
use std::cmp::Ordering;

/// Largest argument accepted by `!`
const FACTORIAL_LIMIT: i64 = 100_000;

pub fn register<D: Domain>(registry: &mut LibraryRegistry<D>) {
    registry.register("formix.arithmetic", collector::<D>);
}

pub fn collector<D: Domain>() -> Box<dyn Library<D>> {
    Box::new(
        Collector::new("formix.arithmetic")
            .with("add", |_, r| operation(BinaryFunction::new(r.symbol, |d: &D, a, b| Ok(d.add(a, b)?))))
            .with("subtract", |_, r| {
                operation(BinaryFunction::new(r.symbol, |d: &D, a, b| Ok(d.subtract(a, b)?)))
            })
            .with("multiply", |_, r| {
                operation(BinaryFunction::new(r.symbol, |d: &D, a, b| Ok(d.multiply(a, b)?)))
            })
            .with("divide", |_, r| {
                operation(BinaryFunction::new(r.symbol, |d: &D, a, b| Ok(d.divide(a, b)?)))
            })
            .with("power", |_, r| operation(BinaryFunction::new(r.symbol, |d: &D, a, b| Ok(d.power(a, b)?))))
            .with("factorial", factorial_factory::<D>)
            .with("min", |_, r| extremum(r, Ordering::Less))
            .with("max", |_, r| extremum(r, Ordering::Greater))
            .with("apply", apply_factory::<D>),
    )
}

// ============================================================================
// FACTORIAL
// ============================================================================

struct Factorial {
    name: String,
}

fn factorial_of<D: Domain>(domain: &D, x: &D::Value) -> Result<D::Value> {
    let n = domain.to_integer(x)?;
    if !(0..=FACTORIAL_LIMIT).contains(&n) {
        return Err(FormixError::Evaluation(format!(
            "factorial is defined for integers 0..={}, got {}",
            FACTORIAL_LIMIT, n
        )));
    }
    let mut result = domain.one();
    for k in 2..=n {
        result = domain.multiply(&result, &domain.from_integer(k))?;
    }
    Ok(result)
}

impl<D: Domain> Operation<D> for Factorial {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::Unary
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        Arity::Unary.range().check(&self.name, args.len())?;
        let domain = ctx.domain();
        map_elements(&self.name, &args[0], |x| factorial_of(&*domain, x))
    }

    fn markup_for_display(&self, operator: &str, operands: &[String], formatter: &dyn MarkupFormatter) -> String {
        match operands {
            [operand] => formatter.postfix(operator, operand),
            _ => formatter.function(operator, operands),
        }
    }
}

fn factorial_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    operation::<D>(Factorial {
        name: request.symbol.to_string(),
    })
}

// ============================================================================
// LIST HELPERS
// ============================================================================

/// min/max over the arguments, or over the elements of a single array
fn extremum<D: Domain>(request: &FactoryRequest<'_>, wanted: Ordering) -> Result<Product<D>> {
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::at_least(1),
        move |ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>| {
            let domain = ctx.domain();
            let values: Vec<D::Value> = match args.as_slice() {
                [single] if single.is_dimensioned() => single.to_array()?.to_vec(),
                _ => args
                    .iter()
                    .map(|a| a.to_discrete().cloned())
                    .collect::<Result<Vec<_>>>()?,
            };
            let mut best = values
                .first()
                .cloned()
                .ok_or_else(|| FormixError::Evaluation(format!("{} of an empty array", name)))?;
            for v in &values[1..] {
                if domain.compare(v, &best) == wanted {
                    best = v.clone();
                }
            }
            Ok(GenericValue::discrete(best))
        },
    ))
}

fn apply_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::exactly(2),
        move |ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>| {
            let procedure = match args[0].kind() {
                ValueKind::Indirect(p) => p.clone(),
                _ => return Err(FormixError::type_mismatch(&name, "function as first argument", args[0].type_name())),
            };
            let arguments = spread_arguments(&name, &args[1])?;
            ctx.call(&procedure, arguments)
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::testing::StaticContext;
    use formix_types::{Convertible, FactoredDomain, RealDomain};

    fn build<D: Domain>(domain: &D, name: &str) -> Box<dyn Operation<D>> {
        let library = collector::<D>();
        let factory = library.factory(name).unwrap();
        match factory(domain, &FactoryRequest { symbol: name, precedence: None }).unwrap() {
            Product::Operation(op) => op,
            Product::Value(_) => panic!("{} is not an operation", name),
        }
    }

    #[test]
    fn test_power_and_division() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let pow = build(&RealDomain::new(), "power");
        let r = pow.execute(&mut ctx, vec![GenericValue::discrete(2.0), GenericValue::discrete(10.0)]).unwrap();
        assert_eq!(r, GenericValue::discrete(1024.0));

        let div = build(&RealDomain::new(), "divide");
        let err = div.execute(&mut ctx, vec![GenericValue::discrete(1.0), GenericValue::discrete(0.0)]).unwrap_err();
        assert_eq!(err.to_string(), "Division by zero in real domain");
    }

    #[test]
    fn test_factorial_exact() {
        let d = FactoredDomain::new();
        let mut ctx = StaticContext::new(FactoredDomain::new());
        let fact = build(&d, "factorial");
        let r = fact.execute(&mut ctx, vec![GenericValue::discrete(d.from_integer(20))]).unwrap();
        assert_eq!(r.to_discrete().unwrap().to_string(), "2432902008176640000");
        assert!(fact
            .execute(&mut ctx, vec![GenericValue::discrete(d.from_ratio(1, 2).unwrap())])
            .is_err());
    }

    #[test]
    fn test_min_max() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let min = build(&RealDomain::new(), "min");
        let max = build(&RealDomain::new(), "max");
        let args = vec![GenericValue::discrete(3.0), GenericValue::discrete(-1.0), GenericValue::discrete(2.0)];
        assert_eq!(min.execute(&mut ctx, args.clone()).unwrap(), GenericValue::discrete(-1.0));
        assert_eq!(max.execute(&mut ctx, args).unwrap(), GenericValue::discrete(3.0));
        let list = vec![GenericValue::dimensioned(vec![4.0, 9.0, 1.0])];
        assert_eq!(max.execute(&mut ctx, list).unwrap(), GenericValue::discrete(9.0));
    }
}
