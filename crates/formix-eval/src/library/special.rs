//! Special functions
//!
//! Requests fail with an unimplemented-function error until the session runs
//! `!init`. Each Bessel J symbol is its own configured instance: the order
//! `alpha` comes from the descriptor's config text and is never shared.

use super::{operation, Collector, FactoryRequest, Library, LibraryRegistry, Product};
use crate::operation::{map_elements, Arity, EvaluationContext, MarkupFormatter, Operation, UnaryFunction, ValueOf};
use crate::parameters::{ParameterValue, Parameterization};
use formix_types::{Domain, FormixError, Result};

pub fn register<D: Domain>(registry: &mut LibraryRegistry<D>) {
    registry.register("formix.special", collector::<D>);
}

pub fn collector<D: Domain>() -> Box<dyn Library<D>> {
    Box::new(
        Collector::new("formix.special")
            .with("gamma", |_, r| operation(UnaryFunction::new(r.symbol, |d: &D, x| d.gamma(x))))
            .with("lngamma", |_, r| operation(UnaryFunction::new(r.symbol, |d: &D, x| d.ln_gamma(x))))
            .with("besselj", bessel_j_factory::<D>),
    )
}

/// Bessel function of the first kind with a fixed order
pub struct BesselJ {
    name: String,
    parameters: Parameterization,
}

impl BesselJ {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Parameterization::empty(),
        }
    }

    pub fn parameters(&self) -> &Parameterization {
        &self.parameters
    }

    /// The order, resolving a symbolic value through the session
    fn alpha<D: Domain>(&self, ctx: &dyn EvaluationContext<D>) -> Result<f64> {
        match self.parameters.require(&self.name, "alpha")? {
            ParameterValue::Symbol(symbol) => {
                let value = ctx.lookup_value(symbol)?;
                Ok(ctx.domain().to_double(value.to_discrete()?))
            }
            other => other.as_f64().ok_or_else(|| {
                FormixError::configuration(&self.name, format!("alpha must be numeric, got {}", other))
            }),
        }
    }
}

impl<D: Domain> Operation<D> for BesselJ {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::Unary
    }

    fn configure(&mut self, text: &str) -> Result<()> {
        let parameters = Parameterization::parse(&self.name, text)?;
        parameters.restrict_to(&self.name, &["alpha"])?;
        parameters.require(&self.name, "alpha")?;
        self.parameters = parameters;
        Ok(())
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        Arity::Unary.range().check(&self.name, args.len())?;
        let alpha = self.alpha(&*ctx)?;
        let domain = ctx.domain();
        map_elements(&self.name, &args[0], |x| domain.bessel_j(alpha, x))
    }

    fn markup_for_display(&self, operator: &str, operands: &[String], formatter: &dyn MarkupFormatter) -> String {
        formatter.function(operator, operands)
    }
}

fn bessel_j_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    operation::<D>(BesselJ::new(request.symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::testing::StaticContext;
    use approx::assert_relative_eq;
    use formix_types::{GenericValue, RealDomain};

    #[test]
    fn test_instances_keep_their_own_alpha() {
        let mut j0 = BesselJ::new("J0");
        let mut j1 = BesselJ::new("J1");
        Operation::<RealDomain>::configure(&mut j0, "alpha=0").unwrap();
        Operation::<RealDomain>::configure(&mut j1, "alpha=1").unwrap();

        let domain = RealDomain::new();
        domain.init_special_functions();
        let mut ctx = StaticContext::new(domain);

        let x = vec![GenericValue::discrete(1.0)];
        let r0 = Operation::<RealDomain>::execute(&j0, &mut ctx, x.clone()).unwrap();
        let r1 = Operation::<RealDomain>::execute(&j1, &mut ctx, x).unwrap();
        assert_relative_eq!(*r0.to_discrete().unwrap(), 0.7651976865579666, epsilon = 1e-12);
        assert_relative_eq!(*r1.to_discrete().unwrap(), 0.44005058574493355, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_alpha_is_a_configuration_error() {
        let mut j = BesselJ::new("Jx");
        let err = Operation::<RealDomain>::configure(&mut j, "").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error in Jx: missing parameter 'alpha'");
        assert!(Operation::<RealDomain>::configure(&mut j, "alpha=1 beta=2").is_err());
    }

    #[test]
    fn test_uninitialized_domain_refuses() {
        let mut j = BesselJ::new("J0");
        Operation::<RealDomain>::configure(&mut j, "alpha=0").unwrap();
        let mut ctx = StaticContext::new(RealDomain::new());
        let err = Operation::<RealDomain>::execute(&j, &mut ctx, vec![GenericValue::discrete(1.0)]).unwrap_err();
        assert_eq!(err.to_string(), "Unimplemented function: BesselJ in real domain");
    }
}
