//! Iteration consumers
//!
//! Each consumer takes the calculus mark off its marked argument, dispatches
//! on the mark's kind and runs the matching algorithm from
//! `formix_numerical` with the target procedure as integrand.
//!
//! ## Consumers
//! - derivative(f, x): x marked by D or dmark
//! - integrate(f, bounds): bounds marked by TRAP, TRAPADJ, TSQ or CCQ
//! - tabulate(f, bounds): bounds marked by INTERVAL
//! - sum(f, bounds), product(f, bounds): unmarked bounds step by one,
//!   INTERVAL-marked bounds step by the interval step

use super::{operation, FactoryRequest, Product};
use crate::operation::{EvaluationContext, ParameterRange, ParameterizedFunction, ValueOf};
use formix_numerical::{
    central_difference, clenshaw_curtis, iterate_product, iterate_sum, sample_interval, tanh_sinh, trapezoid,
    trapezoid_adjusted,
};
use formix_types::{Domain, FormixError, GenericValue, MarkState, Metadata, Procedure, Result, ValueKind};
use log::debug;
use ndarray::Array2;

const DERIVATIVE_POINT: &str = "a point marked with D or dmark";
const QUADRATURE_BOUNDS: &str = "a 2-element bounds array marked with TRAP, TRAPADJ, TSQ or CCQ";
const INTERVAL_BOUNDS: &str = "a 2-element bounds array marked with INTERVAL";

/// Bound variable, range and target of one consumer run
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationDigest<T> {
    pub variable: Option<String>,
    pub lower: T,
    pub upper: T,
    pub target: Procedure,
}

impl<T> EvaluationDigest<T> {
    pub fn new(target: &Procedure, lower: T, upper: T) -> Self {
        Self {
            variable: target.bound_variable().map(str::to_string),
            lower,
            upper,
            target: target.clone(),
        }
    }

    pub fn describe<D: Domain<Value = T>>(&self, domain: &D) -> String {
        format!(
            "{} over {} in [{}, {}]",
            self.target,
            self.variable.as_deref().unwrap_or("_"),
            domain.format(&self.lower),
            domain.format(&self.upper)
        )
    }
}

fn unrecognized(consumer: &str, metadata: &Metadata) -> FormixError {
    FormixError::UnrecognizedMetadata {
        consumer: consumer.to_string(),
        kind: metadata.kind().to_string(),
    }
}

fn target_procedure<T>(consumer: &str, value: &GenericValue<T>) -> Result<Procedure> {
    match value.kind() {
        ValueKind::Indirect(p) => Ok(p.clone()),
        _ => Err(FormixError::type_mismatch(consumer, "function as first argument", value.type_name())),
    }
}

/// Lower and upper bound of a 2-element array
fn bound_pair<T: Clone>(consumer: &str, expected: &str, bounds: &GenericValue<T>) -> Result<(T, T)> {
    match bounds.kind() {
        ValueKind::Dimensioned(xs) if xs.len() == 2 => Ok((xs[0].clone(), xs[1].clone())),
        ValueKind::Dimensioned(xs) => Err(FormixError::type_mismatch(
            consumer,
            expected,
            format!("Dimensioned[{}]", xs.len()),
        )),
        _ => Err(FormixError::type_mismatch(consumer, expected, bounds.type_name())),
    }
}

fn split_arguments<T>(consumer: &str, args: Vec<GenericValue<T>>) -> Result<(GenericValue<T>, GenericValue<T>)> {
    let count = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(FormixError::ParameterCount {
            function: consumer.to_string(),
            expected: "2".to_string(),
            got: count,
        }),
    }
}

fn consumer<D, F>(request: &FactoryRequest<'_>, run: F) -> Result<Product<D>>
where
    D: Domain,
    F: Fn(&str, &mut dyn EvaluationContext<D>, Procedure, ValueOf<D>) -> Result<ValueOf<D>> + 'static,
{
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::exactly(2),
        move |ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>| {
            let (target, marked) = split_arguments(&name, args)?;
            let procedure = target_procedure(&name, &target)?;
            run(&name, ctx, procedure, marked)
        },
    ))
}

// ============================================================================
// DERIVATIVE
// ============================================================================

fn derivative<D: Domain>(
    name: &str,
    ctx: &mut dyn EvaluationContext<D>,
    target: Procedure,
    mut point: ValueOf<D>,
) -> Result<ValueOf<D>> {
    let metadata = point.consume(name, DERIVATIVE_POINT)?;
    let (order, delta) = match metadata {
        Metadata::DerivativeRequest { order, delta } => (order, delta),
        other => return Err(unrecognized(name, &other)),
    };
    let x = point.into_discrete()?;
    let domain = ctx.domain();
    let delta = delta.unwrap_or_else(|| ctx.config().derivative_delta_for(order));
    let h = domain.from_double(delta)?;

    let digest = EvaluationDigest::new(&target, x.clone(), x.clone());
    debug!("{}: order {} of {}", name, order, digest.describe(&*domain));

    let value = central_difference(&*domain, |v| ctx.eval_at(&target, v), &x, order, &h)?;
    Ok(GenericValue::discrete(value))
}

pub(crate) fn derivative_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    consumer(request, derivative::<D>)
}

// ============================================================================
// INTEGRATION
// ============================================================================

fn integrate<D: Domain>(
    name: &str,
    ctx: &mut dyn EvaluationContext<D>,
    target: Procedure,
    mut bounds: ValueOf<D>,
) -> Result<ValueOf<D>> {
    let (a, b) = bound_pair(name, QUADRATURE_BOUNDS, &bounds)?;
    let metadata = bounds.consume(name, QUADRATURE_BOUNDS)?;
    let domain = ctx.domain();
    let digest = EvaluationDigest::new(&target, a.clone(), b.clone());
    debug!("{}: {} with {}", name, digest.describe(&*domain), metadata);

    let f = |v: &D::Value| ctx.eval_at(&target, v);
    let value = match metadata {
        Metadata::TrapezoidalEvaluation { panels } => trapezoid(&*domain, f, &a, &b, panels)?,
        Metadata::TrapezoidalAdjustment { panels } => trapezoid_adjusted(&*domain, f, &a, &b, panels)?,
        Metadata::TanhSinhEvaluation { levels, tolerance } => {
            tanh_sinh(&*domain, f, &a, &b, levels, tolerance)?.value
        }
        Metadata::ClenshawCurtisEvaluation { points } => clenshaw_curtis(&*domain, f, &a, &b, points)?,
        other @ (Metadata::DerivativeRequest { .. } | Metadata::IntervalEvaluation { .. }) => {
            return Err(unrecognized(name, &other))
        }
    };
    Ok(GenericValue::discrete(value))
}

pub(crate) fn integrate_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    consumer(request, integrate::<D>)
}

// ============================================================================
// INTERVAL ITERATION
// ============================================================================

/// Rows of (x, f(x)) over an INTERVAL-marked range
fn tabulate<D: Domain>(
    name: &str,
    ctx: &mut dyn EvaluationContext<D>,
    target: Procedure,
    mut bounds: ValueOf<D>,
) -> Result<ValueOf<D>> {
    let (a, b) = bound_pair(name, INTERVAL_BOUNDS, &bounds)?;
    let step = match bounds.consume(name, INTERVAL_BOUNDS)? {
        Metadata::IntervalEvaluation { step } => step.unwrap_or(ctx.config().interval_step),
        other => return Err(unrecognized(name, &other)),
    };
    let domain = ctx.domain();
    let step = domain.from_double(step)?;
    debug!("{}: {}", name, EvaluationDigest::new(&target, a.clone(), b.clone()).describe(&*domain));

    let samples = sample_interval(&*domain, |v| ctx.eval_at(&target, v), &a, &b, &step)?;
    let rows = samples.len();
    let items = samples
        .points
        .into_iter()
        .zip(samples.values)
        .flat_map(|(x, y)| [x, y])
        .collect();
    Array2::from_shape_vec((rows, 2), items)
        .map(GenericValue::matrix)
        .map_err(|e| FormixError::Evaluation(format!("{}: {}", name, e)))
}

pub(crate) fn tabulate_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    consumer(request, tabulate::<D>)
}

/// Step for sum/product: one for unmarked bounds, the interval step otherwise
fn iteration_step<D: Domain>(name: &str, ctx: &dyn EvaluationContext<D>, bounds: &mut ValueOf<D>) -> Result<D::Value> {
    let domain = ctx.domain();
    if *bounds.mark_state() == MarkState::Unmarked {
        return Ok(domain.one());
    }
    match bounds.consume(name, INTERVAL_BOUNDS)? {
        Metadata::IntervalEvaluation { step } => Ok(domain.from_double(step.unwrap_or(ctx.config().interval_step))?),
        other => Err(unrecognized(name, &other)),
    }
}

fn sum<D: Domain>(name: &str, ctx: &mut dyn EvaluationContext<D>, target: Procedure, mut bounds: ValueOf<D>) -> Result<ValueOf<D>> {
    let (a, b) = bound_pair(name, INTERVAL_BOUNDS, &bounds)?;
    let step = iteration_step(name, &*ctx, &mut bounds)?;
    let domain = ctx.domain();
    debug!("{}: {}", name, EvaluationDigest::new(&target, a.clone(), b.clone()).describe(&*domain));
    let value = iterate_sum(&*domain, |v| ctx.eval_at(&target, v), &a, &b, &step)?;
    Ok(GenericValue::discrete(value))
}

pub(crate) fn sum_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    consumer(request, sum::<D>)
}

fn product<D: Domain>(
    name: &str,
    ctx: &mut dyn EvaluationContext<D>,
    target: Procedure,
    mut bounds: ValueOf<D>,
) -> Result<ValueOf<D>> {
    let (a, b) = bound_pair(name, INTERVAL_BOUNDS, &bounds)?;
    let step = iteration_step(name, &*ctx, &mut bounds)?;
    let domain = ctx.domain();
    debug!("{}: {}", name, EvaluationDigest::new(&target, a.clone(), b.clone()).describe(&*domain));
    let value = iterate_product(&*domain, |v| ctx.eval_at(&target, v), &a, &b, &step)?;
    Ok(GenericValue::discrete(value))
}

pub(crate) fn product_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    consumer(request, product::<D>)
}
