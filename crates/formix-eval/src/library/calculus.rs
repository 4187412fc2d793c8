//! Calculus marks
//!
//! Marking operators never compute. Each attaches one [`Metadata`] to its
//! operand and hands the value back; a consumer from [`super::consumers`]
//! later takes the mark and runs the algorithm it names.
//!
//! ## Prefix marks (config text in brackets)
//! - D [order, delta]: derivative request, exact unless delta is set
//! - INTERVAL [step]: interval evaluation
//! - TSQ [levels, tolerance]: Tanh-Sinh quadrature
//! - CCQ [points]: Clenshaw-Curtis quadrature
//! - TRAP [panels]: trapezoid rule
//! - TRAPADJ [panels]: trapezoid rule with end correction
//!
//! ## Parameterized marks
//! - dmark(x, order, delta?)
//! - trapezoid(bounds, panels)
//! - tanhsinh(bounds, levels, tolerance?)
//! - clenshaw(bounds, points)

use super::consumers;
use super::{operation, Collector, FactoryRequest, Library, LibraryRegistry, Product};
use crate::operation::{Arity, EvaluationContext, Operation, ParameterRange, ParameterizedFunction, ValueOf};
use crate::parameters::{ParameterValue, Parameterization};
use formix_types::{Domain, FormixError, Metadata, Result};

pub fn register<D: Domain>(registry: &mut LibraryRegistry<D>) {
    registry.register("formix.calculus", collector::<D>);
}

pub fn collector<D: Domain>() -> Box<dyn Library<D>> {
    Box::new(
        Collector::new("formix.calculus")
            .with("derivative_mark", |_, r| marker(r, MarkerKind::Derivative))
            .with("interval_mark", |_, r| marker(r, MarkerKind::Interval))
            .with("tanh_sinh_mark", |_, r| marker(r, MarkerKind::TanhSinh))
            .with("clenshaw_curtis_mark", |_, r| marker(r, MarkerKind::ClenshawCurtis))
            .with("trapezoid_mark", |_, r| marker(r, MarkerKind::Trapezoid))
            .with("trapezoid_adjustment_mark", |_, r| marker(r, MarkerKind::TrapezoidAdjustment))
            .with("dmark", dmark_factory::<D>)
            .with("trapezoid", trapezoid_factory::<D>)
            .with("tanhsinh", tanh_sinh_factory::<D>)
            .with("clenshaw", clenshaw_factory::<D>)
            .with("derivative", consumers::derivative_factory::<D>)
            .with("integrate", consumers::integrate_factory::<D>)
            .with("tabulate", consumers::tabulate_factory::<D>)
            .with("sum", consumers::sum_factory::<D>)
            .with("product", consumers::product_factory::<D>),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Derivative,
    Interval,
    TanhSinh,
    ClenshawCurtis,
    Trapezoid,
    TrapezoidAdjustment,
}

impl MarkerKind {
    fn accepted(&self) -> &'static [&'static str] {
        match self {
            MarkerKind::Derivative => &["order", "delta"],
            MarkerKind::Interval => &["step"],
            MarkerKind::TanhSinh => &["levels", "tolerance"],
            MarkerKind::ClenshawCurtis => &["points"],
            MarkerKind::Trapezoid | MarkerKind::TrapezoidAdjustment => &["panels"],
        }
    }
}

/// Prefix operator attaching one kind of mark
pub struct Marker {
    name: String,
    kind: MarkerKind,
    parameters: Parameterization,
}

impl Marker {
    pub fn new(name: &str, kind: MarkerKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            parameters: Parameterization::empty(),
        }
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    fn number<D: Domain>(&self, ctx: &dyn EvaluationContext<D>, key: &str) -> Result<Option<f64>> {
        match self.parameters.get(key) {
            None => Ok(None),
            Some(ParameterValue::Symbol(symbol)) => {
                let value = ctx.lookup_value(symbol)?;
                Ok(Some(ctx.domain().to_double(value.to_discrete()?)))
            }
            Some(other) => other.as_f64().map(Some).ok_or_else(|| {
                FormixError::configuration(&self.name, format!("{} must be numeric, got {}", key, other))
            }),
        }
    }

    fn count<D: Domain>(&self, ctx: &dyn EvaluationContext<D>, key: &str) -> Result<Option<u64>> {
        match self.number(ctx, key)? {
            None => Ok(None),
            Some(x) if x >= 1.0 && x.fract() == 0.0 && x <= u32::MAX as f64 => Ok(Some(x as u64)),
            Some(x) => Err(FormixError::configuration(
                &self.name,
                format!("{} must be a positive integer, got {}", key, x),
            )),
        }
    }

    /// Metadata for this marker, filling open parameters from the session config
    pub fn metadata<D: Domain>(&self, ctx: &dyn EvaluationContext<D>) -> Result<Metadata> {
        let config = ctx.config();
        Ok(match self.kind {
            MarkerKind::Derivative => Metadata::DerivativeRequest {
                order: self.count(ctx, "order")?.unwrap_or(1) as u32,
                delta: self.number(ctx, "delta")?,
            },
            MarkerKind::Interval => Metadata::IntervalEvaluation {
                step: self.number(ctx, "step")?,
            },
            MarkerKind::TanhSinh => Metadata::TanhSinhEvaluation {
                levels: self.count(ctx, "levels")?.map_or(config.tanh_sinh_levels, |n| n as u32),
                tolerance: self.number(ctx, "tolerance")?.unwrap_or(config.tanh_sinh_tolerance),
            },
            MarkerKind::ClenshawCurtis => Metadata::ClenshawCurtisEvaluation {
                points: self.count(ctx, "points")?.map_or(config.clenshaw_points, |n| n as usize),
            },
            MarkerKind::Trapezoid => Metadata::TrapezoidalEvaluation {
                panels: self.count(ctx, "panels")?.map_or(config.trapezoid_panels, |n| n as usize),
            },
            MarkerKind::TrapezoidAdjustment => Metadata::TrapezoidalAdjustment {
                panels: self.count(ctx, "panels")?.map_or(config.trapezoid_panels, |n| n as usize),
            },
        })
    }
}

impl<D: Domain> Operation<D> for Marker {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::Unary
    }

    fn configure(&mut self, text: &str) -> Result<()> {
        let parameters = Parameterization::parse(&self.name, text)?;
        parameters.restrict_to(&self.name, self.kind.accepted())?;
        self.parameters = parameters;
        Ok(())
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, mut args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        Arity::Unary.range().check(&self.name, args.len())?;
        let metadata = self.metadata(&*ctx)?;
        let mut value = args.remove(0);
        value.mark(metadata)?;
        Ok(value)
    }
}

fn marker<D: Domain>(request: &FactoryRequest<'_>, kind: MarkerKind) -> Result<Product<D>> {
    operation::<D>(Marker::new(request.symbol, kind))
}

// ============================================================================
// PARAMETERIZED MARKS
// ============================================================================

/// Positive integer argument
pub(crate) fn count_argument<D: Domain>(domain: &D, function: &str, what: &str, value: &ValueOf<D>) -> Result<usize> {
    let n = domain.to_integer(value.to_discrete()?)?;
    if n < 1 {
        return Err(FormixError::Evaluation(format!(
            "{}: {} must be a positive integer, got {}",
            function, what, n
        )));
    }
    Ok(n as usize)
}

/// Positive integer argument that must also fit a u32
fn small_count_argument<D: Domain>(domain: &D, function: &str, what: &str, value: &ValueOf<D>) -> Result<u32> {
    let n = count_argument(domain, function, what, value)?;
    u32::try_from(n).map_err(|_| {
        FormixError::Evaluation(format!(
            "{}: {} must be at most {}, got {}",
            function,
            what,
            u32::MAX,
            n
        ))
    })
}

fn dmark_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::between(2, 3),
        move |ctx: &mut dyn EvaluationContext<D>, mut args: Vec<ValueOf<D>>| {
            let domain = ctx.domain();
            let order = small_count_argument(&*domain, &name, "order", &args[1])?;
            let delta = match args.get(2) {
                Some(d) => Some(domain.to_double(d.to_discrete()?)),
                None => None,
            };
            args.truncate(1);
            let mut point = args.remove(0);
            point.mark(Metadata::DerivativeRequest { order, delta })?;
            Ok(point)
        },
    ))
}

fn trapezoid_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::exactly(2),
        move |ctx: &mut dyn EvaluationContext<D>, mut args: Vec<ValueOf<D>>| {
            let panels = count_argument(&*ctx.domain(), &name, "panels", &args[1])?;
            let mut bounds = args.remove(0);
            bounds.mark(Metadata::TrapezoidalEvaluation { panels })?;
            Ok(bounds)
        },
    ))
}

fn tanh_sinh_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::between(2, 3),
        move |ctx: &mut dyn EvaluationContext<D>, mut args: Vec<ValueOf<D>>| {
            let domain = ctx.domain();
            let levels = small_count_argument(&*domain, &name, "levels", &args[1])?;
            let tolerance = match args.get(2) {
                Some(t) => domain.to_double(t.to_discrete()?),
                None => ctx.config().tanh_sinh_tolerance,
            };
            let mut bounds = args.remove(0);
            bounds.mark(Metadata::TanhSinhEvaluation { levels, tolerance })?;
            Ok(bounds)
        },
    ))
}

fn clenshaw_factory<D: Domain>(_: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    let name = request.symbol.to_string();
    operation(ParameterizedFunction::new(
        request.symbol,
        ParameterRange::exactly(2),
        move |ctx: &mut dyn EvaluationContext<D>, mut args: Vec<ValueOf<D>>| {
            let points = count_argument(&*ctx.domain(), &name, "points", &args[1])?;
            let mut bounds = args.remove(0);
            bounds.mark(Metadata::ClenshawCurtisEvaluation { points })?;
            Ok(bounds)
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::testing::StaticContext;
    use formix_types::{GenericValue, RealDomain};

    fn mark_with(marker: &Marker, value: ValueOf<RealDomain>) -> Result<ValueOf<RealDomain>> {
        let mut ctx = StaticContext::new(RealDomain::new());
        Operation::<RealDomain>::execute(marker, &mut ctx, vec![value])
    }

    #[test]
    fn test_marker_uses_config_defaults() {
        let trap = Marker::new("TRAP", MarkerKind::Trapezoid);
        let v = mark_with(&trap, GenericValue::dimensioned(vec![0.0, 1.0])).unwrap();
        assert_eq!(v.metadata(), Some(&Metadata::TrapezoidalEvaluation { panels: 1000 }));
    }

    #[test]
    fn test_configured_marker() {
        let mut tsq = Marker::new("TSQ", MarkerKind::TanhSinh);
        Operation::<RealDomain>::configure(&mut tsq, "levels=6, tolerance=1e-8").unwrap();
        let v = mark_with(&tsq, GenericValue::dimensioned(vec![0.0, 1.0])).unwrap();
        assert_eq!(
            v.metadata(),
            Some(&Metadata::TanhSinhEvaluation { levels: 6, tolerance: 1e-8 })
        );
    }

    #[test]
    fn test_marker_rejects_foreign_parameters() {
        let mut ccq = Marker::new("CCQ", MarkerKind::ClenshawCurtis);
        let err = Operation::<RealDomain>::configure(&mut ccq, "panels=3").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error in CCQ"));
    }

    #[test]
    fn test_repeated_derivative_mark_raises_order() {
        let d = Marker::new("D", MarkerKind::Derivative);
        let once = mark_with(&d, GenericValue::discrete(2.0)).unwrap();
        let twice = mark_with(&d, once).unwrap();
        assert_eq!(
            twice.metadata(),
            Some(&Metadata::DerivativeRequest { order: 2, delta: None })
        );
    }

    #[test]
    fn test_order_beyond_u32_is_rejected() {
        let d = RealDomain::new();
        let huge = GenericValue::discrete(4_294_967_297.0);
        let err = small_count_argument(&d, "dmark", "order", &huge).unwrap_err();
        assert_eq!(err.to_string(), "Evaluation error: dmark: order must be at most 4294967295, got 4294967297");
        let ok = small_count_argument(&d, "dmark", "order", &GenericValue::discrete(70.0)).unwrap();
        assert_eq!(ok, 70);
    }

    #[test]
    fn test_quadrature_mark_on_derivative_conflicts() {
        let d = Marker::new("D", MarkerKind::Derivative);
        let ccq = Marker::new("CCQ", MarkerKind::ClenshawCurtis);
        let marked = mark_with(&d, GenericValue::discrete(2.0)).unwrap();
        let err = mark_with(&ccq, marked).unwrap_err();
        assert!(matches!(err, FormixError::ConflictingAnnotation { .. }));
    }
}
