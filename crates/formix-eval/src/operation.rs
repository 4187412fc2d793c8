//! Operator/function extension framework
//!
//! An [`Operation`] is anything the symbol table can dispatch to. Raw domain
//! computations become operations through three adapters:
//!
//! - [`UnaryFunction`]: one operand, applied elementwise to arrays and matrices
//! - [`BinaryFunction`]: two operands with scalar/array broadcasting
//! - [`ParameterizedFunction`]: a bounded argument list handed over as-is
//!
//! Each adapter does unwrap -> compute -> rewrap and rejects argument counts
//! outside of its [`Arity`].

use crate::config::SessionConfig;
use formix_types::{Domain, FormixError, GenericValue, ProcedureEvaluator, Result, ValueKind};
use ndarray::Array2;
use std::fmt;
use std::rc::Rc;

/// Generic value over the value type of domain `D`
pub type ValueOf<D> = GenericValue<<D as formix_types::Arithmetic>::Value>;

/// What an operation may ask of the session while it runs
pub trait EvaluationContext<D: Domain>: ProcedureEvaluator<D::Value> {
    fn domain(&self) -> Rc<D>;

    fn config(&self) -> &SessionConfig;

    /// Value of a table symbol, for parameters given by name
    fn lookup_value(&self, name: &str) -> Result<ValueOf<D>>;
}

/// Inclusive bounds on an argument count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterRange {
    pub min: usize,
    pub max: usize,
}

impl ParameterRange {
    pub fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: usize) -> Self {
        Self {
            min,
            max: usize::MAX,
        }
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }

    /// Fail with a `ParameterCount` error naming the accepted range
    pub fn check(&self, function: &str, count: usize) -> Result<()> {
        if self.contains(count) {
            Ok(())
        } else {
            Err(FormixError::ParameterCount {
                function: function.to_string(),
                expected: self.to_string(),
                got: count,
            })
        }
    }
}

impl fmt::Display for ParameterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else if self.max == usize::MAX {
            write!(f, "{}+", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
    Parameterized(ParameterRange),
}

impl Arity {
    pub fn range(&self) -> ParameterRange {
        match self {
            Arity::Unary => ParameterRange::exactly(1),
            Arity::Binary => ParameterRange::exactly(2),
            Arity::Parameterized(range) => *range,
        }
    }
}

/// Rendering callbacks used by external markup renderers
///
/// Operands arrive already rendered.
pub trait MarkupFormatter {
    fn prefix(&self, operator: &str, operand: &str) -> String;
    fn postfix(&self, operator: &str, operand: &str) -> String;
    fn infix(&self, operator: &str, left: &str, right: &str) -> String;
    fn function(&self, name: &str, arguments: &[String]) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl MarkupFormatter for PlainFormatter {
    fn prefix(&self, operator: &str, operand: &str) -> String {
        if operator.chars().all(|c| c.is_alphanumeric() || c == '_') {
            format!("{} {}", operator, operand)
        } else {
            format!("{}{}", operator, operand)
        }
    }

    fn postfix(&self, operator: &str, operand: &str) -> String {
        format!("{}{}", operand, operator)
    }

    fn infix(&self, operator: &str, left: &str, right: &str) -> String {
        format!("({} {} {})", left, operator, right)
    }

    fn function(&self, name: &str, arguments: &[String]) -> String {
        format!("{}({})", name, arguments.join(", "))
    }
}

/// Presentation MathML fragments
#[derive(Debug, Clone, Copy, Default)]
pub struct MathMlFormatter;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl MarkupFormatter for MathMlFormatter {
    fn prefix(&self, operator: &str, operand: &str) -> String {
        format!("<mrow><mo>{}</mo>{}</mrow>", escape(operator), operand)
    }

    fn postfix(&self, operator: &str, operand: &str) -> String {
        format!("<mrow>{}<mo>{}</mo></mrow>", operand, escape(operator))
    }

    fn infix(&self, operator: &str, left: &str, right: &str) -> String {
        match operator {
            "/" => format!("<mfrac>{}{}</mfrac>", left, right),
            "^" => format!("<msup>{}{}</msup>", left, right),
            _ => format!("<mrow>{}<mo>{}</mo>{}</mrow>", left, escape(operator), right),
        }
    }

    fn function(&self, name: &str, arguments: &[String]) -> String {
        format!(
            "<mrow><mi>{}</mi><mo>(</mo>{}<mo>)</mo></mrow>",
            escape(name),
            arguments.join("<mo>,</mo>")
        )
    }
}

/// A dispatchable operator or function
pub trait Operation<D: Domain> {
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Late parameterization from descriptor config text
    fn configure(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            Ok(())
        } else {
            Err(FormixError::configuration(
                self.name(),
                format!("does not accept configuration, got '{}'", text.trim()),
            ))
        }
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>>;

    fn markup_for_display(&self, operator: &str, operands: &[String], formatter: &dyn MarkupFormatter) -> String {
        match (self.arity(), operands) {
            (Arity::Unary, [operand]) => formatter.prefix(operator, operand),
            (Arity::Binary, [left, right]) => formatter.infix(operator, left, right),
            _ => formatter.function(operator, operands),
        }
    }
}

// ============================================================================
// Elementwise helpers
// ============================================================================

fn rebuild_matrix<T>(shape: (usize, usize), items: Vec<T>) -> Result<GenericValue<T>> {
    Array2::from_shape_vec(shape, items)
        .map(GenericValue::matrix)
        .map_err(|e| FormixError::Evaluation(format!("matrix shape: {}", e)))
}

/// Apply `f` to a scalar or to every element of an array or matrix
pub fn map_elements<T, F>(operation: &str, value: &GenericValue<T>, f: F) -> Result<GenericValue<T>>
where
    F: Fn(&T) -> Result<T>,
{
    match value.kind() {
        ValueKind::Discrete(x) => Ok(GenericValue::discrete(f(x)?)),
        ValueKind::Dimensioned(xs) => Ok(GenericValue::dimensioned(
            xs.iter().map(&f).collect::<Result<Vec<_>>>()?,
        )),
        ValueKind::Matrix(m) => rebuild_matrix(m.dim(), m.iter().map(&f).collect::<Result<Vec<_>>>()?),
        _ => Err(FormixError::type_mismatch(
            operation,
            "Discrete, Dimensioned or Matrix",
            value.type_name(),
        )),
    }
}

/// Combine two operands elementwise, broadcasting scalars
pub fn zip_elements<T, F>(operation: &str, a: &GenericValue<T>, b: &GenericValue<T>, f: F) -> Result<GenericValue<T>>
where
    F: Fn(&T, &T) -> Result<T>,
{
    use ValueKind::*;
    match (a.kind(), b.kind()) {
        (Discrete(x), Discrete(y)) => Ok(GenericValue::discrete(f(x, y)?)),
        (Dimensioned(xs), Discrete(y)) => Ok(GenericValue::dimensioned(
            xs.iter().map(|x| f(x, y)).collect::<Result<Vec<_>>>()?,
        )),
        (Discrete(x), Dimensioned(ys)) => Ok(GenericValue::dimensioned(
            ys.iter().map(|y| f(x, y)).collect::<Result<Vec<_>>>()?,
        )),
        (Dimensioned(xs), Dimensioned(ys)) if xs.len() == ys.len() => Ok(GenericValue::dimensioned(
            xs.iter().zip(ys).map(|(x, y)| f(x, y)).collect::<Result<Vec<_>>>()?,
        )),
        (Matrix(m), Discrete(y)) => rebuild_matrix(m.dim(), m.iter().map(|x| f(x, y)).collect::<Result<Vec<_>>>()?),
        (Discrete(x), Matrix(m)) => rebuild_matrix(m.dim(), m.iter().map(|y| f(x, y)).collect::<Result<Vec<_>>>()?),
        (Matrix(m), Matrix(n)) if m.dim() == n.dim() => rebuild_matrix(
            m.dim(),
            m.iter().zip(n.iter()).map(|(x, y)| f(x, y)).collect::<Result<Vec<_>>>()?,
        ),
        _ => Err(FormixError::type_mismatch(
            operation,
            "operands of matching shape",
            format!("{} and {}", describe_shape(a), describe_shape(b)),
        )),
    }
}

fn describe_shape<T>(value: &GenericValue<T>) -> String {
    match value.kind() {
        ValueKind::Dimensioned(xs) => format!("Dimensioned[{}]", xs.len()),
        ValueKind::Matrix(m) => format!("Matrix[{}x{}]", m.nrows(), m.ncols()),
        _ => value.type_name().to_string(),
    }
}

/// Spread a dimensioned value into a discrete argument list
pub fn spread_arguments<T: Clone>(function: &str, list: &GenericValue<T>) -> Result<Vec<GenericValue<T>>> {
    match list.kind() {
        ValueKind::Dimensioned(xs) => Ok(xs.iter().cloned().map(GenericValue::discrete).collect()),
        _ => Err(FormixError::type_mismatch(function, "Dimensioned argument list", list.type_name())),
    }
}

// ============================================================================
// Adapters
// ============================================================================

type UnaryCompute<D> = Box<dyn Fn(&D, &<D as formix_types::Arithmetic>::Value) -> Result<<D as formix_types::Arithmetic>::Value>>;

type BinaryCompute<D> = Box<
    dyn Fn(
        &D,
        &<D as formix_types::Arithmetic>::Value,
        &<D as formix_types::Arithmetic>::Value,
    ) -> Result<<D as formix_types::Arithmetic>::Value>,
>;

type ParameterizedCompute<D> = Box<dyn Fn(&mut dyn EvaluationContext<D>, Vec<ValueOf<D>>) -> Result<ValueOf<D>>>;

pub struct UnaryFunction<D: Domain> {
    name: String,
    compute: UnaryCompute<D>,
}

impl<D: Domain> UnaryFunction<D> {
    pub fn new<F>(name: &str, compute: F) -> Self
    where
        F: Fn(&D, &D::Value) -> Result<D::Value> + 'static,
    {
        Self {
            name: name.to_string(),
            compute: Box::new(compute),
        }
    }
}

impl<D: Domain> Operation<D> for UnaryFunction<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::Unary
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        self.arity().range().check(&self.name, args.len())?;
        let domain = ctx.domain();
        map_elements(&self.name, &args[0], |x| (self.compute)(&*domain, x))
    }

    fn markup_for_display(&self, operator: &str, operands: &[String], formatter: &dyn MarkupFormatter) -> String {
        formatter.function(operator, operands)
    }
}

pub struct BinaryFunction<D: Domain> {
    name: String,
    compute: BinaryCompute<D>,
}

impl<D: Domain> BinaryFunction<D> {
    pub fn new<F>(name: &str, compute: F) -> Self
    where
        F: Fn(&D, &D::Value, &D::Value) -> Result<D::Value> + 'static,
    {
        Self {
            name: name.to_string(),
            compute: Box::new(compute),
        }
    }
}

impl<D: Domain> Operation<D> for BinaryFunction<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::Binary
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        self.arity().range().check(&self.name, args.len())?;
        let domain = ctx.domain();
        zip_elements(&self.name, &args[0], &args[1], |x, y| (self.compute)(&*domain, x, y))
    }
}

pub struct ParameterizedFunction<D: Domain> {
    name: String,
    range: ParameterRange,
    compute: ParameterizedCompute<D>,
}

impl<D: Domain> ParameterizedFunction<D> {
    pub fn new<F>(name: &str, range: ParameterRange, compute: F) -> Self
    where
        F: Fn(&mut dyn EvaluationContext<D>, Vec<ValueOf<D>>) -> Result<ValueOf<D>> + 'static,
    {
        Self {
            name: name.to_string(),
            range,
            compute: Box::new(compute),
        }
    }

    /// Call with a dimensioned value as the argument list
    pub fn execute_list(&self, ctx: &mut dyn EvaluationContext<D>, list: &ValueOf<D>) -> Result<ValueOf<D>> {
        let args = spread_arguments(&self.name, list)?;
        self.execute(ctx, args)
    }
}

impl<D: Domain> Operation<D> for ParameterizedFunction<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::Parameterized(self.range)
    }

    fn execute(&self, ctx: &mut dyn EvaluationContext<D>, args: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
        self.range.check(&self.name, args.len())?;
        (self.compute)(ctx, args)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal context for exercising operations without a session

    use super::*;
    use formix_types::Procedure;

    pub struct StaticContext<D: Domain> {
        pub domain: Rc<D>,
        pub config: SessionConfig,
    }

    impl<D: Domain> StaticContext<D> {
        pub fn new(domain: D) -> Self {
            Self {
                domain: Rc::new(domain),
                config: SessionConfig::default(),
            }
        }
    }

    impl<D: Domain> ProcedureEvaluator<D::Value> for StaticContext<D> {
        fn call(&mut self, procedure: &Procedure, _arguments: Vec<ValueOf<D>>) -> Result<ValueOf<D>> {
            Err(FormixError::UndefinedSymbol(procedure.to_string()))
        }
    }

    impl<D: Domain> EvaluationContext<D> for StaticContext<D> {
        fn domain(&self) -> Rc<D> {
            Rc::clone(&self.domain)
        }

        fn config(&self) -> &SessionConfig {
            &self.config
        }

        fn lookup_value(&self, name: &str) -> Result<ValueOf<D>> {
            Err(FormixError::UndefinedSymbol(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticContext;
    use super::*;
    use formix_types::{Arithmetic, RealDomain};

    fn pick_first() -> ParameterizedFunction<RealDomain> {
        ParameterizedFunction::new("first", ParameterRange::between(1, 2), |_, mut args| {
            Ok(args.swap_remove(0))
        })
    }

    #[test]
    fn test_range_display() {
        assert_eq!(ParameterRange::between(1, 2).to_string(), "1-2");
        assert_eq!(ParameterRange::exactly(2).to_string(), "2");
        assert_eq!(ParameterRange::at_least(1).to_string(), "1+");
    }

    #[test]
    fn test_parameterized_accepts_range() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let f = pick_first();
        let one = vec![GenericValue::discrete(1.0)];
        let two = vec![GenericValue::discrete(1.0), GenericValue::discrete(2.0)];
        assert_eq!(f.execute(&mut ctx, one).unwrap(), GenericValue::discrete(1.0));
        assert_eq!(f.execute(&mut ctx, two).unwrap(), GenericValue::discrete(1.0));
    }

    #[test]
    fn test_parameterized_rejects_outside_range() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let f = pick_first();
        let err = f.execute(&mut ctx, vec![]).unwrap_err();
        assert_eq!(err.to_string(), "first expects 1-2 parameters, got 0");
        let three = vec![GenericValue::discrete(1.0); 3];
        let err = f.execute(&mut ctx, three).unwrap_err();
        assert!(err.to_string().contains("1-2"));
    }

    #[test]
    fn test_execute_list_spreads_arguments() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let f = pick_first();
        let list = GenericValue::dimensioned(vec![7.0, 8.0]);
        assert_eq!(f.execute_list(&mut ctx, &list).unwrap(), GenericValue::discrete(7.0));
    }

    #[test]
    fn test_unary_maps_over_arrays() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let double = UnaryFunction::new("double", |d: &RealDomain, x: &f64| Ok(d.add(x, x)?));
        let r = double.execute(&mut ctx, vec![GenericValue::dimensioned(vec![1.0, 2.0])]).unwrap();
        assert_eq!(r, GenericValue::dimensioned(vec![2.0, 4.0]));
        assert!(double.execute(&mut ctx, vec![]).is_err());
    }

    #[test]
    fn test_binary_broadcasts_and_checks_shape() {
        let mut ctx = StaticContext::new(RealDomain::new());
        let add = BinaryFunction::new("add", |d: &RealDomain, x: &f64, y: &f64| Ok(d.add(x, y)?));
        let r = add
            .execute(&mut ctx, vec![GenericValue::dimensioned(vec![1.0, 2.0]), GenericValue::discrete(10.0)])
            .unwrap();
        assert_eq!(r, GenericValue::dimensioned(vec![11.0, 12.0]));

        let err = add
            .execute(
                &mut ctx,
                vec![GenericValue::dimensioned(vec![1.0, 2.0]), GenericValue::dimensioned(vec![1.0])],
            )
            .unwrap_err();
        assert!(err.to_string().contains("Dimensioned[2] and Dimensioned[1]"));
    }

    #[test]
    fn test_markup_callbacks() {
        let add = BinaryFunction::<RealDomain>::new("add", |_, x, y| Ok(x + y));
        let operands = ["a".to_string(), "b".to_string()];
        assert_eq!(add.markup_for_display("+", &operands, &PlainFormatter), "(a + b)");
        assert_eq!(
            add.markup_for_display("/", &operands, &MathMlFormatter),
            "<mfrac>ab</mfrac>"
        );
        assert_eq!(
            add.markup_for_display("<", &operands, &MathMlFormatter),
            "<mrow>a<mo>&lt;</mo>b</mrow>"
        );
    }

    #[test]
    fn test_default_configure_rejects_text() {
        let mut add = BinaryFunction::<RealDomain>::new("add", |_, x, y| Ok(x + y));
        assert!(add.configure("").is_ok());
        assert!(add.configure("panels=3").is_err());
    }
}
