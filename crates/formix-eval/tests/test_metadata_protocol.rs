//! Mark lifecycle as seen by the consumers

use approx::assert_relative_eq;
use formix_eval::Session;
use formix_types::{FormixError, GenericValue, MarkState, Metadata, MetadataKind, RealDomain};

fn session() -> Session<RealDomain> {
    Session::new(RealDomain::new()).unwrap()
}

#[test]
fn test_fresh_values_are_unmarked() {
    let mut s = session();
    let v = s.evaluate_value("[0, 1]").unwrap();
    assert_eq!(v.mark_state(), &MarkState::Unmarked);

    let marked = s.evaluate_value("TRAP [0, 1]").unwrap();
    assert_eq!(
        marked.metadata(),
        Some(&Metadata::TrapezoidalEvaluation { panels: 1000 })
    );
}

#[test]
fn test_conflicting_marks_fail() {
    let mut s = session();
    let err = s.evaluate("integrate(\\x -> x, CCQ TRAP [0, 1])").unwrap_err();
    assert!(matches!(err, FormixError::ConflictingAnnotation { .. }));

    let err = s.evaluate("derivative(\\x -> x, D dmark(1, 1, 0.01))").unwrap_err();
    assert!(matches!(err, FormixError::ConflictingAnnotation { .. }));
}

#[test]
fn test_unmarked_bounds_name_the_expected_shape() {
    let mut s = session();
    let err = s.evaluate("integrate(\\x -> x, [0, 1])").unwrap_err();
    assert_eq!(
        err.to_string(),
        "integrate requires a 2-element bounds array marked with TRAP, TRAPADJ, TSQ or CCQ"
    );
    let err = s.evaluate("derivative(\\x -> x, 1)").unwrap_err();
    assert!(matches!(err, FormixError::MissingMetadata { .. }));
}

#[test]
fn test_unrecognized_mark_names_the_function() {
    let mut s = session();
    let err = s.evaluate("integrate(\\x -> x, INTERVAL [0, 1])").unwrap_err();
    match err {
        FormixError::UnrecognizedMetadata { consumer, kind } => {
            assert_eq!(consumer, "integrate");
            assert_eq!(kind, "IntervalEvaluation");
        }
        other => panic!("unexpected error {:?}", other),
    }
    let err = s.evaluate("derivative(\\x -> x, TRAP 1)").unwrap_err();
    assert!(matches!(err, FormixError::UnrecognizedMetadata { .. }));
    let err = s.evaluate("sum(\\x -> x, TSQ [0, 1])").unwrap_err();
    assert!(matches!(err, FormixError::UnrecognizedMetadata { .. }));
}

#[test]
fn test_bounds_must_be_a_pair() {
    let mut s = session();
    let err = s.evaluate("integrate(\\x -> x, TRAP [0, 1, 2])").unwrap_err();
    assert!(matches!(err, FormixError::TypeMismatch { .. }));
    let err = s.evaluate("integrate(2, TRAP [0, 1])").unwrap_err();
    assert!(matches!(err, FormixError::TypeMismatch { .. }));
}

#[test]
fn test_consumed_value_cannot_be_reused() {
    let mut v = GenericValue::dimensioned(vec![0.0, 1.0]);
    v.mark(Metadata::TrapezoidalEvaluation { panels: 10 }).unwrap();
    v.consume("integrate", "bounds").unwrap();
    assert_eq!(
        v.mark_state(),
        &MarkState::Consumed(MetadataKind::TrapezoidalEvaluation)
    );
    assert!(matches!(
        v.consume("integrate", "bounds"),
        Err(FormixError::AlreadyConsumed { .. })
    ));
    assert!(matches!(
        v.mark(Metadata::TrapezoidalEvaluation { panels: 10 }),
        Err(FormixError::AlreadyConsumed { .. })
    ));
}

#[test]
fn test_marks_pass_through_user_functions() {
    let mut s = session();
    s.execute("area(b) = integrate(\\x -> 2 * x, b)").unwrap();
    assert_relative_eq!(s.evaluate("area(TRAP [0, 1])").unwrap(), 1.0, epsilon = 1e-12);
    assert!(matches!(
        s.evaluate("area([0, 1])"),
        Err(FormixError::MissingMetadata { .. })
    ));
}

#[test]
fn test_parameter_mark_is_used_once() {
    let mut s = session();
    s.execute("twice(x) = derivative(\\t -> t ^ 2, x) + derivative(\\t -> t ^ 2, x)")
        .unwrap();
    let err = s.evaluate("twice(D 3)").unwrap_err();
    assert!(matches!(err, FormixError::AlreadyConsumed { .. }));

    s.execute("once(x) = derivative(\\t -> t ^ 2, x)").unwrap();
    assert_relative_eq!(s.evaluate("once(D 3)").unwrap(), 6.0, epsilon = 1e-4);
}

#[test]
fn test_high_derivative_order_is_evaluated() {
    let mut s = session();
    let value = s.evaluate("derivative(\\x -> x, dmark(1, 70, 0.5))").unwrap();
    assert!(value.is_finite());
    let err = s.evaluate("derivative(\\x -> x, dmark(1, 4294967297, 0.5))").unwrap_err();
    assert!(matches!(err, FormixError::Evaluation(_)));
}
