use crate::domain::Domain;
use crate::error::{FormixError, Result};
use crate::metadata::{MarkState, Metadata};
use crate::procedure::Procedure;
use log::trace;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Payload of a generic value; exactly one variant is active
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind<T> {
    Discrete(T),
    /// Ordered sequence, also used as a parameter list
    Dimensioned(Vec<T>),
    Matrix(Array2<T>),
    Structured(Structure<T>),
    Indirect(Procedure),
}

/// Field-accessible object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure<T> {
    fields: BTreeMap<String, GenericValue<T>>,
}

impl<T> Structure<T> {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: GenericValue<T>) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: GenericValue<T>) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn field(&self, name: &str) -> Result<&GenericValue<T>> {
        self.fields
            .get(name)
            .ok_or_else(|| FormixError::Evaluation(format!("structure has no field '{}'", name)))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &GenericValue<T>)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Tagged value passed on the evaluation stack
///
/// Carries an optional display name and the calculus mark state. Equality
/// compares payloads only.
#[derive(Debug, Clone)]
pub struct GenericValue<T> {
    kind: ValueKind<T>,
    name: Option<String>,
    mark: MarkState,
}

impl<T: PartialEq> PartialEq for GenericValue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl<T> From<ValueKind<T>> for GenericValue<T> {
    fn from(kind: ValueKind<T>) -> Self {
        GenericValue {
            kind,
            name: None,
            mark: MarkState::Unmarked,
        }
    }
}

impl<T> GenericValue<T> {
    pub fn discrete(value: T) -> Self {
        ValueKind::Discrete(value).into()
    }

    pub fn dimensioned(values: Vec<T>) -> Self {
        ValueKind::Dimensioned(values).into()
    }

    pub fn matrix(values: Array2<T>) -> Self {
        ValueKind::Matrix(values).into()
    }

    pub fn structured(structure: Structure<T>) -> Self {
        ValueKind::Structured(structure).into()
    }

    pub fn indirect(procedure: Procedure) -> Self {
        ValueKind::Indirect(procedure).into()
    }

    pub fn kind(&self) -> &ValueKind<T> {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind<T> {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Discrete(_) => "Discrete",
            ValueKind::Dimensioned(_) => "Dimensioned",
            ValueKind::Matrix(_) => "Matrix",
            ValueKind::Structured(_) => "Structured",
            ValueKind::Indirect(_) => "Indirect",
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self.kind, ValueKind::Discrete(_))
    }

    pub fn is_dimensioned(&self) -> bool {
        matches!(self.kind, ValueKind::Dimensioned(_))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self.kind, ValueKind::Matrix(_))
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.kind, ValueKind::Structured(_))
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self.kind, ValueKind::Indirect(_))
    }

    fn mismatch(&self, expected: &str) -> FormixError {
        FormixError::type_mismatch("value conversion", expected, self.type_name())
    }

    pub fn to_discrete(&self) -> Result<&T> {
        match &self.kind {
            ValueKind::Discrete(v) => Ok(v),
            _ => Err(self.mismatch("Discrete")),
        }
    }

    pub fn to_array(&self) -> Result<&[T]> {
        match &self.kind {
            ValueKind::Dimensioned(v) => Ok(v),
            _ => Err(self.mismatch("Dimensioned")),
        }
    }

    pub fn to_matrix(&self) -> Result<&Array2<T>> {
        match &self.kind {
            ValueKind::Matrix(m) => Ok(m),
            _ => Err(self.mismatch("Matrix")),
        }
    }

    pub fn to_structure(&self) -> Result<&Structure<T>> {
        match &self.kind {
            ValueKind::Structured(s) => Ok(s),
            _ => Err(self.mismatch("Structured")),
        }
    }

    pub fn to_procedure(&self) -> Result<&Procedure> {
        match &self.kind {
            ValueKind::Indirect(p) => Ok(p),
            _ => Err(self.mismatch("Indirect")),
        }
    }

    pub fn into_discrete(self) -> Result<T> {
        let got = self.type_name();
        match self.kind {
            ValueKind::Discrete(v) => Ok(v),
            _ => Err(FormixError::type_mismatch("value conversion", "Discrete", got)),
        }
    }

    pub fn into_array(self) -> Result<Vec<T>> {
        let got = self.type_name();
        match self.kind {
            ValueKind::Dimensioned(v) => Ok(v),
            _ => Err(FormixError::type_mismatch("value conversion", "Dimensioned", got)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn mark_state(&self) -> &MarkState {
        &self.mark
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.mark.metadata()
    }

    /// Attach metadata, overwriting whatever was there
    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.mark = MarkState::Marked(metadata);
    }

    /// Apply a calculus mark
    ///
    /// Fails on a consumed value and on any re-mark that is not a refinement
    /// of the existing one.
    pub fn mark(&mut self, requested: Metadata) -> Result<()> {
        let next = match &self.mark {
            MarkState::Unmarked => requested,
            MarkState::Marked(existing) => match existing.refine(&requested) {
                Some(refined) => refined,
                None => {
                    return Err(FormixError::ConflictingAnnotation {
                        existing: existing.to_string(),
                        requested: requested.to_string(),
                    })
                }
            },
            MarkState::Consumed(kind) => {
                return Err(FormixError::AlreadyConsumed {
                    consumer: format!("mark {}", kind),
                })
            }
        };
        trace!("marking {} value with {}", self.type_name(), next);
        self.mark = MarkState::Marked(next);
        Ok(())
    }

    pub fn marked(mut self, requested: Metadata) -> Result<Self> {
        self.mark(requested)?;
        Ok(self)
    }

    /// Take the mark for `consumer`, leaving the value consumed
    pub fn consume(&mut self, consumer: &str, expected: &str) -> Result<Metadata> {
        match std::mem::take(&mut self.mark) {
            MarkState::Marked(metadata) => {
                trace!("{} consumed {}", consumer, metadata);
                self.mark = MarkState::Consumed(metadata.kind());
                Ok(metadata)
            }
            MarkState::Unmarked => Err(FormixError::MissingMetadata {
                consumer: consumer.to_string(),
                expected: expected.to_string(),
            }),
            consumed @ MarkState::Consumed(_) => {
                self.mark = consumed;
                Err(FormixError::AlreadyConsumed {
                    consumer: consumer.to_string(),
                })
            }
        }
    }

    /// Drop any mark, as done when a value is stored in the symbol table
    pub fn clear_mark(&mut self) {
        self.mark = MarkState::Unmarked;
    }

    pub fn without_mark(mut self) -> Self {
        self.clear_mark();
        self
    }
}

impl<T: Clone> GenericValue<T> {
    pub fn to_json<D: Domain<Value = T>>(&self, domain: &D) -> serde_json::Value {
        match &self.kind {
            ValueKind::Discrete(v) => domain.to_json(v),
            ValueKind::Dimensioned(values) => {
                serde_json::Value::Array(values.iter().map(|v| domain.to_json(v)).collect())
            }
            ValueKind::Matrix(m) => serde_json::Value::Array(
                m.rows()
                    .into_iter()
                    .map(|row| serde_json::Value::Array(row.iter().map(|v| domain.to_json(v)).collect()))
                    .collect(),
            ),
            ValueKind::Structured(s) => serde_json::Value::Object(
                s.fields()
                    .map(|(name, value)| (name.clone(), value.to_json(domain)))
                    .collect(),
            ),
            ValueKind::Indirect(p) => serde_json::json!({ "procedure": p.display_name() }),
        }
    }

    pub fn format<D: Domain<Value = T>>(&self, domain: &D) -> String {
        match &self.kind {
            ValueKind::Discrete(v) => domain.format(v),
            ValueKind::Dimensioned(values) => {
                let items: Vec<String> = values.iter().map(|v| domain.format(v)).collect();
                format!("[{}]", items.join(", "))
            }
            ValueKind::Matrix(m) => {
                let rows: Vec<String> = m
                    .rows()
                    .into_iter()
                    .map(|row| {
                        let items: Vec<String> = row.iter().map(|v| domain.format(v)).collect();
                        format!("[{}]", items.join(", "))
                    })
                    .collect();
                format!("[{}]", rows.join(", "))
            }
            ValueKind::Structured(s) => {
                let items: Vec<String> = s
                    .fields()
                    .map(|(name, value)| format!("{}: {}", name, value.format(domain)))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            ValueKind::Indirect(p) => p.display_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RealDomain;
    use crate::metadata::MetadataKind;
    use ndarray::array;

    #[test]
    fn test_discrete_round_trip() {
        let v = GenericValue::discrete(2.5);
        assert!(v.is_discrete());
        assert_eq!(*v.to_discrete().unwrap(), 2.5);
        assert!(v.to_array().is_err());
    }

    #[test]
    fn test_dimensioned_preserves_order() {
        let v = GenericValue::dimensioned(vec![3.0, 1.0, 2.0]);
        assert!(v.is_dimensioned());
        assert_eq!(v.to_array().unwrap(), &[3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_matrix_variant_mismatch() {
        let v = GenericValue::matrix(array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(v.is_matrix());
        let err = v.to_discrete().unwrap_err();
        assert!(err.to_string().contains("expected Discrete, got Matrix"));
    }

    #[test]
    fn test_fresh_value_has_no_metadata() {
        let v = GenericValue::discrete(1.0);
        assert!(v.metadata().is_none());
        assert_eq!(*v.mark_state(), MarkState::Unmarked);
    }

    #[test]
    fn test_mark_then_consume_once() {
        let mut v = GenericValue::dimensioned(vec![0.0, 1.0]);
        v.mark(Metadata::TrapezoidalEvaluation { panels: 4 }).unwrap();
        assert_eq!(v.metadata(), Some(&Metadata::TrapezoidalEvaluation { panels: 4 }));

        let m = v.consume("integrate", "bounds").unwrap();
        assert_eq!(m.kind(), MetadataKind::TrapezoidalEvaluation);
        assert_eq!(
            *v.mark_state(),
            MarkState::Consumed(MetadataKind::TrapezoidalEvaluation)
        );

        let again = v.consume("integrate", "bounds").unwrap_err();
        assert!(matches!(again, FormixError::AlreadyConsumed { .. }));
    }

    #[test]
    fn test_consume_unmarked_names_expectation() {
        let mut v = GenericValue::discrete(1.0);
        let err = v.consume("derivative", "a point marked with D").unwrap_err();
        assert_eq!(err.to_string(), "derivative requires a point marked with D");
    }

    #[test]
    fn test_conflicting_remark() {
        let mut v = GenericValue::discrete(1.0);
        v.mark(Metadata::DerivativeRequest { order: 1, delta: None }).unwrap();
        let err = v.mark(Metadata::TanhSinhEvaluation { levels: 6, tolerance: 1e-10 }).unwrap_err();
        assert!(matches!(err, FormixError::ConflictingAnnotation { .. }));
    }

    #[test]
    fn test_consumed_value_cannot_be_remarked() {
        let mut v = GenericValue::discrete(1.0);
        v.mark(Metadata::IntervalEvaluation { step: None }).unwrap();
        v.consume("tabulate", "bounds").unwrap();
        assert!(v.mark(Metadata::IntervalEvaluation { step: None }).is_err());
    }

    #[test]
    fn test_set_metadata_overwrites() {
        let mut v = GenericValue::discrete(1.0);
        v.set_metadata(Metadata::TrapezoidalEvaluation { panels: 2 });
        v.set_metadata(Metadata::ClenshawCurtisEvaluation { points: 5 });
        assert_eq!(v.metadata(), Some(&Metadata::ClenshawCurtisEvaluation { points: 5 }));
    }

    #[test]
    fn test_structure_to_json() {
        let d = RealDomain::new();
        let s = Structure::new()
            .with_field("x", GenericValue::discrete(1.5))
            .with_field("ys", GenericValue::dimensioned(vec![1.0, 2.0]));
        let v = GenericValue::structured(s).with_name("point");
        assert_eq!(v.name(), Some("point"));
        assert_eq!(v.to_json(&d), serde_json::json!({ "x": 1.5, "ys": [1.0, 2.0] }));
    }
}
