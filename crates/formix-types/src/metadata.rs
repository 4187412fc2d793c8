//! Calculus marks
//!
//! A calculus operator does not compute; it attaches exactly one [`Metadata`]
//! to its operand. A consumer later takes the mark and runs the algorithm it
//! names. Each value instance moves `Unmarked -> Marked -> Consumed` and never
//! back.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metadata {
    /// `delta == None` requests the default step and may still be refined
    DerivativeRequest { order: u32, delta: Option<f64> },
    IntervalEvaluation { step: Option<f64> },
    TanhSinhEvaluation { levels: u32, tolerance: f64 },
    TrapezoidalEvaluation { panels: usize },
    TrapezoidalAdjustment { panels: usize },
    ClenshawCurtisEvaluation { points: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataKind {
    DerivativeRequest,
    IntervalEvaluation,
    TanhSinhEvaluation,
    TrapezoidalEvaluation,
    TrapezoidalAdjustment,
    ClenshawCurtisEvaluation,
}

impl Metadata {
    pub fn kind(&self) -> MetadataKind {
        match self {
            Metadata::DerivativeRequest { .. } => MetadataKind::DerivativeRequest,
            Metadata::IntervalEvaluation { .. } => MetadataKind::IntervalEvaluation,
            Metadata::TanhSinhEvaluation { .. } => MetadataKind::TanhSinhEvaluation,
            Metadata::TrapezoidalEvaluation { .. } => MetadataKind::TrapezoidalEvaluation,
            Metadata::TrapezoidalAdjustment { .. } => MetadataKind::TrapezoidalAdjustment,
            Metadata::ClenshawCurtisEvaluation { .. } => MetadataKind::ClenshawCurtisEvaluation,
        }
    }

    /// Combine a new mark with this one, if the pair is a refinement
    ///
    /// Only an exact derivative request can be refined, by another
    /// derivative request; the orders add up.
    pub fn refine(&self, requested: &Metadata) -> Option<Metadata> {
        match (self, requested) {
            (
                Metadata::DerivativeRequest { order, delta: None },
                Metadata::DerivativeRequest {
                    order: more,
                    delta,
                },
            ) => Some(Metadata::DerivativeRequest {
                order: order.checked_add(*more)?,
                delta: *delta,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataKind::DerivativeRequest => "DerivativeRequest",
            MetadataKind::IntervalEvaluation => "IntervalEvaluation",
            MetadataKind::TanhSinhEvaluation => "TanhSinhEvaluation",
            MetadataKind::TrapezoidalEvaluation => "TrapezoidalEvaluation",
            MetadataKind::TrapezoidalAdjustment => "TrapezoidalAdjustment",
            MetadataKind::ClenshawCurtisEvaluation => "ClenshawCurtisEvaluation",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::DerivativeRequest { order, delta } => match delta {
                Some(d) => write!(f, "DerivativeRequest(order={}, delta={})", order, d),
                None => write!(f, "DerivativeRequest(order={})", order),
            },
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Position of a value in the mark lifecycle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MarkState {
    #[default]
    Unmarked,
    Marked(Metadata),
    /// Terminal: the mark of this kind was used by a consumer
    Consumed(MetadataKind),
}

impl MarkState {
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            MarkState::Marked(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_derivative_refines() {
        let first = Metadata::DerivativeRequest { order: 1, delta: None };
        let second = Metadata::DerivativeRequest { order: 1, delta: Some(0.01) };
        assert_eq!(
            first.refine(&second),
            Some(Metadata::DerivativeRequest { order: 2, delta: Some(0.01) })
        );
    }

    #[test]
    fn test_approximate_derivative_does_not_refine() {
        let first = Metadata::DerivativeRequest { order: 1, delta: Some(0.1) };
        let second = Metadata::DerivativeRequest { order: 1, delta: None };
        assert_eq!(first.refine(&second), None);
    }

    #[test]
    fn test_quadrature_marks_never_refine() {
        let trap = Metadata::TrapezoidalEvaluation { panels: 10 };
        let cc = Metadata::ClenshawCurtisEvaluation { points: 9 };
        assert_eq!(trap.refine(&cc), None);
        assert_eq!(trap.refine(&trap), None);
    }
}
