//! Dynamic properties: post-compile mutable parameter cells.
//!
//! Ops created from transforms flagged dynamic carry a typed cell that
//! stays adjustable after compilation. Each compiled processor, CPU
//! specialization and GPU descriptor owns independent cells (detached on
//! specialization), so mutating one instance never affects another.
//!
//! Writes are not atomic with respect to concurrent CPU-apply or
//! GPU-uniform reads; callers needing that must synchronize externally.

use std::sync::{Arc, RwLock};

use crate::error::{ChromaError, ChromaResult};
use crate::transform::{
    GradingHueCurveValues, GradingPrimaryValues, GradingRgbCurveValues, GradingToneValues,
};

/// The kinds of dynamic property a pipeline can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicKind {
    /// Exposure in stops (scalar).
    Exposure,
    /// Contrast multiplier (scalar).
    Contrast,
    /// Gamma power (scalar).
    Gamma,
    /// Grading primary value set.
    GradingPrimary,
    /// Grading tone value set.
    GradingTone,
    /// Grading RGB curve value set.
    GradingRgbCurve,
    /// Grading hue curve value set.
    GradingHueCurve,
}

impl DynamicKind {
    /// Every dynamic property kind.
    pub const ALL: [DynamicKind; 7] = [
        DynamicKind::Exposure,
        DynamicKind::Contrast,
        DynamicKind::Gamma,
        DynamicKind::GradingPrimary,
        DynamicKind::GradingTone,
        DynamicKind::GradingRgbCurve,
        DynamicKind::GradingHueCurve,
    ];
}

/// A typed dynamic value.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    /// Scalar (exposure/contrast/gamma).
    Scalar(f64),
    /// Grading primary values.
    Primary(GradingPrimaryValues),
    /// Grading tone values.
    Tone(GradingToneValues),
    /// Grading RGB curve values.
    RgbCurve(GradingRgbCurveValues),
    /// Grading hue curve values.
    HueCurve(GradingHueCurveValues),
}

impl DynamicValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Primary(_) => "grading primary",
            Self::Tone(_) => "grading tone",
            Self::RgbCurve(_) => "grading rgb curve",
            Self::HueCurve(_) => "grading hue curve",
        }
    }
}

/// A mutable, typed parameter cell on a compiled pipeline.
///
/// Cloning shares the cell (op and host-facing handle see the same
/// value); [`DynamicProperty::detached`] deep-copies it.
#[derive(Debug, Clone)]
pub struct DynamicProperty {
    kind: DynamicKind,
    cell: Arc<RwLock<DynamicValue>>,
}

impl DynamicProperty {
    /// Creates a property holding the given value.
    pub fn new(kind: DynamicKind, value: DynamicValue) -> Self {
        Self {
            kind,
            cell: Arc::new(RwLock::new(value)),
        }
    }

    /// Creates a scalar property.
    pub fn scalar(kind: DynamicKind, value: f64) -> Self {
        Self::new(kind, DynamicValue::Scalar(value))
    }

    /// Property kind.
    #[inline]
    pub fn kind(&self) -> DynamicKind {
        self.kind
    }

    /// Deep-copies the cell so further writes are isolated.
    pub fn detached(&self) -> Self {
        let value = self.cell.read().unwrap().clone();
        Self::new(self.kind, value)
    }

    /// Reads the current value.
    pub fn value(&self) -> DynamicValue {
        self.cell.read().unwrap().clone()
    }

    /// Reads the value as a scalar.
    pub fn get_scalar(&self) -> ChromaResult<f64> {
        match &*self.cell.read().unwrap() {
            DynamicValue::Scalar(v) => Ok(*v),
            other => Err(ChromaError::TypeMismatch {
                expected: "scalar",
                found: other.type_name(),
            }),
        }
    }

    /// Writes a scalar value.
    pub fn set_scalar(&self, value: f64) -> ChromaResult<()> {
        let mut cell = self.cell.write().unwrap();
        match &mut *cell {
            DynamicValue::Scalar(v) => {
                *v = value;
                Ok(())
            }
            other => Err(ChromaError::TypeMismatch {
                expected: "scalar",
                found: other.type_name(),
            }),
        }
    }

    /// Reads grading primary values.
    pub fn get_primary(&self) -> ChromaResult<GradingPrimaryValues> {
        match &*self.cell.read().unwrap() {
            DynamicValue::Primary(v) => Ok(v.clone()),
            other => Err(ChromaError::TypeMismatch {
                expected: "grading primary",
                found: other.type_name(),
            }),
        }
    }

    /// Writes a value of the same type as the cell.
    pub fn set_value(&self, value: DynamicValue) -> ChromaResult<()> {
        let mut cell = self.cell.write().unwrap();
        if std::mem::discriminant(&*cell) != std::mem::discriminant(&value) {
            return Err(ChromaError::TypeMismatch {
                expected: cell.type_name(),
                found: value.type_name(),
            });
        }
        *cell = value;
        Ok(())
    }

    /// True if both handles share one cell.
    pub fn shares_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        let p = DynamicProperty::scalar(DynamicKind::Exposure, 0.0);
        p.set_scalar(1.5).unwrap();
        assert_eq!(p.get_scalar().unwrap(), 1.5);
    }

    #[test]
    fn wrong_type_access_fails() {
        let p = DynamicProperty::new(
            DynamicKind::GradingPrimary,
            DynamicValue::Primary(GradingPrimaryValues::default()),
        );
        assert!(matches!(
            p.get_scalar(),
            Err(ChromaError::TypeMismatch { .. })
        ));
        assert!(p.set_scalar(1.0).is_err());
    }

    #[test]
    fn detached_cells_are_isolated() {
        let a = DynamicProperty::scalar(DynamicKind::Gamma, 1.0);
        let b = a.detached();
        a.set_scalar(2.2).unwrap();
        assert_eq!(b.get_scalar().unwrap(), 1.0);
        assert!(!a.shares_cell(&b));
    }

    #[test]
    fn clone_shares_cell() {
        let a = DynamicProperty::scalar(DynamicKind::Contrast, 1.0);
        let b = a.clone();
        a.set_scalar(1.2).unwrap();
        assert_eq!(b.get_scalar().unwrap(), 1.2);
    }

    #[test]
    fn set_value_checks_discriminant() {
        let p = DynamicProperty::new(
            DynamicKind::GradingTone,
            DynamicValue::Tone(GradingToneValues::default()),
        );
        assert!(p.set_value(DynamicValue::Scalar(1.0)).is_err());
        assert!(p
            .set_value(DynamicValue::Tone(GradingToneValues::default()))
            .is_ok());
    }
}
