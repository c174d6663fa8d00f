//! Description of the connected target, as reported by the probe layer.

use serde::{Deserialize, Serialize};

/// Floating-point extension reported for the connected core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FpFeature {
    /// No FPU, or an unreported one.
    None,
    /// FPv4 single-precision (Cortex-M4F class).
    Fpv4SinglePrecision,
    /// FPv5 single-precision (Cortex-M7 class, SP only).
    Fpv5SinglePrecision,
    /// FPv5 double-precision.
    Fpv5DoublePrecision,
}

/// Per-session description of the connected target.
///
/// Created at attach time and held for the lifetime of the debug session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescription {
    /// Architecture/type name the probe layer reports, e.g. `"cortex_m"`.
    pub name: String,
    /// Floating-point extension of the core, if any.
    pub fp_feature: FpFeature,
}

impl TargetDescription {
    /// Describe a target by its reported type name and FPU revision.
    pub fn new(name: impl Into<String>, fp_feature: FpFeature) -> Self {
        Self {
            name: name.into(),
            fp_feature,
        }
    }
}
