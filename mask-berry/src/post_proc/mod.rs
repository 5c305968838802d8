//! 后处理流程集合.

mod correct;
mod reconcile;

pub use correct::{CorrectionResult, SingleMaskProcessor};

pub use reconcile::{WholeCheck, ZoneOutcome, ZoneReconciler};
