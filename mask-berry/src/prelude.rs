//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::{BinaryMask, MaskVolume, NiftiHeaderAttr};

pub use crate::consts::gray::{BACKGROUND, COMBINED_CENTRAL, COMBINED_PERIPHERAL, FOREGROUND};
pub use crate::consts::ElemType;

pub use crate::morph_3d::{ComponentAnalyzer, ComponentFilter, Connectivity, HoleRepairer};
pub use crate::post_proc::{CorrectionResult, SingleMaskProcessor, ZoneOutcome, ZoneReconciler};

pub use crate::dataset::{self, CaseId};
pub use crate::pipeline::{
    run_lesion_qc, run_zone_qc, LesionQcConfig, SavePolicy, ZoneInput, ZoneQcConfig,
};
pub use crate::report::{CaseOutcome, CaseRow};

pub use crate::QcError;
