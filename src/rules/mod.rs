//! Per-stage rules seam.
//!
//! Each stage engine implements [`StageRules`]. The
//! [`StageManager`](crate::manager::StageManager) routes an action to the
//! current stage, then polls [`StageRules::is_complete`] to decide whether
//! to transition.

pub mod engine;

pub use engine::{StageContext, StageRules};
