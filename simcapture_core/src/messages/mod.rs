//! Value types carried inside captured records
//!
//! - Geometry: spatial primitives (Vector3, Quaternion)

pub mod geometry;

pub use geometry::{Quaternion, Vector3};

/// Short, human readable rendering of a message for log lines
pub trait LogSummary {
    fn log_summary(&self) -> String;
}
