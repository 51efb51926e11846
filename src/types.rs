use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

// ─── Public types ─────────────────────────────────────────────────────────────

/// Severity level used by validation issues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single diagnostic produced during a conversion pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&ConvertError> for ValidationIssue {
    fn from(error: &ConvertError) -> Self {
        Self {
            severity: Severity::Error,
            code: error.code().to_string(),
            message: format!("[ERROR] {}", error),
        }
    }
}

/// Report returned by the model hook after the scene pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneConversionReport {
    /// False when the asset is not configured for axis conversion.
    pub applied: bool,
    pub flip_z_axis: bool,
    pub remapped_node_count: usize,
    pub deleted_nodes: Vec<String>,
    pub snapped_nodes: Vec<String>,
    pub mesh_count: usize,
    pub bind_pose_mesh_count: usize,
    pub issues: Vec<ValidationIssue>,
}

/// Report returned by the animation hook for one clip.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClipConversionReport {
    pub clip_name: String,
    pub applied: bool,
    pub remapped_groups: usize,
    pub rejected_groups: usize,
    pub unrecognized_bindings: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

impl ClipConversionReport {
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }
}
