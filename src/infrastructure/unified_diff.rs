//! # Unified Diff Adapter
//!
//! Implementation of `DiffPort` using `diffy` for real patch application,
//! with a fuzzy second tier built on `similar` line matching.

use crate::ports::{DiffPort, PortError, PortResult};
use diffy::{apply, apply_fuzzy, Patch};
use similar::TextDiff;

pub struct UnifiedDiff;

impl UnifiedDiff {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnifiedDiff {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffPort for UnifiedDiff {
    fn compute_diff(&self, old: &str, new: &str) -> String {
        diffy::create_patch(old, new).to_string()
    }

    fn apply_patch(&self, text: &str, patch: &str) -> PortResult<String> {
        if patch.is_empty() {
            return Ok(text.to_string());
        }
        let parsed = Patch::from_str(patch)
            .map_err(|e| PortError::PatchFailed(format!("parse failed: {e}")))?;
        apply(text, &parsed).map_err(|e| PortError::PatchFailed(format!("exact apply failed: {e}")))
    }

    fn apply_patch_fuzzy(&self, text: &str, patch: &str) -> PortResult<String> {
        if patch.is_empty() {
            return Ok(text.to_string());
        }
        let parsed = Patch::from_str(patch)
            .map_err(|e| PortError::PatchFailed(format!("parse failed: {e}")))?;
        apply_fuzzy(text, &parsed)
            .map_err(|e| PortError::PatchFailed(format!("fuzzy apply failed: {e}")))
    }
}

/// Cheap heuristic used by the application layer to decide whether a hunk is
/// even worth escalating to fuzzy/snapshot: if `similar`'s line-level ratio
/// between the patch's expected base and the current text is very low, the
/// file has diverged too much for patching to make sense at all.
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    TextDiff::from_lines(a, b).ratio()
}
