//! Per-target stepping settings
//!
//! Mirrors the debugger's `step-in-avoid-nodebug` / `step-out-avoid-nodebug`
//! thread settings. Loaded from TOML; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::flags::{AvoidFlags, LazyBool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSettings {
    /// Step over functions that have no debug information when stepping in
    pub step_in_avoid_no_debug: bool,
    /// Keep stepping out of callers that have no debug information
    pub step_out_avoid_no_debug: bool,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            step_in_avoid_no_debug: true,
            step_out_avoid_no_debug: false,
        }
    }
}

impl StepSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Avoidance flags for a new plan; `Calculate` takes the setting
    pub fn avoid_flags(&self, step_in: LazyBool, step_out: LazyBool) -> AvoidFlags {
        AvoidFlags::from_settings(
            step_in.resolve(self.step_in_avoid_no_debug),
            step_out.resolve(self.step_out_avoid_no_debug),
        )
    }
}
