//! Avoidance flags, frame comparison and the small policy enums plans carry.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Avoidance policy read by the stop-here decision.
    ///
    /// Owned by a plan; the decision only ever sees a copy taken at the
    /// start of an invocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AvoidFlags: u32 {
        /// Don't stop in a younger (or same-parent) frame without debug info
        const STEP_IN_AVOID_NO_DEBUG = 1 << 0;
        /// Don't stop in an older frame without debug info
        const STEP_OUT_AVOID_NO_DEBUG = 1 << 1;
    }
}

impl AvoidFlags {
    pub fn from_settings(step_in_avoid_no_debug: bool, step_out_avoid_no_debug: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::STEP_IN_AVOID_NO_DEBUG, step_in_avoid_no_debug);
        flags.set(Self::STEP_OUT_AVOID_NO_DEBUG, step_out_avoid_no_debug);
        flags
    }

    /// Whether a frame lacking debug info should be skipped when reached
    /// through `comparison`.
    pub fn avoids_no_debug(self, comparison: FrameComparison) -> bool {
        match comparison {
            FrameComparison::Older => self.contains(Self::STEP_OUT_AVOID_NO_DEBUG),
            FrameComparison::Younger | FrameComparison::SameParent => {
                self.contains(Self::STEP_IN_AVOID_NO_DEBUG)
            }
            FrameComparison::Equal | FrameComparison::Unknown => false,
        }
    }
}

/// How the frame reached after a step relates to the frame it started in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameComparison {
    /// Frames could not be compared (e.g. no stack)
    Unknown,
    /// Still in the originating frame
    Equal,
    /// A sibling call at the same depth
    SameParent,
    /// Entered a callee
    Younger,
    /// Returned to a caller
    Older,
}

impl fmt::Display for FrameComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameComparison::Unknown => "unknown",
            FrameComparison::Equal => "equal",
            FrameComparison::SameParent => "same-parent",
            FrameComparison::Younger => "younger",
            FrameComparison::Older => "older",
        };
        f.write_str(name)
    }
}

/// A plan's vote on whether the process as a whole should stop or run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Yes,
    No,
    NoOpinion,
}

/// Which threads run while a plan resumes the inferior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    AllThreads,
    OnlyThisThread,
    /// Hold other threads only while single-stepping through the range
    #[default]
    OnlyDuringStepping,
}

impl RunMode {
    pub fn stops_others(self) -> bool {
        !matches!(self, RunMode::AllThreads)
    }
}

/// A yes/no that may be left to be calculated from settings later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LazyBool {
    #[default]
    Calculate,
    Yes,
    No,
}

impl LazyBool {
    pub fn resolve(self, calculated: bool) -> bool {
        match self {
            LazyBool::Calculate => calculated,
            LazyBool::Yes => true,
            LazyBool::No => false,
        }
    }
}
