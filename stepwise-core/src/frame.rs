//! Stack frames as seen by the stepping engine
//!
//! The frame collaborator hands us one [`StackFrame`] per frame of the
//! stopped thread. [`FrameSnapshot`] is the plain-data implementation used
//! by the server bridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::flags::FrameComparison;
use crate::ids::ThreadId;
use crate::settings::StepSettings;
use crate::symbol::{AddressRange, LineEntry, Symbol, SymbolContext, SymbolContextScope};

/// Identity of a frame: its canonical frame address and function start.
///
/// Stacks grow down, so a younger frame has a lower CFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackId {
    pub cfa: u64,
    pub function_start: u64,
}

pub trait StackFrame: Send + Sync + fmt::Debug {
    fn pc(&self) -> u64;

    fn stack_id(&self) -> StackId;

    /// Resolve the parts of the symbol context named by `scope`
    fn symbol_context(&self, scope: SymbolContextScope) -> SymbolContext;

    fn has_debug_info(&self) -> bool;
}

/// Frame state captured by the host after a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub pc: u64,
    pub cfa: u64,
    #[serde(default)]
    pub symbol: Option<Symbol>,
    #[serde(default)]
    pub line_entry: Option<LineEntry>,
    #[serde(default)]
    pub function: Option<String>,
}

impl FrameSnapshot {
    pub fn new(pc: u64, cfa: u64) -> Self {
        Self {
            pc,
            cfa,
            symbol: None,
            line_entry: None,
            function: None,
        }
    }

    pub fn with_symbol(mut self, name: impl Into<String>, address: u64, byte_size: u64) -> Self {
        self.symbol = Some(Symbol::new(name, address, byte_size));
        self
    }

    pub fn with_line(mut self, range: AddressRange, line: u32) -> Self {
        self.line_entry = Some(LineEntry::new(range, line));
        self
    }

    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }
}

impl StackFrame for FrameSnapshot {
    fn pc(&self) -> u64 {
        self.pc
    }

    fn stack_id(&self) -> StackId {
        let function_start = self
            .symbol
            .as_ref()
            .and_then(|symbol| symbol.address)
            .unwrap_or(self.pc);
        StackId {
            cfa: self.cfa,
            function_start,
        }
    }

    fn symbol_context(&self, scope: SymbolContextScope) -> SymbolContext {
        let mut sc = SymbolContext::default();
        if scope.contains(SymbolContextScope::LINE_ENTRY) {
            sc.line_entry = self.line_entry.clone();
        }
        if scope.contains(SymbolContextScope::SYMBOL) {
            sc.symbol = self.symbol.clone();
        }
        if scope.contains(SymbolContextScope::FUNCTION) {
            sc.function = self.function.clone();
        }
        sc
    }

    // A frame has debug info when its pc maps to a line-table row.
    fn has_debug_info(&self) -> bool {
        self.line_entry.is_some()
    }
}

/// The frame a plan started in, together with its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOrigin {
    pub frame: StackId,
    pub parent: Option<StackId>,
}

/// Frames of one stopped thread, youngest first
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<Arc<dyn StackFrame>>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames<F>(frames: impl IntoIterator<Item = F>) -> Self
    where
        F: StackFrame + 'static,
    {
        Self {
            frames: frames
                .into_iter()
                .map(|frame| Arc::new(frame) as Arc<dyn StackFrame>)
                .collect(),
        }
    }

    pub fn frame_at_index(&self, index: usize) -> Option<&dyn StackFrame> {
        self.frames.get(index).map(|frame| frame.as_ref())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn pc(&self) -> Option<u64> {
        self.frame_at_index(0).map(|frame| frame.pc())
    }

    /// Identity of frame `index` and its caller, for later comparison
    pub fn origin(&self, index: usize) -> Option<FrameOrigin> {
        let frame = self.frame_at_index(index)?.stack_id();
        let parent = self.frame_at_index(index + 1).map(|f| f.stack_id());
        Some(FrameOrigin { frame, parent })
    }

    /// Compare the current youngest frame against `origin`
    pub fn compare_to(&self, origin: &FrameOrigin) -> FrameComparison {
        let Some(current) = self.frame_at_index(0) else {
            return FrameComparison::Unknown;
        };
        let id = current.stack_id();
        if id == origin.frame {
            return FrameComparison::Equal;
        }

        let parent = self.frame_at_index(1).map(|f| f.stack_id());
        if parent.is_some() && parent == origin.parent {
            return FrameComparison::SameParent;
        }

        match id.cfa.cmp(&origin.frame.cfa) {
            std::cmp::Ordering::Less => FrameComparison::Younger,
            std::cmp::Ordering::Greater => FrameComparison::Older,
            std::cmp::Ordering::Equal => FrameComparison::Unknown,
        }
    }
}

/// Everything a plan or stop-here policy may look at during one stop
#[derive(Debug, Clone, Copy)]
pub struct StopContext<'a> {
    thread: ThreadId,
    stack: &'a CallStack,
    settings: &'a StepSettings,
}

impl<'a> StopContext<'a> {
    pub fn new(thread: ThreadId, stack: &'a CallStack, settings: &'a StepSettings) -> Self {
        Self {
            thread,
            stack,
            settings,
        }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    pub fn stack(&self) -> &'a CallStack {
        self.stack
    }

    pub fn settings(&self) -> &'a StepSettings {
        self.settings
    }

    pub fn current_frame(&self) -> Option<&'a dyn StackFrame> {
        self.stack.frame_at_index(0)
    }

    pub fn pc(&self) -> Option<u64> {
        self.stack.pc()
    }

    /// The pc formatted for log lines
    pub fn pc_display(&self) -> String {
        match self.pc() {
            Some(pc) => format!("0x{:x}", pc),
            None => "<no frame>".to_string(),
        }
    }
}
