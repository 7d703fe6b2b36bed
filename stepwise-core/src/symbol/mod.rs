//! Resolved symbol and line information
//!
//! Read-only snapshots of what the symbol collaborator knows about an
//! address: the line-table row covering it and the symbol containing it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StepError};

/// Half-open range of file addresses `[base, base + byte_size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    pub base: u64,
    pub byte_size: u64,
}

impl AddressRange {
    pub fn new(base: u64, byte_size: u64) -> Self {
        Self { base, byte_size }
    }

    /// Build a range from a start and an exclusive end
    pub fn from_bounds(start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(StepError::InvalidRange { start, end });
        }
        Ok(Self::new(start, end - start))
    }

    /// Exclusive end address
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.byte_size)
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:x}-0x{:x})", self.base, self.end())
    }
}

bitflags! {
    /// Which parts of a symbol context a lookup should resolve
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolContextScope: u32 {
        const LINE_ENTRY = 1 << 0;
        const SYMBOL = 1 << 1;
        const FUNCTION = 1 << 2;
    }
}

/// One row of the line table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEntry {
    pub range: AddressRange,
    #[serde(default)]
    pub file: Option<String>,
    /// Source line; 0 marks compiler-generated code with no source line
    pub line: u32,
    #[serde(default)]
    pub column: u16,
}

impl LineEntry {
    pub fn new(range: AddressRange, line: u32) -> Self {
        Self {
            range,
            file: None,
            line,
            column: 0,
        }
    }

    pub fn is_line_zero(&self) -> bool {
        self.line == 0
    }

    /// Same source line as `other` (ignoring address and column)
    pub fn same_line_as(&self, other: &LineEntry) -> bool {
        self.line == other.line && self.file == other.file
    }
}

/// A symbol from the symbol table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    /// Start address; absent when the symbol's value is not an address
    #[serde(default)]
    pub address: Option<u64>,
    #[serde(default)]
    pub byte_size: u64,
}

impl Symbol {
    pub fn new(name: impl Into<String>, address: u64, byte_size: u64) -> Self {
        Self {
            name: name.into(),
            address: Some(address),
            byte_size,
        }
    }

    /// Last byte covered by the symbol, if it has an address and a size
    pub fn last_address(&self) -> Option<u64> {
        let start = self.address?;
        if self.byte_size == 0 {
            return None;
        }
        start.checked_add(self.byte_size - 1)
    }
}

/// What a pc resolves to, limited to the requested scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolContext {
    #[serde(default)]
    pub line_entry: Option<LineEntry>,
    #[serde(default)]
    pub symbol: Option<Symbol>,
    /// Name of the function from debug info
    #[serde(default)]
    pub function: Option<String>,
}

impl SymbolContext {
    /// Resolved line, or None when there is no line entry at all
    pub fn line(&self) -> Option<u32> {
        self.line_entry.as_ref().map(|entry| entry.line)
    }

    /// A line entry exists and it is the line-0 sentinel
    pub fn is_line_zero(&self) -> bool {
        self.line() == Some(0)
    }
}
