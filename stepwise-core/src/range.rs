//! Step range for stepping through a line-table row

use crate::symbol::{AddressRange, SymbolContext};

/// The row range to step through and whether it covers its whole function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStepRange {
    pub range: AddressRange,
    /// The row spans the entire enclosing symbol
    pub spans_function: bool,
}

/// Derive the step range for the line entry in `sc`.
///
/// Returns None when `sc` carries no line entry. The row spans the function
/// when it contains both the first and the last byte of the symbol; a
/// symbol without an address or without a size never qualifies.
pub fn row_step_range(sc: &SymbolContext) -> Option<RowStepRange> {
    let entry = sc.line_entry.as_ref()?;
    let range = entry.range;

    let spans_function = sc
        .symbol
        .as_ref()
        .and_then(|symbol| Some((symbol.address?, symbol.last_address()?)))
        .is_some_and(|(start, last)| range.contains(start) && range.contains(last));

    Some(RowStepRange {
        range,
        spans_function,
    })
}
