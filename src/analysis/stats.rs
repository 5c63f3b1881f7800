//! Structural statistics derived from definition sites.

use serde::{Deserialize, Serialize};

use super::scanner::{Definition, DefinitionKind};

/// Counts describing a source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralStatistics {
    pub total_lines: usize,
    pub functions_count: usize,
    pub classes_count: usize,
    pub documented_functions_count: usize,
    /// Documented functions as a whole percentage, rounded half up; 0 when
    /// there are no functions.
    pub documentation_percentage: u8,
}

impl StructuralStatistics {
    pub(super) fn from_definitions(total_lines: usize, definitions: &[Definition]) -> Self {
        let functions = definitions
            .iter()
            .filter(|d| d.kind == DefinitionKind::Function);
        let functions_count = functions.clone().count();
        let documented_functions_count = functions.filter(|d| d.documented).count();
        let classes_count = definitions
            .iter()
            .filter(|d| d.kind == DefinitionKind::Class)
            .count();

        Self {
            total_lines,
            functions_count,
            classes_count,
            documented_functions_count,
            documentation_percentage: percentage(documented_functions_count, functions_count),
        }
    }

    /// Functions with no documentation.
    pub fn undocumented_functions_count(&self) -> usize {
        self.functions_count - self.documented_functions_count
    }
}

/// `round(100 * part / whole)` with halves rounded up, clamped to 100.
pub(crate) fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let value = (part * 200 + whole) / (2 * whole);
    value.min(100) as u8
}
