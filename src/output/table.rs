//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns, object::Rows},
};

/// Shown when the store has nothing to display yet
const EMPTY_MESSAGE: &str = "No readings stored yet. Run `breathesafe refresh` first.";

/// Format reading rows as a table. The AQI column (index 2) is right-aligned
/// so values line up regardless of magnitude.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Modify::new(Columns::one(2)).with(Alignment::right()));

    table.to_string()
}
