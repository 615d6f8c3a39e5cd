use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(data)?;
        println!("{json}");
    } else {
        display_fn(data);
    }
    Ok(())
}

/// One cell of a [`ReportTable`].
pub enum Cell {
    /// A single name or message; `-` when absent
    Text(Option<String>),
    /// A right-aligned number
    Count(usize),
    /// A set of block or variable names, space separated; `-` when empty
    Names(Vec<String>),
}

impl Cell {
    /// A set of names.
    pub fn names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Cell::Names(names.into_iter().map(str::to_string).collect())
    }

    fn render(self) -> comfy_table::Cell {
        let (text, align) = match self {
            Cell::Text(text) => (text.filter(|t| !t.is_empty()), CellAlignment::Left),
            Cell::Count(n) => (Some(n.to_string()), CellAlignment::Right),
            Cell::Names(names) if names.is_empty() => (None, CellAlignment::Left),
            Cell::Names(names) => (Some(names.join(" ")), CellAlignment::Left),
        };
        comfy_table::Cell::new(text.unwrap_or_else(|| "-".to_string())).set_alignment(align)
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(Some(text))
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(Some(text.to_string()))
    }
}

impl From<Option<String>> for Cell {
    fn from(text: Option<String>) -> Self {
        Cell::Text(text)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Count(n)
    }
}

/// A per-block (or per-variable, per-event) table, indented under its heading.
pub struct ReportTable {
    table: Table,
}

impl ReportTable {
    /// Create a table with the given column headers.
    pub fn new(headers: &[&str]) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(headers.to_vec());

        // two spaces between columns, none outside
        let last = headers.len().saturating_sub(1);
        for i in 0..headers.len() {
            if let Some(col) = table.column_mut(i) {
                col.set_padding((u16::from(i > 0), u16::from(i < last)));
            }
        }
        Self { table }
    }

    /// Add a row, cells in column order.
    pub fn row<const N: usize>(&mut self, cells: [Cell; N]) {
        self.table.add_row(cells.map(Cell::render));
    }

    /// Print the table to stdout, two spaces in.
    pub fn print(&self) {
        for line in self.table.to_string().lines() {
            println!("  {}", line.trim_end());
        }
    }
}
