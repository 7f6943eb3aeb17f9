//! Cell addressing and table reads.
//!
//! Cells are addressed by a 1-indexed `(section, table, row, col)` tuple.
//! A `0` on any axis is a wildcard that expands to every index on that axis.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::document::Document;
use crate::error::{DocxError, Result};
use crate::wml::{Cell, CellMut, W_TBL, W_TC, W_TR};
use crate::xml::{Element, Node};

/// Position of a table cell. `0` on any axis means "every index".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub section: usize,
    pub table: usize,
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    /// Matches every cell of the document.
    pub const ALL: CellAddress = CellAddress::new(0, 0, 0, 0);

    pub const fn new(section: usize, table: usize, row: usize, col: usize) -> Self {
        Self {
            section,
            table,
            row,
            col,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.section == 0 || self.table == 0 || self.row == 0 || self.col == 0
    }

    /// The cell to the right (same row, next column).
    pub fn right(&self) -> Self {
        Self {
            col: self.col + 1,
            ..*self
        }
    }

    /// The cell below (next row, same column).
    pub fn below(&self) -> Self {
        Self {
            row: self.row + 1,
            ..*self
        }
    }

    /// The address shifted by `rows` and `cols`.
    pub fn offset(&self, rows: usize, cols: usize) -> Self {
        Self {
            row: self.row + rows,
            col: self.col + cols,
            ..*self
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.section, self.table, self.row, self.col
        )
    }
}

impl From<(usize, usize, usize, usize)> for CellAddress {
    fn from((section, table, row, col): (usize, usize, usize, usize)) -> Self {
        Self::new(section, table, row, col)
    }
}

/// Body child indices of the tables in a 1-indexed section.
fn section_tables(doc: &Document, section: usize) -> Option<Vec<usize>> {
    let span = doc.section_spans().into_iter().nth(section.checked_sub(1)?)?;
    let body = doc.body();
    Some(
        span.filter(|&i| matches!(&body.children[i], Node::Element(e) if e.name == W_TBL))
            .collect(),
    )
}

fn table_index(doc: &Document, section: usize, table: usize) -> Option<usize> {
    section_tables(doc, section)?
        .get(table.checked_sub(1)?)
        .copied()
}

fn table_element(doc: &Document, section: usize, table: usize) -> Option<&Element> {
    let idx = table_index(doc, section, table)?;
    match &doc.body().children[idx] {
        Node::Element(e) => Some(e),
        _ => None,
    }
}

fn cell_in_table(tbl: &Element, row: usize, col: usize) -> Option<&Element> {
    tbl.nth_child(W_TR, row.checked_sub(1)?)?
        .nth_child(W_TC, col.checked_sub(1)?)
}

fn locate(doc: &Document, addr: CellAddress) -> Option<&Element> {
    if addr.is_wildcard() {
        return None;
    }
    cell_in_table(table_element(doc, addr.section, addr.table)?, addr.row, addr.col)
}

fn out_of_range(addr: CellAddress) -> DocxError {
    DocxError::Position(format!("cell {} does not exist", addr))
}

/// The single cell at `addr`. Every axis must be at least 1.
pub fn get_cell(doc: &Document, addr: CellAddress) -> Result<Cell<'_>> {
    locate(doc, addr).map(Cell::new).ok_or_else(|| out_of_range(addr))
}

/// Mutable access to the single cell at `addr`.
pub fn get_cell_mut(doc: &mut Document, addr: CellAddress) -> Result<CellMut<'_>> {
    if addr.is_wildcard() {
        return Err(out_of_range(addr));
    }
    let idx = table_index(doc, addr.section, addr.table).ok_or_else(|| out_of_range(addr))?;
    let tc = match &mut doc.body_mut().children[idx] {
        Node::Element(tbl) => tbl
            .nth_child_mut(W_TR, addr.row - 1)
            .and_then(|tr| tr.nth_child_mut(W_TC, addr.col - 1)),
        _ => None,
    };
    tc.map(CellMut::new).ok_or_else(|| out_of_range(addr))
}

fn axis(selector: usize, count: usize) -> Vec<usize> {
    match selector {
        0 => (1..=count).collect(),
        n if n <= count => vec![n],
        _ => Vec::new(),
    }
}

/// Concrete addresses matched by `pattern`, in document order.
///
/// Indices beyond the end of a collection are skipped.
pub fn get_cell_addresses(doc: &Document, pattern: CellAddress) -> Vec<CellAddress> {
    let mut out = Vec::new();
    let section_count = doc.section_count();
    for s in axis(pattern.section, section_count) {
        let tables = section_tables(doc, s).unwrap_or_default();
        for t in axis(pattern.table, tables.len()) {
            let Some(tbl) = table_element(doc, s, t) else {
                continue;
            };
            let rows: Vec<&Element> = tbl.children_named(W_TR).collect();
            for r in axis(pattern.row, rows.len()) {
                let cols = rows[r - 1].count_children(W_TC);
                for c in axis(pattern.col, cols) {
                    out.push(CellAddress::new(s, t, r, c));
                }
            }
        }
    }
    out
}

/// Cells matched by `pattern` together with their concrete addresses.
pub fn get_cells(doc: &Document, pattern: CellAddress) -> Vec<(CellAddress, Cell<'_>)> {
    get_cell_addresses(doc, pattern)
        .into_iter()
        .filter_map(|addr| locate(doc, addr).map(|el| (addr, Cell::new(el))))
        .collect()
}

/// Every cell of the document, section by section, table by table.
pub fn iterate_cells(doc: &Document) -> Vec<(CellAddress, Cell<'_>)> {
    get_cells(doc, CellAddress::ALL)
}

/// Addresses of cells whose text equals `text` exactly.
#[instrument(skip(doc), level = "debug")]
pub fn find_text(doc: &Document, text: &str) -> Vec<CellAddress> {
    let found: Vec<CellAddress> = iterate_cells(doc)
        .into_iter()
        .filter(|(_, cell)| cell.text() == text)
        .map(|(addr, _)| addr)
        .collect();
    debug!("Found {} cells", found.len());
    found
}

pub fn get_cell_text(doc: &Document, addr: CellAddress) -> Result<String> {
    Ok(get_cell(doc, addr)?.text())
}

/// `(rows, columns of the first row)` of a table.
pub fn get_table_dimensions(
    doc: &Document,
    section: usize,
    table: usize,
) -> Result<(usize, usize)> {
    let tbl = table_element(doc, section, table).ok_or_else(|| {
        DocxError::Position(format!("table ({}, {}) does not exist", section, table))
    })?;
    let rows = tbl.count_children(W_TR);
    let cols = tbl
        .child(W_TR)
        .map(|tr| tr.count_children(W_TC))
        .unwrap_or(0);
    Ok((rows, cols))
}

pub fn get_section_table_count(doc: &Document, section: usize) -> Result<usize> {
    section_tables(doc, section)
        .map(|tables| tables.len())
        .ok_or_else(|| DocxError::Position(format!("section {} does not exist", section)))
}

pub fn get_section_count(doc: &Document) -> usize {
    doc.section_count()
}

/// Row-major text of a table sized by [`get_table_dimensions`].
pub fn get_table_text(doc: &Document, section: usize, table: usize) -> Result<Vec<Vec<String>>> {
    let (rows, cols) = get_table_dimensions(doc, section, table)?;
    (1..=rows)
        .map(|r| {
            (1..=cols)
                .map(|c| get_cell_text(doc, CellAddress::new(section, table, r, c)))
                .collect()
        })
        .collect()
}

/// Text of every cell in one row.
pub fn get_table_row_text(
    doc: &Document,
    section: usize,
    table: usize,
    row: usize,
) -> Result<Vec<String>> {
    let tbl = table_element(doc, section, table).ok_or_else(|| {
        DocxError::Position(format!("table ({}, {}) does not exist", section, table))
    })?;
    let tr = row
        .checked_sub(1)
        .and_then(|r| tbl.nth_child(W_TR, r))
        .ok_or_else(|| {
            DocxError::Position(format!(
                "row {} of table ({}, {}) does not exist",
                row, section, table
            ))
        })?;
    Ok(tr.children_named(W_TC).map(|tc| Cell::new(tc).text()).collect())
}

/// Text of one column, top to bottom.
pub fn get_table_column_text(
    doc: &Document,
    section: usize,
    table: usize,
    col: usize,
) -> Result<Vec<String>> {
    let (rows, _) = get_table_dimensions(doc, section, table)?;
    (1..=rows)
        .map(|r| get_cell_text(doc, CellAddress::new(section, table, r, col)))
        .collect()
}
