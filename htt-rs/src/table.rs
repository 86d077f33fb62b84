//! Named tables driving `{{#FOR}}` loops.
//!
//! A [`Table`] has a fixed list of field names, an ordered list of rows and a
//! row cursor.  The cursor is what `{{.$field@table}}` and
//! `{{%CURSOR@table}}` observe; the renderer moves it while looping.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A reference to a table, row or field that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table \"{0}\" is not defined")]
    UndefinedTable(String),
    #[error("row {row} out of range in table \"{table}\" ({rows} rows)")]
    RowOutOfRange { table: String, row: usize, rows: usize },
    #[error("field .${field} not defined in table \"{table}\"")]
    UnknownField { table: String, field: String },
}

// ── Sort options ──────────────────────────────────────────────────────────────

/// Direction of [`Table::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// How [`Table::sort`] compares two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Byte-wise string comparison.
    #[default]
    Lexicographic,
    /// Leading-integer comparison; cells without one sort as `0`.
    Integer,
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// A fixed-column table of string cells.
#[derive(Debug, Clone, Default)]
pub struct Table {
    fields: Vec<String>,
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
    cursor: usize,
}

impl Table {
    /// Create an empty table.  Empty field names are skipped.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields
            .into_iter()
            .map(Into::into)
            .filter(|f| !f.is_empty())
            .collect();
        let columns = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();
        Self { fields, columns, rows: Vec::new(), cursor: 0 }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Column index of `field`.  A repeated field name maps to its last column.
    pub fn column(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Value of `field` in `row`, or `None` if either is out of range.
    pub fn value(&self, row: usize, field: &str) -> Option<&str> {
        let col = self.column(field)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Value of `field` at the table's own cursor.
    pub fn current(&self, field: &str) -> Option<&str> {
        self.value(self.cursor, field)
    }

    /// Append a row, padding with `""` or truncating to the field count.
    pub fn push_row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let width = self.fields.len();
        let mut row: Vec<String> = values
            .into_iter()
            .take(width)
            .map(|v| v.to_string())
            .collect();
        row.resize(width, String::new());
        self.rows.push(row);
    }

    /// Overwrite one cell.  `row` is 0-based.
    pub fn set_cell(
        &mut self,
        name: &str,
        row: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), TableError> {
        let rows = self.rows.len();
        if row >= rows {
            return Err(TableError::RowOutOfRange { table: name.to_owned(), row, rows });
        }
        let col = self.column(field).ok_or_else(|| TableError::UnknownField {
            table: name.to_owned(),
            field: field.to_owned(),
        })?;
        self.rows[row][col] = value.into();
        Ok(())
    }

    /// Remove one row.  `row` is 0-based.
    pub fn remove_row(&mut self, name: &str, row: usize) -> Result<Vec<String>, TableError> {
        let rows = self.rows.len();
        if row >= rows {
            return Err(TableError::RowOutOfRange { table: name.to_owned(), row, rows });
        }
        Ok(self.rows.remove(row))
    }

    /// Stable in-place sort on one field.  Rows with equal keys keep their
    /// relative order in both directions.
    pub fn sort(
        &mut self,
        name: &str,
        field: &str,
        order: SortOrder,
        mode: SortMode,
    ) -> Result<(), TableError> {
        let col = self.column(field).ok_or_else(|| TableError::UnknownField {
            table: name.to_owned(),
            field: field.to_owned(),
        })?;
        self.rows.sort_by(|a, b| {
            let ord = compare_cells(&a[col], &b[col], mode);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        Ok(())
    }
}

fn compare_cells(a: &str, b: &str, mode: SortMode) -> Ordering {
    match mode {
        SortMode::Lexicographic => a.as_bytes().cmp(b.as_bytes()),
        SortMode::Integer => leading_int(a).cmp(&leading_int(b)),
    }
}

/// `atol`-style parse: optional whitespace and sign, then leading digits.
/// Anything else (or overflow) yields `0`.
pub fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let n: i64 = digits[..end].parse().unwrap_or(0);
    if neg { -n } else { n }
}

// ── TableStore ────────────────────────────────────────────────────────────────

/// All tables known to a template, keyed by name (ordered for reporting).
#[derive(Debug, Default, Clone)]
pub struct TableStore {
    tables: BTreeMap<String, Table>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a table.  Returns `true` if the name was already
    /// in use; its rows are discarded.
    pub fn define<I, S>(&mut self, name: impl Into<String>, fields: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(name, Table::new(fields))
    }

    /// Install a whole table.  Returns `true` if it replaced one.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) -> bool {
        self.tables.insert(name.into(), table).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Mutable access, or [`TableError::UndefinedTable`].
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Table, TableError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| TableError::UndefinedTable(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Remove a table.  Returns `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.tables.remove(name).is_some()
    }

    pub fn push_row<I, S>(&mut self, name: &str, values: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.get_mut(name)?.push_row(values);
        Ok(())
    }

    pub fn set_cell(
        &mut self,
        name: &str,
        row: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), TableError> {
        self.get_mut(name)?.set_cell(name, row, field, value)
    }

    pub fn remove_row(&mut self, name: &str, row: usize) -> Result<Vec<String>, TableError> {
        self.get_mut(name)?.remove_row(name, row)
    }

    pub fn sort(
        &mut self,
        name: &str,
        field: &str,
        order: SortOrder,
        mode: SortMode,
    ) -> Result<(), TableError> {
        self.get_mut(name)?.sort(name, field, order, mode)
    }

    /// Move a table's cursor; unknown names are ignored.
    pub fn set_cursor(&mut self, name: &str, cursor: usize) {
        if let Some(t) = self.tables.get_mut(name) {
            t.set_cursor(cursor);
        }
    }

    /// Iterate over tables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl IntoIterator for TableStore {
    type Item = (String, Table);
    type IntoIter = std::collections::btree_map::IntoIter<String, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
