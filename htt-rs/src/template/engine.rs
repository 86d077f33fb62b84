//! The [`Template`] engine: document, data, options and output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{Local, NaiveDateTime};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::table::{SortMode, SortOrder, TableError, TableStore};
use crate::var::BindingStore;
use super::diag::{Diagnostic, DiagnosticLog};
use super::parse::{parse, Compiled};
use super::render::Renderer;

/// Origin shown in the trailer for text supplied with [`Template::set_source`].
const FROM_STRING: &str = "read from string";

const GENERATOR: &str = "htt";

/// Whether output carries debugging information.
///
/// `Debug` tracks source line numbers in diagnostics and appends the trailer
/// comment; `Release` does neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    Debug,
    #[default]
    Release,
}

/// An HTML template together with the data it renders.
#[derive(Debug, Default)]
pub struct Template {
    source: String,
    origin: String,
    bindings: BindingStore,
    tables: TableStore,
    diags: DiagnosticLog,
    mode: OutputMode,
    /// Parsed tree for `source`, tagged with the mode it was parsed under.
    cache: Option<(OutputMode, Compiled)>,
    clock: Option<NaiveDateTime>,
    date: String,
    time: String,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// A template over `src` with no data.
    pub fn from_source(src: impl Into<String>) -> Self {
        let mut t = Self::new();
        t.set_source(src);
        t
    }

    // ── Document ──────────────────────────────────────────────────────────────

    pub fn set_source(&mut self, src: impl Into<String>) {
        self.source = src.into();
        self.origin = FROM_STRING.to_owned();
        self.cache = None;
    }

    /// Read the template from a file.  On failure the previous document is
    /// kept, an error diagnostic is recorded and the error returned.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(src) => {
                tracing::debug!(path = %path.display(), bytes = src.len(), "template loaded");
                self.source = src;
                self.origin = path.display().to_string();
                self.cache = None;
                Ok(())
            }
            Err(source) => {
                self.origin = format!("can't open file {}", path.display());
                self.diags.error(0, self.origin.clone());
                Err(Error::Load { path: path.to_owned(), source })
            }
        }
    }

    /// [`load`](Self::load) `file` relative to `dir`.
    pub fn load_in(&mut self, dir: impl AsRef<Path>, file: impl AsRef<Path>) -> Result<()> {
        self.load(dir.as_ref().join(file))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Where the document came from: a path or `"read from string"`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    /// Freeze `%DATE` / `%TIME` at `at`; `None` goes back to the local clock.
    pub fn set_clock(&mut self, at: Option<NaiveDateTime>) {
        self.clock = at;
    }

    // ── Bindings ──────────────────────────────────────────────────────────────

    /// Bind `name` to the display form of `value`, so numbers need no
    /// conversion at the call site.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.bindings.set(name, value.to_string());
    }

    pub fn unset(&mut self, name: &str) -> bool {
        self.bindings.unset(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &BindingStore {
        &self.bindings
    }

    // ── Tables ────────────────────────────────────────────────────────────────

    /// Define (or redefine) table `name`.  Also binds `$name` to `name` if
    /// that binding is unset, so `{{#FOR $name}}` works.
    pub fn table<I, S>(&mut self, name: &str, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if name.is_empty() {
            return;
        }
        if self.tables.define(name, fields) {
            self.diags.warning(0, format!("table name \"{name}\" redefined"));
        }
        if !self.bindings.contains(name) {
            self.bindings.set(name, name);
        }
    }

    /// Append a row.  Missing values are `""`; extra values are dropped.
    pub fn set_row<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        if let Err(e) = self.tables.push_row(name, values) {
            self.report("set_row", e);
        }
    }

    /// Overwrite one cell.  `row` is 0-based.
    pub fn set_cell(&mut self, name: &str, row: usize, field: &str, value: impl Into<String>) {
        if let Err(e) = self.tables.set_cell(name, row, field, value) {
            self.report("set_cell", e);
        }
    }

    /// Remove one row.  `row` is 0-based.
    pub fn unset_row(&mut self, name: &str, row: usize) {
        if let Err(e) = self.tables.remove_row(name, row) {
            self.report("unset_row", e);
        }
    }

    pub fn sort_table(&mut self, name: &str, field: &str, order: SortOrder, mode: SortMode) {
        if let Err(e) = self.tables.sort(name, field, order, mode) {
            self.report("sort_table", e);
        }
    }

    pub fn unset_table(&mut self, name: &str) -> bool {
        self.tables.remove(name)
    }

    pub fn tables(&self) -> &TableStore {
        &self.tables
    }

    /// Drop every binding and table.
    pub fn clear_set(&mut self) {
        self.bindings.clear();
        self.tables.clear();
    }

    /// Install the bindings and tables of a loaded data file.  Tables follow
    /// the same rules as [`table`](Self::table).
    pub fn merge(&mut self, config: Config) {
        for (name, value) in config.bindings {
            self.bindings.set(name, value);
        }
        for (name, table) in config.tables {
            if self.tables.insert(name.as_str(), table) {
                self.diags.warning(0, format!("table name \"{name}\" redefined"));
            }
            if !self.bindings.contains(&name) {
                self.bindings.set(name.as_str(), name.as_str());
            }
        }
    }

    fn report(&mut self, op: &str, err: TableError) {
        let message = format!("{err}, in {op}()");
        match err {
            TableError::UnknownField { .. } => self.diags.warning(0, message),
            TableError::UndefinedTable(_) | TableError::RowOutOfRange { .. } => {
                self.diags.error(0, message)
            }
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diags
    }

    /// Drain everything recorded since the last drain or trailer.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diags.take()
    }

    // ── Output ────────────────────────────────────────────────────────────────

    /// Render the document.  Never includes the trailer.
    pub fn render(&mut self) -> String {
        self.stamp();
        if self.source.is_empty() {
            self.diags.error(0, "template not initialized");
            return String::new();
        }

        let mode = self.mode;
        if matches!(&self.cache, Some((cached, _)) if *cached != mode) {
            self.cache = None;
        }
        let source = &self.source;
        let (_, compiled) = self.cache.get_or_insert_with(|| {
            tracing::debug!(?mode, "parsing template");
            (mode, parse(source, mode == OutputMode::Debug))
        });

        self.diags.extend(compiled.diagnostics.iter().cloned());
        let mut renderer = Renderer::new(
            &self.bindings,
            &mut self.tables,
            &mut self.diags,
            self.date.as_str(),
            self.time.as_str(),
        );
        let out = renderer.render(&compiled.nodes);
        tracing::trace!(bytes = out.len(), "rendered");
        out
    }

    /// Render, appending the trailer in debug mode.
    pub fn html(&mut self) -> String {
        let mut out = self.render();
        if self.mode == OutputMode::Debug {
            out.push_str(&self.trailer());
        }
        out
    }

    /// Set `mode`, render, and write the result (and trailer, in debug mode).
    pub fn write_to<W: Write>(&mut self, w: &mut W, mode: OutputMode) -> Result<()> {
        Ok(self.emit(w, mode)?)
    }

    /// [`write_to`](Self::write_to) standard output.
    pub fn print(&mut self, mode: OutputMode) -> Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_to(&mut lock, mode)
    }

    /// [`write_to`](Self::write_to) a file, truncating it.
    pub fn print_to_file(&mut self, path: impl AsRef<Path>, mode: OutputMode) -> Result<()> {
        let path = path.as_ref();
        let wrap = |source| Error::Write { path: path.to_owned(), source };
        let file = File::create(path).map_err(wrap)?;
        let mut w = BufWriter::new(file);
        self.emit(&mut w, mode).map_err(wrap)
    }

    fn emit<W: Write>(&mut self, w: &mut W, mode: OutputMode) -> io::Result<()> {
        self.mode = mode;
        let body = self.render();
        w.write_all(body.as_bytes())?;
        if mode == OutputMode::Debug {
            w.write_all(self.trailer().as_bytes())?;
        }
        w.flush()
    }

    /// The debug trailer: an HTML comment with the generator stamp, origin,
    /// table sizes and diagnostics (1-based lines).  Clears the diagnostics.
    pub fn trailer(&mut self) -> String {
        let mut s = format!(
            "\n<!-- Generated by {GENERATOR} {} {}\n  Template source: {}\n  Tables: {}\n",
            self.date,
            self.time,
            self.origin,
            self.tables.len(),
        );
        for (name, table) in self.tables.iter() {
            s.push_str(&format!("    Table {name}\t\t{} rows\n", table.len()));
        }
        s.push_str(&format!("  Errors: {}\n", self.diags.len()));
        for d in self.diags.by_line() {
            s.push_str(&format!("    Line {}\t\t{d}\n", d.line + 1));
        }
        s.push_str("-->");
        self.diags.clear();
        s
    }

    fn stamp(&mut self) {
        let now = self.clock.unwrap_or_else(|| Local::now().naive_local());
        self.date = now.format("%Y-%-m-%-d").to_string();
        self.time = now.format("%-H:%-M:%-S").to_string();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
