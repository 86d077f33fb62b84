//! Data file parser.
//!
//! A data file supplies bindings and tables for a template, one directive per
//! line:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>…` | bind a scalar |
//! | `/unset <name>` | remove a binding |
//! | `/table <name> <field>…` | define a table |
//! | `/row <name> <value>…` | append a row |
//! | `/sort <name> <field> [-d] [-n]` | sort (`-d` descending, `-n` integer) |
//! | Lines starting with `;` | comment, ignored |
//!
//! Arguments may be double-quoted, with `\"` escapes inside quotes.  A bad
//! line is reported as a [`ConfigError`] and skipped; the rest still loads.

use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use thiserror::Error;

use crate::error::{Error, Result};
use crate::table::{SortMode, SortOrder, TableStore};
use crate::var::BindingStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error on one line of a data file.  `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Bindings and tables loaded from a data file.
#[derive(Debug, Default)]
pub struct Config {
    pub bindings: BindingStore,
    pub tables: TableStore,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a data file.  Returns the config and every line that failed.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Err(message) = config.apply(line) {
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a data file from disk.
    pub fn load_file(path: &Path) -> Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)
            .map_err(|source| Error::Data { path: path.to_owned(), source })?;
        let (config, errors) = Self::load_str(&s);
        tracing::debug!(
            path = %path.display(),
            bindings = config.bindings.len(),
            tables = config.tables.len(),
            errors = errors.len(),
            "data file loaded"
        );
        Ok((config, errors))
    }

    fn apply(&mut self, line: &str) -> Result<(), String> {
        let Some(rest) = line.strip_prefix('/') else {
            return Err(format!("expected a /directive, got \"{line}\""));
        };
        let (cmd, args) = rest
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((rest, ""));
        let tokens = split_args(args.trim());

        match cmd {
            "set" => {
                let (name, value) = set_binding(&tokens)?;
                self.bindings.set(name, value);
                Ok(())
            }
            "unset" => match tokens.as_slice() {
                [name] => {
                    self.bindings.unset(name);
                    Ok(())
                }
                _ => Err("/unset: expected one name".into()),
            },
            "table" => match tokens.split_first() {
                Some((name, fields)) if !fields.is_empty() => {
                    if self.tables.define(name.as_str(), fields.iter().cloned()) {
                        return Err(format!("/table: \"{name}\" redefined"));
                    }
                    Ok(())
                }
                _ => Err("/table: expected a name and at least one field".into()),
            },
            "row" => match tokens.split_first() {
                Some((name, values)) => self
                    .tables
                    .push_row(name, values)
                    .map_err(|e| format!("/row: {e}")),
                None => Err("/row: expected a table name".into()),
            },
            "sort" => parse_sort(&tokens, &mut self.tables),
            other => Err(format!("unknown directive /{other}")),
        }
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Whitespace-separated words.  A `"…"` run inside a word keeps its spaces
/// and takes `\"` escapes; a bare `""` is an empty word.
fn split_args(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = s.chars().peekable();
    loop {
        while chars.next_if(char::is_ascii_whitespace).is_some() {}
        if chars.peek().is_none() {
            return words;
        }
        let mut word = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_ascii_whitespace()) {
            if c == '"' {
                quoted_run(&mut chars, &mut word);
            } else {
                word.push(c);
            }
        }
        words.push(word);
    }
}

/// Consume up to the closing quote; an unclosed run ends with the line.
fn quoted_run(chars: &mut Peekable<Chars<'_>>, word: &mut String) {
    while let Some(c) = chars.next() {
        match c {
            '"' => return,
            '\\' => word.extend(chars.next()),
            _ => word.push(c),
        }
    }
}

// ── Directives ────────────────────────────────────────────────────────────────

/// `/set name=value` (value is the first word only) or `/set name value...`.
fn set_binding(tokens: &[String]) -> Result<(String, String), String> {
    let (first, rest) = tokens
        .split_first()
        .ok_or("/set: requires an argument")?;
    let (name, value) = match first.split_once('=') {
        Some((name, value)) => (name.to_owned(), value.to_owned()),
        None if rest.is_empty() => return Err(format!("/set: missing value for '{first}'")),
        None => (first.clone(), rest.join(" ")),
    };
    if name.is_empty() {
        return Err("/set: name cannot be empty".into());
    }
    Ok((name, value))
}

fn parse_sort(tokens: &[String], tables: &mut TableStore) -> Result<(), String> {
    let mut order = SortOrder::Ascending;
    let mut mode = SortMode::Lexicographic;
    let mut positional = Vec::new();
    for t in tokens {
        match t.as_str() {
            "-d" => order = SortOrder::Descending,
            "-n" => mode = SortMode::Integer,
            "-dn" | "-nd" => {
                order = SortOrder::Descending;
                mode = SortMode::Integer;
            }
            flag if flag.starts_with('-') => return Err(format!("/sort: unknown option {flag}")),
            _ => positional.push(t.as_str()),
        }
    }
    let [name, field] = positional.as_slice() else {
        return Err("/sort: expected a table name and a field".into());
    };
    tables
        .sort(name, field, order, mode)
        .map_err(|e| format!("/sort: {e}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
