//! Block interpreter.
//!
//! The [`Renderer`] walks a parsed node tree against the bindings and tables
//! and appends output to a `String`.  It implements [`EvalContext`] so the
//! expression evaluator can call back into it for lookups.
//!
//! Loop state (current table and cursor) lives on the renderer and is saved
//! and restored around each `#FOR`.  The table's own stored cursor is moved in
//! step so that `.$field@table` and `%CURSOR@table` observe the loop.

use std::collections::HashSet;

use crate::table::{Table, TableStore};
use crate::var::BindingStore;
use super::diag::DiagnosticLog;
use super::expr::EvalContext;
use super::parse::{Arm, Loop, Node};

// ── Renderer ──────────────────────────────────────────────────────────────────

/// State for one render pass.
pub struct Renderer<'a> {
    bindings: &'a BindingStore,
    tables: &'a mut TableStore,
    diags: &'a mut DiagnosticLog,
    table: String,
    cursor: usize,
    date: String,
    time: String,
    /// Sites that already produced a diagnostic this pass.
    reported: HashSet<usize>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        bindings: &'a BindingStore,
        tables: &'a mut TableStore,
        diags: &'a mut DiagnosticLog,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            bindings,
            tables,
            diags,
            table: String::new(),
            cursor: 0,
            date: date.into(),
            time: time.into(),
            reported: HashSet::new(),
        }
    }

    /// Render `nodes` to a new string.
    pub fn render(&mut self, nodes: &[Node]) -> String {
        let mut out = String::new();
        self.render_nodes(nodes, &mut out);
        out
    }

    pub fn render_nodes(&mut self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Emit(op) => out.push_str(&op.resolve(&*self)),
                Node::Unknown { text, site, line } => {
                    self.warn_once(*site, *line, format!("unknown directive \"{}\"", text.trim()));
                    out.push_str(text);
                }
                Node::If(arms) => self.render_if(arms, out),
                Node::For(lp) => self.render_for(lp, out),
            }
        }
    }

    /// Render the first arm whose test holds.  Later tests are not evaluated.
    fn render_if(&mut self, arms: &[Arm], out: &mut String) {
        for arm in arms {
            let holds = match &arm.test {
                None => true,
                Some(cond) => {
                    if cond.is_malformed() {
                        self.warn_once(
                            arm.site,
                            arm.line,
                            "AND/OR condition without ( ... ), compared as a whole",
                        );
                    }
                    cond.eval(&*self)
                }
            };
            if holds {
                self.render_nodes(&arm.body, out);
                return;
            }
        }
    }

    fn render_for(&mut self, lp: &Loop, out: &mut String) {
        let name = lp.table.resolve(&*self).into_owned();
        let rows = self.tables.get(&name).map_or(0, Table::len);
        if rows == 0 {
            self.warn_once(
                lp.site,
                lp.line,
                format!("table {} \"{}\" is not defined or has no rows", lp.source, name),
            );
            return;
        }

        let saved_table = std::mem::replace(&mut self.table, name.clone());
        let saved_cursor = self.cursor;
        tracing::trace!(table = %name, rows, "loop");

        // An unterminated loop has nothing to jump back to.
        let passes = if lp.closed { rows } else { 1 };
        for row in 0..passes {
            self.cursor = row;
            self.tables.set_cursor(&name, row);
            self.render_nodes(&lp.body, out);
        }
        if lp.closed {
            self.tables.set_cursor(&name, rows);
        }

        self.table = saved_table;
        self.cursor = saved_cursor;
        if !self.table.is_empty() {
            self.tables.set_cursor(&self.table, saved_cursor);
        }
    }

    fn warn_once(&mut self, site: usize, line: usize, message: impl Into<String>) {
        if self.reported.insert(site) {
            self.diags.warning(line, message);
        }
    }
}

impl EvalContext for Renderer<'_> {
    fn binding(&self, name: &str) -> Option<&str> {
        self.bindings.get(name)
    }

    fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    fn current_table(&self) -> &str {
        &self.table
    }

    fn current_cursor(&self) -> usize {
        self.cursor
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn time(&self) -> &str {
        &self.time
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse::parse;

    struct Fixture {
        vars: BindingStore,
        tables: TableStore,
        diags: DiagnosticLog,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tables = TableStore::new();
            tables.define("users", ["name", "age"]);
            for (n, a) in [("ann", "31"), ("bo", "7"), ("cy", "52")] {
                tables.push_row("users", [n, a]).unwrap();
            }
            tables.define("tags", ["tag"]);
            for t in ["x", "y"] {
                tables.push_row("tags", [t]).unwrap();
            }
            tables.define("empty", ["e"]);
            Self { vars: BindingStore::new(), tables, diags: DiagnosticLog::new() }
        }

        fn set(mut self, k: &str, v: &str) -> Self {
            self.vars.set(k, v);
            self
        }

        fn render(&mut self, src: &str) -> String {
            let compiled = parse(src, true);
            let mut r = Renderer::new(&self.vars, &mut self.tables, &mut self.diags, "2024-1-2", "3:4:5");
            r.render(&compiled.nodes)
        }
    }

    #[test]
    fn loop_cursor_and_rows() {
        let mut f = Fixture::new();
        let out = f.render("{{#FOR users}}{{%CURSOR}}/{{%ROWS}}:{{.$name}} {{#ENDFOR}}");
        assert_eq!(out, "1/3:ann 2/3:bo 3/3:cy ");
        assert!(f.diags.is_empty());
    }

    #[test]
    fn table_cursor_after_loop_is_row_count() {
        let mut f = Fixture::new();
        f.render("{{#FOR users}}{{#ENDFOR}}");
        assert_eq!(f.tables.get("users").unwrap().cursor(), 3);
    }

    #[test]
    fn nested_loops_restore_context() {
        let mut f = Fixture::new();
        let out = f.render(
            "{{#FOR users}}{{.$name}}[{{#FOR tags}}{{.$tag}}{{.$name@users}}{{#ENDFOR}}]{{.$name}};{{#ENDFOR}}",
        );
        assert_eq!(out, "ann[xannyann]ann;bo[xboybo]bo;cy[xcyycy]cy;");
    }

    #[test]
    fn nested_same_table_restores_stored_cursor() {
        let mut f = Fixture::new();
        let out = f.render(
            "{{#FOR users}}{{#FOR users}}{{#ENDFOR}}{{%CURSOR@users}}{{#ENDFOR}}",
        );
        assert_eq!(out, "123");
    }

    #[test]
    fn loop_over_binding() {
        let mut f = Fixture::new().set("t", "tags");
        assert_eq!(f.render("{{#FOR $t}}{{.$tag}}{{#ENDFOR}}"), "xy");
    }

    #[test]
    fn empty_or_missing_table_warns_once() {
        let mut f = Fixture::new();
        let out = f.render("{{#FOR tags}}{{#FOR empty}}no{{#ENDFOR}}{{#FOR ghost}}no{{#ENDFOR}}{{#ENDFOR}}");
        assert_eq!(out, "");
        let msgs: Vec<_> = f.diags.iter().map(|d| d.message.clone()).collect();
        assert_eq!(
            msgs,
            [
                "table empty \"empty\" is not defined or has no rows",
                "table ghost \"ghost\" is not defined or has no rows",
            ]
        );
    }

    #[test]
    fn if_branch_selection() {
        let src = "{{#IF $n==1}}one{{#ELSIF $n==2}}two{{#ELSE}}many{{#ENDIF}}";
        assert_eq!(Fixture::new().set("n", "1").render(src), "one");
        assert_eq!(Fixture::new().set("n", "2").render(src), "two");
        assert_eq!(Fixture::new().set("n", "9").render(src), "many");
        assert_eq!(Fixture::new().render("{{#IF $n}}x{{#ENDIF}}"), "");
    }

    #[test]
    fn inactive_arm_is_not_evaluated() {
        // The loop in the dead arm would warn if it ran.
        let mut f = Fixture::new();
        let out = f.render("{{#IF 0}}{{#FOR ghost}}{{#ENDFOR}}{{#ELSE}}ok{{#ENDIF}}");
        assert_eq!(out, "ok");
        assert!(f.diags.is_empty());
    }

    #[test]
    fn if_inside_loop_uses_row() {
        let mut f = Fixture::new();
        let out = f.render("{{#FOR users}}{{#IF .$age>18}}{{.$name}} {{#ENDIF}}{{#ENDFOR}}");
        assert_eq!(out, "ann cy ");
    }

    #[test]
    fn malformed_and_warns_once_per_pass() {
        let mut f = Fixture::new();
        f.render("{{#FOR users}}{{#IF AND $x}}y{{#ENDIF}}{{#ENDFOR}}");
        assert_eq!(f.diags.len(), 1);
    }

    #[test]
    fn unknown_directive_echoed_and_warned() {
        let mut f = Fixture::new();
        let out = f.render("<style>{{ nope }}</style>");
        assert_eq!(out, "<style>{{ nope }}</style>");
        assert_eq!(f.diags.iter().next().unwrap().message, "unknown directive \"{{ nope }}\"");
    }

    #[test]
    fn date_and_time() {
        let mut f = Fixture::new();
        assert_eq!(f.render("{{%DATE}} {{%TIME}}"), "2024-1-2 3:4:5");
    }

    #[test]
    fn top_level_table_lookups_are_errors() {
        let src = "{{.$name@users}}|{{%ROWS@users}}|{{%CURSOR}}";
        let mut f = Fixture::new();
        assert_eq!(f.render(src), "||");
        let errors = parse(src, true)
            .diagnostics
            .iter()
            .filter(|d| d.severity == crate::template::Severity::Error)
            .count();
        assert_eq!(errors, 3);
    }

    #[test]
    fn loop_cut_off_by_open_tag_renders_first_row() {
        let mut f = Fixture::new();
        assert_eq!(f.render("{{#FOR users}}{{.$name}} tail {{$x"), "ann tail {{$x");
    }

    #[test]
    fn loop_without_endfor_renders_first_row() {
        let mut f = Fixture::new();
        assert_eq!(f.render("{{#FOR users}}[{{.$name}}]"), "[ann]");
        assert_eq!(f.tables.get("users").unwrap().cursor(), 0);
    }
}
