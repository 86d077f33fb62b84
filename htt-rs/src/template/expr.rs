//! Directive expressions: operand resolution, comparisons, and `AND(…)` /
//! `OR(…)` conditions.
//!
//! Expressions are not a real grammar.  An operand is recognised purely by
//! prefix (`$`, `.$`, `%CURSOR`, …) and anything unrecognised is a literal,
//! which is what lets `{{#IF $lang==en}}` compare against a bare word.
//!
//! A comparison is split at the first operator found, trying operators in the
//! fixed priority order `==`, `!=`, `<=`, `<`, `>=`, `>`.  Two operands that
//! both consist only of ASCII digits compare numerically; anything else
//! compares byte-wise.
//!
//! `AND(a, b, …)` and `OR(a, b, …)` split their argument list at every comma.
//! They do not nest.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::table::Table;
use super::scan::{BLANK, CURSOR, DATE, ROWS, SPACE, TABLE_SCOPE, TABLE_VALUE, TIME, VALUE};

const AND: &str = "AND";
const OR: &str = "OR";

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Lookup interface used by the evaluator.
///
/// The renderer implements this over its bindings, tables and loop state.
pub trait EvalContext {
    /// Scalar binding `$name`.
    fn binding(&self, name: &str) -> Option<&str>;

    /// Table by name.
    fn table(&self, name: &str) -> Option<&Table>;

    /// Name of the table the innermost `#FOR` is iterating (`""` outside loops).
    fn current_table(&self) -> &str;

    /// Row index of the innermost `#FOR`.
    fn current_cursor(&self) -> usize;

    /// `%DATE` for this render pass.
    fn date(&self) -> &str;

    /// `%TIME` for this render pass.
    fn time(&self) -> &str;
}

// ── Operand ───────────────────────────────────────────────────────────────────

/// One side of a comparison, or the payload of a value directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `$name`
    Scalar(String),
    /// `.$field` or `.$field@table`; the table part is itself an operand.
    Field { field: String, table: Option<Box<Operand>> },
    /// `%CURSOR` or `%CURSOR@table` (1-based).
    Cursor(Option<Box<Operand>>),
    /// `%ROWS` or `%ROWS@table`
    Rows(Option<Box<Operand>>),
    Date,
    Time,
    Space,
    Blank,
    /// Any other text, standing for itself.
    Literal(String),
}

impl Operand {
    pub fn parse(expr: &str) -> Self {
        if let Some(name) = expr.strip_prefix(VALUE) {
            Operand::Scalar(name.to_owned())
        } else if let Some(rest) = expr.strip_prefix(TABLE_VALUE) {
            match rest.split_once(TABLE_SCOPE) {
                Some((field, table)) => Operand::Field {
                    field: field.to_owned(),
                    table: Some(Box::new(Operand::parse(table))),
                },
                None => Operand::Field { field: rest.to_owned(), table: None },
            }
        } else if let Some(rest) = expr.strip_prefix(CURSOR) {
            Operand::Cursor(scope(rest))
        } else if let Some(rest) = expr.strip_prefix(ROWS) {
            Operand::Rows(scope(rest))
        } else {
            match expr {
                DATE => Operand::Date,
                TIME => Operand::Time,
                SPACE => Operand::Space,
                BLANK => Operand::Blank,
                other => Operand::Literal(other.to_owned()),
            }
        }
    }

    /// Resolve to a string.  Missing bindings, tables, rows and fields all
    /// resolve to `""`; cursor and row counts of a missing table are `"0"`.
    pub fn resolve<'c>(&'c self, ctx: &'c dyn EvalContext) -> Cow<'c, str> {
        match self {
            Operand::Scalar(name) => Cow::Borrowed(ctx.binding(name).unwrap_or("")),
            Operand::Field { field, table: None } => Cow::Borrowed(
                ctx.table(ctx.current_table())
                    .and_then(|t| t.value(ctx.current_cursor(), field))
                    .unwrap_or(""),
            ),
            Operand::Field { field, table: Some(scope) } => {
                let name = scope.resolve(ctx);
                Cow::Borrowed(ctx.table(&name).and_then(|t| t.current(field)).unwrap_or(""))
            }
            Operand::Cursor(None) => {
                let n = match ctx.table(ctx.current_table()) {
                    Some(_) => ctx.current_cursor() + 1,
                    None => 0,
                };
                Cow::Owned(n.to_string())
            }
            Operand::Cursor(Some(scope)) => {
                let name = scope.resolve(ctx);
                let n = ctx.table(&name).map_or(0, |t| t.cursor() + 1);
                Cow::Owned(n.to_string())
            }
            Operand::Rows(scope) => {
                let name = match scope {
                    Some(s) => s.resolve(ctx),
                    None => Cow::Borrowed(ctx.current_table()),
                };
                Cow::Owned(ctx.table(&name).map_or(0, Table::len).to_string())
            }
            Operand::Date => Cow::Borrowed(ctx.date()),
            Operand::Time => Cow::Borrowed(ctx.time()),
            Operand::Space => Cow::Borrowed(" "),
            Operand::Blank => Cow::Borrowed(""),
            Operand::Literal(s) => Cow::Borrowed(s),
        }
    }
}

fn scope(rest: &str) -> Option<Box<Operand>> {
    rest.split_once(TABLE_SCOPE)
        .map(|(_, table)| Box::new(Operand::parse(table)))
}

// ── Comparison ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
}

/// Search order when splitting a comparison.
const OPERATORS: [CmpOp; 6] = [CmpOp::Eq, CmpOp::Ne, CmpOp::Le, CmpOp::Lt, CmpOp::Ge, CmpOp::Gt];

impl CmpOp {
    pub fn token(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Le => "<=",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Gt => ord == Ordering::Greater,
        }
    }
}

/// A single test: either a truthiness check or `lhs op rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Truthy(Operand),
    Binary { lhs: Operand, op: CmpOp, rhs: Operand },
}

impl Comparison {
    pub fn parse(expr: &str) -> Self {
        for op in OPERATORS {
            let tok = op.token();
            if let Some(i) = expr.find(tok) {
                return Comparison::Binary {
                    lhs: Operand::parse(expr[..i].trim()),
                    op,
                    rhs: Operand::parse(expr[i + tok.len()..].trim()),
                };
            }
        }
        Comparison::Truthy(Operand::parse(expr))
    }

    pub fn eval(&self, ctx: &dyn EvalContext) -> bool {
        match self {
            Comparison::Truthy(v) => {
                let v = v.resolve(ctx);
                !v.is_empty() && v != "0"
            }
            Comparison::Binary { lhs, op, rhs } => {
                op.holds(compare_values(&lhs.resolve(ctx), &rhs.resolve(ctx)))
            }
        }
    }
}

/// Numeric when both sides are all digits, byte-wise otherwise.
pub fn compare_values(l: &str, r: &str) -> Ordering {
    if is_number(l) && is_number(r) {
        // Digit strings of any length: strip leading zeros, then longer wins.
        let l = l.trim_start_matches('0');
        let r = r.trim_start_matches('0');
        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
    } else {
        l.as_bytes().cmp(r.as_bytes())
    }
}

/// Non-empty and made only of ASCII decimal digits.
pub fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ── Condition ─────────────────────────────────────────────────────────────────

/// The payload of `#IF` / `#ELSIF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Test(Comparison),
    All(Vec<Comparison>),
    Any(Vec<Comparison>),
    /// `AND`/`OR` prefix without a `( … )` wrapper; evaluated as a single
    /// comparison over the whole text.
    Malformed(Comparison),
}

impl Condition {
    pub fn parse(expr: &str) -> Self {
        let (all, rest) = if let Some(rest) = expr.strip_prefix(AND) {
            (true, rest)
        } else if let Some(rest) = expr.strip_prefix(OR) {
            (false, rest)
        } else {
            return Condition::Test(Comparison::parse(expr));
        };

        let inner = rest
            .trim()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'));
        match inner {
            Some(list) => {
                let items = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Comparison::parse)
                    .collect();
                if all { Condition::All(items) } else { Condition::Any(items) }
            }
            None => Condition::Malformed(Comparison::parse(expr)),
        }
    }

    pub fn eval(&self, ctx: &dyn EvalContext) -> bool {
        match self {
            Condition::Test(c) | Condition::Malformed(c) => c.eval(ctx),
            Condition::All(items) => items.iter().all(|c| c.eval(ctx)),
            Condition::Any(items) => items.iter().any(|c| c.eval(ctx)),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Condition::Malformed(_))
    }
}

// ── Convenience ───────────────────────────────────────────────────────────────

/// Parse and resolve an operand expression.
pub fn resolve(expr: &str, ctx: &dyn EvalContext) -> String {
    Operand::parse(expr).resolve(ctx).into_owned()
}

/// Parse and evaluate a single comparison.
pub fn compare(expr: &str, ctx: &dyn EvalContext) -> bool {
    Comparison::parse(expr).eval(ctx)
}

/// Parse and evaluate an `#IF` condition.
pub fn check_if(expr: &str, ctx: &dyn EvalContext) -> bool {
    Condition::parse(expr).eval(ctx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
