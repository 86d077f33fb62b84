//! Block parser: template text → node tree.
//!
//! The document is parsed once; loop bodies are stored as node lists and
//! replayed for each row.  Structural problems (unterminated tags, missing
//! `#ENDIF`/`#ENDFOR`, stray block keywords) are found here and returned with
//! the tree, since they do not depend on the data.
//!
//! Every `#IF` arm, `#FOR` and unknown directive gets a *site* id.  The
//! renderer uses it to report run-time diagnostics once per pass even when a
//! loop replays the same node many times.

use super::diag::{Diagnostic, Severity};
use super::expr::{Condition, Operand};
use super::scan::{self, Directive, Scan};

/// One element of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),
    /// A value directive (`$x`, `.$f`, `%CURSOR`, …).
    Emit(Operand),
    /// A directive the scanner did not recognise; echoed as written.
    Unknown { text: String, site: usize, line: usize },
    If(Vec<Arm>),
    For(Loop),
}

/// One arm of an `#IF` block.  `test` is `None` for `#ELSE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arm {
    pub test: Option<Condition>,
    pub body: Vec<Node>,
    pub site: usize,
    pub line: usize,
}

/// A `#FOR` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    /// Operand resolving to the table name.
    pub table: Operand,
    /// The operand as written, for diagnostics.
    pub source: String,
    pub body: Vec<Node>,
    pub site: usize,
    pub line: usize,
    /// `false` when the text ended before `#ENDFOR`; such a loop renders
    /// its first row only.
    pub closed: bool,
}

/// Parse result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compiled {
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse `src`.  With `track_lines` off every diagnostic line is 0.
pub fn parse(src: &str, track_lines: bool) -> Compiled {
    let mut p = Parser {
        src,
        pos: 0,
        track_lines,
        line_pos: 0,
        line: 0,
        next_site: 0,
        diags: Vec::new(),
    };
    let (nodes, _) = p.parse_seq(Block::Top);
    Compiled { nodes, diagnostics: p.diags }
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Top,
    If,
    For,
}

/// Why [`Parser::parse_seq`] returned.
enum Stop {
    Eof,
    /// The terminator of the block being parsed (`#ENDIF` or `#ENDFOR`).
    Close,
    ElsIf { expr: String, line: usize },
    Else { line: usize },
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    track_lines: bool,
    /// Offset up to which newlines have been counted.
    line_pos: usize,
    line: usize,
    next_site: usize,
    diags: Vec<Diagnostic>,
}

impl Parser<'_> {
    /// 0-based line of byte `offset`.  Offsets only ever move forward.
    fn line_at(&mut self, offset: usize) -> usize {
        if !self.track_lines {
            return 0;
        }
        if offset > self.line_pos {
            self.line += self.src[self.line_pos..offset].matches('\n').count();
            self.line_pos = offset;
        }
        self.line
    }

    fn site(&mut self) -> usize {
        let s = self.next_site;
        self.next_site += 1;
        s
    }

    fn error(&mut self, line: usize, message: String) {
        self.diags.push(Diagnostic { line, severity: Severity::Error, message });
    }

    fn push_text(nodes: &mut Vec<Node>, text: &str) {
        if !text.is_empty() {
            nodes.push(Node::Text(text.to_owned()));
        }
    }

    /// Parse nodes until end of text or a keyword that ends `block`.
    fn parse_seq(&mut self, block: Block) -> (Vec<Node>, Stop) {
        let mut nodes = Vec::new();
        loop {
            let tag = match scan::next_tag(self.src, self.pos) {
                Scan::End => {
                    Self::push_text(&mut nodes, &self.src[self.pos..]);
                    self.pos = self.src.len();
                    return (nodes, Stop::Eof);
                }
                Scan::Unterminated(start) => {
                    let line = self.line_at(start);
                    self.error(line, format!("unterminated tag, missing \"{}\"", scan::CLOSE));
                    Self::push_text(&mut nodes, &self.src[self.pos..]);
                    self.pos = self.src.len();
                    return (nodes, Stop::Eof);
                }
                Scan::Tag(tag) => tag,
            };

            let (start, end) = (tag.start, tag.end());
            Self::push_text(&mut nodes, &self.src[self.pos..start]);
            let line = self.line_at(start);
            self.pos = end;

            let stray = match tag.directive {
                // Table lookups only make sense inside a block.
                Directive::TableValue(e) | Directive::Cursor(e) | Directive::Rows(e)
                    if block == Block::Top =>
                {
                    self.error(line, format!("unexpected {{{{{e}}}}}"));
                    continue;
                }
                Directive::Value(e)
                | Directive::TableValue(e)
                | Directive::Cursor(e)
                | Directive::Rows(e) => {
                    nodes.push(Node::Emit(Operand::parse(&e)));
                    continue;
                }
                Directive::Date => {
                    nodes.push(Node::Emit(Operand::Date));
                    continue;
                }
                Directive::Time => {
                    nodes.push(Node::Emit(Operand::Time));
                    continue;
                }
                Directive::Space => {
                    nodes.push(Node::Emit(Operand::Space));
                    continue;
                }
                Directive::Blank => {
                    nodes.push(Node::Emit(Operand::Blank));
                    continue;
                }
                Directive::Unknown(_) => {
                    let site = self.site();
                    let text = self.src[start..end].to_owned();
                    nodes.push(Node::Unknown { text, site, line });
                    continue;
                }
                Directive::If(expr) => {
                    let node = self.parse_if(&expr, line);
                    nodes.push(node);
                    continue;
                }
                Directive::For(expr) => {
                    let node = self.parse_for(&expr, line);
                    nodes.push(node);
                    continue;
                }
                Directive::EndIf if block == Block::If => return (nodes, Stop::Close),
                Directive::EndFor if block == Block::For => return (nodes, Stop::Close),
                Directive::ElsIf(expr) if block == Block::If => {
                    return (nodes, Stop::ElsIf { expr, line })
                }
                Directive::Else if block == Block::If => return (nodes, Stop::Else { line }),
                Directive::EndIf => "#ENDIF",
                Directive::EndFor => "#ENDFOR",
                Directive::ElsIf(_) => "#ELSIF",
                Directive::Else => "#ELSE",
            };
            self.error(line, format!("unexpected {{{{{stray}}}}}"));
        }
    }

    fn parse_if(&mut self, expr: &str, line: usize) -> Node {
        let mut arms = Vec::new();
        let mut test = Some(Condition::parse(expr));
        let mut arm_line = line;
        loop {
            let site = self.site();
            let (body, stop) = self.parse_seq(Block::If);
            arms.push(Arm { test: test.take(), body, site, line: arm_line });
            match stop {
                Stop::Close => break,
                Stop::Eof => {
                    self.error(line, "missing {{#ENDIF}}".to_owned());
                    break;
                }
                Stop::ElsIf { expr, line } => {
                    test = Some(Condition::parse(&expr));
                    arm_line = line;
                }
                Stop::Else { line } => arm_line = line,
            }
        }
        Node::If(arms)
    }

    fn parse_for(&mut self, expr: &str, line: usize) -> Node {
        let site = self.site();
        let (body, stop) = self.parse_seq(Block::For);
        let closed = !matches!(stop, Stop::Eof);
        if !closed {
            self.error(line, "missing {{#ENDFOR}}".to_owned());
        }
        Node::For(Loop {
            table: Operand::parse(expr),
            source: expr.to_owned(),
            body,
            site,
            line,
            closed,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
