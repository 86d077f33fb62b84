//! Directive scanner.
//!
//! Finds the next `{{ … }}` tag in raw template text and classifies its
//! trimmed content.  The scanner never fails: a missing `}}` is reported as
//! [`Scan::Unterminated`] and left to the caller to recover from.
//!
//! | Content              | Directive                     |
//! |----------------------|-------------------------------|
//! | `$name`              | [`Directive::Value`]          |
//! | `.$field[@table]`    | [`Directive::TableValue`]     |
//! | `#FOR table`         | [`Directive::For`]            |
//! | `#ENDFOR`            | [`Directive::EndFor`]         |
//! | `#IF expr`           | [`Directive::If`]             |
//! | `#ELSIF expr`        | [`Directive::ElsIf`]          |
//! | `#ELSE`              | [`Directive::Else`]           |
//! | `#ENDIF`             | [`Directive::EndIf`]          |
//! | `%CURSOR[@table]`    | [`Directive::Cursor`]         |
//! | `%ROWS[@table]`      | [`Directive::Rows`]           |
//! | `%DATE` / `%TIME`    | [`Directive::Date`] / [`Directive::Time`] |
//! | `%SPACE` / `%BLANK`  | [`Directive::Space`] / [`Directive::Blank`] |
//! | anything else        | [`Directive::Unknown`]        |

pub const OPEN: &str = "{{";
pub const CLOSE: &str = "}}";

pub const VALUE: &str = "$";
pub const TABLE_VALUE: &str = ".$";
pub const TABLE_SCOPE: &str = "@";
pub const CURSOR: &str = "%CURSOR";
pub const ROWS: &str = "%ROWS";
pub const DATE: &str = "%DATE";
pub const TIME: &str = "%TIME";
pub const SPACE: &str = "%SPACE";
pub const BLANK: &str = "%BLANK";

const FOR: &str = "#FOR";
const ENDFOR: &str = "#ENDFOR";
const IF: &str = "#IF";
const ELSIF: &str = "#ELSIF";
const ELSE: &str = "#ELSE";
const ENDIF: &str = "#ENDIF";

/// A classified tag payload.  Value-like variants keep the full trimmed
/// content; block openers keep only the expression after the keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Value(String),
    TableValue(String),
    For(String),
    EndFor,
    If(String),
    ElsIf(String),
    Else,
    EndIf,
    Cursor(String),
    Rows(String),
    Date,
    Time,
    Space,
    Blank,
    Unknown(String),
}

/// A tag found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Byte offset of the opening `{{`.
    pub start: usize,
    /// Bytes consumed from `start`.  For an unknown directive that contains
    /// another `{{`, this stops just before the inner delimiter.
    pub len: usize,
    pub directive: Directive,
}

impl Tag {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Result of one scan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// No further `{{`; the rest of the text is literal.
    End,
    Tag(Tag),
    /// An `{{` at this offset has no matching `}}`.
    Unterminated(usize),
}

/// Find and classify the next tag at or after byte offset `from`.
pub fn next_tag(src: &str, from: usize) -> Scan {
    let Some(rel) = src[from..].find(OPEN) else {
        return Scan::End;
    };
    let start = from + rel;
    let body = start + OPEN.len();
    let Some(rel_end) = src[body..].find(CLOSE) else {
        return Scan::Unterminated(start);
    };
    let end = body + rel_end;
    let raw = &src[body..end];
    let directive = classify(raw.trim());
    let len = match (&directive, raw.find(OPEN)) {
        (Directive::Unknown(_), Some(inner)) => OPEN.len() + inner,
        _ => end + CLOSE.len() - start,
    };
    Scan::Tag(Tag { start, len, directive })
}

/// Classify trimmed tag content.
pub fn classify(content: &str) -> Directive {
    if content.starts_with(VALUE) {
        Directive::Value(content.to_owned())
    } else if content.starts_with(TABLE_VALUE) {
        Directive::TableValue(content.to_owned())
    } else if let Some(rest) = content.strip_prefix(FOR) {
        Directive::For(rest.trim().to_owned())
    } else if content == ENDFOR {
        Directive::EndFor
    } else if let Some(rest) = content.strip_prefix(IF) {
        Directive::If(rest.trim().to_owned())
    } else if let Some(rest) = content.strip_prefix(ELSIF) {
        Directive::ElsIf(rest.trim().to_owned())
    } else if content == ELSE {
        Directive::Else
    } else if content == ENDIF {
        Directive::EndIf
    } else if content.starts_with(CURSOR) {
        Directive::Cursor(content.to_owned())
    } else if content.starts_with(ROWS) {
        Directive::Rows(content.to_owned())
    } else {
        match content {
            DATE => Directive::Date,
            TIME => Directive::Time,
            SPACE => Directive::Space,
            BLANK => Directive::Blank,
            other => Directive::Unknown(other.to_owned()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
