//! HTML template engine.
//!
//! A template is ordinary text with `{{ … }}` directives:
//!
//! - Values: `{{$name}}`, `{{.$field}}`, `{{.$field@table}}`, `{{%CURSOR}}`,
//!   `{{%ROWS@table}}`, `{{%DATE}}`, `{{%TIME}}`, `{{%SPACE}}`, `{{%BLANK}}`
//! - Conditionals: `{{#IF cond}}` … `{{#ELSIF cond}}` … `{{#ELSE}}` … `{{#ENDIF}}`
//! - Loops: `{{#FOR table}}` … `{{#ENDFOR}}`
//!
//! Rendering never fails.  Problems are collected as [`Diagnostic`]s and, in
//! [`OutputMode::Debug`], listed in a trailing HTML comment.
//!
//! # Quick start
//!
//! ```rust
//! use htt::template::Template;
//!
//! let mut t = Template::from_source("{{#FOR $users}}<li>{{.$name}}</li>{{#ENDFOR}}");
//! t.table("users", ["name"]);
//! t.set_row("users", ["Ada"]);
//! t.set_row("users", ["Grace"]);
//! assert_eq!(t.render(), "<li>Ada</li><li>Grace</li>");
//! ```

pub mod diag;
pub mod engine;
pub mod expr;
pub mod parse;
pub mod render;
pub mod scan;

// Re-exports for convenience.
pub use diag::{Diagnostic, Severity};
pub use engine::{OutputMode, Template};
pub use expr::EvalContext;
