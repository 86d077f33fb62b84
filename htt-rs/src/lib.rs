pub mod cli;
pub mod config;
pub mod error;
pub mod table;
pub mod template;
pub mod var;

pub use error::{Error, Result};
pub use table::{SortMode, SortOrder};
pub use template::{OutputMode, Template};
