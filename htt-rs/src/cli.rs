//! Command-line argument parsing.
//!
//! Usage:
//!   htt [-d] [-b <file>]… [-D <name>=<value>]… [-o <file>] <template>

use std::path::PathBuf;

use clap::Parser;

use crate::template::OutputMode;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(author, version, about = "Render an HTML template against bindings and tables", long_about = None)]
pub struct Cli {
    /// Template file to render.
    pub template: PathBuf,

    /// Data file with /set, /table, /row and /sort directives (repeatable).
    #[arg(short = 'b', long = "data", value_name = "FILE")]
    pub data: Vec<PathBuf>,

    /// Bind NAME to VALUE; applied after data files (repeatable).
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Write output to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Debug output: track line numbers and append the diagnostics trailer.
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    pub fn mode(&self) -> OutputMode {
        if self.debug {
            OutputMode::Debug
        } else {
            OutputMode::Release
        }
    }
}

/// Split `NAME=VALUE`.  The value may be empty; the name may not.
pub fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some(("", _)) => Err(format!("empty name in '{s}'")),
        Some((name, value)) => Ok((name.to_owned(), value.to_owned())),
        None => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("htt").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn template_only() {
        let cli = parse(&["page.html"]);
        assert_eq!(cli.template, PathBuf::from("page.html"));
        assert!(cli.data.is_empty());
        assert!(cli.output.is_none());
        assert_eq!(cli.mode(), OutputMode::Release);
    }

    #[test]
    fn all_flags() {
        let cli = parse(&[
            "-d", "-b", "a.dat", "--data", "b.dat", "-D", "x=1", "-D", "y=", "-o", "out.html", "t.html",
        ]);
        assert_eq!(cli.mode(), OutputMode::Debug);
        assert_eq!(cli.data, [PathBuf::from("a.dat"), PathBuf::from("b.dat")]);
        assert_eq!(
            cli.defines,
            [("x".to_owned(), "1".to_owned()), ("y".to_owned(), String::new())]
        );
        assert_eq!(cli.output, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn define_value_keeps_later_equals() {
        assert_eq!(parse_define("q=a=b"), Ok(("q".into(), "a=b".into())));
    }

    #[test]
    fn bad_define() {
        assert!(parse_define("novalue").is_err());
        assert!(parse_define("=1").is_err());
        assert!(Cli::try_parse_from(["htt", "-D", "oops", "t.html"]).is_err());
    }

    #[test]
    fn missing_template() {
        assert!(Cli::try_parse_from(["htt", "-d"]).is_err());
    }
}
