use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use htt::cli::Cli;
use htt::config::Config;
use htt::template::Template;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("htt: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> htt::Result<()> {
    let mut tmpl = Template::new();
    tmpl.load(&cli.template)?;

    // ── Data files, then -D overrides ─────────────────────────────────────────
    for path in &cli.data {
        let (config, errors) = Config::load_file(path)?;
        for e in errors {
            eprintln!("htt: {}: {e}", path.display());
        }
        tmpl.merge(config);
    }
    for (name, value) in cli.defines.iter() {
        tmpl.set(name.as_str(), value.as_str());
    }

    let mode = cli.mode();
    match &cli.output {
        Some(path) => tmpl.print_to_file(path, mode)?,
        None => tmpl.print(mode)?,
    }

    // Debug output already carried these in the trailer.
    for d in tmpl.take_diagnostics() {
        eprintln!("htt: {}: {d}", cli.template.display());
    }
    Ok(())
}
