//! docxlib command-line tool.
//!
//! Subcommands:
//! - `version` / `info`: library version and defaults
//! - `validate` / `inspect`: check a package and list its tables
//! - `extract-vars` / `fill`: template variables and substitution from JSON
//! - `convert`: PDF conversion through LibreOffice

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::{Cli, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("Parsed arguments: {:?}", cli);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match (cli.version, &cli.command) {
        (true, _) | (false, Some(Command::Version)) => commands::version(&mut out),
        (false, None) => Cli::command()
            .print_help()
            .map(|_| ExitCode::SUCCESS)
            .map_err(anyhow::Error::from),
        (false, Some(command)) => dispatch(&mut out, command),
    };

    match flush_after(&mut out, result) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Flushes `out` once the command has run; a failed flush fails the command.
fn flush_after(
    out: &mut dyn Write,
    result: anyhow::Result<ExitCode>,
) -> anyhow::Result<ExitCode> {
    let flushed = out.flush().context("failed to flush stdout");
    let code = result?;
    flushed?;
    Ok(code)
}

fn dispatch(out: &mut dyn Write, command: &Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Version => commands::version(out),
        Command::Info => commands::info(out),
        Command::Validate { file } => commands::validate(out, file),
        Command::Inspect { file } => commands::inspect(out, file),
        Command::ExtractVars { file, output } => {
            commands::extract_vars(out, file, output.as_deref())
        }
        Command::Fill {
            template,
            data,
            output,
            missing,
        } => commands::fill(out, template, data, output.as_deref(), *missing),
        Command::Convert {
            input,
            format,
            output,
            render,
        } => commands::convert(out, input, format.as_deref(), output.as_deref(), render),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_flush_failure_fails_successful_command() {
        let err = flush_after(&mut BrokenPipe, Ok(ExitCode::SUCCESS)).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to flush stdout"));
    }

    #[test]
    fn test_command_error_is_kept_over_flush() {
        let err = flush_after(&mut BrokenPipe, Err(anyhow::anyhow!("bad template"))).unwrap_err();
        assert_eq!(err.to_string(), "bad template");
    }

    #[test]
    fn test_flush_keeps_exit_code() {
        let mut out = Vec::new();
        let code = flush_after(&mut out, Ok(ExitCode::from(2))).unwrap();
        assert_eq!(code, ExitCode::from(2));
    }
}
