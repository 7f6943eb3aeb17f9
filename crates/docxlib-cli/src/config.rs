use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docxlib_core::MissingVarAction;

/// Command-line arguments for the docxlib tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "docxlib")]
#[command(about = "Inspect, fill and convert Word (.docx) templates")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print the version and exit
    #[arg(short = 'V', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the library version
    Version,

    /// Show defaults, supported image formats and fill modes
    Info,

    /// Check whether a file is a valid DOCX package
    Validate {
        /// DOCX file to validate
        file: PathBuf,
    },

    /// List sections, tables and table dimensions
    Inspect {
        /// DOCX file to inspect
        file: PathBuf,
    },

    /// List the template variables of a document
    ExtractVars {
        /// Template DOCX file
        file: PathBuf,

        /// Write the variables to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fill a template from a JSON data file
    Fill {
        /// Template DOCX file
        template: PathBuf,

        /// Data file (JSON object)
        data: PathBuf,

        /// Output DOCX path (default: <template>_filled.docx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What to do with variables that have no value
        #[arg(long, default_value = "error", value_parser = parse_missing)]
        missing: MissingVarAction,
    },

    /// Convert a document to another format
    Convert {
        /// Input DOCX file
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_parser = ["pdf"])]
        format: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// External renderer settings.
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// LibreOffice executable
    #[arg(long, default_value = "soffice", env = "DOCXLIB_SOFFICE")]
    pub soffice: PathBuf,

    /// poppler pdftoppm executable
    #[arg(long, default_value = "pdftoppm", env = "DOCXLIB_PDFTOPPM")]
    pub pdftoppm: PathBuf,

    /// Resolution of rendered page images
    #[arg(long, default_value = "150", env = "DOCXLIB_DPI")]
    pub dpi: u32,
}

impl RenderArgs {
    pub fn render_config(&self) -> docxlib_core::RenderConfig {
        docxlib_core::RenderConfig {
            soffice_path: self.soffice.clone(),
            pdftoppm_path: self.pdftoppm.clone(),
            dpi: self.dpi,
        }
    }
}

fn parse_missing(s: &str) -> Result<MissingVarAction, String> {
    s.parse().map_err(|e: docxlib_core::DocxError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fill_arguments() {
        let cli = Cli::try_parse_from([
            "docxlib", "fill", "t.docx", "d.json", "-o", "out.docx", "--missing", "ignore",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Fill {
                output, missing, ..
            }) => {
                assert_eq!(output, Some(PathBuf::from("out.docx")));
                assert_eq!(missing, MissingVarAction::Ignore);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_format_and_policy() {
        assert!(Cli::try_parse_from(["docxlib", "convert", "a.docx", "-f", "png"]).is_err());
        let args = ["docxlib", "fill", "t.docx", "d.json", "--missing", "skip"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_version_flag() {
        let cli = Cli::try_parse_from(["docxlib", "--version"]).unwrap();
        assert!(cli.version);
        assert!(cli.command.is_none());
    }
}
