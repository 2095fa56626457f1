//! Command-line definitions for namesync

use clap::{ArgAction, Parser};
use crm::source::RecordSource;
use std::path::PathBuf;

pub const EXAMPLES: &str = "\
Examples:
  namesync --url \"https://sheet.zoho.com/sheet/published/...\" --all
  namesync --csv vendors.csv --email vendor@example.com
  namesync --email vendor@example.com --name \"Acme Supplies Ltd\"";

/// Update Zoho CRM contact names from a spreadsheet or CSV file
#[derive(Parser, Debug)]
#[command(name = "namesync")]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
pub struct Cli {
    /// Local CSV file with the desired names
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Spreadsheet URL (Zoho Sheet or Google Sheets sharing links work)
    #[arg(long, value_name = "URL", env = "NAMESYNC_SHEET_URL")]
    pub url: Option<String>,

    /// Credential file (defaults to ~/.zoho_env)
    #[arg(long, value_name = "PATH", env = "NAMESYNC_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Directory receiving the JSON audit and annotated CSV
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Pause between records in a batch, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub delay_ms: u64,

    /// Save progress after every N records (0 disables)
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub checkpoint_every: usize,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Process a single contact
    #[arg(long, value_name = "EMAIL", conflicts_with = "all")]
    pub email: Option<String>,

    /// Name to use for --email instead of the spreadsheet's
    #[arg(long, value_name = "NAME", requires = "email")]
    pub name: Option<String>,

    /// Process every contact in the source
    #[arg(long)]
    pub all: bool,

    /// Skip the confirmation prompt for --all
    #[arg(short = 'y', long, requires = "all")]
    pub yes: bool,
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    One { email: String, name: Option<String> },
    All { confirmed: bool },
}

impl Cli {
    /// Requested action, or None when neither --email nor --all was given
    pub fn action(&self) -> Option<Action> {
        if let Some(email) = &self.email {
            return Some(Action::One {
                email: email.clone(),
                name: self.name.clone(),
            });
        }
        self.all.then_some(Action::All { confirmed: self.yes })
    }

    /// Data source: --csv, then --url, then ./vendors.csv
    pub fn source(&self) -> RecordSource {
        if let Some(path) = &self.csv {
            RecordSource::File(path.clone())
        } else if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            RecordSource::parse(url)
        } else {
            RecordSource::default()
        }
    }
}
