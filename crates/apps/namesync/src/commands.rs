//! Command implementations for the namesync CLI
//!
//! Loads credentials and the record source, runs the sync engine and
//! prints progress and the final summary.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use crm::config::{CREDENTIALS_FILE, CredentialError, CredentialStore, DEFAULT_API_DOMAIN};
use crm::http::UreqTransport;
use crm::models::{DesiredRecords, OutcomeRecord, OutcomeStatus, RunLog};
use crm::report::{FileSink, ResultSink};
use crm::source::{FETCH_TIMEOUT, RecordSource, SheetFetcher, SourceError};
use crm::sync::{BatchEnd, SyncEngine, SyncError, SyncOptions};
use crm::zoho::{CONTACTS_MODULE, CrmClient, TokenManager};
use log::warn;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cli::{Action, Cli, EXAMPLES};

/// Exit code after Ctrl-C (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

/// Upper bound for one CRM call
const API_TIMEOUT: Duration = Duration::from_secs(60);

const RULE_WIDTH: usize = 70;

/// Entry point: run the requested action and map the result to an exit code
pub fn run(cli: &Cli) -> ExitCode {
    let Some(action) = cli.action() else {
        eprintln!("{} No action specified. Use --help for usage information.", "✗".red());
        println!("\n{}", EXAMPLES);
        return ExitCode::FAILURE;
    };

    print_banner(cli);

    match execute(cli, action) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n{} {:#}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli, action: Action) -> Result<ExitCode> {
    let credentials_path = match &cli.credentials {
        Some(path) => path.clone(),
        None => CredentialStore::default_path().context("Cannot determine home directory")?,
    };

    println!("Loading credentials from: {}", credentials_path.display());
    let store = match CredentialStore::open(&credentials_path) {
        Ok(store) => store,
        Err(e) => {
            print_credentials_help(&credentials_path, &e);
            return Ok(ExitCode::FAILURE);
        }
    };
    let credentials = match store.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            print_credentials_help(&credentials_path, &e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Action::All { confirmed: false } = action
        && !confirm_all(&cli.source())?
    {
        println!("{} Operation cancelled", "✗".red());
        return Ok(ExitCode::FAILURE);
    }

    let transport = Arc::new(UreqTransport::new(Some(API_TIMEOUT)));
    let tokens = TokenManager::new(&credentials, store, transport);

    let source = cli.source();
    let fetcher = SheetFetcher::new(Arc::new(UreqTransport::new(Some(FETCH_TIMEOUT))))
        .with_bearer(tokens.cached_token());
    let records = match source.load(&fetcher) {
        Ok(records) => records,
        Err(e) => {
            print_source_help(&source, &e);
            return Ok(ExitCode::FAILURE);
        }
    };
    println!(
        "  {} Loaded {} records from {}",
        "✓".green(),
        records.len().to_string().bold(),
        source
    );
    println!("  Module: {}\n", CONTACTS_MODULE);

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        warn!("Cannot install Ctrl-C handler: {}", e);
    }

    let options = SyncOptions {
        record_delay: Duration::from_millis(cli.delay_ms),
        checkpoint_every: cli.checkpoint_every,
        cancel: Some(cancel),
    };
    let mut engine = SyncEngine::new(CrmClient::new(tokens), options);

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Cannot create {}", cli.output_dir.display()))?;
    let mut sink = FileSink::new(&cli.output_dir, records.clone(), Local::now());

    let code = match action {
        Action::One { email, name } => process_one(&mut engine, &email, name.as_deref(), &records),
        Action::All { .. } => process_all(&mut engine, &records, &mut sink),
    };

    if !engine.log().is_empty() {
        print_summary(engine.log());
        match sink.finish(engine.log()) {
            Ok(()) => {
                println!("  JSON audit:    {}", sink.json_path().display());
                println!("  Annotated CSV: {}", sink.csv_path().display());
            }
            Err(e) => eprintln!("{} Failed to save results: {:#}", "✗".red(), e),
        }
        println!("{}", "=".repeat(RULE_WIDTH));
    }

    Ok(code)
}

fn process_one(
    engine: &mut SyncEngine,
    email: &str,
    name: Option<&str>,
    records: &DesiredRecords,
) -> ExitCode {
    println!("Processing email: {}", email.bold());
    match (name, records.get(email)) {
        (Some(name), _) => println!("  Custom name: {}", name),
        (None, Some(record)) => {
            println!("  Vendor name: {}", record.display_name);
            if !record.nickname.is_empty() {
                println!("  Vendor nickname: {}", record.nickname);
            }
        }
        (None, None) => {}
    }
    println!("{}", "-".repeat(50));

    match engine.process_one(email, name, records) {
        Ok(outcome) => {
            print_outcome(&outcome);
            if outcome.status == OutcomeStatus::Error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(SyncError::UnknownRecord(key)) => {
            eprintln!("{} Email {} not found in the vendor data", "✗".red(), key);
            eprintln!("  Pass --name to process it anyway");
            ExitCode::FAILURE
        }
        Err(e @ SyncError::Auth(_)) => {
            if let Some(outcome) = engine.log().outcomes().last() {
                print_outcome(outcome);
            }
            print_auth_help(&e);
            ExitCode::FAILURE
        }
    }
}

fn process_all(
    engine: &mut SyncEngine,
    records: &DesiredRecords,
    sink: &mut dyn ResultSink,
) -> ExitCode {
    println!("Processing {} vendor(s)...\n", records.len());

    let result = engine.process_all(records, sink, |done, total, outcome| {
        print!("[{}/{}] {} ", done, total, outcome.natural_key);
        print_outcome(outcome);
    });

    match result {
        Ok(BatchEnd::Completed) => ExitCode::SUCCESS,
        Ok(BatchEnd::Interrupted { processed }) => {
            println!(
                "\n{} Interrupted after {} of {} records; saving progress",
                "!".yellow().bold(),
                processed,
                records.len()
            );
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            print_auth_help(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_banner(cli: &Cli) {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{}", "ZOHO CRM NAME SYNC".cyan().bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    match cli.source() {
        RecordSource::Url(url) => println!("Data source: spreadsheet URL ({})", shorten(&url, 60)),
        RecordSource::File(path) => println!("Data source: local file ({})", path.display()),
    }
    if let Ok(dir) = std::env::current_dir() {
        println!("Working directory: {}", dir.display());
    }
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn print_outcome(outcome: &OutcomeRecord) {
    let prior = outcome.prior_name.as_deref().unwrap_or_default();
    match outcome.status {
        OutcomeStatus::Updated => println!(
            "{} updated '{}' -> '{}'",
            "✓".green(),
            prior,
            outcome.desired_name
        ),
        OutcomeStatus::AlreadyCorrect => {
            println!("{} already correct: {}", "=".cyan(), outcome.desired_name)
        }
        OutcomeStatus::NotFound => println!("{} no contact with this email", "-".yellow()),
        OutcomeStatus::Error => println!(
            "{} {}",
            "✗".red(),
            outcome.error.as_deref().unwrap_or("failed")
        ),
    }
}

fn print_summary(log: &RunLog) {
    let summary = log.summary();
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{}", "PROCESSING SUMMARY".cyan().bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Total vendors:    {}", summary.total);
    println!("Processed:        {}", summary.processed);
    println!("Contacts found:   {}", summary.found);
    println!("Names updated:    {}", summary.updated.to_string().green());
    println!("Already correct:  {}", summary.already_correct);
    println!("Not found:        {}", summary.not_found);
    println!("Errors:           {}", summary.error_count.to_string().red());

    if !summary.errors.is_empty() {
        println!("\n{}", "ERRORS:".red().bold());
        for error in &summary.errors {
            println!("  - {}", error);
        }
    }
    println!();
}

fn print_credentials_help(path: &Path, error: &CredentialError) {
    eprintln!("{} {}", "✗".red(), error);
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{}", "SETUP REQUIRED".yellow().bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Create the Zoho API credential file:");
    println!("  Location: {}", path.display());
    println!("  (default: ~/{}, or set --credentials)", CREDENTIALS_FILE);
    println!("\nRequired contents:");
    println!("  ZOHO_CLIENT_ID=your_client_id");
    println!("  ZOHO_CLIENT_SECRET=your_client_secret");
    println!("  ZOHO_REFRESH_TOKEN=your_refresh_token");
    println!("  ZOHO_API_DOMAIN={}", DEFAULT_API_DOMAIN);
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn print_source_help(source: &RecordSource, error: &SourceError) {
    eprintln!("{} Failed to load records: {}", "✗".red(), error);
    println!("\nCommon solutions:");
    match source {
        RecordSource::Url(_) => {
            println!("  - Check that the spreadsheet URL is correct and accessible");
            println!("  - Make sure the sheet is published or shared as CSV");
            println!("  - Make sure you have internet access");
        }
        RecordSource::File(_) => {
            println!("  - Check that the CSV file exists");
            println!("  - Or use --url to fetch the spreadsheet directly");
        }
    }
    if let SourceError::Schema { .. } = error {
        println!("  - The header needs 'Contact email' and 'Name' columns");
    }
}

fn print_auth_help(error: &SyncError) {
    eprintln!("\n{} Stopping: {}", "✗".red(), error);
    println!("\nCommon solutions:");
    println!("  - Verify the credential file has the correct API credentials");
    println!("  - Generate a new refresh token if the old one was revoked");
    println!("  - Check that ZOHO_API_DOMAIN matches your Zoho data center");
}

/// Ask before touching every contact
fn confirm_all(source: &RecordSource) -> Result<bool> {
    println!(
        "{} This will update contact names in Zoho CRM for every record in {}",
        "!".yellow().bold(),
        source
    );
    print!("Type YES to continue: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}
