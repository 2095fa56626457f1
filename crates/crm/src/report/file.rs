//! File-based result sink
//!
//! Writes two artifacts per run into an output directory:
//! - `name_update_results_<stamp>.json`: summary plus every outcome
//! - `vendors_with_status_<stamp>.csv`: the source rows annotated with status
//!
//! The stamp is fixed when the sink is created, so every checkpoint rewrites
//! the same two files. Writes go through a temporary file and a rename.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::ResultSink;
use crate::models::{DesiredRecords, OutcomeRecord, OutcomeStatus, RunLog, RunSummary};
use crate::source::{EMAIL_COLUMN, NAME_COLUMN, NICKNAME_COLUMN};

pub const JSON_PREFIX: &str = "name_update_results";
pub const CSV_PREFIX: &str = "vendors_with_status";

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UTF8_BOM: &str = "\u{feff}";

/// Status column value of the annotated CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Updated,
    NoChangeNeeded,
    NotFoundInCrm,
    Error,
    NotProcessed,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "UPDATED",
            Self::NoChangeNeeded => "NO_CHANGE_NEEDED",
            Self::NotFoundInCrm => "NOT_FOUND_IN_CRM",
            Self::Error => "ERROR",
            Self::NotProcessed => "NOT_PROCESSED",
        }
    }
}

impl From<OutcomeStatus> for RowStatus {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Updated => Self::Updated,
            OutcomeStatus::AlreadyCorrect => Self::NoChangeNeeded,
            OutcomeStatus::NotFound => Self::NotFoundInCrm,
            OutcomeStatus::Error => Self::Error,
        }
    }
}

#[derive(Serialize)]
struct AuditFile<'a> {
    generated_at: DateTime<Utc>,
    summary: RunSummary,
    outcomes: &'a [OutcomeRecord],
}

/// ResultSink writing the JSON audit and annotated CSV
pub struct FileSink {
    records: DesiredRecords,
    json_path: PathBuf,
    csv_path: PathBuf,
}

impl FileSink {
    /// Create a sink for `records`, naming the artifacts after `started_at`
    pub fn new(output_dir: &Path, records: DesiredRecords, started_at: DateTime<Local>) -> Self {
        let stamp = started_at.format(FILE_STAMP_FORMAT);
        Self {
            records,
            json_path: output_dir.join(format!("{}_{}.json", JSON_PREFIX, stamp)),
            csv_path: output_dir.join(format!("{}_{}.csv", CSV_PREFIX, stamp)),
        }
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    fn write_json(&self, log: &RunLog) -> Result<()> {
        let audit = AuditFile {
            generated_at: Utc::now(),
            summary: log.summary(),
            outcomes: log.outcomes(),
        };
        let json = serde_json::to_vec_pretty(&audit)?;
        config::write_atomic(&self.json_path, &json)
            .with_context(|| format!("Failed to write {}", self.json_path.display()))
    }

    fn write_csv(&self, log: &RunLog) -> Result<()> {
        let csv = self.render_csv(log)?;
        config::write_atomic(&self.csv_path, csv.as_bytes())
            .with_context(|| format!("Failed to write {}", self.csv_path.display()))
    }

    /// Render the annotated CSV, BOM included
    fn render_csv(&self, log: &RunLog) -> Result<String> {
        // A key processed twice reports its latest outcome
        let latest: HashMap<&str, &OutcomeRecord> = log
            .outcomes()
            .iter()
            .map(|o| (o.natural_key.as_str(), o))
            .collect();

        let mut writer = csv::Writer::from_writer(UTF8_BOM.as_bytes().to_vec());
        writer.write_record([
            EMAIL_COLUMN,
            NAME_COLUMN,
            NICKNAME_COLUMN,
            "Update_Status",
            "Previous_Name",
            "Update_Timestamp",
        ])?;

        for record in &self.records {
            let outcome = latest.get(record.natural_key.as_str()).copied();
            let (status, previous, timestamp) = annotate(outcome);
            writer.write_record([
                record.contact_email.as_str(),
                record.display_name.as_str(),
                record.nickname.as_str(),
                status.as_str(),
                previous.as_str(),
                timestamp.as_str(),
            ])?;
        }

        // Single-record runs may target an email that is not in the sheet
        for outcome in log.outcomes() {
            if self.records.get(&outcome.natural_key).is_some()
                || !std::ptr::eq(latest[outcome.natural_key.as_str()], outcome)
            {
                continue;
            }
            let (status, previous, timestamp) = annotate(Some(outcome));
            writer.write_record([
                outcome.natural_key.as_str(),
                outcome.desired_name.as_str(),
                "",
                status.as_str(),
                previous.as_str(),
                timestamp.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn annotate(outcome: Option<&OutcomeRecord>) -> (RowStatus, String, String) {
    match outcome {
        Some(outcome) => {
            let status = RowStatus::from(outcome.status);
            let previous = match status {
                RowStatus::Updated | RowStatus::Error => {
                    outcome.prior_name.clone().unwrap_or_default()
                }
                _ => String::new(),
            };
            let timestamp = outcome
                .processed_at
                .with_timezone(&Local)
                .format(ROW_TIMESTAMP_FORMAT)
                .to_string();
            (status, previous, timestamp)
        }
        None => (RowStatus::NotProcessed, String::new(), String::new()),
    }
}

impl ResultSink for FileSink {
    fn checkpoint(&mut self, log: &RunLog) -> Result<()> {
        self.write_csv(log)?;
        self.write_json(log)?;
        info!("Checkpoint saved after {} records", log.len());
        Ok(())
    }

    fn finish(&mut self, log: &RunLog) -> Result<()> {
        self.write_csv(log)?;
        self.write_json(log)?;
        info!(
            "Results written to {} and {}",
            self.json_path.display(),
            self.csv_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DesiredRecord, RemoteRecord};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn records() -> DesiredRecords {
        vec![
            DesiredRecord::new("a@b.com", "Ada Lovelace").nickname("Ada"),
            DesiredRecord::new("c@d.com", "Carol"),
            DesiredRecord::new("e@f.com", "Eve"),
            DesiredRecord::new("g@h.com", "Gus"),
            DesiredRecord::new("i@j.com", "Ivy"),
        ]
        .into_iter()
        .collect()
    }

    fn log(records: &DesiredRecords) -> RunLog {
        let mut log = RunLog::new(records.len());
        let rec = |key: &str| records.get(key).unwrap();
        log.push(OutcomeRecord::updated(rec("a@b.com"), &RemoteRecord::new("1", "Ada L")));
        log.push(OutcomeRecord::already_correct(rec("c@d.com"), &RemoteRecord::new("2", "Carol")));
        log.push(OutcomeRecord::not_found(rec("e@f.com")));
        log.push(OutcomeRecord::failed(
            rec("g@h.com"),
            Some(&RemoteRecord::new("4", "Gus Old")),
            "update failed for record 4",
        ));
        log
    }

    fn sink(dir: &Path, records: DesiredRecords) -> FileSink {
        let started = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        FileSink::new(dir, records, started)
    }

    #[test]
    fn test_artifact_names_share_one_stamp() {
        let dir = TempDir::new().unwrap();
        let sink = sink(dir.path(), records());

        let json = sink.json_path().file_name().unwrap().to_string_lossy().to_string();
        let csv = sink.csv_path().file_name().unwrap().to_string_lossy().to_string();
        let json_stamp = json.trim_start_matches("name_update_results_").trim_end_matches(".json");
        let csv_stamp = csv.trim_start_matches("vendors_with_status_").trim_end_matches(".csv");
        assert_eq!(json_stamp, csv_stamp);
        assert_eq!(json_stamp.len(), "20231114_221320".len());
    }

    #[test]
    fn test_annotated_csv() {
        let dir = TempDir::new().unwrap();
        let records = records();
        let log = log(&records);
        let mut sink = sink(dir.path(), records);
        sink.finish(&log).unwrap();

        let content = std::fs::read_to_string(sink.csv_path()).unwrap();
        assert!(content.starts_with(UTF8_BOM));

        let mut reader = csv::Reader::from_reader(content.trim_start_matches(UTF8_BOM).as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec![
                "Contact email",
                "Name",
                "Nickname",
                "Update_Status",
                "Previous_Name",
                "Update_Timestamp"
            ]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows[0][2], "Ada");
        assert_eq!(&rows[0][3], "UPDATED");
        assert_eq!(&rows[0][4], "Ada L");
        assert!(!rows[0][5].is_empty());
        assert_eq!(&rows[1][3], "NO_CHANGE_NEEDED");
        assert_eq!(&rows[1][4], "");
        assert_eq!(&rows[2][3], "NOT_FOUND_IN_CRM");
        assert_eq!(&rows[3][3], "ERROR");
        assert_eq!(&rows[3][4], "Gus Old");
        assert_eq!(&rows[4][3], "NOT_PROCESSED");
        assert_eq!(&rows[4][5], "");
    }

    #[test]
    fn test_json_audit() {
        let dir = TempDir::new().unwrap();
        let records = records();
        let log = log(&records);
        let mut sink = sink(dir.path(), records);
        sink.checkpoint(&log).unwrap();

        let content = std::fs::read_to_string(sink.json_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["summary"]["total"], 5);
        assert_eq!(value["summary"]["processed"], 4);
        assert_eq!(value["summary"]["found"], 3);
        assert_eq!(value["summary"]["errors"][0], "update failed for record 4");
        assert_eq!(value["outcomes"].as_array().unwrap().len(), 4);
        assert_eq!(value["outcomes"][0]["status"], "updated");
        assert_eq!(value["outcomes"][0]["prior_name"], "Ada L");
    }

    #[test]
    fn test_checkpoints_overwrite_same_files() {
        let dir = TempDir::new().unwrap();
        let records = records();
        let full = log(&records);
        let mut partial = RunLog::new(records.len());
        partial.push(full.outcomes()[0].clone());

        let mut sink = sink(dir.path(), records);
        sink.checkpoint(&partial).unwrap();
        sink.checkpoint(&full).unwrap();
        sink.finish(&full).unwrap();

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn test_outcome_outside_source_is_appended() {
        let dir = TempDir::new().unwrap();
        let records = records();
        let mut log = RunLog::new(1);
        let extra = DesiredRecord::with_override("new@x.com", "New Person");
        log.push(OutcomeRecord::updated(&extra, &RemoteRecord::new("9", "Old")));

        let mut sink = sink(dir.path(), records);
        sink.finish(&log).unwrap();

        let content = std::fs::read_to_string(sink.csv_path()).unwrap();
        let last = content.lines().last().unwrap();
        assert!(last.starts_with("new@x.com,New Person,,UPDATED,Old,"));
    }
}
