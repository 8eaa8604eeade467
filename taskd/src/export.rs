//! Record persistence: JSON Lines export with periodic partial snapshots.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use threestep::records::TrialRecord;
use threestep::session::{RecordSink, SessionData};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not open export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Appends one JSON object per completed trial, and writes a full snapshot
/// of the session on each partial-export trigger.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&mut self, record: &TrialRecord) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn write_partial(&mut self, session: &SessionData) -> Result<(), ExportError> {
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("threestep");
        let partial_path = self
            .path
            .with_file_name(format!("{stem}_partial_{}.json", session.trial_count()));

        let file = File::create(&partial_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), session.records())?;
        info!("Partial export written to {}", partial_path.display());
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ExportError> {
        Ok(self.writer.flush()?)
    }
}

impl RecordSink for JsonlSink {
    fn push(&mut self, record: &TrialRecord) {
        if let Err(err) = self.write_record(record) {
            warn!("record export failed: {err}");
        }
    }

    fn partial_export(&mut self, session: &SessionData) {
        if let Err(err) = self.write_partial(session) {
            warn!("partial export failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threestep::stage::Stage;
    use threestep::state::MappingGraph;
    use threestep::trial::TrialParameters;

    fn record(trial: u32) -> TrialRecord {
        TrialRecord::new(
            trial,
            &TrialParameters {
                stage: Stage::MainThree,
                mappings: MappingGraph::new(),
                first_transition: 0,
                second_transition: 1,
                reward_position: 2,
                highly_rewarding_state: 2,
            },
        )
    }

    #[test]
    fn writes_one_json_object_per_record() {
        let dir = std::env::temp_dir().join("taskd-export-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("records.jsonl");

        let mut sink = JsonlSink::create(&path).unwrap();
        sink.push(&record(1));
        sink.push(&record(2));
        sink.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["trial"], 1);
        assert_eq!(parsed["secondTransition"], 1);
    }

    #[test]
    fn partial_export_snapshots_the_whole_session() {
        let dir = std::env::temp_dir().join("taskd-partial-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("records.jsonl");

        let mut session = SessionData::new();
        session.push(record(1));
        session.push(record(2));

        let mut sink = JsonlSink::create(&path).unwrap();
        sink.partial_export(&session);

        let partial = dir.join("records_partial_2.json");
        let contents = std::fs::read_to_string(&partial).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }
}
