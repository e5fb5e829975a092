use crate::config::ensure_parent;
use crate::error::TetherError;
use crate::executor::OperationOutcome;
use crate::phase::{Operation, Phase};
use chrono::Utc;
use std::fs;
use std::path::Path;

/// Terminal state of a session after its operation ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub phase: Phase,
    pub error: Option<String>,
}

/// Persists the transcript, then turns the outcome into the terminal phase.
/// Create and sync both end here.
pub fn report(log_path: &Path, operation: Operation, outcome: &OperationOutcome) -> Verdict {
    // The log only helps diagnose; failing to write it must not change what
    // the user is told about the operation itself.
    if let Err(err) = write_transcript(log_path, operation, &outcome.transcript) {
        tracing::debug!(path = %log_path.display(), error = %err, "transcript not written");
    }
    match &outcome.error {
        Some(err) => Verdict {
            phase: Phase::Error,
            error: Some(err.to_string()),
        },
        None => Verdict {
            phase: Phase::Complete,
            error: None,
        },
    }
}

/// Overwrites `path` with the transcript of the latest operation.
pub fn write_transcript(
    path: &Path,
    operation: Operation,
    transcript: &str,
) -> Result<(), TetherError> {
    ensure_parent(path)?;
    let mut content = format!(
        "# tether {} transcript, {}\n",
        operation.as_str(),
        Utc::now().to_rfc3339()
    );
    content.push_str(transcript);
    fs::write(path, content)?;
    Ok(())
}
