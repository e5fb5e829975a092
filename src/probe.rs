use crate::error::TetherError;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// The two version identifiers the phase decision needs. Both are opaque
/// tokens: they are displayed and never parsed or ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Versions {
    pub local: Option<String>,
    /// Empty when the remote resource could not be fetched.
    pub remote: String,
}

/// Reads both versions, logging and substituting an empty value for either
/// one that cannot be obtained. Neither failure stops the session.
pub fn probe(marker: &Path, version_url: &str) -> Versions {
    // An unreadable marker is indistinguishable from a missing one here, so a
    // broken install is offered a sync rather than blocked.
    let local = read_local_version(marker).unwrap_or_else(|err| {
        tracing::warn!(path = %marker.display(), error = %err, "cannot read version file");
        None
    });
    let remote = fetch_remote_version(version_url).unwrap_or_else(|err| {
        tracing::warn!(url = version_url, error = %err, "unable to fetch current online version");
        String::new()
    });
    Versions { local, remote }
}

/// Returns the trimmed first line of the version marker, `Ok(None)` when the
/// marker does not exist or its first line is blank.
pub fn read_local_version(marker: &Path) -> Result<Option<String>, TetherError> {
    let content = match fs::read(marker) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let version = first_line(&content);
    if version.is_empty() {
        return Ok(None);
    }
    Ok(Some(version))
}

/// Fetches the remote version resource once and returns its trimmed first
/// line. No retries and no timeout.
pub fn fetch_remote_version(url: &str) -> Result<String, TetherError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(None::<Duration>)
        .user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(TetherError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text()?;
    Ok(first_line(&body))
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}
