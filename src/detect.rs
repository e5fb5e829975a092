use crate::error::TetherError;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where the install tree lives and whether anything is there yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallTree {
    pub exists: bool,
    pub path: PathBuf,
}

/// Resolves `dir` to an absolute path and checks whether an entry exists
/// there. Any kind of entry counts; a plain file in place of the tree is
/// reported as existing and fails later when the tree is opened.
///
/// Resolution does not require the path to exist, since a missing tree is
/// the target of a fresh install.
pub fn detect(dir: &Path) -> Result<InstallTree, TetherError> {
    let path = std::path::absolute(dir).map_err(|source| TetherError::PathResolution {
        path: dir.to_path_buf(),
        source,
    })?;
    let exists = match fs::metadata(&path) {
        Ok(_) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "install path stat failed; treating as present");
            true
        }
    };
    Ok(InstallTree { exists, path })
}
