use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TetherError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http error: {url} returned {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
    #[error("cannot resolve install path {}: {source}", path.display())]
    PathResolution { path: PathBuf, source: io::Error },
    #[error("{} already exists; refusing to create an install over it", .0.display())]
    TargetExists(PathBuf),
    #[error("cannot open install tree at {}: {source}", path.display())]
    OpenTree { path: PathBuf, source: git2::Error },
    #[error("install tree at {} is not on a branch; delete it and create a fresh install", .0.display())]
    DetachedHead(PathBuf),
    #[error("install tree at {} has no 'origin' remote to sync from", .0.display())]
    MissingRemote(PathBuf),
    #[error("process error: {0}")]
    Process(String),
}
