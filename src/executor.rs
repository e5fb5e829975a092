use crate::error::TetherError;
use crate::phase::Operation;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Direction, FetchOptions, Oid, Progress, RemoteCallbacks, Repository, ResetType};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

/// What one create or sync produced: the captured transcript and, if the
/// operation failed, why. A failed operation is not rolled back.
#[derive(Debug)]
pub struct OperationOutcome {
    pub transcript: String,
    pub error: Option<TetherError>,
}

pub trait Operator {
    /// Acquires the full remote tree into `target`, which must not exist.
    fn create(&self, target: &Path, repository: &str) -> OperationOutcome;
    /// Makes the existing tree at `target` identical to its remote head,
    /// discarding local modifications. When the remote HEAD has moved to
    /// another branch, the tree switches to that branch.
    fn sync(&self, target: &Path) -> OperationOutcome;
}

pub fn execute(
    operator: &dyn Operator,
    operation: Operation,
    target: &Path,
    repository: &str,
) -> OperationOutcome {
    tracing::info!(operation = operation.as_str(), target = %target.display(), "starting operation");
    let outcome = match operation {
        Operation::Create => operator.create(target, repository),
        Operation::Sync => operator.sync(target),
    };
    match &outcome.error {
        None => tracing::info!(operation = operation.as_str(), "operation complete"),
        Some(err) => tracing::info!(operation = operation.as_str(), error = %err, "operation failed"),
    }
    outcome
}

pub struct GitOperator;

impl Operator for GitOperator {
    fn create(&self, target: &Path, repository: &str) -> OperationOutcome {
        let transcript = Transcript::default();
        let result = clone_tree(target, repository, &transcript);
        transcript.into_outcome(result)
    }

    fn sync(&self, target: &Path) -> OperationOutcome {
        let transcript = Transcript::default();
        let result = sync_tree(target, &transcript);
        transcript.into_outcome(result)
    }
}

/// Accumulates step lines and remote progress text while git callbacks hold
/// shared borrows of it.
#[derive(Default)]
struct Transcript {
    text: RefCell<String>,
    transfer: Cell<Option<(usize, usize, usize)>>,
}

impl Transcript {
    fn line(&self, line: impl AsRef<str>) {
        let mut text = self.text.borrow_mut();
        text.push_str(line.as_ref());
        text.push('\n');
    }

    fn remote_output(&self, data: &[u8]) {
        self.text
            .borrow_mut()
            .push_str(&String::from_utf8_lossy(data));
    }

    fn record_transfer(&self, stats: &Progress<'_>) {
        self.transfer.set(Some((
            stats.received_objects(),
            stats.total_objects(),
            stats.received_bytes(),
        )));
    }

    fn finish_transfer(&self) {
        if let Some((received, total, bytes)) = self.transfer.take() {
            self.line(format!("Received {received}/{total} objects ({bytes} bytes)"));
        }
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.sideband_progress(move |data| {
            self.remote_output(data);
            true
        });
        callbacks.transfer_progress(move |stats| {
            self.record_transfer(&stats);
            true
        });
        callbacks
    }

    fn into_outcome(self, result: Result<(), TetherError>) -> OperationOutcome {
        // Keep whatever transfer happened before a failure.
        self.finish_transfer();
        if let Err(err) = &result {
            self.line(format!("Failed: {err}"));
        }
        OperationOutcome {
            transcript: self.text.into_inner(),
            error: result.err(),
        }
    }
}

fn short_id(oid: Oid) -> String {
    let text = oid.to_string();
    text[..8.min(text.len())].to_string()
}

fn clone_tree(target: &Path, repository: &str, transcript: &Transcript) -> Result<(), TetherError> {
    if fs::symlink_metadata(target).is_ok() {
        return Err(TetherError::TargetExists(target.to_path_buf()));
    }
    transcript.line(format!("Cloning {repository} into {}", target.display()));

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(transcript.callbacks());
    let repo = RepoBuilder::new()
        .fetch_options(fetch)
        .clone(repository, target)?;
    transcript.finish_transfer();

    let head = repo.head()?;
    let commit = head.peel_to_commit()?;
    transcript.line(format!(
        "Checked out {} at {}",
        head.shorthand().unwrap_or("HEAD"),
        short_id(commit.id())
    ));
    Ok(())
}

fn sync_tree(target: &Path, transcript: &Transcript) -> Result<(), TetherError> {
    transcript.line(format!("Opening {}", target.display()));
    let repo = Repository::open(target).map_err(|source| TetherError::OpenTree {
        path: target.to_path_buf(),
        source,
    })?;

    let head = repo.head()?;
    if !head.is_branch() {
        return Err(TetherError::DetachedHead(target.to_path_buf()));
    }
    let branch = head
        .shorthand()
        .ok_or_else(|| TetherError::DetachedHead(target.to_path_buf()))?
        .to_string();
    let current = head.peel_to_commit()?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.reset(current.as_object(), ResetType::Hard, Some(&mut checkout))?;
    transcript.line(format!("Reset {branch} to {}", short_id(current.id())));

    let mut remote = repo
        .find_remote("origin")
        .map_err(|_| TetherError::MissingRemote(target.to_path_buf()))?;
    transcript.line(format!("Fetching from {}", remote.url().unwrap_or("origin")));

    // Follow whatever branch the remote HEAD names now, which may not be the
    // one the tree was cloned from.
    let remote_head = {
        let connection =
            remote.connect_auth(Direction::Fetch, Some(transcript.callbacks()), None)?;
        let head = connection.default_branch()?;
        head.as_str()
            .map(str::to_string)
            .ok_or_else(|| TetherError::Process("remote HEAD is not valid UTF-8".to_string()))?
    };
    let remote_branch = remote_head
        .strip_prefix("refs/heads/")
        .unwrap_or(&remote_head)
        .to_string();
    let tracking = format!("refs/remotes/origin/{remote_branch}");
    transcript.line(format!("Remote head is {remote_branch}"));

    let refspec = format!("+{remote_head}:{tracking}");
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(transcript.callbacks());
    remote.fetch(&[refspec.as_str()], Some(&mut fetch), None)?;
    transcript.finish_transfer();

    let fetched = repo.find_reference(&tracking)?.peel_to_commit()?;
    if remote_branch != branch {
        let mut local = repo.branch(&remote_branch, &fetched, true)?;
        local.set_upstream(Some(&format!("origin/{remote_branch}")))?;
        repo.set_head(&format!("refs/heads/{remote_branch}"))?;
        transcript.line(format!("Switched from {branch} to {remote_branch}"));
    }
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.reset(fetched.as_object(), ResetType::Hard, Some(&mut checkout))?;

    if fetched.id() == current.id() {
        transcript.line(format!("{remote_branch} already at {}", short_id(fetched.id())));
    } else {
        transcript.line(format!(
            "Updated {remote_branch} {}..{}",
            short_id(current.id()),
            short_id(fetched.id())
        ));
    }
    Ok(())
}
