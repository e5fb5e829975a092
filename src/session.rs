use crate::error::TetherError;
use crate::executor::{execute, Operator};
use crate::phase::{select, Operation, Phase, Selection, Snapshot};
use crate::report::report;
use crate::shell::{Page, Shell};
use serde::Serialize;
use std::path::PathBuf;

const INTRO_BUTTONS: &[&str] = &["Begin", "Quit"];
const CREATE_BUTTONS: &[&str] = &["Create", "Quit"];
const SYNC_BUTTONS: &[&str] = &["Sync", "Quit"];
const COMPLETE_BUTTONS: &[&str] = &["Quit"];
const ERROR_BUTTONS: &[&str] = &["OK"];

/// Fixed locations a session works against.
#[derive(Debug, Clone)]
pub struct Targets {
    pub repository: String,
    pub transcript_file: PathBuf,
    pub version_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Confirm,
    Quit,
}

impl Choice {
    /// Maps a button index on `phase`'s page to a choice. Terminal pages only
    /// offer acknowledgement, which ends the session.
    pub fn from_button(phase: Phase, index: usize) -> Self {
        if phase.is_terminal() || index != 0 {
            Self::Quit
        } else {
            Self::Confirm
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(Phase),
    End,
}

/// What a finished session reports to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub phase: Phase,
    pub selected_phase: Phase,
    pub operation: Option<Operation>,
    pub install_path: PathBuf,
    pub tree_existed: bool,
    pub local_version: Option<String>,
    pub remote_version: String,
    pub transcript_file: Option<PathBuf>,
    pub error: Option<String>,
}

/// One run of the install/update flow. The session owns the current phase;
/// every transition goes through [`Session::advance`].
pub struct Session<'a> {
    snapshot: Snapshot,
    selection: Selection,
    targets: Targets,
    operator: &'a dyn Operator,
    phase: Phase,
    performed: Option<Operation>,
    error: Option<String>,
}

impl<'a> Session<'a> {
    pub fn new(snapshot: Snapshot, targets: Targets, operator: &'a dyn Operator) -> Self {
        let selection = select(&snapshot);
        tracing::debug!(
            phase = selection.phase.as_str(),
            operation = selection.operation.as_str(),
            "selected phase"
        );
        Self {
            snapshot,
            selection,
            targets,
            operator,
            phase: Phase::Intro,
            performed: None,
            error: None,
        }
    }

    pub fn advance(&mut self, choice: Choice) -> Transition {
        if choice == Choice::Quit || self.phase.is_terminal() {
            return Transition::End;
        }
        let current = self.phase;
        let next = match current {
            Phase::Intro => self.selection.phase,
            phase if phase == self.selection.phase => self.perform(),
            _ => return Transition::End,
        };
        self.phase = next;
        Transition::Next(next)
    }

    /// Runs the selected operation. Only reachable once per session because
    /// the result always moves the session to a terminal phase.
    fn perform(&mut self) -> Phase {
        let operation = self.selection.operation;
        let outcome = execute(
            self.operator,
            operation,
            &self.snapshot.tree.path,
            &self.targets.repository,
        );
        self.performed = Some(operation);
        let verdict = report(&self.targets.transcript_file, operation, &outcome);
        self.error = verdict.error;
        verdict.phase
    }

    pub fn run(&mut self, shell: &mut dyn Shell) -> Result<(), TetherError> {
        loop {
            let page = self.page();
            let index = shell.present(&page)?;
            match self.advance(Choice::from_button(page.phase, index)) {
                Transition::Next(phase) => tracing::debug!(phase = phase.as_str(), "entered phase"),
                Transition::End => return Ok(()),
            }
        }
    }

    pub fn page(&self) -> Page {
        let path = self.snapshot.tree.path.display();
        let remote = display_version(&self.snapshot.versions.remote);
        let (title, body, buttons) = match self.phase {
            Phase::Intro => (
                "Installer & Updater",
                format!(
                    "This tool will create or sync a local install.\n\nInstall location:\n{path}"
                ),
                INTRO_BUTTONS,
            ),
            Phase::CreatePrompt => (
                "Create install",
                format!(
                    "Version {remote} is available online.\nNo local install was found. It will be placed in:\n{path}"
                ),
                CREATE_BUTTONS,
            ),
            Phase::SyncPromptNoVersion => (
                "Sync install",
                format!(
                    "Cannot find the {} file in the local install at:\n{path}\nSync may fail - delete the install and retry if so.",
                    self.targets.version_file
                ),
                SYNC_BUTTONS,
            ),
            Phase::SyncPromptWithVersions => (
                "Sync install",
                format!(
                    "Current version : {}\nOnline version  : {remote}\n\nChoose Sync to continue, it may take a moment to update.",
                    display_version(self.snapshot.versions.local.as_deref().unwrap_or_default())
                ),
                SYNC_BUTTONS,
            ),
            Phase::Complete => ("Complete", "All done. Have fun!".to_string(), COMPLETE_BUTTONS),
            Phase::Error => (
                "Error",
                format!(
                    "There was a problem:\n\n{}\n\nThe transcript was written to {}",
                    self.error.as_deref().unwrap_or("unknown error"),
                    self.targets.transcript_file.display()
                ),
                ERROR_BUTTONS,
            ),
        };
        Page {
            phase: self.phase,
            title: title.to_string(),
            body,
            buttons,
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            phase: self.phase,
            selected_phase: self.selection.phase,
            operation: self.performed,
            install_path: self.snapshot.tree.path.clone(),
            tree_existed: self.snapshot.tree.exists,
            local_version: self.snapshot.versions.local.clone(),
            remote_version: self.snapshot.versions.remote.clone(),
            transcript_file: self
                .performed
                .map(|_| self.targets.transcript_file.clone()),
            error: self.error.clone(),
        }
    }
}

fn display_version(version: &str) -> &str {
    if version.is_empty() {
        "unknown"
    } else {
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::InstallTree;
    use crate::executor::OperationOutcome;
    use crate::probe::Versions;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MockOperator {
        calls: RefCell<Vec<(Operation, PathBuf)>>,
        fail_with: Option<String>,
    }

    impl MockOperator {
        fn failing(message: &str) -> Self {
            Self {
                calls: RefCell::default(),
                fail_with: Some(message.to_string()),
            }
        }

        fn calls(&self) -> Vec<(Operation, PathBuf)> {
            self.calls.borrow().clone()
        }

        fn outcome(&self) -> OperationOutcome {
            OperationOutcome {
                transcript: "progress so far\n".to_string(),
                error: self
                    .fail_with
                    .as_ref()
                    .map(|message| TetherError::Process(message.clone())),
            }
        }
    }

    impl Operator for MockOperator {
        fn create(&self, target: &Path, _repository: &str) -> OperationOutcome {
            self.calls
                .borrow_mut()
                .push((Operation::Create, target.to_path_buf()));
            self.outcome()
        }

        fn sync(&self, target: &Path) -> OperationOutcome {
            self.calls
                .borrow_mut()
                .push((Operation::Sync, target.to_path_buf()));
            self.outcome()
        }
    }

    struct ScriptedShell {
        choices: VecDeque<usize>,
        pages: Vec<Page>,
    }

    impl ScriptedShell {
        fn new(choices: &[usize]) -> Self {
            Self {
                choices: choices.iter().copied().collect(),
                pages: Vec::new(),
            }
        }

        fn phases(&self) -> Vec<Phase> {
            self.pages.iter().map(|page| page.phase).collect()
        }
    }

    impl Shell for ScriptedShell {
        fn present(&mut self, page: &Page) -> Result<usize, TetherError> {
            self.pages.push(page.clone());
            Ok(self.choices.pop_front().unwrap_or(0))
        }
    }

    fn snapshot(exists: bool, local: Option<&str>, remote: &str) -> Snapshot {
        Snapshot {
            tree: InstallTree {
                exists,
                path: PathBuf::from("/opt/dist/tree"),
            },
            versions: Versions {
                local: local.map(str::to_string),
                remote: remote.to_string(),
            },
        }
    }

    fn targets(dir: &Path) -> Targets {
        Targets {
            repository: "https://example.invalid/dist.git".to_string(),
            transcript_file: dir.join("install.log.txt"),
            version_file: "VERSION".to_string(),
        }
    }

    #[test]
    fn quitting_at_intro_runs_nothing() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::default();
        let mut session = Session::new(snapshot(false, None, "2.0.0"), targets(dir.path()), &operator);
        let mut shell = ScriptedShell::new(&[1]);

        session.run(&mut shell).unwrap();

        assert_eq!(shell.phases(), vec![Phase::Intro]);
        assert!(operator.calls().is_empty());
        assert!(!dir.path().join("install.log.txt").exists());
        assert_eq!(session.summary().operation, None);
    }

    #[test]
    fn fresh_target_creates_and_completes() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::default();
        let mut session = Session::new(snapshot(false, None, "2.0.0"), targets(dir.path()), &operator);
        let mut shell = ScriptedShell::new(&[0, 0, 0]);

        session.run(&mut shell).unwrap();

        assert_eq!(
            shell.phases(),
            vec![Phase::Intro, Phase::CreatePrompt, Phase::Complete]
        );
        let prompt = &shell.pages[1];
        assert_eq!(prompt.buttons, &["Create", "Quit"]);
        assert!(prompt.body.contains("2.0.0"));
        assert!(prompt.body.contains("/opt/dist/tree"));
        assert_eq!(
            operator.calls(),
            vec![(Operation::Create, PathBuf::from("/opt/dist/tree"))]
        );
        let log = fs::read_to_string(dir.path().join("install.log.txt")).unwrap();
        assert!(log.contains("progress so far"));
        let summary = session.summary();
        assert_eq!(summary.phase, Phase::Complete);
        assert_eq!(summary.operation, Some(Operation::Create));
    }

    #[test]
    fn failed_sync_shows_error_and_ends() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::failing("could not connect to origin");
        let mut session = Session::new(snapshot(true, None, "2.0.0"), targets(dir.path()), &operator);
        let mut shell = ScriptedShell::new(&[0, 0, 0]);

        session.run(&mut shell).unwrap();

        assert_eq!(
            shell.phases(),
            vec![Phase::Intro, Phase::SyncPromptNoVersion, Phase::Error]
        );
        assert!(shell.pages[1].body.contains("VERSION"));
        let error_page = &shell.pages[2];
        assert_eq!(error_page.buttons, &["OK"]);
        assert!(error_page.body.contains("could not connect to origin"));
        assert_eq!(operator.calls().len(), 1);
        assert_eq!(operator.calls()[0].0, Operation::Sync);
        assert!(fs::read_to_string(dir.path().join("install.log.txt"))
            .unwrap()
            .contains("progress so far"));
    }

    #[test]
    fn identical_versions_still_sync() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::default();
        let mut session =
            Session::new(snapshot(true, Some("1.0.0"), "1.0.0"), targets(dir.path()), &operator);
        let mut shell = ScriptedShell::new(&[0, 0, 0]);

        session.run(&mut shell).unwrap();

        let prompt = &shell.pages[1];
        assert_eq!(prompt.phase, Phase::SyncPromptWithVersions);
        assert_eq!(prompt.body.matches("1.0.0").count(), 2);
        assert_eq!(operator.calls().len(), 1);
        assert_eq!(session.summary().phase, Phase::Complete);
    }

    #[test]
    fn quitting_at_prompt_runs_nothing() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::default();
        let mut session =
            Session::new(snapshot(true, Some("1.0.0"), "2.0.0"), targets(dir.path()), &operator);
        let mut shell = ScriptedShell::new(&[0, 1]);

        session.run(&mut shell).unwrap();

        assert_eq!(
            shell.phases(),
            vec![Phase::Intro, Phase::SyncPromptWithVersions]
        );
        assert!(operator.calls().is_empty());
    }

    #[test]
    fn at_most_one_operation_per_session() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::failing("boom");
        let mut session = Session::new(snapshot(false, None, ""), targets(dir.path()), &operator);

        assert_eq!(
            session.advance(Choice::Confirm),
            Transition::Next(Phase::CreatePrompt)
        );
        assert_eq!(session.advance(Choice::Confirm), Transition::Next(Phase::Error));
        assert_eq!(session.advance(Choice::Confirm), Transition::End);
        assert_eq!(session.advance(Choice::Confirm), Transition::End);

        assert_eq!(operator.calls().len(), 1);
        assert_eq!(session.summary().phase, Phase::Error);
    }

    #[test]
    fn missing_remote_version_still_reaches_a_prompt() {
        let dir = tempdir().unwrap();
        let operator = MockOperator::default();
        let mut session = Session::new(snapshot(false, None, ""), targets(dir.path()), &operator);

        assert_eq!(
            session.advance(Choice::Confirm),
            Transition::Next(Phase::CreatePrompt)
        );
        assert!(session.page().body.contains("Version unknown"));
    }

    #[test]
    fn terminal_buttons_always_quit() {
        assert_eq!(Choice::from_button(Phase::Complete, 0), Choice::Quit);
        assert_eq!(Choice::from_button(Phase::Error, 0), Choice::Quit);
        assert_eq!(Choice::from_button(Phase::Intro, 0), Choice::Confirm);
        assert_eq!(Choice::from_button(Phase::CreatePrompt, 1), Choice::Quit);
    }
}
