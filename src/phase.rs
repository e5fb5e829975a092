use crate::detect::InstallTree;
use crate::probe::Versions;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intro,
    CreatePrompt,
    SyncPromptNoVersion,
    SyncPromptWithVersions,
    Complete,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::CreatePrompt => "create_prompt",
            Self::SyncPromptNoVersion => "sync_prompt_no_version",
            Self::SyncPromptWithVersions => "sync_prompt_with_versions",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// The one mutating operation a prompt phase may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Sync,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Sync => "sync",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub phase: Phase,
    pub operation: Operation,
}

/// Everything startup learns about the local and remote state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tree: InstallTree,
    pub versions: Versions,
}

/// Picks the prompt phase and the operation it authorizes.
///
/// Tree existence decides between create and sync: create must never run over
/// an existing tree and sync needs one. The local version only changes which
/// sync prompt is shown. The remote version never affects the choice.
pub fn select(snapshot: &Snapshot) -> Selection {
    if !snapshot.tree.exists {
        return Selection {
            phase: Phase::CreatePrompt,
            operation: Operation::Create,
        };
    }
    let phase = match snapshot.versions.local {
        Some(_) => Phase::SyncPromptWithVersions,
        None => Phase::SyncPromptNoVersion,
    };
    Selection {
        phase,
        operation: Operation::Sync,
    }
}
