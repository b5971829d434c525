//! Error types for the gitnotes core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. Binaries
//! wrap them with `anyhow` context.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Push was rejected by the remote (e.g. non-fast-forward).
    #[error("git push rejected for branch '{branch}': {detail}")]
    PushRejected {
        branch: String,
        detail: String,
    },

    /// The working copy has no working directory (bare repository).
    #[error("git repository at '{0}' has no working directory")]
    BareRepository(String),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing SSH transport credentials.
///
/// Messages never include key material or passphrases.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No private key material was supplied.
    #[error("ssh private key is empty")]
    EmptyKey,

    /// The key material is not a PEM / OpenSSH private key.
    #[error("ssh private key is not in a recognized PEM or OpenSSH format")]
    UnrecognizedKeyFormat,

    /// The key is encrypted but no passphrase was supplied.
    #[error("ssh private key is encrypted but no passphrase was provided")]
    MissingPassphrase,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// The SSH key file could not be read.
    #[error("failed to read ssh key file '{path}': {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Initialization errors
// ---------------------------------------------------------------------------

/// Fatal errors raised while constructing a note store.
#[derive(Debug, Error)]
pub enum InitError {
    /// The SSH credentials could not be parsed.
    #[error("invalid ssh credentials: {0}")]
    Credentials(#[from] CredentialError),

    /// The remote repository could not be cloned.
    #[error("failed to clone '{url}': {source}")]
    Clone {
        url: String,
        #[source]
        source: GitError,
    },

    /// An existing working copy could not be opened.
    #[error("failed to open working copy: {0}")]
    Open(#[source] GitError),

    /// The target branch could not be created or wired to its upstream.
    #[error("failed to prepare branch '{branch}': {source}")]
    Branch {
        branch: String,
        #[source]
        source: GitError,
    },

    /// The target branch could not be checked out.
    #[error("failed to check out branch '{branch}': {source}")]
    Checkout {
        branch: String,
        #[source]
        source: GitError,
    },

    /// The configuration handed to the store is unusable.
    #[error("invalid store configuration: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Write errors
// ---------------------------------------------------------------------------

/// Errors from [`crate::storage::NoteStore::add`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// The title cannot be used as a file name.
    #[error("invalid note title '{0}'")]
    InvalidTitle(String),

    /// The note file could not be created or written.
    #[error("failed to write note file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// The step of the flush sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Pull,
    Stage,
    Commit,
    Push,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Stage => write!(f, "stage"),
            Self::Commit => write!(f, "commit"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// Errors from a flush cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Synchronizing the working copy with the remote failed.
    #[error("pull from '{remote}' failed: {source}")]
    Pull {
        remote: String,
        #[source]
        source: GitError,
    },

    /// A note file could not be added to the index.
    #[error("staging '{path}' failed: {source}")]
    Stage {
        path: String,
        #[source]
        source: GitError,
    },

    /// Creating the commit failed.
    #[error("commit failed: {0}")]
    Commit(#[source] GitError),

    /// Pushing the commit to the remote failed.
    #[error("push to '{remote}/{branch}' failed: {source}")]
    Push {
        remote: String,
        branch: String,
        #[source]
        source: GitError,
    },
}

impl SyncError {
    /// Which step of the flush sequence produced this error.
    pub fn stage(&self) -> SyncStage {
        match self {
            Self::Pull { .. } => SyncStage::Pull,
            Self::Stage { .. } => SyncStage::Stage,
            Self::Commit(_) => SyncStage::Commit,
            Self::Push { .. } => SyncStage::Push,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::RepositoryNotFound("/tmp/repo".into());
        assert_eq!(err.to_string(), "git repository not found at '/tmp/repo'");

        let err = ConfigError::InvalidValue {
            field: "buffer.size".into(),
            detail: "buffer size must be >= 1".into(),
        };
        assert!(err.to_string().contains("buffer.size"));

        let err = WriteError::InvalidTitle("../escape".into());
        assert_eq!(err.to_string(), "invalid note title '../escape'");
    }

    #[test]
    fn test_sync_error_stage() {
        let err = SyncError::Commit(GitError::BareRepository("/tmp/repo".into()));
        assert_eq!(err.stage(), SyncStage::Commit);
        assert_eq!(err.stage().to_string(), "commit");

        let err = SyncError::Push {
            remote: "origin".into(),
            branch: "main".into(),
            source: GitError::PushRejected {
                branch: "main".into(),
                detail: "non-fast-forward".into(),
            },
        };
        assert_eq!(err.stage(), SyncStage::Push);
        assert!(err.to_string().contains("origin/main"));
    }

    #[test]
    fn test_init_error_from_subsystem() {
        let init_err: InitError = CredentialError::MissingPassphrase.into();
        assert!(matches!(init_err, InitError::Credentials(_)));
    }
}
