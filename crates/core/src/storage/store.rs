//! Git-backed note store with a pending buffer.
//!
//! [`NoteStore::add`] writes a note into the working copy and records its path
//! in the pending buffer. [`NoteStore::flush`] turns the buffer into a single
//! pushed commit:
//!
//! 1. Swap the buffer for an empty one under the buffer lock.
//! 2. Reset the working copy to the remote tip.
//! 3. Stage every path of the snapshot, in add order.
//! 4. Commit with the configured committer.
//! 5. Push.
//!
//! If staging, committing or pushing fails, the branch and index are rolled
//! back to the pulled tip. The batch's files stay on disk as untracked
//! changes and are never picked up by a later commit unless re-added.
//!
//! The buffer lock only ever covers a local file write or a buffer swap;
//! all repository work happens under a separate lock after the swap, so
//! `add` never waits on the network.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, instrument, warn};

use super::buffer::PendingBuffer;
use crate::commit_format::CommitFormatter;
use crate::config::validate_save_to;
use crate::errors::{ConfigError, GitError, InitError, SyncError, WriteError};
use crate::git::{GitClient, SshCredentials};
use crate::models::{FlushOutcome, FlushReport, FlushStats, FlushStatsSnapshot, StoreState};

/// File extension for note files.
pub const NOTE_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything needed to construct a [`NoteStore`].
#[derive(Clone)]
pub struct StoreConfig {
    pub url: String,
    pub path: PathBuf,
    pub branch: String,
    pub remote_name: String,
    pub save_to: PathBuf,
    pub committer_name: String,
    pub committer_email: String,
    pub ssh_username: String,
    pub ssh_key: String,
    pub ssh_passphrase: Option<String>,
    pub buffer_size: usize,
    /// Zero disables timer-driven flushes.
    pub flush_interval: Duration,
    pub requeue_on_failure: bool,
    pub flush_on_shutdown: bool,
    pub commit_template: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("remote_name", &self.remote_name)
            .field("save_to", &self.save_to)
            .field("committer_name", &self.committer_name)
            .field("committer_email", &self.committer_email)
            .field("ssh_username", &self.ssh_username)
            .field("ssh_key", &"<redacted>")
            .field("ssh_passphrase", &self.ssh_passphrase.as_ref().map(|_| "<redacted>"))
            .field("buffer_size", &self.buffer_size)
            .field("flush_interval", &self.flush_interval)
            .field("requeue_on_failure", &self.requeue_on_failure)
            .field("flush_on_shutdown", &self.flush_on_shutdown)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Buffered note storage backed by a Git working copy.
pub struct NoteStore {
    config: StoreConfig,
    creds: SshCredentials,
    git: tokio::sync::Mutex<GitClient>,
    workdir: PathBuf,
    save_dir: PathBuf,
    formatter: CommitFormatter,
    buffer: Mutex<PendingBuffer>,
    flush_tx: mpsc::Sender<()>,
    flush_rx: Mutex<Option<mpsc::Receiver<()>>>,
    state: Mutex<StoreState>,
    stats: FlushStats,
}

impl NoteStore {
    /// Open (or clone) the working copy and check out the configured branch.
    ///
    /// Any failure is fatal: no store is returned.
    #[instrument(skip(config), fields(url = %config.url, path = %config.path.display(), branch = %config.branch))]
    pub fn open(config: StoreConfig) -> Result<Self, InitError> {
        if config.buffer_size == 0 {
            return Err(InitError::Config(ConfigError::InvalidValue {
                field: "buffer.size".into(),
                detail: "buffer size must be >= 1".into(),
            }));
        }
        validate_save_to(&config.save_to)?;

        let creds = SshCredentials::parse(
            &config.ssh_username,
            &config.ssh_key,
            config.ssh_passphrase.as_deref(),
        )?;

        let git = match GitClient::open(&config.path) {
            Ok(client) => client,
            Err(GitError::RepositoryNotFound(_)) => {
                info!("no working copy found, cloning");
                GitClient::clone_repo(&config.url, &config.path, &config.remote_name, &creds)
                    .map_err(|source| InitError::Clone { url: config.url.clone(), source })?
            }
            Err(e) => return Err(InitError::Open(e)),
        };

        git.ensure_remote(&config.remote_name, &config.url).map_err(InitError::Open)?;
        git.ensure_branch(&config.branch, &config.remote_name)
            .map_err(|source| InitError::Branch { branch: config.branch.clone(), source })?;
        git.checkout_branch(&config.branch)
            .map_err(|source| InitError::Checkout { branch: config.branch.clone(), source })?;

        let workdir = git.workdir().map_err(InitError::Open)?.to_path_buf();
        let save_dir: PathBuf = config
            .save_to
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        let (flush_tx, flush_rx) = mpsc::channel(1);
        info!(buffer_size = config.buffer_size, "note store ready");

        Ok(Self {
            formatter: CommitFormatter::new(&config.commit_template),
            buffer: Mutex::new(PendingBuffer::with_capacity(config.buffer_size)),
            git: tokio::sync::Mutex::new(git),
            flush_rx: Mutex::new(Some(flush_rx)),
            state: Mutex::new(StoreState::Idle),
            stats: FlushStats::default(),
            flush_tx,
            creds,
            workdir,
            save_dir,
            config,
        })
    }

    /// Write a note and queue it for the next flush.
    ///
    /// Returns the note's path relative to the working copy root. When this
    /// call fills the buffer to capacity, the flush loop is signalled.
    pub fn add(&self, title: &str, text: &str) -> Result<PathBuf, WriteError> {
        let file_name = note_file_name(title)?;
        let rel_path = self.save_dir.join(file_name);

        let mut buffer = self.lock_buffer();
        write_note(&self.workdir.join(&rel_path), text).map_err(|source| WriteError::Io {
            path: rel_path.display().to_string(),
            source,
        })?;

        if buffer.push(rel_path.clone()) {
            match self.flush_tx.try_send(()) {
                Ok(()) => debug!(pending = buffer.len(), "buffer full, flush requested"),
                Err(TrySendError::Full(())) => debug!("flush already requested"),
                Err(TrySendError::Closed(())) => debug!("flush loop stopped, request dropped"),
            }
        }
        debug!(path = %rel_path.display(), pending = buffer.len(), "note written");
        Ok(rel_path)
    }

    /// Run one flush now.
    ///
    /// Concurrent calls are serialized on the repository. A failed batch is
    /// dropped unless `requeue_on_failure` is set.
    pub async fn flush(&self) -> Result<FlushOutcome, SyncError> {
        let git = self.git.lock().await;

        let snapshot = {
            let mut buffer = self.lock_buffer();
            if buffer.is_empty() {
                self.stats.record_empty();
                return Ok(FlushOutcome::NothingToDo);
            }
            buffer.take()
        };

        let previous = self.replace_state(StoreState::Flushing);
        let started_at = Utc::now();
        let result = self.sync_snapshot(&git, &snapshot);
        self.replace_state(previous);

        match result {
            Ok(commit) => {
                self.stats.record_success(snapshot.len());
                Ok(FlushOutcome::Flushed(FlushReport {
                    count: snapshot.len(),
                    commit,
                    paths: snapshot,
                    started_at,
                    completed_at: Utc::now(),
                }))
            }
            Err(e) => {
                let consecutive = self.stats.record_failure();
                if self.config.requeue_on_failure {
                    warn!(count = snapshot.len(), consecutive, "flush failed, batch requeued");
                    self.lock_buffer().requeue(snapshot);
                } else {
                    warn!(count = snapshot.len(), consecutive, "flush failed, batch dropped");
                }
                Err(e)
            }
        }
    }

    fn sync_snapshot(&self, git: &GitClient, snapshot: &[PathBuf]) -> Result<String, SyncError> {
        let remote = &self.config.remote_name;
        let branch = &self.config.branch;

        // A note may overwrite a tracked file; the reset to the remote tip
        // must not revert it.
        let contents: Vec<(&PathBuf, Vec<u8>)> = snapshot
            .iter()
            .filter_map(|path| std::fs::read(self.workdir.join(path)).ok().map(|b| (path, b)))
            .collect();

        git.pull(remote, branch, &self.creds)
            .map_err(|source| SyncError::Pull { remote: remote.clone(), source })?;

        let base = git.head_oid();
        let result = self.commit_snapshot(git, &contents, snapshot);
        if result.is_err() {
            if let Err(e) = git.rollback(branch, base) {
                warn!(error = %e, "failed to roll back after flush error");
            }
        }
        result
    }

    /// Restore, stage, commit and push on top of the freshly pulled tip.
    fn commit_snapshot(
        &self,
        git: &GitClient,
        contents: &[(&PathBuf, Vec<u8>)],
        snapshot: &[PathBuf],
    ) -> Result<String, SyncError> {
        let remote = &self.config.remote_name;
        let branch = &self.config.branch;

        for (path, bytes) in contents {
            std::fs::write(self.workdir.join(path), bytes).map_err(|e| SyncError::Stage {
                path: path.display().to_string(),
                source: GitError::IoError(e),
            })?;
        }

        for path in snapshot {
            git.stage(path).map_err(|source| SyncError::Stage {
                path: path.display().to_string(),
                source,
            })?;
        }

        let message = self.formatter.format(snapshot.len(), Utc::now());
        let oid = git
            .commit_staged(&message, &self.config.committer_name, &self.config.committer_email)
            .map_err(SyncError::Commit)?;

        git.push(remote, branch, &self.creds).map_err(|source| SyncError::Push {
            remote: remote.clone(),
            branch: branch.clone(),
            source,
        })?;

        Ok(oid.to_string())
    }

    /// Number of notes waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.lock_buffer().len()
    }

    /// Copy of the pending paths, in add order.
    pub fn pending_paths(&self) -> Vec<PathBuf> {
        self.lock_buffer().paths().to_vec()
    }

    pub fn state(&self) -> StoreState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> FlushStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    pub fn flush_interval(&self) -> Duration {
        self.config.flush_interval
    }

    pub fn flush_on_shutdown(&self) -> bool {
        self.config.flush_on_shutdown
    }

    /// Hand the buffer-full receiver to the flush loop. Only the first caller
    /// gets it.
    pub(crate) fn take_flush_signal(&self) -> Option<mpsc::Receiver<()>> {
        self.flush_rx.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub(crate) fn replace_state(&self, new_state: StoreState) -> StoreState {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != new_state {
            debug!(from = %*state, to = %new_state, "state transition");
        }
        std::mem::replace(&mut *state, new_state)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, PendingBuffer> {
        // A panic while holding the lock cannot leave the buffer half-updated:
        // every mutation is a single push or swap.
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteStore")
            .field("config", &self.config)
            .field("workdir", &self.workdir)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Turn a title into a file name, rejecting anything that is not a single
/// path component.
fn note_file_name(title: &str) -> Result<String, WriteError> {
    let invalid = title.trim().is_empty()
        || title == "."
        || title == ".."
        || title.contains(['/', '\\', '\0']);
    if invalid {
        return Err(WriteError::InvalidTitle(title.to_string()));
    }
    Ok(format!("{}.{}", title, NOTE_EXTENSION))
}

fn write_note(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)
}
