//! ManageLimitsUseCase: keeps the limits file aligned with `ar.conf` and
//! applies limit edits.
//!
//! [`LimitsManager`] owns the in-memory [`LimitsFile`] and is the only writer
//! of the backing store.  Every mutating operation is one unit:
//!
//! ```text
//! snapshot ──► mutate in memory ──► persist ──► (on failure) restore snapshot
//! ```
//!
//! so a failed write never leaves memory ahead of what the caller was told.
//!
//! # Startup
//!
//! [`LimitsManager::open`] loads the limits file, reconciles it against the
//! declared commands and persists the result.  How each failure is handled
//! is chosen by [`SyncPolicy`].

use std::collections::BTreeMap;

use arlimit_core::{
    CommandLimitReport, CommandSet, DefaultLimitPolicy, Limit, LimitError, LimitsDocument,
    LimitsFile, SyncReport,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use super::ports::{CommandSource, LimitsStore, StoreError};

/// Error type for limit management operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The global limit value was rejected.
    #[error("invalid global limit: {0}")]
    InvalidGlobalLimit(#[source] LimitError),

    /// A per-command value was rejected; the whole batch was discarded.
    #[error("invalid limit for '{name}': {source}")]
    InvalidCommandLimit {
        name: String,
        #[source]
        source: LimitError,
    },

    /// The limits file could not be loaded and the policy forbids defaults.
    #[error("failed to load limits: {0}")]
    Load(#[source] StoreError),

    /// The updated limits could not be written; in-memory state was restored.
    #[error("failed to persist limits: {0}")]
    Persist(#[source] StoreError),
}

/// What to do when the limits file cannot be read or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFailurePolicy {
    /// Start from the default document (global limit 200, no custom limits).
    #[default]
    UseDefaults,
    /// Return [`ManagerError::Load`].
    Fail,
}

/// What to do when the command declarations cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingCommandsPolicy {
    /// Leave the custom limits untouched.
    #[default]
    Skip,
    /// Reconcile against an empty set, removing every custom limit.
    TreatAsEmpty,
}

/// Policy knobs for [`LimitsManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncPolicy {
    pub default_command_limit: DefaultLimitPolicy,
    pub on_load_failure: LoadFailurePolicy,
    pub on_missing_commands: MissingCommandsPolicy,
}

/// Owner of the limits document and its backing store.
pub struct LimitsManager<S, C> {
    store: S,
    source: C,
    policy: SyncPolicy,
    file: LimitsFile,
}

impl<S: LimitsStore, C: CommandSource> LimitsManager<S, C> {
    /// Loads, reconciles and persists the limits file.
    ///
    /// A write failure here is logged and does not abort startup; the
    /// reconciled document stays in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Load`] only when the load fails under
    /// [`LoadFailurePolicy::Fail`].
    pub fn open(store: S, source: C, policy: SyncPolicy) -> Result<Self, ManagerError> {
        let file = match store.load() {
            Ok(file) => file,
            Err(e) => match policy.on_load_failure {
                LoadFailurePolicy::UseDefaults => {
                    warn!(error = %e, "could not load limits; starting from defaults");
                    LimitsFile::default()
                }
                LoadFailurePolicy::Fail => return Err(ManagerError::Load(e)),
            },
        };

        let mut manager = Self {
            store,
            source,
            policy,
            file,
        };

        if let Some(report) = manager.reconcile() {
            log_sync_report(&report);
        }
        if let Err(e) = manager.persist() {
            error!(error = %e, "failed to write reconciled limits");
        }

        Ok(manager)
    }

    /// Current global limit.
    pub fn global_limit(&self) -> Limit {
        self.file.document().global_limit()
    }

    /// Read-only view of the whole document.
    pub fn document(&self) -> &LimitsDocument {
        self.file.document()
    }

    /// Returns a copy of the requested per-command limits.
    ///
    /// `None` (or an empty slice) returns every entry; unknown names are
    /// silently left out.
    pub fn get_limits(&self, names: Option<&[String]>) -> BTreeMap<String, Limit> {
        self.file.document().limits_for(names)
    }

    /// Sets the global limit and persists.
    ///
    /// # Errors
    ///
    /// [`ManagerError::InvalidGlobalLimit`] for negative or oversized values
    /// (nothing changes), [`ManagerError::Persist`] if the write fails.
    pub fn update_global_limit(&mut self, value: i64) -> Result<(), ManagerError> {
        let limit = Limit::try_from(value).map_err(ManagerError::InvalidGlobalLimit)?;

        let snapshot = self.file.clone();
        self.file.document_mut().set_global_limit(limit);
        self.commit(snapshot)?;

        info!(%limit, "global limit updated");
        Ok(())
    }

    /// Overwrites limits for commands that already exist, then persists once.
    ///
    /// Unknown names are skipped and reported; they are never inserted.
    ///
    /// # Errors
    ///
    /// [`ManagerError::InvalidCommandLimit`] if any value is invalid (the whole
    /// batch is discarded), [`ManagerError::Persist`] if the write fails.
    pub fn update_command_limits<I, K>(
        &mut self,
        updates: I,
    ) -> Result<CommandLimitReport, ManagerError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let validated = updates
            .into_iter()
            .map(|(name, value)| {
                let name = name.as_ref().to_string();
                match Limit::try_from(value) {
                    Ok(limit) => Ok((name, limit)),
                    Err(source) => Err(ManagerError::InvalidCommandLimit { name, source }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let snapshot = self.file.clone();
        let report = self
            .file
            .document_mut()
            .apply_command_limits(validated.iter().map(|(name, limit)| (name.as_str(), *limit)));
        self.commit(snapshot)?;

        for name in &report.updated {
            info!(command = %name, "command limit updated");
        }
        for name in &report.skipped {
            warn!(command = %name, "command not in custom limits; skipping update");
        }
        Ok(report)
    }

    /// Re-reads the command declarations, reconciles and persists.
    ///
    /// When the declarations cannot be read and the policy is
    /// [`MissingCommandsPolicy::Skip`], the report is empty.
    ///
    /// # Errors
    ///
    /// [`ManagerError::Persist`] if the write fails.
    pub fn synchronize(&mut self) -> Result<SyncReport, ManagerError> {
        let snapshot = self.file.clone();
        let report = self.reconcile().unwrap_or_default();
        self.commit(snapshot)?;

        log_sync_report(&report);
        Ok(report)
    }

    /// Runs one reconciliation pass, or returns `None` when it was skipped.
    fn reconcile(&mut self) -> Option<SyncReport> {
        let commands = match self.source.read_commands() {
            Ok(commands) => commands,
            Err(e) => match self.policy.on_missing_commands {
                MissingCommandsPolicy::Skip => {
                    warn!(error = %e, "could not read command declarations; leaving custom limits untouched");
                    return None;
                }
                MissingCommandsPolicy::TreatAsEmpty => {
                    warn!(error = %e, "could not read command declarations; treating as empty");
                    CommandSet::default()
                }
            },
        };

        Some(
            self.file
                .document_mut()
                .synchronize(&commands, self.policy.default_command_limit),
        )
    }

    /// Persists, restoring `snapshot` on failure.
    fn commit(&mut self, snapshot: LimitsFile) -> Result<(), ManagerError> {
        if let Err(e) = self.persist() {
            self.file = snapshot;
            return Err(ManagerError::Persist(e));
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save(&self.file)
    }
}

fn log_sync_report(report: &SyncReport) {
    for name in &report.added {
        info!(command = %name, "added command limit");
    }
    for name in &report.removed {
        info!(command = %name, "removed stale command limit");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
