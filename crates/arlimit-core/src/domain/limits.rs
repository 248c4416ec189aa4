//! Limits document domain entity.
//!
//! A [`LimitsDocument`] holds the global active-response limit and the
//! per-command overrides.  The reconciliation pass ([`LimitsDocument::synchronize`])
//! aligns the override keys with a [`CommandSet`] read from `ar.conf`:
//!
//! ```text
//! to_add    = commands - custom_limits.keys()    → inserted at the default limit
//! to_remove = custom_limits.keys() - commands    → deleted
//! ```
//!
//! The two passes touch disjoint key sets, so their order does not matter.
//! After a pass `custom_limits.keys() == commands` holds exactly.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::commands::CommandSet;

/// Global limit used when the limits file does not provide one.
pub const DEFAULT_GLOBAL_LIMIT: Limit = Limit(200);

/// Errors raised when a caller supplies an unusable limit value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitError {
    /// Limits count invocations and cannot be negative.
    #[error("limit must not be negative, got {0}")]
    Negative(i64),

    /// The value does not fit the on-disk integer range.
    #[error("limit {0} exceeds the maximum of {max}", max = u32::MAX)]
    TooLarge(i64),

    /// Text that is neither an integer nor a recognised keyword.
    #[error("invalid limit value: {0:?}")]
    InvalidFormat(String),
}

/// A non-negative active-response limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Limit(u32);

impl Limit {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Limit {
    type Error = LimitError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(LimitError::Negative(value));
        }
        u32::try_from(value)
            .map(Limit)
            .map_err(|_| LimitError::TooLarge(value))
    }
}

impl TryFrom<u64> for Limit {
    type Error = LimitError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Limit)
            .map_err(|_| LimitError::TooLarge(i64::try_from(value).unwrap_or(i64::MAX)))
    }
}

impl FromStr for Limit {
    type Err = LimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| LimitError::InvalidFormat(s.to_string()))?;
        Limit::try_from(value)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Limit given to commands that synchronization adds to the document.
///
/// Written as `"inherit-global"` or a plain integer such as `"50"` in both the
/// settings file and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DefaultLimitPolicy {
    /// Use the document's current global limit.
    #[default]
    InheritGlobal,
    /// Use a fixed value regardless of the global limit.
    Fixed(Limit),
}

impl DefaultLimitPolicy {
    const INHERIT_KEYWORD: &'static str = "inherit-global";

    /// Resolves the policy against a document's global limit.
    pub fn resolve(self, global_limit: Limit) -> Limit {
        match self {
            DefaultLimitPolicy::InheritGlobal => global_limit,
            DefaultLimitPolicy::Fixed(limit) => limit,
        }
    }
}

impl FromStr for DefaultLimitPolicy {
    type Err = LimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(Self::INHERIT_KEYWORD) {
            return Ok(DefaultLimitPolicy::InheritGlobal);
        }
        s.parse().map(DefaultLimitPolicy::Fixed)
    }
}

impl TryFrom<String> for DefaultLimitPolicy {
    type Error = LimitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DefaultLimitPolicy> for String {
    fn from(policy: DefaultLimitPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for DefaultLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultLimitPolicy::InheritGlobal => f.write_str(Self::INHERIT_KEYWORD),
            DefaultLimitPolicy::Fixed(limit) => limit.fmt(f),
        }
    }
}

/// Outcome of one reconciliation pass.  Both lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SyncReport {
    /// Returns `true` when the pass changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Outcome of a batch per-command update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLimitReport {
    /// Names whose limit was overwritten.
    pub updated: Vec<String>,
    /// Names not present in the document; these are never inserted.
    pub skipped: Vec<String>,
}

/// Global limit plus per-command overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitsDocument {
    global_limit: Limit,
    custom_limits: BTreeMap<String, Limit>,
}

impl Default for LimitsDocument {
    fn default() -> Self {
        Self {
            global_limit: DEFAULT_GLOBAL_LIMIT,
            custom_limits: BTreeMap::new(),
        }
    }
}

impl LimitsDocument {
    pub fn new(global_limit: Limit, custom_limits: BTreeMap<String, Limit>) -> Self {
        Self {
            global_limit,
            custom_limits,
        }
    }

    pub fn global_limit(&self) -> Limit {
        self.global_limit
    }

    pub fn set_global_limit(&mut self, limit: Limit) {
        self.global_limit = limit;
    }

    /// Borrowed view of every per-command limit.
    pub fn custom_limits(&self) -> &BTreeMap<String, Limit> {
        &self.custom_limits
    }

    /// Returns an owned copy of the per-command limits.
    ///
    /// With `None`, or an empty slice, every entry is returned.  Otherwise only
    /// the requested names that exist are returned; unknown names are left out.
    pub fn limits_for(&self, names: Option<&[String]>) -> BTreeMap<String, Limit> {
        match names {
            Some(names) if !names.is_empty() => names
                .iter()
                .filter_map(|name| {
                    self.custom_limits
                        .get(name)
                        .map(|limit| (name.clone(), *limit))
                })
                .collect(),
            _ => self.custom_limits.clone(),
        }
    }

    /// Overwrites limits for names already in the document.
    ///
    /// Names that are not present are reported as skipped and never inserted;
    /// only synchronization adds commands.
    pub fn apply_command_limits<'a, I>(&mut self, updates: I) -> CommandLimitReport
    where
        I: IntoIterator<Item = (&'a str, Limit)>,
    {
        let mut report = CommandLimitReport::default();
        for (name, limit) in updates {
            match self.custom_limits.get_mut(name) {
                Some(existing) => {
                    *existing = limit;
                    report.updated.push(name.to_string());
                }
                None => report.skipped.push(name.to_string()),
            }
        }
        report
    }

    /// Aligns the override keys with `commands`.
    pub fn synchronize(&mut self, commands: &CommandSet, policy: DefaultLimitPolicy) -> SyncReport {
        let default_limit = policy.resolve(self.global_limit);

        let removed: Vec<String> = self
            .custom_limits
            .keys()
            .filter(|name| !commands.contains(name))
            .cloned()
            .collect();
        for name in &removed {
            self.custom_limits.remove(name);
        }

        let mut added = Vec::new();
        for name in commands.iter() {
            if !self.custom_limits.contains_key(name) {
                self.custom_limits.insert(name.to_string(), default_limit);
                added.push(name.to_string());
            }
        }

        debug!(
            added = added.len(),
            removed = removed.len(),
            %default_limit,
            "reconciled custom limits"
        );

        SyncReport { added, removed }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
