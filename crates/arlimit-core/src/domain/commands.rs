//! Active-response command set and the `ar.conf` line scanner.
//!
//! Each active-response command is declared in `ar.conf` on its own line:
//!
//! ```text
//! block-domain0 - block-domain.sh - 0
//! quick-scan0 - quick-scan.sh - 600
//! ```
//!
//! A line qualifies when it splits on `" - "` into at least three fields and
//! its first field ends with `0`.  Everything else (comments, blank lines,
//! unrelated directives) is ignored, so the scanner never fails.

use std::collections::BTreeSet;

/// Separator between the fields of an `ar.conf` declaration.
const FIELD_SEPARATOR: &str = " - ";

/// Minimum number of fields: name, script and timeout.
const MIN_FIELDS: usize = 3;

/// Suffix carried by every active-response command name.
const COMMAND_SUFFIX: char = '0';

/// Sorted set of active-response command identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    names: BTreeSet<String>,
}

impl CommandSet {
    /// Scans `ar.conf` content and collects the declared command names.
    pub fn parse(content: &str) -> Self {
        content.lines().filter_map(command_name).map(str::to_string).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for CommandSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Extracts the command name from one line, if the line declares a command.
fn command_name(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let name = fields[0].trim();
    (!name.is_empty() && name.ends_with(COMMAND_SUFFIX)).then_some(name)
}
