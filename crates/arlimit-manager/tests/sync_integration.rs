//! Integration tests for the limits manager against real files.
//!
//! These tests exercise the application layer end-to-end:
//! `LimitsManager` + `YamlLimitsStore` + `ArConfCommandSource` in a temp dir.

use std::path::{Path, PathBuf};

use arlimit_core::{decode_limits, DefaultLimitPolicy, Limit};
use arlimit_manager::application::{
    LimitsManager, LoadFailurePolicy, ManagerError, MissingCommandsPolicy, SyncPolicy,
};
use arlimit_manager::infrastructure::storage::{ArConfCommandSource, YamlLimitsStore};
use tempfile::TempDir;

// ── Fixtures ──────────────────────────────────────────────────────────────────

const AR_CONF: &str = "\
block-domain0 - block-domain.sh - 0
quick-scan0 - quick-scan.sh - 600
";

struct Workspace {
    _dir: TempDir,
    limits: PathBuf,
    ar_conf: PathBuf,
}

impl Workspace {
    fn new(limits: Option<&str>, ar_conf: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let limits_path = dir.path().join("ar_limit_conf.yaml");
        let ar_conf_path = dir.path().join("ar.conf");
        if let Some(content) = limits {
            std::fs::write(&limits_path, content).expect("write limits");
        }
        if let Some(content) = ar_conf {
            std::fs::write(&ar_conf_path, content).expect("write ar.conf");
        }
        Self {
            _dir: dir,
            limits: limits_path,
            ar_conf: ar_conf_path,
        }
    }

    fn open(&self, policy: SyncPolicy) -> LimitsManager<YamlLimitsStore, ArConfCommandSource> {
        LimitsManager::open(
            YamlLimitsStore::new(&self.limits),
            ArConfCommandSource::new(&self.ar_conf),
            policy,
        )
        .expect("open")
    }

    fn on_disk(&self) -> arlimit_core::LimitsDocument {
        read_document(&self.limits)
    }
}

fn read_document(path: &Path) -> arlimit_core::LimitsDocument {
    let text = std::fs::read_to_string(path).expect("read limits");
    decode_limits(&text).expect("decode").document().clone()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_construction_adds_new_and_removes_stale_commands_on_disk() {
    // Arrange
    let ws = Workspace::new(
        Some("active-response:\n  global-limit: 200\n  custom-limit:\n    block-domain0: 100\n    old-command0: 10\n"),
        Some(AR_CONF),
    );

    // Act
    let manager = ws.open(SyncPolicy::default());

    // Assert: in memory
    let limits = manager.get_limits(None);
    assert_eq!(limits.len(), 2);
    assert_eq!(limits.get("block-domain0"), Some(&Limit::new(100)));
    assert_eq!(limits.get("quick-scan0"), Some(&Limit::new(200)));
    assert!(!limits.contains_key("old-command0"));

    // Assert: on disk
    assert_eq!(ws.on_disk().custom_limits(), &limits);
}

#[test]
fn test_missing_limits_file_starts_from_defaults_and_creates_it() {
    // Arrange
    let ws = Workspace::new(None, Some(AR_CONF));

    // Act
    let manager = ws.open(SyncPolicy::default());

    // Assert
    assert_eq!(manager.global_limit(), Limit::new(200));
    assert_eq!(manager.get_limits(None).len(), 2);
    assert!(ws.limits.exists(), "limits file must be written after open");
}

#[test]
fn test_missing_limits_file_with_fail_policy_is_an_error() {
    let ws = Workspace::new(None, Some(AR_CONF));
    let policy = SyncPolicy {
        on_load_failure: LoadFailurePolicy::Fail,
        ..SyncPolicy::default()
    };

    let result = LimitsManager::open(
        YamlLimitsStore::new(&ws.limits),
        ArConfCommandSource::new(&ws.ar_conf),
        policy,
    );

    assert!(matches!(result, Err(ManagerError::Load(_))));
    assert!(!ws.limits.exists());
}

#[test]
fn test_malformed_limits_file_is_replaced_with_defaults() {
    let ws = Workspace::new(Some("active-response: [broken"), Some(AR_CONF));

    let manager = ws.open(SyncPolicy::default());

    assert_eq!(manager.global_limit(), Limit::new(200));
    assert_eq!(ws.on_disk().custom_limits().len(), 2);
}

#[test]
fn test_missing_ar_conf_leaves_custom_limits_untouched_by_default() {
    let ws = Workspace::new(
        Some("active-response:\n  custom-limit:\n    block-domain0: 100\n"),
        None,
    );

    let manager = ws.open(SyncPolicy::default());

    assert_eq!(manager.get_limits(None).get("block-domain0"), Some(&Limit::new(100)));
}

#[test]
fn test_missing_ar_conf_treated_as_empty_clears_custom_limits() {
    let ws = Workspace::new(
        Some("active-response:\n  custom-limit:\n    block-domain0: 100\n"),
        None,
    );
    let policy = SyncPolicy {
        on_missing_commands: MissingCommandsPolicy::TreatAsEmpty,
        ..SyncPolicy::default()
    };

    let manager = ws.open(policy);

    assert!(manager.get_limits(None).is_empty());
    assert!(ws.on_disk().custom_limits().is_empty());
}

#[test]
fn test_updates_are_written_through() {
    // Arrange
    let ws = Workspace::new(None, Some(AR_CONF));
    let mut manager = ws.open(SyncPolicy::default());

    // Act
    manager.update_global_limit(300).expect("global");
    let report = manager
        .update_command_limits([
            ("block-domain0", 50),
            ("quick-scan0", 15),
            ("new-command0", 100),
        ])
        .expect("commands");

    // Assert
    assert_eq!(report.skipped, vec!["new-command0".to_string()]);
    let doc = ws.on_disk();
    assert_eq!(doc.global_limit(), Limit::new(300));
    assert_eq!(doc.custom_limits().get("block-domain0"), Some(&Limit::new(50)));
    assert_eq!(doc.custom_limits().get("quick-scan0"), Some(&Limit::new(15)));
    assert!(!doc.custom_limits().contains_key("new-command0"));
}

#[test]
fn test_invalid_global_limit_leaves_file_unchanged() {
    let ws = Workspace::new(None, Some(AR_CONF));
    let mut manager = ws.open(SyncPolicy::default());
    let before = std::fs::read_to_string(&ws.limits).expect("read");

    let result = manager.update_global_limit(-10);

    assert!(matches!(result, Err(ManagerError::InvalidGlobalLimit(_))));
    assert_eq!(std::fs::read_to_string(&ws.limits).expect("read"), before);
}

#[test]
fn test_synchronize_picks_up_ar_conf_changes() {
    // Arrange
    let ws = Workspace::new(None, Some(AR_CONF));
    let policy = SyncPolicy {
        default_command_limit: DefaultLimitPolicy::Fixed(Limit::new(5)),
        ..SyncPolicy::default()
    };
    let mut manager = ws.open(policy);
    std::fs::write(
        &ws.ar_conf,
        "quick-scan0 - quick-scan.sh - 600\nfirewall-drop0 - firewall-drop - 0\n",
    )
    .expect("rewrite ar.conf");

    // Act
    let report = manager.synchronize().expect("sync");
    let again = manager.synchronize().expect("sync again");

    // Assert
    assert_eq!(report.added, vec!["firewall-drop0".to_string()]);
    assert_eq!(report.removed, vec!["block-domain0".to_string()]);
    assert!(again.is_empty());
    assert_eq!(
        ws.on_disk().custom_limits().get("firewall-drop0"),
        Some(&Limit::new(5))
    );
}

#[test]
fn test_foreign_yaml_keys_survive_rewrite() {
    let ws = Workspace::new(
        Some("active-response:\n  global-limit: 200\n  enabled: true\nmanager:\n  node: master\n"),
        Some(AR_CONF),
    );

    ws.open(SyncPolicy::default());

    let text = std::fs::read_to_string(&ws.limits).expect("read");
    assert!(text.contains("enabled: true"));
    assert!(text.contains("node: master"));
}
