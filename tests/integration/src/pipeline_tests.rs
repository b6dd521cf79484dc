//! End-to-end install pipeline across mcpm-meta, mcpm-core and mcpm-fs.

use std::sync::Arc;

use mcpm_core::executor;
use mcpm_core::ide_config::{self, IdeConfigFile};
use mcpm_core::inputs::{InputMode, Prompter, ResolvedInputs};
use mcpm_core::secrets::{MemorySecretStore, SecretStore};
use mcpm_core::{
    ConfigAction, Error, InstallOptions, InstallSource, Ledger, LedgerEntry, PackageManager,
    Settings, StepStatus,
};
use mcpm_meta::{InputSpec, Step};
use mcpm_test_utils::{TestHome, TestPackage};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Fails the test if anything is prompted.
struct NoPrompts;

impl Prompter for NoPrompts {
    fn prompt(&mut self, spec: &InputSpec) -> mcpm_core::Result<String> {
        panic!("unexpected prompt for {}", spec.name);
    }
}

/// Answers every prompt with the same value.
struct Always(&'static str);

impl Prompter for Always {
    fn prompt(&mut self, _spec: &InputSpec) -> mcpm_core::Result<String> {
        Ok(self.0.to_string())
    }
}

fn manager(home: &TestHome) -> (PackageManager, Arc<MemorySecretStore>) {
    let mut settings = Settings::with_home(home.mcpm_home(), &home.user_home());
    settings
        .targets
        .insert("ide1".to_string(), home.ide_config("ide1"));
    let secrets = Arc::new(MemorySecretStore::new());
    (
        PackageManager::new(settings, Box::new(secrets.clone())),
        secrets,
    )
}

fn shell(command: &str) -> Step {
    Step::Shell {
        command: command.to_string(),
    }
}

#[test]
fn my_server_install_then_configure_from_ledger() {
    let home = TestHome::new();
    let (manager, secrets) = manager(&home);
    let pkg = TestPackage::from_manifest(json!({
        "name": "My Server",
        "version": "1.0.0",
        "install_inputs": [{"name": "API_KEY", "secret": true}],
        "install_steps": [{"type": "shell", "command": "echo ${API_KEY}"}],
        "ide_config_commands": {
            "ide1": {"command": "node", "args": ["server.js"], "env": {"API_KEY": "${API_KEY}"}}
        }
    }))
    .build();

    let archive = pkg.archive("my-server-1.0.0.zip");
    let mut prompter = Always("abc123");
    let report = manager
        .install(
            &InstallSource::Archive(archive.clone()),
            &InstallOptions::default(),
            &mut InputMode::Interactive(&mut prompter),
        )
        .unwrap();

    let step = &report.execution.outcomes[0];
    assert_eq!(step.status, StepStatus::Succeeded);
    assert_eq!(step.command, "echo ****");
    assert_eq!(step.output.trim(), "****");

    let entry = manager.ledger().require("my-server").unwrap();
    assert_eq!(entry.version, "1.0.0");
    assert_eq!(entry.secret_inputs, vec!["API_KEY".to_string()]);
    assert_eq!(
        entry.archive_checksum,
        Some(mcpm_fs::checksum::compute_file_checksum(&archive).unwrap())
    );
    assert_eq!(
        secrets.get("my-server", "API_KEY").unwrap().as_deref(),
        Some("abc123")
    );

    let mut no_prompts = NoPrompts;
    manager
        .configure(
            "my-server",
            "ide1",
            ConfigAction::Add,
            &mut InputMode::Interactive(&mut no_prompts),
        )
        .unwrap();

    let config = home.read_json(&home.ide_config("ide1"));
    assert_eq!(
        config["mcpServers"]["my-server"],
        json!({"command": "node", "args": ["server.js"], "env": {"API_KEY": "abc123"}})
    );
}

#[test]
fn stop_on_failure_runs_exactly_two_steps() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("third-ran");
    let steps = vec![
        shell("echo first"),
        shell("exit 1"),
        shell(&format!("echo ran > \"{}\"", marker.display())),
    ];

    let report = executor::run(&steps, &ResolvedInputs::new(), dir.path()).unwrap();

    assert_eq!(report.executed(), 2);
    assert_eq!(report.outcomes[0].status, StepStatus::Succeeded);
    assert_eq!(report.outcomes[1].status, StepStatus::Failed { exit_code: Some(1) });
    assert_eq!(report.outcomes[2].status, StepStatus::NotRun);
    assert!(!marker.exists());
    assert!(matches!(
        report.ensure_success(),
        Err(Error::NonZeroExit { index: 1, .. })
    ));
}

#[test]
fn merge_preserves_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    std::fs::write(
        &path,
        r#"{"mcpServers": {"other": {"command": "python"}}, "unrelated": true}"#,
    )
    .unwrap();

    ide_config::apply("ide1", "x", &json!({"command": "node"}), ConfigAction::Add, &path).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written,
        json!({
            "mcpServers": {"other": {"command": "python"}, "x": {"command": "node"}},
            "unrelated": true
        })
    );
}

#[test]
fn remove_absent_key_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    let original = "{\n  \"mcpServers\": {\n    \"other\": {}\n  }\n}\n";
    std::fs::write(&path, original).unwrap();

    ide_config::apply("ide1", "missing", &json!({}), ConfigAction::Remove, &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

    let absent = dir.path().join("absent.json");
    assert!(!IdeConfigFile::new(&absent).remove("missing").unwrap());
    assert!(!absent.exists());
}

#[test]
fn ledger_upsert_keeps_latest_version() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.toml"));

    ledger.record(LedgerEntry::new("x", "1.0.0", "/p/x")).unwrap();
    let previous = ledger.record(LedgerEntry::new("x", "2.0.0", "/p/x")).unwrap();

    assert_eq!(previous.map(|e| e.version).as_deref(), Some("1.0.0"));
    let entries = ledger.list().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "2.0.0");
}

#[test]
fn uninstall_cleans_ide_config_and_secrets() {
    let home = TestHome::new();
    let (manager, secrets) = manager(&home);
    let pkg = TestPackage::new("My Server", "1.0.0")
        .secret_input("API_KEY")
        .uninstall_step("echo bye ${API_KEY}")
        .ide("ide1", json!({"command": "node", "env": {"API_KEY": "${API_KEY}"}}))
        .build();

    let mut prompter = Always("abc123");
    let mut mode = InputMode::Interactive(&mut prompter);
    manager
        .install(
            &InstallSource::Directory(pkg.root().to_path_buf()),
            &InstallOptions::default(),
            &mut mode,
        )
        .unwrap();
    manager
        .configure("my-server", "ide1", ConfigAction::Add, &mut mode)
        .unwrap();

    let report = manager
        .uninstall("my-server", &Default::default())
        .unwrap();

    assert_eq!(report.execution.outcomes[0].command, "echo bye ****");
    assert_eq!(report.removed_from, vec!["ide1".to_string()]);
    assert_eq!(home.read_json(&home.ide_config("ide1"))["mcpServers"], json!({}));
    assert_eq!(secrets.get("my-server", "API_KEY").unwrap(), None);
    assert!(!manager.ledger().is_installed("my-server").unwrap());
    assert!(!home.package_dir("my-server").exists());
}
