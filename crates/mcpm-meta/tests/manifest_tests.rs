use mcpm_meta::{
    Error, FallbackHint, MANIFEST_FILENAME, PackageManifest, derive_install_name,
    is_valid_install_name,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use tempfile::TempDir;

proptest! {
    #[test]
    fn install_name_derivation_is_idempotent(name in "\\PC{0,40}") {
        let once = derive_install_name(&name);
        let twice = derive_install_name(&once);
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn derived_install_names_are_valid_or_empty(name in "\\PC{0,40}") {
        let derived = derive_install_name(&name);
        prop_assert!(derived.is_empty() || is_valid_install_name(&derived));
    }

    #[test]
    fn derivation_is_deterministic(name in "[A-Za-z0-9 _-]{1,30}") {
        prop_assert_eq!(derive_install_name(&name), derive_install_name(&name));
    }
}

#[rstest]
#[case("my-server-1.0.0.zip", Some("my-server"), Some("1.0.0"))]
#[case("calc-0.2.mcpz", Some("calc"), Some("0.2"))]
#[case("tool-v2.zip", Some("tool-v2"), None)]
#[case("plain", Some("plain"), None)]
#[case("-1.0.zip", Some("-1.0"), None)]
#[case(".zip", None, None)]
fn fallback_hint_from_file_name(
    #[case] file_name: &str,
    #[case] name: Option<&str>,
    #[case] version: Option<&str>,
) {
    let hint = FallbackHint::from_file_name(file_name);
    assert_eq!(hint.name.as_deref(), name);
    assert_eq!(hint.version.as_deref(), version);
}

#[test]
fn manifest_fields_beat_hint() {
    let hint = FallbackHint::from_file_name("other-9.9.9.zip");
    let manifest =
        PackageManifest::parse_with_fallback(r#"{"name": "Real", "version": "1.0.0"}"#, &hint)
            .unwrap();
    assert_eq!(manifest.name, "Real");
    assert_eq!(manifest.version, "1.0.0");
}

#[test]
fn blank_name_counts_as_missing() {
    let result = PackageManifest::parse(r#"{"name": "   ", "version": "1.0.0"}"#);
    assert!(matches!(result, Err(Error::MissingField { field: "name" })));
}

#[test]
fn unusable_name_is_invalid_install_name() {
    let result = PackageManifest::parse(r#"{"name": "???", "version": "1.0.0"}"#);
    assert!(matches!(result, Err(Error::InvalidInstallName { .. })));
}

#[test]
fn malformed_json_is_parse_error() {
    let result = PackageManifest::parse("{ nope");
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn input_names_must_be_identifiers() {
    let result = PackageManifest::parse(
        r#"{"name": "x", "version": "1", "install_inputs": [{"name": "api-key"}]}"#,
    );
    assert!(matches!(result, Err(Error::InvalidInputName { .. })));
}

#[test]
fn from_dir_uses_directory_name_as_fallback() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("local-tool-3.0.0");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(MANIFEST_FILENAME), "{}").unwrap();

    let manifest = PackageManifest::from_dir(&dir).unwrap();
    assert_eq!(manifest.install_name, "local-tool");
    assert_eq!(manifest.version, "3.0.0");
}

#[test]
fn from_dir_without_manifest() {
    let temp = TempDir::new().unwrap();
    let result = PackageManifest::from_dir(temp.path());
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn manifest_serializes_back_to_same_shape() {
    let source = r#"{
        "name": "My Server",
        "install_name": "my-server",
        "version": "1.0.0",
        "install_steps": [{"type": "shell", "command": "make"}],
        "uninstall_steps": [],
        "install_inputs": [{"name": "TOKEN", "type": "string", "secret": true}],
        "ide_config_commands": {"windsurf": {"command": "./server", "args": []}}
    }"#;
    let manifest = PackageManifest::parse(source).unwrap();

    let written = serde_json::to_string(&manifest).unwrap();
    let reparsed = PackageManifest::parse(&written).unwrap();
    assert_eq!(reparsed, manifest);
}
