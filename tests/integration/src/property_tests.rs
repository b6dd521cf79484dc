//! Cross-crate properties that hold for any input.

use mcpm_core::inputs::ResolvedInputs;
use mcpm_core::substitute::{placeholders, substitute};
use mcpm_core::Error;
use mcpm_meta::{PackageManifest, derive_install_name, is_valid_install_name};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn substitution_round_trip() {
    let values: ResolvedInputs = [("X", "v")].into_iter().collect();
    assert_eq!(substitute("${X}", &values).unwrap(), "v");

    match substitute("${Y}", &ResolvedInputs::new()) {
        Err(Error::UnknownVariable { names }) => assert_eq!(names, vec!["Y".to_string()]),
        other => panic!("expected UnknownVariable, got {other:?}"),
    }
}

proptest! {
    #[test]
    fn any_value_is_inserted_verbatim(value in "\\PC{0,40}") {
        let values: ResolvedInputs = [("X", value.as_str())].into_iter().collect();
        prop_assert_eq!(substitute("pre-${X}-post", &values).unwrap(), format!("pre-{value}-post"));
    }

    #[test]
    fn text_without_dollar_passes_through(text in "[^$]{0,60}") {
        prop_assert_eq!(substitute(&text, &ResolvedInputs::new()).unwrap(), text);
    }
}

#[test]
fn substituted_values_are_not_rescanned() {
    let values: ResolvedInputs = [("A", "${B}"), ("B", "oops")].into_iter().collect();
    assert_eq!(substitute("${A}", &values).unwrap(), "${B}");
}

#[test]
fn manifest_install_name_is_stable_across_reparse() {
    for name in ["My Server", "weather_tool", "  Fancy--Name!! ", "GitHub MCP v2"] {
        let manifest = PackageManifest::parse(
            &serde_json::json!({"name": name, "version": "1.0.0"}).to_string(),
        )
        .unwrap();
        assert!(is_valid_install_name(&manifest.install_name), "{name}");
        assert_eq!(derive_install_name(&manifest.install_name), manifest.install_name);

        let reparsed = PackageManifest::parse(&serde_json::to_string(&manifest).unwrap()).unwrap();
        assert_eq!(reparsed.install_name, manifest.install_name);
    }
}

#[test]
fn placeholders_listed_in_order_of_appearance() {
    assert_eq!(
        placeholders("${B} and ${A} and ${B}"),
        vec!["B".to_string(), "A".to_string()]
    );
}
