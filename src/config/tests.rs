#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

const ROOT: &str = r#"
[general]
language = "rust"
specification-format = "protobuf"
template-dir = "templates/rust"

[source]
descriptor-set = "protos.binpb"
include-comments = "true"

[codec]
wkt-crate = "wkt"
"#;

const DIR: &str = r#"
[general]
specification-source = "google/cloud/secretmanager/v1"
service-config = "google/cloud/secretmanager/v1/secretmanager_v1.yaml"

[source]
descriptor-set = "secretmanager.binpb"

[codec]
package-name-override = "secretmanager"
"#;

#[test]
fn test_parse_kebab_case_keys() {
    let config = Config::from_toml(ROOT).unwrap();
    assert_eq!(config.general.language, Some(Language::Rust));
    assert_eq!(
        config.general.specification_format,
        Some(SpecificationFormat::Protobuf)
    );
    assert_eq!(config.general.template_dir.as_deref(), Some("templates/rust"));
    assert_eq!(config.source["descriptor-set"], "protos.binpb");
}

#[test]
fn test_unknown_language_is_rejected() {
    assert!(Config::from_toml("[general]\nlanguage = \"cobol\"\n").is_err());
}

#[test]
fn test_merge_inherits_and_overrides() {
    let root = Config::from_toml(ROOT).unwrap();
    let dir = Config::from_toml(DIR).unwrap();
    let merged = dir.merged_over(&root);

    assert_eq!(merged.general.language, Some(Language::Rust));
    assert_eq!(
        merged.general.specification_source.as_deref(),
        Some("google/cloud/secretmanager/v1")
    );
    assert_eq!(merged.source["descriptor-set"], "secretmanager.binpb");
    assert_eq!(merged.source["include-comments"], "true");
    assert_eq!(merged.codec["wkt-crate"], "wkt");
    assert_eq!(merged.codec["package-name-override"], "secretmanager");
}

#[test]
fn test_resolve_requires_source() {
    let root = Config::from_toml(ROOT).unwrap();
    assert!(matches!(
        root.resolve(Path::new("/project")),
        Err(ConfigError::Missing("specification-source"))
    ));
}

#[test]
fn test_resolve_joins_paths() {
    let merged = Config::from_toml(DIR)
        .unwrap()
        .merged_over(&Config::from_toml(ROOT).unwrap());
    let resolved = merged.resolve(Path::new("/project")).unwrap();
    assert_eq!(resolved.template_dir, PathBuf::from("/project/templates/rust"));
    assert_eq!(
        resolved.service_config,
        Some(PathBuf::from(
            "/project/google/cloud/secretmanager/v1/secretmanager_v1.yaml"
        ))
    );
}

#[test]
fn test_resolve_default_template_dir() {
    let config = Config::from_toml(
        "[general]\nlanguage = \"rust\"\nspecification-format = \"openapi\"\nspecification-source = \"api.yaml\"\n",
    )
    .unwrap();
    let resolved = config.resolve(Path::new("/p")).unwrap();
    assert_eq!(resolved.template_dir, PathBuf::from("/p/templates/rust"));
    assert_eq!(resolved.service_config, None);
}

#[test]
fn test_load_missing_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load_dir(dir.path()).unwrap().is_none());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let merged = Config::from_toml(DIR)
        .unwrap()
        .merged_over(&Config::from_toml(ROOT).unwrap());
    merged.save(&dir.path().join(CONFIG_FILE)).unwrap();
    assert_eq!(Config::load_dir(dir.path()).unwrap(), Some(merged));
}

#[test]
fn test_load_reports_path_on_syntax_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    std::fs::write(&path, "[general\n").unwrap();
    match Config::load(&path) {
        Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result {other:?}"),
    }
}
