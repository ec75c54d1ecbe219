use std::fs;
use std::path::PathBuf;

use fieldrules::{FieldRulesError, Index, MemoryBackend, Settings, CURRENT_FORMAT_VERSION};

fn settings_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fieldrules-{}-{name}.toml", std::process::id()));
    fs::write(&path, contents).expect("settings file written");
    path
}

#[test]
fn format_version_defaults_to_current() {
    let path = settings_file("defaults", "schema_path = \"/etc/fieldrules/archive.rules\"\n");
    let settings = Settings::load(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(settings.schema_path, PathBuf::from("/etc/fieldrules/archive.rules"));
    assert_eq!(settings.format_version, CURRENT_FORMAT_VERSION);
    assert_eq!(settings, Settings::new("/etc/fieldrules/archive.rules"));
}

#[test]
fn legacy_format_can_be_selected() {
    let path = settings_file("legacy", "schema_path = \"archive.rules\"\nformat_version = 2\n");
    let settings = Settings::load(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(settings.format_version, 2);

    let index = Index::new("class=od,expver=0001".parse().unwrap(), "BTreeIndex", MemoryBackend::new());
    let bytes = index.encode_with(&settings).unwrap();
    assert_eq!(bytes[..9], [4, 0, 0, 0, 0, 0, 0, 0, 2]);
    let decoded = Index::decode(&bytes, MemoryBackend::new()).unwrap();
    assert_eq!(decoded.timestamp(), 0);
    assert_eq!(decoded.key(), index.key());
}

#[test]
fn schema_path_is_required() {
    let path = settings_file("empty", "format_version = 3\n");
    let result = Settings::load(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(FieldRulesError::Config(_))));
}
