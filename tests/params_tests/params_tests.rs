//! Tests for ParameterStore and Config
//!
//! These tests verify:
//! - JSON mapping layout of the parameter file
//! - Save/load and rewrite behavior
//! - Rejection of unusable parameters and configs

use std::fs;

use lhkv::compress::CompressorId;
use lhkv::params::{ParameterStore, Parameters, PARAMETERS_FILENAME};
use lhkv::{Config, LhkvError};
use tempfile::TempDir;

// =============================================================================
// ParameterStore Tests
// =============================================================================

#[test]
fn test_store_path_is_inside_folder() {
    let temp = TempDir::new().unwrap();
    let store = ParameterStore::new(temp.path());

    assert_eq!(store.path(), temp.path().join(PARAMETERS_FILENAME));
    assert!(!store.exists());
}

#[test]
fn test_save_then_load() {
    let temp = TempDir::new().unwrap();
    let store = ParameterStore::new(temp.path());
    let params = Parameters {
        bucket_capacity: 64,
        compressor: CompressorId::Snappy,
        count: 1042,
    };

    store.save(&params).unwrap();

    assert!(store.exists());
    assert_eq!(store.load().unwrap(), params);
}

#[test]
fn test_file_is_a_keyed_mapping() {
    let temp = TempDir::new().unwrap();
    let store = ParameterStore::new(temp.path());
    store.save(&Parameters::new(16, CompressorId::Snappy)).unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();

    assert_eq!(json["bucket_capacity"], 16);
    assert_eq!(json["compressor"], "snappy");
    assert_eq!(json["count"], 0);
}

#[test]
fn test_rewrite_replaces_previous_content() {
    let temp = TempDir::new().unwrap();
    let store = ParameterStore::new(temp.path());
    let mut params = Parameters::new(8, CompressorId::None);

    for count in 0..5 {
        params.count = count;
        store.save(&params).unwrap();
    }

    assert_eq!(store.load().unwrap().count, 4);
    // No temporary file left behind
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn test_load_rejects_zero_capacity() {
    let temp = TempDir::new().unwrap();
    let store = ParameterStore::new(temp.path());
    fs::write(
        store.path(),
        r#"{"bucket_capacity":0,"compressor":"none","count":0}"#,
    )
    .unwrap();

    assert!(matches!(store.load(), Err(LhkvError::Parameters(_))));
}

#[test]
fn test_load_rejects_garbage() {
    let temp = TempDir::new().unwrap();
    let store = ParameterStore::new(temp.path());
    fs::write(store.path(), "bucket_capacity=4").unwrap();

    assert!(matches!(store.load(), Err(LhkvError::Parameters(_))));
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.bucket_capacity, 256);
    assert_eq!(config.compressor, CompressorId::None);
    assert_eq!(config.compaction_percent, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_builder() {
    let config = Config::builder()
        .data_dir("/tmp/dict")
        .bucket_capacity(32)
        .compressor(CompressorId::Snappy)
        .compaction_percent(25)
        .build();

    assert_eq!(config.data_dir, std::path::PathBuf::from("/tmp/dict"));
    assert_eq!(config.bucket_capacity, 32);
    assert_eq!(config.compressor, CompressorId::Snappy);
    assert_eq!(config.compaction_percent, 25);
}

#[test]
fn test_config_rejects_zero_capacity() {
    let config = Config::builder().bucket_capacity(0).build();

    assert!(matches!(config.validate(), Err(LhkvError::Config(_))));
}

#[test]
fn test_config_rejects_zero_compaction_percent() {
    let config = Config::builder().compaction_percent(0).build();

    assert!(matches!(config.validate(), Err(LhkvError::Config(_))));
}
