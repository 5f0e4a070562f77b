//! Test fixtures
//!
//! This module provides generated identifiers and catalog manifests.

#![allow(dead_code)]

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Random identifier with a readable prefix
pub fn unique_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}-{}", prefix, suffix.to_lowercase())
}

/// Asset ids `{prefix}-0` .. `{prefix}-{count - 1}`
pub fn asset_names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{}", prefix, i)).collect()
}

/// Write a catalog manifest into `dir` and return its path
pub fn write_manifest(dir: &Path, collections: &[(&str, &[&str])]) -> PathBuf {
    let manifest: HashMap<&str, &[&str]> = collections.iter().copied().collect();
    let path = dir.join("catalog.json");
    std::fs::write(
        &path,
        serde_json::to_vec_pretty(&manifest).expect("manifest serializes"),
    )
    .expect("manifest written");
    path
}

/// Distinct levels in shuffled order
pub fn shuffled_levels(count: u32) -> Vec<u32> {
    use rand::seq::SliceRandom;

    let mut levels: Vec<u32> = (0..count).collect();
    levels.shuffle(&mut rand::thread_rng());
    levels
}
