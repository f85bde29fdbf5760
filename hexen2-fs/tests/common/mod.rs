//! Shared install fixtures for integration tests
//!
//! Fabricates minimal installs whose archives match the shipped
//! fingerprint rows, so bootstrap classifies them without any real game
//! data on disk.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_utils::PakBuilder;

/// Route engine logging through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Lay out `<tmp>/game/data1` holding the OEM archive fingerprint
pub fn oem_install(tmp: &TempDir) -> PathBuf {
    init_tracing();
    let base = tmp.path().join("game");
    let data1 = base.join("data1");
    std::fs::create_dir_all(&data1).unwrap();
    PakBuilder::new()
        .filler(183)
        .write_with_checksum(&data1.join("pak2.pak"), 4807)
        .unwrap();
    base
}

/// Lay out `<tmp>/game/data1` holding the demo archive fingerprint
pub fn demo_install(tmp: &TempDir) -> PathBuf {
    init_tracing();
    let base = tmp.path().join("game");
    let data1 = base.join("data1");
    std::fs::create_dir_all(&data1).unwrap();
    PakBuilder::new()
        .filler(797)
        .write_with_checksum(&data1.join("pak0.pak"), 22780)
        .unwrap();
    base
}

/// Create an empty mod directory under the base install
pub fn mod_dir(base: &Path, name: &str) -> PathBuf {
    let dir = base.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a loose file, creating parent directories as needed
pub fn loose_file(dir: &Path, name: &str, data: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}
