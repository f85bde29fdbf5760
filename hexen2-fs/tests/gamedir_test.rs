//! Runtime game-directory switching

mod common;

use common::{loose_file, mod_dir, oem_install};
use hexen2_fs::{Filesystem, FsConfig, FsError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use test_utils::PakBuilder;

#[test]
fn test_reserved_and_malformed_names_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let base = oem_install(&tmp);
    mod_dir(&base, "mymod");

    let mut fs = Filesystem::init(FsConfig::new(&base)).unwrap();
    fs.set_game_directory("mymod").unwrap();
    let paths_before = fs.search_paths();

    for name in ["hw", "portals", "data1", "../x", "a/b", "a\\b", "c:d", ""] {
        match fs.set_game_directory(name) {
            Err(FsError::Configuration(_)) => {}
            other => panic!("expected rejection of {name:?}, got {other:?}"),
        }
        assert_eq!(fs.game_directory_name(), "mymod", "after {name:?}");
        assert_eq!(fs.search_paths(), paths_before, "after {name:?}");
    }
}

#[test]
fn test_same_name_switch_is_a_noop() {
    let tmp = TempDir::new().unwrap();
    let base = oem_install(&tmp);
    mod_dir(&base, "mymod");

    let mut fs = Filesystem::init(FsConfig::new(&base)).unwrap();
    fs.set_game_directory("mymod").unwrap();
    let paths_before = fs.search_paths();

    fs.set_game_directory("MyMod").unwrap();
    assert_eq!(fs.game_directory_name(), "mymod");
    assert_eq!(fs.search_paths(), paths_before);
}

#[test]
fn test_switch_replaces_previous_game_directory() {
    let tmp = TempDir::new().unwrap();
    let base = oem_install(&tmp);
    let mymod = mod_dir(&base, "mymod");
    PakBuilder::new()
        .file("ui/menu.lmp", b"mymod menu")
        .write_to(&mymod.join("pak0.pak"))
        .unwrap();
    mod_dir(&base, "othermod");

    let mut fs = Filesystem::init(FsConfig::new(&base)).unwrap();
    let base_depth = fs.search_paths().len();

    fs.set_game_directory("mymod").unwrap();
    assert!(
        fs.search_paths()
            .iter()
            .any(|p| p.location.to_string_lossy().contains("mymod"))
    );

    fs.set_game_directory("othermod").unwrap();
    let paths = fs.search_paths();
    assert!(
        paths
            .iter()
            .all(|p| !p.location.to_string_lossy().contains("mymod"))
    );
    // base entries survive every switch
    assert_eq!(paths.iter().filter(|p| p.base).count(), base_depth);
    assert_eq!(fs.game_directory_name(), "othermod");
}

#[test]
fn test_switch_flushes_cached_assets() {
    let tmp = TempDir::new().unwrap();
    let base = oem_install(&tmp);
    let mymod = mod_dir(&base, "mymod");
    loose_file(&mymod, "strings/help.txt", b"mymod help");
    mod_dir(&base, "othermod");

    let mut fs = Filesystem::init(FsConfig::new(&base)).unwrap();
    fs.set_game_directory("mymod").unwrap();
    assert_eq!(fs.load("strings/help.txt").unwrap(), b"mymod help");

    // The previously loaded copy must not survive the switch.
    fs.set_game_directory("othermod").unwrap();
    assert!(matches!(
        fs.load("strings/help.txt"),
        Err(FsError::NotFound(_))
    ));

    fs.set_game_directory("mymod").unwrap();
    assert_eq!(fs.load("strings/help.txt").unwrap(), b"mymod help");
}

#[test]
fn test_switch_marks_non_base_entries() {
    let tmp = TempDir::new().unwrap();
    let base = oem_install(&tmp);
    mod_dir(&base, "mymod");

    let mut fs = Filesystem::init(FsConfig::new(&base)).unwrap();
    assert!(fs.search_paths().iter().all(|p| p.base));

    fs.set_game_directory("mymod").unwrap();
    let paths = fs.search_paths();
    // head entries belong to the mod, tail to the base install
    assert!(!paths[0].base);
    assert!(paths.iter().rev().take_while(|p| p.base).count() > 0);
    for pair in paths.windows(2) {
        assert!(
            !(pair[0].base && !pair[1].base),
            "base entries must sit below all switched entries"
        );
    }
}

#[test]
fn test_switch_creates_user_game_directory() {
    let tmp = TempDir::new().unwrap();
    let base = oem_install(&tmp);
    mod_dir(&base, "mymod");
    let user_root = tmp.path().join("home");
    std::fs::create_dir_all(&user_root).unwrap();

    let mut config = FsConfig::new(&base);
    config.user_dir = Some(user_root.clone());
    let mut fs = Filesystem::init(config).unwrap();

    fs.set_game_directory("mymod").unwrap();
    let user_mod = user_root.join("mymod");
    assert_eq!(fs.user_directory(), user_mod.as_path());
    assert!(user_mod.is_dir());

    // A file dropped into the user tree overrides the mod's own data.
    loose_file(&user_mod, "particles.cfg", b"user tuned");
    assert_eq!(fs.load("particles.cfg").unwrap(), b"user tuned");
}
