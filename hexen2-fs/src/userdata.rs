//! One-time relocation of legacy user data
//!
//! Older releases kept all user data directly in the user root instead of
//! under `<user root>/data1`. The relocation runs once, gated by the mere
//! existence of a marker file in the user directory; the marker doubles as
//! the move log. Individual failures are logged and skipped, never fatal.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Marker file recording that the relocation has completed
pub(crate) const MOVE_MARKER: &str = "userdata.moved";

const MAX_SAVEGAMES: usize = 12;

const MOVE_EXTENSIONS: [&str; 3] = ["cfg", "rc", "dem"];

// These are highly unlikely to sit loose in the user root, but just in
// case.
const MOVE_DIRS: [&str; 8] = [
    "quick", "shots", "glhexen", "maps", "midi", "sound", "models", "gfx",
];

/// Move legacy user data from `user_root` into `user_dir`
///
/// No-op once the marker file exists; its content is never inspected.
pub(crate) fn migrate_user_data(user_root: &Path, user_dir: &Path) -> io::Result<()> {
    let marker = user_dir.join(MOVE_MARKER);
    if marker.is_file() {
        // the data should have already been moved in earlier runs
        return Ok(());
    }
    let mut log = File::create(&marker)?;

    info!(
        "Moving user data from {} to {}",
        user_root.display(),
        user_dir.display()
    );

    for entry in fs::read_dir(user_root)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if should_move_file(name) {
            move_item(&path, &user_dir.join(name), &mut log);
        }
    }

    // the savegames, single- and multiplayer
    for i in 0..MAX_SAVEGAMES {
        for dir in [format!("s{i}"), format!("ms{i}")] {
            let from = user_root.join(&dir);
            if from.is_dir() {
                move_item(&from, &user_dir.join(&dir), &mut log);
            }
        }
    }

    for dir in MOVE_DIRS {
        let from = user_root.join(dir);
        if from.is_dir() {
            move_item(&from, &user_dir.join(dir), &mut log);
        }
    }

    Ok(())
}

/// Config files, pre-recorded demos and pak files move; everything else
/// stays put
fn should_move_file(name: &str) -> bool {
    if let Some((_, extension)) = name.rsplit_once('.') {
        if MOVE_EXTENSIONS.contains(&extension) {
            return true;
        }
    }
    // pak?.pak
    name.len() == 8 && name.starts_with("pak") && name.ends_with(".pak")
}

fn move_item(from: &Path, to: &Path, log: &mut File) {
    match fs::rename(from, to) {
        Ok(()) => {
            debug!("{} -> {} : OK", from.display(), to.display());
            let _ = writeln!(log, "{} -> {} : OK", from.display(), to.display());
        }
        Err(e) => {
            warn!("{} -> {} : Failed ({e})", from.display(), to.display());
            let _ = writeln!(log, "{} -> {} : Failed ({e})", from.display(), to.display());
        }
    }
}
