//! Filesystem bootstrap configuration
//!
//! The original engine scattered this over command-line parameters and
//! compile-time flavor defines; here it is one explicit struct handed to
//! [`Filesystem::init`](crate::Filesystem::init) once per process.

use std::path::PathBuf;

/// Short name of the game directory holding the base data set
pub const BASE_GAME: &str = "data1";

/// Short name of the Portal of Praevus mission-pack directory
pub const EXPANSION_GAME: &str = "portals";

/// Short name of the HexenWorld data directory
pub const NETWORK_GAME: &str = "hw";

/// Which engine flavor the filesystem serves
///
/// HexenWorld keeps its own data tree stacked above the base install and
/// requires it to be present at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameVariant {
    #[default]
    Hexen2,
    HexenWorld,
}

/// Bootstrap configuration for a [`Filesystem`](crate::Filesystem)
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Base install root: the directory holding `data1`, `portals`, mod
    /// directories and so on
    pub base_dir: PathBuf,

    /// Per-user writable root, when the platform has one distinct from the
    /// install; its subtrees end up with the highest resolution priority
    /// and receive generated files
    pub user_dir: Option<PathBuf>,

    /// Engine flavor
    pub variant: GameVariant,

    /// Try to enable the mission pack during bootstrap; silently backed
    /// out again if the expansion data is missing or not genuine
    pub expansion: bool,

    /// Initial mod directory to activate after bootstrap, as from a
    /// `-game` argument; requires a registered install
    pub game: Option<String>,
}

impl FsConfig {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            user_dir: None,
            variant: GameVariant::default(),
            expansion: false,
            game: None,
        }
    }
}
