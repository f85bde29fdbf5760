//! Layered virtual filesystem for Hexen II game data
//!
//! Logical asset paths (`maps/town.bsp`, `gfx/pop.lmp`) resolve against an
//! ordered stack of physical sources: plain directories and PAK archives,
//! most-overriding first. While the base installation is bootstrapped, the
//! directory checksums of the archives it ships are compared against the
//! known retail data sets to classify the install as registered, OEM, demo,
//! mission-pack or HexenWorld — and to refuse inconsistent ones.
//!
//! All state lives in one explicitly constructed [`Filesystem`] context:
//!
//! ```no_run
//! use hexen2_fs::{Filesystem, FsConfig};
//!
//! let mut fs = Filesystem::init(FsConfig::new("/usr/share/hexen2"))?;
//! let progs = fs.load("progs.dat")?;
//! # Ok::<(), hexen2_fs::FsError>(())
//! ```

pub mod config;
pub mod edition;
pub mod error;
pub mod filesystem;
pub mod search_path;
mod userdata;

pub use config::{FsConfig, GameVariant};
pub use edition::{EditionFlags, InstallationKind};
pub use error::{FsError, Result};
pub use filesystem::{Filesystem, OpenFile, SearchPathInfo};
pub use search_path::{SearchPath, SearchStack, StackMark};
