//! Quake-style PAK archive reading for Hexen II data files
//!
//! A PAK file bundles many named byte ranges behind a single on-disk
//! directory. This crate parses that directory into memory, computes the
//! CRC-16 fingerprint of its raw bytes (used upstream to recognize the
//! shipped data sets), and serves bounds-checked reads of individual
//! entries out of the open archive.

pub mod crc;
pub mod error;
pub mod pak;

pub use crc::Crc16;
pub use error::{PakError, Result};
pub use pak::{MAX_FILES_IN_PACK, PakEntry, PakFile, PakSection};
