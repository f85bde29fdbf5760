//! Error types for filesystem operations
//!
//! Only [`FsError::Authenticity`] is fatal by contract: it reports a
//! corrupted or illegitimate installation and the embedding process is
//! expected to abort on it. Everything else degrades: `NotFound` is a
//! normal miss, `Configuration` is a rejected directory-switch request, and
//! IO problems make the affected source count as absent.

use pak_format::PakError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Packfile error: {0}")]
    Pak(#[from] PakError),

    #[error("{0}")]
    Authenticity(String),

    #[error("Invalid game directory: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, FsError>;
