//! Error types for PAK archive parsing

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PakError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{path} is not a packfile")]
    BadMagic { path: String },

    #[error("{path} has {count} files (maximum is {max})")]
    TooManyFiles {
        path: String,
        count: usize,
        max: usize,
    },

    #[error("Directory out of bounds in {path}: offset={offset}, length={length}, size={size}")]
    BadDirectory {
        path: String,
        offset: u64,
        length: u64,
        size: u64,
    },

    #[error("Read beyond packfile bounds: offset={offset}, length={length}, size={size}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        size: u64,
    },
}

pub type Result<T> = std::result::Result<T, PakError>;
