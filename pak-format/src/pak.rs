//! PAK archive parsing and entry access
//!
//! The on-disk layout is fixed: a 12-byte header (the `PACK` magic followed
//! by two little-endian u32s giving the directory's byte offset and byte
//! length), then anywhere in the file a directory of 64-byte records, each
//! a 56-byte NUL-padded name plus little-endian u32 offset and length.

use crate::crc::Crc16;
use crate::error::{PakError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Magic literal opening every packfile
pub const PAK_MAGIC: [u8; 4] = *b"PACK";

/// Fixed width of an entry's name field, including NUL padding
pub const ENTRY_NAME_LEN: usize = 56;

/// On-disk size of one directory record
pub const ENTRY_SIZE: usize = ENTRY_NAME_LEN + 8;

/// Upper bound on directory records; anything past this is treated as a
/// corrupt or hostile file rather than an allocation request
pub const MAX_FILES_IN_PACK: usize = 2048;

// Limit mmap to 2GB files; real PAK files top out far below that.
const MMAP_LIMIT: u64 = 2_147_483_648;

/// One named byte range inside a packfile
///
/// Offsets and lengths are normalized to host order at load time. Names are
/// copied verbatim from the directory and are NOT checked for path
/// separators; callers resolving them against a real filesystem must not
/// trust them blindly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakEntry {
    pub name: String,
    pub offset: u32,
    pub len: u32,
}

/// An opened packfile: its directory in insertion (on-disk) order plus the
/// CRC-16 of the raw directory bytes
pub struct PakFile {
    path: PathBuf,
    file: File,
    mmap: Option<Mmap>,
    size: u64,
    entries: Vec<PakEntry>,
    crc: u16,
}

/// A section of a packfile that can be read and seeked independently
#[derive(Debug)]
pub struct PakSection {
    data: Cursor<Vec<u8>>,
}

impl PakSection {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
        }
    }

    pub fn len(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }
}

impl Read for PakSection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for PakSection {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.data.seek(pos)
    }
}

impl PakFile {
    /// Open a packfile and parse its directory
    ///
    /// A missing file surfaces as `PakError::Io`; callers normally treat
    /// that as "archive absent". Malformed headers and oversized
    /// directories are format errors fatal to this archive only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let mut reader = BufReader::new(&file);
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != PAK_MAGIC {
            return Err(PakError::BadMagic {
                path: path.display().to_string(),
            });
        }

        let dir_offset = reader.read_u32::<LittleEndian>()?;
        let dir_len = reader.read_u32::<LittleEndian>()?;

        let count = dir_len as usize / ENTRY_SIZE;
        if count > MAX_FILES_IN_PACK {
            return Err(PakError::TooManyFiles {
                path: path.display().to_string(),
                count,
                max: MAX_FILES_IN_PACK,
            });
        }
        if u64::from(dir_offset) + u64::from(dir_len) > size {
            return Err(PakError::BadDirectory {
                path: path.display().to_string(),
                offset: u64::from(dir_offset),
                length: u64::from(dir_len),
                size,
            });
        }

        // Pull the raw directory in one read; the checksum is defined over
        // these exact bytes, before any host-order normalization.
        reader.seek(SeekFrom::Start(u64::from(dir_offset)))?;
        let mut directory = vec![0u8; dir_len as usize];
        reader.read_exact(&mut directory)?;

        let mut crc = Crc16::new();
        for &byte in &directory {
            crc.process_byte(byte);
        }
        let crc = crc.value();

        let mut entries = Vec::with_capacity(count);
        let mut cursor = Cursor::new(directory.as_slice());
        for _ in 0..count {
            let mut name = [0u8; ENTRY_NAME_LEN];
            cursor.read_exact(&mut name)?;
            let offset = cursor.read_u32::<LittleEndian>()?;
            let len = cursor.read_u32::<LittleEndian>()?;
            entries.push(PakEntry {
                name: bounded_name(&name),
                offset,
                len,
            });
        }

        debug!("Packfile directory crc: {:04x} ({} records)", crc, count);

        let mmap = if size > 0 && size < MMAP_LIMIT {
            match unsafe { MmapOptions::new().map(&file) } {
                Ok(mmap) => Some(mmap),
                Err(e) => {
                    debug!("Failed to memory-map {}, using file reads: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        info!("Added packfile {} ({} files)", path.display(), count);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap,
            size,
            entries,
            crc,
        })
    }

    /// Path this packfile was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// CRC-16 of the raw directory bytes
    pub fn checksum(&self) -> u16 {
        self.crc
    }

    /// Directory records in on-disk order
    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    /// Number of directory records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total size of the packfile on disk
    pub fn file_size(&self) -> u64 {
        self.size
    }

    /// Case-insensitive linear scan for an exact name match
    ///
    /// The directory is kept in on-disk order (it is not sorted), so this
    /// returns the first record carrying the name.
    pub fn find(&self, name: &str) -> Option<&PakEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Read an arbitrary byte range out of the packfile
    pub fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        if offset + length as u64 > self.size {
            return Err(PakError::OutOfBounds {
                offset,
                length: length as u64,
                size: self.size,
            });
        }

        if let Some(ref mmap) = self.mmap {
            // Fast path: memory-mapped access
            let data = &mmap[offset as usize..(offset as usize + length)];
            Ok(data.to_vec())
        } else {
            // Slow path: positioned read through a borrowed handle
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            let mut buffer = vec![0u8; length];
            file.read_exact(&mut buffer)?;
            Ok(buffer)
        }
    }

    /// Read the byte range recorded for a directory entry
    pub fn read_entry(&self, entry: &PakEntry) -> Result<Vec<u8>> {
        self.read_at(u64::from(entry.offset), entry.len as usize)
    }

    /// Open a seekable reader scoped to an entry's byte range
    pub fn open_entry(&self, entry: &PakEntry) -> Result<PakSection> {
        Ok(PakSection::new(self.read_entry(entry)?))
    }
}

impl std::fmt::Debug for PakFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakFile")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .field("crc", &self.crc)
            .finish_non_exhaustive()
    }
}

/// Copy a fixed-width NUL-padded name field out of a directory record
fn bounded_name(raw: &[u8; ENTRY_NAME_LEN]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
