//! Test helpers for the hexen2-fs workspace
//!
//! Builds well-formed PAK archives in memory for fixtures, including
//! archives whose directory CRC is forced to an exact value so tests can
//! fabricate data sets matching the shipped fingerprint tables without
//! carrying any real game data.

use pak_format::Crc16;
use pak_format::pak::{ENTRY_NAME_LEN, ENTRY_SIZE, PAK_MAGIC};
use std::io;
use std::path::Path;

const HEADER_SIZE: usize = 12;

/// Builder for PAK archive bytes
///
/// Entries keep insertion order, matching the on-disk directory order the
/// reader preserves.
#[derive(Debug, Default)]
pub struct PakBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl PakBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named entry with the given payload
    #[must_use]
    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        assert!(name.len() < ENTRY_NAME_LEN, "entry name too long: {name}");
        self.entries.push((name.to_string(), data.to_vec()));
        self
    }

    /// Add `count` empty, uniquely named entries
    ///
    /// Used to pad a directory up to a fingerprint table's record count.
    #[must_use]
    pub fn filler(mut self, count: usize) -> Self {
        for i in 0..count {
            self.entries
                .push((format!("filler/{i:04}.dat"), Vec::new()));
        }
        self
    }

    /// Serialize the archive
    pub fn build(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        let mut records = Vec::new();
        for (name, data) in &self.entries {
            let offset = (HEADER_SIZE + payload.len()) as u32;
            payload.extend_from_slice(data);
            records.push((name.as_str(), offset, data.len() as u32));
        }

        let dir_offset = (HEADER_SIZE + payload.len()) as u32;
        let dir_len = (records.len() * ENTRY_SIZE) as u32;

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() + dir_len as usize);
        out.extend_from_slice(&PAK_MAGIC);
        out.extend_from_slice(&dir_offset.to_le_bytes());
        out.extend_from_slice(&dir_len.to_le_bytes());
        out.extend_from_slice(&payload);
        for (name, offset, len) in records {
            let mut field = [0u8; ENTRY_NAME_LEN];
            field[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&field);
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
        }
        out
    }

    /// Serialize the archive with its directory CRC forced to `target`
    ///
    /// Adjusts two NUL-padding bytes in the last entry's name field; the
    /// CRC is affine in its input bits, so exactly one adjustment exists
    /// for any target. Parsing is unaffected because the bytes sit after
    /// the name's terminating NUL. Panics when the builder holds no
    /// entries (there is no directory to force).
    pub fn build_with_checksum(&self, target: u16) -> Vec<u8> {
        assert!(
            !self.entries.is_empty(),
            "cannot force the checksum of an empty directory"
        );
        if let Some((name, _)) = self.entries.last() {
            assert!(
                name.len() <= ENTRY_NAME_LEN - 3,
                "last entry name leaves no padding to adjust: {name}"
            );
        }

        let mut out = self.build();
        let dir_len = self.entries.len() * ENTRY_SIZE;
        let dir_start = out.len() - dir_len;

        // The two sacrificial bytes are the tail of the last record's name
        // field, followed by that record's 8-byte offset/len suffix.
        let tweak = out.len() - 10;

        let mut prefix = Crc16::new();
        prefix.process(&out[dir_start..tweak]);

        let mut suffix = [0u8; 8];
        suffix.copy_from_slice(&out[tweak + 2..]);

        for a in 0..=255u8 {
            for b in 0..=255u8 {
                let mut crc = prefix;
                crc.process_byte(a);
                crc.process_byte(b);
                crc.process(&suffix);
                if crc.value() == target {
                    out[tweak] = a;
                    out[tweak + 1] = b;
                    return out;
                }
            }
        }
        unreachable!("a two-byte adjustment always exists for a 16-bit crc")
    }

    /// Write the archive to disk
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }

    /// Write the archive to disk with its directory CRC forced to `target`
    pub fn write_with_checksum(&self, path: &Path, target: u16) -> io::Result<()> {
        std::fs::write(path, self.build_with_checksum(target))
    }
}
