//! Installed-edition detection from archive fingerprints
//!
//! Raven shipped a small, fixed set of PAK files; each is recognized by its
//! directory record count and directory CRC, looked up by the archive's
//! slot index within its game directory. Evidence accumulates in
//! [`EditionFlags`] while the base install is bootstrapped and is reduced
//! once into an [`InstallationKind`]. A separately verified reference
//! bitmap (`gfx/pop.lmp`) gates the registered classification.

use crate::config::{BASE_GAME, EXPANSION_GAME, NETWORK_GAME};
use crate::error::{FsError, Result};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Conditions detected while loading the base install
    ///
    /// Composed, not mutually exclusive; never reset for the lifetime of
    /// the process.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EditionFlags: u32 {
        /// pak0 of the full 1.11 release is present and unmodified
        const REGISTERED0 = 1 << 0;
        /// pak1 of the full 1.11 release is present and unmodified
        const REGISTERED1 = 1 << 1;
        /// The OEM bundle archive is present
        const OEM = 1 << 2;
        /// The Portal of Praevus archive is present
        const PORTALS = 1 << 3;
        /// The HexenWorld archive is present
        const HEXENWORLD = 1 << 4;
        /// The demo archive is present
        const DEMO = 1 << 5;
        /// Something in the base install does not match any shipped data set
        const MODIFIED = 1 << 6;
        /// Full version confirmed: both registered archives plus the
        /// reference bitmap check
        const REGISTERED = 1 << 7;
    }
}

/// The single authoritative classification derived from [`EditionFlags`]
/// at the end of bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationKind {
    Registered,
    Oem,
    Demo,
}

impl fmt::Display for InstallationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Oem => write!(f, "oem"),
            Self::Demo => write!(f, "demo"),
        }
    }
}

/// One known-good archive fingerprint
struct PakData {
    files: usize,
    crc: u16,
    /// Game directory short-name the archive shipped in
    dir: &'static str,
}

// Fingerprints of the archives as shipped by Raven, by slot index. A
// directory differing from this table is assumed to be hacked. The last
// row is not a slot of its own: it is the demo's pak0, consulted only as
// the slot-0 fallback. The old 1.07 demo (701 files, crc 20870) is not
// supported.
const KNOWN_PAKS: [PakData; 6] = [
    PakData { files: 696, crc: 34289, dir: BASE_GAME },      // pak0, registered
    PakData { files: 523, crc: 2995, dir: BASE_GAME },       // pak1, registered
    PakData { files: 183, crc: 4807, dir: BASE_GAME },       // pak2, oem
    PakData { files: 245, crc: 1478, dir: EXPANSION_GAME },  // pak3, portals
    PakData { files: 102, crc: 41062, dir: NETWORK_GAME },   // pak4, hexenworld
    PakData { files: 797, crc: 22780, dir: BASE_GAME },      // pak0, demo v1.11
];

const DEMO_ROW: usize = KNOWN_PAKS.len() - 1;

// This graphic needs to be in the pak file to use registered features.
// 16x16 pixels, stored big-endian on disk.
pub(crate) const REFERENCE_BITMAP: [u16; 128] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x6600, 0x0000, 0x0000, 0x0000, 0x6600, 0x0000,
    0x0000, 0x0066, 0x0000, 0x0000, 0x0000, 0x0000, 0x0067, 0x0000,
    0x0000, 0x6665, 0x0000, 0x0000, 0x0000, 0x0000, 0x0065, 0x6600,
    0x0063, 0x6561, 0x0000, 0x0000, 0x0000, 0x0000, 0x0061, 0x6563,
    0x0064, 0x6561, 0x0000, 0x0000, 0x0000, 0x0000, 0x0061, 0x6564,
    0x0064, 0x6564, 0x0000, 0x6469, 0x6969, 0x6400, 0x0064, 0x6564,
    0x0063, 0x6568, 0x6200, 0x0064, 0x6864, 0x0000, 0x6268, 0x6563,
    0x0000, 0x6567, 0x6963, 0x0064, 0x6764, 0x0063, 0x6967, 0x6500,
    0x0000, 0x6266, 0x6769, 0x6a68, 0x6768, 0x6a69, 0x6766, 0x6200,
    0x0000, 0x0062, 0x6566, 0x6666, 0x6666, 0x6666, 0x6562, 0x0000,
    0x0000, 0x0000, 0x0062, 0x6364, 0x6664, 0x6362, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0062, 0x6662, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0061, 0x6661, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x6500, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x6400, 0x0000, 0x0000, 0x0000,
];

/// Classify one base-install archive from its slot, owning directory
/// short-name, record count and directory checksum
///
/// First match wins: a wrong location or fingerprint marks the install
/// modified; slot 0 additionally recognizes the demo data set by the
/// fallback row. Archives past the known slots never shipped, so they mark
/// the install modified unconditionally.
pub(crate) fn classify_pack(slot: usize, dir_name: &str, files: usize, crc: u16) -> EditionFlags {
    if slot >= DEMO_ROW {
        return EditionFlags::MODIFIED;
    }

    let known = &KNOWN_PAKS[slot];
    if dir_name != known.dir {
        // Raven didn't ship it there
        return EditionFlags::MODIFIED;
    }

    if files != known.files {
        if slot == 0 {
            let demo = &KNOWN_PAKS[DEMO_ROW];
            if files == demo.files && crc == demo.crc {
                // Both count and crc matched the demo's pak0
                return EditionFlags::DEMO;
            }
        }
        return EditionFlags::MODIFIED;
    }

    if crc != known.crc {
        return EditionFlags::MODIFIED;
    }

    match slot {
        0 => EditionFlags::REGISTERED0,
        1 => EditionFlags::REGISTERED1,
        2 => EditionFlags::OEM,
        3 => EditionFlags::PORTALS,
        4 => EditionFlags::HEXENWORLD,
        _ => EditionFlags::empty(),
    }
}

/// Catch mix-and-match installs right after the registered check
pub(crate) fn check_consistency(flags: EditionFlags) -> Result<()> {
    if flags.contains(EditionFlags::REGISTERED)
        && flags.intersects(EditionFlags::DEMO | EditionFlags::OEM)
    {
        return Err(FsError::Authenticity(
            "Bad Hexen II installation: mixed registered and demo/oem data".into(),
        ));
    }
    if flags.contains(EditionFlags::MODIFIED) && !flags.contains(EditionFlags::REGISTERED) {
        return Err(FsError::Authenticity(
            "You must have the full version of Hexen II to play modified games".into(),
        ));
    }
    Ok(())
}

/// Reduce the accumulated flags into the authoritative installation kind
pub(crate) fn installation_kind(flags: EditionFlags) -> Result<InstallationKind> {
    if flags.contains(EditionFlags::REGISTERED) {
        Ok(InstallationKind::Registered)
    } else if flags.contains(EditionFlags::OEM) {
        Ok(InstallationKind::Oem)
    } else if flags.contains(EditionFlags::DEMO) {
        Ok(InstallationKind::Demo)
    } else {
        // No proper Raven data: it's best to error out here
        Err(FsError::Authenticity(
            "Unable to find a proper Hexen II installation".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_rows_set_exactly_their_flag() {
        let cases = [
            (0, BASE_GAME, 696, 34289, EditionFlags::REGISTERED0),
            (1, BASE_GAME, 523, 2995, EditionFlags::REGISTERED1),
            (2, BASE_GAME, 183, 4807, EditionFlags::OEM),
            (3, EXPANSION_GAME, 245, 1478, EditionFlags::PORTALS),
            (4, NETWORK_GAME, 102, 41062, EditionFlags::HEXENWORLD),
        ];
        for (slot, dir, files, crc, expected) in cases {
            let flags = classify_pack(slot, dir, files, crc);
            assert_eq!(flags, expected, "slot {slot}");
            assert!(!flags.contains(EditionFlags::MODIFIED));
        }
    }

    #[test]
    fn test_demo_fallback_on_slot_zero() {
        assert_eq!(
            classify_pack(0, BASE_GAME, 797, 22780),
            EditionFlags::DEMO
        );
        // Count matches the demo but the crc does not
        assert_eq!(
            classify_pack(0, BASE_GAME, 797, 22781),
            EditionFlags::MODIFIED
        );
        // The fallback only ever applies to slot 0
        assert_eq!(
            classify_pack(1, BASE_GAME, 797, 22780),
            EditionFlags::MODIFIED
        );
    }

    #[test]
    fn test_wrong_location_is_modified() {
        assert_eq!(
            classify_pack(0, "portals", 696, 34289),
            EditionFlags::MODIFIED
        );
        assert_eq!(
            classify_pack(3, BASE_GAME, 245, 1478),
            EditionFlags::MODIFIED
        );
    }

    #[test]
    fn test_wrong_checksum_is_modified() {
        assert_eq!(
            classify_pack(0, BASE_GAME, 696, 34290),
            EditionFlags::MODIFIED
        );
    }

    #[test]
    fn test_wrong_count_is_modified() {
        assert_eq!(
            classify_pack(2, BASE_GAME, 184, 4807),
            EditionFlags::MODIFIED
        );
    }

    #[test]
    fn test_unknown_slot_is_modified() {
        assert_eq!(
            classify_pack(5, BASE_GAME, 696, 34289),
            EditionFlags::MODIFIED
        );
        assert_eq!(
            classify_pack(9, BASE_GAME, 696, 34289),
            EditionFlags::MODIFIED
        );
    }

    #[test]
    fn test_mixed_install_is_inconsistent() {
        let mixed = EditionFlags::REGISTERED | EditionFlags::DEMO;
        assert!(check_consistency(mixed).is_err());
        let mixed = EditionFlags::REGISTERED | EditionFlags::OEM;
        assert!(check_consistency(mixed).is_err());
    }

    #[test]
    fn test_modified_without_registered_is_rejected() {
        assert!(check_consistency(EditionFlags::MODIFIED).is_err());
        assert!(
            check_consistency(EditionFlags::REGISTERED | EditionFlags::MODIFIED).is_ok()
        );
    }

    #[test]
    fn test_kind_reduction() {
        assert_eq!(
            installation_kind(EditionFlags::REGISTERED | EditionFlags::REGISTERED0).ok(),
            Some(InstallationKind::Registered)
        );
        assert_eq!(
            installation_kind(EditionFlags::OEM).ok(),
            Some(InstallationKind::Oem)
        );
        assert_eq!(
            installation_kind(EditionFlags::DEMO).ok(),
            Some(InstallationKind::Demo)
        );
        assert!(installation_kind(EditionFlags::MODIFIED).is_err());
        assert!(installation_kind(EditionFlags::empty()).is_err());
    }
}
