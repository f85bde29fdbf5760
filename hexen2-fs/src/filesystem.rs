//! The filesystem context: bootstrap, directory switching and resolution
//!
//! All of the game's data access goes through a hierarchical file system
//! whose contents are transparently merged from several sources: the base
//! install tree, optional expansion and HexenWorld trees, the per-user
//! writable tree, and whatever mod directory is currently active. Sources
//! are consulted most-overriding first, and a loose file always overrides
//! a same-named entry packed inside one of its own directory's archives.

use crate::config::{BASE_GAME, EXPANSION_GAME, FsConfig, GameVariant, NETWORK_GAME};
use crate::edition::{self, EditionFlags, InstallationKind, REFERENCE_BITMAP};
use crate::error::{FsError, Result};
use crate::search_path::{SearchPath, SearchStack, StackMark};
use crate::userdata;
use byteorder::{BigEndian, ReadBytesExt};
use lru::LruCache;
use pak_format::{PakError, PakFile, PakSection};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Pak slots probed per game directory (`pak0.pak` .. `pak9.pak`)
const MAX_PAKS_PER_DIR: usize = 10;

/// Cap on names returned by [`Filesystem::list_maps`]
const MAX_MAP_LIST: usize = 256;

const ASSET_CACHE_ENTRIES: usize = 256;

/// A readable, seekable stream positioned at a resolved file
///
/// Backed either by a loose file opened from a directory or by a window
/// copied out of an open archive, so an in-flight reader stays valid even
/// while the stack is rebuilt underneath it. Dropping it releases the
/// handle.
#[derive(Debug)]
pub struct OpenFile {
    source: FileSource,
    len: u64,
    from_pack: bool,
}

#[derive(Debug)]
enum FileSource {
    Loose(File),
    Pack(PakSection),
}

impl OpenFile {
    /// Length of the resolved file in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the file was resolved from inside an archive rather than
    /// opened loose from a directory
    pub fn from_pack(&self) -> bool {
        self.from_pack
    }
}

impl Read for OpenFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            FileSource::Loose(file) => file.read(buf),
            FileSource::Pack(section) => section.read(buf),
        }
    }
}

impl Seek for OpenFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.source {
            FileSource::Loose(file) => file.seek(pos),
            FileSource::Pack(section) => section.seek(pos),
        }
    }
}

/// Diagnostic view of one active search-path entry, highest priority first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPathInfo {
    /// Directory path, or the packfile's own path for archive entries
    pub location: PathBuf,
    /// Directory record count when the entry is a packfile
    pub pack_files: Option<usize>,
    /// Entry belongs to the base install and survives directory switches
    pub base: bool,
}

/// The filesystem context
///
/// Owns the search-path stack, every open archive handle, the edition
/// flags and the loaded-asset cache. Constructed once per process by
/// [`Filesystem::init`]; single-threaded by design, with all mutation
/// behind `&mut self`.
#[derive(Debug)]
pub struct Filesystem {
    base_dir: PathBuf,
    user_root: Option<PathBuf>,
    variant: GameVariant,
    stack: SearchStack,
    base_mark: StackMark,
    flags: EditionFlags,
    kind: InstallationKind,
    game_dir: PathBuf,
    game_dir_name: String,
    user_dir: PathBuf,
    cache: LruCache<String, Vec<u8>>,
}

impl Filesystem {
    /// Bootstrap the filesystem against a base install
    ///
    /// Establishes the base search path from `data1` (plus expansion,
    /// HexenWorld and per-user trees as configured), classifies the
    /// installed data set, and refuses corrupt or inconsistent installs
    /// with [`FsError::Authenticity`] — callers are expected to treat that
    /// as fatal to the process.
    pub fn init(config: FsConfig) -> Result<Self> {
        let FsConfig {
            base_dir,
            user_dir: user_root,
            variant,
            expansion,
            game,
        } = config;

        let cache_entries = NonZeroUsize::new(ASSET_CACHE_ENTRIES)
            .unwrap_or(NonZeroUsize::MIN);

        let mut fs = Self {
            game_dir: base_dir.join(BASE_GAME),
            user_dir: base_dir.join(BASE_GAME),
            base_dir,
            user_root,
            variant,
            stack: SearchStack::new(),
            base_mark: StackMark(0),
            flags: EditionFlags::empty(),
            // placeholder until the flags are reduced below
            kind: InstallationKind::Demo,
            game_dir_name: BASE_GAME.to_string(),
            cache: LruCache::new(cache_entries),
        };

        // Start up with data1 by default. The per-user tree is prepared
        // first so legacy user data gets relocated before anything reads
        // through it.
        if let Some(root) = fs.user_root.clone() {
            let user_dir = root.join(BASE_GAME);
            match std::fs::create_dir_all(&user_dir) {
                Ok(()) => {
                    if let Err(e) = userdata::migrate_user_data(&root, &user_dir) {
                        warn!("User data migration failed: {e}");
                    }
                }
                Err(e) => warn!("Cannot create {}: {e}", user_dir.display()),
            }
        }

        let base_data = fs.base_dir.join(BASE_GAME);
        fs.add_game_directory(&base_data, true);

        // Check if we are playing the registered version, then for
        // mix'n'match screw-ups.
        fs.check_registered()?;
        edition::check_consistency(fs.flags)?;

        if expansion && fs.flags.contains(EditionFlags::REGISTERED) {
            fs.add_expansion();
        }

        if fs.variant == GameVariant::HexenWorld {
            let dir = fs.base_dir.join(NETWORK_GAME);
            fs.add_game_directory(&dir, true);
            if !fs.flags.contains(EditionFlags::HEXENWORLD) {
                return Err(FsError::Authenticity(
                    "You must have the HexenWorld data installed".into(),
                ));
            }
        }

        // This is the end of the base search path: any game directories
        // set later are freed back to here upon the next switch.
        fs.base_mark = fs.stack.mark();

        if let Some(game) = game {
            if !fs.flags.contains(EditionFlags::REGISTERED) {
                // only registered versions can do -game
                return Err(FsError::Authenticity(
                    "You must have the full version of Hexen II to play modified games".into(),
                ));
            }
            match fs.set_game_directory(&game) {
                Err(FsError::Configuration(_)) => {}
                other => other?,
            }
        }

        fs.kind = edition::installation_kind(fs.flags)?;
        info!("Playing {} version", fs.kind);
        Ok(fs)
    }

    /// Switch the active game directory at runtime
    ///
    /// `name` must be a single path segment; the short names established
    /// during bootstrap (`data1`, `portals`, `hw`) can never be set
    /// through this path. Rejected requests leave the stack and the
    /// current directory untouched. A successful switch tears every
    /// non-base source down, flushes the asset cache, and rebuilds the
    /// pack-then-directory-then-user sequence for the new directory.
    pub fn set_game_directory(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\', ':']) || name.contains("..") {
            warn!("Gamedir should be a single directory name, not a path: {name:?}");
            return Err(FsError::Configuration(name.to_string()));
        }

        if name.eq_ignore_ascii_case(&self.game_dir_name) {
            return Ok(()); // still the same
        }

        if name.eq_ignore_ascii_case(NETWORK_GAME) {
            if self.variant == GameVariant::Hexen2 {
                warn!("Gamedir not set to hw: it is reserved for HexenWorld");
            }
            return Err(FsError::Configuration(name.to_string()));
        }
        if name.eq_ignore_ascii_case(EXPANSION_GAME) || name.eq_ignore_ascii_case(BASE_GAME) {
            // only ever established during bootstrap
            return Err(FsError::Configuration(name.to_string()));
        }

        // Free up the current game dir info and force everything loaded
        // through it to be fetched again.
        self.stack.truncate_to(self.base_mark);
        self.flush_cache();

        let dir = self.base_dir.join(name);
        self.add_game_directory(&dir, false);
        info!("Game directory set to {}", dir.display());
        Ok(())
    }

    /// Resolve a logical name and open it for reading
    ///
    /// Walks the stack most-overriding first: directory entries try the
    /// file directly, archive entries scan their directory table
    /// case-insensitively. The first match wins. Unreadable sources count
    /// as absent; a miss across the whole stack is the normal
    /// [`FsError::NotFound`].
    pub fn open(&self, name: &str) -> Result<OpenFile> {
        for entry in self.stack.iter() {
            match entry {
                SearchPath::Pack(pak) => {
                    if let Some(found) = pak.find(name) {
                        trace!("PackFile: {} : {}", pak.path().display(), name);
                        let section = pak.open_entry(found)?;
                        return Ok(OpenFile {
                            len: section.len(),
                            from_pack: true,
                            source: FileSource::Pack(section),
                        });
                    }
                }
                SearchPath::Directory(dir) => {
                    let path = dir.join(name);
                    let Ok(file) = File::open(&path) else { continue };
                    let Ok(meta) = file.metadata() else { continue };
                    trace!("FindFile: {}", path.display());
                    return Ok(OpenFile {
                        len: meta.len(),
                        from_pack: false,
                        source: FileSource::Loose(file),
                    });
                }
            }
        }
        Err(FsError::NotFound(name.to_string()))
    }

    /// Whether a logical name resolves anywhere in the stack
    pub fn exists(&self, name: &str) -> bool {
        self.stack.iter().any(|entry| match entry {
            SearchPath::Pack(pak) => pak.find(name).is_some(),
            SearchPath::Directory(dir) => dir.join(name).is_file(),
        })
    }

    /// Resolve a logical name and read it whole, through the asset cache
    ///
    /// The cache is keyed case-insensitively, matching archive lookup
    /// semantics, and is flushed on every game-directory switch.
    pub fn load(&mut self, name: &str) -> Result<Vec<u8>> {
        let key = name.to_ascii_lowercase();
        if let Some(data) = self.cache.get(&key) {
            trace!("Cache hit for {name}");
            return Ok(data.clone());
        }

        let mut file = self.open(name)?;
        let mut data = Vec::with_capacity(file.len() as usize);
        file.read_to_end(&mut data)?;
        self.cache.put(key, data.clone());
        Ok(data)
    }

    /// Full path of the currently active game directory
    pub fn current_game_directory(&self) -> &Path {
        &self.game_dir
    }

    /// Short name of the currently active game directory
    pub fn game_directory_name(&self) -> &str {
        &self.game_dir_name
    }

    /// Directory that generated files (saves, configs, screenshots) go to
    pub fn user_directory(&self) -> &Path {
        &self.user_dir
    }

    /// The authoritative classification settled at the end of bootstrap
    pub fn installation_kind(&self) -> InstallationKind {
        self.kind
    }

    /// Raw edition evidence accumulated during bootstrap
    pub fn edition_flags(&self) -> EditionFlags {
        self.flags
    }

    /// Enumerate the active search path, highest priority first
    pub fn search_paths(&self) -> Vec<SearchPathInfo> {
        let total = self.stack.len();
        self.stack
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let base = i >= total - self.base_mark.0;
                match entry {
                    SearchPath::Pack(pak) => SearchPathInfo {
                        location: pak.path().to_path_buf(),
                        pack_files: Some(pak.len()),
                        base,
                    },
                    SearchPath::Directory(dir) => SearchPathInfo {
                        location: dir.clone(),
                        pack_files: None,
                        base,
                    },
                }
            })
            .collect()
    }

    /// List map names across the whole stack
    ///
    /// Collects `maps/*.bsp` from every source, filters by
    /// case-insensitive prefix (empty matches everything), strips the
    /// extension, deduplicates case-insensitively and sorts. Capped at
    /// 256 names.
    pub fn list_maps(&self, prefix: &str) -> Vec<String> {
        let mut maps: Vec<String> = Vec::new();

        'search: for entry in self.stack.iter() {
            match entry {
                SearchPath::Pack(pak) => {
                    for record in pak.entries() {
                        let Some(name) = record.name.strip_prefix("maps/") else {
                            continue;
                        };
                        if !add_map_name(&mut maps, name, prefix) {
                            break 'search;
                        }
                    }
                }
                SearchPath::Directory(dir) => {
                    let Ok(entries) = std::fs::read_dir(dir.join("maps")) else {
                        continue;
                    };
                    for entry in entries.flatten() {
                        let path = entry.path();
                        if !path.is_file() {
                            continue;
                        }
                        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                            continue;
                        };
                        if !add_map_name(&mut maps, name, prefix) {
                            break 'search;
                        }
                    }
                }
            }
        }

        maps.sort_unstable();
        maps
    }

    /// Set the game directory and add its sources to the head of the
    /// path: pak0..pak9 in order (so later indices override earlier
    /// ones), then the directory itself, then the same again for the
    /// per-user tree, which ends up on top of everything
    fn add_game_directory(&mut self, dir: &Path, base: bool) {
        let short = short_name(dir);
        self.game_dir = dir.to_path_buf();
        self.game_dir_name = short.clone();
        self.user_dir = match &self.user_root {
            Some(root) => {
                let user = root.join(&short);
                if let Err(e) = std::fs::create_dir_all(&user) {
                    warn!("Cannot create {}: {e}", user.display());
                }
                user
            }
            None => dir.to_path_buf(),
        };

        let mut roots = vec![dir.to_path_buf()];
        if self.user_dir != *dir {
            roots.push(self.user_dir.clone());
        }

        for root in roots {
            for slot in 0..MAX_PAKS_PER_DIR {
                let pakfile = root.join(format!("pak{slot}.pak"));
                let pak = match PakFile::open(&pakfile) {
                    Ok(pak) => pak,
                    Err(PakError::Io(e)) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        // fatal to this archive only
                        warn!("Skipping {}: {e}", pakfile.display());
                        continue;
                    }
                };
                if base {
                    self.flags |=
                        edition::classify_pack(slot, &short, pak.len(), pak.checksum());
                }
                self.stack.push(SearchPath::Pack(pak));
            }
            // The directory goes in above its own pakfiles, so a loose
            // data1/default.cfg is opened instead of
            // data1/pak0.pak:/default.cfg.
            self.stack.push(SearchPath::Directory(root));
        }
    }

    /// Verify the reference bitmap and settle the registered flag
    ///
    /// Runs against the populated base stack. A missing resource just
    /// means "not registered"; a present-but-wrong one is tampering, and
    /// a present-and-right one demands both registered archives.
    fn check_registered(&mut self) -> Result<()> {
        let mut file = match self.open("gfx/pop.lmp") {
            Ok(file) => file,
            Err(FsError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        for &expected in &REFERENCE_BITMAP {
            let pixel = file
                .read_u16::<BigEndian>()
                .map_err(|_| FsError::Authenticity("Corrupted data file".into()))?;
            if pixel != expected {
                return Err(FsError::Authenticity("Corrupted data file".into()));
            }
        }

        // check for the 1.11 versions of pak0.pak and pak1.pak
        if !self.flags.contains(EditionFlags::REGISTERED0)
            || !self.flags.contains(EditionFlags::REGISTERED1)
        {
            return Err(FsError::Authenticity(
                "You must patch your installation with Raven's 1.11 update".into(),
            ));
        }

        self.flags |= EditionFlags::REGISTERED;
        Ok(())
    }

    /// Speculatively add the mission-pack tree; backed out completely if
    /// its data does not check out
    fn add_expansion(&mut self) {
        let mark = self.stack.mark();
        let saved_flags = self.flags;
        let prev_game = self.game_dir.clone();
        let prev_name = self.game_dir_name.clone();
        let prev_user = self.user_dir.clone();

        let dir = self.base_dir.join(EXPANSION_GAME);
        self.add_game_directory(&dir, true);

        if !self.flags.contains(EditionFlags::PORTALS) {
            warn!("Missing or invalid mission pack installation");
            self.stack.truncate_to(mark);
            self.flags = saved_flags;
            self.game_dir = prev_game;
            self.game_dir_name = prev_name;
            self.user_dir = prev_user;
        }
    }

    fn flush_cache(&mut self) {
        self.cache.clear();
        debug!("Flushed asset cache");
    }
}

fn short_name(dir: &Path) -> String {
    dir.file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Push one `maps/` candidate through prefix filter, extension check and
/// dedup; false once the list cap is hit
fn add_map_name(maps: &mut Vec<String>, file_name: &str, prefix: &str) -> bool {
    if maps.len() >= MAX_MAP_LIST {
        warn!("Reached maximum number of maps to list");
        return false;
    }
    if !prefix.is_empty() && !has_prefix_ignore_case(file_name, prefix) {
        return true;
    }
    let Some(stem) = file_name.strip_suffix(".bsp") else {
        return true;
    };
    if stem.is_empty() {
        return true;
    }
    if maps.iter().any(|m| m.eq_ignore_ascii_case(stem)) {
        return true; // duplicated name
    }
    maps.push(stem.to_string());
    true
}

fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
