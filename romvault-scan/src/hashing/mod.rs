//! Content hashing
//!
//! Files are streamed in 8 KiB chunks through CRC32, MD5 and SHA1 at once.
//! Each file of an entry gets its own digests, and the entry gets a combined
//! digest over all of its files in entry order. Zip, tar, tar.gz, bz2 and 7z
//! archives are hashed over their decompressed members. The
//! RetroAchievements hash comes from an external helper process and
//! degrades to absent on any failure.

mod archive;
mod rahasher;

pub use rahasher::RaHasher;

use md5::{Digest, Md5};
use romvault_common::models::{FileCategory, RomFile, RomHashes};
use sha1::Sha1;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ScanSettings;
use crate::error::{Result, ScanError};

/// Read buffer size for streaming digests
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Platforms whose content is installers, disc images of modern consoles or
/// folders of executables; hashes are meaningless there and expensive.
pub const NON_HASHABLE_PLATFORMS: &[&str] = &[
    "android",
    "ios",
    "linux",
    "mac",
    "pc",
    "ps3",
    "ps4",
    "ps5",
    "psvita",
    "series-x-s",
    "switch",
    "wiiu",
    "win",
    "xbox360",
    "xboxone",
];

/// CRC32 + MD5 + SHA1 computed in one pass
#[derive(Clone, Default)]
pub struct MultiHasher {
    crc32: crc32fast::Hasher,
    md5: Md5,
    sha1: Sha1,
    bytes: u64,
}

impl MultiHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.crc32.update(chunk);
        self.md5.update(chunk);
        self.sha1.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Hex digests; all absent when no byte was hashed
    pub fn finish(self) -> RomHashes {
        if self.bytes == 0 {
            return RomHashes::default();
        }
        RomHashes {
            crc32: Some(format!("{:08x}", self.crc32.finalize())),
            md5: Some(hex::encode(self.md5.finalize())),
            sha1: Some(hex::encode(self.sha1.finalize())),
            ra: None,
        }
    }
}

/// Stream a reader into the file hasher and the entry hasher
fn stream_into<R: Read>(
    reader: &mut R,
    file: &mut MultiHasher,
    entry: &mut MultiHasher,
) -> io::Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        file.update(&buf[..n]);
        entry.update(&buf[..n]);
    }
}

/// Hash one file, looking inside known archive containers.
///
/// An archive that fails to open or decode is hashed over its raw bytes
/// instead; the entry hasher only receives the bytes of whichever pass
/// succeeded.
fn hash_file(path: &Path, entry: &mut MultiHasher) -> io::Result<RomHashes> {
    if let Some(kind) = archive::ArchiveKind::from_path(path) {
        let mut file_hasher = MultiHasher::new();
        let mut entry_attempt = entry.clone();
        match archive::stream_members(kind, path, &mut |chunk| {
            file_hasher.update(chunk);
            entry_attempt.update(chunk);
        }) {
            Ok(()) => {
                *entry = entry_attempt;
                return Ok(file_hasher.finish());
            }
            Err(archive::ArchiveError::Io(e)) => return Err(e),
            Err(archive::ArchiveError::Invalid(reason)) => {
                debug!(path = %path.display(), archive = ?kind, reason = %reason, "Unreadable archive, hashing raw bytes");
            }
        }
    }

    let mut file_hasher = MultiHasher::new();
    let mut reader = File::open(path)?;
    stream_into(&mut reader, &mut file_hasher, entry)?;
    Ok(file_hasher.finish())
}

/// Hash every file of an entry in place.
///
/// `roms_dir` is the platform roms folder that `RomFile::rel_path` is
/// relative to. Returns the combined entry digest over all files in order.
///
/// # Errors
///
/// `ScanError::Read` when any file cannot be opened or read; digests
/// already written to earlier files are kept.
pub fn hash_files(roms_dir: &Path, files: &mut [RomFile]) -> Result<RomHashes> {
    let mut entry = MultiHasher::new();

    for file in files.iter_mut() {
        let path = roms_dir.join(&file.rel_path);
        let hashes = hash_file(&path, &mut entry).map_err(|e| ScanError::read(&path, e))?;
        file.hashes = RomHashes {
            ra: file.hashes.ra.take(),
            ..hashes
        };
    }

    Ok(entry.finish())
}

/// Result of hashing an entry
#[derive(Debug, Clone)]
pub struct HashOutcome {
    pub files: Vec<RomFile>,
    pub hashes: RomHashes,
    /// Set when the entry's files could not be read
    pub read_error: Option<String>,
}

/// Hashing front-end used by the orchestrator
pub struct HashEngine {
    skip_platforms: HashSet<String>,
    ra: Option<RaHasher>,
}

impl HashEngine {
    /// # Arguments
    ///
    /// * `settings` - scan settings (skip list, helper path)
    /// * `ra_enabled` - whether the RetroAchievements provider is active;
    ///   the helper is never invoked otherwise
    pub fn new(settings: &ScanSettings, ra_enabled: bool) -> Self {
        let skip_platforms = NON_HASHABLE_PLATFORMS
            .iter()
            .map(|s| s.to_string())
            .chain(settings.skip_hash_platforms.iter().cloned())
            .collect();
        let ra = match (&settings.rahasher_path, ra_enabled) {
            (Some(path), true) => Some(RaHasher::new(path.clone())),
            _ => None,
        };
        Self { skip_platforms, ra }
    }

    pub fn should_hash(&self, platform_slug: &str) -> bool {
        !self.skip_platforms.contains(platform_slug)
    }

    /// Hash an entry off the async runtime.
    ///
    /// A read failure is reported in `read_error` rather than as an error so
    /// the entry can continue to name-based matching.
    pub async fn hash_entry(
        &self,
        roms_dir: PathBuf,
        mut files: Vec<RomFile>,
        ra_console: Option<u32>,
    ) -> Result<HashOutcome> {
        let dir = roms_dir.clone();
        let (files, result) = tokio::task::spawn_blocking(move || {
            let result = hash_files(&dir, &mut files);
            (files, result)
        })
        .await
        .map_err(|e| ScanError::Catalog(romvault_common::Error::Internal(e.to_string())))?;

        let (mut hashes, read_error) = match result {
            Ok(hashes) => (hashes, None),
            Err(e) => (RomHashes::default(), Some(e.to_string())),
        };

        if read_error.is_none() {
            if let (Some(ra), Some(console_id)) = (&self.ra, ra_console) {
                if let Some(first) = files.iter().find(|f| f.category == FileCategory::Primary) {
                    hashes.ra = ra.hash(console_id, &roms_dir.join(&first.rel_path)).await;
                }
            }
        }

        Ok(HashOutcome {
            files,
            hashes,
            read_error,
        })
    }
}
