//! Archive member streaming
//!
//! Containers are recognized by extension. Each reader feeds the
//! decompressed bytes of every regular member, in archive order, to a sink.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::CHUNK_SIZE;

pub(super) enum ArchiveError {
    /// File could not be opened at all
    Io(io::Error),
    /// Not a readable archive; caller hashes raw bytes
    Invalid(String),
}

impl ArchiveError {
    fn invalid(err: impl std::fmt::Display) -> Self {
        ArchiveError::Invalid(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ArchiveKind {
    Zip,
    Tar,
    /// Gzip-compressed tarball
    TarGz,
    Bzip2,
    SevenZip,
}

impl ArchiveKind {
    pub(super) fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "tar" => Some(Self::Tar),
            "gz" | "tgz" => Some(Self::TarGz),
            "bz2" => Some(Self::Bzip2),
            "7z" => Some(Self::SevenZip),
            _ => None,
        }
    }
}

/// Copy a reader into the sink chunk by chunk
fn pump(reader: &mut dyn Read, sink: &mut dyn FnMut(&[u8])) -> io::Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        sink(&buf[..n]);
    }
}

/// Feed the decompressed bytes of every file member, in archive order
pub(super) fn stream_members(
    kind: ArchiveKind,
    path: &Path,
    sink: &mut dyn FnMut(&[u8]),
) -> Result<(), ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::Io)?;
    match kind {
        ArchiveKind::Zip => stream_zip(file, sink),
        ArchiveKind::Tar => stream_tar(BufReader::new(file), sink),
        ArchiveKind::TarGz => stream_tar(flate2::read::GzDecoder::new(BufReader::new(file)), sink),
        ArchiveKind::Bzip2 => {
            let mut decoder = bzip2::read::BzDecoder::new(BufReader::new(file));
            pump(&mut decoder, sink).map_err(ArchiveError::invalid)
        }
        ArchiveKind::SevenZip => stream_7z(file, sink),
    }
}

fn stream_zip(file: File, sink: &mut dyn FnMut(&[u8])) -> Result<(), ArchiveError> {
    let mut archive = zip::ZipArchive::new(file).map_err(ArchiveError::invalid)?;
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(ArchiveError::invalid)?;
        if member.is_dir() {
            continue;
        }
        pump(&mut member, sink).map_err(ArchiveError::invalid)?;
    }
    Ok(())
}

/// Regular members only; AppleDouble `._*` sidecars are skipped
fn stream_tar<R: Read>(reader: R, sink: &mut dyn FnMut(&[u8])) -> Result<(), ArchiveError> {
    let mut archive = tar::Archive::new(reader);
    let mut members = 0usize;
    for member in archive.entries().map_err(ArchiveError::invalid)? {
        let mut member = member.map_err(ArchiveError::invalid)?;
        if !member.header().entry_type().is_file() {
            continue;
        }
        let sidecar = member
            .path()
            .map_err(ArchiveError::invalid)?
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("._"))
            .unwrap_or(false);
        if sidecar {
            continue;
        }
        pump(&mut member, sink).map_err(ArchiveError::invalid)?;
        members += 1;
    }
    // Short non-tar input parses as an empty archive
    if members == 0 {
        return Err(ArchiveError::Invalid("no regular members in tar".to_string()));
    }
    Ok(())
}

fn stream_7z(file: File, sink: &mut dyn FnMut(&[u8])) -> Result<(), ArchiveError> {
    let len = file.metadata().map_err(ArchiveError::Io)?.len();
    let mut archive = sevenz_rust::SevenZReader::new(file, len, sevenz_rust::Password::empty())
        .map_err(ArchiveError::invalid)?;
    archive
        .for_each_entries(|member, reader| {
            if !member.is_directory() {
                pump(reader, sink)?;
            }
            Ok(true)
        })
        .map_err(ArchiveError::invalid)
}
