//! Rename a ROM entry on disk and in the catalog

use romvault_common::models::RomEntry;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::discovery::Discoverer;
use crate::error::{Result, ScanError};
use crate::tags::{file_extension, file_stem, parse_tags, strip_tags};

fn invalid(message: impl Into<String>) -> ScanError {
    ScanError::Catalog(romvault_common::Error::InvalidInput(message.into()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name == "." || name == ".." {
        return Err(invalid(format!("Invalid ROM name: {:?}", name)));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(invalid(format!("ROM name must not contain path separators: {}", name)));
    }
    Ok(())
}

/// Rename `rom_id` to `new_name` inside its platform roms folder.
///
/// Renaming to the current name is a no-op. Multi-disc sets made of
/// several loose files cannot be renamed as a unit.
///
/// # Errors
///
/// - `ScanError::RomAlreadyExists` when the target name is taken on disk
/// - `ScanError::Catalog` with `NotFound` / `InvalidInput` for unknown ids
///   and unusable names
/// - `ScanError::Io` when the filesystem rename fails
pub async fn rename_rom(
    catalog: &dyn Catalog,
    discoverer: &Discoverer,
    rom_id: Uuid,
    new_name: &str,
) -> Result<RomEntry> {
    validate_name(new_name)?;

    let mut rom = catalog
        .get_rom(rom_id)
        .await?
        .ok_or_else(|| ScanError::Catalog(romvault_common::Error::NotFound(format!("ROM {}", rom_id))))?;
    if rom.fs_name == new_name {
        return Ok(rom);
    }
    if rom.multi && !rom.is_directory {
        return Err(invalid(format!("{} spans several files and cannot be renamed", rom.fs_name)));
    }

    let platform = catalog
        .platforms()
        .await?
        .into_iter()
        .find(|p| p.id == rom.platform_id)
        .ok_or_else(|| {
            ScanError::Catalog(romvault_common::Error::NotFound(format!(
                "Platform {}",
                rom.platform_id
            )))
        })?;

    let roms_dir = discoverer.roms_dir(&platform.fs_slug);
    let target = roms_dir.join(new_name);
    if target.exists() {
        return Err(ScanError::RomAlreadyExists(new_name.to_string()));
    }
    tokio::fs::rename(roms_dir.join(&rom.fs_name), &target).await?;

    let old_name = std::mem::replace(&mut rom.fs_name, new_name.to_string());
    rom.tags = parse_tags(new_name);
    if rom.is_directory {
        rom.fs_extension = String::new();
        rom.fs_name_no_tags = strip_tags(new_name);
        let prefix = Path::new(&old_name);
        for file in &mut rom.files {
            if let Ok(rest) = Path::new(&file.rel_path).strip_prefix(prefix) {
                file.rel_path = Path::new(new_name).join(rest).to_string_lossy().replace('\\', "/");
            }
        }
    } else {
        rom.fs_extension = file_extension(new_name);
        rom.fs_name_no_tags = strip_tags(file_stem(new_name));
        for file in &mut rom.files {
            if file.rel_path == old_name {
                file.rel_path = new_name.to_string();
                file.file_name = new_name.to_string();
            }
        }
    }

    catalog.upsert_rom(&rom).await?;
    info!(rom_id = %rom.id, from = %old_name, to = %new_name, "ROM renamed");
    Ok(rom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::ScanSettings;
    use romvault_common::models::{FileCategory, PlatformFolder, RomFile, RomHashes};
    use std::fs;
    use tempfile::TempDir;

    fn file(rel_path: &str) -> RomFile {
        RomFile {
            file_name: rel_path.rsplit('/').next().unwrap_or(rel_path).to_string(),
            rel_path: rel_path.to_string(),
            size: 4,
            mtime: None,
            category: FileCategory::Primary,
            hashes: RomHashes::default(),
        }
    }

    async fn setup() -> (TempDir, MemoryCatalog, Discoverer, PlatformFolder) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("roms/gba")).unwrap();
        let settings = ScanSettings::new(temp.path());
        let discoverer = Discoverer::new(&settings).unwrap();

        let catalog = MemoryCatalog::new();
        let platform = PlatformFolder::new("gba", Some("gba".to_string()), None);
        catalog.upsert_platform(&platform).await.unwrap();
        (temp, catalog, discoverer, platform)
    }

    #[tokio::test]
    async fn test_rename_single_file() {
        let (temp, catalog, discoverer, platform) = setup().await;
        fs::write(temp.path().join("roms/gba/old (USA).gba"), b"data").unwrap();

        let mut rom = RomEntry::new(platform.id, "old (USA).gba");
        rom.files = vec![file("old (USA).gba")];
        catalog.upsert_rom(&rom).await.unwrap();

        let renamed = rename_rom(&catalog, &discoverer, rom.id, "New Name (Europe).gba")
            .await
            .unwrap();

        assert_eq!(renamed.id, rom.id);
        assert_eq!(renamed.fs_name_no_tags, "New Name");
        assert_eq!(renamed.tags.regions, vec!["Europe"]);
        assert_eq!(renamed.files[0].rel_path, "New Name (Europe).gba");
        assert!(temp.path().join("roms/gba/New Name (Europe).gba").exists());
        assert!(!temp.path().join("roms/gba/old (USA).gba").exists());

        let stored = catalog.get_rom(rom.id).await.unwrap().unwrap();
        assert_eq!(stored.fs_name, "New Name (Europe).gba");
    }

    #[tokio::test]
    async fn test_rename_directory_rewrites_file_paths() {
        let (temp, catalog, discoverer, platform) = setup().await;
        fs::create_dir_all(temp.path().join("roms/gba/Bundle/dlc")).unwrap();
        fs::write(temp.path().join("roms/gba/Bundle/game.gba"), b"data").unwrap();
        fs::write(temp.path().join("roms/gba/Bundle/dlc/extra.bin"), b"data").unwrap();

        let mut rom = RomEntry::new(platform.id, "Bundle");
        rom.is_directory = true;
        rom.files = vec![file("Bundle/dlc/extra.bin"), file("Bundle/game.gba")];
        catalog.upsert_rom(&rom).await.unwrap();

        let renamed = rename_rom(&catalog, &discoverer, rom.id, "Renamed").await.unwrap();
        let paths: Vec<&str> = renamed.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["Renamed/dlc/extra.bin", "Renamed/game.gba"]);
        assert!(temp.path().join("roms/gba/Renamed/game.gba").exists());
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name_rejected() {
        let (temp, catalog, discoverer, platform) = setup().await;
        fs::write(temp.path().join("roms/gba/a.gba"), b"a").unwrap();
        fs::write(temp.path().join("roms/gba/b.gba"), b"b").unwrap();

        let rom = RomEntry::new(platform.id, "a.gba");
        catalog.upsert_rom(&rom).await.unwrap();

        let err = rename_rom(&catalog, &discoverer, rom.id, "b.gba").await.unwrap_err();
        assert!(matches!(err, ScanError::RomAlreadyExists(name) if name == "b.gba"));
        assert!(temp.path().join("roms/gba/a.gba").exists());
    }

    #[tokio::test]
    async fn test_rename_rejects_bad_names_and_unknown_ids() {
        let (_temp, catalog, discoverer, _platform) = setup().await;
        for bad in ["", "..", "sub/dir.gba"] {
            assert!(rename_rom(&catalog, &discoverer, Uuid::new_v4(), bad).await.is_err());
        }
        let err = rename_rom(&catalog, &discoverer, Uuid::new_v4(), "ok.gba")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Catalog(romvault_common::Error::NotFound(_))));
    }
}
