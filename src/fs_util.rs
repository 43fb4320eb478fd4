use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use zip::ZipArchive;

use crate::domain::ArchiveKind;
use crate::error::AvhrrError;

pub fn archive_kind_for(path: &Path) -> ArchiveKind {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.ends_with(".zip") {
        ArchiveKind::Zip
    } else if name.ends_with(".tar") {
        ArchiveKind::Tar
    } else {
        ArchiveKind::TarGz
    }
}

pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<(), AvhrrError> {
    match archive_kind_for(archive_path) {
        ArchiveKind::Zip => extract_zip(archive_path, target_dir),
        ArchiveKind::Tar => {
            let file = open(archive_path)?;
            tar::Archive::new(file)
                .unpack(target_dir)
                .map_err(|err| AvhrrError::Archive(err.to_string()))
        }
        ArchiveKind::TarGz => {
            let file = open(archive_path)?;
            tar::Archive::new(GzDecoder::new(file))
                .unpack(target_dir)
                .map_err(|err| AvhrrError::Archive(err.to_string()))
        }
    }
}

pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), AvhrrError> {
    let file = open(zip_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| AvhrrError::Archive(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| AvhrrError::Archive(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(AvhrrError::Archive(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            fs::File::create(&entry_path).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

/// Reads one member of a product archive. Names are compared without a leading `./`.
pub fn read_archive_member(
    archive_path: &Path,
    kind: ArchiveKind,
    member: &str,
) -> Result<Option<Vec<u8>>, AvhrrError> {
    match kind {
        ArchiveKind::Zip => read_zip_member(archive_path, member),
        ArchiveKind::Tar => read_tar_member(open(archive_path)?, member),
        ArchiveKind::TarGz => read_tar_member(GzDecoder::new(open(archive_path)?), member),
    }
}

fn read_zip_member(zip_path: &Path, member: &str) -> Result<Option<Vec<u8>>, AvhrrError> {
    let file = open(zip_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| AvhrrError::Archive(err.to_string()))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| AvhrrError::Archive(err.to_string()))?;
        if entry.is_dir() || normalize_member(entry.name()) != member {
            continue;
        }
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|err| AvhrrError::Archive(err.to_string()))?;
        return Ok(Some(content));
    }
    Ok(None)
}

fn read_tar_member<R: Read>(reader: R, member: &str) -> Result<Option<Vec<u8>>, AvhrrError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|err| AvhrrError::Archive(err.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| AvhrrError::Archive(err.to_string()))?;
        let name = entry
            .path()
            .map_err(|err| AvhrrError::Archive(err.to_string()))?
            .to_string_lossy()
            .to_string();
        if normalize_member(&name) != member {
            continue;
        }
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|err| AvhrrError::Archive(err.to_string()))?;
        return Ok(Some(content));
    }
    Ok(None)
}

fn normalize_member(name: &str) -> &str {
    name.trim_start_matches("./")
}

/// Writes a gzip tar of the *contents* of `source_dir`; entry names are relative to it.
pub fn pack_dir_contents(source_dir: &Path, destination: &Path) -> Result<(), AvhrrError> {
    let parent = destination
        .parent()
        .ok_or_else(|| AvhrrError::Filesystem("invalid destination path".to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("avhrr-mp-pack")
        .tempfile_in(parent)
        .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    let file = temp
        .reopen()
        .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let mut items = walk_dir(source_dir)?;
    items.sort();
    for path in items {
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        if path.is_dir() {
            builder
                .append_dir(relative, &path)
                .map_err(|err| AvhrrError::Archive(err.to_string()))?;
        } else {
            builder
                .append_path_with_name(&path, relative)
                .map_err(|err| AvhrrError::Archive(err.to_string()))?;
        }
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|err| AvhrrError::Archive(err.to_string()))?;

    temp.persist(destination)
        .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Copies a file through a sibling temp file so a partial copy never lands at `dest`.
pub fn copy_file_atomic(source: &Path, dest: &Path) -> Result<(), AvhrrError> {
    let parent = dest
        .parent()
        .ok_or_else(|| AvhrrError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("avhrr-mp-file")
        .tempfile_in(parent)
        .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    fs::copy(source, temp.path()).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    temp.persist(dest)
        .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Every file and directory below `root`, excluding `root` itself. Symlinks are listed
/// but not followed.
pub fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, AvhrrError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path).map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
            if file_type.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}

fn open(path: &Path) -> Result<fs::File, AvhrrError> {
    fs::File::open(path)
        .map_err(|err| AvhrrError::Filesystem(format!("open {}: {err}", path.display())))
}
