//! Archive repacking between zip and gzip-compressed tar.

use std::io::{Cursor, Write};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder, EntryType};
use zip::write::SimpleFileOptions;
use zip::ZipArchive;

use super::adapter::Converted;
use super::error::AdapterError;
use super::limits::ExpansionBudget;

pub const ZIP_MIME: &str = "application/zip";
pub const TAR_GZ_MIME: &str = "application/gzip";

/// zip -> tar.gz
pub fn zip_to_tar_gz(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    repack_zip(content, ExpansionBudget::default())
}

/// tar.gz -> zip
pub fn tar_gz_to_zip(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    repack_tar_gz(content, ExpansionBudget::default())
}

fn repack_zip(content: &[u8], mut budget: ExpansionBudget) -> Result<Converted, AdapterError> {
    let mut zip = ZipArchive::new(Cursor::new(content))
        .map_err(|e| AdapterError::decode("zip", e))?;

    let mut out = Vec::new();
    {
        let encoder = GzEncoder::new(&mut out, Compression::default());
        let mut tar = Builder::new(encoder);

        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| AdapterError::decode("zip", e))?;
            let Some(name) = entry.enclosed_name() else {
                continue;
            };

            let mut header = tar::Header::new_gnu();
            header.set_mode(0o644);
            if entry.is_dir() {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_cksum();
                tar.append_data(&mut header, &name, std::io::empty())?;
                continue;
            }

            let declared = entry.size();
            let data = budget.read(&mut entry, declared, "zip", &name.to_string_lossy())?;
            header.set_size(data.len() as u64);
            header.set_cksum();
            tar.append_data(&mut header, &name, data.as_slice())?;
        }

        tar.into_inner()?.finish()?;
    }

    Ok(Converted::new(out, TAR_GZ_MIME))
}

fn repack_tar_gz(content: &[u8], mut budget: ExpansionBudget) -> Result<Converted, AdapterError> {
    let mut archive = Archive::new(GzDecoder::new(content));
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let entries = archive
        .entries()
        .map_err(|e| AdapterError::decode("tar.gz", e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| AdapterError::decode("tar.gz", e))?;
        let path = entry
            .path()
            .map_err(|e| AdapterError::decode("tar.gz", e))?
            .into_owned();
        if !is_safe_relative(&path) {
            continue;
        }
        let name = path.to_string_lossy().replace('\\', "/");

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|e| AdapterError::encode("zip", e))?;
        } else if entry_type.is_file() {
            let declared = entry.size();
            let data = budget.read(&mut entry, declared, "tar.gz", &name)?;
            writer
                .start_file(name, options)
                .map_err(|e| AdapterError::encode("zip", e))?;
            writer.write_all(&data)?;
        }
    }

    let out = writer
        .finish()
        .map_err(|e| AdapterError::encode("zip", e))?
        .into_inner();
    Ok(Converted::new(out, ZIP_MIME))
}

fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
