use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::infra::table::{Table, TableFormat};

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(String),
}

impl FileContent {
    pub fn as_str(&self) -> Result<&str> {
        match self {
            FileContent::Mapped(mmap) => {
                std::str::from_utf8(mmap).context("input file is not valid UTF-8")
            }
            FileContent::Buffered(s) => Ok(s.as_str()),
        }
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        // Use memory mapping for large ledgers
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: We're only reading the file, not modifying it
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// Expand `~` and `$VAR` in a user-supplied path.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Load a table, choosing JSON or JSON Lines by file extension.
pub fn load_table(path: &Path) -> Result<Table> {
    let content = read_file_smart(path)?;
    let text = content
        .as_str()
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    Table::parse(text, TableFormat::from_path(path))
        .with_context(|| format!("Failed to parse table {}", path.display()))
}

/// Write a table in the given format, creating parent directories.
pub fn write_table(path: &Path, table: &Table, format: TableFormat) -> Result<()> {
    let body = table
        .render(format)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    write_text(path, &body)
}

pub fn write_text(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("Failed to write to {}", path.display()))
}
