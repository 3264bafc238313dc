//! CSV output with atomic tmp→rename

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Buffered CSV writer that only replaces its target on `finalize`.
///
/// Readers of the target path see either the previous file or the complete
/// new one, never a half-written table.
pub struct CsvSink {
    writer: csv::Writer<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    row_count: usize,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("final_path", &self.final_path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl CsvSink {
    /// Create a sink for `path`, writing `header` first
    pub fn create<I, T>(path: &Path, header: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = tmp_path_for(path);

        // Clean up stale tmp file
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let file = File::create(&tmp_path)?;
        let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(file);
        writer.write_record(header)?;

        Ok(Self {
            writer,
            tmp_path,
            final_path: path.to_path_buf(),
            row_count: 0,
        })
    }

    /// Write one data row
    pub fn write_row<I, T>(&mut self, row: I) -> io::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(row)?;
        self.row_count += 1;
        Ok(())
    }

    /// Flush, fsync, and atomically rename tmp → final
    pub fn finalize(self) -> io::Result<usize> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| io::Error::other(e.to_string()))?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(self.row_count)
    }
}

/// Remove a stale `<path>.tmp` left behind by an interrupted write.
///
/// Returns whether a file was removed.
pub fn cleanup_tmp_file(path: &Path) -> io::Result<bool> {
    let tmp_path = tmp_path_for(path);
    if tmp_path.exists() {
        log::warn!("Removing stale tmp file: {}", tmp_path.display());
        fs::remove_file(&tmp_path)?;
        return Ok(true);
    }
    Ok(false)
}
