//! Bulk corpus directory layout
//!
//! The corpus root holds one directory per date partition
//! (`updated_date=YYYY-MM-DD`), each with numbered, independently
//! compressed part files (`part_000.gz`, `part_001.gz`, ...).

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix of a partition directory name
pub const PARTITION_PREFIX: &str = "updated_date=";

/// Rough records per MB of compressed part file, for sizing runs
pub const RECORDS_PER_MB: f64 = 461.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One compressed part file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartFile {
    pub path: PathBuf,
    /// Partition date taken from the parent directory name
    pub partition: String,
    pub bytes: u64,
}

impl PartFile {
    pub fn size_mb(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_MB
    }
}

/// Totals for a corpus, computed from file sizes without decoding
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusOverview {
    pub partitions: usize,
    pub files: usize,
    pub total_mb: f64,
    pub estimated_records: u64,
}

/// Every part file under a corpus root, sorted by partition then name
#[derive(Debug, Clone, Default)]
pub struct CorpusLayout {
    root: PathBuf,
    parts: Vec<PartFile>,
}

impl CorpusLayout {
    /// Walk `root` for `updated_date=*/part_*.gz`.
    ///
    /// Files and directories not matching the layout are ignored.
    pub fn discover(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("corpus root {} is not a directory", root.display()),
            ));
        }

        let mut parts = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() || !is_part_file(entry.path()) {
                continue;
            }
            let Some(partition) = entry
                .path()
                .parent()
                .and_then(|dir| dir.file_name())
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix(PARTITION_PREFIX))
            else {
                continue;
            };
            parts.push(PartFile {
                path: entry.path().to_path_buf(),
                partition: partition.to_string(),
                bytes: entry.metadata().map_err(io::Error::from)?.len(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            parts,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parts(&self) -> &[PartFile] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Distinct partition dates, in order
    pub fn partitions(&self) -> Vec<&str> {
        let mut dates: Vec<&str> = Vec::new();
        for part in &self.parts {
            if dates.last() != Some(&part.partition.as_str()) {
                dates.push(&part.partition);
            }
        }
        dates
    }

    pub fn overview(&self) -> CorpusOverview {
        let total_bytes: u64 = self.parts.iter().map(|p| p.bytes).sum();
        let total_mb = total_bytes as f64 / BYTES_PER_MB;
        CorpusOverview {
            partitions: self.partitions().len(),
            files: self.parts.len(),
            total_mb,
            estimated_records: (total_mb * RECORDS_PER_MB).round() as u64,
        }
    }
}

fn is_part_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with("part_") && name.ends_with(".gz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, bytes: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn discovers_part_files_in_partition_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("updated_date=2024-02-01/part_001.gz"), 10);
        touch(&root.join("updated_date=2024-01-01/part_000.gz"), 20);
        touch(&root.join("updated_date=2024-02-01/part_000.gz"), 30);
        touch(&root.join("updated_date=2024-02-01/manifest"), 5);
        touch(&root.join("other/part_000.gz"), 5);

        let layout = CorpusLayout::discover(root).unwrap();
        let names: Vec<String> = layout
            .parts()
            .iter()
            .map(|p| format!("{}/{}", p.partition, p.path.file_name().unwrap().to_string_lossy()))
            .collect();
        assert_eq!(
            names,
            vec![
                "2024-01-01/part_000.gz",
                "2024-02-01/part_000.gz",
                "2024-02-01/part_001.gz",
            ]
        );
        assert_eq!(layout.partitions(), vec!["2024-01-01", "2024-02-01"]);
    }

    #[test]
    fn overview_estimates_records_from_size() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("updated_date=2024-01-01/part_000.gz"), 2 * 1024 * 1024);

        let overview = CorpusLayout::discover(dir.path()).unwrap().overview();
        assert_eq!(overview.files, 1);
        assert_eq!(overview.partitions, 1);
        assert!((overview.total_mb - 2.0).abs() < 1e-9);
        assert_eq!(overview.estimated_records, 922);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CorpusLayout::discover(dir.path().join("absent")).is_err());
    }
}
