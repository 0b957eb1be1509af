//! Fixture corpora written into temp directories

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A work line: `id`, optional DOI in URL form, referenced work ids.
pub fn work(id: &str, doi: Option<&str>, references: &[&str]) -> Value {
    json!({
        "id": id,
        "doi": doi.map(|d| format!("https://doi.org/{}", d)),
        "display_name": format!("Work {}", id),
        "publication_year": 2024,
        "type": "article",
        "referenced_works": references,
        "cited_by_count": 0,
    })
}

/// Write `updated_date=<partition>/part_<index>.gz` under `root`.
pub fn write_part(root: &Path, partition: &str, index: usize, works: &[Value]) -> PathBuf {
    let dir = root.join(format!("updated_date={}", partition));
    fs::create_dir_all(&dir).expect("Failed to create partition dir");
    let path = dir.join(format!("part_{:03}.gz", index));

    let mut encoder = GzEncoder::new(File::create(&path).expect("Failed to create part"), Compression::fast());
    for work in works {
        writeln!(encoder, "{}", work).expect("Failed to write work");
    }
    encoder.finish().expect("Failed to finish gzip stream");
    path
}

/// A snapshot line in the arXiv metadata dump shape.
pub fn snapshot_line(id: &str, doi: Option<&str>, authors: &[[&str; 3]], categories: &str) -> Value {
    json!({
        "id": id,
        "submitter": "Submitter",
        "authors": authors.iter().map(|a| format!("{} {}", a[1], a[0])).collect::<Vec<_>>().join(", "),
        "title": format!("Paper {}", id),
        "comments": null,
        "journal-ref": null,
        "doi": doi,
        "report-no": null,
        "categories": categories,
        "license": null,
        "abstract": "Abstract.",
        "update_date": "2024-01-15",
        "authors_parsed": authors,
    })
}

/// Write plain line-delimited JSON, one value per line.
pub fn write_snapshot(path: &Path, lines: &[Value]) {
    let mut file = File::create(path).expect("Failed to create snapshot");
    for line in lines {
        writeln!(file, "{}", line).expect("Failed to write snapshot line");
    }
}
