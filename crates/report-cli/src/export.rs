use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;

use report_spec::{HeaderSet, ResultRecord};

use crate::table::render_csv;

const HEADERS_DIR: &str = "headers";
const RECORDS_DIR: &str = "records";
const HEADERS_SUFFIX: &str = ".headers.json";

/// Files written for one processed batch.
#[derive(Debug, Default, Serialize)]
pub struct ExportSummary {
    pub header_files: Vec<PathBuf>,
    pub record_files: Vec<PathBuf>,
    pub csv_files: Vec<PathBuf>,
}

/// Paths of an earlier export under `out_root`: its two directories plus the
/// CSV written next to each saved header set.
pub fn previous_export(out_root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let headers_dir = out_root.join(HEADERS_DIR);
    if headers_dir.is_dir() {
        for entry in fs::read_dir(&headers_dir)? {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|name| name.strip_suffix(HEADERS_SUFFIX))
            else {
                continue;
            };
            let csv = out_root.join(format!("{}.csv", stem));
            if csv.exists() {
                paths.push(csv);
            }
        }
        paths.push(headers_dir);
    }
    let records_dir = out_root.join(RECORDS_DIR);
    if records_dir.is_dir() {
        paths.push(records_dir);
    }
    Ok(paths)
}

pub fn remove_export(paths: &[PathBuf]) -> io::Result<()> {
    for path in paths {
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

/// Writes `headers/`, `records/` and one CSV per assessment under `out_root`.
pub fn write_export(
    out_root: &Path,
    header_sets: &BTreeMap<String, HeaderSet>,
    records: &BTreeMap<String, ResultRecord>,
) -> io::Result<ExportSummary> {
    let headers_dir = out_root.join(HEADERS_DIR);
    let records_dir = out_root.join(RECORDS_DIR);
    fs::create_dir_all(&headers_dir)?;
    fs::create_dir_all(&records_dir)?;

    let mut summary = ExportSummary::default();

    for (assessment_id, headers) in header_sets {
        let stem = file_stem(assessment_id);
        let path = headers_dir.join(format!("{}{}", stem, HEADERS_SUFFIX));
        save_pretty(&path, headers)?;
        summary.header_files.push(path);

        let rows = records
            .values()
            .filter(|record| record.parent_id == *assessment_id)
            .collect::<Vec<_>>();
        let path = out_root.join(format!("{}.csv", stem));
        fs::write(&path, render_csv(headers, &rows))?;
        summary.csv_files.push(path);
    }

    for (result_id, record) in records {
        let path = records_dir.join(format!("{}.record.json", file_stem(result_id)));
        save_pretty(&path, record)?;
        summary.record_files.push(path);
    }

    Ok(summary)
}

/// Document id reduced to `[A-Za-z0-9_-]`; anything else becomes `-`.
fn file_stem(id: &str) -> String {
    let stem = id
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => ch,
            _ => '-',
        })
        .collect::<String>();
    if stem.is_empty() {
        "document".into()
    } else {
        stem
    }
}

fn save_pretty<T: Serialize>(path: &Path, document: &T) -> io::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(document)?;
    bytes.push(b'\n');
    fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn file_stems_keep_safe_characters() {
        assert_eq!(file_stem("a-full_1"), "a-full_1");
        assert_eq!(file_stem("school/visit 2"), "school-visit-2");
        assert_eq!(file_stem("é"), "-");
        assert_eq!(file_stem(""), "document");
    }

    #[test]
    fn previous_export_lists_only_written_tables() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        assert!(previous_export(root).expect("scan").is_empty());

        let mut header_sets = BTreeMap::new();
        header_sets.insert("a-grid".to_string(), HeaderSet::default());
        write_export(root, &header_sets, &BTreeMap::new()).expect("export");
        fs::write(root.join("notes.csv"), "keep").expect("write notes");

        let previous = previous_export(root).expect("scan");
        assert!(previous.contains(&root.join("a-grid.csv")));
        assert!(previous.contains(&root.join("headers")));
        assert!(previous.contains(&root.join("records")));

        remove_export(&previous).expect("remove");
        assert!(!root.join("a-grid.csv").exists());
        assert!(!root.join("headers").exists());
        assert!(root.join("notes.csv").exists());
    }
}
