use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Expand files and directories into the list of documents to check.
///
/// Directories contribute their `*.json` entries sorted by file name; files
/// are taken as given.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for path in paths {
        if path.is_dir() {
            documents.extend(json_files(path)?);
        } else if path.exists() {
            documents.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(documents)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to scan {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("failed to scan {}", dir.display()))?
            .path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if path.is_file() && is_json {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_expand_to_sorted_json_files() {
        let dir = std::env::temp_dir().join(format!(
            "blueprint-util-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["b.json", "a.JSON", "notes.txt", "nested/c.json"] {
            fs::write(dir.join(name), "{}").unwrap();
        }
        let found = collect_documents(std::slice::from_ref(&dir)).unwrap();
        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .collect();
        assert_eq!(names, ["a.JSON", "b.json"]);

        let single = collect_documents(&[dir.join("notes.txt")]).unwrap();
        assert_eq!(single.len(), 1);
        assert!(collect_documents(&[dir.join("missing.json")]).is_err());
    }

    #[test]
    fn timestamps_are_utc() {
        assert!(generated_at().ends_with('Z'));
    }
}
