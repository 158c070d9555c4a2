use anyhow::{Context, Result};
use docindex_core::SourceDocument;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Pre-extracted record in a `.json` / `.jsonl` input file.
#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    title: Option<String>,
    body: String,
    #[serde(rename = "type")]
    doc_type: Option<String>,
}

impl From<InputDoc> for SourceDocument {
    fn from(doc: InputDoc) -> Self {
        let derived = SourceDocument::from_locator(&doc.id, doc.body);
        SourceDocument {
            name: doc.title.unwrap_or(derived.name),
            doc_type: doc.doc_type.unwrap_or(derived.doc_type),
            ..derived
        }
    }
}

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Expand files and directories into documents ready for indexing.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    let mut docs = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    read_file(entry.path(), &mut docs)?;
                }
            }
        } else if path.is_file() {
            read_file(path, &mut docs)?;
        } else {
            tracing::warn!(path = %path.display(), "input path does not exist, skipping");
        }
    }
    Ok(docs)
}

fn read_file(path: &Path, docs: &mut Vec<SourceDocument>) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jsonl" => read_jsonl(path, docs),
        "json" => read_json(path, docs),
        e if TEXT_EXTENSIONS.contains(&e) => {
            let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            docs.push(SourceDocument::from_locator(&path.to_string_lossy(), content));
            Ok(())
        }
        _ => {
            tracing::debug!(path = %path.display(), "unsupported file type, skipping");
            Ok(())
        }
    }
}

fn read_jsonl(path: &Path, docs: &mut Vec<SourceDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid document record", path.display(), lineno + 1))?;
        docs.push(doc.into());
    }
    Ok(())
}

fn read_json(path: &Path, docs: &mut Vec<SourceDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                docs.push(doc.into());
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            docs.push(doc.into());
        }
        _ => tracing::warn!(path = %path.display(), "json input is neither an object nor an array"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_directories_and_reads_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "# Notes\nmeeting notes").unwrap();
        fs::write(dir.path().join("a.txt"), "invoice total").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(
            dir.path().join("records.jsonl"),
            "{\"id\":\"r1\",\"title\":\"Receipt\",\"body\":\"coffee 3.50\",\"type\":\"ocr\"}\n\n{\"id\":\"scan/r2.pdf\",\"body\":\"tea\"}\n",
        )
        .unwrap();

        let docs = collect_documents(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.md", "Receipt", "r2.pdf"]);
        assert_eq!(docs[2].doc_type, "ocr");
        assert_eq!(docs[3].doc_type, "pdf");
        assert_eq!(docs[0].content, "invoice total");
    }

    #[test]
    fn json_accepts_object_or_array() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.json");
        let many = dir.path().join("many.json");
        fs::write(&one, r#"{"id":"x","body":"single"}"#).unwrap();
        fs::write(&many, r#"[{"id":"y","body":"first"},{"id":"z","body":"second"}]"#).unwrap();

        let docs = collect_documents(&[one, many]).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn bad_jsonl_line_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"id\":\"ok\",\"body\":\"fine\"}\nnot json\n").unwrap();
        let err = collect_documents(&[path]).unwrap_err();
        assert!(format!("{err:#}").contains("bad.jsonl:2"));
    }
}
