//! PDF text extraction.
//!
//! Every page of every uploaded file is extracted with `lopdf` and appended
//! to a single string with no separator between pages or files.

use docu_core::{AppError, AppResult};
use lopdf::Document;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Notice shown when the upload batch is empty.
pub const NO_FILES_NOTICE: &str = "No files Selected";

/// A file-like object received from the browser or read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Display name, used in error messages
    pub name: String,

    /// Raw PDF bytes
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Raw text of an upload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedText {
    /// Concatenated page text
    pub text: String,

    /// Number of files read
    pub files: usize,

    /// Number of pages read
    pub pages: usize,

    /// User-visible notice, set when nothing was uploaded
    pub notice: Option<String>,
}

/// Extract the text of one PDF, page by page in page order.
pub fn extract_pages(file: &UploadedFile) -> AppResult<Vec<String>> {
    let doc = Document::load_mem(&file.bytes)
        .map_err(|e| AppError::Document(format!("Failed to read PDF '{}': {}", file.name, e)))?;

    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        let text = doc.extract_text(&[page_num]).map_err(|e| {
            AppError::Document(format!(
                "Failed to extract page {} of '{}': {}",
                page_num, file.name, e
            ))
        })?;
        pages.push(text);
    }

    tracing::debug!(file = %file.name, pages = pages.len(), "Extracted PDF text");
    Ok(pages)
}

/// Concatenate the text of every page of every file.
///
/// An empty batch is not an error: it yields empty text and the
/// [`NO_FILES_NOTICE`] notice. Any unreadable file aborts the whole batch.
pub fn extract_text(files: &[UploadedFile]) -> AppResult<LoadedText> {
    if files.is_empty() {
        tracing::info!("No files selected for training");
        return Ok(LoadedText {
            notice: Some(NO_FILES_NOTICE.to_string()),
            ..Default::default()
        });
    }

    let mut loaded = LoadedText::default();
    for file in files {
        for page in extract_pages(file)? {
            loaded.text.push_str(&page);
            loaded.pages += 1;
        }
        loaded.files += 1;
    }

    tracing::info!(
        files = loaded.files,
        pages = loaded.pages,
        characters = loaded.text.chars().count(),
        "Loaded PDF text"
    );
    Ok(loaded)
}

/// Read PDF files from disk.
///
/// Each path may be a file or a directory; directories are walked
/// recursively and only files with a `.pdf` extension are kept, in sorted
/// order.
pub fn load_paths(paths: &[PathBuf]) -> AppResult<Vec<UploadedFile>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_pdf(p))
                .collect();
            found.sort();

            for pdf in found {
                files.push(read_file(&pdf)?);
            }
        } else if path.is_file() {
            files.push(read_file(path)?);
        } else {
            return Err(AppError::Document(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }
    }

    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn read_file(path: &Path) -> AppResult<UploadedFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(name, bytes))
}


#[cfg(test)]
mod tests {
    use super::test_pdf::pdf_with_pages;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_batch_yields_notice() {
        let loaded = extract_text(&[]).unwrap();
        assert_eq!(loaded.text, "");
        assert_eq!(loaded.pages, 0);
        assert_eq!(loaded.notice.as_deref(), Some(NO_FILES_NOTICE));
    }

    #[test]
    fn test_pages_concatenated_in_order() {
        let a = UploadedFile::new("a.pdf", pdf_with_pages(&["Alpha page", "Beta page"]));
        let b = UploadedFile::new("b.pdf", pdf_with_pages(&["Gamma page"]));

        let loaded = extract_text(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(loaded.files, 2);
        assert_eq!(loaded.pages, 3);
        assert!(loaded.notice.is_none());

        let alpha = loaded.text.find("Alpha").unwrap();
        let beta = loaded.text.find("Beta").unwrap();
        let gamma = loaded.text.find("Gamma").unwrap();
        assert!(alpha < beta && beta < gamma);

        let page_total: usize = [a, b]
            .iter()
            .flat_map(|f| extract_pages(f).unwrap())
            .map(|p| p.len())
            .sum();
        assert!(loaded.text.len() >= page_total);
    }

    #[test]
    fn test_corrupt_pdf_names_file() {
        let bad = UploadedFile::new("broken.pdf", b"not a pdf at all".to_vec());
        let good = UploadedFile::new("ok.pdf", pdf_with_pages(&["fine"]));

        match extract_text(&[good, bad]) {
            Err(AppError::Document(msg)) => assert!(msg.contains("broken.pdf")),
            other => panic!("expected document error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_paths_walks_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.pdf"), pdf_with_pages(&["b"])).unwrap();
        std::fs::write(nested.join("a.PDF"), pdf_with_pages(&["a"])).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = load_paths(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.PDF"]);
    }

    #[test]
    fn test_load_paths_missing_path() {
        let dir = TempDir::new().unwrap();
        let result = load_paths(&[dir.path().join("missing.pdf")]);
        assert!(matches!(result, Err(AppError::Document(_))));
    }
}
