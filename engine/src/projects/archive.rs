//! Zip export of a generated project.

use std::io::{Cursor, Write};
use std::path::Path;

use sdk::errors::EngineError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::visit_files;

/// Deflated zip of every file under `dir`, with entry names relative to `dir`
/// and `/`-separated.
pub fn zip_project(dir: &Path) -> Result<Vec<u8>, EngineError> {
    if !dir.is_dir() {
        return Err(EngineError::FileNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    visit_files(dir, &mut |path| {
        files.push(path.to_path_buf());
        false
    });

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for path in &files {
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer
            .start_file(name, options)
            .map_err(|e| EngineError::ToolError(format!("zip: {}", e)))?;
        writer.write_all(&std::fs::read(path)?)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| EngineError::ToolError(format!("zip: {}", e)))?;

    tracing::debug!("Archived {} files from {}", files.len(), dir.display());
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_zip_contains_relative_entries() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("project_1");
        std::fs::create_dir_all(dir.join("static")).unwrap();
        std::fs::write(dir.join("app.py"), "print('hi')").unwrap();
        std::fs::write(dir.join("static/style.css"), "body {}").unwrap();

        let bytes = zip_project(&dir).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("static/style.css")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "body {}");
    }

    #[test]
    fn test_zip_leaves_out_repository() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("project_1");
        std::fs::create_dir_all(dir.join(".git")).unwrap();
        std::fs::write(dir.join(".git/config"), "[remote \"origin\"]").unwrap();
        std::fs::write(dir.join("index.html"), "<p>hi</p>").unwrap();

        let bytes = zip_project(&dir).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        assert_eq!(names, ["index.html"]);
    }

    #[test]
    fn test_zip_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let err = zip_project(&temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }
}
