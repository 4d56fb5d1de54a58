//! Generated artifact store
//!
//! Every successful generation lands in its own `project_<n>` directory under a
//! single root. Directories are only ever added, and the numeric suffix is
//! claimed by creating the directory, so concurrent generations never share
//! one.
//!
//! Traversal order (used by `find_file` and `list_files`) is fixed:
//! depth-first, each directory's entries visited in byte order of their names,
//! files and subdirectories interleaved. Symlinks are skipped.

pub mod archive;
pub mod generator;

pub use archive::zip_project;
pub use generator::ProjectGenerator;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use sdk::errors::EngineError;

/// Directory name prefix for generated projects
pub const PROJECT_PREFIX: &str = "project_";

/// Files-and-main-file payload produced by the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Relative path -> file content
    #[serde(default)]
    pub files: BTreeMap<String, String>,

    #[serde(default)]
    pub main_file: Option<String>,
}

/// A materialized project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProject {
    pub dir: PathBuf,
    pub main_file: Option<String>,
}

impl GeneratedProject {
    /// Absolute path of the main file, if the generated project named one
    pub fn main_path(&self) -> Option<PathBuf> {
        self.main_file.as_ref().map(|m| self.dir.join(m))
    }
}

/// Root directory holding all generated projects
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Claim the next `project_<n>` directory.
    ///
    /// Starts at one past the number of existing subdirectories and moves up
    /// until `create_dir` succeeds.
    pub fn allocate(&self) -> Result<PathBuf, EngineError> {
        std::fs::create_dir_all(&self.root)?;

        let existing = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .count();

        let mut n = existing + 1;
        loop {
            let dir = self.root.join(format!("{}{}", PROJECT_PREFIX, n));
            match std::fs::create_dir(&dir) {
                Ok(()) => {
                    debug!("Allocated {}", dir.display());
                    return Ok(dir);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Write every file of `spec` into a freshly allocated directory.
    ///
    /// Paths are checked before anything touches the disk.
    pub fn materialize(&self, spec: &ProjectSpec) -> Result<GeneratedProject, EngineError> {
        for relative in spec.files.keys() {
            check_relative(relative)?;
        }
        let main_file = spec
            .main_file
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        if let Some(main) = main_file {
            check_relative(main)?;
        }
        if spec.files.is_empty() {
            warn!("Generated project contains no files");
        }

        let dir = self.allocate()?;
        for (relative, content) in &spec.files {
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
        }

        info!(
            "Materialized {} files into {}",
            spec.files.len(),
            dir.display()
        );

        Ok(GeneratedProject {
            dir,
            main_file: main_file.map(str::to_string),
        })
    }

    /// First file named `name` in traversal order.
    pub fn find_file(&self, name: &str) -> Option<PathBuf> {
        let mut found = None;
        visit_files(&self.root, &mut |path| {
            if path.file_name().is_some_and(|f| f == name) {
                found = Some(path.to_path_buf());
                return true;
            }
            false
        });
        found
    }

    /// Every file in the store, in traversal order.
    pub fn list_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        visit_files(&self.root, &mut |path| {
            files.push(path.to_path_buf());
            false
        });
        files
    }

    /// Project directories ordered by numeric suffix.
    pub fn projects(&self) -> Result<Vec<PathBuf>, EngineError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects: Vec<(u64, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let number = project_number(&entry.file_name().to_string_lossy())?;
                Some((number, entry.path()))
            })
            .collect();

        projects.sort();
        Ok(projects.into_iter().map(|(_, path)| path).collect())
    }

    /// Project with the highest numeric suffix.
    pub fn latest(&self) -> Result<PathBuf, EngineError> {
        self.projects()?
            .pop()
            .ok_or_else(|| EngineError::NoProjects(self.root.clone()))
    }
}

fn project_number(name: &str) -> Option<u64> {
    name.strip_prefix(PROJECT_PREFIX)?.parse().ok()
}

/// Reject anything that could escape the project directory.
fn check_relative(relative: &str) -> Result<(), EngineError> {
    let path = Path::new(relative);
    let escapes = relative.trim().is_empty()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

    if escapes {
        return Err(EngineError::PathOutsideWorkspace(path.to_path_buf()));
    }
    Ok(())
}

/// Depth-first walk in byte order of entry names. Returns true once `f` asks
/// to stop.
///
/// Hidden directories (`.git` after a push) are not entered; hidden files are
/// still visited. Symlinks are never followed.
fn visit_files(dir: &Path, f: &mut dyn FnMut(&Path) -> bool) -> bool {
    let mut entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            }
            return false;
        }
    };
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if visit_files(&path, f) {
                return true;
            }
        } else if file_type.is_file() && f(&path) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn spec(files: &[(&str, &str)], main: Option<&str>) -> ProjectSpec {
        ProjectSpec {
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            main_file: main.map(str::to_string),
        }
    }

    #[test]
    fn test_allocate_numbers_sequentially() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("generated_projects"));

        let first = store.allocate().unwrap();
        let second = store.allocate().unwrap();
        assert!(first.ends_with("project_1"));
        assert!(second.ends_with("project_2"));
    }

    #[test]
    fn test_allocate_skips_taken_numbers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        // one directory, but it is already named project_2
        std::fs::create_dir(root.join("project_2")).unwrap();

        let store = ArtifactStore::new(root);
        assert!(store.allocate().unwrap().ends_with("project_3"));
    }

    #[test]
    fn test_materialize_writes_nested_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());

        let project = store
            .materialize(&spec(
                &[
                    ("app.py", "print('hi')"),
                    ("templates/index.html", "<html></html>"),
                ],
                Some("app.py"),
            ))
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(project.dir.join("templates/index.html")).unwrap(),
            "<html></html>"
        );
        assert_eq!(project.main_path().unwrap(), project.dir.join("app.py"));
    }

    #[test]
    fn test_materialize_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("store"));

        for bad in ["../evil.py", "/etc/passwd", "a/../../b", ""] {
            let err = store.materialize(&spec(&[(bad, "x")], None)).unwrap_err();
            assert!(matches!(err, EngineError::PathOutsideWorkspace(_)), "{}", bad);
        }
        // nothing was allocated
        assert!(store.projects().unwrap().is_empty());
    }

    #[test]
    fn test_materialize_accepts_blank_main_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());

        for main in ["", "   "] {
            let project = store
                .materialize(&spec(&[("index.html", "<p>hi</p>")], Some(main)))
                .unwrap();
            assert!(project.main_file.is_none());
            assert!(project.main_path().is_none());
            assert!(project.dir.join("index.html").is_file());
        }

        let err = store
            .materialize(&spec(&[("index.html", "")], Some("../run.py")))
            .unwrap_err();
        assert!(matches!(err, EngineError::PathOutsideWorkspace(_)));
    }

    #[test]
    fn test_hidden_directories_are_not_walked() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let project = root.join("project_1");
        std::fs::create_dir_all(project.join(".git/refs")).unwrap();
        std::fs::write(project.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::write(project.join(".git/config"), "[core]").unwrap();
        std::fs::write(project.join(".gitignore"), "*.pyc").unwrap();
        std::fs::write(project.join("app.py"), "").unwrap();

        let store = ArtifactStore::new(root);
        assert_eq!(
            store.list_files(),
            vec![project.join(".gitignore"), project.join("app.py")]
        );
        assert!(store.find_file("HEAD").is_none());
        assert!(store.find_file("config").is_none());
    }

    #[test]
    fn test_find_file_is_lexicographic() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for dir in ["project_2", "project_1", "project_10"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
            std::fs::write(root.join(dir).join("app.py"), dir).unwrap();
        }

        let store = ArtifactStore::new(root);
        let found = store.find_file("app.py").unwrap();
        assert_eq!(found, root.join("project_1").join("app.py"));
        assert_eq!(store.find_file("app.py").unwrap(), found);
        assert!(store.find_file("missing.py").is_none());
    }

    #[test]
    fn test_projects_and_latest_sort_numerically() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for dir in ["project_2", "project_10", "project_1", "notes"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }

        let store = ArtifactStore::new(root);
        let names: Vec<_> = store
            .projects()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["project_1", "project_2", "project_10"]);
        assert!(store.latest().unwrap().ends_with("project_10"));
    }

    #[test]
    fn test_latest_on_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("nothing"));
        assert!(matches!(store.latest(), Err(EngineError::NoProjects(_))));
        assert!(store.list_files().is_empty());
    }
}
