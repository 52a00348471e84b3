//! Access to the per-mode companion files that live beside the configuration.
//!
//! The naming and protocol stages only see this trait, so they can run
//! against the real rules tree or an in-memory fake.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Maps a mode slug to its companion directory and the files inside it.
pub trait CompanionResolver {
    /// Whether the rules tree exists at all.
    fn tree_exists(&self) -> bool;

    /// Human-readable location of a mode's companion directory.
    fn dir_label(&self, slug: &str) -> String;

    /// Sorted file names in the mode's companion directory, or `None` when
    /// the directory does not exist.
    fn list(&self, slug: &str) -> io::Result<Option<Vec<String>>>;

    /// Contents of one companion file, or `None` when it does not exist.
    fn read(&self, slug: &str, file: &str) -> io::Result<Option<String>>;
}

// ─── Filesystem ─────────────────────────────────────────────────────────────

/// Resolver over `<rules_dir>/<prefix><slug>/` on disk.
#[derive(Clone, Debug)]
pub struct FsCompanionResolver {
    rules_dir: PathBuf,
    prefix: String,
}

impl FsCompanionResolver {
    pub fn new(rules_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        FsCompanionResolver {
            rules_dir: rules_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    fn dir(&self, slug: &str) -> PathBuf {
        self.rules_dir.join(format!("{}{}", self.prefix, slug))
    }
}

impl CompanionResolver for FsCompanionResolver {
    fn tree_exists(&self) -> bool {
        self.rules_dir.is_dir()
    }

    fn dir_label(&self, slug: &str) -> String {
        self.dir(slug).display().to_string()
    }

    fn list(&self, slug: &str) -> io::Result<Option<Vec<String>>> {
        let dir = self.dir(slug);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(Some(names))
    }

    fn read(&self, slug: &str, file: &str) -> io::Result<Option<String>> {
        let path = self.dir(slug).join(file);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path).map(Some)
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum MemoryFile {
    Text(String),
    Unreadable(String),
}

/// Resolver backed by maps, for tests and embedding.
#[derive(Clone, Debug)]
pub struct MemoryCompanionResolver {
    prefix: String,
    tree: Option<BTreeMap<String, BTreeMap<String, MemoryFile>>>,
}

impl Default for MemoryCompanionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCompanionResolver {
    /// An existing but empty rules tree.
    pub fn new() -> Self {
        MemoryCompanionResolver {
            prefix: "rules-".to_string(),
            tree: Some(BTreeMap::new()),
        }
    }

    /// No rules tree at all.
    pub fn without_tree() -> Self {
        MemoryCompanionResolver {
            prefix: "rules-".to_string(),
            tree: None,
        }
    }

    fn dir_mut(&mut self, slug: &str) -> &mut BTreeMap<String, MemoryFile> {
        self.tree
            .get_or_insert_with(BTreeMap::new)
            .entry(slug.to_string())
            .or_default()
    }

    /// Create an empty companion directory for `slug`.
    pub fn with_dir(mut self, slug: &str) -> Self {
        self.dir_mut(slug);
        self
    }

    pub fn with_file(mut self, slug: &str, name: &str, contents: &str) -> Self {
        self.dir_mut(slug)
            .insert(name.to_string(), MemoryFile::Text(contents.to_string()));
        self
    }

    /// A file that is listed but fails to read with `reason`.
    pub fn with_unreadable_file(mut self, slug: &str, name: &str, reason: &str) -> Self {
        self.dir_mut(slug)
            .insert(name.to_string(), MemoryFile::Unreadable(reason.to_string()));
        self
    }
}

impl CompanionResolver for MemoryCompanionResolver {
    fn tree_exists(&self) -> bool {
        self.tree.is_some()
    }

    fn dir_label(&self, slug: &str) -> String {
        format!("{}{}", self.prefix, slug)
    }

    fn list(&self, slug: &str) -> io::Result<Option<Vec<String>>> {
        Ok(self
            .tree
            .as_ref()
            .and_then(|tree| tree.get(slug))
            .map(|dir| dir.keys().cloned().collect()))
    }

    fn read(&self, slug: &str, file: &str) -> io::Result<Option<String>> {
        let entry = self
            .tree
            .as_ref()
            .and_then(|tree| tree.get(slug))
            .and_then(|dir| dir.get(file));
        match entry {
            None => Ok(None),
            Some(MemoryFile::Text(s)) => Ok(Some(s.clone())),
            Some(MemoryFile::Unreadable(reason)) => Err(io::Error::other(reason.clone())),
        }
    }
}
