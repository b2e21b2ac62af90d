// src/utils/ledger.rs
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::error;

/// Append-only newline-delimited record of processed file names.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every recorded name. A missing or unreadable ledger reads as empty.
    pub fn load(&self) -> HashSet<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                error!(path = %self.path.display(), "Failed to read ledger: {e}");
                HashSet::new()
            }
        }
    }

    pub fn is_processed(&self, name: &str) -> bool {
        self.load().contains(name)
    }

    pub fn mark_processed(&self, name: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_query() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("nested/ledger.txt"));
        assert!(!ledger.is_processed("X"));
        ledger.mark_processed("X").unwrap();
        assert!(ledger.is_processed("X"));
        assert!(!ledger.is_processed("Y"));
        assert!(!ledger.is_processed("X "));
    }
}
