use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// The translation units available to a lowering run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    units: BTreeMap<String, String>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.units.insert(name.into(), text.into());
    }

    /// Read a file from disk and register it under its display path.
    /// Returns the name the unit was stored under.
    pub fn load(&mut self, path: &Path) -> io::Result<String> {
        let text = fs::read_to_string(path)?;
        let name = path.display().to_string();
        self.units.insert(name.clone(), text);
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }
}
