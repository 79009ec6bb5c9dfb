pub mod parser;

pub use parser::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One decoded mapping from a raw code to its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBookEntry<K> {
    pub code: K,
    pub label: String,
    /// Label denotes an unknown, unreported or invalid code.
    pub placeholder: bool,
}

/// Inclusive, 0-indexed line range of the code book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the two code tables live inside the code book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLayout {
    pub countries: LineRange,
    pub ports: LineRange,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            countries: LineRange::new(9, 244),
            ports: LineRange::new(302, 892),
        }
    }
}

/// What to do with placeholder entries such as `NOT REPORTED/UNKNOWN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    #[default]
    Retain,
    Exclude,
}

/// The country and port code tables, immutable once built.
///
/// Entries keep their code-book order; port resolution depends on it.
#[derive(Debug, Clone, Default)]
pub struct CodeCatalog {
    countries: Vec<CodeBookEntry<i64>>,
    country_index: HashMap<i64, usize>,
    ports: Vec<CodeBookEntry<String>>,
    port_index: HashMap<String, usize>,
}

impl CodeCatalog {
    /// Builds a catalog from already-decoded entries. The first entry wins
    /// when a code repeats.
    pub fn from_entries(
        countries: Vec<CodeBookEntry<i64>>,
        ports: Vec<CodeBookEntry<String>>,
    ) -> Self {
        let mut catalog = CodeCatalog::default();
        for entry in countries {
            if !catalog.country_index.contains_key(&entry.code) {
                catalog.country_index.insert(entry.code, catalog.countries.len());
                catalog.countries.push(entry);
            }
        }
        for entry in ports {
            if !catalog.port_index.contains_key(&entry.code) {
                catalog.port_index.insert(entry.code.clone(), catalog.ports.len());
                catalog.ports.push(entry);
            }
        }
        catalog
    }

    pub fn country_name(&self, code: i64) -> Option<&str> {
        self.country_index
            .get(&code)
            .map(|&idx| self.countries[idx].label.as_str())
    }

    pub fn port_name(&self, code: &str) -> Option<&str> {
        self.port_index
            .get(code)
            .map(|&idx| self.ports[idx].label.as_str())
    }

    pub fn contains_port(&self, code: &str) -> bool {
        self.port_index.contains_key(code)
    }

    pub fn countries(&self) -> &[CodeBookEntry<i64>] {
        &self.countries
    }

    /// Port entries in code-book order.
    pub fn ports(&self) -> &[CodeBookEntry<String>] {
        &self.ports
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.countries.iter().filter(|e| e.placeholder).count()
            + self.ports.iter().filter(|e| e.placeholder).count()
    }
}
