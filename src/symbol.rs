use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::platform::GroupId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Unicode, // Platform-native emoji.
    Custom,  // Emoji uploaded to a group.
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub handle: SymbolHandle,
    #[serde(default)]
    pub animated: bool,
    #[serde(skip)]
    pub group: Option<GroupId>,
}

// A reaction chosen by the classifier, before custom names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub kind: SymbolKind,
    pub name: String,
}

impl Reaction {
    pub fn unicode(emoji: impl Into<String>) -> Self {
        Self {
            kind: SymbolKind::Unicode,
            name: emoji.into(),
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            kind: SymbolKind::Custom,
            name: name.into(),
        }
    }
}

// Immutable snapshot of every known custom symbol, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    generation: u64,
    entries: HashMap<String, SymbolEntry>,
}

impl SymbolTable {
    pub fn new(generation: u64, entries: HashMap<String, SymbolEntry>) -> Self {
        Self {
            generation,
            entries,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
