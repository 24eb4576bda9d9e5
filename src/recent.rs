use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecentKind {
    Card,
    Statement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentItem {
    pub kind: RecentKind,
    /// Identity within `kind`: a card id, or a statement file fingerprint.
    pub key: String,
    pub label: String,
    pub used_at: DateTime<Utc>,
}

/// Where the recent list lives between runs.
pub trait RecentStorage {
    fn load(&self) -> Result<Vec<RecentItem>>;
    fn save(&self, items: &[RecentItem]) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file, created on first save.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RecentStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<RecentItem>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable recent list");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, items: &[RecentItem]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, format!("{json}\n"))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<Vec<RecentItem>>,
}

impl RecentStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<RecentItem>> {
        Ok(self.items.borrow().clone())
    }

    fn save(&self, items: &[RecentItem]) -> Result<()> {
        *self.items.borrow_mut() = items.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.items.borrow_mut().clear();
        Ok(())
    }
}

/// Most-recent-first list with a fixed capacity. Touching an existing entry
/// moves it to the front; the oldest entry falls off when full. Every change
/// is written through to storage.
pub struct RecentItems<S: RecentStorage> {
    storage: S,
    capacity: usize,
    items: VecDeque<RecentItem>,
}

impl<S: RecentStorage> RecentItems<S> {
    pub fn load(storage: S, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut items: VecDeque<RecentItem> = storage.load()?.into();
        items.truncate(capacity);
        Ok(Self {
            storage,
            capacity,
            items,
        })
    }

    pub fn touch(&mut self, kind: RecentKind, key: &str, label: &str) -> Result<()> {
        self.touch_at(kind, key, label, Utc::now())
    }

    fn touch_at(&mut self, kind: RecentKind, key: &str, label: &str, used_at: DateTime<Utc>) -> Result<()> {
        self.items.retain(|i| !(i.kind == kind && i.key == key));
        self.items.push_front(RecentItem {
            kind,
            key: key.to_string(),
            label: label.to_string(),
            used_at,
        });
        self.items.truncate(self.capacity);
        self.storage.save(self.items.make_contiguous())
    }

    pub fn items(&self) -> impl Iterator<Item = &RecentItem> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: RecentKind) -> impl Iterator<Item = &RecentItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn most_recent(&self, kind: RecentKind) -> Option<&RecentItem> {
        self.of_kind(kind).next()
    }

    pub fn find(&self, kind: RecentKind, key: &str) -> Option<&RecentItem> {
        self.of_kind(kind).find(|i| i.key == key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.storage.clear()
    }
}
