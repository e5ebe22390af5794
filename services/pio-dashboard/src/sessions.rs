//! Open profile editor sessions
//!
//! Editors live between requests so the preview can keep the last valid
//! document. The number kept is capped; the least recently used session is
//! evicted first.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::pages::editor::ProfileEditor;

#[derive(Debug)]
pub struct EditorSessions {
    entries: VecDeque<(String, ProfileEditor)>,
    max_size: usize,
}

impl EditorSessions {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Store an editor as the most recently used session, replacing any
    /// session under the same key
    pub fn insert(&mut self, key: impl Into<String>, editor: ProfileEditor) {
        let key = key.into();
        self.remove(&key);
        while self.entries.len() >= self.max_size {
            if let Some((evicted, _)) = self.entries.pop_front() {
                tracing::debug!("Evicting editor session '{}'", evicted);
            }
        }
        self.entries.push_back((key, editor));
    }

    /// Look up a session and mark it most recently used
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ProfileEditor> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(index)?;
        self.entries.push_back(entry);
        self.entries.back_mut().map(|(_, editor)| editor)
    }

    pub fn remove(&mut self, key: &str) -> Option<ProfileEditor> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        self.entries.remove(index).map(|(_, editor)| editor)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Thread-safe editor session handle
pub type SessionsHandle = Arc<RwLock<EditorSessions>>;

pub fn new_sessions_handle(max_size: usize) -> SessionsHandle {
    Arc::new(RwLock::new(EditorSessions::new(max_size)))
}
