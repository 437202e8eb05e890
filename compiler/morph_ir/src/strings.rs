//! Deduplicating pool for string literal constants.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::arena::to_u32;
use crate::StrId;

/// String literal constants referenced by `StrLiteral` nodes.
///
/// Equal literals share one `StrId`, and the stored `Arc<str>` is handed out
/// directly as the runtime value so reading a literal never copies bytes.
#[derive(Clone, Debug, Default)]
pub struct StringPool {
    strings: Vec<Arc<str>>,
    index: FxHashMap<Arc<str>, StrId>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning the existing ID if it was seen before.
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = StrId::new(to_u32(self.strings.len(), "string constants"));
        let shared: Arc<str> = Arc::from(s);
        self.strings.push(Arc::clone(&shared));
        self.index.insert(shared, id);
        id
    }

    /// Look up an interned string. Returns `None` for foreign IDs.
    pub fn get(&self, id: StrId) -> Option<&Arc<str>> {
        self.strings.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
