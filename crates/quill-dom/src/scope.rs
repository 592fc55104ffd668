//! Style Scope Registry
//!
//! Hands out small integer identifiers for named style scopes. `0` is the
//! global scope and is registered up front with an empty name. Entries are
//! only ever appended, so identifiers are never reused and lookups of existing
//! ids always see the same name.

use std::sync::{Arc, OnceLock, RwLock};

use quill_backend::StyleScopeId;

static GLOBAL_MANAGER: OnceLock<Arc<StyleScopeManager>> = OnceLock::new();

/// Append-only registry of style scope names
#[derive(Debug)]
pub struct StyleScopeManager {
    names: RwLock<Vec<String>>,
}

impl StyleScopeManager {
    pub fn new() -> Self {
        Self {
            names: RwLock::new(vec![String::new()]),
        }
    }

    /// The process-wide registry
    pub fn global() -> Arc<StyleScopeManager> {
        GLOBAL_MANAGER
            .get_or_init(|| Arc::new(StyleScopeManager::new()))
            .clone()
    }

    /// The global scope id
    pub fn global_scope() -> StyleScopeId {
        StyleScopeId::GLOBAL
    }

    /// Register a scope name and return its new id
    pub fn register(&self, name: &str) -> StyleScopeId {
        let mut names = match self.names.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = StyleScopeId(names.len() as u32);
        names.push(name.to_string());
        tracing::debug!("Registered style scope {:?} as {}", name, id.0);
        id
    }

    /// Name registered for `id`; the global scope answers with `""`
    pub fn query_name(&self, id: StyleScopeId) -> Option<String> {
        let names = match self.names.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        names.get(id.0 as usize).cloned()
    }

    /// Number of registered scopes, the global one included
    pub fn len(&self) -> usize {
        match self.names.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StyleScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let manager = StyleScopeManager::new();
        let a = manager.register("a");
        let b = manager.register("b");
        let a2 = manager.register("a");
        assert_eq!(a, StyleScopeId(1));
        assert_eq!(b, StyleScopeId(2));
        assert_eq!(a2, StyleScopeId(3));
        assert_eq!(manager.query_name(a).as_deref(), Some("a"));
        assert_eq!(manager.query_name(StyleScopeId::GLOBAL).as_deref(), Some(""));
        assert_eq!(manager.query_name(StyleScopeId(42)), None);
    }

    #[test]
    fn test_global_manager_is_shared() {
        let first = StyleScopeManager::global();
        let second = StyleScopeManager::global();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
