//! Class List / Resolution Engine
//!
//! Raw class tokens are kept per segment. Each token resolves against the
//! owner chain of its node into `(name, scope)` pairs:
//!
//! 1. a token the owner component declares as external class expands into
//!    the alias target tokens, resolved on the owner component's host;
//! 2. `~name` resolves against the root scope;
//! 3. `^name` resolves one owner level up per `^`;
//! 4. anything else resolves against the default scope, plus the extra scope
//!    when one is configured.
//!
//! The pairs emitted to the backend are reference counted, so a class implied
//! by two tokens is removed only when both are gone.

use std::collections::HashSet;

use quill_backend::StyleScopeId;

use crate::error::{DomError, DomResult};
use crate::mutation::MutationRecord;
use crate::tree::NodeTree;
use crate::NodeId;

/// Index of a class segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClassSegment(pub usize);

impl ClassSegment {
    /// The segment written by templates
    pub const MAIN: ClassSegment = ClassSegment(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EmittedClass {
    name: String,
    scope: StyleScopeId,
    count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExternalClass {
    name: String,
    alias: Option<Vec<String>>,
}

/// Per-node class state
#[derive(Debug, Clone, Default)]
pub struct ClassList {
    raw: Vec<Vec<String>>,
    externals: Vec<ExternalClass>,
    emitted: Vec<EmittedClass>,
}

/// Strip every `~` or `^` prefix of a raw token
pub fn strip_prefixes(token: &str) -> &str {
    if let Some(rest) = token.strip_prefix('~') {
        return rest;
    }
    token.trim_start_matches('^')
}

fn split_class_names(names: &str) -> Vec<String> {
    names.split_whitespace().map(str::to_string).collect()
}

impl ClassList {
    pub(crate) fn new(external_classes: Vec<String>) -> Self {
        Self {
            raw: Vec::new(),
            externals: external_classes
                .into_iter()
                .map(|name| ExternalClass { name, alias: None })
                .collect(),
            emitted: Vec::new(),
        }
    }

    pub fn raw_names(&self, segment: ClassSegment) -> &[String] {
        self.raw.get(segment.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Space separated tokens of a segment
    pub fn class_names(&self, segment: ClassSegment) -> String {
        self.raw_names(segment).join(" ")
    }

    /// Whether a token of the segment names `name`, ignoring prefixes
    pub fn contains(&self, name: &str, segment: ClassSegment) -> bool {
        self.raw_names(segment)
            .iter()
            .any(|raw| strip_prefixes(raw) == name)
    }

    pub fn is_external(&self, name: &str) -> bool {
        self.externals.iter().any(|e| e.name == name)
    }

    /// Current alias target of an external class, space separated
    pub fn alias(&self, name: &str) -> Option<String> {
        self.externals
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.alias.as_deref().unwrap_or(&[]).join(" "))
    }

    /// Pairs currently emitted to the backend
    pub fn emitted(&self) -> Vec<(String, StyleScopeId)> {
        self.emitted
            .iter()
            .map(|e| (e.name.clone(), e.scope))
            .collect()
    }

    /// `None` if `name` is not external; `Some(&[])` for an unset alias
    fn alias_tokens(&self, name: &str) -> Option<&[String]> {
        self.externals
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.alias.as_deref().unwrap_or(&[]))
    }

    fn references_any(&self, names: &HashSet<String>) -> bool {
        self.raw.iter().flatten().any(|raw| names.contains(raw))
    }

    fn segment_mut(&mut self, segment: ClassSegment) -> &mut Vec<String> {
        if self.raw.len() <= segment.0 {
            self.raw.resize_with(segment.0 + 1, Vec::new);
        }
        &mut self.raw[segment.0]
    }

    /// Count one more reference; `true` when the pair is new
    fn retain(&mut self, name: &str, scope: StyleScopeId) -> bool {
        match self
            .emitted
            .iter_mut()
            .find(|e| e.name == name && e.scope == scope)
        {
            Some(entry) => {
                entry.count += 1;
                false
            }
            None => {
                self.emitted.push(EmittedClass {
                    name: name.to_string(),
                    scope,
                    count: 1,
                });
                true
            }
        }
    }

    /// Drop one reference; `true` when the pair is gone
    fn release(&mut self, name: &str, scope: StyleScopeId) -> bool {
        let Some(pos) = self
            .emitted
            .iter()
            .position(|e| e.name == name && e.scope == scope)
        else {
            return false;
        };
        if self.emitted[pos].count <= 1 {
            self.emitted.remove(pos);
            true
        } else {
            self.emitted[pos].count -= 1;
            false
        }
    }

    /// Replace the emitted multiset, returning the pairs to add and remove
    fn diff(
        &mut self,
        resolved: Vec<(String, StyleScopeId)>,
    ) -> (Vec<(String, StyleScopeId)>, Vec<(String, StyleScopeId)>) {
        let mut next: Vec<EmittedClass> = Vec::new();
        for (name, scope) in resolved {
            match next.iter_mut().find(|e| e.name == name && e.scope == scope) {
                Some(entry) => entry.count += 1,
                None => next.push(EmittedClass { name, scope, count: 1 }),
            }
        }
        let added = next
            .iter()
            .filter(|n| !self.emitted.iter().any(|o| o.name == n.name && o.scope == n.scope))
            .map(|n| (n.name.clone(), n.scope))
            .collect();
        let removed = self
            .emitted
            .iter()
            .filter(|o| !next.iter().any(|n| n.name == o.name && n.scope == o.scope))
            .map(|o| (o.name.clone(), o.scope))
            .collect();
        self.emitted = next;
        (added, removed)
    }
}

impl NodeTree {
    /// Component whose shadow tree contains `node`
    pub fn owner_host(&self, node: NodeId) -> Option<NodeId> {
        let owner = self.get(node)?.owner?;
        self.host_of(owner)
    }

    /// Default scope of the node's classes
    pub fn default_scope(&self, node: NodeId) -> StyleScopeId {
        self.owner_host(node)
            .and_then(|host| self.get(host))
            .and_then(|host| host.component_options())
            .map(|options| options.style_scope)
            .unwrap_or(StyleScopeId::GLOBAL)
    }

    fn extra_scope(&self, node: NodeId) -> Option<StyleScopeId> {
        self.owner_host(node)
            .and_then(|host| self.get(host))
            .and_then(|host| host.component_options())
            .and_then(|options| options.extra_style_scope)
    }

    /// Scope of the top-most scoped owner; the unscoped root is skipped
    pub fn root_scope(&self, node: NodeId) -> StyleScopeId {
        match self.owner_host(node) {
            Some(owner) if self.owner_host(owner).is_some() => self.root_scope(owner),
            _ => self.default_scope(node),
        }
    }

    /// Resolve one raw token of `node` into backend pairs
    pub fn resolve_class(&self, node: NodeId, token: &str) -> Vec<(String, StyleScopeId)> {
        let mut out = Vec::new();
        self.resolve_into(node, token, &mut out);
        out
    }

    fn resolve_into(&self, node: NodeId, token: &str, out: &mut Vec<(String, StyleScopeId)>) {
        let owner = self.owner_host(node);
        if let Some(owner) = owner {
            let targets = self
                .get(owner)
                .and_then(|o| o.class_list.as_ref())
                .and_then(|cl| cl.alias_tokens(token))
                .map(<[String]>::to_vec);
            if let Some(targets) = targets {
                for target in targets {
                    self.resolve_into(owner, &target, out);
                }
                return;
            }
        }
        if let Some(rest) = token.strip_prefix('~') {
            out.push((rest.to_string(), self.root_scope(node)));
        } else if let Some(rest) = token.strip_prefix('^') {
            let mut name = rest;
            let mut level = owner;
            while let Some(r) = name.strip_prefix('^') {
                name = r;
                level = level.and_then(|l| self.owner_host(l));
            }
            let scope = match level {
                Some(level) if self.owner_host(level).is_some() => self.default_scope(level),
                _ => self.root_scope(node),
            };
            out.push((name.to_string(), scope));
        } else {
            if let Some(extra) = self.extra_scope(node) {
                out.push((token.to_string(), extra));
            }
            out.push((token.to_string(), self.default_scope(node)));
        }
    }

    fn class_list(&self, node: NodeId) -> DomResult<&ClassList> {
        self.node(node)?
            .class_list
            .as_ref()
            .ok_or(DomError::NotAnElement(node))
    }

    fn class_list_mut(&mut self, node: NodeId) -> DomResult<&mut ClassList> {
        self.node_mut(node)?
            .class_list
            .as_mut()
            .ok_or(DomError::NotAnElement(node))
    }

    /// Recompute every pair of `node` and emit the difference
    pub(crate) fn update_resolved_classes(&mut self, node: NodeId) {
        let Some(elem) = self.get(node).and_then(|n| n.be) else {
            return;
        };
        let tokens: Vec<String> = match self.get(node).and_then(|n| n.class_list.as_ref()) {
            Some(cl) => cl.raw.iter().flatten().cloned().collect(),
            None => return,
        };
        let mut resolved = Vec::new();
        for token in &tokens {
            self.resolve_into(node, token, &mut resolved);
        }
        let Ok(cl) = self.class_list_mut(node) else {
            return;
        };
        let (added, removed) = cl.diff(resolved);
        for (name, scope) in &added {
            self.strategy
                .add_class(self.backend.as_mut(), &self.scopes, elem, name, *scope);
        }
        for (name, scope) in &removed {
            self.strategy
                .remove_class(self.backend.as_mut(), &self.scopes, elem, name, *scope);
        }
    }

    /// Replace the tokens of a segment with the whitespace separated `names`
    pub fn set_class_names(
        &mut self,
        node: NodeId,
        names: &str,
        segment: ClassSegment,
    ) -> DomResult<()> {
        let tokens = split_class_names(names);
        *self.class_list_mut(node)?.segment_mut(segment) = tokens;
        self.update_resolved_classes(node);
        self.notify(MutationRecord::Properties {
            target: node,
            attribute_name: "class".to_string(),
        });
        Ok(())
    }

    /// Space separated tokens of a segment
    pub fn class_names(&self, node: NodeId, segment: ClassSegment) -> DomResult<String> {
        Ok(self.class_list(node)?.class_names(segment))
    }

    pub fn contains_class(
        &self,
        node: NodeId,
        name: &str,
        segment: ClassSegment,
    ) -> DomResult<bool> {
        Ok(self.class_list(node)?.contains(name, segment))
    }

    /// Add or remove one occurrence of a token. Without `force` the token is
    /// flipped. Returns whether the token is present afterwards.
    pub fn toggle_class(
        &mut self,
        node: NodeId,
        name: &str,
        force: Option<bool>,
        segment: ClassSegment,
    ) -> DomResult<bool> {
        if name.chars().any(char::is_whitespace) {
            return Err(DomError::ClassNameWhitespace(name.to_string()));
        }
        let present = self
            .class_list(node)?
            .raw_names(segment)
            .iter()
            .any(|raw| raw == name);
        let add = force.unwrap_or(!present);
        if add == present || name.is_empty() {
            return Ok(present);
        }
        let elem = self.get(node).and_then(|n| n.be);
        let resolved = self.resolve_class(node, name);
        let cl = self.class_list_mut(node)?;
        let segment_tokens = cl.segment_mut(segment);
        if add {
            segment_tokens.push(name.to_string());
        } else if let Some(pos) = segment_tokens.iter().position(|raw| raw == name) {
            // one token out, one reference released below
            segment_tokens.remove(pos);
        }
        let present_after = segment_tokens.iter().any(|raw| raw == name);
        if let Some(elem) = elem {
            for (class, scope) in &resolved {
                let cl = self.class_list_mut(node)?;
                if add {
                    if cl.retain(class, *scope) {
                        self.strategy
                            .add_class(self.backend.as_mut(), &self.scopes, elem, class, *scope);
                    }
                } else if cl.release(class, *scope) {
                    self.strategy
                        .remove_class(self.backend.as_mut(), &self.scopes, elem, class, *scope);
                }
            }
        }
        self.notify(MutationRecord::Properties {
            target: node,
            attribute_name: "class".to_string(),
        });
        Ok(present_after)
    }

    pub fn add_class(&mut self, node: NodeId, name: &str, segment: ClassSegment) -> DomResult<()> {
        self.toggle_class(node, name, Some(true), segment).map(|_| ())
    }

    pub fn remove_class(
        &mut self,
        node: NodeId,
        name: &str,
        segment: ClassSegment,
    ) -> DomResult<()> {
        self.toggle_class(node, name, Some(false), segment).map(|_| ())
    }

    /// Pairs currently emitted to the backend for `node`
    pub fn emitted_classes(&self, node: NodeId) -> DomResult<Vec<(String, StyleScopeId)>> {
        Ok(self.class_list(node)?.emitted())
    }

    /// Declare an external class on a component before association
    pub fn add_external_class(&mut self, component: NodeId, name: &str) -> DomResult<()> {
        let node = self.node(component)?;
        if !node.is_component() {
            return Err(DomError::NotAComponent(component));
        }
        if node.associated {
            return Err(DomError::AlreadyAssociated(component));
        }
        let elem = node.be;
        let cl = self.class_list_mut(component)?;
        if !cl.is_external(name) {
            cl.externals.push(ExternalClass {
                name: name.to_string(),
                alias: None,
            });
            if let Some(elem) = elem {
                self.strategy.add_external_class(self.backend.as_mut(), elem, name);
            }
        }
        Ok(())
    }

    /// Current alias target of an external class
    pub fn class_alias(&self, component: NodeId, name: &str) -> DomResult<Option<String>> {
        if !self.node(component)?.is_component() {
            return Err(DomError::NotAComponent(component));
        }
        Ok(self.class_list(component)?.alias(name))
    }

    /// Point an external class of `component` at the whitespace separated
    /// `target` tokens and update every node that depends on it
    pub fn set_class_alias(
        &mut self,
        component: NodeId,
        name: &str,
        target: &str,
    ) -> DomResult<()> {
        let node = self.node(component)?;
        if !node.is_component() {
            return Err(DomError::NotAComponent(component));
        }
        let elem = node.be;
        let cl = self.class_list_mut(component)?;
        let Some(external) = cl.externals.iter_mut().find(|e| e.name == name) else {
            return Err(DomError::UnknownExternalClass {
                component,
                name: name.to_string(),
            });
        };
        external.alias = Some(split_class_names(target));
        if let Some(elem) = elem {
            self.strategy
                .set_class_alias(self.backend.as_mut(), elem, name, target);
        }
        self.propagate_alias(component, name);
        Ok(())
    }

    /// Recompute, once each, every node that depends on the external class
    /// `name` of `component`, directly or through further aliases
    fn propagate_alias(&mut self, component: NodeId, name: &str) {
        let mut work: Vec<(NodeId, String)> = vec![(component, name.to_string())];
        let mut seen: HashSet<(NodeId, String)> = HashSet::new();
        seen.insert((component, name.to_string()));
        let mut pending: Vec<NodeId> = Vec::new();
        let mut queued: HashSet<NodeId> = HashSet::new();

        while let Some((comp, dirty)) = work.pop() {
            let Some(shadow_root) = self.get(comp).and_then(|c| c.shadow_root()) else {
                continue;
            };
            let dirty_set: HashSet<String> = std::iter::once(dirty.clone()).collect();
            for desc in self.owned_by(shadow_root) {
                let Some(cl) = self.get(desc).and_then(|n| n.class_list.as_ref()) else {
                    continue;
                };
                for external in &cl.externals {
                    let depends = external
                        .alias
                        .as_ref()
                        .is_some_and(|alias| alias.iter().any(|t| *t == dirty));
                    if depends && seen.insert((desc, external.name.clone())) {
                        work.push((desc, external.name.clone()));
                    }
                }
                if cl.references_any(&dirty_set) && queued.insert(desc) {
                    pending.push(desc);
                }
            }
        }

        tracing::debug!(
            "Class alias {:?} of {:?} changed, updating {} nodes",
            name,
            component,
            pending.len()
        );
        for node in pending {
            self.update_resolved_classes(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefixes() {
        assert_eq!(strip_prefixes("~a"), "a");
        assert_eq!(strip_prefixes("^^b"), "b");
        assert_eq!(strip_prefixes("c"), "c");
    }

    #[test]
    fn test_refcount_keeps_shared_pair() {
        let mut cl = ClassList::new(Vec::new());
        assert!(cl.retain("a", StyleScopeId(1)));
        assert!(!cl.retain("a", StyleScopeId(1)));
        assert!(cl.retain("a", StyleScopeId(2)));
        assert!(!cl.release("a", StyleScopeId(1)));
        assert!(cl.release("a", StyleScopeId(1)));
        assert!(!cl.release("a", StyleScopeId(1)));
        assert_eq!(cl.emitted(), vec![("a".to_string(), StyleScopeId(2))]);
    }

    #[test]
    fn test_diff_retains_unchanged_pairs() {
        let mut cl = ClassList::new(Vec::new());
        let s = StyleScopeId(3);
        let (added, removed) = cl.diff(vec![("a".into(), s), ("b".into(), s)]);
        assert_eq!(added.len(), 2);
        assert!(removed.is_empty());

        let (added, removed) = cl.diff(vec![("b".into(), s), ("c".into(), s), ("c".into(), s)]);
        assert_eq!(added, vec![("c".to_string(), s)]);
        assert_eq!(removed, vec![("a".to_string(), s)]);
    }

    #[test]
    fn test_contains_ignores_prefixes() {
        let mut cl = ClassList::new(Vec::new());
        *cl.segment_mut(ClassSegment::MAIN) = split_class_names(" ~a  ^^b c ");
        assert!(cl.contains("a", ClassSegment::MAIN));
        assert!(cl.contains("b", ClassSegment::MAIN));
        assert!(cl.contains("c", ClassSegment::MAIN));
        assert!(!cl.contains("^^b", ClassSegment::MAIN));
        assert!(!cl.contains("a", ClassSegment(1)));
        assert_eq!(cl.class_names(ClassSegment::MAIN), "~a ^^b c");
    }

    #[test]
    fn test_unset_alias_is_empty() {
        let cl = ClassList::new(vec!["ext".into()]);
        assert_eq!(cl.alias_tokens("ext"), Some(&[][..]));
        assert_eq!(cl.alias("ext").as_deref(), Some(""));
        assert_eq!(cl.alias_tokens("other"), None);
    }
}
