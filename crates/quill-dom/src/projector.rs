//! Composed-Tree Projector
//!
//! Every logical child-list change goes through [`NodeTree::splice_children`].
//! A splice runs in fixed phases so the backend never sees an invalid
//! sequence:
//!
//! 1. slots inside removed subtrees give their content up;
//! 2. removed nodes leave their slots and the backend tree;
//! 3. the logical child list is updated;
//! 4. mirrored backends receive one structural call for the whole change;
//! 5. inserted light content is assigned to slots;
//! 6. composed backends receive the inserted footprints, batched per
//!    composed parent;
//! 7. components whose slot set changed re-distribute their light content;
//! 8. one child-list record is delivered.
//!
//! The *footprint* of a node is the list of backend elements it contributes
//! to a composed backend: its own element, or the footprints of its composed
//! children when it has none.

use std::collections::HashSet;

use quill_backend::ElementId;

use crate::error::{DomError, DomResult};
use crate::mutation::MutationRecord;
use crate::node::SlotState;
use crate::tree::NodeTree;
use crate::NodeId;

impl NodeTree {
    // --- composed structure ---

    /// Nearest logical ancestor that is not an inherit-slot node
    fn effective_parent(&self, node: NodeId) -> Option<NodeId> {
        let mut parent = self.get(node)?.parent;
        while let Some(p) = parent {
            if self.nodes[p.index()].is_inherit_slots() {
                parent = self.nodes[p.index()].parent;
            } else {
                break;
            }
        }
        parent
    }

    /// Component whose light content the children of `container` are
    fn light_host_of_container(&self, container: NodeId) -> Option<NodeId> {
        let mut cur = container;
        while self.nodes[cur.index()].is_inherit_slots() {
            cur = self.nodes[cur.index()].parent?;
        }
        self.nodes[cur.index()].is_component().then_some(cur)
    }

    /// Component whose light content `node` is
    pub fn light_host(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent?;
        if self.nodes[node.index()].is_inherit_slots() {
            return None;
        }
        self.light_host_of_container(parent)
    }

    fn expand_into(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let n = &self.nodes[node.index()];
        if n.is_inherit_slots() {
            for &child in &n.children {
                self.expand_into(child, out);
            }
        } else {
            out.push(node);
        }
    }

    /// Replace inherit-slot nodes by their children, recursively
    fn expand(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &node in nodes {
            self.expand_into(node, &mut out);
        }
        out
    }

    /// Light content units of a component in light-tree order
    fn light_units(&self, host: NodeId) -> Vec<NodeId> {
        self.expand(&self.nodes[host.index()].children)
    }

    /// Children in the composed tree
    pub fn composed_children(&self, node: NodeId) -> Vec<NodeId> {
        let Some(n) = self.get(node) else {
            return Vec::new();
        };
        if let Some(shadow_root) = n.shadow_root() {
            return vec![shadow_root];
        }
        if let Some(slot) = n.slot_data() {
            return slot.nodes.clone();
        }
        self.expand(&n.children)
    }

    fn compute_composed_parent(&self, node: NodeId) -> Option<NodeId> {
        let n = self.get(node)?;
        match n.slot_state {
            SlotState::Slot(slot) => return Some(slot),
            SlotState::Detached => return None,
            SlotState::Unassigned => {}
        }
        if let crate::NodeKind::ShadowRoot { host } = n.kind {
            return Some(host);
        }
        if n.is_inherit_slots() {
            return None;
        }
        let parent = self.effective_parent(node)?;
        let p = &self.nodes[parent.index()];
        if p.is_component() || p.is_slot() {
            None
        } else {
            Some(parent)
        }
    }

    pub(crate) fn refresh_composed_parent(&mut self, node: NodeId) {
        let parent = self.compute_composed_parent(node);
        self.nodes[node.index()].composed_parent = parent;
    }

    /// Parent in the composed tree; `None` when the node is not rendered
    pub fn composed_parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.composed_parent
    }

    /// Slot `node` is distributed into
    pub fn containing_slot(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.slot_state.slot()
    }

    /// Nodes distributed into `slot`
    pub fn slot_nodes(&self, slot: NodeId) -> DomResult<Vec<NodeId>> {
        self.node(slot)?
            .slot_data()
            .map(|s| s.nodes.clone())
            .ok_or(DomError::NotStructural(slot))
    }

    /// Slots of a component's shadow tree, in tree order
    pub fn slots_of(&self, host: NodeId) -> Vec<NodeId> {
        let Some(shadow_root) = self.get(host).and_then(|h| h.shadow_root()) else {
            return Vec::new();
        };
        self.descendants(shadow_root)
            .into_iter()
            .filter(|&d| self.nodes[d.index()].is_slot())
            .collect()
    }

    fn slots_in_subtree(&self, node: NodeId) -> Vec<NodeId> {
        std::iter::once(node)
            .chain(self.descendants(node))
            .filter(|&d| self.nodes[d.index()].is_slot())
            .collect()
    }

    /// Whether the logical ancestors of `node` end at a shadow root
    fn is_in_shadow_tree(&self, node: NodeId) -> bool {
        let mut cur = node;
        while let Some(parent) = self.nodes[cur.index()].parent {
            cur = parent;
        }
        self.nodes[cur.index()].is_shadow_root()
    }

    /// Component whose shadow tree holds the children of `container`
    fn shadow_host_of_container(&self, container: NodeId) -> Option<NodeId> {
        if let crate::NodeKind::ShadowRoot { host } = self.nodes[container.index()].kind {
            return Some(host);
        }
        self.owner_host(container)
    }

    // --- footprints ---

    fn footprint_into(&self, node: NodeId, pending: &HashSet<NodeId>, out: &mut Vec<ElementId>) {
        if pending.contains(&node) {
            return;
        }
        if let Some(be) = self.nodes[node.index()].be {
            out.push(be);
            return;
        }
        for child in self.composed_children(node) {
            self.footprint_into(child, pending, out);
        }
    }

    /// Backend elements `node` contributes to a composed backend
    pub fn footprint(&self, node: NodeId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if self.get(node).is_some() {
            self.footprint_into(node, &HashSet::new(), &mut out);
        }
        out
    }

    fn first_element(&self, node: NodeId, pending: &HashSet<NodeId>) -> Option<ElementId> {
        if pending.contains(&node) {
            return None;
        }
        if let Some(be) = self.nodes[node.index()].be {
            return Some(be);
        }
        self.composed_children(node)
            .into_iter()
            .find_map(|child| self.first_element(child, pending))
    }

    /// Backend element holding the footprint of `node`
    fn physical_container(&self, node: NodeId) -> Option<ElementId> {
        let mut cur = node;
        loop {
            match self.nodes[cur.index()].composed_parent {
                Some(parent) => {
                    if let Some(be) = self.nodes[parent.index()].be {
                        return Some(be);
                    }
                    cur = parent;
                }
                None => {
                    return (self.root == Some(cur)).then(|| self.backend.root_node());
                }
            }
        }
    }

    /// First element rendered after `node` within its container
    fn next_anchor(&self, node: NodeId, pending: &HashSet<NodeId>) -> Option<ElementId> {
        let mut cur = node;
        loop {
            let parent = self.nodes[cur.index()].composed_parent?;
            let siblings = self.composed_children(parent);
            if let Some(i) = siblings.iter().position(|&s| s == cur) {
                let found = siblings[i + 1..]
                    .iter()
                    .find_map(|&s| self.first_element(s, pending));
                if found.is_some() {
                    return found;
                }
            }
            if self.nodes[parent.index()].be.is_some() {
                return None;
            }
            cur = parent;
        }
    }

    pub(crate) fn fragment(&mut self) -> ElementId {
        match self.fragment {
            Some(fragment) => fragment,
            None => {
                let fragment = self.backend.create_fragment();
                self.fragment = Some(fragment);
                fragment
            }
        }
    }

    pub(crate) fn emit_insert(
        &mut self,
        container: ElementId,
        before: Option<ElementId>,
        elems: &[ElementId],
    ) {
        match elems {
            [] => {}
            [elem] => match before {
                Some(before) => self.backend.insert_before(container, *elem, before, None),
                None => self.backend.append_child(container, *elem),
            },
            _ => {
                let fragment = self.fragment();
                for &elem in elems {
                    self.backend.append_child(fragment, elem);
                }
                match before {
                    Some(before) => self.backend.splice_before(container, before, 0, fragment),
                    None => self.backend.splice_append(container, fragment),
                }
            }
        }
        tracing::trace!("Inserted {} elements into {:?}", elems.len(), container);
    }

    /// Group units by composed parent, keeping first-appearance order
    fn group_by_composed_parent(&self, units: &[NodeId]) -> Vec<Vec<NodeId>> {
        let mut groups: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for &unit in units {
            let Some(parent) = self.nodes[unit.index()].composed_parent else {
                continue;
            };
            match groups.iter_mut().find(|(p, _)| *p == parent) {
                Some((_, group)) => group.push(unit),
                None => groups.push((parent, vec![unit])),
            }
        }
        groups.into_iter().map(|(_, group)| group).collect()
    }

    /// Remove the footprints of composed units from a composed backend
    pub(crate) fn remove_unit_footprints(&mut self, units: &[NodeId]) {
        let none = HashSet::new();
        for group in self.group_by_composed_parent(units) {
            let Some(container) = self.physical_container(group[0]) else {
                continue;
            };
            let mut elems = Vec::new();
            for &unit in &group {
                self.footprint_into(unit, &none, &mut elems);
            }
            match elems.as_slice() {
                [] => {}
                [elem] => self.backend.remove_child(container, *elem, None),
                _ => self.backend.splice_remove(container, elems[0], elems.len()),
            }
        }
    }

    /// Insert the footprints of composed units into a composed backend
    fn insert_unit_footprints(&mut self, units: &[NodeId]) {
        let mut pending: HashSet<NodeId> = units.iter().copied().collect();
        for group in self.group_by_composed_parent(units) {
            for unit in &group {
                pending.remove(unit);
            }
            let Some(container) = self.physical_container(group[0]) else {
                continue;
            };
            let mut elems = Vec::new();
            for &unit in &group {
                self.footprint_into(unit, &pending, &mut elems);
            }
            if elems.is_empty() {
                continue;
            }
            let last = group[group.len() - 1];
            let before = self.next_anchor(last, &pending);
            self.emit_insert(container, before, &elems);
        }
    }

    /// One structural call on a backend that mirrors the logical tree
    fn emit_mirrored_splice(
        &mut self,
        parent: NodeId,
        pos: usize,
        removed: &[NodeId],
        inserted: &[NodeId],
    ) {
        let Some(container) = self.nodes[parent.index()].be else {
            return;
        };
        let children = &self.nodes[parent.index()].children;
        let index = children[..pos]
            .iter()
            .filter(|c| self.nodes[c.index()].be.is_some())
            .count();
        let next = children[pos + inserted.len()..]
            .iter()
            .find_map(|c| self.nodes[c.index()].be);
        let old: Vec<ElementId> = removed
            .iter()
            .filter_map(|r| self.nodes[r.index()].be)
            .collect();
        let new: Vec<ElementId> = inserted
            .iter()
            .filter_map(|i| self.nodes[i.index()].be)
            .collect();

        match (old.as_slice(), new.as_slice()) {
            ([], []) => {}
            ([old], []) => self.backend.remove_child(container, *old, Some(index)),
            (old, []) => self.backend.splice_remove(container, old[0], old.len()),
            ([], [new]) => match next {
                Some(before) => self.backend.insert_before(container, *new, before, Some(index)),
                None => self.backend.append_child(container, *new),
            },
            ([old], [new]) => self.backend.replace_child(container, *new, *old, Some(index)),
            (old, new) => {
                let fragment = self.fragment();
                for &elem in new {
                    self.backend.append_child(fragment, elem);
                }
                match (old.first(), next) {
                    (Some(&first), _) => {
                        self.backend.splice_before(container, first, old.len(), fragment)
                    }
                    (None, Some(before)) => {
                        self.backend.splice_before(container, before, 0, fragment)
                    }
                    (None, None) => self.backend.splice_append(container, fragment),
                }
            }
        }
        tracing::trace!(
            "Spliced {:?}: -{} +{} at {}",
            parent,
            removed.len(),
            inserted.len(),
            pos
        );
    }

    // --- slot assignment ---

    /// Slot `unit` should be distributed into
    fn desired_slot(&self, host: NodeId, unit: NodeId) -> Option<NodeId> {
        let slots = self.slots_of(host);
        let multiple = self.nodes[host.index()]
            .component_options()
            .is_some_and(|o| o.multiple_slots);
        if !multiple {
            return slots.first().copied();
        }
        let name = &self.nodes[unit.index()].slot_name;
        slots.into_iter().find(|&s| {
            self.nodes[s.index()]
                .slot_data()
                .is_some_and(|data| data.name == *name)
        })
    }

    /// Position of `unit` in the content of `slot`, by light-tree order
    fn slot_insert_index(&self, slot: NodeId, unit: NodeId) -> usize {
        let Some(host) = self.light_host(unit) else {
            return 0;
        };
        let order = self.light_units(host);
        let Some(unit_pos) = order.iter().position(|&u| u == unit) else {
            return 0;
        };
        self.nodes[slot.index()]
            .slot_data()
            .map(|data| {
                data.nodes
                    .iter()
                    .filter(|n| order.iter().position(|u| u == *n).is_some_and(|p| p < unit_pos))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Update slot lists and the slot state, returning the index in the new slot
    fn move_between_slot_lists(&mut self, unit: NodeId, state: SlotState) -> usize {
        if let Some(old) = self.nodes[unit.index()].slot_state.slot() {
            if let Some(data) = self.nodes[old.index()].slot_data_mut() {
                data.nodes.retain(|&n| n != unit);
            }
        }
        let mut index = 0;
        if let SlotState::Slot(slot) = state {
            index = self.slot_insert_index(slot, unit);
            if let Some(data) = self.nodes[slot.index()].slot_data_mut() {
                data.nodes.insert(index, unit);
            }
        }
        self.nodes[unit.index()].slot_state = state;
        self.refresh_composed_parent(unit);
        index
    }

    /// Initial distribution of freshly inserted light content
    fn attach_to_slot(&mut self, unit: NodeId, slot: Option<NodeId>) {
        let state = match slot {
            Some(slot) => SlotState::Slot(slot),
            None => SlotState::Detached,
        };
        self.move_between_slot_lists(unit, state);
        if self.strategy.mirrors_logical_tree() {
            if let Some(be) = self.nodes[unit.index()].be {
                let slot_be = slot.and_then(|s| self.nodes[s.index()].be);
                self.backend.set_containing_slot(be, slot_be);
            }
        }
    }

    /// Move `unit` to another slot as one step
    pub(crate) fn reassign_slot(&mut self, unit: NodeId, state: SlotState) {
        let old = self.nodes[unit.index()].slot_state;
        if old == state {
            return;
        }
        if self.strategy.mirrors_logical_tree() {
            let index = self.move_between_slot_lists(unit, state);
            if let Some(be) = self.nodes[unit.index()].be {
                let old_be = old.slot().and_then(|s| self.nodes[s.index()].be);
                let new_be = state.slot().and_then(|s| self.nodes[s.index()].be);
                self.backend.reassign_containing_slot(be, old_be, new_be, index);
            }
        } else {
            if old.slot().is_some() {
                self.remove_unit_footprints(&[unit]);
            }
            self.move_between_slot_lists(unit, state);
            if state.slot().is_some() {
                self.insert_unit_footprints(&[unit]);
            }
        }
        tracing::debug!("Reassigned {:?} from {:?} to {:?}", unit, old, state);
    }

    /// Re-distribute the light content of `host` over its current slots
    pub(crate) fn refresh_slots(&mut self, host: NodeId) {
        for unit in self.light_units(host) {
            let state = match self.desired_slot(host, unit) {
                Some(slot) => SlotState::Slot(slot),
                None => SlotState::Detached,
            };
            self.reassign_slot(unit, state);
        }
    }

    // --- splicing ---

    /// Whether `ancestor` is `node` or one of its ancestors, crossing
    /// shadow boundaries
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            let n = &self.nodes[c.index()];
            cur = match n.kind {
                crate::NodeKind::ShadowRoot { host } => Some(host),
                _ => n.parent,
            };
        }
        false
    }

    fn validate_splice(
        &self,
        parent: NodeId,
        index: usize,
        remove_count: usize,
        inserted: &[NodeId],
    ) -> DomResult<()> {
        let p = self.node(parent)?;
        if !p.is_container() {
            return Err(DomError::NotAContainer(parent));
        }
        let len = p.children.len();
        if index > len || remove_count > len - index {
            return Err(DomError::IndexOutOfRange {
                index: index.saturating_add(remove_count),
                len,
            });
        }
        let expected_owner = if p.is_shadow_root() { Some(parent) } else { p.owner };
        let mut seen = HashSet::new();
        for &child in inserted {
            let c = self.node(child)?;
            let invalid = c.is_shadow_root()
                || self.root == Some(child)
                || c.owner != expected_owner
                || c.owner.is_none()
                || !seen.insert(child)
                || self.is_inclusive_ancestor(child, parent);
            if invalid {
                return Err(DomError::HierarchyRequest { parent, child });
            }
        }
        Ok(())
    }

    /// Remove `remove_count` children of `parent` starting at `index` and
    /// insert `inserted` there. Inserted nodes are detached from their
    /// current parents first.
    pub fn splice_children(
        &mut self,
        parent: NodeId,
        index: usize,
        remove_count: usize,
        inserted: &[NodeId],
    ) -> DomResult<()> {
        self.validate_splice(parent, index, remove_count, inserted)?;
        let children = self.nodes[parent.index()].children.clone();
        let moving: HashSet<NodeId> = inserted.iter().copied().collect();
        let removed: Vec<NodeId> = children[index..index + remove_count]
            .iter()
            .filter(|c| !moving.contains(c))
            .copied()
            .collect();
        let anchor = children[index + remove_count..]
            .iter()
            .find(|c| !moving.contains(c))
            .copied();

        for &node in inserted {
            if let Some(old_parent) = self.nodes[node.index()].parent {
                let pos = self.child_position(old_parent, node)?;
                self.splice_detached(old_parent, pos, 1, &[]);
            }
        }

        let children = &self.nodes[parent.index()].children;
        let pos = match (removed.first(), anchor) {
            (Some(first), _) => children.iter().position(|c| c == first),
            (None, Some(anchor)) => children.iter().position(|c| *c == anchor),
            (None, None) => Some(children.len()),
        }
        .unwrap_or(children.len());
        self.splice_detached(parent, pos, removed.len(), inserted);
        Ok(())
    }

    pub(crate) fn child_position(&self, parent: NodeId, child: NodeId) -> DomResult<usize> {
        self.node(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild { parent, child })
    }

    /// The splice itself; every inserted node is parentless
    fn splice_detached(
        &mut self,
        parent: NodeId,
        pos: usize,
        remove_count: usize,
        inserted: &[NodeId],
    ) {
        let mirrors = self.strategy.mirrors_logical_tree();
        let removed: Vec<NodeId> =
            self.nodes[parent.index()].children[pos..pos + remove_count].to_vec();
        let light_host = self.light_host_of_container(parent);
        let in_shadow_tree = self.is_in_shadow_tree(parent);
        let mut dirty_hosts: Vec<NodeId> = Vec::new();

        // slots leaving the shadow tree give their content up
        if in_shadow_tree {
            for &r in &removed {
                for slot in self.slots_in_subtree(r) {
                    let content = self.slot_nodes(slot).unwrap_or_default();
                    for unit in content {
                        self.reassign_slot(unit, SlotState::Detached);
                    }
                    if let Some(host) = self.owner_host(slot) {
                        dirty_hosts.push(host);
                    }
                }
            }
        }

        // removed nodes leave the backend tree and their slots
        let removed_units = self.expand(&removed);
        if light_host.is_some() {
            if mirrors {
                for &unit in &removed_units {
                    let n = &self.nodes[unit.index()];
                    if let (Some(be), SlotState::Slot(_)) = (n.be, n.slot_state) {
                        self.backend.set_containing_slot(be, None);
                    }
                }
            } else {
                self.remove_unit_footprints(&removed_units);
            }
            for &unit in &removed_units {
                self.move_between_slot_lists(unit, SlotState::Unassigned);
            }
        } else if !mirrors {
            self.remove_unit_footprints(&removed_units);
        }

        // logical update
        self.nodes[parent.index()]
            .children
            .splice(pos..pos + remove_count, inserted.iter().copied());
        for &r in &removed {
            self.nodes[r.index()].parent = None;
        }
        for &i in inserted {
            self.nodes[i.index()].parent = Some(parent);
            self.ensure_associated(i);
        }

        if mirrors {
            self.emit_mirrored_splice(parent, pos, &removed, inserted);
        }

        // distribution of inserted light content
        let inserted_units = self.expand(inserted);
        if let Some(host) = light_host {
            for &unit in &inserted_units {
                let slot = self.desired_slot(host, unit);
                self.attach_to_slot(unit, slot);
            }
        }
        for &unit in removed_units.iter().chain(&inserted_units) {
            self.refresh_composed_parent(unit);
        }

        if !mirrors {
            self.insert_unit_footprints(&inserted_units);
        }

        if in_shadow_tree && inserted.iter().any(|&i| !self.slots_in_subtree(i).is_empty()) {
            if let Some(host) = self.shadow_host_of_container(parent) {
                dirty_hosts.push(host);
            }
        }
        let mut refreshed = HashSet::new();
        for host in dirty_hosts {
            if refreshed.insert(host) {
                self.refresh_slots(host);
            }
        }

        for &r in &removed {
            if self.nodes[r.index()].destroy_on_detach {
                self.destroy_backend_element(r);
            }
        }

        self.notify(MutationRecord::ChildList {
            target: parent,
            added: inserted.to_vec(),
            removed,
        });
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let len = self.node(parent)?.children.len();
        self.splice_children(parent, len, 0, &[child])
    }

    /// Insert `child` before `before`, or append when `before` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> DomResult<()> {
        match before {
            Some(before) => {
                let pos = self.child_position(parent, before)?;
                self.splice_children(parent, pos, 0, &[child])
            }
            None => self.append_child(parent, child),
        }
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let pos = self.child_position(parent, child)?;
        self.splice_children(parent, pos, 1, &[])
    }

    /// Put `child` in the place of `old_child`
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        old_child: NodeId,
    ) -> DomResult<()> {
        let pos = self.child_position(parent, old_child)?;
        self.splice_children(parent, pos, 1, &[child])
    }

    /// Insert a run of nodes at `index` in one batch
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        index: usize,
        children: &[NodeId],
    ) -> DomResult<()> {
        self.splice_children(parent, index, 0, children)
    }

    /// Remove `count` children starting at `index` in one batch
    pub fn remove_children(&mut self, parent: NodeId, index: usize, count: usize) -> DomResult<()> {
        self.splice_children(parent, index, count, &[])
    }

    /// Remove `node` from its parent, if it has one
    pub fn detach(&mut self, node: NodeId) -> DomResult<()> {
        match self.node(node)?.parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Make `root` the rendered root of the backend context
    pub fn mount(&mut self, root: NodeId) -> DomResult<()> {
        let node = self.node(root)?;
        if !node.is_component() || node.owner.is_some() {
            return Err(DomError::HierarchyRequest { parent: root, child: root });
        }
        if self.root == Some(root) {
            return Ok(());
        }
        self.unmount();
        self.ensure_associated(root);
        let backend_root = self.backend.root_node();
        self.root = Some(root);
        let elems = if self.strategy.mirrors_logical_tree() {
            self.nodes[root.index()].be.into_iter().collect()
        } else {
            self.footprint(root)
        };
        self.emit_insert(backend_root, None, &elems);
        tracing::info!("Mounted root component {:?}", root);
        Ok(())
    }

    /// Take the mounted root out of the backend context
    pub fn unmount(&mut self) -> Option<NodeId> {
        let root = self.root?;
        let elems = if self.strategy.mirrors_logical_tree() {
            self.nodes[root.index()].be.into_iter().collect()
        } else {
            self.footprint(root)
        };
        let backend_root = self.backend.root_node();
        match elems.as_slice() {
            [] => {}
            [elem] => self.backend.remove_child(backend_root, *elem, None),
            _ => self.backend.splice_remove(backend_root, elems[0], elems.len()),
        }
        self.root = None;
        tracing::info!("Unmounted root component {:?}", root);
        Some(root)
    }

    /// Turn a structural node into an inherit-slot node; only while childless
    pub fn set_inherit_slots(&mut self, node: NodeId) -> DomResult<()> {
        let n = self.node(node)?;
        if !matches!(n.kind, crate::NodeKind::Virtual { slot: None, .. }) {
            return Err(DomError::NotStructural(node));
        }
        if !n.children.is_empty() {
            return Err(DomError::HasChildren(node));
        }
        if n.is_inherit_slots() {
            return Ok(());
        }
        let be = n.be;
        if n.slot_state != SlotState::Unassigned {
            if let (true, Some(be), Some(_)) = (
                self.strategy.mirrors_logical_tree(),
                be,
                n.slot_state.slot(),
            ) {
                self.backend.set_containing_slot(be, None);
            }
            self.move_between_slot_lists(node, SlotState::Unassigned);
        }
        if let crate::NodeKind::Virtual { inherit_slots, .. } = &mut self.nodes[node.index()].kind {
            *inherit_slots = true;
        }
        if let Some(be) = be {
            self.strategy.set_inherit_slots(self.backend.as_mut(), be);
        }
        self.refresh_composed_parent(node);
        Ok(())
    }

    /// Rename a slot and re-distribute the content of its component
    pub fn set_slot_name(&mut self, slot: NodeId, name: &str) -> DomResult<()> {
        let be = self.node(slot)?.be;
        match self.nodes[slot.index()].slot_data_mut() {
            Some(data) => data.name = name.to_string(),
            None => return Err(DomError::NotStructural(slot)),
        }
        if let Some(be) = be {
            self.strategy.set_slot_name(self.backend.as_mut(), be, name);
        }
        if self.is_in_shadow_tree(slot) {
            if let Some(host) = self.owner_host(slot) {
                self.refresh_slots(host);
            }
        }
        Ok(())
    }

    /// Set the `slot` attribute used to pick a named slot
    pub fn set_slot(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        self.node_mut(node)?.slot_name = name.to_string();
        self.notify(MutationRecord::Properties {
            target: node,
            attribute_name: "slot".to_string(),
        });
        if let Some(host) = self.light_host(node) {
            self.refresh_slots(host);
        }
        Ok(())
    }
}
