//! Empty backend: hands out handles and otherwise does nothing

use std::collections::HashMap;

use crate::{Backend, BackendMode, ElementId, RenderCallback, RenderQueue, StyleScopeId};

/// A backend that accepts every operation without rendering anything
///
/// Useful when the node model is driven for its own bookkeeping only.
#[derive(Debug)]
pub struct EmptyBackend {
    mode: BackendMode,
    next_element: u32,
    next_style_sheet: usize,
    shadow_roots: HashMap<ElementId, ElementId>,
    render_queue: RenderQueue,
}

impl EmptyBackend {
    /// The root element is always `ElementId(0)`
    pub fn new(mode: BackendMode) -> Self {
        Self {
            mode,
            next_element: 1,
            next_style_sheet: 1,
            shadow_roots: HashMap::new(),
            render_queue: RenderQueue::new(),
        }
    }

    /// Complete a render pass, firing the queued callbacks
    pub fn tick(&mut self) -> usize {
        self.render_queue.flush(Ok(()))
    }

    fn alloc(&mut self) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        id
    }
}

impl Default for EmptyBackend {
    fn default() -> Self {
        Self::new(BackendMode::default())
    }
}

impl Backend for EmptyBackend {
    fn mode(&self) -> BackendMode {
        self.mode
    }

    fn append_style_sheet_path(
        &mut self,
        _path: &str,
        _style_scope: Option<StyleScopeId>,
    ) -> usize {
        let index = self.next_style_sheet;
        self.next_style_sheet += 1;
        index
    }

    fn render(&mut self, cb: RenderCallback) {
        self.render_queue.push(cb);
    }

    fn root_node(&self) -> ElementId {
        ElementId(0)
    }

    fn create_fragment(&mut self) -> ElementId {
        self.alloc()
    }

    fn create_element(
        &mut self,
        _owner: Option<ElementId>,
        _logical: &str,
        _styling: &str,
    ) -> ElementId {
        self.alloc()
    }

    fn create_text_node(&mut self, _owner: Option<ElementId>, _content: &str) -> ElementId {
        self.alloc()
    }

    fn create_component(&mut self, _owner: Option<ElementId>, _tag_name: &str) -> ElementId {
        let elem = self.alloc();
        if self.mode == BackendMode::Shadow {
            let shadow_root = self.alloc();
            self.shadow_roots.insert(elem, shadow_root);
        }
        elem
    }

    fn shadow_root(&self, component: ElementId) -> Option<ElementId> {
        self.shadow_roots.get(&component).copied()
    }
}
