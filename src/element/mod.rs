//! Element tree - retained structure and reconciliation.
//!
//! Elements are the persistent middle layer between the throwaway
//! [`Component`](crate::component::Component) descriptions and the
//! [`RenderTree`](crate::render::RenderTree). Reconciliation diffs a fresh
//! component against the element holding the previous one and picks, per
//! slot, the cheapest outcome:
//!
//! - **Skip** - the exact same `Rc` instance (or a subtree marked unchanged
//!   under partial update): nothing below is touched.
//! - **Reuse** - structurally compatible: the element adopts the new
//!   component, its render node is mutated in place and marked for layout,
//!   and the diff recurses into children.
//! - **Replace** - incompatible: the old subtree is unmounted (elements and
//!   render nodes destroyed, ids go stale) and the new component is
//!   inflated fresh in its slot.
//!
//! Compatibility is policy per element category. Render elements compare
//! type tags only. Composed elements are stricter outside partial-update
//! mode: anything but the identical instance is a replace, which is what
//! lets a host skip whole unchanged subtrees by handing back the same `Rc`.
//!
//! Composed elements own no render node; their render descendants attach to
//! the nearest ancestor that does, and that ancestor's child order is
//! resynced from element order after every child diff.

use std::collections::HashMap;
use std::rc::Rc;

use crate::component::{ChildMatching, Component};
use crate::render::{RenderId, RenderProps, RenderTree};

// =============================================================================
// ElementId - generational handle
// =============================================================================

/// Handle to an element: slot index plus generation. Stale after unmount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    idx: u32,
    generation: u32,
}

impl ElementId {
    pub fn index(&self) -> u32 {
        self.idx
    }
}

/// Which reconciliation policy an element follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Backs a render node; compatibility is type-tag equality.
    Render,
    /// Backs a build closure; transparent in the render tree.
    Composed,
}

/// What reconciliation did to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Skipped,
    Reused,
    Replaced,
}

/// Counters for one build pass, kept on the tree so tests and the frame
/// driver can observe how much work a diff actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileStats {
    pub skipped: usize,
    pub reused: usize,
    pub replaced: usize,
    pub inflated: usize,
    pub unmounted: usize,
}

// =============================================================================
// Element
// =============================================================================

/// One retained element.
pub struct Element {
    pub component: Rc<Component>,
    pub kind: ElementKind,
    /// The render node this element owns; `None` for composed elements.
    pub render: Option<RenderId>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub depth: u32,
    /// Set while the element sits in the frame driver's dirty queue.
    pub dirty: bool,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("component", &self.component.kind())
            .field("render", &self.render)
            .field("children", &self.children.len())
            .field("depth", &self.depth)
            .finish()
    }
}

// =============================================================================
// ElementTree
// =============================================================================

struct Slot {
    generation: u32,
    element: Option<Element>,
}

/// Generational arena of elements.
#[derive(Default)]
pub struct ElementTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Counters for the current build pass; reset by the frame driver.
    pub stats: ReconcileStats,
}

impl Default for Slot {
    fn default() -> Self {
        Self { generation: 0, element: None }
    }
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        let slot = self.slots.get(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.element.as_ref()
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.element.as_mut()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.element.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset_stats(&mut self) {
        self.stats = ReconcileStats::default();
    }

    fn insert(&mut self, element: Element) -> ElementId {
        match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                slot.element = Some(element);
                ElementId { idx, generation: slot.generation }
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, element: Some(element) });
                ElementId { idx, generation: 0 }
            }
        }
    }

    fn free_slot(&mut self, id: ElementId) {
        if let Some(slot) = self.slots.get_mut(id.idx as usize) {
            if slot.generation == id.generation && slot.element.is_some() {
                slot.element = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.idx);
            }
        }
    }
}

// =============================================================================
// Inflate
// =============================================================================

/// Build a fresh element subtree for `component`.
///
/// Render nodes are created and wired within the subtree; attaching the
/// subtree's render roots into an enclosing render node is the caller's job
/// (via [`resync_render_children`] on the parent), so inflate can be used
/// both for whole trees and for replacement slots.
pub fn inflate(
    elements: &mut ElementTree,
    renders: &mut RenderTree,
    component: Rc<Component>,
    parent: Option<ElementId>,
) -> ElementId {
    let depth = parent.and_then(|p| elements.get(p)).map(|e| e.depth + 1).unwrap_or(0);
    let (render_kind, props) = RenderProps::from_component(&component);
    let (kind, render) = match render_kind {
        Some(k) => {
            let rid = renders.insert(k, props, component.display_index());
            (ElementKind::Render, Some(rid))
        }
        None => (ElementKind::Composed, None),
    };

    let id = elements.insert(Element {
        component: component.clone(),
        kind,
        render,
        parent,
        children: Vec::new(),
        depth,
        dirty: false,
    });
    elements.stats.inflated += 1;

    let child_components: Vec<Rc<Component>> = match kind {
        ElementKind::Composed => match component.custom_props() {
            Some(custom) => vec![(custom.build)()],
            None => Vec::new(),
        },
        ElementKind::Render => component.children().to_vec(),
    };
    for child in child_components {
        let child_id = inflate(elements, renders, child, Some(id));
        if let Some(el) = elements.get_mut(id) {
            el.children.push(child_id);
        }
    }

    if let Some(rid) = render {
        let kids = child_render_roots(elements, id);
        renders.set_children(rid, kids);
    }
    id
}

// =============================================================================
// Unmount
// =============================================================================

/// Destroy an element and everything below it. Render subtrees are removed
/// first, then all element slots are freed; every outstanding id into the
/// subtree goes stale. The parent's child list is not touched.
pub fn unmount(elements: &mut ElementTree, renders: &mut RenderTree, id: ElementId) {
    if !elements.contains(id) {
        tracing::debug!(?id, "unmount on stale element id");
        return;
    }
    for root in render_roots(elements, id) {
        renders.remove_subtree(root);
    }
    free_elements(elements, id);
}

fn free_elements(elements: &mut ElementTree, id: ElementId) {
    let children = elements.get(id).map(|e| e.children.clone()).unwrap_or_default();
    for child in children {
        free_elements(elements, child);
    }
    elements.free_slot(id);
    elements.stats.unmounted += 1;
}

// =============================================================================
// Render wiring
// =============================================================================

/// Topmost render nodes of this element subtree, in element order. A render
/// element contributes its own node; a composed element is transparent and
/// contributes its children's roots.
pub fn render_roots(elements: &ElementTree, id: ElementId) -> Vec<RenderId> {
    let Some(el) = elements.get(id) else { return Vec::new() };
    if let Some(rid) = el.render {
        return vec![rid];
    }
    el.children.iter().flat_map(|&c| render_roots(elements, c)).collect()
}

fn child_render_roots(elements: &ElementTree, id: ElementId) -> Vec<RenderId> {
    elements
        .get(id)
        .map(|el| el.children.iter().flat_map(|&c| render_roots(elements, c)).collect())
        .unwrap_or_default()
}

/// Rebuild the child list of the nearest render-owning element at or above
/// `id` from element order, and mark that node for layout. Called after any
/// child diff that may have changed subtree structure.
pub fn resync_render_children(
    elements: &ElementTree,
    renders: &mut RenderTree,
    id: ElementId,
) {
    let mut current = id;
    loop {
        let Some(el) = elements.get(current) else { return };
        if let Some(rid) = el.render {
            let kids = child_render_roots(elements, current);
            renders.set_children(rid, kids);
            renders.mark_needs_layout(rid);
            return;
        }
        match el.parent {
            Some(p) => current = p,
            None => return,
        }
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Diff one slot: the element `id` currently holding the previous component
/// against the fresh `new` one. Returns the element occupying the slot
/// afterwards (a different id when the subtree was replaced) and what
/// happened.
pub fn reconcile_slot(
    elements: &mut ElementTree,
    renders: &mut RenderTree,
    id: ElementId,
    new: Rc<Component>,
    partial_update: bool,
) -> (ElementId, UpdateOutcome) {
    let Some(el) = elements.get(id) else {
        tracing::warn!(?id, "reconcile on stale element id");
        return (id, UpdateOutcome::Skipped);
    };
    let old = el.component.clone();
    let kind = el.kind;

    // Identical instance: the host is telling us nothing changed here.
    if Rc::ptr_eq(&old, &new) {
        elements.stats.skipped += 1;
        return (id, UpdateOutcome::Skipped);
    }

    // Partial update honors an explicit unchanged marker the same way.
    let marked_unchanged = new.custom_props().map(|p| p.unchanged).unwrap_or(false);
    if partial_update && marked_unchanged && old.same_type(&new) {
        if let Some(el) = elements.get_mut(id) {
            el.component = new;
        }
        elements.stats.skipped += 1;
        return (id, UpdateOutcome::Skipped);
    }

    let compatible = match kind {
        ElementKind::Render => old.same_type(&new),
        // Outside partial-update mode a composed element only ever reuses
        // the identical instance (handled above); everything else replaces.
        ElementKind::Composed => old.same_type(&new) && partial_update,
    };
    if !compatible {
        return (replace_slot(elements, renders, id, new), UpdateOutcome::Replaced);
    }

    elements.stats.reused += 1;

    // Adopt the component and push props into the render node before the
    // children are diffed, so conditional structure below sees the update.
    if let Some(el) = elements.get_mut(id) {
        el.component = new.clone();
    }
    if kind == ElementKind::Render {
        let rid = elements.get(id).and_then(|e| e.render);
        if let Some(rid) = rid {
            let (_, props) = RenderProps::from_component(&new);
            if let Some(node) = renders.get_mut(rid) {
                node.props = props;
                node.display_index = new.display_index();
            }
            renders.mark_needs_layout(rid);
        }
    }

    let child_components: Vec<Rc<Component>> = match kind {
        ElementKind::Composed => match new.custom_props() {
            Some(custom) => vec![(custom.build)()],
            None => Vec::new(),
        },
        ElementKind::Render => new.children().to_vec(),
    };
    update_children(elements, renders, id, &child_components, new.child_matching(), partial_update);
    resync_render_children(elements, renders, id);

    (id, UpdateOutcome::Reused)
}

fn replace_slot(
    elements: &mut ElementTree,
    renders: &mut RenderTree,
    id: ElementId,
    new: Rc<Component>,
) -> ElementId {
    elements.stats.replaced += 1;
    let parent = elements.get(id).and_then(|e| e.parent);
    let position = parent
        .and_then(|p| elements.get(p))
        .and_then(|pe| pe.children.iter().position(|&c| c == id));

    unmount(elements, renders, id);
    let new_id = inflate(elements, renders, new, parent);

    if let (Some(p), Some(pos)) = (parent, position) {
        if let Some(pe) = elements.get_mut(p) {
            pe.children[pos] = new_id;
        }
        resync_render_children(elements, renders, p);
    }
    new_id
}

/// Diff an element's children against a fresh component child list and
/// install the resulting child ids in order.
pub fn update_children(
    elements: &mut ElementTree,
    renders: &mut RenderTree,
    parent: ElementId,
    new_children: &[Rc<Component>],
    matching: ChildMatching,
    partial_update: bool,
) {
    let old: Vec<ElementId> =
        elements.get(parent).map(|e| e.children.clone()).unwrap_or_default();
    let mut next: Vec<ElementId> = Vec::with_capacity(new_children.len());

    match matching {
        ChildMatching::Positional => {
            for (i, component) in new_children.iter().enumerate() {
                match old.get(i) {
                    Some(&old_id) => {
                        let (id, _) = reconcile_slot(
                            elements,
                            renders,
                            old_id,
                            component.clone(),
                            partial_update,
                        );
                        next.push(id);
                    }
                    None => {
                        next.push(inflate(elements, renders, component.clone(), Some(parent)));
                    }
                }
            }
            for &old_id in old.iter().skip(new_children.len()) {
                unmount(elements, renders, old_id);
            }
        }
        ChildMatching::Keyed => {
            let mut by_key: HashMap<String, ElementId> = HashMap::new();
            let mut leftovers: Vec<ElementId> = Vec::new();
            for &old_id in &old {
                let key = elements
                    .get(old_id)
                    .and_then(|e| e.component.key().map(str::to_string));
                match key {
                    Some(k) if !by_key.contains_key(&k) => {
                        by_key.insert(k, old_id);
                    }
                    Some(k) => {
                        tracing::warn!(key = %k, "duplicate reuse key; later child not reused");
                        leftovers.push(old_id);
                    }
                    None => leftovers.push(old_id),
                }
            }

            for component in new_children {
                let matched = component.key().and_then(|k| by_key.remove(k));
                match matched {
                    Some(old_id) => {
                        let (id, _) = reconcile_slot(
                            elements,
                            renders,
                            old_id,
                            component.clone(),
                            partial_update,
                        );
                        next.push(id);
                    }
                    None => {
                        next.push(inflate(elements, renders, component.clone(), Some(parent)));
                    }
                }
            }
            leftovers.extend(by_key.into_values());
            for old_id in leftovers {
                unmount(elements, renders, old_id);
            }
        }
    }

    if let Some(el) = elements.get_mut(parent) {
        el.children = next;
    }
}

/// Re-run a composed element's build closure and diff the produced subtree.
/// Entry point for the frame driver's dirty-element queue; no-op with a log
/// entry on a stale id.
pub fn rebuild(
    elements: &mut ElementTree,
    renders: &mut RenderTree,
    id: ElementId,
    partial_update: bool,
) {
    let Some(el) = elements.get(id) else {
        tracing::debug!(?id, "rebuild on stale element id");
        return;
    };
    if el.kind != ElementKind::Composed {
        tracing::debug!(?id, "rebuild on non-composed element");
        return;
    }
    let component = el.component.clone();
    let Some(custom) = component.custom_props() else { return };

    let built = vec![(custom.build)()];
    update_children(elements, renders, id, &built, ChildMatching::Positional, partial_update);
    resync_render_children(elements, renders, id);
}

// =============================================================================
// Tests
// =============================================================================
