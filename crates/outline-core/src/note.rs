use std::collections::HashMap;

use thiserror::Error;

use crate::context::ElementRef;
use crate::element::{DetachedElement, Element, ElementId};
use crate::text::AttributedText;

/// Deepest nesting an element may reach below the note root.
pub const MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("element {0} not found")]
    NotFound(ElementId),
    #[error("element {0} is already part of the note")]
    DuplicateId(ElementId),
    #[error("element {0} is the note root")]
    Root(ElementId),
    #[error("element {child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },
    #[error("cannot move element {0} into its own subtree")]
    Cycle(ElementId),
}

/// A named document: a root element whose text is the title, and the tree below it.
///
/// Elements live in an arena keyed by id. Each element's child list is the
/// owning edge; the parent link is only used for lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    name: String,
    root: ElementId,
    elements: HashMap<ElementId, Element>,
}

impl Note {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = ElementId::new();
        let mut elements = HashMap::new();
        elements.insert(root, Element::new(root, AttributedText::new(name.clone())));
        Self {
            name,
            root,
            elements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn reference(&self, id: ElementId) -> ElementRef {
        ElementRef::new(self.name.clone(), id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.len() == 1
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    fn get(&self, id: ElementId) -> Result<&Element, TreeError> {
        self.elements.get(&id).ok_or(TreeError::NotFound(id))
    }

    fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, TreeError> {
        self.elements.get_mut(&id).ok_or(TreeError::NotFound(id))
    }

    pub fn text(&self, id: ElementId) -> Result<&AttributedText, TreeError> {
        Ok(&self.get(id)?.text)
    }

    pub fn text_mut(&mut self, id: ElementId) -> Result<&mut AttributedText, TreeError> {
        Ok(&mut self.get_mut(id)?.text)
    }

    pub fn set_open(&mut self, id: ElementId, open: bool) -> Result<bool, TreeError> {
        let element = self.get_mut(id)?;
        Ok(std::mem::replace(&mut element.open, open))
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(&id).and_then(|e| e.parent)
    }

    pub fn index_in_parent(&self, id: ElementId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Insert a detached subtree under `parent`. The index is clamped to the child count.
    pub fn insert(
        &mut self,
        parent: ElementId,
        element: DetachedElement,
        index: usize,
    ) -> Result<ElementId, TreeError> {
        self.get(parent)?;
        if let Some(dup) = element.ids().into_iter().find(|id| self.contains(*id)) {
            return Err(TreeError::DuplicateId(dup));
        }
        let id = element.id;
        self.attach(parent, element);
        let children = &mut self.get_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, id);
        Ok(id)
    }

    /// Insert after `after` among `parent`'s children, or first when `after` is
    /// `None` or not a child of `parent`.
    pub fn insert_after(
        &mut self,
        parent: ElementId,
        element: DetachedElement,
        after: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let index = after
            .and_then(|after| self.children(parent).iter().position(|c| *c == after))
            .map_or(0, |ix| ix + 1);
        self.insert(parent, element, index)
    }

    pub fn add_child(
        &mut self,
        parent: ElementId,
        element: DetachedElement,
    ) -> Result<ElementId, TreeError> {
        let index = self.children(parent).len();
        self.insert(parent, element, index)
    }

    fn attach(&mut self, parent: ElementId, element: DetachedElement) {
        let DetachedElement {
            id,
            kind,
            text,
            open,
            children,
        } = element;
        let mut node = Element::new(id, text);
        node.kind = kind;
        node.open = open;
        node.parent = Some(parent);
        node.children = children.iter().map(|c| c.id).collect();
        self.elements.insert(id, node);
        for child in children {
            self.attach(id, child);
        }
    }

    /// Detach `id` and its descendants from the note and hand them back.
    pub fn remove(&mut self, id: ElementId) -> Result<DetachedElement, TreeError> {
        if id == self.root {
            return Err(TreeError::Root(id));
        }
        let parent = self.get(id)?.parent.ok_or(TreeError::Root(id))?;
        self.get_mut(parent)?.children.retain(|c| *c != id);
        self.take(id)
    }

    pub fn remove_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
    ) -> Result<DetachedElement, TreeError> {
        if self.parent(child) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.remove(child)
    }

    fn take(&mut self, id: ElementId) -> Result<DetachedElement, TreeError> {
        let element = self.elements.remove(&id).ok_or(TreeError::NotFound(id))?;
        let children = element
            .children
            .iter()
            .map(|child| self.take(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DetachedElement {
            id,
            kind: element.kind,
            text: element.text,
            open: element.open,
            children,
        })
    }

    /// A detached copy of the subtree rooted at `id`; the note is left untouched.
    pub fn subtree(&self, id: ElementId) -> Result<DetachedElement, TreeError> {
        let element = self.get(id)?;
        let children = element
            .children
            .iter()
            .map(|child| self.subtree(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DetachedElement {
            id,
            kind: element.kind,
            text: element.text.clone(),
            open: element.open,
            children,
        })
    }

    /// Move `id` under `new_parent` at `index` (clamped). Moving within the same
    /// parent reorders.
    pub fn move_element(
        &mut self,
        id: ElementId,
        new_parent: ElementId,
        index: usize,
    ) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::Root(id));
        }
        self.get(new_parent)?;
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(TreeError::Cycle(id));
        }
        let old_parent = self.get(id)?.parent.ok_or(TreeError::Root(id))?;
        self.get_mut(old_parent)?.children.retain(|c| *c != id);
        let children = &mut self.get_mut(new_parent)?.children;
        let index = index.min(children.len());
        children.insert(index, id);
        self.get_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    pub fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Find `id` among the descendants of `scope`.
    pub fn find_element(&self, scope: ElementId, id: ElementId) -> Option<&Element> {
        if scope != id && self.is_ancestor_or_self(scope, id) {
            self.element(id)
        } else {
            None
        }
    }

    pub fn previous_sibling(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|ix| self.children(parent).get(ix).copied())
    }

    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Last descendant reached by always following the last child.
    pub fn deepest_child(&self, id: ElementId) -> ElementId {
        let mut current = id;
        while let Some(last) = self.children(current).last() {
            current = *last;
        }
        current
    }

    fn deepest_visible_child(&self, id: ElementId) -> ElementId {
        let mut current = id;
        while let Some(element) = self.element(current) {
            match element.children.last() {
                Some(last) if element.open => current = *last,
                _ => break,
            }
        }
        current
    }

    /// Next sibling of the closest ancestor that has one.
    pub fn highest_next_sibling(&self, id: ElementId) -> Option<ElementId> {
        let mut current = self.parent(id)?;
        loop {
            if let Some(next) = self.next_sibling(current) {
                return Some(next);
            }
            current = self.parent(current)?;
        }
    }

    /// The element shown just above `id` in an outline where closed elements hide
    /// their children. The note root is never returned.
    pub fn previous_visible(&self, id: ElementId) -> Option<ElementId> {
        if let Some(previous) = self.previous_sibling(id) {
            return Some(self.deepest_visible_child(previous));
        }
        self.parent(id).filter(|parent| *parent != self.root)
    }

    pub fn next_visible(&self, id: ElementId) -> Option<ElementId> {
        let element = self.element(id)?;
        if let (true, Some(first)) = (element.open, element.children.first()) {
            return Some(*first);
        }
        self.next_visible_after_subtree(id)
    }

    pub fn next_visible_after_subtree(&self, id: ElementId) -> Option<ElementId> {
        self.next_sibling(id)
            .or_else(|| self.highest_next_sibling(id))
    }

    /// Number of ancestors between `id` and the root; top level elements have depth 0.
    pub fn depth(&self, id: ElementId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == self.root {
                break;
            }
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Levels in the subtree below `id`; a leaf has height 0.
    pub fn height(&self, id: ElementId) -> usize {
        self.children(id)
            .iter()
            .map(|child| self.height(*child) + 1)
            .max()
            .unwrap_or(0)
    }

    /// All elements in pre-order, root excluded.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        for child in self.children(id) {
            out.push(*child);
            out.extend(self.descendants(*child));
        }
        out
    }

    /// Render the note as an indented bullet list.
    pub fn print_tree(&self) -> String {
        let mut out = format!("{}\n", self.name);
        for id in self.descendants(self.root) {
            let text = self.element(id).map(|e| e.text.text()).unwrap_or_default();
            let indent = "    ".repeat(self.depth(id) + 1);
            out.push_str(&format!("{indent}- {text}\n"));
        }
        out
    }

    /// Run `apply` against the note, restoring the previous state if it fails.
    pub fn transaction<T, E>(
        &mut self,
        apply: impl FnOnce(&mut Note) -> Result<T, E>,
    ) -> Result<T, E> {
        let backup = self.clone();
        let result = apply(self);
        if result.is_err() {
            *self = backup;
        }
        result
    }
}
