use std::ops::Range;

use tracing::debug;

use crate::command::Command;
use crate::commands::{
    DecreaseIndentation, DeleteElement, DeleteMode, DeleteNode, DeleteText, EditCommand,
    FocusElement, Formatting, FormattingText, IncreaseIndentation, InsertElement,
    InsertEmptyNode, InsertNode, InsertText, NodePlacement, ReparentElement, ReplaceText,
};
use crate::context::{EditorSurface, ElementRef, Focus, NoteStore, Notes};
use crate::element::{DetachedElement, ElementId, ElementKind};
use crate::history::{CommandManager, HistoryConfig, HistoryEntry};
use crate::note::Note;
use crate::session::EditSession;
use crate::text::{Attribute, AttributedText};

/// Keyboard level editing on top of the command history.
///
/// Each method turns the current focus and selection into one command (or a
/// group of them) and submits it, returning whether anything changed.
pub struct Editor {
    session: EditSession,
    history: CommandManager<EditCommand>,
}

impl Editor {
    pub fn new(notes: Notes) -> Self {
        Self::with_config(notes, HistoryConfig::default())
    }

    pub fn with_config(notes: Notes, config: HistoryConfig) -> Self {
        Self {
            session: EditSession::new(notes),
            history: CommandManager::new(config),
        }
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn note(&self, name: &str) -> Option<&Note> {
        self.session.note(name)
    }

    pub fn history(&self) -> &CommandManager<EditCommand> {
        &self.history
    }

    pub fn focused(&self) -> Option<&Focus> {
        self.session.surface.focus.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Names of the undo entries, most recent first.
    pub fn undo_names(&self) -> Vec<String> {
        self.history
            .undo_entries()
            .map(|entry| match entry {
                HistoryEntry::Single(command) => {
                    Command::<EditSession>::kind(command).to_string()
                }
                HistoryEntry::Group(group) => group.name().to_string(),
            })
            .collect()
    }

    pub fn submit(&mut self, command: impl Into<EditCommand>) -> bool {
        self.history.run(command.into(), &mut self.session)
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.session)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.session)
    }

    pub fn begin_group(&mut self, name: impl Into<String>) {
        self.history.begin_group(name);
    }

    pub fn end_group(&mut self) {
        self.history.end_group();
    }

    fn grouped(&mut self, name: &str, commands: Vec<EditCommand>) -> bool {
        self.begin_group(name);
        let mut ok = true;
        for command in commands {
            if !self.submit(command) {
                ok = false;
                break;
            }
        }
        self.end_group();
        ok
    }

    pub fn focus(&mut self, element: ElementRef, cursor: usize) -> bool {
        self.submit(FocusElement::new(element, cursor))
    }

    /// Select a range of the focused element's text. Not recorded in history.
    pub fn select_text(&mut self, range: Range<usize>) {
        self.session.surface.selected_range = Some(range);
    }

    pub fn select_nodes(&mut self, nodes: Vec<ElementRef>) {
        self.session.surface.node_selection = nodes;
    }

    fn text_len(&self, element: &ElementRef) -> Option<usize> {
        let note = self.session.resolve(element).ok()?;
        note.text(element.element).ok().map(AttributedText::len)
    }

    fn selection(&self) -> Option<Range<usize>> {
        self.session
            .surface
            .selected_range
            .clone()
            .filter(|range| !range.is_empty())
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        let Some(focus) = self.session.focused() else {
            debug!("insert_text without focus");
            return false;
        };
        let typed = AttributedText::with_attributes(
            text,
            self.session.surface.typing_attributes.clone(),
        );
        match self.selection() {
            Some(range) => self.submit(ReplaceText::new(focus.element, range, typed)),
            None => self.submit(InsertText::new(focus.element, typed, focus.cursor)),
        }
    }

    /// Return key. An empty check item turns back into a bullet, and an empty
    /// nested leaf moves one level out. Otherwise the selection is deleted and
    /// the focused element is split at the cursor, as one undo step.
    pub fn insert_newline(&mut self) -> bool {
        let Some(focus) = self.session.focused() else {
            return false;
        };
        let Some(element) = self
            .session
            .resolve(&focus.element)
            .ok()
            .and_then(|note| note.element(focus.element.element))
        else {
            return false;
        };
        let kind = element.kind;
        let is_empty = element.text.is_empty();
        let has_children = !element.children().is_empty();
        let open_with_children = element.open && has_children;
        let top_level = self
            .session
            .note(&focus.element.note)
            .is_some_and(|note| element.parent() == Some(note.root()));

        if is_empty && matches!(kind, ElementKind::Check { .. }) {
            return self.toggle_kind(kind);
        }

        self.begin_group("Insert Line");
        let done = if is_empty && !has_children && !top_level {
            self.submit(DecreaseIndentation::new(focus.element))
        } else {
            self.break_line(focus, open_with_children)
        };
        self.end_group();
        done
    }

    fn break_line(&mut self, focus: Focus, open_with_children: bool) -> bool {
        let mut cursor = focus.cursor;
        if let Some(range) = self.selection() {
            if !self.submit(DeleteText::new(focus.element.clone(), range.clone())) {
                return false;
            }
            cursor = range.start;
        }
        let at_end = self.text_len(&focus.element) == Some(cursor);
        if at_end && open_with_children {
            self.submit(InsertNode::empty(focus.element, NodePlacement::FirstChild))
        } else {
            self.submit(InsertNode::split(focus.element, cursor))
        }
    }

    pub fn delete_backward(&mut self) -> bool {
        if let Some(done) = self.delete_selected_nodes() {
            return done;
        }
        let Some(focus) = self.session.focused() else {
            return false;
        };
        if let Some(range) = self.selection() {
            return self.submit(DeleteText::new(focus.element, range));
        }
        if focus.cursor == 0 {
            return self.submit(DeleteNode::new(focus.element, DeleteMode::Backward));
        }
        self.submit(DeleteText::new(
            focus.element,
            focus.cursor - 1..focus.cursor,
        ))
    }

    pub fn delete_forward(&mut self) -> bool {
        if let Some(done) = self.delete_selected_nodes() {
            return done;
        }
        let Some(focus) = self.session.focused() else {
            return false;
        };
        if let Some(range) = self.selection() {
            return self.submit(DeleteText::new(focus.element, range));
        }
        if Some(focus.cursor) == self.text_len(&focus.element) {
            return self.submit(DeleteNode::new(focus.element, DeleteMode::Forward));
        }
        self.submit(DeleteText::new(
            focus.element,
            focus.cursor..focus.cursor + 1,
        ))
    }

    /// Remove the selected elements. A note left without elements gets an
    /// empty one so there is always something to type into.
    fn delete_selected_nodes(&mut self) -> Option<bool> {
        if self.session.surface.node_selection.is_empty() {
            return None;
        }
        let roots = self.selection_roots();
        if roots.is_empty() {
            return Some(false);
        }
        self.begin_group("Delete selected elements");
        let mut done = roots
            .iter()
            .rev()
            .all(|node| self.submit(DeleteNode::new(node.clone(), DeleteMode::Selected)));
        if done {
            let mut emptied: Vec<ElementRef> = roots
                .iter()
                .filter_map(|node| {
                    let note = self.session.note(&node.note)?;
                    let root = note.root();
                    note.children(root).is_empty().then(|| node.sibling(root))
                })
                .collect();
            emptied.dedup();
            done = emptied
                .into_iter()
                .all(|root| self.submit(InsertEmptyNode::new(root, 0)));
        }
        self.end_group();
        Some(done)
    }

    /// The selected elements in document order, without those already covered
    /// by a selected ancestor.
    fn selection_roots(&self) -> Vec<ElementRef> {
        let selection = &self.session.surface.node_selection;
        let mut roots: Vec<(usize, ElementRef)> = selection
            .iter()
            .filter_map(|node| {
                let note = self.session.resolve(node).ok()?;
                let covered = selection.iter().any(|other| {
                    other.note == node.note
                        && other.element != node.element
                        && note.is_ancestor_or_self(other.element, node.element)
                });
                if covered {
                    return None;
                }
                let order = note
                    .descendants(note.root())
                    .iter()
                    .position(|id| *id == node.element)?;
                Some((order, node.clone()))
            })
            .collect();
        roots.sort_by(|(a_order, a), (b_order, b)| {
            a.note.cmp(&b.note).then(a_order.cmp(b_order))
        });
        roots.dedup_by(|next, previous| next.1 == previous.1);
        debug!(selected = selection.len(), roots = roots.len(), "node selection");
        roots.into_iter().map(|(_, node)| node).collect()
    }

    fn structure_targets(&self) -> Vec<ElementRef> {
        if !self.session.surface.node_selection.is_empty() {
            return self.selection_roots();
        }
        self.session
            .focused()
            .map(|focus| vec![focus.element])
            .unwrap_or_default()
    }

    pub fn increase_indentation(&mut self) -> bool {
        let targets = self.structure_targets();
        match targets.len() {
            0 => false,
            1 => self.submit(IncreaseIndentation::new(targets[0].clone())),
            _ => {
                let commands = targets
                    .into_iter()
                    .map(|target| IncreaseIndentation::new(target).into())
                    .collect();
                self.grouped("Increase indentation", commands)
            }
        }
    }

    pub fn decrease_indentation(&mut self) -> bool {
        let targets = self.structure_targets();
        match targets.len() {
            0 => false,
            1 => self.submit(DecreaseIndentation::new(targets[0].clone())),
            _ => {
                let commands = targets
                    .into_iter()
                    .rev()
                    .map(|target| DecreaseIndentation::new(target).into())
                    .collect();
                self.grouped("Decrease indentation", commands)
            }
        }
    }

    /// Toggle an attribute on the selection, or on the typing attributes when
    /// nothing is selected.
    pub fn toggle_attribute(&mut self, attribute: Attribute) -> bool {
        let Some(focus) = self.session.focused() else {
            return false;
        };
        match self.selection() {
            Some(range) => self.submit(FormattingText::new(
                focus.element,
                Formatting::Attribute { attribute, range },
            )),
            None => {
                let typing = &mut self.session.surface.typing_attributes;
                if let Some(ix) = typing.iter().position(|a| a.same_tag(&attribute)) {
                    typing.remove(ix);
                } else {
                    typing.push(attribute);
                }
                true
            }
        }
    }

    pub fn toggle_kind(&mut self, kind: ElementKind) -> bool {
        let Some(focus) = self.session.focused() else {
            return false;
        };
        self.submit(FormattingText::new(focus.element, Formatting::Kind(kind)))
    }

    pub fn insert_element(
        &mut self,
        parent: ElementRef,
        after: Option<ElementId>,
        element: &DetachedElement,
    ) -> bool {
        match InsertElement::new(parent, after, element) {
            Ok(command) => self.submit(command),
            Err(err) => {
                tracing::warn!(element = %element.id, error = %err, "cannot snapshot element");
                false
            }
        }
    }

    pub fn insert_empty_node(&mut self, parent: ElementRef, index: usize) -> bool {
        self.submit(InsertEmptyNode::new(parent, index))
    }

    pub fn delete_element(&mut self, element: ElementRef) -> bool {
        self.submit(DeleteElement::new(element))
    }

    pub fn move_element(&mut self, element: ElementRef, new_parent: ElementId, index: usize) -> bool {
        self.submit(ReparentElement::new(element, new_parent, index))
    }
}
