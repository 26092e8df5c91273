use crate::command::{Command, CommandError, CommandKind, report};
use crate::commands::focus::restore_focus;
use crate::context::{EditorSurface, ElementRef, Focus, NoteStore};
use crate::element::{DetachedElement, ElementId, ElementKind};
use crate::note::{Note, TreeError};
use crate::snapshot::{ElementSnapshot, SnapshotError};
use crate::text::{AttributedText, TextError};

/// Inserts a prepared subtree, kept serialized so redo rebuilds the same ids.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertElement {
    parent: ElementRef,
    after: Option<ElementId>,
    element: ElementId,
    snapshot: ElementSnapshot,
}

impl InsertElement {
    pub fn new(
        parent: ElementRef,
        after: Option<ElementId>,
        element: &DetachedElement,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            parent,
            after,
            element: element.id,
            snapshot: ElementSnapshot::encode(element)?,
        })
    }

    pub fn element(&self) -> ElementRef {
        self.parent.sibling(self.element)
    }

    fn try_run<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let detached = self.snapshot.decode()?;
        let note = ctx.resolve_mut(&self.parent)?;
        note.insert_after(self.parent.element, detached, self.after)?;
        Ok(())
    }

    fn try_undo<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.element())?;
        note.remove(self.element)?;
        Ok(())
    }
}

impl<C: NoteStore> Command<C> for InsertElement {
    fn kind(&self) -> CommandKind {
        CommandKind::InsertElement
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::InsertElement, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::InsertElement, "undo", result)
    }
}

/// Creates an empty element at a position and focuses it.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertEmptyNode {
    parent: ElementRef,
    index: usize,
    element: ElementId,
    prior_focus: Option<Focus>,
}

impl InsertEmptyNode {
    pub fn new(parent: ElementRef, index: usize) -> Self {
        Self {
            parent,
            index,
            element: ElementId::new(),
            prior_focus: None,
        }
    }

    pub fn element(&self) -> ElementRef {
        self.parent.sibling(self.element)
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.parent)?;
        note.insert(
            self.parent.element,
            DetachedElement::with_id(self.element, AttributedText::default()),
            self.index,
        )?;
        self.prior_focus = ctx.focused();
        ctx.focus(&self.element(), 0);
        Ok(())
    }

    /// Children added to the new element since are handed to its parent at its place.
    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let id = self.element;
        let note = ctx.resolve_mut(&self.element())?;
        note.transaction(|note| -> Result<(), CommandError> {
            let parent = note.parent(id).ok_or(TreeError::Root(id))?;
            let index = note.index_in_parent(id).ok_or(TreeError::NotFound(id))?;
            let children = note.children(id).to_vec();
            for (offset, child) in children.into_iter().enumerate() {
                note.move_element(child, parent, index + offset)?;
            }
            note.remove(id)?;
            Ok(())
        })?;
        restore_focus(ctx, self.prior_focus.as_ref());
        Ok(())
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for InsertEmptyNode {
    fn kind(&self) -> CommandKind {
        CommandKind::InsertEmptyNode
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::InsertEmptyNode, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::InsertEmptyNode, "undo", result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodePlacement {
    /// Right after the target in its parent.
    #[default]
    Sibling,
    /// As the target's first child.
    FirstChild,
}

#[derive(Debug, Clone, PartialEq)]
struct SplitState {
    prior_text: AttributedText,
    moved_children: Vec<ElementId>,
    opened: ElementId,
    was_open: bool,
}

/// Splits an element at the cursor (return key). The tail text and the
/// children move to a new element; without a cursor an empty element is
/// created instead. Splitting a check item creates an unchecked one.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertNode {
    target: ElementRef,
    split_at: Option<usize>,
    placement: NodePlacement,
    element: ElementId,
    state: Option<SplitState>,
}

impl InsertNode {
    pub fn split(target: ElementRef, cursor: usize) -> Self {
        Self::build(target, Some(cursor), NodePlacement::Sibling)
    }

    pub fn empty(target: ElementRef, placement: NodePlacement) -> Self {
        Self::build(target, None, placement)
    }

    fn build(target: ElementRef, split_at: Option<usize>, placement: NodePlacement) -> Self {
        Self {
            target,
            split_at,
            placement,
            element: ElementId::new(),
            state: None,
        }
    }

    /// The element this command creates.
    pub fn element(&self) -> ElementRef {
        self.target.sibling(self.element)
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let target = self.target.element;
        let new_id = self.element;
        let split_at = self.split_at;
        let placement = self.placement;
        let note = ctx.resolve_mut(&self.target)?;
        let state = note.transaction(|note| -> Result<SplitState, CommandError> {
            let parent = note
                .parent(target)
                .ok_or(CommandError::Precondition("cannot split the note root"))?;
            let prior_text = note.text(target)?.clone();

            let (tail, moved_children) = match split_at {
                Some(cursor) => {
                    let len = prior_text.len();
                    if cursor > len {
                        return Err(TextError::OutOfBounds {
                            position: cursor,
                            len,
                        }
                        .into());
                    }
                    let tail = prior_text.extract(cursor..len)?;
                    note.text_mut(target)?.remove_subrange(cursor..len)?;
                    (tail, note.children(target).to_vec())
                }
                None => (AttributedText::default(), Vec::new()),
            };

            let kind = match note.element(target).map(|element| element.kind) {
                Some(ElementKind::Check { .. }) => ElementKind::Check { checked: false },
                _ => ElementKind::default(),
            };
            let new_element = DetachedElement::with_id(new_id, tail).kind(kind);
            let opened = match placement {
                NodePlacement::Sibling => {
                    let index = note.index_in_parent(target).ok_or(TreeError::NotFound(target))?;
                    note.insert(parent, new_element, index + 1)?;
                    parent
                }
                NodePlacement::FirstChild => {
                    note.insert(target, new_element, 0)?;
                    target
                }
            };
            for (index, child) in moved_children.iter().enumerate() {
                note.move_element(*child, new_id, index)?;
            }
            let was_open = note.set_open(opened, true)?;
            Ok(SplitState {
                prior_text,
                moved_children,
                opened,
                was_open,
            })
        })?;
        self.state = Some(state);
        ctx.focus(&self.element(), 0);
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let target = self.target.element;
        let new_id = self.element;
        let state = self.state.as_ref().ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        note.transaction(|note| -> Result<(), CommandError> {
            for (index, child) in state.moved_children.iter().enumerate() {
                note.move_element(*child, target, index)?;
            }
            note.remove(new_id)?;
            *note.text_mut(target)? = state.prior_text.clone();
            note.set_open(state.opened, state.was_open)?;
            Ok(())
        })?;
        let cursor = self.split_at.unwrap_or_else(|| state.prior_text.len());
        ctx.focus(&self.target, cursor);
        Ok(())
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for InsertNode {
    fn kind(&self) -> CommandKind {
        CommandKind::InsertNode
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::InsertNode, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::InsertNode, "undo", result)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Removed {
    snapshot: ElementSnapshot,
    parent: ElementId,
    index: usize,
}

impl Removed {
    /// Capture `id` before it is removed.
    fn capture(note: &Note, id: ElementId) -> Result<Self, CommandError> {
        let parent = note.parent(id).ok_or(TreeError::Root(id))?;
        let index = note.index_in_parent(id).ok_or(TreeError::NotFound(id))?;
        let snapshot = ElementSnapshot::encode(&note.subtree(id)?)?;
        Ok(Self {
            snapshot,
            parent,
            index,
        })
    }

    fn restore(&self, note: &mut Note) -> Result<ElementId, CommandError> {
        let element = self.snapshot.decode()?;
        Ok(note.insert(self.parent, element, self.index)?)
    }
}

/// Removes an element and its subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteElement {
    target: ElementRef,
    removed: Option<Removed>,
}

impl DeleteElement {
    pub fn new(target: ElementRef) -> Self {
        Self {
            target,
            removed: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    fn try_run<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.target)?;
        let removed = Removed::capture(note, self.target.element)?;
        note.remove(self.target.element)?;
        self.removed = Some(removed);
        Ok(())
    }

    fn try_undo<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let removed = self.removed.as_ref().ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target.sibling(removed.parent))?;
        removed.restore(note)?;
        Ok(())
    }
}

impl<C: NoteStore> Command<C> for DeleteElement {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteElement
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::DeleteElement, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::DeleteElement, "undo", result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Backspace at the start of an element: merge it into the element above.
    Backward,
    /// Delete at the end of an element: pull the element below into it.
    Forward,
    /// Remove a selected element outright; its children are kept with it.
    Selected,
}

#[derive(Debug, Clone, PartialEq)]
enum DeleteState {
    /// `absorbed` was removed and its text appended to `survivor`.
    Merged {
        removed: Removed,
        absorbed: ElementId,
        survivor: ElementId,
        survivor_text: AttributedText,
        moved_children: Vec<ElementId>,
        undo_focus: (ElementId, usize),
    },
    Selected {
        element: ElementSnapshot,
        children: Vec<ElementSnapshot>,
        parent: ElementId,
        index: usize,
        prior_focus: Option<Focus>,
    },
}

/// Keyboard driven element deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteNode {
    target: ElementRef,
    mode: DeleteMode,
    state: Option<DeleteState>,
}

impl DeleteNode {
    pub fn new(target: ElementRef, mode: DeleteMode) -> Self {
        Self {
            target,
            mode,
            state: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub fn mode(&self) -> DeleteMode {
        self.mode
    }

    /// Remove `absorbed`, appending its text to `survivor` and handing its
    /// children over. Children go after `absorbed` when `survivor` is its
    /// parent, otherwise to the end of `survivor`'s children.
    fn merge(
        note: &mut Note,
        absorbed: ElementId,
        survivor: ElementId,
        undo_focus: impl FnOnce(usize) -> (ElementId, usize),
    ) -> Result<(DeleteState, usize), CommandError> {
        note.transaction(|note| -> Result<(DeleteState, usize), CommandError> {
            let removed = Removed::capture(note, absorbed)?;
            let survivor_text = note.text(survivor)?.clone();
            let merge_point = survivor_text.len();
            let moved_children = note.children(absorbed).to_vec();
            for (offset, child) in moved_children.iter().enumerate() {
                if removed.parent == survivor {
                    note.move_element(*child, survivor, removed.index + 1 + offset)?;
                } else {
                    let end = note.children(survivor).len();
                    note.move_element(*child, survivor, end)?;
                }
            }
            let absorbed_text = note.text(absorbed)?.clone();
            note.text_mut(survivor)?.append_text(&absorbed_text);
            note.remove(absorbed)?;
            let state = DeleteState::Merged {
                removed,
                absorbed,
                survivor,
                survivor_text,
                moved_children,
                undo_focus: undo_focus(merge_point),
            };
            Ok((state, merge_point))
        })
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let id = self.target.element;
        match self.mode {
            DeleteMode::Backward => {
                let note = ctx.resolve_mut(&self.target)?;
                let survivor = note
                    .previous_visible(id)
                    .ok_or(CommandError::Precondition("no element above to merge into"))?;
                let (state, merge_point) = Self::merge(note, id, survivor, |_| (id, 0))?;
                self.state = Some(state);
                ctx.focus(&self.target.sibling(survivor), merge_point);
            }
            DeleteMode::Forward => {
                let note = ctx.resolve_mut(&self.target)?;
                let absorbed = note
                    .next_visible(id)
                    .ok_or(CommandError::Precondition("no element below to merge"))?;
                let (state, merge_point) = Self::merge(note, absorbed, id, |point| (id, point))?;
                self.state = Some(state);
                ctx.focus(&self.target, merge_point);
            }
            DeleteMode::Selected => {
                let prior_focus = ctx.focused();
                let note = ctx.resolve_mut(&self.target)?;
                let parent = note.parent(id).ok_or(TreeError::Root(id))?;
                let index = note.index_in_parent(id).ok_or(TreeError::NotFound(id))?;
                let subtree = note.subtree(id)?;
                let element = ElementSnapshot::encode(&subtree.without_children())?;
                let children = subtree
                    .children
                    .iter()
                    .map(ElementSnapshot::encode)
                    .collect::<Result<Vec<_>, _>>()?;
                let redirect = match note.previous_visible(id) {
                    Some(previous) => Some((previous, note.text(previous)?.len())),
                    None => note.next_visible_after_subtree(id).map(|next| (next, 0)),
                };

                match redirect {
                    Some((next, cursor)) => ctx.focus(&self.target.sibling(next), cursor),
                    None => ctx.clear_focus(),
                }
                ctx.cancel_node_selection();
                let note = ctx.resolve_mut(&self.target)?;
                note.remove(id)?;
                self.state = Some(DeleteState::Selected {
                    element,
                    children,
                    parent,
                    index,
                    prior_focus,
                });
            }
        }
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let state = self.state.as_ref().ok_or(CommandError::NotRun)?;
        match state {
            DeleteState::Merged {
                removed,
                absorbed,
                survivor,
                survivor_text,
                moved_children,
                undo_focus,
            } => {
                let note = ctx.resolve_mut(&self.target.sibling(*survivor))?;
                note.transaction(|note| -> Result<(), CommandError> {
                    for child in moved_children {
                        note.remove(*child)?;
                    }
                    *note.text_mut(*survivor)? = survivor_text.clone();
                    removed.restore(note)?;
                    Ok(())
                })?;
                tracing::debug!(element = %absorbed, "restored merged element");
                ctx.focus(&self.target.sibling(undo_focus.0), undo_focus.1);
            }
            DeleteState::Selected {
                element,
                children,
                parent,
                index,
                prior_focus,
            } => {
                let note = ctx.resolve_mut(&self.target.sibling(*parent))?;
                note.transaction(|note| -> Result<(), CommandError> {
                    let id = note.insert(*parent, element.decode()?, *index)?;
                    for (position, child) in children.iter().enumerate() {
                        note.insert(id, child.decode()?, position)?;
                    }
                    Ok(())
                })?;
                restore_focus(ctx, prior_focus.as_ref());
            }
        }
        Ok(())
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for DeleteNode {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteNode
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::DeleteNode, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::DeleteNode, "undo", result)
    }
}
