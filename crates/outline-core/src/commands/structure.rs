use crate::command::{Command, CommandError, CommandKind, report};
use crate::context::{Breadcrumbs, ElementRef, NoteStore};
use crate::element::ElementId;
use crate::note::{MAX_DEPTH, Note, TreeError};

/// Where an element sat before a structural command moved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    parent: ElementId,
    index: usize,
}

impl Placement {
    fn of(note: &Note, id: ElementId) -> Result<Self, CommandError> {
        let parent = note.parent(id).ok_or(TreeError::Root(id))?;
        let index = note.index_in_parent(id).ok_or(TreeError::NotFound(id))?;
        Ok(Self { parent, index })
    }
}

/// Makes an element the last child of its previous sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct IncreaseIndentation {
    target: ElementRef,
    prior: Option<(Placement, ElementId, bool)>,
}

impl IncreaseIndentation {
    pub fn new(target: ElementRef) -> Self {
        Self {
            target,
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    fn try_run<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let id = self.target.element;
        let note = ctx.resolve_mut(&self.target)?;
        let placement = Placement::of(note, id)?;
        let new_parent = note
            .previous_sibling(id)
            .ok_or(CommandError::Precondition("no previous sibling to indent under"))?;
        if note.depth(new_parent) + 1 + note.height(id) >= MAX_DEPTH {
            return Err(CommandError::Precondition("maximum indentation depth reached"));
        }
        let index = note.children(new_parent).len();
        note.move_element(id, new_parent, index)?;
        let was_open = note.set_open(new_parent, true)?;
        self.prior = Some((placement, new_parent, was_open));
        Ok(())
    }

    fn try_undo<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let (placement, new_parent, was_open) = self.prior.ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        note.transaction(|note| -> Result<(), CommandError> {
            note.move_element(self.target.element, placement.parent, placement.index)?;
            note.set_open(new_parent, was_open)?;
            Ok(())
        })
    }
}

impl<C: NoteStore> Command<C> for IncreaseIndentation {
    fn kind(&self) -> CommandKind {
        CommandKind::IncreaseIndentation
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::IncreaseIndentation, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::IncreaseIndentation, "undo", result)
    }
}

/// Moves an element out of its parent, right after it in the grandparent.
#[derive(Debug, Clone, PartialEq)]
pub struct DecreaseIndentation {
    target: ElementRef,
    prior: Option<Placement>,
}

impl DecreaseIndentation {
    pub fn new(target: ElementRef) -> Self {
        Self {
            target,
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    fn try_run<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let id = self.target.element;
        let note = ctx.resolve_mut(&self.target)?;
        let placement = Placement::of(note, id)?;
        let grandparent = note
            .parent(placement.parent)
            .ok_or(CommandError::Precondition("element is already at the top level"))?;
        let parent_index = note
            .index_in_parent(placement.parent)
            .ok_or(TreeError::NotFound(placement.parent))?;
        note.move_element(id, grandparent, parent_index + 1)?;
        self.prior = Some(placement);
        Ok(())
    }

    fn try_undo<C: NoteStore>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let placement = self.prior.ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        note.move_element(self.target.element, placement.parent, placement.index)?;
        Ok(())
    }
}

impl<C: NoteStore> Command<C> for DecreaseIndentation {
    fn kind(&self) -> CommandKind {
        CommandKind::DecreaseIndentation
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::DecreaseIndentation, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::DecreaseIndentation, "undo", result)
    }
}

/// Moves an element to an arbitrary parent and index within its note.
#[derive(Debug, Clone, PartialEq)]
pub struct ReparentElement {
    target: ElementRef,
    new_parent: ElementId,
    index: usize,
    prior: Option<Placement>,
}

impl ReparentElement {
    pub fn new(target: ElementRef, new_parent: ElementId, index: usize) -> Self {
        Self {
            target,
            new_parent,
            index,
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    fn try_run<C: NoteStore + Breadcrumbs>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let id = self.target.element;
        let note = ctx.resolve_mut(&self.target)?;
        if !note.contains(self.new_parent) {
            return Err(CommandError::ElementNotFound(
                self.target.sibling(self.new_parent),
            ));
        }
        let placement = Placement::of(note, id)?;
        note.move_element(id, self.new_parent, self.index)?;
        self.prior = Some(placement);
        if ctx.remove_breadcrumb(&self.target) {
            tracing::debug!(element = %self.target, "dropped breadcrumb of moved element");
        }
        Ok(())
    }

    fn try_undo<C: NoteStore + Breadcrumbs>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let placement = self.prior.ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        note.move_element(self.target.element, placement.parent, placement.index)?;
        Ok(())
    }
}

impl<C: NoteStore + Breadcrumbs> Command<C> for ReparentElement {
    fn kind(&self) -> CommandKind {
        CommandKind::ReparentElement
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::ReparentElement, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::ReparentElement, "undo", result)
    }
}
