use std::ops::Range;

use crate::command::{Command, CommandError, CommandKind, report};
use crate::context::{EditorSurface, ElementRef, NoteStore};
use crate::element::ElementKind;
use crate::text::{Attribute, AttributedText};

#[derive(Debug, Clone, PartialEq)]
pub struct InsertText {
    target: ElementRef,
    position: usize,
    text: AttributedText,
    prior: Option<AttributedText>,
}

impl InsertText {
    pub fn new(target: ElementRef, text: impl Into<AttributedText>, position: usize) -> Self {
        Self {
            target,
            position,
            text: text.into(),
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn text(&self) -> &AttributedText {
        &self.text
    }

    fn end(&self) -> usize {
        self.position + self.text.len()
    }

    fn is_newline(&self) -> bool {
        self.text.text() == "\n"
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.target)?;
        let text = note.text_mut(self.target.element)?;
        let prior = text.clone();
        text.insert_text(&self.text, self.position)?;
        let attributes = text.attributes_at(self.end());
        self.prior = Some(prior);
        ctx.focus(&self.target, self.end());
        ctx.detect_formatting(&self.target, &attributes);
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let prior = self.prior.clone().ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        *note.text_mut(self.target.element)? = prior;
        ctx.focus(&self.target, self.position);
        Ok(())
    }

    /// Typing continues where the previous insert ended; newlines always start a new entry.
    pub(crate) fn absorb(&mut self, next: &InsertText) -> bool {
        if next.target != self.target
            || next.position != self.end()
            || self.is_newline()
            || next.is_newline()
        {
            return false;
        }
        self.text.append_text(&next.text);
        true
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for InsertText {
    fn kind(&self) -> CommandKind {
        CommandKind::InsertText
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::InsertText, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::InsertText, "undo", result)
    }

    fn coalesce(&mut self, next: &Self) -> bool {
        self.absorb(next)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteText {
    target: ElementRef,
    range: Range<usize>,
    removed: Option<AttributedText>,
}

impl DeleteText {
    pub fn new(target: ElementRef, range: Range<usize>) -> Self {
        Self {
            target,
            range,
            removed: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.target)?;
        let text = note.text_mut(self.target.element)?;
        let removed = text.extract(self.range.clone())?;
        text.remove_subrange(self.range.clone())?;
        self.removed = Some(removed);
        ctx.focus(&self.target, self.range.start);
        ctx.cancel_selection();
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let removed = self.removed.as_ref().ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        note.text_mut(self.target.element)?
            .insert_text(removed, self.range.start)?;
        ctx.focus(&self.target, self.range.end);
        Ok(())
    }

    /// Merge a following delete that touches this one: backspacing prepends,
    /// forward deleting appends.
    pub(crate) fn absorb(&mut self, next: &DeleteText) -> bool {
        if next.target != self.target || next.range.is_empty() {
            return false;
        }
        let (Some(mine), Some(theirs)) = (self.removed.as_mut(), next.removed.as_ref()) else {
            return false;
        };
        if next.range.end == self.range.start {
            let mut merged = theirs.clone();
            merged.append_text(mine);
            *mine = merged;
            self.range = next.range.start..self.range.end;
            true
        } else if next.range.start == self.range.start {
            mine.append_text(theirs);
            self.range = self.range.start..self.range.end + next.range.len();
            true
        } else {
            false
        }
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for DeleteText {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteText
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::DeleteText, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::DeleteText, "undo", result)
    }

    fn coalesce(&mut self, next: &Self) -> bool {
        self.absorb(next)
    }
}

/// Replaces a range (usually the selection) with new text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceText {
    target: ElementRef,
    range: Range<usize>,
    text: AttributedText,
    prior: Option<AttributedText>,
}

impl ReplaceText {
    pub fn new(target: ElementRef, range: Range<usize>, text: impl Into<AttributedText>) -> Self {
        Self {
            target,
            range,
            text: text.into(),
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub fn text(&self) -> &AttributedText {
        &self.text
    }

    fn end(&self) -> usize {
        self.range.start + self.text.len()
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.target)?;
        let text = note.text_mut(self.target.element)?;
        let prior = text.clone();
        text.replace_subrange(self.range.clone(), &self.text)?;
        let attributes = text.attributes_at(self.end());
        self.prior = Some(prior);
        ctx.focus(&self.target, self.end());
        ctx.cancel_selection();
        ctx.detect_formatting(&self.target, &attributes);
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let prior = self.prior.clone().ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        *note.text_mut(self.target.element)? = prior;
        ctx.focus(&self.target, self.range.end);
        Ok(())
    }

    /// Typing right after a replacement extends it.
    pub(crate) fn absorb_insert(&mut self, next: &InsertText) -> bool {
        if next.target != self.target || next.position != self.end() || next.is_newline() {
            return false;
        }
        self.text.append_text(&next.text);
        true
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for ReplaceText {
    fn kind(&self) -> CommandKind {
        CommandKind::ReplaceText
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::ReplaceText, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::ReplaceText, "undo", result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Formatting {
    /// Switch the element kind, or back to a bullet if it already has it.
    Kind(ElementKind),
    Attribute {
        attribute: Attribute,
        range: Range<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum PriorFormatting {
    Kind(ElementKind),
    Text(AttributedText),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattingText {
    target: ElementRef,
    formatting: Formatting,
    is_active: bool,
    prior: Option<PriorFormatting>,
}

impl FormattingText {
    pub fn new(target: ElementRef, formatting: Formatting) -> Self {
        Self {
            target,
            formatting,
            is_active: false,
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    /// Whether the formatting is currently applied by this command.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve_mut(&self.target)?;
        let element = note
            .element_mut(self.target.element)
            .ok_or_else(|| CommandError::ElementNotFound(self.target.clone()))?;
        match &self.formatting {
            Formatting::Kind(kind) => {
                let prior = element.kind;
                element.kind = if prior == *kind {
                    ElementKind::default()
                } else {
                    *kind
                };
                self.is_active = element.kind == *kind;
                self.prior = Some(PriorFormatting::Kind(prior));
            }
            Formatting::Attribute { attribute, range } => {
                let prior = element.text.clone();
                self.is_active = element.text.toggle_attribute(attribute, range.clone())?;
                let attributes = element.text.attributes_at(range.end);
                self.prior = Some(PriorFormatting::Text(prior));
                ctx.detect_formatting(&self.target, &attributes);
            }
        }
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let prior = self.prior.clone().ok_or(CommandError::NotRun)?;
        let note = ctx.resolve_mut(&self.target)?;
        let element = note
            .element_mut(self.target.element)
            .ok_or_else(|| CommandError::ElementNotFound(self.target.clone()))?;
        match prior {
            PriorFormatting::Kind(kind) => element.kind = kind,
            PriorFormatting::Text(text) => element.text = text,
        }
        self.is_active = !self.is_active;
        Ok(())
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for FormattingText {
    fn kind(&self) -> CommandKind {
        CommandKind::FormattingText
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::FormattingText, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::FormattingText, "undo", result)
    }
}
