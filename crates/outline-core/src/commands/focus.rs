use crate::command::{Command, CommandError, CommandKind, report};
use crate::context::{EditorSurface, ElementRef, Focus, NoteStore};
use crate::text::TextError;

/// Put focus back where it was, or clear it if that element is gone.
pub(crate) fn restore_focus<C: NoteStore + EditorSurface>(ctx: &mut C, focus: Option<&Focus>) {
    match focus {
        Some(focus) if ctx.resolve(&focus.element).is_ok() => {
            ctx.focus(&focus.element, focus.cursor);
        }
        _ => ctx.clear_focus(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PriorFocus {
    Unfocused,
    Focused(Focus),
}

/// Moves the caret, so focus changes can be undone along with edits.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusElement {
    target: ElementRef,
    cursor: usize,
    prior: Option<PriorFocus>,
}

impl FocusElement {
    pub fn new(target: ElementRef, cursor: usize) -> Self {
        Self {
            target,
            cursor,
            prior: None,
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn try_run<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        let note = ctx.resolve(&self.target)?;
        let len = note.text(self.target.element)?.len();
        if self.cursor > len {
            return Err(TextError::OutOfBounds {
                position: self.cursor,
                len,
            }
            .into());
        }
        self.prior = Some(match ctx.focused() {
            Some(focus) => PriorFocus::Focused(focus),
            None => PriorFocus::Unfocused,
        });
        ctx.focus(&self.target, self.cursor);
        Ok(())
    }

    fn try_undo<C: NoteStore + EditorSurface>(&mut self, ctx: &mut C) -> Result<(), CommandError> {
        match self.prior.as_ref().ok_or(CommandError::NotRun)? {
            PriorFocus::Focused(focus) => restore_focus(ctx, Some(focus)),
            PriorFocus::Unfocused => ctx.clear_focus(),
        }
        Ok(())
    }

    pub(crate) fn absorb(&mut self, next: &FocusElement) -> bool {
        if next.target != self.target {
            return false;
        }
        self.cursor = next.cursor;
        true
    }
}

impl<C: NoteStore + EditorSurface> Command<C> for FocusElement {
    fn kind(&self) -> CommandKind {
        CommandKind::FocusElement
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        let result = self.try_run(ctx);
        report(CommandKind::FocusElement, "run", result)
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        let result = self.try_undo(ctx);
        report(CommandKind::FocusElement, "undo", result)
    }

    fn coalesce(&mut self, next: &Self) -> bool {
        self.absorb(next)
    }
}
