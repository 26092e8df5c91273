use std::fmt;

use thiserror::Error;

use crate::context::ElementRef;
use crate::note::TreeError;
use crate::snapshot::SnapshotError;
use crate::text::TextError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    InsertText,
    DeleteText,
    ReplaceText,
    FormattingText,
    InsertElement,
    InsertEmptyNode,
    InsertNode,
    DeleteElement,
    DeleteNode,
    IncreaseIndentation,
    DecreaseIndentation,
    ReparentElement,
    FocusElement,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::InsertText => "InsertText",
            CommandKind::DeleteText => "DeleteText",
            CommandKind::ReplaceText => "ReplaceText",
            CommandKind::FormattingText => "FormattingText",
            CommandKind::InsertElement => "InsertElement",
            CommandKind::InsertEmptyNode => "InsertEmptyNode",
            CommandKind::InsertNode => "InsertNode",
            CommandKind::DeleteElement => "DeleteElement",
            CommandKind::DeleteNode => "DeleteNode",
            CommandKind::IncreaseIndentation => "IncreaseIndentation",
            CommandKind::DecreaseIndentation => "DecreaseIndentation",
            CommandKind::ReparentElement => "ReparentElement",
            CommandKind::FocusElement => "FocusElement",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("note `{0}` not found")]
    NoteNotFound(String),
    #[error("element {0} not found")]
    ElementNotFound(ElementRef),
    #[error("{0}")]
    Precondition(&'static str),
    #[error("nothing to undo: command has not run")]
    NotRun,
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A reversible edit applied to a context `C`.
///
/// `run` and `undo` report success; a command that returns false must leave
/// the context as it found it. `undo` is only called after a successful `run`,
/// and `run` may be called again after a successful `undo` (redo).
pub trait Command<C> {
    fn kind(&self) -> CommandKind;

    fn run(&mut self, ctx: &mut C) -> bool;

    fn undo(&mut self, ctx: &mut C) -> bool;

    /// Absorb `next`, which has already run, into `self`. Returns false to keep
    /// the two as separate history entries.
    fn coalesce(&mut self, _next: &Self) -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Turn a command outcome into the boolean the history works with.
pub(crate) fn report(kind: CommandKind, phase: &'static str, result: Result<(), CommandError>) -> bool {
    match result {
        Ok(()) => true,
        Err(CommandError::Snapshot(err)) => {
            tracing::warn!(command = %kind, phase, error = %err, "element snapshot failed");
            false
        }
        Err(err) => {
            tracing::debug!(command = %kind, phase, error = %err, "command refused");
            false
        }
    }
}
