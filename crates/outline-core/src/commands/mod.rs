mod focus;
mod node;
mod structure;
mod text;

pub use focus::*;
pub use node::*;
pub use structure::*;
pub use text::*;

use crate::command::{Command, CommandKind};
use crate::context::EditContext;

/// Every built-in command, as one type the history can store and coalesce.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    InsertText(InsertText),
    DeleteText(DeleteText),
    ReplaceText(ReplaceText),
    FormattingText(FormattingText),
    InsertElement(InsertElement),
    InsertEmptyNode(InsertEmptyNode),
    InsertNode(InsertNode),
    DeleteElement(DeleteElement),
    DeleteNode(DeleteNode),
    IncreaseIndentation(IncreaseIndentation),
    DecreaseIndentation(DecreaseIndentation),
    ReparentElement(ReparentElement),
    FocusElement(FocusElement),
}

macro_rules! edit_command_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for EditCommand {
                fn from(command: $variant) -> Self {
                    EditCommand::$variant(command)
                }
            }
        )*
    };
}

edit_command_from!(
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
);

macro_rules! dispatch {
    ($self:expr, $command:ident => $body:expr) => {
        match $self {
            EditCommand::InsertText($command) => $body,
            EditCommand::DeleteText($command) => $body,
            EditCommand::ReplaceText($command) => $body,
            EditCommand::FormattingText($command) => $body,
            EditCommand::InsertElement($command) => $body,
            EditCommand::InsertEmptyNode($command) => $body,
            EditCommand::InsertNode($command) => $body,
            EditCommand::DeleteElement($command) => $body,
            EditCommand::DeleteNode($command) => $body,
            EditCommand::IncreaseIndentation($command) => $body,
            EditCommand::DecreaseIndentation($command) => $body,
            EditCommand::ReparentElement($command) => $body,
            EditCommand::FocusElement($command) => $body,
        }
    };
}

impl<C: EditContext> Command<C> for EditCommand {
    fn kind(&self) -> CommandKind {
        match self {
            EditCommand::InsertText(_) => CommandKind::InsertText,
            EditCommand::DeleteText(_) => CommandKind::DeleteText,
            EditCommand::ReplaceText(_) => CommandKind::ReplaceText,
            EditCommand::FormattingText(_) => CommandKind::FormattingText,
            EditCommand::InsertElement(_) => CommandKind::InsertElement,
            EditCommand::InsertEmptyNode(_) => CommandKind::InsertEmptyNode,
            EditCommand::InsertNode(_) => CommandKind::InsertNode,
            EditCommand::DeleteElement(_) => CommandKind::DeleteElement,
            EditCommand::DeleteNode(_) => CommandKind::DeleteNode,
            EditCommand::IncreaseIndentation(_) => CommandKind::IncreaseIndentation,
            EditCommand::DecreaseIndentation(_) => CommandKind::DecreaseIndentation,
            EditCommand::ReparentElement(_) => CommandKind::ReparentElement,
            EditCommand::FocusElement(_) => CommandKind::FocusElement,
        }
    }

    fn run(&mut self, ctx: &mut C) -> bool {
        dispatch!(self, command => Command::<C>::run(command, ctx))
    }

    fn undo(&mut self, ctx: &mut C) -> bool {
        dispatch!(self, command => Command::<C>::undo(command, ctx))
    }

    fn coalesce(&mut self, next: &Self) -> bool {
        match (self, next) {
            (EditCommand::InsertText(last), EditCommand::InsertText(next)) => last.absorb(next),
            (EditCommand::DeleteText(last), EditCommand::DeleteText(next)) => last.absorb(next),
            (EditCommand::ReplaceText(last), EditCommand::InsertText(next)) => {
                last.absorb_insert(next)
            }
            (EditCommand::FocusElement(last), EditCommand::FocusElement(next)) => last.absorb(next),
            _ => false,
        }
    }
}
