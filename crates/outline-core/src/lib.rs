mod command;
mod commands;
mod context;
mod editor;
mod element;
mod history;
mod note;
mod session;
mod snapshot;
mod text;

pub use crate::command::*;
pub use crate::commands::*;
pub use crate::context::*;
pub use crate::editor::*;
pub use crate::element::*;
pub use crate::history::*;
pub use crate::note::*;
pub use crate::session::*;
pub use crate::snapshot::*;
pub use crate::text::*;
