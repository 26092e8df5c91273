use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::CommandError;
use crate::element::ElementId;
use crate::note::Note;
use crate::text::Attribute;

/// Addresses an element by note name and element id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementRef {
    pub note: String,
    pub element: ElementId,
}

impl ElementRef {
    pub fn new(note: impl Into<String>, element: ElementId) -> Self {
        Self {
            note: note.into(),
            element,
        }
    }

    pub fn sibling(&self, element: ElementId) -> Self {
        Self::new(self.note.clone(), element)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.note, self.element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub element: ElementRef,
    pub cursor: usize,
}

pub trait NoteStore {
    fn note(&self, name: &str) -> Option<&Note>;
    fn note_mut(&mut self, name: &str) -> Option<&mut Note>;

    fn resolve(&self, target: &ElementRef) -> Result<&Note, CommandError> {
        let note = self
            .note(&target.note)
            .ok_or_else(|| CommandError::NoteNotFound(target.note.clone()))?;
        if !note.contains(target.element) {
            return Err(CommandError::ElementNotFound(target.clone()));
        }
        Ok(note)
    }

    fn resolve_mut(&mut self, target: &ElementRef) -> Result<&mut Note, CommandError> {
        let note = self
            .note_mut(&target.note)
            .ok_or_else(|| CommandError::NoteNotFound(target.note.clone()))?;
        if !note.contains(target.element) {
            return Err(CommandError::ElementNotFound(target.clone()));
        }
        Ok(note)
    }
}

/// What commands tell the editing surface about focus and formatting.
pub trait EditorSurface {
    fn focused(&self) -> Option<Focus>;
    fn focus(&mut self, element: &ElementRef, cursor: usize);
    fn clear_focus(&mut self);
    fn cancel_selection(&mut self);
    fn cancel_node_selection(&mut self);
    fn detect_formatting(&mut self, element: &ElementRef, attributes: &[Attribute]);
}

pub trait Breadcrumbs {
    /// Returns true if a breadcrumb pointed at `element`.
    fn remove_breadcrumb(&mut self, element: &ElementRef) -> bool;
}

/// Everything the built-in commands need from their host.
pub trait EditContext: NoteStore + EditorSurface + Breadcrumbs {}

impl<T: NoteStore + EditorSurface + Breadcrumbs> EditContext for T {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notes {
    notes: BTreeMap<String, Note>,
}

impl Notes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note: Note) -> Option<Note> {
        self.notes.insert(note.name().to_string(), note)
    }

    pub fn remove(&mut self, name: &str) -> Option<Note> {
        self.notes.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.notes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl FromIterator<Note> for Notes {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        let mut notes = Self::new();
        for note in iter {
            notes.insert(note);
        }
        notes
    }
}

impl NoteStore for Notes {
    fn note(&self, name: &str) -> Option<&Note> {
        self.notes.get(name)
    }

    fn note_mut(&mut self, name: &str) -> Option<&mut Note> {
        self.notes.get_mut(name)
    }
}
