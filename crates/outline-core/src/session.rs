use std::ops::Range;

use crate::context::{Breadcrumbs, EditorSurface, ElementRef, Focus, NoteStore, Notes};
use crate::note::Note;
use crate::text::Attribute;

/// Focus, selection and typing state of an editing surface without any UI behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusState {
    pub focus: Option<Focus>,
    /// Text selection inside the focused element.
    pub selected_range: Option<Range<usize>>,
    pub node_selection: Vec<ElementRef>,
    pub breadcrumbs: Vec<ElementRef>,
    pub typing_attributes: Vec<Attribute>,
}

impl EditorSurface for FocusState {
    fn focused(&self) -> Option<Focus> {
        self.focus.clone()
    }

    fn focus(&mut self, element: &ElementRef, cursor: usize) {
        let moved = self.focus.as_ref().is_none_or(|f| &f.element != element);
        if moved {
            self.selected_range = None;
        }
        self.focus = Some(Focus {
            element: element.clone(),
            cursor,
        });
    }

    fn clear_focus(&mut self) {
        self.focus = None;
        self.selected_range = None;
    }

    fn cancel_selection(&mut self) {
        self.selected_range = None;
    }

    fn cancel_node_selection(&mut self) {
        self.node_selection.clear();
    }

    fn detect_formatting(&mut self, _element: &ElementRef, attributes: &[Attribute]) {
        self.typing_attributes = attributes.to_vec();
    }
}

impl Breadcrumbs for FocusState {
    fn remove_breadcrumb(&mut self, element: &ElementRef) -> bool {
        let before = self.breadcrumbs.len();
        self.breadcrumbs.retain(|b| b != element);
        self.breadcrumbs.len() != before
    }
}

/// The context commands run against: the notes plus the surface state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditSession {
    pub notes: Notes,
    pub surface: FocusState,
}

impl EditSession {
    pub fn new(notes: Notes) -> Self {
        Self {
            notes,
            surface: FocusState::default(),
        }
    }
}

impl NoteStore for EditSession {
    fn note(&self, name: &str) -> Option<&Note> {
        self.notes.note(name)
    }

    fn note_mut(&mut self, name: &str) -> Option<&mut Note> {
        self.notes.note_mut(name)
    }
}

impl EditorSurface for EditSession {
    fn focused(&self) -> Option<Focus> {
        self.surface.focused()
    }

    fn focus(&mut self, element: &ElementRef, cursor: usize) {
        self.surface.focus(element, cursor);
    }

    fn clear_focus(&mut self) {
        self.surface.clear_focus();
    }

    fn cancel_selection(&mut self) {
        self.surface.cancel_selection();
    }

    fn cancel_node_selection(&mut self) {
        self.surface.cancel_node_selection();
    }

    fn detect_formatting(&mut self, element: &ElementRef, attributes: &[Attribute]) {
        self.surface.detect_formatting(element, attributes);
    }
}

impl Breadcrumbs for EditSession {
    fn remove_breadcrumb(&mut self, element: &ElementRef) -> bool {
        self.surface.remove_breadcrumb(element)
    }
}
