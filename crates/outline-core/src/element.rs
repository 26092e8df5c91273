use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text::AttributedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Bullet,
    Heading {
        level: u8,
    },
    Quote,
    Check {
        checked: bool,
    },
    Code,
}

/// A node living inside a [`crate::Note`].
///
/// Structure (parent and children) is owned by the note; only the content
/// fields are public.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    pub kind: ElementKind,
    pub text: AttributedText,
    pub open: bool,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
}

impl Element {
    pub(crate) fn new(id: ElementId, text: AttributedText) -> Self {
        Self {
            id,
            kind: ElementKind::default(),
            text,
            open: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

fn default_open() -> bool {
    true
}

/// An element lifted out of a note together with its whole subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedElement {
    pub id: ElementId,
    #[serde(default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub text: AttributedText,
    #[serde(default = "default_open")]
    pub open: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DetachedElement>,
}

impl DetachedElement {
    pub fn new(text: impl Into<AttributedText>) -> Self {
        Self::with_id(ElementId::new(), text)
    }

    pub fn with_id(id: ElementId, text: impl Into<AttributedText>) -> Self {
        Self {
            id,
            kind: ElementKind::default(),
            text: text.into(),
            open: true,
            children: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn child(mut self, child: DetachedElement) -> Self {
        self.children.push(child);
        self
    }

    /// Ids of this element and all its descendants, in pre-order.
    pub fn ids(&self) -> Vec<ElementId> {
        let mut ids = vec![self.id];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }

    /// The same element without its descendants.
    pub fn without_children(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }
}
