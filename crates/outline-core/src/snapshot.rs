use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{DetachedElement, ElementId};

const SNAPSHOT_SCHEMA: &str = "outline-element";

fn default_schema() -> String {
    SNAPSHOT_SCHEMA.to_string()
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode element {id}")]
    Encode {
        id: ElementId,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode element snapshot")]
    Decode(#[source] serde_json::Error),
    #[error("unexpected snapshot schema `{0}`")]
    Schema(String),
}

#[derive(Serialize, Deserialize)]
struct Envelope<E> {
    #[serde(default = "default_schema")]
    schema: String,
    element: E,
}

/// Serialized form of a detached subtree, kept by commands that need to put
/// removed content back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    bytes: Vec<u8>,
}

impl ElementSnapshot {
    pub fn encode(element: &DetachedElement) -> Result<Self, SnapshotError> {
        let envelope = Envelope {
            schema: default_schema(),
            element,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|source| SnapshotError::Encode {
            id: element.id,
            source,
        })?;
        Ok(Self { bytes })
    }

    pub fn decode(&self) -> Result<DetachedElement, SnapshotError> {
        let envelope: Envelope<DetachedElement> =
            serde_json::from_slice(&self.bytes).map_err(SnapshotError::Decode)?;
        if envelope.schema != SNAPSHOT_SCHEMA {
            return Err(SnapshotError::Schema(envelope.schema));
        }
        Ok(envelope.element)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        let value: serde_json::Value =
            serde_json::from_slice(&self.bytes).map_err(SnapshotError::Decode)?;
        serde_json::to_string_pretty(&value).map_err(SnapshotError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::text::{Attribute, AttributedText};

    #[test]
    fn decode_restores_ids_and_content() {
        let element = DetachedElement::with_id(
            ElementId::new(),
            AttributedText::with_attributes("bold", vec![Attribute::Strong]),
        )
        .kind(ElementKind::Check { checked: true })
        .child(DetachedElement::new("child"));

        let snapshot = ElementSnapshot::encode(&element).unwrap();
        assert_eq!(snapshot.decode().unwrap(), element);
    }

    #[test]
    fn rejects_foreign_schema() {
        let snapshot = ElementSnapshot::from_bytes(
            br#"{"schema":"other","element":{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8"}}"#
                .to_vec(),
        );
        assert!(matches!(snapshot.decode(), Err(SnapshotError::Schema(s)) if s == "other"));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let snapshot = ElementSnapshot::from_bytes(b"not json".to_vec());
        assert!(matches!(snapshot.decode(), Err(SnapshotError::Decode(_))));
    }
}
