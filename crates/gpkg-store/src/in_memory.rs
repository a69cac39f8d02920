use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::{
    Container, Error, ExistingSlotAction, SlotInfo, SlotKind, WriteError, WriteErrorCode,
    WriteRequest,
};

#[derive(Debug, Clone)]
struct MemorySlot {
    kind: SlotKind,
    source: String,
    fields: Vec<String>,
}

/// In-memory container, useful for testing.
///
/// Written slots take their kind from the write request. Attribute fields
/// can be attached to a source descriptor with `register_source_fields`;
/// slots written from that source start with those fields.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContainer {
    path: PathBuf,
    slots: BTreeMap<String, MemorySlot>,
    source_fields: HashMap<String, Vec<String>>,
    rejected: HashMap<String, String>,
    writes: usize,
}

impl InMemoryContainer {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        InMemoryContainer {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Adds a slot directly, as if an earlier run had written it.
    pub fn insert_slot(&mut self, name: &str, kind: SlotKind) {
        self.slots.insert(
            name.to_owned(),
            MemorySlot {
                kind,
                source: String::new(),
                fields: Vec::new(),
            },
        );
    }

    pub fn register_source_fields(&mut self, source: &str, fields: &[&str]) {
        self.source_fields.insert(
            source.to_owned(),
            fields.iter().map(|f| (*f).to_owned()).collect(),
        );
    }

    /// Makes every write to `slot_name` fail with the given message.
    pub fn reject_writes_to(&mut self, slot_name: &str, message: &str) {
        self.rejected
            .insert(slot_name.to_owned(), message.to_owned());
    }

    pub fn fields(&self, slot_name: &str) -> Option<&[String]> {
        self.slots.get(slot_name).map(|slot| slot.fields.as_slice())
    }

    /// Source descriptor the slot was last written from.
    pub fn written_from(&self, slot_name: &str) -> Option<&str> {
        self.slots.get(slot_name).map(|slot| slot.source.as_str())
    }

    /// Number of successful writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Container for InMemoryContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&self, name: &str) -> Result<Option<SlotInfo>, Error> {
        Ok(self.slots.get(name).map(|slot| SlotInfo {
            name: name.to_owned(),
            kind: slot.kind,
        }))
    }

    fn slot_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.slots.keys().cloned().collect())
    }

    fn write_slot(&mut self, request: &WriteRequest<'_>) -> Result<SlotInfo, WriteError> {
        if let Some(message) = self.rejected.get(request.slot_name) {
            return Err(WriteError::new(WriteErrorCode::WriteFailed, message.clone()));
        }

        if self.slots.contains_key(request.slot_name)
            && request.action == ExistingSlotAction::FailIfExists
        {
            return Err(WriteError::new(
                WriteErrorCode::SlotExists,
                format!("slot '{}' already exists", request.slot_name),
            ));
        }

        let fields = self
            .source_fields
            .get(request.source)
            .cloned()
            .unwrap_or_default();

        self.slots.insert(
            request.slot_name.to_owned(),
            MemorySlot {
                kind: request.content,
                source: request.source.to_owned(),
                fields,
            },
        );
        self.writes += 1;

        Ok(SlotInfo {
            name: request.slot_name.to_owned(),
            kind: request.content,
        })
    }

    fn clear_attributes(&mut self, name: &str) -> Result<usize, Error> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| Error::MissingSlot(name.to_owned()))?;
        let removed = slot.fields.len();
        slot.fields.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeometryClass;

    fn points(feature_count: u64) -> SlotKind {
        SlotKind::Features {
            geometry: GeometryClass::Point,
            feature_count,
        }
    }

    #[test]
    fn missing_slot_is_none() {
        let container = InMemoryContainer::new("/p.gpkg");
        assert_eq!(container.slot("nope").unwrap(), None);
    }

    #[test]
    fn overwrite_and_fail_if_exists() {
        let mut container = InMemoryContainer::new("/p.gpkg");
        container.insert_slot("Trees", points(1));

        let mut request = WriteRequest {
            slot_name: "Trees",
            source: "/src.gpkg|layername=trees",
            content: points(12),
            action: ExistingSlotAction::CreateOrOverwriteLayer,
            transform_context: None,
        };
        let info = container.write_slot(&request).unwrap();
        assert_eq!(info.kind, points(12));

        request.action = ExistingSlotAction::FailIfExists;
        let err = container.write_slot(&request).unwrap_err();
        assert_eq!(err.code, WriteErrorCode::SlotExists);
        assert_eq!(container.write_count(), 1);
    }

    #[test]
    fn clearing_attributes() {
        let mut container = InMemoryContainer::new("/p.gpkg");
        container.register_source_fields("/dwg.gpkg|layername=entities", &["Layer", "Handle"]);
        container
            .write_slot(&WriteRequest {
                slot_name: "Walls",
                source: "/dwg.gpkg|layername=entities",
                content: points(3),
                action: ExistingSlotAction::CreateOrOverwriteLayer,
                transform_context: None,
            })
            .unwrap();

        assert_eq!(container.fields("Walls").unwrap().len(), 2);
        assert_eq!(container.clear_attributes("Walls").unwrap(), 2);
        assert!(container.fields("Walls").unwrap().is_empty());
        assert!(matches!(
            container.clear_attributes("Doors"),
            Err(Error::MissingSlot(_))
        ));
    }
}
