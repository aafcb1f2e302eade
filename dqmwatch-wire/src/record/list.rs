use crate::error::{Error, Result};

use super::TypedRecord;

/// Provenance of an object list: where its children were loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListMetadata {
    /// Revision (configuration id) of the source table.
    pub revision: i32,
    /// Name of the originating configuration.
    pub origin: String,
    pub node: String,
    pub table: String,
}

impl ListMetadata {
    pub fn new(
        revision: i32,
        origin: impl Into<String>,
        node: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            revision,
            origin: origin.into(),
            node: node.into(),
            table: table.into(),
        }
    }
}

/// The value of an `OBJECT` field: child records plus the metadata they
/// were loaded with. Every child's `index` equals its position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordList {
    pub metadata: ListMetadata,
    children: Vec<TypedRecord>,
}

impl RecordList {
    pub fn new(metadata: ListMetadata) -> Self {
        Self {
            metadata,
            children: Vec::new(),
        }
    }

    /// Build a list from records, renumbering their indices.
    pub fn with_children(metadata: ListMetadata, children: Vec<TypedRecord>) -> Self {
        let mut list = Self::new(metadata);
        for child in children {
            list.push(child);
        }
        list
    }

    /// Append a child and assign its index.
    pub fn push(&mut self, mut record: TypedRecord) {
        record.set_index(self.children.len());
        self.children.push(record);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TypedRecord> {
        self.children.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TypedRecord> {
        self.children.get_mut(index)
    }

    /// Replace the child at `index`. Out of range is `NotFound`.
    pub fn set(&mut self, index: usize, mut record: TypedRecord) -> Result<()> {
        let len = self.children.len();
        let slot = self.children.get_mut(index).ok_or_else(|| {
            Error::NotFound(format!("index {} in list of {} records", index, len))
        })?;
        record.set_index(index);
        *slot = record;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedRecord> {
        self.children.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TypedRecord> {
        self.children.iter_mut()
    }

    /// Reset every child, then drop them.
    pub(crate) fn clear(&mut self) {
        self.children.iter_mut().for_each(TypedRecord::reset);
        self.children.clear();
    }
}
