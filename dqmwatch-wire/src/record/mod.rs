//! Self-describing typed records.
//!
//! A [`TypedRecord`] is an ordered bag of named, typed fields. Records carry
//! their own schema on the wire, so a decoder needs no prior knowledge of
//! the fields it will find. `OBJECT` fields nest whole lists of records
//! together with the [`ListMetadata`] they were loaded with.
//!
//! ```rust
//! use dqmwatch_wire::record::{ListMetadata, RecordList, TypedRecord};
//!
//! let mut hslb = TypedRecord::new("ttd", "hslb");
//! hslb.add_bool("used", true).unwrap();
//!
//! let mut list = RecordList::new(ListMetadata::new(3, "default", "ttd1", "hslb"));
//! list.push(TypedRecord::new("ttd", "hslb"));
//! list.push(hslb);
//!
//! let mut node = TypedRecord::new("ttd", "node");
//! node.add_object("hslb", list).unwrap();
//!
//! assert!(node.get_object("hslb", 1).unwrap().get_bool("used").unwrap());
//! assert_eq!(node.to_string(), "hslb[1].used = true\n");
//! ```

mod codec;
mod field;
mod frame;
mod list;

use std::fmt;

pub use field::{FieldType, FieldValue};
pub use frame::{read_record_frame, write_record_frame};
pub use list::{ListMetadata, RecordList};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: String,
    value: FieldValue,
}

/// An ordered collection of named, typed fields.
///
/// Field names are unique and a field's type never changes once the field
/// exists. Writes that would change a type fail with `TypeMismatch` and
/// leave the record untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedRecord {
    path: String,
    name: String,
    index: usize,
    fields: Vec<Field>,
}

macro_rules! scalar_accessors {
    ($($get:ident, $add:ident, $variant:ident, $ty:ty;)*) => {
        $(
            #[doc = concat!("Read a `", stringify!($variant), "` field.")]
            pub fn $get(&self, name: &str) -> Result<$ty> {
                match self.field(name)? {
                    FieldValue::$variant(v) => Ok(*v),
                    other => Err(self.mismatch(name, other.field_type(), FieldType::$variant)),
                }
            }

            #[doc = concat!("Add or overwrite a `", stringify!($variant), "` field.")]
            pub fn $add(&mut self, name: &str, value: $ty) -> Result<()> {
                self.add_value(name, FieldValue::$variant(value))
            }
        )*
    };
}

macro_rules! string_accessors {
    ($($get:ident, $add:ident, $variant:ident;)*) => {
        $(
            #[doc = concat!("Read a `", stringify!($variant), "` field.")]
            pub fn $get(&self, name: &str) -> Result<&str> {
                match self.field(name)? {
                    FieldValue::$variant(v) => Ok(v),
                    other => Err(self.mismatch(name, other.field_type(), FieldType::$variant)),
                }
            }

            #[doc = concat!("Add or overwrite a `", stringify!($variant), "` field.")]
            pub fn $add(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
                self.add_value(name, FieldValue::$variant(value.into()))
            }
        )*
    };
}

impl TypedRecord {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            index: 0,
            fields: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position inside the parent list; 0 for top-level records.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_identity(&mut self, path: String, name: String) {
        self.path = path;
        self.name = name;
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.get(name).map(FieldValue::field_type)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|f| (f.name.as_str(), &f.value))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn field(&self, name: &str) -> Result<&FieldValue> {
        self.get(name).ok_or_else(|| self.not_found(name))
    }

    fn not_found(&self, name: &str) -> Error {
        Error::NotFound(format!("field '{}' in record '{}'", name, self.name))
    }

    fn mismatch(&self, name: &str, actual: FieldType, requested: FieldType) -> Error {
        Error::TypeMismatch {
            field: name.to_string(),
            actual: actual.name(),
            requested: requested.name(),
        }
    }

    /// Append a field, or overwrite it in place if it exists with the same type.
    pub fn add_value(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        match self.position(name) {
            Some(i) => {
                let actual = self.fields[i].value.field_type();
                if actual != value.field_type() {
                    return Err(self.mismatch(name, actual, value.field_type()));
                }
                self.fields[i].value = value;
            }
            None => self.fields.push(Field {
                name: name.to_string(),
                value,
            }),
        }
        Ok(())
    }

    /// Overwrite an existing field. Missing is `NotFound`, a different
    /// type is `TypeMismatch`; either way the record is unchanged.
    pub fn set_value(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let i = self.position(name).ok_or_else(|| self.not_found(name))?;
        let actual = self.fields[i].value.field_type();
        if actual != value.field_type() {
            tracing::debug!(field = name, %actual, requested = %value.field_type(), "rejected typed write");
            return Err(self.mismatch(name, actual, value.field_type()));
        }
        self.fields[i].value = value;
        Ok(())
    }

    scalar_accessors! {
        get_bool, add_bool, Bool, bool;
        get_char, add_char, Char, i8;
        get_short, add_short, Short, i16;
        get_int, add_int, Int, i32;
        get_long, add_long, Long, i64;
        get_float, add_float, Float, f32;
        get_double, add_double, Double, f64;
    }

    string_accessors! {
        get_text, add_text, Text;
        get_enum, add_enum, Enum;
    }

    /// Add or overwrite an `OBJECT` field.
    pub fn add_object(&mut self, name: &str, list: RecordList) -> Result<()> {
        self.add_value(name, FieldValue::Object(list))
    }

    /// The list behind an `OBJECT` field. Missing or non-object is `NotFound`.
    pub fn objects(&self, name: &str) -> Result<&RecordList> {
        match self.get(name) {
            Some(FieldValue::Object(list)) => Ok(list),
            _ => Err(Error::NotFound(format!(
                "object list '{}' in record '{}'",
                name, self.name
            ))),
        }
    }

    pub fn objects_mut(&mut self, name: &str) -> Result<&mut RecordList> {
        let record = self.name.clone();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(Field {
                value: FieldValue::Object(list),
                ..
            }) => Ok(list),
            _ => Err(Error::NotFound(format!(
                "object list '{}' in record '{}'",
                name, record
            ))),
        }
    }

    pub fn object_count(&self, name: &str) -> Result<usize> {
        Ok(self.objects(name)?.len())
    }

    pub fn get_object(&self, name: &str, index: usize) -> Result<&TypedRecord> {
        let list = self.objects(name)?;
        list.get(index).ok_or_else(|| {
            Error::NotFound(format!(
                "index {} in object list '{}' of {} records",
                index,
                name,
                list.len()
            ))
        })
    }

    pub fn get_object_mut(&mut self, name: &str, index: usize) -> Result<&mut TypedRecord> {
        let list = self.objects_mut(name)?;
        let len = list.len();
        list.get_mut(index).ok_or_else(|| {
            Error::NotFound(format!(
                "index {} in object list '{}' of {} records",
                index, name, len
            ))
        })
    }

    /// Replace the child at `index` of an existing object list.
    pub fn set_object(&mut self, name: &str, index: usize, record: TypedRecord) -> Result<()> {
        self.objects_mut(name)?.set(index, record)
    }

    /// Append a child to an existing object list.
    pub fn push_object(&mut self, name: &str, record: TypedRecord) -> Result<()> {
        self.objects_mut(name)?.push(record);
        Ok(())
    }

    /// Drop all fields. Nested records are reset before their parent.
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            if let FieldValue::Object(list) = &mut field.value {
                list.clear();
            }
        }
        self.fields.clear();
    }

    /// All scalar fields as `dotted.key` pairs, descending into object lists
    /// as `field[index].child`.
    pub fn flatten(&self) -> Vec<(String, &FieldValue)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a FieldValue)>) {
        for field in &self.fields {
            let key = format!("{}{}", prefix, field.name);
            match &field.value {
                FieldValue::Object(list) => {
                    for (i, child) in list.iter().enumerate() {
                        child.flatten_into(&format!("{}[{}].", key, i), out);
                    }
                }
                value => out.push((key, value)),
            }
        }
    }
}

impl fmt::Display for TypedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.flatten() {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}
