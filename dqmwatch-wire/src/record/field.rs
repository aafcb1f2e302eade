use std::fmt;

use super::RecordList;

/// Wire type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Text,
    Enum,
    Object,
}

impl FieldType {
    pub const ALL: [FieldType; 10] = [
        FieldType::Bool,
        FieldType::Char,
        FieldType::Short,
        FieldType::Int,
        FieldType::Long,
        FieldType::Float,
        FieldType::Double,
        FieldType::Text,
        FieldType::Enum,
        FieldType::Object,
    ];

    /// Tag written before each field value.
    pub const fn tag(&self) -> i32 {
        match self {
            FieldType::Bool => 0,
            FieldType::Char => 1,
            FieldType::Short => 2,
            FieldType::Int => 3,
            FieldType::Long => 4,
            FieldType::Float => 5,
            FieldType::Double => 6,
            FieldType::Text => 7,
            FieldType::Enum => 8,
            FieldType::Object => 9,
        }
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            FieldType::Bool => "BOOL",
            FieldType::Char => "CHAR",
            FieldType::Short => "SHORT",
            FieldType::Int => "INT",
            FieldType::Long => "LONG",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Text => "TEXT",
            FieldType::Enum => "ENUM",
            FieldType::Object => "OBJECT",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field value together with its wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Char(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    /// Same wire shape as `Text`; the string names an enumerator.
    Enum(String),
    Object(RecordList),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::Short(_) => FieldType::Short,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Enum(_) => FieldType::Enum,
            FieldValue::Object(_) => FieldType::Object,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Char(v) => write!(f, "{}", v),
            FieldValue::Short(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(v) | FieldValue::Enum(v) => f.write_str(v),
            FieldValue::Object(list) => write!(f, "[{} objects]", list.len()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => Text,
    RecordList => Object,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_stable() {
        for (expected, ty) in FieldType::ALL.iter().enumerate() {
            assert_eq!(ty.tag(), expected as i32);
            assert_eq!(FieldType::from_tag(ty.tag()), Some(*ty));
        }
        assert_eq!(FieldType::from_tag(10), None);
        assert_eq!(FieldType::from_tag(-1), None);
    }

    #[test]
    fn test_value_types() {
        assert_eq!(FieldValue::from(3i16).field_type(), FieldType::Short);
        assert_eq!(FieldValue::from("x").field_type(), FieldType::Text);
        assert_eq!(FieldValue::Enum("ON".into()).field_type(), FieldType::Enum);
        assert_eq!(FieldValue::Double(0.5).to_string(), "0.5");
    }
}
