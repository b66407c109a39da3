//! Self-describing payload schemas.
//!
//! Every adapter can describe the structure of its data points without
//! authenticating or fetching anything. Optionality is modeled explicitly
//! per field so the catalog entry and the emitted records cannot disagree.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Structural description of one adapter's data-point payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSchema {
    fields: Vec<SchemaField>,
}

impl DataSchema {
    pub fn object(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }
}

impl Serialize for DataSchema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("schema", &Fields(&self.fields))?;
        map.end()
    }
}

/// One named field of a payload schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    name: String,
    kind: FieldKind,
    optional: bool,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn object(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self::new(name, FieldKind::Object(fields))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// The wire type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object(Vec<SchemaField>),
    Array(Box<FieldKind>),
}

impl FieldKind {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

struct Fields<'a>(&'a [SchemaField]);

impl Serialize for Fields<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for field in self.0 {
            seq.serialize_element(&FieldEntry(field))?;
        }
        seq.end()
    }
}

struct FieldEntry<'a>(&'a SchemaField);

impl Serialize for FieldEntry<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", self.0.name())?;
        map.serialize_entry("type", self.0.kind().type_name())?;
        map.serialize_entry("optional", &self.0.is_optional())?;
        match self.0.kind() {
            FieldKind::Object(fields) => {
                map.serialize_entry("schema", &Fields(fields))?;
            }
            FieldKind::Array(element) => {
                map.serialize_entry("schema", &ElementEntry(element))?;
            }
            _ => {}
        }
        map.end()
    }
}

struct ElementEntry<'a>(&'a FieldKind);

impl Serialize for ElementEntry<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.0.type_name())?;
        if let FieldKind::Object(fields) = self.0 {
            map.serialize_entry("schema", &Fields(fields))?;
        }
        map.end()
    }
}
