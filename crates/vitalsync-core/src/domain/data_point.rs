use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::UtcDateTime;
use crate::columns::ColumnNode;

/// Geographic location attached to a data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<UtcDateTime>,
}

/// One normalized point from an external source.
///
/// Whether `id`, `timestamp`, and `location` are populated is a fixed
/// property of the adapter that produced the point, declared through its
/// capability flags, not a per-point accident. `data` is the schema-typed
/// payload described by the adapter's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub id: Option<String>,
    pub timestamp: Option<UtcDateTime>,
    pub location: Option<Location>,
    pub data: Value,
}

impl DataPoint {
    pub fn new(data: Value) -> Self {
        Self {
            id: None,
            timestamp: None,
            location: None,
            data,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: UtcDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Serializes the point as `{"metadata": {...}, "data": {...}}`.
    ///
    /// Metadata sub-fields are emitted only when the owning adapter declares
    /// the corresponding capability; the data payload is filtered through the
    /// column projection when one is given.
    pub fn render(
        &self,
        has_id: bool,
        has_timestamp: bool,
        has_location: bool,
        columns: Option<&ColumnNode>,
    ) -> Value {
        let mut metadata = Map::new();
        if has_id {
            if let Some(id) = &self.id {
                metadata.insert(String::from("id"), Value::String(id.clone()));
            }
        }
        if has_timestamp {
            if let Some(timestamp) = self.timestamp {
                metadata.insert(
                    String::from("timestamp"),
                    Value::String(timestamp.format_rfc3339()),
                );
            }
        }
        if has_location {
            if let Some(location) = &self.location {
                if let Ok(value) = serde_json::to_value(location) {
                    metadata.insert(String::from("location"), value);
                }
            }
        }

        let data = match columns {
            Some(columns) => columns.project(&self.data),
            None => self.data.clone(),
        };

        let mut point = Map::new();
        point.insert(String::from("metadata"), Value::Object(metadata));
        point.insert(String::from("data"), data);
        Value::Object(point)
    }
}
