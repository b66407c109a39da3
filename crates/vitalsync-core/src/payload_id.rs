use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::{SourceId, ValidationError};

/// The namespace literal every payload ID must begin with.
const NAMESPACE: &str = "omh";

/// Structured decomposition of a wire-level payload ID.
///
/// The wire format is `omh:<source>:<stream>:<version>`, e.g.
/// `omh:run_keeper:fitness_activities:1`. The (source, stream) pair names
/// exactly one registered adapter; a malformed string is a validation
/// failure, never a partial match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadId {
    source: SourceId,
    stream: String,
    version: u32,
}

impl PayloadId {
    pub fn new(source: SourceId, stream: impl Into<String>, version: u32) -> Result<Self, ValidationError> {
        let stream = stream.into();
        if stream.trim().is_empty() {
            return Err(ValidationError::PayloadIdEmptyStream);
        }
        Ok(Self {
            source,
            stream,
            version,
        })
    }

    pub const fn source(&self) -> SourceId {
        self.source
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub const fn version(&self) -> u32 {
        self.version
    }
}

impl Display for PayloadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{NAMESPACE}:{}:{}:{}",
            self.source.as_str(),
            self.stream,
            self.version
        )
    }
}

impl FromStr for PayloadId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segments = value.split(':').collect::<Vec<_>>();
        if segments.len() != 4 {
            return Err(ValidationError::PayloadIdSegmentCount {
                value: value.to_owned(),
                count: segments.len(),
            });
        }

        if segments[0] != NAMESPACE {
            return Err(ValidationError::PayloadIdNamespace {
                value: value.to_owned(),
            });
        }

        let source = segments[1].parse::<SourceId>()?;

        if segments[2].is_empty() {
            return Err(ValidationError::PayloadIdEmptyStream);
        }

        let version =
            segments[3]
                .parse::<u32>()
                .map_err(|_| ValidationError::InvalidPayloadVersion {
                    value: segments[3].to_owned(),
                })?;

        Self::new(source, segments[2], version)
    }
}

impl Serialize for PayloadId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PayloadId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_payload_id() {
        let id = "omh:run_keeper:fitness_activities:1"
            .parse::<PayloadId>()
            .expect("must parse");

        assert_eq!(id.source(), SourceId::RunKeeper);
        assert_eq!(id.stream(), "fitness_activities");
        assert_eq!(id.version(), 1);
    }

    #[test]
    fn round_trips_through_display() {
        let id = PayloadId::new(SourceId::Entra, "glucose", 2).expect("valid payload ID");
        let reparsed = id.to_string().parse::<PayloadId>().expect("must parse");
        assert_eq!(id, reparsed);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = "omh:run_keeper:profile".parse::<PayloadId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::PayloadIdSegmentCount { count: 3, .. }));
    }

    #[test]
    fn rejects_wrong_namespace() {
        let err = "urn:run_keeper:profile:1"
            .parse::<PayloadId>()
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::PayloadIdNamespace { .. }));
    }

    #[test]
    fn rejects_unknown_source() {
        let err = "omh:fit_bit:steps:1".parse::<PayloadId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSource { .. }));
    }

    #[test]
    fn rejects_non_numeric_version() {
        let err = "omh:entra:glucose:latest"
            .parse::<PayloadId>()
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidPayloadVersion { .. }));
    }

    #[test]
    fn rejects_empty_stream() {
        let err = "omh:entra::1".parse::<PayloadId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::PayloadIdEmptyStream));
    }
}
