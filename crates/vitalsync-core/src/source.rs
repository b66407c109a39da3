use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical identifiers for the external sources vitalsync can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    RunKeeper,
    BodyMedia,
    Entra,
    MindMyMeds,
}

impl SourceId {
    pub const ALL: [Self; 4] = [
        Self::RunKeeper,
        Self::BodyMedia,
        Self::Entra,
        Self::MindMyMeds,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunKeeper => "run_keeper",
            Self::BodyMedia => "body_media",
            Self::Entra => "entra",
            Self::MindMyMeds => "mind_my_meds",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "run_keeper" => Ok(Self::RunKeeper),
            "body_media" => Ok(Self::BodyMedia),
            "entra" => Ok(Self::Entra),
            "mind_my_meds" => Ok(Self::MindMyMeds),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
