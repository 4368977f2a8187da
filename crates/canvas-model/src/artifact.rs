//! Persisted generation artifacts

use crate::ids::ArtifactId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of artifact a generation task produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Summary,
    MindMap,
    Podcast,
    Flashcards,
    Quiz,
    Timeline,
    Report,
}

impl GenerationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Summary => "summary",
            GenerationKind::MindMap => "mind_map",
            GenerationKind::Podcast => "podcast",
            GenerationKind::Flashcards => "flashcards",
            GenerationKind::Quiz => "quiz",
            GenerationKind::Timeline => "timeline",
            GenerationKind::Report => "report",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-side status of a persisted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Complete,
    Generating,
    Failed,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

/// Artifact record as listed by the persistence backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: GenerationKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    pub status: ArtifactStatus,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == ArtifactStatus::Complete
    }
}

/// Edited artifact content pushed back to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactUpdate {
    pub data: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_deserializes() {
        let status: ArtifactStatus = serde_json::from_str("\"queued\"").unwrap();
        assert_eq!(status, ArtifactStatus::Unknown);
    }

    #[test]
    fn kind_names_match_serde() {
        let json = serde_json::to_string(&GenerationKind::MindMap).unwrap();
        assert_eq!(json, format!("\"{}\"", GenerationKind::MindMap));
    }
}
