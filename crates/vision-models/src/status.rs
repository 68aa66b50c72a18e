//! Processing status overview.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Snapshot of how far the vision pipeline has progressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingStatus {
    pub images: ImageCounts,
}

/// Image counters. A counter is left out when it could not be computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageCounts {
    /// Total number of image documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Images still waiting for analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_be_analyzed: Option<u64>,
}

impl ProcessingStatus {
    pub fn new(count: u64, to_be_analyzed: u64) -> Self {
        Self {
            images: ImageCounts {
                count: Some(count),
                to_be_analyzed: Some(to_be_analyzed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_counts_are_omitted() {
        let value = serde_json::to_value(ProcessingStatus::default()).unwrap();
        assert_eq!(value, serde_json::json!({"images": {}}));
    }

    #[test]
    fn test_known_counts() {
        let value = serde_json::to_value(ProcessingStatus::new(10, 3)).unwrap();
        assert_eq!(value, serde_json::json!({"images": {"count": 10, "to_be_analyzed": 3}}));
    }
}
