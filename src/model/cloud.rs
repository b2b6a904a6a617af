//! Cloud Analysis Messages
//!
//! Wire format of the readiness analysis exchanged with the cloud service
//! over the broker.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// What the device sends: interval list in whole milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudRequest {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<u32>,
    pub analysis: AnalysisKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisKind {
    #[serde(rename = "type")]
    pub kind: String,
}

impl CloudRequest {
    pub fn rri(id: u32, ppi_ms: Vec<u32>, analysis: &str) -> Self {
        Self {
            id,
            kind: "RRI".to_string(),
            data: ppi_ms,
            analysis: AnalysisKind {
                kind: analysis.to_string(),
            },
        }
    }
}

/// Balance indices returned by the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudResult {
    #[serde(default)]
    pub sns_index: f64,
    #[serde(default)]
    pub pns_index: f64,
}

impl CloudResult {
    /// Extracts `data.analysis` from a raw response; absent indices read as zero.
    pub fn from_response(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            data: Data,
        }
        #[derive(Deserialize, Default)]
        struct Data {
            #[serde(default)]
            analysis: CloudResult,
        }
        let envelope: Envelope = serde_json::from_str(json)?;
        Ok(envelope.data.analysis)
    }
}
