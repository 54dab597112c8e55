//! Catalog records as they appear in the streams file, and the flattened
//! capture targets derived from them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One stream to capture during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    /// Resort identifier, empty when the catalog omits it
    pub resort_id: String,
    pub resort_name: String,
    /// Camera name, distinguishes several cameras of one resort
    pub slope_name: String,
    /// Playable stream address, never empty
    pub stream_url: String,
}

/// A resort entry of the streams file.
///
/// Unknown keys (weather coordinates, page metadata) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResortRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    /// `false` disables capturing for the whole resort
    pub fetch: Option<Value>,
    /// Kept raw until the resort is known to be enabled, disabled resorts
    /// may carry anything here
    pub links: Option<Value>,
}

impl ResortRecord {
    /// Only an explicit boolean `false` disables a resort.
    pub fn is_disabled(&self) -> bool {
        matches!(self.fetch, Some(Value::Bool(false)))
    }

    /// Decodes the camera list. Absent or null links mean no cameras.
    pub fn camera_links(&self) -> Result<Vec<CameraLink>, serde_json::Error> {
        match &self.links {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(links) => Vec::<CameraLink>::deserialize(links),
        }
    }
}

/// A camera entry inside a resort.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CameraLink {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    /// Direct stream address (usually an HLS playlist), empty unless the
    /// catalog holds a string
    #[serde(deserialize_with = "string_or_empty")]
    pub video: String,
}

// Catalog files are hand-edited and scraped, ids show up as numbers and
// missing values as null.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

// `false`, `0` and friends are placeholders for "no stream", never addresses
fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        _ => String::new(),
    })
}
