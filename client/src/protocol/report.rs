use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// Body returned by the controller for every action: `{"relay": "...", "status": "on"|"off"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub relay: String,
    pub status: String,
}

impl RelayReport {
    /// Parses a flat JSON object whose values are all strings.
    pub fn parse(body: &[u8]) -> Result<Self, ReportError> {
        let mut fields: HashMap<String, String> = serde_json::from_slice(body)?;
        let relay = fields
            .remove("relay")
            .ok_or(ReportError::MissingField("relay"))?;
        let status = fields
            .remove("status")
            .ok_or(ReportError::MissingField("status"))?;
        Ok(Self { relay, status })
    }

    pub fn normalized_relay(&self) -> String {
        normalize(&self.relay)
    }

    pub fn normalized_status(&self) -> String {
        normalize(&self.status)
    }

    pub fn is_on(&self) -> bool {
        self.normalized_status() == "on"
    }

    /// True when the reported relay names the given switch, ignoring case and
    /// surrounding whitespace.
    pub fn matches(&self, switch_name: &str) -> bool {
        self.normalized_relay() == normalize(switch_name)
    }
}

pub(crate) fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
