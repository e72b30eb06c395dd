//! Registration marker protocol.
//!
//! The model multiplexes its conversational reply and a structured
//! registration instruction on one text channel. When the user has confirmed
//! their details, the reply carries a single line of the form
//!
//! ```text
//! ~~~REGISTER_PATIENT_JSON: {"firstName":"Ana", ...}~~~
//! ```
//!
//! The codec is permissive on boundaries (the trailing sentinel is optional)
//! and strict on content (the payload must be a JSON object).

use asika_config::{FieldSpec, RegistrationConfig};
use serde_json::{Map, Value};

/// A registration record in the external workflow's schema.
///
/// Backed by a sorted map, so serialization is byte-stable.
pub type PatientRecord = Map<String, Value>;

/// Raw payload text captured from one marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPayload {
    pub raw: String,
    /// 0-based index of the line that carried the marker.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    #[error("Registration payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Registration payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Result of scanning one assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerScan {
    /// No marker line with a payload.
    NotFound,
    /// Marker found and remapped into the external schema.
    Parsed {
        payload: MarkerPayload,
        record: PatientRecord,
    },
    /// Marker found but the payload could not be decoded.
    Invalid {
        payload: MarkerPayload,
        error: MarkerError,
    },
}

/// Detects, parses, and remaps registration markers.
#[derive(Debug, Clone)]
pub struct MarkerCodec {
    sentinel: String,
    trailing: Option<String>,
    fields: Vec<FieldSpec>,
    required: Vec<String>,
}

impl MarkerCodec {
    pub fn from_config(config: &RegistrationConfig) -> Self {
        let trailing = Some(config.trailing_sentinel.clone()).filter(|t| !t.is_empty());
        Self {
            sentinel: config.sentinel.clone(),
            trailing,
            fields: config.fields.clone(),
            required: config.required.clone(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Find the first line carrying the sentinel with a non-empty payload.
    pub fn detect(&self, reply: &str) -> Option<MarkerPayload> {
        reply.lines().enumerate().find_map(|(line, text)| {
            let (_, after) = text.split_once(self.sentinel.as_str())?;
            let payload = match &self.trailing {
                Some(trailing) => after.split_once(trailing.as_str()).map_or(after, |(p, _)| p),
                None => after,
            }
            .trim();

            (!payload.is_empty()).then(|| MarkerPayload {
                raw: payload.to_string(),
                line,
            })
        })
    }

    /// Strictly decode a payload into a JSON object.
    pub fn parse(&self, payload: &MarkerPayload) -> Result<Map<String, Value>, MarkerError> {
        let value: Value = serde_json::from_str(&payload.raw)
            .map_err(|e| MarkerError::InvalidJson(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(MarkerError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Build the external record: every configured field, first non-null
    /// alias wins, absent fields explicitly null.
    pub fn remap(&self, parsed: &Map<String, Value>) -> PatientRecord {
        self.fields
            .iter()
            .map(|field| {
                let value = field
                    .lookup_keys()
                    .into_iter()
                    .filter_map(|key| parsed.get(key))
                    .find(|value| !value.is_null())
                    .cloned()
                    .unwrap_or(Value::Null);
                (field.name.clone(), value)
            })
            .collect()
    }

    /// Required fields that are null or blank in `record`, in config order.
    pub fn missing_required(&self, record: &PatientRecord) -> Vec<String> {
        self.required
            .iter()
            .filter(|name| match record.get(name.as_str()) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .cloned()
            .collect()
    }

    /// Detect, parse, and remap in one pass.
    pub fn scan(&self, reply: &str) -> MarkerScan {
        let Some(payload) = self.detect(reply) else {
            return MarkerScan::NotFound;
        };
        match self.parse(&payload) {
            Ok(parsed) => MarkerScan::Parsed {
                record: self.remap(&parsed),
                payload,
            },
            Err(error) => MarkerScan::Invalid { payload, error },
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
