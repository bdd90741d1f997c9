//! Envelope - the fixed-shape record every tool call returns.
//!
//! Two shapes, discriminated by `success`:
//! - [`SuccessEnvelope`]: `success`, `query`, optional `data`
//! - [`ErrorEnvelope`]: `success`, `query`, `error`, optional `func_name`
//!
//! Both tolerate extra caller-supplied fields which are merged into the
//! serialized output. Unset optional fields (and JSON `null`s) are omitted
//! entirely; `false` and `0` are kept.
//!
//! ```text
//! build_success("weather today", Some(json!([{"title": "A"}])))
//!   → {"success": true, "query": "weather today", "data": [{"title": "A"}]}
//!
//! build_error("bad query", &err, Some("search_web"))
//!   → {"success": false, "query": "bad query", "error": "timeout", "func_name": "search_web"}
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field names owned by the envelope shapes; extras may not shadow them.
const RESERVED_FIELDS: [&str; 5] = ["success", "query", "data", "error", "func_name"];

/// Query reported by the HTTP health route.
pub const HEALTH_CHECK_QUERY: &str = "MCP Server Health Check";

/// Successful tool outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    success: bool,

    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Failed tool outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    success: bool,

    pub query: String,

    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_name: Option<String>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Build a success envelope. Never inspects `data`.
pub fn build_success(query: impl Into<String>, data: Option<Value>) -> SuccessEnvelope {
    SuccessEnvelope {
        success: true,
        query: query.into(),
        data: data.filter(|v| !v.is_null()),
        extra: Map::new(),
    }
}

/// Build an error envelope from any displayable fault.
///
/// Only the fault's message text is kept; logging the fault itself is the
/// middleware's job.
pub fn build_error(
    query: impl Into<String>,
    error: &(impl fmt::Display + ?Sized),
    func_name: Option<&str>,
) -> ErrorEnvelope {
    ErrorEnvelope {
        success: false,
        query: query.into(),
        error: error.to_string(),
        func_name: func_name.map(str::to_string),
        extra: Map::new(),
    }
}

/// Insert an extra field unless it is reserved or null.
fn merge_extra(extra: &mut Map<String, Value>, key: String, value: Value) {
    if value.is_null() || RESERVED_FIELDS.contains(&key.as_str()) {
        return;
    }
    extra.insert(key, value);
}

impl SuccessEnvelope {
    /// Attach an extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        merge_extra(&mut self.extra, key.into(), value.into());
        self
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl ErrorEnvelope {
    /// Attach an extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        merge_extra(&mut self.extra, key.into(), value.into());
        self
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Either envelope shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success(SuccessEnvelope),
    Error(ErrorEnvelope),
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn query(&self) -> &str {
        match self {
            Envelope::Success(env) => &env.query,
            Envelope::Error(env) => &env.query,
        }
    }

    /// Serialize into a JSON value.
    pub fn to_value(&self) -> crate::types::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<SuccessEnvelope> for Envelope {
    fn from(env: SuccessEnvelope) -> Self {
        Envelope::Success(env)
    }
}

impl From<ErrorEnvelope> for Envelope {
    fn from(env: ErrorEnvelope) -> Self {
        Envelope::Error(env)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value.get("success").and_then(Value::as_bool) {
            Some(true) => {
                let mut env: SuccessEnvelope =
                    serde_json::from_value(value).map_err(D::Error::custom)?;
                scrub_extra(&mut env.extra);
                Ok(Envelope::Success(env))
            }
            Some(false) => {
                let mut env: ErrorEnvelope =
                    serde_json::from_value(value).map_err(D::Error::custom)?;
                scrub_extra(&mut env.extra);
                Ok(Envelope::Error(env))
            }
            None => Err(D::Error::missing_field("success")),
        }
    }
}

/// Drop decoded extras that name a fixed field or carry `null`.
fn scrub_extra(extra: &mut Map<String, Value>) {
    extra.retain(|key, value| !RESERVED_FIELDS.contains(&key.as_str()) && !value.is_null());
}
