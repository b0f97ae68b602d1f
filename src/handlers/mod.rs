//! Stateless request handlers
//!
//! Two small handlers in the shape of a serverless function: one returns a
//! random number, the other echoes a JSON request body. They never touch
//! pipeline state and receive their invocation context explicitly.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Request id reported for local invocations
pub const LOCAL_REQUEST_ID: &str = "local-test";

/// Invocation context of a handler
pub trait RequestContext: Send + Sync {
    /// Identifier of the current request
    fn request_id(&self) -> &str;
}

/// Context used when a handler is invoked from the command line
#[derive(Debug, Clone)]
pub struct LocalContext {
    request_id: String,
}

impl LocalContext {
    /// Context with a specific request id
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Default for LocalContext {
    fn default() -> Self {
        Self::with_request_id(LOCAL_REQUEST_ID)
    }
}

impl RequestContext for LocalContext {
    fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Response returned by a handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Response headers
    pub headers: BTreeMap<String, String>,

    /// JSON-encoded body
    pub body: String,
}

impl HandlerResponse {
    fn ok(body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        Self {
            status_code: 200,
            headers,
            body: body.to_string(),
        }
    }

    fn bad_request(body: Value) -> Self {
        Self {
            status_code: 400,
            headers: BTreeMap::new(),
            body: body.to_string(),
        }
    }

    /// Parse the body back into JSON
    ///
    /// # Errors
    ///
    /// Returns the parse error if the body is not valid JSON
    pub fn json_body(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// Return a random number between 1 and 1000 inclusive
pub fn random_number(ctx: &dyn RequestContext) -> HandlerResponse {
    let value: u32 = rand::thread_rng().gen_range(1..=1000);
    tracing::debug!(request_id = %ctx.request_id(), value, "Generated random number");

    HandlerResponse::ok(json!({
        "message": "Random number generated",
        "random_number": value,
        "request_id": ctx.request_id(),
    }))
}

/// Echo the `body` of an event
///
/// A string body is parsed as JSON, any other body is used as is and an
/// event without a body echoes `{}`. Unparseable JSON yields a 400 response.
pub fn echo(event: &Value, ctx: &dyn RequestContext) -> HandlerResponse {
    let received = match event.get("body") {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id(), error = %e, "Invalid JSON body");
                return HandlerResponse::bad_request(json!({
                    "error": "Invalid JSON in request body",
                    "details": e.to_string(),
                }));
            }
        },
        Some(other) => other.clone(),
        None => json!({}),
    };

    HandlerResponse::ok(json!({
        "message": "Data received and echoed back",
        "data_type": json_type_name(&received),
        "received_data": received,
        "request_id": ctx.request_id(),
    }))
}

/// Name of the JSON type of a value
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}
