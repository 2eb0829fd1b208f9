//! Response types for the broker protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A response from the broker.
///
/// An empty (or absent) error message means the bind succeeded and the
/// listening socket is attached as ancillary data. Only a JSON object is a
/// response; arrays and scalars fail to decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct BindResponse {
    /// Error details. Present with an empty message on success.
    pub error: Option<RpcError>,
}

/// Error details in a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct RpcError {
    /// Human-readable error message, opaque to the client.
    pub message: String,
}

impl TryFrom<Map<String, Value>> for BindResponse {
    type Error = serde_json::Error;

    fn try_from(object: Map<String, Value>) -> Result<Self, Self::Error> {
        let error = match object.get("error") {
            None | Some(Value::Null) => None,
            Some(value) => Some(RpcError::deserialize(value)?),
        };
        Ok(Self { error })
    }
}

impl TryFrom<Map<String, Value>> for RpcError {
    type Error = serde_json::Error;

    fn try_from(object: Map<String, Value>) -> Result<Self, Self::Error> {
        let message = match object.get("message") {
            None | Some(Value::Null) => String::new(),
            Some(value) => String::deserialize(value)?,
        };
        Ok(Self { message })
    }
}

impl BindResponse {
    /// Create a success response.
    pub fn success() -> Self {
        Self {
            error: Some(RpcError::default()),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(RpcError {
                message: message.into(),
            }),
        }
    }

    /// The broker-reported failure, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response: BindResponse = serde_json::from_str(r#"{"error":{"message":""}}"#).unwrap();
        assert!(response.error_message().is_none());
    }

    #[test]
    fn test_missing_error_is_success() {
        let response: BindResponse = serde_json::from_str("{}").unwrap();
        assert!(response.error_message().is_none());

        let response: BindResponse = serde_json::from_str(r#"{"error":{}}"#).unwrap();
        assert!(response.error_message().is_none());

        let response: BindResponse = serde_json::from_str(r#"{"error":null}"#).unwrap();
        assert!(response.error_message().is_none());
    }

    #[test]
    fn test_error_response() {
        let response: BindResponse =
            serde_json::from_str(r#"{"error":{"message":"port in use"}}"#).unwrap();
        assert_eq!(response.error_message(), Some("port in use"));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let response: BindResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"abc","error":{"code":-1,"message":""}}"#,
        )
        .unwrap();
        assert!(response.error_message().is_none());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(serde_json::from_str::<BindResponse>("[]").is_err());
        assert!(serde_json::from_str::<BindResponse>("[{}]").is_err());
        assert!(serde_json::from_str::<BindResponse>("null").is_err());
        assert!(serde_json::from_str::<BindResponse>("42").is_err());
        assert!(serde_json::from_str::<BindResponse>("").is_err());
    }

    #[test]
    fn test_malformed_error_is_rejected() {
        assert!(serde_json::from_str::<BindResponse>(r#"{"error":[]}"#).is_err());
        assert!(serde_json::from_str::<BindResponse>(r#"{"error":"denied"}"#).is_err());
        assert!(serde_json::from_str::<BindResponse>(r#"{"error":{"message":7}}"#).is_err());
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&BindResponse::success()).unwrap();
        assert_eq!(json, r#"{"error":{"message":""}}"#);

        let json = serde_json::to_string(&BindResponse::error("denied")).unwrap();
        assert_eq!(json, r#"{"error":{"message":"denied"}}"#);
    }
}
