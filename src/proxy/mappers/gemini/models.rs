use serde::{Deserialize, Serialize};

use crate::proxy::common::error::ProxyError;

/// Body accepted on the relay route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundRequest {
    #[serde(default)]
    pub message: String,
}

impl InboundRequest {
    pub fn validate(&self) -> Result<&str, ProxyError> {
        if self.message.is_empty() {
            return Err(ProxyError::InvalidRequest("message is required".to_string()));
        }
        Ok(&self.message)
    }
}

/// `generateContent` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

impl GenerateContentRequest {
    /// Single content holding a single text part.
    pub fn from_message(message: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: message.to_string(),
                }],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let payload = GenerateContentRequest::from_message("What should I wear?");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "contents": [ { "parts": [ { "text": "What should I wear?" } ] } ] })
        );
    }

    #[test]
    fn test_missing_message_defaults_to_empty() {
        let req: InboundRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate() {
        let empty = InboundRequest { message: String::new() };
        assert!(matches!(empty.validate(), Err(ProxyError::InvalidRequest(_))));

        let ok = InboundRequest { message: "hi".into() };
        assert_eq!(ok.validate().unwrap(), "hi");
    }

    #[test]
    fn test_non_string_message_rejected_by_serde() {
        assert!(serde_json::from_str::<InboundRequest>(r#"{"message": 42}"#).is_err());
    }
}
