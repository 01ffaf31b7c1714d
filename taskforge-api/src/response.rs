/// Success response envelope
///
/// Every successful response carries `{success: true, message?, data?}`,
/// mirroring the error envelope in [`crate::error`]. Handlers build these
/// with the helpers below and pair them with a status code.

use serde::Serialize;

/// JSON envelope for successful responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Data without a message (plain reads)
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Message plus data (mutations)
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Message only, no data payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_envelope() {
        let json = serde_json::to_value(ApiResponse::data(vec![1, 2, 3])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_message_envelope() {
        let json = serde_json::to_value(ApiResponse::message("Logged out successfully")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Logged out successfully");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_with_message_envelope() {
        let json =
            serde_json::to_value(ApiResponse::with_message("Task created successfully", 7)).unwrap();
        assert_eq!(json["message"], "Task created successfully");
        assert_eq!(json["data"], 7);
    }
}
