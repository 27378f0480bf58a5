use serde::Deserialize;
use serde_json::Value;

/// A message as returned by the server, kept as a plain JSON object
pub type Message = serde_json::Map<String, Value>;

/// Response body of `GET inboxes`
#[derive(Debug, Deserialize)]
pub struct InboxListResponse {
    pub inbox_list: Vec<String>,
}

/// Response body of `GET messages/{id}`
#[derive(Debug, Deserialize)]
pub struct MessageInfoResponse {
    pub message_info: Message,
}

/// Response body of `GET messages/`
#[derive(Debug, Deserialize)]
pub struct MessageListResponse {
    pub message_list: Vec<Message>,
}

/// Interpreted response of a dispatched request
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed JSON body
    Json(Value),
    /// Body bytes, returned when JSON parsing was not requested
    Raw(Vec<u8>),
    /// 204 No Content
    NoContent,
}

impl ApiResponse {
    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            ApiResponse::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}
