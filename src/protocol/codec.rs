use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::constants::tags;
use crate::error::DecodeError;

use super::types::{ClientRequest, Message};

/// Decode one raw text frame into a typed [`Message`].
///
/// Unknown tags are not an error; they come back as [`Message::Unknown`].
pub fn decode(raw: &str) -> Result<Message, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;
    let Value::Object(ref object) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    let message = match tag.as_str() {
        tags::WELCOME => Message::Welcome(payload(&tag, value)?),
        tags::SYSTEM_UPDATE => Message::SystemUpdate(Box::new(payload(&tag, value)?)),
        tags::ERROR => Message::Error(payload(&tag, value)?),
        tags::PONG => Message::Pong(payload(&tag, value)?),
        _ => Message::Unknown { tag, payload: value },
    };
    Ok(message)
}

fn payload<T: DeserializeOwned>(tag: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Schema {
        tag: tag.to_string(),
        source,
    })
}

pub fn encode_request(request: &ClientRequest) -> String {
    // A unit-variant enum with a string tag always serializes.
    serde_json::to_string(request).unwrap_or_else(|_| String::from("{}"))
}
