//! Command envelopes exchanged over the queues and their wire codec.
//!
//! Commands are always published as base64-encoded JSON. Consumers accept
//! an ordered list of shapes ([`ACCEPTED_SHAPES`]) so that producers which
//! enqueue plain JSON text are still understood. Every rejected shape is
//! reported in the resulting error; nothing falls through silently.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::id::{ItemKey, JobId};
use crate::error::AppError;

/// Start command: expand the snapshot for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCommand {
    /// Job to expand.
    #[serde(alias = "processId")]
    pub job_id: JobId,
}

/// Work command: process one expanded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkCommand {
    /// Owning job.
    #[serde(alias = "processId")]
    pub job_id: JobId,
    /// Deterministic key derived from the record at expansion time. Older
    /// producers omit it; consumers then derive it from the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_key: Option<ItemKey>,
    /// The verbatim snapshot record.
    #[serde(alias = "station")]
    pub item: serde_json::Value,
}

/// A payload shape the decoder knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandShape {
    /// Base64 text wrapping UTF-8 JSON (what we publish).
    Base64Json,
    /// Plain JSON text.
    PlainJson,
}

impl fmt::Display for CommandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64Json => write!(f, "base64-json"),
            Self::PlainJson => write!(f, "plain-json"),
        }
    }
}

/// Shapes tried by [`decode_command`], in order.
pub const ACCEPTED_SHAPES: [CommandShape; 2] = [CommandShape::Base64Json, CommandShape::PlainJson];

impl CommandShape {
    fn decode<T: DeserializeOwned>(self, raw: &str) -> Result<T, String> {
        match self {
            Self::Base64Json => {
                let bytes = BASE64
                    .decode(raw.trim())
                    .map_err(|e| format!("not base64: {e}"))?;
                let text = String::from_utf8(bytes).map_err(|e| format!("not UTF-8: {e}"))?;
                serde_json::from_str(&text).map_err(|e| format!("invalid envelope: {e}"))
            }
            Self::PlainJson => {
                serde_json::from_str(raw.trim()).map_err(|e| format!("invalid envelope: {e}"))
            }
        }
    }
}

/// Encode a command for publishing: base64 of its JSON form.
pub fn encode_command<T: Serialize>(command: &T) -> Result<String, AppError> {
    let json = serde_json::to_vec(command)?;
    Ok(BASE64.encode(json))
}

/// Decode a command, trying every accepted shape in order.
///
/// Fails with `MalformedCommand` listing why each shape was rejected.
pub fn decode_command<T: DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    let mut rejections = Vec::with_capacity(ACCEPTED_SHAPES.len());
    for shape in ACCEPTED_SHAPES {
        match shape.decode(raw) {
            Ok(command) => return Ok(command),
            Err(reason) => rejections.push(format!("{shape}: {reason}")),
        }
    }
    Err(AppError::malformed_command(format!(
        "no accepted shape matched ({})",
        rejections.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_encoded_commands_decode() {
        let cmd = WorkCommand {
            job_id: JobId::parse("job-1").unwrap(),
            item_key: Some(ItemKey::parse("6260").unwrap()),
            item: json!({"stationid": 6260, "temperature": 4.2}),
        };
        let wire = encode_command(&cmd).unwrap();
        assert!(!wire.contains('{'));
        let decoded: WorkCommand = decode_command(&wire).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_plain_json_and_legacy_field_names_accepted() {
        let start: StartCommand = decode_command(r#"{"processId":"abc"}"#).unwrap();
        assert_eq!(start.job_id.as_str(), "abc");

        let work: WorkCommand = decode_command(
            r#"{"jobId":"abc","itemKey":"6260","station":{"stationid":6260}}"#,
        )
        .unwrap();
        assert_eq!(work.item["stationid"], 6260);
        assert_eq!(work.item_key.unwrap().as_str(), "6260");
    }

    #[test]
    fn test_work_command_without_item_key_decodes() {
        let work: WorkCommand =
            decode_command(r#"{"processId":"abc","station":{"stationid":6260}}"#).unwrap();
        assert_eq!(work.job_id.as_str(), "abc");
        assert!(work.item_key.is_none());
        assert_eq!(work.item["stationid"], 6260);

        let wire = encode_command(&work).unwrap();
        let json = String::from_utf8(BASE64.decode(wire).unwrap()).unwrap();
        assert!(!json.contains("itemKey"));
    }

    #[test]
    fn test_missing_fields_report_every_shape() {
        let wire = BASE64.encode(r#"{"jobId":"abc","itemKey":"1"}"#);
        let err = decode_command::<WorkCommand>(&wire).unwrap_err();
        assert!(err.is(ErrorKind::MalformedCommand));
        assert!(err.message.contains("base64-json"));
        assert!(err.message.contains("plain-json"));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = decode_command::<StartCommand>("%%% not a command").unwrap_err();
        assert!(err.is(ErrorKind::MalformedCommand));
    }

    #[test]
    fn test_invalid_job_id_is_malformed() {
        let err = decode_command::<StartCommand>(r#"{"jobId":"../../etc"}"#).unwrap_err();
        assert!(err.is(ErrorKind::MalformedCommand));
    }
}
