//! Action protocol spoken between the client and the store worker.
//!
//! On the wire a request is `{ "id", "action", "payload" }` and a response is
//! either `{ "id", "result" }` or `{ "id", "error" }`. Inside the process the
//! same messages travel as typed [`Request`] / [`Response`] values.

use crate::item::{ClipboardItem, HistoryFilter};
use crate::processor::CommandError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation id pairing a request with its response
pub type RequestId = u64;

/// Limit used by `getRecentItems` when the caller gives none
pub const DEFAULT_RECENT_LIMIT: u32 = 50;

fn default_recent_limit() -> u32 {
    DEFAULT_RECENT_LIMIT
}

/// One variant per supported action, each with its typed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum Command {
    SaveClipboardItem(ClipboardItem),
    GetClipboardHistory(HistoryFilter),
    IsDuplicateClipboardItem { content: String },
    GetRecentItems {
        #[serde(default = "default_recent_limit")]
        limit: u32,
    },
}

impl Command {
    /// Action names accepted by [`Command::decode`]
    pub const ACTIONS: &'static [&'static str] = &[
        "saveClipboardItem",
        "getClipboardHistory",
        "isDuplicateClipboardItem",
        "getRecentItems",
    ];

    pub fn action(&self) -> &'static str {
        match self {
            Command::SaveClipboardItem(_) => "saveClipboardItem",
            Command::GetClipboardHistory(_) => "getClipboardHistory",
            Command::IsDuplicateClipboardItem { .. } => "isDuplicateClipboardItem",
            Command::GetRecentItems { .. } => "getRecentItems",
        }
    }

    /// Build a command from an untyped action name and payload
    pub fn decode(action: &str, payload: Value) -> Result<Self, CommandError> {
        if !Self::ACTIONS.contains(&action) {
            return Err(CommandError::UnknownAction(action.to_string()));
        }
        // A missing payload means "no arguments", e.g. unfiltered history
        let payload = if payload.is_null() {
            Value::Object(Default::default())
        } else {
            payload
        };
        let tagged = serde_json::json!({ "action": action, "payload": payload });
        serde_json::from_value(tagged).map_err(CommandError::MalformedPayload)
    }
}

/// Untyped request as it arrives from outside the process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRequest {
    pub id: RequestId,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "RawRequest")]
pub struct Request {
    pub id: RequestId,
    pub command: Command,
}

impl From<Request> for RawRequest {
    fn from(request: Request) -> Self {
        let action = request.command.action().to_string();
        let payload = serde_json::to_value(&request.command)
            .ok()
            .and_then(|mut tagged| tagged.get_mut("payload").map(Value::take))
            .unwrap_or(Value::Null);
        Self {
            id: request.id,
            action,
            payload,
        }
    }
}

impl TryFrom<RawRequest> for Request {
    type Error = CommandError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            command: Command::decode(&raw.action, raw.payload)?,
        })
    }
}

/// Successful result of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Id assigned to a saved item
    Saved(i64),
    Duplicate(bool),
    Items(Vec<ClipboardItem>),
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Saved(_) => "saved",
            Reply::Duplicate(_) => "duplicate",
            Reply::Items(_) => "items",
        }
    }
}

/// Response to exactly one request; carries either a result or an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub struct Response {
    pub id: RequestId,
    pub outcome: Result<Reply, String>,
}

impl Response {
    pub fn ok(id: RequestId, reply: Reply) -> Self {
        Self {
            id,
            outcome: Ok(reply),
        }
    }

    pub fn error(id: RequestId, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Err(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Reply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        let (result, error) = match response.outcome {
            Ok(reply) => (Some(reply), None),
            Err(message) => (None, Some(message)),
        };
        Self {
            id: response.id,
            result,
            error,
        }
    }
}

impl TryFrom<WireResponse> for Response {
    type Error = String;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        let outcome = match (wire.result, wire.error) {
            (Some(reply), None) => Ok(reply),
            (None, Some(message)) => Err(message),
            _ => {
                return Err(format!(
                    "response {} must carry exactly one of result or error",
                    wire.id
                ))
            }
        };
        Ok(Self {
            id: wire.id,
            outcome,
        })
    }
}
