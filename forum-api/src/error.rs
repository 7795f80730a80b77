use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not found")]
    NotFound,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Builds the error matching a non-successful response
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        if let Ok(err) = Error::parse(body) {
            return err;
        }
        match status {
            http::StatusCode::FORBIDDEN | http::StatusCode::UNAUTHORIZED => Error::PermissionDenied,
            http::StatusCode::NOT_FOUND => Error::NotFound,
            s => Error::Unknown(format!("server answered {s}")),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NotFound => json!({
                "message": "not found",
                "type": "not-found",
            }),
            Error::Network(msg) => json!({
                "message": msg,
                "type": "network",
            }),
            Error::InvalidResponse(msg) => json!({
                "message": msg,
                "type": "invalid-response",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "permission-denied" => Error::PermissionDenied,
                "not-found" => Error::NotFound,
                "network" => Error::Network(message()),
                "invalid-response" => Error::InvalidResponse(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
