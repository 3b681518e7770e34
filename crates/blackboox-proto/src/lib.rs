#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Wire types for the service channel between the UI and host processes.
//!
//! The UI side sends a [`ServiceCall`] over the single `service:call` channel;
//! the host answers with a [`ServiceReply`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the one handler the host registers on its privileged bridge.
pub const SERVICE_CALL_CHANNEL: &str = "service:call";

/// Global the preload script exposes the restricted bridge under.
pub const BRIDGE_GLOBAL: &str = "__electron__blackboox__";

/// Error codes carried by failed replies.
pub mod codes {
    pub const SERVICE_NOT_FOUND: &str = "SERVICE_NOT_FOUND";
    pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
    pub const SERVICE_FAILED: &str = "SERVICE_FAILED";
    pub const CHANNEL_CLOSED: &str = "CHANNEL_CLOSED";
}

/// A proxied call: `(serviceName, methodName, ...args)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub service: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl ServiceCall {
    #[must_use]
    pub fn new(service: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            args,
        }
    }

    /// `service.method`, for logs and error messages.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }
}

/// The host's answer to one [`ServiceCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceReply {
    /// The method returned (or resolved to) a value.
    Ok { value: Value },
    /// The call was rejected.
    Err { code: String, message: String },
}

impl ServiceReply {
    #[must_use]
    pub fn ok(value: Value) -> Self {
        Self::Ok { value }
    }

    #[must_use]
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Err {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_name_is_stable() {
        assert_eq!(SERVICE_CALL_CHANNEL, "service:call");
    }

    #[test]
    fn test_reply_tagging() {
        let reply = ServiceReply::err(codes::SERVICE_NOT_FOUND, "Cannot find service named billing");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "err");
        assert_eq!(json["code"], "SERVICE_NOT_FOUND");

        let ok = ServiceReply::ok(json!({"token": "abc"}));
        assert!(ok.is_ok());
        assert_eq!(serde_json::to_value(&ok).unwrap()["type"], "ok");
    }

    #[test]
    fn test_call_args_default_to_empty() {
        let call: ServiceCall =
            serde_json::from_str(r#"{"service":"files","method":"list"}"#).unwrap();
        assert!(call.args.is_empty());
        assert_eq!(call.target(), "files.list");
    }
}
