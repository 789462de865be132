//! Commands delivered by the host to the controller.

use crate::callback::ResultCallback;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Action name for starting a session
pub const ACTION_START: &str = "Start";
/// Action name for stopping a session
pub const ACTION_STOP: &str = "Stop";
/// Extras key for the guardian endpoint
pub const EXTRA_GUARDIAN: &str = "guardian";
/// Extras key for the VeilNet token
pub const EXTRA_TOKEN: &str = "token";

/// Credentials for a new session. Either may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StartRequest {
    pub guardian: Option<String>,
    pub token: Option<String>,
}

impl StartRequest {
    pub fn new(guardian: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            guardian: Some(guardian.into()),
            token: Some(token.into()),
        }
    }

    /// Both credentials, if present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let guardian = self.guardian.as_deref().filter(|s| !s.is_empty())?;
        let token = self.token.as_deref().filter(|s| !s.is_empty())?;
        Some((guardian, token))
    }
}

impl fmt::Debug for StartRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Token stays out of logs
        f.debug_struct("StartRequest")
            .field("guardian", &self.guardian)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Raw message from the host: an action name plus string extras
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HostIntent {
    pub action: Option<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl HostIntent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Decode from JSON, e.g. `{"action":"Start","extras":{"guardian":"..."}}`
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

/// Commands processed by the controller
#[derive(Debug)]
pub enum Command {
    /// Start a session
    Start {
        request: StartRequest,
        callback: Option<ResultCallback>,
    },
    /// Stop the running session
    Stop { callback: Option<ResultCallback> },
    /// The OS revoked the VPN permission
    Revoke,
    /// The host process is going away
    Destroy,
    /// An intent with an unknown action
    Unrecognized {
        action: String,
        callback: Option<ResultCallback>,
    },
    /// The host delivered no intent at all
    Ignored,
}

impl Command {
    /// Decode a host intent. Missing intents are ignored.
    pub fn from_intent(intent: Option<HostIntent>, callback: Option<ResultCallback>) -> Self {
        let Some(intent) = intent else {
            if let Some(callback) = callback {
                callback.discard();
            }
            return Command::Ignored;
        };

        match intent.action.as_deref() {
            Some(ACTION_START) => Command::Start {
                request: StartRequest {
                    guardian: intent.extra(EXTRA_GUARDIAN).map(str::to_string),
                    token: intent.extra(EXTRA_TOKEN).map(str::to_string),
                },
                callback,
            },
            Some(ACTION_STOP) => Command::Stop { callback },
            other => Command::Unrecognized {
                action: other.unwrap_or_default().to_string(),
                callback,
            },
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::Stop { .. } => "stop",
            Command::Revoke => "revoke",
            Command::Destroy => "destroy",
            Command::Unrecognized { .. } => "unrecognized",
            Command::Ignored => "ignored",
        }
    }
}

/// What the host should do with its process after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDirective {
    /// Keep the service resident (restart if killed)
    KeepResident,
    /// Stop the service now
    Terminate,
}

impl HostDirective {
    pub fn keeps_resident(&self) -> bool {
        matches!(self, HostDirective::KeepResident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        let request = StartRequest::new("https://guardian.example", "tok123");
        assert_eq!(
            request.credentials(),
            Some(("https://guardian.example", "tok123"))
        );

        let missing_token = StartRequest {
            guardian: Some("https://guardian.example".into()),
            token: None,
        };
        assert!(missing_token.credentials().is_none());

        let empty_guardian = StartRequest::new("", "tok123");
        assert!(empty_guardian.credentials().is_none());
    }

    #[test]
    fn test_token_redacted_in_debug() {
        let request = StartRequest::new("https://guardian.example", "tok123");
        let debug = format!("{:?}", request);
        assert!(!debug.contains("tok123"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_start_intent() {
        let intent = HostIntent::new("Start")
            .with_extra("guardian", "https://guardian.example")
            .with_extra("token", "tok123");

        match Command::from_intent(Some(intent), None) {
            Command::Start { request, callback } => {
                assert_eq!(request, StartRequest::new("https://guardian.example", "tok123"));
                assert!(callback.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_stop_and_unknown_intents() {
        let stop = Command::from_intent(Some(HostIntent::new("Stop")), None);
        assert_eq!(stop.name(), "stop");

        let unknown = Command::from_intent(Some(HostIntent::new("Restart")), None);
        assert!(matches!(unknown, Command::Unrecognized { ref action, .. } if action == "Restart"));

        let no_action = Command::from_intent(Some(HostIntent::default()), None);
        assert!(matches!(no_action, Command::Unrecognized { .. }));
    }

    #[test]
    fn test_missing_intent_is_ignored() {
        assert!(matches!(Command::from_intent(None, None), Command::Ignored));
    }

    #[test]
    fn test_intent_from_json() {
        let intent = HostIntent::from_json(
            r#"{"action":"Start","extras":{"guardian":"https://guardian.example"}}"#,
        )
        .unwrap();

        assert_eq!(intent.action.as_deref(), Some("Start"));
        assert_eq!(intent.extra("guardian"), Some("https://guardian.example"));
        assert_eq!(intent.extra("token"), None);

        let bare = HostIntent::from_json(r#"{"action":"Stop"}"#).unwrap();
        assert!(bare.extras.is_empty());
    }
}
