use serde::{Deserialize, Serialize};
use std::fmt;

/// What a schedule tells a device to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    On,
    Off,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::On => "ON",
            Action::Off => "OFF",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    /// Exact match only: the wire format has always been upper-case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Action::On),
            "OFF" => Ok(Action::Off),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// The authenticated caller. Resource ownership is keyed on the email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner(pub String);

impl Owner {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
