//! The closed set of scoring providers a user can select.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A provider selection. `Internal` is the default and means "score locally".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    #[serde(alias = "default")]
    Internal,
    #[serde(rename = "openai")]
    OpenAi,
    Mistral,
    #[serde(alias = "claude")]
    Anthropic,
    Gemini,
}

/// A provider that is reached over HTTP. Only these ever need a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteProvider {
    OpenAi,
    Mistral,
    Anthropic,
    Gemini,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider '{0}' (expected one of: internal, openai, mistral, anthropic, gemini)")]
pub struct UnknownProvider(pub String);

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Internal,
        Provider::OpenAi,
        Provider::Mistral,
        Provider::Anthropic,
        Provider::Gemini,
    ];

    /// Canonical identifier, as stored in the database and used in URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Internal => "internal",
            Provider::OpenAi => "openai",
            Provider::Mistral => "mistral",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
        }
    }

    pub fn remote(self) -> Option<RemoteProvider> {
        match self {
            Provider::Internal => None,
            Provider::OpenAi => Some(RemoteProvider::OpenAi),
            Provider::Mistral => Some(RemoteProvider::Mistral),
            Provider::Anthropic => Some(RemoteProvider::Anthropic),
            Provider::Gemini => Some(RemoteProvider::Gemini),
        }
    }
}

impl RemoteProvider {
    pub fn provider(self) -> Provider {
        match self {
            RemoteProvider::OpenAi => Provider::OpenAi,
            RemoteProvider::Mistral => Provider::Mistral,
            RemoteProvider::Anthropic => Provider::Anthropic,
            RemoteProvider::Gemini => Provider::Gemini,
        }
    }

    /// Human-readable name, used in generated explanations and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            RemoteProvider::OpenAi => "OpenAI",
            RemoteProvider::Mistral => "Mistral AI",
            RemoteProvider::Anthropic => "Anthropic Claude",
            RemoteProvider::Gemini => "Google Gemini",
        }
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" | "default" => Ok(Provider::Internal),
            "openai" => Ok(Provider::OpenAi),
            "mistral" => Ok(Provider::Mistral),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RemoteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider().as_str())
    }
}
