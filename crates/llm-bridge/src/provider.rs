//! API providers recognized by the proxy.
//!
//! The set is closed: provider-specific environment variable names and the
//! credential exemption below are part of the code, not of any config file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wire format of an LLM vendor API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Openai,
    Gemini,
    Ollama,
    Qwen,
}

impl Provider {
    /// Every provider, in declaration order.
    pub const ALL: [Provider; 4] = [
        Provider::Openai,
        Provider::Gemini,
        Provider::Ollama,
        Provider::Qwen,
    ];

    /// Stable identity used in config files and selector variables.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Openai => "OPENAI",
            Provider::Gemini => "GEMINI",
            Provider::Ollama => "OLLAMA",
            Provider::Qwen => "QWEN",
        }
    }

    /// Environment variable holding the outbound credential for this provider.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::Openai => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Ollama => "OLLAMA_API_KEY",
            Provider::Qwen => "QWEN_API_KEY",
        }
    }

    /// Environment variable holding the outbound base URL for this provider.
    pub fn base_url_var(self) -> &'static str {
        match self {
            Provider::Openai => "OPENAI_API_BASE_URL",
            Provider::Gemini => "GEMINI_API_BASE_URL",
            Provider::Ollama => "OLLAMA_API_BASE_URL",
            Provider::Qwen => "QWEN_API_BASE_URL",
        }
    }

    /// Local Ollama deployments are unauthenticated.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Provider::Ollama)
    }

    /// Comma-separated list of valid identities, for error messages.
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of [`Provider::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_identities_only() {
        for p in Provider::ALL {
            assert_eq!(p.as_str().parse::<Provider>(), Ok(p));
        }
        assert!("openai".parse::<Provider>().is_err());
        assert!("ANTHROPIC".parse::<Provider>().is_err());
    }

    #[test]
    fn only_ollama_is_credential_exempt() {
        let exempt: Vec<_> = Provider::ALL
            .into_iter()
            .filter(|p| !p.requires_api_key())
            .collect();
        assert_eq!(exempt, vec![Provider::Ollama]);
    }

    #[test]
    fn valid_values_lists_all_in_order() {
        assert_eq!(Provider::valid_values(), "OPENAI, GEMINI, OLLAMA, QWEN");
    }

    #[test]
    fn serde_uses_identity_strings() {
        let v = serde_json::to_value(Provider::Gemini).unwrap();
        assert_eq!(v, serde_json::json!("GEMINI"));
        let p: Provider = serde_json::from_value(serde_json::json!("QWEN")).unwrap();
        assert_eq!(p, Provider::Qwen);
    }
}
