//! Environment-driven selection of the active provider pair and credentials.
//!
//! Resolution is explicit: the bootstrap calls [`resolve`] once and passes the
//! resulting [`ResolvedConfig`] to whatever needs it. Nothing here caches or
//! mutates process state.

use std::collections::HashMap;
use std::fmt;

use crate::mapping::Mapping;
use crate::provider::Provider;

pub const SOURCE_API_VAR: &str = "SOURCE_API";
pub const TARGET_API_VAR: &str = "TARGET_API";
pub const PORT_VAR: &str = "PORT";
pub const DEFAULT_PORT: u16 = 3000;

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Empty values count as unset.
fn non_empty(env: &impl EnvSource, key: &str) -> Option<String> {
    env.var(key).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    #[error("SOURCE_API and TARGET_API environment variables are required")]
    MissingSelectors,
    #[error(
        "{selector} environment variable must be one of: {} (found '{value}')",
        Provider::valid_values()
    )]
    InvalidProvider {
        selector: &'static str,
        value: String,
    },
    #[error("{var} environment variable is required for target API {provider}")]
    MissingCredential { provider: Provider, var: String },
    #[error("{var} environment variable is required for target API {provider}")]
    MissingBaseUrl { provider: Provider, var: String },
    #[error("PORT environment variable must be an integer between 0 and 65535 (found '{value}')")]
    InvalidPort { value: String },
}

/// Active source/target pair, listen port and outbound credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub source_api: Provider,
    pub target_api: Provider,
    pub port: u16,
    pub target_api_key: Option<String>,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("source_api", &self.source_api)
            .field("target_api", &self.target_api)
            .field("port", &self.port)
            .field("target_api_key", &self.target_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolve against the process environment.
pub fn resolve() -> Result<ResolvedConfig, EnvError> {
    resolve_from(&ProcessEnv)
}

pub fn resolve_from(env: &impl EnvSource) -> Result<ResolvedConfig, EnvError> {
    let (Some(source), Some(target)) = (
        non_empty(env, SOURCE_API_VAR),
        non_empty(env, TARGET_API_VAR),
    ) else {
        return Err(EnvError::MissingSelectors);
    };
    let source_api = parse_selector(SOURCE_API_VAR, source)?;
    let target_api = parse_selector(TARGET_API_VAR, target)?;

    let target_api_key = non_empty(env, target_api.api_key_var());
    if target_api_key.is_none() && target_api.requires_api_key() {
        return Err(EnvError::MissingCredential {
            provider: target_api,
            var: target_api.api_key_var().to_string(),
        });
    }

    let port = match non_empty(env, PORT_VAR) {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| EnvError::InvalidPort { value: raw })?,
        None => DEFAULT_PORT,
    };

    tracing::debug!(
        "resolved environment: {} -> {} on port {} (credential {})",
        source_api,
        target_api,
        port,
        if target_api_key.is_some() { "set" } else { "not set" }
    );
    Ok(ResolvedConfig {
        source_api,
        target_api,
        port,
        target_api_key,
    })
}

fn parse_selector(selector: &'static str, value: String) -> Result<Provider, EnvError> {
    value
        .parse()
        .map_err(|_| EnvError::InvalidProvider { selector, value })
}

/// Outbound base URL and credential for one mapping.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Look up the variables a mapping names. A mapping without a key variable
/// falls back to its target's fixed credential variable when the target is
/// not credential-exempt.
pub fn resolve_endpoint(mapping: &Mapping, env: &impl EnvSource) -> Result<Endpoint, EnvError> {
    let provider = mapping.target_api;
    let base_url = non_empty(env, &mapping.target_base_url_env_var).ok_or_else(|| {
        EnvError::MissingBaseUrl {
            provider,
            var: mapping.target_base_url_env_var.clone(),
        }
    })?;

    let key_var = match mapping.target_api_key_env_var.as_deref() {
        Some(var) if !var.is_empty() => Some(var),
        _ if provider.requires_api_key() => Some(provider.api_key_var()),
        _ => None,
    };
    let api_key = match key_var {
        Some(var) => match non_empty(env, var) {
            Some(key) => Some(key),
            None if provider.requires_api_key() => {
                return Err(EnvError::MissingCredential {
                    provider,
                    var: var.to_string(),
                });
            }
            None => None,
        },
        None => None,
    };

    Ok(Endpoint { base_url, api_key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Transform;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn both_selectors_required() {
        assert_eq!(resolve_from(&env(&[])), Err(EnvError::MissingSelectors));
        assert_eq!(
            resolve_from(&env(&[("SOURCE_API", "OPENAI")])),
            Err(EnvError::MissingSelectors)
        );
        assert_eq!(
            resolve_from(&env(&[("SOURCE_API", ""), ("TARGET_API", "OLLAMA")])),
            Err(EnvError::MissingSelectors)
        );
    }

    #[test]
    fn rejects_unknown_source_provider() {
        let err = resolve_from(&env(&[
            ("SOURCE_API", "INVALID_API"),
            ("TARGET_API", "OPENAI"),
            ("OPENAI_API_KEY", "test-openai-key"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            EnvError::InvalidProvider {
                selector: "SOURCE_API",
                ..
            }
        ));
        assert!(err
            .to_string()
            .starts_with("SOURCE_API environment variable must be one of: OPENAI, GEMINI, OLLAMA, QWEN"));
    }

    #[test]
    fn rejects_unknown_target_provider() {
        let err = resolve_from(&env(&[
            ("SOURCE_API", "OPENAI"),
            ("TARGET_API", "INVALID_API"),
            ("OPENAI_API_KEY", "test-openai-key"),
        ]))
        .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("TARGET_API environment variable must be one of: "));
    }

    #[test]
    fn non_exempt_target_needs_credential() {
        for target in ["OPENAI", "GEMINI", "QWEN"] {
            let err = resolve_from(&env(&[
                ("SOURCE_API", "OPENAI"),
                ("TARGET_API", target),
                ("PORT", "4000"),
            ]))
            .unwrap_err();
            let provider: Provider = target.parse().unwrap();
            assert_eq!(
                err,
                EnvError::MissingCredential {
                    provider,
                    var: provider.api_key_var().to_string(),
                }
            );
            assert!(err.to_string().ends_with(&format!("target API {target}")));
        }
    }

    #[test]
    fn resolves_credential_of_the_target_only() {
        let cfg = resolve_from(&env(&[
            ("SOURCE_API", "OPENAI"),
            ("TARGET_API", "GEMINI"),
            ("GEMINI_API_KEY", "test-gemini-key"),
            ("OPENAI_API_KEY", "test-openai-key"),
            ("PORT", "4000"),
        ]))
        .unwrap();
        assert_eq!(cfg.source_api, Provider::Openai);
        assert_eq!(cfg.target_api, Provider::Gemini);
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.target_api_key.as_deref(), Some("test-gemini-key"));
    }

    #[test]
    fn ollama_target_needs_no_credential() {
        let cfg = resolve_from(&env(&[("SOURCE_API", "OPENAI"), ("TARGET_API", "OLLAMA")])).unwrap();
        assert_eq!(cfg.target_api, Provider::Ollama);
        assert_eq!(cfg.target_api_key, None);
        assert_eq!(cfg.port, DEFAULT_PORT);

        let cfg = resolve_from(&env(&[
            ("SOURCE_API", "OPENAI"),
            ("TARGET_API", "OLLAMA"),
            ("OLLAMA_API_KEY", "local"),
        ]))
        .unwrap();
        assert_eq!(cfg.target_api_key.as_deref(), Some("local"));
    }

    #[test]
    fn port_parsing() {
        let base = [("SOURCE_API", "OPENAI"), ("TARGET_API", "OLLAMA")];
        let with_port = |p: &str| {
            let mut e = env(&base);
            e.insert("PORT".into(), p.into());
            resolve_from(&e)
        };
        assert_eq!(with_port("8080").unwrap().port, 8080);
        assert_eq!(with_port("").unwrap().port, 3000);
        assert_eq!(
            with_port("eighty"),
            Err(EnvError::InvalidPort {
                value: "eighty".into()
            })
        );
        assert!(matches!(with_port("70000"), Err(EnvError::InvalidPort { .. })));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let cfg = ResolvedConfig {
            source_api: Provider::Openai,
            target_api: Provider::Qwen,
            port: 3000,
            target_api_key: Some("sk-secret".into()),
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    fn mapping(target: Provider, key_var: Option<&str>) -> Mapping {
        let (request_transform, response_transform) = match target {
            Provider::Ollama => (Transform::OpenaiToOllamaChat, Transform::OllamaToOpenaiChat),
            _ => (Transform::OpenaiToGeminiChat, Transform::GeminiToOpenaiChat),
        };
        Mapping {
            source_api: Provider::Openai,
            target_api: target,
            proxy_path_prefix: "/v1/chat/completions".into(),
            target_base_url_env_var: target.base_url_var().into(),
            target_api_key_env_var: key_var.map(str::to_string),
            request_transform,
            response_transform,
        }
    }

    #[test]
    fn endpoint_reads_the_named_variables() {
        let m = mapping(Provider::Gemini, Some("MY_GEMINI_KEY"));
        let ep = resolve_endpoint(
            &m,
            &env(&[
                ("GEMINI_API_BASE_URL", "https://gemini.example"),
                ("MY_GEMINI_KEY", "k1"),
                ("GEMINI_API_KEY", "k2"),
            ]),
        )
        .unwrap();
        assert_eq!(ep.base_url, "https://gemini.example");
        assert_eq!(ep.api_key.as_deref(), Some("k1"));
    }

    #[test]
    fn endpoint_requires_base_url_and_credential() {
        let m = mapping(Provider::Gemini, Some("GEMINI_API_KEY"));
        assert_eq!(
            resolve_endpoint(&m, &env(&[("GEMINI_API_KEY", "k")])),
            Err(EnvError::MissingBaseUrl {
                provider: Provider::Gemini,
                var: "GEMINI_API_BASE_URL".into()
            })
        );
        assert_eq!(
            resolve_endpoint(&m, &env(&[("GEMINI_API_BASE_URL", "https://g")])),
            Err(EnvError::MissingCredential {
                provider: Provider::Gemini,
                var: "GEMINI_API_KEY".into()
            })
        );
    }

    #[test]
    fn endpoint_without_key_var_uses_provider_default_unless_exempt() {
        let m = mapping(Provider::Gemini, None);
        let ep = resolve_endpoint(
            &m,
            &env(&[("GEMINI_API_BASE_URL", "https://g"), ("GEMINI_API_KEY", "k")]),
        )
        .unwrap();
        assert_eq!(ep.api_key.as_deref(), Some("k"));

        let m = mapping(Provider::Ollama, None);
        let ep = resolve_endpoint(&m, &env(&[("OLLAMA_API_BASE_URL", "http://localhost:11434")]))
            .unwrap();
        assert_eq!(ep.api_key, None);
    }
}
