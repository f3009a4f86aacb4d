//! Registry of request/response transforms that mapping entries may name.
//!
//! The transform implementations live in the dispatch layer; this module only
//! fixes the set of names and the direction each one converts, so that a
//! mapping referring to a missing or misdirected transform is rejected at
//! load time.

use std::fmt;

use crate::provider::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    OpenaiToGeminiChat,
    GeminiToOpenaiChat,
    OpenaiToOllamaChat,
    OllamaToOpenaiChat,
    OpenaiToQwenChat,
    QwenToOpenaiChat,
    /// Forwards the body unchanged; only valid between identical formats.
    Passthrough,
}

impl Transform {
    pub const ALL: [Transform; 7] = [
        Transform::OpenaiToGeminiChat,
        Transform::GeminiToOpenaiChat,
        Transform::OpenaiToOllamaChat,
        Transform::OllamaToOpenaiChat,
        Transform::OpenaiToQwenChat,
        Transform::QwenToOpenaiChat,
        Transform::Passthrough,
    ];

    /// Name as written in mapping files.
    pub fn name(self) -> &'static str {
        match self {
            Transform::OpenaiToGeminiChat => "openaiToGeminiChat",
            Transform::GeminiToOpenaiChat => "geminiToOpenAIChat",
            Transform::OpenaiToOllamaChat => "openaiToOllamaChat",
            Transform::OllamaToOpenaiChat => "ollamaToOpenAIChat",
            Transform::OpenaiToQwenChat => "openaiToQwenChat",
            Transform::QwenToOpenaiChat => "qwenToOpenAIChat",
            Transform::Passthrough => "passthrough",
        }
    }

    pub fn from_name(name: &str) -> Option<Transform> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Whether this transform converts a body in `from` format into `to` format.
    pub fn converts(self, from: Provider, to: Provider) -> bool {
        use Provider::*;
        match self {
            Transform::OpenaiToGeminiChat => (from, to) == (Openai, Gemini),
            Transform::GeminiToOpenaiChat => (from, to) == (Gemini, Openai),
            Transform::OpenaiToOllamaChat => (from, to) == (Openai, Ollama),
            Transform::OllamaToOpenaiChat => (from, to) == (Ollama, Openai),
            Transform::OpenaiToQwenChat => (from, to) == (Openai, Qwen),
            Transform::QwenToOpenaiChat => (from, to) == (Qwen, Openai),
            Transform::Passthrough => from == to,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
