use serde::Serialize;

use super::GatewayError;

/// Generation method a model must support to be usable for triage.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Text-generation backend. One blocking call per prompt, no streaming.
pub trait LlmClient: Send + Sync {
    /// Generate a completion for `prompt` with the named model.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GatewayError>;

    /// Models visible to the configured credentials.
    fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError>;
}

/// One entry of the provider's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Bare identifier, without the `models/` prefix.
    pub name: String,
    pub display_name: Option<String>,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// Strip the `models/` resource prefix the API uses in listings.
pub fn bare_model_name(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_model_name_strips_prefix() {
        assert_eq!(bare_model_name("models/gemini-1.5-flash"), "gemini-1.5-flash");
        assert_eq!(bare_model_name("gemini-1.5-flash"), "gemini-1.5-flash");
    }

    #[test]
    fn supports_generation_checks_method_list() {
        let info = ModelInfo {
            name: "embedding-001".into(),
            display_name: None,
            supported_generation_methods: vec!["embedContent".into()],
        };
        assert!(!info.supports_generation());
    }
}
