//! Model selection from a provider's advertised model list

/// Model used when discovery returns nothing usable
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Ordered model preference, most capable tier first
///
/// Each tier is matched as a substring against the available model
/// identifiers, so `gemini-1.5-pro` also picks `gemini-1.5-pro-002`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPreference {
    tiers: Vec<String>,
    default_model: String,
}

impl Default for ModelPreference {
    fn default() -> Self {
        Self::new(
            ["gemini-1.5-pro", "gemini-1.0-pro", "gemini-1.5-flash"],
            DEFAULT_MODEL,
        )
    }
}

impl ModelPreference {
    /// Create a preference list with a hardcoded default
    pub fn new<I, S>(tiers: I, default_model: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tiers: tiers.into_iter().map(Into::into).collect(),
            default_model: default_model.into(),
        }
    }

    /// Put `model` ahead of every existing tier
    pub fn prefer(mut self, model: impl Into<String>) -> Self {
        self.tiers.insert(0, model.into());
        self
    }

    /// Model used when nothing else can be resolved
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Pick a model from the available identifiers
    ///
    /// Tiers are tried in order; then the first available model; then the
    /// default.
    pub fn resolve(&self, available: &[String]) -> String {
        self.tiers
            .iter()
            .find_map(|tier| available.iter().find(|m| m.contains(tier.as_str())))
            .or_else(|| available.first())
            .cloned()
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Cheaper model to retry on after a rate limit
    ///
    /// This is the last tier present in `available`, or the default when the
    /// list does not contain one. `None` when it would be the same model.
    pub fn fallback_for(&self, current: &str, available: &[String]) -> Option<String> {
        let candidate = self
            .tiers
            .iter()
            .rev()
            .find_map(|tier| available.iter().find(|m| m.contains(tier.as_str())))
            .cloned()
            .unwrap_or_else(|| self.default_model.clone());

        (candidate != current).then_some(candidate)
    }
}
