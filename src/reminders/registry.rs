use crate::types::push::SubscriptionRegistry;

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read subscriptions file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid subscriptions file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SubscriptionRegistry {
    /// Reads `[[subscription]]` tables from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, RegistryError> {
        let mut registry: SubscriptionRegistry = toml::from_str(contents)?;
        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|subscription| {
            !subscription.endpoint.trim().is_empty()
                && !subscription.p256dh.trim().is_empty()
                && !subscription.auth.trim().is_empty()
        });
        let skipped = before - registry.subscriptions.len();
        if skipped > 0 {
            tracing::warn!(skipped, "ignoring subscriptions with blank fields");
        }
        Ok(registry)
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn parse__should_read_subscription_tables() {
        // Given
        let contents = r#"
[[subscription]]
endpoint = "https://push.example/123"
p256dh = "p256"
auth = "auth"

[[subscription]]
endpoint = ""
p256dh = "p256"
auth = "auth"
"#;

        // When
        let registry = SubscriptionRegistry::parse(contents).expect("parse registry");

        // Then
        assert_eq!(registry.subscriptions.len(), 1);
        assert_eq!(registry.subscriptions[0].endpoint, "https://push.example/123");
    }

    #[test]
    fn parse__should_accept_an_empty_file() {
        // Then
        assert!(SubscriptionRegistry::parse("").expect("parse").is_empty());
    }

    #[test]
    fn parse__should_reject_malformed_tables() {
        // Then
        assert!(matches!(
            SubscriptionRegistry::parse("[[subscription]]\nendpoint = 3\n"),
            Err(RegistryError::Parse(_))
        ));
    }
}
