use crate::{ApiError, FailureKind};

/// Source of the one-off OAuth code that accompanies a new project.
#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorization_code(&self) -> Result<String, ApiError>;
}

/// Hands out a preconfigured code, or refuses when none is set.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    code: Option<String>,
}

impl StaticAuthorizer {
    pub fn new(code: Option<String>) -> Self {
        Self {
            code: code.filter(|c| !c.trim().is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorization_code(&self) -> Result<String, ApiError> {
        self.code
            .clone()
            .ok_or_else(|| ApiError::new(FailureKind::Unauthorized, "no authorization code configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_code_is_refused() {
        let auth = StaticAuthorizer::new(Some("  ".to_string()));
        let err = auth.authorization_code().await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Unauthorized);
    }

    #[tokio::test]
    async fn configured_code_is_returned() {
        let auth = StaticAuthorizer::new(Some("4/abc".to_string()));
        assert_eq!(auth.authorization_code().await.unwrap(), "4/abc");
    }
}
