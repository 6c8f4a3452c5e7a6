use crate::error::AggregationError;

/// Credentials for one aggregation cycle, passed explicitly into the engine.
#[derive(Clone)]
pub struct AuthContext {
    token: String,
    user_id: Option<String>,
}

impl AuthContext {
    pub fn new(token: impl Into<String>) -> Result<Self, AggregationError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AggregationError::AuthFailure);
        }
        Ok(Self {
            token,
            user_id: None,
        })
    }

    pub fn from_optional(token: Option<String>) -> Result<Self, AggregationError> {
        token.map_or(Err(AggregationError::AuthFailure), Self::new)
    }

    /// Attaches the application-side user id the session belongs to.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_auth_failure() {
        assert_eq!(AuthContext::new("  ").unwrap_err(), AggregationError::AuthFailure);
        assert_eq!(
            AuthContext::from_optional(None).unwrap_err(),
            AggregationError::AuthFailure
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = AuthContext::new("gho_secret").unwrap().with_user_id("u-1");
        assert_eq!(auth.token(), "gho_secret");
        assert!(!format!("{:?}", auth).contains("gho_secret"));
    }
}
