use aora_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials(#[source] BackendError),
    #[error("authentication request failed: {0}")]
    Backend(#[from] BackendError),
}

impl AuthError {
    pub(crate) fn from_sign_in(error: BackendError) -> Self {
        if error.is_unauthorized() || error.status() == Some(400) {
            AuthError::InvalidCredentials(error)
        } else {
            AuthError::Backend(error)
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("email, password and username are required")]
    MissingFields,
    #[error("account creation failed: {0}")]
    Account(#[source] BackendError),
    /// The account exists remotely but has no profile document.
    #[error("profile creation failed for account {account_id}: {source}")]
    Profile {
        account_id: String,
        #[source]
        source: BackendError,
    },
    #[error("sign-in after registration failed: {0}")]
    SignIn(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_credentials_are_classified() {
        let error = AuthError::from_sign_in(BackendError::remote(401, "user_invalid_credentials", "nope"));
        assert!(matches!(error, AuthError::InvalidCredentials(_)));

        let error = AuthError::from_sign_in(BackendError::remote(400, "general_argument_invalid", "bad email"));
        assert!(matches!(error, AuthError::InvalidCredentials(_)));

        let error = AuthError::from_sign_in(BackendError::remote(503, "general_unavailable", "down"));
        assert!(matches!(error, AuthError::Backend(_)));
    }

    #[test]
    fn profile_error_names_the_orphaned_account() {
        let error = RegistrationError::Profile {
            account_id: "acc-42".into(),
            source: BackendError::remote(500, "general_unknown", "boom"),
        };
        assert!(error.to_string().contains("acc-42"));
    }
}
