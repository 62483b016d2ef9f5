use crate::domain::model::Credentials;
use crate::domain::ports::CredentialProvider;
use crate::utils::error::{MergeError, Result};

pub const USERNAME_ENV: &str = "MAIL_MERGE_USER";
pub const PASSWORD_ENV: &str = "MAIL_MERGE_PASSWORD";

const MAX_CREDENTIAL_LEN: usize = 128;

/// Reads the lookup credential pair from the environment at the moment it is
/// needed. Nothing is cached, so rotating the variables takes effect on the
/// next run.
pub struct EnvCredentialProvider {
    username_var: String,
    password_var: String,
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self {
            username_var: USERNAME_ENV.to_string(),
            password_var: PASSWORD_ENV.to_string(),
        }
    }

    #[cfg(test)]
    fn with_vars(username_var: &str, password_var: &str) -> Self {
        Self {
            username_var: username_var.to_string(),
            password_var: password_var.to_string(),
        }
    }

    fn read_var(&self, name: &str) -> Result<String> {
        let value = std::env::var(name).map_err(|_| MergeError::MissingConfigError {
            field: name.to_string(),
        })?;
        validate_credential_part(name, &value)?;
        Ok(value)
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn credentials(&self) -> Result<Credentials> {
        let username = self.read_var(&self.username_var)?;
        let password = self.read_var(&self.password_var)?;
        Ok(Credentials::new(username, password))
    }
}

/// Fixed credential pair, for callers that collected the values themselves.
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        validate_credential_part("username", &username)?;
        validate_credential_part("password", &password)?;
        Ok(Self {
            credentials: Credentials::new(username, password),
        })
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

fn validate_credential_part(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MergeError::InvalidConfigValueError {
            field: field.to_string(),
            value: String::new(),
            reason: "Credential value cannot be empty".to_string(),
        });
    }
    if value.chars().count() > MAX_CREDENTIAL_LEN {
        return Err(MergeError::InvalidConfigValueError {
            field: field.to_string(),
            value: String::new(),
            reason: format!("Credential value longer than {} characters", MAX_CREDENTIAL_LEN),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_provider_reads_both_vars() {
        std::env::set_var("TEST_MM_USER_A", "svc_user");
        std::env::set_var("TEST_MM_PASS_A", "secret");

        let provider = EnvCredentialProvider::with_vars("TEST_MM_USER_A", "TEST_MM_PASS_A");
        let creds = provider.credentials().unwrap();
        assert_eq!(creds.username, "svc_user");
        assert_eq!(creds.password, "secret");

        std::env::remove_var("TEST_MM_USER_A");
        std::env::remove_var("TEST_MM_PASS_A");
    }

    #[test]
    fn test_env_provider_missing_var_is_config_error() {
        let provider = EnvCredentialProvider::with_vars("TEST_MM_USER_B", "TEST_MM_PASS_B");
        let result = provider.credentials();
        assert!(matches!(
            result,
            Err(MergeError::MissingConfigError { field }) if field == "TEST_MM_USER_B"
        ));
    }

    #[test]
    fn test_env_provider_rejects_blank_value() {
        std::env::set_var("TEST_MM_USER_C", "   ");
        std::env::set_var("TEST_MM_PASS_C", "secret");

        let provider = EnvCredentialProvider::with_vars("TEST_MM_USER_C", "TEST_MM_PASS_C");
        assert!(provider.credentials().is_err());

        std::env::remove_var("TEST_MM_USER_C");
        std::env::remove_var("TEST_MM_PASS_C");
    }

    #[test]
    fn test_static_provider_validates_on_construction() {
        assert!(StaticCredentialProvider::new("svc_user", "secret").is_ok());
        assert!(StaticCredentialProvider::new("", "secret").is_err());
        assert!(StaticCredentialProvider::new("svc_user", "x".repeat(200)).is_err());
    }
}
