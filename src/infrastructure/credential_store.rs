use crate::domain::models::OAuthToken;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

pub const KEYRING_SERVICE: &str = "dayplanner.oauth.google";

pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError>;
    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError>;
    fn delete_token(&self) -> Result<(), InfraError>;
}

fn credential_error(error: impl std::fmt::Display) -> InfraError {
    InfraError::Credential(error.to_string())
}

/// Stores the token as JSON in the platform keyring (Keychain, Credential
/// Manager or the kernel keyring).
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    account: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service, &self.account).map_err(credential_error)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE, "default")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        let payload = serde_json::to_string(token).map_err(credential_error)?;
        self.entry()?.set_password(&payload).map_err(credential_error)
    }

    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(credential_error(error)),
        };
        serde_json::from_str::<OAuthToken>(&payload)
            .map(Some)
            .map_err(credential_error)
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(credential_error(error)),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<OAuthToken>>,
}

impl InMemoryCredentialStore {
    fn with_slot<T>(&self, apply: impl FnOnce(&mut Option<OAuthToken>) -> T) -> Result<T, InfraError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| credential_error(format!("in-memory lock poisoned: {error}")))?;
        Ok(apply(&mut *guard))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        self.with_slot(|slot| *slot = Some(token.clone()))
    }

    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        self.with_slot(|slot| slot.clone())
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        self.with_slot(|slot| *slot = None)
    }
}
