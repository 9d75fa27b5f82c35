use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "cyberread";

/// Remembered passwords in the OS keychain, keyed by email.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the password for an email in the OS keychain
    pub fn store(email: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the password for an email, if one was remembered
    pub fn get_password(email: &str) -> Option<String> {
        Entry::new(SERVICE_NAME, email)
            .and_then(|entry| entry.get_password())
            .ok()
    }

    /// Forget the password for an email. Missing entries are not an error.
    pub fn delete(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    pub fn has_credentials(email: &str) -> bool {
        Self::get_password(email).is_some()
    }
}
