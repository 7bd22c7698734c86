//! Backend API token storage
//!
//! Lookup order: environment variable, OS keyring, then a 0600 file in the
//! config directory.

use anyhow::Result;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const ENV_TOKEN: &str = "INBOX_AUTOPILOT_TOKEN";
const KEYRING_SERVICE: &str = "inbox-autopilot";

pub struct CredentialStore {
    user_id: String,
    token_file: PathBuf,
}

impl CredentialStore {
    pub fn new(user_id: &str) -> Self {
        let dir = crate::config::Config::config_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_dir(user_id, dir)
    }

    fn with_dir(user_id: &str, dir: PathBuf) -> Self {
        // User-specific token file so several users can share a machine
        let safe_user = user_id.replace(['@', '.', '/', '\\', ':'], "_");
        Self {
            user_id: user_id.to_string(),
            token_file: dir.join(format!(".token_{}", safe_user)),
        }
    }

    fn keyring_key(&self) -> String {
        format!("api:{}", self.user_id)
    }

    fn env_token() -> Option<String> {
        env::var(ENV_TOKEN).ok().filter(|t| !t.trim().is_empty())
    }

    fn keyring_get(&self) -> Option<String> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, &self.keyring_key()).ok()?;
        entry.get_password().ok()
    }

    fn keyring_set(&self, token: &str) -> bool {
        match keyring::Entry::new(KEYRING_SERVICE, &self.keyring_key()) {
            Ok(entry) => entry.set_password(token).is_ok(),
            Err(_) => false,
        }
    }

    fn file_get(&self) -> Option<String> {
        fs::read_to_string(&self.token_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn file_set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.token_file.parent() {
            fs::create_dir_all(parent)?;
        }

        // Create with restricted permissions up front rather than chmod afterwards
        #[cfg(unix)]
        {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.token_file)?;
            file.write_all(token.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.token_file, token)?;
        }

        Ok(())
    }

    pub fn get_api_token(&self) -> Result<String> {
        if let Some(token) = Self::env_token() {
            return Ok(token);
        }
        if let Some(token) = self.keyring_get() {
            return Ok(token);
        }
        if let Some(token) = self.file_get() {
            return Ok(token);
        }

        anyhow::bail!(
            "API token not found. Set {} or run 'inbox-autopilot setup'.",
            ENV_TOKEN
        )
    }

    pub fn set_api_token(&self, token: &str) -> Result<()> {
        if self.keyring_set(token) && self.keyring_get().as_deref() == Some(token) {
            return Ok(());
        }

        eprintln!("Note: Keyring unavailable, using file-based storage.");
        self.file_set(token)
    }

    pub fn has_credentials(&self) -> bool {
        Self::env_token().is_some() || self.keyring_get().is_some() || self.file_get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to prevent parallel test interference with env vars
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_env_token_wins() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: env access is serialized by ENV_MUTEX
        unsafe { env::set_var(ENV_TOKEN, "env-token") };

        let store = CredentialStore::with_dir("user-1", dir.path().to_path_buf());
        assert!(store.has_credentials());
        assert_eq!(store.get_api_token().unwrap(), "env-token");

        unsafe { env::remove_var(ENV_TOKEN) };
    }

    #[test]
    fn test_user_specific_token_files() {
        let dir = PathBuf::from("/tmp/cfg");
        let a = CredentialStore::with_dir("alice@example.com", dir.clone());
        let b = CredentialStore::with_dir("bob@example.com", dir);

        assert_ne!(a.token_file, b.token_file);
        let name = a.token_file.file_name().unwrap().to_string_lossy();
        assert_eq!(name, ".token_alice_example_com");
    }

    #[test]
    fn test_file_fallback() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { env::remove_var(ENV_TOKEN) };
        let dir = tempfile::tempdir().unwrap();
        let user = format!("file_fallback_{}", std::process::id());
        let store = CredentialStore::with_dir(&user, dir.path().to_path_buf());

        store.file_set("file-token").unwrap();
        assert_eq!(store.file_get().as_deref(), Some("file-token"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&store.token_file).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
