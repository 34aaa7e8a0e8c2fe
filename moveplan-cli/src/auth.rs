//! Local stand-in for the identity provider
//!
//! Accounts and the signed-in user live in `auth.json` in the data
//! directory. An account created with deferred activation stays unconfirmed
//! until `mp auth confirm`, which models email confirmation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use moveplan_core::config::AUTH_FILENAME;
use moveplan_core::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    id: String,
    email: String,
    confirmed: bool,
    created_at: DateTime<Utc>,
}

impl Account {
    fn user(&self) -> User {
        User::new(self.id.clone(), self.email.clone())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthFile {
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    signed_in: Option<String>,
}

pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(AUTH_FILENAME),
        }
    }

    /// Create an account; `confirmed` accounts can sign in right away
    pub fn sign_up(&self, email: &str, confirmed: bool) -> Result<User> {
        let email = normalize(email)?;
        let mut file = self.load()?;
        if file.accounts.iter().any(|a| a.email == email) {
            bail!("An account for {} already exists", email);
        }
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email,
            confirmed,
            created_at: Utc::now(),
        };
        let user = account.user();
        if confirmed {
            file.signed_in = Some(account.id.clone());
        }
        file.accounts.push(account);
        self.save(&file)?;
        Ok(user)
    }

    pub fn confirm(&self, email: &str) -> Result<User> {
        let email = normalize(email)?;
        let mut file = self.load()?;
        let account = file
            .accounts
            .iter_mut()
            .find(|a| a.email == email)
            .with_context(|| format!("No account for {}", email))?;
        account.confirmed = true;
        let user = account.user();
        self.save(&file)?;
        Ok(user)
    }

    pub fn sign_in(&self, email: &str) -> Result<User> {
        let email = normalize(email)?;
        let mut file = self.load()?;
        let account = file
            .accounts
            .iter()
            .find(|a| a.email == email)
            .with_context(|| format!("No account for {}", email))?;
        if !account.confirmed {
            bail!("Account {} is not confirmed yet (run: mp auth confirm --email {})", email, email);
        }
        let user = account.user();
        file.signed_in = Some(user.id.clone());
        self.save(&file)?;
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<Option<User>> {
        let mut file = self.load()?;
        let user = current(&file);
        file.signed_in = None;
        self.save(&file)?;
        Ok(user)
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(current(&self.load()?))
    }

    fn load(&self) -> Result<AuthFile> {
        if !self.path.exists() {
            return Ok(AuthFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid auth data", self.path.display()))
    }

    fn save(&self, file: &AuthFile) -> Result<()> {
        let content = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

fn current(file: &AuthFile) -> Option<User> {
    let id = file.signed_in.as_deref()?;
    file.accounts
        .iter()
        .find(|a| a.id == id && a.confirmed)
        .map(Account::user)
}

fn normalize(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        bail!("'{}' is not an email address", email);
    }
    Ok(email)
}
