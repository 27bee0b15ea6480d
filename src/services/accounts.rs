//! Account storage.
//!
//! Accounts live in memory for the life of the process, seeded from
//! `[[accounts.users]]`. Passwords are kept as Argon2 PHC strings.

use crate::config::{AccountsConfig, HashCost};
use crate::security::{hash_password_with, is_phc};
use crate::state::Access;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::info;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\[\]]{1,20}$").expect("username pattern"));

/// Whether `name` is acceptable as an account name.
pub fn valid_username(name: &str) -> bool {
    USERNAME.is_match(name)
}

/// The identity a logged-in session carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: u32,
    pub name: String,
    pub access: Access,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("registration is disabled")]
    RegistrationClosed,
    #[error("invalid username")]
    InvalidName,
    #[error("username already taken")]
    NameTaken,
    #[error("email address already in use")]
    EmailTaken,
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Account persistence as seen by the handlers.
///
/// Implementations must answer without blocking; they are called from the
/// reactor task. Password hashing and verification happen elsewhere, on
/// PHC strings handed in and out of the store.
pub trait AccountStore: Send {
    /// The account called `name` and its stored PHC string.
    fn credentials(&self, name: &str) -> Option<(Account, String)>;
    /// Refuse a registration up front, before any hashing is spent on it.
    fn check_registration(&self, name: &str, email: Option<&str>) -> Result<(), AccountError>;
    /// Store a new account. Every check is repeated since another session
    /// may have taken the name while the password was being hashed.
    fn register(
        &mut self,
        name: &str,
        phc: String,
        email: Option<&str>,
    ) -> Result<Account, AccountError>;
    /// Cost for hashing new passwords.
    fn hash_cost(&self) -> HashCost;
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    phc: String,
}

/// In-memory [`AccountStore`].
#[derive(Debug)]
pub struct MemoryAccountStore {
    /// Keyed by lower-cased name.
    accounts: BTreeMap<String, StoredAccount>,
    next_id: u32,
    registration: bool,
    cost: HashCost,
}

impl MemoryAccountStore {
    pub fn new(cost: HashCost, registration: bool) -> Self {
        Self {
            accounts: BTreeMap::new(),
            next_id: 1,
            registration,
            cost,
        }
    }

    /// Build the store from config, hashing any plaintext passwords.
    pub fn from_config(config: &AccountsConfig) -> Result<Self, AccountError> {
        let mut store = Self::new(config.hash_cost, config.registration_enabled);
        for user in &config.users {
            let phc = if is_phc(&user.password) {
                user.password.clone()
            } else {
                hash_password_with(&user.password, config.hash_cost).map_err(AccountError::Hash)?
            };
            store.insert(&user.name, phc, user.access, user.email.clone());
        }
        info!(accounts = store.accounts.len(), "Account store loaded");
        Ok(store)
    }

    fn insert(&mut self, name: &str, phc: String, access: Access, email: Option<String>) -> Account {
        let account = Account {
            id: self.next_id,
            name: name.to_string(),
            access,
            email,
        };
        self.next_id += 1;
        self.accounts.insert(
            name.to_ascii_lowercase(),
            StoredAccount {
                account: account.clone(),
                phc,
            },
        );
        account
    }

    fn email_in_use(&self, email: &str) -> bool {
        self.accounts.values().any(|s| {
            s.account
                .email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }
}

impl AccountStore for MemoryAccountStore {
    fn credentials(&self, name: &str) -> Option<(Account, String)> {
        self.accounts
            .get(&name.to_ascii_lowercase())
            .map(|s| (s.account.clone(), s.phc.clone()))
    }

    fn check_registration(&self, name: &str, email: Option<&str>) -> Result<(), AccountError> {
        if !self.registration {
            return Err(AccountError::RegistrationClosed);
        }
        if !valid_username(name) {
            return Err(AccountError::InvalidName);
        }
        if self.accounts.contains_key(&name.to_ascii_lowercase()) {
            return Err(AccountError::NameTaken);
        }
        if email.is_some_and(|e| self.email_in_use(e)) {
            return Err(AccountError::EmailTaken);
        }
        Ok(())
    }

    fn register(
        &mut self,
        name: &str,
        phc: String,
        email: Option<&str>,
    ) -> Result<Account, AccountError> {
        self.check_registration(name, email)?;
        let account = self.insert(name, phc, Access::User, email.map(str::to_owned));
        info!(user = %name, id = account.id, "Account registered");
        Ok(account)
    }

    fn hash_cost(&self) -> HashCost {
        self.cost
    }
}
