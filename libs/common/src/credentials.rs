//! Credential store for the KIP SAFE application
//!
//! Accounts are kept as one flat record set keyed by username. Every mutation
//! reads the whole set, changes it in memory and writes the whole set back.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::{StoreError, StoreResult};

/// Column order of the credential file
pub const HEADER: [&str; 5] = ["username", "password", "email", "created_at", "last_login"];

/// All accounts, keyed by username
pub type Accounts = BTreeMap<String, Account>;

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    /// Salted one-way hash (PHC string). Stored under the `password` column.
    #[serde(rename = "password")]
    pub password_hash: String,
    pub email: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Empty until the first successful sign-in
    #[serde(with = "optional_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a freshly registered account
    pub fn new(username: String, password_hash: String, email: String) -> Self {
        Self {
            username,
            password_hash,
            email,
            created_at: Utc::now(),
            last_login: None,
        }
    }
}

/// Durable set of accounts
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load every account
    async fn load(&self) -> StoreResult<Accounts>;

    /// Replace the stored accounts with `accounts`
    async fn save(&self, accounts: &Accounts) -> StoreResult<()>;
}

/// Credential store backed by a CSV file
#[derive(Debug, Clone)]
pub struct CsvCredentialStore {
    path: PathBuf,
}

impl CsvCredentialStore {
    /// Create a store for the file at `path`. The file itself is created on
    /// the first save.
    pub fn new(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(StoreError::Configuration(
                "credential file path is empty".to_string(),
            ));
        }

        Ok(Self { path })
    }

    /// Path of the credential file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the credential file can be read and parsed
    ///
    /// # Returns
    ///
    /// * `StoreResult<bool>` - True if the file is absent or parses cleanly
    pub async fn health_check(&self) -> StoreResult<bool> {
        match self.load().await {
            Ok(accounts) => {
                info!(
                    "Credential store at {} holds {} account(s)",
                    self.path.display(),
                    accounts.len()
                );
                Ok(true)
            }
            Err(StoreError::Csv(e)) => {
                error!("Credential file {} is malformed: {}", self.path.display(), e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl CredentialStore for CsvCredentialStore {
    async fn load(&self) -> StoreResult<Accounts> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Accounts::new()),
            Err(e) => return Err(e.into()),
        };

        parse_accounts(&bytes)
    }

    async fn save(&self, accounts: &Accounts) -> StoreResult<()> {
        let data = serialize_accounts(accounts)?;

        // Write next to the target and swap it in, so readers never see a
        // partially written file.
        let staging = self.staging_path();
        tokio::fs::write(&staging, data).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        Ok(())
    }
}

/// Parse the contents of a credential file. A later row for the same username
/// replaces an earlier one.
pub fn parse_accounts(bytes: &[u8]) -> StoreResult<Accounts> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let mut accounts = Accounts::new();
    for record in reader.deserialize::<Account>() {
        let account = record?;
        accounts.insert(account.username.clone(), account);
    }

    Ok(accounts)
}

/// Render accounts as a credential file, header row first
pub fn serialize_accounts(accounts: &Accounts) -> StoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for account in accounts.values() {
        writer.serialize(account)?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<Accounts>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `accounts`
    pub fn with_accounts(accounts: Accounts) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> StoreResult<Accounts> {
        Ok(self.accounts.read().await.clone())
    }

    async fn save(&self, accounts: &Accounts) -> StoreResult<()> {
        *self.accounts.write().await = accounts.clone();
        Ok(())
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            value
                .parse::<chrono::NaiveDateTime>()
                .ok()
                .map(|naive| naive.and_utc())
        })
}

mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(raw.trim())
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}

mod optional_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::timestamp::serialize(value, s),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = String::deserialize(d)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        super::parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}
