use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod surreal;

// Errors.

/// Failures surfaced by the spot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store location cannot be used; fatal at startup.
    #[error("Database path `{path}` is not usable: {reason}")]
    StoreUnavailable { path: String, reason: String },
    /// The caller passed something the store refuses to persist.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// There are no spots to pick from.
    #[error("There are no spots in the store.")]
    EmptyStore,
    /// Anything the backend itself reports.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// Data types.

/// A lunch spot suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    /// Store-assigned identifier.
    pub id: String,
    pub name: String,
    /// Number of times this spot has been recommended.
    pub used_count: u64,
}

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines the bookkeeping for lunch spots and the last-run
/// marker. Implementing this trait allows different database backends to be
/// used with the lunch-bot.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Gets the timestamp of the previous startup, if there ever was one.
    async fn get_last_run(&self) -> StoreResult<Option<String>>;

    /// Stores `timestamp` as the last startup, replacing any earlier value.
    async fn record_run(&self, timestamp: &str) -> StoreResult<()>;

    /// Adds a spot with a zero usage count.
    ///
    /// The name is trimmed; a blank name is rejected with [`StoreError::InvalidInput`].
    async fn add_spot(&self, name: &str) -> StoreResult<()>;

    /// Removes every spot whose name contains `needle`, ignoring case.
    ///
    /// Returns how many spots were removed.
    async fn remove_spots_matching(&self, needle: &str) -> StoreResult<usize>;

    /// Lists all spots ordered by name, then by insertion.
    async fn list_spots(&self) -> StoreResult<Vec<Spot>>;

    /// Picks one spot uniformly at random.
    async fn pick_random(&self) -> StoreResult<Spot>;

    /// Bumps the usage count of a spot; a missing id is ignored.
    async fn increment_usage(&self, id: &str) -> StoreResult<()>;

    /// Lists all spot names ordered by name, then by insertion.
    async fn list_all_sorted(&self) -> StoreResult<Vec<String>> {
        Ok(self.list_spots().await?.into_iter().map(|spot| spot.name).collect())
    }
}

/// Database client for lunch-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    pub inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}

// Helpers shared by backends.

/// Trims a spot name, rejecting blanks.
pub(crate) fn normalize_spot_name(name: &str) -> StoreResult<&str> {
    let name = name.trim();

    if name.is_empty() {
        return Err(StoreError::InvalidInput("spot name must not be empty".to_string()));
    }

    Ok(name)
}

/// Prepares a removal needle for case-insensitive matching, rejecting blanks
/// (a blank needle would match every spot).
pub(crate) fn normalize_needle(needle: &str) -> StoreResult<String> {
    let needle = needle.trim();

    if needle.is_empty() {
        return Err(StoreError::InvalidInput("spot name to remove must not be empty".to_string()));
    }

    Ok(needle.to_lowercase())
}
