//! SurrealDB implementation for lunch-bot data storage.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
};
use tracing::{debug, info, instrument};

use super::{DbClient, GenericDbClient, Spot, StoreError, StoreResult, normalize_needle, normalize_spot_name};

// Queries.

const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS spot SCHEMALESS;
DEFINE INDEX IF NOT EXISTS spot_used_count ON TABLE spot FIELDS used_count;
DEFINE TABLE IF NOT EXISTS run_info SCHEMALESS;
"#;

const GET_LAST_RUN: &str = "SELECT VALUE val FROM run_info:lastrun;";
const RECORD_RUN: &str = "UPSERT run_info:lastrun SET val = $timestamp RETURN NONE;";
const ADD_SPOT: &str = "CREATE spot SET name = $spot_name, used_count = 0, created_at = $created_at RETURN NONE;";
const REMOVE_SPOTS: &str = "DELETE spot WHERE string::contains(string::lowercase(name), $needle) RETURN BEFORE;";
const LIST_SPOTS: &str = "SELECT meta::id(id) AS id, name, used_count, created_at FROM spot ORDER BY name ASC, created_at ASC;";
const PICK_RANDOM: &str = "SELECT meta::id(id) AS id, name, used_count FROM spot ORDER BY RAND() LIMIT 1;";
const INCREMENT_USAGE: &str = "UPDATE spot SET used_count += 1 WHERE meta::id(id) = $spot_id RETURN NONE;";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Opens (or creates) an on-disk store at `path`.
    ///
    /// The parent directory must already exist; nothing is created above `path`.
    pub async fn surreal(path: &Path) -> StoreResult<Self> {
        ensure_usable(path)?;

        let endpoint = format!("surrealkv://{}", path.display());
        let client = SurrealDbClient::connect(&endpoint).await.map_err(|err| StoreError::StoreUnavailable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        info!("Spot store opened at `{}`.", path.display());

        Ok(Self { inner: Arc::new(client) })
    }

    /// Opens a throwaway in-memory store.
    pub async fn surreal_memory() -> StoreResult<Self> {
        let client = SurrealDbClient::connect("mem://").await?;

        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.into())
    }
}

// Structs.

/// SurrealDB-backed spot store.
struct SurrealDbClient {
    db: Surreal<Any>,
}

/// Row shape returned by `DELETE ... RETURN BEFORE`.
#[derive(Debug, Deserialize)]
struct RemovedSpot {
    name: String,
}

impl SurrealDbClient {
    #[instrument(skip_all)]
    async fn connect(endpoint: &str) -> StoreResult<Self> {
        let db = any::connect(endpoint).await?;

        db.use_ns("lunch").use_db("bot").await?;
        db.query(SCHEMA).await?.check()?;

        debug!("Database schema defined.");

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn get_last_run(&self) -> StoreResult<Option<String>> {
        let mut response = self.db.query(GET_LAST_RUN).await?;
        let values: Vec<String> = response.take(0)?;

        Ok(values.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn record_run(&self, timestamp: &str) -> StoreResult<()> {
        self.db.query(RECORD_RUN).bind(("timestamp", timestamp.to_string())).await?.check()?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_spot(&self, name: &str) -> StoreResult<()> {
        let name = normalize_spot_name(name)?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        self.db
            .query(ADD_SPOT)
            .bind(("spot_name", name.to_string()))
            .bind(("created_at", created_at))
            .await?
            .check()?;

        info!("Added spot `{}`.", name);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_spots_matching(&self, needle: &str) -> StoreResult<usize> {
        let needle = normalize_needle(needle)?;

        let mut response = self.db.query(REMOVE_SPOTS).bind(("needle", needle)).await?;
        let removed: Vec<RemovedSpot> = response.take(0)?;

        for spot in &removed {
            info!("Removed spot `{}`.", spot.name);
        }

        Ok(removed.len())
    }

    #[instrument(skip(self))]
    async fn list_spots(&self) -> StoreResult<Vec<Spot>> {
        let mut response = self.db.query(LIST_SPOTS).await?;
        let spots: Vec<Spot> = response.take(0)?;

        Ok(spots)
    }

    #[instrument(skip(self))]
    async fn pick_random(&self) -> StoreResult<Spot> {
        let mut response = self.db.query(PICK_RANDOM).await?;
        let spots: Vec<Spot> = response.take(0)?;

        spots.into_iter().next().ok_or(StoreError::EmptyStore)
    }

    #[instrument(skip(self))]
    async fn increment_usage(&self, id: &str) -> StoreResult<()> {
        self.db.query(INCREMENT_USAGE).bind(("spot_id", id.to_string())).await?.check()?;

        Ok(())
    }
}

// Helpers.

/// Checks that the store can live at `path` before anything touches the disk.
fn ensure_usable(path: &Path) -> StoreResult<()> {
    let unavailable = |reason: String| StoreError::StoreUnavailable {
        path: path.display().to_string(),
        reason,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let parent_meta = std::fs::metadata(parent).map_err(|err| unavailable(format!("parent directory `{}` is not accessible ({err})", parent.display())))?;

    if !parent_meta.is_dir() {
        return Err(unavailable(format!("`{}` is not a directory", parent.display())));
    }

    if parent_meta.permissions().readonly() {
        return Err(unavailable(format!("parent directory `{}` is read-only", parent.display())));
    }

    if let Ok(meta) = std::fs::metadata(path)
        && meta.permissions().readonly()
    {
        return Err(unavailable("the path is read-only".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> DbClient {
        DbClient::surreal_memory().await.unwrap()
    }

    #[tokio::test]
    async fn last_run_is_absent_until_recorded() {
        let db = store().await;

        assert_eq!(db.get_last_run().await.unwrap(), None);

        db.record_run("2024-01-01T00:00:00.000Z").await.unwrap();
        assert_eq!(db.get_last_run().await.unwrap().as_deref(), Some("2024-01-01T00:00:00.000Z"));

        db.record_run("2024-01-02T00:00:00.000Z").await.unwrap();
        assert_eq!(db.get_last_run().await.unwrap().as_deref(), Some("2024-01-02T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn record_run_is_idempotent() {
        let db = store().await;

        db.record_run("2024-01-01T00:00:00.000Z").await.unwrap();
        let once = db.get_last_run().await.unwrap();

        db.record_run("2024-01-01T00:00:00.000Z").await.unwrap();
        let twice = db.get_last_run().await.unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn add_spot_appends_exactly_once() {
        let db = store().await;

        db.add_spot("Tacos").await.unwrap();
        db.add_spot("Diner").await.unwrap();
        let before = db.list_all_sorted().await.unwrap();

        db.add_spot("  Tacos  ").await.unwrap();
        let after = db.list_all_sorted().await.unwrap();

        let count = |names: &[String]| names.iter().filter(|n| n.as_str() == "Tacos").count();
        assert_eq!(count(&after), count(&before) + 1);
        assert_eq!(after.len(), before.len() + 1);
    }

    #[tokio::test]
    async fn new_spots_start_unused() {
        let db = store().await;

        db.add_spot("Paola's").await.unwrap();

        let spots = db.list_spots().await.unwrap();
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].name, "Paola's");
        assert_eq!(spots[0].used_count, 0);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let db = store().await;

        assert!(matches!(db.add_spot("   ").await, Err(StoreError::InvalidInput(_))));
        assert!(db.list_spots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_is_sorted() {
        let db = store().await;

        for name in ["Landis", "Diner", "Tacos", "Christopher's", "Elegance", "Diner"] {
            db.add_spot(name).await.unwrap();
        }

        let names = db.list_all_sorted().await.unwrap();
        assert_eq!(names, vec!["Christopher's", "Diner", "Diner", "Elegance", "Landis", "Tacos"]);
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let db = store().await;

        assert!(db.list_all_sorted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_every_match_and_nothing_else() {
        let db = store().await;

        for name in ["Italian Market", "Market Street Deli", "Tacos", "Diner"] {
            db.add_spot(name).await.unwrap();
        }

        let removed = db.remove_spots_matching("market").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(db.list_all_sorted().await.unwrap(), vec!["Diner", "Tacos"]);
    }

    #[tokio::test]
    async fn remove_without_match_is_zero() {
        let db = store().await;

        db.add_spot("Tacos").await.unwrap();

        assert_eq!(db.remove_spots_matching("Sushi").await.unwrap(), 0);
        assert_eq!(db.list_all_sorted().await.unwrap(), vec!["Tacos"]);
    }

    #[tokio::test]
    async fn remove_rejects_blank_needle() {
        let db = store().await;

        db.add_spot("Tacos").await.unwrap();

        assert!(matches!(db.remove_spots_matching("  ").await, Err(StoreError::InvalidInput(_))));
        assert_eq!(db.list_all_sorted().await.unwrap(), vec!["Tacos"]);
    }

    #[tokio::test]
    async fn pick_random_on_empty_store_fails() {
        let db = store().await;

        assert!(matches!(db.pick_random().await, Err(StoreError::EmptyStore)));
    }

    #[tokio::test]
    async fn pick_random_returns_an_existing_spot() {
        let db = store().await;

        for name in ["Alpha", "Beta", "Gamma"] {
            db.add_spot(name).await.unwrap();
        }

        let names = db.list_all_sorted().await.unwrap();
        for _ in 0..10 {
            let spot = db.pick_random().await.unwrap();
            assert!(names.contains(&spot.name));
        }
    }

    #[tokio::test]
    async fn increment_usage_bumps_only_the_target() {
        let db = store().await;

        db.add_spot("Alpha").await.unwrap();
        db.add_spot("Beta").await.unwrap();

        let alpha = db.list_spots().await.unwrap().into_iter().find(|s| s.name == "Alpha").unwrap();
        db.increment_usage(&alpha.id).await.unwrap();
        db.increment_usage(&alpha.id).await.unwrap();

        let spots = db.list_spots().await.unwrap();
        assert_eq!(spots[0].name, "Alpha");
        assert_eq!(spots[0].used_count, 2);
        assert_eq!(spots[1].used_count, 0);
    }

    #[tokio::test]
    async fn increment_usage_of_missing_spot_is_ignored() {
        let db = store().await;

        db.add_spot("Alpha").await.unwrap();
        let before = db.list_spots().await.unwrap();

        db.increment_usage("does-not-exist").await.unwrap();

        assert_eq!(db.list_spots().await.unwrap(), before);
    }

    #[tokio::test]
    async fn missing_parent_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("lunchbot.db");

        let result = DbClient::surreal(&path).await;

        assert!(matches!(result, Err(StoreError::StoreUnavailable { .. })));
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn parent_that_is_a_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        let result = DbClient::surreal(&file.join("lunchbot.db")).await;

        assert!(matches!(result, Err(StoreError::StoreUnavailable { .. })));
    }

    #[tokio::test]
    async fn opens_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = DbClient::surreal(&dir.path().join("lunchbot.db")).await.unwrap();

        db.add_spot("Tacos").await.unwrap();

        assert_eq!(db.list_all_sorted().await.unwrap(), vec!["Tacos"]);
    }
}
