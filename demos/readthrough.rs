//! Read-Through Caching Walkthrough
//!
//! Wires a cache over the backend named by `POLYCACHE_BACKEND` (memory,
//! fs, or redis) and runs the everyday flow: read-through loads,
//! dependency-driven invalidation, a guarded write, and a statistics
//! dump. Run with:
//!
//! ```text
//! cargo run --example readthrough
//! POLYCACHE_BACKEND=fs cargo run --example readthrough
//! POLYCACHE_BACKEND=redis REDIS_URL=redis://127.0.0.1:6379 cargo run --example readthrough
//! ```

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polycache::{
    open_lock, open_store, spawn_sweeper_task, BackendKind, Cache, CacheOptions, LockConfig,
    LockProvider, LockSettings, StoreConfig,
};

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    id: u32,
    name: String,
    hobbies: Vec<String>,
}

/// Stand-in for the slow upstream a cache would sit in front of.
async fn fetch_profile_from_upstream(id: u32) -> Profile {
    tokio::time::sleep(Duration::from_millis(150)).await;
    Profile {
        id,
        name: format!("user-{id}"),
        hobbies: vec!["chess".to_string(), "climbing".to_string()],
    }
}

/// Read-through load: serve from cache, fall back to the upstream and
/// cache the result keyed under the user it belongs to.
async fn load_profile(cache: &Cache, id: u32) -> anyhow::Result<Profile> {
    let key = format!("profile:{id}");

    if let Some(profile) = cache.get_as::<Profile>(&key).await {
        info!("'{}' served from cache", key);
        return Ok(profile);
    }

    info!("'{}' not cached, asking upstream", key);
    let profile = fetch_profile_from_upstream(id).await;

    let options = CacheOptions {
        ttl: Duration::from_secs(300),
        dependencies: vec![format!("user:{id}")],
        ..CacheOptions::default()
    };
    cache.set(&key, &profile, options).await?;

    Ok(profile)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults below, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readthrough=info,polycache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let raw_backend = std::env::var("POLYCACHE_BACKEND").unwrap_or_else(|_| "memory".to_string());
    let backend = BackendKind::from_str(&raw_backend)?;
    info!("Using backend: {}", backend);

    let (store_config, lock_config) = match backend {
        BackendKind::Memory => (
            StoreConfig::Memory,
            LockConfig::Memory {
                settings: LockSettings::default(),
            },
        ),
        BackendKind::Filesystem => {
            let root = std::env::temp_dir().join("polycache-demo");
            info!("Cache directory: {}", root.display());
            (
                StoreConfig::Filesystem {
                    dir: root.join("records"),
                },
                LockConfig::Filesystem {
                    dir: root.join("locks"),
                    settings: LockSettings::default(),
                },
            )
        }
        BackendKind::Redis => {
            let url = std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
            let client = redis::Client::open(url)?;
            let conn = client.get_multiplexed_async_connection().await?;
            let namespace = Some("demo:".to_string());
            (
                StoreConfig::Redis {
                    conn: conn.clone(),
                    namespace: namespace.clone(),
                },
                LockConfig::Redis {
                    conn,
                    namespace,
                    settings: LockSettings::default(),
                },
            )
        }
    };

    let store = open_store(store_config)?;
    let lock = open_lock(lock_config)?;
    let cache = Cache::new(store.clone()).with_lock_provider(lock.clone());

    // Leftovers from a previous run would spoil the walkthrough.
    cache.clear().await?;
    lock.clear_locks().await?;

    // Background sweeper reclaiming expired records.
    let sweeper = spawn_sweeper_task(store, Duration::from_secs(2));

    // == Read-Through ==
    let first = load_profile(&cache, 1).await?;
    info!("First load (upstream): {:?}", first);

    let second = load_profile(&cache, 1).await?;
    info!("Second load (cached): {:?}", second);

    // == Dependency Invalidation ==
    // The profile depends on "user:1"; deleting the user takes the
    // profile down with it.
    cache.del("user:1").await?;
    info!("Deleted 'user:1', dependents are gone too");

    let third = load_profile(&cache, 1).await?;
    info!("Third load (upstream again): {:?}", third);

    // == Guarded Write ==
    // The first locked write claims the key's lease; the competing write
    // cannot get it in time and is skipped.
    let guarded = CacheOptions {
        ttl: Duration::from_secs(300),
        lock_timeout: Some(Duration::from_millis(50)),
        ..CacheOptions::default()
    };
    cache.set("config", &"v1", guarded.clone()).await?;
    cache.set("config", &"v2", guarded).await?;
    info!("Guarded value after competing writes: {:?}", cache.get("config").await);

    // == Statistics ==
    let stats = cache.stats();
    info!(
        "Session stats: {} hits, {} misses, hit rate {:.2}",
        stats.hits, stats.misses, stats.hit_rate
    );

    sweeper.abort();
    Ok(())
}
