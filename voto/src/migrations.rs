use anyhow::Result;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MIGRATION_LOCK_KEY: &str = "voto:lock:migration";
const MIGRATION_LOCK_TTL: u64 = 300;
const MIGRATION_POLL_INTERVAL: Duration = Duration::from_secs(2);
const MIGRATION_MAX_WAIT: Duration = Duration::from_secs(300);

/// Run database migrations. With Redis configured, replicas take turns
/// through a lock so that only one of them migrates at a time.
pub async fn run_migrations(pool: &PgPool, redis_url: &str) -> Result<()> {
    info!("Running database migrations...");

    if redis_url.is_empty() {
        run_migrate(pool).await?;
    } else {
        run_migrations_with_lock(pool, redis_url).await?;
    }

    info!("Migrations completed");
    Ok(())
}

async fn run_migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })
}

/// Compare the embedded migrations with `_sqlx_migrations`
async fn migrations_already_applied(pool: &PgPool) -> bool {
    let migrator = sqlx::migrate!("../migrations");
    let applied: Vec<(i64,)> =
        match sqlx::query_as("SELECT version FROM _sqlx_migrations ORDER BY version")
            .fetch_all(pool)
            .await
        {
            Ok(rows) => rows,
            Err(_) => return false,
        };

    let applied: std::collections::HashSet<i64> = applied.into_iter().map(|(v,)| v).collect();
    migrator
        .migrations
        .iter()
        .all(|m| applied.contains(&m.version))
}

/// Redis `SET NX EX` lock held for the duration of a migration run
struct MigrationLock {
    redis: ConnectionManager,
    token: String,
}

impl MigrationLock {
    async fn connect(redis_url: &str) -> Result<ConnectionManager> {
        let client = redis::Client::open(redis_url.to_owned())
            .map_err(|e| anyhow::anyhow!("Failed to open Redis for migration lock: {e}"))?;
        client
            .get_connection_manager()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Redis for migration lock: {e}"))
    }

    /// `Ok(None)` when another replica holds the lock
    async fn try_acquire(redis: &ConnectionManager) -> redis::RedisResult<Option<Self>> {
        let token = voto_core::models::generate_id();
        let mut conn = redis.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(MIGRATION_LOCK_KEY)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(MIGRATION_LOCK_TTL)
            .query_async(&mut conn)
            .await?;

        Ok(acquired.map(|_| Self {
            redis: redis.clone(),
            token,
        }))
    }

    /// Release only if the lock still carries our token
    async fn release(mut self) {
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
            "#,
        );
        let released: redis::RedisResult<i32> = script
            .key(MIGRATION_LOCK_KEY)
            .arg(&self.token)
            .invoke_async(&mut self.redis)
            .await;
        match released {
            Ok(1) => debug!("Migration lock released"),
            Ok(_) => warn!("Migration lock expired before release"),
            Err(e) => warn!("Failed to release migration lock: {}", e),
        }
    }
}

async fn run_migrations_with_lock(pool: &PgPool, redis_url: &str) -> Result<()> {
    let redis = match MigrationLock::connect(redis_url).await {
        Ok(redis) => redis,
        Err(e) => {
            warn!("{}, running migrations without lock", e);
            return run_migrate(pool).await;
        }
    };

    let max_attempts = MIGRATION_MAX_WAIT.as_secs() / MIGRATION_POLL_INTERVAL.as_secs();
    let mut attempts = 0;

    loop {
        match MigrationLock::try_acquire(&redis).await {
            Ok(Some(lock)) => {
                // A replica that waited may find the work already done
                let result = if attempts > 0 && migrations_already_applied(pool).await {
                    info!("Migrations already applied by another node, skipping");
                    Ok(())
                } else {
                    info!("Acquired migration lock, running migrations");
                    run_migrate(pool).await
                };
                lock.release().await;
                return result;
            }
            Ok(None) if attempts < max_attempts => {
                if attempts == 0 {
                    info!("Another node is running migrations, waiting...");
                }
                attempts += 1;
                tokio::time::sleep(MIGRATION_POLL_INTERVAL).await;
            }
            Ok(None) => {
                return Err(anyhow::anyhow!(
                    "Timed out waiting for migration lock after {}s",
                    attempts * MIGRATION_POLL_INTERVAL.as_secs()
                ));
            }
            Err(e) => {
                warn!(
                    "Redis error on migration lock: {}, running migrations directly",
                    e
                );
                return run_migrate(pool).await;
            }
        }
    }
}
