// PostgreSQL-backed document store.
//
// Tables:
// - guilds: one JSONB document per guild
// - members: one JSONB document per (guild, member)
// - users: one JSONB document per user
// - configuration: a single row keyed by `active = TRUE`
//
// Each table carries a trigger that publishes changed keys on the
// `cache_invalidate` channel. Writes made here set `bot.is_updating` for the
// transaction so the trigger skips them.

use crate::core::storage::{DocumentKey, DocumentStore, StoreError, INVALIDATION_CHANNEL};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::Postgres;

const MIN_CONNECTIONS: u32 = 5;
const MAX_CONNECTIONS: u32 = 10;

const TABLES: [&str; 4] = ["guilds", "members", "users", "configuration"];

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS guilds (
    id BIGINT PRIMARY KEY,
    data JSONB DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS members (
    guild_id BIGINT NOT NULL,
    member_id BIGINT NOT NULL,
    data JSONB DEFAULT '{}',
    PRIMARY KEY (guild_id, member_id)
);

CREATE TABLE IF NOT EXISTS users (
    id BIGINT PRIMARY KEY,
    data JSONB DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS configuration (
    active BOOL PRIMARY KEY DEFAULT TRUE,
    data JSONB DEFAULT '{}'
);
"#;

fn notify_function_sql() -> String {
    format!(
        r#"
CREATE OR REPLACE FUNCTION notify_cache_invalidate()
RETURNS TRIGGER AS $$
BEGIN
    IF current_setting('bot.is_updating', true) = 'true' THEN
        RETURN NEW;
    END IF;

    IF TG_TABLE_NAME = 'guilds' THEN
        PERFORM pg_notify('{channel}', json_build_object(
            'table', 'guilds',
            'id', COALESCE(NEW.id, OLD.id)
        )::text);
    ELSIF TG_TABLE_NAME = 'members' THEN
        PERFORM pg_notify('{channel}', json_build_object(
            'table', 'members',
            'guild_id', COALESCE(NEW.guild_id, OLD.guild_id),
            'member_id', COALESCE(NEW.member_id, OLD.member_id)
        )::text);
    ELSIF TG_TABLE_NAME = 'users' THEN
        PERFORM pg_notify('{channel}', json_build_object(
            'table', 'users',
            'id', COALESCE(NEW.id, OLD.id)
        )::text);
    ELSIF TG_TABLE_NAME = 'configuration' THEN
        PERFORM pg_notify('{channel}', json_build_object(
            'table', 'configuration',
            'id', TRUE
        )::text);
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;
"#,
        channel = INVALIDATION_CHANNEL
    )
}

fn trigger_sql(table: &str) -> String {
    format!(
        r#"
DROP TRIGGER IF EXISTS {table}_cache_trigger ON {table};
CREATE TRIGGER {table}_cache_trigger
AFTER INSERT OR UPDATE OR DELETE ON {table}
FOR EACH ROW EXECUTE FUNCTION notify_cache_invalidate();
"#
    )
}

/// Snowflakes fit in 63 bits, so the cast into BIGINT is lossless.
fn db_id(id: u64) -> i64 {
    id as i64
}

fn storage_error(e: sqlx::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized for the bot's workload.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(MIN_CONNECTIONS)
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(storage_error)?;

        tracing::info!("Database connection pool created");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables, the notify function and one trigger per table.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::raw_sql("SET LOCAL bot.is_updating = 'true'")
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        sqlx::raw_sql(SCHEMA)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let function = notify_function_sql();
        sqlx::raw_sql(&function)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        for table in TABLES {
            let trigger = trigger_sql(table);
            sqlx::raw_sql(&trigger)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;

        tracing::info!("Ensured database tables & listeners");
        Ok(())
    }

    /// Run one statement inside a transaction marked as a bot write.
    async fn execute_as_bot(&self, query: Query<'_, Postgres, PgArguments>) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("SET LOCAL bot.is_updating = 'true'")
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let result = query.execute(&mut *tx).await.map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn fetch(&self, key: DocumentKey) -> Result<Option<Value>, StoreError> {
        let query = match key {
            DocumentKey::Guild(id) => {
                sqlx::query_scalar::<_, Option<Value>>("SELECT data FROM guilds WHERE id = $1")
                    .bind(db_id(id))
            }
            DocumentKey::Member {
                guild_id,
                member_id,
            } => sqlx::query_scalar::<_, Option<Value>>(
                "SELECT data FROM members WHERE guild_id = $1 AND member_id = $2",
            )
            .bind(db_id(guild_id))
            .bind(db_id(member_id)),
            DocumentKey::User(id) => {
                sqlx::query_scalar::<_, Option<Value>>("SELECT data FROM users WHERE id = $1")
                    .bind(db_id(id))
            }
            DocumentKey::Configuration => sqlx::query_scalar::<_, Option<Value>>(
                "SELECT data FROM configuration WHERE active = TRUE",
            ),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        // A row with a NULL document still exists.
        Ok(row.map(|data| data.unwrap_or(Value::Null)))
    }

    async fn insert_if_absent(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError> {
        let query = match key {
            DocumentKey::Guild(id) => sqlx::query(
                "INSERT INTO guilds (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            )
            .bind(db_id(id))
            .bind(Json(data)),
            DocumentKey::Member {
                guild_id,
                member_id,
            } => sqlx::query(
                "INSERT INTO members (guild_id, member_id, data) VALUES ($1, $2, $3) \
                 ON CONFLICT (guild_id, member_id) DO NOTHING",
            )
            .bind(db_id(guild_id))
            .bind(db_id(member_id))
            .bind(Json(data)),
            DocumentKey::User(id) => sqlx::query(
                "INSERT INTO users (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            )
            .bind(db_id(id))
            .bind(Json(data)),
            DocumentKey::Configuration => sqlx::query(
                "INSERT INTO configuration (active, data) VALUES (TRUE, $1) \
                 ON CONFLICT (active) DO NOTHING",
            )
            .bind(Json(data)),
        };

        self.execute_as_bot(query).await?;
        Ok(())
    }

    async fn upsert(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError> {
        let query = match key {
            DocumentKey::Guild(id) => sqlx::query(
                "INSERT INTO guilds (id, data) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(db_id(id))
            .bind(Json(data)),
            DocumentKey::Member {
                guild_id,
                member_id,
            } => sqlx::query(
                "INSERT INTO members (guild_id, member_id, data) VALUES ($1, $2, $3) \
                 ON CONFLICT (guild_id, member_id) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(db_id(guild_id))
            .bind(db_id(member_id))
            .bind(Json(data)),
            DocumentKey::User(id) => sqlx::query(
                "INSERT INTO users (id, data) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(db_id(id))
            .bind(Json(data)),
            DocumentKey::Configuration => sqlx::query(
                "INSERT INTO configuration (active, data) VALUES (TRUE, $1) \
                 ON CONFLICT (active) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(Json(data)),
        };

        self.execute_as_bot(query).await?;
        Ok(())
    }

    async fn delete(&self, key: DocumentKey) -> Result<bool, StoreError> {
        let query = match key {
            DocumentKey::Guild(id) => {
                sqlx::query("DELETE FROM guilds WHERE id = $1").bind(db_id(id))
            }
            DocumentKey::Member {
                guild_id,
                member_id,
            } => sqlx::query("DELETE FROM members WHERE guild_id = $1 AND member_id = $2")
                .bind(db_id(guild_id))
                .bind(db_id(member_id)),
            DocumentKey::User(id) => sqlx::query("DELETE FROM users WHERE id = $1").bind(db_id(id)),
            DocumentKey::Configuration => {
                sqlx::query("DELETE FROM configuration WHERE active = TRUE")
            }
        };

        Ok(self.execute_as_bot(query).await? > 0)
    }

    async fn delete_member_everywhere(&self, member_id: u64) -> Result<u64, StoreError> {
        let query = sqlx::query("DELETE FROM members WHERE member_id = $1").bind(db_id(member_id));
        self.execute_as_bot(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_gets_a_trigger() {
        for table in TABLES {
            let sql = trigger_sql(table);
            assert!(sql.contains(&format!("CREATE TRIGGER {table}_cache_trigger")));
            assert!(sql.contains(&format!("ON {table};")));
        }
    }

    #[test]
    fn notify_function_skips_bot_writes() {
        let sql = notify_function_sql();
        assert!(sql.contains("current_setting('bot.is_updating', true) = 'true'"));
        assert!(sql.contains("pg_notify('cache_invalidate'"));
        for table in TABLES {
            assert!(sql.contains(&format!("'table', '{table}'")));
        }
    }

    #[test]
    fn snowflakes_survive_the_bigint_cast() {
        let id = 1444846443104964660_u64;
        assert_eq!(db_id(id) as u64, id);
    }
}
