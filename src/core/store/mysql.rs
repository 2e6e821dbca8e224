// src/core/store/mysql.rs

//! The MySQL credential store, backed by an `sqlx` connection pool.

use super::CredentialStore;
use super::identifier::{
    account_name, escape_literal, normalize_privilege_type, validate_privilege_level,
    validate_schema,
};
use crate::config::DatabaseConfig;
use crate::core::errors::OtuError;
use crate::core::model::OtuRecord;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, QueryBuilder};
use tracing::{debug, info};

/// `` `schema`.`user` ``, the bookkeeping table of a validated schema.
pub fn qualified_table(schema: &str) -> String {
    format!("`{schema}`.`user`")
}

pub fn create_database_sql(schema: &str) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS `{schema}` DEFAULT CHARACTER SET = 'utf8' DEFAULT COLLATE 'utf8_general_ci'"
    )
}

pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            Host char(60) COLLATE utf8_bin NOT NULL DEFAULT '',
            User char(80) COLLATE utf8_bin NOT NULL DEFAULT '',
            Expire_time bigint NOT NULL DEFAULT 0,
            PRIMARY KEY (Host, User)
        )"
    )
}

/// Inserts a record unless `(Host, User)` already exists. Binds user, host, expiry.
pub fn insert_record_sql(table: &str) -> String {
    format!("INSERT IGNORE INTO {table} (User, Host, Expire_time) VALUES (?, ?, ?)")
}

pub fn create_user_sql(user: &str, host: &str, password: &str) -> Result<String, OtuError> {
    Ok(format!(
        "CREATE USER IF NOT EXISTS {} IDENTIFIED BY '{}'",
        account_name(user, host)?,
        escape_literal(password)
    ))
}

pub fn grant_sql(
    privilege_type: &str,
    privilege_level: &str,
    user: &str,
    host: &str,
) -> Result<String, OtuError> {
    let account = account_name(user, host)?;
    let privilege = normalize_privilege_type(privilege_type)?;
    let level = validate_privilege_level(privilege_level)?;
    Ok(format!("GRANT {privilege} ON {level} TO {account}"))
}

/// Binds the current unix time.
pub fn list_expired_sql(table: &str) -> String {
    format!("SELECT Host, User, Expire_time FROM {table} WHERE Expire_time <= ? ORDER BY Host, User")
}

/// Zeroes every record whose user is not in `keep`, or every record when `keep` is empty.
pub fn mark_not_intended_query<'a>(table: &str, keep: &'a [String]) -> QueryBuilder<'a, MySql> {
    let mut builder: QueryBuilder<MySql> =
        QueryBuilder::new(format!("UPDATE {table} SET Expire_time = 0"));
    if !keep.is_empty() {
        builder.push(" WHERE User NOT IN (");
        let mut users = builder.separated(", ");
        for user in keep {
            users.push_bind(user);
        }
        users.push_unseparated(")");
    }
    builder
}

pub fn drop_user_sql(user: &str, host: &str) -> Result<String, OtuError> {
    Ok(format!("DROP USER IF EXISTS {}", account_name(user, host)?))
}

/// Binds user, host.
pub fn delete_record_sql(table: &str) -> String {
    format!("DELETE FROM {table} WHERE User = ? AND Host = ?")
}

pub struct MySqlStore {
    pool: MySqlPool,
    schema: String,
}

impl MySqlStore {
    /// Opens the pool and verifies the server answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, OtuError> {
        let options = MySqlConnectOptions::new()
            .host(&config.server)
            .port(config.port)
            .username(&config.user)
            .password(&config.password);
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| OtuError::StoreUnavailable(e.to_string()))?;
        Self::from_pool(pool, &config.schema)
    }

    pub fn from_pool(pool: MySqlPool, schema: &str) -> Result<Self, OtuError> {
        Ok(Self {
            pool,
            schema: validate_schema(schema)?.to_string(),
        })
    }

    fn table(&self) -> String {
        qualified_table(&self.schema)
    }

    /// Creates the bookkeeping database and table if they do not exist yet.
    pub async fn prepare(&self) -> Result<(), OtuError> {
        let statements = [
            create_database_sql(&self.schema),
            create_table_sql(&self.table()),
        ];
        for stmt in &statements {
            sqlx::raw_sql(stmt)
                .execute(&self.pool)
                .await
                .map_err(OtuError::from_account_sql)?;
        }
        info!("Prepared bookkeeping table {}.", self.table());
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MySqlStore {
    async fn create_account(
        &self,
        host: &str,
        user: &str,
        password: &str,
        expire_time: i64,
    ) -> Result<(), OtuError> {
        let create = create_user_sql(user, host, password)?;

        let insert = insert_record_sql(&self.table());
        let mut tx = self.pool.begin().await.map_err(OtuError::from_account_sql)?;
        sqlx::query(&insert)
            .bind(user)
            .bind(host)
            .bind(expire_time)
            .execute(&mut *tx)
            .await
            .map_err(OtuError::from_account_sql)?;
        tx.commit().await.map_err(OtuError::from_account_sql)?;

        // mysql.user is not transactional, so the account is only created once its
        // record is committed.
        sqlx::raw_sql(&create)
            .execute(&self.pool)
            .await
            .map_err(OtuError::from_account_sql)?;
        Ok(())
    }

    async fn grant(
        &self,
        privilege_type: &str,
        privilege_level: &str,
        user: &str,
        host: &str,
    ) -> Result<(), OtuError> {
        let grant = grant_sql(privilege_type, privilege_level, user, host)?;
        debug!("{}", grant);
        sqlx::raw_sql(&grant)
            .execute(&self.pool)
            .await
            .map_err(OtuError::from_grant_sql)?;
        sqlx::raw_sql("FLUSH PRIVILEGES")
            .execute(&self.pool)
            .await
            .map_err(OtuError::from_grant_sql)?;
        Ok(())
    }

    async fn list_expired(&self, now: i64) -> Result<Vec<OtuRecord>, OtuError> {
        let select = list_expired_sql(&self.table());
        let rows: Vec<(String, String, i64)> = sqlx::query_as(&select)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(OtuError::from_account_sql)?;
        Ok(rows
            .into_iter()
            .map(|(host, user, expire_time)| OtuRecord {
                host,
                user,
                expire_time,
            })
            .collect())
    }

    async fn mark_not_intended(&self, keep: &[String]) -> Result<u64, OtuError> {
        let mut tx = self.pool.begin().await.map_err(OtuError::from_account_sql)?;
        let mut update = mark_not_intended_query(&self.table(), keep);
        let result = update
            .build()
            .execute(&mut *tx)
            .await
            .map_err(OtuError::from_account_sql)?;
        tx.commit().await.map_err(OtuError::from_account_sql)?;
        Ok(result.rows_affected())
    }

    async fn drop_account(&self, record: &OtuRecord) -> Result<(), OtuError> {
        let drop_user = drop_user_sql(&record.user, &record.host)?;
        sqlx::raw_sql(&drop_user)
            .execute(&self.pool)
            .await
            .map_err(OtuError::from_account_sql)?;

        let delete = delete_record_sql(&self.table());
        let mut tx = self.pool.begin().await.map_err(OtuError::from_account_sql)?;
        sqlx::query(&delete)
            .bind(&record.user)
            .bind(&record.host)
            .execute(&mut *tx)
            .await
            .map_err(OtuError::from_account_sql)?;
        tx.commit().await.map_err(OtuError::from_account_sql)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), OtuError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| OtuError::StoreUnavailable(e.to_string()))
    }
}
