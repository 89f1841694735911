use crate::{
    config::RuntimeConfiguration,
    error::{BursarResult, GetDatabaseConnectionSnafu, MigrateSnafu, OpenDatabaseSnafu},
};
use snafu::ResultExt;
use sqlx::{
    Pool, Sqlite, Transaction,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{ops::Deref, str::FromStr};

#[derive(Clone, Debug)]
pub struct BursarState {
    pool: Pool<Sqlite>,
    config: RuntimeConfiguration,
}

impl BursarState {
    pub async fn new(config: RuntimeConfiguration) -> BursarResult<Self> {
        let db_config = config.db_config();
        let connect_options = SqliteConnectOptions::from_str(db_config.url())
            .context(OpenDatabaseSnafu)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(db_config.max_connections())
            .connect_with(connect_options)
            .await
            .context(OpenDatabaseSnafu)?;

        Ok(Self { pool, config })
    }

    ///must be called once before serving, creates the `students` table if it doesn't exist yet
    pub async fn run_migrations(&self) -> BursarResult<()> {
        sqlx::migrate!().run(&self.pool).await.context(MigrateSnafu)
    }

    pub fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    pub async fn get_connection(&self) -> BursarResult<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .context(GetDatabaseConnectionSnafu)
    }

    pub async fn get_transaction(&self) -> BursarResult<Transaction<'static, Sqlite>> {
        self.pool.begin().await.context(GetDatabaseConnectionSnafu)
    }

    pub async fn sensible_shutdown(&self) {
        self.pool.close().await;
    }
}

impl Deref for BursarState {
    type Target = Pool<Sqlite>;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
