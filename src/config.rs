use crate::error::{BadEnvVarSnafu, BursarResult, CreateUploadDirSnafu, ParseSizeSnafu};
use dotenvy::var;
use snafu::ResultExt;
use std::{env::VarError, path::PathBuf, str::FromStr, sync::Arc};

const DEFAULT_SERVER_IP: &str = "0.0.0.0:80";
const DEFAULT_DATABASE_URL: &str = "sqlite://students.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

///`Ok(None)` if the variable just isn't set, so that defaults can kick in
fn optional_env_var(name: &'static str) -> BursarResult<Option<String>> {
    match var(name) {
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
        Err(source) => Err(source).context(BadEnvVarSnafu { name }),
    }
}

fn parsed_env_var<T: FromStr<Err = std::num::ParseIntError>>(
    name: &'static str,
    default: T,
) -> BursarResult<T> {
    match optional_env_var(name)? {
        Some(original) => original
            .trim()
            .parse()
            .context(ParseSizeSnafu { name, original }),
        None => Ok(default),
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    server_ip: String,
    db_config: Arc<DbConfig>,
    upload_config: Arc<UploadConfig>,
}

impl RuntimeConfiguration {
    pub fn new() -> BursarResult<Self> {
        Ok(Self {
            server_ip: optional_env_var("BURSAR_SERVER_IP")?
                .unwrap_or_else(|| DEFAULT_SERVER_IP.to_string()),
            db_config: Arc::new(DbConfig::new()?),
            upload_config: Arc::new(UploadConfig::new()?),
        })
    }

    #[cfg(test)]
    pub fn for_testing(database_url: String, upload_directory: PathBuf) -> Self {
        Self {
            server_ip: "127.0.0.1:0".to_string(),
            db_config: Arc::new(DbConfig {
                url: database_url,
                max_connections: DEFAULT_MAX_DB_CONNECTIONS,
            }),
            upload_config: Arc::new(UploadConfig {
                directory: upload_directory,
                max_bytes: 64 * 1024,
            }),
        }
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    pub fn db_config(&self) -> Arc<DbConfig> {
        self.db_config.clone()
    }

    pub fn upload_config(&self) -> Arc<UploadConfig> {
        self.upload_config.clone()
    }
}

#[derive(Debug)]
pub struct DbConfig {
    url: String,
    max_connections: u32,
}

impl DbConfig {
    pub fn new() -> BursarResult<Self> {
        Ok(Self {
            url: optional_env_var("BURSAR_DATABASE_URL")?
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parsed_env_var(
                "BURSAR_MAX_DB_CONNECTIONS",
                DEFAULT_MAX_DB_CONNECTIONS,
            )?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

#[derive(Debug)]
pub struct UploadConfig {
    directory: PathBuf,
    max_bytes: usize,
}

impl UploadConfig {
    pub fn new() -> BursarResult<Self> {
        Ok(Self {
            directory: optional_env_var("BURSAR_UPLOAD_DIR")?
                .map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from),
            max_bytes: parsed_env_var("BURSAR_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn create_directory(&self) -> BursarResult<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .context(CreateUploadDirSnafu {
                path: self.directory.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        assert_eq!(
            optional_env_var("BURSAR_TEST_DEFINITELY_UNSET").unwrap(),
            None
        );
        assert_eq!(
            parsed_env_var("BURSAR_TEST_DEFINITELY_UNSET_SIZE", 42_usize).unwrap(),
            42
        );
    }

    #[tokio::test]
    async fn upload_directory_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let config = RuntimeConfiguration::for_testing(String::new(), nested.clone());

        config.upload_config().create_directory().await.unwrap();
        config.upload_config().create_directory().await.unwrap();
        assert!(nested.is_dir());
    }
}
