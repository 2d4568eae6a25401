use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use archstor_api::ApiSettings;
use archstor_core::StorageBackend;
use archstor_core::backend::document::gridfs::DEFAULT_DATABASE;
use archstor_core::backend::document::{DocumentStoreBackend, GridFsStore};
use archstor_core::backend::local::FilesystemBackend;
use archstor_core::backend::s3::CloudObjectBackend;
use archstor_core::backend::unconfigured::UnconfiguredBackend;
use archstor_core::cursor::DEFAULT_MAX_LIMIT;
use archstor_core::stream::DEFAULT_BUFFER_SIZE;
use archstor_swift::backend::DEFAULT_CONTAINER;
use archstor_swift::{Credentials, DistributedObjectBackend};

const CONFIG_FILE: &str = "archstor.toml";
const DEFAULT_BIND: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// 0 disables the request body limit.
    #[serde(default)]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            max_limit: default_max_limit(),
            max_upload_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    #[serde(rename = "document")]
    Document {
        uri: String,
        #[serde(default = "default_database")]
        database: String,
    },
    #[serde(rename = "filesystem")]
    Filesystem { root: String },
    #[serde(rename = "cloud")]
    Cloud {
        endpoint: String,
        region: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        prefix: Option<String>,
    },
    #[serde(rename = "distributed")]
    Distributed {
        auth_url: String,
        user: String,
        key: String,
        #[serde(default = "default_container")]
        container: String,
    },
    #[serde(rename = "none")]
    Unconfigured,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Document { .. } => "document",
            Self::Filesystem { .. } => "filesystem",
            Self::Cloud { .. } => "cloud",
            Self::Distributed { .. } => "distributed",
            Self::Unconfigured => "none",
        }
    }
}

impl AppConfig {
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            backend,
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("archstor")
            .join(CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("config not found at {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.storage.buffer_size == 0 {
            anyhow::bail!("storage.buffer_size must be positive");
        }
        if config.storage.max_limit == 0 {
            anyhow::bail!("storage.max_limit must be positive");
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            buffer_size: self.storage.buffer_size,
            max_limit: self.storage.max_limit,
            max_upload_bytes: (self.storage.max_upload_bytes > 0)
                .then_some(self.storage.max_upload_bytes),
        }
    }

    /// Build the configured backend, running its bootstrap (connectivity
    /// check, bucket or container creation).
    pub async fn open_backend(&self) -> Result<Arc<dyn StorageBackend>> {
        let buffer_size = self.storage.buffer_size;
        let backend: Arc<dyn StorageBackend> = match &self.backend {
            BackendConfig::Document { uri, database } => {
                let store = GridFsStore::connect(uri, database)
                    .await
                    .with_context(|| format!("failed to connect to document store {database}"))?
                    .with_buffer_size(buffer_size);
                Arc::new(DocumentStoreBackend::new(store).with_buffer_size(buffer_size))
            }
            BackendConfig::Filesystem { root } => {
                Arc::new(FilesystemBackend::new(root).with_buffer_size(buffer_size))
            }
            BackendConfig::Cloud {
                endpoint,
                region,
                bucket,
                access_key,
                secret_key,
                prefix,
            } => {
                let backend = CloudObjectBackend::new(
                    bucket,
                    endpoint,
                    region,
                    access_key,
                    secret_key,
                    prefix.as_deref(),
                )
                .await
                .with_context(|| format!("failed to open bucket {bucket}"))?;
                Arc::new(backend.with_buffer_size(buffer_size))
            }
            BackendConfig::Distributed {
                auth_url,
                user,
                key,
                container,
            } => {
                let credentials = Credentials {
                    auth_url: auth_url.clone(),
                    user: user.clone(),
                    key: key.clone(),
                };
                let backend = DistributedObjectBackend::new(credentials, container)
                    .await
                    .with_context(|| format!("failed to open container {container}"))?;
                Arc::new(backend.with_buffer_size(buffer_size))
            }
            BackendConfig::Unconfigured => Arc::new(UnconfiguredBackend),
        };
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = AppConfig::parse(
            r#"
            [backend]
            type = "filesystem"
            root = "/srv/lts"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.storage.buffer_size, 8192);
        assert_eq!(config.storage.max_limit, 1000);
        assert_eq!(config.api_settings().max_upload_bytes, None);
        assert_eq!(config.backend.kind(), "filesystem");
    }

    #[test]
    fn document_backend_defaults_database() {
        let config = AppConfig::parse(
            r#"
            [storage]
            buffer_size = 1024
            max_upload_bytes = 1048576

            [backend]
            type = "document"
            uri = "mongodb://localhost:27017"
            "#,
        )
        .unwrap();
        match &config.backend {
            BackendConfig::Document { database, .. } => assert_eq!(database, "lts"),
            other => panic!("unexpected backend {other:?}"),
        }
        let settings = config.api_settings();
        assert_eq!(settings.buffer_size, 1024);
        assert_eq!(settings.max_upload_bytes, Some(1_048_576));
    }

    #[test]
    fn none_backend_parses() {
        let config = AppConfig::parse("[backend]\ntype = \"none\"\n").unwrap();
        assert_eq!(config.backend.kind(), "none");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(AppConfig::parse("[backend]\ntype = \"s4\"\n").is_err());
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let err = AppConfig::parse("[storage]\nbuffer_size = 0\n[backend]\ntype = \"none\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = AppConfig::new(BackendConfig::Distributed {
            auth_url: "http://127.0.0.1:12345/auth/v1.0".into(),
            user: "test:tester".into(),
            key: "secret".into(),
            container: "testing".into(),
        });
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.backend.kind(), "distributed");
        assert_eq!(loaded.server.bind, config.server.bind);
    }

    #[tokio::test]
    async fn filesystem_backend_opens_without_io() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::new(BackendConfig::Filesystem {
            root: dir.path().display().to_string(),
        });
        let backend = config.open_backend().await.unwrap();
        assert_eq!(backend.name(), "filesystem");
    }
}
