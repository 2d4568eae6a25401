use std::path::Path;

use anyhow::{Result, anyhow};
use clap::Args;
use tracing::info;

use archstor_core::backend::document::gridfs::DEFAULT_DATABASE;
use archstor_core::backend::local::FilesystemBackend;
use archstor_swift::backend::DEFAULT_CONTAINER;

use crate::config::{AppConfig, BackendConfig};
use crate::progress::create_spinner;

#[derive(Args)]
pub struct InitArgs {
    /// Backend type: document, filesystem, cloud, distributed or none
    #[arg(long)]
    backend: String,

    /// Address the server listens on
    #[arg(long)]
    bind: Option<String>,

    /// Connection URI for the document backend
    #[arg(long)]
    uri: Option<String>,

    /// Database name for the document backend
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: String,

    /// Root directory for the filesystem backend
    #[arg(long)]
    root: Option<String>,

    /// S3 endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// S3 bucket name
    #[arg(long)]
    bucket: Option<String>,

    /// S3 region
    #[arg(long, default_value = "auto")]
    region: String,

    /// S3 access key
    #[arg(long)]
    access_key: Option<String>,

    /// S3 secret key
    #[arg(long)]
    secret_key: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long)]
    prefix: Option<String>,

    /// Swift v1 auth endpoint
    #[arg(long)]
    auth_url: Option<String>,

    /// Swift user, as `account:user`
    #[arg(long)]
    user: Option<String>,

    /// Swift key
    #[arg(long)]
    key: Option<String>,

    /// Swift container
    #[arg(long, default_value = DEFAULT_CONTAINER)]
    container: String,

    /// Write the config without contacting the backend
    #[arg(long)]
    offline: bool,

    /// Replace an existing config file
    #[arg(long)]
    force: bool,
}

fn required(value: Option<String>, flag: &str, backend: &str) -> Result<String> {
    value.ok_or_else(|| anyhow!("--{flag} required for {backend} backend"))
}

fn backend_config(args: InitArgs) -> Result<BackendConfig> {
    let config = match args.backend.as_str() {
        "document" => BackendConfig::Document {
            uri: required(args.uri, "uri", "document")?,
            database: args.database,
        },
        "filesystem" => BackendConfig::Filesystem {
            root: required(args.root, "root", "filesystem")?,
        },
        "cloud" => BackendConfig::Cloud {
            endpoint: required(args.endpoint, "endpoint", "cloud")?,
            region: args.region,
            bucket: required(args.bucket, "bucket", "cloud")?,
            access_key: required(args.access_key, "access-key", "cloud")?,
            secret_key: required(args.secret_key, "secret-key", "cloud")?,
            prefix: args.prefix,
        },
        "distributed" => BackendConfig::Distributed {
            auth_url: required(args.auth_url, "auth-url", "distributed")?,
            user: required(args.user, "user", "distributed")?,
            key: required(args.key, "key", "distributed")?,
            container: args.container,
        },
        "none" => BackendConfig::Unconfigured,
        other => anyhow::bail!(
            "unknown backend: {other} (supported: document, filesystem, cloud, distributed, none)"
        ),
    };
    Ok(config)
}

pub async fn run(args: InitArgs, config_path: &Path) -> Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "config already exists at {} (use --force to replace it)",
            config_path.display()
        );
    }

    let offline = args.offline;
    let bind = args.bind.clone();
    let mut config = AppConfig::new(backend_config(args)?);
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    if let BackendConfig::Filesystem { root } = &config.backend {
        FilesystemBackend::init(root)?;
    } else if !offline {
        // Bootstraps the bucket or container where the backend needs one.
        let kind = config.backend.kind();
        let spinner = create_spinner(&format!("Connecting to {kind} backend..."));
        let opened = config.open_backend().await;
        spinner.finish_and_clear();
        opened?;
    }

    config.save(config_path)?;

    info!(
        config_path = %config_path.display(),
        backend = config.backend.kind(),
        "Storage configured. Config saved."
    );
    println!("Storage configured with the {} backend.", config.backend.kind());
    println!("Config: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: InitArgs,
    }

    fn parse(argv: &[&str]) -> InitArgs {
        TestCli::parse_from(std::iter::once("init").chain(argv.iter().copied())).args
    }

    #[test]
    fn distributed_requires_credentials() {
        let args = parse(&["--backend", "distributed", "--auth-url", "http://swift/auth/v1.0"]);
        let err = backend_config(args).unwrap_err();
        assert!(err.to_string().contains("--user"));
    }

    #[test]
    fn cloud_keeps_prefix() {
        let args = parse(&[
            "--backend",
            "cloud",
            "--endpoint",
            "http://127.0.0.1:9000",
            "--bucket",
            "lts",
            "--access-key",
            "ak",
            "--secret-key",
            "sk",
            "--prefix",
            "objects",
        ]);
        match backend_config(args).unwrap() {
            BackendConfig::Cloud { prefix, region, .. } => {
                assert_eq!(prefix.as_deref(), Some("objects"));
                assert_eq!(region, "auto");
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(backend_config(parse(&["--backend", "tape"])).is_err());
    }

    #[tokio::test]
    async fn filesystem_init_creates_root_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let config_path = dir.path().join("archstor.toml");
        let args = parse(&["--backend", "filesystem", "--root", root.to_str().unwrap()]);

        run(args, &config_path).await.unwrap();
        assert!(root.is_dir());
        let config = AppConfig::load(&config_path).unwrap();
        assert_eq!(config.backend.kind(), "filesystem");

        let again = parse(&["--backend", "none"]);
        assert!(run(again, &config_path).await.is_err());
    }
}
