use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use archstor_core::{Cursor, ObjectId, StorageError};

use crate::config::AppConfig;
use crate::progress::create_spinner;

const PROBE_ID: &str = "archstor-check";

#[derive(Args)]
pub struct CheckArgs {
    /// Skip the listing probe
    #[arg(long)]
    no_list: bool,
}

pub async fn run(args: CheckArgs, config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let kind = config.backend.kind();

    let spinner = create_spinner(&format!("Connecting to {kind} backend..."));
    let backend = match config.open_backend().await {
        Ok(backend) => backend,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    spinner.set_message("Probing object lookup...");
    let probe = ObjectId::parse(PROBE_ID)?;
    let exists = backend.exists(&probe).await;

    let listing = if !args.no_list {
        spinner.set_message("Fetching first listing page...");
        Some(backend.list_ids(&Cursor::initial(), 1).await)
    } else {
        None
    };
    spinner.finish_and_clear();

    match exists {
        Ok(_) => println!("Lookup:  ok"),
        Err(StorageError::FunctionalityOmitted(msg)) => println!("Lookup:  not supported ({msg})"),
        Err(e) => anyhow::bail!("{kind} backend failed lookup probe: {e}"),
    }
    match listing {
        Some(Ok(page)) => println!(
            "Listing: ok ({} on first page, more: {})",
            page.ids.len(),
            page.next_cursor.is_some()
        ),
        Some(Err(StorageError::FunctionalityOmitted(_))) => println!("Listing: not supported"),
        Some(Err(e)) => anyhow::bail!("{kind} backend failed listing probe: {e}"),
        None => {}
    }

    info!(backend = backend.name(), "Backend check passed");
    println!("Backend '{kind}' is ready.");
    Ok(())
}
