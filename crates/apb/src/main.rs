use std::sync::Arc;

use apb_core::{
    catalog::{CatalogStore, SeedListing},
    config::Config,
};

#[tokio::main]
async fn main() -> Result<(), apb_core::Error> {
    apb_core::logging::init("apb")?;

    let cfg = Arc::new(Config::load()?);

    let seed: Vec<SeedListing> = match &cfg.seed_file {
        Some(path) => {
            let seed = CatalogStore::load_seed_file(path)?;
            tracing::info!(path = %path.display(), count = seed.len(), "loaded seed listings");
            seed
        }
        None => Vec::new(),
    };
    let catalog = Arc::new(CatalogStore::with_listings(seed)?);

    apb_telegram::router::run_polling(cfg, catalog)
        .await
        .map_err(|e| apb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
