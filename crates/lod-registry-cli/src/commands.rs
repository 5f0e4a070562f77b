//! Subcommands and registry wiring

use anyhow::{Context, Result};
use clap::Subcommand;
use lod_registry_db::{
    ChainStore, CollectionCatalog, EventStore, InMemoryCatalog, InMemoryChainStore,
    InMemoryEventStore, JsonFileChainStore, JsonLinesEventStore, OpenCatalog,
};
use lod_registry_service::{
    parse_collection_id, AssetRef, ChainView, DefaultLodChainRegistry, EventPage,
    LodChainRegistry, RegisterAssetRequest, RelevelAssetRequest,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{CliConfig, StorageBackend};

/// Registry operations
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the chain of a collection
    Get { collection: String },

    /// Register an asset at a level
    Register {
        collection: String,
        asset: String,
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Remove an asset from a chain
    Remove { collection: String, asset: String },

    /// Move a registered asset to another level
    Relevel {
        collection: String,
        asset: String,
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Drop a collection's chain, e.g. after the collection was deleted
    Clear { collection: String },

    /// List collections holding a non-empty chain
    List,

    /// Show recent mutation events of a collection
    Events {
        collection: String,
        /// Maximum number of events
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Check that chain storage is reachable
    Health,
}

/// File name of the event log inside the chain directory
pub const EVENT_LOG_FILE: &str = "events.jsonl";

/// Build the registry described by the configuration
pub async fn build_registry(config: &CliConfig) -> Result<Arc<dyn LodChainRegistry>> {
    let (store, event_store): (Arc<dyn ChainStore>, Arc<dyn EventStore>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                warn!("Memory backend selected: changes are discarded when lodctl exits");
                (
                    Arc::new(InMemoryChainStore::new()),
                    Arc::new(InMemoryEventStore::new(config.registry.event_capacity)),
                )
            }
            StorageBackend::JsonFile => {
                let store = JsonFileChainStore::open(&config.storage.path)
                    .await
                    .context("Failed to open chain store")?;
                let events = JsonLinesEventStore::open(config.storage.path.join(EVENT_LOG_FILE))
                    .await
                    .context("Failed to open event log")?;
                (Arc::new(store), Arc::new(events))
            }
        };

    let catalog: Arc<dyn CollectionCatalog> = match &config.catalog.manifest {
        Some(path) => Arc::new(
            InMemoryCatalog::from_json_file(path)
                .await
                .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        ),
        None => Arc::new(OpenCatalog),
    };

    info!(
        backend = ?config.storage.backend,
        catalog = config.catalog.manifest.is_some(),
        "Registry wired"
    );

    let registry = DefaultLodChainRegistry::builder()
        .catalog(catalog)
        .store(store)
        .event_store(event_store)
        .config(config.registry.clone())
        .build()
        .context("Invalid registry configuration")?;

    Ok(Arc::new(registry))
}

/// Run one command and return its JSON output
pub async fn run(registry: &dyn LodChainRegistry, command: Command) -> Result<Value> {
    let output = match command {
        Command::Get { collection } => {
            let collection_id = parse_collection_id(&collection)?;
            let chain = registry.get_chain(&collection_id).await?;
            serde_json::to_value(ChainView::from(&chain))?
        }
        Command::Register {
            collection,
            asset,
            level,
        } => {
            let (collection_id, asset_id, level) =
                RegisterAssetRequest::new(collection, asset, level).parse()?;
            let chain = registry
                .register_asset(&collection_id, &asset_id, level)
                .await?;
            serde_json::to_value(ChainView::from(&chain))?
        }
        Command::Remove { collection, asset } => {
            let (collection_id, asset_id) = AssetRef::new(collection, asset).parse()?;
            let chain = registry.remove_asset(&collection_id, &asset_id).await?;
            serde_json::to_value(ChainView::from(&chain))?
        }
        Command::Relevel {
            collection,
            asset,
            level,
        } => {
            let (collection_id, asset_id, to) =
                RelevelAssetRequest::new(collection, asset, level).parse()?;
            let chain = registry
                .relevel_asset(&collection_id, &asset_id, to)
                .await?;
            serde_json::to_value(ChainView::from(&chain))?
        }
        Command::Clear { collection } => {
            let collection_id = parse_collection_id(&collection)?;
            registry.clear(&collection_id).await?;
            json!({ "collection_id": collection_id, "cleared": true })
        }
        Command::List => {
            let collections = registry.list_collections().await?;
            json!({ "collections": collections })
        }
        Command::Events { collection, limit } => {
            let collection_id = parse_collection_id(&collection)?;
            let events = registry.collection_events(&collection_id, limit).await?;
            serde_json::to_value(EventPage {
                collection_id,
                events,
            })?
        }
        Command::Health => {
            registry.health_check().await?;
            json!({ "status": "ok" })
        }
    };

    Ok(output)
}
