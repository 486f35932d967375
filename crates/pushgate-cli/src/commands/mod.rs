pub mod create_admin;
pub mod info;
pub mod secret;
pub mod serve;

use std::sync::Arc;

use anyhow::Context;

use pushgate_core::db::adapter::Adapter;
use pushgate_core::options::PushgateOptions;
use pushgate_memory::MemoryAdapter;
use pushgate_mongodb::MongoAdapter;

/// MongoDB when `MONGODB_URI` is set, otherwise the in-memory store.
pub async fn open_adapter(options: &PushgateOptions) -> anyhow::Result<Arc<dyn Adapter>> {
    match &options.database.uri {
        Some(uri) => {
            let adapter = MongoAdapter::connect(uri, &options.database.name)
                .await
                .with_context(|| format!("connecting to MongoDB database {}", options.database.name))?;
            Ok(Arc::new(adapter))
        }
        None => {
            tracing::warn!("MONGODB_URI not set; using the in-memory store, data is lost on exit");
            Ok(Arc::new(MemoryAdapter::new()))
        }
    }
}
