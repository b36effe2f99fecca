use std::sync::Arc;
use async_trait::async_trait;
use an_core::{ArticleStorage, Error, Result};
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: ArticleStorage + Sized {
    fn get_error_message() -> &'static str;

    async fn open(url: &str) -> Result<Self>;
}

/// Build a storage handle by backend name (`sqlite` or `memory`).
pub async fn create_storage(kind: &str, url: &str) -> Result<Arc<dyn ArticleStorage>> {
    let storage: Arc<dyn ArticleStorage> = match kind {
        #[cfg(feature = "sqlite")]
        "sqlite" => Arc::new(open_backend::<SQLiteStorage>(url).await?),
        "memory" => Arc::new(open_backend::<InMemoryStorage>(url).await?),
        other => {
            return Err(Error::Config(format!(
                "Unknown storage backend '{}'. Available: {}",
                other,
                available_backends().join(", ")
            )))
        }
    };
    info!("💾 Storage ready (using {})", kind);
    Ok(storage)
}

async fn open_backend<T: StorageBackend>(url: &str) -> Result<T> {
    T::open(url).await.map_err(|e| {
        Error::Storage(format!("{} ({})", e, T::get_error_message()))
    })
}

pub fn available_backends() -> Vec<&'static str> {
    let mut names = vec!["memory"];
    if cfg!(feature = "sqlite") {
        names.push("sqlite");
    }
    names
}

pub mod prelude {
    pub use super::{create_storage, StorageBackend};
    pub use super::backends::*;
}
