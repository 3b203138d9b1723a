pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod qr;
pub mod reconcile;
pub mod retry;
pub mod services;
pub mod session;
pub mod storage;
pub mod traits;
pub mod wishlist;

#[cfg(test)]
mod testing;

pub use cart::{CartSync, LocalCart};
pub use config::{RemovePolicy, SyncConfig};
pub use error::{ConfigError, Result, ScanError, StorageError, SyncError};
pub use http::{HttpRemote, HttpRemoteBuilder};
pub use qr::resolve_scan;
pub use reconcile::{CartChange, Escalation, EscalationAttempt, ReconcileReport, Reconciler};
pub use retry::RetryPolicy;
pub use services::{Services, ServicesBuilder};
pub use session::Session;
pub use storage::{KeyValueStore, LocalCache, MemoryStore};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
#[cfg(target_arch = "wasm32")]
pub use storage::WebStorage;
pub use traits::RemoteApi;
pub use wishlist::WishlistSync;
