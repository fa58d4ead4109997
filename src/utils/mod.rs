pub mod cache;
pub mod clock;
pub mod logger;
pub mod toggle;
pub mod width;

pub use cache::{CacheError, CacheRead, Caches, Scope, Store, INFINITE};
pub use clock::*;
pub use logger::*;
pub use width::*;
