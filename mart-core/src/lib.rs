//! mart-core: shared building blocks for campus-mart.

pub mod config;
pub mod context;
pub mod errors;

pub use config::{ConfigSnapshot, MartConfig};
pub use context::{OwnerId, RequestContext};
pub use errors::{ErrorKind, MartError, MartResult};
