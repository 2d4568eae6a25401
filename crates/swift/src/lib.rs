pub mod auth;
pub mod backend;
pub mod client;
pub mod error;

pub use auth::Credentials;
pub use backend::DistributedObjectBackend;
pub use client::SwiftClient;
pub use error::SwiftError;
