//! Google Drive integration: folder listing, downloads and OAuth access.

pub mod auth;
pub mod client;
pub mod listing;
pub mod types;

pub use auth::{AuthError, ClientSecrets, DriveAuthenticator};
pub use client::{DocumentSource, DriveService};
pub use types::{DriveError, DriveFile, RemoteDocumentListing};
