//! Plain HTTP page loading, used when no browser is available.

pub mod charset;
pub mod client;
pub mod errors;
pub mod types;

pub use client::{build_client, fetch_with};
pub use errors::FetchError;
pub use types::{Charset, PageResponse};
