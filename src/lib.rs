//! PluralKit integration for a chat client.
//!
//! Messages posted by the PluralKit bot through webhooks are matched back to
//! the member and system that sent them, so the client can show templated
//! names and let the user edit or delete their own proxied messages.

pub mod api;
pub mod bridge;
pub mod cache;
pub mod config;
mod errors;
pub mod host;
pub mod message;
pub mod model;
pub mod plugin;
pub mod snapshot;
pub mod storage;
pub mod template;

#[cfg(test)]
mod mock;

pub use errors::{PkError, Result};
pub use plugin::{PluralKit, Toast};

/// Application id of the PluralKit bot
pub const PLURALKIT_APPLICATION_ID: &str = "466378653216014359";

pub const API_URL: &str = "https://api.pluralkit.me/v2/";
pub const API_USER_AGENT: &str =
    concat!("pklib/", env!("CARGO_PKG_VERSION"));

/// Storage key of the resolved authors
pub const AUTHORS_KEY: &str = "pk";
/// Storage key of the local system snapshot
pub const LOCAL_SYSTEM_KEY: &str = "data";
pub const SETTINGS_KEY: &str = "settings";
