use serde::{Deserialize, Serialize};

use crate::storage::Storage;
use crate::{Result, API_URL, SETTINGS_KEY};

pub const DEFAULT_DISPLAY: &str = "{name}{tag}";

/// User-facing options of the integration.
///
/// Stored as one JSON document under [`SETTINGS_KEY`]; missing fields fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Paint proxied names with the member colour
    pub color_names: bool,
    /// Template for authors from other systems
    pub display_other: String,
    /// Template for authors from the local system, `displayOther` when empty
    pub display_local: String,
    /// Channel receiving edit commands instead of the message's own channel
    pub edit_message_channel: Option<String>,
    pub api_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color_names: false,
            display_other: DEFAULT_DISPLAY.to_owned(),
            display_local: String::new(),
            edit_message_channel: None,
            api_url: API_URL.to_owned(),
        }
    }
}

impl Settings {
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        match storage.get(SETTINGS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        storage.set(SETTINGS_KEY, serde_json::to_string(self)?)
    }

    /// Template used to display a proxied author
    pub fn template_for(&self, own_system: bool) -> &str {
        if own_system && !self.display_local.is_empty() {
            &self.display_local
        } else {
            &self.display_other
        }
    }
}
