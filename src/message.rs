use serde::{Deserialize, Serialize};

use crate::PLURALKIT_APPLICATION_ID;

const FINGERPRINT_SEPARATOR: &str = "##";

/// Visible author of a chat message, as reported by the host client
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageAuthor {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub nick: Option<String>,
}

impl MessageAuthor {
    /// Name the host would show for a native message
    pub fn display_name(&self) -> &str {
        self.nick
            .as_deref()
            .or(self.global_name.as_deref())
            .unwrap_or(&self.username)
    }
}

/// Chat message consumed by the resolver, renderer and bridge
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    /// `None` for direct messages
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub application_id: Option<String>,
    pub author: MessageAuthor,
}

impl Message {
    /// Whether the message was posted by the proxying bot
    pub fn is_proxied(&self) -> bool {
        self.application_id.as_deref() == Some(PLURALKIT_APPLICATION_ID)
    }

    /// Cache key of the proxied author.
    ///
    /// The proxy webhook reuses the same username and avatar for every
    /// message of a member, so the pair identifies the member.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}{}{}",
            self.author.username,
            FINGERPRINT_SEPARATOR,
            self.author.avatar.as_deref().unwrap_or_default()
        )
    }
}
