use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type GuildId = String;

/// A plural system: the group of members sharing one proxying account
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct System {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pronouns: Option<String>,
    /// Hex colour without the leading `#`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub webhook_avatar_url: Option<String>,
}

/// Per-guild display overrides of a member
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MemberGuildSettings {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Per-guild display overrides of a system
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SystemGuildSettings {
    #[serde(default)]
    pub tag: Option<String>,
}

/// Message record as known to the PluralKit directory
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PkMessage {
    pub id: String,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub guild: Option<String>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub system: Option<System>,
}

/// The resolved identity behind a proxied message.
///
/// The JSON field names are shared with the persisted cache, so they must
/// stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub message_ids: Vec<String>,
    pub member: Member,
    pub system: System,
    #[serde(default)]
    pub guild_settings: HashMap<GuildId, MemberGuildSettings>,
    #[serde(default)]
    pub system_settings: HashMap<GuildId, SystemGuildSettings>,
}

impl Author {
    pub fn new(message_id: String, member: Member, system: System) -> Self {
        Self {
            message_ids: vec![message_id],
            member,
            system,
            guild_settings: HashMap::new(),
            system_settings: HashMap::new(),
        }
    }

    /// Author of a local system member, with no observed messages
    pub fn of_member(member: Member, system: System) -> Self {
        Self {
            message_ids: Vec::new(),
            member,
            system,
            guild_settings: HashMap::new(),
            system_settings: HashMap::new(),
        }
    }

    /// An author whose member and system are not known yet
    pub fn is_placeholder(&self) -> bool {
        self.member.id.is_empty()
    }

    /// Append a message id unless it was already observed.
    /// Returns `true` if the author changed.
    pub fn record(&mut self, message_id: &str) -> bool {
        if self.message_ids.iter().any(|id| id == message_id) {
            return false;
        }
        self.message_ids.push(message_id.to_owned());
        true
    }

    pub fn member_overrides(&self, guild: Option<&str>) -> Option<&MemberGuildSettings> {
        guild.and_then(|guild| self.guild_settings.get(guild))
    }

    pub fn system_overrides(&self, guild: Option<&str>) -> Option<&SystemGuildSettings> {
        guild.and_then(|guild| self.system_settings.get(guild))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ignores_known_ids() {
        let mut author = Author::default();
        assert!(author.record("1"));
        assert!(author.record("2"));
        assert!(!author.record("1"));
        assert!(!author.record("2"));
        assert_eq!(author.message_ids, vec!["1", "2"]);
    }

    #[test]
    fn pk_message_tolerates_unknown_fields() {
        let json = r#"{
            "timestamp": "2024-01-01T00:00:00Z",
            "id": "1100",
            "original": "1099",
            "sender": "42",
            "channel": "7",
            "guild": "9",
            "system": {"id": "abcde", "name": "Sys", "tag": "| S", "created": "x"},
            "member": {"id": "fghij", "name": "Ash", "display_name": null, "color": "ff0000", "keep_proxy": false}
        }"#;
        let message: PkMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.guild.as_deref(), Some("9"));
        let member = message.member.unwrap();
        assert_eq!(member.id, "fghij");
        assert_eq!(member.display_name, None);
        assert_eq!(message.system.unwrap().tag.as_deref(), Some("| S"));
    }

    #[test]
    fn author_uses_camel_case_keys() {
        let author = Author::new("1".into(), Member::default(), System::default());
        let json = serde_json::to_value(&author).unwrap();
        assert!(json.get("messageIds").is_some());
        assert!(json.get("guildSettings").is_some());
        assert!(json.get("systemSettings").is_some());
    }
}
