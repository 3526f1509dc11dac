//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::Directory;
use crate::host::HostClient;
use crate::message::{Message, MessageAuthor};
use crate::model::{
    Member, MemberGuildSettings, PkMessage, System, SystemGuildSettings,
};
use crate::{PkError, Result, PLURALKIT_APPLICATION_ID};

#[derive(Default)]
pub struct MockDirectory {
    pub systems: HashMap<String, System>,
    pub members: HashMap<String, Vec<Member>>,
    pub messages: HashMap<String, PkMessage>,
    pub member_guilds: HashMap<(String, String), MemberGuildSettings>,
    pub system_guilds: HashMap<(String, String), SystemGuildSettings>,
    pub unavailable: bool,
    pub message_calls: AtomicUsize,
}

impl MockDirectory {
    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(PkError::RemoteUnavailable("offline".into()));
        }
        Ok(())
    }
}

fn found<T: Clone>(value: Option<&T>, what: &str) -> Result<T> {
    value
        .cloned()
        .ok_or_else(|| PkError::RemoteNotFound(what.to_owned()))
}

#[async_trait]
impl Directory for MockDirectory {
    async fn system(&self, id: &str) -> Result<System> {
        self.check()?;
        found(self.systems.get(id), id)
    }

    async fn system_members(&self, system_id: &str) -> Result<Vec<Member>> {
        self.check()?;
        found(self.members.get(system_id), system_id)
    }

    async fn member(&self, id: &str) -> Result<Member> {
        self.check()?;
        let member = self
            .members
            .values()
            .flatten()
            .find(|member| member.id == id);
        found(member, id)
    }

    async fn member_guild_settings(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<MemberGuildSettings> {
        self.check()?;
        let key = (member_id.to_owned(), guild_id.to_owned());
        found(self.member_guilds.get(&key), member_id)
    }

    async fn system_guild_settings(
        &self,
        system_id: &str,
        guild_id: &str,
    ) -> Result<SystemGuildSettings> {
        self.check()?;
        let key = (system_id.to_owned(), guild_id.to_owned());
        found(self.system_guilds.get(&key), system_id)
    }

    async fn message(&self, id: &str) -> Result<PkMessage> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        found(self.messages.get(id), id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Send { channel_id: String, content: String },
    React { channel_id: String, message_id: String, emoji: String },
    EndEdit { channel_id: String, message_id: String },
}

pub struct MockHost {
    pub user_id: String,
    pub calls: Mutex<Vec<HostCall>>,
}

impl MockHost {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostClient for MockHost {
    fn current_user_id(&self) -> String {
        self.user_id.clone()
    }

    fn send_message(&self, channel_id: &str, content: &str) {
        self.calls.lock().unwrap().push(HostCall::Send {
            channel_id: channel_id.to_owned(),
            content: content.to_owned(),
        });
    }

    fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) {
        self.calls.lock().unwrap().push(HostCall::React {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
            emoji: emoji.to_owned(),
        });
    }

    fn end_edit(&self, channel_id: &str, message_id: &str) {
        self.calls.lock().unwrap().push(HostCall::EndEdit {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
        });
    }
}

pub fn member(id: &str, name: &str) -> Member {
    Member {
        id: id.to_owned(),
        name: Some(name.to_owned()),
        ..Default::default()
    }
}

pub fn system(id: &str, tag: &str) -> System {
    System {
        id: id.to_owned(),
        name: Some(format!("System {}", id)),
        tag: Some(tag.to_owned()),
        ..Default::default()
    }
}

/// A message posted by the proxy webhook under `username`
pub fn proxied(id: &str, username: &str) -> Message {
    Message {
        id: id.to_owned(),
        channel_id: "700".to_owned(),
        guild_id: Some("900".to_owned()),
        content: "hello".to_owned(),
        application_id: Some(PLURALKIT_APPLICATION_ID.to_owned()),
        author: MessageAuthor {
            id: "webhook".to_owned(),
            username: username.to_owned(),
            avatar: Some(format!("{}-avatar", username)),
            ..Default::default()
        },
    }
}

/// A native message of the user `author_id`
pub fn native(id: &str, author_id: &str) -> Message {
    Message {
        id: id.to_owned(),
        channel_id: "700".to_owned(),
        guild_id: Some("900".to_owned()),
        content: "hi".to_owned(),
        application_id: None,
        author: MessageAuthor {
            id: author_id.to_owned(),
            username: format!("user{}", author_id),
            ..Default::default()
        },
    }
}

/// Directory entry for the proxied copy `id` sent by `member` of `system`
pub fn pk_message(id: &str, member: &Member, system: &System) -> PkMessage {
    PkMessage {
        id: id.to_owned(),
        original: Some(format!("{}-original", id)),
        sender: Some("42".to_owned()),
        channel: Some("700".to_owned()),
        guild: Some("900".to_owned()),
        member: Some(member.clone()),
        system: Some(system.clone()),
    }
}
