use std::sync::Arc;

use crate::cache::AuthorCache;
use crate::host::{EditDecision, HostClient, MessageAction};
use crate::message::Message;
use crate::snapshot::LocalSystem;

/// Command prefix the proxying bot reads as "edit this message"
pub const EDIT_COMMAND: &str = "pk;e";
/// Reaction the proxying bot reads as "delete this message"
pub const DELETE_EMOJI: &str = "❌";

const MESSAGE_LINK_BASE: &str = "https://discord.com/channels";
const DIRECT_MESSAGES: &str = "@me";

/// Lets the current user edit and delete messages the proxying bot posted
/// on their behalf.
pub struct EditBridge {
    cache: AuthorCache,
    local: Arc<LocalSystem>,
    host: Arc<dyn HostClient>,
    edit_channel: Option<String>,
}

impl EditBridge {
    pub fn new(
        cache: AuthorCache,
        local: Arc<LocalSystem>,
        host: Arc<dyn HostClient>,
        edit_channel: Option<String>,
    ) -> Self {
        Self {
            cache,
            local,
            host,
            edit_channel,
        }
    }

    pub fn set_edit_channel(&mut self, edit_channel: Option<String>) {
        self.edit_channel = edit_channel;
    }

    pub fn is_own_proxied(&self, message: &Message) -> bool {
        self.local.is_own(message, &self.cache)
    }

    pub fn can_edit(&self, message: &Message) -> bool {
        self.is_own_proxied(message)
            || message.author.id == self.host.current_user_id()
    }

    /// Affordances the host should offer for a message
    pub fn actions(&self, message: &Message) -> Vec<MessageAction> {
        if self.can_edit(message) {
            vec![MessageAction::Edit, MessageAction::Delete]
        } else {
            Vec::new()
        }
    }

    /// Most recent message the user may edit, for the up-arrow shortcut.
    /// `messages` is in channel order, oldest first.
    pub fn last_editable<'a>(&self, messages: &'a [Message]) -> Option<&'a Message> {
        messages
            .iter()
            .rev()
            .find(|message| self.can_edit(message))
    }

    /// Ask the proxying bot to replace the content of `message`
    pub fn request_edit(&self, message: &Message, new_content: &str) {
        let command = edit_command(message, new_content);
        let channel = self
            .edit_channel
            .as_deref()
            .unwrap_or(&message.channel_id);

        log::debug!("forwarding edit of {} to channel {}", message.id, channel);
        self.host.send_message(channel, &command);
        self.host
            .end_edit(&message.channel_id, &message.id);
    }

    /// Ask the proxying bot to delete `message`
    pub fn request_delete(&self, message: &Message) {
        log::debug!("requesting deletion of {}", message.id);
        self.host
            .add_reaction(&message.channel_id, &message.id, DELETE_EMOJI);
    }

    /// Hook run before the host edits a message itself. Only messages
    /// proxied for the local system are forwarded to the proxying bot.
    pub fn intercept_edit(
        &self,
        message: &Message,
        new_content: &str,
    ) -> EditDecision {
        if !self.is_own_proxied(message) {
            return EditDecision::Proceed;
        }
        self.request_edit(message, new_content);
        EditDecision::Cancel
    }
}

/// `pk;e <message link> <content>`
pub fn edit_command(message: &Message, new_content: &str) -> String {
    format!(
        "{} {}/{}/{}/{} {}",
        EDIT_COMMAND,
        MESSAGE_LINK_BASE,
        message
            .guild_id
            .as_deref()
            .unwrap_or(DIRECT_MESSAGES),
        message.channel_id,
        message.id,
        new_content
    )
}
