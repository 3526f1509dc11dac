/// The chat client the integration runs inside.
///
/// All calls are fire-and-forget: their outcome is only visible through
/// whatever the proxying bot does with them.
pub trait HostClient: Send + Sync {
    /// Id of the logged-in user
    fn current_user_id(&self) -> String;

    /// Post a plain chat message as the current user
    fn send_message(&self, channel_id: &str, content: &str);

    /// React to a message as the current user
    fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str);

    /// Leave the inline edit mode the host opened for a message
    fn end_edit(&self, channel_id: &str, message_id: &str);
}

/// Message-level action the host shows in its popover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAction {
    Edit,
    Delete,
}

impl MessageAction {
    pub fn label(&self) -> &'static str {
        match self {
            MessageAction::Edit => "Edit",
            MessageAction::Delete => "Delete",
        }
    }
}

/// Answer to the host's pre-edit hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditDecision {
    /// Let the host edit the message itself
    Proceed,
    /// The edit was forwarded to the proxying bot, the host must not send it
    Cancel,
}
