//! Display-name templates.
//!
//! A template is plain text with placeholders such as `{name}` or
//! `{systemName}`. Placeholder names match case-insensitively; anything in
//! braces that is not a known placeholder is kept verbatim. Substituted
//! values are never scanned again.

use std::sync::Arc;

use crate::cache::AuthorCache;
use crate::config::Settings;
use crate::message::Message;
use crate::model::Author;
use crate::snapshot::LocalSystem;

/// Name colour used for proxied authors without a member colour
pub const DEFAULT_NAME_COLOR: &str = "666666";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Tag,
    Name,
    MemberId,
    Pronouns,
    SystemId,
    SystemName,
    Color,
    Avatar,
    MessageCount,
    SystemMessageCount,
}

impl Token {
    pub const ALL: [Token; 10] = [
        Token::Tag,
        Token::Name,
        Token::MemberId,
        Token::Pronouns,
        Token::SystemId,
        Token::SystemName,
        Token::Color,
        Token::Avatar,
        Token::MessageCount,
        Token::SystemMessageCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Tag => "tag",
            Token::Name => "name",
            Token::MemberId => "memberId",
            Token::Pronouns => "pronouns",
            Token::SystemId => "systemId",
            Token::SystemName => "systemName",
            Token::Color => "color",
            Token::Avatar => "avatar",
            Token::MessageCount => "messageCount",
            Token::SystemMessageCount => "systemMessageCount",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|token| token.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Token),
}

/// A parsed display template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let placeholder = after.find('}').and_then(|close| {
                Token::from_name(&after[..close]).map(|token| (token, close))
            });

            match placeholder {
                Some((token, close)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(
                            &mut literal,
                        )));
                    }
                    segments.push(Segment::Placeholder(token));
                    rest = &after[close + 1..];
                }
                None => {
                    // Not a placeholder, the next brace may start one
                    literal.push('{');
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Token> + '_ {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(token) => Some(*token),
                Segment::Literal(_) => None,
            })
    }

    pub fn render(&self, fields: &DisplayFields) -> String {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(token) => {
                    output.push_str(&fields.value(*token))
                }
            }
        }
        output
    }
}

/// First value present among layers ordered from most to least specific
fn layered<'a, const N: usize>(layers: [Option<&'a String>; N]) -> String {
    layers
        .into_iter()
        .flatten()
        .next()
        .cloned()
        .unwrap_or_default()
}

/// Values substituted for each placeholder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFields {
    pub tag: String,
    pub name: String,
    pub member_id: String,
    pub pronouns: String,
    pub system_id: String,
    pub system_name: String,
    /// Member colour, empty when the member has none
    pub color: String,
    pub avatar: String,
    pub message_count: usize,
    pub system_message_count: usize,
}

impl DisplayFields {
    /// Resolve every field of `author` as shown in `guild`.
    ///
    /// Guild overrides win over the member and system defaults.
    pub fn resolve(
        author: &Author,
        guild: Option<&str>,
        system_message_count: usize,
    ) -> Self {
        let member_overrides = author.member_overrides(guild);
        let system_overrides = author.system_overrides(guild);
        let (member, system) = (&author.member, &author.system);

        Self {
            tag: layered([
                system_overrides.and_then(|o| o.tag.as_ref()),
                system.tag.as_ref(),
            ]),
            name: layered([
                member_overrides.and_then(|o| o.display_name.as_ref()),
                member.display_name.as_ref(),
                member.name.as_ref(),
            ]),
            member_id: member.id.clone(),
            pronouns: layered([member.pronouns.as_ref()]),
            system_id: system.id.clone(),
            system_name: layered([system.name.as_ref()]),
            color: layered([member.color.as_ref()]),
            avatar: layered([
                member_overrides.and_then(|o| o.avatar_url.as_ref()),
                member.avatar_url.as_ref(),
                member.webhook_avatar_url.as_ref(),
                system.avatar_url.as_ref(),
            ]),
            message_count: author.message_ids.len(),
            system_message_count,
        }
    }

    pub fn value(&self, token: Token) -> String {
        match token {
            Token::Tag => self.tag.clone(),
            Token::Name => self.name.clone(),
            Token::MemberId => self.member_id.clone(),
            Token::Pronouns => self.pronouns.clone(),
            Token::SystemId => self.system_id.clone(),
            Token::SystemName => self.system_name.clone(),
            Token::Color => self.color.clone(),
            Token::Avatar => self.avatar.clone(),
            Token::MessageCount => self.message_count.to_string(),
            Token::SystemMessageCount => self.system_message_count.to_string(),
        }
    }
}

/// Username shown by the host for a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName {
    pub text: String,
    /// Hex colour without `#`, only set for proxied messages
    pub color: Option<String>,
}

pub struct Renderer {
    cache: AuthorCache,
    local: Arc<LocalSystem>,
}

impl Renderer {
    pub fn new(cache: AuthorCache, local: Arc<LocalSystem>) -> Self {
        Self { cache, local }
    }

    /// Render `template` for the author of `message`
    pub fn render(&self, template: &str, message: &Message) -> String {
        let author = self.cache.resolve(message);
        let fields = DisplayFields::resolve(
            &author,
            message.guild_id.as_deref(),
            self.local.system_message_count(),
        );
        Template::parse(template).render(&fields)
    }

    /// Name to show in place of the webhook username.
    ///
    /// `mention_prefix` is set for replies that mention their target.
    pub fn display_name(
        &self,
        message: &Message,
        settings: &Settings,
        mention_prefix: bool,
    ) -> DisplayName {
        if !message.is_proxied() {
            let prefix = if mention_prefix { "@" } else { "" };
            return DisplayName {
                text: format!("{}{}", prefix, message.author.display_name()),
                color: None,
            };
        }

        let author = self.cache.resolve(message);
        let color = author
            .member
            .color
            .as_ref()
            .filter(|_| settings.color_names)
            .cloned()
            .unwrap_or_else(|| DEFAULT_NAME_COLOR.to_owned());

        let own = self.local.is_own(message, &self.cache);
        DisplayName {
            text: self.render(settings.template_for(own), message),
            color: Some(color),
        }
    }
}
