//! Entry point wiring the cache, snapshot, renderer and bridge together.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::api::{Directory, PkApi};
use crate::bridge::EditBridge;
use crate::cache::AuthorCache;
use crate::config::Settings;
use crate::host::{EditDecision, HostClient, MessageAction};
use crate::message::Message;
use crate::snapshot::LocalSystem;
use crate::storage::Storage;
use crate::template::{DisplayName, Renderer};
use crate::Result;

/// Outcome of a manual action, shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Failure(String),
}

pub struct PluralKit {
    settings: Settings,
    storage: Arc<dyn Storage>,
    cache: AuthorCache,
    local: Arc<LocalSystem>,
    renderer: Renderer,
    bridge: EditBridge,
}

impl PluralKit {
    /// Build the integration against the public PluralKit API configured in
    /// the stored settings
    pub fn connect(
        storage: Arc<dyn Storage>,
        host: Arc<dyn HostClient>,
        runtime: Handle,
    ) -> Result<Self> {
        let settings = Settings::load(storage.as_ref())?;
        let directory = Arc::new(PkApi::new(&settings.api_url)?);
        Ok(Self::with_settings(settings, directory, storage, host, runtime))
    }

    pub fn new(
        directory: Arc<dyn Directory>,
        storage: Arc<dyn Storage>,
        host: Arc<dyn HostClient>,
        runtime: Handle,
    ) -> Result<Self> {
        let settings = Settings::load(storage.as_ref())?;
        Ok(Self::with_settings(settings, directory, storage, host, runtime))
    }

    fn with_settings(
        settings: Settings,
        directory: Arc<dyn Directory>,
        storage: Arc<dyn Storage>,
        host: Arc<dyn HostClient>,
        runtime: Handle,
    ) -> Self {
        let cache = AuthorCache::new(directory.clone(), storage.clone(), runtime);
        let local = Arc::new(LocalSystem::new(
            directory,
            storage.clone(),
            host.clone(),
        ));
        let renderer = Renderer::new(cache.clone(), local.clone());
        let bridge = EditBridge::new(
            cache.clone(),
            local.clone(),
            host,
            settings.edit_message_channel.clone(),
        );

        Self {
            settings,
            storage,
            cache,
            local,
            renderer,
            bridge,
        }
    }

    /// Load the persisted authors and rebuild the local system from the
    /// directory. The stored local system is only used when that fails.
    pub async fn start(&self) {
        if let Err(e) = self.cache.load() {
            log::warn!("discarding unreadable author cache: {}", e);
        }

        if let Err(e) = self.local.refresh().await {
            log::warn!("could not refresh local system: {}", e);
            if let Err(e) = self.local.load() {
                log::warn!("discarding unreadable local system: {}", e);
            }
        }
    }

    /// The manual "load my system" action
    pub async fn load_my_system(&self) -> Toast {
        match self.local.refresh().await {
            Ok(0) => Toast::Success("No system found for this account".to_owned()),
            Ok(count) => Toast::Success(format!("Loaded {} members", count)),
            Err(e) => {
                log::warn!("could not load local system: {}", e);
                Toast::Failure(format!("Failed to load system: {}", e))
            }
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Store new settings and apply them. The API base only changes on the
    /// next [`PluralKit::connect`].
    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        settings.save(self.storage.as_ref())?;
        self.bridge
            .set_edit_channel(settings.edit_message_channel.clone());
        self.settings = settings;
        Ok(())
    }

    pub fn cache(&self) -> &AuthorCache {
        &self.cache
    }

    pub fn local_system(&self) -> &LocalSystem {
        &self.local
    }

    pub fn render_username(
        &self,
        message: &Message,
        mention_prefix: bool,
    ) -> DisplayName {
        self.renderer
            .display_name(message, &self.settings, mention_prefix)
    }

    pub fn render(&self, template: &str, message: &Message) -> String {
        self.renderer.render(template, message)
    }

    pub fn is_own_message(&self, message: &Message) -> bool {
        self.bridge.can_edit(message)
    }

    pub fn actions(&self, message: &Message) -> Vec<MessageAction> {
        self.bridge.actions(message)
    }

    pub fn last_editable<'a>(&self, messages: &'a [Message]) -> Option<&'a Message> {
        self.bridge.last_editable(messages)
    }

    pub fn edit(&self, message: &Message, new_content: &str) {
        self.bridge.request_edit(message, new_content)
    }

    pub fn delete(&self, message: &Message) {
        self.bridge.request_delete(message)
    }

    pub fn intercept_edit(&self, message: &Message, new_content: &str) -> EditDecision {
        self.bridge.intercept_edit(message, new_content)
    }
}
