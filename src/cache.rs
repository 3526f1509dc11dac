//! Resolution of proxied messages to the member who sent them.
//!
//! Lookups never wait on the network. A miss hands out a placeholder and
//! starts a detached backfill on the injected runtime; the resolved author
//! is visible to every lookup that happens after the backfill finished.
//!
//! The message lookup is single-flight per fingerprint. The two guild
//! override fetches are merged independently and the last write wins.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

use crate::api::Directory;
use crate::message::Message;
use crate::model::Author;
use crate::storage::Storage;
use crate::{PkError, Result, AUTHORS_KEY};

/// Shared handle to the author cache, cheap to clone
#[derive(Clone)]
pub struct AuthorCache {
    inner: Arc<Inner>,
}

struct Inner {
    directory: Arc<dyn Directory>,
    storage: Arc<dyn Storage>,
    runtime: Handle,
    state: Mutex<State>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Default)]
struct State {
    /// Resolved authors, persisted after every change
    authors: HashMap<String, Author>,
    /// Placeholders of fingerprints whose backfill is in flight or failed
    /// during this session. Never persisted.
    author_cache: HashMap<String, Author>,
}

impl AuthorCache {
    /// Create an empty cache. Backfills are spawned on `runtime`.
    pub fn new(
        directory: Arc<dyn Directory>,
        storage: Arc<dyn Storage>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory,
                storage,
                runtime,
                state: Mutex::new(State::default()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Replace the in-memory authors with the persisted ones.
    /// Returns the number of authors loaded.
    pub fn load(&self) -> Result<usize> {
        let authors: HashMap<String, Author> =
            match self.inner.storage.get(AUTHORS_KEY)? {
                Some(json) => serde_json::from_str(&json)?,
                None => HashMap::new(),
            };

        let count = authors.len();
        let mut state = self.inner.state();
        state.authors = authors;
        state.author_cache.clear();
        log::info!("{} cached authors loaded", count);
        Ok(count)
    }

    /// Author of a proxied message, or the best placeholder known so far.
    ///
    /// Records the message id on the author. On a miss the returned author
    /// is a placeholder with an empty member and system.
    pub fn resolve(&self, message: &Message) -> Author {
        if !message.is_proxied() {
            log::trace!("message {} is not proxied", message.id);
            return Author::default();
        }

        let fingerprint = message.fingerprint();
        let mut state = self.inner.state();

        if let Some(author) = state.authors.get_mut(&fingerprint) {
            let changed = author.record(&message.id);
            let author = author.clone();
            if changed {
                self.inner.persist(&state.authors);
            }
            return author;
        }

        if let Some(placeholder) = state.author_cache.get_mut(&fingerprint) {
            placeholder.record(&message.id);
            return placeholder.clone();
        }

        let mut placeholder = Author::default();
        placeholder.record(&message.id);
        state
            .author_cache
            .insert(fingerprint.clone(), placeholder.clone());
        drop(state);

        log::debug!(
            "unknown author {:?}, resolving through message {}",
            fingerprint,
            message.id
        );
        let inner = self.inner.clone();
        self.inner
            .spawn(inner.backfill(fingerprint, message.clone()));

        placeholder
    }

    /// Resolved author of a fingerprint, without recording anything
    pub fn get(&self, fingerprint: &str) -> Option<Author> {
        self.inner
            .state()
            .authors
            .get(fingerprint)
            .cloned()
    }

    /// Whether a fingerprint is still waiting for (or failed) its backfill
    pub fn is_pending(&self, fingerprint: &str) -> bool {
        self.inner
            .state()
            .author_cache
            .contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.inner.state().authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every backfill started so far, including the override
    /// fetches they started, has completed.
    pub async fn flush(&self) {
        loop {
            let pending = std::mem::take(&mut *self.inner.tasks());
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if let Err(e) = task.await.map_err(task_failure) {
                    log::warn!("{:#}", e);
                }
            }
        }
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.runtime.spawn(task);
        let mut tasks = self.tasks();
        tasks.retain(|pending| !pending.is_finished());
        tasks.push(handle);
    }

    /// Write the whole author map to the store. Failures are only logged.
    fn persist(&self, authors: &HashMap<String, Author>) {
        let result = serde_json::to_string(authors)
            .map_err(PkError::from)
            .and_then(|json| self.storage.set(AUTHORS_KEY, json));
        if let Err(e) = result {
            log::warn!("failed to persist {} authors: {}", authors.len(), e);
        }
    }

    async fn backfill(self: Arc<Self>, fingerprint: String, message: Message) {
        let (author, guild) = match self.fetch_author(&message).await {
            Ok(resolved) => resolved,
            Err(e) => {
                log::warn!(
                    "could not resolve author of message {}: {}",
                    message.id,
                    e
                );
                return;
            }
        };

        let member_id = author.member.id.clone();
        let system_id = author.system.id.clone();
        {
            let mut state = self.state();
            state.author_cache.remove(&fingerprint);
            state
                .authors
                .insert(fingerprint.clone(), author);
            self.persist(&state.authors);
        }
        log::debug!("author {:?} resolved to member {}", fingerprint, member_id);

        let Some(guild) = guild else {
            return;
        };

        let inner = self.clone();
        let (key, guild_id) = (fingerprint.clone(), guild.clone());
        self.spawn(async move {
            match inner
                .directory
                .member_guild_settings(&member_id, &guild_id)
                .await
            {
                Ok(settings) => inner.merge(&key, move |author| {
                    author.guild_settings.insert(guild_id, settings);
                }),
                Err(e) => log::debug!(
                    "no guild settings for member {}: {}",
                    member_id,
                    e
                ),
            }
        });

        let inner = self.clone();
        self.spawn(async move {
            match inner
                .directory
                .system_guild_settings(&system_id, &guild)
                .await
            {
                Ok(settings) => inner.merge(&fingerprint, move |author| {
                    author.system_settings.insert(guild, settings);
                }),
                Err(e) => log::debug!(
                    "no guild settings for system {}: {}",
                    system_id,
                    e
                ),
            }
        });
    }

    /// Canonical author of a message and the guild it was sent in
    async fn fetch_author(
        &self,
        message: &Message,
    ) -> Result<(Author, Option<String>)> {
        let pk = self.directory.message(&message.id).await?;
        let guild = message.guild_id.clone().or(pk.guild);
        match (pk.member, pk.system) {
            (Some(member), Some(system)) => {
                Ok((Author::new(pk.id, member, system), guild))
            }
            _ => Err(PkError::ResolutionIncomplete(format!(
                "message {} has no member or system",
                pk.id
            ))),
        }
    }

    fn merge(&self, fingerprint: &str, update: impl FnOnce(&mut Author)) {
        let mut state = self.state();
        if let Some(author) = state.authors.get_mut(fingerprint) {
            update(author);
            self.persist(&state.authors);
        }
    }
}

/// A backfill task that panicked or was cancelled
fn task_failure(e: JoinError) -> PkError {
    anyhow::Error::new(e)
        .context("backfill task did not complete")
        .into()
}
