use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::api::Directory;
use crate::cache::AuthorCache;
use crate::host::HostClient;
use crate::message::Message;
use crate::model::Author;
use crate::storage::Storage;
use crate::{Result, LOCAL_SYSTEM_KEY};

/// Stored value meaning "the current user has no system"
pub const NO_SYSTEM: &str = "{}";

/// Members of the current user's own system
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Snapshot {
    #[default]
    NoSystem,
    Members(Vec<Author>),
}

impl Snapshot {
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim() == NO_SYSTEM {
            return Ok(Snapshot::NoSystem);
        }
        Ok(Snapshot::Members(serde_json::from_str(json)?))
    }

    pub fn to_json(&self) -> Result<String> {
        match self {
            Snapshot::NoSystem => Ok(NO_SYSTEM.to_owned()),
            Snapshot::Members(authors) => Ok(serde_json::to_string(authors)?),
        }
    }

    pub fn authors(&self) -> &[Author] {
        match self {
            Snapshot::NoSystem => &[],
            Snapshot::Members(authors) => authors,
        }
    }
}

/// Local system snapshot, shared between the renderer and the bridge.
///
/// The in-memory snapshot is only ever replaced as a whole, and always by
/// re-reading what was written to the store.
pub struct LocalSystem {
    directory: Arc<dyn Directory>,
    storage: Arc<dyn Storage>,
    host: Arc<dyn HostClient>,
    snapshot: RwLock<Snapshot>,
}

impl LocalSystem {
    pub fn new(
        directory: Arc<dyn Directory>,
        storage: Arc<dyn Storage>,
        host: Arc<dyn HostClient>,
    ) -> Self {
        Self {
            directory,
            storage,
            host,
            snapshot: RwLock::new(Snapshot::NoSystem),
        }
    }

    /// Reload the snapshot from the store.
    /// Returns the number of members loaded.
    pub fn load(&self) -> Result<usize> {
        let snapshot = match self.storage.get(LOCAL_SYSTEM_KEY)? {
            Some(json) => Snapshot::parse(&json)?,
            None => Snapshot::NoSystem,
        };
        let count = snapshot.authors().len();
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
        Ok(count)
    }

    /// Whether the store holds a snapshot at all, "no system" included
    pub fn is_stored(&self) -> Result<bool> {
        Ok(self.storage.get(LOCAL_SYSTEM_KEY)?.is_some())
    }

    /// Fetch the current user's system and members, store them and reload.
    /// Returns the number of members.
    pub async fn refresh(&self) -> Result<usize> {
        let user_id = self.host.current_user_id();
        let system = match self.directory.system(&user_id).await {
            Ok(system) => system,
            Err(e) if e.is_not_found() => {
                log::info!("user {} has no system", user_id);
                self.storage
                    .set(LOCAL_SYSTEM_KEY, NO_SYSTEM.to_owned())?;
                return self.load();
            }
            Err(e) => return Err(e),
        };

        let members = self
            .directory
            .system_members(&system.id)
            .await?;
        let authors: Vec<Author> = members
            .into_iter()
            .map(|member| Author::of_member(member, system.clone()))
            .collect();

        let json = Snapshot::Members(authors).to_json()?;
        self.storage.set(LOCAL_SYSTEM_KEY, json)?;
        let count = self.load()?;
        log::info!("system {} loaded with {} members", system.id, count);
        Ok(count)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read().clone()
    }

    pub fn has_system(&self) -> bool {
        !self.read().authors().is_empty()
    }

    pub fn contains_member(&self, member_id: &str) -> bool {
        !member_id.is_empty()
            && self
                .read()
                .authors()
                .iter()
                .any(|author| author.member.id == member_id)
    }

    /// Whether a proxied message was sent by a member of the local system
    pub fn is_own(&self, message: &Message, cache: &AuthorCache) -> bool {
        if !message.is_proxied() || !self.has_system() {
            return false;
        }
        let author = cache.resolve(message);
        self.contains_member(&author.member.id)
    }

    /// Messages observed across every member of the snapshot
    pub fn system_message_count(&self) -> usize {
        self.read()
            .authors()
            .iter()
            .map(|author| author.message_ids.len())
            .sum()
    }

    pub fn member_names(&self) -> Vec<String> {
        self.read()
            .authors()
            .iter()
            .filter_map(|author| {
                author
                    .member
                    .display_name
                    .clone()
                    .or_else(|| author.member.name.clone())
            })
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use tokio::runtime::Handle;

    use super::*;
    use crate::mock::{self, MockDirectory, MockHost};
    use crate::storage::MemoryStorage;
    use crate::PkError;

    fn own_directory() -> MockDirectory {
        let sys = mock::system("abcde", "| S");
        let ash = mock::member("fghij", "Ash");
        let mut rowan = mock::member("klmno", "Rowan");
        rowan.display_name = Some("Ro".into());

        let mut directory = MockDirectory::default();
        directory.systems.insert("42".into(), sys.clone());
        directory
            .members
            .insert("abcde".into(), vec![ash.clone(), rowan]);
        directory
            .messages
            .insert("1".into(), mock::pk_message("1", &ash, &sys));
        directory
    }

    fn local(
        directory: MockDirectory,
        storage: &Arc<MemoryStorage>,
    ) -> LocalSystem {
        LocalSystem::new(
            Arc::new(directory),
            storage.clone(),
            Arc::new(MockHost::new("42")),
        )
    }

    #[tokio::test]
    async fn refresh_round_trips_through_the_store() {
        let storage = Arc::new(MemoryStorage::new());
        let local = local(own_directory(), &storage);

        assert_eq!(local.refresh().await.unwrap(), 2);

        let stored = storage.get(LOCAL_SYSTEM_KEY).unwrap().unwrap();
        assert_eq!(Snapshot::parse(&stored).unwrap(), local.snapshot());

        let ids: Vec<_> = local
            .snapshot()
            .authors()
            .iter()
            .map(|author| author.member.id.clone())
            .collect();
        assert_eq!(ids, vec!["fghij", "klmno"]);
        assert_eq!(local.system_message_count(), 0);
        assert_eq!(local.member_names(), vec!["Ash", "Ro"]);
    }

    #[tokio::test]
    async fn refresh_without_system_stores_sentinel() {
        let storage = Arc::new(MemoryStorage::new());
        let mut directory = own_directory();
        directory.systems.clear();
        let local = local(directory, &storage);

        assert_eq!(local.refresh().await.unwrap(), 0);
        assert_eq!(
            storage.get(LOCAL_SYSTEM_KEY).unwrap().as_deref(),
            Some(NO_SYSTEM)
        );
        assert_eq!(local.snapshot(), Snapshot::NoSystem);
        assert!(local.is_stored().unwrap());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let local = local(
            MockDirectory {
                unavailable: true,
                ..own_directory()
            },
            &storage,
        );

        assert!(matches!(
            local.refresh().await,
            Err(PkError::RemoteUnavailable(_))
        ));
        assert_eq!(storage.get(LOCAL_SYSTEM_KEY).unwrap(), None);
        assert_eq!(local.snapshot(), Snapshot::NoSystem);
    }

    #[tokio::test]
    async fn own_messages_need_a_system() {
        let storage = Arc::new(MemoryStorage::new());
        let directory = Arc::new(own_directory());
        let cache =
            AuthorCache::new(directory.clone(), storage.clone(), Handle::current());
        let local = LocalSystem::new(
            directory,
            storage.clone(),
            Arc::new(MockHost::new("42")),
        );
        let message = mock::proxied("1", "Ash | S");

        cache.resolve(&message);
        cache.flush().await;
        assert!(!local.is_own(&message, &cache));

        local.refresh().await.unwrap();
        assert!(local.is_own(&message, &cache));
        assert!(!local.is_own(&mock::native("1", "42"), &cache));

        storage
            .set(LOCAL_SYSTEM_KEY, NO_SYSTEM.to_owned())
            .unwrap();
        local.load().unwrap();
        assert!(!local.is_own(&message, &cache));
    }

    #[test]
    fn empty_member_list_is_not_a_system() {
        let snapshot = Snapshot::parse("[]").unwrap();
        assert_eq!(snapshot, Snapshot::Members(vec![]));
        assert!(snapshot.authors().is_empty());
        assert_eq!(Snapshot::NoSystem.to_json().unwrap(), NO_SYSTEM);
    }
}
