use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::{
    db::{load, save, PersistentStore, StoreKey},
    error::AppResult,
    models::{Location, Recommendation, UserPreferences},
    services::{DiscoverFlow, FilterState, Itinerary},
};

/// Everything the server tracks for one session
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub preferences: UserPreferences,
    pub filters: FilterState,
    pub flow: DiscoverFlow,
    pub itinerary: Itinerary,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            preferences: UserPreferences::new(),
            filters: FilterState::new(),
            flow: DiscoverFlow::new(),
            itinerary: Itinerary::new(),
        }
    }

    /// Restores a session from its stored snapshots
    ///
    /// Snapshots that fail validation are ignored rather than restored.
    pub async fn restore(store: &dyn PersistentStore, id: &str) -> AppResult<Self> {
        let stored_location: Option<Location> =
            load(store, &StoreKey::Location(id.to_string())).await?;
        let stored_preferences: Option<UserPreferences> =
            load(store, &StoreKey::Preferences(id.to_string())).await?;
        let stored_itinerary: Option<Vec<Recommendation>> =
            load(store, &StoreKey::Itinerary(id.to_string())).await?;

        let mut preferences = stored_preferences
            .map(UserPreferences::sanitized)
            .unwrap_or_default();
        let location = stored_location
            .or_else(|| preferences.location.clone())
            .filter(|location| location.validate().is_ok());
        preferences.location = location.clone();

        tracing::debug!(
            session = id,
            has_location = location.is_some(),
            likes = preferences.likes.len(),
            "Session restored"
        );

        Ok(Self {
            id: id.to_string(),
            preferences,
            filters: FilterState::new(),
            flow: DiscoverFlow::with_location(location),
            itinerary: Itinerary::from_items(stored_itinerary.unwrap_or_default()),
        })
    }

    /// Makes `location` the current location for searches and preferences
    pub fn set_location(&mut self, location: Location) -> AppResult<()> {
        self.flow.resolve_location(location.clone())?;
        self.preferences.set_location(location);
        Ok(())
    }

    /// Preferences merged with the likes derived from the active filters
    pub fn preference_snapshot(&self) -> UserPreferences {
        let mut snapshot = self.preferences.clone();
        snapshot.likes.extend(self.filters.likes());
        snapshot.sanitized()
    }

    pub async fn persist_location(&self, store: &dyn PersistentStore) -> AppResult<()> {
        match self.flow.location() {
            Some(location) => save(store, &StoreKey::Location(self.id.clone()), location).await,
            None => Ok(()),
        }
    }

    pub async fn persist_preferences(&self, store: &dyn PersistentStore) -> AppResult<()> {
        save(store, &StoreKey::Preferences(self.id.clone()), &self.preferences).await
    }

    pub async fn persist_itinerary(&self, store: &dyn PersistentStore) -> AppResult<()> {
        save(store, &StoreKey::Itinerary(self.id.clone()), &self.itinerary).await
    }
}

/// In-memory sessions with idle expiry and a size cap
///
/// An evicted session is rebuilt from the store on its next request.
pub struct SessionRegistry {
    slots: RwLock<HashMap<String, SessionSlot>>,
    epoch: Instant,
    idle_timeout: Duration,
    max_sessions: usize,
}

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    /// Milliseconds since the registry epoch
    last_used_ms: AtomicU64,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Returns a live session and marks it as used
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        let now = self.now_ms();
        let slots = self.slots.read().await;
        let slot = slots.get(id).filter(|slot| !self.is_idle(slot, now))?;
        slot.last_used_ms.store(now, Ordering::Relaxed);
        Some(slot.session.clone())
    }

    /// Adds a restored session, dropping idle and least recently used ones
    ///
    /// When another request already registered a live session under `id`,
    /// that one is returned instead.
    pub async fn insert(&self, id: &str, session: Session) -> Arc<Mutex<Session>> {
        let now = self.now_ms();
        let mut slots = self.slots.write().await;

        if let Some(slot) = slots.get(id).filter(|slot| !self.is_idle(slot, now)) {
            slot.last_used_ms.store(now, Ordering::Relaxed);
            return slot.session.clone();
        }

        let before = slots.len();
        slots.retain(|_, slot| !self.is_idle(slot, now));
        while slots.len() >= self.max_sessions {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used_ms.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    slots.remove(&key);
                }
                None => break,
            }
        }
        let evicted = before - slots.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = slots.len(), "Sessions evicted from memory");
        }

        let session = Arc::new(Mutex::new(session));
        slots.insert(
            id.to_string(),
            SessionSlot {
                session: session.clone(),
                last_used_ms: AtomicU64::new(now),
            },
        );
        session
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn is_idle(&self, slot: &SessionSlot, now_ms: u64) -> bool {
        let idle_ms = u64::try_from(self.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        now_ms.saturating_sub(slot.last_used_ms.load(Ordering::Relaxed)) > idle_ms
    }
}
