//! # Document Store
//!
//! The seam between the game server and its persistence layer. The server
//! only ever sees the [`DocumentStore`] trait; [`MemoryStore`] is the bundled
//! in-process implementation.
//!
//! Every call the server makes goes through [`bounded`], so a stalled backend
//! surfaces as [`StoreError::Timeout`] instead of hanging a connection task.

use crate::error::StoreError;
use crate::leveling::apply_experience;
use crate::profile::{Position, Profile, EMPTY_SLOT};
use crate::world::{Item, Spell, WorldSnapshot};
use async_trait::async_trait;
use bitrealm_protocol::AccountId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted(AccountId),
    /// Credentials were refused; carries the message shown to the player
    Rejected(String),
}

/// Persistence operations the game server depends on.
///
/// Operations that change a profile apply the whole change as one update on
/// the store side. Two requests touching the same account never read a
/// profile, change it locally and write it back, so neither can overwrite
/// the other's result.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Checks a username/password pair.
    async fn verify_login(&self, username: &str, password: &str)
        -> Result<LoginOutcome, StoreError>;

    async fn find_profile(&self, account_id: AccountId) -> Result<Profile, StoreError>;

    /// Runs the leveling curve over the stored progress, returning the
    /// updated profile.
    async fn apply_experience(&self, account_id: AccountId, exp: f64)
        -> Result<Profile, StoreError>;

    /// Adds `bits` to the purse and `exp` through the leveling curve in a
    /// single update, returning the updated profile.
    async fn grant_reward(
        &self,
        account_id: AccountId,
        bits: f64,
        exp: f64,
    ) -> Result<Profile, StoreError>;

    async fn update_last_position(
        &self,
        account_id: AccountId,
        position: Position,
    ) -> Result<(), StoreError>;

    /// Appends an item to the player's inventory.
    async fn add_inventory_item(&self, account_id: AccountId, item: &Item)
        -> Result<(), StoreError>;

    /// Puts an item into the loadout slot named by its type and adds its
    /// stat bonus.
    ///
    /// Returns `false` when the type names no slot or the slot already holds
    /// a different item. Equipping the item a slot already holds is a no-op
    /// that returns `true`.
    async fn equip_item(&self, account_id: AccountId, item: &Item) -> Result<bool, StoreError>;

    /// Empties the slot holding `item` and removes its stat bonus.
    ///
    /// Returns `false` when the item is not equipped.
    async fn unequip_item(&self, account_id: AccountId, item: &Item) -> Result<bool, StoreError>;

    /// Adds a spell to the player's spell index. Known spells are kept once.
    async fn add_spell(&self, account_id: AccountId, spell: &Spell) -> Result<(), StoreError>;

    /// Loads every world table. Called once at startup.
    async fn load_world(&self) -> Result<WorldSnapshot, StoreError>;
}

/// Runs a store call with a deadline.
///
/// # Arguments
///
/// * `timeout` - Upper bound on the call
/// * `operation` - Name used in the error and logs
/// * `call` - The store future
pub async fn bounded<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("⏰ Store call {} timed out after {:?}", operation, timeout);
            Err(StoreError::Timeout { operation, timeout })
        }
    }
}

#[derive(Debug, Clone)]
struct Credentials {
    password: String,
    account_id: AccountId,
}

/// An in-process [`DocumentStore`].
///
/// Accounts are registered up front with [`MemoryStore::register`]; world
/// content is supplied with [`MemoryStore::with_world`]. An artificial
/// latency can be injected to exercise timeout handling. The latency is
/// spent before a call touches any data, so a call abandoned by its caller
/// changes nothing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<String, Credentials>>,
    profiles: RwLock<HashMap<AccountId, Profile>>,
    world: RwLock<WorldSnapshot>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_world(mut self, world: WorldSnapshot) -> Self {
        self.world = RwLock::new(world);
        self
    }

    /// Delays every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(Some(latency));
        self
    }

    /// Changes the delay of calls made from now on.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Creates an account with a fresh profile and returns its id.
    ///
    /// Registering an existing username returns the existing account.
    pub async fn register(&self, username: &str, password: &str) -> AccountId {
        let mut credentials = self.credentials.write().await;
        if let Some(existing) = credentials.get(username) {
            return existing.account_id;
        }

        let account_id = AccountId::new();
        credentials.insert(
            username.to_string(),
            Credentials {
                password: password.to_string(),
                account_id,
            },
        );
        self.profiles
            .write()
            .await
            .insert(account_id, Profile::new(account_id, username));
        debug!("👤 Registered account {} for {}", account_id, username);
        account_id
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Applies `change` to one profile while holding the profile table's
    /// write lock.
    async fn modify_profile<T, F>(&self, account_id: AccountId, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Profile) -> T + Send,
    {
        self.simulate_latency().await;
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound(account_id))?;
        Ok(change(profile))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn verify_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, StoreError> {
        self.simulate_latency().await;
        let credentials = self.credentials.read().await;
        Ok(match credentials.get(username) {
            Some(entry) if entry.password == password => LoginOutcome::Accepted(entry.account_id),
            _ => LoginOutcome::Rejected(format!("Login failed;{username};0")),
        })
    }

    async fn find_profile(&self, account_id: AccountId) -> Result<Profile, StoreError> {
        self.simulate_latency().await;
        self.profiles
            .read()
            .await
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::NotFound(account_id))
    }

    async fn apply_experience(
        &self,
        account_id: AccountId,
        exp: f64,
    ) -> Result<Profile, StoreError> {
        self.grant_reward(account_id, 0.0, exp).await
    }

    async fn grant_reward(
        &self,
        account_id: AccountId,
        bits: f64,
        exp: f64,
    ) -> Result<Profile, StoreError> {
        self.modify_profile(account_id, |profile| {
            profile.purse.bits += bits;
            let progress = apply_experience(profile.progress(), exp);
            profile.set_progress(progress);
            profile.clone()
        })
        .await
    }

    async fn update_last_position(
        &self,
        account_id: AccountId,
        position: Position,
    ) -> Result<(), StoreError> {
        self.modify_profile(account_id, |profile| profile.last_position = position)
            .await
    }

    async fn add_inventory_item(
        &self,
        account_id: AccountId,
        item: &Item,
    ) -> Result<(), StoreError> {
        self.modify_profile(account_id, |profile| {
            profile.items.collection.push(item.item_id.clone())
        })
        .await
    }

    async fn equip_item(&self, account_id: AccountId, item: &Item) -> Result<bool, StoreError> {
        self.modify_profile(account_id, |profile| {
            let Some(slot) = profile.loadout.slot_mut(&item.item_type) else {
                return false;
            };
            if *slot == item.item_id {
                return true;
            }
            if *slot != EMPTY_SLOT {
                return false;
            }
            *slot = item.item_id.clone();
            profile.stats.add(&item.stats);
            true
        })
        .await
    }

    async fn unequip_item(&self, account_id: AccountId, item: &Item) -> Result<bool, StoreError> {
        self.modify_profile(account_id, |profile| {
            match profile.loadout.slot_mut(&item.item_type) {
                Some(slot) if *slot == item.item_id => {
                    *slot = EMPTY_SLOT.to_string();
                    profile.stats.remove(&item.stats);
                    true
                }
                _ => false,
            }
        })
        .await
    }

    async fn add_spell(&self, account_id: AccountId, spell: &Spell) -> Result<(), StoreError> {
        self.modify_profile(account_id, |profile| {
            if !profile.spell_index.contains(&spell.spell_id) {
                profile.spell_index.push(spell.spell_id.clone());
            }
        })
        .await
    }

    async fn load_world(&self) -> Result<WorldSnapshot, StoreError> {
        self.simulate_latency().await;
        Ok(self.world.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::sample_snapshot;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_accepts_registered_credentials() {
        let store = MemoryStore::new();
        let account_id = store.register("ayla", "hunter2").await;

        assert_eq!(
            store.verify_login("ayla", "hunter2").await.unwrap(),
            LoginOutcome::Accepted(account_id)
        );
        assert_eq!(
            store.verify_login("ayla", "wrong").await.unwrap(),
            LoginOutcome::Rejected("Login failed;ayla;0".to_string())
        );
        assert!(matches!(
            store.verify_login("nobody", "x").await.unwrap(),
            LoginOutcome::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_register_is_idempotent_per_username() {
        let store = MemoryStore::new();
        let first = store.register("ayla", "a").await;
        let second = store.register("ayla", "b").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_profile_updates() {
        let store = MemoryStore::new();
        let account_id = store.register("ayla", "pw").await;

        let profile = store.grant_reward(account_id, 5.0, 0.0).await.unwrap();
        assert_eq!(profile.purse.bits, 5.0);
        let profile = store.grant_reward(account_id, 2.5, 110.0).await.unwrap();
        assert_eq!(profile.purse.bits, 7.5);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.current_exp, 10.0);

        store
            .update_last_position(account_id, Position::new(1.0, 2.0, 3.0))
            .await
            .unwrap();
        let profile = store.apply_experience(account_id, 0.0).await.unwrap();
        assert_eq!(profile.last_position, Position::new(1.0, 2.0, 3.0));
        assert_eq!(profile.total_exp, 110.0);

        assert_eq!(store.find_profile(account_id).await.unwrap(), profile);
    }

    #[tokio::test]
    async fn test_concurrent_experience_grants_all_land() {
        let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(20)));
        let account_id = store.register("ayla", "pw").await;

        let grants: Vec<_> = [100.0, 200.0, 300.0]
            .into_iter()
            .map(|exp| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.apply_experience(account_id, exp).await })
            })
            .collect();
        for grant in grants {
            grant.await.unwrap().unwrap();
        }

        let profile = store.find_profile(account_id).await.unwrap();
        assert_eq!(profile.total_exp, 600.0);
        assert!(profile.level > 1);
        assert!(0.0 <= profile.current_exp && profile.current_exp <= profile.max_exp);
    }

    #[tokio::test]
    async fn test_abandoned_call_changes_nothing() {
        let store = MemoryStore::new().with_latency(Duration::from_millis(200));
        let account_id = store.register("ayla", "pw").await;

        let result = bounded(
            Duration::from_millis(10),
            "grant_reward",
            store.grant_reward(account_id, 5.0, 30.0),
        )
        .await;
        assert!(matches!(result, Err(StoreError::Timeout { .. })));

        let profile = store.profiles.read().await.get(&account_id).cloned().unwrap();
        assert_eq!(profile.purse.bits, 0.0);
        assert_eq!(profile.total_exp, 0.0);
    }

    #[tokio::test]
    async fn test_inventory_and_spells() {
        let store = MemoryStore::new();
        let account_id = store.register("ayla", "pw").await;
        let snapshot = sample_snapshot();

        store
            .add_inventory_item(account_id, &snapshot.items[0])
            .await
            .unwrap();
        store.add_spell(account_id, &snapshot.spells[0]).await.unwrap();
        store.add_spell(account_id, &snapshot.spells[0]).await.unwrap();

        let profile = store.find_profile(account_id).await.unwrap();
        assert_eq!(profile.items.collection, vec!["WizardHat"]);
        assert_eq!(profile.spell_index, vec!["Fireball"]);
    }

    #[tokio::test]
    async fn test_equip_and_unequip_adjust_stats() {
        let store = MemoryStore::new();
        let account_id = store.register("ayla", "pw").await;
        let hat = sample_snapshot().items.remove(0);

        assert!(!store.unequip_item(account_id, &hat).await.unwrap());
        assert!(store.equip_item(account_id, &hat).await.unwrap());
        assert!(store.equip_item(account_id, &hat).await.unwrap());

        let profile = store.find_profile(account_id).await.unwrap();
        assert_eq!(profile.loadout.head, "WizardHat");
        assert_eq!(profile.stats.mana, 10.0);
        assert_eq!(profile.stats.intelligence, 2.0);

        let other_hat = Item {
            item_id: "Crown".to_string(),
            ..hat.clone()
        };
        assert!(!store.equip_item(account_id, &other_hat).await.unwrap());

        assert!(store.unequip_item(account_id, &hat).await.unwrap());
        let profile = store.find_profile(account_id).await.unwrap();
        assert_eq!(profile.loadout.head, EMPTY_SLOT);
        assert_eq!(profile.stats, crate::profile::Stats::default());
    }

    #[tokio::test]
    async fn test_equip_rejects_unknown_slot() {
        let store = MemoryStore::new();
        let account_id = store.register("ayla", "pw").await;
        let mut ring = sample_snapshot().items.remove(0);
        ring.item_type = "tail".to_string();

        assert!(!store.equip_item(account_id, &ring).await.unwrap());
        let profile = store.find_profile(account_id).await.unwrap();
        assert_eq!(profile.stats, crate::profile::Stats::default());
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let store = MemoryStore::new();
        let missing = AccountId::new();
        assert_eq!(
            store.find_profile(missing).await,
            Err(StoreError::NotFound(missing))
        );
        assert!(store.grant_reward(missing, 1.0, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn test_load_world_returns_snapshot() {
        let store = MemoryStore::new().with_world(sample_snapshot());
        let world = store.load_world().await.unwrap();
        assert_eq!(world.monsters.len(), 2);
        assert_eq!(world.levels.len(), 2);
    }

    #[tokio::test]
    async fn test_bounded_reports_timeout() {
        let store = MemoryStore::new().with_latency(Duration::from_millis(500));
        let result = bounded(Duration::from_millis(20), "load_world", store.load_world()).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Timeout {
                operation: "load_world",
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "document store timed out during load_world after 20ms"
        );
    }

    #[tokio::test]
    async fn test_bounded_passes_through_fast_calls() {
        let store = MemoryStore::new();
        let account_id = store.register("ayla", "pw").await;
        let profile = bounded(
            Duration::from_secs(10),
            "find_profile",
            store.find_profile(account_id),
        )
        .await
        .unwrap();
        assert_eq!(profile.name, "ayla");
    }
}
