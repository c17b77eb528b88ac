//! # Battle Sessions
//!
//! A battle session is created when a player enters combat on a level and
//! resolved once, when the client reports which monsters were defeated.
//!
//! ```text
//! create() ──► Pending ──────resolve()──────► Resolved
//!               │    ▲                          ▲
//!          claim()  release()               settle()
//!               ▼    │                          │
//!              Settling ────────────────────────┘
//! ```
//!
//! A finish request claims the battle, pays the reward through the document
//! store, then settles it. If the payout fails the battle is released back
//! to pending so the client can retry. `sweep(ttl)` drops pending and
//! resolved sessions once they are old enough.
//!
//! Participants are snapshots of the monster templates taken at creation, so
//! rewards stay stable even if world content changes mid-fight.

use crate::error::BattleError;
use crate::world::{Monster, WorldCatalog};
use bitrealm_protocol::BattleId;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifecycle state of a battle session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BattleStatus {
    Pending,
    /// Claimed by a finish request whose payout has not completed yet
    Settling,
    Resolved,
}

/// Aggregate reward of a resolved battle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Reward {
    pub gold: f64,
    pub exp: f64,
    /// Player's total experience after the reward was applied
    pub total_exp: f64,
}

/// Server-side record of one encounter.
#[derive(Debug, Clone, Serialize)]
pub struct BattleSession {
    pub battle_id: BattleId,
    pub status: BattleStatus,
    pub participants: Vec<Monster>,
    /// One 0/1 flag per participant; 1 marks a defeated monster
    pub reward_matrix: Vec<u8>,
    pub reward: Reward,
    #[serde(skip)]
    pub created_at: Instant,
}

/// Table of live battle sessions.
///
/// Every operation runs under a single lock, so a resolve reads, mutates and
/// writes back its session atomically even when a client sends the same
/// finish request twice from concurrent tasks.
#[derive(Debug, Default)]
pub struct BattleTable {
    sessions: Mutex<HashMap<BattleId, BattleSession>>,
}

impl BattleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a battle on `level_id` with `count` monsters drawn from the
    /// level's pool.
    ///
    /// # Errors
    ///
    /// * [`BattleError::UnknownLevel`] if the catalog has no such level
    /// * [`BattleError::EmptyMonsterPool`] if the level has no monsters
    pub fn create(
        &self,
        catalog: &WorldCatalog,
        level_id: &str,
        count: usize,
    ) -> Result<BattleSession, BattleError> {
        let pool = catalog
            .monster_pool(level_id)
            .ok_or_else(|| BattleError::UnknownLevel(level_id.to_string()))?;
        self.create_from_pool(level_id, &pool, count, &mut rand::thread_rng())
    }

    /// Creates a battle from an already resolved monster pool.
    ///
    /// Each of the `count` slots is drawn independently and uniformly, so the
    /// same monster may appear more than once.
    pub fn create_from_pool<R: Rng>(
        &self,
        level_id: &str,
        pool: &[Monster],
        count: usize,
        rng: &mut R,
    ) -> Result<BattleSession, BattleError> {
        if pool.is_empty() {
            return Err(BattleError::EmptyMonsterPool(level_id.to_string()));
        }

        let participants: Vec<Monster> = (0..count)
            .map(|_| pool[rng.gen_range(0..pool.len())].clone())
            .collect();

        let session = BattleSession {
            battle_id: BattleId::new(),
            status: BattleStatus::Pending,
            reward_matrix: vec![0; participants.len()],
            participants,
            reward: Reward::default(),
            created_at: Instant::now(),
        };

        debug!(
            "⚔️ Battle {} created on level {} with {} participant(s)",
            session.battle_id,
            level_id,
            session.participants.len()
        );
        self.sessions
            .lock()
            .insert(session.battle_id, session.clone());
        Ok(session)
    }

    /// Resolves a pending battle with the client's reward matrix in one
    /// step, for callers that have nothing to pay out.
    ///
    /// A matrix shorter than the participant list leaves the remaining
    /// participants unflagged.
    ///
    /// # Errors
    ///
    /// * [`BattleError::UnknownBattle`] if no session has this id
    /// * [`BattleError::AlreadyResolved`] on a second resolve
    /// * [`BattleError::SettlementInProgress`] while a payout is running
    /// * [`BattleError::RewardIndexOutOfRange`] if the matrix is longer than
    ///   the participant list
    ///
    /// A rejected call leaves the session untouched.
    pub fn resolve(&self, battle_id: BattleId, reward_matrix: &[u8]) -> Result<Reward, BattleError> {
        let mut sessions = self.sessions.lock();
        let session = pending_session(&mut sessions, battle_id)?;
        let reward = tally(session, reward_matrix)?;
        session.status = BattleStatus::Resolved;

        debug!(
            "🏁 Battle {} resolved: {} gold, {} exp",
            battle_id, reward.gold, reward.exp
        );
        Ok(reward)
    }

    /// Reserves a pending battle for payout and computes its reward.
    ///
    /// The session moves to [`BattleStatus::Settling`]; the caller finishes
    /// with [`BattleTable::settle`] once the reward is paid, or hands the
    /// battle back with [`BattleTable::release`] if paying failed. Errors
    /// are the same as [`BattleTable::resolve`].
    pub fn claim(&self, battle_id: BattleId, reward_matrix: &[u8]) -> Result<Reward, BattleError> {
        let mut sessions = self.sessions.lock();
        let session = pending_session(&mut sessions, battle_id)?;
        let reward = tally(session, reward_matrix)?;
        session.status = BattleStatus::Settling;
        Ok(reward)
    }

    /// Marks a claimed battle resolved, recording the player's total
    /// experience after the reward was applied.
    pub fn settle(&self, battle_id: BattleId, total_exp: f64) -> Result<Reward, BattleError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&battle_id)
            .ok_or(BattleError::UnknownBattle(battle_id))?;
        if session.status != BattleStatus::Settling {
            return Err(BattleError::AlreadyResolved(battle_id));
        }

        session.reward.total_exp = total_exp;
        session.status = BattleStatus::Resolved;
        debug!(
            "🏁 Battle {} settled: {} gold, {} exp",
            battle_id, session.reward.gold, session.reward.exp
        );
        Ok(session.reward)
    }

    /// Returns a claimed battle to pending so the finish can be retried.
    pub fn release(&self, battle_id: BattleId) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get_mut(&battle_id) {
            if session.status == BattleStatus::Settling {
                session.status = BattleStatus::Pending;
                session.reward = Reward::default();
                session.reward_matrix.fill(0);
                debug!("↩️ Battle {} released back to pending", battle_id);
            }
        }
    }

    /// Snapshot of a session.
    pub fn get(&self, battle_id: BattleId) -> Option<BattleSession> {
        self.sessions.lock().get(&battle_id).cloned()
    }

    /// Drops sessions created at least `ttl` ago, resolved or not. Sessions
    /// in the middle of a payout are kept.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| {
            session.status == BattleStatus::Settling || session.created_at.elapsed() < ttl
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("🧹 Swept {} stale battle session(s)", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

fn pending_session(
    sessions: &mut HashMap<BattleId, BattleSession>,
    battle_id: BattleId,
) -> Result<&mut BattleSession, BattleError> {
    let session = sessions
        .get_mut(&battle_id)
        .ok_or(BattleError::UnknownBattle(battle_id))?;
    match session.status {
        BattleStatus::Pending => Ok(session),
        BattleStatus::Settling => Err(BattleError::SettlementInProgress(battle_id)),
        BattleStatus::Resolved => Err(BattleError::AlreadyResolved(battle_id)),
    }
}

/// Sums the reward of the flagged participants and stores the matrix.
fn tally(session: &mut BattleSession, reward_matrix: &[u8]) -> Result<Reward, BattleError> {
    if reward_matrix.len() > session.participants.len() {
        return Err(BattleError::RewardIndexOutOfRange {
            matrix_len: reward_matrix.len(),
            participants: session.participants.len(),
        });
    }

    let mut reward = Reward::default();
    for (monster, _) in session
        .participants
        .iter()
        .zip(reward_matrix)
        .filter(|(_, flag)| **flag == 1)
    {
        reward.gold += monster.gold_gain;
        reward.exp += monster.experience_gain;
    }

    session.reward_matrix[..reward_matrix.len()].copy_from_slice(reward_matrix);
    session.reward = reward;
    Ok(reward)
}
