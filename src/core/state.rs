//! Game state.
//!
//! `GameState` is the single value every component reads and writes:
//! - the object arena, with last-known information of retired objects and
//!   the old-id to new-id mapping left by zone changes
//! - zones, the stack and priority
//! - registered continuous effects, replacements and triggers
//! - the event log and the pending trigger queue
//! - players, the turn and the RNG
//!
//! Collections are `im` persistent structures, so a clone is O(1). The game
//! clones the state as a checkpoint before each unit of work and swaps it
//! back in if the work stops for a decision.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::EngineConfig;
use super::entity::{ObjectId, Timestamp};
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;
use crate::abilities::{ReplacementEffect, ReplacementSpec};
use crate::cards::{CardDefinition, Characteristics, GameObject};
use crate::costs::ManaPool;
use crate::error::Result;
use crate::layers::{Affected, CharacteristicsTable, ContinuousEffect, Duration, EffectId, LayerSystem, Modification};
use crate::rules::{GameResult, TurnState};
use crate::stack::{Priority, Stack};
use crate::triggers::{GameEvent, PendingTrigger, TriggerRegistry};
use crate::zones::{ZoneId, ZoneManager, ZonePosition};

/// Per-player state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub life: i64,
    pub mana_pool: ManaPool,
    pub lands_played: u32,
    /// Tried to draw from an empty library since the last state check.
    pub drew_from_empty: bool,
    pub lost: bool,
}

impl PlayerState {
    #[must_use]
    pub fn new(life: i64) -> Self {
        Self {
            life,
            mana_pool: ManaPool::new(),
            lands_played: 0,
            drew_from_empty: false,
            lost: false,
        }
    }
}

/// An object as it last existed before it left its zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastKnown {
    pub object: GameObject,
    /// Effective characteristics at the moment it left.
    pub characteristics: Characteristics,
    pub controller: PlayerId,
}

/// Complete game state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub config: EngineConfig,
    pub turn: TurnState,
    pub players: PlayerMap<PlayerState>,

    objects: im::OrdMap<ObjectId, GameObject>,
    last_known: im::OrdMap<ObjectId, LastKnown>,
    successors: im::OrdMap<ObjectId, ObjectId>,

    pub zones: ZoneManager,
    pub stack: Stack,
    pub priority: Priority,

    pub continuous: im::Vector<ContinuousEffect>,
    pub replacements: im::Vector<ReplacementEffect>,
    pub triggers: TriggerRegistry,
    pub pending_triggers: im::Vector<PendingTrigger>,
    events: im::Vector<GameEvent>,

    pub rng: GameRng,
    next_object: u32,
    next_timestamp: u64,
    next_effect: u32,

    pub result: Option<GameResult>,
}

impl GameState {
    /// A game with no objects, before the first turn starts.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let players = PlayerMap::new(config.player_count, |_| PlayerState::new(config.starting_life));
        let rng = GameRng::new(config.seed);
        Self {
            turn: TurnState::new(PlayerId::new(0)),
            players,
            objects: im::OrdMap::new(),
            last_known: im::OrdMap::new(),
            successors: im::OrdMap::new(),
            zones: ZoneManager::new(),
            stack: Stack::new(),
            priority: Priority::new(),
            continuous: im::Vector::new(),
            replacements: im::Vector::new(),
            triggers: TriggerRegistry::new(),
            pending_triggers: im::Vector::new(),
            events: im::Vector::new(),
            rng,
            next_object: 1,
            next_timestamp: 1,
            next_effect: 0,
            result: None,
            config,
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.config.player_count
    }

    // === Objects ===

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(&id)
    }

    /// Every live object, in id order.
    pub fn objects(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.values()
    }

    pub(crate) fn insert_object(&mut self, object: GameObject) {
        self.objects.insert(object.id, object);
    }

    pub(crate) fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        self.objects.remove(&id)
    }

    /// Last-known information of an object that left its zone.
    #[must_use]
    pub fn last_known(&self, id: ObjectId) -> Option<&LastKnown> {
        self.last_known.get(&id)
    }

    pub(crate) fn remember(&mut self, lki: LastKnown) {
        self.last_known.insert(lki.object.id, lki);
    }

    /// The id an object has now, following every zone change since it had
    /// `old`. `None` if it never moved (or ceased to exist on its first move).
    #[must_use]
    pub fn new_identity_of(&self, old: ObjectId) -> Option<ObjectId> {
        let mut current = *self.successors.get(&old)?;
        while let Some(&next) = self.successors.get(&current) {
            current = next;
        }
        Some(current)
    }

    pub(crate) fn record_successor(&mut self, old: ObjectId, new: ObjectId) {
        self.successors.insert(old, new);
    }

    /// Put a new object for `definition` directly into a zone. Used for
    /// setup: no replacements apply and no event is emitted.
    pub fn place_new(&mut self, definition: Arc<CardDefinition>, owner: PlayerId, zone: ZoneId) -> Result<ObjectId> {
        let id = self.alloc_object_id();
        let timestamp = self.next_timestamp();
        self.zones.add_to_zone(id, zone, ZonePosition::Top)?;
        self.insert_object(GameObject::new(id, definition, owner, zone, timestamp));
        Ok(id)
    }

    pub(crate) fn alloc_object_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_object);
        self.next_object += 1;
        id
    }

    pub(crate) fn next_timestamp(&mut self) -> Timestamp {
        let timestamp = Timestamp(self.next_timestamp);
        self.next_timestamp += 1;
        timestamp
    }

    /// The timestamp the next object or effect will receive.
    #[must_use]
    pub fn current_timestamp(&self) -> Timestamp {
        Timestamp(self.next_timestamp)
    }

    /// Objects in a zone (ordered zones bottom to top, others in id order).
    #[must_use]
    pub fn zone_contents(&self, zone: ZoneId) -> Vec<ObjectId> {
        self.zones.contents(zone)
    }

    /// Effective characteristics of every live object.
    pub fn characteristics(&self) -> Result<CharacteristicsTable> {
        LayerSystem::compute(self)
    }

    // === Effects ===

    /// Register a continuous effect with a fresh timestamp.
    pub fn add_continuous_effect(
        &mut self,
        source: Option<ObjectId>,
        controller: PlayerId,
        affected: Affected,
        modifications: Vec<Modification>,
        duration: Duration,
    ) -> EffectId {
        let id = self.alloc_effect_id();
        let timestamp = self.next_timestamp();
        self.continuous.push_back(ContinuousEffect {
            id,
            source,
            controller,
            timestamp,
            duration,
            affected,
            modifications,
            condition: None,
        });
        id
    }

    /// Register a floating replacement effect.
    pub fn add_replacement(
        &mut self,
        spec: ReplacementSpec,
        source: Option<ObjectId>,
        controller: PlayerId,
        duration: Duration,
        objects: Option<Vec<ObjectId>>,
    ) -> EffectId {
        let id = self.alloc_effect_id();
        let timestamp = self.next_timestamp();
        self.replacements.push_back(ReplacementEffect {
            id,
            spec,
            source,
            controller,
            duration,
            timestamp,
            objects,
        });
        id
    }

    fn alloc_effect_id(&mut self) -> EffectId {
        let id = EffectId(self.next_effect);
        self.next_effect += 1;
        id
    }

    /// Drop "until end of turn" effects and damage. Runs in cleanup.
    pub(crate) fn end_of_turn_cleanup(&mut self) {
        self.continuous.retain(|e| e.duration != Duration::EndOfTurn);
        self.replacements.retain(|e| e.duration != Duration::EndOfTurn);
        let damaged: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.damage != 0 || o.deathtouch_damage)
            .map(|o| o.id)
            .collect();
        for id in damaged {
            if let Some(object) = self.objects.get_mut(&id) {
                object.damage = 0;
                object.deathtouch_damage = false;
            }
        }
    }

    // === Players and events ===

    /// Players still in the game, active player first.
    #[must_use]
    pub fn players_in_apnap_order(&self) -> Vec<PlayerId> {
        PlayerId::apnap(self.turn.active, self.player_count())
            .filter(|&p| !self.players[p].lost)
            .collect()
    }

    /// Players still in the game, in turn order starting from player 0.
    #[must_use]
    pub fn players_in_turn_order(&self) -> Vec<PlayerId> {
        PlayerId::all(self.player_count())
            .filter(|&p| !self.players[p].lost)
            .collect()
    }

    /// Append an event to the log.
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    /// Events not yet checked for triggers.
    pub fn events(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    pub(crate) fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events).into_iter().collect()
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    // === Snapshots ===

    /// Encode the full state.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a state produced by [`snapshot`](Self::snapshot).
    pub fn restore(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
