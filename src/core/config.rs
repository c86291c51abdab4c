//! Engine configuration.
//!
//! The rules core is configured once at game creation. Everything here is
//! plain data so a configuration can be stored alongside a snapshot and
//! replayed.

use serde::{Deserialize, Serialize};

/// Configuration for a game.
///
/// ## Example
///
/// ```
/// use ccg_rules::core::EngineConfig;
///
/// let config = EngineConfig::new(4)
///     .with_starting_life(40)
///     .with_seed(7);
///
/// assert_eq!(config.player_count, 4);
/// assert_eq!(config.starting_life, 40);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of players.
    pub player_count: usize,

    /// Life total each player starts with.
    pub starting_life: i64,

    /// Hand size enforced during cleanup.
    pub max_hand_size: usize,

    /// Seed for the game RNG.
    pub seed: u64,

    /// Maximum state-based action passes in one check before the engine
    /// reports an invariant violation.
    pub sba_iteration_limit: usize,

    /// Place a player's simultaneous triggers in detection order instead of
    /// asking the player to order them.
    pub auto_order_triggers: bool,

    /// The starting player skips the draw on the first turn.
    pub skip_first_draw: bool,
}

impl EngineConfig {
    /// Create a configuration with default values for `player_count` players.
    pub fn new(player_count: usize) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        Self {
            player_count,
            starting_life: 20,
            max_hand_size: 7,
            seed: 0,
            sba_iteration_limit: 64,
            auto_order_triggers: false,
            skip_first_draw: true,
        }
    }

    /// Set the starting life total.
    #[must_use]
    pub fn with_starting_life(mut self, life: i64) -> Self {
        self.starting_life = life;
        self
    }

    /// Set the maximum hand size.
    #[must_use]
    pub fn with_max_hand_size(mut self, size: usize) -> Self {
        self.max_hand_size = size;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the state-based action iteration guard.
    #[must_use]
    pub fn with_sba_iteration_limit(mut self, limit: usize) -> Self {
        self.sba_iteration_limit = limit;
        self
    }

    /// Toggle automatic trigger ordering.
    #[must_use]
    pub fn with_auto_order_triggers(mut self, auto: bool) -> Self {
        self.auto_order_triggers = auto;
        self
    }

    /// Toggle the first-turn draw skip.
    #[must_use]
    pub fn with_skip_first_draw(mut self, skip: bool) -> Self {
        self.skip_first_draw = skip;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(2)
    }
}
