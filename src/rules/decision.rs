//! Player decisions and replayable choices.
//!
//! The engine never blocks on a player. When work needs a choice it
//! returns a [`DecisionRequest`]; the game rolls the state back to the
//! checkpoint the work started from and waits. Once the caller submits a
//! [`DecisionResponse`] the work is replayed from the checkpoint with every
//! answer given so far, so a half-applied effect is never observable.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ObjectId, PlayerId};
use crate::effects::TargetRef;
use crate::error::{Result, RulesError};

/// Why a player is choosing objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceReason {
    Sacrifice,
    Discard,
    /// Choose the legendary permanent to keep.
    LegendRule,
    /// Discard down to maximum hand size.
    CleanupDiscard,
    /// Choose what an object enters as a copy of.
    CopyTarget,
}

/// Legal choices for one target slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSlot {
    pub min: usize,
    pub max: usize,
    pub candidates: Vec<TargetRef>,
}

/// A choice the engine needs from a player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DecisionRequest {
    /// Order simultaneous triggers. Answer with a permutation of indices;
    /// the first goes on the stack first and resolves last.
    OrderTriggers {
        player: PlayerId,
        sources: Vec<Option<ObjectId>>,
    },
    /// Choose targets for a triggered ability, one list per slot.
    ChooseTargets {
        player: PlayerId,
        source: Option<ObjectId>,
        slots: Vec<TargetSlot>,
    },
    /// Choose modes by index.
    ChooseModes {
        player: PlayerId,
        source: Option<ObjectId>,
        count: usize,
        min: usize,
        max: usize,
    },
    /// "You may ..."
    May { player: PlayerId, source: Option<ObjectId> },
    ChooseObjects {
        player: PlayerId,
        candidates: Vec<ObjectId>,
        min: usize,
        max: usize,
        reason: ChoiceReason,
    },
    /// Choose which of several replacement effects applies first.
    ChooseReplacement {
        player: PlayerId,
        object: ObjectId,
        options: usize,
    },
}

/// An answer to a [`DecisionRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionResponse {
    Order(Vec<usize>),
    Targets(Vec<Vec<TargetRef>>),
    Modes(Vec<usize>),
    Bool(bool),
    Objects(Vec<ObjectId>),
    Index(usize),
}

impl DecisionRequest {
    /// The player who decides.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        match self {
            DecisionRequest::OrderTriggers { player, .. }
            | DecisionRequest::ChooseTargets { player, .. }
            | DecisionRequest::ChooseModes { player, .. }
            | DecisionRequest::May { player, .. }
            | DecisionRequest::ChooseObjects { player, .. }
            | DecisionRequest::ChooseReplacement { player, .. } => *player,
        }
    }

    /// Check that `response` answers this request.
    pub fn validate(&self, response: &DecisionResponse) -> Result<()> {
        let invalid = |why: String| Err(RulesError::InvalidAction(why));
        match (self, response) {
            (DecisionRequest::OrderTriggers { sources, .. }, DecisionResponse::Order(order)) => {
                let mut sorted = order.clone();
                sorted.sort_unstable();
                if sorted != (0..sources.len()).collect::<Vec<_>>() {
                    return invalid(format!("{order:?} is not an ordering of {} triggers", sources.len()));
                }
                Ok(())
            }
            (DecisionRequest::ChooseTargets { slots, .. }, DecisionResponse::Targets(chosen)) => {
                if chosen.len() != slots.len() {
                    return invalid(format!("{} target slots answered, {} expected", chosen.len(), slots.len()));
                }
                for (slot, (spec, targets)) in slots.iter().zip(chosen).enumerate() {
                    if targets.len() < spec.min || targets.len() > spec.max {
                        return invalid(format!("slot {slot} takes {}..={} targets", spec.min, spec.max));
                    }
                    distinct(targets, |t| t.to_string())?;
                    if let Some(bad) = targets.iter().find(|t| !spec.candidates.contains(t)) {
                        return invalid(format!("{bad} is not a legal target for slot {slot}"));
                    }
                }
                Ok(())
            }
            (DecisionRequest::ChooseModes { count, min, max, .. }, DecisionResponse::Modes(modes)) => {
                if modes.len() < *min || modes.len() > *max {
                    return invalid(format!("choose {min}..={max} modes, got {}", modes.len()));
                }
                distinct(modes, |m| m.to_string())?;
                if let Some(bad) = modes.iter().find(|&&m| m >= *count) {
                    return invalid(format!("mode {bad} does not exist"));
                }
                Ok(())
            }
            (DecisionRequest::May { .. }, DecisionResponse::Bool(_)) => Ok(()),
            (
                DecisionRequest::ChooseObjects {
                    candidates, min, max, ..
                },
                DecisionResponse::Objects(chosen),
            ) => {
                if chosen.len() < *min || chosen.len() > *max {
                    return invalid(format!("choose {min}..={max} objects, got {}", chosen.len()));
                }
                distinct(chosen, |o| o.to_string())?;
                if let Some(bad) = chosen.iter().find(|o| !candidates.contains(o)) {
                    return invalid(format!("{bad} is not a candidate"));
                }
                Ok(())
            }
            (DecisionRequest::ChooseReplacement { options, .. }, DecisionResponse::Index(index)) => {
                if index >= options {
                    return invalid(format!("replacement {index} does not exist"));
                }
                Ok(())
            }
            (request, response) => invalid(format!("{response:?} does not answer {request:?}")),
        }
    }

    /// The answer used where no player is asked: identity order, the
    /// first legal choices, "no" for optional actions.
    #[must_use]
    pub fn default_response(&self) -> DecisionResponse {
        match self {
            DecisionRequest::OrderTriggers { sources, .. } => DecisionResponse::Order((0..sources.len()).collect()),
            DecisionRequest::ChooseTargets { slots, .. } => DecisionResponse::Targets(
                slots
                    .iter()
                    .map(|slot| slot.candidates.iter().copied().take(slot.min).collect())
                    .collect(),
            ),
            DecisionRequest::ChooseModes { min, .. } => DecisionResponse::Modes((0..*min).collect()),
            DecisionRequest::May { .. } => DecisionResponse::Bool(false),
            DecisionRequest::ChooseObjects { candidates, min, .. } => {
                DecisionResponse::Objects(candidates.iter().copied().take(*min).collect())
            }
            DecisionRequest::ChooseReplacement { .. } => DecisionResponse::Index(0),
        }
    }
}

fn distinct<T: PartialEq>(items: &[T], show: impl Fn(&T) -> String) -> Result<()> {
    let mut seen: SmallVec<[&T; 8]> = SmallVec::new();
    for item in items {
        if seen.contains(&item) {
            return Err(RulesError::InvalidAction(format!("{} chosen twice", show(item))));
        }
        seen.push(item);
    }
    Ok(())
}

/// Why work stopped before finishing.
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// A player must decide; the work is replayed once they have.
    Decision(DecisionRequest),
    Error(RulesError),
}

impl Interrupt {
    /// Treat an unexpected decision as an engine error.
    pub(crate) fn into_error(self) -> RulesError {
        match self {
            Interrupt::Decision(request) => {
                RulesError::invariant(format!("decision requested where none can be asked: {request:?}"))
            }
            Interrupt::Error(err) => err,
        }
    }
}

impl From<RulesError> for Interrupt {
    fn from(err: RulesError) -> Self {
        Interrupt::Error(err)
    }
}

/// Result of work that may stop for a decision.
pub(crate) type Flow<T> = std::result::Result<T, Interrupt>;

/// Answers available to a unit of work, consumed in order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Choices {
    answers: Vec<DecisionResponse>,
    cursor: usize,
    defaulting: bool,
}

impl Choices {
    pub(crate) fn new(answers: Vec<DecisionResponse>) -> Self {
        Self {
            answers,
            cursor: 0,
            defaulting: false,
        }
    }

    /// Choices that never ask: every request gets its default response.
    pub(crate) fn defaulting() -> Self {
        Self {
            defaulting: true,
            ..Self::default()
        }
    }

    /// The next answer, or an interrupt asking for it.
    pub(crate) fn ask(&mut self, request: DecisionRequest) -> Flow<DecisionResponse> {
        if self.defaulting {
            return Ok(request.default_response());
        }
        match self.answers.get(self.cursor) {
            Some(answer) => {
                self.cursor += 1;
                request.validate(answer).map_err(|err| {
                    RulesError::invariant(format!("replayed decision no longer fits: {err}"))
                })?;
                Ok(answer.clone())
            }
            None => Err(Interrupt::Decision(request)),
        }
    }

    pub(crate) fn order(&mut self, player: PlayerId, sources: Vec<Option<ObjectId>>) -> Flow<Vec<usize>> {
        match self.ask(DecisionRequest::OrderTriggers { player, sources })? {
            DecisionResponse::Order(order) => Ok(order),
            other => Err(mismatch(&other)),
        }
    }

    pub(crate) fn targets(
        &mut self,
        player: PlayerId,
        source: Option<ObjectId>,
        slots: Vec<TargetSlot>,
    ) -> Flow<Vec<Vec<TargetRef>>> {
        match self.ask(DecisionRequest::ChooseTargets { player, source, slots })? {
            DecisionResponse::Targets(targets) => Ok(targets),
            other => Err(mismatch(&other)),
        }
    }

    pub(crate) fn modes(
        &mut self,
        player: PlayerId,
        source: Option<ObjectId>,
        count: usize,
        min: usize,
        max: usize,
    ) -> Flow<Vec<usize>> {
        let request = DecisionRequest::ChooseModes {
            player,
            source,
            count,
            min,
            max,
        };
        match self.ask(request)? {
            DecisionResponse::Modes(mut modes) => {
                modes.sort_unstable();
                Ok(modes)
            }
            other => Err(mismatch(&other)),
        }
    }

    pub(crate) fn may(&mut self, player: PlayerId, source: Option<ObjectId>) -> Flow<bool> {
        match self.ask(DecisionRequest::May { player, source })? {
            DecisionResponse::Bool(yes) => Ok(yes),
            other => Err(mismatch(&other)),
        }
    }

    /// Choose between `min` and `max` objects. Skips the question when the
    /// answer is forced.
    pub(crate) fn objects(
        &mut self,
        player: PlayerId,
        candidates: Vec<ObjectId>,
        min: usize,
        max: usize,
        reason: ChoiceReason,
    ) -> Flow<Vec<ObjectId>> {
        let max = max.min(candidates.len());
        let min = min.min(max);
        if max == 0 {
            return Ok(Vec::new());
        }
        if min == candidates.len() {
            return Ok(candidates);
        }
        let request = DecisionRequest::ChooseObjects {
            player,
            candidates,
            min,
            max,
            reason,
        };
        match self.ask(request)? {
            DecisionResponse::Objects(objects) => Ok(objects),
            other => Err(mismatch(&other)),
        }
    }

    pub(crate) fn replacement(&mut self, player: PlayerId, object: ObjectId, options: usize) -> Flow<usize> {
        match self.ask(DecisionRequest::ChooseReplacement { player, object, options })? {
            DecisionResponse::Index(index) => Ok(index),
            other => Err(mismatch(&other)),
        }
    }
}

fn mismatch(response: &DecisionResponse) -> Interrupt {
    Interrupt::Error(RulesError::invariant(format!("unexpected decision response {response:?}")))
}
