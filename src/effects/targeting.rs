//! Targets and target legality.
//!
//! Legality is checked twice:
//! - when targets are declared, an illegal choice rejects the whole
//!   placement (`IllegalTarget`), and a mandatory slot with no candidates
//!   makes the spell or ability uncastable (`NoLegalChoice`);
//! - when the entry starts to resolve, [`TargetValidator::recheck`] keeps
//!   only the targets that are still legal. The entry fizzles only when
//!   every target it had is gone.
//!
//! An object that changed zones is a new object, so a target that left and
//! came back is no longer the chosen target.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use super::context::{EffectContext, Env};
use super::filter::{ObjectFilter, PlayerFilter};
use crate::cards::{CardType, Keyword};
use crate::core::{ObjectId, PlayerId};
use crate::error::{Result, RulesError};
use crate::zones::ZoneKind;

/// A chosen target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Object(ObjectId),
    Player(PlayerId),
}

impl TargetRef {
    #[must_use]
    pub fn object(&self) -> Option<ObjectId> {
        match self {
            TargetRef::Object(id) => Some(*id),
            TargetRef::Player(_) => None,
        }
    }

    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            TargetRef::Player(p) => Some(*p),
            TargetRef::Object(_) => None,
        }
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetRef::Object(id) => write!(f, "{id}"),
            TargetRef::Player(p) => write!(f, "Player({})", p.0),
        }
    }
}

/// What a target slot accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TargetFilter {
    Object(ObjectFilter),
    Player(PlayerFilter),
    ObjectOrPlayer(ObjectFilter, PlayerFilter),
}

/// One target slot: a filter and how many targets it takes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub filter: TargetFilter,
    pub min: usize,
    pub max: usize,
}

impl TargetSpec {
    /// Exactly one object matching `filter`.
    #[must_use]
    pub fn object(filter: ObjectFilter) -> Self {
        Self {
            filter: TargetFilter::Object(filter),
            min: 1,
            max: 1,
        }
    }

    /// Exactly one player matching `filter`.
    #[must_use]
    pub fn player(filter: PlayerFilter) -> Self {
        Self {
            filter: TargetFilter::Player(filter),
            min: 1,
            max: 1,
        }
    }

    /// "any target": a creature, a planeswalker or a player.
    #[must_use]
    pub fn any() -> Self {
        Self {
            filter: TargetFilter::ObjectOrPlayer(
                ObjectFilter::creature().or(ObjectFilter::CardType(CardType::Planeswalker)),
                PlayerFilter::Any,
            ),
            min: 1,
            max: 1,
        }
    }

    /// A spell on the stack matching `filter`.
    #[must_use]
    pub fn spell(filter: ObjectFilter) -> Self {
        Self::object(filter.and(ObjectFilter::InZone(ZoneKind::Stack)))
    }

    /// "up to N": between zero and `max` targets.
    #[must_use]
    pub fn up_to(mut self, max: usize) -> Self {
        self.min = 0;
        self.max = max;
        self
    }

    /// Exactly `count` targets.
    #[must_use]
    pub fn exactly(mut self, count: usize) -> Self {
        self.min = count;
        self.max = count;
        self
    }

    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.min > 0
    }
}

/// Targets still legal at resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Recheck {
    /// Per slot, the targets that are still legal.
    pub targets: Vec<Vec<TargetRef>>,
    /// The entry had targets and none of them is legal any more.
    pub all_illegal: bool,
}

/// Target legality checks.
pub struct TargetValidator;

impl TargetValidator {
    /// Whether `target` is a legal choice for `filter` right now.
    ///
    /// Objects in a library or hand are never targetable. Shroud makes an
    /// object untargetable; hexproof makes it untargetable by opponents of
    /// its controller.
    #[must_use]
    pub fn is_legal(target: TargetRef, filter: &TargetFilter, env: &Env<'_>, ctx: &EffectContext) -> bool {
        match (target, filter) {
            (TargetRef::Object(id), TargetFilter::Object(objects))
            | (TargetRef::Object(id), TargetFilter::ObjectOrPlayer(objects, _)) => {
                Self::object_is_legal(id, objects, env, ctx)
            }
            (TargetRef::Player(p), TargetFilter::Player(players))
            | (TargetRef::Player(p), TargetFilter::ObjectOrPlayer(_, players)) => {
                env.state.players.try_get(p).is_some_and(|state| !state.lost) && players.matches(p, env, ctx)
            }
            _ => false,
        }
    }

    fn object_is_legal(id: ObjectId, filter: &ObjectFilter, env: &Env<'_>, ctx: &EffectContext) -> bool {
        let Some(view) = env.view(id) else {
            return false;
        };
        if matches!(view.zone().kind(), ZoneKind::Library | ZoneKind::Hand) {
            return false;
        }
        let chars = view.characteristics;
        if chars.has_keyword(&Keyword::Shroud) {
            return false;
        }
        if chars.has_keyword(&Keyword::Hexproof) && view.controller != ctx.controller {
            return false;
        }
        filter.matches_in_play_view(&view, env, ctx)
    }

    /// Every legal choice for a slot: objects in id order, then players in
    /// APNAP order.
    #[must_use]
    pub fn candidates(spec: &TargetSpec, env: &Env<'_>, ctx: &EffectContext) -> Vec<TargetRef> {
        let mut candidates = Vec::new();
        if matches!(spec.filter, TargetFilter::Object(_) | TargetFilter::ObjectOrPlayer(..)) {
            candidates.extend(
                env.objects()
                    .map(|view| TargetRef::Object(view.id()))
                    .filter(|&t| Self::is_legal(t, &spec.filter, env, ctx)),
            );
        }
        if matches!(spec.filter, TargetFilter::Player(_) | TargetFilter::ObjectOrPlayer(..)) {
            candidates.extend(
                env.state
                    .players_in_apnap_order()
                    .into_iter()
                    .map(TargetRef::Player)
                    .filter(|&t| Self::is_legal(t, &spec.filter, env, ctx)),
            );
        }
        candidates
    }

    /// Whether every mandatory slot can be filled.
    #[must_use]
    pub fn has_legal_choices(specs: &[TargetSpec], env: &Env<'_>, ctx: &EffectContext) -> bool {
        specs
            .iter()
            .filter(|spec| spec.is_mandatory())
            .all(|spec| Self::candidates(spec, env, ctx).len() >= spec.min)
    }

    /// Check a declaration: one chosen list per slot, each within the
    /// slot's count, no repeats, every choice legal.
    pub fn validate_declaration(
        specs: &[TargetSpec],
        chosen: &[Vec<TargetRef>],
        env: &Env<'_>,
        ctx: &EffectContext,
    ) -> Result<()> {
        if !Self::has_legal_choices(specs, env, ctx) {
            return Err(RulesError::NoLegalChoice("a required target has no legal choice".into()));
        }
        if chosen.len() != specs.len() {
            return Err(RulesError::IllegalTarget(format!(
                "{} target slots declared, {} expected",
                chosen.len(),
                specs.len()
            )));
        }
        for (slot, (spec, targets)) in specs.iter().zip(chosen).enumerate() {
            if targets.len() < spec.min || targets.len() > spec.max {
                return Err(RulesError::IllegalTarget(format!(
                    "slot {slot} takes {}..={} targets, got {}",
                    spec.min,
                    spec.max,
                    targets.len()
                )));
            }
            let mut seen: SmallVec<[TargetRef; 4]> = SmallVec::new();
            for &target in targets {
                if seen.contains(&target) {
                    return Err(RulesError::IllegalTarget(format!("{target} chosen twice in slot {slot}")));
                }
                seen.push(target);
                if !Self::is_legal(target, &spec.filter, env, ctx) {
                    return Err(RulesError::IllegalTarget(format!("{target} is not a legal target for slot {slot}")));
                }
            }
        }
        Ok(())
    }

    /// Re-check chosen targets as resolution begins.
    #[must_use]
    pub fn recheck(specs: &[TargetSpec], chosen: &[Vec<TargetRef>], env: &Env<'_>, ctx: &EffectContext) -> Recheck {
        let mut had_any = false;
        let mut any_legal = false;
        let targets = chosen
            .iter()
            .enumerate()
            .map(|(slot, targets)| {
                had_any |= !targets.is_empty();
                let legal: Vec<TargetRef> = match specs.get(slot) {
                    Some(spec) => targets
                        .iter()
                        .copied()
                        .filter(|&t| {
                            let ok = Self::is_legal(t, &spec.filter, env, ctx);
                            if !ok {
                                trace!(target = %t, slot, "target no longer legal");
                            }
                            ok
                        })
                        .collect(),
                    None => Vec::new(),
                };
                any_legal |= !legal.is_empty();
                legal
            })
            .collect();
        Recheck {
            targets,
            all_illegal: had_any && !any_legal,
        }
    }
}
