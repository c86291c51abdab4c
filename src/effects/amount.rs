//! Dynamic amounts and conditions.
//!
//! A [`DynamicAmount`] is a small expression evaluated against the game.
//! There are two timings. Formulas wrapped in [`DynamicAmount::OnStack`] are
//! fixed when the spell or ability is put on the stack (see
//! [`AmountEvaluator::lock_on_stack`]); everything else is evaluated live
//! when the effect resolves.
//!
//! ```
//! use ccg_rules::effects::{DynamicAmount, ObjectFilter};
//!
//! // "X plus the number of creatures you control"
//! let amount = DynamicAmount::X + DynamicAmount::Count(ObjectFilter::creature_you_control());
//! assert!(matches!(amount, DynamicAmount::Sum(_)));
//! ```

use serde::{Deserialize, Serialize};

use super::context::{EffectContext, Env, ObjectRef, PlayerRef};
use super::filter::{ObjectFilter, PlayerFilter};
use crate::cards::CounterKind;
use crate::zones::ZoneId;

/// A runtime-computed number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DynamicAmount {
    Fixed(i64),
    /// The X paid when casting or activating.
    X,
    /// Number of objects matching a filter (battlefield unless it names a zone).
    Count(ObjectFilter),
    /// Number of players matching a filter.
    CountPlayers(PlayerFilter),
    /// Total power of objects matching a filter.
    TotalPower(ObjectFilter),
    CountersOn { object: ObjectRef, kind: CounterKind },
    PowerOf(ObjectRef),
    ToughnessOf(ObjectRef),
    ManaValueOf(ObjectRef),
    LifeTotal(PlayerRef),
    HandSize(PlayerRef),
    /// The amount carried by the triggering event.
    TriggerAmount,
    Sum(Vec<DynamicAmount>),
    Difference(Box<DynamicAmount>, Box<DynamicAmount>),
    Product(Box<DynamicAmount>, Box<DynamicAmount>),
    Negate(Box<DynamicAmount>),
    Min(Box<DynamicAmount>, Box<DynamicAmount>),
    Max(Box<DynamicAmount>, Box<DynamicAmount>),
    IfElse {
        condition: Box<Condition>,
        then: Box<DynamicAmount>,
        otherwise: Box<DynamicAmount>,
    },
    /// Evaluated once, when the entry is put on the stack.
    OnStack(Box<DynamicAmount>),
}

impl DynamicAmount {
    #[must_use]
    pub fn on_stack(self) -> Self {
        DynamicAmount::OnStack(Box::new(self))
    }

    #[must_use]
    pub fn max(self, other: DynamicAmount) -> Self {
        DynamicAmount::Max(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn min(self, other: DynamicAmount) -> Self {
        DynamicAmount::Min(Box::new(self), Box::new(other))
    }

    /// Whether any part is locked on the stack.
    #[must_use]
    pub fn has_on_stack(&self) -> bool {
        match self {
            DynamicAmount::OnStack(_) => true,
            DynamicAmount::Sum(parts) => parts.iter().any(Self::has_on_stack),
            DynamicAmount::Difference(a, b)
            | DynamicAmount::Product(a, b)
            | DynamicAmount::Min(a, b)
            | DynamicAmount::Max(a, b) => a.has_on_stack() || b.has_on_stack(),
            DynamicAmount::Negate(a) => a.has_on_stack(),
            DynamicAmount::IfElse { then, otherwise, .. } => then.has_on_stack() || otherwise.has_on_stack(),
            _ => false,
        }
    }
}

impl From<i64> for DynamicAmount {
    fn from(value: i64) -> Self {
        DynamicAmount::Fixed(value)
    }
}

impl std::ops::Add for DynamicAmount {
    type Output = DynamicAmount;

    fn add(self, rhs: DynamicAmount) -> DynamicAmount {
        match self {
            DynamicAmount::Sum(mut parts) => {
                parts.push(rhs);
                DynamicAmount::Sum(parts)
            }
            lhs => DynamicAmount::Sum(vec![lhs, rhs]),
        }
    }
}

impl std::ops::Sub for DynamicAmount {
    type Output = DynamicAmount;

    fn sub(self, rhs: DynamicAmount) -> DynamicAmount {
        DynamicAmount::Difference(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for DynamicAmount {
    type Output = DynamicAmount;

    fn mul(self, rhs: DynamicAmount) -> DynamicAmount {
        DynamicAmount::Product(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for DynamicAmount {
    type Output = DynamicAmount;

    fn neg(self) -> DynamicAmount {
        DynamicAmount::Negate(Box::new(self))
    }
}

/// Numeric comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    #[must_use]
    pub fn holds(self, left: i64, right: i64) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }
}

/// A runtime-computed truth value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Always,
    Compare {
        left: DynamicAmount,
        op: Comparison,
        right: DynamicAmount,
    },
    /// Some object matches (battlefield unless the filter names a zone).
    Exists(ObjectFilter),
    /// Every object the reference resolves to matches, and there is one.
    ObjectMatches { object: ObjectRef, filter: ObjectFilter },
    IsYourTurn,
    SourceOnBattlefield,
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(left: impl Into<DynamicAmount>, op: Comparison, right: impl Into<DynamicAmount>) -> Self {
        Condition::Compare {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    /// "as long as this is a <filter>"
    #[must_use]
    pub fn source_is(filter: ObjectFilter) -> Self {
        Condition::ObjectMatches {
            object: ObjectRef::Source,
            filter,
        }
    }

    /// Visit every amount inside the condition.
    pub fn map_amounts(&mut self, f: &mut impl FnMut(&mut DynamicAmount)) {
        match self {
            Condition::Compare { left, right, .. } => {
                f(left);
                f(right);
            }
            Condition::And(parts) | Condition::Or(parts) => {
                for part in parts {
                    part.map_amounts(f);
                }
            }
            Condition::Not(inner) => inner.map_amounts(f),
            Condition::Always
            | Condition::Exists(_)
            | Condition::ObjectMatches { .. }
            | Condition::IsYourTurn
            | Condition::SourceOnBattlefield => {}
        }
    }
}

/// Evaluates amounts and conditions.
pub struct AmountEvaluator;

impl AmountEvaluator {
    /// Evaluate live. `OnStack` parts that were never locked are evaluated
    /// live as well.
    #[must_use]
    pub fn evaluate_at_resolution(amount: &DynamicAmount, env: &Env<'_>, ctx: &EffectContext) -> i64 {
        Self::evaluate(amount, env, ctx)
    }

    /// Evaluate the whole formula as of now, the moment of stacking.
    #[must_use]
    pub fn evaluate_on_stack(amount: &DynamicAmount, env: &Env<'_>, ctx: &EffectContext) -> i64 {
        Self::evaluate(amount, env, ctx)
    }

    /// Replace every `OnStack` part with its current value.
    #[must_use]
    pub fn lock_on_stack(amount: &DynamicAmount, env: &Env<'_>, ctx: &EffectContext) -> DynamicAmount {
        let mut locked = amount.clone();
        Self::lock_in_place(&mut locked, env, ctx);
        locked
    }

    pub(crate) fn lock_in_place(amount: &mut DynamicAmount, env: &Env<'_>, ctx: &EffectContext) {
        match amount {
            DynamicAmount::OnStack(inner) => {
                let value = Self::evaluate_on_stack(inner, env, ctx);
                *amount = DynamicAmount::Fixed(value);
            }
            DynamicAmount::Sum(parts) => {
                for part in parts {
                    Self::lock_in_place(part, env, ctx);
                }
            }
            DynamicAmount::Difference(a, b)
            | DynamicAmount::Product(a, b)
            | DynamicAmount::Min(a, b)
            | DynamicAmount::Max(a, b) => {
                Self::lock_in_place(a, env, ctx);
                Self::lock_in_place(b, env, ctx);
            }
            DynamicAmount::Negate(a) => Self::lock_in_place(a, env, ctx),
            DynamicAmount::IfElse { then, otherwise, .. } => {
                Self::lock_in_place(then, env, ctx);
                Self::lock_in_place(otherwise, env, ctx);
            }
            _ => {}
        }
    }

    fn evaluate(amount: &DynamicAmount, env: &Env<'_>, ctx: &EffectContext) -> i64 {
        match amount {
            DynamicAmount::Fixed(n) => *n,
            DynamicAmount::X => ctx.x,
            DynamicAmount::Count(filter) => count(filter.matching(env, ctx).len()),
            DynamicAmount::CountPlayers(filter) => count(
                env.state
                    .players_in_apnap_order()
                    .into_iter()
                    .filter(|&p| filter.matches(p, env, ctx))
                    .count(),
            ),
            DynamicAmount::TotalPower(filter) => env
                .objects()
                .filter(|view| filter.matches_in_play_view(view, env, ctx))
                .map(|view| view.characteristics.power.unwrap_or(0))
                .fold(0i64, i64::saturating_add),
            DynamicAmount::CountersOn { object, kind } => first_view(object, env, ctx)
                .map_or(0, |view| i64::from(view.object.counters.get(kind))),
            DynamicAmount::PowerOf(object) => first_view(object, env, ctx)
                .and_then(|view| view.characteristics.power)
                .unwrap_or(0),
            DynamicAmount::ToughnessOf(object) => first_view(object, env, ctx)
                .and_then(|view| view.characteristics.toughness)
                .unwrap_or(0),
            DynamicAmount::ManaValueOf(object) => {
                first_view(object, env, ctx).map_or(0, |view| view.characteristics.mana_value())
            }
            DynamicAmount::LifeTotal(player) => ctx
                .player(player, env)
                .map_or(0, |p| env.state.players[p].life),
            DynamicAmount::HandSize(player) => ctx
                .player(player, env)
                .map_or(0, |p| count(env.state.zones.zone_size(ZoneId::Hand(p)))),
            DynamicAmount::TriggerAmount => ctx.trigger.as_ref().map_or(0, |t| t.amount),
            DynamicAmount::Sum(parts) => parts
                .iter()
                .map(|part| Self::evaluate(part, env, ctx))
                .fold(0i64, i64::saturating_add),
            DynamicAmount::Difference(a, b) => {
                Self::evaluate(a, env, ctx).saturating_sub(Self::evaluate(b, env, ctx))
            }
            DynamicAmount::Product(a, b) => {
                Self::evaluate(a, env, ctx).saturating_mul(Self::evaluate(b, env, ctx))
            }
            DynamicAmount::Negate(a) => Self::evaluate(a, env, ctx).saturating_neg(),
            DynamicAmount::Min(a, b) => Self::evaluate(a, env, ctx).min(Self::evaluate(b, env, ctx)),
            DynamicAmount::Max(a, b) => Self::evaluate(a, env, ctx).max(Self::evaluate(b, env, ctx)),
            DynamicAmount::IfElse {
                condition,
                then,
                otherwise,
            } => {
                if Self::evaluate_condition(condition, env, ctx) {
                    Self::evaluate(then, env, ctx)
                } else {
                    Self::evaluate(otherwise, env, ctx)
                }
            }
            DynamicAmount::OnStack(inner) => Self::evaluate(inner, env, ctx),
        }
    }

    /// Evaluate a condition live.
    #[must_use]
    pub fn evaluate_condition(condition: &Condition, env: &Env<'_>, ctx: &EffectContext) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Compare { left, op, right } => {
                op.holds(Self::evaluate(left, env, ctx), Self::evaluate(right, env, ctx))
            }
            Condition::Exists(filter) => env.objects().any(|view| filter.matches_in_play_view(&view, env, ctx)),
            Condition::ObjectMatches { object, filter } => {
                let objects = ctx.objects(object, env);
                !objects.is_empty()
                    && objects.iter().all(|&id| {
                        env.view_or_lki(id)
                            .is_some_and(|view| filter.matches_view(&view, env, ctx))
                    })
            }
            Condition::IsYourTurn => env.state.turn.active == ctx.controller,
            Condition::SourceOnBattlefield => ctx
                .source
                .and_then(|source| env.state.object(source))
                .is_some_and(|object| object.zone.is_battlefield()),
            Condition::And(parts) => parts.iter().all(|c| Self::evaluate_condition(c, env, ctx)),
            Condition::Or(parts) => parts.iter().any(|c| Self::evaluate_condition(c, env, ctx)),
            Condition::Not(inner) => !Self::evaluate_condition(inner, env, ctx),
        }
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn first_view<'a>(
    object: &ObjectRef,
    env: &Env<'a>,
    ctx: &EffectContext,
) -> Option<super::context::ObjectView<'a>> {
    ctx.objects(object, env).into_iter().find_map(|id| env.view_or_lki(id))
}
