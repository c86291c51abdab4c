//! Composable predicates over objects and players.
//!
//! Filters read *effective* characteristics (through [`Env`]) and are
//! evaluated relative to an [`EffectContext`]: "you" is the context's
//! controller and "this" is its source. They compose with `And`, `Or` and
//! `Not`.
//!
//! ```
//! use ccg_rules::effects::{ObjectFilter, PlayerFilter};
//!
//! // "untapped Elf you control"
//! let filter = ObjectFilter::subtype("Elf")
//!     .and(ObjectFilter::Untapped)
//!     .and(ObjectFilter::ControlledBy(PlayerFilter::You));
//! assert!(!filter.mentions_zone());
//! ```

use serde::{Deserialize, Serialize};

use super::context::{EffectContext, Env, ObjectRef, ObjectView, PlayerRef};
use crate::cards::{CardType, Color, CounterKind, Keyword, Subtype, Supertype};
use crate::core::PlayerId;
use crate::zones::ZoneKind;

/// Predicate over players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlayerFilter {
    Any,
    You,
    Opponent,
    Active,
    NonActive,
    Is(PlayerRef),
    Not(Box<PlayerFilter>),
    Or(Vec<PlayerFilter>),
}

impl PlayerFilter {
    #[must_use]
    pub fn matches(&self, player: PlayerId, env: &Env<'_>, ctx: &EffectContext) -> bool {
        match self {
            PlayerFilter::Any => true,
            PlayerFilter::You => player == ctx.controller,
            PlayerFilter::Opponent => player != ctx.controller,
            PlayerFilter::Active => player == env.state.turn.active,
            PlayerFilter::NonActive => player != env.state.turn.active,
            PlayerFilter::Is(reference) => ctx.players(reference, env).contains(&player),
            PlayerFilter::Not(inner) => !inner.matches(player, env, ctx),
            PlayerFilter::Or(filters) => filters.iter().any(|f| f.matches(player, env, ctx)),
        }
    }
}

/// Predicate over objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectFilter {
    Any,
    And(Vec<ObjectFilter>),
    Or(Vec<ObjectFilter>),
    Not(Box<ObjectFilter>),

    CardType(CardType),
    Subtype(Subtype),
    Supertype(Supertype),
    Color(Color),
    Colorless,
    Multicolored,
    Keyword(Keyword),
    Named(String),

    ControlledBy(PlayerFilter),
    OwnedBy(PlayerFilter),
    InZone(ZoneKind),

    PowerAtLeast(i64),
    PowerAtMost(i64),
    ToughnessAtLeast(i64),
    ToughnessAtMost(i64),
    ManaValueAtMost(i64),

    Tapped,
    Untapped,
    FaceDown,
    Token,
    HasCounter(CounterKind),

    /// The context's source.
    Source,
    /// Anything except the context's source.
    Other,
    /// Attached to the context's source.
    AttachedToSource,
    /// The object the context's source is attached to.
    SourceAttachedTo,
    /// Shares a card type with any object the reference resolves to.
    SharesTypeWith(ObjectRef),
}

impl ObjectFilter {
    #[must_use]
    pub fn creature() -> Self {
        ObjectFilter::CardType(CardType::Creature)
    }

    pub fn subtype(name: impl Into<String>) -> Self {
        ObjectFilter::Subtype(Subtype::new(name))
    }

    /// "creature you control"
    #[must_use]
    pub fn creature_you_control() -> Self {
        Self::creature().and(ObjectFilter::ControlledBy(PlayerFilter::You))
    }

    /// Conjunction, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: ObjectFilter) -> Self {
        match (self, other) {
            (ObjectFilter::Any, f) | (f, ObjectFilter::Any) => f,
            (ObjectFilter::And(mut left), ObjectFilter::And(right)) => {
                left.extend(right);
                ObjectFilter::And(left)
            }
            (ObjectFilter::And(mut left), f) => {
                left.push(f);
                ObjectFilter::And(left)
            }
            (f, other) => ObjectFilter::And(vec![f, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: ObjectFilter) -> Self {
        match self {
            ObjectFilter::Or(mut filters) => {
                filters.push(other);
                ObjectFilter::Or(filters)
            }
            f => ObjectFilter::Or(vec![f, other]),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        ObjectFilter::Not(Box::new(self))
    }

    /// Restrict to the battlefield.
    #[must_use]
    pub fn on_battlefield(self) -> Self {
        self.and(ObjectFilter::InZone(ZoneKind::Battlefield))
    }

    /// Whether the filter names a zone anywhere. Filters that do not are
    /// treated as battlefield filters where a zone matters (targets, counts).
    #[must_use]
    pub fn mentions_zone(&self) -> bool {
        match self {
            ObjectFilter::InZone(_) => true,
            ObjectFilter::And(filters) | ObjectFilter::Or(filters) => filters.iter().any(Self::mentions_zone),
            ObjectFilter::Not(inner) => inner.mentions_zone(),
            _ => false,
        }
    }

    /// Rewrite every mention of one subtype as another.
    pub fn replace_subtype(&mut self, from: &Subtype, to: &Subtype) {
        match self {
            ObjectFilter::Subtype(subtype) => {
                if *subtype == *from {
                    *subtype = to.clone();
                }
            }
            ObjectFilter::And(filters) | ObjectFilter::Or(filters) => {
                for filter in filters {
                    filter.replace_subtype(from, to);
                }
            }
            ObjectFilter::Not(inner) => inner.replace_subtype(from, to),
            _ => {}
        }
    }

    /// Evaluate against a live object.
    #[must_use]
    pub fn matches(&self, object: crate::core::ObjectId, env: &Env<'_>, ctx: &EffectContext) -> bool {
        env.view(object).is_some_and(|view| self.matches_view(&view, env, ctx))
    }

    /// Evaluate against a live object that must be on the battlefield
    /// unless the filter names another zone.
    #[must_use]
    pub fn matches_in_play(&self, object: crate::core::ObjectId, env: &Env<'_>, ctx: &EffectContext) -> bool {
        env.view(object).is_some_and(|view| self.matches_in_play_view(&view, env, ctx))
    }

    #[must_use]
    pub fn matches_in_play_view(&self, view: &ObjectView<'_>, env: &Env<'_>, ctx: &EffectContext) -> bool {
        (self.mentions_zone() || view.zone().is_battlefield()) && self.matches_view(view, env, ctx)
    }

    /// Live objects matching the filter in its zone scope, in id order.
    #[must_use]
    pub fn matching(&self, env: &Env<'_>, ctx: &EffectContext) -> Vec<crate::core::ObjectId> {
        env.objects()
            .filter(|view| self.matches_in_play_view(view, env, ctx))
            .map(|view| view.id())
            .collect()
    }

    /// Evaluate against an object view (live or last-known).
    #[must_use]
    pub fn matches_view(&self, view: &ObjectView<'_>, env: &Env<'_>, ctx: &EffectContext) -> bool {
        let chars = view.characteristics;
        match self {
            ObjectFilter::Any => true,
            ObjectFilter::And(filters) => filters.iter().all(|f| f.matches_view(view, env, ctx)),
            ObjectFilter::Or(filters) => filters.iter().any(|f| f.matches_view(view, env, ctx)),
            ObjectFilter::Not(inner) => !inner.matches_view(view, env, ctx),

            ObjectFilter::CardType(card_type) => chars.has_type(*card_type),
            ObjectFilter::Subtype(subtype) => chars.subtypes.contains(subtype),
            ObjectFilter::Supertype(supertype) => chars.has_supertype(*supertype),
            ObjectFilter::Color(color) => chars.colors.contains(color),
            ObjectFilter::Colorless => chars.colors.is_empty(),
            ObjectFilter::Multicolored => chars.colors.len() > 1,
            ObjectFilter::Keyword(keyword) => chars.has_keyword(keyword),
            ObjectFilter::Named(name) => chars.name == *name,

            ObjectFilter::ControlledBy(players) => players.matches(view.controller, env, ctx),
            ObjectFilter::OwnedBy(players) => players.matches(view.object.owner, env, ctx),
            ObjectFilter::InZone(kind) => view.zone().kind() == *kind,

            ObjectFilter::PowerAtLeast(n) => chars.power.is_some_and(|p| p >= *n),
            ObjectFilter::PowerAtMost(n) => chars.power.is_some_and(|p| p <= *n),
            ObjectFilter::ToughnessAtLeast(n) => chars.toughness.is_some_and(|t| t >= *n),
            ObjectFilter::ToughnessAtMost(n) => chars.toughness.is_some_and(|t| t <= *n),
            ObjectFilter::ManaValueAtMost(n) => chars.mana_value() <= *n,

            ObjectFilter::Tapped => view.object.tapped,
            ObjectFilter::Untapped => !view.object.tapped,
            ObjectFilter::FaceDown => view.object.face_down,
            ObjectFilter::Token => view.object.is_token,
            ObjectFilter::HasCounter(kind) => view.object.counters.get(kind) > 0,

            ObjectFilter::Source => ctx.source == Some(view.id()),
            ObjectFilter::Other => ctx.source != Some(view.id()),
            ObjectFilter::AttachedToSource => ctx.source.is_some() && view.object.attached_to == ctx.source,
            ObjectFilter::SourceAttachedTo => ctx
                .source
                .and_then(|source| env.view_or_lki(source))
                .is_some_and(|source| source.object.attached_to == Some(view.id())),
            ObjectFilter::SharesTypeWith(reference) => ctx
                .objects(reference, env)
                .into_iter()
                .filter_map(|id| env.view_or_lki(id))
                .any(|other| chars.shares_card_type(other.characteristics)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let filter = ObjectFilter::creature()
            .and(ObjectFilter::Untapped)
            .and(ObjectFilter::Token);
        match filter {
            ObjectFilter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_and_with_any_is_identity() {
        assert_eq!(ObjectFilter::Any.and(ObjectFilter::Token), ObjectFilter::Token);
    }

    #[test]
    fn test_mentions_zone_sees_through_combinators() {
        let filter = ObjectFilter::creature().and(ObjectFilter::InZone(ZoneKind::Graveyard).negate());
        assert!(filter.mentions_zone());
        assert!(!ObjectFilter::creature_you_control().mentions_zone());
    }

    #[test]
    fn test_replace_subtype() {
        let mut filter = ObjectFilter::subtype("Elf").and(ObjectFilter::subtype("Goblin").negate());
        filter.replace_subtype(&Subtype::new("Goblin"), &Subtype::new("Elf"));
        assert_eq!(
            filter,
            ObjectFilter::And(vec![
                ObjectFilter::subtype("Elf"),
                ObjectFilter::subtype("Elf").negate(),
            ])
        );
    }
}
