//! The layer system: effective characteristics from base characteristics.
//!
//! Nothing is cached. Every call starts from the printed characteristics
//! of every live object and applies, layer by layer:
//! - built-in steps: face-down status (1b), characteristic-defining
//!   power/toughness (7a) and counters (7d);
//! - registered continuous effects;
//! - effects generated by static abilities of battlefield objects, read
//!   from the characteristics as they stand at the start of the layer.
//!
//! Within a layer, the effect applied next is the earliest one that
//! depends on no other remaining effect (see [`dependency`](super::dependency)).
//! Once an effect applies, its affected set is locked and it keeps
//! applying to that set in later layers, even if the ability that
//! generated it has since been removed.

use rustc_hash::FxHashMap;
use tracing::trace;

use super::continuous::{Affected, ContinuousEffect, Duration, EffectId, Layer, Modification};
use super::dependency;
use super::table::{CharacteristicsTable, EffectiveObject};
use crate::abilities::{Ability, StaticAbility};
use crate::cards::{Characteristics, CounterKind};
use crate::core::{GameState, ObjectId, PlayerId, Timestamp};
use crate::effects::{AmountEvaluator, EffectContext, Env, TargetRef};
use crate::error::{Result, RulesError};

/// Identity of an effect across layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum EffectKey {
    Registered(EffectId),
    Static { source: ObjectId, index: usize },
}

/// One effect's modifications for the layer being applied.
#[derive(Clone, Debug)]
pub(crate) struct LayerEffect {
    pub key: EffectKey,
    pub source: Option<ObjectId>,
    pub controller: PlayerId,
    pub timestamp: Timestamp,
    pub affected: Affected,
    pub modifications: Vec<Modification>,
    pub condition: Option<crate::effects::Condition>,
    /// For static abilities, the ability that must still be on its source.
    pub ability: Option<StaticAbility>,
}

impl LayerEffect {
    fn context(&self) -> EffectContext {
        let ctx = EffectContext::new(self.controller);
        match self.source {
            Some(source) => ctx.with_source(source),
            None => ctx,
        }
    }

    pub(crate) fn order(&self) -> (Timestamp, EffectKey) {
        (self.timestamp, self.key)
    }
}

/// A static ability that started applying in an earlier layer.
#[derive(Clone, Debug)]
struct Started {
    ability: StaticAbility,
    source: ObjectId,
    controller: PlayerId,
    timestamp: Timestamp,
}

/// State of one computation.
#[derive(Clone)]
pub(crate) struct Pass<'s> {
    state: &'s GameState,
    pub(crate) table: CharacteristicsTable,
    locked: FxHashMap<EffectKey, Vec<ObjectId>>,
    started: FxHashMap<EffectKey, Started>,
    /// Whose dynamic stats an object uses in layer 7a.
    cda: FxHashMap<ObjectId, ObjectId>,
}

impl<'s> Pass<'s> {
    fn new(state: &'s GameState) -> Self {
        let mut table = CharacteristicsTable::new();
        let mut cda = FxHashMap::default();
        for object in state.objects() {
            table.insert(
                object.id,
                EffectiveObject {
                    characteristics: object.base_characteristics().clone(),
                    controller: object.controller,
                },
            );
            if object.definition.dynamic_stats.is_some() {
                cda.insert(object.id, object.id);
            }
        }
        Self {
            state,
            table,
            locked: FxHashMap::default(),
            started: FxHashMap::default(),
            cda,
        }
    }

    fn env(&self) -> Env<'_> {
        Env::new(self.state, &self.table)
    }

    fn run_layer(&mut self, layer: Layer) -> Result<()> {
        match layer {
            Layer::OneB => self.apply_face_down(),
            Layer::SevenA => self.apply_characteristic_defining(),
            Layer::SevenD => self.apply_counters(),
            _ => {}
        }

        let mut pending = self.gather(layer);
        while !pending.is_empty() {
            let next = dependency::next_effect(self, &pending)?;
            let effect = pending.remove(next);
            self.apply(&effect, true);
        }
        Ok(())
    }

    fn apply_face_down(&mut self) {
        for object in self.state.objects().filter(|o| o.face_down) {
            if let Some(entry) = self.table.get_mut(object.id) {
                entry.characteristics = Characteristics::face_down();
            }
            self.cda.remove(&object.id);
        }
    }

    fn apply_characteristic_defining(&mut self) {
        let mut updates = Vec::new();
        {
            let env = self.env();
            for (&object, &defined_by) in &self.cda {
                let Some(stats) = self
                    .state
                    .object(defined_by)
                    .and_then(|o| o.definition.dynamic_stats.as_ref())
                else {
                    continue;
                };
                let Some(controller) = self.table.controller(object) else {
                    continue;
                };
                let ctx = EffectContext::new(controller).with_source(object);
                let power = AmountEvaluator::evaluate_at_resolution(&stats.power, &env, &ctx);
                let toughness = AmountEvaluator::evaluate_at_resolution(&stats.toughness, &env, &ctx);
                updates.push((object, power, toughness));
            }
        }
        for (object, power, toughness) in updates {
            if let Some(entry) = self.table.get_mut(object) {
                entry.characteristics.power = Some(power);
                entry.characteristics.toughness = Some(toughness);
            }
        }
    }

    fn apply_counters(&mut self) {
        for object in self.state.objects() {
            let plus = i64::from(object.counters.get(&CounterKind::PlusOnePlusOne));
            let minus = i64::from(object.counters.get(&CounterKind::MinusOneMinusOne));
            if plus == minus {
                continue;
            }
            if let Some(entry) = self.table.get_mut(object.id) {
                let chars = &mut entry.characteristics;
                if let (Some(power), Some(toughness)) = (chars.power, chars.toughness) {
                    chars.power = Some(power + plus - minus);
                    chars.toughness = Some(toughness + plus - minus);
                }
            }
        }
    }

    /// Effects with modifications in `layer`, sorted by timestamp.
    fn gather(&self, layer: Layer) -> Vec<LayerEffect> {
        let mut effects: Vec<LayerEffect> = self
            .state
            .continuous
            .iter()
            .filter(|effect| effect.has_layer(layer) && effect_is_active(effect, self.state))
            .map(|effect| LayerEffect {
                key: EffectKey::Registered(effect.id),
                source: effect.source,
                controller: effect.controller,
                timestamp: effect.timestamp,
                affected: effect.affected.clone(),
                modifications: in_layer(&effect.modifications, layer),
                condition: effect.condition.clone(),
                ability: None,
            })
            .collect();

        for object in self.state.objects().filter(|o| o.zone.is_battlefield()) {
            let Some(entry) = self.table.get(object.id) else {
                continue;
            };
            for (index, ability) in entry.characteristics.abilities.iter().enumerate() {
                let Ability::Static(ability) = ability else {
                    continue;
                };
                if !ability.modifications.iter().any(|m| m.layer() == layer) {
                    continue;
                }
                effects.push(static_effect(
                    EffectKey::Static {
                        source: object.id,
                        index,
                    },
                    ability,
                    object.id,
                    entry.controller,
                    object.timestamp,
                    layer,
                ));
            }
        }

        for (key, started) in &self.started {
            if effects.iter().any(|e| e.key == *key) {
                continue;
            }
            if started.ability.modifications.iter().any(|m| m.layer() == layer) {
                effects.push(static_effect(
                    *key,
                    &started.ability,
                    started.source,
                    started.controller,
                    started.timestamp,
                    layer,
                ));
            }
        }

        effects.sort_by_key(LayerEffect::order);
        effects
    }

    /// Whether a static effect's ability is still on its source.
    fn exists(&self, effect: &LayerEffect) -> bool {
        if self.locked.contains_key(&effect.key) {
            return true;
        }
        let (Some(ability), Some(source)) = (&effect.ability, effect.source) else {
            return true;
        };
        let on_battlefield = self.state.object(source).is_some_and(|o| o.zone.is_battlefield());
        on_battlefield
            && self.table.characteristics(source).is_some_and(|chars| {
                chars
                    .abilities
                    .iter()
                    .any(|a| matches!(a, Ability::Static(s) if s == ability))
            })
    }

    /// The objects `effect` would apply to now, or `None` if it would not
    /// apply at all.
    pub(crate) fn affected_now(&self, effect: &LayerEffect) -> Option<Vec<ObjectId>> {
        if let Some(ids) = self.locked.get(&effect.key) {
            return Some(ids.iter().copied().filter(|&id| self.table.get(id).is_some()).collect());
        }
        if !self.exists(effect) {
            return None;
        }
        let env = self.env();
        let ctx = effect.context();
        if let Some(condition) = &effect.condition {
            if !AmountEvaluator::evaluate_condition(condition, &env, &ctx) {
                return None;
            }
        }
        Some(match &effect.affected {
            Affected::Objects(ids) => ids.iter().copied().filter(|&id| self.table.get(id).is_some()).collect(),
            Affected::Filter(filter) => filter.matching(&env, &ctx),
        })
    }

    /// Values `effect` would compute for an object: power/toughness
    /// amounts and copied characteristics.
    pub(crate) fn inputs(&self, effect: &LayerEffect, object: ObjectId) -> (Vec<i64>, Vec<Option<Characteristics>>) {
        let env = self.env();
        let ctx = effect.context().binding(TargetRef::Object(object));
        let mut amounts = Vec::new();
        let mut copied = Vec::new();
        for modification in &effect.modifications {
            match modification {
                Modification::SetPowerToughness { power, toughness }
                | Modification::ModifyPowerToughness { power, toughness } => {
                    amounts.push(AmountEvaluator::evaluate_at_resolution(power, &env, &ctx));
                    amounts.push(AmountEvaluator::evaluate_at_resolution(toughness, &env, &ctx));
                }
                Modification::CopyOf(target) => copied.push(self.table.characteristics(*target).cloned()),
                _ => {}
            }
        }
        (amounts, copied)
    }

    /// Apply an effect. With `record`, lock its affected set.
    pub(crate) fn apply(&mut self, effect: &LayerEffect, record: bool) {
        let Some(ids) = self.affected_now(effect) else {
            trace!(key = ?effect.key, "effect does not apply");
            return;
        };

        let mut updates = Vec::with_capacity(ids.len());
        let mut copies = Vec::new();
        for &id in &ids {
            let Some(current) = self.table.get(id) else {
                continue;
            };
            let mut entry = current.clone();
            let (amounts, _) = self.inputs(effect, id);
            let mut amounts = amounts.into_iter();
            for modification in &effect.modifications {
                if let Modification::CopyOf(target) = modification {
                    copies.push((id, *target));
                }
                self.modify(&mut entry, modification, effect, &mut amounts);
            }
            updates.push((id, entry));
        }

        for (id, entry) in updates {
            self.table.insert(id, entry);
        }
        for (id, target) in copies {
            match self.cda.get(&target).copied() {
                Some(defined_by) => self.cda.insert(id, defined_by),
                None => self.cda.remove(&id),
            };
        }

        if record {
            trace!(key = ?effect.key, affected = ids.len(), "effect applied");
            if let (EffectKey::Static { source, .. }, Some(ability)) = (effect.key, &effect.ability) {
                self.started.entry(effect.key).or_insert_with(|| Started {
                    ability: ability.clone(),
                    source,
                    controller: effect.controller,
                    timestamp: effect.timestamp,
                });
            }
            self.locked.entry(effect.key).or_insert(ids);
        }
    }

    fn modify(
        &self,
        entry: &mut EffectiveObject,
        modification: &Modification,
        effect: &LayerEffect,
        amounts: &mut impl Iterator<Item = i64>,
    ) {
        let chars = &mut entry.characteristics;
        match modification {
            Modification::CopyOf(target) => {
                if let Some(copied) = self.table.characteristics(*target) {
                    *chars = copied.clone();
                }
            }
            Modification::CopyValues(values) => *chars = (**values).clone(),
            Modification::FaceDown => *chars = Characteristics::face_down(),
            Modification::GainControl => entry.controller = effect.controller,
            Modification::ChangeSubtypeText { from, to } => {
                if chars.subtypes.remove(from) {
                    chars.subtypes.insert(to.clone());
                }
                for ability in &mut chars.abilities {
                    if let Ability::Static(ability) = ability {
                        ability.affected.replace_subtype(from, to);
                    }
                }
            }
            Modification::AddType(card_type) => {
                chars.card_types.insert(*card_type);
            }
            Modification::RemoveType(card_type) => {
                chars.card_types.remove(card_type);
            }
            Modification::AddSupertype(supertype) => {
                chars.supertypes.insert(*supertype);
            }
            Modification::AddSubtype(subtype) => {
                chars.subtypes.insert(subtype.clone());
            }
            Modification::RemoveSubtype(subtype) => {
                chars.subtypes.remove(subtype);
            }
            Modification::SetSubtypes(subtypes) => chars.subtypes = subtypes.iter().cloned().collect(),
            Modification::SetColors(colors) => chars.colors = colors.iter().copied().collect(),
            Modification::AddColor(color) => {
                chars.colors.insert(*color);
            }
            Modification::AddKeyword(keyword) => {
                chars.keywords.insert(keyword.clone());
            }
            Modification::RemoveKeyword(keyword) => {
                chars.keywords.remove(keyword);
            }
            Modification::AddAbility(ability) => chars.abilities.push((**ability).clone()),
            Modification::RemoveAllAbilities => chars.clear_abilities(),
            Modification::SetPowerToughness { .. } => {
                let power = amounts.next().unwrap_or(0);
                let toughness = amounts.next().unwrap_or(0);
                chars.power = Some(power);
                chars.toughness = Some(toughness);
            }
            Modification::ModifyPowerToughness { .. } => {
                let power = amounts.next().unwrap_or(0);
                let toughness = amounts.next().unwrap_or(0);
                if let Some(p) = chars.power.as_mut() {
                    *p += power;
                }
                if let Some(t) = chars.toughness.as_mut() {
                    *t += toughness;
                }
            }
            Modification::SwitchPowerToughness => std::mem::swap(&mut chars.power, &mut chars.toughness),
        }
    }
}

fn in_layer(modifications: &[Modification], layer: Layer) -> Vec<Modification> {
    modifications.iter().filter(|m| m.layer() == layer).cloned().collect()
}

fn static_effect(
    key: EffectKey,
    ability: &StaticAbility,
    source: ObjectId,
    controller: PlayerId,
    timestamp: Timestamp,
    layer: Layer,
) -> LayerEffect {
    LayerEffect {
        key,
        source: Some(source),
        controller,
        timestamp,
        affected: Affected::Filter(ability.affected.clone()),
        modifications: in_layer(&ability.modifications, layer),
        condition: ability.condition.clone(),
        ability: Some(ability.clone()),
    }
}

/// Whether a registered effect's duration still holds.
pub(crate) fn effect_is_active(effect: &ContinuousEffect, state: &GameState) -> bool {
    match effect.duration {
        Duration::Permanent | Duration::EndOfTurn => true,
        Duration::WhileSourceOnBattlefield => effect
            .source
            .and_then(|source| state.object(source))
            .is_some_and(|object| object.zone.is_battlefield()),
    }
}

/// Computes effective characteristics.
///
/// ## Example
///
/// ```
/// use ccg_rules::cards::{CardDefinition, CardId, Characteristics};
/// use ccg_rules::core::{EngineConfig, GameState, PlayerId};
/// use ccg_rules::layers::LayerSystem;
/// use ccg_rules::zones::ZoneId;
/// use std::sync::Arc;
///
/// let mut state = GameState::new(EngineConfig::default());
/// let bears = Arc::new(CardDefinition::new(CardId::new(1), Characteristics::creature("Bears", 2, 2)));
/// let id = state.place_new(bears, PlayerId::new(0), ZoneId::Battlefield).unwrap();
///
/// let table = LayerSystem::compute(&state).unwrap();
/// assert_eq!(table.characteristics(id).unwrap().power, Some(2));
/// ```
pub struct LayerSystem;

impl LayerSystem {
    /// Effective values of every live object.
    pub fn compute(state: &GameState) -> Result<CharacteristicsTable> {
        Self::compute_through(state, Layer::SevenE)
    }

    /// Effective values with layers after `last` left out. Through
    /// [`Layer::OneB`] this gives copiable values.
    pub fn compute_through(state: &GameState, last: Layer) -> Result<CharacteristicsTable> {
        let mut pass = Pass::new(state);
        for layer in Layer::ALL.into_iter().take_while(|&layer| layer <= last) {
            pass.run_layer(layer)?;
        }
        Ok(pass.table)
    }

    /// Effective characteristics of one live object.
    pub fn effective_characteristics(state: &GameState, object: ObjectId) -> Result<Characteristics> {
        let table = Self::compute(state)?;
        table
            .characteristics(object)
            .cloned()
            .ok_or_else(|| RulesError::InvalidAction(format!("{object} is not a live object")))
    }
}
