//! Mana costs and mana pools.
//!
//! A [`ManaCost`] counts symbols per kind: generic, one count per color,
//! colorless-specific (`{C}`) and the number of `{X}` symbols. A
//! [`ManaPool`] holds floating mana. Paying never happens in place: the
//! pool computes the pool that would remain, and the caller commits it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cards::Color;

/// A kind of mana in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ManaType {
    Colored(Color),
    Colorless,
}

impl ManaType {
    const fn slot(self) -> usize {
        match self {
            ManaType::Colored(color) => color.index(),
            ManaType::Colorless => 5,
        }
    }
}

/// A mana cost such as `{2}{G}{G}` or `{X}{R}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManaCost {
    /// Generic symbols, payable with any mana.
    pub generic: u32,
    /// Colored symbols, indexed by [`Color::index`].
    pub colored: [u32; 5],
    /// `{C}` symbols, payable only with colorless mana.
    pub colorless: u32,
    /// Number of `{X}` symbols.
    pub x: u32,
}

impl ManaCost {
    /// An empty cost (`{0}`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A purely generic cost.
    #[must_use]
    pub fn generic(amount: u32) -> Self {
        Self {
            generic: amount,
            ..Self::default()
        }
    }

    /// Add colored symbols.
    #[must_use]
    pub fn with_colored(mut self, color: Color, amount: u32) -> Self {
        self.colored[color.index()] += amount;
        self
    }

    /// Add `{C}` symbols.
    #[must_use]
    pub fn with_colorless(mut self, amount: u32) -> Self {
        self.colorless += amount;
        self
    }

    /// Add `{X}` symbols.
    #[must_use]
    pub fn with_x(mut self, count: u32) -> Self {
        self.x += count;
        self
    }

    /// Parse a cost written as symbols, e.g. `"{2}{G}{G}"` or `"{X}{R}"`.
    ///
    /// Returns `None` for unknown symbols, or when a count does not fit in
    /// a `u32`.
    ///
    /// ```
    /// use ccg_rules::cards::Color;
    /// use ccg_rules::costs::ManaCost;
    ///
    /// let cost = ManaCost::parse("{2}{G}{G}").unwrap();
    /// assert_eq!(cost.generic, 2);
    /// assert_eq!(cost.colored[Color::Green.index()], 2);
    /// assert_eq!(cost.mana_value(), 4);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let mut cost = ManaCost::new();
        let mut rest = text.trim();
        while !rest.is_empty() {
            let inner_end = rest.find('}')?;
            if !rest.starts_with('{') {
                return None;
            }
            let symbol = &rest[1..inner_end];
            let (count, amount) = match symbol {
                "W" => (&mut cost.colored[Color::White.index()], 1),
                "U" => (&mut cost.colored[Color::Blue.index()], 1),
                "B" => (&mut cost.colored[Color::Black.index()], 1),
                "R" => (&mut cost.colored[Color::Red.index()], 1),
                "G" => (&mut cost.colored[Color::Green.index()], 1),
                "C" => (&mut cost.colorless, 1),
                "X" => (&mut cost.x, 1),
                digits => (&mut cost.generic, digits.parse::<u32>().ok()?),
            };
            *count = count.checked_add(amount)?;
            rest = &rest[inner_end + 1..];
        }
        Some(cost)
    }

    /// Mana value, counting `{X}` as zero. Saturates at `u32::MAX`.
    #[must_use]
    pub fn mana_value(&self) -> u32 {
        self.colored
            .iter()
            .fold(self.generic.saturating_add(self.colorless), |sum, &n| sum.saturating_add(n))
    }

    /// Total mana needed when X is `x`, or `None` if it does not fit in a
    /// `u32`.
    #[must_use]
    pub fn total_with_x(&self, x: u32) -> Option<u32> {
        self.x.checked_mul(x)?.checked_add(self.mana_value())
    }

    /// Colors of the colored symbols.
    #[must_use]
    pub fn colors(&self) -> BTreeSet<Color> {
        Color::ALL
            .iter()
            .copied()
            .filter(|color| self.colored[color.index()] > 0)
            .collect()
    }

    /// Whether the cost has no symbols at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mana_value() == 0 && self.x == 0
    }
}

impl std::fmt::Display for ManaCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for _ in 0..self.x {
            write!(f, "{{X}}")?;
        }
        if self.generic > 0 || self.mana_value() == 0 && self.x == 0 {
            write!(f, "{{{}}}", self.generic)?;
        }
        for _ in 0..self.colorless {
            write!(f, "{{C}}")?;
        }
        for color in Color::ALL {
            for _ in 0..self.colored[color.index()] {
                write!(f, "{{{}}}", color.symbol())?;
            }
        }
        Ok(())
    }
}

/// Floating mana owned by a player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManaPool {
    amounts: [u32; 6],
}

impl ManaPool {
    /// An empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add mana of one type.
    pub fn add(&mut self, mana: ManaType, amount: u32) {
        let slot = &mut self.amounts[mana.slot()];
        *slot = slot.saturating_add(amount);
    }

    /// Builder form of [`ManaPool::add`].
    #[must_use]
    pub fn with(mut self, mana: ManaType, amount: u32) -> Self {
        self.add(mana, amount);
        self
    }

    /// Amount of one type.
    #[must_use]
    pub fn amount(&self, mana: ManaType) -> u32 {
        self.amounts[mana.slot()]
    }

    /// Total mana of every type.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.amounts.iter().fold(0, |sum: u32, &n| sum.saturating_add(n))
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Remove all mana.
    pub fn clear(&mut self) {
        self.amounts = [0; 6];
    }

    /// Whether `cost` with X = `x` can be paid from this pool.
    #[must_use]
    pub fn can_pay(&self, cost: &ManaCost, x: u32) -> bool {
        self.after_paying(cost, x).is_some()
    }

    /// The pool that remains after paying `cost` with X = `x`, or `None` if
    /// the pool cannot cover it. A generic total that overflows can never
    /// be covered.
    ///
    /// Colored and `{C}` symbols are paid first. Generic mana then drains
    /// colorless mana before colored mana, in WUBRG order.
    #[must_use]
    pub fn after_paying(&self, cost: &ManaCost, x: u32) -> Option<ManaPool> {
        let mut remaining = self.clone();
        for color in Color::ALL {
            let slot = color.index();
            remaining.amounts[slot] = remaining.amounts[slot].checked_sub(cost.colored[slot])?;
        }
        remaining.amounts[5] = remaining.amounts[5].checked_sub(cost.colorless)?;

        let mut generic = cost.x.checked_mul(x)?.checked_add(cost.generic)?;
        for slot in [5, 0, 1, 2, 3, 4] {
            let used = generic.min(remaining.amounts[slot]);
            remaining.amounts[slot] -= used;
            generic -= used;
        }
        (generic == 0).then_some(remaining)
    }
}
