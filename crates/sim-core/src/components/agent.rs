//! Agent Components
//!
//! Needs, vitals, movement state, species data, and inventories for the
//! simulated people and animals.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use sim_events::NeedSnapshot;

use super::objects::{ItemKind, ItemStack};
use super::world::Direction;

/// Unique, human-readable identifier for an agent.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// Biological sex, used by mating rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn opposite(&self) -> Self {
        match self {
            Sex::Male => Sex::Female,
            Sex::Female => Sex::Male,
        }
    }
}

/// The drives an agent tries to satisfy. `Health` is a pseudo-need derived
/// from vitals rather than stored in [`Needs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Need {
    Health,
    Hunger,
    Social,
    Lust,
    Tiredness,
    Boredom,
    JobFulfillment,
    Warmth,
}

impl Need {
    /// All needs that have a stored level.
    pub const STORED: [Need; 7] = [
        Need::Hunger,
        Need::Social,
        Need::Lust,
        Need::Tiredness,
        Need::Boredom,
        Need::JobFulfillment,
        Need::Warmth,
    ];
}

/// Normalized need levels in [0, 1]. 1.0 is fully satisfied, values near
/// zero are critical.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub hunger: f64,
    pub social: f64,
    pub lust: f64,
    pub tiredness: f64,
    pub boredom: f64,
    pub job_fulfillment: f64,
    pub warmth: f64,
}

impl Needs {
    /// People start fully satisfied.
    pub fn full() -> Self {
        Self {
            hunger: 1.0,
            social: 1.0,
            lust: 1.0,
            tiredness: 1.0,
            boredom: 1.0,
            job_fulfillment: 1.0,
            warmth: 1.0,
        }
    }

    /// Animals sit at the midpoint; their needs drive choices but do not
    /// decay.
    pub fn midpoint() -> Self {
        Self {
            hunger: 0.5,
            social: 0.5,
            lust: 0.5,
            tiredness: 0.5,
            boredom: 0.5,
            job_fulfillment: 0.5,
            warmth: 0.5,
        }
    }

    /// The stored level for a need. `Health` has no stored slot here.
    pub fn get(&self, need: Need) -> Option<f64> {
        match need {
            Need::Hunger => Some(self.hunger),
            Need::Social => Some(self.social),
            Need::Lust => Some(self.lust),
            Need::Tiredness => Some(self.tiredness),
            Need::Boredom => Some(self.boredom),
            Need::JobFulfillment => Some(self.job_fulfillment),
            Need::Warmth => Some(self.warmth),
            Need::Health => None,
        }
    }

    fn slot(&mut self, need: Need) -> Option<&mut f64> {
        match need {
            Need::Hunger => Some(&mut self.hunger),
            Need::Social => Some(&mut self.social),
            Need::Lust => Some(&mut self.lust),
            Need::Tiredness => Some(&mut self.tiredness),
            Need::Boredom => Some(&mut self.boredom),
            Need::JobFulfillment => Some(&mut self.job_fulfillment),
            Need::Warmth => Some(&mut self.warmth),
            Need::Health => None,
        }
    }

    /// Applies one advertised delta, clamped so the level never leaves
    /// [0, 1]. Health pairs are silently skipped: health rewards are
    /// promises for scoring, not stored levels.
    pub fn apply_delta(&mut self, need: Need, delta: f64) {
        if let Some(slot) = self.slot(need) {
            *slot = (*slot + delta).clamp(0.0, 1.0);
        }
    }

    /// Applies a full advertised delta list.
    pub fn apply_deltas(&mut self, deltas: &[(Need, f64)]) {
        for (need, delta) in deltas {
            self.apply_delta(*need, *delta);
        }
    }

    /// Lowers one need, clamped at zero.
    pub fn decay(&mut self, need: Need, amount: f64) {
        self.apply_delta(need, -amount);
    }

    pub fn snapshot(&self) -> NeedSnapshot {
        NeedSnapshot {
            hunger: self.hunger,
            social: self.social,
            lust: self.lust,
            tiredness: self.tiredness,
            boredom: self.boredom,
            job_fulfillment: self.job_fulfillment,
            warmth: self.warmth,
        }
    }
}

/// Health and the memory of whoever last attacked this agent.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub health: i32,
    pub attacker: Option<Entity>,
}

impl Vitals {
    pub fn new() -> Self {
        Self {
            health: 100,
            attacker: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

impl Default for Vitals {
    fn default() -> Self {
        Self::new()
    }
}

/// The value fed into utility scoring for a need: stored levels for real
/// needs, `(100 - health) / 100` for the health pseudo-need, and the
/// minimum-score sentinel for anything without a recognized slot.
pub fn scoring_value(need: Need, needs: &Needs, vitals: &Vitals) -> f64 {
    match need {
        Need::Health => (100.0 - f64::from(vitals.health)) / 100.0,
        // Warmth is tracked but never advertised; treat it like an
        // unrecognized case and let it lose every comparison.
        Need::Warmth => f64::MIN,
        other => needs.get(other).unwrap_or(f64::MIN),
    }
}

/// Movement state: speed, the can-move hold used by timed actions, and
/// the direction of the last wall collision.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Mobility {
    pub speed: f64,
    pub can_move: bool,
    pub collision: Direction,
}

impl Mobility {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            can_move: true,
            collision: Direction::None,
        }
    }
}

/// Combat and perception attributes.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    /// Damage multiplier in [0, 1]-ish territory; effective damage is
    /// `base_damage * strength`.
    pub strength: f64,
    pub vision_range: f64,
    pub attack_range: f64,
    pub base_damage: i32,
}

impl Stats {
    pub fn effective_damage(&self) -> i32 {
        (f64::from(self.base_damage) * self.strength) as i32
    }
}

/// Whether the agent has grown up. Children are half-sized and are matured
/// by a scheduled event a few seconds after they appear.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maturity {
    pub adult: bool,
}

impl Maturity {
    pub fn adult() -> Self {
        Self { adult: true }
    }

    pub fn child() -> Self {
        Self { adult: false }
    }

    /// Collision size in world units.
    pub fn size(&self) -> f64 {
        if self.adult {
            10.0
        } else {
            5.0
        }
    }
}

/// Person-specific state. `fetus` holds the sex of an unborn child while
/// pregnant; birth is driven by the event scheduler.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Person {
    pub sex: Sex,
    pub fetus: Option<Sex>,
}

impl Person {
    pub fn new(sex: Sex) -> Self {
        Self { sex, fetus: None }
    }

    pub fn is_pregnant(&self) -> bool {
        self.fetus.is_some()
    }
}

/// Animal species in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalKind {
    Wolf,
    Goat,
    Hog,
    Bear,
}

impl AnimalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalKind::Wolf => "wolf",
            AnimalKind::Goat => "goat",
            AnimalKind::Hog => "hog",
            AnimalKind::Bear => "bear",
        }
    }
}

/// Animal-specific state.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Animal {
    pub kind: AnimalKind,
    /// Meat dropped on death.
    pub drop_count: u32,
}

/// What an agent is carrying.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: ItemKind) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.amount)
            .unwrap_or(0)
    }

    pub fn add(&mut self, kind: ItemKind, amount: u32) {
        if amount == 0 {
            return;
        }
        match self.stacks.iter_mut().find(|s| s.kind == kind) {
            Some(stack) => stack.amount += amount,
            None => self.stacks.push(ItemStack { kind, amount }),
        }
    }

    /// Removes up to `amount` of `kind`, returning how much came out.
    pub fn take(&mut self, kind: ItemKind, amount: u32) -> u32 {
        let Some(index) = self.stacks.iter().position(|s| s.kind == kind) else {
            return 0;
        };
        let taken = self.stacks[index].amount.min(amount);
        self.stacks[index].amount -= taken;
        if self.stacks[index].amount == 0 {
            self.stacks.remove(index);
        }
        taken
    }

    /// Empties the inventory, returning everything that was carried.
    pub fn drain(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.stacks)
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
