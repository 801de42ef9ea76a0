//! World Components
//!
//! The world bounds, clock, home base, and the shared position/velocity
//! components every placed object carries.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use sim_events::SimTime;

use super::objects::{ItemKind, ItemStack};

/// Cardinal direction of the last boundary collision. `None` when the
/// object is moving freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    None,
    Up,
    Right,
    Down,
    Left,
}

/// Continuous 2D position.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point. Callers compare against squared
    /// ranges to avoid the square root.
    pub fn distance_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Current velocity in world units per tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Broad classification used by the spatial grid so queries can narrow
/// results by capability without touching the source components.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    Person,
    Animal,
    Plant,
    Item,
    Campfire,
    Home,
    Effect,
}

impl ObjectClass {
    /// True for classes that can take damage and die.
    pub fn is_mortal(&self) -> bool {
        matches!(self, ObjectClass::Person | ObjectClass::Animal)
    }
}

/// Rectangular world bounds with a movement buffer along each edge.
#[derive(Resource, Debug, Clone, Copy)]
pub struct WorldBounds {
    pub width: f64,
    pub height: f64,
    /// Agents are kept this far inside the walls.
    pub buffer: f64,
}

impl WorldBounds {
    pub fn new(width: f64, height: f64, buffer: f64) -> Self {
        Self {
            width,
            height,
            buffer,
        }
    }
}

/// The world clock: monotonic tick counter plus the simulation time it
/// maps to. Advanced once at the end of every tick.
#[derive(Resource, Debug, Clone, Copy)]
pub struct WorldClock {
    pub tick: u64,
    pub now: SimTime,
    pub seconds_per_tick: u64,
}

impl WorldClock {
    pub fn new(seconds_per_tick: u64) -> Self {
        Self {
            tick: 0,
            now: SimTime::zero(),
            seconds_per_tick,
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
        self.now.advance(self.seconds_per_tick);
    }

    /// Absolute time `seconds` from now, for scheduling deferred work.
    pub fn after(&self, seconds: u64) -> SimTime {
        self.now.plus_seconds(seconds)
    }
}

/// The home base: a fixed square where people store and retrieve items.
#[derive(Resource, Debug, Clone, Copy)]
pub struct HomeBase {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl HomeBase {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self { x, y, size }
    }

    /// Whether a square object centered at (x, y) overlaps the base.
    pub fn overlaps(&self, x: f64, y: f64, size: f64) -> bool {
        aabb_overlap(self.x, self.y, self.size, x, y, size)
    }
}

/// Shared item storage at the home base. People deliver food here and
/// request items back out when eating.
#[derive(Resource, Debug, Clone, Default)]
pub struct HomeStore {
    stacks: Vec<ItemStack>,
}

impl HomeStore {
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

    /// Removes up to `amount` of `kind`, returning how much was actually
    /// taken. An empty store hands out nothing.
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

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }
}

/// Overlap test for two axis-aligned squares given by center and edge
/// length. Stands in for exact collision; reach checks everywhere use it.
pub fn aabb_overlap(x1: f64, y1: f64, s1: f64, x2: f64, y2: f64, s2: f64) -> bool {
    let h1 = s1 / 2.0;
    let h2 = s2 / 2.0;
    (x1 - x2).abs() <= h1 + h2 && (y1 - y2).abs() <= h1 + h2
}

/// A uniformly random point inside the bounds, kept a few units off the
/// walls so freshly placed objects are not already colliding.
pub fn random_point(rng: &mut SmallRng, bounds: &WorldBounds) -> (f64, f64) {
    let margin = 5.0;
    (
        rng.gen_range(margin..bounds.width - margin),
        rng.gen_range(margin..bounds.height - margin),
    )
}

/// A random point in the half of the world away from the wall just hit,
/// used to retarget wandering after a boundary collision.
pub fn deflection_point(
    rng: &mut SmallRng,
    bounds: &WorldBounds,
    direction: Direction,
    from: Position,
) -> (f64, f64) {
    let (x, y) = random_point(rng, bounds);
    match direction {
        Direction::Left => ((from.x + bounds.width) / 2.0, y),
        Direction::Right => (from.x / 2.0, y),
        Direction::Up => (x, (from.y + bounds.height) / 2.0),
        Direction::Down => (x, from.y / 2.0),
        Direction::None => (x, y),
    }
}
