//! ECS Components
//!
//! Components and small shared resources for agents, world objects, and
//! the world itself.

pub mod agent;
pub mod objects;
pub mod world;

pub use agent::{
    scoring_value, AgentId, Animal, AnimalKind, Inventory, Maturity, Mobility, Need, Needs,
    Person, Sex, Stats, Vitals,
};
pub use objects::{
    Campfire, Effect, EffectKind, GroundItem, GrowthStage, ItemKind, ItemStack, Plant, PlantKind,
};
pub use world::{
    aabb_overlap, deflection_point, random_point, Direction, HomeBase, HomeStore, ObjectClass,
    Position, Velocity, WorldBounds, WorldClock,
};
