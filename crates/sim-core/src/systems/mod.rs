//! ECS Systems
//!
//! The per-tick pipeline: directives in, spatial index and perception
//! rebuilt, needs decayed, decisions made, actions executed, effects
//! applied, scheduler drained, world reaped and respawned, clock
//! advanced.

pub mod decision;
pub mod directives;
pub mod effects;
pub mod execute;
pub mod lifecycle;
pub mod needs;
pub mod perception;

pub use decision::{
    decide_animal_actions, decide_person_actions, deltas, AnimalPolicy, PersonPolicy, Task,
};
pub use directives::{
    apply_directives, ActionRequest, Directive, DirectiveQueue, TaskSetting,
};
pub use effects::apply_action_effects;
pub use execute::execute_actions;
pub use lifecycle::{advance_clock, reap_and_spawn, SpawnCounters};
pub use needs::{decay_person_needs, reset_animal_needs, DecisionTimers};
pub use perception::{build_perception, ObjectView, PerceivedWorld};
