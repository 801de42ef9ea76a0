//! Homestead simulation core.
//!
//! Autonomous agents (people and animals) share a continuous 2D world:
//! each perceives nearby objects through a uniform spatial grid, scores
//! candidate behaviors against its internal needs, commits to one action,
//! and executes it across ticks until it completes, fails, or is
//! pre-empted. Deferred work (growth, gestation, effect expiry) lives in
//! a time-ordered event scheduler.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

use sim_events::{EventEnvelope, WorldEvent};

pub mod actions;
pub mod components;
pub mod config;
pub mod scheduler;
pub mod scoring;
pub mod setup;
pub mod sim;
pub mod spatial;
pub mod systems;

pub use components::*;
pub use config::SimConfig;
pub use sim::Simulation;

/// Seeded random number generator resource. All simulation randomness
/// flows through this so runs are reproducible under a fixed seed.
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

/// Allocates stable, human-readable agent ids.
#[derive(Resource, Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> AgentId {
        let id = AgentId(format!("agent_{:04}", self.next));
        self.next += 1;
        id
    }
}

/// Outbound events raised while processing the current tick. The host
/// drains these once per tick.
#[derive(Resource, Debug, Default)]
pub struct WorldEvents {
    envelopes: Vec<EventEnvelope>,
}

impl WorldEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clock: &WorldClock, event: WorldEvent) {
        self.envelopes
            .push(EventEnvelope::new(clock.tick, clock.now, event));
    }

    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.envelopes)
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_allocator_monotonic() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.next_id().0, "agent_0000");
        assert_eq!(ids.next_id().0, "agent_0001");
    }

    #[test]
    fn test_world_events_drain() {
        let clock = WorldClock::new(1);
        let mut events = WorldEvents::new();
        events.push(
            &clock,
            WorldEvent::ItemStored {
                kind: "apple".to_string(),
                amount: 1,
            },
        );
        assert_eq!(events.len(), 1);
        let drained = events.drain();
        assert_eq!(drained.len(), 1);
        assert!(events.is_empty());
    }
}
