//! Outbound World Events
//!
//! The typed event vocabulary the core raises while processing a tick.
//! Hosts drain these once per tick and route them however they like
//! (logging, UI notifications, spawn bookkeeping). The core never holds a
//! callback into the host; everything crosses this boundary as data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp::SimTime;

/// Something observable that happened inside the simulation.
///
/// String fields (species, item kinds, action names) are the display names
/// the core already produces for its own logging, so hosts need no access
/// to core types to render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    /// A new agent entered the world (setup, spawn directive, or birth).
    AgentSpawned {
        agent_id: String,
        species: String,
        x: f64,
        y: f64,
    },
    /// An agent's health reached zero and it was removed.
    AgentDied { agent_id: String, species: String },
    /// A pregnancy came to term; the child is announced separately via
    /// `AgentSpawned`.
    BirthCompleted { mother_id: String, child_id: String },
    /// An agent committed to a new behavior.
    ActionStarted { agent_id: String, action: String },
    /// An item appeared on the ground.
    ItemDropped {
        kind: String,
        amount: u32,
        x: f64,
        y: f64,
    },
    /// An item was delivered into the home store.
    ItemStored { kind: String, amount: u32 },
    /// A short-lived visual marker appeared (sleep, love).
    EffectStarted { kind: String, x: f64, y: f64 },
    /// A visual marker ran its course.
    EffectExpired { kind: String, x: f64, y: f64 },
    /// A plant advanced a growth stage.
    PlantAdvanced { stage: String, x: f64, y: f64 },
}

/// A world event stamped with when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique id for log correlation.
    pub event_id: Uuid,
    /// Tick during which the event was raised.
    pub tick: u64,
    /// Simulation clock at that tick.
    pub time: SimTime,
    #[serde(flatten)]
    pub event: WorldEvent,
}

impl EventEnvelope {
    /// Wraps an event with a fresh id and the given stamp.
    pub fn new(tick: u64, time: SimTime, event: WorldEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            tick,
            time,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = WorldEvent::AgentDied {
            agent_id: "agent_0003".to_string(),
            species: "wolf".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"agent_died""#));
        assert!(json.contains("agent_0003"));
    }

    #[test]
    fn test_event_roundtrip() {
        let event = WorldEvent::ItemDropped {
            kind: "apple".to_string(),
            amount: 2,
            x: 10.5,
            y: -3.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: WorldEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_envelope_ids_unique() {
        let a = EventEnvelope::new(
            1,
            SimTime::zero(),
            WorldEvent::ItemStored {
                kind: "meat".to_string(),
                amount: 1,
            },
        );
        let b = EventEnvelope::new(
            1,
            SimTime::zero(),
            WorldEvent::ItemStored {
                kind: "meat".to_string(),
                amount: 1,
            },
        );
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_envelope_flattens_event() {
        let envelope = EventEnvelope::new(
            7,
            SimTime::from_seconds(30),
            WorldEvent::ActionStarted {
                agent_id: "agent_0001".to_string(),
                action: "wander".to_string(),
            },
        );
        let json = serde_json::to_string(&envelope).unwrap();
        // The event payload sits at the top level next to the stamp.
        assert!(json.contains(r#""tick":7"#));
        assert!(json.contains(r#""type":"action_started""#));
    }
}
