//! World Snapshots
//!
//! Serializable views of world state for hosts: positions and velocities
//! for rendering, health and need levels for UI panels, current action
//! names for display. Emitted periodically by the runner as JSON lines.

use serde::{Deserialize, Serialize};

use crate::timestamp::SimTime;

/// Normalized need levels, all in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedSnapshot {
    pub hunger: f64,
    pub social: f64,
    pub lust: f64,
    pub tiredness: f64,
    pub boredom: f64,
    pub job_fulfillment: f64,
    pub warmth: f64,
}

/// One agent's externally visible state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub species: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub health: i32,
    pub adult: bool,
    pub needs: NeedSnapshot,
    /// Display name of the current action, if any.
    pub action: Option<String>,
}

/// An item lying on the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub kind: String,
    pub amount: u32,
    pub x: f64,
    pub y: f64,
}

/// A plant and its growth stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSnapshot {
    pub kind: String,
    pub stage: String,
    pub x: f64,
    pub y: f64,
}

/// Full externally visible world state at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub time: SimTime,
    pub agents: Vec<AgentSnapshot>,
    pub items: Vec<ItemSnapshot>,
    pub plants: Vec<PlantSnapshot>,
}

impl WorldSnapshot {
    /// Serializes the snapshot as one JSON line.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorldSnapshot {
        WorldSnapshot {
            tick: 12,
            time: SimTime::from_seconds(12),
            agents: vec![AgentSnapshot {
                agent_id: "agent_0001".to_string(),
                species: "person".to_string(),
                x: 100.0,
                y: 200.0,
                vx: 0.0,
                vy: 0.0,
                health: 100,
                adult: true,
                needs: NeedSnapshot {
                    hunger: 0.8,
                    ..NeedSnapshot::default()
                },
                action: Some("wander".to_string()),
            }],
            items: vec![ItemSnapshot {
                kind: "apple".to_string(),
                amount: 1,
                x: 50.0,
                y: 60.0,
            }],
            plants: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = sample();
        let json = snapshot.to_json_line().unwrap();
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_snapshot_single_line() {
        let json = sample().to_json_line().unwrap();
        assert!(!json.contains('\n'));
    }
}
