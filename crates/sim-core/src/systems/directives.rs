//! Directive System
//!
//! Host-issued commands crossing into the core: spawns, forced
//! player-style actions, task-priority overrides, and raw velocity
//! nudges. Queued by the host between ticks and applied at the top of the
//! next one.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use sim_events::WorldEvent;

use crate::actions::{
    timed::SLEEP_SECONDS, Action, ActionKind, ActiveAction, CurrentAction,
};
use crate::components::{
    random_point, AgentId, AnimalKind, Need, Velocity, WorldBounds, WorldClock,
};
use crate::scheduler::EventScheduler;
use crate::systems::decision::{deltas, PersonPolicy, Task};
use crate::systems::lifecycle::spawn_animal;
use crate::{IdAllocator, SimRng, WorldEvents};

/// Player-style action requests that may be forced onto an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequest {
    /// Strike everything hostile in range.
    AttackSweep,
    /// Court every eligible partner in range.
    Courtship,
    /// Lie down for a full sleep.
    Sleep,
}

/// One externally configured task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskSetting {
    pub kind: ActionKind,
    pub multiplier: f64,
}

/// A host command for the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    /// Drop a wild animal into the world, at a point or anywhere.
    SpawnAnimal {
        kind: AnimalKind,
        x: Option<f64>,
        y: Option<f64>,
    },
    /// Force an action onto a specific agent.
    ForceAction {
        agent_id: String,
        request: ActionRequest,
    },
    /// Replace the active task priorities.
    SetTasks { tasks: Vec<TaskSetting> },
    /// Steer an agent directly.
    SetVelocity { agent_id: String, vx: f64, vy: f64 },
}

/// Directives waiting for the next tick.
#[derive(Resource, Debug, Default)]
pub struct DirectiveQueue {
    queue: Vec<Directive>,
}

impl DirectiveQueue {
    pub fn push(&mut self, directive: Directive) {
        self.queue.push(directive);
    }

    pub fn drain(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.queue)
    }
}

/// Applies queued directives before anything else runs this tick.
#[allow(clippy::too_many_arguments)]
pub fn apply_directives(
    clock: Res<WorldClock>,
    bounds: Res<WorldBounds>,
    mut queue: ResMut<DirectiveQueue>,
    mut policy: ResMut<PersonPolicy>,
    mut scheduler: ResMut<EventScheduler>,
    mut events: ResMut<WorldEvents>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    mut commands: Commands,
    mut agents: Query<(&AgentId, &mut CurrentAction, &mut Velocity)>,
) {
    for directive in queue.drain() {
        match directive {
            Directive::SpawnAnimal { kind, x, y } => {
                let (px, py) = match (x, y) {
                    (Some(x), Some(y)) => (x, y),
                    _ => random_point(&mut rng.0, &bounds),
                };
                let id = ids.next_id();
                let name = id.0.clone();
                spawn_animal(&mut commands, &mut scheduler, &clock, id, kind, px, py);
                events.push(
                    &clock,
                    WorldEvent::AgentSpawned {
                        agent_id: name,
                        species: kind.as_str().to_string(),
                        x: px,
                        y: py,
                    },
                );
            }
            Directive::ForceAction { agent_id, request } => {
                let Some((_, mut current, _)) =
                    agents.iter_mut().find(|(id, _, _)| id.0 == agent_id)
                else {
                    tracing::debug!(agent_id, "force-action directive for unknown agent");
                    continue;
                };
                let active = match request {
                    ActionRequest::AttackSweep => {
                        ActiveAction::new(Action::attack_sweep(), Vec::new())
                    }
                    ActionRequest::Courtship => {
                        ActiveAction::new(Action::courtship(), Vec::new())
                    }
                    ActionRequest::Sleep => ActiveAction::new(
                        Action::sleep(SLEEP_SECONDS, true),
                        vec![(Need::Tiredness, deltas::SLEEP_TIREDNESS)],
                    ),
                };
                current.assign_scheduled(active, false);
            }
            Directive::SetTasks { tasks } => {
                policy.tasks = tasks
                    .into_iter()
                    .map(|t| Task {
                        kind: t.kind,
                        multiplier: t.multiplier,
                    })
                    .collect();
            }
            Directive::SetVelocity { agent_id, vx, vy } => {
                if let Some((_, _, mut velocity)) =
                    agents.iter_mut().find(|(id, _, _)| id.0 == agent_id)
                {
                    velocity.x = vx;
                    velocity.y = vy;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_serde() {
        let directive = Directive::SpawnAnimal {
            kind: AnimalKind::Wolf,
            x: Some(10.0),
            y: Some(20.0),
        };
        let json = serde_json::to_string(&directive).unwrap();
        assert!(json.contains(r#""type":"spawn_animal""#));
        let back: Directive = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            Directive::SpawnAnimal {
                kind: AnimalKind::Wolf,
                ..
            }
        ));
    }

    #[test]
    fn test_queue_drains() {
        let mut queue = DirectiveQueue::default();
        queue.push(Directive::SetTasks { tasks: Vec::new() });
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
    }
}
