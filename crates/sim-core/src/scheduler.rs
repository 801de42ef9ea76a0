//! Event Scheduler
//!
//! A time-ordered queue of (fire time, deferred action, target) triples.
//! Insertion keeps the queue sorted by timestamp (O(n)), so the head is
//! always the global minimum and popping is O(1). Equal timestamps keep
//! insertion order.
//!
//! The per-tick drain leans on that invariant: pop the head, fire it if
//! due, and the moment an undue head appears, put it back and stop —
//! every later entry is guaranteed undue too.

use bevy_ecs::prelude::*;
use std::collections::VecDeque;

use sim_events::{SimTime, WorldEvent};

use crate::actions::{Action, ActiveAction, BirthAction, CurrentAction};
use crate::components::{Effect, Plant, Position, WorldClock};
use crate::WorldEvents;

/// Work deferred to a future simulation instant.
#[derive(Debug, Clone)]
pub enum DeferredAction {
    /// Install an action as the target agent's current (locked) action.
    Install(Action),
    /// Advance a plant one growth step.
    Grow,
    /// Expire a visual effect marker.
    Expire,
}

/// An immutable scheduled triple. The fire time never changes once
/// enqueued.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub fire_at: SimTime,
    pub action: DeferredAction,
    pub target: Entity,
}

impl ScheduledEvent {
    pub fn new(fire_at: SimTime, action: DeferredAction, target: Entity) -> Self {
        Self {
            fire_at,
            action,
            target,
        }
    }
}

/// The timestamp-sorted queue.
#[derive(Resource, Debug, Default)]
pub struct EventScheduler {
    queue: VecDeque<ScheduledEvent>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Sorted insert: the event lands after every entry with an equal or
    /// earlier fire time, so ties fire in insertion order.
    pub fn insert(&mut self, event: ScheduledEvent) {
        let index = self
            .queue
            .iter()
            .position(|queued| queued.fire_at > event.fire_at)
            .unwrap_or(self.queue.len());
        self.queue.insert(index, event);
    }

    /// The earliest queued event, if any.
    pub fn peek_min(&self) -> Option<&ScheduledEvent> {
        self.queue.front()
    }

    /// Removes and returns the earliest queued event.
    pub fn pop_min(&mut self) -> Option<ScheduledEvent> {
        self.queue.pop_front()
    }

    /// Pops the head if it is due at `now`. An undue head stays put —
    /// and because the queue is sorted, so does everything behind it.
    pub fn next_due(&mut self, now: SimTime) -> Option<ScheduledEvent> {
        let event = self.pop_min()?;
        if event.fire_at > now {
            self.insert(event);
            return None;
        }
        Some(event)
    }

    /// Drops every outstanding event aimed at a removed target.
    pub fn cancel_for(&mut self, target: Entity) {
        self.queue.retain(|event| event.target != target);
    }
}

/// Fires every due event against its target, pattern-matching action kind
/// against target capability. Events aimed at despawned targets are
/// dropped silently.
pub fn drain_scheduler(
    clock: Res<WorldClock>,
    mut scheduler: ResMut<EventScheduler>,
    mut events: ResMut<WorldEvents>,
    mut commands: Commands,
    mut agents: Query<&mut CurrentAction>,
    mut plants: Query<(&mut Plant, &Position)>,
    effects: Query<(&Effect, &Position)>,
) {
    while let Some(event) = scheduler.next_due(clock.now) {
        match event.action {
            DeferredAction::Install(action) => {
                let Ok(mut current) = agents.get_mut(event.target) else {
                    continue;
                };
                let deltas = match &action {
                    Action::Birth(_) => BirthAction::builtin_deltas(),
                    _ => Vec::new(),
                };
                current.assign_scheduled(ActiveAction::new(action, deltas), true);
            }
            DeferredAction::Grow => {
                let Ok((mut plant, position)) = plants.get_mut(event.target) else {
                    continue;
                };
                let chain = plant.grow();
                events.push(
                    &clock,
                    WorldEvent::PlantAdvanced {
                        stage: plant.stage.as_str().to_string(),
                        x: position.x,
                        y: position.y,
                    },
                );
                if chain {
                    // Growth stages chain themselves forward.
                    scheduler.insert(ScheduledEvent::new(
                        clock.after(plant.kind.growth_seconds()),
                        DeferredAction::Grow,
                        event.target,
                    ));
                }
            }
            DeferredAction::Expire => {
                let Ok((effect, position)) = effects.get(event.target) else {
                    continue;
                };
                events.push(
                    &clock,
                    WorldEvent::EffectExpired {
                        kind: effect.kind.as_str().to_string(),
                        x: position.x,
                        y: position.y,
                    },
                );
                commands.entity(event.target).despawn();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(world: &mut World) -> Entity {
        world.spawn_empty().id()
    }

    fn at(seconds: u64) -> SimTime {
        SimTime::from_seconds(seconds)
    }

    #[test]
    fn test_insert_keeps_sorted_order() {
        let mut world = World::new();
        let target = entity(&mut world);
        let mut scheduler = EventScheduler::new();

        for seconds in [5, 1, 3, 9, 2] {
            scheduler.insert(ScheduledEvent::new(at(seconds), DeferredAction::Grow, target));
        }

        let mut drained = Vec::new();
        while let Some(event) = scheduler.pop_min() {
            drained.push(event.fire_at.seconds());
        }
        assert_eq!(drained, vec![1, 2, 3, 5, 9]);
    }

    #[test]
    fn test_drain_fires_due_in_order_and_keeps_rest() {
        // Insert at [5, 1, 3]; draining at time 3 must fire 1 then 3 and
        // leave 5 enqueued.
        let mut world = World::new();
        let target = entity(&mut world);
        let mut scheduler = EventScheduler::new();
        for seconds in [5, 1, 3] {
            scheduler.insert(ScheduledEvent::new(at(seconds), DeferredAction::Grow, target));
        }

        let mut fired = Vec::new();
        while let Some(event) = scheduler.next_due(at(3)) {
            fired.push(event.fire_at.seconds());
        }
        assert_eq!(fired, vec![1, 3]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.peek_min().unwrap().fire_at, at(5));
    }

    #[test]
    fn test_drain_stops_at_first_undue() {
        let mut world = World::new();
        let target = entity(&mut world);
        let mut scheduler = EventScheduler::new();
        for seconds in [10, 20, 30] {
            scheduler.insert(ScheduledEvent::new(at(seconds), DeferredAction::Grow, target));
        }

        assert!(scheduler.next_due(at(5)).is_none());
        // Nothing fired before its timestamp; everything still queued.
        assert_eq!(scheduler.len(), 3);
    }

    #[test]
    fn test_sorted_across_interleaved_operations() {
        let mut world = World::new();
        let target = entity(&mut world);
        let mut scheduler = EventScheduler::new();

        scheduler.insert(ScheduledEvent::new(at(7), DeferredAction::Grow, target));
        scheduler.insert(ScheduledEvent::new(at(2), DeferredAction::Grow, target));
        assert_eq!(scheduler.pop_min().unwrap().fire_at, at(2));
        scheduler.insert(ScheduledEvent::new(at(4), DeferredAction::Grow, target));
        scheduler.insert(ScheduledEvent::new(at(1), DeferredAction::Grow, target));
        assert_eq!(scheduler.pop_min().unwrap().fire_at, at(1));
        scheduler.insert(ScheduledEvent::new(at(6), DeferredAction::Grow, target));

        let mut drained = Vec::new();
        while let Some(event) = scheduler.pop_min() {
            drained.push(event.fire_at.seconds());
        }
        let mut sorted = drained.clone();
        sorted.sort_unstable();
        assert_eq!(drained, sorted);
    }

    #[test]
    fn test_ties_fire_in_insertion_order() {
        let mut world = World::new();
        let first = entity(&mut world);
        let second = entity(&mut world);
        let mut scheduler = EventScheduler::new();
        scheduler.insert(ScheduledEvent::new(at(5), DeferredAction::Grow, first));
        scheduler.insert(ScheduledEvent::new(at(5), DeferredAction::Expire, second));

        assert_eq!(scheduler.pop_min().unwrap().target, first);
        assert_eq!(scheduler.pop_min().unwrap().target, second);
    }

    #[test]
    fn test_cancel_for_removes_all_events_for_target() {
        let mut world = World::new();
        let doomed = entity(&mut world);
        let survivor = entity(&mut world);
        let mut scheduler = EventScheduler::new();
        scheduler.insert(ScheduledEvent::new(at(1), DeferredAction::Grow, doomed));
        scheduler.insert(ScheduledEvent::new(at(2), DeferredAction::Grow, survivor));
        scheduler.insert(ScheduledEvent::new(at(3), DeferredAction::Expire, doomed));

        scheduler.cancel_for(doomed);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.peek_min().unwrap().target, survivor);
    }

    #[test]
    fn test_peek_empty() {
        let scheduler = EventScheduler::new();
        assert!(scheduler.peek_min().is_none());
        assert!(scheduler.is_empty());
    }
}
