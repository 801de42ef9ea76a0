//! Lifecycle System
//!
//! End-of-tick sweep: dead agents leave the world (dropping what they
//! carried), spent items and harvested plants disappear, orphaned sleep
//! markers clear, and the ambient spawners drip new animals and items in.

use bevy_ecs::prelude::*;
use rand::Rng;

use sim_events::WorldEvent;

use crate::actions::{ActionKind, CurrentAction};
use crate::components::{
    random_point, AgentId, Animal, AnimalKind, Effect, EffectKind, GroundItem, Inventory, ItemKind,
    ObjectClass, Person, Position, Vitals, WorldBounds, WorldClock,
};
use crate::config::SimConfig;
use crate::scheduler::EventScheduler;
use crate::scoring::weighted_random_choice;
use crate::setup::animal_components;
use crate::systems::perception::PerceivedWorld;
use crate::{IdAllocator, SimRng, WorldEvents};

/// Counter for the ambient item drip.
#[derive(Resource, Debug, Default)]
pub struct SpawnCounters {
    pub item_counter: u32,
}

/// Spawn mix for wild animals.
fn animal_spawn_weights() -> Vec<(AnimalKind, f64)> {
    vec![
        (AnimalKind::Bear, 0.10),
        (AnimalKind::Goat, 0.50),
        (AnimalKind::Wolf, 0.20),
        (AnimalKind::Hog, 0.20),
    ]
}

/// The end-of-tick reap-and-spawn pass.
#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub fn reap_and_spawn(
    clock: Res<WorldClock>,
    config: Res<SimConfig>,
    bounds: Res<WorldBounds>,
    perceived: Res<PerceivedWorld>,
    mut counters: ResMut<SpawnCounters>,
    mut scheduler: ResMut<EventScheduler>,
    mut events: ResMut<WorldEvents>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    mut commands: Commands,
    mut agents: Query<(
        Entity,
        &AgentId,
        &Vitals,
        &Position,
        &mut Inventory,
        Option<&Person>,
        Option<&Animal>,
    )>,
    items: Query<(Entity, &GroundItem)>,
    plants: Query<(Entity, &crate::components::Plant)>,
    markers: Query<(Entity, &Effect, &Position), Without<AgentId>>,
    sleepers: Query<&CurrentAction>,
) {
    // Dead agents: drop the load, cancel their futures, announce, remove.
    for (entity, agent_id, vitals, position, mut inventory, person, animal) in agents.iter_mut() {
        if !vitals.is_dead() {
            continue;
        }

        for stack in inventory.drain() {
            commands.spawn((
                Position::new(position.x, position.y),
                ObjectClass::Item,
                GroundItem::new(stack.kind, stack.amount),
            ));
            events.push(
                &clock,
                WorldEvent::ItemDropped {
                    kind: stack.kind.as_str().to_string(),
                    amount: stack.amount,
                    x: position.x,
                    y: position.y,
                },
            );
        }

        // A fallen animal leaves meat behind.
        if let Some(animal) = animal {
            commands.spawn((
                Position::new(position.x, position.y),
                ObjectClass::Item,
                GroundItem::new(ItemKind::Meat, animal.drop_count),
            ));
            events.push(
                &clock,
                WorldEvent::ItemDropped {
                    kind: ItemKind::Meat.as_str().to_string(),
                    amount: animal.drop_count,
                    x: position.x,
                    y: position.y,
                },
            );
        }

        let species = match (person, animal) {
            (Some(_), _) => "person".to_string(),
            (_, Some(animal)) => animal.kind.as_str().to_string(),
            _ => "unknown".to_string(),
        };
        events.push(
            &clock,
            WorldEvent::AgentDied {
                agent_id: agent_id.0.clone(),
                species,
            },
        );

        scheduler.cancel_for(entity);
        commands.entity(entity).despawn();
    }

    // Spent items vanish.
    for (entity, item) in items.iter() {
        if item.taken || item.amount == 0 {
            commands.entity(entity).despawn();
        }
    }

    // One-shot plants that have been picked clean vanish too.
    for (entity, plant) in plants.iter() {
        if plant.harvested {
            scheduler.cancel_for(entity);
            commands.entity(entity).despawn();
        }
    }

    // Sleep markers last exactly as long as their owner keeps sleeping.
    for (entity, effect, position) in markers.iter() {
        if effect.kind != EffectKind::Sleep {
            continue;
        }
        let asleep = effect
            .owner
            .and_then(|owner| sleepers.get(owner).ok())
            .map(|current| current.is_running(ActionKind::Sleep))
            .unwrap_or(false);
        if !asleep {
            events.push(
                &clock,
                WorldEvent::EffectExpired {
                    kind: effect.kind.as_str().to_string(),
                    x: position.x,
                    y: position.y,
                },
            );
            commands.entity(entity).despawn();
        }
    }

    // Ambient animal spawns, capped by total population.
    if rng.0.gen::<f64>() < config.spawn.animal_spawn_chance
        && perceived.entity_count < config.spawn.max_entity_count
    {
        if let Ok(kind) = weighted_random_choice(&mut rng.0, animal_spawn_weights()) {
            let (x, y) = random_point(&mut rng.0, &bounds);
            let id = ids.next_id();
            let name = id.0.clone();
            spawn_animal(&mut commands, &mut scheduler, &clock, id, kind, x, y);
            events.push(
                &clock,
                WorldEvent::AgentSpawned {
                    agent_id: name,
                    species: kind.as_str().to_string(),
                    x,
                    y,
                },
            );
        }
    }

    // Periodic item drip keeps food and rocks trickling into the world.
    counters.item_counter += 1;
    if counters.item_counter > config.spawn.item_spawn_period {
        counters.item_counter = 0;
        for kind in [ItemKind::Apple, ItemKind::Rock] {
            let (x, y) = random_point(&mut rng.0, &bounds);
            commands.spawn((
                Position::new(x, y),
                ObjectClass::Item,
                GroundItem::new(kind, 1),
            ));
            events.push(
                &clock,
                WorldEvent::ItemDropped {
                    kind: kind.as_str().to_string(),
                    amount: 1,
                    x,
                    y,
                },
            );
        }
    }
}

/// Spawns a wild animal and schedules its maturation.
pub fn spawn_animal(
    commands: &mut Commands,
    scheduler: &mut EventScheduler,
    clock: &WorldClock,
    id: AgentId,
    kind: AnimalKind,
    x: f64,
    y: f64,
) {
    use crate::actions::timed::MATURE_SECONDS;
    use crate::scheduler::{DeferredAction, ScheduledEvent};

    let entity = commands.spawn(animal_components(id, kind, x, y, false)).id();
    scheduler.insert(ScheduledEvent::new(
        clock.after(MATURE_SECONDS),
        DeferredAction::Install(crate::actions::Action::mature()),
        entity,
    ));
}

/// Advances the clock and the decision throttles; the last system of
/// every tick.
pub fn advance_clock(
    mut clock: ResMut<WorldClock>,
    mut timers: ResMut<crate::systems::needs::DecisionTimers>,
) {
    timers.advance();
    clock.advance();
}
