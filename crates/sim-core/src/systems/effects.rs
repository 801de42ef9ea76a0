//! Effect Application System
//!
//! Drains the per-tick queue of cross-entity consequences and applies
//! them where the data lives: damage and pre-emption, item transfers,
//! conception and birth, deferred-event registration. Every handler
//! treats a missing target as a silent no-op; an effect aimed at
//! something that died this tick simply evaporates.

use bevy_ecs::prelude::*;
use rand::Rng;

use sim_events::WorldEvent;

use crate::actions::{
    timed::{GESTATION_SECONDS, MATURE_SECONDS},
    Action, ActionEffect, ActionEffects, ActiveAction, CurrentAction,
};
use crate::components::{
    AgentId, Effect, EffectKind, GroundItem, HomeStore, Inventory, Maturity, Mobility, Needs,
    ObjectClass, Person, Plant, Position, Sex, Vitals, WorldClock,
};
use crate::scheduler::{DeferredAction, EventScheduler, ScheduledEvent};
use crate::setup::person_components;
use crate::{IdAllocator, SimRng, WorldEvents};

/// Seconds a finite visual marker lives.
const ANIMATION_SECONDS: u64 = 5;

/// Applies every queued action effect.
#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub fn apply_action_effects(
    clock: Res<WorldClock>,
    mut effects: ResMut<ActionEffects>,
    mut scheduler: ResMut<EventScheduler>,
    mut store: ResMut<HomeStore>,
    mut events: ResMut<WorldEvents>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    mut commands: Commands,
    mut agents: Query<(
        Entity,
        &AgentId,
        &Position,
        &Maturity,
        &mut CurrentAction,
        &mut Needs,
        &mut Vitals,
        &mut Mobility,
        &mut Inventory,
        Option<&mut Person>,
    )>,
    mut items: Query<&mut GroundItem>,
    mut plants: Query<(&mut Plant, &Position), Without<Person>>,
) {
    for effect in effects.drain() {
        match effect {
            ActionEffect::Damage {
                target,
                amount,
                attacker,
            } => {
                let Ok((_, _, _, _, mut current, _, mut vitals, _, _, _)) = agents.get_mut(target)
                else {
                    continue;
                };
                // Interruptible work stops on the spot so the victim can
                // respond next cycle; locked waits break too.
                current.interrupt_for_damage();
                vitals.health -= amount;
                vitals.attacker = attacker;
            }
            ActionEffect::PickupItem { item, by } => {
                let Ok(mut ground) = items.get_mut(item) else {
                    continue;
                };
                if ground.taken {
                    continue;
                }
                let amount = ground.amount;
                let kind = ground.kind;
                ground.take_amount(amount);
                if let Ok((_, _, _, _, _, _, _, _, mut inventory, _)) = agents.get_mut(by) {
                    inventory.add(kind, amount);
                }
            }
            ActionEffect::ConsumeItem { item } => {
                if let Ok(mut ground) = items.get_mut(item) {
                    let amount = ground.amount;
                    ground.take_amount(amount);
                }
            }
            ActionEffect::HarvestPlant { plant } => {
                let Ok((mut plant_state, position)) = plants.get_mut(plant) else {
                    continue;
                };
                if !plant_state.harvestable() {
                    continue;
                }
                let kind = plant_state.kind.harvest_yield();
                if plant_state.kind.survives_harvest() {
                    plant_state.fruit -= 1;
                    // Regrow the picked fruit later.
                    scheduler.insert(ScheduledEvent::new(
                        clock.after(plant_state.kind.growth_seconds()),
                        DeferredAction::Grow,
                        plant,
                    ));
                } else {
                    plant_state.harvested = true;
                }
                commands.spawn((
                    Position::new(position.x, position.y),
                    ObjectClass::Item,
                    GroundItem::new(kind, 1),
                ));
                events.push(
                    &clock,
                    WorldEvent::ItemDropped {
                        kind: kind.as_str().to_string(),
                        amount: 1,
                        x: position.x,
                        y: position.y,
                    },
                );
            }
            ActionEffect::RequestItem { kind, by } => {
                if store.take(kind, 1) == 1 {
                    if let Ok((_, _, _, _, _, _, _, _, mut inventory, _)) = agents.get_mut(by) {
                        inventory.add(kind, 1);
                    }
                }
            }
            ActionEffect::DropItems { by, at_home } => {
                let Ok((_, _, position, _, _, _, _, _, mut inventory, _)) = agents.get_mut(by)
                else {
                    continue;
                };
                let position = *position;
                for stack in inventory.drain() {
                    if at_home {
                        store.add(stack.kind, stack.amount);
                        events.push(
                            &clock,
                            WorldEvent::ItemStored {
                                kind: stack.kind.as_str().to_string(),
                                amount: stack.amount,
                            },
                        );
                    } else {
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
                }
            }
            ActionEffect::HoldPartner {
                partner,
                wait_seconds,
            } => {
                if let Ok((_, _, _, _, mut current, _, _, _, _, _)) = agents.get_mut(partner) {
                    current.assign_scheduled(
                        ActiveAction::new(Action::wait(wait_seconds, true), Vec::new()),
                        true,
                    );
                }
            }
            ActionEffect::Conceive { a, b } => {
                let Ok([first, second]) = agents.get_many_mut([a, b]) else {
                    continue;
                };
                if let Some((mother, x, y)) = start_pregnancy(first, second, &mut rng) {
                    scheduler.insert(ScheduledEvent::new(
                        clock.after(GESTATION_SECONDS),
                        DeferredAction::Install(Action::birth()),
                        mother,
                    ));
                    spawn_effect_marker(
                        &mut commands,
                        &mut scheduler,
                        &mut events,
                        &clock,
                        EffectKind::Love,
                        x,
                        y,
                        None,
                    );
                }
            }
            ActionEffect::BirthCompleted { mother } => {
                let Ok((_, agent_id, position, _, _, _, _, mut mobility, _, Some(mut person))) =
                    agents.get_mut(mother)
                else {
                    continue;
                };
                let Some(child_sex) = person.fetus.take() else {
                    continue;
                };
                mobility.speed += 1.0;

                let child_id = ids.next_id();
                let child_name = child_id.0.clone();
                let child = commands
                    .spawn(person_components(
                        child_id,
                        child_sex,
                        position.x,
                        position.y,
                        false,
                        &mut rng.0,
                    ))
                    .id();
                scheduler.insert(ScheduledEvent::new(
                    clock.after(MATURE_SECONDS),
                    DeferredAction::Install(Action::mature()),
                    child,
                ));

                events.push(
                    &clock,
                    WorldEvent::BirthCompleted {
                        mother_id: agent_id.0.clone(),
                        child_id: child_name.clone(),
                    },
                );
                events.push(
                    &clock,
                    WorldEvent::AgentSpawned {
                        agent_id: child_name,
                        species: "person".to_string(),
                        x: position.x,
                        y: position.y,
                    },
                );
            }
            ActionEffect::ApplyDeltas { target, deltas } => {
                if let Ok((_, _, _, _, _, mut needs, _, _, _, _)) = agents.get_mut(target) {
                    needs.apply_deltas(&deltas);
                }
            }
            ActionEffect::SpawnEffect { kind, x, y, owner } => {
                spawn_effect_marker(
                    &mut commands,
                    &mut scheduler,
                    &mut events,
                    &clock,
                    kind,
                    x,
                    y,
                    owner,
                );
            }
            ActionEffect::InstallNext { target, action } => {
                if let Ok((_, _, _, _, mut current, _, _, _, _, _)) = agents.get_mut(target) {
                    current.try_assign(ActiveAction::new(action, Vec::new()), false);
                }
            }
        }
    }
}

type AgentItem<'a> = (
    Entity,
    &'a AgentId,
    &'a Position,
    &'a Maturity,
    Mut<'a, CurrentAction>,
    Mut<'a, Needs>,
    Mut<'a, Vitals>,
    Mut<'a, Mobility>,
    Mut<'a, Inventory>,
    Option<Mut<'a, Person>>,
);

/// Validates a mating pair and starts the pregnancy. Returns the mother
/// entity and her position when conception took; the female of the pair
/// carries, slows down, and will have labor installed when gestation
/// ends.
fn start_pregnancy(
    first: AgentItem,
    second: AgentItem,
    rng: &mut SimRng,
) -> Option<(Entity, f64, f64)> {
    let (first_entity, _, first_pos, first_maturity, _, _, _, first_mobility, _, first_person) =
        first;
    let (second_entity, _, second_pos, second_maturity, _, _, _, second_mobility, _, second_person) =
        second;

    let (first_person, second_person) = match (first_person, second_person) {
        (Some(a), Some(b)) => (a, b),
        _ => return None,
    };
    if !first_maturity.adult || !second_maturity.adult {
        return None;
    }
    if first_person.sex == second_person.sex {
        return None;
    }
    if first_person.is_pregnant() || second_person.is_pregnant() {
        return None;
    }

    let (mut mother, mut mother_mobility, mother_entity, mother_pos) =
        if first_person.sex == Sex::Female {
            (first_person, first_mobility, first_entity, first_pos)
        } else {
            (second_person, second_mobility, second_entity, second_pos)
        };

    let child_sex = if rng.0.gen_range(0..2) == 0 {
        Sex::Female
    } else {
        Sex::Male
    };
    mother.fetus = Some(child_sex);
    // Carrying is slow going until the birth.
    mother_mobility.speed -= 1.0;

    Some((mother_entity, mother_pos.x, mother_pos.y))
}

/// Spawns a visual marker entity, announces it, and schedules expiry for
/// the finite kinds. Sleep markers instead last while their owner sleeps.
#[allow(clippy::too_many_arguments)]
fn spawn_effect_marker(
    commands: &mut Commands,
    scheduler: &mut EventScheduler,
    events: &mut WorldEvents,
    clock: &WorldClock,
    kind: EffectKind,
    x: f64,
    y: f64,
    owner: Option<Entity>,
) {
    let marker = commands
        .spawn((
            Position::new(x, y),
            ObjectClass::Effect,
            Effect { kind, owner },
        ))
        .id();
    if kind.is_finite() {
        scheduler.insert(ScheduledEvent::new(
            clock.after(ANIMATION_SECONDS),
            DeferredAction::Expire,
            marker,
        ));
    }
    events.push(
        clock,
        WorldEvent::EffectStarted {
            kind: kind.as_str().to_string(),
            x,
            y,
        },
    );
}
