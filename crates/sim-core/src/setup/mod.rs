//! World Setup
//!
//! Component bundles for spawning agents, and the initial population of
//! the world: the home base, a campfire, a starter tool, a handful of
//! people, the first wild animals, and the plant cover.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use sim_events::WorldEvent;

use crate::actions::CurrentAction;
use crate::components::{
    random_point, AgentId, Animal, AnimalKind, Campfire, GroundItem, GrowthStage, Inventory,
    ItemKind, Maturity, Mobility, Needs, ObjectClass, Person, Plant, PlantKind, Position, Sex,
    Stats, Velocity, Vitals, WorldBounds, WorldClock,
};
use crate::config::SimConfig;
use crate::scheduler::{DeferredAction, EventScheduler, ScheduledEvent};
use crate::{HomeBase, IdAllocator, SimRng, WorldEvents};

/// Default walking speed of a person.
const PERSON_SPEED: f64 = 2.5;
/// Default animal speed.
const ANIMAL_SPEED: f64 = 1.5;
/// Shared perception radius.
const VISION_RANGE: f64 = 100.0;
/// Melee reach.
const ATTACK_RANGE: f64 = 50.0;
/// Damage before the strength multiplier.
const BASE_DAMAGE: i32 = 20;

/// Rolls below this boost an attribute; rolls above the detriment
/// threshold weaken it.
const BOOST_THRESHOLD: f64 = 0.2;
const DETRIMENT_THRESHOLD: f64 = 0.98;

type PersonBundle = (
    AgentId,
    ObjectClass,
    Position,
    Velocity,
    Mobility,
    Needs,
    Vitals,
    Stats,
    Maturity,
    Person,
    Inventory,
    CurrentAction,
);

type AnimalBundle = (
    AgentId,
    ObjectClass,
    Position,
    Velocity,
    Mobility,
    Needs,
    Vitals,
    Stats,
    Maturity,
    Animal,
    Inventory,
    CurrentAction,
);

/// Components for a person. Attributes start near their defaults with a
/// small random spread, plus a rare boost or detriment to vision and
/// speed.
pub fn person_components(
    id: AgentId,
    sex: Sex,
    x: f64,
    y: f64,
    adult: bool,
    rng: &mut SmallRng,
) -> PersonBundle {
    let jitter = |rng: &mut SmallRng| f64::from(rng.gen_range(-10i32..=10)) * 0.01;
    let strength = 0.5 + jitter(rng);

    let mut vision = VISION_RANGE;
    let mut speed = PERSON_SPEED;
    let roll: f64 = rng.gen();
    if roll < BOOST_THRESHOLD {
        vision += 20.0;
        speed += 0.5;
    } else if roll >= DETRIMENT_THRESHOLD {
        vision -= 20.0;
        speed -= 0.5;
    }

    (
        id,
        ObjectClass::Person,
        Position::new(x, y),
        Velocity::zero(),
        Mobility::new(speed),
        Needs::full(),
        Vitals::new(),
        Stats {
            strength,
            vision_range: vision,
            attack_range: ATTACK_RANGE,
            base_damage: BASE_DAMAGE,
        },
        if adult {
            Maturity::adult()
        } else {
            Maturity::child()
        },
        Person::new(sex),
        Inventory::new(),
        CurrentAction::none(),
    )
}

/// Components for a wild animal of the given kind.
pub fn animal_components(id: AgentId, kind: AnimalKind, x: f64, y: f64, adult: bool) -> AnimalBundle {
    let (strength, drop_count) = match kind {
        AnimalKind::Goat => (0.0, 1),
        AnimalKind::Hog => (0.5, 5),
        AnimalKind::Wolf => (0.75, 1),
        AnimalKind::Bear => (0.9, 10),
    };

    (
        id,
        ObjectClass::Animal,
        Position::new(x, y),
        Velocity::zero(),
        Mobility::new(ANIMAL_SPEED),
        Needs::midpoint(),
        Vitals::new(),
        Stats {
            strength,
            vision_range: VISION_RANGE,
            attack_range: ATTACK_RANGE,
            base_damage: BASE_DAMAGE,
        },
        if adult {
            Maturity::adult()
        } else {
            Maturity::child()
        },
        Animal { kind, drop_count },
        Inventory::new(),
        CurrentAction::none(),
    )
}

/// The plant cover rotation for general plants.
const PLANT_ROTATION: [PlantKind; 4] = [
    PlantKind::Potato,
    PlantKind::PineTree,
    PlantKind::Yucca,
    PlantKind::Shrub,
];

fn initial_stage(kind: PlantKind) -> GrowthStage {
    match kind {
        PlantKind::Potato => GrowthStage::Seed,
        PlantKind::PineTree | PlantKind::Yucca => GrowthStage::Juvenile,
        PlantKind::Shrub | PlantKind::AppleTree => GrowthStage::Adult,
    }
}

/// Fills an empty world: home base fixtures, founders, the first
/// animals, and plant cover. Growth for immature plants is scheduled
/// immediately.
pub fn populate(world: &mut World) {
    let config = world.resource::<SimConfig>().clone();
    let bounds = *world.resource::<WorldBounds>();
    let clock = *world.resource::<WorldClock>();
    let home = *world.resource::<HomeBase>();

    world.spawn((Position::new(home.x, home.y), ObjectClass::Home));
    world.spawn((
        Position::new((home.x - 200.0).max(10.0), (home.y - 300.0).max(10.0)),
        ObjectClass::Campfire,
        Campfire,
    ));
    world.spawn((
        Position::new(home.x - 40.0, (home.y - 200.0).max(10.0)),
        ObjectClass::Item,
        GroundItem::new(ItemKind::Spear, 1),
    ));

    let mut pending: Vec<ScheduledEvent> = Vec::new();

    world.resource_scope(|world: &mut World, mut rng: Mut<SimRng>| {
        // Founders cluster around the home base, grown and ready.
        for _ in 0..config.spawn.initial_people {
            let sex = if rng.0.gen_range(0..2) == 0 {
                Sex::Male
            } else {
                Sex::Female
            };
            let x = home.x + f64::from(rng.0.gen_range(-100i32..=100));
            let y = home.y + f64::from(rng.0.gen_range(-100i32..=100));
            let id = world.resource_mut::<IdAllocator>().next_id();
            let name = id.0.clone();
            world.spawn(person_components(id, sex, x, y, true, &mut rng.0));
            world.resource_scope(|_, mut events: Mut<WorldEvents>| {
                events.push(
                    &clock,
                    WorldEvent::AgentSpawned {
                        agent_id: name.clone(),
                        species: "person".to_string(),
                        x,
                        y,
                    },
                );
            });
        }

        // One of each starter animal somewhere out in the world.
        for kind in [AnimalKind::Goat, AnimalKind::Hog, AnimalKind::Wolf] {
            let (x, y) = random_point(&mut rng.0, &bounds);
            let id = world.resource_mut::<IdAllocator>().next_id();
            let name = id.0.clone();
            world.spawn(animal_components(id, kind, x, y, true));
            world.resource_scope(|_, mut events: Mut<WorldEvents>| {
                events.push(
                    &clock,
                    WorldEvent::AgentSpawned {
                        agent_id: name.clone(),
                        species: kind.as_str().to_string(),
                        x,
                        y,
                    },
                );
            });
        }

        // Standing orchard plus mixed plant cover.
        for _ in 0..config.spawn.initial_apple_trees {
            let (x, y) = random_point(&mut rng.0, &bounds);
            world.spawn((
                Position::new(x, y),
                ObjectClass::Plant,
                Plant::new(PlantKind::AppleTree, GrowthStage::Adult),
            ));
        }
        for index in 0..config.spawn.initial_plants {
            let kind = PLANT_ROTATION[index as usize % PLANT_ROTATION.len()];
            let stage = initial_stage(kind);
            let (x, y) = random_point(&mut rng.0, &bounds);
            let entity = world
                .spawn((Position::new(x, y), ObjectClass::Plant, Plant::new(kind, stage)))
                .id();
            if stage != GrowthStage::Adult {
                pending.push(ScheduledEvent::new(
                    clock.after(kind.growth_seconds()),
                    DeferredAction::Grow,
                    entity,
                ));
            }
        }
    });

    let mut scheduler = world.resource_mut::<EventScheduler>();
    for event in pending {
        scheduler.insert(event);
    }
}
