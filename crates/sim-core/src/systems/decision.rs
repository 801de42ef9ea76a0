//! Decision Loop
//!
//! Per-species orchestrators: gather every advertisement offered by
//! nearby objects, append the built-in fallbacks, re-weight by player
//! task priorities, hand the pile to the utility scorer, and install the
//! winner. Throttled to a period per species, with the animal pass offset
//! so the two never share a tick.

use bevy_ecs::prelude::*;

use sim_events::WorldEvent;

use crate::actions::{
    timed::{MATE_TIME, NAP_SECONDS, SLEEP_SECONDS},
    Action, ActionKind, ActiveAction, Advertisement, CurrentAction,
};
use crate::components::{
    scoring_value, Animal, AnimalKind, Inventory, ItemKind, Maturity, Need, Needs, ObjectClass,
    Person, Position, Sex, Stats, Velocity, Vitals, WorldClock,
};
use crate::components::{HomeBase, HomeStore};
use crate::config::SimConfig;
use crate::scoring::UtilityScorer;
use crate::spatial::SpatialGrid;
use crate::systems::needs::DecisionTimers;
use crate::systems::perception::{ObjectView, PerceivedWorld};
use crate::{AgentId, SimRng, WorldEvents};

/// Advertised need-delta constants, tuned as a set.
pub mod deltas {
    /// Reward for answering an attacker (fight or flee).
    pub const ATTACKER_RESPONSE: f64 = 0.05;
    /// Idle wandering advertisement.
    pub const IDLE: f64 = 0.002;
    /// Full sleep tiredness promise.
    pub const SLEEP_TIREDNESS: f64 = 0.1;
    /// Full sleep health promise.
    pub const SLEEP_HEALTH: f64 = 1.0;
    /// Per-tick nap trickle.
    pub const NAP_TIREDNESS: f64 = 0.0005;
    /// Wolves and bears devouring carrion.
    pub const CONSUME_FOOD: f64 = 0.35;
    /// Banking food at the home store.
    pub const DROP_FOOD: f64 = 0.125;
    /// Shaking a plant.
    pub const HARVEST_PLANT: f64 = 0.15;
    /// Grabbing a ground item.
    pub const PICKUP: f64 = 0.4;
    /// Attacking prey or a rival.
    pub const ATTACK_PREY: f64 = 0.04;
    /// Running from a predator.
    pub const FLEE_THREAT: f64 = 0.0025;
    /// Traveling with the pack.
    pub const PACK_FOLLOW: f64 = 0.002;
    /// Keeping a person company.
    pub const FOLLOW_PERSON: f64 = 0.0025;
    /// Mating, per second of the hold.
    pub const MATE_LUST: f64 = 0.025;
    pub const MATE_SOCIAL: f64 = 0.01;
    /// What a person is worth to a hungry bear.
    pub const PREY_HUNGER: f64 = 0.5;
}

/// Hunger level below which eating becomes a fallback.
const EAT_HUNGER_THRESHOLD: f64 = 0.5;
/// Tiredness level below which a full sleep is offered.
const SLEEP_TIREDNESS_THRESHOLD: f64 = 0.6;
/// Health below which sleep is offered regardless of tiredness.
const SLEEP_HEALTH_THRESHOLD: i32 = 50;
/// Per-kind carry limit before pickup stops being advertised.
const CARRY_CAPACITY: u32 = 5;

/// A player-directed priority: advertisements of this kind get their
/// deltas scaled.
#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub kind: ActionKind,
    pub multiplier: f64,
}

/// Decision policy for people.
#[derive(Resource, Debug, Default)]
pub struct PersonPolicy {
    pub scorer: UtilityScorer,
    pub tasks: Vec<Task>,
}

impl PersonPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decision policy for animals.
#[derive(Resource, Debug, Default)]
pub struct AnimalPolicy {
    pub scorer: UtilityScorer,
}

/// What the deciding agent knows about itself while gathering offers.
struct Observer<'a> {
    needs: &'a Needs,
    vitals: &'a Vitals,
    stats: &'a Stats,
    adult: bool,
    sex: Option<Sex>,
    pregnant: bool,
    animal_kind: Option<AnimalKind>,
    inventory: Option<&'a Inventory>,
}

impl Observer<'_> {
    fn is_person(&self) -> bool {
        self.animal_kind.is_none()
    }

    fn carried(&self, kind: ItemKind) -> u32 {
        self.inventory.map(|inv| inv.count(kind)).unwrap_or(0)
    }
}

/// What one nearby object offers this observer. The per-class rules the
/// world's objects advertise themselves by.
fn object_offers(source: &ObjectView, observer: &Observer, mate_mod: f64) -> Vec<Advertisement> {
    let mut offers = Vec::new();

    match source.class {
        ObjectClass::Person => {
            let Some(person) = source.person else {
                return offers;
            };
            if observer.is_person() {
                let eligible = person.adult
                    && observer.adult
                    && observer.sex.map(|s| s != person.sex).unwrap_or(false)
                    && !person.pregnant
                    && !observer.pregnant;
                if eligible {
                    // The reward accrues over the hold, so the promise is
                    // scaled down to a per-second rate.
                    offers.push(Advertisement::new(
                        Action::mate(source.entity),
                        vec![
                            (Need::Lust, deltas::MATE_LUST * mate_mod / MATE_TIME as f64),
                            (Need::Social, deltas::MATE_SOCIAL * mate_mod / MATE_TIME as f64),
                        ],
                    ));
                }
                let company = if observer.pregnant { 5.0 } else { 1.0 };
                offers.push(Advertisement::new(
                    Action::follow(source.entity),
                    vec![(Need::Social, deltas::FOLLOW_PERSON * company)],
                ));
            } else if observer.animal_kind == Some(AnimalKind::Bear) {
                // People read as prey to bears.
                if let Ok(attack) = Action::attack(source.entity, source.class) {
                    offers.push(Advertisement::new(
                        attack,
                        vec![(Need::Hunger, deltas::PREY_HUNGER)],
                    ));
                }
            }
        }
        ObjectClass::Animal => {
            let Some(animal) = source.animal else {
                return offers;
            };
            if observer.is_person() {
                let health = f64::from(observer.vitals.health);
                match observer.sex {
                    Some(Sex::Male) => {
                        // Fight anything beatable (or harmless); run from
                        // the rest. Ticks-to-kill on both sides of the
                        // comparison.
                        let winnable = f64::from(source.health) / observer.stats.strength
                            < health / source.strength
                            || matches!(animal.kind, AnimalKind::Hog | AnimalKind::Goat);
                        if winnable {
                            if let Ok(attack) = Action::attack(source.entity, source.class) {
                                offers.push(Advertisement::new(
                                    attack,
                                    vec![(Need::JobFulfillment, deltas::ATTACK_PREY)],
                                ));
                            }
                        } else {
                            offers.push(Advertisement::new(
                                Action::flee(source.entity),
                                vec![(Need::JobFulfillment, deltas::FLEE_THREAT)],
                            ));
                        }
                    }
                    _ => {
                        if matches!(animal.kind, AnimalKind::Bear | AnimalKind::Wolf) {
                            offers.push(Advertisement::new(
                                Action::flee(source.entity),
                                vec![(Need::JobFulfillment, deltas::FLEE_THREAT)],
                            ));
                        }
                    }
                }
            } else if let Some(own_kind) = observer.animal_kind {
                if animal.kind == AnimalKind::Goat && own_kind == AnimalKind::Wolf {
                    if let Ok(attack) = Action::attack(source.entity, source.class) {
                        offers.push(Advertisement::new(
                            attack,
                            vec![(Need::JobFulfillment, deltas::ATTACK_PREY)],
                        ));
                    }
                } else if animal.kind == AnimalKind::Wolf && own_kind == AnimalKind::Goat {
                    offers.push(Advertisement::new(
                        Action::flee(source.entity),
                        vec![(Need::JobFulfillment, deltas::FLEE_THREAT)],
                    ));
                } else if animal.kind == own_kind && animal.kind != AnimalKind::Bear {
                    // Everything but bears travels in packs.
                    offers.push(Advertisement::new(
                        Action::follow(source.entity),
                        vec![(Need::JobFulfillment, deltas::PACK_FOLLOW)],
                    ));
                }
            }
        }
        ObjectClass::Item => {
            let Some(item) = source.item else {
                return offers;
            };
            if observer.is_person() {
                if observer.carried(item.kind) <= CARRY_CAPACITY {
                    offers.push(Advertisement::new(
                        Action::pickup(source.entity),
                        vec![(Need::JobFulfillment, deltas::PICKUP)],
                    ));
                }
                if item.kind.is_food() {
                    offers.push(Advertisement::new(
                        Action::eat(),
                        vec![(Need::Hunger, 1.0 - observer.needs.hunger)],
                    ));
                }
            } else if item.kind == ItemKind::Meat
                && matches!(
                    observer.animal_kind,
                    Some(AnimalKind::Wolf) | Some(AnimalKind::Bear)
                )
            {
                offers.push(Advertisement::new(
                    Action::consume(source.entity),
                    vec![(Need::Hunger, deltas::CONSUME_FOOD)],
                ));
            }
        }
        ObjectClass::Plant => {
            if observer.is_person() && source.plant.map(|p| p.harvestable).unwrap_or(false) {
                offers.push(Advertisement::new(
                    Action::harvest(source.entity),
                    vec![(Need::JobFulfillment, deltas::HARVEST_PLANT)],
                ));
            }
        }
        ObjectClass::Campfire | ObjectClass::Home | ObjectClass::Effect => {}
    }

    offers
}

/// Fight-or-flee response to a remembered attacker: flee unless the
/// observer can plausibly win the exchange.
fn attacker_response(
    observer: &Observer,
    attacker: &ObjectView,
    animals_always_fight: bool,
) -> Option<Advertisement> {
    let health = f64::from(observer.vitals.health);
    // Ticks-to-kill comparison: fewer of ours than theirs means winnable.
    let wins = health / attacker.strength > health / observer.stats.strength;
    let fight = animals_always_fight
        || (wins && (!observer.is_person() || observer.sex == Some(Sex::Male)));

    let action = if fight {
        Action::attack(attacker.entity, attacker.class).ok()?
    } else {
        Action::flee(attacker.entity)
    };
    Some(Advertisement::new(
        action,
        vec![(Need::JobFulfillment, deltas::ATTACKER_RESPONSE)],
    ))
}

/// Scales an advertisement's deltas when its kind matches an active task.
fn apply_task_multipliers(ads: &mut [Advertisement], tasks: &[Task]) {
    for ad in ads.iter_mut() {
        if let Some(task) = tasks.iter().find(|t| t.kind == ad.action.kind()) {
            for (_, delta) in ad.deltas.iter_mut() {
                *delta *= task.multiplier;
            }
        }
    }
}

/// Installs the chosen advertisement unless it repeats the current kind.
fn install_choice(
    ad: Advertisement,
    current: &mut CurrentAction,
    velocity: &mut Velocity,
    agent_id: &AgentId,
    clock: &WorldClock,
    events: &mut WorldEvents,
) {
    if current.kind() == Some(ad.action.kind()) {
        return;
    }
    // Leftover wander velocity would smear into the new behavior.
    if ad.action.kind() != ActionKind::Wander {
        *velocity = Velocity::zero();
    }
    let name = ad.action.name();
    if current.try_assign(ActiveAction::from_advertisement(ad), false) {
        events.push(
            clock,
            WorldEvent::ActionStarted {
                agent_id: agent_id.0.clone(),
                action: name.to_string(),
            },
        );
    }
}

/// The person decision pass.
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn decide_person_actions(
    timers: Res<DecisionTimers>,
    config: Res<SimConfig>,
    grid: Res<SpatialGrid>,
    perceived: Res<PerceivedWorld>,
    policy: Res<PersonPolicy>,
    store: Res<HomeStore>,
    home: Res<HomeBase>,
    clock: Res<WorldClock>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<WorldEvents>,
    mut query: Query<(
        Entity,
        &AgentId,
        &Position,
        &Needs,
        &Vitals,
        &Stats,
        &Maturity,
        &Person,
        &Inventory,
        &mut CurrentAction,
        &mut Velocity,
    )>,
) {
    if !timers.person_due() {
        return;
    }

    let stored_food = store.count(ItemKind::Apple);
    let person_count = perceived.person_count;
    // Food per head, in whole rations; the scarcity multiplier on other
    // people's offers.
    let mate_mod = if person_count == 0 {
        1.0
    } else {
        f64::from(stored_food / (2 * person_count))
    };

    for (entity, agent_id, position, needs, vitals, stats, maturity, person, inventory, mut current, mut velocity) in
        query.iter_mut()
    {
        if current.locked {
            continue;
        }

        let observer = Observer {
            needs,
            vitals,
            stats,
            adult: maturity.adult,
            sex: Some(person.sex),
            pregnant: person.is_pregnant(),
            animal_kind: None,
            inventory: Some(inventory),
        };

        let nearby: Vec<ObjectView> = grid
            .query_radius(position.x, position.y, stats.vision_range)
            .into_iter()
            .filter(|o| o.entity != entity)
            .filter_map(|o| perceived.get(o.entity).copied())
            .collect();

        let mut ads: Vec<Advertisement> = nearby
            .iter()
            .flat_map(|view| object_offers(view, &observer, mate_mod))
            .collect();

        // Population cap: over the limit, mating stops being on offer.
        if person_count >= config.decision.person_limit {
            ads.retain(|ad| ad.action.kind() != ActionKind::Mate);
        }

        // Built-in fallbacks.

        // Returning food to the house, worth half a ration per carried
        // apple.
        let deliver_worth = f64::from(inventory.count(ItemKind::Apple) / 2);
        ads.push(Advertisement::new(
            Action::deliver_food(),
            vec![(Need::JobFulfillment, deliver_worth)],
        ));
        ads.push(Advertisement::new(
            Action::wander(),
            vec![(Need::JobFulfillment, deltas::IDLE)],
        ));

        if (inventory.count(ItemKind::Apple) > 0 || stored_food > 0)
            && needs.hunger <= EAT_HUNGER_THRESHOLD
        {
            ads.push(Advertisement::new(
                Action::eat(),
                vec![(Need::Hunger, 1.0 - needs.hunger)],
            ));
        }

        let attacker_view = vitals
            .attacker
            .and_then(|attacker| perceived.get(attacker).copied());
        let attacker_in_sight = attacker_view
            .map(|view| {
                position.distance_sq(view.x, view.y) < stats.vision_range * stats.vision_range
            })
            .unwrap_or(false);

        if (needs.tiredness < SLEEP_TIREDNESS_THRESHOLD || vitals.health < SLEEP_HEALTH_THRESHOLD)
            && !attacker_in_sight
        {
            ads.push(Advertisement::new(
                Action::sleep(SLEEP_SECONDS, true),
                vec![
                    (Need::Tiredness, deltas::SLEEP_TIREDNESS),
                    (Need::Health, deltas::SLEEP_HEALTH),
                ],
            ));
        } else {
            ads.push(Advertisement::new(
                Action::sleep(NAP_SECONDS, false),
                vec![(Need::Tiredness, deltas::NAP_TIREDNESS)],
            ));
        }

        if home.overlaps(position.x, position.y, maturity.size()) {
            ads.push(Advertisement::new(
                Action::drop_items(),
                vec![(Need::JobFulfillment, deltas::DROP_FOOD)],
            ));
        }

        if let Some(attacker) = attacker_view {
            if nearby.iter().any(|view| view.entity == attacker.entity) {
                if let Some(response) = attacker_response(&observer, &attacker, false) {
                    ads.push(response);
                }
            }
        }

        apply_task_multipliers(&mut ads, &policy.tasks);

        let need_value = |need: Need| scoring_value(need, needs, vitals);
        match policy.scorer.choose(&mut rng.0, &need_value, ads) {
            Ok(choice) => install_choice(
                choice,
                &mut current,
                &mut velocity,
                agent_id,
                &clock,
                &mut events,
            ),
            // The wander fallback makes the set non-empty; nothing to do.
            Err(_) => {}
        }
    }
}

/// The animal decision pass.
#[allow(clippy::type_complexity)]
pub fn decide_animal_actions(
    timers: Res<DecisionTimers>,
    grid: Res<SpatialGrid>,
    perceived: Res<PerceivedWorld>,
    policy: Res<AnimalPolicy>,
    clock: Res<WorldClock>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<WorldEvents>,
    mut query: Query<(
        Entity,
        &AgentId,
        &Position,
        &Needs,
        &Vitals,
        &Stats,
        &Maturity,
        &Animal,
        &mut CurrentAction,
        &mut Velocity,
    )>,
) {
    if !timers.animal_due() {
        return;
    }

    for (entity, agent_id, position, needs, vitals, stats, maturity, animal, mut current, mut velocity) in
        query.iter_mut()
    {
        if current.locked {
            continue;
        }

        let observer = Observer {
            needs,
            vitals,
            stats,
            adult: maturity.adult,
            sex: None,
            pregnant: false,
            animal_kind: Some(animal.kind),
            inventory: None,
        };

        let nearby: Vec<ObjectView> = grid
            .query_radius(position.x, position.y, stats.vision_range)
            .into_iter()
            .filter(|o| o.entity != entity)
            .filter_map(|o| perceived.get(o.entity).copied())
            .collect();

        let mut ads: Vec<Advertisement> = nearby
            .iter()
            .flat_map(|view| object_offers(view, &observer, 0.0))
            .collect();

        ads.push(Advertisement::new(
            Action::wander(),
            vec![(Need::JobFulfillment, deltas::IDLE)],
        ));

        // Bears always answer an attack with violence; wolves fight when
        // they can win; everything else runs.
        if let Some(attacker) = vitals
            .attacker
            .and_then(|attacker| perceived.get(attacker).copied())
        {
            if nearby.iter().any(|view| view.entity == attacker.entity) {
                let always_fight = animal.kind == AnimalKind::Bear;
                let response = if always_fight || animal.kind == AnimalKind::Wolf {
                    attacker_response(&observer, &attacker, always_fight)
                } else {
                    Some(Advertisement::new(
                        Action::flee(attacker.entity),
                        vec![(Need::JobFulfillment, deltas::ATTACKER_RESPONSE)],
                    ))
                };
                if let Some(response) = response {
                    ads.push(response);
                }
            }
        }

        let need_value = |need: Need| scoring_value(need, needs, vitals);
        if let Ok(choice) = policy.scorer.choose(&mut rng.0, &need_value, ads) {
            install_choice(
                choice,
                &mut current,
                &mut velocity,
                agent_id,
                &clock,
                &mut events,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observer_person<'a>(
        needs: &'a Needs,
        vitals: &'a Vitals,
        stats: &'a Stats,
        inventory: &'a Inventory,
        sex: Sex,
    ) -> Observer<'a> {
        Observer {
            needs,
            vitals,
            stats,
            adult: true,
            sex: Some(sex),
            pregnant: false,
            animal_kind: None,
            inventory: Some(inventory),
        }
    }

    fn stats() -> Stats {
        Stats {
            strength: 0.5,
            vision_range: 100.0,
            attack_range: 50.0,
            base_damage: 20,
        }
    }

    fn animal_view(world: &mut World, kind: AnimalKind, strength: f64) -> ObjectView {
        ObjectView {
            entity: world.spawn_empty().id(),
            class: ObjectClass::Animal,
            x: 50.0,
            y: 50.0,
            health: 100,
            strength,
            person: None,
            animal: Some(crate::systems::perception::AnimalView { kind }),
            item: None,
            plant: None,
        }
    }

    #[test]
    fn test_male_flees_strong_bear() {
        let mut world = World::new();
        let needs = Needs::full();
        let vitals = Vitals::new();
        let stats = stats();
        let inventory = Inventory::new();
        let observer = observer_person(&needs, &vitals, &stats, &inventory, Sex::Male);

        let bear = animal_view(&mut world, AnimalKind::Bear, 0.9);
        let offers = object_offers(&bear, &observer, 0.0);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].action.kind(), ActionKind::Flee);
    }

    #[test]
    fn test_male_attacks_goat() {
        let mut world = World::new();
        let needs = Needs::full();
        let vitals = Vitals::new();
        let stats = stats();
        let inventory = Inventory::new();
        let observer = observer_person(&needs, &vitals, &stats, &inventory, Sex::Male);

        let goat = animal_view(&mut world, AnimalKind::Goat, 0.0);
        let offers = object_offers(&goat, &observer, 0.0);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].action.kind(), ActionKind::Attack);
    }

    #[test]
    fn test_female_ignores_goat_flees_wolf() {
        let mut world = World::new();
        let needs = Needs::full();
        let vitals = Vitals::new();
        let stats = stats();
        let inventory = Inventory::new();
        let observer = observer_person(&needs, &vitals, &stats, &inventory, Sex::Female);

        let goat = animal_view(&mut world, AnimalKind::Goat, 0.0);
        assert!(object_offers(&goat, &observer, 0.0).is_empty());

        let wolf = animal_view(&mut world, AnimalKind::Wolf, 0.75);
        let offers = object_offers(&wolf, &observer, 0.0);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].action.kind(), ActionKind::Flee);
    }

    #[test]
    fn test_goat_flees_wolf_and_follows_goat() {
        let mut world = World::new();
        let needs = Needs::midpoint();
        let vitals = Vitals::new();
        let stats = stats();
        let observer = Observer {
            needs: &needs,
            vitals: &vitals,
            stats: &stats,
            adult: true,
            sex: None,
            pregnant: false,
            animal_kind: Some(AnimalKind::Goat),
            inventory: None,
        };

        let wolf = animal_view(&mut world, AnimalKind::Wolf, 0.75);
        let offers = object_offers(&wolf, &observer, 0.0);
        assert_eq!(offers[0].action.kind(), ActionKind::Flee);

        let other_goat = animal_view(&mut world, AnimalKind::Goat, 0.0);
        let offers = object_offers(&other_goat, &observer, 0.0);
        assert_eq!(offers[0].action.kind(), ActionKind::Follow);
    }

    #[test]
    fn test_task_multiplier_scales_matching_kind() {
        let mut ads = vec![
            Advertisement::new(Action::wander(), vec![(Need::JobFulfillment, 0.002)]),
            Advertisement::new(Action::eat(), vec![(Need::Hunger, 0.4)]),
        ];
        apply_task_multipliers(
            &mut ads,
            &[Task {
                kind: ActionKind::Eat,
                multiplier: 5.0,
            }],
        );
        assert_eq!(ads[0].deltas[0].1, 0.002);
        assert_eq!(ads[1].deltas[0].1, 2.0);
    }

    #[test]
    fn test_mate_offer_requires_eligibility() {
        let mut world = World::new();
        let needs = Needs::full();
        let vitals = Vitals::new();
        let stats = stats();
        let inventory = Inventory::new();
        let observer = observer_person(&needs, &vitals, &stats, &inventory, Sex::Male);

        let eligible = ObjectView {
            entity: world.spawn_empty().id(),
            class: ObjectClass::Person,
            x: 10.0,
            y: 10.0,
            health: 100,
            strength: 0.5,
            person: Some(crate::systems::perception::PersonView {
                sex: Sex::Female,
                adult: true,
                pregnant: false,
            }),
            animal: None,
            item: None,
            plant: None,
        };
        let offers = object_offers(&eligible, &observer, 1.0);
        assert!(offers.iter().any(|ad| ad.action.kind() == ActionKind::Mate));

        let pregnant = ObjectView {
            person: Some(crate::systems::perception::PersonView {
                sex: Sex::Female,
                adult: true,
                pregnant: true,
            }),
            ..eligible
        };
        let offers = object_offers(&pregnant, &observer, 1.0);
        assert!(offers.iter().all(|ad| ad.action.kind() != ActionKind::Mate));
        // Company is still on offer.
        assert!(offers.iter().any(|ad| ad.action.kind() == ActionKind::Follow));
    }
}
