//! Needs System
//!
//! Decision-period bookkeeping on agent drives: decay for people,
//! proximity boosts from company and the campfire, starvation damage,
//! and the flat reset animals get.

use bevy_ecs::prelude::*;

use crate::actions::{ActionEffect, ActionEffects};
use crate::components::{Animal, Need, Needs, ObjectClass, Person, Position, Stats};
use crate::config::SimConfig;
use crate::spatial::SpatialGrid;

/// Throttle counters for the two decision passes. Offsetting the animal
/// pass spreads the cost of decision-making across ticks.
#[derive(Resource, Debug)]
pub struct DecisionTimers {
    person_counter: u32,
    animal_counter: u32,
    person_period: u32,
    animal_period: u32,
}

impl DecisionTimers {
    pub fn new(person_period: u32, animal_period: u32, animal_offset: u32) -> Self {
        Self {
            person_counter: 0,
            animal_counter: animal_offset % animal_period.max(1),
            person_period: person_period.max(1),
            animal_period: animal_period.max(1),
        }
    }

    /// People decide on this tick.
    pub fn person_due(&self) -> bool {
        self.person_counter == 0
    }

    /// Animals decide on this tick.
    pub fn animal_due(&self) -> bool {
        self.animal_counter == 0
    }

    /// Steps both counters; called once at the end of every tick.
    pub fn advance(&mut self) {
        self.person_counter = (self.person_counter + 1) % self.person_period;
        self.animal_counter = (self.animal_counter + 1) % self.animal_period;
    }
}

/// Decays people's needs once per decision period, applies proximity
/// boosts, and queues starvation damage at zero hunger.
pub fn decay_person_needs(
    timers: Res<DecisionTimers>,
    config: Res<SimConfig>,
    grid: Res<SpatialGrid>,
    mut effects: ResMut<ActionEffects>,
    mut query: Query<(Entity, &Position, &Stats, &mut Needs), With<Person>>,
) {
    if !timers.person_due() {
        return;
    }

    for (entity, position, stats, mut needs) in query.iter_mut() {
        if needs.hunger <= 0.0 {
            // Starvation chips one health per period until the agent eats.
            effects.queue.push(ActionEffect::Damage {
                target: entity,
                amount: 1,
                attacker: None,
            });
        }

        let decay = &config.decay;
        needs.decay(Need::Hunger, decay.hunger);
        needs.decay(Need::Social, decay.social);
        needs.decay(Need::Lust, decay.lust);
        needs.decay(Need::Tiredness, decay.tiredness);
        needs.decay(Need::Boredom, decay.boredom);
        needs.decay(Need::JobFulfillment, decay.job_fulfillment);
        needs.decay(Need::Warmth, decay.warmth);

        let nearby = grid.query_radius(position.x, position.y, stats.vision_range);
        if nearby
            .iter()
            .any(|o| o.entity != entity && o.class == ObjectClass::Person)
        {
            needs.apply_delta(Need::Social, decay.company_social);
        }
        if nearby.iter().any(|o| o.class == ObjectClass::Campfire) {
            needs.apply_delta(Need::Warmth, decay.campfire_warmth);
        }
    }
}

/// Animals do not track drives over time; their needs snap back to the
/// midpoint every decision period so choices stay driven by what the
/// world offers.
pub fn reset_animal_needs(
    timers: Res<DecisionTimers>,
    mut query: Query<&mut Needs, With<Animal>>,
) {
    if !timers.animal_due() {
        return;
    }
    for mut needs in query.iter_mut() {
        *needs = Needs::midpoint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_periods_and_offset() {
        let mut timers = DecisionTimers::new(8, 8, 4);
        let mut person_ticks = Vec::new();
        let mut animal_ticks = Vec::new();
        for tick in 0..16 {
            if timers.person_due() {
                person_ticks.push(tick);
            }
            if timers.animal_due() {
                animal_ticks.push(tick);
            }
            timers.advance();
        }
        assert_eq!(person_ticks, vec![0, 8]);
        // The offset start lands the animal pass midway between person
        // passes.
        assert_eq!(animal_ticks, vec![4, 12]);
    }

    #[test]
    fn test_timers_degenerate_period() {
        let mut timers = DecisionTimers::new(0, 1, 0);
        assert!(timers.person_due());
        timers.advance();
        assert!(timers.person_due());
    }
}
