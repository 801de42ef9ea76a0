//! Simulation Driver
//!
//! Owns the ECS world and the per-tick schedule. The host loop calls
//! [`Simulation::step`] once per tick, feeds directives in between, and
//! drains events and snapshots out.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::Schedule;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use sim_events::{
    AgentSnapshot, EventEnvelope, ItemSnapshot, PlantSnapshot, SimTime, WorldSnapshot,
};

use crate::actions::{ActionEffects, CurrentAction};
use crate::components::{
    AgentId, Animal, GroundItem, HomeBase, HomeStore, Maturity, Needs, Person, Plant, Position,
    Velocity, Vitals, WorldBounds, WorldClock,
};
use crate::config::SimConfig;
use crate::scheduler::{drain_scheduler, EventScheduler};
use crate::spatial::{rebuild_spatial_index, GridError, SpatialGrid};
use crate::systems::{
    advance_clock, apply_action_effects, apply_directives, build_perception,
    decay_person_needs, decide_animal_actions, decide_person_actions, execute_actions,
    reap_and_spawn, reset_animal_needs, AnimalPolicy, DecisionTimers, Directive, DirectiveQueue,
    PersonPolicy, PerceivedWorld, SpawnCounters,
};
use crate::{setup, IdAllocator, SimRng, WorldEvents};

/// A running simulation: world state plus the tick schedule.
pub struct Simulation {
    pub world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Builds a fresh world from configuration and seeds its population.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self, GridError> {
        let mut world = World::new();

        let grid = SpatialGrid::new(config.world.cell_size)?;
        let bounds = WorldBounds::new(
            config.world.width,
            config.world.height,
            config.world.boundary_buffer,
        );
        let home = HomeBase::new(
            config.world.width / 2.0,
            config.world.height / 2.0,
            config.world.home_size,
        );
        let timers = DecisionTimers::new(
            config.decision.person_period,
            config.decision.animal_period,
            config.decision.animal_offset,
        );

        world.insert_resource(SimRng(SmallRng::seed_from_u64(seed)));
        world.insert_resource(WorldClock::new(config.world.seconds_per_tick));
        world.insert_resource(bounds);
        world.insert_resource(home);
        world.insert_resource(grid);
        world.insert_resource(timers);
        world.insert_resource(EventScheduler::new());
        world.insert_resource(ActionEffects::new());
        world.insert_resource(WorldEvents::new());
        world.insert_resource(PerceivedWorld::new());
        world.insert_resource(HomeStore::new());
        world.insert_resource(PersonPolicy::new());
        world.insert_resource(AnimalPolicy::default());
        world.insert_resource(DirectiveQueue::default());
        world.insert_resource(IdAllocator::default());
        world.insert_resource(SpawnCounters::default());
        world.insert_resource(config);

        setup::populate(&mut world);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                apply_directives,
                rebuild_spatial_index,
                build_perception,
                decay_person_needs,
                reset_animal_needs,
                decide_person_actions,
                decide_animal_actions,
                execute_actions,
                apply_action_effects,
                drain_scheduler,
                reap_and_spawn,
                advance_clock,
            )
                .chain(),
        );

        Ok(Self { world, schedule })
    }

    /// Advances the simulation one tick.
    pub fn step(&mut self) {
        self.schedule.run(&mut self.world);
    }

    /// Advances the simulation by `ticks`.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Queues a host directive for the next tick.
    pub fn submit(&mut self, directive: Directive) {
        self.world
            .resource_mut::<DirectiveQueue>()
            .push(directive);
    }

    /// Takes every event raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        self.world.resource_mut::<WorldEvents>().drain()
    }

    /// Current tick counter.
    pub fn tick(&self) -> u64 {
        self.world.resource::<WorldClock>().tick
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.world.resource::<WorldClock>().now
    }

    /// Serializable view of the world for hosts.
    pub fn snapshot(&mut self) -> WorldSnapshot {
        let clock = *self.world.resource::<WorldClock>();

        let mut agents = Vec::new();
        let mut agent_query = self.world.query::<(
            &AgentId,
            &Position,
            &Velocity,
            &Vitals,
            &Maturity,
            &Needs,
            &CurrentAction,
            Option<&Person>,
            Option<&Animal>,
        )>();
        for (id, position, velocity, vitals, maturity, needs, current, person, animal) in
            agent_query.iter(&self.world)
        {
            let species = match (person, animal) {
                (Some(_), _) => "person".to_string(),
                (_, Some(animal)) => animal.kind.as_str().to_string(),
                _ => "unknown".to_string(),
            };
            agents.push(AgentSnapshot {
                agent_id: id.0.clone(),
                species,
                x: position.x,
                y: position.y,
                vx: velocity.x,
                vy: velocity.y,
                health: vitals.health,
                adult: maturity.adult,
                needs: needs.snapshot(),
                action: current.action_name().map(str::to_string),
            });
        }

        let mut items = Vec::new();
        let mut item_query = self.world.query::<(&GroundItem, &Position)>();
        for (item, position) in item_query.iter(&self.world) {
            items.push(ItemSnapshot {
                kind: item.kind.as_str().to_string(),
                amount: item.amount,
                x: position.x,
                y: position.y,
            });
        }

        let mut plants = Vec::new();
        let mut plant_query = self.world.query::<(&Plant, &Position)>();
        for (plant, position) in plant_query.iter(&self.world) {
            plants.push(PlantSnapshot {
                kind: plant.kind.as_str().to_string(),
                stage: plant.stage.as_str().to_string(),
                x: position.x,
                y: position.y,
            });
        }

        WorldSnapshot {
            tick: clock.tick,
            time: clock.now,
            agents,
            items,
            plants,
        }
    }
}
