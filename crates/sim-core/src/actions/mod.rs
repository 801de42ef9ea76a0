//! Action State Machine
//!
//! The vocabulary of executable behaviors and the lifecycle rules around
//! them. Actions come in four archetypes distinguished by the per-tick
//! context they need: instantaneous (just the acting agent), timed
//! (capture a wait-until stamp and hold the agent), search-augmented
//! (a fresh spatial query every tick), and search-and-timed (both).
//!
//! Per agent the state machine is NoAction -> Assigned -> Running ->
//! Ended. Assignment is rejected when the candidate has the same kind as
//! the running action (no thrashing) or the agent is action-locked.
//! "Locked" guards against replacement by the decision loop;
//! "interruptible" governs whether damage may force an early end. The two
//! flags are independent.
//!
//! Actions never mutate other entities directly: anything that crosses an
//! entity boundary is emitted as an [`ActionEffect`] and applied by the
//! effects system afterwards.

pub mod interact;
pub mod movement;
pub mod timed;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use thiserror::Error;

use sim_events::SimTime;

use crate::components::{
    AnimalKind, EffectKind, HomeBase, Inventory, ItemKind, Maturity, Mobility, Need, Needs,
    ObjectClass, Position, Sex, Stats, Velocity, Vitals, WorldBounds,
};
use crate::spatial::SpatialGrid;

pub use interact::{
    AttackAction, AttackSweepAction, ConsumeAction, DeliverFoodAction, DropAction, EatAction,
    GuardAction, HarvestAction, MatureAction, PickupAction,
};
pub use movement::{FleeAction, FollowAction, GotoAction, WanderAction};
pub use timed::{BirthAction, CourtshipAction, MateAction, SleepAction, WaitAction, WaitTimer};

/// Run status of an action once it has been assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Running,
    Succeeded,
    Failed,
}

/// The four action shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Instant,
    Timed,
    Search,
    SearchTimed,
}

/// Discriminant used for same-kind rejection and task multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Goto,
    Wander,
    Flee,
    Follow,
    Pickup,
    Consume,
    Harvest,
    Attack,
    Eat,
    DeliverFood,
    DropItems,
    Guard,
    Mature,
    Wait,
    Sleep,
    Mate,
    Birth,
    AttackSweep,
    Courtship,
}

/// Errors from action construction.
#[derive(Debug, Error)]
pub enum ActionError {
    /// An attack was pointed at something that cannot take damage.
    #[error("attack target {class:?} is not damageable")]
    TargetNotMortal { class: ObjectClass },
}

/// Outcome of one tick of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRun {
    Continue,
    Succeed,
    Fail,
}

/// One executable behavior. A closed set of tagged variants; each carries
/// only the state its archetype needs.
#[derive(Debug, Clone)]
pub enum Action {
    Goto(GotoAction),
    Wander(WanderAction),
    Flee(FleeAction),
    Follow(FollowAction),
    Pickup(PickupAction),
    Consume(ConsumeAction),
    Harvest(HarvestAction),
    Attack(AttackAction),
    Eat(EatAction),
    DeliverFood(DeliverFoodAction),
    DropItems(DropAction),
    Guard(GuardAction),
    Mature(MatureAction),
    Wait(WaitAction),
    Sleep(SleepAction),
    Mate(MateAction),
    Birth(BirthAction),
    AttackSweep(AttackSweepAction),
    Courtship(CourtshipAction),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Goto(_) => ActionKind::Goto,
            Action::Wander(_) => ActionKind::Wander,
            Action::Flee(_) => ActionKind::Flee,
            Action::Follow(_) => ActionKind::Follow,
            Action::Pickup(_) => ActionKind::Pickup,
            Action::Consume(_) => ActionKind::Consume,
            Action::Harvest(_) => ActionKind::Harvest,
            Action::Attack(_) => ActionKind::Attack,
            Action::Eat(_) => ActionKind::Eat,
            Action::DeliverFood(_) => ActionKind::DeliverFood,
            Action::DropItems(_) => ActionKind::DropItems,
            Action::Guard(_) => ActionKind::Guard,
            Action::Mature(_) => ActionKind::Mature,
            Action::Wait(_) => ActionKind::Wait,
            Action::Sleep(_) => ActionKind::Sleep,
            Action::Mate(_) => ActionKind::Mate,
            Action::Birth(_) => ActionKind::Birth,
            Action::AttackSweep(_) => ActionKind::AttackSweep,
            Action::Courtship(_) => ActionKind::Courtship,
        }
    }

    pub fn archetype(&self) -> Archetype {
        match self {
            Action::Goto(_)
            | Action::Wander(_)
            | Action::Flee(_)
            | Action::Follow(_)
            | Action::Pickup(_)
            | Action::Consume(_)
            | Action::Harvest(_)
            | Action::Attack(_)
            | Action::Eat(_)
            | Action::DeliverFood(_)
            | Action::DropItems(_)
            | Action::Guard(_)
            | Action::Mature(_) => Archetype::Instant,
            Action::Wait(_) | Action::Sleep(_) | Action::Mate(_) | Action::Birth(_) => {
                Archetype::Timed
            }
            Action::AttackSweep(_) => Archetype::Search,
            Action::Courtship(_) => Archetype::SearchTimed,
        }
    }

    /// Whether a damage event may force this action to end.
    pub fn interruptible(&self) -> bool {
        match self {
            Action::Goto(_) | Action::Mature(_) | Action::Birth(_) | Action::Courtship(_) => false,
            Action::Wait(wait) => wait.interruptible,
            _ => true,
        }
    }

    /// Display name for hosts and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Goto(_) => "goto",
            Action::Wander(_) => "wander",
            Action::Flee(_) => "flee",
            Action::Follow(_) => "follow",
            Action::Pickup(_) => "pickup",
            Action::Consume(_) => "consume",
            Action::Harvest(_) => "harvest",
            Action::Attack(_) => "attack",
            Action::Eat(_) => "eat",
            Action::DeliverFood(_) => "deliver_food",
            Action::DropItems(_) => "drop_items",
            Action::Guard(_) => "guard",
            Action::Mature(_) => "mature",
            Action::Wait(_) => "wait",
            Action::Sleep(sleep) => {
                if sleep.full_sleep {
                    "sleep"
                } else {
                    "nap"
                }
            }
            Action::Mate(_) => "mate",
            Action::Birth(_) => "birth",
            Action::AttackSweep(_) => "attack_sweep",
            Action::Courtship(_) => "courtship",
        }
    }

    // Convenience constructors for the common shapes.

    pub fn goto(x: f64, y: f64, reach: f64) -> Self {
        Action::Goto(GotoAction::new(x, y, reach))
    }

    pub fn wander() -> Self {
        Action::Wander(WanderAction::new())
    }

    pub fn flee(from: Entity) -> Self {
        Action::Flee(FleeAction::new(from))
    }

    pub fn follow(target: Entity) -> Self {
        Action::Follow(FollowAction::new(target))
    }

    pub fn pickup(item: Entity) -> Self {
        Action::Pickup(PickupAction::new(item))
    }

    pub fn consume(item: Entity) -> Self {
        Action::Consume(ConsumeAction::new(item))
    }

    pub fn harvest(plant: Entity) -> Self {
        Action::Harvest(HarvestAction::new(plant))
    }

    /// Attacks are validated at construction: the target must be able to
    /// take damage.
    pub fn attack(target: Entity, class: ObjectClass) -> Result<Self, ActionError> {
        AttackAction::new(target, class).map(Action::Attack)
    }

    pub fn eat() -> Self {
        Action::Eat(EatAction::new())
    }

    pub fn deliver_food() -> Self {
        Action::DeliverFood(DeliverFoodAction::new())
    }

    pub fn drop_items() -> Self {
        Action::DropItems(DropAction)
    }

    pub fn guard(x: f64, y: f64, distance: f64) -> Self {
        Action::Guard(GuardAction::new(x, y, distance))
    }

    pub fn mature() -> Self {
        Action::Mature(MatureAction)
    }

    pub fn wait(seconds: u64, interruptible: bool) -> Self {
        Action::Wait(WaitAction::new(seconds, interruptible))
    }

    pub fn sleep(seconds: u64, full_sleep: bool) -> Self {
        Action::Sleep(SleepAction::new(seconds, full_sleep))
    }

    pub fn mate(partner: Entity) -> Self {
        Action::Mate(MateAction::new(partner))
    }

    pub fn birth() -> Self {
        Action::Birth(BirthAction::new())
    }

    pub fn attack_sweep() -> Self {
        Action::AttackSweep(AttackSweepAction)
    }

    pub fn courtship() -> Self {
        Action::Courtship(CourtshipAction::new())
    }
}

/// An offered action plus the need deltas it promises if chosen.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub action: Action,
    pub deltas: Vec<(Need, f64)>,
}

impl Advertisement {
    pub fn new(action: Action, deltas: Vec<(Need, f64)>) -> Self {
        Self { action, deltas }
    }
}

/// A committed action: the behavior, the reward it promised, and its
/// lifecycle flags. Discarded once ended, never reused.
#[derive(Debug, Clone)]
pub struct ActiveAction {
    pub action: Action,
    pub deltas: Vec<(Need, f64)>,
    pub active: bool,
    pub state: ActionState,
}

impl ActiveAction {
    pub fn new(action: Action, deltas: Vec<(Need, f64)>) -> Self {
        Self {
            action,
            deltas,
            active: true,
            state: ActionState::Running,
        }
    }

    pub fn from_advertisement(ad: Advertisement) -> Self {
        Self::new(ad.action, ad.deltas)
    }

    pub fn is_interruptible(&self) -> bool {
        self.action.interruptible()
    }

    /// Ends the action without recording success or failure; pre-emption
    /// and external termination come through here.
    pub fn end(&mut self) {
        self.active = false;
    }

    /// Advances the action one tick, dispatching on its archetype.
    pub fn advance(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) {
        if !self.active {
            return;
        }

        let deltas = std::mem::take(&mut self.deltas);
        let run = match &mut self.action {
            // Instantaneous: advance given the acting agent alone.
            Action::Goto(a) => a.tick(body, ctx.bounds),
            Action::Wander(a) => a.tick(body, ctx),
            Action::Flee(a) => a.tick(body, ctx, &deltas),
            Action::Follow(a) => a.tick(body, ctx, &deltas),
            Action::Pickup(a) => a.tick(body, ctx, &deltas),
            Action::Consume(a) => a.tick(body, ctx),
            Action::Harvest(a) => a.tick(body, ctx),
            Action::Attack(a) => a.tick(body, ctx, &deltas),
            Action::Eat(a) => a.tick(body, ctx),
            Action::DeliverFood(a) => a.tick(body, ctx, &deltas),
            Action::DropItems(a) => a.tick(body, ctx),
            Action::Guard(a) => a.tick(body, ctx, &deltas),
            Action::Mature(a) => a.tick(body),
            // Timed: capture a wait-until stamp from the clock.
            Action::Wait(a) => a.tick(body, ctx),
            Action::Sleep(a) => a.tick(body, ctx, &deltas),
            Action::Mate(a) => a.tick(body, ctx, &deltas),
            Action::Birth(a) => a.tick(body, ctx, &deltas),
            // Search: a fresh spatial query each tick.
            Action::AttackSweep(a) => a.tick(body, ctx),
            // Search + timed.
            Action::Courtship(a) => a.tick(body, ctx),
        };
        self.deltas = deltas;

        match run {
            ActionRun::Continue => {}
            ActionRun::Succeed => {
                self.state = ActionState::Succeeded;
                self.active = false;
            }
            ActionRun::Fail => {
                self.state = ActionState::Failed;
                self.active = false;
            }
        }
    }
}

/// The per-agent current-action slot with its lock flag.
#[derive(Component, Debug, Default)]
pub struct CurrentAction {
    pub slot: Option<ActiveAction>,
    pub locked: bool,
}

impl CurrentAction {
    pub fn none() -> Self {
        Self::default()
    }

    /// Assignment from the decision loop. Rejected while locked, and
    /// rejected when the candidate is the same kind as the running action
    /// so an equivalent choice cannot thrash the slot every cycle.
    pub fn try_assign(&mut self, next: ActiveAction, lock: bool) -> bool {
        if self.locked {
            return false;
        }
        self.assign_unless_same_kind(next, lock)
    }

    /// Assignment from the scheduler or another agent's action. Ignores
    /// the lock (a scheduled birth must start even mid-sleep) but still
    /// refuses same-kind replacement.
    pub fn assign_scheduled(&mut self, next: ActiveAction, lock: bool) -> bool {
        self.assign_unless_same_kind(next, lock)
    }

    fn assign_unless_same_kind(&mut self, next: ActiveAction, lock: bool) -> bool {
        if let Some(current) = &self.slot {
            if current.action.kind() == next.action.kind() {
                return false;
            }
        }
        self.slot = Some(next);
        self.locked = lock;
        true
    }

    /// Damage pre-emption: an interruptible running action ends at once
    /// and the agent unlocks. Non-interruptible actions shrug it off.
    pub fn interrupt_for_damage(&mut self) -> bool {
        if let Some(current) = &mut self.slot {
            if current.active && current.is_interruptible() {
                self.locked = false;
                current.end();
                return true;
            }
        }
        false
    }

    pub fn action_name(&self) -> Option<&'static str> {
        self.slot.as_ref().map(|a| a.action.name())
    }

    pub fn kind(&self) -> Option<ActionKind> {
        self.slot.as_ref().map(|a| a.action.kind())
    }

    pub fn is_running(&self, kind: ActionKind) -> bool {
        self.slot
            .as_ref()
            .map(|a| a.active && a.action.kind() == kind)
            .unwrap_or(false)
    }
}

/// Species facts an action may branch on, copied out of the components.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesInfo {
    pub is_person: bool,
    pub sex: Option<Sex>,
    pub pregnant: bool,
    pub animal_kind: Option<AnimalKind>,
}

/// Mutable view of the acting agent, assembled by the execution system
/// for the duration of one action tick.
pub struct AgentBody<'a> {
    pub entity: Entity,
    pub pos: &'a mut Position,
    pub vel: &'a mut Velocity,
    pub mobility: &'a mut Mobility,
    pub needs: &'a mut Needs,
    pub vitals: &'a mut Vitals,
    pub stats: &'a Stats,
    pub maturity: &'a mut Maturity,
    pub inventory: &'a mut Inventory,
    pub locked: &'a mut bool,
    pub species: SpeciesInfo,
}

impl AgentBody<'_> {
    pub fn size(&self) -> f64 {
        self.maturity.size()
    }

    pub fn stop(&mut self) {
        *self.vel = Velocity::zero();
    }

    /// Prevents movement and replacement while a timed action waits.
    pub fn hold(&mut self) {
        *self.locked = true;
        self.mobility.can_move = false;
    }

    /// Allows the agent to move again when a timed action finishes.
    pub fn release(&mut self) {
        self.mobility.can_move = true;
    }

    /// Applies this agent's own velocity, projecting the next position
    /// against the world boundary. A blocked axis zeroes that velocity
    /// component and records the collision direction. Returns false when
    /// no movement happened.
    pub fn move_step(&mut self, bounds: &WorldBounds) -> bool {
        if !self.mobility.can_move {
            return false;
        }

        let next_x = self.pos.x + self.vel.x;
        let next_y = self.pos.y + self.vel.y;
        let mut clear = true;

        if next_x < bounds.buffer {
            self.vel.x = 0.0;
            self.mobility.collision = crate::components::Direction::Left;
            clear = false;
        } else if next_x > bounds.width - bounds.buffer {
            self.vel.x = 0.0;
            self.mobility.collision = crate::components::Direction::Right;
            clear = false;
        }

        if next_y < bounds.buffer {
            self.vel.y = 0.0;
            self.mobility.collision = crate::components::Direction::Up;
            clear = false;
        } else if next_y > bounds.height - bounds.buffer {
            self.vel.y = 0.0;
            self.mobility.collision = crate::components::Direction::Down;
            clear = false;
        }

        if clear {
            self.pos.x = next_x;
            self.pos.y = next_y;
            self.mobility.collision = crate::components::Direction::None;
        }
        clear
    }

    /// Points the agent at `(x, y)` and takes one movement step. Returns
    /// false when already within `reach` or when movement is blocked.
    pub fn goto_point(&mut self, x: f64, y: f64, reach: f64, bounds: &WorldBounds) -> bool {
        if crate::components::aabb_overlap(self.pos.x, self.pos.y, self.size(), x, y, reach) {
            return false;
        }
        let angle = (y - self.pos.y).atan2(x - self.pos.x);
        self.vel.x = self.mobility.speed * angle.cos();
        self.vel.y = self.mobility.speed * angle.sin();
        self.move_step(bounds)
    }

    /// A full night's sleep restores tiredness and health outright.
    pub fn apply_sleep(&mut self) {
        self.needs.tiredness = 1.0;
        self.vitals.health = 100;
    }
}

/// Read-only world context plus the outbound effect queue for one action
/// tick.
pub struct ActionCtx<'a> {
    pub now: SimTime,
    pub grid: &'a SpatialGrid,
    pub bounds: &'a WorldBounds,
    pub home: &'a HomeBase,
    pub rng: &'a mut SmallRng,
    pub effects: &'a mut Vec<ActionEffect>,
}

/// Cross-entity consequences of running actions, applied by the effects
/// system after every agent has advanced.
#[derive(Debug, Clone)]
pub enum ActionEffect {
    /// Deal damage to a target, remembering the attacker.
    Damage {
        target: Entity,
        amount: i32,
        attacker: Option<Entity>,
    },
    /// A person picks a ground item up into their inventory.
    PickupItem { item: Entity, by: Entity },
    /// An animal devours a ground item entirely.
    ConsumeItem { item: Entity },
    /// Shake a plant for its yield.
    HarvestPlant { plant: Entity },
    /// Ask the home store for one item of a kind.
    RequestItem { kind: ItemKind, by: Entity },
    /// Drop everything carried, into the store when at home.
    DropItems { by: Entity, at_home: bool },
    /// Hold a mating partner in a locked wait.
    HoldPartner { partner: Entity, wait_seconds: u64 },
    /// Attempt conception between two agents; eligibility is validated
    /// where the data lives.
    Conceive { a: Entity, b: Entity },
    /// Labor finished; spawn the child.
    BirthCompleted { mother: Entity },
    /// Grant advertised deltas to another beneficiary.
    ApplyDeltas {
        target: Entity,
        deltas: Vec<(Need, f64)>,
    },
    /// Raise a visual marker.
    SpawnEffect {
        kind: EffectKind,
        x: f64,
        y: f64,
        owner: Option<Entity>,
    },
    /// Dispatch a follow-up action once the current one ends.
    InstallNext { target: Entity, action: Action },
}

/// Per-tick queue of action effects.
#[derive(Resource, Debug, Default)]
pub struct ActionEffects {
    pub queue: Vec<ActionEffect>,
}

impl ActionEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<ActionEffect> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wander_active() -> ActiveAction {
        ActiveAction::new(Action::wander(), vec![(Need::JobFulfillment, 0.002)])
    }

    #[test]
    fn test_same_kind_assignment_rejected() {
        let mut current = CurrentAction::none();
        assert!(current.try_assign(wander_active(), false));
        assert!(!current.try_assign(wander_active(), false));
        // A different kind replaces it.
        assert!(current.try_assign(ActiveAction::new(Action::eat(), vec![]), false));
        assert_eq!(current.kind(), Some(ActionKind::Eat));
    }

    #[test]
    fn test_locked_agent_rejects_decided_action() {
        let mut current = CurrentAction::none();
        assert!(current.try_assign(wander_active(), true));
        assert!(current.locked);
        // Locked: a decided action of a different kind still bounces.
        assert!(!current.try_assign(ActiveAction::new(Action::eat(), vec![]), false));
        assert_eq!(current.kind(), Some(ActionKind::Wander));

        // Explicit unlock (the current action ending) opens the slot.
        current.locked = false;
        current.slot = None;
        assert!(current.try_assign(ActiveAction::new(Action::eat(), vec![]), false));
    }

    #[test]
    fn test_scheduled_assignment_ignores_lock() {
        let mut current = CurrentAction::none();
        current.try_assign(wander_active(), true);
        assert!(current.assign_scheduled(ActiveAction::new(Action::birth(), vec![]), true));
        assert_eq!(current.kind(), Some(ActionKind::Birth));
        assert!(current.locked);
    }

    #[test]
    fn test_damage_interrupts_interruptible_only() {
        let mut current = CurrentAction::none();
        current.try_assign(wander_active(), true);
        assert!(current.interrupt_for_damage());
        assert!(!current.locked);
        assert!(!current.slot.as_ref().unwrap().active);

        let mut current = CurrentAction::none();
        current.assign_scheduled(ActiveAction::new(Action::birth(), vec![]), true);
        assert!(!current.interrupt_for_damage());
        assert!(current.locked);
        assert!(current.slot.as_ref().unwrap().active);
    }

    #[test]
    fn test_wait_interruptible_flag_configurable() {
        assert!(Action::wait(5, true).interruptible());
        assert!(!Action::wait(5, false).interruptible());
    }

    #[test]
    fn test_attack_rejects_non_mortal_target() {
        let mut world = World::new();
        let plant = world.spawn_empty().id();
        let result = Action::attack(plant, ObjectClass::Plant);
        assert!(matches!(
            result,
            Err(ActionError::TargetNotMortal {
                class: ObjectClass::Plant
            })
        ));
        assert!(Action::attack(plant, ObjectClass::Animal).is_ok());
    }

    #[test]
    fn test_archetype_mapping() {
        assert_eq!(Action::wander().archetype(), Archetype::Instant);
        assert_eq!(Action::sleep(10, true).archetype(), Archetype::Timed);
        assert_eq!(Action::attack_sweep().archetype(), Archetype::Search);
        assert_eq!(Action::courtship().archetype(), Archetype::SearchTimed);
    }

    #[test]
    fn test_sleep_and_nap_names() {
        assert_eq!(Action::sleep(10, true).name(), "sleep");
        assert_eq!(Action::sleep(4, false).name(), "nap");
    }

    #[test]
    fn test_ended_action_reports_state() {
        let mut active = wander_active();
        assert_eq!(active.state, ActionState::Running);
        active.end();
        assert!(!active.active);
        // External termination leaves the tri-state at Running; only the
        // action itself records success or failure.
        assert_eq!(active.state, ActionState::Running);
    }
}
