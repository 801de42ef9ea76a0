//! Timed Actions
//!
//! Behaviors built around a wait window: on first activation they capture
//! a wait-until timestamp and hold the agent in place (can-move off,
//! action-locked) until the world clock passes it. No blocking anywhere;
//! the held state is simply re-checked on every tick.

use bevy_ecs::prelude::*;

use sim_events::SimTime;

use crate::components::{EffectKind, Need, ObjectClass};

use super::{Action, ActionCtx, ActionRun, AgentBody};

/// How close mates must stand.
pub const MATE_RANGE: f64 = 10.0;
/// Seconds a mating pair holds still.
pub const MATE_TIME: u64 = 2;
/// Seconds from conception to labor.
pub const GESTATION_SECONDS: u64 = 25;
/// Seconds of labor before the child appears.
pub const LABOR_SECONDS: u64 = 8;
/// A full night's sleep.
pub const SLEEP_SECONDS: u64 = 10;
/// A nap.
pub const NAP_SECONDS: u64 = 4;
/// Seconds from spawn to adulthood.
pub const MATURE_SECONDS: u64 = 5;

/// The shared wait-until mechanism. Created idle; `start` stamps the stop
/// time from the current clock. Once stamped the stop time never moves.
#[derive(Debug, Clone, Default)]
pub struct WaitTimer {
    wait_seconds: u64,
    stop_at: Option<SimTime>,
}

impl WaitTimer {
    pub fn new(wait_seconds: u64) -> Self {
        Self {
            wait_seconds,
            stop_at: None,
        }
    }

    pub fn started(&self) -> bool {
        self.stop_at.is_some()
    }

    /// Captures the wait-until stamp.
    pub fn start(&mut self, now: SimTime) {
        self.stop_at = Some(now.plus_seconds(self.wait_seconds));
    }

    /// Whether the clock has reached the stamp. Never true before
    /// `start`.
    pub fn is_due(&self, now: SimTime) -> bool {
        self.stop_at.map(|stop| now >= stop).unwrap_or(false)
    }
}

/// Stand still for a fixed window, optionally dispatching a follow-up
/// action on release.
#[derive(Debug, Clone)]
pub struct WaitAction {
    timer: WaitTimer,
    pub interruptible: bool,
    follow_up: Option<Box<Action>>,
}

impl WaitAction {
    pub fn new(seconds: u64, interruptible: bool) -> Self {
        Self {
            timer: WaitTimer::new(seconds),
            interruptible,
            follow_up: None,
        }
    }

    pub fn with_follow_up(seconds: u64, interruptible: bool, follow_up: Action) -> Self {
        Self {
            timer: WaitTimer::new(seconds),
            interruptible,
            follow_up: Some(Box::new(follow_up)),
        }
    }

    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        if !self.timer.started() {
            self.timer.start(ctx.now);
            body.hold();
            return ActionRun::Continue;
        }
        if self.timer.is_due(ctx.now) {
            if let Some(action) = self.follow_up.take() {
                ctx.effects.push(super::ActionEffect::InstallNext {
                    target: body.entity,
                    action: *action,
                });
            }
            body.release();
            return ActionRun::Succeed;
        }
        ActionRun::Continue
    }
}

/// Sleep in place. A full sleep restores tiredness and health outright on
/// completion; a nap trickles its advertised deltas in every held tick.
#[derive(Debug, Clone)]
pub struct SleepAction {
    timer: WaitTimer,
    pub full_sleep: bool,
    effect_raised: bool,
}

impl SleepAction {
    pub fn new(seconds: u64, full_sleep: bool) -> Self {
        Self {
            timer: WaitTimer::new(seconds),
            full_sleep,
            effect_raised: false,
        }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        if !self.effect_raised {
            ctx.effects.push(super::ActionEffect::SpawnEffect {
                kind: EffectKind::Sleep,
                x: body.pos.x,
                y: body.pos.y,
                owner: Some(body.entity),
            });
            self.effect_raised = true;
        }

        if !self.timer.started() {
            self.timer.start(ctx.now);
            body.hold();
            return ActionRun::Continue;
        }

        if self.timer.is_due(ctx.now) {
            body.release();
            if self.full_sleep {
                // Only a completed full sleep earns the total restore.
                body.apply_sleep();
            }
            return ActionRun::Succeed;
        }

        if !self.full_sleep {
            body.needs.apply_deltas(deltas);
        }
        ActionRun::Continue
    }
}

/// Approach a chosen partner, hold them in a shared wait, and conceive
/// when the window closes. Both partners soak the advertised deltas every
/// running tick.
#[derive(Debug, Clone)]
pub struct MateAction {
    partner: Entity,
    started: bool,
    timer: WaitTimer,
}

impl MateAction {
    pub fn new(partner: Entity) -> Self {
        Self {
            partner,
            started: false,
            timer: WaitTimer::new(MATE_TIME),
        }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        if !self.started {
            // Partner left the world while we were en route.
            let Some(partner) = ctx.grid.position_of(self.partner).copied() else {
                return ActionRun::Succeed;
            };

            if body.pos.distance_sq(partner.x, partner.y) > MATE_RANGE * MATE_RANGE {
                body.goto_point(partner.x, partner.y, MATE_RANGE, ctx.bounds);
                return ActionRun::Continue;
            }

            ctx.effects.push(super::ActionEffect::HoldPartner {
                partner: self.partner,
                wait_seconds: MATE_TIME,
            });
            self.started = true;
        }

        if !self.timer.started() {
            self.timer.start(ctx.now);
            body.hold();
        }

        if self.timer.is_due(ctx.now) {
            ctx.effects.push(super::ActionEffect::Conceive {
                a: body.entity,
                b: self.partner,
            });
            body.release();
            return ActionRun::Succeed;
        }

        body.needs.apply_deltas(deltas);
        ctx.effects.push(super::ActionEffect::ApplyDeltas {
            target: self.partner,
            deltas: deltas.to_vec(),
        });
        ActionRun::Continue
    }
}

/// Labor: installed by the scheduler when gestation ends, holds the
/// mother through the labor window, then hands the spawn off to the
/// lifecycle system. Not interruptible.
#[derive(Debug, Clone)]
pub struct BirthAction {
    timer: WaitTimer,
}

impl BirthAction {
    pub fn new() -> Self {
        Self {
            timer: WaitTimer::new(LABOR_SECONDS),
        }
    }

    /// The reward birth grants its mother.
    pub fn builtin_deltas() -> Vec<(Need, f64)> {
        vec![(Need::JobFulfillment, 0.05)]
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        if !body.species.is_person {
            tracing::warn!(agent = ?body.entity, "birth scheduled against a non-person");
            return ActionRun::Fail;
        }

        if !self.timer.started() {
            self.timer.start(ctx.now);
            body.hold();
            return ActionRun::Continue;
        }

        if self.timer.is_due(ctx.now) {
            ctx.effects.push(super::ActionEffect::BirthCompleted {
                mother: body.entity,
            });
            body.needs.apply_deltas(deltas);
            body.release();
            return ActionRun::Succeed;
        }
        ActionRun::Continue
    }
}

impl Default for BirthAction {
    fn default() -> Self {
        Self::new()
    }
}

/// Directed courtship sweep: conceive with every eligible partner in
/// range, then hold still for the mating window. The search-and-timed
/// archetype; driven by host directives rather than the decision loop.
#[derive(Debug, Clone)]
pub struct CourtshipAction {
    timer: WaitTimer,
}

impl CourtshipAction {
    pub fn new() -> Self {
        Self {
            timer: WaitTimer::new(MATE_TIME),
        }
    }

    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        if self.timer.started() {
            if self.timer.is_due(ctx.now) {
                body.release();
                return ActionRun::Succeed;
            }
            return ActionRun::Continue;
        }

        if !body.species.is_person || body.species.pregnant {
            return ActionRun::Succeed;
        }

        // Fresh search each tick until a candidate turns up. Eligibility
        // (sex, maturity, pregnancy) is validated where the data lives.
        let candidates =
            ctx.grid
                .class_in_range(ObjectClass::Person, body.pos.x, body.pos.y, MATE_RANGE);
        let mut any = false;
        for candidate in candidates {
            if candidate.entity == body.entity {
                continue;
            }
            if body.pos.distance_sq(candidate.x, candidate.y) < MATE_RANGE * MATE_RANGE {
                ctx.effects.push(super::ActionEffect::Conceive {
                    a: body.entity,
                    b: candidate.entity,
                });
                any = true;
            }
        }

        if any {
            self.timer.start(ctx.now);
            body.mobility.can_move = false;
            ActionRun::Continue
        } else {
            ActionRun::Succeed
        }
    }
}

impl Default for CourtshipAction {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use crate::actions::{ActionEffect, ActionRun, SpeciesInfo};
    use crate::components::{
        HomeBase, Inventory, Maturity, Mobility, Needs, Position, Sex, Stats, Velocity, Vitals,
        WorldBounds,
    };
    use crate::spatial::SpatialGrid;

    #[test]
    fn test_wait_holds_then_releases_with_follow_up() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();

        let mut pos = Position::new(100.0, 100.0);
        let mut vel = Velocity::zero();
        let mut mobility = Mobility::new(2.5);
        let mut needs = Needs::full();
        let mut vitals = Vitals::new();
        let stats = Stats {
            strength: 0.5,
            vision_range: 100.0,
            attack_range: 50.0,
            base_damage: 20,
        };
        let mut maturity = Maturity::adult();
        let mut inventory = Inventory::new();
        let mut locked = false;

        let grid = SpatialGrid::new(50.0).unwrap();
        let bounds = WorldBounds::new(500.0, 500.0, 5.0);
        let home = HomeBase::new(250.0, 250.0, 30.0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut effects: Vec<ActionEffect> = Vec::new();

        let mut wait = WaitAction::with_follow_up(3, true, Action::drop_items());
        {
            let mut body = AgentBody {
                entity,
                pos: &mut pos,
                vel: &mut vel,
                mobility: &mut mobility,
                needs: &mut needs,
                vitals: &mut vitals,
                stats: &stats,
                maturity: &mut maturity,
                inventory: &mut inventory,
                locked: &mut locked,
                species: SpeciesInfo {
                    is_person: true,
                    sex: Some(Sex::Male),
                    pregnant: false,
                    animal_kind: None,
                },
            };
            let mut ctx = ActionCtx {
                now: SimTime::from_seconds(0),
                grid: &grid,
                bounds: &bounds,
                home: &home,
                rng: &mut rng,
                effects: &mut effects,
            };

            // First activation stamps the wait and holds the agent.
            assert_eq!(wait.tick(&mut body, &mut ctx), ActionRun::Continue);
            assert!(!body.mobility.can_move);
            assert!(*body.locked);

            // Mid-window the hold persists.
            ctx.now = SimTime::from_seconds(2);
            assert_eq!(wait.tick(&mut body, &mut ctx), ActionRun::Continue);

            // Window closed: release and dispatch the follow-up.
            ctx.now = SimTime::from_seconds(3);
            assert_eq!(wait.tick(&mut body, &mut ctx), ActionRun::Succeed);
            assert!(body.mobility.can_move);
        }

        assert!(effects
            .iter()
            .any(|e| matches!(e, ActionEffect::InstallNext { target, .. } if *target == entity)));
    }

    #[test]
    fn test_timer_not_due_before_start() {
        let timer = WaitTimer::new(5);
        assert!(!timer.started());
        assert!(!timer.is_due(SimTime::from_seconds(1_000)));
    }

    #[test]
    fn test_timer_due_after_window() {
        let mut timer = WaitTimer::new(5);
        let now = SimTime::from_seconds(100);
        timer.start(now);
        assert!(timer.started());
        assert!(!timer.is_due(SimTime::from_seconds(104)));
        assert!(timer.is_due(SimTime::from_seconds(105)));
        assert!(timer.is_due(SimTime::from_seconds(200)));
    }

    #[test]
    fn test_timer_stamp_is_fixed() {
        let mut timer = WaitTimer::new(10);
        timer.start(SimTime::from_seconds(50));
        // Restarting is the caller's bug; the first stamp is what counts
        // for a single run, and due-ness is monotone in the clock.
        assert!(!timer.is_due(SimTime::from_seconds(59)));
        assert!(timer.is_due(SimTime::from_seconds(60)));
    }
}
