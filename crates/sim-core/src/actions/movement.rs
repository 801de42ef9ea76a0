//! Movement Actions
//!
//! Straight-line movement behaviors: go to a point, wander, flee, and
//! follow. Movement is boundary-clamped, never pathfound; an action that
//! cannot make progress fails and the next decision cycle recovers.

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::components::{aabb_overlap, deflection_point, random_point, Direction, Need};

use super::{ActionCtx, ActionRun, AgentBody};

/// Move in a straight line until the destination square is reached.
///
/// The primitive other actions compose: wandering, fleeing, delivering,
/// and eating all own one of these.
#[derive(Debug, Clone)]
pub struct GotoAction {
    pub x: f64,
    pub y: f64,
    reach: f64,
    direction_set: bool,
}

impl GotoAction {
    pub fn new(x: f64, y: f64, reach: f64) -> Self {
        Self {
            x,
            y,
            reach,
            direction_set: false,
        }
    }

    pub fn tick(&mut self, body: &mut AgentBody, bounds: &crate::components::WorldBounds) -> ActionRun {
        if aabb_overlap(body.pos.x, body.pos.y, body.size(), self.x, self.y, self.reach) {
            return ActionRun::Succeed;
        }

        // First call, or the agent went motionless somehow: set direction.
        // Later calls just apply it.
        let moved = if !self.direction_set || body.vel.is_zero() {
            self.direction_set = true;
            body.goto_point(self.x, self.y, self.reach, bounds)
        } else {
            body.move_step(bounds)
        };

        if moved {
            ActionRun::Continue
        } else {
            ActionRun::Fail
        }
    }
}

/// Ticks between wander course reviews.
const CHANGE_COUNT: u32 = 25;
/// Chance of picking a new destination at a review.
const CHANGE_PROBABILITY: f64 = 0.25;
/// Chance band for briefly stopping instead.
const PAUSE_THRESHOLD: f64 = 0.75;

/// Amble between random points, occasionally pausing. The default idle
/// behavior; it never completes on its own.
#[derive(Debug, Clone)]
pub struct WanderAction {
    move_time: u32,
    paused: bool,
    inner: Option<GotoAction>,
}

impl WanderAction {
    pub fn new() -> Self {
        Self {
            move_time: 0,
            paused: false,
            inner: None,
        }
    }

    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        let inner = self.inner.get_or_insert_with(|| {
            let (x, y) = random_point(ctx.rng, ctx.bounds);
            GotoAction::new(x, y, body.maturity.size())
        });

        self.move_time += 1;
        let run = if self.paused {
            ActionRun::Continue
        } else {
            inner.tick(body, ctx.bounds)
        };

        if self.move_time >= CHANGE_COUNT {
            // Periodic course review: sometimes retarget, sometimes stand
            // still for a stretch.
            self.move_time = 0;
            self.paused = false;
            let roll: f64 = ctx.rng.gen();
            if roll < CHANGE_PROBABILITY {
                let (x, y) = random_point(ctx.rng, ctx.bounds);
                self.inner = Some(GotoAction::new(x, y, body.size()));
            } else if roll > PAUSE_THRESHOLD {
                body.stop();
                self.paused = true;
            }
        } else if run != ActionRun::Continue && body.mobility.collision != Direction::None {
            // Hit a wall or arrived; head somewhere away from the wall.
            let (x, y) = deflection_point(ctx.rng, ctx.bounds, body.mobility.collision, *body.pos);
            self.inner = Some(GotoAction::new(x, y, body.size()));
        }

        ActionRun::Continue
    }
}

impl Default for WanderAction {
    fn default() -> Self {
        Self::new()
    }
}

/// Run directly away from a threat until it leaves vision range.
#[derive(Debug, Clone)]
pub struct FleeAction {
    from: Entity,
}

impl FleeAction {
    pub fn new(from: Entity) -> Self {
        Self { from }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        // Threat gone from the world: escape complete.
        let Some(threat) = ctx.grid.position_of(self.from).copied() else {
            body.needs.apply_deltas(deltas);
            return ActionRun::Succeed;
        };

        let vision_sq = body.stats.vision_range * body.stats.vision_range;
        if body.pos.distance_sq(threat.x, threat.y) >= vision_sq {
            body.needs.apply_deltas(deltas);
            return ActionRun::Succeed;
        }

        // Aim for the point mirroring the threat through ourselves.
        let away_x = 2.0 * body.pos.x - threat.x;
        let away_y = 2.0 * body.pos.y - threat.y;
        let mut escape = GotoAction::new(away_x, away_y, body.size());
        if escape.tick(body, ctx.bounds) == ActionRun::Fail
            && body.mobility.collision != Direction::None
        {
            // Cornered against a wall: break along it toward open ground.
            let (x, y) = deflection_point(ctx.rng, ctx.bounds, body.mobility.collision, *body.pos);
            let mut sidestep = GotoAction::new(x, y, body.size());
            sidestep.tick(body, ctx.bounds);
        }
        ActionRun::Continue
    }
}

/// How close a follower tries to stay.
const FOLLOW_REACH: f64 = 30.0;

/// Trail another agent at a respectful distance, drifting by a small
/// per-follower offset so groups do not stack on one point.
#[derive(Debug, Clone)]
pub struct FollowAction {
    target: Entity,
    offset: Option<(f64, f64)>,
}

impl FollowAction {
    pub fn new(target: Entity) -> Self {
        Self {
            target,
            offset: None,
        }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        let Some(target) = ctx.grid.position_of(self.target).copied() else {
            return ActionRun::Succeed;
        };

        let (dx, dy) = *self.offset.get_or_insert_with(|| {
            (
                f64::from(ctx.rng.gen_range(-5i32..=5)),
                f64::from(ctx.rng.gen_range(-5i32..=5)),
            )
        });

        let distance_sq = body.pos.distance_sq(target.x, target.y);
        if distance_sq > FOLLOW_REACH * FOLLOW_REACH {
            body.goto_point(target.x + dx, target.y + dy, FOLLOW_REACH, ctx.bounds);
        } else {
            // Close enough: soak up the companionship reward.
            body.needs.apply_deltas(deltas);
        }
        ActionRun::Continue
    }
}
