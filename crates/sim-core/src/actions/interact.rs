//! Interaction Actions
//!
//! Behaviors that act on world objects: gathering, eating, fighting, and
//! the chores around the home base. Cross-entity consequences leave as
//! [`ActionEffect`](super::ActionEffect)s.

use bevy_ecs::prelude::*;

use crate::components::{ItemKind, Need, ObjectClass};

use super::movement::GotoAction;
use super::{ActionCtx, ActionError, ActionRun, AgentBody};

/// How much hunger one apple restores.
const EAT_HUNGER_RESTORE: f64 = 0.5;

/// Walk to a ground item and pick it up. Once committed, the agent locks
/// itself until the item is secured or gone; gathering is deliberate.
#[derive(Debug, Clone)]
pub struct PickupAction {
    item: Entity,
    inner: Option<GotoAction>,
}

impl PickupAction {
    pub fn new(item: Entity) -> Self {
        Self { item, inner: None }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        if !body.species.is_person {
            return ActionRun::Succeed;
        }

        // Someone else got there first, or the item vanished.
        let Some(target) = ctx.grid.position_of(self.item).copied() else {
            return ActionRun::Succeed;
        };

        if !*body.locked {
            *body.locked = true;
        }

        let inner = self
            .inner
            .get_or_insert_with(|| GotoAction::new(target.x, target.y, 10.0));
        match inner.tick(body, ctx.bounds) {
            ActionRun::Succeed => {
                ctx.effects.push(super::ActionEffect::PickupItem {
                    item: self.item,
                    by: body.entity,
                });
                body.needs.apply_deltas(deltas);
                ActionRun::Succeed
            }
            ActionRun::Fail => ActionRun::Fail,
            ActionRun::Continue => ActionRun::Continue,
        }
    }
}

/// Walk to a ground item and devour it whole. The animal version of
/// pickup; nothing enters an inventory.
#[derive(Debug, Clone)]
pub struct ConsumeAction {
    item: Entity,
    inner: Option<GotoAction>,
}

impl ConsumeAction {
    pub fn new(item: Entity) -> Self {
        Self { item, inner: None }
    }

    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        let Some(target) = ctx.grid.position_of(self.item).copied() else {
            return ActionRun::Succeed;
        };

        let inner = self
            .inner
            .get_or_insert_with(|| GotoAction::new(target.x, target.y, 10.0));
        match inner.tick(body, ctx.bounds) {
            ActionRun::Succeed => {
                ctx.effects
                    .push(super::ActionEffect::ConsumeItem { item: self.item });
                ActionRun::Succeed
            }
            other => other,
        }
    }
}

/// Walk to a plant and shake its yield loose.
#[derive(Debug, Clone)]
pub struct HarvestAction {
    plant: Entity,
}

impl HarvestAction {
    pub fn new(plant: Entity) -> Self {
        Self { plant }
    }

    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        let Some(plant) = ctx.grid.position_of(self.plant).copied() else {
            return ActionRun::Succeed;
        };

        // Needs to be touching the plant.
        if !crate::components::aabb_overlap(body.pos.x, body.pos.y, body.size(), plant.x, plant.y, 20.0)
        {
            body.goto_point(plant.x, plant.y, 20.0, ctx.bounds);
            return ActionRun::Continue;
        }

        ctx.effects
            .push(super::ActionEffect::HarvestPlant { plant: self.plant });
        ActionRun::Succeed
    }
}

/// Close on a target and strike it once.
#[derive(Debug, Clone)]
pub struct AttackAction {
    target: Entity,
}

impl AttackAction {
    /// Rejected at construction when the target cannot take damage.
    pub fn new(target: Entity, class: ObjectClass) -> Result<Self, ActionError> {
        if !class.is_mortal() {
            return Err(ActionError::TargetNotMortal { class });
        }
        Ok(Self { target })
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

        let range_sq = body.stats.attack_range * body.stats.attack_range;
        if body.pos.distance_sq(target.x, target.y) > range_sq {
            body.goto_point(target.x, target.y, body.size(), ctx.bounds);
            return ActionRun::Continue;
        }

        ctx.effects.push(super::ActionEffect::Damage {
            target: self.target,
            amount: body.stats.effective_damage(),
            attacker: Some(body.entity),
        });
        body.needs.apply_deltas(deltas);
        ActionRun::Succeed
    }
}

/// Eat carried apples, or head home and request one from the store.
/// Ends once the store has been asked and nothing came of it.
#[derive(Debug, Clone)]
pub struct EatAction {
    requested: bool,
    inner: Option<GotoAction>,
}

impl EatAction {
    pub fn new() -> Self {
        Self {
            requested: false,
            inner: None,
        }
    }

    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        if !body.species.is_person {
            return ActionRun::Succeed;
        }

        if body.inventory.count(ItemKind::Apple) > 0 {
            // One apple per tick until the carried supply runs out.
            body.inventory.take(ItemKind::Apple, 1);
            body.needs.apply_delta(Need::Hunger, EAT_HUNGER_RESTORE);
            return ActionRun::Continue;
        }

        if self.requested {
            // Asked the store already; whatever was granted has been
            // eaten. Going hungry is the next decision cycle's problem.
            return ActionRun::Succeed;
        }

        let inner = self
            .inner
            .get_or_insert_with(|| GotoAction::new(ctx.home.x, ctx.home.y, ctx.home.size));
        match inner.tick(body, ctx.bounds) {
            ActionRun::Succeed => {
                ctx.effects.push(super::ActionEffect::RequestItem {
                    kind: ItemKind::Apple,
                    by: body.entity,
                });
                self.requested = true;
                ActionRun::Continue
            }
            ActionRun::Fail => ActionRun::Fail,
            ActionRun::Continue => ActionRun::Continue,
        }
    }
}

impl Default for EatAction {
    fn default() -> Self {
        Self::new()
    }
}

/// Carry food back to the home base and bank it in the store.
#[derive(Debug, Clone)]
pub struct DeliverFoodAction {
    inner: Option<GotoAction>,
}

impl DeliverFoodAction {
    pub fn new() -> Self {
        Self { inner: None }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        if !body.species.is_person {
            return ActionRun::Succeed;
        }

        let inner = self
            .inner
            .get_or_insert_with(|| GotoAction::new(ctx.home.x, ctx.home.y, ctx.home.size));
        let run = inner.tick(body, ctx.bounds);

        if ctx.home.overlaps(body.pos.x, body.pos.y, body.size()) {
            body.needs.apply_deltas(deltas);
            ctx.effects.push(super::ActionEffect::DropItems {
                by: body.entity,
                at_home: true,
            });
            return ActionRun::Succeed;
        }

        match run {
            ActionRun::Fail => ActionRun::Fail,
            _ => ActionRun::Continue,
        }
    }
}

impl Default for DeliverFoodAction {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop everything on the spot, into the store when standing at home.
#[derive(Debug, Clone, Default)]
pub struct DropAction;

impl DropAction {
    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        if body.species.is_person {
            ctx.effects.push(super::ActionEffect::DropItems {
                by: body.entity,
                at_home: ctx.home.overlaps(body.pos.x, body.pos.y, body.size()),
            });
        }
        ActionRun::Succeed
    }
}

/// Loiter within a radius of a point, drifting back when pushed out.
/// Never completes on its own.
#[derive(Debug, Clone)]
pub struct GuardAction {
    x: f64,
    y: f64,
    distance: f64,
}

impl GuardAction {
    pub fn new(x: f64, y: f64, distance: f64) -> Self {
        Self { x, y, distance }
    }

    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        ctx: &mut ActionCtx,
        deltas: &[(Need, f64)],
    ) -> ActionRun {
        if body.pos.distance_sq(self.x, self.y) > self.distance * self.distance {
            body.goto_point(self.x, self.y, body.size(), ctx.bounds);
        } else {
            body.stop();
            body.needs.apply_deltas(deltas);
        }
        ActionRun::Continue
    }
}

/// Scheduled growth-up: flips a child to adult size.
#[derive(Debug, Clone, Default)]
pub struct MatureAction;

impl MatureAction {
    pub fn tick(&mut self, body: &mut AgentBody) -> ActionRun {
        body.maturity.adult = true;
        ActionRun::Succeed
    }
}

/// One sweep of every damageable target in attack range. People strike
/// animals, animals strike people; same-species targets are spared.
#[derive(Debug, Clone, Default)]
pub struct AttackSweepAction;

impl AttackSweepAction {
    pub fn tick(&mut self, body: &mut AgentBody, ctx: &mut ActionCtx) -> ActionRun {
        let targets =
            ctx.grid
                .mortals_in_range(body.pos.x, body.pos.y, body.stats.attack_range);

        for target in targets {
            if target.entity == body.entity {
                continue;
            }
            let cross_species = (body.species.is_person && target.class == ObjectClass::Animal)
                || (!body.species.is_person && target.class == ObjectClass::Person);
            if cross_species {
                ctx.effects.push(super::ActionEffect::Damage {
                    target: target.entity,
                    amount: body.stats.effective_damage(),
                    attacker: Some(body.entity),
                });
            }
        }

        ActionRun::Succeed
    }
}
