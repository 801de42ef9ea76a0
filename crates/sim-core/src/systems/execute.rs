//! Action Execution System
//!
//! Advances every agent's current action by one step. The action mutates
//! its owner through [`AgentBody`] and speaks to the rest of the world
//! through the effect queue. When an action reaches its end condition the
//! slot is cleared, the lock drops, and movement is re-enabled, leaving
//! the agent for the next decision cycle.

use bevy_ecs::prelude::*;

use crate::actions::{
    ActionCtx, ActionEffects, ActionState, AgentBody, CurrentAction, SpeciesInfo,
};
use crate::components::{
    Animal, HomeBase, Inventory, Maturity, Mobility, Needs, Person, Position, Stats, Velocity,
    Vitals, WorldBounds, WorldClock,
};
use crate::spatial::SpatialGrid;
use crate::SimRng;

/// One step of every running action.
#[allow(clippy::type_complexity)]
pub fn execute_actions(
    clock: Res<WorldClock>,
    grid: Res<SpatialGrid>,
    bounds: Res<WorldBounds>,
    home: Res<HomeBase>,
    mut rng: ResMut<SimRng>,
    mut effects: ResMut<ActionEffects>,
    mut query: Query<(
        Entity,
        &mut Position,
        &mut Velocity,
        &mut Mobility,
        &mut Needs,
        &mut Vitals,
        &Stats,
        &mut Maturity,
        &mut Inventory,
        &mut CurrentAction,
        Option<&Person>,
        Option<&Animal>,
    )>,
) {
    for (
        entity,
        mut position,
        mut velocity,
        mut mobility,
        mut needs,
        mut vitals,
        stats,
        mut maturity,
        mut inventory,
        mut current,
        person,
        animal,
    ) in query.iter_mut()
    {
        let Some(mut active) = current.slot.take() else {
            continue;
        };

        let species = SpeciesInfo {
            is_person: person.is_some(),
            sex: person.map(|p| p.sex),
            pregnant: person.map(|p| p.is_pregnant()).unwrap_or(false),
            animal_kind: animal.map(|a| a.kind),
        };

        {
            let mut body = AgentBody {
                entity,
                pos: &mut position,
                vel: &mut velocity,
                mobility: &mut mobility,
                needs: &mut needs,
                vitals: &mut vitals,
                stats,
                maturity: &mut maturity,
                inventory: &mut inventory,
                locked: &mut current.locked,
                species,
            };
            let mut ctx = ActionCtx {
                now: clock.now,
                grid: &grid,
                bounds: &bounds,
                home: &home,
                rng: &mut rng.0,
                effects: &mut effects.queue,
            };
            active.advance(&mut body, &mut ctx);
        }

        if active.active {
            current.slot = Some(active);
        } else {
            // Ended: unlock, re-enable movement, clear the slot.
            if active.state == ActionState::Failed {
                tracing::debug!(agent = ?entity, action = active.action.name(), "action failed");
            }
            current.locked = false;
            mobility.can_move = true;
        }
    }
}
