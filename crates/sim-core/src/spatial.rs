//! Spatial Grid
//!
//! Uniform grid over the world bounds, rebuilt from scratch every tick
//! and read-only afterwards. Answers "what is within radius R of point P"
//! for every other system.
//!
//! The radius query works in cell space: the search radius collapses to a
//! whole number of cells, one quadrant of the cell box is walked, and each
//! admitted offset contributes its cell plus the three point-symmetric
//! mirror cells. The admission test `dx^2 + dy^2 + r <= r^2` is a cheap
//! over-approximation of the circle: corner cells just outside the true
//! radius can slip in, so callers re-filter by exact distance when it
//! matters.

use bevy_ecs::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use crate::components::{ObjectClass, Position, WorldBounds};

/// Errors from grid construction.
#[derive(Debug, Error)]
pub enum GridError {
    /// Configuration values that cannot be used.
    #[error("invalid grid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A non-owning reference to an object placed in the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridObject {
    pub entity: Entity,
    pub x: f64,
    pub y: f64,
    pub class: ObjectClass,
}

/// The uniform grid. Cells hold plain copies of position and class, so a
/// query never touches component storage.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<GridObject>>,
    by_entity: HashMap<Entity, GridObject>,
}

impl SpatialGrid {
    /// Creates an empty grid. Populate it with [`SpatialGrid::build`].
    pub fn new(cell_size: f64) -> Result<Self, GridError> {
        if cell_size <= 0.0 {
            return Err(GridError::InvalidConfig("cell_size must be positive"));
        }
        Ok(Self {
            cell_size,
            cols: 0,
            rows: 0,
            cells: Vec::new(),
            by_entity: HashMap::new(),
        })
    }

    /// Rebuilds the grid from the current object set. Objects outside the
    /// bounds land in no cell and are skipped.
    pub fn build(&mut self, bounds: &WorldBounds, objects: impl Iterator<Item = GridObject>) {
        self.cols = (bounds.width / self.cell_size).ceil() as usize + 1;
        self.rows = (bounds.height / self.cell_size).ceil() as usize + 1;
        self.cells.clear();
        self.cells.resize(self.cols * self.rows, Vec::new());
        self.by_entity.clear();

        for object in objects {
            let col = (object.x / self.cell_size).floor() as i64;
            let row = (object.y / self.cell_size).floor() as i64;
            if let Some(index) = self.cell_index(col, row) {
                self.cells[index].push(object);
                self.by_entity.insert(object.entity, object);
            }
        }
    }

    fn cell_index(&self, col: i64, row: i64) -> Option<usize> {
        if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    fn gather(&self, col: i64, row: i64, out: &mut Vec<GridObject>) {
        if let Some(index) = self.cell_index(col, row) {
            out.extend_from_slice(&self.cells[index]);
        }
    }

    /// All objects in cells approximately within `radius` of `(x, y)`.
    pub fn query_radius(&self, x: f64, y: f64, radius: f64) -> Vec<GridObject> {
        let mut nearby = Vec::new();

        // Collapse the radius into cell units, always checking some area
        // even when the radius is smaller than a cell.
        let cell_r = ((radius / self.cell_size) as i64).max(1);
        let cell_r_sq = cell_r * cell_r;
        let center_col = (x / self.cell_size).round() as i64;
        let center_row = (y / self.cell_size).round() as i64;

        // Walk the second quadrant and mirror each admitted offset through
        // the center to cover the other three.
        for col in (center_col - cell_r)..center_col {
            for row in (center_row - cell_r)..center_row {
                let dx = col - center_col + 1;
                let dy = row - center_row + 1;
                if dx * dx + dy * dy + cell_r > cell_r_sq {
                    continue;
                }

                let mirror_col = 2 * center_col - col - 1;
                let mirror_row = 2 * center_row - row - 1;

                self.gather(mirror_col, row, &mut nearby);
                self.gather(col, row, &mut nearby);
                self.gather(col, mirror_row, &mut nearby);
                self.gather(mirror_col, mirror_row, &mut nearby);
            }
        }

        nearby
    }

    /// Objects of one class within the radius.
    pub fn class_in_range(
        &self,
        class: ObjectClass,
        x: f64,
        y: f64,
        radius: f64,
    ) -> Vec<GridObject> {
        self.query_radius(x, y, radius)
            .into_iter()
            .filter(|o| o.class == class)
            .collect()
    }

    /// Damageable objects (people and animals) within the radius.
    pub fn mortals_in_range(&self, x: f64, y: f64, radius: f64) -> Vec<GridObject> {
        self.query_radius(x, y, radius)
            .into_iter()
            .filter(|o| o.class.is_mortal())
            .collect()
    }

    /// Where the grid last saw an entity, if it was indexed this tick.
    /// Destroyed or out-of-bounds objects simply return `None`.
    pub fn position_of(&self, entity: Entity) -> Option<&GridObject> {
        self.by_entity.get(&entity)
    }
}

/// Rebuilds the grid at the top of every tick from all placed objects.
pub fn rebuild_spatial_index(
    mut grid: ResMut<SpatialGrid>,
    bounds: Res<WorldBounds>,
    query: Query<(Entity, &Position, &ObjectClass)>,
) {
    let objects = query.iter().map(|(entity, pos, class)| GridObject {
        entity,
        x: pos.x,
        y: pos.y,
        class: *class,
    });
    grid.build(&bounds, objects);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> WorldBounds {
        WorldBounds::new(500.0, 500.0, 5.0)
    }

    fn grid_with(objects: Vec<(f64, f64, ObjectClass)>) -> (SpatialGrid, Vec<Entity>) {
        let mut world = World::new();
        let mut entities = Vec::new();
        let mut placed = Vec::new();
        for (x, y, class) in objects {
            let entity = world.spawn_empty().id();
            entities.push(entity);
            placed.push(GridObject {
                entity,
                x,
                y,
                class,
            });
        }
        let mut grid = SpatialGrid::new(50.0).unwrap();
        grid.build(&bounds(), placed.into_iter());
        (grid, entities)
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        assert!(SpatialGrid::new(0.0).is_err());
        assert!(SpatialGrid::new(-10.0).is_err());
    }

    #[test]
    fn test_finds_object_in_own_cell() {
        let (grid, entities) = grid_with(vec![(120.0, 130.0, ObjectClass::Person)]);
        // Queried at its own coordinates with radius >= cell size, an
        // object must always come back.
        let found = grid.query_radius(120.0, 130.0, 50.0);
        assert!(found.iter().any(|o| o.entity == entities[0]));
    }

    #[test]
    fn test_excludes_far_objects() {
        let (grid, entities) = grid_with(vec![
            (100.0, 100.0, ObjectClass::Person),
            (400.0, 400.0, ObjectClass::Animal),
        ]);
        let found = grid.query_radius(100.0, 100.0, 60.0);
        assert!(found.iter().any(|o| o.entity == entities[0]));
        assert!(!found.iter().any(|o| o.entity == entities[1]));
    }

    #[test]
    fn test_never_returns_outside_cell_box() {
        // Everything returned must sit within the r-box bound in cell
        // space, even though the circle test over-approximates.
        let (grid, _) = grid_with(vec![
            (100.0, 100.0, ObjectClass::Person),
            (150.0, 100.0, ObjectClass::Person),
            (250.0, 250.0, ObjectClass::Person),
            (90.0, 140.0, ObjectClass::Person),
            (460.0, 20.0, ObjectClass::Person),
        ]);
        let (qx, qy, radius) = (110.0, 110.0, 100.0);
        let cell: f64 = 50.0;
        let cell_r = ((radius / cell) as i64).max(1);
        let center_col = (qx / cell).round() as i64;
        let center_row = (qy / cell).round() as i64;

        for object in grid.query_radius(qx, qy, radius) {
            let col = (object.x / cell).floor() as i64;
            let row = (object.y / cell).floor() as i64;
            assert!((col - center_col).abs() <= cell_r, "col outside r-box");
            assert!((row - center_row).abs() <= cell_r, "row outside r-box");
        }
    }

    #[test]
    fn test_out_of_bounds_objects_skipped() {
        let (grid, entities) = grid_with(vec![
            (-50.0, 100.0, ObjectClass::Person),
            (100.0, 100.0, ObjectClass::Person),
        ]);
        assert!(grid.position_of(entities[0]).is_none());
        assert!(grid.position_of(entities[1]).is_some());
    }

    #[test]
    fn test_query_near_world_edge_is_safe() {
        let (grid, entities) = grid_with(vec![(10.0, 10.0, ObjectClass::Person)]);
        // Cells off the edge of the grid are skipped, not an error.
        let found = grid.query_radius(0.0, 0.0, 200.0);
        assert!(found.iter().any(|o| o.entity == entities[0]));
    }

    #[test]
    fn test_typed_queries_filter() {
        let (grid, entities) = grid_with(vec![
            (100.0, 100.0, ObjectClass::Person),
            (110.0, 100.0, ObjectClass::Item),
            (120.0, 100.0, ObjectClass::Animal),
            (130.0, 100.0, ObjectClass::Plant),
        ]);
        let mortals = grid.mortals_in_range(110.0, 100.0, 100.0);
        assert_eq!(mortals.len(), 2);
        assert!(mortals.iter().all(|o| o.class.is_mortal()));

        let items = grid.class_in_range(ObjectClass::Item, 110.0, 100.0, 100.0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity, entities[1]);
    }

    #[test]
    fn test_no_duplicates_from_mirroring() {
        let (grid, entities) = grid_with(vec![(100.0, 100.0, ObjectClass::Person)]);
        let found = grid.query_radius(100.0, 100.0, 150.0);
        let hits = found.iter().filter(|o| o.entity == entities[0]).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut grid = SpatialGrid::new(50.0).unwrap();
        grid.build(
            &bounds(),
            std::iter::once(GridObject {
                entity: a,
                x: 100.0,
                y: 100.0,
                class: ObjectClass::Person,
            }),
        );
        grid.build(
            &bounds(),
            std::iter::once(GridObject {
                entity: b,
                x: 100.0,
                y: 100.0,
                class: ObjectClass::Person,
            }),
        );
        assert!(grid.position_of(a).is_none());
        assert!(grid.position_of(b).is_some());
    }
}
