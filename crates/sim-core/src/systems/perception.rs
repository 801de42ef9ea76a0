//! Perception System
//!
//! Builds a read-only view of every placed object at the top of the tick.
//! The decision loop combines these views with spatial-grid hits so it
//! can ask "what does that object offer me" without touching component
//! storage mid-iteration.

use bevy_ecs::prelude::*;
use std::collections::HashMap;

use crate::components::{
    Animal, AnimalKind, GroundItem, ItemKind, Maturity, ObjectClass, Person, Plant, Position, Sex,
    Stats, Vitals,
};

/// Person facts other agents may react to.
#[derive(Debug, Clone, Copy)]
pub struct PersonView {
    pub sex: Sex,
    pub adult: bool,
    pub pregnant: bool,
}

/// Animal facts other agents may react to.
#[derive(Debug, Clone, Copy)]
pub struct AnimalView {
    pub kind: AnimalKind,
}

/// Item facts.
#[derive(Debug, Clone, Copy)]
pub struct ItemView {
    pub kind: ItemKind,
    pub amount: u32,
}

/// Plant facts.
#[derive(Debug, Clone, Copy)]
pub struct PlantView {
    pub harvestable: bool,
}

/// One object as seen from the outside.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView {
    pub entity: Entity,
    pub class: ObjectClass,
    pub x: f64,
    pub y: f64,
    pub health: i32,
    pub strength: f64,
    pub person: Option<PersonView>,
    pub animal: Option<AnimalView>,
    pub item: Option<ItemView>,
    pub plant: Option<PlantView>,
}

/// The per-tick view table plus the population counts decision rules use.
#[derive(Resource, Debug, Default)]
pub struct PerceivedWorld {
    views: HashMap<Entity, ObjectView>,
    pub person_count: u32,
    pub entity_count: usize,
}

impl PerceivedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: Entity) -> Option<&ObjectView> {
        self.views.get(&entity)
    }

    fn clear(&mut self) {
        self.views.clear();
        self.person_count = 0;
        self.entity_count = 0;
    }

    fn insert(&mut self, view: ObjectView) {
        self.views.insert(view.entity, view);
    }
}

/// Rebuilds the view table. Runs right after the spatial index rebuild.
#[allow(clippy::type_complexity)]
pub fn build_perception(
    mut perceived: ResMut<PerceivedWorld>,
    people: Query<(Entity, &Position, &Person, &Maturity, &Vitals, &Stats)>,
    animals: Query<(Entity, &Position, &Animal, &Vitals, &Stats)>,
    items: Query<(Entity, &Position, &GroundItem)>,
    plants: Query<(Entity, &Position, &Plant)>,
) {
    perceived.clear();

    for (entity, position, person, maturity, vitals, stats) in people.iter() {
        perceived.person_count += 1;
        perceived.entity_count += 1;
        perceived.insert(ObjectView {
            entity,
            class: ObjectClass::Person,
            x: position.x,
            y: position.y,
            health: vitals.health,
            strength: stats.strength,
            person: Some(PersonView {
                sex: person.sex,
                adult: maturity.adult,
                pregnant: person.is_pregnant(),
            }),
            animal: None,
            item: None,
            plant: None,
        });
    }

    for (entity, position, animal, vitals, stats) in animals.iter() {
        perceived.entity_count += 1;
        perceived.insert(ObjectView {
            entity,
            class: ObjectClass::Animal,
            x: position.x,
            y: position.y,
            health: vitals.health,
            strength: stats.strength,
            animal: Some(AnimalView { kind: animal.kind }),
            person: None,
            item: None,
            plant: None,
        });
    }

    for (entity, position, item) in items.iter() {
        perceived.insert(ObjectView {
            entity,
            class: ObjectClass::Item,
            x: position.x,
            y: position.y,
            health: 0,
            strength: 0.0,
            item: Some(ItemView {
                kind: item.kind,
                amount: item.amount,
            }),
            person: None,
            animal: None,
            plant: None,
        });
    }

    for (entity, position, plant) in plants.iter() {
        perceived.insert(ObjectView {
            entity,
            class: ObjectClass::Plant,
            x: position.x,
            y: position.y,
            health: 0,
            strength: 0.0,
            plant: Some(PlantView {
                harvestable: plant.harvestable(),
            }),
            person: None,
            animal: None,
            item: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{GrowthStage, PlantKind, Velocity};

    #[test]
    fn test_build_perception_counts_and_views() {
        let mut world = World::new();
        world.insert_resource(PerceivedWorld::new());

        let person = world
            .spawn((
                Position::new(10.0, 10.0),
                Person::new(Sex::Female),
                Maturity::adult(),
                Vitals::new(),
                Stats {
                    strength: 0.5,
                    vision_range: 100.0,
                    attack_range: 50.0,
                    base_damage: 20,
                },
                Velocity::zero(),
            ))
            .id();
        let plant = world
            .spawn((
                Position::new(20.0, 20.0),
                Plant::new(PlantKind::Shrub, GrowthStage::Adult),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(build_perception);
        schedule.run(&mut world);

        let perceived = world.resource::<PerceivedWorld>();
        assert_eq!(perceived.person_count, 1);
        assert_eq!(perceived.entity_count, 1);

        let person_view = perceived.get(person).unwrap();
        assert_eq!(person_view.class, ObjectClass::Person);
        assert_eq!(person_view.person.unwrap().sex, Sex::Female);
        assert!(!person_view.person.unwrap().pregnant);

        let plant_view = perceived.get(plant).unwrap();
        assert!(plant_view.plant.unwrap().harvestable);
    }
}
