//! World Object Components
//!
//! Ground items, plants, the campfire, and short-lived effect markers.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of items that can lie on the ground or sit in an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Meat,
    Apple,
    Stick,
    Rock,
    Fiber,
    Leaf,
    Spear,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Meat => "meat",
            ItemKind::Apple => "apple",
            ItemKind::Stick => "stick",
            ItemKind::Rock => "rock",
            ItemKind::Fiber => "fiber",
            ItemKind::Leaf => "leaf",
            ItemKind::Spear => "spear",
        }
    }

    /// Whether people can eat this.
    pub fn is_food(&self) -> bool {
        matches!(self, ItemKind::Apple | ItemKind::Meat)
    }
}

/// A counted stack of one item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub amount: u32,
}

/// An item lying in the world, discoverable through the spatial grid.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct GroundItem {
    pub kind: ItemKind,
    pub amount: u32,
    /// Set once the item has been claimed; the lifecycle sweep removes it.
    pub taken: bool,
}

impl GroundItem {
    pub fn new(kind: ItemKind, amount: u32) -> Self {
        Self {
            kind,
            amount,
            taken: false,
        }
    }

    /// Removes up to `amount`, returning how much actually came off the
    /// stack. Draining the stack marks it taken.
    pub fn take_amount(&mut self, amount: u32) -> u32 {
        let taken = self.amount.min(amount);
        self.amount -= taken;
        if self.amount == 0 {
            self.taken = true;
        }
        taken
    }
}

/// Plant growth stages. Seeds and juveniles re-schedule their own growth;
/// adults are harvestable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seed,
    Juvenile,
    Adult,
}

impl GrowthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthStage::Seed => "seed",
            GrowthStage::Juvenile => "juvenile",
            GrowthStage::Adult => "adult",
        }
    }
}

/// Plant species. Each yields a different item when harvested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    AppleTree,
    Potato,
    PineTree,
    Yucca,
    Shrub,
}

impl PlantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlantKind::AppleTree => "apple_tree",
            PlantKind::Potato => "potato",
            PlantKind::PineTree => "pine_tree",
            PlantKind::Yucca => "yucca",
            PlantKind::Shrub => "shrub",
        }
    }

    /// What harvesting an adult of this kind drops.
    pub fn harvest_yield(&self) -> ItemKind {
        match self {
            PlantKind::AppleTree | PlantKind::Potato => ItemKind::Apple,
            PlantKind::PineTree => ItemKind::Stick,
            PlantKind::Yucca => ItemKind::Fiber,
            PlantKind::Shrub => ItemKind::Leaf,
        }
    }

    /// Seconds between growth stages.
    pub fn growth_seconds(&self) -> u64 {
        match self {
            PlantKind::PineTree => 10,
            _ => 5,
        }
    }

    /// Apple trees carry a standing crop and survive harvesting; the
    /// others are destroyed once picked.
    pub fn survives_harvest(&self) -> bool {
        matches!(self, PlantKind::AppleTree)
    }
}

/// Apple trees hold this many apples at once.
pub const APPLE_TREE_CAPACITY: u32 = 5;

/// A plant in the world.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Plant {
    pub kind: PlantKind,
    pub stage: GrowthStage,
    /// Standing crop, only meaningful for kinds that survive harvest.
    pub fruit: u32,
    pub harvested: bool,
}

impl Plant {
    pub fn new(kind: PlantKind, stage: GrowthStage) -> Self {
        let fruit = if kind.survives_harvest() {
            APPLE_TREE_CAPACITY
        } else {
            0
        };
        Self {
            kind,
            stage,
            fruit,
            harvested: false,
        }
    }

    /// Whether a person can get anything out of this plant right now.
    pub fn harvestable(&self) -> bool {
        if self.stage != GrowthStage::Adult || self.harvested {
            return false;
        }
        !self.kind.survives_harvest() || self.fruit > 0
    }

    /// Advances one growth step. Returns true when another growth event
    /// should be scheduled (seed -> juvenile still has a stage to go, and
    /// apple trees keep regrowing fruit until full).
    pub fn grow(&mut self) -> bool {
        match self.stage {
            GrowthStage::Seed => {
                self.stage = GrowthStage::Juvenile;
                true
            }
            GrowthStage::Juvenile => {
                self.stage = GrowthStage::Adult;
                false
            }
            GrowthStage::Adult => {
                if self.kind.survives_harvest() && self.fruit < APPLE_TREE_CAPACITY {
                    self.fruit += 1;
                    self.fruit < APPLE_TREE_CAPACITY
                } else {
                    false
                }
            }
        }
    }
}

/// Marker for the campfire. People standing nearby warm up.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Campfire;

/// Kinds of short-lived visual markers the core announces to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Sleep,
    Love,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Sleep => "sleep",
            EffectKind::Love => "love",
        }
    }

    /// Finite effects expire on a schedule; the sleep marker instead lasts
    /// as long as its owner keeps sleeping.
    pub fn is_finite(&self) -> bool {
        matches!(self, EffectKind::Love)
    }
}

/// A visual marker entity. `owner` ties sleep markers to their sleeper.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    pub owner: Option<Entity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_item_take() {
        let mut item = GroundItem::new(ItemKind::Apple, 3);
        assert_eq!(item.take_amount(2), 2);
        assert!(!item.taken);
        assert_eq!(item.take_amount(5), 1);
        assert!(item.taken);
    }

    #[test]
    fn test_plant_growth_chain() {
        let mut plant = Plant::new(PlantKind::Potato, GrowthStage::Seed);
        assert!(!plant.harvestable());
        assert!(plant.grow()); // seed -> juvenile, one more to go
        assert!(!plant.grow()); // juvenile -> adult, done
        assert_eq!(plant.stage, GrowthStage::Adult);
        assert!(plant.harvestable());
    }

    #[test]
    fn test_apple_tree_regrows() {
        let mut tree = Plant::new(PlantKind::AppleTree, GrowthStage::Adult);
        assert_eq!(tree.fruit, APPLE_TREE_CAPACITY);
        tree.fruit = 0;
        assert!(tree.grow());
        assert_eq!(tree.fruit, 1);
        tree.fruit = APPLE_TREE_CAPACITY - 1;
        // Final apple tops the tree off; no further growth needed.
        assert!(!tree.grow());
        assert!(!tree.grow());
        assert_eq!(tree.fruit, APPLE_TREE_CAPACITY);
    }

    #[test]
    fn test_harvest_yields() {
        assert_eq!(PlantKind::AppleTree.harvest_yield(), ItemKind::Apple);
        assert_eq!(PlantKind::PineTree.harvest_yield(), ItemKind::Stick);
        assert_eq!(PlantKind::Yucca.harvest_yield(), ItemKind::Fiber);
        assert_eq!(PlantKind::Shrub.harvest_yield(), ItemKind::Leaf);
    }
}
