//! Item catalog issued by the remote service at session start.
//!
//! The catalog drives scoring: rewards add points, traps subtract them, and
//! the (at most one) bonus item adds a larger capped amount.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Classification of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Reward,
    Trap,
    Bonus,
}

/// One immutable item definition from the per-session catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub kind: ItemKind,
    pub size: i32,
    /// Raw point value before the per-kind caps applied during generation.
    /// Negative for traps in some catalogs; generation takes the magnitude.
    pub reward_magnitude: i32,
}

/// Per-session item catalog, immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCatalog {
    items: Vec<ItemDefinition>,
}

impl ItemCatalog {
    #[must_use]
    pub fn new(items: Vec<ItemDefinition>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Uniformly random item of the given kind, if the catalog has any.
    pub fn pick(&self, kind: ItemKind, rng: &mut (impl Rng + ?Sized)) -> Option<ItemDefinition> {
        let matching: Vec<ItemDefinition> = self
            .items
            .iter()
            .copied()
            .filter(|item| item.kind == kind)
            .collect();
        if matching.is_empty() {
            return None;
        }
        Some(matching[rng.gen_range(0..matching.len())])
    }

    /// The bonus item, if the catalog carries one. Catalogs hold at most one.
    #[must_use]
    pub fn bonus(&self) -> Option<ItemDefinition> {
        self.items
            .iter()
            .copied()
            .find(|item| item.kind == ItemKind::Bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn catalog() -> ItemCatalog {
        ItemCatalog::new(vec![
            ItemDefinition {
                kind: ItemKind::Reward,
                size: 40,
                reward_magnitude: 5,
            },
            ItemDefinition {
                kind: ItemKind::Reward,
                size: 60,
                reward_magnitude: 8,
            },
            ItemDefinition {
                kind: ItemKind::Trap,
                size: 50,
                reward_magnitude: -6,
            },
        ])
    }

    #[test]
    fn pick_only_returns_matching_kind() {
        let catalog = catalog();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let item = catalog.pick(ItemKind::Reward, &mut rng).unwrap();
            assert_eq!(item.kind, ItemKind::Reward);
        }
    }

    #[test]
    fn pick_missing_kind_is_none() {
        let catalog = catalog();
        let mut rng = SmallRng::seed_from_u64(7);
        assert!(catalog.pick(ItemKind::Bonus, &mut rng).is_none());
        assert!(catalog.bonus().is_none());
    }

    #[test]
    fn bonus_finds_the_bonus_item() {
        let mut items = vec![ItemDefinition {
            kind: ItemKind::Bonus,
            size: 30,
            reward_magnitude: 12,
        }];
        items.extend([ItemDefinition {
            kind: ItemKind::Reward,
            size: 40,
            reward_magnitude: 5,
        }]);
        let catalog = ItemCatalog::new(items);
        assert_eq!(catalog.bonus().unwrap().reward_magnitude, 12);
    }
}
