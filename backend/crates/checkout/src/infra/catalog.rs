//! Static Product Catalog
//!
//! Authoritative prices for the cart validator. Product management owns the
//! real catalog; this in-memory table mirrors the storefront's listing.

use std::collections::HashMap;

use crate::domain::repository::Catalog;
use crate::domain::value_objects::Amount;

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    prices: HashMap<(String, String), Amount>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, product_id: &str, size: &str, price: Amount) -> Self {
        self.prices
            .insert((product_id.to_string(), size.to_string()), price);
        self
    }

    /// The four house blends in 120g and 260g bags
    pub fn coffee_defaults() -> Self {
        [
            ("A", 350, 680),
            ("B", 380, 720),
            ("C", 320, 620),
            ("D", 420, 800),
        ]
        .into_iter()
        .fold(Self::new(), |catalog, (product_id, small, large)| {
            catalog
                .with_price(product_id, "120g", small)
                .with_price(product_id, "260g", large)
        })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn resolve(&self, product_id: &str, size: &str) -> Option<Amount> {
        self.prices
            .get(&(product_id.to_string(), size.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coffee_defaults() {
        let catalog = StaticCatalog::coffee_defaults();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.resolve("A", "120g"), Some(350));
        assert_eq!(catalog.resolve("D", "260g"), Some(800));
        assert_eq!(catalog.resolve("A", "500g"), None);
        assert_eq!(catalog.resolve("E", "120g"), None);
    }
}
