//! Cart
//!
//! Lines are unique by (product, size); adding an existing pair merges the
//! quantity. Client-held prices are carried as-is and only trusted after the
//! cart validator compared them with the catalog.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub size: String,
    pub unit_price: Amount,
    pub quantity: i64,
}

impl CartLine {
    pub fn subtotal(&self) -> Amount {
        self.unit_price.saturating_mul(self.quantity)
    }

    fn matches(&self, product_id: &str, size: &str) -> bool {
        self.product_id == product_id && self.size == size
    }
}

/// Structural cart limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLimits {
    pub max_items: usize,
    pub max_quantity_per_product: i64,
    pub max_total_quantity: i64,
    /// Highest unit price accepted from a client
    pub max_item_price: Amount,
}

/// Refused cart mutation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartLimitError {
    #[error("Quantity must be at least 1")]
    NonPositiveQuantity,

    #[error("The cart can hold at most {max} different items")]
    TooManyItems { max: usize },

    #[error("At most {max} of {product_id} ({size}) per order")]
    TooManyOfProduct {
        product_id: String,
        size: String,
        max: i64,
    },

    #[error("At most {max} items in total per order")]
    TooManyInTotal { max: i64 },

    #[error("Price of {product_id} ({size}) must be between 1 and {max}")]
    InvalidPrice {
        product_id: String,
        size: String,
        max: Amount,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cart with lines taken verbatim, bypassing add-time limits
    ///
    /// Used for carts rebuilt from client state; the validator judges them.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn subtotal(&self) -> Amount {
        self.lines
            .iter()
            .fold(0, |total: Amount, l| total.saturating_add(l.subtotal()))
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |total, l| total.saturating_add(l.quantity))
    }

    /// Add `quantity` of a product, merging with an existing line
    pub fn add(
        &mut self,
        product_id: &str,
        size: &str,
        unit_price: Amount,
        quantity: i64,
        limits: &CartLimits,
    ) -> Result<(), CartLimitError> {
        if quantity <= 0 {
            return Err(CartLimitError::NonPositiveQuantity);
        }
        if unit_price <= 0 || unit_price > limits.max_item_price {
            return Err(CartLimitError::InvalidPrice {
                product_id: product_id.to_string(),
                size: size.to_string(),
                max: limits.max_item_price,
            });
        }

        let existing = self.lines.iter().position(|l| l.matches(product_id, size));
        let current = existing.map_or(0, |i| self.lines[i].quantity);

        if existing.is_none() && self.lines.len() >= limits.max_items {
            return Err(CartLimitError::TooManyItems {
                max: limits.max_items,
            });
        }
        if current.saturating_add(quantity) > limits.max_quantity_per_product {
            return Err(CartLimitError::TooManyOfProduct {
                product_id: product_id.to_string(),
                size: size.to_string(),
                max: limits.max_quantity_per_product,
            });
        }
        if self.total_quantity().saturating_add(quantity) > limits.max_total_quantity {
            return Err(CartLimitError::TooManyInTotal {
                max: limits.max_total_quantity,
            });
        }

        match existing {
            Some(i) => {
                let line = &mut self.lines[i];
                line.quantity += quantity;
                line.unit_price = unit_price;
            }
            None => self.lines.push(CartLine {
                product_id: product_id.to_string(),
                size: size.to_string(),
                unit_price,
                quantity,
            }),
        }
        Ok(())
    }

    /// Set a line's quantity; zero or less removes the line
    pub fn set_quantity(
        &mut self,
        product_id: &str,
        size: &str,
        quantity: i64,
        limits: &CartLimits,
    ) -> Result<(), CartLimitError> {
        if quantity <= 0 {
            self.remove(product_id, size);
            return Ok(());
        }
        let Some(index) = self.lines.iter().position(|l| l.matches(product_id, size)) else {
            return Ok(());
        };

        if quantity > limits.max_quantity_per_product {
            return Err(CartLimitError::TooManyOfProduct {
                product_id: product_id.to_string(),
                size: size.to_string(),
                max: limits.max_quantity_per_product,
            });
        }
        let others = self.total_quantity() - self.lines[index].quantity;
        if others.saturating_add(quantity) > limits.max_total_quantity {
            return Err(CartLimitError::TooManyInTotal {
                max: limits.max_total_quantity,
            });
        }

        self.lines[index].quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str, size: &str) {
        self.lines.retain(|l| !l.matches(product_id, size));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: CartLimits = CartLimits {
        max_items: 2,
        max_quantity_per_product: 10,
        max_total_quantity: 15,
        max_item_price: 10_000,
    };

    #[test]
    fn test_add_merges_same_product_and_size() {
        let mut cart = Cart::new();
        cart.add("A", "120g", 350, 2, &LIMITS).unwrap();
        cart.add("A", "120g", 350, 3, &LIMITS).unwrap();
        cart.add("A", "260g", 680, 1, &LIMITS).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.subtotal(), 5 * 350 + 680);
        assert_eq!(cart.total_quantity(), 6);
    }

    #[test]
    fn test_add_enforces_limits() {
        let mut cart = Cart::new();
        cart.add("A", "120g", 350, 9, &LIMITS).unwrap();
        assert!(matches!(
            cart.add("A", "120g", 350, 2, &LIMITS),
            Err(CartLimitError::TooManyOfProduct { max: 10, .. })
        ));

        cart.add("B", "120g", 380, 6, &LIMITS).unwrap();
        assert_eq!(
            cart.add("C", "120g", 320, 1, &LIMITS),
            Err(CartLimitError::TooManyItems { max: 2 })
        );
        assert_eq!(
            cart.add("B", "120g", 380, 1, &LIMITS),
            Err(CartLimitError::TooManyInTotal { max: 15 })
        );
        assert_eq!(
            cart.add("B", "120g", 380, 0, &LIMITS),
            Err(CartLimitError::NonPositiveQuantity)
        );
        // Refused additions leave the cart untouched
        assert_eq!(cart.total_quantity(), 15);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::new();
        cart.add("A", "120g", 350, 2, &LIMITS).unwrap();
        cart.set_quantity("A", "120g", 4, &LIMITS).unwrap();
        assert_eq!(cart.total_quantity(), 4);

        cart.set_quantity("A", "120g", 0, &LIMITS).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_prices_outside_bounds() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.add("A", "120g", 0, 1, &LIMITS),
            Err(CartLimitError::InvalidPrice { max: 10_000, .. })
        ));
        assert!(matches!(
            cart.add("A", "120g", 5_000_000_000_000_000_000, 2, &LIMITS),
            Err(CartLimitError::InvalidPrice { .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_saturate_on_unvalidated_lines() {
        let line = |product_id: &str| CartLine {
            product_id: product_id.to_string(),
            size: "120g".to_string(),
            unit_price: 5_000_000_000_000_000_000,
            quantity: i64::MAX,
        };
        let cart = Cart::from_lines(vec![line("A"), line("B")]);

        assert_eq!(cart.subtotal(), Amount::MAX);
        assert_eq!(cart.total_quantity(), i64::MAX);
    }
}
