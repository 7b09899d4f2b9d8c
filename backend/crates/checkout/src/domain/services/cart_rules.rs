//! Cart and amount validation
//!
//! Every violation is reported; a mismatching price is flagged as tampering
//! and never corrected.

use crate::domain::cart::{Cart, CartLimits};
use crate::domain::repository::Catalog;
use crate::domain::value_objects::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartRules {
    pub limits: CartLimits,
    pub max_item_price: Amount,
    /// Compare client prices with the catalog (product existence is always checked)
    pub check_price: bool,
}

/// Validate a cart against structural limits and the authoritative catalog
pub fn validate_cart(cart: &Cart, rules: &CartRules, catalog: &dyn Catalog) -> Vec<String> {
    let mut errors = Vec::new();

    if cart.is_empty() {
        errors.push("Your cart is empty".to_string());
        return errors;
    }

    let limits = &rules.limits;
    if cart.lines().len() > limits.max_items {
        errors.push(format!(
            "Too many different items in the cart (max {})",
            limits.max_items
        ));
    }
    if cart.total_quantity() > limits.max_total_quantity {
        errors.push(format!(
            "Too many items in total (max {})",
            limits.max_total_quantity
        ));
    }

    for line in cart.lines() {
        let label = format!("{} ({})", line.product_id, line.size);

        if line.quantity < 1 || line.quantity > limits.max_quantity_per_product {
            errors.push(format!(
                "{label}: quantity must be between 1 and {}",
                limits.max_quantity_per_product
            ));
        }
        if line.unit_price <= 0 || line.unit_price > rules.max_item_price {
            errors.push(format!("{label}: invalid price"));
        }

        match catalog.resolve(&line.product_id, &line.size) {
            None => errors.push(format!("{label}: product not found")),
            Some(price) if rules.check_price && price != line.unit_price => {
                tracing::warn!(
                    product_id = %line.product_id,
                    size = %line.size,
                    submitted = line.unit_price,
                    catalog = price,
                    "Cart price mismatch"
                );
                errors.push(format!(
                    "{label}: price does not match the catalog (possible tampering)"
                ));
            }
            Some(_) => {}
        }
    }

    errors
}

/// Check an order amount against the configured bounds
///
/// Amounts above the maximum are not rejected silently: the message sends
/// the customer to support for manual review.
pub fn validate_order_amount(amount: Amount, min: Amount, max: Amount) -> Result<(), String> {
    if amount < min {
        return Err(format!("Minimum order amount is NT$ {min}"));
    }
    if amount > max {
        return Err(format!(
            "Orders above NT$ {max} need manual review. Please contact customer support to complete this order"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::CartLine;

    struct TestCatalog;

    impl Catalog for TestCatalog {
        fn resolve(&self, product_id: &str, size: &str) -> Option<Amount> {
            match (product_id, size) {
                ("A", "120g") => Some(350),
                ("A", "260g") => Some(680),
                _ => None,
            }
        }
    }

    fn rules() -> CartRules {
        CartRules {
            limits: CartLimits {
                max_items: 20,
                max_quantity_per_product: 10,
                max_total_quantity: 50,
                max_item_price: 10_000,
            },
            max_item_price: 10_000,
            check_price: true,
        }
    }

    fn line(product_id: &str, size: &str, unit_price: Amount, quantity: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            size: size.to_string(),
            unit_price,
            quantity,
        }
    }

    #[test]
    fn test_valid_cart() {
        let cart = Cart::from_lines(vec![line("A", "120g", 350, 2), line("A", "260g", 680, 1)]);
        assert!(validate_cart(&cart, &rules(), &TestCatalog).is_empty());
    }

    #[test]
    fn test_empty_cart() {
        let errors = validate_cart(&Cart::new(), &rules(), &TestCatalog);
        assert_eq!(errors, vec!["Your cart is empty"]);
    }

    #[test]
    fn test_tampered_price_is_flagged_not_corrected() {
        let cart = Cart::from_lines(vec![line("A", "120g", 1, 2)]);
        let errors = validate_cart(&cart, &rules(), &TestCatalog);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("tampering"));
        assert_eq!(cart.subtotal(), 2);
    }

    #[test]
    fn test_price_check_can_be_disabled_but_product_must_exist() {
        let mut rules = rules();
        rules.check_price = false;
        let cart = Cart::from_lines(vec![line("A", "120g", 1, 2), line("Z", "120g", 100, 1)]);
        let errors = validate_cart(&cart, &rules, &TestCatalog);
        assert_eq!(errors, vec!["Z (120g): product not found"]);
    }

    #[test]
    fn test_accumulates_violations() {
        let mut rules = rules();
        rules.limits.max_items = 1;
        rules.limits.max_total_quantity = 5;
        let cart = Cart::from_lines(vec![
            line("A", "120g", 350, 11),
            line("A", "260g", 0, -1),
        ]);
        let errors = validate_cart(&cart, &rules, &TestCatalog);
        // items, total quantity, quantity A/120g, quantity A/260g, price A/260g, tamper A/260g
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_order_amount_bounds() {
        assert!(validate_order_amount(700, 100, 50_000).is_ok());
        assert!(validate_order_amount(99, 100, 50_000).unwrap_err().contains("Minimum"));
        let err = validate_order_amount(50_001, 100, 50_000).unwrap_err();
        assert!(err.contains("customer support"));
    }
}
