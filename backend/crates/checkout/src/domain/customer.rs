//! Customer contact data
//!
//! Raw input is validated (all violations collected) and then sanitized
//! before it is stored on an order.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use platform::sanitize::escape_html;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{Han}a-zA-Z\s]+$").expect("Invalid regex"));

static MOBILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^09\d{8}$").expect("Invalid regex"));

static LANDLINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0\d{1,2}-?\d{6,8}$").expect("Invalid regex"));

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const EMAIL_MAX: usize = 100;
const ADDRESS_MIN: usize = 5;
const ADDRESS_MAX: usize = 200;
const NOTE_MAX: usize = 500;

/// Contact fields as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: String,
}

/// Validated, HTML-escaped contact fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: String,
}

impl CustomerInput {
    /// Check every field; an empty list means the input is acceptable
    ///
    /// Strict mode additionally enforces the name character set and the
    /// Taiwanese phone formats.
    pub fn validate(&self, strict: bool) -> Vec<String> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        let name_len = name.chars().count();
        if name_len < NAME_MIN {
            errors.push(format!("Name must be at least {NAME_MIN} characters"));
        } else if name_len > NAME_MAX {
            errors.push(format!("Name must be at most {NAME_MAX} characters"));
        } else if strict && !NAME_PATTERN.is_match(name) {
            errors.push("Name may only contain Chinese characters, letters and spaces".to_string());
        }

        let phone = self.normalized_phone();
        if phone.is_empty() {
            errors.push("Phone number is required".to_string());
        } else if strict && !(MOBILE_PATTERN.is_match(&phone) || LANDLINE_PATTERN.is_match(&phone))
        {
            errors.push(
                "Phone number format is invalid (e.g. 0912345678 or 02-12345678)".to_string(),
            );
        }

        let email = self.email.trim();
        if !email.is_empty() {
            if email.chars().count() > EMAIL_MAX {
                errors.push(format!("Email must be at most {EMAIL_MAX} characters"));
            } else if !EMAIL_PATTERN.is_match(email) {
                errors.push("Email format is invalid".to_string());
            }
        }

        let address_len = self.address.trim().chars().count();
        if address_len < ADDRESS_MIN {
            errors.push(format!("Address must be at least {ADDRESS_MIN} characters"));
        } else if address_len > ADDRESS_MAX {
            errors.push(format!("Address must be at most {ADDRESS_MAX} characters"));
        }

        if self.note.trim().chars().count() > NOTE_MAX {
            errors.push(format!("Note must be at most {NOTE_MAX} characters"));
        }

        errors
    }

    /// Escape every field for storage
    pub fn sanitize(&self) -> Customer {
        Customer {
            name: escape_html(&self.name),
            phone: escape_html(&self.normalized_phone()),
            email: escape_html(&self.email),
            address: escape_html(&self.address),
            note: escape_html(&self.note),
        }
    }

    fn normalized_phone(&self) -> String {
        self.phone.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CustomerInput {
        CustomerInput {
            name: "王小明".to_string(),
            phone: "0912 345 678".to_string(),
            email: "ming@example.com".to_string(),
            address: "台北市信義區松高路 1 號".to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn test_valid_customer() {
        assert!(valid().validate(true).is_empty());
    }

    #[test]
    fn test_collects_all_violations() {
        let input = CustomerInput {
            name: "A".to_string(),
            phone: String::new(),
            email: "not-an-email".to_string(),
            address: "abc".to_string(),
            note: "x".repeat(501),
        };
        let errors = input.validate(true);
        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("Name"));
        assert!(errors[1].contains("Phone"));
        assert!(errors[2].contains("Email"));
        assert!(errors[3].contains("Address"));
        assert!(errors[4].contains("Note"));
    }

    #[test]
    fn test_phone_formats() {
        let mut input = valid();
        for phone in ["0912345678", "02-12345678", "0312345678", "049-1234567"] {
            input.phone = phone.to_string();
            assert!(input.validate(true).is_empty(), "{phone} should pass");
        }
        input.phone = "12345".to_string();
        assert_eq!(input.validate(true).len(), 1);
        // Relaxed mode only requires presence
        assert!(input.validate(false).is_empty());
    }

    #[test]
    fn test_name_charset_only_in_strict_mode() {
        let mut input = valid();
        input.name = "<b>Bob</b>".to_string();
        assert_eq!(input.validate(true).len(), 1);
        assert!(input.validate(false).is_empty());
    }

    #[test]
    fn test_sanitize_escapes_and_strips_phone_spaces() {
        let mut input = valid();
        input.note = "<script>alert(1)</script>".to_string();
        let customer = input.sanitize();
        assert_eq!(customer.phone, "0912345678");
        assert_eq!(customer.note, "&lt;script&gt;alert(1)&lt;&#x2F;script&gt;");
        assert_eq!(customer.name, "王小明");
    }
}
