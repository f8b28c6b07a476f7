//! Saved shipping addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::order::ShippingAddress;

static PIN_CODE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| regex::Regex::new(r"^[0-9]{5,6}$").unwrap());
static PHONE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| regex::Regex::new(r"^[0-9]{11}$").unwrap());

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub fields: AddressFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressFields {
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(regex(path = "PIN_CODE", message = "pinCode must be 5 or 6 digits"))]
    pub pin_code: String,
    #[validate(regex(path = "PHONE", message = "phone must be 11 digits"))]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "note is required and at most 200 characters"))]
    pub note: String,
}

impl AddressFields {
    pub fn trimmed(self) -> Self {
        Self {
            address: self.address.trim().to_string(), city: self.city.trim().to_string(),
            pin_code: self.pin_code.trim().to_string(), phone: self.phone.trim().to_string(), note: self.note.trim().to_string(),
        }
    }
}

impl Address {
    pub fn new(user_id: Uuid, fields: AddressFields) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, fields, created_at: now, updated_at: now }
    }

    pub fn replace(&mut self, fields: AddressFields) {
        self.fields = fields;
        self.updated_at = Utc::now();
    }

    /// Copy suitable for freezing into an order.
    pub fn snapshot(&self) -> ShippingAddress {
        ShippingAddress {
            address_id: Some(self.id.to_string()), address: self.fields.address.clone(), city: self.fields.city.clone(),
            phone: self.fields.phone.clone(), pin_code: self.fields.pin_code.clone(), note: Some(self.fields.note.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> AddressFields {
        AddressFields { address: "1 Main St".into(), city: "Lagos".into(), pin_code: "100001".into(), phone: "08012345678".into(), note: "gate".into() }
    }

    #[test]
    fn test_valid_address() {
        assert!(fields().validate().is_ok());
    }

    #[test]
    fn test_pin_and_phone_patterns() {
        let mut f = fields();
        f.pin_code = "12a45".into();
        assert!(f.validate().is_err());
        let mut f = fields();
        f.phone = "123".into();
        assert!(f.validate().is_err());
        let mut f = fields();
        f.note = "x".repeat(201);
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_snapshot_carries_id() {
        let a = Address::new(Uuid::new_v4(), fields());
        assert_eq!(a.snapshot().address_id, Some(a.id.to_string()));
    }
}
