use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Address, AddressFields};
use crate::storage::AddressStore;
use crate::{EcommerceError, Result};

pub struct AddressService { addresses: Arc<dyn AddressStore> }

impl AddressService {
    pub fn new(addresses: Arc<dyn AddressStore>) -> Self { Self { addresses } }

    pub async fn add(&self, user_id: Uuid, fields: AddressFields) -> Result<Address> {
        let fields = Self::checked(fields)?;
        let address = Address::new(user_id, fields);
        self.addresses.insert_address(&address).await?;
        Ok(address)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Address>> { self.addresses.addresses_for_user(user_id).await }

    pub async fn update(&self, user_id: Uuid, id: Uuid, fields: AddressFields) -> Result<Address> {
        let fields = Self::checked(fields)?;
        self.addresses.update_address(user_id, id, fields).await?.ok_or_else(|| EcommerceError::NotFound("Address not found".into()))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Address> {
        self.addresses.delete_address(user_id, id).await?.ok_or_else(|| EcommerceError::NotFound("Address not found.".into()))
    }

    fn checked(fields: AddressFields) -> Result<AddressFields> {
        let fields = fields.trimmed();
        fields.validate()?;
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn fields(city: &str) -> AddressFields {
        AddressFields { address: " 1 Main St ".into(), city: city.into(), pin_code: "10001".into(), phone: "08012345678".into(), note: "ring twice".into() }
    }

    #[tokio::test]
    async fn test_addresses_are_owner_scoped() {
        let svc = AddressService::new(Arc::new(MemoryStore::new()));
        let owner = Uuid::new_v4();
        let saved = svc.add(owner, fields("Lagos")).await.unwrap();
        assert_eq!(saved.fields.address, "1 Main St");

        let stranger = Uuid::new_v4();
        assert!(matches!(svc.update(stranger, saved.id, fields("Abuja")).await, Err(EcommerceError::NotFound(_))));
        assert!(matches!(svc.delete(stranger, saved.id).await, Err(EcommerceError::NotFound(_))));
        assert!(svc.list(stranger).await.unwrap().is_empty());

        assert_eq!(svc.update(owner, saved.id, fields("Abuja")).await.unwrap().fields.city, "Abuja");
        svc.delete(owner, saved.id).await.unwrap();
        assert!(svc.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_city_rejected() {
        let svc = AddressService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(svc.add(Uuid::new_v4(), fields("   ")).await, Err(EcommerceError::Validation(_))));
    }
}
