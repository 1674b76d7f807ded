use crate::{
    entities::{address, Address, AddressType},
    errors::ServiceError,
    identity::CartOwner,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Owner-scoped address book.
///
/// Default flipping is an explicit operation here, not a save hook: when
/// an address becomes the default, the owner's other defaults of the same
/// type are unset in the same transaction.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn owner_filter(
        query: sea_orm::Select<Address>,
        owner: &CartOwner,
    ) -> sea_orm::Select<Address> {
        match owner {
            CartOwner::User(id) => query.filter(address::Column::UserId.eq(*id)),
            CartOwner::Session(token) => query
                .filter(address::Column::SessionId.eq(token.clone()))
                .filter(address::Column::UserId.is_null()),
        }
    }

    pub async fn list(&self, owner: &CartOwner) -> Result<Vec<address::Model>, ServiceError> {
        Ok(Self::owner_filter(Address::find(), owner)
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(
        &self,
        owner: &CartOwner,
        address_id: Uuid,
    ) -> Result<address::Model, ServiceError> {
        Self::owner_filter(Address::find(), owner)
            .filter(address::Column::Id.eq(address_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        owner: &CartOwner,
        input: AddressInput,
    ) -> Result<address::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let (user_id, session_id) = match owner {
            CartOwner::User(id) => (Some(*id), None),
            CartOwner::Session(token) => (None, Some(token.clone())),
        };

        if input.is_default {
            self.unset_other_defaults(&txn, owner, input.address_type, None)
                .await?;
        }

        let now = Utc::now();
        let address = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            session_id: Set(session_id),
            address_type: Set(input.address_type),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            phone: Set(input.phone),
            street_address: Set(input.street_address),
            street_address2: Set(input.street_address2),
            city: Set(input.city),
            county: Set(input.county),
            postcode: Set(input.postcode),
            country: Set(input.country.unwrap_or_else(|| "United Kingdom".to_string())),
            is_default: Set(input.is_default),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let address = address.insert(&txn).await?;
        txn.commit().await?;

        info!(address_id = %address.id, "address created");
        Ok(address)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        owner: &CartOwner,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<address::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Self::owner_filter(Address::find(), owner)
            .filter(address::Column::Id.eq(address_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))?;

        if input.is_default && !existing.is_default {
            self.unset_other_defaults(&txn, owner, input.address_type, Some(existing.id))
                .await?;
        }

        let mut active: address::ActiveModel = existing.into();
        active.address_type = Set(input.address_type);
        active.first_name = Set(input.first_name);
        active.last_name = Set(input.last_name);
        active.phone = Set(input.phone);
        active.street_address = Set(input.street_address);
        active.street_address2 = Set(input.street_address2);
        active.city = Set(input.city);
        active.county = Set(input.county);
        if let Some(country) = input.country {
            active.country = Set(country);
        }
        active.is_default = Set(input.is_default);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, owner: &CartOwner, address_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(owner, address_id).await?;
        Address::delete_by_id(existing.id).exec(&*self.db).await?;
        Ok(())
    }

    async fn unset_other_defaults<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        owner: &CartOwner,
        address_type: AddressType,
        keep: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Address::find()
            .filter(address::Column::AddressType.eq(address_type))
            .filter(address::Column::IsDefault.eq(true));
        query = match owner {
            CartOwner::User(id) => query.filter(address::Column::UserId.eq(*id)),
            CartOwner::Session(token) => query
                .filter(address::Column::SessionId.eq(token.clone()))
                .filter(address::Column::UserId.is_null()),
        };

        for found in query.all(conn).await? {
            if keep == Some(found.id) {
                continue;
            }
            let mut active: address::ActiveModel = found.into();
            active.is_default = Set(false);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct AddressInput {
    pub address_type: AddressType,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub street_address: String,
    pub street_address2: Option<String>,
    pub city: String,
    pub county: Option<String>,
    pub postcode: String,
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}
