use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::InventoryLedger;
use crate::schema::product_variants;

use super::order_repo::DieselTx;

impl InventoryLedger for DieselTx<'_> {
    fn reserve(&mut self, variant_id: Uuid, quantity: i32) -> Result<i32, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity);
        }

        // Check and decrement in one statement; a concurrent reservation on the
        // same row waits for our row lock and then re-evaluates the filter.
        let remaining = diesel::update(
            product_variants::table
                .filter(product_variants::id.eq(variant_id))
                .filter(product_variants::count.ge(quantity)),
        )
        .set(product_variants::count.eq(product_variants::count - quantity))
        .returning(product_variants::count)
        .get_result::<i32>(self.conn)
        .optional()?;

        if let Some(remaining) = remaining {
            return Ok(remaining);
        }

        let available = product_variants::table
            .find(variant_id)
            .select(product_variants::count)
            .first::<i32>(self.conn)
            .optional()?;
        match available {
            Some(available) => Err(DomainError::InsufficientStock { available }),
            None => Err(DomainError::ProductOrVariantNotFound),
        }
    }

    fn release(&mut self, variant_id: Uuid, quantity: i32) -> Result<i32, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity);
        }

        diesel::update(product_variants::table.find(variant_id))
            .set(product_variants::count.eq(product_variants::count + quantity))
            .returning(product_variants::count)
            .get_result::<i32>(self.conn)
            .optional()?
            .ok_or(DomainError::ProductOrVariantNotFound)
    }
}
