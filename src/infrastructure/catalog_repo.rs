use std::collections::{HashMap, HashSet};

use bigdecimal::BigDecimal;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::catalog::{
    CategoryView, LikeOutcome, NotificationView, ProductView, VariantView,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, NotificationRepository};
use crate::schema::{
    categories, like_marks, notification_reads, notifications, product_variants, products,
};

use super::models::{
    CategoryRow, NewLikeMarkRow, NewNotificationReadRow, NewNotificationRow, NewProductRow,
    NotificationRow, ProductRow, VariantRow,
};
use super::order_repo::DieselStore;

/// Attaches sizes and the viewer's like flag to product rows, keeping their order.
fn assemble(
    conn: &mut PgConnection,
    rows: Vec<ProductRow>,
    viewer: Option<&str>,
) -> QueryResult<Vec<ProductView>> {
    let variants = VariantRow::belonging_to(&rows)
        .select(VariantRow::as_select())
        .order(product_variants::label.asc())
        .load(conn)?
        .grouped_by(&rows);

    let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let liked: HashSet<Uuid> = match viewer {
        Some(user_id) => like_marks::table
            .filter(like_marks::user_id.eq(user_id))
            .filter(like_marks::is_like.eq(true))
            .filter(like_marks::product_id.eq_any(ids))
            .select(like_marks::product_id)
            .load::<Uuid>(conn)?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    Ok(rows
        .into_iter()
        .zip(variants)
        .map(|(product, sizes)| ProductView {
            liked_by_user: liked.contains(&product.id),
            id: product.id,
            category_id: product.category_id,
            name: product.name,
            price: product.price,
            description: product.description,
            image: product.image,
            sizes: sizes
                .into_iter()
                .map(|v| VariantView {
                    id: v.id,
                    label: v.label,
                    count: v.count,
                })
                .collect(),
        })
        .collect())
}

impl CatalogRepository for DieselStore {
    fn list_categories(&self, viewer: Option<&str>) -> Result<Vec<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = categories::table
            .select(CategoryRow::as_select())
            .order(categories::name.asc())
            .load(&mut conn)?;
        let product_rows = ProductRow::belonging_to(&rows)
            .select(ProductRow::as_select())
            .order(products::name.asc())
            .load(&mut conn)?;

        let mut by_category: HashMap<Uuid, Vec<ProductView>> = HashMap::new();
        for product in assemble(&mut conn, product_rows, viewer)? {
            by_category.entry(product.category_id).or_default().push(product);
        }

        Ok(rows
            .into_iter()
            .map(|c| CategoryView {
                products: by_category.remove(&c.id).unwrap_or_default(),
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    fn find_category(
        &self,
        id: Uuid,
        viewer: Option<&str>,
    ) -> Result<Option<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(category) = categories::table
            .find(id)
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let product_rows = products::table
            .filter(products::category_id.eq(category.id))
            .select(ProductRow::as_select())
            .order(products::name.asc())
            .load(&mut conn)?;

        Ok(Some(CategoryView {
            products: assemble(&mut conn, product_rows, viewer)?,
            id: category.id,
            name: category.name,
        }))
    }

    fn list_products(&self, viewer: Option<&str>) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .select(ProductRow::as_select())
            .order(products::name.asc())
            .load(&mut conn)?;
        Ok(assemble(&mut conn, rows, viewer)?)
    }

    fn find_product(
        &self,
        id: Uuid,
        viewer: Option<&str>,
    ) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(assemble(&mut conn, rows, viewer)?.pop())
    }

    fn liked_products(&self, user_id: &str) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .inner_join(like_marks::table)
            .filter(like_marks::user_id.eq(user_id))
            .filter(like_marks::is_like.eq(true))
            .select(ProductRow::as_select())
            .order(products::name.asc())
            .load(&mut conn)?;
        Ok(assemble(&mut conn, rows, Some(user_id))?)
    }

    fn toggle_like(&self, user_id: &str, product_id: Uuid) -> Result<LikeOutcome, DomainError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| {
            products::table
                .find(product_id)
                .select(products::id)
                .first::<Uuid>(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Product"))?;

            let mark = like_marks::table
                .filter(like_marks::product_id.eq(product_id))
                .filter(like_marks::user_id.eq(user_id))
                .select(like_marks::is_like)
                .for_update()
                .first::<bool>(conn)
                .optional()?;

            match mark {
                Some(is_like) => {
                    diesel::update(
                        like_marks::table
                            .filter(like_marks::product_id.eq(product_id))
                            .filter(like_marks::user_id.eq(user_id)),
                    )
                    .set(like_marks::is_like.eq(!is_like))
                    .execute(conn)?;
                    Ok(LikeOutcome {
                        is_like: !is_like,
                        created: false,
                    })
                }
                None => {
                    diesel::insert_into(like_marks::table)
                        .values(&NewLikeMarkRow {
                            product_id,
                            user_id,
                            is_like: true,
                        })
                        .execute(conn)?;
                    Ok(LikeOutcome {
                        is_like: true,
                        created: true,
                    })
                }
            }
        })
    }
}

impl NotificationRepository for DieselStore {
    fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = notifications::table
            .select(NotificationRow::as_select())
            .order(notifications::created_at.desc())
            .load(&mut conn)?;
        let read: HashSet<Uuid> = notification_reads::table
            .filter(notification_reads::user_id.eq(user_id))
            .select(notification_reads::notification_id)
            .load::<Uuid>(&mut conn)?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .map(|n| NotificationView {
                has_viewed: read.contains(&n.id),
                id: n.id,
                title: n.title,
                message: n.message,
                created_at: n.created_at,
            })
            .collect())
    }

    fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        notifications::table
            .find(notification_id)
            .select(notifications::id)
            .first::<Uuid>(&mut conn)
            .optional()?
            .ok_or(DomainError::NotFound("Notification"))?;

        diesel::insert_into(notification_reads::table)
            .values(&NewNotificationReadRow {
                notification_id,
                user_id,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }
}

// ── Seeding ───────────────────────────────────────────────────────────────────

impl DieselStore {
    pub fn create_category(&self, name: &str) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        let id = Uuid::new_v4();
        diesel::insert_into(categories::table)
            .values(&CategoryRow {
                id,
                name: name.to_string(),
            })
            .execute(&mut conn)?;
        Ok(id)
    }

    pub fn create_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: BigDecimal,
    ) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        let id = Uuid::new_v4();
        diesel::insert_into(products::table)
            .values(&NewProductRow {
                id,
                category_id,
                name,
                price,
                description: "",
                image: None,
            })
            .execute(&mut conn)?;
        Ok(id)
    }

    pub fn create_variant(
        &self,
        product_id: Uuid,
        label: &str,
        count: i32,
    ) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        let id = Uuid::new_v4();
        diesel::insert_into(product_variants::table)
            .values(&VariantRow {
                id,
                product_id,
                label: label.to_string(),
                count,
            })
            .execute(&mut conn)?;
        Ok(id)
    }

    pub fn create_notification(&self, title: &str, message: &str) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        let id = Uuid::new_v4();
        diesel::insert_into(notifications::table)
            .values(&NewNotificationRow { id, title, message })
            .execute(&mut conn)?;
        Ok(id)
    }

    pub fn variant_count(&self, variant_id: Uuid) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;
        product_variants::table
            .find(variant_id)
            .select(product_variants::count)
            .first::<i32>(&mut conn)
            .optional()?
            .ok_or(DomainError::ProductOrVariantNotFound)
    }
}
