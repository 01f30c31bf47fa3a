use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::plan::{LimitedOffer, OfferDetails, PlanDetails, TicketPlanRow};
use crate::tickets::catalog::{
    check_plan_deletable, check_plan_unique, offer_removal, OfferRemoval,
};
use crate::utils::error::AppError;

// Category, then gender restriction (all, female, male), then service
// name, then session count.
const TICKET_PLANS_SQL: &str = r#"
SELECT
    tp.plan_id,
    tp.service_id,
    tp.name,
    tp.service_category,
    tp.gender_restriction,
    tp.total_sessions,
    tp.price,
    tp.validity_days,
    s.name AS service_name,
    s.category AS service_master_category,
    s.price AS service_unit_price
FROM ticket_plans tp
JOIN services s ON tp.service_id = s.service_id
WHERE tp.is_active = TRUE
  AND ($1::uuid IS NULL OR tp.service_id = $1)
ORDER BY
    tp.service_category,
    CASE tp.gender_restriction
        WHEN 'all' THEN 1
        WHEN 'female' THEN 2
        WHEN 'male' THEN 3
        ELSE 4
    END,
    s.name,
    tp.total_sessions
"#;

const LIMITED_OFFERS_SQL: &str = r#"
SELECT
    lo.offer_id,
    lo.offer_type,
    lo.name,
    lo.description,
    lo.category,
    lo.base_plan_id,
    lo.duration_minutes,
    lo.original_price,
    lo.special_price,
    lo.total_sessions,
    lo.validity_days,
    lo.start_date,
    lo.end_date,
    lo.max_sales,
    lo.current_sales,
    lo.is_active,
    lo.created_at,
    tp.name AS base_plan_name,
    tp.gender_restriction AS base_gender_restriction,
    s.name AS base_service_name
FROM limited_offers lo
LEFT JOIN ticket_plans tp ON lo.base_plan_id = tp.plan_id
LEFT JOIN services s ON tp.service_id = s.service_id
WHERE lo.is_active = TRUE
ORDER BY lo.created_at DESC
"#;

pub async fn list_ticket_plans(
    pool: &PgPool,
    service_id: Option<Uuid>,
) -> Result<Vec<TicketPlanRow>, sqlx::Error> {
    sqlx::query_as::<_, TicketPlanRow>(TICKET_PLANS_SQL)
        .bind(service_id)
        .fetch_all(pool)
        .await
}

pub async fn list_limited_offers(pool: &PgPool) -> Result<Vec<LimitedOffer>, sqlx::Error> {
    sqlx::query_as::<_, LimitedOffer>(LIMITED_OFFERS_SQL)
        .fetch_all(pool)
        .await
}

async fn find_matching_plan(
    conn: &mut PgConnection,
    service_id: Uuid,
    details: &PlanDetails,
    excluding: Option<Uuid>,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT plan_id FROM ticket_plans
        WHERE service_id = $1
          AND total_sessions = $2
          AND gender_restriction = $3
          AND service_category = $4
          AND ($5::uuid IS NULL OR plan_id <> $5)
        LIMIT 1
        "#,
    )
    .bind(service_id)
    .bind(details.total_sessions)
    .bind(details.gender_restriction.as_str())
    .bind(&details.service_category)
    .bind(excluding)
    .fetch_optional(conn)
    .await
}

pub async fn create_ticket_plan(
    pool: &PgPool,
    service_id: Uuid,
    details: &PlanDetails,
) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await?;

    let service_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM services WHERE service_id = $1)")
            .bind(service_id)
            .fetch_one(&mut *tx)
            .await?;
    if !service_exists {
        return Err(AppError::ValidationError(format!(
            "Service {} does not exist",
            service_id
        )));
    }

    check_plan_unique(find_matching_plan(&mut *tx, service_id, details, None).await?)?;

    let plan_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO ticket_plans (
            plan_id, service_id, name, service_category, gender_restriction,
            total_sessions, price, validity_days
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(plan_id)
    .bind(service_id)
    .bind(&details.name)
    .bind(&details.service_category)
    .bind(details.gender_restriction.as_str())
    .bind(details.total_sessions)
    .bind(details.price)
    .bind(details.validity_days)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(%plan_id, %service_id, "Ticket plan created");
    Ok(plan_id)
}

pub async fn update_ticket_plan(
    pool: &PgPool,
    plan_id: Uuid,
    details: &PlanDetails,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let service_id: Uuid =
        sqlx::query_scalar("SELECT service_id FROM ticket_plans WHERE plan_id = $1 FOR UPDATE")
            .bind(plan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket plan {} not found", plan_id)))?;

    check_plan_unique(find_matching_plan(&mut *tx, service_id, details, Some(plan_id)).await?)?;

    sqlx::query(
        r#"
        UPDATE ticket_plans
        SET name = $2,
            service_category = $3,
            gender_restriction = $4,
            total_sessions = $5,
            price = $6,
            validity_days = $7
        WHERE plan_id = $1
        "#,
    )
    .bind(plan_id)
    .bind(&details.name)
    .bind(&details.service_category)
    .bind(details.gender_restriction.as_str())
    .bind(details.total_sessions)
    .bind(details.price)
    .bind(details.validity_days)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(%plan_id, "Ticket plan updated");
    Ok(())
}

pub async fn delete_ticket_plan(pool: &PgPool, plan_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let sold: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_tickets WHERE plan_id = $1")
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;
    let linked: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM limited_offers WHERE base_plan_id = $1")
            .bind(plan_id)
            .fetch_one(&mut *tx)
            .await?;
    check_plan_deletable(sold, linked)?;

    let deleted = sqlx::query("DELETE FROM ticket_plans WHERE plan_id = $1")
        .bind(plan_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Ticket plan {} not found", plan_id)));
    }

    tx.commit().await?;
    tracing::info!(%plan_id, "Ticket plan deleted");
    Ok(())
}

async fn check_base_plan(conn: &mut PgConnection, details: &OfferDetails) -> Result<(), AppError> {
    let Some(base_plan_id) = details.base_plan_id else {
        return Ok(());
    };
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM ticket_plans WHERE plan_id = $1)")
            .bind(base_plan_id)
            .fetch_one(conn)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "Base plan {} does not exist",
            base_plan_id
        )))
    }
}

pub async fn create_limited_offer(pool: &PgPool, details: &OfferDetails) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await?;
    check_base_plan(&mut *tx, details).await?;

    let offer_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO limited_offers (
            offer_id, offer_type, name, description, category, base_plan_id,
            duration_minutes, original_price, special_price, total_sessions,
            validity_days, start_date, end_date, max_sales, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(offer_id)
    .bind(details.offer_type.as_str())
    .bind(&details.name)
    .bind(&details.description)
    .bind(&details.category)
    .bind(details.base_plan_id)
    .bind(details.duration_minutes)
    .bind(details.original_price)
    .bind(details.special_price)
    .bind(details.total_sessions)
    .bind(details.validity_days)
    .bind(details.start_date)
    .bind(details.end_date)
    .bind(details.max_sales)
    .bind(details.is_active)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(%offer_id, offer_type = details.offer_type.as_str(), "Limited offer created");
    Ok(offer_id)
}

pub async fn update_limited_offer(
    pool: &PgPool,
    offer_id: Uuid,
    details: &OfferDetails,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    check_base_plan(&mut *tx, details).await?;

    let updated = sqlx::query(
        r#"
        UPDATE limited_offers
        SET offer_type = $2,
            name = $3,
            description = $4,
            category = $5,
            base_plan_id = $6,
            duration_minutes = $7,
            original_price = $8,
            special_price = $9,
            total_sessions = $10,
            validity_days = $11,
            start_date = $12,
            end_date = $13,
            max_sales = $14,
            is_active = $15
        WHERE offer_id = $1
        "#,
    )
    .bind(offer_id)
    .bind(details.offer_type.as_str())
    .bind(&details.name)
    .bind(&details.description)
    .bind(&details.category)
    .bind(details.base_plan_id)
    .bind(details.duration_minutes)
    .bind(details.original_price)
    .bind(details.special_price)
    .bind(details.total_sessions)
    .bind(details.validity_days)
    .bind(details.start_date)
    .bind(details.end_date)
    .bind(details.max_sales)
    .bind(details.is_active)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound(format!("Limited offer {} not found", offer_id)));
    }

    tx.commit().await?;
    tracing::info!(%offer_id, "Limited offer updated");
    Ok(())
}

/// Deletes an unsold offer outright; a sold one is only deactivated so
/// its purchases keep resolving.
pub async fn remove_limited_offer(pool: &PgPool, offer_id: Uuid) -> Result<OfferRemoval, AppError> {
    let mut tx = pool.begin().await?;

    let purchases: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM limited_ticket_purchases WHERE offer_id = $1")
            .bind(offer_id)
            .fetch_one(&mut *tx)
            .await?;

    let removal = offer_removal(purchases);
    let sql = match removal {
        OfferRemoval::Deactivate => "UPDATE limited_offers SET is_active = FALSE WHERE offer_id = $1",
        OfferRemoval::Delete => "DELETE FROM limited_offers WHERE offer_id = $1",
    };
    let affected = sqlx::query(sql)
        .bind(offer_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(AppError::NotFound(format!("Limited offer {} not found", offer_id)));
    }

    tx.commit().await?;
    tracing::info!(%offer_id, purchases, ?removal, "Limited offer removed");
    Ok(removal)
}
