use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ticket::{LimitedPurchase, LimitedTicketRow, RegularTicketRow};

const REGULAR_TICKETS_SQL: &str = r#"
SELECT
    ct.customer_ticket_id,
    ct.customer_id,
    ct.plan_id,
    ct.sessions_remaining,
    ct.purchase_date,
    ct.expiry_date,
    ct.purchase_price,
    COALESCE(
        (SELECT SUM(tpay.amount_paid)
           FROM ticket_payments tpay
          WHERE tpay.customer_ticket_id = ct.customer_ticket_id
            AND tpay.ticket_type = 'regular'),
        0
    ) AS total_paid,
    tp.name AS plan_name,
    tp.price AS plan_price,
    tp.total_sessions,
    tp.validity_days,
    s.service_id,
    s.name AS service_name,
    s.category AS service_category,
    s.duration_minutes
FROM customer_tickets ct
JOIN ticket_plans tp ON ct.plan_id = tp.plan_id
JOIN services s ON tp.service_id = s.service_id
WHERE ct.customer_id = $1
ORDER BY ct.purchase_date DESC
"#;

const LIMITED_TICKETS_SQL: &str = r#"
SELECT
    ltp.purchase_id,
    ltp.customer_id,
    ltp.offer_id,
    ltp.sessions_remaining,
    ltp.purchase_date,
    ltp.expiry_date,
    ltp.purchase_price,
    COALESCE(
        (SELECT SUM(tpay.amount_paid)
           FROM ticket_payments tpay
          WHERE tpay.customer_ticket_id = ltp.purchase_id
            AND tpay.ticket_type = 'limited'),
        0
    ) AS total_paid,
    lo.name AS offer_name,
    lo.special_price,
    lo.total_sessions,
    lo.validity_days,
    lo.duration_minutes AS offer_duration_minutes,
    lo.base_plan_id,
    tp.name AS base_plan_name,
    tp.service_id AS base_plan_service_id,
    s.service_id,
    s.name AS service_name,
    s.category AS service_category,
    s.duration_minutes AS service_duration_minutes
FROM limited_ticket_purchases ltp
JOIN limited_offers lo ON ltp.offer_id = lo.offer_id
LEFT JOIN ticket_plans tp ON lo.base_plan_id = tp.plan_id
LEFT JOIN services s ON tp.service_id = s.service_id
WHERE ltp.customer_id = $1
ORDER BY ltp.purchase_date DESC
"#;

const ACTIVE_LIMITED_PURCHASES_SQL: &str = r#"
SELECT
    ltp.purchase_id,
    ltp.offer_id,
    lo.name AS offer_name,
    lo.description,
    s.service_id,
    COALESCE(s.name, tp.name) AS service_name,
    lo.base_plan_id,
    tp.name AS base_plan_name,
    lo.total_sessions,
    ltp.sessions_remaining,
    ltp.purchase_price,
    lo.special_price,
    ltp.purchase_date,
    ltp.expiry_date,
    ltp.is_active
FROM limited_ticket_purchases ltp
JOIN limited_offers lo ON ltp.offer_id = lo.offer_id
LEFT JOIN ticket_plans tp ON lo.base_plan_id = tp.plan_id
LEFT JOIN services s ON tp.service_id = s.service_id
WHERE ltp.customer_id = $1
  AND ltp.is_active = TRUE
  AND ltp.sessions_remaining > 0
  AND ltp.expiry_date >= $2
ORDER BY ltp.expiry_date ASC
"#;

pub async fn fetch_regular_tickets(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Vec<RegularTicketRow>, sqlx::Error> {
    sqlx::query_as::<_, RegularTicketRow>(REGULAR_TICKETS_SQL)
        .bind(customer_id)
        .fetch_all(pool)
        .await
}

pub async fn fetch_limited_tickets(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Vec<LimitedTicketRow>, sqlx::Error> {
    sqlx::query_as::<_, LimitedTicketRow>(LIMITED_TICKETS_SQL)
        .bind(customer_id)
        .fetch_all(pool)
        .await
}

/// Limited purchases that can still be booked on `today`, soonest to
/// expire first.
pub async fn fetch_active_limited_purchases(
    pool: &PgPool,
    customer_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<LimitedPurchase>, sqlx::Error> {
    sqlx::query_as::<_, LimitedPurchase>(ACTIVE_LIMITED_PURCHASES_SQL)
        .bind(customer_id)
        .bind(today)
        .fetch_all(pool)
        .await
}
