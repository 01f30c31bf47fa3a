//! Ticket sales and installments. Each call runs in one transaction; an
//! early return drops the transaction and rolls it back.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::TicketSource;
use crate::models::plan::{OfferForSale, PlanForSale};
use crate::models::purchase::{AdditionalPayment, PaymentReceipt, PurchaseOrder, PurchaseReceipt};
use crate::tickets::purchase::{
    check_installment, schedule_sale, split_tender, PaymentMethod, SaleSchedule, SaleTerms,
    TenderSplit,
};
use crate::tickets::TicketError;
use crate::utils::error::AppError;

const PLAN_FOR_SALE_SQL: &str = r#"
SELECT tp.plan_id, tp.name, tp.price, tp.total_sessions, tp.validity_days,
       s.service_id, s.name AS service_name
FROM ticket_plans tp
JOIN services s ON tp.service_id = s.service_id
WHERE tp.plan_id = $1
"#;

const OFFER_FOR_SALE_SQL: &str = r#"
SELECT lo.offer_id, lo.name, lo.special_price, lo.total_sessions, lo.validity_days,
       lo.base_plan_id, tp.name AS base_plan_name,
       tp.service_id, s.name AS service_name
FROM limited_offers lo
LEFT JOIN ticket_plans tp ON lo.base_plan_id = tp.plan_id
LEFT JOIN services s ON tp.service_id = s.service_id
WHERE lo.offer_id = $1
FOR UPDATE OF lo
"#;

/// One row of the `payments` register ledger.
struct LedgerEntry<'a> {
    payment_id: Uuid,
    customer_id: Uuid,
    staff_id: Uuid,
    service_id: Option<Uuid>,
    service_name: &'a str,
    service_price: Decimal,
    payment_type: &'static str,
    ticket_id: Option<Uuid>,
    limited_offer_id: Option<Uuid>,
    sessions_at_payment: i32,
    balance_at_payment: Decimal,
    is_ticket_purchase: bool,
    is_immediate_use: bool,
    payment_amount: Decimal,
    payment_method: PaymentMethod,
    tender: TenderSplit,
    notes: Option<&'a str>,
    related_payment_id: Option<Uuid>,
}

impl<'a> LedgerEntry<'a> {
    /// The zero-priced row recording a session used at the moment of sale.
    fn immediate_use(&self, service_name: &'a str) -> LedgerEntry<'a> {
        LedgerEntry {
            payment_id: Uuid::new_v4(),
            customer_id: self.customer_id,
            staff_id: self.staff_id,
            service_id: self.service_id,
            service_name,
            service_price: Decimal::ZERO,
            payment_type: self.payment_type,
            ticket_id: self.ticket_id,
            limited_offer_id: self.limited_offer_id,
            sessions_at_payment: self.sessions_at_payment,
            balance_at_payment: self.balance_at_payment,
            is_ticket_purchase: false,
            is_immediate_use: true,
            payment_amount: Decimal::ZERO,
            payment_method: PaymentMethod::Cash,
            tender: TenderSplit {
                cash: Decimal::ZERO,
                card: Decimal::ZERO,
            },
            notes: None,
            related_payment_id: Some(self.payment_id),
        }
    }
}

async fn insert_ledger_entry(
    conn: &mut PgConnection,
    entry: &LedgerEntry<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            payment_id, customer_id, staff_id, service_id, service_name, service_price,
            payment_type, ticket_id, limited_offer_id,
            ticket_sessions_at_payment, ticket_balance_at_payment,
            is_ticket_purchase, is_remaining_payment, is_immediate_use,
            payment_amount, total_amount, payment_method, cash_amount, card_amount,
            notes, related_payment_id
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, FALSE, $13,
            $14, $14, $15, $16, $17, $18, $19
        )
        "#,
    )
    .bind(entry.payment_id)
    .bind(entry.customer_id)
    .bind(entry.staff_id)
    .bind(entry.service_id)
    .bind(entry.service_name)
    .bind(entry.service_price)
    .bind(entry.payment_type)
    .bind(entry.ticket_id)
    .bind(entry.limited_offer_id)
    .bind(entry.sessions_at_payment)
    .bind(entry.balance_at_payment)
    .bind(entry.is_ticket_purchase)
    .bind(entry.is_immediate_use)
    .bind(entry.payment_amount)
    .bind(entry.payment_method.as_str())
    .bind(entry.tender.cash)
    .bind(entry.tender.card)
    .bind(entry.notes)
    .bind(entry.related_payment_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_installment(
    conn: &mut PgConnection,
    source: TicketSource,
    ticket_id: Uuid,
    amount: Decimal,
    method: PaymentMethod,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO ticket_payments (
            payment_id, ticket_type, customer_ticket_id, payment_date, amount_paid,
            payment_method, notes
        ) VALUES ($1, $2, $3, NOW(), $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(source.as_str())
    .bind(ticket_id)
    .bind(amount)
    .bind(method.as_str())
    .bind(notes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn increment_visit_count(
    conn: &mut PgConnection,
    customer_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE customers SET visit_count = visit_count + 1, updated_at = NOW() \
         WHERE customer_id = $1",
    )
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Sells a regular ticket on `purchase_date`. The expiry date is computed
/// here once and stored.
pub async fn purchase_regular_ticket(
    pool: &PgPool,
    order: &PurchaseOrder,
    purchase_date: NaiveDate,
) -> Result<PurchaseReceipt, AppError> {
    let mut tx = pool.begin().await?;

    let plan = sqlx::query_as::<_, PlanForSale>(PLAN_FOR_SALE_SQL)
        .bind(order.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Ticket plan '{}' was not found", order.product_id))
        })?;

    let SaleSchedule {
        full_price,
        remaining_amount,
        expiry_date,
        total_sessions,
        sessions_remaining,
    } = schedule_sale(
        &SaleTerms::for_plan(plan.price, plan.total_sessions, plan.validity_days),
        order.purchase_price,
        order.payment_amount,
        order.use_immediately,
        purchase_date,
    )?;
    let ticket_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO customer_tickets (
            customer_ticket_id, customer_id, plan_id, purchase_date, expiry_date,
            sessions_remaining, purchase_price
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(ticket_id)
    .bind(order.customer_id)
    .bind(plan.plan_id)
    .bind(purchase_date)
    .bind(expiry_date)
    .bind(sessions_remaining)
    .bind(full_price)
    .execute(&mut *tx)
    .await?;

    if order.payment_amount > Decimal::ZERO {
        insert_installment(
            &mut tx,
            TicketSource::Regular,
            ticket_id,
            order.payment_amount,
            order.payment_method,
            order.notes.as_deref(),
        )
        .await?;
    }

    let ledger_name = format!("{}(回数券購入)", plan.name);
    let purchase_entry = LedgerEntry {
        payment_id: Uuid::new_v4(),
        customer_id: order.customer_id,
        staff_id: order.staff_id,
        service_id: Some(plan.service_id),
        service_name: &ledger_name,
        service_price: full_price,
        payment_type: "ticket",
        ticket_id: Some(ticket_id),
        limited_offer_id: None,
        sessions_at_payment: sessions_remaining,
        balance_at_payment: remaining_amount,
        is_ticket_purchase: true,
        is_immediate_use: false,
        payment_amount: order.payment_amount,
        payment_method: order.payment_method,
        tender: split_tender(
            order.payment_method,
            order.payment_amount,
            order.cash_amount,
            order.card_amount,
        ),
        notes: order.notes.as_deref(),
        related_payment_id: order.related_payment_id,
    };
    insert_ledger_entry(&mut tx, &purchase_entry).await?;

    if order.use_immediately {
        insert_ledger_entry(&mut tx, &purchase_entry.immediate_use(&plan.service_name)).await?;
        increment_visit_count(&mut tx, order.customer_id).await?;
    }

    tx.commit().await?;

    info!(
        customer_id = %order.customer_id,
        ticket_id = %ticket_id,
        plan_id = %plan.plan_id,
        %expiry_date,
        "Sold regular ticket"
    );

    Ok(PurchaseReceipt {
        customer_ticket_id: ticket_id,
        payment_id: purchase_entry.payment_id,
        plan_name: plan.name.clone(),
        service_name: Some(plan.service_name.clone()),
        total_sessions,
        sessions_remaining,
        full_price,
        paid_amount: order.payment_amount,
        remaining_amount,
        purchase_date,
        expiry_date,
        is_fully_paid: remaining_amount.is_zero(),
        used_immediately: order.use_immediately,
    })
}

/// Sells a ticket under a limited offer. Only offers templated on a ticket
/// plan can be sold this way.
pub async fn purchase_limited_ticket(
    pool: &PgPool,
    order: &PurchaseOrder,
    purchase_date: NaiveDate,
) -> Result<PurchaseReceipt, AppError> {
    let mut tx = pool.begin().await?;

    let offer = sqlx::query_as::<_, OfferForSale>(OFFER_FOR_SALE_SQL)
        .bind(order.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Limited offer '{}' was not found", order.product_id))
        })?;

    if offer.base_plan_id.is_none() {
        return Err(AppError::ValidationError(format!(
            "Limited offer '{}' is not based on a ticket plan",
            offer.name
        )));
    }
    let SaleSchedule {
        full_price,
        remaining_amount,
        expiry_date,
        total_sessions,
        sessions_remaining,
    } = schedule_sale(
        &SaleTerms::for_offer(offer.special_price, offer.total_sessions, offer.validity_days),
        order.purchase_price,
        order.payment_amount,
        order.use_immediately,
        purchase_date,
    )
    .map_err(|err| match err {
        TicketError::InvalidArgument(msg) => {
            AppError::ValidationError(format!("Limited offer '{}': {}", offer.name, msg))
        }
        other => other.into(),
    })?;
    let purchase_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO limited_ticket_purchases (
            purchase_id, offer_id, customer_id, purchase_date, expiry_date,
            sessions_remaining, purchase_price, payment_method
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(purchase_id)
    .bind(offer.offer_id)
    .bind(order.customer_id)
    .bind(purchase_date)
    .bind(expiry_date)
    .bind(sessions_remaining)
    .bind(full_price)
    .bind(order.payment_method.as_str())
    .execute(&mut *tx)
    .await?;

    if order.payment_amount > Decimal::ZERO {
        insert_installment(
            &mut tx,
            TicketSource::Limited,
            purchase_id,
            order.payment_amount,
            order.payment_method,
            Some(order.notes.as_deref().unwrap_or("期間限定オファー購入")),
        )
        .await?;
    }

    let ledger_name = format!("{}(期間限定購入)", offer.name);
    let usage_name = offer
        .service_name
        .clone()
        .or_else(|| offer.base_plan_name.clone())
        .unwrap_or_else(|| offer.name.clone());
    let purchase_entry = LedgerEntry {
        payment_id: Uuid::new_v4(),
        customer_id: order.customer_id,
        staff_id: order.staff_id,
        service_id: offer.service_id,
        service_name: &ledger_name,
        service_price: full_price,
        payment_type: "limited_offer",
        ticket_id: Some(purchase_id),
        limited_offer_id: Some(offer.offer_id),
        sessions_at_payment: sessions_remaining,
        balance_at_payment: remaining_amount,
        is_ticket_purchase: true,
        is_immediate_use: false,
        payment_amount: order.payment_amount,
        payment_method: order.payment_method,
        tender: split_tender(
            order.payment_method,
            order.payment_amount,
            order.cash_amount,
            order.card_amount,
        ),
        notes: order.notes.as_deref(),
        related_payment_id: order.related_payment_id,
    };
    insert_ledger_entry(&mut tx, &purchase_entry).await?;

    if order.use_immediately {
        insert_ledger_entry(&mut tx, &purchase_entry.immediate_use(&usage_name)).await?;
        increment_visit_count(&mut tx, order.customer_id).await?;
    }

    sqlx::query("UPDATE limited_offers SET current_sales = current_sales + 1 WHERE offer_id = $1")
        .bind(offer.offer_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        customer_id = %order.customer_id,
        purchase_id = %purchase_id,
        offer_id = %offer.offer_id,
        %expiry_date,
        "Sold limited-offer ticket"
    );

    Ok(PurchaseReceipt {
        customer_ticket_id: purchase_id,
        payment_id: purchase_entry.payment_id,
        plan_name: offer.name.clone(),
        service_name: Some(usage_name.clone()),
        total_sessions,
        sessions_remaining,
        full_price,
        paid_amount: order.payment_amount,
        remaining_amount,
        purchase_date,
        expiry_date,
        is_fully_paid: remaining_amount.is_zero(),
        used_immediately: order.use_immediately,
    })
}

#[derive(sqlx::FromRow)]
struct TicketBalance {
    purchase_price: Decimal,
    plan_name: String,
}

/// Records an installment against a regular ticket, refusing anything
/// beyond the outstanding balance.
pub async fn record_additional_payment(
    pool: &PgPool,
    payment: &AdditionalPayment,
) -> Result<PaymentReceipt, AppError> {
    let mut tx = pool.begin().await?;

    let ticket = sqlx::query_as::<_, TicketBalance>(
        r#"
        SELECT ct.purchase_price, tp.name AS plan_name
        FROM customer_tickets ct
        JOIN ticket_plans tp ON ct.plan_id = tp.plan_id
        WHERE ct.customer_ticket_id = $1
        FOR UPDATE OF ct
        "#,
    )
    .bind(payment.customer_ticket_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "Ticket '{}' was not found",
            payment.customer_ticket_id
        ))
    })?;

    let total_paid: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_paid), 0)
        FROM ticket_payments
        WHERE customer_ticket_id = $1 AND ticket_type = 'regular'
        "#,
    )
    .bind(payment.customer_ticket_id)
    .fetch_one(&mut *tx)
    .await?;

    let remaining_amount =
        check_installment(ticket.purchase_price, total_paid, payment.payment_amount)?;

    insert_installment(
        &mut tx,
        TicketSource::Regular,
        payment.customer_ticket_id,
        payment.payment_amount,
        payment.payment_method,
        payment.notes.as_deref(),
    )
    .await?;

    tx.commit().await?;

    info!(
        ticket_id = %payment.customer_ticket_id,
        amount = %payment.payment_amount,
        %remaining_amount,
        "Recorded ticket installment"
    );

    Ok(PaymentReceipt {
        customer_ticket_id: payment.customer_ticket_id,
        plan_name: ticket.plan_name,
        full_price: ticket.purchase_price,
        total_paid: total_paid + payment.payment_amount,
        remaining_amount,
        is_fully_paid: remaining_amount.is_zero(),
    })
}
