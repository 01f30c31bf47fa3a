use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::catalog::{
    create_limited_offer, create_ticket_plan, delete_limited_offer, delete_ticket_plan,
    list_limited_offers, list_ticket_plans, update_limited_offer, update_ticket_plan,
};
use crate::handlers::health_check;
use crate::handlers::purchases::{pay_ticket_balance, purchase_limited_offer, purchase_ticket};
use crate::handlers::tickets::{customer_limited_purchases, customer_tickets};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/customers/:id/tickets", get(customer_tickets))
        .route(
            "/api/customers/:id/limited-purchases",
            get(customer_limited_purchases),
        )
        .route(
            "/api/ticket-purchases",
            post(purchase_ticket).patch(pay_ticket_balance),
        )
        .route("/api/limited-offer-purchases", post(purchase_limited_offer))
        .route(
            "/api/ticket-plans",
            get(list_ticket_plans)
                .post(create_ticket_plan)
                .put(update_ticket_plan)
                .delete(delete_ticket_plan),
        )
        .route(
            "/api/limited-offers",
            get(list_limited_offers)
                .post(create_limited_offer)
                .put(update_limited_offer)
                .delete(delete_limited_offer),
        );

    with_security_headers(router, config.production)
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    // Nothing exercised here touches the database, so the pool never
    // connects.
    fn test_app(production: bool) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/salon_pos_test")
            .unwrap();
        let config = Config {
            database_url: "postgres://localhost/salon_pos_test".to_string(),
            bind_addr: ([127, 0, 0, 1], 0).into(),
            max_connections: 1,
            run_migrations: false,
            allowed_origins: "http://localhost:3000".to_string(),
            production,
        };
        create_routes(AppState::new(pool), &config)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app(false)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(response.headers().get("strict-transport-security").is_none());

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_production_adds_hsts() {
        let response = test_app(true)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().get("strict-transport-security").is_some());
    }

    #[tokio::test]
    async fn test_purchase_without_staff_is_rejected() {
        let body = serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "plan_id": Uuid::new_v4(),
            "payment_amount": 10000,
        });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/ticket-purchases")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = test_app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_limited_purchase_without_offer_is_rejected() {
        let body = serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "staff_id": Uuid::new_v4(),
            "payment_amount": 0,
        });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/limited-offer-purchases")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = test_app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_customer_id_is_rejected() {
        let response = test_app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/customers/not-a-uuid/tickets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn assert_validation_envelope(response: axum::response::Response) {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert!(json["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_mistyped_body_gets_error_envelope() {
        let body = serde_json::json!({
            "customer_id": "abc",
            "plan_id": Uuid::new_v4(),
            "staff_id": Uuid::new_v4(),
            "payment_amount": 10000,
        });
        let response = test_app(false)
            .oneshot(json_request(Method::POST, "/api/ticket-purchases", body))
            .await
            .unwrap();

        assert_validation_envelope(response).await;
    }

    #[tokio::test]
    async fn test_unknown_payment_method_gets_error_envelope() {
        let body = serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "offer_id": Uuid::new_v4(),
            "staff_id": Uuid::new_v4(),
            "payment_amount": 0,
            "payment_method": "paypay",
        });
        let response = test_app(false)
            .oneshot(json_request(Method::POST, "/api/limited-offer-purchases", body))
            .await
            .unwrap();

        assert_validation_envelope(response).await;
    }

    #[tokio::test]
    async fn test_malformed_query_gets_error_envelope() {
        let response = test_app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/ticket-plans?serviceId=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_validation_envelope(response).await;
    }

    #[tokio::test]
    async fn test_plan_without_category_is_rejected() {
        let body = serde_json::json!({
            "service_id": Uuid::new_v4(),
            "name": "Cut 5",
            "total_sessions": 5,
            "price": 25000,
            "validity_days": 365,
        });
        let response = test_app(false)
            .oneshot(json_request(Method::POST, "/api/ticket-plans", body))
            .await
            .unwrap();

        assert_validation_envelope(response).await;
    }

    #[tokio::test]
    async fn test_plan_update_without_id_is_rejected() {
        let body = serde_json::json!({
            "name": "Cut 5",
            "service_category": "hair",
            "total_sessions": 5,
            "price": 25000,
            "validity_days": 365,
        });
        let response = test_app(false)
            .oneshot(json_request(Method::PUT, "/api/ticket-plans", body))
            .await
            .unwrap();

        assert_validation_envelope(response).await;
    }

    #[tokio::test]
    async fn test_catalogue_delete_without_id_is_rejected() {
        for uri in ["/api/ticket-plans", "/api/limited-offers"] {
            let response = test_app(false)
                .oneshot(
                    Request::builder()
                        .method(Method::DELETE)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_validation_envelope(response).await;
        }
    }

    #[tokio::test]
    async fn test_ticket_offer_without_price_is_rejected() {
        let body = serde_json::json!({
            "offer_type": "ticket",
            "name": "Spa 3x",
            "total_sessions": 3,
        });
        let response = test_app(false)
            .oneshot(json_request(Method::POST, "/api/limited-offers", body))
            .await
            .unwrap();

        assert_validation_envelope(response).await;
    }
}
