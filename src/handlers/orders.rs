use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;
use crate::models::{CurrentUserQuery, NewOrder, PaymentRequest};
use crate::store::Store;

/// Path value of `GET /api/orders/{state}` that lists every order.
const ALL_STATES: &str = "all";

#[post("/api/orders/create")]
pub(crate) async fn create_order(
    store: web::Data<Store>,
    body: web::Json<NewOrder>,
) -> Result<HttpResponse, ApiError> {
    let order = body.into_inner().into_order(Utc::now());

    store
        .run(store.orders.insert(&order))
        .await
        .map_err(ApiError::store("Failed to create order"))?;

    log::info!("order {} created for user {}", order.id, order.user_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Order created successfully", "order": order })))
}

#[get("/api/orders/newOrderForCurrentUser")]
pub(crate) async fn get_new_order_for_current_user(
    store: web::Data<Store>,
    query: web::Query<CurrentUserQuery>,
) -> Result<HttpResponse, ApiError> {
    // Orders placed without a user must not be handed to a caller without one.
    if query.user_id.is_empty() {
        return Err(ApiError::NotFound("No new order found".to_string()));
    }

    let order = store
        .run(store.orders.find_pending_for_user(&query.user_id))
        .await
        .map_err(ApiError::store("Failed to fetch order"))?
        .ok_or_else(|| ApiError::NotFound("No new order found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

/// Confirms the payment. Paying an already paid order succeeds again.
#[put("/api/orders/pay")]
pub(crate) async fn pay(
    store: web::Data<Store>,
    body: web::Json<PaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let matched = store
        .run(store.orders.mark_paid(&body.payment_id, Utc::now()))
        .await
        .map_err(ApiError::store("Failed to update order status"))?;

    if matched == 0 {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Payment successful" })))
}

#[get("/api/orders/track/{order_id}")]
pub(crate) async fn track_order_by_id(
    store: web::Data<Store>,
    order_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order = store
        .run(store.orders.find_by_order_id(&order_id))
        .await
        .map_err(ApiError::store("Failed to fetch order"))?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    let status = order.status.clone();
    Ok(HttpResponse::Ok().json(json!({ "order": order, "status": status })))
}

#[get("/api/orders/{state}")]
pub(crate) async fn get_all(
    store: web::Data<Store>,
    state: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let status = Some(state.as_str()).filter(|state| *state != ALL_STATES);
    let orders = store
        .run(store.orders.find_all(status))
        .await
        .map_err(ApiError::store("Failed to retrieve orders"))?;
    Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[get("/api/orders/allstatus")]
pub(crate) async fn get_all_status(store: web::Data<Store>) -> Result<HttpResponse, ApiError> {
    let statuses = store
        .run(store.orders.distinct_statuses())
        .await
        .map_err(ApiError::store("Failed to retrieve statuses"))?;
    Ok(HttpResponse::Ok().json(json!({ "statuses": statuses })))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::models::{status, Order};
    use crate::test_support::{init_app, memory_store};

    macro_rules! create_order {
        ($app:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/orders/create")
                .set_json($body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = test::read_body_json(resp).await;
            serde_json::from_value::<Order>(body["order"].clone()).unwrap()
        }};
    }

    macro_rules! send {
        ($app:expr, $req:expr) => {{
            let resp = test::call_service(&$app, $req.to_request()).await;
            let status = resp.status();
            let body: Value = test::read_body_json(resp).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn order_is_paid_end_to_end() {
        let app = init_app!(memory_store());

        let order = create_order!(app, json!({ "name": "A", "totalPrice": 12.5, "userId": "u1" }));
        assert_eq!(order.status, status::PENDING);
        assert_eq!(order.total_price, 12.5);

        let (code, body) = send!(
            app,
            test::TestRequest::get().uri("/api/orders/newOrderForCurrentUser?userId=u1")
        );
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["order"]["id"], json!(order.id));

        let (code, body) = send!(
            app,
            test::TestRequest::put()
                .uri("/api/orders/pay")
                .set_json(json!({ "paymentId": order.payment_id }))
        );
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Payment successful" }));

        let (code, body) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/orders/track/{}", order.id))
        );
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "Paid");
        assert_eq!(body["order"]["status"], "Paid");
    }

    #[actix_web::test]
    async fn create_forces_pending_status() {
        let app = init_app!(memory_store());

        let order = create_order!(
            app,
            json!({ "name": "A", "userId": "u1", "status": "Paid", "id": "client-id" })
        );
        assert_eq!(order.status, status::PENDING);
        assert_ne!(order.id, "client-id");
        assert!(!order.payment_id.is_empty());
    }

    #[actix_web::test]
    async fn paying_twice_keeps_order_paid() {
        let app = init_app!(memory_store());
        let order = create_order!(app, json!({ "name": "A", "userId": "u1", "paymentId": "pay-1" }));

        for _ in 0..2 {
            let (code, _) = send!(
                app,
                test::TestRequest::put()
                    .uri("/api/orders/pay")
                    .set_json(json!({ "paymentId": "pay-1" }))
            );
            assert_eq!(code, StatusCode::OK);
        }

        let (_, body) = send!(
            app,
            test::TestRequest::get().uri(&format!("/api/orders/track/{}", order.id))
        );
        assert_eq!(body["status"], "Paid");
    }

    #[actix_web::test]
    async fn paying_unknown_payment_is_not_found() {
        let app = init_app!(memory_store());

        let (code, body) = send!(
            app,
            test::TestRequest::put()
                .uri("/api/orders/pay")
                .set_json(json!({ "paymentId": "missing" }))
        );
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn pay_without_payment_id_is_a_bad_request() {
        let app = init_app!(memory_store());

        let (code, body) = send!(
            app,
            test::TestRequest::put().uri("/api/orders/pay").set_json(json!({}))
        );
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn no_pending_order_is_not_found() {
        let app = init_app!(memory_store());
        let order = create_order!(app, json!({ "name": "A", "userId": "u1" }));
        send!(
            app,
            test::TestRequest::put()
                .uri("/api/orders/pay")
                .set_json(json!({ "paymentId": order.payment_id }))
        );

        let (code, body) = send!(
            app,
            test::TestRequest::get().uri("/api/orders/newOrderForCurrentUser?userId=u1")
        );
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "No new order found" }));

        let (code, _) = send!(
            app,
            test::TestRequest::get().uri("/api/orders/newOrderForCurrentUser")
        );
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn anonymous_orders_are_not_returned_without_user() {
        let app = init_app!(memory_store());
        create_order!(app, json!({ "name": "A" }));

        for uri in [
            "/api/orders/newOrderForCurrentUser",
            "/api/orders/newOrderForCurrentUser?userId=",
        ] {
            let (code, body) = send!(app, test::TestRequest::get().uri(uri));
            assert_eq!(code, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, json!({ "error": "No new order found" }));
        }
    }

    #[actix_web::test]
    async fn unknown_order_cannot_be_tracked() {
        let app = init_app!(memory_store());

        let (code, _) = send!(app, test::TestRequest::get().uri("/api/orders/track/nope"));
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn orders_are_listed_by_state() {
        let app = init_app!(memory_store());
        let first = create_order!(app, json!({ "name": "A", "userId": "u1" }));
        create_order!(app, json!({ "name": "B", "userId": "u2" }));
        send!(
            app,
            test::TestRequest::put()
                .uri("/api/orders/pay")
                .set_json(json!({ "paymentId": first.payment_id }))
        );

        let (code, body) = send!(app, test::TestRequest::get().uri("/api/orders/all"));
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["orders"].as_array().unwrap().len(), 2);

        let (_, body) = send!(app, test::TestRequest::get().uri("/api/orders/Paid"));
        let paid = body["orders"].as_array().unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0]["id"], json!(first.id));

        let (_, body) = send!(app, test::TestRequest::get().uri("/api/orders/Cancelled"));
        assert!(body["orders"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn statuses_are_distinct() {
        let app = init_app!(memory_store());
        let first = create_order!(app, json!({ "name": "A", "userId": "u1" }));
        create_order!(app, json!({ "name": "B", "userId": "u2" }));
        create_order!(app, json!({ "name": "C", "userId": "u3" }));
        send!(
            app,
            test::TestRequest::put()
                .uri("/api/orders/pay")
                .set_json(json!({ "paymentId": first.payment_id }))
        );

        let (code, body) = send!(app, test::TestRequest::get().uri("/api/orders/allstatus"));
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, json!({ "statuses": ["Paid", "Pending"] }));
    }
}
