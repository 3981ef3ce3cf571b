//! Route table. Handlers carry their paths; registration order matters
//! where a fixed path and a path parameter overlap.

use actix_web::{error, web};

use crate::error::ApiError;
use crate::handlers::{foods, orders, users};

fn bad_request(err: impl std::fmt::Display) -> actix_web::Error {
    ApiError::InvalidArgument(err.to_string()).into()
}

pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err: error::JsonPayloadError, _| bad_request(err)),
    )
    .app_data(web::PathConfig::default().error_handler(|err: error::PathError, _| bad_request(err)))
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err: error::QueryPayloadError, _| bad_request(err)),
    )
    .configure(food_routes)
    .configure(order_routes)
    .configure(user_routes);
}

fn food_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(foods::get_all_foods)
        .service(foods::update_food)
        .service(foods::add_food)
        .service(foods::search_foods)
        .service(foods::get_all_tags)
        .service(foods::get_foods_by_tag)
        .service(foods::get_food_by_id)
        .service(foods::delete_food);
}

// Fixed paths come before "/{state}", which would otherwise swallow them.
fn order_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(orders::create_order)
        .service(orders::get_new_order_for_current_user)
        .service(orders::pay)
        .service(orders::track_order_by_id)
        .service(orders::get_all_status)
        .service(orders::get_all);
}

fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(users::login)
        .service(users::register)
        .service(users::update_profile)
        .service(users::change_password)
        .service(users::get_all)
        .service(users::toggle_block)
        .service(users::get_by_id)
        .service(users::update_user);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;

    use crate::test_support::{init_app, memory_store};

    #[actix_web::test]
    async fn collection_routes_accept_trailing_slash() {
        let app = init_app!(memory_store());

        for uri in ["/api/foods", "/api/foods/"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        }
    }

    #[actix_web::test]
    async fn fixed_order_paths_win_over_state() {
        let app = init_app!(memory_store());

        let req = test::TestRequest::get().uri("/api/orders/allstatus").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.get("statuses").is_some());
    }

    #[actix_web::test]
    async fn unrouted_method_is_not_found() {
        let app = init_app!(memory_store());

        let req = test::TestRequest::delete().uri("/api/orders/allstatus").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn food_tags_path_is_not_taken_as_an_id() {
        let app = init_app!(memory_store());

        let req = test::TestRequest::get().uri("/api/foods/tags").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.is_array());
    }
}
