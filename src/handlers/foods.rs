use actix_web::{delete, get, post, put, routes, web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::cache::{CacheLookup, FoodCache};
use crate::error::ApiError;
use crate::models::{is_object_id, new_object_id, Food};
use crate::store::Store;

fn parse_food_id(id: &str) -> Result<&str, ApiError> {
    if is_object_id(id) {
        Ok(id)
    } else {
        Err(ApiError::InvalidArgument("Invalid food ID".to_string()))
    }
}

#[routes]
#[get("/api/foods")]
#[get("/api/foods/")]
pub(crate) async fn get_all_foods(
    store: web::Data<Store>,
    cache: web::Data<FoodCache>,
) -> Result<HttpResponse, ApiError> {
    let lookup = cache.load().await;
    if let CacheLookup::Hit(foods) = lookup {
        return Ok(HttpResponse::Ok().json(foods));
    }

    let foods = store
        .run(store.foods.find_all())
        .await
        .map_err(ApiError::store("Failed to fetch foods"))?;
    // An unreachable cache is not retried within the same request.
    if matches!(lookup, CacheLookup::Miss) {
        cache.save(&foods).await;
    }
    Ok(HttpResponse::Ok().json(foods))
}

#[get("/api/foods/search/{term:.*}")]
pub(crate) async fn search_foods(
    store: web::Data<Store>,
    term: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let foods = store
        .run(store.foods.search_by_name(&term))
        .await
        .map_err(ApiError::store("Failed to fetch foods"))?;
    Ok(HttpResponse::Ok().json(foods))
}

#[get("/api/foods/tags")]
pub(crate) async fn get_all_tags(store: web::Data<Store>) -> Result<HttpResponse, ApiError> {
    let tags = store
        .run(store.foods.distinct_tags())
        .await
        .map_err(ApiError::store("Failed to fetch tags"))?;
    Ok(HttpResponse::Ok().json(tags))
}

#[get("/api/foods/tag/{tag}")]
pub(crate) async fn get_foods_by_tag(
    store: web::Data<Store>,
    tag: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let foods = store
        .run(store.foods.find_by_tag(&tag))
        .await
        .map_err(ApiError::store("Failed to fetch foods by tag"))?;
    Ok(HttpResponse::Ok().json(foods))
}

#[get("/api/foods/{food_id}")]
pub(crate) async fn get_food_by_id(
    store: web::Data<Store>,
    food_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_food_id(&food_id)?;
    let food = store
        .run(store.foods.find_by_id(id))
        .await
        .map_err(ApiError::store("Failed to fetch food"))?
        .ok_or_else(|| ApiError::NotFound("Food not found".to_string()))?;
    Ok(HttpResponse::Ok().json(food))
}

/// Succeeds whether or not a food was actually removed.
#[delete("/api/foods/{food_id}")]
pub(crate) async fn delete_food(
    store: web::Data<Store>,
    cache: web::Data<FoodCache>,
    food_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_food_id(&food_id)?;
    let deleted = store
        .run(store.foods.delete_by_id(id))
        .await
        .map_err(ApiError::store("Failed to delete food"))?;
    log::debug!("deleted {deleted} food(s) with id {id}");

    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Food deleted successfully" })))
}

/// Replaces the food named by the body's id. No existence check.
#[routes]
#[put("/api/foods")]
#[put("/api/foods/")]
pub(crate) async fn update_food(
    store: web::Data<Store>,
    cache: web::Data<FoodCache>,
    body: web::Json<Food>,
) -> Result<HttpResponse, ApiError> {
    let mut food = body.into_inner();
    parse_food_id(&food.id)?;
    food.updated_at = Utc::now();

    store
        .run(store.foods.replace(&food))
        .await
        .map_err(ApiError::store("Failed to update food"))?;

    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Food updated successfully" })))
}

#[routes]
#[post("/api/foods")]
#[post("/api/foods/")]
pub(crate) async fn add_food(
    store: web::Data<Store>,
    cache: web::Data<FoodCache>,
    body: web::Json<Food>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let food = Food {
        id: new_object_id(),
        created_at: now,
        updated_at: now,
        ..body.into_inner()
    };

    store
        .run(store.foods.insert(&food))
        .await
        .map_err(ApiError::store("Failed to add food"))?;

    cache.invalidate().await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Food added successfully", "food": food })))
}
