//! MongoDB implementation of the repositories.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::error::{CommandError, ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::models::{status, Food, LatLng, Order, OrderItem, ProfileUpdate, User, UserUpdate};
use crate::schema::{foods, orders, users};
use crate::store::{FoodRepository, OrderRepository, StoreError, StoreResult, UserRepository};

const DUPLICATE_KEY: i32 = 11000;
const BAD_VALUE: i32 = 2;
const INVALID_REGEX: i32 = 51091;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == DUPLICATE_KEY =>
            {
                StoreError::Duplicate(users::EMAIL.to_string())
            }
            ErrorKind::Command(command_error) if rejects_query(command_error) => {
                StoreError::InvalidQuery(command_error.message.clone())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Server rejections caused by the query document, such as a bad `$regex`.
fn rejects_query(error: &CommandError) -> bool {
    matches!(error.code, BAD_VALUE | INVALID_REGEX)
}

fn object_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|e| StoreError::Backend(format!("bad object id {id}: {e}")))
}

fn bson_time(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(at)
}

/// Case-insensitive regex filter on `field`. The term is not escaped.
fn pattern_filter(field: &str, term: &str) -> Document {
    doc! { field: { "$regex": term, "$options": "i" } }
}

fn strings(values: Vec<Bson>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Bson::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    price: f64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    favorite: bool,
    stars: i32,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    origins: Vec<String>,
    #[serde(default)]
    cook_time: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl TryFrom<&Food> for FoodDocument {
    type Error = StoreError;

    fn try_from(food: &Food) -> StoreResult<Self> {
        Ok(Self {
            id: object_id(&food.id)?,
            name: food.name.clone(),
            price: food.price,
            tags: food.tags.clone(),
            favorite: food.favorite,
            stars: food.stars,
            image_url: food.image_url.clone(),
            origins: food.origins.clone(),
            cook_time: food.cook_time.clone(),
            created_at: food.created_at,
            updated_at: food.updated_at,
        })
    }
}

impl From<FoodDocument> for Food {
    fn from(doc: FoodDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            name: doc.name,
            price: doc.price,
            tags: doc.tags,
            favorite: doc.favorite,
            stars: doc.stars,
            image_url: doc.image_url,
            origins: doc.origins,
            cook_time: doc.cook_time,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDocument {
    id: String,
    name: String,
    address: String,
    #[serde(default)]
    address_lat_lng: LatLng,
    total_price: f64,
    #[serde(default)]
    items: Vec<OrderItem>,
    status: String,
    user_id: String,
    #[serde(default)]
    payment_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderDocument {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            name: order.name.clone(),
            address: order.address.clone(),
            address_lat_lng: order.address_lat_lng.clone(),
            total_price: order.total_price,
            items: order.items.clone(),
            status: order.status.clone(),
            user_id: order.user_id.clone(),
            payment_id: order.payment_id.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderDocument> for Order {
    fn from(doc: OrderDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            address: doc.address,
            address_lat_lng: doc.address_lat_lng,
            total_price: doc.total_price,
            items: doc.items,
            status: doc.status,
            user_id: doc.user_id,
            payment_id: doc.payment_id,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    id: String,
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    is_blocked: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            address: user.address.clone(),
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            email: doc.email,
            password: doc.password,
            address: doc.address,
            is_admin: doc.is_admin,
            is_blocked: doc.is_blocked,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

pub(crate) struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connects, pings the server and makes sure the indexes exist. Any
    /// failure here means the service cannot start.
    pub(crate) async fn connect(url: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(url).await?;
        let database = client.database(database);
        database.run_command(doc! { "ping": 1 }).await?;

        let store = Self { database };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { users::EMAIL: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users().create_index(index).await?;
        Ok(())
    }

    fn foods(&self) -> Collection<FoodDocument> {
        self.database.collection(foods::COLLECTION)
    }

    fn orders(&self) -> Collection<OrderDocument> {
        self.database.collection(orders::COLLECTION)
    }

    fn users(&self) -> Collection<UserDocument> {
        self.database.collection(users::COLLECTION)
    }

    async fn find_foods(&self, filter: Document) -> StoreResult<Vec<Food>> {
        let cursor = self.foods().find(filter).await?;
        let documents: Vec<FoodDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Food::from).collect())
    }

    async fn find_orders(&self, filter: Document) -> StoreResult<Vec<Order>> {
        let cursor = self.orders().find(filter).await?;
        let documents: Vec<OrderDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Order::from).collect())
    }
}

#[async_trait]
impl FoodRepository for MongoStore {
    async fn find_all(&self) -> StoreResult<Vec<Food>> {
        self.find_foods(doc! {}).await
    }

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<Food>> {
        self.find_foods(pattern_filter(foods::NAME, term)).await
    }

    async fn distinct_tags(&self) -> StoreResult<Vec<String>> {
        let values = self.foods().distinct(foods::TAGS, doc! {}).await?;
        Ok(strings(values))
    }

    async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<Food>> {
        self.find_foods(doc! { foods::TAGS: tag }).await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Food>> {
        let filter = doc! { foods::ID: object_id(id)? };
        Ok(self.foods().find_one(filter).await?.map(Food::from))
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<u64> {
        let filter = doc! { foods::ID: object_id(id)? };
        let result = self.foods().delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn replace(&self, food: &Food) -> StoreResult<u64> {
        let filter = doc! { foods::ID: object_id(&food.id)? };
        let update = doc! {
            "$set": {
                foods::NAME: food.name.clone(),
                foods::PRICE: food.price,
                foods::TAGS: food.tags.clone(),
                foods::FAVORITE: food.favorite,
                foods::STARS: food.stars,
                foods::IMAGE_URL: food.image_url.clone(),
                foods::ORIGINS: food.origins.clone(),
                foods::COOK_TIME: food.cook_time.clone(),
                foods::UPDATED_AT: bson_time(food.updated_at),
            }
        };
        let result = self.foods().update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn insert(&self, food: &Food) -> StoreResult<()> {
        self.foods().insert_one(FoodDocument::try_from(food)?).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MongoStore {
    async fn insert(&self, order: &Order) -> StoreResult<()> {
        self.orders().insert_one(OrderDocument::from(order)).await?;
        Ok(())
    }

    async fn find_pending_for_user(&self, user_id: &str) -> StoreResult<Option<Order>> {
        let filter = doc! { orders::USER_ID: user_id, orders::STATUS: status::PENDING };
        Ok(self.orders().find_one(filter).await?.map(Order::from))
    }

    async fn mark_paid(&self, payment_id: &str, at: DateTime<Utc>) -> StoreResult<u64> {
        let filter = doc! { orders::PAYMENT_ID: payment_id };
        let update = doc! {
            "$set": { orders::STATUS: status::PAID, orders::UPDATED_AT: bson_time(at) }
        };
        let result = self.orders().update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn find_by_order_id(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let filter = doc! { orders::ID: order_id };
        Ok(self.orders().find_one(filter).await?.map(Order::from))
    }

    async fn find_all(&self, status: Option<&str>) -> StoreResult<Vec<Order>> {
        let filter = match status {
            Some(status) => doc! { orders::STATUS: status },
            None => doc! {},
        };
        self.find_orders(filter).await
    }

    async fn distinct_statuses(&self) -> StoreResult<Vec<String>> {
        let values = self.orders().distinct(orders::STATUS, doc! {}).await?;
        Ok(strings(values))
    }
}

#[async_trait]
impl UserRepository for MongoStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        self.users().insert_one(UserDocument::from(user)).await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let filter = doc! { users::EMAIL: email };
        Ok(self.users().find_one(filter).await?.map(User::from))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let filter = doc! { users::ID: id };
        Ok(self.users().find_one(filter).await?.map(User::from))
    }

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<User>> {
        let cursor = self.users().find(pattern_filter(users::NAME, term)).await?;
        let documents: Vec<UserDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(User::from).collect())
    }

    async fn update_profile(
        &self,
        profile: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let filter = doc! { users::ID: profile.id.as_str() };
        let update = doc! {
            "$set": {
                users::NAME: profile.name.as_str(),
                users::EMAIL: profile.email.as_str(),
                users::ADDRESS: profile.address.as_str(),
                users::UPDATED_AT: bson_time(at),
            }
        };
        let result = self.users().update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn update_password(&self, id: &str, hash: &str, at: DateTime<Utc>) -> StoreResult<u64> {
        let filter = doc! { users::ID: id };
        let update = doc! {
            "$set": { users::PASSWORD: hash, users::UPDATED_AT: bson_time(at) }
        };
        let result = self.users().update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn toggle_blocked(&self, id: &str, at: DateTime<Utc>) -> StoreResult<Option<bool>> {
        let filter = doc! { users::ID: id };
        // Pipeline update: the flag is negated server-side in one operation.
        let pipeline = vec![doc! {
            "$set": {
                users::IS_BLOCKED: { "$not": [format!("${}", users::IS_BLOCKED)] },
                users::UPDATED_AT: bson_time(at),
            }
        }];
        let updated = self
            .users()
            .find_one_and_update(filter, pipeline)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|user| user.is_blocked))
    }

    async fn update_user(&self, user: &UserUpdate, at: DateTime<Utc>) -> StoreResult<u64> {
        let filter = doc! { users::ID: user.id.as_str() };
        let update = doc! {
            "$set": {
                users::NAME: user.name.as_str(),
                users::EMAIL: user.email.as_str(),
                users::ADDRESS: user.address.as_str(),
                users::IS_ADMIN: user.is_admin,
                users::IS_BLOCKED: user.is_blocked,
                users::UPDATED_AT: bson_time(at),
            }
        };
        let result = self.users().update_one(filter, update).await?;
        Ok(result.matched_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::new_object_id;

    #[test]
    fn pattern_filter_is_case_insensitive_regex() {
        let filter = pattern_filter(foods::NAME, "piz");

        assert_eq!(filter, doc! { "name": { "$regex": "piz", "$options": "i" } });
    }

    #[test]
    fn food_document_uses_native_id() {
        let food = Food {
            id: new_object_id(),
            name: "Pizza".to_string(),
            image_url: "pizza.jpg".to_string(),
            ..Food::default()
        };
        let document = bson::to_document(&FoodDocument::try_from(&food).unwrap()).unwrap();

        assert_eq!(document.get_object_id("_id").unwrap().to_hex(), food.id);
        assert_eq!(document.get_str("imageUrl").unwrap(), "pizza.jpg");
        assert!(document.get_datetime("createdAt").is_ok());
    }

    #[test]
    fn food_document_rejects_malformed_id() {
        let food = Food {
            id: "nope".to_string(),
            ..Food::default()
        };

        assert!(matches!(FoodDocument::try_from(&food), Err(StoreError::Backend(_))));
    }

    #[test]
    fn user_document_keeps_camel_case_flags() {
        let now = Utc::now();
        let user = User {
            id: new_object_id(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password: "hash".to_string(),
            address: String::new(),
            is_admin: true,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        };
        let document = bson::to_document(&UserDocument::from(&user)).unwrap();

        assert!(document.get_bool("isAdmin").unwrap());
        assert!(!document.get_bool("isBlocked").unwrap());
        assert_eq!(document.get_str("id").unwrap(), user.id);
    }

    #[test]
    fn distinct_values_keep_strings_only() {
        let values = vec![Bson::String("Pending".into()), Bson::Null, Bson::String("Paid".into())];

        assert_eq!(strings(values), vec!["Pending", "Paid"]);
    }
}
