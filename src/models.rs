use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) mod status {
    pub(crate) const PENDING: &str = "Pending";
    pub(crate) const PAID: &str = "Paid";
}

const DEFAULT_STARS: i32 = 3;

/// Fresh 24-character hex identifier, the same shape the document store
/// uses for its native ids.
pub(crate) fn new_object_id() -> String {
    ObjectId::new().to_hex()
}

pub(crate) fn is_object_id(value: &str) -> bool {
    ObjectId::parse_str(value).is_ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Food {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub tags: Vec<String>,
    pub favorite: bool,
    pub stars: i32,
    pub image_url: String,
    pub origins: Vec<String>,
    pub cook_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Food {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            price: 0.0,
            tags: Vec::new(),
            favorite: false,
            stars: DEFAULT_STARS,
            image_url: String::new(),
            origins: Vec::new(),
            cook_time: String::new(),
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LatLng {
    pub lat: String,
    pub lng: String,
}

/// A line of an order. `food` is a copy taken when the order was placed,
/// later edits to the food do not reach it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OrderItem {
    pub food: Food,
    pub price: f64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Order {
    pub id: String,
    pub name: String,
    pub address: String,
    pub address_lat_lng: LatLng,
    pub total_price: f64,
    pub items: Vec<OrderItem>,
    pub status: String,
    pub user_id: String,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order as submitted by a client. Identifier, status and timestamps are
/// always assigned by the server.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct NewOrder {
    pub name: String,
    pub address: String,
    pub address_lat_lng: LatLng,
    pub total_price: f64,
    pub items: Vec<OrderItem>,
    pub user_id: String,
    pub payment_id: Option<String>,
}

impl NewOrder {
    pub(crate) fn into_order(self, now: DateTime<Utc>) -> Order {
        let payment_id = self
            .payment_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Order {
            id: new_object_id(),
            name: self.name,
            address: self.address,
            address_lat_lng: self.address_lat_lng,
            total_price: self.total_price,
            items: self.items,
            status: status::PENDING.to_string(),
            user_id: self.user_id,
            payment_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentRequest {
    pub payment_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentUserQuery {
    #[serde(default, rename = "userId")]
    pub user_id: String,
}

/// Stored user record. `password` is a bcrypt hash. This type is never
/// written to a response, see [`UserView`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outward-facing projection of [`User`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            address: user.address,
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileUpdate {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
}

/// Admin-level update, also carries the role and block flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserUpdate {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordRequest {
    pub user_id: String,
    pub old_password: String,
    pub new_password: String,
}
