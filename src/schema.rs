//! Collection and field names of the stored documents.

pub(crate) const DATABASE: &str = "foodstoreDB";

pub(crate) mod foods {
    pub(crate) const COLLECTION: &str = "foods";

    pub(crate) const ID: &str = "_id";
    pub(crate) const NAME: &str = "name";
    pub(crate) const PRICE: &str = "price";
    pub(crate) const TAGS: &str = "tags";
    pub(crate) const FAVORITE: &str = "favorite";
    pub(crate) const STARS: &str = "stars";
    pub(crate) const IMAGE_URL: &str = "imageUrl";
    pub(crate) const ORIGINS: &str = "origins";
    pub(crate) const COOK_TIME: &str = "cookTime";
    pub(crate) const UPDATED_AT: &str = "updatedAt";
}

pub(crate) mod orders {
    pub(crate) const COLLECTION: &str = "orders";

    pub(crate) const ID: &str = "id";
    pub(crate) const STATUS: &str = "status";
    pub(crate) const USER_ID: &str = "userId";
    pub(crate) const PAYMENT_ID: &str = "paymentId";
    pub(crate) const UPDATED_AT: &str = "updatedAt";
}

pub(crate) mod users {
    pub(crate) const COLLECTION: &str = "users";

    pub(crate) const ID: &str = "id";
    pub(crate) const NAME: &str = "name";
    pub(crate) const EMAIL: &str = "email";
    pub(crate) const PASSWORD: &str = "password";
    pub(crate) const ADDRESS: &str = "address";
    pub(crate) const IS_ADMIN: &str = "isAdmin";
    pub(crate) const IS_BLOCKED: &str = "isBlocked";
    pub(crate) const UPDATED_AT: &str = "updatedAt";
}
