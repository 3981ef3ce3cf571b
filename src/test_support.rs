use std::sync::Arc;

use crate::memory::MemoryStore;
use crate::store::Store;

/// Lowest cost bcrypt accepts, keeps hashing fast in tests.
pub(crate) const TEST_BCRYPT_COST: u32 = 4;

pub(crate) fn memory_store() -> Store {
    Store::new(Arc::new(MemoryStore::default()))
}

/// Builds the full app around `store` with the cache off and the cheapest
/// bcrypt cost.
macro_rules! init_app {
    ($store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($store))
                .app_data(actix_web::web::Data::new(crate::cache::FoodCache::disabled()))
                .app_data(actix_web::web::Data::new(
                    crate::password::PasswordHasher::new(crate::test_support::TEST_BCRYPT_COST),
                ))
                .configure(crate::routes::configure),
        )
        .await
    };
}

pub(crate) use init_app;
