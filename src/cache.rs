//! Redis read-through cache for the full food list.
//!
//! The cache is best effort: any Redis failure is logged and the caller
//! falls back to the store. Writes to foods drop the cached list.

use std::ops::DerefMut;
use std::time::Duration;

use actix_web::web;
use r2d2_redis::r2d2;
use r2d2_redis::redis::{Commands, RedisError};
use r2d2_redis::RedisConnectionManager;

use crate::models::Food;

pub(crate) type RedisPool = r2d2::Pool<RedisConnectionManager>;

const CACHE_POOL_MAX_OPEN: u32 = 16;
const CACHE_POOL_MIN_IDLE: u32 = 8;
const CACHE_POOL_EXPIRE_SECONDS: u64 = 60;
const CACHE_POOL_CONNECT_SECONDS: u64 = 2;

const GET_ALL_FOOD_KEY: &str = "foods:all";
// Bounds how long a list saved concurrently with an invalidation can linger.
const CACHE_ENTRY_TTL_SECONDS: usize = 60;

#[derive(Debug, PartialEq)]
pub(crate) enum CacheLookup {
    Hit(Vec<Food>),
    Miss,
    Unavailable,
}

#[derive(Clone)]
pub(crate) struct FoodCache {
    pool: Option<RedisPool>,
}

impl FoodCache {
    pub(crate) fn disabled() -> Self {
        Self { pool: None }
    }

    pub(crate) fn connect(redis_url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let manager = RedisConnectionManager::new(redis_url)?;
        let pool = r2d2::Pool::builder()
            .max_size(CACHE_POOL_MAX_OPEN)
            .max_lifetime(Some(Duration::from_secs(CACHE_POOL_EXPIRE_SECONDS)))
            .min_idle(Some(CACHE_POOL_MIN_IDLE))
            .connection_timeout(Duration::from_secs(CACHE_POOL_CONNECT_SECONDS))
            .build(manager)?;
        Ok(Self { pool: Some(pool) })
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Looks up the cached food list. A read that cannot reach Redis is
    /// reported as [`CacheLookup::Unavailable`] so the caller skips the
    /// write-back.
    pub(crate) async fn load(&self) -> CacheLookup {
        let Some(pool) = self.pool.clone() else {
            return CacheLookup::Unavailable;
        };
        let fetched = web::block(move || -> Result<Vec<u8>, String> {
            let mut conn = pool.get().map_err(|e| e.to_string())?;
            let conn = conn.deref_mut();
            let value: Result<Vec<u8>, RedisError> = conn.get(GET_ALL_FOOD_KEY);
            value.map_err(|e| e.to_string())
        })
        .await;

        match fetched {
            Ok(read) => classify(read),
            Err(e) => {
                log::warn!("food cache read was cancelled: {e}");
                CacheLookup::Unavailable
            }
        }
    }

    pub(crate) async fn save(&self, foods: &[Food]) {
        let Some(pool) = self.pool.clone() else {
            return;
        };
        let bytes = match bincode::serialize(foods) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("could not encode food list for the cache: {e}");
                return;
            }
        };

        let stored = web::block(move || -> Result<(), String> {
            let mut conn = pool.get().map_err(|e| e.to_string())?;
            let conn = conn.deref_mut();
            let result: Result<(), RedisError> =
                conn.set_ex(GET_ALL_FOOD_KEY, bytes, CACHE_ENTRY_TTL_SECONDS);
            result.map_err(|e| e.to_string())
        })
        .await;
        log_write_failure("write", stored);
    }

    pub(crate) async fn invalidate(&self) {
        let Some(pool) = self.pool.clone() else {
            return;
        };

        let removed = web::block(move || -> Result<(), String> {
            let mut conn = pool.get().map_err(|e| e.to_string())?;
            let conn = conn.deref_mut();
            let result: Result<(), RedisError> = conn.del(GET_ALL_FOOD_KEY);
            result.map_err(|e| e.to_string())
        })
        .await;
        log_write_failure("invalidation", removed);
    }
}

fn log_write_failure(
    action: &str,
    result: Result<Result<(), String>, actix_web::error::BlockingError>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("food cache {action} failed: {e}"),
        Err(e) => log::warn!("food cache {action} was cancelled: {e}"),
    }
}

fn classify(read: Result<Vec<u8>, String>) -> CacheLookup {
    match read {
        Ok(bytes) => match decode_foods(&bytes) {
            Some(foods) => CacheLookup::Hit(foods),
            None => CacheLookup::Miss,
        },
        Err(e) => {
            log::warn!("food cache read failed: {e}");
            CacheLookup::Unavailable
        }
    }
}

/// An empty value is how Redis reports a missing key here.
fn decode_foods(bytes: &[u8]) -> Option<Vec<Food>> {
    if bytes.is_empty() {
        return None;
    }
    match bincode::deserialize(bytes) {
        Ok(foods) => Some(foods),
        Err(e) => {
            log::warn!("discarding undecodable cached food list: {e}");
            None
        }
    }
}
