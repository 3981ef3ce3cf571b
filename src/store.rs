//! Repository seams between handlers and the document store.
//!
//! Handlers only see the named operations below. Filters and update
//! documents stay inside the implementations ([`crate::query::MongoStore`]
//! and [`crate::memory::MemoryStore`]).
//!
//! Every call goes through [`Store::run`], which applies a deadline and
//! a circuit breaker around the backend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actix_web::rt::time::timeout;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use failsafe::backoff::EqualJittered;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::{Config, StateMachine};
use thiserror::Error;

use crate::models::{Food, Order, ProfileUpdate, User, UserUpdate};

pub(crate) type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("duplicate key on {0}")]
    Duplicate(String),

    /// The backend refused the query itself, e.g. a malformed search pattern.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable, circuit breaker is open")]
    Unavailable,
}

impl StoreError {
    /// Whether the failure says something about the health of the backend.
    /// Rejections caused by the request itself never do.
    fn trips_breaker(&self) -> bool {
        matches!(self, StoreError::Backend(_) | StoreError::Timeout(_))
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub(crate) trait FoodRepository: Send + Sync {
    async fn find_all(&self) -> StoreResult<Vec<Food>>;

    /// Case-insensitive pattern match on the name. The term is handed to the
    /// backend as a regular expression without escaping.
    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<Food>>;

    async fn distinct_tags(&self) -> StoreResult<Vec<String>>;

    async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<Food>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Food>>;

    /// Returns the number of removed documents.
    async fn delete_by_id(&self, id: &str) -> StoreResult<u64>;

    /// Overwrites every field but the id and `created_at`. Returns the number
    /// of matched documents.
    async fn replace(&self, food: &Food) -> StoreResult<u64>;

    async fn insert(&self, food: &Food) -> StoreResult<()>;
}

#[async_trait]
pub(crate) trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> StoreResult<()>;

    async fn find_pending_for_user(&self, user_id: &str) -> StoreResult<Option<Order>>;

    /// Marks the order carrying `payment_id` as paid. Returns the number of
    /// matched orders, already paid ones included.
    async fn mark_paid(&self, payment_id: &str, at: DateTime<Utc>) -> StoreResult<u64>;

    async fn find_by_order_id(&self, order_id: &str) -> StoreResult<Option<Order>>;

    async fn find_all(&self, status: Option<&str>) -> StoreResult<Vec<Order>>;

    async fn distinct_statuses(&self) -> StoreResult<Vec<String>>;
}

#[async_trait]
pub(crate) trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> StoreResult<()>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<User>>;

    async fn update_profile(&self, profile: &ProfileUpdate, at: DateTime<Utc>)
        -> StoreResult<u64>;

    async fn update_password(&self, id: &str, hash: &str, at: DateTime<Utc>) -> StoreResult<u64>;

    /// Flips the blocked flag in a single atomic step and returns the new
    /// value, `None` when no user has this id.
    async fn toggle_blocked(&self, id: &str, at: DateTime<Utc>) -> StoreResult<Option<bool>>;

    async fn update_user(&self, user: &UserUpdate, at: DateTime<Utc>) -> StoreResult<u64>;
}

/// Handle to the document store shared by every worker.
#[derive(Clone)]
pub(crate) struct Store {
    pub foods: Arc<dyn FoodRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    circuit_breaker: CircuitBreakerType,
    timeout: Duration,
}

impl Store {
    pub(crate) fn new<B>(backend: Arc<B>) -> Self
    where
        B: FoodRepository + OrderRepository + UserRepository + 'static,
    {
        Self {
            foods: backend.clone(),
            orders: backend.clone(),
            users: backend,
            circuit_breaker: Config::new().build(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs one store operation under the deadline and the circuit breaker.
    pub(crate) async fn run<T, F>(&self, operation: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if !self.circuit_breaker.is_call_permitted() {
            return Err(StoreError::Unavailable);
        }

        match timeout(self.timeout, operation).await {
            Ok(Ok(value)) => {
                self.circuit_breaker.on_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                if err.trips_breaker() {
                    self.circuit_breaker.on_error();
                } else {
                    self.circuit_breaker.on_success();
                }
                Err(err)
            }
            Err(_) => {
                self.circuit_breaker.on_error();
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}
