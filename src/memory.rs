//! In-process store, selected with `STORE_BACKEND=memory` and used by the
//! handler tests.
//!
//! Collections are plain vectors in insertion order, which stands in for the
//! document store's natural order.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

use crate::models::{status, Food, Order, ProfileUpdate, User, UserUpdate};
use crate::store::{FoodRepository, OrderRepository, StoreError, StoreResult, UserRepository};

#[derive(Default)]
pub(crate) struct MemoryStore {
    foods: RwLock<Vec<Food>>,
    orders: RwLock<Vec<Order>>,
    users: RwLock<Vec<User>>,
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Backend("collection lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Backend("collection lock poisoned".to_string()))
}

fn name_pattern(term: &str) -> StoreResult<Regex> {
    RegexBuilder::new(term)
        .case_insensitive(true)
        .build()
        .map_err(|e| StoreError::InvalidQuery(format!("invalid pattern: {e}")))
}

fn email_taken(users: &[User], email: &str, except_id: Option<&str>) -> bool {
    users
        .iter()
        .any(|user| user.email == email && Some(user.id.as_str()) != except_id)
}

#[async_trait]
impl FoodRepository for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Food>> {
        Ok(read(&self.foods)?.clone())
    }

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<Food>> {
        let pattern = name_pattern(term)?;
        Ok(read(&self.foods)?
            .iter()
            .filter(|food| pattern.is_match(&food.name))
            .cloned()
            .collect())
    }

    async fn distinct_tags(&self) -> StoreResult<Vec<String>> {
        let tags: BTreeSet<String> = read(&self.foods)?
            .iter()
            .flat_map(|food| food.tags.iter().cloned())
            .collect();
        Ok(tags.into_iter().collect())
    }

    async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<Food>> {
        Ok(read(&self.foods)?
            .iter()
            .filter(|food| food.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Food>> {
        Ok(read(&self.foods)?.iter().find(|food| food.id == id).cloned())
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<u64> {
        let mut foods = write(&self.foods)?;
        let before = foods.len();
        foods.retain(|food| food.id != id);
        Ok((before - foods.len()) as u64)
    }

    async fn replace(&self, food: &Food) -> StoreResult<u64> {
        let mut foods = write(&self.foods)?;
        match foods.iter_mut().find(|stored| stored.id == food.id) {
            Some(stored) => {
                let created_at = stored.created_at;
                *stored = Food {
                    created_at,
                    ..food.clone()
                };
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert(&self, food: &Food) -> StoreResult<()> {
        write(&self.foods)?.push(food.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &Order) -> StoreResult<()> {
        write(&self.orders)?.push(order.clone());
        Ok(())
    }

    async fn find_pending_for_user(&self, user_id: &str) -> StoreResult<Option<Order>> {
        Ok(read(&self.orders)?
            .iter()
            .find(|order| order.user_id == user_id && order.status == status::PENDING)
            .cloned())
    }

    async fn mark_paid(&self, payment_id: &str, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut orders = write(&self.orders)?;
        match orders.iter_mut().find(|order| order.payment_id == payment_id) {
            Some(order) => {
                order.status = status::PAID.to_string();
                order.updated_at = at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_by_order_id(&self, order_id: &str) -> StoreResult<Option<Order>> {
        Ok(read(&self.orders)?
            .iter()
            .find(|order| order.id == order_id)
            .cloned())
    }

    async fn find_all(&self, status: Option<&str>) -> StoreResult<Vec<Order>> {
        Ok(read(&self.orders)?
            .iter()
            .filter(|order| status.map_or(true, |s| order.status == s))
            .cloned()
            .collect())
    }

    async fn distinct_statuses(&self) -> StoreResult<Vec<String>> {
        let statuses: BTreeSet<String> = read(&self.orders)?
            .iter()
            .map(|order| order.status.clone())
            .collect();
        Ok(statuses.into_iter().collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = write(&self.users)?;
        if email_taken(&users, &user.email, None) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.iter().find(|user| user.id == id).cloned())
    }

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<User>> {
        let pattern = name_pattern(term)?;
        Ok(read(&self.users)?
            .iter()
            .filter(|user| pattern.is_match(&user.name))
            .cloned()
            .collect())
    }

    async fn update_profile(
        &self,
        profile: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut users = write(&self.users)?;
        if email_taken(&users, &profile.email, Some(&profile.id)) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        match users.iter_mut().find(|user| user.id == profile.id) {
            Some(user) => {
                user.name = profile.name.clone();
                user.email = profile.email.clone();
                user.address = profile.address.clone();
                user.updated_at = at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_password(&self, id: &str, hash: &str, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut users = write(&self.users)?;
        match users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.password = hash.to_string();
                user.updated_at = at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn toggle_blocked(&self, id: &str, at: DateTime<Utc>) -> StoreResult<Option<bool>> {
        // Read and write happen under the same write guard.
        let mut users = write(&self.users)?;
        Ok(users.iter_mut().find(|user| user.id == id).map(|user| {
            user.is_blocked = !user.is_blocked;
            user.updated_at = at;
            user.is_blocked
        }))
    }

    async fn update_user(&self, update: &UserUpdate, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut users = write(&self.users)?;
        if email_taken(&users, &update.email, Some(&update.id)) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        match users.iter_mut().find(|user| user.id == update.id) {
            Some(user) => {
                user.name = update.name.clone();
                user.email = update.email.clone();
                user.address = update.address.clone();
                user.is_admin = update.is_admin;
                user.is_blocked = update.is_blocked;
                user.updated_at = at;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
