//! Favorite cryptocurrencies and cities.
//!
//! Pure set membership: every operation is total and idempotent, and
//! returns whether the set actually changed so callers can skip
//! notifications and refetches for no-ops.

use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FavoriteSet {
    crypto_ids: BTreeSet<String>,
    city_names: BTreeSet<String>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_favorite_crypto(&mut self, id: &str) -> bool {
        match clean(id) {
            Some(id) => self.crypto_ids.insert(id.to_string()),
            None => false,
        }
    }

    pub fn remove_favorite_crypto(&mut self, id: &str) -> bool {
        self.crypto_ids.remove(id.trim())
    }

    pub fn add_favorite_city(&mut self, name: &str) -> bool {
        match clean(name) {
            Some(name) => self.city_names.insert(name.to_string()),
            None => false,
        }
    }

    pub fn remove_favorite_city(&mut self, name: &str) -> bool {
        self.city_names.remove(name.trim())
    }

    /// Add the city if absent, remove it if present. Returns true when the
    /// set changed (always, unless `name` is blank).
    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        if self.is_favorite_city(name) {
            self.remove_favorite_city(name)
        } else {
            self.add_favorite_city(name)
        }
    }

    pub fn is_favorite_crypto(&self, id: &str) -> bool {
        self.crypto_ids.contains(id.trim())
    }

    pub fn is_favorite_city(&self, name: &str) -> bool {
        self.city_names.contains(name.trim())
    }

    pub fn crypto_ids(&self) -> impl Iterator<Item = &str> {
        self.crypto_ids.iter().map(String::as_str)
    }

    pub fn city_names(&self) -> impl Iterator<Item = &str> {
        self.city_names.iter().map(String::as_str)
    }

    pub fn has_cities(&self) -> bool {
        !self.city_names.is_empty()
    }
}

fn clean(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
