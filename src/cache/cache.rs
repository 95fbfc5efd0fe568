use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Error, HttpError};

// Caching - keys

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Feed,
    Recipe,
    Profile,
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> Into<String> for &CacheKey<T> {
    fn into(self) -> String {
        match self._type {
            CacheKeyType::Feed => format!("feed-{}", self._value.to_string()),
            CacheKeyType::Recipe => format!("recipe-{}", self._value.to_string()),
            CacheKeyType::Profile => format!("profile-{}", self._value.to_string()),
            CacheKeyType::Custom(_) => self._value.to_string(),
        }
    }
}

impl<T: ToString + Serialize> Into<CacheLifetime> for CacheKey<T> {
    fn into(self) -> CacheLifetime {
        match self._type {
            CacheKeyType::Feed => CacheLifetime::BindFeedCache,
            CacheKeyType::Recipe => CacheLifetime::BindRecipeCache,
            CacheKeyType::Profile => CacheLifetime::BindProfileCache,
            CacheKeyType::Custom(value) => CacheLifetime::Custom(value),
        }
    }
}

// Cache - lifetimes
//
// Cached values record the generation of their group at write time; a
// mutation bumps the generation key, which invalidates every value bound
// to it on the next read.

#[derive(Serialize, Deserialize, Clone)]
pub enum CacheLifetime {
    Infinite,
    Custom(String),
    BindGlobalCache,
    BindFeedCache,
    BindRecipeCache,
    BindProfileCache,
}

impl CacheLifetime {
    fn generation_key(&self) -> Option<&'static str> {
        match self {
            CacheLifetime::BindGlobalCache => Some("global-cache-key"),
            CacheLifetime::BindFeedCache => Some("feed-cache-key"),
            CacheLifetime::BindRecipeCache => Some("recipe-cache-key"),
            CacheLifetime::BindProfileCache => Some("profile-cache-key"),
            CacheLifetime::Infinite | CacheLifetime::Custom(_) => None,
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::Custom(value) => Ok(Some(value.to_owned())),
            _ => match self.generation_key() {
                Some(key) => get_cache_value::<&str, String>(key, cache).await,
                None => Ok(None),
            },
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        match self {
            CacheLifetime::Custom(value) => match lifetime {
                CacheLifetime::Custom(other) => Ok(value == &other),
                _ => {
                    log::error!("Found conflicting bindings");
                    Err(HttpError::InternalServerError.new("Conflicting cache bindings"))
                }
            },
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }

    /// Bumps the group generation, invalidating every value bound to it.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), Error> {
        match self.generation_key() {
            Some(key) => set_cache_value(key, uuid::Uuid::new_v4().to_string(), cache).await,
            None => Ok(()),
        }
    }
}

/// Drops cached recipe reads (the feed and per-recipe entries) after a
/// recipe mutation.
pub async fn invalidate_recipe_caches(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    CacheLifetime::BindFeedCache.invalidate(cache).await?;
    CacheLifetime::BindRecipeCache.invalidate(cache).await?;

    Ok(())
}

pub async fn invalidate_profile_caches(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    CacheLifetime::BindProfileCache.invalidate(cache).await
}

// Cache - wrappers

#[derive(Serialize, serde::Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, Error> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate<K: ToString + Serialize>(
        &self,
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        self._lifetime
            .validate_cache_bind(&self._bind, key.into(), cache)
            .await
    }

    /// Read-through for single optional values (recipe detail, profiles).
    /// A poisoned entry is deleted in the background and refetched.
    pub async fn get_or_optional<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, Error>> + Send + 'a,
    {
        let value = lookup::<T, K>(&key, cache).await;
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(key.to_owned(), cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {}", key.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(Some(value)),
            None => {
                log::trace!("> Fetching {:?}", key.to_string());
                match callback().await? {
                    Some(value) => {
                        let lifetime: CacheLifetime = key.to_owned().into();
                        let value = RedisValue::new(value, lifetime, cache).await?;

                        if let Err(e) = set_cache_value::<String, RedisValue<T>>(
                            (&key).into(),
                            value.clone(),
                            cache,
                        )
                        .await
                        {
                            log::error!("{e:?}");
                        }

                        Ok(Some(value))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Read-through for list values (the feed).
    pub async fn get_or_list<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<Vec<T>>, Error>
    where
        Vec<T>: serde::Serialize + Send + Sync,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, Error>> + Send + 'a,
    {
        let value = lookup::<Vec<T>, K>(&key, cache).await;
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(key.to_owned(), cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {}", key.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value),
            None => {
                log::trace!("> Fetching {:?}", key.to_string());
                let value = callback().await?;
                let lifetime: CacheLifetime = key.to_owned().into();
                let value = RedisValue::new(value, lifetime, cache).await?;

                set_cache_value::<String, RedisValue<Vec<T>>>((&key).into(), value.clone(), cache)
                    .await?;

                Ok(value)
            }
        }
    }
}

/// Reads a cached wrapper; an entry that no longer deserializes is deleted
/// in the background and treated as a miss.
async fn lookup<V, K>(key: &CacheKey<K>, cache: &mut MultiplexedConnection) -> Option<RedisValue<V>>
where
    V: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
    K: ToString + Serialize + Clone + Send + Sync,
{
    get_cache_value::<String, RedisValue<V>>(key.into(), cache)
        .await
        .unwrap_or_else(|_| {
            let mut c = cache.clone();
            let k = key.to_string();
            tokio::spawn(async move {
                log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                if let Err(e) = delete_cache_value(k, &mut c).await {
                    log::error!("> Failed to delete cached value! {e}");
                }
            });
            None
        })
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache
        .del(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Feed.new("all").to_string(), "feed-all");
        assert_eq!(
            CacheKeyType::Recipe.new("soy-sauce-chicken").to_string(),
            "recipe-soy-sauce-chicken"
        );
        assert_eq!(CacheKeyType::Profile.new("mari").to_string(), "profile-mari");
        assert_eq!(
            CacheKeyType::Custom(String::from("x")).new("raw-key").to_string(),
            "raw-key"
        );
    }

    #[test]
    fn keys_bind_to_their_group_generation() {
        let lifetime: CacheLifetime = CacheKeyType::Feed.new("all").into();
        assert_eq!(lifetime.generation_key(), Some("feed-cache-key"));

        let lifetime: CacheLifetime = CacheKeyType::Custom(String::from("x")).new("raw").into();
        assert!(lifetime.generation_key().is_none());
    }
}
