//! Actors that share payloads through flow storage.

use crate::actor::options::parse_i64;
use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{ActorKind, Payload, Token};
use crate::errors::ActorflowError;
use crate::provenance::ActorType;
use async_trait::async_trait;
use std::sync::Arc;

fn require(actor: &ActorBase, option: &str, value: &str) -> Result<(), ActorflowError> {
    if value.trim().is_empty() {
        return Err(ActorflowError::configuration(
            actor.full_name(),
            format!("No {option} provided!"),
        ));
    }
    Ok(())
}

/// Creates (or resizes) a named LRU cache in storage. Runs once, before
/// the token chain.
#[derive(Debug)]
pub struct InitStorageCache {
    base: ActorBase,
    cache: String,
    capacity: usize,
}

impl InitStorageCache {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, cache: impl Into<String>, capacity: usize) -> Self {
        Self {
            base: ActorBase::new(name),
            cache: cache.into(),
            capacity,
        }
    }
}

impl Configurable for InitStorageCache {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "cache",
            description: "The name of the cache.",
            set: |a, v| {
                a.cache = v.to_string();
                Ok(())
            },
            get: |a| a.cache.clone(),
        },
        ActorOption {
            name: "size",
            description: "The maximum number of items.",
            set: |a, v| {
                a.capacity = usize::try_from(parse_i64(v)?).map_err(|e| e.to_string())?;
                Ok(())
            },
            get: |a| a.capacity.to_string(),
        },
    ];
}

#[async_trait]
impl Actor for InitStorageCache {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Standalone
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        require(&self.base, "cache", &self.cache)?;
        if self.capacity == 0 {
            return Err(ActorflowError::configuration(
                self.base.full_name(),
                "Cache size must be at least 1",
            ));
        }
        Ok(())
    }

    async fn do_execute(
        &mut self,
        _input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        ctx.storage().add_cache(&self.cache, self.capacity);
        Ok(())
    }

    configurable_options!();
}

/// Stores each token's payload under `storage-name`, in the global scope
/// or in `cache`, then forwards the token.
#[derive(Debug)]
pub struct SetStorageValue {
    base: ActorBase,
    storage_name: String,
    cache: String,
}

impl SetStorageValue {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, storage_name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            storage_name: storage_name.into(),
            cache: String::new(),
        }
    }

    /// Stores into the named cache instead of the global scope.
    #[must_use]
    pub fn in_cache(mut self, cache: impl Into<String>) -> Self {
        self.cache = cache.into();
        self
    }
}

impl Configurable for SetStorageValue {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "storage-name",
            description: "The storage item name; may contain variables.",
            set: |a, v| {
                a.storage_name = v.to_string();
                Ok(())
            },
            get: |a| a.storage_name.clone(),
        },
        ActorOption {
            name: "cache",
            description: "The cache to use; empty for the global scope.",
            set: |a, v| {
                a.cache = v.to_string();
                Ok(())
            },
            get: |a| a.cache.clone(),
        },
    ];
}

#[async_trait]
impl Actor for SetStorageValue {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        require(&self.base, "storage-name", &self.storage_name)
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(token) = input else {
            return Ok(());
        };
        let name = ctx.expand(&self.storage_name)?;
        let payload = token.payload().clone();
        if self.cache.is_empty() {
            ctx.storage().put(&name, payload);
        } else {
            ctx.storage().put_in(&self.cache, &name, payload)?;
        }
        self.base.emit(token);
        Ok(())
    }

    configurable_options!();
}

/// Emits the payload stored under `storage-name` whenever a token arrives.
#[derive(Debug)]
pub struct GetStorageValue {
    base: ActorBase,
    storage_name: String,
    cache: String,
}

impl GetStorageValue {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, storage_name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            storage_name: storage_name.into(),
            cache: String::new(),
        }
    }

    /// Reads from the named cache instead of the global scope.
    #[must_use]
    pub fn in_cache(mut self, cache: impl Into<String>) -> Self {
        self.cache = cache.into();
        self
    }
}

impl Configurable for GetStorageValue {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "storage-name",
            description: "The storage item name; may contain variables.",
            set: |a, v| {
                a.storage_name = v.to_string();
                Ok(())
            },
            get: |a| a.storage_name.clone(),
        },
        ActorOption {
            name: "cache",
            description: "The cache to use; empty for the global scope.",
            set: |a, v| {
                a.cache = v.to_string();
                Ok(())
            },
            get: |a| a.cache.clone(),
        },
    ];
}

#[async_trait]
impl Actor for GetStorageValue {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        require(&self.base, "storage-name", &self.storage_name)
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(trigger) = input else {
            return Ok(());
        };
        let name = ctx.expand(&self.storage_name)?;
        let stored: Option<Arc<Payload>> = if self.cache.is_empty() {
            ctx.storage().get_as::<Payload>(&name)
        } else {
            ctx.storage().get_from_as::<Payload>(&self.cache, &name)
        };
        let payload = stored.ok_or_else(|| {
            ActorflowError::execution(
                self.base.full_name(),
                format!("Storage item not available: {name}"),
            )
        })?;

        let output = ctx.provenance().derive(
            Some(&trigger),
            Payload::clone(&payload),
            self.base.full_name(),
            ActorType::DataGenerator,
        );
        self.base.emit(output);
        Ok(())
    }

    configurable_options!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::lifecycle;
    use crate::config::FlowConfig;

    fn context() -> FlowContext {
        FlowContext::new("Flow", FlowConfig::default())
    }

    #[tokio::test]
    async fn test_set_then_get_global() {
        let ctx = context();
        ctx.variables().set("id", "7").unwrap();
        let mut set = SetStorageValue::new("Set", "item-@{id}");
        let mut get = GetStorageValue::new("Get", "item-7");
        lifecycle::set_up(&mut set, &ctx).unwrap();
        lifecycle::set_up(&mut get, &ctx).unwrap();

        lifecycle::execute(&mut set, Some(Token::new(42_i64)), &ctx)
            .await
            .unwrap();
        lifecycle::execute(&mut get, Some(Token::new("go")), &ctx)
            .await
            .unwrap();

        let out = lifecycle::output(&mut get, &ctx).unwrap();
        assert_eq!(out.payload(), &Payload::from(42_i64));
    }

    #[tokio::test]
    async fn test_get_missing_item_fails() {
        let ctx = context();
        let mut get = GetStorageValue::new("Get", "nothing");
        lifecycle::set_up(&mut get, &ctx).unwrap();

        let err = lifecycle::execute(&mut get, Some(Token::new("go")), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "Get: Storage item not available: nothing");
    }

    #[tokio::test]
    async fn test_cache_requires_init() {
        let ctx = context();
        let mut set = SetStorageValue::new("Set", "x").in_cache("lookup");
        lifecycle::set_up(&mut set, &ctx).unwrap();

        let err = lifecycle::execute(&mut set, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("Unknown storage cache: lookup"));

        let mut init = InitStorageCache::new("Init", "lookup", 2);
        lifecycle::set_up(&mut init, &ctx).unwrap();
        lifecycle::execute(&mut init, None, &ctx).await.unwrap();
        lifecycle::execute(&mut set, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap();
        assert!(ctx.storage().has_in("lookup", "x"));
    }

    #[tokio::test]
    async fn test_zero_cache_size_rejected() {
        let ctx = context();
        let mut init = InitStorageCache::new("Init", "lookup", 0);
        let err = lifecycle::set_up(&mut init, &ctx).unwrap_err();
        assert_eq!(err, "Init: Cache size must be at least 1");
    }
}
