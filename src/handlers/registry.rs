use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::region::{RegionCreate, RegionDelete, RegionSummary, RegionUpdate};
use super::token::TokenBlacklist;
use super::traits::{Handler, HandlerFactory};
use super::types::HandlerContext;
use super::user::{RoleCreate, UserCreate, UserDelete};
use crate::models::Entity;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found: {0}")]
    NotFound(String),
}

/// Registry mapping handler names to per-request factories
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: BTreeMap<String, Arc<dyn HandlerFactory>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: HandlerFactory + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn HandlerFactory>, RegistryError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Build a handler bound to `ctx`
    pub fn build(&self, name: &str, ctx: HandlerContext) -> Result<Box<dyn Handler>, RegistryError> {
        Ok(self.get(name)?.build(ctx))
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registry with every built-in handler
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        for entity in [Entity::Country, Entity::State, Entity::City] {
            let prefix = entity.table();
            registry.register(format!("{prefix}.create"), move |ctx: HandlerContext| {
                Box::new(RegionCreate::new(ctx, entity)) as Box<dyn Handler>
            });
            registry.register(format!("{prefix}.update"), move |ctx: HandlerContext| {
                Box::new(RegionUpdate::new(ctx, entity)) as Box<dyn Handler>
            });
            registry.register(format!("{prefix}.delete"), move |ctx: HandlerContext| {
                Box::new(RegionDelete::new(ctx, entity)) as Box<dyn Handler>
            });
        }

        registry.register("region.summary", |ctx: HandlerContext| {
            Box::new(RegionSummary::new(ctx)) as Box<dyn Handler>
        });
        registry.register("role.create", |ctx: HandlerContext| {
            Box::new(RoleCreate::new(ctx)) as Box<dyn Handler>
        });
        registry.register("user.create", |ctx: HandlerContext| {
            Box::new(UserCreate::new(ctx)) as Box<dyn Handler>
        });
        registry.register("user.delete", |ctx: HandlerContext| {
            Box::new(UserDelete::new(ctx)) as Box<dyn Handler>
        });
        registry.register("token.blacklist", |ctx: HandlerContext| {
            Box::new(TokenBlacklist::new(ctx)) as Box<dyn Handler>
        });

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = HandlerRegistry::with_defaults();
        for name in [
            "country.create",
            "state.update",
            "city.delete",
            "region.summary",
            "role.create",
            "user.create",
            "user.delete",
            "token.blacklist",
        ] {
            assert!(registry.has_handler(name), "missing {name}");
        }
    }

    #[test]
    fn test_unknown_handler() {
        let registry = HandlerRegistry::with_defaults();
        assert!(matches!(
            registry.get("nope"),
            Err(RegistryError::NotFound(name)) if name == "nope"
        ));
    }
}
