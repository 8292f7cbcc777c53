//! Type-tag registries for clusters, ready checkers and IP getters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sutkit_core::platform::Connector;

use crate::error::{BareMetalError, BareMetalResult};

pub type Factory<C, T> =
    Arc<dyn Fn(&C, Arc<dyn Connector>) -> BareMetalResult<Arc<T>> + Send + Sync>;

/// Maps a runbook `type` tag to a constructor taking that block's config `C`.
pub struct Registry<C, T: ?Sized> {
    kind: &'static str,
    factories: HashMap<String, Factory<C, T>>,
}

impl<C, T: ?Sized> Registry<C, T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F) -> BareMetalResult<()>
    where
        F: Fn(&C, Arc<dyn Connector>) -> BareMetalResult<Arc<T>> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.factories.contains_key(&type_name) {
            return Err(BareMetalError::DuplicateType {
                kind: self.kind,
                type_name,
            });
        }
        self.factories.insert(type_name, Arc::new(factory));
        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn create(
        &self,
        type_name: &str,
        config: &C,
        connector: Arc<dyn Connector>,
    ) -> BareMetalResult<Arc<T>> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| BareMetalError::UnknownType {
                kind: self.kind,
                type_name: type_name.to_string(),
            })?;
        factory(config, connector)
    }
}

impl<C, T: ?Sized> fmt::Debug for Registry<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sutkit_core::fakes::FakeConnector;

    fn connector() -> Arc<dyn Connector> {
        Arc::new(FakeConnector::new())
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut registry: Registry<u32, str> = Registry::new("label");
        registry
            .register("plain", |n: &u32, _| Ok(Arc::from(n.to_string().as_str())))
            .unwrap();
        let err = registry
            .register("plain", |_: &u32, _| Ok(Arc::from("again")))
            .unwrap_err();
        assert!(matches!(
            err,
            BareMetalError::DuplicateType { kind: "label", ref type_name } if type_name == "plain"
        ));
    }

    #[test]
    fn test_create_by_type_name() {
        let mut registry: Registry<u32, str> = Registry::new("label");
        registry
            .register("plain", |n: &u32, _| Ok(Arc::from(n.to_string().as_str())))
            .unwrap();
        assert!(registry.contains("plain"));
        assert_eq!(&*registry.create("plain", &42, connector()).unwrap(), "42");

        let err = registry.create("fancy", &1, connector()).unwrap_err();
        assert_eq!(err.to_string(), "unknown label type: fancy");
    }
}
