//! Type name to factory lookup used by the decoder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::WireType;
use crate::envelope::Envelope;
use crate::error::{WireError, WireResult};
use crate::object::{Object, Schema};

type Factory = Box<dyn Fn() -> Object + Send + Sync>;

/// Maps wire type names to factories producing default instances.
///
/// Build one at startup and share it read-only (the codec holds it behind an
/// `Arc`). There is no removal.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that already knows the RPC envelope.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_type::<Envelope>();
        registry
    }

    /// Registers `factory` under `type_name`, replacing any earlier entry.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Object + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Registers a factory that builds default instances of `schema`.
    pub fn register_schema(&mut self, schema: Arc<Schema>) {
        let type_name = schema.type_name.clone();
        self.register(type_name, move || Object::new(Arc::clone(&schema)));
    }

    /// Registers a statically described type.
    pub fn register_type<T: WireType>(&mut self) {
        self.register_schema(T::schema());
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Builds a default instance of `type_name`.
    pub fn create(&self, type_name: &str) -> WireResult<Object> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| WireError::UnknownType(type_name.to_owned()))?;
        let object = factory();
        if object.type_name() != type_name {
            return Err(WireError::schema_mismatch(
                type_name,
                format!("factory produced {}", object.type_name()),
            ));
        }
        Ok(object)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ENVELOPE_TYPE;
    use crate::object::FieldSpec;

    #[test]
    fn create_unknown_type_fails() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.create("geo.Point").unwrap_err(),
            WireError::UnknownType("geo.Point".into())
        );
    }

    #[test]
    fn schema_factory_builds_defaults() {
        let mut registry = TypeRegistry::new();
        registry.register_schema(Arc::new(
            Schema::new("geo.Point").field(FieldSpec::int("x")),
        ));

        let point = registry.create("geo.Point").unwrap();
        assert_eq!(point.type_name(), "geo.Point");
        assert_eq!(point.int("x").unwrap(), 0);
    }

    #[test]
    fn builtin_registry_knows_envelope() {
        let registry = TypeRegistry::with_builtin();
        assert!(registry.contains(ENVELOPE_TYPE));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn factory_for_another_type_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register("alias", || Object::new(Arc::new(Schema::new("real"))));
        assert!(matches!(
            registry.create("alias"),
            Err(WireError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn debug_lists_type_names() {
        let registry = TypeRegistry::with_builtin();
        assert_eq!(
            format!("{registry:?}"),
            "TypeRegistry { types: [\"Server.RequestMessage\"] }"
        );
    }
}
