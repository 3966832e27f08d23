//! A name-keyed factory registry for block implementations.
//!
//! Block bodies (waveform generators, camera capture, GPIO/ADC/PWM drivers,
//! ...) live outside this crate (§6: "Block implementations live outside the
//! core; the core discovers them through a registry keyed by block type
//! name"). This mirrors the lookup-table pattern of `aion_elaborate`'s
//! module registry, scaled down from a multi-language lookup chain to a
//! single flat namespace of constructor closures.

use std::collections::HashMap;

use crate::block::Block;

/// A zero-argument block constructor, boxed so the registry can hold a
/// heterogeneous set of block types behind one map.
pub type Factory = Box<dyn Fn() -> Box<dyn Block> + Send + Sync>;

/// Failure looking up or instantiating a registered block type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// No factory is registered under this name.
    #[error("no block type registered under `{0}`")]
    Unknown(String),
    /// A factory was already registered under this name.
    #[error("block type `{0}` is already registered")]
    Duplicate(String),
}

/// Maps block type names to constructors.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            factories: HashMap::new(),
        }
    }

    /// Registers a constructor under `name`.
    ///
    /// Fails with [`RegistryError::Duplicate`] if `name` is already taken,
    /// the way `aion_elaborate`'s module registry rejects a second
    /// definition of the same identifier instead of silently overwriting it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Block> + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// `true` if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Constructs a new block instance of the named type.
    pub fn create(&self, name: &str) -> Result<Box<dyn Block>, RegistryError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    /// Every registered type name, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockError, Kind, Sample};

    struct Constant(f64);
    impl Block for Constant {
        fn kind(&self) -> Kind {
            Kind::Source
        }
        fn nin(&self) -> usize {
            0
        }
        fn nout(&self) -> usize {
            1
        }
        fn output(&mut self, _inputs: &[Sample], _t: f64) -> Result<Vec<Sample>, BlockError> {
            Ok(vec![Sample::Scalar(self.0)])
        }
    }

    #[test]
    fn register_then_create() {
        let mut r = Registry::new();
        r.register("constant", || Box::new(Constant(1.0))).unwrap();
        let b = r.create("constant").unwrap();
        assert_eq!(b.kind(), Kind::Source);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut r = Registry::new();
        r.register("constant", || Box::new(Constant(1.0))).unwrap();
        let err = r.register("constant", || Box::new(Constant(2.0))).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "constant"));
    }

    #[test]
    fn unknown_type_rejected() {
        let r = Registry::new();
        let err = r.create("missing").unwrap_err();
        assert!(matches!(err, RegistryError::Unknown(name) if name == "missing"));
    }

    #[test]
    fn names_lists_registered_types() {
        let mut r = Registry::new();
        r.register("constant", || Box::new(Constant(1.0))).unwrap();
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["constant"]);
    }
}
