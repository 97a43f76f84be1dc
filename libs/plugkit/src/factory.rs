//! Keyed construction primitives: [`NamedRegistry`], [`ClassFactory`] and
//! their memoizing combination [`GeneratorHub`].
//!
//! A capability-owning service typically embeds a `GeneratorHub<dyn Cap>`:
//! provider plugins register constructors under a textual key ("ninja",
//! "gradle", ...) during init, consumers call `get_or_create(key)` and get
//! the one lazily built instance per key.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactoryError {
    #[error("key '{0}' is already registered")]
    DuplicateKey(String),
    #[error("no constructor registered for key '{0}'")]
    UnknownKey(String),
}

/// Keyed store of polymorphic instances. Insertion order is preserved;
/// the registry keeps ownership and hands out non-owning `Arc` clones.
pub struct NamedRegistry<T: ?Sized> {
    entries: RwLock<Vec<(String, Arc<T>)>>,
}

impl<T: ?Sized> Default for NamedRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> NamedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `instance` under `key`. Keys are one-shot.
    pub fn append(&self, key: &str, instance: Arc<T>) -> Result<(), FactoryError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|(k, _)| k == key) {
            return Err(FactoryError::DuplicateKey(key.to_owned()));
        }
        entries.push((key.to_owned(), instance));
        Ok(())
    }

    /// Lookup without ownership transfer; absence is a valid runtime state.
    pub fn value(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| Arc::clone(v))
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().iter().map(|(k, _)| k.clone()).collect()
    }
}

type Ctor<T> = Box<dyn Fn() -> Arc<T> + Send + Sync>;

/// Maps a key to a constructor for a concrete subtype of `T`.
///
/// Registration is one-shot per key: a later-loaded plugin cannot silently
/// override a capability someone else already provides.
pub struct ClassFactory<T: ?Sized> {
    ctors: RwLock<Vec<(String, Ctor<T>)>>,
}

impl<T: ?Sized> Default for ClassFactory<T> {
    fn default() -> Self {
        Self {
            ctors: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ClassFactory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reg_class<F>(&self, key: &str, ctor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let mut ctors = self.ctors.write();
        if ctors.iter().any(|(k, _)| k == key) {
            return Err(FactoryError::DuplicateKey(key.to_owned()));
        }
        ctors.push((key.to_owned(), Box::new(ctor)));
        Ok(())
    }

    /// Invoke the stored constructor; every call produces a fresh instance.
    pub fn create(&self, key: &str) -> Result<Arc<T>, FactoryError> {
        let ctors = self.ctors.read();
        let (_, ctor) = ctors
            .iter()
            .find(|(k, _)| k == key)
            .ok_or_else(|| FactoryError::UnknownKey(key.to_owned()))?;
        Ok(ctor())
    }

    pub fn create_keys(&self) -> Vec<String> {
        self.ctors.read().iter().map(|(k, _)| k.clone()).collect()
    }
}

/// Factory + registry: memoized, lazily constructed, singleton-per-key
/// polymorphic objects (e.g. one generator instance per build-tool name).
pub struct GeneratorHub<T: ?Sized> {
    factory: ClassFactory<T>,
    instances: NamedRegistry<T>,
}

impl<T: ?Sized> Default for GeneratorHub<T> {
    fn default() -> Self {
        Self {
            factory: ClassFactory::new(),
            instances: NamedRegistry::new(),
        }
    }
}

impl<T: ?Sized> GeneratorHub<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reg_class<F>(&self, key: &str, ctor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.factory.reg_class(key, ctor)
    }

    pub fn supported_names(&self) -> Vec<String> {
        self.factory.create_keys()
    }

    /// First request for a key constructs and caches; later requests return
    /// the identical instance.
    pub fn get_or_create(&self, key: &str) -> Result<Arc<T>, FactoryError> {
        if let Some(existing) = self.instances.value(key) {
            return Ok(existing);
        }
        let built = self.factory.create(key)?;
        match self.instances.append(key, Arc::clone(&built)) {
            Ok(()) => Ok(built),
            // Lost a race with a concurrent caller; the cached one wins.
            Err(FactoryError::DuplicateKey(_)) => Ok(self.instances.value(key).unwrap_or(built)),
            Err(e) => Err(e),
        }
    }
}
