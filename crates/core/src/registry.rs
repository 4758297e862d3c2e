//! Capability registry -- name -> factory lookup for pluggable strategies
//!
//! [`RegistryBuilder`] collects registrations during startup. [`build`](RegistryBuilder::build)
//! freezes it into a [`Registry`], which only supports lookups and can be shared
//! across worker tasks behind an `Arc`.
//!
//! # Lifecycle
//! ```text
//! RegistryBuilder::new() → register()* → build() → Registry (read-only)
//! ```
//!
//! Collectors and certifiers use independent registries
//! (`Registry<dyn Collector>`, `Registry<dyn Certifier>`).

use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;

/// Zero-argument factory producing a fresh capability instance per run.
pub type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

struct Entry<T: ?Sized> {
    name: String,
    factory: Factory<T>,
}

// ─── RegistryBuilder ─────────────────────────────────────────────────

/// Mutable registration phase of a registry
///
/// Registration order is preserved and becomes the instantiation order.
///
/// # Example
/// ```ignore
/// let mut builder = RegistryBuilder::<dyn Certifier>::new();
/// builder.register("scorecard", move || Arc::new(certifier.clone()) as Arc<dyn Certifier>)?;
/// let registry = Arc::new(builder.build());
/// ```
pub struct RegistryBuilder<T: ?Sized> {
    entries: Vec<Entry<T>>,
}

impl<T: ?Sized> RegistryBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a factory under `name`.
    ///
    /// Fails with [`RegistryError::Duplicate`] when the name is taken; the
    /// existing registration is left untouched.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        tracing::debug!(name = %name, "capability registered");
        self.entries.push(Entry {
            name,
            factory: Arc::new(factory),
        });
        Ok(())
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Freezes the registrations.
    pub fn build(self) -> Registry<T> {
        Registry {
            entries: self.entries,
        }
    }
}

impl<T: ?Sized> Default for RegistryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Read-only registry
pub struct Registry<T: ?Sized> {
    entries: Vec<Entry<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// A registry with no registrations.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Looks up the factory registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Factory<T>> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.factory)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds one fresh instance per registration, in registration order.
    pub fn instantiate_all(&self) -> Vec<(String, Arc<T>)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), (e.factory)()))
            .collect()
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
