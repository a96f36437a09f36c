//! Library registry and loader
//!
//! Maps generator names to bindings and hands out [`GeneratorHandle`]s.
//!
//! # Declarative Table
//!
//! Each binding is a [`BindingDescriptor`]: name, engine family, linkage,
//! and a factory. Listing resolvable names only inspects descriptors and the
//! search path; no binding is instantiated.
//!
//! # Linkage
//!
//! - [`Linkage::Static`]: compiled into this crate, always resolvable
//! - [`Linkage::Shared`]: needs the platform shared library for the named
//!   component (`lib<component>.so`, `<component>.dll`, ...) in a search
//!   directory
//!
//! # Single Instance
//!
//! Native engines keep process-global state. The registry owns one
//! process-wide slot; `create` refuses a second handle while the first is
//! unfinalized.

use crate::adapter::{AdapterError, GeneratorAdapter, GeneratorHandle};
use crate::engines;
use crate::search::SearchPath;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Binding interface version this registry accepts
pub const BINDING_ABI_VERSION: u32 = 1;

/// Name of the generator currently holding the native slot
static ACTIVE_INSTANCE: Mutex<Option<String>> = Mutex::new(None);

/// Factory producing a fresh adapter
pub type AdapterFactory = Box<dyn Fn() -> Result<Box<dyn GeneratorAdapter>, AdapterError> + Send + Sync>;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("unknown generator '{name}' (available: {})", list_or_none(.available))]
    UnknownGenerator { name: String, available: Vec<String> },

    #[error("cannot load generator '{name}': {reason} (available: {})", list_or_none(.available))]
    LibraryLoad {
        name: String,
        reason: String,
        available: Vec<String>,
    },

    #[error("generator '{active}' is still live; finalize it before creating another")]
    InstanceActive { active: String },

    #[error("generator '{0}' is already registered")]
    DuplicateBinding(String),
}

impl RegistryError {
    /// Resolvable alternatives carried by the error, if any
    pub fn available(&self) -> &[String] {
        match self {
            RegistryError::UnknownGenerator { available, .. }
            | RegistryError::LibraryLoad { available, .. } => available,
            _ => &[],
        }
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// How a binding reaches its native code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    /// Linked into this crate
    Static,

    /// Provided by a shared library found on the search path
    Shared { component: String },
}

impl Linkage {
    /// Platform file name of a shared component
    pub fn library_file(component: &str) -> String {
        format!("{}{}{}", DLL_PREFIX, component, DLL_SUFFIX)
    }
}

/// One registry entry
pub struct BindingDescriptor {
    pub name: String,
    pub family: String,
    pub description: String,
    pub abi_version: u32,
    pub linkage: Linkage,
    pub factory: AdapterFactory,
}

impl BindingDescriptor {
    /// Statically linked binding at the current ABI version
    pub fn new(
        name: impl Into<String>,
        family: impl Into<String>,
        description: impl Into<String>,
        factory: AdapterFactory,
    ) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            description: description.into(),
            abi_version: BINDING_ABI_VERSION,
            linkage: Linkage::Static,
            factory,
        }
    }

    /// Require a shared component on the search path
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Override the declared ABI version
    pub fn with_abi_version(mut self, version: u32) -> Self {
        self.abi_version = version;
        self
    }
}

impl std::fmt::Debug for BindingDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingDescriptor")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("abi_version", &self.abi_version)
            .field("linkage", &self.linkage)
            .finish()
    }
}

/// Name → binding table plus the search path used to resolve shared
/// components
pub struct Registry {
    bindings: Vec<BindingDescriptor>,
    search: SearchPath,
}

impl Registry {
    /// Empty registry
    pub fn new(search: SearchPath) -> Self {
        Self {
            bindings: Vec::new(),
            search,
        }
    }

    /// Registry with the in-tree reference engines
    pub fn with_builtin(search: SearchPath) -> Self {
        let mut registry = Self::new(search);
        for descriptor in engines::builtin_bindings() {
            registry.bindings.push(descriptor);
        }
        registry
    }

    /// Add a binding; names are unique (case-insensitive)
    pub fn register(&mut self, descriptor: BindingDescriptor) -> Result<(), RegistryError> {
        if self.lookup(&descriptor.name).is_some() {
            return Err(RegistryError::DuplicateBinding(descriptor.name));
        }
        self.bindings.push(descriptor);
        Ok(())
    }

    /// Every registered name, resolvable or not
    pub fn names(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.name.clone()).collect()
    }

    /// Descriptor for `name`
    pub fn describe(&self, name: &str) -> Option<&BindingDescriptor> {
        self.lookup(name)
    }

    /// Names that `create` could load right now
    ///
    /// Inspects descriptors and the file system only.
    pub fn resolvable(&self) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|b| self.check_loadable(b).is_ok())
            .map(|b| b.name.clone())
            .collect()
    }

    /// Resolve `name` to a loadable binding without claiming the native slot
    ///
    /// Lets a caller reject a bad generator name before touching files or
    /// parsing configuration.
    pub fn check(&self, name: &str) -> Result<&BindingDescriptor, RegistryError> {
        let binding = self
            .lookup(name)
            .ok_or_else(|| RegistryError::UnknownGenerator {
                name: name.to_string(),
                available: self.resolvable(),
            })?;
        self.check_loadable(binding)
            .map_err(|reason| self.load_error(binding, reason))?;
        Ok(binding)
    }

    /// Instantiate the binding for `name`
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownGenerator`] if no binding has this name
    /// - [`RegistryError::LibraryLoad`] if the binding cannot be loaded
    /// - [`RegistryError::InstanceActive`] if another handle is live
    pub fn create(&self, name: &str) -> Result<GeneratorHandle, RegistryError> {
        let binding = self.check(name)?;

        let slot = NativeSlot::acquire(&binding.name)?;
        match (binding.factory)() {
            Ok(adapter) => {
                tracing::info!(generator = %binding.name, family = %binding.family, "generator bound");
                Ok(GeneratorHandle::new(binding.name.clone(), adapter, slot))
            }
            Err(err) => {
                slot.release();
                Err(self.load_error(binding, err.to_string()))
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<&BindingDescriptor> {
        self.bindings
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
    }

    fn load_error(&self, binding: &BindingDescriptor, reason: String) -> RegistryError {
        RegistryError::LibraryLoad {
            name: binding.name.clone(),
            reason,
            available: self.resolvable(),
        }
    }

    fn check_loadable(&self, binding: &BindingDescriptor) -> Result<(), String> {
        if binding.abi_version != BINDING_ABI_VERSION {
            return Err(format!(
                "binding interface version {} does not match {}",
                binding.abi_version, BINDING_ABI_VERSION
            ));
        }
        match &binding.linkage {
            Linkage::Static => Ok(()),
            Linkage::Shared { component } => self.locate(component).map(|_| ()),
        }
    }

    fn locate(&self, component: &str) -> Result<PathBuf, String> {
        let file = Linkage::library_file(component);
        self.search
            .find(&file)
            .ok_or_else(|| format!("{} not found on search path", file))
    }
}

/// Name of the generator currently live in this process
pub fn active_instance() -> Option<String> {
    ACTIVE_INSTANCE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Claim on the process-wide native slot
///
/// Released explicitly by [`GeneratorHandle::finalize`]; never on drop.
#[derive(Debug)]
pub(crate) struct NativeSlot {
    generator: String,
}

impl NativeSlot {
    fn acquire(generator: &str) -> Result<Self, RegistryError> {
        let mut active = ACTIVE_INSTANCE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = active.as_ref() {
            return Err(RegistryError::InstanceActive {
                active: current.clone(),
            });
        }
        *active = Some(generator.to_string());
        Ok(Self {
            generator: generator.to_string(),
        })
    }

    pub(crate) fn release(self) {
        let mut active = ACTIVE_INSTANCE.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_deref() == Some(self.generator.as_str()) {
            *active = None;
        }
    }
}

#[cfg(test)]
pub(crate) fn test_serial() -> std::sync::MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}
