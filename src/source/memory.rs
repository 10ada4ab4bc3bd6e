//! In-memory module source.
//!
//! [`MemoryModule`] and [`MemorySource`] implement the reader traits over plain
//! declaration values held in memory. They serve two purposes: programmatic graph
//! construction without any binary input, and deterministic fixtures for unit,
//! integration and bench code.
//!
//! # Examples
//!
//! ```rust
//! use dotlink::source::{MemoryModule, MemorySource, TypeDecl, TypeRefSig};
//!
//! let module = MemoryModule::new("app")
//!     .with_type(TypeDecl::new("App", "Program").with_base(TypeRefSig::named("System.Object")))
//!     .with_reference("corelib");
//!
//! let source = MemorySource::new().with_module(module);
//! assert!(source.module("app").is_some());
//! ```

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{
    source::{ModuleLocator, ModuleReader, TypeDecl},
    Result,
};

/// One in-memory module: a name, a set of type declarations and a reference table.
///
/// The module counts its enumeration calls, which makes the build-once guarantee of
/// graph nodes observable in tests. A failure message can be injected to simulate a
/// malformed or partially loadable module.
pub struct MemoryModule {
    name: String,
    system: bool,
    types: Vec<TypeDecl>,
    references: Vec<String>,
    fail_types: Option<String>,
    fail_references: Option<String>,
    enumerations: AtomicUsize,
}

impl MemoryModule {
    /// Create an empty module with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        MemoryModule {
            name: name.into(),
            system: false,
            types: Vec::new(),
            references: Vec::new(),
            fail_types: None,
            fail_references: None,
            enumerations: AtomicUsize::new(0),
        }
    }

    /// Mark this module as a platform/standard-library module.
    #[must_use]
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Add a type declaration.
    #[must_use]
    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    /// Add a referenced module name.
    #[must_use]
    pub fn with_reference(mut self, name: impl Into<String>) -> Self {
        self.references.push(name.into());
        self
    }

    /// Make `declared_types` fail with the given message, simulating unreadable
    /// binary data.
    #[must_use]
    pub fn failing_types(mut self, message: impl Into<String>) -> Self {
        self.fail_types = Some(message.into());
        self
    }

    /// Make `referenced_modules` fail with the given message.
    #[must_use]
    pub fn failing_references(mut self, message: impl Into<String>) -> Self {
        self.fail_references = Some(message.into());
        self
    }

    /// How many times `declared_types` has been called on this module.
    #[must_use]
    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::Relaxed)
    }
}

impl ModuleReader for MemoryModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_system(&self) -> bool {
        self.system
    }

    fn declared_types(&self) -> Result<Vec<TypeDecl>> {
        self.enumerations.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.fail_types {
            return Err(source_error!("{}: {}", self.name, message));
        }
        Ok(self.types.clone())
    }

    fn referenced_modules(&self) -> Result<Vec<String>> {
        if let Some(message) = &self.fail_references {
            return Err(source_error!("{}: {}", self.name, message));
        }
        Ok(self.references.clone())
    }
}

/// Delegating reader handed out by [`MemorySource`], so the source keeps ownership
/// of its modules and callers can still observe enumeration counters.
struct SharedModule(Arc<MemoryModule>);

impl ModuleReader for SharedModule {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn is_system(&self) -> bool {
        self.0.is_system()
    }

    fn declared_types(&self) -> Result<Vec<TypeDecl>> {
        self.0.declared_types()
    }

    fn referenced_modules(&self) -> Result<Vec<String>> {
        self.0.referenced_modules()
    }
}

/// An in-memory resolution path: a set of [`MemoryModule`]s indexed by name.
#[derive(Default)]
pub struct MemorySource {
    modules: HashMap<String, Arc<MemoryModule>>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        MemorySource {
            modules: HashMap::new(),
        }
    }

    /// Add a module to the resolution path.
    #[must_use]
    pub fn with_module(mut self, module: MemoryModule) -> Self {
        self.modules
            .insert(module.name.clone(), Arc::new(module));
        self
    }

    /// Access a module by name, keeping the shared handle (and its enumeration
    /// counter) available to the caller.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<Arc<MemoryModule>> {
        self.modules.get(name).cloned()
    }
}

impl ModuleLocator for MemorySource {
    fn locate(&self, name: &str) -> Option<Box<dyn ModuleReader>> {
        self.modules
            .get(name)
            .map(|module| Box::new(SharedModule(module.clone())) as Box<dyn ModuleReader>)
    }
}
