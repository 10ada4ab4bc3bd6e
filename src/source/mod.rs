//! Module reader abstraction and declaration model.
//!
//! The graph engine never parses binary modules itself. It consumes a reader through
//! the [`ModuleReader`] and [`ModuleLocator`] traits and receives plain declaration
//! values describing what a module contains. Everything the engine knows about a
//! module - its types, members, attribute decorations, generic parameters and
//! inter-module references - arrives through this boundary.
//!
//! # Key Components
//!
//! - [`ModuleReader`] - Enumerates one module's declarations
//! - [`ModuleLocator`] - Finds referenced modules on the resolution path, with a
//!   distinguishable "not found" outcome
//! - [`TypeDecl`], [`MethodDecl`], [`FieldDecl`], [`PropertyDecl`], [`EventDecl`] -
//!   Declaration values for one entity each
//! - [`TypeRefSig`] - Recursive type reference signature (named types, arrays,
//!   generic instantiations, generic parameters, absent references)
//!
//! # Failure Semantics
//!
//! Enumeration methods return [`crate::Result`]; the engine catches any error at the
//! point of enumeration, records an Error-severity fault and continues with an empty
//! collection. A locator miss is not an error - [`ModuleLocator::locate`] returns
//! `None` and the engine substitutes a Missing-module sentinel.
//!
//! # Examples
//!
//! ```rust
//! use dotlink::source::{TypeDecl, TypeRefSig, TypeAttributes};
//!
//! let decl = TypeDecl::new("MyLib", "Widget")
//!     .with_base(TypeRefSig::named("System.Object"))
//!     .with_interface(TypeRefSig::named("MyLib.IWidget"));
//! assert_eq!(decl.full_name(), "MyLib.Widget");
//! assert!(!decl.flags.contains(TypeAttributes::INTERFACE));
//! ```

mod memory;

pub use memory::{MemoryModule, MemorySource};

use std::fmt;

use bitflags::bitflags;

use crate::Result;

bitflags! {
    /// Type attribute flags, the subset of the binary format's type attributes the
    /// graph engine interprets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeAttributes: u32 {
        /// Type is publicly visible outside its module
        const PUBLIC = 0x0001;
        /// Type is an interface, not a class
        const INTERFACE = 0x0020;
        /// Type is abstract
        const ABSTRACT = 0x0080;
        /// Type cannot be derived from
        const SEALED = 0x0100;
        /// Type has a special name interpreted by tooling
        const SPECIAL_NAME = 0x0400;
        /// Type is an attribute decoration type
        const ATTRIBUTE = 0x1000;
    }
}

bitflags! {
    /// Method attribute flags relevant to override and implementation matching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodAttributes: u32 {
        /// Method is static
        const STATIC = 0x0010;
        /// Method cannot be overridden further
        const FINAL = 0x0020;
        /// Method participates in virtual dispatch
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature, not by name alone
        const HIDE_BY_SIG = 0x0080;
        /// Method introduces a new vtable slot instead of reusing a base slot
        const NEW_SLOT = 0x0100;
        /// Method is abstract
        const ABSTRACT = 0x0400;
        /// Method has a special name (accessors, operators)
        const SPECIAL_NAME = 0x0800;
    }
}

impl MethodAttributes {
    /// A method declared override-style reuses a base vtable slot: it is virtual,
    /// hides by signature and does not introduce a new slot.
    #[must_use]
    pub fn is_override_style(&self) -> bool {
        self.contains(MethodAttributes::VIRTUAL | MethodAttributes::HIDE_BY_SIG)
            && !self.contains(MethodAttributes::NEW_SLOT)
    }
}

bitflags! {
    /// Parameter flags carried on each parameter node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParamFlags: u32 {
        /// Parameter is an input
        const INPUT = 0x0001;
        /// Parameter is an output
        const OUTPUT = 0x0002;
        /// Parameter collects trailing variadic arguments
        const VARIADIC = 0x0004;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
    }
}

bitflags! {
    /// Generic parameter flags: variance and constraint markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GenericParamAttributes: u32 {
        /// Parameter is covariant
        const COVARIANT = 0x0001;
        /// Parameter is contravariant
        const CONTRAVARIANT = 0x0002;
        /// Parameter must be instantiated with a reference type
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Parameter must be instantiated with a non-nullable value type
        const VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Parameter must be instantiated with a type that has a public
        /// parameterless constructor
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

/// A type reference signature as it appears in a module's metadata.
///
/// Signatures are structural: they describe how to find or construct a type, not
/// the type itself. The registry resolves a signature to exactly one type node,
/// substituting the Null sentinel for [`TypeRefSig::None`] and a Missing sentinel
/// when the referenced declaration cannot be located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRefSig {
    /// The absence of a reference (no base type, void-like result slots).
    None,
    /// A reference to a named type, optionally qualified with its defining module.
    /// An unqualified reference is resolved against the module it appears in.
    Named {
        /// Name of the defining module, when the reference crosses modules
        module: Option<String>,
        /// Full dotted name of the type, nested segments separated by `/`
        full_name: String,
    },
    /// An array of an element type.
    Array {
        /// Element type signature
        element: Box<TypeRefSig>,
        /// Number of dimensions, 1 for a vector
        rank: u8,
    },
    /// A generic instantiation of an open generic definition.
    GenericInstance {
        /// Signature of the open generic definition
        definition: Box<TypeRefSig>,
        /// Concrete type argument signatures, in declaration order
        arguments: Vec<TypeRefSig>,
    },
    /// A reference to a generic parameter of the enclosing type, by name.
    GenericParam {
        /// Declared name of the generic parameter
        name: String,
    },
}

impl TypeRefSig {
    /// A reference to a named type in the current module.
    #[must_use]
    pub fn named(full_name: impl Into<String>) -> Self {
        TypeRefSig::Named {
            module: None,
            full_name: full_name.into(),
        }
    }

    /// A reference to a named type in a specific module.
    #[must_use]
    pub fn in_module(module: impl Into<String>, full_name: impl Into<String>) -> Self {
        TypeRefSig::Named {
            module: Some(module.into()),
            full_name: full_name.into(),
        }
    }

    /// An array of `element` with the given rank.
    #[must_use]
    pub fn array(element: TypeRefSig, rank: u8) -> Self {
        TypeRefSig::Array {
            element: Box::new(element),
            rank,
        }
    }

    /// A generic instantiation of `definition` with the given arguments.
    #[must_use]
    pub fn generic(definition: TypeRefSig, arguments: Vec<TypeRefSig>) -> Self {
        TypeRefSig::GenericInstance {
            definition: Box::new(definition),
            arguments,
        }
    }

    /// A reference to a generic parameter by name.
    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        TypeRefSig::GenericParam { name: name.into() }
    }

    /// Returns `true` for the absent reference.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, TypeRefSig::None)
    }
}

impl fmt::Display for TypeRefSig {
    /// Renders the signature in IL-style notation: `[module]Ns.Name`, `T[]`,
    /// `Def<A,B>`, `!T`. The rendering is stable and is used as the textual
    /// parameter signature inside method identity keys.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRefSig::None => write!(f, "<none>"),
            TypeRefSig::Named { module, full_name } => {
                if let Some(module) = module {
                    write!(f, "[{module}]{full_name}")
                } else {
                    write!(f, "{full_name}")
                }
            }
            TypeRefSig::Array { element, rank } => {
                write!(f, "{element}[")?;
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            TypeRefSig::GenericInstance {
                definition,
                arguments,
            } => {
                write!(f, "{definition}<")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            TypeRefSig::GenericParam { name } => write!(f, "!{name}"),
        }
    }
}

/// A reference to a member of some type, used for explicit override declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRefSig {
    /// The type declaring the referenced member
    pub declaring: TypeRefSig,
    /// Declared name of the member
    pub name: String,
    /// Parameter type signatures, in order
    pub params: Vec<TypeRefSig>,
}

impl MemberRefSig {
    /// Create a member reference.
    #[must_use]
    pub fn new(declaring: TypeRefSig, name: impl Into<String>, params: Vec<TypeRefSig>) -> Self {
        MemberRefSig {
            declaring,
            name: name.into(),
            params,
        }
    }
}

/// A reference to an accessor method declared on the same type, used to tie a
/// property or event to its getter/setter/adder/remover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorRef {
    /// Declared name of the accessor method
    pub name: String,
    /// Parameter type signatures of the accessor, in order
    pub params: Vec<TypeRefSig>,
}

impl AccessorRef {
    /// Create an accessor reference.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<TypeRefSig>) -> Self {
        AccessorRef {
            name: name.into(),
            params,
        }
    }
}

/// Declaration of one generic parameter.
#[derive(Debug, Clone, Default)]
pub struct GenericParamDecl {
    /// Declared name of the parameter
    pub name: String,
    /// Variance and constraint flags
    pub flags: GenericParamAttributes,
    /// Constraint type signatures (class-type and interface constraints)
    pub constraints: Vec<TypeRefSig>,
}

impl GenericParamDecl {
    /// Create an unconstrained generic parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        GenericParamDecl {
            name: name.into(),
            flags: GenericParamAttributes::empty(),
            constraints: Vec::new(),
        }
    }

    /// Add a constraint signature.
    #[must_use]
    pub fn with_constraint(mut self, constraint: TypeRefSig) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Set the parameter flags.
    #[must_use]
    pub fn with_flags(mut self, flags: GenericParamAttributes) -> Self {
        self.flags = flags;
        self
    }
}

/// Declaration of one parameter of a method.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    /// Declared name of the parameter
    pub name: String,
    /// Type signature of the parameter
    pub param_type: TypeRefSig,
    /// Input/output/variadic flags
    pub flags: ParamFlags,
}

impl ParamDecl {
    /// Create an input parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: TypeRefSig) -> Self {
        ParamDecl {
            name: name.into(),
            param_type,
            flags: ParamFlags::INPUT,
        }
    }

    /// Mark this parameter as an output.
    #[must_use]
    pub fn output(mut self) -> Self {
        self.flags |= ParamFlags::OUTPUT;
        self
    }

    /// Mark this parameter as variadic.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.flags |= ParamFlags::VARIADIC;
        self
    }
}

/// Declaration of one field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Declared name of the field
    pub name: String,
    /// Type signature of the field
    pub field_type: TypeRefSig,
    /// Attribute decoration type signatures
    pub attributes: Vec<TypeRefSig>,
}

impl FieldDecl {
    /// Create a field declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: TypeRefSig) -> Self {
        FieldDecl {
            name: name.into(),
            field_type,
            attributes: Vec::new(),
        }
    }

    /// Add an attribute decoration.
    #[must_use]
    pub fn with_attribute(mut self, attribute: TypeRefSig) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Declaration of one method, including everything the engine mines from its body.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Declared name; explicitly-implemented members carry the interface full
    /// name as a prefix (`Ns.IFace.Member`)
    pub name: String,
    /// Method attribute flags
    pub flags: MethodAttributes,
    /// Return type signature; [`TypeRefSig::None`] for void
    pub return_type: TypeRefSig,
    /// Parameter declarations, in order
    pub params: Vec<ParamDecl>,
    /// Number of generic parameters the method declares
    pub generic_arity: u16,
    /// Explicit overridden-member references (override directives)
    pub overrides: Vec<MemberRefSig>,
    /// Types of the local variables appearing in the method body
    pub locals: Vec<TypeRefSig>,
    /// Types of the exceptions caught in the method body
    pub catches: Vec<TypeRefSig>,
    /// Attribute decoration type signatures
    pub attributes: Vec<TypeRefSig>,
}

impl MethodDecl {
    /// Create a method declaration with the given return type.
    #[must_use]
    pub fn new(name: impl Into<String>, return_type: TypeRefSig) -> Self {
        MethodDecl {
            name: name.into(),
            flags: MethodAttributes::empty(),
            return_type,
            params: Vec::new(),
            generic_arity: 0,
            overrides: Vec::new(),
            locals: Vec::new(),
            catches: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Set the method flags.
    #[must_use]
    pub fn with_flags(mut self, flags: MethodAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Append a parameter.
    #[must_use]
    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Set the generic arity.
    #[must_use]
    pub fn with_generic_arity(mut self, arity: u16) -> Self {
        self.generic_arity = arity;
        self
    }

    /// Add an explicit overridden-member reference.
    #[must_use]
    pub fn with_override(mut self, target: MemberRefSig) -> Self {
        self.overrides.push(target);
        self
    }

    /// Add a local variable type.
    #[must_use]
    pub fn with_local(mut self, local: TypeRefSig) -> Self {
        self.locals.push(local);
        self
    }

    /// Add a caught exception type.
    #[must_use]
    pub fn with_catch(mut self, caught: TypeRefSig) -> Self {
        self.catches.push(caught);
        self
    }

    /// Add an attribute decoration.
    #[must_use]
    pub fn with_attribute(mut self, attribute: TypeRefSig) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Declaration of one property, composed of up to two accessor methods.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    /// Declared name; explicit implementations carry the interface prefix
    pub name: String,
    /// Type signature of the property value
    pub property_type: TypeRefSig,
    /// Getter accessor, when present
    pub getter: Option<AccessorRef>,
    /// Setter accessor, when present
    pub setter: Option<AccessorRef>,
    /// Attribute decoration type signatures
    pub attributes: Vec<TypeRefSig>,
}

impl PropertyDecl {
    /// Create a property declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: TypeRefSig) -> Self {
        PropertyDecl {
            name: name.into(),
            property_type,
            getter: None,
            setter: None,
            attributes: Vec::new(),
        }
    }

    /// Set the getter accessor.
    #[must_use]
    pub fn with_getter(mut self, getter: AccessorRef) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Set the setter accessor.
    #[must_use]
    pub fn with_setter(mut self, setter: AccessorRef) -> Self {
        self.setter = Some(setter);
        self
    }

    /// Add an attribute decoration.
    #[must_use]
    pub fn with_attribute(mut self, attribute: TypeRefSig) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Declaration of one event, composed of up to three accessor methods.
#[derive(Debug, Clone)]
pub struct EventDecl {
    /// Declared name; explicit implementations carry the interface prefix
    pub name: String,
    /// Type signature of the event handler
    pub event_type: TypeRefSig,
    /// Adder accessor, when present
    pub adder: Option<AccessorRef>,
    /// Remover accessor, when present
    pub remover: Option<AccessorRef>,
    /// Raiser accessor, when present
    pub raiser: Option<AccessorRef>,
    /// Attribute decoration type signatures
    pub attributes: Vec<TypeRefSig>,
}

impl EventDecl {
    /// Create an event declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, event_type: TypeRefSig) -> Self {
        EventDecl {
            name: name.into(),
            event_type,
            adder: None,
            remover: None,
            raiser: None,
            attributes: Vec::new(),
        }
    }

    /// Set the adder accessor.
    #[must_use]
    pub fn with_adder(mut self, adder: AccessorRef) -> Self {
        self.adder = Some(adder);
        self
    }

    /// Set the remover accessor.
    #[must_use]
    pub fn with_remover(mut self, remover: AccessorRef) -> Self {
        self.remover = Some(remover);
        self
    }

    /// Set the raiser accessor.
    #[must_use]
    pub fn with_raiser(mut self, raiser: AccessorRef) -> Self {
        self.raiser = Some(raiser);
        self
    }
}

/// Declaration of one type, the root of the declaration tree for that type.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name; for nested types the inner name only
    pub name: String,
    /// Type attribute flags
    pub flags: TypeAttributes,
    /// Base type signature; [`TypeRefSig::None`] when the type has no base
    pub base: TypeRefSig,
    /// Implemented interface signatures
    pub interfaces: Vec<TypeRefSig>,
    /// Nested type declarations
    pub nested: Vec<TypeDecl>,
    /// Field declarations
    pub fields: Vec<FieldDecl>,
    /// Method declarations
    pub methods: Vec<MethodDecl>,
    /// Property declarations
    pub properties: Vec<PropertyDecl>,
    /// Event declarations
    pub events: Vec<EventDecl>,
    /// Generic parameter declarations
    pub generic_params: Vec<GenericParamDecl>,
    /// Attribute decoration type signatures
    pub attributes: Vec<TypeRefSig>,
}

impl TypeDecl {
    /// Create a class declaration.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDecl {
            namespace: namespace.into(),
            name: name.into(),
            flags: TypeAttributes::PUBLIC,
            base: TypeRefSig::None,
            interfaces: Vec::new(),
            nested: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            generic_params: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Create an interface declaration.
    #[must_use]
    pub fn interface(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let mut decl = TypeDecl::new(namespace, name);
        decl.flags |= TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT;
        decl
    }

    /// Returns the full dotted name (`Namespace.Name`), or the simple name when the
    /// namespace is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Set the type flags.
    #[must_use]
    pub fn with_flags(mut self, flags: TypeAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Set the base type signature.
    #[must_use]
    pub fn with_base(mut self, base: TypeRefSig) -> Self {
        self.base = base;
        self
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, interface: TypeRefSig) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a nested type declaration.
    #[must_use]
    pub fn with_nested(mut self, nested: TypeDecl) -> Self {
        self.nested.push(nested);
        self
    }

    /// Add a field declaration.
    #[must_use]
    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method declaration.
    #[must_use]
    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a property declaration.
    #[must_use]
    pub fn with_property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    /// Add an event declaration.
    #[must_use]
    pub fn with_event(mut self, event: EventDecl) -> Self {
        self.events.push(event);
        self
    }

    /// Add a generic parameter declaration.
    #[must_use]
    pub fn with_generic_param(mut self, param: GenericParamDecl) -> Self {
        self.generic_params.push(param);
        self
    }

    /// Add an attribute decoration.
    #[must_use]
    pub fn with_attribute(mut self, attribute: TypeRefSig) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Enumerates the declarations of one binary module.
///
/// Implementations wrap whatever binary-format reader produced the module. Each
/// enumeration call may be invoked more than once over the life of an analysis
/// session (lazy population, forced rebuilds); implementations should be cheap to
/// re-enumerate or cache internally.
pub trait ModuleReader: Send + Sync {
    /// The module's name, unique within one analysis session.
    fn name(&self) -> &str;

    /// Whether this is a platform/standard-library module. System modules can be
    /// filtered out of batch processing.
    fn is_system(&self) -> bool {
        false
    }

    /// Enumerate the type declarations this module contains, nested types included
    /// in their declaring type's `nested` list.
    ///
    /// # Errors
    /// Returns an error when the underlying binary data cannot be read; the engine
    /// degrades this to an Error fault and an empty type list.
    fn declared_types(&self) -> Result<Vec<TypeDecl>>;

    /// Enumerate the names of the modules this module references.
    ///
    /// # Errors
    /// Returns an error when the reference table cannot be read; the engine
    /// degrades this to an Error fault and an empty reference list.
    fn referenced_modules(&self) -> Result<Vec<String>>;
}

/// Locates referenced modules on the resolution path.
///
/// The locator is the seam where search-path and dependency-discovery policy plugs
/// in. `None` is the distinguishable "not found" outcome: the engine substitutes a
/// Missing-module sentinel and records a Warning fault instead of failing.
pub trait ModuleLocator: Send + Sync {
    /// Find the module with the given name, or `None` when it cannot be located.
    fn locate(&self, name: &str) -> Option<Box<dyn ModuleReader>>;
}
