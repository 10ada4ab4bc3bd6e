//! Node identity keys.
//!
//! Every entity in the graph - module, type, field, method, property, event,
//! parameter - is identified by one [`NodeKey`], derived from its declaring scope
//! plus its distinguishing signature. The registry guarantees a bijection between
//! key and node instance within one analysis session, so key construction is the
//! single place where "same entity" is decided.
//!
//! # Key Shapes
//!
//! | Entity                | Shape                                        |
//! |-----------------------|----------------------------------------------|
//! | Module                | `app`                                        |
//! | Type                  | `[app]Ns.Name`, nested as `[app]Ns.Outer/Inner` |
//! | Array                 | `<element-key>[,,]`                          |
//! | Generic instantiation | `<definition-key><arg-key,arg-key>`          |
//! | Generic parameter     | `<owner-key>!T`                              |
//! | Method                | `<type-key>::Name` or ``<type-key>::Name`2(sig,sig)`` |
//! | Field/Property/Event  | `<type-key>::Name`                           |
//! | Parameter             | `<method-key>/0`                             |
//!
//! Method keys embed the textual parameter signatures as declared, which keeps key
//! construction free of type resolution; the matching algorithms compare resolved
//! type identities instead.

use std::fmt;
use std::sync::Arc;

/// Identity key of the Null sentinel type.
pub const NULL_TYPE_KEY: &str = "<null>";

/// The unique, cacheable identity of one graph node.
///
/// Keys are interned strings; cloning is cheap and comparison is by content.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(Arc<str>);

impl NodeKey {
    /// Create a key from its textual form.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        NodeKey(Arc::from(key.as_ref()))
    }

    /// The textual form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.0)
    }
}

impl AsRef<str> for NodeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key of a module, which is its session-unique name.
#[must_use]
pub fn module_key(name: &str) -> NodeKey {
    NodeKey::new(name)
}

/// Key of a named type declared in (or referenced into) a module.
#[must_use]
pub fn type_key(module: &str, full_name: &str) -> NodeKey {
    NodeKey::new(format!("[{module}]{full_name}"))
}

/// Key of an array type over a resolved element.
#[must_use]
pub fn array_key(element: &NodeKey, rank: u8) -> NodeKey {
    let mut key = String::with_capacity(element.as_str().len() + rank as usize + 2);
    key.push_str(element.as_str());
    key.push('[');
    for _ in 1..rank.max(1) {
        key.push(',');
    }
    key.push(']');
    NodeKey::new(key)
}

/// Key of a generic instantiation over a resolved definition and argument list.
#[must_use]
pub fn generic_instance_key(definition: &NodeKey, arguments: &[NodeKey]) -> NodeKey {
    let mut key = String::from(definition.as_str());
    key.push('<');
    for (i, arg) in arguments.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(arg.as_str());
    }
    key.push('>');
    NodeKey::new(key)
}

/// Key of a generic parameter, scoped to its declaring type.
#[must_use]
pub fn generic_param_key(owner: &NodeKey, name: &str) -> NodeKey {
    NodeKey::new(format!("{owner}!{name}"))
}

/// Key of a field, property or event, scoped to its declaring type.
#[must_use]
pub fn member_key(declaring: &NodeKey, name: &str) -> NodeKey {
    NodeKey::new(format!("{declaring}::{name}"))
}

/// Key of a method, distinguishing overloads by generic arity and the textual
/// parameter signature list.
#[must_use]
pub fn method_key(
    declaring: &NodeKey,
    name: &str,
    generic_arity: u16,
    param_sigs: &[String],
) -> NodeKey {
    let mut key = format!("{declaring}::{name}");
    if generic_arity > 0 {
        key.push('`');
        key.push_str(&generic_arity.to_string());
    }
    key.push('(');
    for (i, sig) in param_sigs.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(sig);
    }
    key.push(')');
    NodeKey::new(key)
}

/// Key of a parameter, scoped to its declaring method by position.
#[must_use]
pub fn param_key(method: &NodeKey, index: usize) -> NodeKey {
    NodeKey::new(format!("{method}/{index}"))
}
