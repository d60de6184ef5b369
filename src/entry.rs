//! Binding entries and the deferred-construction seam.
//!
//! An [`Entry`] is one slot in a context's bindings map. The tagged union
//! replaces open-ended runtime type inspection: `lookup` dispatches on the
//! variant, and only `Deferred` entries ever reach the injected
//! [`ObjectBuilder`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::NamingContext;

/// A live object stored in the tree. Opaque to the naming layer.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Environment table attached to a context.
pub type Environment = HashMap<String, Value>;

/// A stored construction recipe, resolved lazily on lookup by the
/// installed [`ObjectBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Builder-facing discriminator (e.g. `"datasource"`).
    pub kind: String,
    /// Free-form recipe body.
    #[serde(default)]
    pub spec: Value,
}

impl Descriptor {
    pub fn new(kind: impl Into<String>, spec: Value) -> Self {
        Self {
            kind: kind.into(),
            spec,
        }
    }
}

/// One binding slot in a context.
#[derive(Clone)]
pub enum Entry {
    /// A live value, returned from lookup as-is.
    Value(Object),
    /// A nested context, addressable with further segments.
    Subcontext(Arc<NamingContext>),
    /// A recipe built on first lookup.
    Deferred(Descriptor),
    /// An alias whose target is re-resolved from the global root,
    /// never from the node holding the link.
    Link(String),
}

impl Entry {
    /// Wrap an arbitrary value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Entry::Value(Arc::new(value))
    }

    pub fn deferred(descriptor: Descriptor) -> Self {
        Entry::Deferred(descriptor)
    }

    pub fn link(target: impl Into<String>) -> Self {
        Entry::Link(target.into())
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Value(_) => EntryKind::Value,
            Entry::Subcontext(_) => EntryKind::Subcontext,
            Entry::Deferred(_) => EntryKind::Deferred,
            Entry::Link(_) => EntryKind::Link,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Value(_) => f.write_str("Value(<object>)"),
            Entry::Subcontext(ctx) => write!(f, "Subcontext({})", ctx.id()),
            Entry::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
            Entry::Link(t) => f.debug_tuple("Link").field(t).finish(),
        }
    }
}

/// Discriminant of an [`Entry`], reported by `list`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    Value,
    Subcontext,
    Deferred,
    Link,
}

/// Builds live objects out of deferred descriptors.
///
/// Invoked only when a looked-up entry is [`Entry::Deferred`]. Failures are
/// wrapped by the caller as a construction failure with the root cause
/// preserved.
pub trait ObjectBuilder: Send + Sync {
    fn build(
        &self,
        descriptor: &Descriptor,
        resolved_path: &str,
        node: &Arc<NamingContext>,
        environment: &Environment,
    ) -> anyhow::Result<Object>;
}
