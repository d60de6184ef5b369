//! naming-core: an in-process hierarchical naming namespace.
//!
//! This crate contains the pure naming logic with NO transport or
//! persistence dependencies:
//! - Composite-path contexts ([`NamingContext`]): bind, rebind, unbind,
//!   lookup, subcontexts, lazy enumeration
//! - Tagged binding entries ([`Entry`]) with deferred construction via an
//!   injected [`ObjectBuilder`] and link entries resolved from the global
//!   root
//! - Scope resolution ([`ScopeRegistry`]): ambient per-strand slot plus a
//!   module-identity map with configurable parent fallback
//! - URL-scheme dispatch ([`SchemeContext`]): `scheme:relative/path`
//!   addresses forwarded to the active namespace
//! - Canonical tree assembly ([`ContextAssembler`]): the
//!   `comp`/`module`/`app`/`global` four-level structure with listener
//!   hooks
//!
//! Everything is synchronous and in-memory; lifetime is process-bound or
//! ends at an explicit `close()`.

pub mod assembler;
pub mod context;
pub mod entry;
pub mod enumerate;
pub mod error;
pub mod path;
pub mod scope;
pub mod url;

mod sync;

// Re-export commonly used types
pub use assembler::{AssemblyListener, ContextAssembler, WellKnownKey};
pub use context::{NamedObject, NamingContext};
pub use entry::{Descriptor, Entry, EntryKind, Environment, Object, ObjectBuilder};
pub use enumerate::{Binding, Bindings, NamePair, NamePairs};
pub use error::{NamingError, NamingResult};
pub use path::CompositePath;
pub use scope::{ModuleId, ModuleIdentity, ParentFallback, ScopeGuard, ScopeRegistry};
pub use url::SchemeContext;
