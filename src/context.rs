//! The namespace tree node.
//!
//! A `NamingContext` is a mutable map of named bindings addressed by
//! slash-separated composite paths. Deep names auto-vivify missing
//! intermediate subcontexts on `bind`/`rebind`/`create_subcontext`, and a
//! context can delegate to a wrapped peer either on local miss or for every
//! lookup.
//!
//! Mutation discipline: every operation takes a per-node lock for the
//! duration of its local step and releases it before recursing into a
//! child, so deep traversals never hold two locks at once. Concurrent
//! structural mutation of the same node is safe but unsequenced; callers
//! that need a stable order must serialize themselves.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, trace};

use crate::entry::{Descriptor, Entry, Environment, Object, ObjectBuilder};
use crate::enumerate::{Bindings, NamePairs};
use crate::error::{NamingError, NamingResult};
use crate::path::CompositePath;
use crate::sync;

/// Result of a lookup: a plain value or a context that can be traversed
/// further.
#[derive(Clone)]
pub enum NamedObject {
    Value(Object),
    Context(Arc<NamingContext>),
}

impl NamedObject {
    pub fn into_value(self) -> Option<Object> {
        match self {
            NamedObject::Value(v) => Some(v),
            NamedObject::Context(_) => None,
        }
    }

    pub fn into_context(self) -> Option<Arc<NamingContext>> {
        match self {
            NamedObject::Value(_) => None,
            NamedObject::Context(ctx) => Some(ctx),
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, NamedObject::Context(_))
    }

    /// Downcast a `Value` result to a concrete type.
    pub fn downcast_ref<T: std::any::Any>(&self) -> Option<&T> {
        match self {
            NamedObject::Value(v) => v.downcast_ref::<T>(),
            NamedObject::Context(_) => None,
        }
    }
}

impl fmt::Debug for NamedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedObject::Value(_) => f.write_str("Value(<object>)"),
            NamedObject::Context(ctx) => write!(f, "Context({})", ctx.id()),
        }
    }
}

impl From<NamedObject> for Entry {
    fn from(obj: NamedObject) -> Self {
        match obj {
            NamedObject::Value(v) => Entry::Value(v),
            NamedObject::Context(ctx) => Entry::Subcontext(ctx),
        }
    }
}

#[derive(Clone)]
struct Delegate {
    target: Arc<NamingContext>,
    wrap_all: bool,
}

/// One node of the namespace tree.
pub struct NamingContext {
    /// Debug label shared by a tree and its subcontexts.
    id: String,
    bindings: RwLock<HashMap<String, Entry>>,
    environment: RwLock<Environment>,
    delegate: RwLock<Option<Delegate>>,
    builder: RwLock<Option<Arc<dyn ObjectBuilder>>>,
    /// Where `Link` entries restart resolution. Inherited by subcontexts.
    global_root: RwLock<Option<Arc<NamingContext>>>,
}

impl NamingContext {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Self::with_environment(id, Environment::new())
    }

    /// A root node with an initial environment table.
    pub fn with_environment(id: impl Into<String>, environment: Environment) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            bindings: RwLock::new(HashMap::new()),
            environment: RwLock::new(environment),
            delegate: RwLock::new(None),
            builder: RwLock::new(None),
            global_root: RwLock::new(None),
        })
    }

    /// A child node sharing this node's id, environment snapshot, builder
    /// and global-root handle. The environment copy is independent from
    /// this point on.
    fn child(&self) -> Arc<Self> {
        Arc::new(Self {
            id: self.id.clone(),
            bindings: RwLock::new(HashMap::new()),
            environment: RwLock::new(sync::read(&self.environment).clone()),
            delegate: RwLock::new(None),
            builder: RwLock::new(sync::read(&self.builder).clone()),
            global_root: RwLock::new(sync::read(&self.global_root).clone()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The node's name in its own namespace. Debug label only.
    pub fn name_in_namespace(&self) -> &str {
        &self.id
    }

    /// Install the builder invoked for `Deferred` entries. Subcontexts
    /// created afterwards inherit it.
    pub fn set_builder(&self, builder: Arc<dyn ObjectBuilder>) {
        *sync::write(&self.builder) = Some(builder);
    }

    /// Attach the root against which `Link` entries are resolved.
    /// Subcontexts created afterwards inherit it.
    pub fn set_global_root(&self, root: Arc<NamingContext>) {
        *sync::write(&self.global_root) = Some(root);
    }

    /// Install a delegate context. With `wrap_all` every lookup forwards
    /// unconditionally; otherwise only local misses do. `bind` forwards
    /// whenever a delegate is installed, regardless of `wrap_all`.
    pub fn add_wrapped(&self, target: Arc<NamingContext>, wrap_all: bool) {
        *sync::write(&self.delegate) = Some(Delegate { target, wrap_all });
    }

    // ── Lookup ───────────────────────────────────────────────────

    /// Resolve a composite name. The empty name resolves to this context.
    /// `Deferred` entries are built via the installed [`ObjectBuilder`];
    /// `Link` entries restart resolution from the attached global root.
    pub fn lookup(self: &Arc<Self>, name: &str) -> NamingResult<NamedObject> {
        let path = CompositePath::parse(name);
        if path.is_empty() {
            return Ok(NamedObject::Context(Arc::clone(self)));
        }
        if path.depth() > 1 {
            let sub = self.lookup_subcontext(path.head().unwrap_or_default())?;
            return sub.lookup(&path.suffix(1).to_string());
        }

        if let Some(delegate) = self.delegate() {
            if delegate.wrap_all {
                return delegate.target.lookup(name);
            }
        }

        trace!(context = %self.id, name, "lookup");
        let entry = match self.entry(name) {
            Some(entry) => entry,
            None => match self.delegate() {
                Some(delegate) => return delegate.target.lookup(name),
                None => return Err(NamingError::NotFound(name.to_owned())),
            },
        };
        self.resolve_entry(name, entry)
    }

    /// Alias for [`lookup`](Self::lookup): terminal links are followed.
    pub fn lookup_link(self: &Arc<Self>, name: &str) -> NamingResult<NamedObject> {
        self.lookup(name)
    }

    fn resolve_entry(self: &Arc<Self>, name: &str, entry: Entry) -> NamingResult<NamedObject> {
        match entry {
            Entry::Value(v) => Ok(NamedObject::Value(v)),
            Entry::Subcontext(ctx) => Ok(NamedObject::Context(ctx)),
            Entry::Deferred(descriptor) => self.build_deferred(name, &descriptor),
            Entry::Link(target) => self.follow_link(&target),
        }
    }

    fn build_deferred(
        self: &Arc<Self>,
        name: &str,
        descriptor: &Descriptor,
    ) -> NamingResult<NamedObject> {
        let Some(builder) = sync::read(&self.builder).clone() else {
            return Err(NamingError::BuildFailed {
                name: name.to_owned(),
                source: anyhow::anyhow!("no object builder installed on context '{}'", self.id),
            });
        };
        let environment = sync::read(&self.environment).clone();
        debug!(context = %self.id, name, kind = %descriptor.kind, "building deferred object");
        let built = builder
            .build(descriptor, name, self, &environment)
            .map_err(|source| NamingError::BuildFailed {
                name: name.to_owned(),
                source,
            })?;
        Ok(NamedObject::Value(built))
    }

    fn follow_link(self: &Arc<Self>, target: &str) -> NamingResult<NamedObject> {
        let Some(root) = sync::read(&self.global_root).clone() else {
            return Err(NamingError::LinkFailed {
                target: target.to_owned(),
                source: anyhow::anyhow!("context '{}' has no global root attached", self.id),
            });
        };
        trace!(context = %self.id, target, "following link");
        root.lookup(target).map_err(|source| NamingError::LinkFailed {
            target: target.to_owned(),
            source: anyhow::Error::new(source),
        })
    }

    /// An existing subcontext for one segment. No auto-vivification.
    fn lookup_subcontext(&self, segment: &str) -> NamingResult<Arc<NamingContext>> {
        match sync::read(&self.bindings).get(segment) {
            Some(Entry::Subcontext(ctx)) => Ok(Arc::clone(ctx)),
            Some(_) => Err(NamingError::NotAContext(segment.to_owned())),
            None => Err(NamingError::NotFound(segment.to_owned())),
        }
    }

    /// An existing subcontext for one segment, created if absent. The
    /// check and the insert happen under one write lock so two concurrent
    /// binds through the same missing intermediate agree on a single node.
    fn subcontext_for(&self, segment: &str) -> NamingResult<Arc<NamingContext>> {
        let mut bindings = sync::write(&self.bindings);
        match bindings.get(segment) {
            Some(Entry::Subcontext(ctx)) => Ok(Arc::clone(ctx)),
            Some(_) => Err(NamingError::NotAContext(segment.to_owned())),
            None => {
                let created = self.child();
                bindings.insert(segment.to_owned(), Entry::Subcontext(Arc::clone(&created)));
                debug!(context = %self.id, segment, "auto-created intermediate subcontext");
                Ok(created)
            }
        }
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Bind a name to an entry. Missing intermediate subcontexts are
    /// created; an occupied leaf fails `AlreadyBound`.
    pub fn bind(self: &Arc<Self>, name: &str, entry: Entry) -> NamingResult<()> {
        let path = CompositePath::parse(name);
        if path.is_empty() {
            return Err(NamingError::InvalidName("cannot bind an empty name".into()));
        }
        if path.depth() > 1 {
            let sub = self.subcontext_for(path.head().unwrap_or_default())?;
            return sub.bind(&path.suffix(1).to_string(), entry);
        }

        if let Some(delegate) = self.delegate() {
            return delegate.target.bind(name, entry);
        }
        let mut bindings = sync::write(&self.bindings);
        if bindings.contains_key(name) {
            return Err(NamingError::AlreadyBound(name.to_owned()));
        }
        debug!(context = %self.id, name, kind = %entry.kind(), "bind");
        bindings.insert(name.to_owned(), entry);
        Ok(())
    }

    /// Bind a name to an entry, overwriting any existing leaf binding.
    pub fn rebind(self: &Arc<Self>, name: &str, entry: Entry) -> NamingResult<()> {
        let path = CompositePath::parse(name);
        if path.is_empty() {
            return Err(NamingError::InvalidName(
                "cannot rebind an empty name".into(),
            ));
        }
        if path.depth() > 1 {
            let sub = self.subcontext_for(path.head().unwrap_or_default())?;
            return sub.rebind(&path.suffix(1).to_string(), entry);
        }
        debug!(context = %self.id, name, kind = %entry.kind(), "rebind");
        sync::write(&self.bindings).insert(name.to_owned(), entry);
        Ok(())
    }

    /// Remove a binding. Fails `NotFound` if the leaf (or any intermediate
    /// subcontext) is absent.
    pub fn unbind(self: &Arc<Self>, name: &str) -> NamingResult<()> {
        let path = CompositePath::parse(name);
        if path.is_empty() {
            return Err(NamingError::InvalidName(
                "cannot unbind an empty name".into(),
            ));
        }
        if path.depth() > 1 {
            let sub = self.lookup_subcontext(path.head().unwrap_or_default())?;
            return sub.unbind(&path.suffix(1).to_string());
        }
        if sync::write(&self.bindings).remove(name).is_none() {
            return Err(NamingError::NotFound(name.to_owned()));
        }
        debug!(context = %self.id, name, "unbind");
        Ok(())
    }

    /// Rebind the object under `new` and unbind `old` — in that order,
    /// best effort, not atomic. A failure between the steps leaves `old`
    /// bound and `new` possibly already visible.
    pub fn rename(self: &Arc<Self>, old: &str, new: &str) -> NamingResult<()> {
        let obj = self.lookup(old)?;
        self.rebind(new, Entry::from(obj))?;
        self.unbind(old)
    }

    /// Create (and bind) a subcontext, auto-vivifying intermediates. The
    /// new node snapshots this node's environment at creation time.
    pub fn create_subcontext(self: &Arc<Self>, name: &str) -> NamingResult<Arc<NamingContext>> {
        let path = CompositePath::parse(name);
        if path.is_empty() {
            return Err(NamingError::InvalidName(
                "cannot create a subcontext with an empty name".into(),
            ));
        }
        if path.depth() > 1 {
            let sub = self.subcontext_for(path.head().unwrap_or_default())?;
            return sub.create_subcontext(&path.suffix(1).to_string());
        }
        let created = self.child();
        debug!(context = %self.id, name, "create subcontext");
        sync::write(&self.bindings).insert(name.to_owned(), Entry::Subcontext(Arc::clone(&created)));
        Ok(created)
    }

    /// Not supported: subcontexts cannot be destroyed, only unbound.
    pub fn destroy_subcontext(&self, _name: &str) -> NamingResult<()> {
        Err(NamingError::Unsupported("destroy_subcontext"))
    }

    /// Name composition is not defined for tree nodes.
    pub fn compose_name(&self, _name: &str, _prefix: &str) -> NamingResult<String> {
        Err(NamingError::Unsupported("compose_name"))
    }

    /// Bootstrap-only: add a binding without auto-vivification or
    /// overwrite. Fails fast if the key is already taken.
    pub fn add_binding(&self, key: &str, entry: Entry) -> NamingResult<()> {
        let mut bindings = sync::write(&self.bindings);
        if bindings.contains_key(key) {
            return Err(NamingError::AlreadyBound(key.to_owned()));
        }
        bindings.insert(key.to_owned(), entry);
        Ok(())
    }

    // ── Enumeration ──────────────────────────────────────────────

    /// Lazy, single-pass sequence of `(name, kind)` pairs over the named
    /// context's current bindings. Concurrent mutation while iterating has
    /// unspecified effect on the enumeration.
    pub fn list(self: &Arc<Self>, name: &str) -> NamingResult<NamePairs> {
        if name.is_empty() {
            return Ok(NamePairs::over(Arc::clone(self)));
        }
        match self.lookup(name)? {
            NamedObject::Context(ctx) => ctx.list(""),
            NamedObject::Value(_) => Err(NamingError::NotAContext(name.to_owned())),
        }
    }

    /// Like [`list`](Self::list) but yields the entries themselves.
    pub fn list_bindings(self: &Arc<Self>, name: &str) -> NamingResult<Bindings> {
        if name.is_empty() {
            return Ok(Bindings::over(Arc::clone(self)));
        }
        match self.lookup(name)? {
            NamedObject::Context(ctx) => ctx.list_bindings(""),
            NamedObject::Value(_) => Err(NamingError::NotAContext(name.to_owned())),
        }
    }

    pub(crate) fn binding_names(&self) -> Vec<String> {
        sync::read(&self.bindings).keys().cloned().collect()
    }

    pub(crate) fn entry(&self, name: &str) -> Option<Entry> {
        sync::read(&self.bindings).get(name).cloned()
    }

    // ── Environment ──────────────────────────────────────────────

    /// Add or overwrite one environment property; returns the previous
    /// value if any.
    pub fn add_to_environment(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        sync::write(&self.environment).insert(key.into(), value)
    }

    /// Remove one environment property; returns the removed value if any.
    pub fn remove_from_environment(&self, key: &str) -> Option<Value> {
        sync::write(&self.environment).remove(key)
    }

    /// The environment currently in effect. Callers must not rely on
    /// independence of the returned table from later mutations.
    pub fn environment(&self) -> Environment {
        sync::read(&self.environment).clone()
    }

    /// Clear the environment table. Idempotent; bindings and subcontexts
    /// are untouched. Behavior of further mutation after close is
    /// undefined by contract, though this implementation keeps the node
    /// usable.
    pub fn close(&self) {
        sync::write(&self.environment).clear();
        debug!(context = %self.id, "closed");
    }

    fn delegate(&self) -> Option<Delegate> {
        sync::read(&self.delegate).clone()
    }
}

impl fmt::Debug for NamingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamingContext")
            .field("id", &self.id)
            .field("bindings", &sync::read(&self.bindings).len())
            .finish()
    }
}
