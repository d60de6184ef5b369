//! Scope resolution: which namespace tree is active for the calling
//! strand, without threading it through every call.
//!
//! Two independent mechanisms, consulted in order:
//! 1. an ambient per-thread slot with single-level save/restore;
//! 2. a concurrent map from module identity to namespace root, with a
//!    configurable parent fallback.
//!
//! The ambient slot is per-registry and per-thread, never a bare global.
//! Cross-strand propagation is explicit: the parent captures
//! [`ScopeRegistry::current_scope`] and the spawned strand binds it
//! itself; mutations in the child never leak back.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::context::NamingContext;
use crate::error::{NamingError, NamingResult};
use crate::sync;

/// Opaque module/loader identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A module identity together with its declared parent chain.
///
/// The registry itself only keys on [`ModuleId`]; the chain exists so a
/// caller can fall back to an ancestor's registration.
#[derive(Debug, Clone)]
pub struct ModuleIdentity {
    id: ModuleId,
    parent: Option<Arc<ModuleIdentity>>,
}

impl ModuleIdentity {
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
        }
    }

    pub fn with_parent(id: impl Into<ModuleId>, parent: ModuleIdentity) -> Self {
        Self {
            id: id.into(),
            parent: Some(Arc::new(parent)),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn parent(&self) -> Option<&ModuleIdentity> {
        self.parent.as_deref()
    }
}

/// How far [`ScopeRegistry::resolve_for`] walks a caller's declared
/// parent chain when the caller itself has no registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParentFallback {
    /// Caller id, then its immediate parent only.
    #[default]
    OneLevel,
    /// Caller id, then every declared ancestor in order.
    FullChain,
}

#[derive(Default)]
struct AmbientSlot {
    current: Option<Arc<NamingContext>>,
    /// Single-level history: a second save overwrites this.
    previous: Option<Arc<NamingContext>>,
}

/// Supplies "the current namespace" per calling strand.
pub struct ScopeRegistry {
    ambient: Mutex<HashMap<ThreadId, AmbientSlot>>,
    modules: RwLock<HashMap<ModuleId, Arc<NamingContext>>>,
    parent_fallback: ParentFallback,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::with_parent_fallback(ParentFallback::default())
    }

    pub fn with_parent_fallback(parent_fallback: ParentFallback) -> Self {
        Self {
            ambient: Mutex::new(HashMap::new()),
            modules: RwLock::new(HashMap::new()),
            parent_fallback,
        }
    }

    pub fn parent_fallback(&self) -> ParentFallback {
        self.parent_fallback
    }

    // ── Ambient slot ─────────────────────────────────────────────

    /// Install `node` as the calling strand's active namespace, saving the
    /// currently active one as the single restorable previous value.
    /// Repeated saves beyond one level lose the older value.
    pub fn bind_scope(&self, node: Arc<NamingContext>) {
        let mut ambient = sync::lock(&self.ambient);
        let slot = ambient.entry(thread::current().id()).or_default();
        slot.previous = slot.current.take();
        debug!(context = node.id(), "bind ambient scope");
        slot.current = Some(node);
    }

    /// Restore the previously saved value into the active slot and clear
    /// the history. A strand that bound a scope should unbind it before
    /// exiting.
    pub fn unbind_scope(&self) {
        let mut ambient = sync::lock(&self.ambient);
        let id = thread::current().id();
        if let Some(slot) = ambient.get_mut(&id) {
            slot.current = slot.previous.take();
            if slot.current.is_none() {
                ambient.remove(&id);
            }
        }
    }

    /// The calling strand's active namespace, if any.
    pub fn current_scope(&self) -> Option<Arc<NamingContext>> {
        sync::lock(&self.ambient)
            .get(&thread::current().id())
            .and_then(|slot| slot.current.clone())
    }

    /// RAII sugar over the bind/unbind pair.
    pub fn enter(&self, node: Arc<NamingContext>) -> ScopeGuard<'_> {
        self.bind_scope(node);
        ScopeGuard { registry: self }
    }

    // ── Module-identity map ──────────────────────────────────────

    pub fn bind_module(&self, id: ModuleId, node: Arc<NamingContext>) {
        debug!(module = %id, context = node.id(), "bind module scope");
        sync::write(&self.modules).insert(id, node);
    }

    pub fn unbind_module(&self, id: &ModuleId) -> Option<Arc<NamingContext>> {
        debug!(module = %id, "unbind module scope");
        sync::write(&self.modules).remove(id)
    }

    /// Direct module-map lookup, no ambient slot and no parent fallback.
    pub fn module_scope(&self, id: &ModuleId) -> Option<Arc<NamingContext>> {
        sync::read(&self.modules).get(id).cloned()
    }

    // ── Resolution ───────────────────────────────────────────────

    /// The active namespace for a caller with no module identity:
    /// the ambient slot or nothing.
    pub fn resolve(&self) -> NamingResult<Arc<NamingContext>> {
        self.resolve_for(None)
    }

    /// The active namespace: ambient slot first, then the module map by
    /// the caller's id, then by its declared parent(s) per the configured
    /// [`ParentFallback`].
    pub fn resolve_for(
        &self,
        caller: Option<&ModuleIdentity>,
    ) -> NamingResult<Arc<NamingContext>> {
        if let Some(node) = self.current_scope() {
            return Ok(node);
        }
        let Some(caller) = caller else {
            return Err(NamingError::NoActiveScope);
        };
        let modules = sync::read(&self.modules);
        if let Some(node) = modules.get(caller.id()) {
            return Ok(Arc::clone(node));
        }
        let mut ancestor = caller.parent();
        while let Some(identity) = ancestor {
            if let Some(node) = modules.get(identity.id()) {
                return Ok(Arc::clone(node));
            }
            ancestor = match self.parent_fallback {
                ParentFallback::OneLevel => None,
                ParentFallback::FullChain => identity.parent(),
            };
        }
        Err(NamingError::NoActiveScope)
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the previously bound ambient scope on drop.
#[must_use = "dropping the guard immediately unbinds the scope"]
pub struct ScopeGuard<'a> {
    registry: &'a ScopeRegistry,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.registry.unbind_scope();
    }
}
