//! Canonical tree assembly.
//!
//! One tree is assembled per deployable unit: a fresh root with a `comp`
//! subcontext, the process-wide `global` root, and `module`/`app` entries
//! that fall back along comp ⊆ module ⊆ app when no dedicated context is
//! supplied. Registered listeners run once per freshly built tree, in
//! registration order, and may add further bindings.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::context::NamingContext;
use crate::entry::{Entry, ObjectBuilder};
use crate::error::NamingResult;
use crate::sync;

/// Well-known keys of an assembled tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WellKnownKey {
    Comp,
    Module,
    App,
    Global,
}

impl WellKnownKey {
    pub fn as_str(self) -> &'static str {
        match self {
            WellKnownKey::Comp => "comp",
            WellKnownKey::Module => "module",
            WellKnownKey::App => "app",
            WellKnownKey::Global => "global",
        }
    }
}

/// Invoked once per freshly assembled tree; may mutate it.
pub trait AssemblyListener: Send + Sync {
    fn on_assembled(&self, root: &Arc<NamingContext>) -> NamingResult<()>;
}

/// Builds canonical four-level namespace trees around a shared global
/// root.
pub struct ContextAssembler {
    global: Arc<NamingContext>,
    builder: Option<Arc<dyn ObjectBuilder>>,
    listeners: RwLock<Vec<Arc<dyn AssemblyListener>>>,
}

impl ContextAssembler {
    pub fn new(global: Arc<NamingContext>) -> Self {
        Self {
            global,
            builder: None,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Install a default object builder for every tree this assembler
    /// creates.
    pub fn with_builder(mut self, builder: Arc<dyn ObjectBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    /// The process-wide shared global root.
    pub fn global(&self) -> &Arc<NamingContext> {
        &self.global
    }

    pub fn add_listener(&self, listener: Arc<dyn AssemblyListener>) {
        sync::write(&self.listeners).push(listener);
    }

    /// Remove a previously added listener (pointer identity).
    pub fn remove_listener(&self, listener: &Arc<dyn AssemblyListener>) {
        sync::write(&self.listeners).retain(|known| !Arc::ptr_eq(known, listener));
    }

    /// A bare tree root wired with this assembler's builder and global
    /// root, without the canonical structure.
    pub fn create_context(&self, id: impl Into<String>) -> Arc<NamingContext> {
        let root = NamingContext::new(id);
        if let Some(builder) = &self.builder {
            root.set_builder(Arc::clone(builder));
        }
        root.set_global_root(Arc::clone(&self.global));
        root
    }

    /// Build the canonical tree for one deployable unit.
    ///
    /// `module`/`app` fall back to the next-narrower level when not
    /// supplied: a missing module context reuses `comp`, a missing app
    /// context reuses whatever `module` resolved to.
    pub fn assemble(
        &self,
        id: impl Into<String>,
        module: Option<Arc<NamingContext>>,
        app: Option<Arc<NamingContext>>,
    ) -> NamingResult<Arc<NamingContext>> {
        let root = self.create_context(id);

        let comp = root.create_subcontext(WellKnownKey::Comp.as_str())?;
        root.add_binding(
            WellKnownKey::Global.as_str(),
            Entry::Subcontext(Arc::clone(&self.global)),
        )?;

        let module = module.unwrap_or_else(|| Arc::clone(&comp));
        root.add_binding(
            WellKnownKey::Module.as_str(),
            Entry::Subcontext(Arc::clone(&module)),
        )?;

        let app = app.unwrap_or(module);
        root.add_binding(WellKnownKey::App.as_str(), Entry::Subcontext(app))?;

        for listener in sync::read(&self.listeners).clone() {
            listener.on_assembled(&root)?;
        }

        debug!(id = root.id(), "assembled namespace tree");
        Ok(root)
    }
}
