//! URL-scheme front-end.
//!
//! A `SchemeContext` maps absolute `scheme:relative/path` addresses onto
//! whatever namespace the [`ScopeRegistry`] says is active for the caller,
//! then forwards the operation with the stripped relative path. It holds
//! no tree of its own.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::context::{NamedObject, NamingContext};
use crate::entry::{Entry, Environment};
use crate::enumerate::{Bindings, NamePairs};
use crate::error::{NamingError, NamingResult};
use crate::scope::{ModuleIdentity, ScopeRegistry};

/// Front-end for one URL scheme (e.g. addresses of the form
/// `java:comp/env/...`).
pub struct SchemeContext {
    /// The scheme including the trailing `:`, e.g. `"java:"`.
    prefix: String,
    registry: Arc<ScopeRegistry>,
    /// Identity of the component this front-end serves, used for
    /// module-map fallback when no ambient scope is bound.
    caller: Option<ModuleIdentity>,
}

impl SchemeContext {
    pub fn new(scheme: impl AsRef<str>, registry: Arc<ScopeRegistry>) -> Self {
        Self {
            prefix: format!("{}:", scheme.as_ref()),
            registry,
            caller: None,
        }
    }

    /// A front-end resolving on behalf of a specific module identity.
    pub fn for_module(
        scheme: impl AsRef<str>,
        registry: Arc<ScopeRegistry>,
        caller: ModuleIdentity,
    ) -> Self {
        Self {
            caller: Some(caller),
            ..Self::new(scheme, registry)
        }
    }

    /// The `scheme:` prefix this front-end answers to.
    pub fn name_in_namespace(&self) -> &str {
        &self.prefix
    }

    /// Strip the scheme prefix, tolerating one trailing separator.
    fn relative_name<'n>(&self, name: &'n str) -> NamingResult<&'n str> {
        let Some(rest) = name.strip_prefix(&self.prefix) else {
            return Err(NamingError::InvalidName(format!(
                "expected '{}' prefix: {name}",
                self.prefix
            )));
        };
        Ok(rest.strip_suffix('/').unwrap_or(rest))
    }

    fn active(&self) -> NamingResult<Arc<NamingContext>> {
        self.registry.resolve_for(self.caller.as_ref())
    }

    // ── Forwarded operations ─────────────────────────────────────

    pub fn lookup(&self, name: &str) -> NamingResult<NamedObject> {
        let relative = self.relative_name(name)?;
        trace!(prefix = %self.prefix, name = relative, "forward lookup");
        self.active()?.lookup(relative)
    }

    pub fn lookup_link(&self, name: &str) -> NamingResult<NamedObject> {
        let relative = self.relative_name(name)?;
        self.active()?.lookup_link(relative)
    }

    pub fn bind(&self, name: &str, entry: Entry) -> NamingResult<()> {
        let relative = self.relative_name(name)?;
        self.active()?.bind(relative, entry)
    }

    pub fn rebind(&self, name: &str, entry: Entry) -> NamingResult<()> {
        let relative = self.relative_name(name)?;
        self.active()?.rebind(relative, entry)
    }

    pub fn unbind(&self, name: &str) -> NamingResult<()> {
        let relative = self.relative_name(name)?;
        self.active()?.unbind(relative)
    }

    /// Both names must carry the scheme prefix.
    pub fn rename(&self, old: &str, new: &str) -> NamingResult<()> {
        let old = self.relative_name(old)?;
        let new = self.relative_name(new)?;
        self.active()?.rename(old, new)
    }

    pub fn create_subcontext(&self, name: &str) -> NamingResult<Arc<NamingContext>> {
        let relative = self.relative_name(name)?;
        self.active()?.create_subcontext(relative)
    }

    pub fn destroy_subcontext(&self, name: &str) -> NamingResult<()> {
        let relative = self.relative_name(name)?;
        self.active()?.destroy_subcontext(relative)
    }

    pub fn list(&self, name: &str) -> NamingResult<NamePairs> {
        let relative = self.relative_name(name)?;
        self.active()?.list(relative)
    }

    pub fn list_bindings(&self, name: &str) -> NamingResult<Bindings> {
        let relative = self.relative_name(name)?;
        self.active()?.list_bindings(relative)
    }

    // ── Environment and lifecycle forwards (no name involved) ────

    pub fn add_to_environment(
        &self,
        key: impl Into<String>,
        value: Value,
    ) -> NamingResult<Option<Value>> {
        Ok(self.active()?.add_to_environment(key, value))
    }

    pub fn remove_from_environment(&self, key: &str) -> NamingResult<Option<Value>> {
        Ok(self.active()?.remove_from_environment(key))
    }

    pub fn environment(&self) -> NamingResult<Environment> {
        Ok(self.active()?.environment())
    }

    pub fn close(&self) -> NamingResult<()> {
        self.active()?.close();
        Ok(())
    }

    /// Join a name onto a prefix without resolving either.
    pub fn compose_name(&self, name: &str, prefix: &str) -> String {
        format!("{prefix}/{name}")
    }
}
