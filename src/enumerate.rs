//! Lazy, single-pass enumeration over a context's bindings.
//!
//! Both iterators snapshot the key set when created and fetch each entry
//! from the live context at iteration time. Names unbound since the
//! snapshot are skipped; rebinds are observed. They are consumed by value,
//! so a finished pass cannot be restarted.

use std::sync::Arc;
use std::vec::IntoIter;

use serde::{Deserialize, Serialize};

use crate::context::NamingContext;
use crate::entry::{Entry, EntryKind};

/// Element of [`NamingContext::list`]: a bound name and the discriminant
/// of what it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePair {
    pub name: String,
    pub kind: EntryKind,
}

/// Element of [`NamingContext::list_bindings`]: a bound name and its entry.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub entry: Entry,
}

/// Single-pass `(name, kind)` sequence.
pub struct NamePairs {
    names: IntoIter<String>,
    source: Arc<NamingContext>,
}

impl std::fmt::Debug for NamePairs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamePairs").finish_non_exhaustive()
    }
}

impl NamePairs {
    pub(crate) fn over(source: Arc<NamingContext>) -> Self {
        Self {
            names: source.binding_names().into_iter(),
            source,
        }
    }
}

impl Iterator for NamePairs {
    type Item = NamePair;

    fn next(&mut self) -> Option<NamePair> {
        loop {
            let name = self.names.next()?;
            if let Some(entry) = self.source.entry(&name) {
                return Some(NamePair {
                    name,
                    kind: entry.kind(),
                });
            }
        }
    }
}

/// Single-pass `(name, entry)` sequence.
pub struct Bindings {
    names: IntoIter<String>,
    source: Arc<NamingContext>,
}

impl Bindings {
    pub(crate) fn over(source: Arc<NamingContext>) -> Self {
        Self {
            names: source.binding_names().into_iter(),
            source,
        }
    }
}

impl Iterator for Bindings {
    type Item = Binding;

    fn next(&mut self) -> Option<Binding> {
        loop {
            let name = self.names.next()?;
            if let Some(entry) = self.source.entry(&name) {
                return Some(Binding { name, entry });
            }
        }
    }
}
