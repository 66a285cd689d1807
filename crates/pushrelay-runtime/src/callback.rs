//! Callback resolution
//!
//! Maps persisted callback handles back to host entry points. The relay
//! resolves the dispatcher handle before bootstrapping the background
//! environment, and the message callback handle before every dispatch.

use std::collections::HashMap;
use std::sync::RwLock;

use pushrelay_core::CallbackHandle;
use serde::{Deserialize, Serialize};

/// Host entry point a handle resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackInfo {
    /// Entry point name
    pub name: String,
    /// Library the entry point lives in
    pub library_path: String,
}

impl CallbackInfo {
    pub fn new<N: Into<String>, L: Into<String>>(name: N, library_path: L) -> Self {
        Self {
            name: name.into(),
            library_path: library_path.into(),
        }
    }
}

/// Resolves callback handles to entry points
pub trait CallbackResolver: Send + Sync {
    /// `None` when the handle is unknown to the host
    fn lookup(&self, handle: CallbackHandle) -> Option<CallbackInfo>;
}

// ----------------------------------------------------------------------------
// Callback Registry
// ----------------------------------------------------------------------------

/// In-process handle table
///
/// Hosts register their entry points at startup; the unset handle never
/// resolves.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    callbacks: RwLock<HashMap<CallbackHandle, CallbackInfo>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the entry point for `handle`
    pub fn register(&self, handle: CallbackHandle, info: CallbackInfo) {
        if handle.is_unset() {
            return;
        }
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callbacks.insert(handle, info);
    }

    pub fn unregister(&self, handle: CallbackHandle) -> Option<CallbackInfo> {
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callbacks.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CallbackResolver for CallbackRegistry {
    fn lookup(&self, handle: CallbackHandle) -> Option<CallbackInfo> {
        if handle.is_unset() {
            return None;
        }
        self.callbacks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&handle)
            .cloned()
    }
}
