//! Session commands forwarded to the engine.
//!
//! Each command checks for an active session first and fails with
//! `NoSession` otherwise. Keycodes and masks pass through untouched; the
//! engine and the host agree on their meaning.

use std::ops::Deref;

use crate::api::RimeApi;
use crate::error::{BridgeError, Result};
use crate::ffi::{RimeCommit, RimeSessionId};
use crate::handle::RimeHandle;
use crate::marshal::{host_to_native, native_to_host};
use crate::snapshot::{translate, Context, ContextGuard};

impl<A: RimeApi> RimeHandle<A> {
    /// Forward a key event. Returns whether the engine consumed it.
    pub fn process_key(&self, keycode: i32, mask: i32) -> Result<bool> {
        let session = self.session_id()?;
        let handled = self.api().process_key(session, keycode, mask);
        tracing::trace!(keycode, mask, handled, "process_key");
        Ok(handled)
    }

    pub fn clear_composition(&self) -> Result<()> {
        let session = self.session_id()?;
        self.api().clear_composition(session);
        Ok(())
    }

    /// The raw input buffer, if the engine has one.
    pub fn get_input(&self) -> Result<Option<String>> {
        let session = self.session_id()?;
        let input = self.api().get_input(session);
        // SAFETY: the engine keeps the input buffer alive until the next call
        // on this session; it is copied before that.
        Ok(unsafe { native_to_host(input) })
    }

    /// Take the pending commit, if any.
    pub fn get_commit(&self) -> Result<Option<String>> {
        let session = self.session_id()?;
        let Some(commit) = CommitGuard::fetch(self.api(), session) else {
            return Ok(None);
        };
        // SAFETY: `text` is null or a string owned by `commit` until drop.
        Ok(unsafe { native_to_host(commit.text) })
    }

    /// Select a schema by id. True iff the engine knows the schema.
    pub fn select_schema(&self, schema_id: &str) -> Result<bool> {
        let session = self.session_id()?;
        let Some(id) = host_to_native(Some(schema_id))? else {
            return Ok(false);
        };
        let selected = self.api().select_schema(session, &id);
        tracing::debug!(schema_id, selected, "select_schema");
        Ok(selected)
    }

    /// Snapshot the session's context.
    ///
    /// `None` when the engine has no context, and also when it has one
    /// without preedit text: a context is never returned partially filled.
    pub fn get_context(&self) -> Result<Option<Context>> {
        let session = self.session_id()?;
        let Some(raw) = ContextGuard::fetch(self.api(), session) else {
            return Ok(None);
        };
        // SAFETY: `raw` was filled by the engine and is freed only when the
        // guard drops, after translation has copied everything out.
        match unsafe { translate(&raw) } {
            Ok(context) => Ok(Some(context)),
            Err(BridgeError::EmptyComposition) => {
                tracing::warn!("context without preedit, reporting none");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run the engine's user data sync. Needs no session.
    pub fn sync_user_data(&self) -> bool {
        self.api().sync_user_data()
    }

    /// The engine's sync directory. Needs no session.
    pub fn get_sync_dir(&self) -> Option<String> {
        // SAFETY: the engine returns a pointer to a process-lifetime string.
        unsafe { native_to_host(self.api().get_sync_dir()) }
    }
}

/// A commit borrowed from the engine, returned to it on drop.
struct CommitGuard<'a, A: RimeApi + ?Sized> {
    api: &'a A,
    raw: RimeCommit,
}

impl<'a, A: RimeApi + ?Sized> CommitGuard<'a, A> {
    fn fetch(api: &'a A, session_id: RimeSessionId) -> Option<Self> {
        let mut raw = RimeCommit::new();
        if !api.get_commit(session_id, &mut raw) {
            return None;
        }
        Some(Self { api, raw })
    }
}

impl<A: RimeApi + ?Sized> Deref for CommitGuard<'_, A> {
    type Target = RimeCommit;

    fn deref(&self) -> &RimeCommit {
        &self.raw
    }
}

impl<A: RimeApi + ?Sized> Drop for CommitGuard<'_, A> {
    fn drop(&mut self) {
        self.api.free_commit(&mut self.raw);
    }
}
