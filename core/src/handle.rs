//! Ownership of the engine and of the current session.
//!
//! `RimeHandle` is the single owner of the engine API and of the session id.
//! Every operation receives it explicitly; the id is cleared by `finalize`
//! and session-scoped calls check for it before reaching the engine.

use std::ffi::{c_char, c_void};
use std::num::NonZeroUsize;
use std::ptr;

use crate::api::RimeApi;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::ffi::RimeSessionId;
use crate::marshal::native_to_host;

pub struct RimeHandle<A: RimeApi> {
    api: A,
    config: BridgeConfig,
    /// True until the first `start` has run the process-wide setup.
    first_run: bool,
    /// True between `initialize` and `finalize`.
    initialized: bool,
    session: Option<NonZeroUsize>,
}

impl<A: RimeApi> RimeHandle<A> {
    pub fn new(api: A) -> Self {
        Self::with_config(api, BridgeConfig::default())
    }

    pub fn with_config(api: A, config: BridgeConfig) -> Self {
        Self {
            api,
            config,
            first_run: true,
            initialized: false,
            session: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The active session id, or `NoSession`.
    pub fn session_id(&self) -> Result<RimeSessionId> {
        self.session.map(NonZeroUsize::get).ok_or(BridgeError::NoSession)
    }

    /// Initialize the engine on the given data directories and open a session.
    ///
    /// Blocks until the engine's deployment work has finished. The first call
    /// over the handle's life also runs the engine's one-time setup. An
    /// existing session is dropped before the engine is re-initialized.
    pub fn start(&mut self, shared_data_dir: &str, user_data_dir: &str) -> Result<()> {
        let record = self.config.traits(shared_data_dir, user_data_dir)?;
        let traits = record.as_traits();

        if let Some(old) = self.session.take() {
            tracing::debug!(session = old.get(), "dropping session before restart");
        }

        if self.first_run {
            tracing::debug!("running engine setup");
            self.api.setup(&traits);
            self.first_run = false;
        }

        tracing::debug!(
            shared_data_dir = record.shared_data_dir(),
            user_data_dir = record.user_data_dir(),
            "initializing engine"
        );
        self.api.initialize(&traits);
        self.initialized = true;
        self.api
            .set_notification_handler(Some(notification_sink), ptr::null_mut());

        if !self.api.start_maintenance(true) {
            tracing::debug!("engine reported no maintenance work");
        }
        self.api.join_maintenance_thread();
        tracing::debug!("maintenance finished");

        let id = self.api.create_session();
        let session = NonZeroUsize::new(id).ok_or_else(|| {
            tracing::warn!("engine returned an empty session id");
            BridgeError::SessionCreation
        })?;
        tracing::debug!(session = session.get(), "session created");
        self.session = Some(session);
        Ok(())
    }

    /// Drop the session and release engine-wide resources. Safe to repeat.
    pub fn finalize(&mut self) {
        if let Some(old) = self.session.take() {
            tracing::debug!(session = old.get(), "clearing session");
        }
        if self.initialized {
            self.api.finalize();
            self.initialized = false;
            tracing::debug!("engine finalized");
        }
    }
}

impl<A: RimeApi> Drop for RimeHandle<A> {
    fn drop(&mut self) {
        self.finalize();
    }
}

/// Engine notifications are logged and otherwise ignored.
unsafe extern "C" fn notification_sink(
    _context_object: *mut c_void,
    session_id: RimeSessionId,
    message_type: *const c_char,
    message_value: *const c_char,
) {
    let kind = native_to_host(message_type).unwrap_or_default();
    let value = native_to_host(message_value).unwrap_or_default();
    tracing::trace!(session = session_id, kind = %kind, value = %value, "engine notification");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRime;

    #[test]
    fn test_no_session_before_start() {
        let handle = RimeHandle::new(MockRime::new());
        assert!(!handle.has_session());
        assert!(matches!(handle.session_id(), Err(BridgeError::NoSession)));
    }

    #[test]
    fn test_setup_runs_once() {
        let mut handle = RimeHandle::new(MockRime::new());
        handle.start("/usr/share/rime-data", "/home/u/.rime").unwrap();
        handle.finalize();
        handle.start("/usr/share/rime-data", "/home/u/.rime").unwrap();

        let stats = handle.api().stats();
        assert_eq!(stats.setup_calls, 1);
        assert_eq!(stats.initialize_calls, 2);
        assert_eq!(stats.maintenance_joins, 2);
        assert!(handle.has_session());
    }

    #[test]
    fn test_start_passes_directories() {
        let mut handle = RimeHandle::new(MockRime::new());
        handle.start("/usr/share/rime-data", "/home/u/.rime").unwrap();
        let stats = handle.api().stats();
        assert_eq!(stats.shared_data_dir.as_deref(), Some("/usr/share/rime-data"));
        assert_eq!(stats.user_data_dir.as_deref(), Some("/home/u/.rime"));
        assert_eq!(stats.app_name.as_deref(), Some("rime.emacs"));
    }

    #[test]
    fn test_restart_replaces_session() {
        let mut handle = RimeHandle::new(MockRime::new());
        handle.start("/s", "/u").unwrap();
        let first = handle.session_id().unwrap();
        handle.start("/s", "/u").unwrap();
        assert_ne!(handle.session_id().unwrap(), first);
    }

    #[test]
    fn test_config_drives_traits() {
        let config = BridgeConfig {
            app_name: "rime.test".to_string(),
            ..BridgeConfig::default()
        };
        let mut handle = RimeHandle::with_config(MockRime::new(), config);
        assert_eq!(handle.config().app_name, "rime.test");

        handle.start("/s", "/u").unwrap();
        assert_eq!(handle.api().stats().app_name.as_deref(), Some("rime.test"));
    }

    #[test]
    fn test_finalize_twice_is_safe() {
        let mut handle = RimeHandle::new(MockRime::new());
        handle.start("/s", "/u").unwrap();
        handle.finalize();
        handle.finalize();
        assert!(!handle.has_session());
        assert_eq!(handle.api().stats().finalize_calls, 1);
    }

    #[test]
    fn test_finalize_without_start() {
        let mut handle = RimeHandle::new(MockRime::new());
        handle.finalize();
        assert_eq!(handle.api().stats().finalize_calls, 0);
    }

    #[test]
    fn test_failed_session_creation() {
        let mock = MockRime::new();
        mock.refuse_sessions(true);
        let mut handle = RimeHandle::new(mock);
        assert!(matches!(
            handle.start("/s", "/u"),
            Err(BridgeError::SessionCreation)
        ));
        assert!(!handle.has_session());
    }
}
