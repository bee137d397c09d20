//! The engine seam.
//!
//! `RimeApi` captures exactly the entry points of librime's function table
//! that the bridge calls. The real implementation forwards to the shared
//! library; `MockRime` implements it in memory for tests and demos.
//!
//! Out-parameters keep librime's ownership rules: whatever `get_context`,
//! `get_commit` and `get_schema_list` write belongs to the engine until it is
//! handed back to the matching `free_*` call. Strings returned as
//! `*const c_char` stay owned by the engine and are only valid until the next
//! call into it.

use std::ffi::{c_char, c_int, c_void, CStr};

use crate::ffi::{
    RimeCommit, RimeContext, RimeNotificationHandler, RimeSchemaList, RimeSessionId, RimeTraits,
};

pub trait RimeApi {
    /// One-time, process-wide environment setup.
    fn setup(&self, traits: &RimeTraits);

    fn set_notification_handler(&self, handler: RimeNotificationHandler, context: *mut c_void);

    fn initialize(&self, traits: &RimeTraits);

    /// Releases engine-wide resources, including every open session.
    fn finalize(&self);

    fn start_maintenance(&self, full_check: bool) -> bool;

    /// Blocks until the deployment thread started by `start_maintenance` exits.
    fn join_maintenance_thread(&self);

    /// Returns 0 when no session could be created.
    fn create_session(&self) -> RimeSessionId;

    fn process_key(&self, session_id: RimeSessionId, keycode: c_int, mask: c_int) -> bool;

    fn clear_composition(&self, session_id: RimeSessionId);

    fn get_context(&self, session_id: RimeSessionId, context: &mut RimeContext) -> bool;

    fn free_context(&self, context: &mut RimeContext) -> bool;

    fn get_commit(&self, session_id: RimeSessionId, commit: &mut RimeCommit) -> bool;

    fn free_commit(&self, commit: &mut RimeCommit) -> bool;

    fn get_input(&self, session_id: RimeSessionId) -> *const c_char;

    fn select_schema(&self, session_id: RimeSessionId, schema_id: &CStr) -> bool;

    fn get_schema_list(&self, schema_list: &mut RimeSchemaList) -> bool;

    fn free_schema_list(&self, schema_list: &mut RimeSchemaList);

    fn sync_user_data(&self) -> bool;

    fn get_sync_dir(&self) -> *const c_char;
}

impl<A: RimeApi + ?Sized> RimeApi for Box<A> {
    fn setup(&self, traits: &RimeTraits) {
        (**self).setup(traits)
    }

    fn set_notification_handler(&self, handler: RimeNotificationHandler, context: *mut c_void) {
        (**self).set_notification_handler(handler, context)
    }

    fn initialize(&self, traits: &RimeTraits) {
        (**self).initialize(traits)
    }

    fn finalize(&self) {
        (**self).finalize()
    }

    fn start_maintenance(&self, full_check: bool) -> bool {
        (**self).start_maintenance(full_check)
    }

    fn join_maintenance_thread(&self) {
        (**self).join_maintenance_thread()
    }

    fn create_session(&self) -> RimeSessionId {
        (**self).create_session()
    }

    fn process_key(&self, session_id: RimeSessionId, keycode: c_int, mask: c_int) -> bool {
        (**self).process_key(session_id, keycode, mask)
    }

    fn clear_composition(&self, session_id: RimeSessionId) {
        (**self).clear_composition(session_id)
    }

    fn get_context(&self, session_id: RimeSessionId, context: &mut RimeContext) -> bool {
        (**self).get_context(session_id, context)
    }

    fn free_context(&self, context: &mut RimeContext) -> bool {
        (**self).free_context(context)
    }

    fn get_commit(&self, session_id: RimeSessionId, commit: &mut RimeCommit) -> bool {
        (**self).get_commit(session_id, commit)
    }

    fn free_commit(&self, commit: &mut RimeCommit) -> bool {
        (**self).free_commit(commit)
    }

    fn get_input(&self, session_id: RimeSessionId) -> *const c_char {
        (**self).get_input(session_id)
    }

    fn select_schema(&self, session_id: RimeSessionId, schema_id: &CStr) -> bool {
        (**self).select_schema(session_id, schema_id)
    }

    fn get_schema_list(&self, schema_list: &mut RimeSchemaList) -> bool {
        (**self).get_schema_list(schema_list)
    }

    fn free_schema_list(&self, schema_list: &mut RimeSchemaList) {
        (**self).free_schema_list(schema_list)
    }

    fn sync_user_data(&self) -> bool {
        (**self).sync_user_data()
    }

    fn get_sync_dir(&self) -> *const c_char {
        (**self).get_sync_dir()
    }
}
