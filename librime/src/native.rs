//! `RimeApi` over the real engine's function table.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::fmt;

use libloading::Library;
use rime_bridge_core::ffi::{
    Bool, RimeCommit, RimeContext, RimeNotificationHandler, RimeSchemaList, RimeSessionId,
    RimeTraits, FALSE, TRUE,
};
use rime_bridge_core::{BridgeError, RimeApi, Result};

use crate::table::RimeApiTable;

/// Entry points resolved from the table, all checked present at load time.
#[derive(Clone, Copy)]
pub(crate) struct Entries {
    setup: unsafe extern "C" fn(*mut RimeTraits),
    set_notification_handler: unsafe extern "C" fn(RimeNotificationHandler, *mut c_void),
    initialize: unsafe extern "C" fn(*mut RimeTraits),
    finalize: unsafe extern "C" fn(),
    start_maintenance: unsafe extern "C" fn(Bool) -> Bool,
    join_maintenance_thread: unsafe extern "C" fn(),
    sync_user_data: unsafe extern "C" fn() -> Bool,
    create_session: unsafe extern "C" fn() -> RimeSessionId,
    process_key: unsafe extern "C" fn(RimeSessionId, c_int, c_int) -> Bool,
    clear_composition: unsafe extern "C" fn(RimeSessionId),
    get_commit: unsafe extern "C" fn(RimeSessionId, *mut RimeCommit) -> Bool,
    free_commit: unsafe extern "C" fn(*mut RimeCommit) -> Bool,
    get_context: unsafe extern "C" fn(RimeSessionId, *mut RimeContext) -> Bool,
    free_context: unsafe extern "C" fn(*mut RimeContext) -> Bool,
    get_schema_list: unsafe extern "C" fn(*mut RimeSchemaList) -> Bool,
    free_schema_list: unsafe extern "C" fn(*mut RimeSchemaList),
    select_schema: unsafe extern "C" fn(RimeSessionId, *const c_char) -> Bool,
    get_sync_dir: unsafe extern "C" fn() -> *const c_char,
    get_input: unsafe extern "C" fn(RimeSessionId) -> *const c_char,
}

fn entry<T>(name: &str, f: Option<T>) -> Result<T> {
    f.ok_or_else(|| BridgeError::Unavailable(format!("RimeApi.{} is null", name)))
}

impl Entries {
    /// Resolve every entry the bridge calls, failing on the first gap.
    pub(crate) fn resolve(table: &RimeApiTable) -> Result<Self> {
        let size = usize::try_from(table.data_size).unwrap_or(0);
        if size < RimeApiTable::REQUIRED_DATA_SIZE {
            return Err(BridgeError::Unavailable(format!(
                "RimeApi table too small ({} bytes, need {})",
                size,
                RimeApiTable::REQUIRED_DATA_SIZE
            )));
        }

        Ok(Self {
            setup: entry("setup", table.setup)?,
            set_notification_handler: entry(
                "set_notification_handler",
                table.set_notification_handler,
            )?,
            initialize: entry("initialize", table.initialize)?,
            finalize: entry("finalize", table.finalize)?,
            start_maintenance: entry("start_maintenance", table.start_maintenance)?,
            join_maintenance_thread: entry(
                "join_maintenance_thread",
                table.join_maintenance_thread,
            )?,
            sync_user_data: entry("sync_user_data", table.sync_user_data)?,
            create_session: entry("create_session", table.create_session)?,
            process_key: entry("process_key", table.process_key)?,
            clear_composition: entry("clear_composition", table.clear_composition)?,
            get_commit: entry("get_commit", table.get_commit)?,
            free_commit: entry("free_commit", table.free_commit)?,
            get_context: entry("get_context", table.get_context)?,
            free_context: entry("free_context", table.free_context)?,
            get_schema_list: entry("get_schema_list", table.get_schema_list)?,
            free_schema_list: entry("free_schema_list", table.free_schema_list)?,
            select_schema: entry("select_schema", table.select_schema)?,
            get_sync_dir: entry("get_sync_dir", table.get_sync_dir)?,
            get_input: entry("get_input", table.get_input)?,
        })
    }
}

/// The loaded librime.
///
/// Keeps the shared library mapped for as long as any entry point may be
/// called.
pub struct NativeRime {
    fns: Entries,
    _library: Library,
}

impl NativeRime {
    pub(crate) fn new(library: Library, fns: Entries) -> Self {
        Self {
            fns,
            _library: library,
        }
    }
}

impl fmt::Debug for NativeRime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRime").finish_non_exhaustive()
    }
}

fn to_bool(b: Bool) -> bool {
    b != FALSE
}

// SAFETY (all methods): entry points were resolved from the engine's own
// table and the library stays loaded; pointer arguments come from live Rust
// references or C strings owned by the caller.
impl RimeApi for NativeRime {
    fn setup(&self, traits: &RimeTraits) {
        // The engine takes a mutable pointer but only reads the traits.
        unsafe { (self.fns.setup)(traits as *const RimeTraits as *mut RimeTraits) }
    }

    fn set_notification_handler(&self, handler: RimeNotificationHandler, context: *mut c_void) {
        unsafe { (self.fns.set_notification_handler)(handler, context) }
    }

    fn initialize(&self, traits: &RimeTraits) {
        unsafe { (self.fns.initialize)(traits as *const RimeTraits as *mut RimeTraits) }
    }

    fn finalize(&self) {
        unsafe { (self.fns.finalize)() }
    }

    fn start_maintenance(&self, full_check: bool) -> bool {
        let full_check = if full_check { TRUE } else { FALSE };
        to_bool(unsafe { (self.fns.start_maintenance)(full_check) })
    }

    fn join_maintenance_thread(&self) {
        unsafe { (self.fns.join_maintenance_thread)() }
    }

    fn create_session(&self) -> RimeSessionId {
        unsafe { (self.fns.create_session)() }
    }

    fn process_key(&self, session_id: RimeSessionId, keycode: c_int, mask: c_int) -> bool {
        to_bool(unsafe { (self.fns.process_key)(session_id, keycode, mask) })
    }

    fn clear_composition(&self, session_id: RimeSessionId) {
        unsafe { (self.fns.clear_composition)(session_id) }
    }

    fn get_context(&self, session_id: RimeSessionId, context: &mut RimeContext) -> bool {
        to_bool(unsafe { (self.fns.get_context)(session_id, context) })
    }

    fn free_context(&self, context: &mut RimeContext) -> bool {
        to_bool(unsafe { (self.fns.free_context)(context) })
    }

    fn get_commit(&self, session_id: RimeSessionId, commit: &mut RimeCommit) -> bool {
        to_bool(unsafe { (self.fns.get_commit)(session_id, commit) })
    }

    fn free_commit(&self, commit: &mut RimeCommit) -> bool {
        to_bool(unsafe { (self.fns.free_commit)(commit) })
    }

    fn get_input(&self, session_id: RimeSessionId) -> *const c_char {
        unsafe { (self.fns.get_input)(session_id) }
    }

    fn select_schema(&self, session_id: RimeSessionId, schema_id: &CStr) -> bool {
        to_bool(unsafe { (self.fns.select_schema)(session_id, schema_id.as_ptr()) })
    }

    fn get_schema_list(&self, schema_list: &mut RimeSchemaList) -> bool {
        to_bool(unsafe { (self.fns.get_schema_list)(schema_list) })
    }

    fn free_schema_list(&self, schema_list: &mut RimeSchemaList) {
        unsafe { (self.fns.free_schema_list)(schema_list) }
    }

    fn sync_user_data(&self) -> bool {
        to_bool(unsafe { (self.fns.sync_user_data)() })
    }

    fn get_sync_dir(&self) -> *const c_char {
        unsafe { (self.fns.get_sync_dir)() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    // A zeroed table: every entry null.
    fn empty_table(data_size: usize) -> Box<RimeApiTable> {
        let mut table: Box<RimeApiTable> = Box::new(unsafe { mem::zeroed() });
        table.data_size = data_size as c_int;
        table
    }

    #[test]
    fn test_native_engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<NativeRime>();
    }

    #[test]
    fn test_small_table_rejected() {
        let table = empty_table(16);
        match Entries::resolve(&table) {
            Err(BridgeError::Unavailable(msg)) => assert!(msg.contains("too small")),
            _ => panic!("expected Unavailable"),
        }
    }

    #[test]
    fn test_null_entry_rejected() {
        let table = empty_table(RimeApiTable::REQUIRED_DATA_SIZE);
        match Entries::resolve(&table) {
            Err(BridgeError::Unavailable(msg)) => assert!(msg.contains("RimeApi.setup")),
            _ => panic!("expected Unavailable"),
        }
    }

    unsafe extern "C" fn fake_input(_: RimeSessionId) -> *const c_char {
        c"ni".as_ptr()
    }

    #[test]
    fn test_null_entry_named_after_earlier_ones_resolve() {
        unsafe extern "C" fn noop_traits(_: *mut RimeTraits) {}
        let mut table = empty_table(RimeApiTable::REQUIRED_DATA_SIZE);
        table.setup = Some(noop_traits);
        table.get_input = Some(fake_input);
        match Entries::resolve(&table) {
            Err(BridgeError::Unavailable(msg)) => {
                assert!(msg.contains("set_notification_handler"), "{}", msg)
            }
            _ => panic!("expected Unavailable"),
        }
    }
}
