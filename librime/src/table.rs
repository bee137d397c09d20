//! Layout of librime's `RimeApi` function table.
//!
//! The table is versioned by its leading `data_size`. Entries the bridge
//! never calls are kept as untyped padding so the typed entries land at the
//! offsets `rime_api.h` gives them.

use std::ffi::{c_char, c_int, c_void};
use std::mem;

use rime_bridge_core::ffi::{
    Bool, RimeCommit, RimeContext, RimeNotificationHandler, RimeSchemaList, RimeSessionId,
    RimeTraits,
};

type Unused = Option<unsafe extern "C" fn()>;

#[repr(C)]
pub struct RimeApiTable {
    pub data_size: c_int,

    pub setup: Option<unsafe extern "C" fn(traits: *mut RimeTraits)>,
    pub set_notification_handler:
        Option<unsafe extern "C" fn(handler: RimeNotificationHandler, context: *mut c_void)>,
    pub initialize: Option<unsafe extern "C" fn(traits: *mut RimeTraits)>,
    pub finalize: Option<unsafe extern "C" fn()>,
    pub start_maintenance: Option<unsafe extern "C" fn(full_check: Bool) -> Bool>,
    pub is_maintenance_mode: Unused,
    pub join_maintenance_thread: Option<unsafe extern "C" fn()>,

    // deployer_initialize .. deploy_config_file
    _deployer: [Unused; 5],

    pub sync_user_data: Option<unsafe extern "C" fn() -> Bool>,
    pub create_session: Option<unsafe extern "C" fn() -> RimeSessionId>,

    // find_session .. cleanup_all_sessions
    _sessions: [Unused; 4],

    pub process_key:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, keycode: c_int, mask: c_int) -> Bool>,
    pub commit_composition: Unused,
    pub clear_composition: Option<unsafe extern "C" fn(session_id: RimeSessionId)>,
    pub get_commit:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, commit: *mut RimeCommit) -> Bool>,
    pub free_commit: Option<unsafe extern "C" fn(commit: *mut RimeCommit) -> Bool>,
    pub get_context:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, context: *mut RimeContext) -> Bool>,
    pub free_context: Option<unsafe extern "C" fn(context: *mut RimeContext) -> Bool>,

    // get_status, free_status, set_option, get_option, set_property, get_property
    _status: [Unused; 6],

    pub get_schema_list: Option<unsafe extern "C" fn(schema_list: *mut RimeSchemaList) -> Bool>,
    pub free_schema_list: Option<unsafe extern "C" fn(schema_list: *mut RimeSchemaList)>,
    pub get_current_schema: Unused,
    pub select_schema:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, schema_id: *const c_char) -> Bool>,

    // schema_open .. config_end
    _config: [Unused; 12],

    // simulate_key_sequence, register_module, find_module, run_task,
    // get_shared_data_dir, get_user_data_dir
    _modules: [Unused; 6],

    pub get_sync_dir: Option<unsafe extern "C" fn() -> *const c_char>,

    // get_user_id .. config_begin_list
    _config_edit: [Unused; 15],

    pub get_input: Option<unsafe extern "C" fn(session_id: RimeSessionId) -> *const c_char>,
}

impl RimeApiTable {
    /// Bytes of the table, past `data_size`, that the bridge relies on.
    pub const REQUIRED_DATA_SIZE: usize =
        mem::size_of::<RimeApiTable>() - mem::size_of::<c_int>();
}

/// Signature of the library's `rime_get_api` export.
pub type RimeGetApiFn = unsafe extern "C" fn() -> *mut RimeApiTable;

pub const RIME_GET_API_SYMBOL: &[u8] = b"rime_get_api\0";

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    const PTR: usize = mem::size_of::<usize>();

    // Offsets as slot indices after the padded leading int.
    fn slot(offset: usize) -> usize {
        (offset - PTR) / PTR
    }

    #[test]
    fn test_slot_positions_match_header() {
        assert_eq!(slot(offset_of!(RimeApiTable, setup)), 0);
        assert_eq!(slot(offset_of!(RimeApiTable, join_maintenance_thread)), 6);
        assert_eq!(slot(offset_of!(RimeApiTable, sync_user_data)), 12);
        assert_eq!(slot(offset_of!(RimeApiTable, create_session)), 13);
        assert_eq!(slot(offset_of!(RimeApiTable, process_key)), 18);
        assert_eq!(slot(offset_of!(RimeApiTable, free_context)), 24);
        assert_eq!(slot(offset_of!(RimeApiTable, get_schema_list)), 31);
        assert_eq!(slot(offset_of!(RimeApiTable, select_schema)), 34);
        assert_eq!(slot(offset_of!(RimeApiTable, get_sync_dir)), 53);
        assert_eq!(slot(offset_of!(RimeApiTable, get_input)), 69);
    }

    #[test]
    fn test_required_size_ends_at_get_input() {
        assert_eq!(
            RimeApiTable::REQUIRED_DATA_SIZE + mem::size_of::<c_int>(),
            offset_of!(RimeApiTable, get_input) + PTR
        );
    }
}
