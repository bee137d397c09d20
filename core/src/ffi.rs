//! C layout mirrors of the librime structs the bridge reads and writes.
//!
//! Field order and types follow `rime_api.h`. Only the structs that cross
//! the bridge are mirrored; the function table itself lives with the crate
//! that binds the shared library.

use std::ffi::{c_char, c_int, c_void};
use std::mem;
use std::ptr;

/// Engine-assigned session identifier (`uintptr_t`). Zero means "none".
pub type RimeSessionId = usize;

/// C `Bool` as used by librime (non-zero is true).
pub type Bool = c_int;

pub const TRUE: Bool = 1;
pub const FALSE: Bool = 0;

/// Callback invoked by the engine for deployment and option notifications.
pub type RimeNotificationHandler = Option<
    unsafe extern "C" fn(
        context_object: *mut c_void,
        session_id: RimeSessionId,
        message_type: *const c_char,
        message_value: *const c_char,
    ),
>;

/// Versioned structs carry their own size minus the leading `int`, which is
/// what `RIME_STRUCT` stores in `data_size`.
pub const fn rime_data_size<T>() -> c_int {
    (mem::size_of::<T>() - mem::size_of::<c_int>()) as c_int
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeTraits {
    pub data_size: c_int,
    pub shared_data_dir: *const c_char,
    pub user_data_dir: *const c_char,
    pub distribution_name: *const c_char,
    pub distribution_code_name: *const c_char,
    pub distribution_version: *const c_char,
    pub app_name: *const c_char,
    pub modules: *mut *const c_char,
    pub min_log_level: c_int,
    pub log_dir: *const c_char,
    pub prebuilt_data_dir: *const c_char,
    pub staging_dir: *const c_char,
}

impl RimeTraits {
    pub fn new() -> Self {
        Self {
            data_size: rime_data_size::<Self>(),
            shared_data_dir: ptr::null(),
            user_data_dir: ptr::null(),
            distribution_name: ptr::null(),
            distribution_code_name: ptr::null(),
            distribution_version: ptr::null(),
            app_name: ptr::null(),
            modules: ptr::null_mut(),
            min_log_level: 0,
            log_dir: ptr::null(),
            prebuilt_data_dir: ptr::null(),
            staging_dir: ptr::null(),
        }
    }
}

impl Default for RimeTraits {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeComposition {
    pub length: c_int,
    pub cursor_pos: c_int,
    pub sel_start: c_int,
    pub sel_end: c_int,
    pub preedit: *mut c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeCandidate {
    pub text: *mut c_char,
    pub comment: *mut c_char,
    pub reserved: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeMenu {
    pub page_size: c_int,
    pub page_no: c_int,
    pub is_last_page: Bool,
    pub highlighted_candidate_index: c_int,
    pub num_candidates: c_int,
    pub candidates: *mut RimeCandidate,
    pub select_keys: *mut c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeContext {
    pub data_size: c_int,
    pub composition: RimeComposition,
    pub menu: RimeMenu,
    pub commit_text_preview: *mut c_char,
    pub select_labels: *mut *mut c_char,
}

impl RimeContext {
    /// Zeroed context with `data_size` set, ready to be filled by the engine.
    pub fn new() -> Self {
        Self {
            data_size: rime_data_size::<Self>(),
            composition: RimeComposition {
                length: 0,
                cursor_pos: 0,
                sel_start: 0,
                sel_end: 0,
                preedit: ptr::null_mut(),
            },
            menu: RimeMenu {
                page_size: 0,
                page_no: 0,
                is_last_page: FALSE,
                highlighted_candidate_index: 0,
                num_candidates: 0,
                candidates: ptr::null_mut(),
                select_keys: ptr::null_mut(),
            },
            commit_text_preview: ptr::null_mut(),
            select_labels: ptr::null_mut(),
        }
    }
}

impl Default for RimeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeCommit {
    pub data_size: c_int,
    pub text: *mut c_char,
}

impl RimeCommit {
    pub fn new() -> Self {
        Self {
            data_size: rime_data_size::<Self>(),
            text: ptr::null_mut(),
        }
    }
}

impl Default for RimeCommit {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeSchemaListItem {
    pub schema_id: *mut c_char,
    pub name: *mut c_char,
    pub reserved: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct RimeSchemaList {
    pub size: usize,
    pub list: *mut RimeSchemaListItem,
}

impl RimeSchemaList {
    pub fn new() -> Self {
        Self {
            size: 0,
            list: ptr::null_mut(),
        }
    }
}

impl Default for RimeSchemaList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_size_excludes_leading_int() {
        let ctx = RimeContext::new();
        assert_eq!(
            ctx.data_size as usize,
            mem::size_of::<RimeContext>() - mem::size_of::<c_int>()
        );
        assert_eq!(
            RimeCommit::new().data_size as usize,
            mem::size_of::<RimeCommit>() - mem::size_of::<c_int>()
        );
    }

    #[test]
    fn test_fresh_context_is_empty() {
        let ctx = RimeContext::new();
        assert!(ctx.composition.preedit.is_null());
        assert!(ctx.menu.candidates.is_null());
        assert_eq!(ctx.menu.num_candidates, 0);
        assert!(ctx.commit_text_preview.is_null());
    }
}
