//! In-memory engine double.
//!
//! `MockRime` implements `RimeApi` the way librime behaves from the outside:
//! every string and array it hands out is a real heap allocation that must
//! come back through the matching `free_*` call. It counts those calls and
//! the allocations still outstanding, so tests can check that each native
//! buffer is released exactly once.
//!
//! Composition is deliberately simple: lowercase letters accumulate in the
//! input buffer, a small built-in table supplies candidates, space commits
//! the first candidate and return commits the raw input.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;

use crate::api::RimeApi;
use crate::ffi::{
    RimeCandidate, RimeCommit, RimeContext, RimeNotificationHandler, RimeSchemaList,
    RimeSchemaListItem, RimeSessionId, RimeTraits, FALSE, TRUE,
};
use crate::marshal::native_to_host;

const KEY_SPACE: c_int = 0x20;
const KEY_BACKSPACE: c_int = 0xff08;
const KEY_RETURN: c_int = 0xff0d;
const KEY_ESCAPE: c_int = 0xff1b;
const RELEASE_MASK: c_int = 1 << 30;

const PAGE_SIZE: usize = 5;

/// Call counters and the last traits seen, for assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockStats {
    pub setup_calls: usize,
    pub initialize_calls: usize,
    pub finalize_calls: usize,
    pub maintenance_joins: usize,
    pub notifications_sent: usize,
    pub sync_calls: usize,
    pub contexts_fetched: usize,
    pub contexts_freed: usize,
    pub commits_fetched: usize,
    pub commits_freed: usize,
    pub schema_lists_fetched: usize,
    pub schema_lists_freed: usize,
    /// Strings and arrays handed out and not yet freed.
    pub live_allocations: usize,
    pub shared_data_dir: Option<String>,
    pub user_data_dir: Option<String>,
    pub app_name: Option<String>,
}

#[derive(Debug, Default)]
struct Composer {
    input: String,
    /// Keeps the buffer returned by `get_input` alive until the next call.
    input_c: Option<CString>,
    pending_commit: Option<Option<String>>,
    schema: Option<String>,
}

struct State {
    stats: MockStats,
    sessions: HashMap<RimeSessionId, Composer>,
    next_session: RimeSessionId,
    refuse_sessions: bool,
    schemas: Vec<(String, String)>,
    fail_schema_list: bool,
    fail_context: bool,
    lexicon: HashMap<String, Vec<String>>,
    handler: RimeNotificationHandler,
    /// Address of the handler's context object, kept as an integer so the
    /// mock stays `Send`.
    handler_context: usize,
    sync_dir: CString,
}

pub struct MockRime {
    state: RefCell<State>,
}

impl MockRime {
    /// A mock with a few pinyin schemas and a tiny demo lexicon.
    pub fn new() -> Self {
        let schemas = [
            ("luna_pinyin", "朙月拼音"),
            ("terra_pinyin", "地球拼音"),
            ("bopomofo", "注音"),
        ]
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect();

        let lexicon = [
            ("a", &["啊", "阿", "呵"][..]),
            ("ni", &["你", "泥", "尼"]),
            ("hao", &["好", "号", "毫"]),
            ("nihao", &["你好"]),
            ("zhong", &["中", "种", "重", "钟", "忠", "终", "众"]),
            ("zhongguo", &["中国"]),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
        .collect();

        Self {
            state: RefCell::new(State {
                stats: MockStats::default(),
                sessions: HashMap::new(),
                next_session: 1,
                refuse_sessions: false,
                schemas,
                fail_schema_list: false,
                fail_context: false,
                lexicon,
                handler: None,
                handler_context: 0,
                sync_dir: CString::new("/tmp/rime-sync").unwrap_or_default(),
            }),
        }
    }

    pub fn stats(&self) -> MockStats {
        self.state.borrow().stats.clone()
    }

    /// Make `create_session` return 0.
    pub fn refuse_sessions(&self, refuse: bool) {
        self.state.borrow_mut().refuse_sessions = refuse;
    }

    pub fn set_schemas(&self, schemas: &[(&str, &str)]) {
        self.state.borrow_mut().schemas = schemas
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
    }

    /// Make `get_schema_list` report failure.
    pub fn fail_schema_list(&self, fail: bool) {
        self.state.borrow_mut().fail_schema_list = fail;
    }

    /// Make `get_context` report that no context is available.
    pub fn fail_context(&self, fail: bool) {
        self.state.borrow_mut().fail_context = fail;
    }

    pub fn add_phrase(&self, code: &str, candidates: &[&str]) {
        self.state.borrow_mut().lexicon.insert(
            code.to_string(),
            candidates.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Queue a commit whose text is null on every open session.
    pub fn push_empty_commit(&self) {
        for composer in self.state.borrow_mut().sessions.values_mut() {
            composer.pending_commit = Some(None);
        }
    }

    /// Schema currently selected on `session_id`.
    pub fn current_schema(&self, session_id: RimeSessionId) -> Option<String> {
        self.state
            .borrow()
            .sessions
            .get(&session_id)
            .and_then(|c| c.schema.clone())
    }

    fn alloc_string(stats: &mut MockStats, s: &str) -> *mut c_char {
        let Ok(owned) = CString::new(s) else {
            return ptr::null_mut();
        };
        stats.live_allocations += 1;
        owned.into_raw()
    }

    /// # Safety
    ///
    /// `p` must be null or come from `alloc_string` and not be freed yet.
    unsafe fn free_string(stats: &mut MockStats, p: &mut *mut c_char) {
        if !p.is_null() {
            drop(CString::from_raw(*p));
            stats.live_allocations -= 1;
            *p = ptr::null_mut();
        }
    }
}

impl Default for MockRime {
    fn default() -> Self {
        Self::new()
    }
}

impl RimeApi for MockRime {
    fn setup(&self, _traits: &RimeTraits) {
        self.state.borrow_mut().stats.setup_calls += 1;
    }

    fn set_notification_handler(&self, handler: RimeNotificationHandler, context: *mut c_void) {
        let mut state = self.state.borrow_mut();
        state.handler = handler;
        state.handler_context = context as usize;
    }

    fn initialize(&self, traits: &RimeTraits) {
        let mut state = self.state.borrow_mut();
        state.stats.initialize_calls += 1;
        // SAFETY: the caller keeps the traits strings alive during the call.
        unsafe {
            state.stats.shared_data_dir = native_to_host(traits.shared_data_dir);
            state.stats.user_data_dir = native_to_host(traits.user_data_dir);
            state.stats.app_name = native_to_host(traits.app_name);
        }
    }

    fn finalize(&self) {
        let mut state = self.state.borrow_mut();
        state.stats.finalize_calls += 1;
        state.sessions.clear();
        state.handler = None;
    }

    fn start_maintenance(&self, _full_check: bool) -> bool {
        true
    }

    fn join_maintenance_thread(&self) {
        let (handler, context) = {
            let mut state = self.state.borrow_mut();
            state.stats.maintenance_joins += 1;
            (state.handler, state.handler_context as *mut c_void)
        };
        if let Some(handler) = handler {
            let kind = c"deploy";
            let value = c"success";
            // SAFETY: the handler was installed through the API and receives
            // NUL-terminated strings valid for the call.
            unsafe { handler(context, 0, kind.as_ptr(), value.as_ptr()) };
            self.state.borrow_mut().stats.notifications_sent += 1;
        }
    }

    fn create_session(&self) -> RimeSessionId {
        let mut state = self.state.borrow_mut();
        if state.refuse_sessions {
            return 0;
        }
        let id = state.next_session;
        state.next_session += 1;
        state.sessions.insert(id, Composer::default());
        id
    }

    fn process_key(&self, session_id: RimeSessionId, keycode: c_int, mask: c_int) -> bool {
        let mut state = self.state.borrow_mut();
        let State {
            sessions, lexicon, ..
        } = &mut *state;
        let Some(composer) = sessions.get_mut(&session_id) else {
            return false;
        };
        if mask & RELEASE_MASK != 0 {
            return false;
        }

        match keycode {
            k if (b'a' as c_int..=b'z' as c_int).contains(&k) => {
                composer.input.push(k as u8 as char);
                true
            }
            KEY_SPACE if !composer.input.is_empty() => {
                let text = lexicon
                    .get(&composer.input)
                    .and_then(|c| c.first().cloned())
                    .unwrap_or_else(|| composer.input.clone());
                composer.pending_commit = Some(Some(text));
                composer.input.clear();
                true
            }
            KEY_RETURN if !composer.input.is_empty() => {
                composer.pending_commit = Some(Some(std::mem::take(&mut composer.input)));
                true
            }
            KEY_BACKSPACE => composer.input.pop().is_some(),
            KEY_ESCAPE if !composer.input.is_empty() => {
                composer.input.clear();
                true
            }
            _ => false,
        }
    }

    fn clear_composition(&self, session_id: RimeSessionId) {
        if let Some(composer) = self.state.borrow_mut().sessions.get_mut(&session_id) {
            composer.input.clear();
        }
    }

    fn get_context(&self, session_id: RimeSessionId, context: &mut RimeContext) -> bool {
        let mut state = self.state.borrow_mut();
        if state.fail_context {
            return false;
        }
        let State {
            sessions,
            lexicon,
            stats,
            ..
        } = &mut *state;
        let Some(composer) = sessions.get(&session_id) else {
            return false;
        };
        stats.contexts_fetched += 1;
        *context = RimeContext::new();
        if composer.input.is_empty() {
            return true;
        }

        let input = composer.input.as_str();
        let len = input.len() as c_int;
        context.composition.length = len;
        context.composition.cursor_pos = len;
        context.composition.sel_start = 0;
        context.composition.sel_end = len;
        context.composition.preedit = Self::alloc_string(stats, input);

        let all = lexicon.get(input).map(Vec::as_slice).unwrap_or(&[]);
        if let Some(first) = all.first() {
            context.commit_text_preview = Self::alloc_string(stats, first);
        }
        let page: Vec<RimeCandidate> = all
            .iter()
            .take(PAGE_SIZE)
            .map(|text| RimeCandidate {
                text: Self::alloc_string(stats, text),
                comment: ptr::null_mut(),
                reserved: ptr::null_mut(),
            })
            .collect();

        context.menu.page_size = PAGE_SIZE as c_int;
        context.menu.page_no = 0;
        context.menu.is_last_page = if all.len() <= PAGE_SIZE { TRUE } else { FALSE };
        context.menu.highlighted_candidate_index = 0;
        context.menu.num_candidates = page.len() as c_int;
        if !page.is_empty() {
            stats.live_allocations += 1;
            context.menu.candidates = Box::into_raw(page.into_boxed_slice()) as *mut RimeCandidate;
        }
        true
    }

    fn free_context(&self, context: &mut RimeContext) -> bool {
        let mut state = self.state.borrow_mut();
        let stats = &mut state.stats;
        stats.contexts_freed += 1;
        // SAFETY: every pointer in the context was produced by `get_context`
        // above and is nulled after release.
        unsafe {
            Self::free_string(stats, &mut context.composition.preedit);
            Self::free_string(stats, &mut context.commit_text_preview);
            if !context.menu.candidates.is_null() {
                let count = context.menu.num_candidates as usize;
                let slice = ptr::slice_from_raw_parts_mut(context.menu.candidates, count);
                let mut page = Box::from_raw(slice);
                for candidate in page.iter_mut() {
                    Self::free_string(stats, &mut candidate.text);
                }
                drop(page);
                stats.live_allocations -= 1;
                context.menu.candidates = ptr::null_mut();
            }
        }
        context.menu.num_candidates = 0;
        true
    }

    fn get_commit(&self, session_id: RimeSessionId, commit: &mut RimeCommit) -> bool {
        let mut state = self.state.borrow_mut();
        let State {
            sessions, stats, ..
        } = &mut *state;
        let Some(pending) = sessions
            .get_mut(&session_id)
            .and_then(|c| c.pending_commit.take())
        else {
            return false;
        };
        stats.commits_fetched += 1;
        *commit = RimeCommit::new();
        if let Some(text) = pending {
            commit.text = Self::alloc_string(stats, &text);
        }
        true
    }

    fn free_commit(&self, commit: &mut RimeCommit) -> bool {
        let mut state = self.state.borrow_mut();
        state.stats.commits_freed += 1;
        // SAFETY: `text` is null or was produced by `get_commit`.
        unsafe { Self::free_string(&mut state.stats, &mut commit.text) };
        true
    }

    fn get_input(&self, session_id: RimeSessionId) -> *const c_char {
        let mut state = self.state.borrow_mut();
        let Some(composer) = state.sessions.get_mut(&session_id) else {
            return ptr::null();
        };
        if composer.input.is_empty() {
            composer.input_c = None;
            return ptr::null();
        }
        composer.input_c = CString::new(composer.input.as_str()).ok();
        composer
            .input_c
            .as_ref()
            .map_or(ptr::null(), |s| s.as_ptr())
    }

    fn select_schema(&self, session_id: RimeSessionId, schema_id: &CStr) -> bool {
        let mut state = self.state.borrow_mut();
        let id = schema_id.to_string_lossy();
        if !state.schemas.iter().any(|(known, _)| *known == id) {
            return false;
        }
        match state.sessions.get_mut(&session_id) {
            Some(composer) => {
                composer.schema = Some(id.into_owned());
                composer.input.clear();
                true
            }
            None => false,
        }
    }

    fn get_schema_list(&self, schema_list: &mut RimeSchemaList) -> bool {
        let mut state = self.state.borrow_mut();
        if state.fail_schema_list {
            return false;
        }
        let State { schemas, stats, .. } = &mut *state;
        stats.schema_lists_fetched += 1;
        let items: Vec<RimeSchemaListItem> = schemas
            .iter()
            .map(|(id, name)| RimeSchemaListItem {
                schema_id: Self::alloc_string(stats, id),
                name: Self::alloc_string(stats, name),
                reserved: ptr::null_mut(),
            })
            .collect();
        *schema_list = RimeSchemaList::new();
        schema_list.size = items.len();
        if !items.is_empty() {
            stats.live_allocations += 1;
            schema_list.list = Box::into_raw(items.into_boxed_slice()) as *mut RimeSchemaListItem;
        }
        true
    }

    fn free_schema_list(&self, schema_list: &mut RimeSchemaList) {
        let mut state = self.state.borrow_mut();
        let stats = &mut state.stats;
        stats.schema_lists_freed += 1;
        if schema_list.list.is_null() {
            return;
        }
        // SAFETY: the list and its strings were produced by `get_schema_list`.
        unsafe {
            let slice = ptr::slice_from_raw_parts_mut(schema_list.list, schema_list.size);
            let mut items = Box::from_raw(slice);
            for item in items.iter_mut() {
                Self::free_string(stats, &mut item.schema_id);
                Self::free_string(stats, &mut item.name);
            }
        }
        stats.live_allocations -= 1;
        schema_list.list = ptr::null_mut();
        schema_list.size = 0;
    }

    fn sync_user_data(&self) -> bool {
        self.state.borrow_mut().stats.sync_calls += 1;
        true
    }

    fn get_sync_dir(&self) -> *const c_char {
        self.state.borrow().sync_dir.as_ptr()
    }
}
