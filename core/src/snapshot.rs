//! Detached snapshots of the engine's input context.
//!
//! A snapshot is built from a `RimeContext` the engine filled in, copied
//! string by string into owned values, and only then is the native context
//! handed back to the engine. Nothing returned from this module points into
//! engine memory.
//!
//! Offsets (`length`, `cursor_pos`, `sel_start`, `sel_end`) are byte offsets
//! into the UTF-8 preedit, as librime reports them.

use std::ops::Deref;

use serde::Serialize;

use crate::api::RimeApi;
use crate::error::{BridgeError, Result};
use crate::ffi::{RimeContext, RimeMenu, RimeSessionId};
use crate::marshal::native_to_host;

/// The edit buffer, split at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub length: i32,
    pub cursor_pos: i32,
    pub sel_start: i32,
    pub sel_end: i32,
    pub preedit: String,
    pub before_cursor: String,
    pub after_cursor: String,
}

impl Composition {
    /// Build a composition, deriving `before_cursor`/`after_cursor` from
    /// `preedit` and `cursor_pos`.
    pub fn new(preedit: String, length: i32, cursor_pos: i32, sel_start: i32, sel_end: i32) -> Self {
        let (before, after) = split_at_cursor(&preedit, cursor_pos);
        let before_cursor = before.to_string();
        let after_cursor = after.to_string();
        Self {
            length,
            cursor_pos,
            sel_start,
            sel_end,
            preedit,
            before_cursor,
            after_cursor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub text: String,
}

/// The current candidate page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Menu {
    pub highlighted_candidate_index: i32,
    pub is_last_page: bool,
    pub num_candidates: i32,
    pub page_no: i32,
    pub page_size: i32,
    pub candidates: Vec<Candidate>,
}

/// Everything the host needs to draw the input UI.
///
/// `menu` is `None` when the engine offers no candidates; the key is still
/// rendered, with an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Context {
    pub commit_text_preview: Option<String>,
    pub composition: Composition,
    pub menu: Option<Menu>,
}

/// Split `preedit` at byte offset `cursor_pos`.
///
/// The offset is clamped into `0..=preedit.len()` and then moved back to the
/// nearest char boundary, so the halves always concatenate to `preedit`.
pub fn split_at_cursor(preedit: &str, cursor_pos: i32) -> (&str, &str) {
    let mut at = usize::try_from(cursor_pos).unwrap_or(0).min(preedit.len());
    while !preedit.is_char_boundary(at) {
        at -= 1;
    }
    preedit.split_at(at)
}

/// Build a detached `Context` from a context the engine filled in.
///
/// Fails with `EmptyComposition` when the engine reports no preedit; in that
/// case none of the other fields are produced either.
///
/// # Safety
///
/// Every pointer in `raw` must be null or valid as librime documents it
/// (NUL-terminated strings, `num_candidates` entries behind `candidates`),
/// for the duration of the call.
pub unsafe fn translate(raw: &RimeContext) -> Result<Context> {
    let commit_text_preview = native_to_host(raw.commit_text_preview);

    let comp = &raw.composition;
    let preedit = native_to_host(comp.preedit).ok_or(BridgeError::EmptyComposition)?;
    let composition = Composition::new(
        preedit,
        comp.length,
        comp.cursor_pos,
        comp.sel_start,
        comp.sel_end,
    );

    let menu = translate_menu(&raw.menu);

    Ok(Context {
        commit_text_preview,
        composition,
        menu,
    })
}

unsafe fn translate_menu(menu: &RimeMenu) -> Option<Menu> {
    let count = usize::try_from(menu.num_candidates).unwrap_or(0);
    if count == 0 {
        return None;
    }
    if menu.candidates.is_null() {
        tracing::warn!(
            num_candidates = count,
            "engine reported candidates without a candidate array"
        );
        return None;
    }

    let raw = std::slice::from_raw_parts(menu.candidates, count);
    // A null text keeps its slot so indices line up with the highlight.
    let candidates = raw
        .iter()
        .map(|c| Candidate {
            text: native_to_host(c.text).unwrap_or_default(),
        })
        .collect();

    Some(Menu {
        highlighted_candidate_index: menu.highlighted_candidate_index,
        is_last_page: menu.is_last_page != 0,
        num_candidates: menu.num_candidates,
        page_no: menu.page_no,
        page_size: menu.page_size,
        candidates,
    })
}

/// A context borrowed from the engine, returned to it on drop.
pub struct ContextGuard<'a, A: RimeApi + ?Sized> {
    api: &'a A,
    raw: RimeContext,
}

impl<'a, A: RimeApi + ?Sized> ContextGuard<'a, A> {
    /// Ask the engine for the session's context. `None` means the engine had
    /// nothing to hand out, so there is nothing to free either.
    pub fn fetch(api: &'a A, session_id: RimeSessionId) -> Option<Self> {
        let mut raw = RimeContext::new();
        if !api.get_context(session_id, &mut raw) {
            return None;
        }
        Some(Self { api, raw })
    }
}

impl<A: RimeApi + ?Sized> Deref for ContextGuard<'_, A> {
    type Target = RimeContext;

    fn deref(&self) -> &RimeContext {
        &self.raw
    }
}

impl<A: RimeApi + ?Sized> Drop for ContextGuard<'_, A> {
    fn drop(&mut self) {
        if !self.api.free_context(&mut self.raw) {
            tracing::warn!("engine refused to free context");
        }
    }
}
