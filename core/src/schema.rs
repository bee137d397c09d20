//! The engine's schema catalog.

use serde::Serialize;

use crate::api::RimeApi;
use crate::ffi::RimeSchemaList;
use crate::handle::RimeHandle;
use crate::marshal::native_to_host;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaEntry {
    pub schema_id: String,
    pub name: String,
}

impl<A: RimeApi> RimeHandle<A> {
    /// List the installed schemas in the order the engine reports them.
    ///
    /// Rebuilt from the engine on every call. `None` when the engine fails to
    /// produce a list. Needs no session.
    pub fn get_schema_list(&self) -> Option<Vec<SchemaEntry>> {
        let mut raw = RimeSchemaList::new();
        if !self.api().get_schema_list(&mut raw) {
            tracing::debug!("engine returned no schema list");
            return None;
        }
        let list = SchemaListGuard {
            api: self.api(),
            raw,
        };

        if list.raw.list.is_null() {
            return Some(Vec::new());
        }
        // SAFETY: the engine filled `size` items behind `list`; they stay
        // valid until the guard hands them back.
        let items = unsafe { std::slice::from_raw_parts(list.raw.list, list.raw.size) };
        let entries = items
            .iter()
            .map(|item| unsafe {
                SchemaEntry {
                    schema_id: native_to_host(item.schema_id).unwrap_or_default(),
                    name: native_to_host(item.name).unwrap_or_default(),
                }
            })
            .collect();
        Some(entries)
    }
}

struct SchemaListGuard<'a, A: RimeApi + ?Sized> {
    api: &'a A,
    raw: RimeSchemaList,
}

impl<A: RimeApi + ?Sized> Drop for SchemaListGuard<'_, A> {
    fn drop(&mut self) {
        self.api.free_schema_list(&mut self.raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRime;

    #[test]
    fn test_engine_order_kept() {
        let mock = MockRime::new();
        mock.set_schemas(&[("wubi86", "五笔86"), ("cangjie5", "倉頡五代"), ("luna_pinyin", "朙月拼音")]);
        let handle = RimeHandle::new(mock);

        let ids: Vec<_> = handle
            .get_schema_list()
            .unwrap()
            .into_iter()
            .map(|e| e.schema_id)
            .collect();
        assert_eq!(ids, ["wubi86", "cangjie5", "luna_pinyin"]);
    }

    #[test]
    fn test_list_freed_once() {
        let handle = RimeHandle::new(MockRime::new());
        let first = handle.get_schema_list().unwrap();
        let second = handle.get_schema_list().unwrap();
        assert_eq!(first, second);

        let stats = handle.api().stats();
        assert_eq!(stats.schema_lists_fetched, 2);
        assert_eq!(stats.schema_lists_freed, 2);
        assert_eq!(stats.live_allocations, 0);
    }

    #[test]
    fn test_failure_is_none() {
        let mock = MockRime::new();
        mock.fail_schema_list(true);
        let handle = RimeHandle::new(mock);
        assert_eq!(handle.get_schema_list(), None);
        assert_eq!(handle.api().stats().schema_lists_freed, 0);
    }

    #[test]
    fn test_empty_catalog() {
        let mock = MockRime::new();
        mock.set_schemas(&[]);
        let handle = RimeHandle::new(mock);
        assert_eq!(handle.get_schema_list(), Some(Vec::new()));
        assert_eq!(handle.api().stats().schema_lists_freed, 1);
    }
}
