use proptest::prelude::*;
use rime_bridge_core::{host_to_native, native_to_host, split_at_cursor, MockRime, RimeHandle};

// Strategy for preedit-like text: ASCII codes, CJK, and mixed.
fn preedit_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("".to_string()),
        "[a-z ']{0,30}",
        "[\u{4E00}-\u{9FFF}]{0,10}",
        "[a-z\u{4E00}-\u{9FFF}\u{1F600}-\u{1F64F} ]{0,20}",
    ]
}

fn schema_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z_]{1,12}", "[\u{4E00}-\u{9FFF}a-z]{1,6}"), 0..8)
}

proptest! {
    #[test]
    fn test_marshal_round_trip(s in "[^\\x00]{0,64}") {
        let buf = host_to_native(Some(&s)).unwrap().unwrap();
        let back = unsafe { native_to_host(buf.as_ptr()) };
        prop_assert_eq!(back, Some(s));
    }

    #[test]
    fn test_split_halves_concatenate(preedit in preedit_strategy(), cursor in -4i32..64) {
        let (before, after) = split_at_cursor(&preedit, cursor);
        prop_assert_eq!(format!("{}{}", before, after), preedit.clone());
        prop_assert!(before.len() <= preedit.len());
    }

    #[test]
    fn test_split_at_every_boundary(preedit in preedit_strategy()) {
        for (at, _) in preedit.char_indices().chain(std::iter::once((preedit.len(), ' '))) {
            let (before, after) = split_at_cursor(&preedit, at as i32);
            prop_assert_eq!(before.len(), at);
            prop_assert_eq!(format!("{}{}", before, after), preedit.clone());
        }
    }

    #[test]
    fn test_schema_list_is_stable(schemas in schema_strategy()) {
        let mock = MockRime::new();
        let pairs: Vec<(&str, &str)> = schemas
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        mock.set_schemas(&pairs);
        let handle = RimeHandle::new(mock);

        let first = handle.get_schema_list().unwrap();
        let second = handle.get_schema_list().unwrap();
        prop_assert_eq!(&first, &second);

        let ids: Vec<&str> = first.iter().map(|e| e.schema_id.as_str()).collect();
        let expected: Vec<&str> = schemas.iter().map(|(id, _)| id.as_str()).collect();
        prop_assert_eq!(ids, expected);
        prop_assert_eq!(handle.api().stats().live_allocations, 0);
    }
}
