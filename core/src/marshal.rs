//! Conversion between host strings and NUL-terminated engine buffers.

use std::ffi::{c_char, CStr, CString};

use crate::error::{BridgeError, Result};

/// Copy an optional host string into a fresh NUL-terminated buffer.
///
/// The size is measured first and the buffer allocated once at full size, so
/// a returned buffer always holds the whole string. `None` stays `None`.
pub fn host_to_native(value: Option<&str>) -> Result<Option<CString>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let bytes = value.as_bytes();
    if let Some(offset) = bytes.iter().position(|&b| b == 0) {
        return Err(BridgeError::InteriorNul(offset));
    }

    let size = bytes.len() + 1;
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(bytes);
    buf.push(0);

    CString::from_vec_with_nul(buf)
        .map(Some)
        .map_err(|_| BridgeError::InteriorNul(bytes.len()))
}

/// Copy an engine string into an owned host string; null maps to `None`.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of this call.
pub unsafe fn native_to_host(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Length of `s` in bytes of its UTF-8 encoding.
pub fn string_length(s: &str) -> usize {
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_stays_absent() {
        assert!(host_to_native(None).unwrap().is_none());
        assert!(unsafe { native_to_host(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_round_trip_utf8() {
        let buf = host_to_native(Some("你好 rime")).unwrap().unwrap();
        assert_eq!(buf.as_bytes().len(), "你好 rime".len());
        let back = unsafe { native_to_host(buf.as_ptr()) };
        assert_eq!(back.as_deref(), Some("你好 rime"));
    }

    #[test]
    fn test_empty_string_is_present() {
        let buf = host_to_native(Some("")).unwrap().unwrap();
        assert_eq!(buf.as_bytes_with_nul(), b"\0");
        assert_eq!(unsafe { native_to_host(buf.as_ptr()) }.as_deref(), Some(""));
    }

    #[test]
    fn test_interior_nul_rejected() {
        match host_to_native(Some("ab\0cd")) {
            Err(BridgeError::InteriorNul(2)) => {}
            other => panic!("expected InteriorNul(2), got {:?}", other),
        }
    }

    #[test]
    fn test_copy_outlives_source() {
        let source = CString::new("luna_pinyin").unwrap();
        let copy = unsafe { native_to_host(source.as_ptr()) };
        drop(source);
        assert_eq!(copy.as_deref(), Some("luna_pinyin"));
    }

    #[test]
    fn test_string_length_counts_bytes() {
        assert_eq!(string_length(""), 0);
        assert_eq!(string_length("abc"), 3);
        assert_eq!(string_length("你好"), 6);
    }
}
