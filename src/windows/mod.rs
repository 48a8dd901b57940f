//! Win32 wrappers used by the launch primitives
//!
//! Each wrapper owns its kernel handle and closes it on drop.

#![cfg(target_os = "windows")]

pub mod console;
pub mod dll;
pub mod job;
pub mod semaphore;

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

/// NUL-terminated UTF-16 copy of `s`.
pub fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(std::iter::once(0)).collect()
}
