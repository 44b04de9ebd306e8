//! # Boot image archive format
//!
//! The boot image is a single blob the bootloader loads as a module. It holds
//! the scripts and data files the kernel makes available through `load` and
//! uses to find its entry script.
//!
//! ```text
//! +--------+----------------+--------------------+---------------------+
//! | Header | Entry[count]   | names (NUL-term.)  | file data           |
//! +--------+----------------+--------------------+---------------------+
//! 0        entries_off      names_off            files_off
//! ```
//!
//! All section offsets are absolute and 8-byte aligned; all integers are
//! little-endian. Names are stored without a leading slash (`init.js`,
//! `lib/util.js`); lookups accept either form.
//!
//! * [`unbundle`] (default feature) parses a blob without allocating.
//! * [`bundle`] (feature `bundle`) builds one; used by the `packer` tool and
//!   by tests.

#![cfg_attr(not(any(test, doctest)), no_std)]

#[cfg(any(test, feature = "bundle"))]
extern crate alloc;

#[cfg(any(test, feature = "bundle"))]
pub mod bundle;
#[cfg(feature = "unbundle")]
pub mod unbundle;

/// `"INIT_BUN"` read as a little-endian `u64`.
pub const BUNDLE_MAGIC: u64 = 0x4E55_425F_5449_4E49;

/// Current layout version.
pub const BUNDLE_VERSION: u32 = 1;

/// Fixed-size header at offset 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Header {
    /// [`BUNDLE_MAGIC`]
    pub magic: u64,
    /// [`BUNDLE_VERSION`]
    pub version: u32,
    /// Number of [`Entry`] records.
    pub count: u32,
    /// Must be zero.
    pub reserved: u64,
    /// Absolute offset of the name blob.
    pub names_off: u64,
    /// Absolute offset of the file-data blob.
    pub files_off: u64,
    /// Absolute offset of the first [`Entry`].
    pub entries_off: u64,
}

impl Header {
    pub const SIZE: usize = size_of::<Self>();

    pub const MAGIC_AT: usize = 0;
    pub const VERSION_AT: usize = 8;
    pub const COUNT_AT: usize = 12;
    pub const NAMES_OFF_AT: usize = 24;
    pub const FILES_OFF_AT: usize = 32;
    pub const ENTRIES_OFF_AT: usize = 40;
}

/// One file; offsets are relative to the blob bases in [`Header`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Entry {
    /// Offset of the NUL-terminated name, relative to `names_off`.
    pub name_off: u64,
    /// Offset of the contents, relative to `files_off`.
    pub file_off: u64,
    /// Length of the contents in bytes.
    pub file_len: u64,
}

impl Entry {
    pub const SIZE: usize = size_of::<Self>();
}

impl Default for Header {
    fn default() -> Self {
        Self {
            magic: BUNDLE_MAGIC,
            version: BUNDLE_VERSION,
            count: 0,
            reserved: 0,
            names_off: 0,
            files_off: 0,
            entries_off: 0,
        }
    }
}

const _: () = {
    assert!(Header::SIZE == 48);
    assert!(Entry::SIZE == 24);
};

/// Canonical form of a stored or looked-up path: no leading `/`.
pub fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_field_offsets_match_layout() {
        assert_eq!(core::mem::offset_of!(Header, version), Header::VERSION_AT);
        assert_eq!(core::mem::offset_of!(Header, count), Header::COUNT_AT);
        assert_eq!(core::mem::offset_of!(Header, names_off), Header::NAMES_OFF_AT);
        assert_eq!(core::mem::offset_of!(Header, files_off), Header::FILES_OFF_AT);
        assert_eq!(core::mem::offset_of!(Header, entries_off), Header::ENTRIES_OFF_AT);
    }

    #[test]
    fn normalize_strips_leading_slashes() {
        assert_eq!(normalize("/init.js"), "init.js");
        assert_eq!(normalize("init.js"), "init.js");
        assert_eq!(normalize("//lib/a.js"), "lib/a.js");
    }
}
