//! In-memory bundle writer.

use crate::{Entry, Header, normalize};
use alloc::string::String;
use alloc::vec::Vec;

const fn align8(x: usize) -> usize {
    (x + 7) & !7
}

/// Collects files and lays them out in the bundle format.
///
/// Entries are written sorted by name so the output is reproducible.
#[derive(Default)]
pub struct BundleBuilder {
    items: Vec<(String, Vec<u8>)>,
}

impl BundleBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add a file; a leading `/` on `path` is dropped.
    pub fn add(&mut self, path: &str, data: Vec<u8>) -> &mut Self {
        self.items.push((String::from(normalize(path)), data));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialize.
    ///
    /// # Panics
    /// With more than `u32::MAX` files.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.items.sort_by(|a, b| a.0.cmp(&b.0));
        let count = self.items.len();

        let mut names = Vec::new();
        let mut files = Vec::new();
        let mut entries = Vec::with_capacity(count);
        for (name, data) in &self.items {
            let name_off = names.len();
            names.extend_from_slice(name.as_bytes());
            names.push(0);

            let file_off = files.len();
            files.extend_from_slice(data);
            files.resize(align8(files.len()), 0);

            entries.push(Entry {
                name_off: name_off as u64,
                file_off: file_off as u64,
                file_len: data.len() as u64,
            });
        }
        names.resize(align8(names.len()), 0);

        let entries_off = align8(Header::SIZE);
        let names_off = align8(entries_off + count * Entry::SIZE);
        let files_off = align8(names_off + names.len());

        let header = Header {
            count: u32::try_from(count).expect("too many files for one bundle"),
            names_off: names_off as u64,
            files_off: files_off as u64,
            entries_off: entries_off as u64,
            ..Header::default()
        };

        let mut out = Vec::with_capacity(files_off + files.len());
        out.extend_from_slice(&header.magic.to_le_bytes());
        out.extend_from_slice(&header.version.to_le_bytes());
        out.extend_from_slice(&header.count.to_le_bytes());
        out.extend_from_slice(&header.reserved.to_le_bytes());
        out.extend_from_slice(&header.names_off.to_le_bytes());
        out.extend_from_slice(&header.files_off.to_le_bytes());
        out.extend_from_slice(&header.entries_off.to_le_bytes());
        out.resize(entries_off, 0);

        for e in &entries {
            out.extend_from_slice(&e.name_off.to_le_bytes());
            out.extend_from_slice(&e.file_off.to_le_bytes());
            out.extend_from_slice(&e.file_len.to_le_bytes());
        }
        out.resize(names_off, 0);
        out.extend_from_slice(&names);
        out.resize(files_off, 0);
        out.extend_from_slice(&files);
        out
    }
}
