use crate::{BUNDLE_MAGIC, BUNDLE_VERSION, Entry, Header, normalize};

/// Parsed, validated view over a bundle blob.
#[derive(Clone, Copy)]
pub struct Bundle<'a> {
    blob: &'a [u8],
    hdr: Header,
}

/// Iterator over `(name, bytes)`; yields a `Result` per entry.
pub struct Entries<'a> {
    bundle: Bundle<'a>,
    idx: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BundleError {
    #[error("blob is shorter than the bundle header")]
    TooShort,
    #[error("bad bundle magic")]
    BadMagic,
    #[error("unsupported bundle version {0}")]
    BadVersion(u32),
    #[error("bundle section is not 8-byte aligned")]
    BadAlignment,
    #[error("bundle offset points outside the blob")]
    OutOfBounds,
    #[error("bundle entry name is not UTF-8")]
    Utf8,
}

#[inline]
const fn is_aligned8(x: usize) -> bool {
    x & 7 == 0
}

#[inline]
fn read_u32_le(buf: &[u8], off: usize) -> Result<u32, BundleError> {
    let end = off.checked_add(4).ok_or(BundleError::OutOfBounds)?;
    let bytes = buf.get(off..end).ok_or(BundleError::OutOfBounds)?;
    let mut le = [0; 4];
    le.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(le))
}

#[inline]
fn read_u64_le(buf: &[u8], off: usize) -> Result<u64, BundleError> {
    let end = off.checked_add(8).ok_or(BundleError::OutOfBounds)?;
    let bytes = buf.get(off..end).ok_or(BundleError::OutOfBounds)?;
    let mut le = [0; 8];
    le.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(le))
}

#[inline]
fn read_offset(buf: &[u8], off: usize) -> Result<usize, BundleError> {
    usize::try_from(read_u64_le(buf, off)?).map_err(|_| BundleError::OutOfBounds)
}

impl<'a> Bundle<'a> {
    /// Parse and validate a bundle blob.
    ///
    /// # Errors
    /// Any structural problem with the header or the entry table.
    pub fn parse(blob: &'a [u8]) -> Result<Self, BundleError> {
        use BundleError::{BadAlignment, BadMagic, BadVersion, OutOfBounds, TooShort};

        if blob.len() < Header::SIZE {
            return Err(TooShort);
        }
        if read_u64_le(blob, Header::MAGIC_AT)? != BUNDLE_MAGIC {
            return Err(BadMagic);
        }
        let version = read_u32_le(blob, Header::VERSION_AT)?;
        if version != BUNDLE_VERSION {
            return Err(BadVersion(version));
        }

        let count = read_u32_le(blob, Header::COUNT_AT)?;
        let names_off = read_offset(blob, Header::NAMES_OFF_AT)?;
        let files_off = read_offset(blob, Header::FILES_OFF_AT)?;
        let entries_off = read_offset(blob, Header::ENTRIES_OFF_AT)?;

        if !is_aligned8(names_off) || !is_aligned8(files_off) || !is_aligned8(entries_off) {
            return Err(BadAlignment);
        }
        if names_off > blob.len() || files_off > blob.len() {
            return Err(OutOfBounds);
        }

        let table_len = (count as usize)
            .checked_mul(Entry::SIZE)
            .ok_or(OutOfBounds)?;
        let table_end = entries_off.checked_add(table_len).ok_or(OutOfBounds)?;
        if table_end > blob.len() {
            return Err(OutOfBounds);
        }

        Ok(Bundle {
            blob,
            hdr: Header {
                count,
                names_off: names_off as u64,
                files_off: files_off as u64,
                entries_off: entries_off as u64,
                ..Header::default()
            },
        })
    }

    /// Number of files in the bundle.
    pub const fn len(&self) -> usize {
        self.hdr.count as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the whole blob in bytes.
    pub const fn size(&self) -> usize {
        self.blob.len()
    }

    pub const fn entries(&self) -> Entries<'a> {
        Entries {
            bundle: *self,
            idx: 0,
        }
    }

    /// Fetch the `(name, bytes)` pair for entry `i`.
    ///
    /// # Errors
    /// `OutOfBounds` for a bad index or offsets outside the blob, `Utf8` for a
    /// malformed name.
    pub fn get(&self, i: usize) -> Result<(&'a str, &'a [u8]), BundleError> {
        use BundleError::{OutOfBounds, Utf8};

        if i >= self.len() {
            return Err(OutOfBounds);
        }
        let at = self.hdr.entries_off as usize + i * Entry::SIZE;
        let name_rel = read_offset(self.blob, at)?;
        let file_rel = read_offset(self.blob, at + 8)?;
        let file_len = read_offset(self.blob, at + 16)?;

        let name_start = (self.hdr.names_off as usize)
            .checked_add(name_rel)
            .ok_or(OutOfBounds)?;
        let tail = self.blob.get(name_start..).ok_or(OutOfBounds)?;
        let nul = tail.iter().position(|&b| b == 0).ok_or(OutOfBounds)?;
        let name = core::str::from_utf8(&tail[..nul]).map_err(|_| Utf8)?;

        let file_start = (self.hdr.files_off as usize)
            .checked_add(file_rel)
            .ok_or(OutOfBounds)?;
        let file_end = file_start.checked_add(file_len).ok_or(OutOfBounds)?;
        let bytes = self.blob.get(file_start..file_end).ok_or(OutOfBounds)?;

        Ok((name, bytes))
    }

    /// Find a file by path; a leading `/` is optional on either side.
    pub fn find(&self, path: &str) -> Option<&'a [u8]> {
        let needle = normalize(path);
        self.entries()
            .flatten()
            .find(|(name, _)| normalize(name) == needle)
            .map(|(_, bytes)| bytes)
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<(&'a str, &'a [u8]), BundleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.bundle.len() {
            return None;
        }
        let i = self.idx;
        self.idx += 1;
        Some(self.bundle.get(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let r = self.bundle.len().saturating_sub(self.idx);
        (r, Some(r))
    }
}

impl core::iter::FusedIterator for Entries<'_> {}
