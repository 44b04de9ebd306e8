use crate::bootstrap::KernelContext;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use kernel_script::Script;

/// One script of the boot image, compiled but not run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SnapshotEntry {
    pub path: &'static str,
    pub bytes: usize,
    /// Top-level statements, or the compile error.
    pub result: Result<usize, String>,
}

/// Compiles every `.js` file in the boot image and records a manifest line
/// per file in the key store.
pub(super) fn run(ctx: &KernelContext) -> Vec<SnapshotEntry> {
    let mut entries = Vec::new();
    for path in ctx.image.paths() {
        if !path.ends_with(".js") {
            continue;
        }
        let Some(bytes) = ctx.image.get(path) else {
            continue;
        };
        let source = String::from_utf8_lossy(bytes);
        let result = Script::compile(&source, packer_abi::normalize(path))
            .map(|script| script.statement_count())
            .map_err(|e| e.to_string());

        let line = match &result {
            Ok(n) => alloc::format!("ok {} bytes, {n} statements", bytes.len()),
            Err(e) => alloc::format!("error {e}"),
        };
        log::info!("snapshot {path}: {line}");
        ctx.keys.set(&alloc::format!("snapshot.{path}"), line);

        entries.push(SnapshotEntry {
            path,
            bytes: bytes.len(),
            result,
        });
    }
    entries
}
