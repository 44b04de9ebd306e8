//! Build a boot image from a directory tree.
//!
//! ```text
//! packer <input_dir> <out_image>
//! ```
//!
//! Every regular file below `input_dir` is stored under its path relative to
//! `input_dir`, with `/` separators.

use packer_abi::bundle::BundleBuilder;
use packer_abi::unbundle::Bundle;
use std::path::Path;
use std::{env, fs, io, process};

fn collect(root: &Path, dir: &Path, out: &mut BundleBuilder) -> io::Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    children.sort_by_key(fs::DirEntry::file_name);

    for ent in children {
        let path = ent.path();
        let kind = ent.file_type()?;
        if kind.is_dir() {
            collect(root, &path, out)?;
        } else if kind.is_file() {
            let rel = path
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("non-UTF-8 path {}", path.display()))
                })?
                .join("/");
            out.add(&name, fs::read(&path)?);
        }
    }
    Ok(())
}

fn run(dir: &str, out: &str) -> io::Result<()> {
    let mut builder = BundleBuilder::new();
    collect(Path::new(dir), Path::new(dir), &mut builder)?;
    let count = builder.len();
    let blob = builder.finish();

    // read back what we wrote before handing it to the bootloader
    Bundle::parse(&blob).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(out, &blob)?;
    eprintln!("packed {count} files ({} bytes) into {out}", blob.len());
    Ok(())
}

fn main() {
    let mut args = env::args().skip(1);
    let (Some(dir), Some(out)) = (args.next(), args.next()) else {
        eprintln!("usage: packer <input_dir> <out_image>");
        process::exit(2);
    };

    if let Err(e) = run(&dir, &out) {
        eprintln!("packer: {e}");
        process::exit(1);
    }
}
