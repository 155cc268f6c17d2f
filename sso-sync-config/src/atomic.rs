//! Atomic file replacement.
//!
//! Every file this tool touches is read fully, transformed in memory and
//! replaced through a sibling temp file plus `rename`, so a reader (or a
//! crashed run) only ever sees the old or the new content.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix appended to the target file name for the temp file.
const TEMP_SUFFIX: &str = ".aws-sso-sync.tmp";

/// Path of the temp file used while replacing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("unnamed"));
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Create the temp file, owner read/write only on Unix.
fn open_restricted_write(path: &Path) -> std::io::Result<fs::File> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Follow `path` to the real file when it is a symlink.
fn resolve_target(path: &Path) -> std::io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => match fs::canonicalize(path) {
            Ok(real) => Ok(real),
            // Dangling link: write where it points.
            Err(_) => {
                let dest = fs::read_link(path)?;
                Ok(match path.parent() {
                    Some(parent) => parent.join(dest),
                    None => dest,
                })
            }
        },
        _ => Ok(path.to_path_buf()),
    }
}

/// Atomically replace `path` with `contents`.
///
/// The parent directory must already exist. Permissions of an existing target
/// are carried over to the replacement. A symlinked target is resolved first
/// so the link stays in place and the file it points to is replaced. On
/// failure the temp file is removed and the target is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let target = resolve_target(path)?;
    let path = target.as_path();
    let temp_path = temp_path_for(path);

    let result = (|| {
        let mut file = open_restricted_write(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(&temp_path, metadata.permissions())?;
        }

        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
