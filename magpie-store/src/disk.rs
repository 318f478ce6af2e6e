//! File naming and replacement writes shared by the store variants.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Derive the backup path by inserting `_bkp` before the final extension.
///
/// `last_time.json` becomes `last_time_bkp.json`; names without an
/// extension get a plain `_bkp` suffix.
pub fn backup_path(primary: &Path) -> PathBuf {
    match (primary.file_stem(), primary.extension()) {
        (Some(stem), Some(ext)) => primary.with_file_name(format!(
            "{}_bkp.{}",
            stem.to_string_lossy(),
            ext.to_string_lossy()
        )),
        _ => {
            let mut name = primary.as_os_str().to_os_string();
            name.push("_bkp");
            PathBuf::from(name)
        }
    }
}

/// Write `body` to `path`, fully replacing prior contents.
///
/// Goes through a temp sibling and a rename so a crash mid-write cannot
/// leave a half-written file behind.
pub(crate) fn write_replace(path: &Path, body: &str) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)
}
