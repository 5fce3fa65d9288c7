//! include yol çözümü: tam yol, `yol.ver`, `lib/yol.ver` sırasıyla denenir.

use std::path::{Path, PathBuf};

pub fn resolve(path: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(path);
    if direct.is_file() {
        return Some(direct);
    }
    let with_ext = PathBuf::from(format!("{}.ver", path));
    if with_ext.is_file() {
        return Some(with_ext);
    }
    let in_lib = Path::new("lib").join(format!("{}.ver", path));
    if in_lib.is_file() {
        return Some(in_lib);
    }
    None
}
