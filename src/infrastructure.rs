mod json_file;

pub use self::json_file::*;

use std::path::{Path, PathBuf};

/// 文書の隣に置く採番ファイルのパス
fn sequence_path(document: &Path) -> PathBuf {
    let mut name = document.as_os_str().to_owned();
    name.push(".seq");
    PathBuf::from(name)
}
