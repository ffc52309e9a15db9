use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDateTime;

/// Split `data` into consecutive chunks of `size` elements. The last chunk
/// holds the remainder. A non-positive size yields no chunks at all.
pub fn make_chunks<T: Clone>(data: &[T], size: i64) -> Vec<Vec<T>> {
    if size <= 0 {
        return Vec::new();
    }
    let size = usize::try_from(size).unwrap_or(usize::MAX);
    data.chunks(size).map(<[T]>::to_vec).collect()
}

/// Absolute number of whole days between two timestamps.
pub fn days_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_days().abs()
}

/// Write `content` to `path`, replacing any existing file, and return the
/// size of the file on disk in bytes.
pub fn dump_content_into_file(content: &str, path: &Path) -> io::Result<u64> {
    fs::write(path, content)?;
    Ok(fs::metadata(path)?.len())
}
