use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Writes through a uniquely named temp file next to `path`, then renames it
/// into place so readers never see a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4().simple()));
    if let Some(parent) = temp_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}

/// Copies `source` to `dest`, creating the destination directory first.
pub fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)
}

pub fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// First byte that is not ASCII whitespace, if any.
pub fn first_significant_byte(contents: &[u8]) -> Option<u8> {
    contents
        .iter()
        .copied()
        .find(|byte| !byte.is_ascii_whitespace())
}

/// Builds `<stem>.<tag>.<timestamp>.<ext>` next to `path`. Never returns a
/// path that already exists.
pub fn timestamped_sibling(path: &Path, tag: &str, timestamp_ms: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    let ext = path
        .extension()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|| "json".to_string());

    let candidate = path.with_file_name(format!("{stem}.{tag}.{timestamp_ms}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    let mut attempt = 1_u32;
    loop {
        let candidate =
            path.with_file_name(format!("{stem}.{tag}.{timestamp_ms}-{attempt}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ys-file-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn write_atomic_replaces_contents_and_leaves_no_temp_files() {
        let dir = temp_dir();
        let path = dir.join("launcher-data.json");
        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");

        assert_eq!(fs::read(&path).expect("read back"), b"second");
        let leftovers = fs::read_dir(&dir)
            .expect("list dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn timestamped_sibling_never_collides() {
        let dir = temp_dir();
        let path = dir.join("launcher-data.json");
        let first = timestamped_sibling(&path, "legacy", 42);
        assert_eq!(first, dir.join("launcher-data.legacy.42.json"));
        fs::write(&first, b"taken").expect("occupy name");

        let second = timestamped_sibling(&path, "legacy", 42);
        assert_eq!(second, dir.join("launcher-data.legacy.42-1.json"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn first_significant_byte_skips_whitespace() {
        assert_eq!(first_significant_byte(b"  \n\t{\"a\":1}"), Some(b'{'));
        assert_eq!(first_significant_byte(b" \r\n"), None);
        assert_eq!(first_significant_byte(b"YSDB1:abc"), Some(b'Y'));
    }

    #[test]
    fn empty_files_are_not_candidates() {
        let dir = temp_dir();
        let empty = dir.join("empty.json");
        fs::write(&empty, b"").expect("write empty");
        let full = dir.join("full.json");
        fs::write(&full, b"{}").expect("write full");

        assert!(!is_non_empty_file(&empty));
        assert!(is_non_empty_file(&full));
        assert!(!is_non_empty_file(&dir.join("missing.json")));
        assert!(!is_non_empty_file(&dir));
        let _ = fs::remove_dir_all(&dir);
    }
}
