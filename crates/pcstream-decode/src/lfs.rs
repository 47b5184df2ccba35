//! Large-file-storage placeholder detection.
//!
//! A tile served through a repository without LFS smudging arrives as a tiny
//! text pointer instead of point data. Such tiles are not corrupt, they are
//! missing, and callers report them separately.

use crate::LFS_POINTER_LIMIT;

const MARKER: &str = "git-lfs";

/// Whether `bytes` is a short text blob carrying an LFS pointer marker.
#[must_use]
pub fn is_lfs_pointer(bytes: &[u8]) -> bool {
    bytes.len() <= LFS_POINTER_LIMIT && String::from_utf8_lossy(bytes).contains(MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pointer_file() {
        let pointer = b"version https://git-lfs.github.com/spec/v1\noid sha256:4d7a\nsize 12345\n";
        assert!(is_lfs_pointer(pointer));
    }

    #[test]
    fn detects_short_marker() {
        let blob = b"git-lfs pointer\n";
        assert_eq!(blob.len(), 16);
        assert!(is_lfs_pointer(blob));
    }

    #[test]
    fn ignores_large_buffers() {
        let mut blob = b"git-lfs".to_vec();
        blob.resize(LFS_POINTER_LIMIT + 1, b' ');
        assert!(!is_lfs_pointer(&blob));
    }

    #[test]
    fn ignores_binary_records() {
        assert!(!is_lfs_pointer(&[0u8; 40]));
    }
}
