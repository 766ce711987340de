//! Job identity derived from the uploaded filename.
//!
//! The base name is the filename with its last extension stripped and every
//! space replaced by an underscore. Case is preserved. With
//! [`CacheIdentity::Filename`] it is also the cache key and the prefix of every
//! stored variant (`{base}_{variant}.jpg`), so two uploads sharing a name share
//! a cache entry and overwrite each other's files.

use std::path::Path;

use crate::config::CacheIdentity;
use crate::utils::hash::content_hash;

/// Strip the extension and replace spaces with underscores.
pub fn normalize_base_name(filename: &str) -> String {
    // Browsers may send a full client path; only the final component names the image.
    let file = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match Path::new(file).extension() {
        Some(ext) => &file[..file.len() - ext.len() - 1],
        None => file,
    };
    stem.replace(' ', "_")
}

/// Cache key and output prefix for a job.
pub fn job_key(filename: &str, data: &[u8], identity: CacheIdentity) -> String {
    let base = normalize_base_name(filename);
    match identity {
        CacheIdentity::Filename => base,
        CacheIdentity::Content => format!("{}_{}", base, content_hash(data)),
    }
}

/// File name of one stored variant.
pub fn variant_file_name(prefix: &str, variant: &str) -> String {
    format!("{}_{}.jpg", prefix, variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_extension_and_spaces() {
        assert_eq!(normalize_base_name("My Photo.PNG"), "My_Photo");
        assert_eq!(normalize_base_name("holiday  2024 .jpeg"), "holiday__2024_");
    }

    #[test]
    fn test_normalize_only_last_extension() {
        assert_eq!(normalize_base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(normalize_base_name("no_extension"), "no_extension");
    }

    #[test]
    fn test_normalize_dotfile_keeps_name() {
        assert_eq!(normalize_base_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_normalize_drops_client_path() {
        assert_eq!(normalize_base_name("C:\\Users\\me\\My Cat.jpg"), "My_Cat");
        assert_eq!(normalize_base_name("dir/sub/pic.png"), "pic");
    }

    #[test]
    fn test_job_key_identity_modes() {
        assert_eq!(
            job_key("My Photo.PNG", b"abc", CacheIdentity::Filename),
            "My_Photo"
        );

        let a = job_key("My Photo.PNG", b"abc", CacheIdentity::Content);
        let b = job_key("My Photo.PNG", b"abd", CacheIdentity::Content);
        assert!(a.starts_with("My_Photo_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_variant_file_name() {
        assert_eq!(variant_file_name("cat", "10-50KB"), "cat_10-50KB.jpg");
    }
}
