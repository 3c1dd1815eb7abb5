use std::fs;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::error::HcpError;

/// The published archives wrap everything in one top-level directory.
pub const ARCHIVE_STRIP_COMPONENTS: usize = 1;

pub fn is_tarball(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".tgz") || lower.ends_with(".tar.gz")
}

/// Unpacks a gzip'd tarball into `target_dir`, dropping the first
/// `strip_components` path components of every member. Returns the number of
/// regular files written.
pub fn extract_tar_gz(
    archive_path: &Path,
    target_dir: &Path,
    strip_components: usize,
) -> Result<usize, HcpError> {
    let archive_err = |message: String| HcpError::Archive {
        path: archive_path.to_path_buf(),
        message,
    };

    let file = fs::File::open(archive_path)
        .map_err(|err| archive_err(format!("open: {err}")))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|err| archive_err(err.to_string()))?;

    let mut written = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|err| archive_err(err.to_string()))?;
        let member = entry
            .path()
            .map_err(|err| archive_err(err.to_string()))?
            .into_owned();
        let Some(relative) = strip_path(&member, strip_components)? else {
            continue;
        };
        let target = target_dir.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)
                    .map_err(|err| HcpError::Filesystem(err.to_string()))?;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|err| HcpError::Filesystem(err.to_string()))?;
                }
                entry
                    .unpack(&target)
                    .map_err(|err| archive_err(format!("{}: {err}", member.display())))?;
                written += 1;
            }
            other => {
                tracing::debug!(member = %member.display(), kind = ?other, "skipping archive member");
            }
        }
    }
    Ok(written)
}

fn strip_path(member: &Path, strip_components: usize) -> Result<Option<PathBuf>, HcpError> {
    let mut relative = PathBuf::new();
    let components = member
        .components()
        .filter(|component| !matches!(component, Component::CurDir));
    for component in components.skip(strip_components) {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(HcpError::Archive {
                    path: member.to_path_buf(),
                    message: "archive entry path traversal detected".to_string(),
                });
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tarball_names() {
        assert!(is_tarball("rest.tgz"));
        assert!(is_tarball("hcp_task.TAR.GZ"));
        assert!(!is_tarball("atlas.npz"));
    }

    #[test]
    fn strip_leading_component() {
        let stripped = strip_path(Path::new("hcp_rest/subjects/0/a.npy"), 1).unwrap();
        assert_eq!(stripped, Some(PathBuf::from("subjects/0/a.npy")));
        assert_eq!(strip_path(Path::new("hcp_rest/"), 1).unwrap(), None);
    }

    #[test]
    fn reject_traversal() {
        assert!(strip_path(Path::new("top/../../etc/passwd"), 1).is_err());
    }
}
