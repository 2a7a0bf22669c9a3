//! Template fragment discovery and reading.
//!
//! A templates directory holds the mandatory skeleton (`haproxy.tmpl`),
//! any number of frontend fragments (`*-fe.cfg`) and backend fragments
//! (`*-be.cfg`). [`load_fragments`] reads all of them through a
//! [`FragmentSource`] before compilation starts, so the composer itself
//! never touches the filesystem.

use std::path::Path;

use crate::error::SwitchyardError;

pub const SKELETON_FILE: &str = "haproxy.tmpl";
pub const FRONTEND_SUFFIX: &str = "-fe.cfg";
pub const BACKEND_SUFFIX: &str = "-be.cfg";

/// One named piece of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub content: String,
}

impl Fragment {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Everything the composer merges into one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragments {
    pub skeleton: Fragment,
    pub frontends: Vec<Fragment>,
    pub backends: Vec<Fragment>,
}

impl Fragments {
    #[must_use]
    pub fn skeleton_only(content: impl Into<String>) -> Self {
        Self {
            skeleton: Fragment::new(SKELETON_FILE, content),
            frontends: Vec::new(),
            backends: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_skeleton_only(&self) -> bool {
        self.frontends.is_empty() && self.backends.is_empty()
    }
}

pub trait FragmentSource: Send + Sync {
    /// File names in `dir`, in no particular order.
    fn list_fragment_files(&self, dir: &Path) -> Result<Vec<String>, SwitchyardError>;

    fn read_fragment(&self, path: &Path) -> Result<Vec<u8>, SwitchyardError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsFragmentSource;

impl FragmentSource for FsFragmentSource {
    fn list_fragment_files(&self, dir: &Path) -> Result<Vec<String>, SwitchyardError> {
        let map_err = |source: std::io::Error| SwitchyardError::FragmentDirRead {
            path: dir.to_path_buf(),
            source,
        };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(map_err)? {
            let entry = entry.map_err(map_err)?;
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn read_fragment(&self, path: &Path) -> Result<Vec<u8>, SwitchyardError> {
        std::fs::read(path).map_err(|source| SwitchyardError::FragmentRead {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read_named(
    source: &dyn FragmentSource,
    dir: &Path,
    name: &str,
) -> Result<Fragment, SwitchyardError> {
    let path = dir.join(name);
    let bytes = source.read_fragment(&path)?;
    let content = String::from_utf8(bytes).map_err(|e| SwitchyardError::FragmentRead {
        path: path.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    Ok(Fragment::new(name, content))
}

/// Read the skeleton plus every frontend and backend fragment in `dir`.
///
/// Frontend and backend names are sorted so the result does not depend on
/// directory iteration order.
pub fn load_fragments(source: &dyn FragmentSource, dir: &Path) -> Result<Fragments, SwitchyardError> {
    let mut names = source.list_fragment_files(dir)?;
    names.sort();

    let skeleton = read_named(source, dir, SKELETON_FILE)?;
    let mut frontends = Vec::new();
    let mut backends = Vec::new();
    for name in &names {
        if name.ends_with(FRONTEND_SUFFIX) {
            frontends.push(read_named(source, dir, name)?);
        } else if name.ends_with(BACKEND_SUFFIX) {
            backends.push(read_named(source, dir, name)?);
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        frontends = frontends.len(),
        backends = backends.len(),
        "loaded template fragments"
    );

    Ok(Fragments {
        skeleton,
        frontends,
        backends,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_sorted_frontends_and_backends() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SKELETON_FILE), "skeleton").unwrap();
        std::fs::write(dir.path().join("b-fe.cfg"), "fe b").unwrap();
        std::fs::write(dir.path().join("a-fe.cfg"), "fe a").unwrap();
        std::fs::write(dir.path().join("z-be.cfg"), "be z").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let fragments = load_fragments(&FsFragmentSource, dir.path()).unwrap();

        assert_eq!(fragments.skeleton.content, "skeleton");
        let fe: Vec<_> = fragments.frontends.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fe, vec!["a-fe.cfg", "b-fe.cfg"]);
        assert_eq!(fragments.backends, vec![Fragment::new("z-be.cfg", "be z")]);
    }

    #[test]
    fn missing_skeleton_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_fragments(&FsFragmentSource, dir.path()).unwrap_err();
        match err {
            SwitchyardError::FragmentRead { path, .. } => {
                assert_eq!(path, dir.path().join(SKELETON_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_fragments(&FsFragmentSource, Path::new("/no/such/templates")).unwrap_err();
        assert!(matches!(err, SwitchyardError::FragmentDirRead { .. }));
        assert!(err.to_string().contains("/no/such/templates"));
    }

    #[test]
    fn skeleton_only_detection() {
        let fragments = Fragments::skeleton_only("global");
        assert!(fragments.is_skeleton_only());
        assert_eq!(fragments.skeleton.name, SKELETON_FILE);
    }
}
