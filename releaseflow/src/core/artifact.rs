//! Build artifacts handed from the builder to the index stage.

use crate::errors::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The two kinds of distribution a release produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Source distribution archive (`.tar.gz`).
    Sdist,
    /// Built wheel (`.whl`).
    Wheel,
}

impl ArtifactKind {
    /// Short label used in errors and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sdist => "sdist",
            Self::Wheel => "wheel",
        }
    }

    /// File name suffix of this kind.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Sdist => ".tar.gz",
            Self::Wheel => ".whl",
        }
    }

    /// Infers the kind from a file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        [Self::Sdist, Self::Wheel]
            .into_iter()
            .find(|kind| name.ends_with(kind.suffix()))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name, version and python tag read from a distribution file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionName {
    /// sdist or wheel.
    pub kind: ArtifactKind,
    /// Distribution name as it appears in the file name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// `source` for sdists, the python tag (e.g. `py3`) for wheels.
    pub pyversion: String,
}

impl DistributionName {
    /// Parses `{name}-{version}.tar.gz` or
    /// `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`.
    ///
    /// # Errors
    ///
    /// Returns a short reason when the file name has neither shape.
    pub fn parse(path: &Path) -> Result<Self, &'static str> {
        let kind = ArtifactKind::from_path(path).ok_or("not a .tar.gz or .whl distribution")?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("file name is not valid UTF-8")?;
        let stem = &file_name[..file_name.len() - kind.suffix().len()];

        let (name, version, pyversion) = match kind {
            ArtifactKind::Sdist => {
                let (name, version) = stem
                    .rsplit_once('-')
                    .ok_or("expected {name}-{version}.tar.gz")?;
                (name, version, "source")
            }
            ArtifactKind::Wheel => {
                let parts: Vec<&str> = stem.split('-').collect();
                if !(5..=6).contains(&parts.len()) {
                    return Err("wheel file name must have 5 or 6 dash-separated fields");
                }
                (parts[0], parts[1], parts[parts.len() - 3])
            }
        };

        if name.is_empty() || version.is_empty() {
            return Err("empty name or version");
        }

        Ok(Self {
            kind,
            name: name.to_string(),
            version: version.to_string(),
            pyversion: pyversion.to_string(),
        })
    }

    /// Name folded the way wheel file names spell it: lowercase, with `-`
    /// and `.` replaced by `_`.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                '-' | '.' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect()
    }
}

/// Output of one build: the source archive and the wheel, in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifactSet {
    /// Path to the source distribution.
    pub sdist: PathBuf,
    /// Path to the wheel.
    pub wheel: PathBuf,
}

impl BuildArtifactSet {
    /// Creates a new artifact set.
    #[must_use]
    pub fn new(sdist: impl Into<PathBuf>, wheel: impl Into<PathBuf>) -> Self {
        Self {
            sdist: sdist.into(),
            wheel: wheel.into(),
        }
    }

    /// Artifacts in upload order.
    #[must_use]
    pub fn paths(&self) -> [&Path; 2] {
        [self.sdist.as_path(), self.wheel.as_path()]
    }

    /// Checks that both artifacts are present, regular and non-empty, and
    /// that their file names agree on name and version.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingArtifact`] naming the first bad artifact,
    /// or [`BuildError::InconsistentArtifacts`] when the pair does not match.
    pub fn verify(&self) -> Result<(), BuildError> {
        check_file(ArtifactKind::Sdist, &self.sdist)?;
        check_file(ArtifactKind::Wheel, &self.wheel)?;

        let sdist = parse_as(ArtifactKind::Sdist, &self.sdist)?;
        let wheel = parse_as(ArtifactKind::Wheel, &self.wheel)?;
        if sdist.normalized_name() != wheel.normalized_name() {
            return Err(BuildError::InconsistentArtifacts {
                reason: format!("sdist is '{}' but wheel is '{}'", sdist.name, wheel.name),
            });
        }
        if sdist.version != wheel.version {
            return Err(BuildError::InconsistentArtifacts {
                reason: format!(
                    "sdist is version {} but wheel is version {}",
                    sdist.version, wheel.version
                ),
            });
        }
        Ok(())
    }
}

fn parse_as(kind: ArtifactKind, path: &Path) -> Result<DistributionName, BuildError> {
    let parsed = DistributionName::parse(path).map_err(|reason| {
        BuildError::missing(kind.label(), format!("{}: {reason}", path.display()))
    })?;
    if parsed.kind != kind {
        return Err(BuildError::missing(
            kind.label(),
            format!("{} is not a {kind}", path.display()),
        ));
    }
    Ok(parsed)
}

fn check_file(kind: ArtifactKind, path: &Path) -> Result<(), BuildError> {
    let meta = std::fs::metadata(path).map_err(|e| {
        BuildError::missing(kind.label(), format!("{}: {e}", path.display()))
    })?;

    if !meta.is_file() {
        return Err(BuildError::missing(
            kind.label(),
            format!("{} is not a regular file", path.display()),
        ));
    }
    if meta.len() == 0 {
        return Err(BuildError::missing(
            kind.label(),
            format!("{} is empty", path.display()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            ArtifactKind::from_path(Path::new("dist/pkg-2.0.0.tar.gz")),
            Some(ArtifactKind::Sdist)
        );
        assert_eq!(
            ArtifactKind::from_path(Path::new("dist/pkg-2.0.0-py3-none-any.whl")),
            Some(ArtifactKind::Wheel)
        );
        assert_eq!(ArtifactKind::from_path(Path::new("dist/README.md")), None);
    }

    #[test]
    fn test_paths_are_ordered() {
        let set = BuildArtifactSet::new("a.tar.gz", "a.whl");
        let [first, second] = set.paths();
        assert_eq!(first, Path::new("a.tar.gz"));
        assert_eq!(second, Path::new("a.whl"));
    }

    #[test]
    fn test_verify_accepts_non_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let sdist = dir.path().join("pkg-1.0.tar.gz");
        let wheel = dir.path().join("pkg-1.0-py3-none-any.whl");
        std::fs::write(&sdist, b"archive").unwrap();
        std::fs::write(&wheel, b"wheel").unwrap();

        assert!(BuildArtifactSet::new(sdist, wheel).verify().is_ok());
    }

    #[test]
    fn test_verify_rejects_empty_wheel() {
        let dir = tempfile::tempdir().unwrap();
        let sdist = dir.path().join("pkg-1.0.tar.gz");
        let wheel = dir.path().join("pkg-1.0-py3-none-any.whl");
        std::fs::write(&sdist, b"archive").unwrap();
        std::fs::write(&wheel, b"").unwrap();

        let err = BuildArtifactSet::new(sdist, wheel).verify().unwrap_err();
        assert!(matches!(err, BuildError::MissingArtifact { kind: "wheel", .. }));
    }

    #[test]
    fn test_verify_rejects_missing_sdist() {
        let dir = tempfile::tempdir().unwrap();
        let set = BuildArtifactSet::new(
            dir.path().join("nope-1.0.tar.gz"),
            dir.path().join("nope-1.0-py3-none-any.whl"),
        );

        let err = set.verify().unwrap_err();
        assert!(matches!(err, BuildError::MissingArtifact { kind: "sdist", .. }));
    }

    fn write_pair(dir: &Path, sdist: &str, wheel: &str) -> BuildArtifactSet {
        let sdist = dir.join(sdist);
        let wheel = dir.join(wheel);
        std::fs::write(&sdist, b"archive").unwrap();
        std::fs::write(&wheel, b"wheel").unwrap();
        BuildArtifactSet::new(sdist, wheel)
    }

    #[test]
    fn test_verify_rejects_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let set = write_pair(dir.path(), "pkg-2.0.0.tar.gz", "pkg-1.0.0-py3-none-any.whl");

        match set.verify().unwrap_err() {
            BuildError::InconsistentArtifacts { reason } => {
                assert!(reason.contains("2.0.0"));
                assert!(reason.contains("1.0.0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_verify_rejects_name_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let set = write_pair(dir.path(), "pkg-2.0.0.tar.gz", "other-2.0.0-py3-none-any.whl");

        let err = set.verify().unwrap_err();
        assert!(matches!(err, BuildError::InconsistentArtifacts { .. }));
    }

    #[test]
    fn test_verify_accepts_normalized_name_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let set = write_pair(dir.path(), "My.Pkg-1.0.tar.gz", "my_pkg-1.0-py3-none-any.whl");

        assert!(set.verify().is_ok());
    }

    #[test]
    fn test_verify_rejects_swapped_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let set = write_pair(dir.path(), "pkg-1.0-py3-none-any.whl", "pkg-1.0.tar.gz");

        let err = set.verify().unwrap_err();
        assert!(matches!(err, BuildError::MissingArtifact { kind: "sdist", .. }));
    }

    #[test]
    fn test_parse_sdist_name() {
        let dist = DistributionName::parse(Path::new("dist/my-pkg-1.0rc1.tar.gz")).unwrap();
        assert_eq!(dist.kind, ArtifactKind::Sdist);
        assert_eq!(dist.name, "my-pkg");
        assert_eq!(dist.version, "1.0rc1");
        assert_eq!(dist.pyversion, "source");
        assert_eq!(dist.normalized_name(), "my_pkg");
    }

    #[test]
    fn test_parse_wheel_name_with_build_tag() {
        let dist =
            DistributionName::parse(Path::new("beartype-0.18.5-1-py3-none-any.whl")).unwrap();
        assert_eq!(dist.kind, ArtifactKind::Wheel);
        assert_eq!(dist.version, "0.18.5");
        assert_eq!(dist.pyversion, "py3");
    }

    #[test]
    fn test_parse_rejects_other_names() {
        for name in ["dist/pkg.zip", "dist/pkg.tar.gz", "dist/pkg-1.0-any.whl"] {
            assert!(DistributionName::parse(Path::new(name)).is_err(), "{name}");
        }
    }
}
