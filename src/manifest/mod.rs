//! BOSH manifests: patching, variable interpolation and release extraction.

pub mod document;
pub mod patch;
pub mod render;
pub mod vars;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EngineError;

pub use render::{ManifestRenderer, RenderOutcome, Template};
pub use vars::VarSet;

/// A BOSH release requested by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoshRelease {
    /// Release name.
    #[serde(default)]
    pub name: String,
    /// Download URL, if pinned.
    #[serde(default)]
    pub url: String,
    /// Requested version. Numeric versions are kept as written.
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,
}

/// Reads a scalar as written, so `1.10` stays `"1.10"`. Null reads as empty.
pub(crate) fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct ReleaseList {
    #[serde(default)]
    releases: Vec<BoshRelease>,
}

/// Reads the `releases` list of a manifest.
///
/// # Errors
///
/// Returns [`EngineError::Parse`] if the manifest is not valid YAML or its
/// `releases` entries are malformed.
pub fn extract_releases(content: &str) -> Result<Vec<BoshRelease>, EngineError> {
    let list: ReleaseList =
        serde_yaml::from_str(content).map_err(|e| EngineError::parse("manifest releases", e))?;
    Ok(list.releases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_with_numeric_versions() {
        let releases = extract_releases(
            "releases:\n- name: web\n  version: 12\n  url: https://x/web.tgz\n- name: db\n  version: \"1.2.3\"\n",
        )
        .unwrap();
        assert_eq!(
            releases,
            vec![
                BoshRelease { name: "web".into(), url: "https://x/web.tgz".into(), version: "12".into() },
                BoshRelease { name: "db".into(), url: String::new(), version: "1.2.3".into() },
            ]
        );
    }

    #[test]
    fn float_like_versions_keep_trailing_zeros() {
        let releases = extract_releases("releases:\n- name: web\n  version: 2.10\n- name: db\n  version: 1.10\n").unwrap();
        assert_eq!(releases[0].version, "2.10");
        assert_eq!(releases[1].version, "1.10");
    }

    #[test]
    fn null_version_reads_as_empty() {
        assert_eq!(extract_releases("releases:\n- name: web\n  version: ~\n").unwrap()[0].version, "");
    }

    #[test]
    fn manifest_without_releases_is_empty() {
        assert!(extract_releases("name: app\n").unwrap().is_empty());
    }

    #[test]
    fn malformed_manifest_is_parse_error() {
        assert!(matches!(extract_releases("releases: [\n"), Err(EngineError::Parse { .. })));
    }
}
