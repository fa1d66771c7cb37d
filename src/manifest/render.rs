//! Manifest rendering: ops files first, then variable files.

use serde_yaml::Value;
use tracing::{debug, warn};

use super::document::parse_document;
use super::patch::{apply_all, parse_ops, Op};
use super::vars::VarSet;
use crate::error::EngineError;
use crate::ports::SourceControl;
use crate::release::ManifestSource;

/// A parsed manifest template.
#[derive(Debug, Clone)]
pub struct Template {
    doc: Value,
}

impl Template {
    /// Parses a YAML manifest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Parse`] if `content` is not valid YAML.
    pub fn parse(content: &str) -> Result<Self, EngineError> {
        let doc = parse_document(content).map_err(|e| EngineError::parse("manifest", e))?;
        Ok(Self { doc })
    }

    /// Applies `ops` to a copy of the template, then interpolates `vars`,
    /// and serializes the result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Render`] if an operation or interpolation fails.
    pub fn evaluate(&self, ops: &[Op], vars: &VarSet) -> Result<String, EngineError> {
        let mut doc = self.doc.clone();
        apply_all(&mut doc, ops).map_err(|e| EngineError::render("manifest", e))?;
        vars.interpolate(&mut doc).map_err(|e| EngineError::render("manifest", e))?;
        serde_yaml::to_string(&doc).map_err(|e| EngineError::render("manifest", e))
    }
}

/// Result of rendering: the final manifest, and whether anything was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Rendered manifest, or the original text when the final evaluation failed.
    pub manifest: String,
    /// Set when an ops or vars file was skipped or the final evaluation failed.
    pub has_error: bool,
}

/// Renders a source's manifest with its ops and vars files at a given reference.
///
/// Rendering continues past failing files: an ops file that cannot be
/// fetched, parsed or applied is skipped, as is a vars file that cannot be
/// fetched or parsed. Each skip is reported through
/// [`RenderOutcome::has_error`]. Aborting at the first failing file is not
/// supported.
pub struct ManifestRenderer<'a> {
    scm: &'a dyn SourceControl,
    source: &'a ManifestSource,
    gitref: &'a str,
}

impl<'a> ManifestRenderer<'a> {
    /// Creates a renderer reading files of `source` at `gitref`.
    #[must_use]
    pub fn new(scm: &'a dyn SourceControl, source: &'a ManifestSource, gitref: &'a str) -> Self {
        Self { scm, source, gitref }
    }

    async fn fetch(&self, path: &str) -> Result<String, EngineError> {
        let release = &self.source.release;
        self.scm
            .download_content(&release.owner, &release.repo, path, self.gitref)
            .await
            .map_err(|e| EngineError::fetch(format!("file '{path}'"), &e))
    }

    /// Renders `manifest`. Never fails; see [`RenderOutcome`].
    pub async fn render(&self, manifest: &str) -> RenderOutcome {
        debug!("rendering final manifest");
        let template = match Template::parse(manifest) {
            Ok(template) => template,
            Err(e) => {
                warn!(error = %e, "unable to parse manifest");
                return RenderOutcome { manifest: manifest.to_string(), has_error: true };
            }
        };

        let mut has_error = false;
        let mut chain: Vec<Op> = Vec::new();
        let no_vars = VarSet::new();
        for path in &self.source.ops {
            let ops = match self.fetch(path).await.and_then(|content| parse_ops(path, &content)) {
                Ok(ops) => ops,
                Err(e) => {
                    warn!(ops_file = %path, error = %e, "skipping ops file");
                    has_error = true;
                    continue;
                }
            };
            let accepted = chain.len();
            chain.extend(ops);
            if let Err(e) = template.evaluate(&chain, &no_vars) {
                warn!(ops_file = %path, error = %e, "skipping ops file");
                chain.truncate(accepted);
                has_error = true;
            }
        }

        let mut vars = VarSet::new();
        for path in &self.source.vars {
            match self.fetch(path).await.and_then(|content| VarSet::parse(path, &content)) {
                Ok(set) => vars.merge(set),
                Err(e) => {
                    warn!(vars_file = %path, error = %e, "skipping vars file");
                    has_error = true;
                }
            }
        }

        match template.evaluate(&chain, &vars) {
            Ok(rendered) => RenderOutcome { manifest: rendered, has_error },
            Err(e) => {
                warn!(error = %e, "unable to render manifest");
                RenderOutcome { manifest: manifest.to_string(), has_error: true }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySourceControl;
    use crate::release::{Formatter, RefType, ReleaseSource};

    const SLUG: &str = "acme/app-deployment";
    const MANIFEST: &str = "name: app\nreleases:\n- name: web\n  version: ((web_version))\n";

    fn source(ops: &[&str], vars: &[&str]) -> ManifestSource {
        ManifestSource {
            release: ReleaseSource {
                name: "app".into(),
                owner: "acme".into(),
                repo: "app-deployment".into(),
                types: vec![RefType::Release],
                formatter: Formatter::default(),
            },
            manifest: "app.yml".into(),
            ops: ops.iter().map(ToString::to_string).collect(),
            vars: vars.iter().map(ToString::to_string).collect(),
            matchers: vec![],
        }
    }

    fn rendered(outcome: &RenderOutcome) -> Value {
        serde_yaml::from_str(&outcome.manifest).unwrap()
    }

    #[tokio::test]
    async fn ops_then_vars() {
        let scm = MemorySourceControl::new()
            .with_file(SLUG, "v1", "ops.yml", "- type: replace\n  path: /name\n  value: ((name))\n")
            .with_file(SLUG, "v1", "a.yml", "name: first\nweb_version: 1.0.0\n")
            .with_file(SLUG, "v1", "b.yml", "name: second\n");
        let src = source(&["ops.yml"], &["a.yml", "b.yml"]);
        let outcome = ManifestRenderer::new(&scm, &src, "v1").render(MANIFEST).await;
        assert!(!outcome.has_error);
        let doc = rendered(&outcome);
        assert_eq!(doc["name"], Value::String("second".into()));
        assert_eq!(doc["releases"][0]["version"], Value::String("1.0.0".into()));
    }

    #[tokio::test]
    async fn float_like_versions_survive_rendering() {
        let scm = MemorySourceControl::new()
            .with_file(SLUG, "v1", "ops.yml", "- type: replace\n  path: /releases/-\n  value: {name: db, version: 5.10}\n")
            .with_file(SLUG, "v1", "vars.yml", "web_version: 2.10\n");
        let src = source(&["ops.yml"], &["vars.yml"]);
        let outcome = ManifestRenderer::new(&scm, &src, "v1").render(MANIFEST).await;
        assert!(!outcome.has_error);
        let releases = crate::manifest::extract_releases(&outcome.manifest).unwrap();
        assert_eq!(releases[0].version, "2.10");
        assert_eq!(releases[1].version, "5.10");
    }

    #[tokio::test]
    async fn invalid_ops_file_is_skipped_others_apply() {
        let scm = MemorySourceControl::new()
            .with_file(SLUG, "v1", "bad.yml", "- type: replace\n  path: /absent/key\n  value: 1\n")
            .with_file(SLUG, "v1", "good.yml", "- type: replace\n  path: /name\n  value: renamed\n");
        let src = source(&["bad.yml", "missing.yml", "good.yml"], &[]);
        let outcome = ManifestRenderer::new(&scm, &src, "v1").render(MANIFEST).await;
        assert!(outcome.has_error);
        assert_eq!(rendered(&outcome)["name"], Value::String("renamed".into()));
    }

    #[tokio::test]
    async fn unreadable_vars_file_is_skipped() {
        let scm = MemorySourceControl::new()
            .with_file(SLUG, "v1", "broken.yml", "[unterminated\n")
            .with_file(SLUG, "v1", "ok.yml", "web_version: 2.0.0\n");
        let src = source(&[], &["broken.yml", "ok.yml"]);
        let outcome = ManifestRenderer::new(&scm, &src, "v1").render(MANIFEST).await;
        assert!(outcome.has_error);
        assert_eq!(rendered(&outcome)["releases"][0]["version"], Value::String("2.0.0".into()));
    }

    #[tokio::test]
    async fn failed_final_evaluation_returns_original() {
        let scm = MemorySourceControl::new().with_file(SLUG, "v1", "v.yml", "web_version: [1, 2]\n");
        let manifest = "name: app-((web_version))\n";
        let src = source(&[], &["v.yml"]);
        let outcome = ManifestRenderer::new(&scm, &src, "v1").render(manifest).await;
        assert!(outcome.has_error);
        assert_eq!(outcome.manifest, manifest);
    }
}
