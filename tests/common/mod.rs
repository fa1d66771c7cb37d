//! Cassettes describing a small fleet: one manifest source, one generic
//! source and two deployments.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use boshupdate::cassette::ports;
use boshupdate::cassette::recorder::CassetteRecorder;

pub const CONFIG: &str = r#"
bosh:
  url: https://director.example:25555
  excludes: ["-tmp$"]
github:
  token: ghp_fixture
  update_interval: 1h
  manifest_releases:
    app:
      owner: acme
      repo: app-deployment
      manifest: manifest.yml
      ops: [ops/scale.yml]
      vars: [vars/versions.yml]
  generic_releases:
    cli:
      owner: acme
      repo: cli
"#;

const LATEST_MANIFEST: &str = "\
name: app
releases:
- name: web
  version: ((web_version))
  url: https://example.com/web
- name: db
  version: \"5\"
instance_groups:
- name: web
  instances: 1
";

const SCALE_OPS: &str = "\
- type: replace
  path: /instance_groups/name=web/instances
  value: 3
";

const DEPLOYED: &str = "\
manifest_name: app
manifest_version: v1.0.0
releases:
- name: web
  version: \"1.9\"
- name: db
  version: \"5\"
";

fn release(tag: &str, created_at: i64) -> Value {
    json!({ "tag_name": tag, "prerelease": false, "draft": false, "created_at": created_at })
}

/// Creates a fresh directory under the system temp dir.
pub fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes `config.yml` into `dir` and returns its path.
pub fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.yml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

/// Writes clock, github and director cassettes of one refresh cycle into `dir`.
pub fn write_fleet_cassettes(dir: &Path) {
    let mut clock = CassetteRecorder::new(dir.join("clock.cassette.yaml"), ports::CLOCK);
    clock.record(ports::CLOCK, "now", json!(null), json!("2024-05-01T12:00:00Z"));
    clock.write().unwrap();

    let mut github = CassetteRecorder::new(dir.join("github.cassette.yaml"), ports::GITHUB);
    github.record(
        ports::GITHUB,
        "list_releases",
        json!({"owner": "acme", "repo": "app-deployment"}),
        json!({"Ok": [release("v1.0.0", 1_000), release("v2.0.0", 2_000)]}),
    );
    github.record(
        ports::GITHUB,
        "download_content",
        json!({"owner": "acme", "repo": "app-deployment", "path": "manifest.yml", "ref": "v2.0.0"}),
        json!({"Ok": LATEST_MANIFEST}),
    );
    github.record(
        ports::GITHUB,
        "download_content",
        json!({"owner": "acme", "repo": "app-deployment", "path": "ops/scale.yml", "ref": "v2.0.0"}),
        json!({"Ok": SCALE_OPS}),
    );
    github.record(
        ports::GITHUB,
        "download_content",
        json!({"owner": "acme", "repo": "app-deployment", "path": "vars/versions.yml", "ref": "v2.0.0"}),
        json!({"Ok": "web_version: \"2.1\"\n"}),
    );
    github.record(
        ports::GITHUB,
        "list_releases",
        json!({"owner": "acme", "repo": "cli"}),
        json!({"Err": "404 Not Found: Not Found"}),
    );
    github.write().unwrap();

    let mut director = CassetteRecorder::new(dir.join("director.cassette.yaml"), ports::DIRECTOR);
    director.record(
        ports::DIRECTOR,
        "list_deployments",
        json!(null),
        json!({"Ok": [{"name": "app-prod"}, {"name": "app-tmp"}]}),
    );
    director.record(ports::DIRECTOR, "deployment_manifest", json!({"name": "app-prod"}), json!({"Ok": DEPLOYED}));
    director.record(
        ports::DIRECTOR,
        "deployment_manifest",
        json!({"name": "app-tmp"}),
        json!({"Ok": "manifest_name: app-tmp\nmanifest_version: \"3\"\n"}),
    );
    director.write().unwrap();
}
