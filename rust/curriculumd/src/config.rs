use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_WORKSPACE: &str = "./workspace";
const DEFAULT_MEDIA_URL: &str = "/media/";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub workspace: PathBuf,
    pub media_root: PathBuf,
    pub media_url: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Reads `CURRICULUMD_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get("CURRICULUMD_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("CURRICULUMD_BIND_ADDR must be a socket address")?;
        let workspace = PathBuf::from(
            get("CURRICULUMD_WORKSPACE").unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
        );
        let media_root = get("CURRICULUMD_MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| workspace.join("media"));
        let media_url =
            get("CURRICULUMD_MEDIA_URL").unwrap_or_else(|| DEFAULT_MEDIA_URL.to_string());
        let max_upload_bytes = match get("CURRICULUMD_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .context("CURRICULUMD_MAX_UPLOAD_BYTES must be a byte count")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            bind_addr,
            workspace,
            media_root,
            media_url,
            max_upload_bytes,
        })
    }

    /// Defaults rooted at `workspace`; used by tests and embedders.
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            bind_addr: ([127, 0, 0, 1], 0).into(),
            media_root: workspace.join("media"),
            workspace,
            media_url: DEFAULT_MEDIA_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = Config::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert_eq!(cfg.workspace, PathBuf::from("./workspace"));
        assert_eq!(cfg.media_root, PathBuf::from("./workspace").join("media"));
        assert_eq!(cfg.media_url, "/media/");
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn media_root_follows_workspace_unless_overridden() {
        let cfg = Config::from_lookup(lookup_from(&[("CURRICULUMD_WORKSPACE", "/srv/cur")]))
            .expect("config");
        assert_eq!(cfg.media_root, PathBuf::from("/srv/cur/media"));

        let cfg = Config::from_lookup(lookup_from(&[
            ("CURRICULUMD_WORKSPACE", "/srv/cur"),
            ("CURRICULUMD_MEDIA_ROOT", "/var/media"),
        ]))
        .expect("config");
        assert_eq!(cfg.media_root, PathBuf::from("/var/media"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("CURRICULUMD_BIND_ADDR", "nowhere")])).is_err());
        assert!(
            Config::from_lookup(lookup_from(&[("CURRICULUMD_MAX_UPLOAD_BYTES", "ten")])).is_err()
        );
    }
}
