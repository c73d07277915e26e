//! # tether-paths
//!
//! Resolution of remote script URLs to local source files.
//!
//! Script URLs reported by a device, emulator, or dev server are expressed
//! relative to that context — an app bundle on the device filesystem, or a
//! dev-server HTTP origin — and never match the developer's on-disk project
//! layout. [`PathTransformer`] maps those URLs onto the project tree so the
//! debugger can show real sources, honoring the per-platform `merges`
//! override directory.
//!
//! Resolution is best-effort by design: an unresolved URL returns `None` and
//! the caller decides whether to drop the path or keep the remote URL.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use tracing::debug;

/// Name of the bundled-sources folder inside a project.
const WWW_FOLDER: &str = "www";
/// Name of the per-platform source override folder.
const MERGES_FOLDER: &str = "merges";

/// Maps remote script URLs to local filesystem paths.
///
/// Built once per debugging session from the project configuration and used
/// by the message handlers for every `scriptParsed` URL.
#[derive(Clone, Debug)]
pub struct PathTransformer {
    project_root: PathBuf,
    platform: String,
    web_root: Option<PathBuf>,
    search_www: bool,
}

impl PathTransformer {
    /// Create a transformer for a project tree and target platform.
    pub fn new(project_root: impl Into<PathBuf>, platform: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            platform: platform.into(),
            web_root: None,
            search_www: true,
        }
    }

    /// Set the user-specified web root, searched before the project root.
    #[must_use]
    pub fn with_web_root(mut self, web_root: impl Into<PathBuf>) -> Self {
        self.web_root = Some(web_root.into());
        self
    }

    /// Exclude the project `www` folder from the search.
    ///
    /// Ionic 4+ serve and live-reload toolchains no longer copy sources into
    /// `www`; probing it can resolve to a stale file masking the real source.
    #[must_use]
    pub fn without_www_search(mut self) -> Self {
        self.search_www = false;
        self
    }

    /// Resolve a remote script URL to a local file, or `None` if no candidate
    /// exists on disk.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = remote_relative_path(url);
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }

        for root in self.search_roots() {
            let candidate = root.join(relative);
            if candidate.is_file() {
                debug!(url, path = %candidate.display(), "resolved script URL");
                return Some(self.apply_merges_override(candidate));
            }
        }
        debug!(url, "script URL did not resolve to a local file");
        None
    }

    fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(3);
        if let Some(web_root) = &self.web_root {
            roots.push(web_root.clone());
        }
        roots.push(self.project_root.clone());
        if self.search_www {
            roots.push(self.www_folder());
        }
        roots
    }

    fn www_folder(&self) -> PathBuf {
        self.project_root.join(WWW_FOLDER)
    }

    /// Platform-specific source overrides take precedence over the canonical
    /// copy: a hit under `www` is replaced by `merges/<platform>/<relative>`
    /// when that file exists.
    fn apply_merges_override(&self, resolved: PathBuf) -> PathBuf {
        let www = self.www_folder();
        let Ok(relative) = resolved.strip_prefix(&www) else {
            return resolved;
        };
        let merged = self
            .project_root
            .join(MERGES_FOLDER)
            .join(&self.platform)
            .join(relative);
        if merged.is_file() {
            debug!(path = %merged.display(), "using merges override");
            merged
        } else {
            resolved
        }
    }
}

/// Extract the project-relative portion of a remote script URL.
///
/// - `file://` URLs (device/simulator app bundles): everything after the
///   first `/www` segment, or `/` when the bundle has no `www` folder.
/// - Any other scheme (`http`, `https`, dev-server custom schemes): the URL
///   path component, `/` when the URL does not parse.
pub fn remote_relative_path(url: &str) -> &str {
    if let Some(bundle_path) = url.strip_prefix("file://") {
        return match bundle_path.find("/www/") {
            Some(pos) => &bundle_path[pos + WWW_FOLDER.len() + 1..],
            None => "/",
        };
    }

    let Some(scheme_end) = url.find("://") else {
        return "/";
    };
    let rest = &url[scheme_end + 3..];
    let Some(path_start) = rest.find('/') else {
        return "/";
    };
    let path = &rest[path_start..];
    // Strip query string and fragment.
    let end = path
        .find(['?', '#'])
        .unwrap_or(path.len());
    &path[..end]
}

/// Render a local path as a `file://` URL the debugging client understands.
///
/// Windows paths use the `file:///` form with forward slashes; POSIX paths
/// are appended as-is.
pub fn to_file_url(path: &Path) -> String {
    #[cfg(windows)]
    {
        format!("file:///{}", path.display().to_string().replace('\\', "/"))
    }
    #[cfg(not(windows))]
    {
        format!("file://{}", path.display())
    }
}
