//! Repository locators and the archive layout derived from them.
//!
//! A locator is either an `https` URL or a `file://` URI. Both resolve to a
//! host, a namespace (every path segment but the last) and a name, which
//! together determine where the repository's bundle lives under the
//! bundles directory:
//!
//! ```text
//! https://github.com/octocat/Hello-World.git
//!   -> <root>/github.com/octocat/Hello-World.git.bundle
//! file:///srv/git/project.git
//!   -> <root>/@local/filesystem/srv/git/project.git.bundle
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::error::{BundleError, Result};

/// File name suffix of every archive.
pub const ARCHIVE_SUFFIX: &str = ".bundle";

/// Host key shared by all `file://` locators. `@` cannot appear in a DNS
/// hostname, so this never collides with a real host directory.
pub const LOCAL_HOST: &str = "@local";

/// Extra directory level under [`LOCAL_HOST`] for filesystem sources.
pub const FILESYSTEM_DIR: &str = "filesystem";

const SUPPORTED_SCHEMES: &[&str] = &["https"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Network repository reached over a supported URL scheme.
    Remote,
    /// Repository or bundle on the local filesystem.
    Local,
}

/// Canonical identity of one repository listed in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    input: String,
    scheme: Scheme,
    host: String,
    namespace: Vec<String>,
    name: String,
    argument: String,
}

impl RepositoryLocator {
    /// Parse `input` into a locator.
    ///
    /// # Errors
    /// - [`BundleError::InvalidLocator`] for an unsupported scheme, a missing
    ///   host, an explicit port, or too few path segments.
    /// - [`BundleError::Decoding`] when a path segment has a malformed escape,
    ///   is not UTF-8 once decoded, or decodes to a path separator or to
    ///   `.`/`..`.
    pub fn resolve(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| BundleError::invalid_locator(input, e.to_string()))?;
        match url.scheme() {
            "file" => Self::resolve_local(input, &url),
            s if SUPPORTED_SCHEMES.contains(&s) => Self::resolve_remote(input, &url),
            other => Err(BundleError::invalid_locator(
                input,
                format!("unsupported scheme {:?}", other),
            )),
        }
    }

    fn resolve_remote(input: &str, url: &Url) -> Result<Self> {
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(BundleError::invalid_locator(input, "missing host")),
        };
        // Url drops a port equal to the scheme default, so look at the raw text too.
        if url.port().is_some() || has_explicit_port(input) {
            return Err(BundleError::invalid_locator(input, "explicit port is not supported"));
        }
        let mut segments = decoded_segments(url, Scheme::Remote)?;
        if segments.len() < 2 {
            return Err(BundleError::invalid_locator(
                input,
                "path must have a namespace and a repository name",
            ));
        }
        let name = segments.pop().unwrap_or_default();
        Ok(Self {
            input: input.to_string(),
            scheme: Scheme::Remote,
            host,
            namespace: segments,
            name,
            argument: input.to_string(),
        })
    }

    fn resolve_local(input: &str, url: &Url) -> Result<Self> {
        match url.host_str() {
            None | Some("") | Some("localhost") => {}
            Some(h) => {
                return Err(BundleError::invalid_locator(
                    input,
                    format!("file locator must not name a host ({:?})", h),
                ));
            }
        }
        let mut segments = decoded_segments(url, Scheme::Local)?;
        if segments.is_empty() {
            return Err(BundleError::invalid_locator(input, "file locator has an empty path"));
        }
        let argument = format!("/{}", segments.join("/"));
        let name = segments.pop().unwrap_or_default();
        Ok(Self {
            input: input.to_string(),
            scheme: Scheme::Local,
            host: LOCAL_HOST.to_string(),
            namespace: segments,
            name,
            argument,
        })
    }

    /// The locator text exactly as it was given.
    pub fn as_str(&self) -> &str {
        &self.input
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Throttle key and first directory level of the archive layout.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Decoded path segments before the repository name.
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    /// Decoded final path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What to hand to `git clone`: the URL as written for network locators,
    /// the decoded absolute path for `file://` locators.
    pub fn repository_argument(&self) -> &str {
        &self.argument
    }

    /// Where this repository's bundle lives under `root`.
    ///
    /// Pure in `(root, self)`. A local source that is itself a bundle gets a
    /// doubled suffix (`x.bundle.bundle`).
    pub fn archive_path(&self, root: &Path) -> PathBuf {
        let mut p = root.join(&self.host);
        if self.scheme == Scheme::Local {
            p.push(FILESYSTEM_DIR);
        }
        for seg in &self.namespace {
            p.push(seg);
        }
        p.push(format!("{}{}", self.name, ARCHIVE_SUFFIX));
        p
    }
}

impl FromStr for RepositoryLocator {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::resolve(s)
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.input)
    }
}

/// Non-empty path segments of `url`, each strictly decoded.
///
/// `+` stands for a space only in network locators; a `file://` path
/// keeps it literally.
fn decoded_segments(url: &Url, scheme: Scheme) -> Result<Vec<String>> {
    let plus_is_space = scheme == Scheme::Remote;
    url.path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .map(|s| decode_segment(s, plus_is_space))
        .collect()
}

/// Whether the authority part of `input` carries `:port`.
fn has_explicit_port(input: &str) -> bool {
    let Some((_, rest)) = input.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    if host_port.starts_with('[') {
        return host_port
            .split_once(']')
            .is_some_and(|(_, tail)| tail.starts_with(':'));
    }
    host_port.contains(':')
}

/// Decode one path segment.
///
/// `%XX` must be exactly two hex digits, and `+` becomes a space when
/// `plus_is_space` is set. The result must be UTF-8 and must be usable as a
/// single directory or file name.
fn decode_segment(raw: &str, plus_is_space: bool) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let pair = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| BundleError::decoding(raw, "truncated percent escape"))?;
                let decoded = hex::decode(pair).map_err(|_| {
                    BundleError::decoding(
                        raw,
                        format!("malformed percent escape %{}", String::from_utf8_lossy(pair)),
                    )
                })?;
                out.extend_from_slice(&decoded);
                i += 3;
            }
            b'+' if plus_is_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    let s = String::from_utf8(out).map_err(|_| BundleError::decoding(raw, "not valid UTF-8"))?;
    if s.contains(['/', '\\', '\0']) {
        return Err(BundleError::decoding(raw, "decodes to a path separator"));
    }
    if s == "." || s == ".." {
        return Err(BundleError::decoding(raw, "decodes to a relative path component"));
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(s: &str) -> RepositoryLocator {
        RepositoryLocator::resolve(s).unwrap()
    }

    #[test]
    fn resolves_single_namespace() {
        let url = "https://github.com/mike10004/test-child-repo-1.git";
        let r = resolve(url);
        assert_eq!(r.as_str(), url);
        assert_eq!(r.scheme(), Scheme::Remote);
        assert_eq!(r.host(), "github.com");
        assert_eq!(r.namespace(), ["mike10004"]);
        assert_eq!(r.name(), "test-child-repo-1.git");
        assert_eq!(r.repository_argument(), url);
    }

    #[test]
    fn resolves_nested_namespace() {
        let r = resolve("https://somewhere.else/users/mike10004/test-child-repo-1");
        assert_eq!(r.host(), "somewhere.else");
        assert_eq!(r.namespace(), ["users", "mike10004"]);
        assert_eq!(r.name(), "test-child-repo-1");
    }

    #[test]
    fn rejects_unsupported_shapes() {
        for bad in [
            "https://github.com:443/foo/bar.git",
            "https://github.com:58671/foo/bar.git",
            "http://github.com/foo/bar.git",
            "git+ssh://git@github.com/foo/bar.git",
            "https://github.com/bar.git",
            "https://github.com/",
            "https://[::1]:8443/foo/bar.git",
            "not a url",
        ] {
            let err = RepositoryLocator::resolve(bad).unwrap_err();
            assert!(
                matches!(err, BundleError::InvalidLocator { .. }),
                "{} -> {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn decodes_namespace() {
        let r = resolve("https://somewhere.else/hello%40world/test-child-repo-1.git");
        assert_eq!(r.namespace(), ["hello@world"]);
    }

    #[test]
    fn plus_decodes_to_space() {
        let r = resolve("https://h.example/team+one/my%20repo");
        assert_eq!(r.namespace(), ["team one"]);
        assert_eq!(r.name(), "my repo");
    }

    #[test]
    fn archive_path_layout() {
        let r = resolve("https://somewhere.else/mpsycho/hello.git");
        assert_eq!(
            r.archive_path(Path::new("/home/maria/repos")),
            PathBuf::from("/home/maria/repos/somewhere.else/mpsycho/hello.git.bundle")
        );
    }

    #[test]
    fn archive_path_is_deterministic() {
        for root in ["/a", "/b/c", "relative/root"] {
            let root = Path::new(root);
            let first = resolve("https://h/ns/name.git").archive_path(root);
            let _ = resolve("https://other/x/y").archive_path(root);
            let again = resolve("https://h/ns/name.git").archive_path(root);
            assert_eq!(first, again);
            assert_eq!(first, root.join("h").join("ns").join("name.git.bundle"));
        }
    }

    #[test]
    fn empty_segments_are_dropped() {
        let r = resolve("https://h.example//ns//name/");
        assert_eq!(r.namespace(), ["ns"]);
        assert_eq!(r.name(), "name");
    }

    #[test]
    fn query_and_userinfo_do_not_affect_layout() {
        let r = resolve("https://user@h.example/ns/name.git?ref=main#frag");
        assert_eq!(r.host(), "h.example");
        assert_eq!(
            r.archive_path(Path::new("/r")),
            PathBuf::from("/r/h.example/ns/name.git.bundle")
        );
        assert_eq!(r.repository_argument(), "https://user@h.example/ns/name.git?ref=main#frag");
    }

    #[test]
    fn ipv6_host_without_port_is_accepted() {
        let r = resolve("https://[::1]/ns/name.git");
        assert_eq!(r.host(), "[::1]");
    }

    #[test]
    fn separator_escapes_are_rejected() {
        for bad in [
            "https://h.example/ns/na%2Fme.git",
            "https://h.example/ns%2F..%2F..%2Fetc/name.git",
            "https://h.example/ns/na%5Cme.git",
            "https://h.example/ns/na%00me.git",
            "file:///srv/a%2Fb",
        ] {
            let err = RepositoryLocator::resolve(bad).unwrap_err();
            assert!(matches!(err, BundleError::Decoding { .. }), "{} -> {:?}", bad, err);
        }
    }

    #[test]
    fn malformed_escapes_are_rejected() {
        for bad in [
            "https://h.example/ns/na%zzme",
            "https://h.example/ns/name%4",
            "https://h.example/ns/%FF%FE",
        ] {
            let err = RepositoryLocator::resolve(bad).unwrap_err();
            assert!(matches!(err, BundleError::Decoding { .. }), "{} -> {:?}", bad, err);
        }
    }

    #[test]
    fn decode_segment_rejects_dot_components() {
        assert!(decode_segment("%2E%2E", true).is_err());
        assert!(decode_segment(".", true).is_err());
        assert_eq!(decode_segment("..x", true).unwrap(), "..x");
    }

    #[test]
    fn explicit_port_detection() {
        assert!(has_explicit_port("https://h:443/a/b"));
        assert!(has_explicit_port("https://u:pw@h:1/a/b"));
        assert!(!has_explicit_port("https://u:pw@h/a/b"));
        assert!(!has_explicit_port("https://h/a:b/c"));
        assert!(!has_explicit_port("https://[::1]/a/b"));
        assert!(has_explicit_port("https://[::1]:22/a/b"));
    }

    #[test]
    fn local_locator_layout() {
        let r = resolve("file:///srv/git/project.git");
        assert_eq!(r.scheme(), Scheme::Local);
        assert_eq!(r.host(), LOCAL_HOST);
        assert_eq!(r.repository_argument(), "/srv/git/project.git");
        assert_eq!(
            r.archive_path(Path::new("/archive")),
            PathBuf::from("/archive/@local/filesystem/srv/git/project.git.bundle")
        );
    }

    #[test]
    fn local_paths_do_not_collide() {
        let a = resolve("file:///one/repo.git").archive_path(Path::new("/r"));
        let b = resolve("file:///two/repo.git").archive_path(Path::new("/r"));
        assert_ne!(a, b);
    }

    #[test]
    fn local_bundle_source_gets_doubled_suffix() {
        let r = resolve("file:///backups/old/project.bundle");
        let p = r.archive_path(Path::new("/r"));
        assert!(p.to_string_lossy().ends_with("project.bundle.bundle"));
    }

    #[test]
    fn local_locator_decodes_argument() {
        let r = resolve("file:///home/me/my%20repos/p");
        assert_eq!(r.repository_argument(), "/home/me/my repos/p");
        assert_eq!(r.namespace(), ["home", "me", "my repos"]);
    }

    #[test]
    fn local_locator_keeps_plus_literal() {
        let r = resolve("file:///srv/c++/repo");
        assert_eq!(r.repository_argument(), "/srv/c++/repo");
        assert_eq!(r.namespace(), ["srv", "c++"]);
        assert_eq!(
            r.archive_path(Path::new("/r")),
            PathBuf::from("/r/@local/filesystem/srv/c++/repo.bundle")
        );
        assert_eq!(decode_segment("a+b%2B", false).unwrap(), "a+b+");
        assert!(decode_segment("%2e%2E", false).is_err());
        assert!(decode_segment("%zz", false).is_err());
    }

    #[test]
    fn local_locator_needs_path_and_no_host() {
        assert!(RepositoryLocator::resolve("file:///").is_err());
        assert!(RepositoryLocator::resolve("file://server/share/repo.git").is_err());
    }

    #[test]
    fn parses_via_from_str() {
        let r: RepositoryLocator = "https://h.example/a/b".parse().unwrap();
        assert_eq!(r.to_string(), "https://h.example/a/b");
    }
}
