//! Virtual path resolution - the remote namespace as the shell sees it
//!
//! Accepts the usual shell path forms:
//! - /etc/hosts       (absolute)
//! - logs/app.log     (relative to the virtual cwd)
//! - ../x, ./x        (dot segments)
//! - ~, ~/notes       (configured remote home)
//! - //var///log/     (redundant separators)
//!
//! Nothing here performs remote I/O; the cwd is tracked client-side.

use std::fmt;

/// A normalized absolute path in the remote namespace.
///
/// Never contains `.`, `..` or empty segments, and never ends with `/`
/// unless it is the root itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize an absolute path string. Relative input is taken relative
    /// to the root.
    pub fn new(path: &str) -> Self {
        Self::root().push_segments(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path segments, root yields none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent directory; the root is its own parent.
    pub fn parent(&self) -> VirtualPath {
        match self.0.rfind('/') {
            Some(0) | None => Self::root(),
            Some(i) => Self(self.0[..i].to_string()),
        }
    }

    /// Append a relative path, normalizing dot segments.
    pub fn join(&self, rel: &str) -> VirtualPath {
        self.clone().push_segments(rel)
    }

    /// `true` if `self` is `base` or lies below it.
    pub fn starts_with(&self, base: &VirtualPath) -> bool {
        base.is_root()
            || self.0 == base.0
            || (self.0.starts_with(&base.0) && self.0.as_bytes().get(base.0.len()) == Some(&b'/'))
    }

    fn push_segments(self, rel: &str) -> VirtualPath {
        let mut parts: Vec<String> = self.segments().map(str::to_string).collect();
        for segment in rel.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop(); // popping past root is a no-op
                }
                name => parts.push(name.to_string()),
            }
        }
        if parts.is_empty() {
            Self::root()
        } else {
            Self(format!("/{}", parts.join("/")))
        }
    }
}

impl Default for VirtualPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turns operator tokens into [`VirtualPath`]s.
#[derive(Debug, Clone)]
pub struct PathResolver {
    home: VirtualPath,
}

impl PathResolver {
    pub fn new(home: VirtualPath) -> Self {
        Self { home }
    }

    pub fn home(&self) -> &VirtualPath {
        &self.home
    }

    /// Resolve `token` against `cwd`.
    ///
    /// # Examples
    /// ```
    /// use remsh::shell::path::{PathResolver, VirtualPath};
    ///
    /// let resolver = PathResolver::new(VirtualPath::new("/home/op"));
    /// let cwd = VirtualPath::new("/var/log");
    /// assert_eq!(resolver.resolve(&cwd, "../lib//apt/").as_str(), "/var/lib/apt");
    /// assert_eq!(resolver.resolve(&cwd, "~/notes").as_str(), "/home/op/notes");
    /// ```
    pub fn resolve(&self, cwd: &VirtualPath, token: &str) -> VirtualPath {
        if token == "~" {
            return self.home.clone();
        }
        if let Some(rest) = token.strip_prefix("~/") {
            return self.home.join(rest);
        }
        if token.starts_with('/') {
            return VirtualPath::root().join(token);
        }

        cwd.join(token)
    }

    /// Render `path` for display, abbreviating the home prefix to `~`.
    pub fn display(&self, path: &VirtualPath) -> String {
        if self.home.is_root() || !path.starts_with(&self.home) {
            return path.to_string();
        }
        let rest = &path.as_str()[self.home.as_str().len()..];
        format!("~{}", rest)
    }
}
