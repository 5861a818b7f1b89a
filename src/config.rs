use std::path::PathBuf;

pub const HOME_ENV: &str = "GONEXT_HOME";

pub struct AppPaths {
    pub base_dir: PathBuf,
    pub db_path: PathBuf,
    pub photos_dir: PathBuf,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl AppPaths {
    /// Resolves the data directory from `GONEXT_HOME`, falling back to `~/.gonext`.
    pub fn new() -> Self {
        Self::resolve(None, std::env::var_os(HOME_ENV).map(PathBuf::from))
    }

    /// An explicit directory (from the command line) wins over the
    /// environment, which wins over the home directory default.
    pub fn resolve(explicit: Option<PathBuf>, from_env: Option<PathBuf>) -> Self {
        let base = explicit
            .or(from_env.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".gonext")
            });
        Self::from_base(base)
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            db_path: base.join("gonext.db"),
            photos_dir: base.join("photos"),
            base_dir: base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base() {
        let paths = AppPaths::from_base(PathBuf::from("/tmp/test-gonext"));
        assert_eq!(paths.base_dir, PathBuf::from("/tmp/test-gonext"));
        assert_eq!(paths.db_path, PathBuf::from("/tmp/test-gonext/gonext.db"));
        assert_eq!(paths.photos_dir, PathBuf::from("/tmp/test-gonext/photos"));
    }

    #[test]
    fn test_resolve_prefers_explicit_dir() {
        let paths = AppPaths::resolve(
            Some(PathBuf::from("/tmp/cli")),
            Some(PathBuf::from("/tmp/env")),
        );
        assert_eq!(paths.base_dir, PathBuf::from("/tmp/cli"));
    }

    #[test]
    fn test_resolve_uses_env_dir() {
        let paths = AppPaths::resolve(None, Some(PathBuf::from("/tmp/env")));
        assert_eq!(paths.base_dir, PathBuf::from("/tmp/env"));
    }

    #[test]
    fn test_resolve_ignores_empty_env_dir() {
        let paths = AppPaths::resolve(None, Some(PathBuf::new()));
        assert!(paths.base_dir.ends_with(".gonext"));
    }
}
