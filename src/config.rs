use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;

/// Immutable scanner policy. A single canonical instance lives for the whole
/// scan; tests build their own via [`SecurityConfig::with_policy`].
#[derive(Debug)]
pub struct SecurityConfig {
    pub mode: &'static str,
    pub trusted_domains: Vec<String>,
    pub exclude: Vec<String>,
    exclude_set: GlobSet,
}

static CONFIG: Lazy<SecurityConfig> = Lazy::new(|| {
    SecurityConfig::with_policy(
        &["*.godaddy.com", "localhost", "127.0.0.1"],
        &[
            "**/node_modules/**",
            "**/dist/**",
            "**/build/**",
            "**/__tests__/**",
        ],
    )
});

/// The canonical strict policy, returned by reference.
pub fn security_config() -> &'static SecurityConfig {
    &CONFIG
}

impl SecurityConfig {
    pub fn with_policy(trusted_domains: &[&str], exclude: &[&str]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            builder.add(Glob::new(pattern).unwrap());
        }
        SecurityConfig {
            mode: "strict",
            trusted_domains: trusted_domains.iter().map(|d| d.to_string()).collect(),
            exclude: exclude.iter().map(|g| g.to_string()).collect(),
            exclude_set: builder.build().unwrap(),
        }
    }
}

/// Case-insensitive trusted-domain check. `host` may carry a `:port` suffix.
/// A `*.X` pattern matches `X` itself and any hostname ending in `.X`; it
/// never matches a partial label (`notgodaddy.com` vs `*.godaddy.com`).
pub fn is_trusted_domain(host: &str, cfg: &SecurityConfig) -> bool {
    let host = host.split(':').next().unwrap_or(host).to_lowercase();
    if host.is_empty() {
        return false;
    }

    cfg.trusted_domains.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        if let Some(bare) = pattern.strip_prefix("*.") {
            host == bare || host.ends_with(&format!(".{bare}"))
        } else {
            host == pattern
        }
    })
}

/// Match `path` against the exclusion globs. Separator-agnostic: backslashes
/// are normalized before matching.
pub fn should_exclude_file(path: &str, cfg: &SecurityConfig) -> bool {
    let normalized = path.replace('\\', "/");
    cfg.exclude_set.is_match(Path::new(&normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_defaults() {
        let cfg = security_config();
        assert_eq!(cfg.mode, "strict");
        assert!(cfg.trusted_domains.contains(&"*.godaddy.com".to_string()));
        assert!(cfg.exclude.contains(&"**/node_modules/**".to_string()));
    }

    #[test]
    fn wildcard_matches_suffix_and_bare_domain() {
        let cfg = security_config();
        assert!(is_trusted_domain("godaddy.com", cfg));
        assert!(is_trusted_domain("api.godaddy.com", cfg));
        assert!(is_trusted_domain("a.b.godaddy.com", cfg));
        assert!(is_trusted_domain("API.GODADDY.COM", cfg));
    }

    #[test]
    fn wildcard_rejects_partial_labels() {
        let cfg = security_config();
        assert!(!is_trusted_domain("notgodaddy.com", cfg));
        assert!(!is_trusted_domain("godaddy.com.evil.com", cfg));
        assert!(!is_trusted_domain("evilgodaddy.com", cfg));
    }

    #[test]
    fn exact_hosts_and_ports() {
        let cfg = security_config();
        assert!(is_trusted_domain("localhost", cfg));
        assert!(is_trusted_domain("localhost:3000", cfg));
        assert!(is_trusted_domain("127.0.0.1:8080", cfg));
        assert!(!is_trusted_domain("localhost.evil.com", cfg));
        assert!(!is_trusted_domain("", cfg));
    }

    #[test]
    fn exclusion_globs_cross_components() {
        let cfg = security_config();
        assert!(should_exclude_file("pkg/node_modules/lib/index.js", cfg));
        assert!(should_exclude_file("a/b/c/dist/out.js", cfg));
        assert!(should_exclude_file("src/__tests__/x.test.ts", cfg));
        assert!(!should_exclude_file("src/index.ts", cfg));
        assert!(!should_exclude_file("src/distance.ts", cfg));
    }

    #[test]
    fn exclusion_is_separator_agnostic_and_idempotent() {
        let cfg = security_config();
        let windows = "pkg\\node_modules\\lib\\index.js";
        assert!(should_exclude_file(windows, cfg));
        assert_eq!(
            should_exclude_file(windows, cfg),
            should_exclude_file(&windows.replace('\\', "/"), cfg)
        );
    }
}
