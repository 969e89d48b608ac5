use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::config::{SecurityConfig, should_exclude_file};

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Enumerate the source files to scan under `root`, honoring the exclusion
/// globs. Output is absolute-pathed and sorted so findings across files are
/// emitted in a deterministic order. Symlinks are never followed; unreadable
/// subtrees are skipped.
pub fn collect_source_files(root: &Path, cfg: &SecurityConfig) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("scan root does not exist: {}", root.display());
    }
    let root = std::fs::canonicalize(root)
        .with_context(|| format!("failed to access scan root: {}", root.display()))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e.path()))
        .filter_map(|e| e.ok())
    {
        // file_type() does not follow symlinks, so a link pointing outside
        // the root is never picked up as a regular file.
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_source_extension(path) {
            continue;
        }
        if should_exclude_file(&path.to_string_lossy(), cfg) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_ignored_dir(path: &Path) -> bool {
    let ignored = ["node_modules", "dist", "build", "__tests__", ".git"];
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|name| ignored.contains(&name))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::security_config;
    use std::fs;

    #[test]
    fn collects_only_source_extensions_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/util")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();
        fs::write(dir.path().join("src/util/a.cjs"), "module.exports = {}").unwrap();
        fs::write(dir.path().join("src/util/readme.md"), "# no").unwrap();
        fs::write(dir.path().join("src/styles.css"), "body {}").unwrap();

        let files = collect_source_files(dir.path(), security_config()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.cjs", "index.ts"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn skips_excluded_directories_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join("a/dist")).unwrap();
        fs::create_dir_all(dir.path().join("a/__tests__")).unwrap();
        fs::write(dir.path().join("a/node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join("a/dist/bundle.js"), "x").unwrap();
        fs::write(dir.path().join("a/__tests__/a.test.ts"), "x").unwrap();
        fs::write(dir.path().join("a/keep.ts"), "x").unwrap();

        let files = collect_source_files(dir.path(), security_config()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a/keep.ts"));
    }

    #[test]
    fn nonexistent_root_is_an_error_naming_the_path() {
        let err = collect_source_files(Path::new("/definitely/not/here"), security_config())
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here"));
    }
}
