//! Input list handling: `@list` expansion and path resolution.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// True for inputs that are not local paths.
fn is_special(spec: &str) -> bool {
    spec == "-" || spec.starts_with("http://") || spec.starts_with("https://")
}

/// Expand `@file` entries into their listed inputs.
///
/// List files hold one input per line; blank lines and `#` comments are
/// skipped.
pub fn expand(specs: &[String]) -> Result<Vec<String>> {
    let mut expanded = Vec::with_capacity(specs.len());
    for spec in specs {
        match spec.strip_prefix('@') {
            Some(list_path) => {
                debug!(list = list_path, "reading list file");
                let text = fs::read_to_string(list_path)
                    .with_context(|| format!("cannot open list file {list_path}"))?;
                for line in text.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    expanded.push(line.to_string());
                }
            }
            None => expanded.push(spec.clone()),
        }
    }
    Ok(expanded)
}

/// Resolve local paths to absolute form so stored filenames are stable.
///
/// Stream inputs (`-`, URLs) pass through. A version suffix is part of
/// the on-disk name, so the whole spec goes through the lookup.
pub fn resolve_paths(specs: Vec<String>) -> Result<Vec<String>> {
    specs
        .into_iter()
        .map(|spec| {
            if is_special(&spec) {
                return Ok(spec);
            }
            let resolved = fs::canonicalize(Path::new(&spec))
                .with_context(|| format!("cannot resolve path {spec}"))?;
            Ok(resolved.to_string_lossy().into_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn list_files_skip_comments_and_blanks() {
        let mut list = tempfile::NamedTempFile::new().unwrap();
        writeln!(list, "# header").unwrap();
        writeln!(list, "/data/a.mseed").unwrap();
        writeln!(list).unwrap();
        writeln!(list, "/data/b.mseed").unwrap();

        let spec = format!("@{}", list.path().display());
        let expanded = expand(&[spec, "/data/c.mseed".to_string()]).unwrap();
        assert_eq!(expanded, ["/data/a.mseed", "/data/b.mseed", "/data/c.mseed"]);
    }

    #[test]
    fn missing_list_file_is_fatal() {
        assert!(expand(&["@/no/such/list".to_string()]).is_err());
    }

    #[test]
    fn versioned_names_resolve_like_any_other() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("x.mseed#3");
        std::fs::write(&file, b"").unwrap();

        let resolved = resolve_paths(vec![file.display().to_string()]).unwrap();
        assert!(resolved[0].ends_with("x.mseed#3"));
        assert!(Path::new(&resolved[0]).is_absolute());
    }

    #[test]
    fn stdin_and_urls_pass_through() {
        let specs = vec!["-".to_string(), "https://example.org/a.mseed".to_string()];
        assert_eq!(resolve_paths(specs.clone()).unwrap(), specs);
    }
}
