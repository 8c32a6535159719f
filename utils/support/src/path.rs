use std::path::{Component, Path, PathBuf};

const KNOWN_PREFIXES: [&str; 1] = ["file://"];

pub fn strip_known_prefixes(mut path: &str) -> &str {
    for prefix in KNOWN_PREFIXES {
        if let Some(stripped) = path.strip_prefix(prefix) {
            path = stripped;
        }
    }
    path
}

/// Lexically normalise `path`: drops `.` segments and folds `..` into the
/// preceding segment. The filesystem is never consulted.
pub fn normalize_path(path: &str) -> Option<PathBuf> {
    let path = strip_known_prefixes(path);
    if path.is_empty() {
        return None;
    }
    Some(normalize_components(Path::new(path)))
}

fn normalize_components(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut acc, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    acc.pop();
                }
                Component::RootDir | Component::Prefix(_) | Component::Normal(_) => {
                    acc.push(component.as_os_str());
                }
            }
            acc
        })
}

/// Normalise `path`, anchoring relative paths at `base_dir`.
pub fn normalize_against(base_dir: &Path, path: &str) -> Option<PathBuf> {
    let normalized = normalize_path(path)?;
    if normalized.is_absolute() {
        return Some(normalized);
    }
    Some(normalize_components(&base_dir.join(normalized)))
}
