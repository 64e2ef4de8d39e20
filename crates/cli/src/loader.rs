use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Load every Python source file under `root` into a path → text map.
///
/// Paths are relative to `root` and '/'-separated, matching the keys the
/// module-graph builder probes during import resolution. Hidden
/// directories, virtual envs, and bytecode caches are skipped; unreadable
/// files are warned about and excluded.
pub fn load_source_tree(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !(name.starts_with('.') && name.len() > 1)
            && name != "__pycache__"
            && name != "venv"
            && name != "node_modules"
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        match std::fs::read_to_string(path) {
            Ok(text) => {
                files.insert(relative, text);
            }
            Err(e) => {
                log::warn!("Skipping unreadable file {}: {e}", path.display());
            }
        }
    }

    log::info!(
        "Loaded {} Python file(s) from {}",
        files.len(),
        root.display()
    );
    Ok(files)
}
