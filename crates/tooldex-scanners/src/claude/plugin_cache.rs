//! Layout of `<root>/plugins/cache/<marketplace>/<plugin>[/<version>]`.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub fn plugin_json_files(cache_dir: &Path) -> Vec<PathBuf> {
    find(
        cache_dir,
        &["*/*/.claude-plugin/plugin.json", "*/*/*/.claude-plugin/plugin.json"],
    )
}

pub fn mcp_json_files(cache_dir: &Path) -> Vec<PathBuf> {
    find(cache_dir, &["*/*/.mcp.json", "*/*/*/.mcp.json"])
}

fn find(cache_dir: &Path, patterns: &[&str]) -> Vec<PathBuf> {
    if !cache_dir.is_dir() {
        return Vec::new();
    }
    let base = glob::Pattern::escape(&cache_dir.to_string_lossy());
    let mut files: Vec<PathBuf> = patterns
        .iter()
        .filter_map(|p| glob::glob(&format!("{}/{}", base, p)).ok())
        .flat_map(|paths| paths.filter_map(|p| p.ok()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Plugin name for a directory inside the cache; version directories
/// (leading digit) defer to their parent
pub fn plugin_name_for_dir(dir: &Path) -> Option<String> {
    let name = dir.file_name()?.to_string_lossy().into_owned();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return dir
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
    }
    Some(name)
}

/// Plugin name from a `plugin.json`, falling back to its location
pub fn plugin_name_for_manifest(manifest: &Path, data: &Value) -> Option<String> {
    if let Some(name) = data.get("name").and_then(Value::as_str)
        && !name.trim().is_empty()
    {
        return Some(name.trim().to_string());
    }
    plugin_name_for_dir(manifest.parent()?.parent()?)
}

/// Server map of a `.mcp.json`: either wrapped in `mcpServers` or flat
pub fn servers_of(data: &Value) -> Option<&Map<String, Value>> {
    match data.get("mcpServers") {
        Some(Value::Object(servers)) => Some(servers),
        _ => data.as_object(),
    }
}

pub fn qualified_mcp_name(plugin: &str, server: &str) -> String {
    format!("plugin:{}:{}", plugin, server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_dirs_defer_to_plugin() {
        assert_eq!(
            plugin_name_for_dir(Path::new("/c/mkt/gmail/1.2.0")).as_deref(),
            Some("gmail")
        );
        assert_eq!(
            plugin_name_for_dir(Path::new("/c/mkt/gmail")).as_deref(),
            Some("gmail")
        );
    }

    #[test]
    fn test_servers_of_both_layouts() {
        let wrapped = json!({"mcpServers": {"a": {}}});
        let flat = json!({"b": {}});
        assert!(servers_of(&wrapped).unwrap().contains_key("a"));
        assert!(servers_of(&flat).unwrap().contains_key("b"));
    }
}
