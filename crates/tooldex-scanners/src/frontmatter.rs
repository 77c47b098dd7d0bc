use serde::Deserialize;

use crate::Result;

/// Fields read from a markdown file's YAML frontmatter
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Parse the `---` delimited YAML block at the start of `content`.
///
/// No block yields the default; a block that is not valid YAML is an error.
pub fn parse(content: &str) -> Result<Frontmatter> {
    let Some(block) = extract_block(content) else {
        return Ok(Frontmatter::default());
    };
    if block.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    Ok(serde_yaml::from_str::<Option<Frontmatter>>(block)?.unwrap_or_default())
}

fn extract_block(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\r').unwrap_or(rest);
    let rest = rest.strip_prefix('\n')?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

/// `version: 1.2` is a YAML float; keep whatever the author wrote as text
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frontmatter() {
        let content = "---\nname: gmail\ndescription: Read and send mail\nversion: 1.2\n---\n# Gmail\n";
        let fm = parse(content).unwrap();
        assert_eq!(fm.name.as_deref(), Some("gmail"));
        assert_eq!(fm.description.as_deref(), Some("Read and send mail"));
        assert_eq!(fm.version.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_no_frontmatter() {
        assert_eq!(parse("# Title\nbody").unwrap(), Frontmatter::default());
        assert_eq!(parse("---\nunterminated").unwrap(), Frontmatter::default());
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(parse("---\n---\nbody").unwrap(), Frontmatter::default());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(parse("---\nname: [unclosed\n---\n").is_err());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let fm = parse("---\nallowed-tools: Bash\ndescription: x\n---\n").unwrap();
        assert_eq!(fm.description.as_deref(), Some("x"));
    }
}
