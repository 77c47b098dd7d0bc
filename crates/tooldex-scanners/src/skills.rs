use regex::Regex;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tooldex_types::{
    ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, Origin, SkillDetails,
};

use crate::traits::{ComponentParser, ParseOutput, ScanContext, modified_utc};
use crate::{Result, frontmatter, fs as scan_fs};

const SKILL_FILE: &str = "SKILL.md";
const PERFORMANCE_HEADERS: &[&str] = &["## Performance", "### Performance", "## Benchmarks"];

static SPEEDUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)[xX]\s*(?:faster|speedup)").expect("valid regex"));
static LATENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~?(\d+)\s*(?:ms|milliseconds)\b").expect("valid regex"));
static TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"saves?\s+(\d+)\s+tokens?").expect("valid regex"));

/// `<root>/skills/<dir>/SKILL.md`, plus `<root>/skills/.disabled/<dir>`
pub struct SkillParser;

impl ComponentParser for SkillParser {
    fn name(&self) -> &'static str {
        "skills"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Skill
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let skills_dir = ctx.join("skills");
        let mut output = ParseOutput::default();

        let mut locations = vec![(skills_dir.clone(), ComponentStatus::Active)];
        if ctx.config.scan_disabled {
            locations.push((skills_dir.join(".disabled"), ComponentStatus::Disabled));
        }

        for (location, status) in locations {
            for dir in scan_fs::list_entries(ctx, &location)? {
                if !dir.is_dir() || !dir.join(SKILL_FILE).is_file() {
                    continue;
                }
                match scan_skill(ctx, &dir, status) {
                    Ok(record) => output.push(record),
                    Err(err) => {
                        let name = dir_name(&dir);
                        let message = format!("skill '{}': {}", name, err);
                        let record = ComponentRecord::errored(
                            ctx.platform,
                            name,
                            ComponentDetails::Skill(SkillDetails::default()),
                            err.to_string(),
                        )
                        .with_install_path(&dir);
                        output.push_failed(record, message);
                    }
                }
            }
        }

        Ok(output)
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn scan_skill(ctx: &ScanContext, dir: &Path, status: ComponentStatus) -> Result<ComponentRecord> {
    let skill_md = dir.join(SKILL_FILE);
    let content = fs::read_to_string(&skill_md)?;
    let fm = frontmatter::parse(&content)?;
    let stats = scan_fs::tree_stats(ctx, dir)?;

    let name = fm
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| dir_name(dir));

    let metrics = extract_performance(&content);
    let details = SkillDetails {
        has_docs: true,
        dependencies: fm.dependencies,
        performance_notes: metrics.as_ref().map(summarize_metrics),
    };

    let mut record = ComponentRecord::new(ctx.platform, name, ComponentDetails::Skill(details))
        .with_description(fm.description.unwrap_or_default())
        .with_version(fm.version)
        .with_origin(Origin::InHouse)
        .with_status(status)
        .with_install_path(dir)
        .with_last_modified(modified_utc(&skill_md));
    record.file_count = Some(stats.file_count);
    record.line_count = Some(stats.line_count);
    record.size_bytes = Some(stats.size_bytes);

    if let Some(metrics) = metrics {
        record = record.with_extra("performance", Value::Object(metrics));
    }
    Ok(record)
}

/// Performance claims from a SKILL.md: a table under a performance heading,
/// falling back to inline phrases like "5.6x faster" or "saves 800 tokens".
pub fn extract_performance(content: &str) -> Option<Map<String, Value>> {
    let from_tables = performance_section(content)
        .map(parse_table_metrics)
        .filter(|m| !m.is_empty());
    if from_tables.is_some() {
        return from_tables;
    }

    let mut metrics = Map::new();
    if let Some(c) = SPEEDUP.captures_iter(content).last() {
        metrics.insert("speedup".into(), json!(format!("{}x", &c[1])));
    }
    if let Some(c) = LATENCY.captures_iter(content).last() {
        metrics.insert("execution_time".into(), json!(format!("{}ms", &c[1])));
    }
    if let Some(c) = TOKENS.captures_iter(content).last() {
        metrics.insert("token_savings".into(), json!(format!("{} tokens", &c[1])));
    }
    (!metrics.is_empty()).then_some(metrics)
}

fn performance_section(content: &str) -> Option<String> {
    for header in PERFORMANCE_HEADERS {
        let mut lines = content.lines();
        if lines.by_ref().any(|l| l.trim_start().starts_with(header)) {
            let section: Vec<&str> = lines.take_while(|l| !is_heading(l)).collect();
            return Some(section.join("\n"));
        }
    }
    None
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=3).contains(&hashes) && line[hashes..].starts_with(' ')
}

fn parse_table_metrics(section: String) -> Map<String, Value> {
    let mut metrics = Map::new();
    let rows: Vec<Vec<String>> = section
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('|'))
        .map(|l| {
            l.trim_matches('|')
                .split('|')
                .map(|c| c.trim().to_string())
                .collect()
        })
        .collect();

    let Some((headers, body)) = rows.split_first() else {
        return metrics;
    };
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let Some(op_col) = column(&["operation"]) else {
        return metrics;
    };
    let time_col = column(&["time", "gateway cli"]);
    let speedup_col = column(&["speedup"]);

    for row in body {
        if row.len() != headers.len() || row.iter().all(|c| is_separator(c)) {
            continue;
        }
        let cell = |col: Option<usize>| col.map(|i| json!(row[i])).unwrap_or(Value::Null);
        metrics.insert(
            row[op_col].clone(),
            json!({ "time": cell(time_col), "speedup": cell(speedup_col) }),
        );
    }
    metrics
}

fn is_separator(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' '))
}

fn summarize_metrics(metrics: &Map<String, Value>) -> String {
    metrics
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}: {}", k, s),
            other => format!("{}: {}", k, other),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ScanConfig;
    use tooldex_types::Platform;

    fn write_skill(root: &Path, rel: &str, content: &str) {
        let dir = root.join("skills").join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SKILL_FILE), content).unwrap();
    }

    #[test]
    fn test_scans_active_and_disabled_skills() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(
            tmp.path(),
            "gmail",
            "---\nname: gmail\ndescription: Mail access\n---\nBody\n",
        );
        write_skill(tmp.path(), ".disabled/old", "---\ndescription: retired\n---\n");
        fs::create_dir_all(tmp.path().join("skills/not-a-skill")).unwrap();

        let ctx = ScanContext::new(Platform::Codex, tmp.path(), ScanConfig::default());
        let output = SkillParser.parse(&ctx).unwrap();

        assert!(output.errors.is_empty());
        assert_eq!(output.records.len(), 2);
        let gmail = &output.records[0];
        assert_eq!(gmail.name, "gmail");
        assert_eq!(gmail.platform, Platform::Codex);
        assert_eq!(gmail.description.as_deref(), Some("Mail access"));
        assert_eq!(gmail.status, ComponentStatus::Active);
        assert_eq!(gmail.file_count, Some(1));
        assert_eq!(gmail.line_count, Some(5));

        let old = &output.records[1];
        assert_eq!(old.name, "old");
        assert_eq!(old.status, ComponentStatus::Disabled);
    }

    #[test]
    fn test_disabled_skipped_when_flag_off() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), ".disabled/old", "# old\n");
        let config = ScanConfig {
            scan_disabled: false,
            ..ScanConfig::default()
        };
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), config);
        assert!(SkillParser.parse(&ctx).unwrap().records.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_skill_follows_config() {
        let tmp = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "local", "# local\n");
        write_skill(elsewhere.path(), "shared", "# shared\n");
        std::os::unix::fs::symlink(
            elsewhere.path().join("skills/shared"),
            tmp.path().join("skills/shared"),
        )
        .unwrap();

        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        let names: Vec<_> = SkillParser
            .parse(&ctx)
            .unwrap()
            .records
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["local", "shared"]);

        let config = ScanConfig {
            follow_symlinks: false,
            ..ScanConfig::default()
        };
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), config);
        let output = SkillParser.parse(&ctx).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].name, "local");
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_malformed_frontmatter_yields_error_record() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "broken", "---\nname: [oops\n---\n");
        write_skill(tmp.path(), "fine", "# fine\n");

        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        let output = SkillParser.parse(&ctx).unwrap();

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.errors.len(), 1);
        let broken = &output.records[0];
        assert_eq!(broken.name, "broken");
        assert_eq!(broken.status, ComponentStatus::Error);
        assert!(broken.error_message.is_some());
    }

    #[test]
    fn test_missing_skills_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        let output = SkillParser.parse(&ctx).unwrap();
        assert!(output.records.is_empty());
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_performance_from_table() {
        let content = "# Skill\n\n## Performance\n\n| Operation | Time | Speedup |\n|---|---|---|\n| search | 120ms | 4x |\n\n## Usage\n| Operation | Time |\n";
        let metrics = extract_performance(content).unwrap();
        assert_eq!(metrics["search"]["time"], "120ms");
        assert_eq!(metrics["search"]["speedup"], "4x");
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn test_performance_from_text() {
        let content = "Runs 5.6x faster, about ~300ms per call and saves 800 tokens.";
        let metrics = extract_performance(content).unwrap();
        assert_eq!(metrics["speedup"], "5.6x");
        assert_eq!(metrics["execution_time"], "300ms");
        assert_eq!(metrics["token_savings"], "800 tokens");
        assert!(extract_performance("nothing to see").is_none());
    }
}
