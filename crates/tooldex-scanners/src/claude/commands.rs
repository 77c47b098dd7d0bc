use std::fs;
use std::path::{Path, PathBuf};
use tooldex_types::{
    CommandDetails, ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, Origin,
};

use crate::traits::{ComponentParser, ParseOutput, ScanContext, modified_utc};
use crate::{Result, frontmatter, fs as scan_fs};

/// `<root>/commands/*.md`, plus `<root>/commands/.disabled/*.md`
pub struct CommandParser;

impl ComponentParser for CommandParser {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Command
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let dir = ctx.join("commands");
        let mut output = ParseOutput::default();
        if !dir.is_dir() {
            return Ok(output);
        }

        let mut locations = vec![(dir.clone(), ComponentStatus::Active)];
        if ctx.config.scan_disabled {
            locations.push((dir.join(".disabled"), ComponentStatus::Disabled));
        }

        for (location, status) in locations {
            for file in markdown_files(ctx, &location)? {
                let name = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match scan_command(ctx, &name, &file) {
                    Ok(record) => output.push(record.with_status(status)),
                    Err(err) => {
                        let message = format!("command '{}': {}", name, err);
                        let record = ComponentRecord::errored(
                            ctx.platform,
                            name,
                            ComponentDetails::Command(CommandDetails::default()),
                            err.to_string(),
                        )
                        .with_install_path(&file);
                        output.push_failed(record, message);
                    }
                }
            }
        }

        Ok(output)
    }
}

fn markdown_files(ctx: &ScanContext, dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.md", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<_> = glob::glob(&pattern)
        .map_err(|e| crate::Error::Parse(format!("bad command pattern: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file() && !scan_fs::is_hidden(p) && !ctx.is_excluded(p))
        .filter(|p| ctx.config.follow_symlinks || !p.is_symlink())
        .collect();
    files.sort();
    Ok(files)
}

fn scan_command(ctx: &ScanContext, name: &str, file: &Path) -> Result<ComponentRecord> {
    let content = fs::read_to_string(file)?;
    let fm = frontmatter::parse(&content)?;

    let mut record = ComponentRecord::new(
        ctx.platform,
        name,
        ComponentDetails::Command(CommandDetails::default()),
    )
    .with_description(fm.description.unwrap_or_default())
    .with_origin(Origin::InHouse)
    .with_install_path(file)
    .with_last_modified(modified_utc(file));
    record.size_bytes = Some(content.len() as u64);
    record.line_count = Some(content.lines().count() as u64);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ScanConfig;
    use tooldex_types::{ComponentStatus, Platform};

    #[test]
    fn test_scans_markdown_commands_only() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("commands");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("commit.md"), "---\ndescription: Write a commit\n---\nDo it\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
        fs::write(dir.join("review.md"), "no frontmatter").unwrap();

        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        let output = CommandParser.parse(&ctx).unwrap();

        let names: Vec<_> = output.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["commit", "review"]);
        assert_eq!(
            output.records[0].description.as_deref(),
            Some("Write a commit")
        );
        assert_eq!(output.records[1].description, None);
        assert_eq!(output.records[0].origin, Origin::InHouse);
    }

    #[test]
    fn test_bad_frontmatter_is_per_item() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("commands");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.md"), "---\n: : :\n  - [\n---\n").unwrap();

        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        let output = CommandParser.parse(&ctx).unwrap();
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.records[0].status, ComponentStatus::Error);
    }

    #[test]
    fn test_excluded_commands_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("commands");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("draft-x.md"), "x").unwrap();
        fs::write(dir.join("ship.md"), "x").unwrap();

        let config = ScanConfig {
            exclude: vec!["draft-*".into()],
            ..ScanConfig::default()
        };
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), config);
        let output = CommandParser.parse(&ctx).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].name, "ship");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_command_skipped_without_follow() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("commands");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("commit.md"), "Commit\n").unwrap();
        fs::write(tmp.path().join("deploy.md"), "Deploy\n").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("deploy.md"), dir.join("deploy.md")).unwrap();

        let config = ScanConfig {
            follow_symlinks: false,
            ..ScanConfig::default()
        };
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), config);
        let output = CommandParser.parse(&ctx).unwrap();

        let names: Vec<_> = output.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["commit"]);
    }
}
