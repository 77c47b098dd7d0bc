use std::path::Path;
use tooldex_types::{
    ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, HookDetails, Origin,
};

use crate::traits::{ComponentParser, ParseOutput, ScanContext, modified_utc};
use crate::{Result, fs as scan_fs};

/// Regular files in `<root>/hooks` and `<root>/hooks/.disabled`
pub struct HookParser;

impl ComponentParser for HookParser {
    fn name(&self) -> &'static str {
        "hooks"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Hook
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let hooks_dir = ctx.join("hooks");
        let mut output = ParseOutput::default();

        let mut locations = vec![(hooks_dir.clone(), ComponentStatus::Active)];
        if ctx.config.scan_disabled {
            locations.push((hooks_dir.join(".disabled"), ComponentStatus::Disabled));
        }

        for (location, status) in locations {
            for file in scan_fs::list_entries(ctx, &location)? {
                if !file.is_file() {
                    continue;
                }
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match scan_hook(ctx, &name, &file) {
                    Ok(record) => output.push(record.with_status(status)),
                    Err(err) => {
                        let message = format!("hook '{}': {}", name, err);
                        let record = ComponentRecord::errored(
                            ctx.platform,
                            name,
                            ComponentDetails::Hook(HookDetails::default()),
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

fn scan_hook(ctx: &ScanContext, name: &str, file: &Path) -> Result<ComponentRecord> {
    let metadata = std::fs::metadata(file)?;
    let trigger = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let details = HookDetails {
        trigger,
        language: scan_fs::detect_language(file),
    };

    // Hooks installed by this tool carry its name
    let origin = if name.to_lowercase().contains("tooling") {
        Origin::Official
    } else {
        Origin::InHouse
    };

    let mut record = ComponentRecord::new(ctx.platform, name, ComponentDetails::Hook(details))
        .with_origin(origin)
        .with_install_path(file)
        .with_last_modified(modified_utc(file));
    record.size_bytes = Some(metadata.len());
    Ok(record)
}
