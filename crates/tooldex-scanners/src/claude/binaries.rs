use std::path::Path;
use tooldex_types::{
    BinaryDetails, ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, Origin,
};

use crate::traits::{ComponentParser, ParseOutput, ScanContext, modified_utc};
use crate::{Result, fs as scan_fs};

/// Files in `<root>/bin` and `<root>/bin/.disabled`
pub struct BinaryParser;

impl ComponentParser for BinaryParser {
    fn name(&self) -> &'static str {
        "binaries"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Binary
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let bin_dir = ctx.join("bin");
        let mut output = ParseOutput::default();

        let mut locations = vec![(bin_dir.clone(), false)];
        if ctx.config.scan_disabled {
            locations.push((bin_dir.join(".disabled"), true));
        }

        for (location, disabled) in locations {
            for file in scan_fs::list_entries(ctx, &location)? {
                if !file.is_file() {
                    continue;
                }
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match scan_binary(ctx, &name, &file, disabled) {
                    Ok(record) => output.push(record),
                    Err(err) => {
                        let message = format!("binary '{}': {}", name, err);
                        let record = ComponentRecord::errored(
                            ctx.platform,
                            name,
                            ComponentDetails::Binary(BinaryDetails::default()),
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

fn scan_binary(
    ctx: &ScanContext,
    name: &str,
    file: &Path,
    disabled: bool,
) -> Result<ComponentRecord> {
    let metadata = std::fs::metadata(file)?;
    let is_executable = scan_fs::is_executable(file);
    let details = BinaryDetails {
        language: scan_fs::detect_language(file),
        is_executable,
    };

    let mut record = ComponentRecord::new(ctx.platform, name, ComponentDetails::Binary(details))
        .with_origin(Origin::InHouse)
        .with_install_path(file)
        .with_last_modified(modified_utc(file));
    record.size_bytes = Some(metadata.len());

    if disabled {
        record.status = ComponentStatus::Disabled;
    } else if !is_executable {
        record.status = ComponentStatus::Error;
        record.error_message = Some("not executable".to_string());
    }
    Ok(record)
}
