//! Custom assertions for scan results.
//!
//! Each returns an error describing the mismatch instead of panicking, so
//! tests can `?` them and still print the full scan on failure.

use anyhow::Result;
use tooldex_types::{ComponentKind, Platform, ScanErrorKind, ScanResult};

/// Assert the number of components a scan found on one platform.
pub fn assert_component_count(scan: &ScanResult, platform: Platform, expected: usize) -> Result<()> {
    let found = scan
        .components
        .iter()
        .filter(|r| r.platform == platform)
        .count();

    if found != expected {
        anyhow::bail!(
            "Expected {} {} components, got {}: {:?}",
            expected,
            platform,
            found,
            scan.components.iter().map(|r| r.key().to_string()).collect::<Vec<_>>()
        );
    }

    Ok(())
}

/// Assert that a component with this identity is present.
pub fn assert_has_component(
    scan: &ScanResult,
    platform: Platform,
    kind: ComponentKind,
    name: &str,
) -> Result<()> {
    if !scan
        .components
        .iter()
        .any(|r| r.platform == platform && r.kind == kind && r.name == name)
    {
        anyhow::bail!("Expected {}:{}:{} in scan", platform, kind, name);
    }

    Ok(())
}

/// Assert the number of errors of one kind.
pub fn assert_error_count(scan: &ScanResult, kind: ScanErrorKind, expected: usize) -> Result<()> {
    let errors: Vec<String> = scan.errors_of(kind).map(|e| e.to_string()).collect();

    if errors.len() != expected {
        anyhow::bail!(
            "Expected {} {} errors, got {}: {:?}",
            expected,
            kind.as_str(),
            errors.len(),
            errors
        );
    }

    Ok(())
}

/// Assert that none of `secrets` appears anywhere in the serialized scan.
pub fn assert_no_secrets(scan: &ScanResult, secrets: &[&str]) -> Result<()> {
    let serialized = serde_json::to_string(scan)?;

    for secret in secrets {
        if serialized.contains(secret) {
            anyhow::bail!("Secret {:?} leaked into scan output", secret);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tooldex_types::{ComponentDetails, ComponentRecord, ScanError, SkillDetails};

    fn scan() -> ScanResult {
        let mut scan = ScanResult::new(Utc::now());
        scan.components.push(ComponentRecord::new(
            Platform::Claude,
            "gmail",
            ComponentDetails::Skill(SkillDetails::default()),
        ));
        scan.errors
            .push(ScanError::new("codex", ScanErrorKind::Unavailable, "missing"));
        scan
    }

    #[test]
    fn test_assert_component_count() {
        let scan = scan();
        assert!(assert_component_count(&scan, Platform::Claude, 1).is_ok());
        assert!(assert_component_count(&scan, Platform::Codex, 1).is_err());
        assert!(assert_has_component(&scan, Platform::Claude, ComponentKind::Skill, "gmail").is_ok());
        assert!(assert_has_component(&scan, Platform::Claude, ComponentKind::Mcp, "gmail").is_err());
    }

    #[test]
    fn test_assert_error_count() {
        let scan = scan();
        assert!(assert_error_count(&scan, ScanErrorKind::Unavailable, 1).is_ok());
        assert!(assert_error_count(&scan, ScanErrorKind::Panic, 1).is_err());
        assert!(assert_no_secrets(&scan, &["ghp_secret"]).is_ok());
        assert!(assert_no_secrets(&scan, &["gmail"]).is_err());
    }
}
