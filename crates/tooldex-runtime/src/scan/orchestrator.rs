use chrono::Utc;
use futures::future::join_all;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tooldex_scanners::{ComponentParser, ParseOutput, ScanConfig, ScanContext};
use tooldex_types::{
    ComponentKind, ComponentRecord, Platform, ScanError, ScanErrorKind, ScanResult, truncate,
};

const PANIC_MESSAGE_MAX: usize = 200;

/// How one parser task ended
enum ParserOutcome {
    Completed(ParseOutput),
    Failed(String),
    Panicked(String),
    TimedOut(Duration),
}

impl From<Result<tooldex_scanners::Result<ParseOutput>, JoinError>> for ParserOutcome {
    fn from(joined: Result<tooldex_scanners::Result<ParseOutput>, JoinError>) -> Self {
        match joined {
            Ok(Ok(output)) => ParserOutcome::Completed(output),
            Ok(Err(err)) => ParserOutcome::Failed(err.to_string()),
            Err(err) if err.is_panic() => {
                ParserOutcome::Panicked(panic_message(err.into_panic().as_ref()))
            }
            Err(err) => ParserOutcome::Failed(format!("parser task cancelled: {}", err)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "parser panicked".to_string()
    };
    truncate(&message, PANIC_MESSAGE_MAX)
}

/// Runs a fixed parser set against one platform root.
///
/// Each parser gets its own blocking task. Whatever a parser does (return
/// an error, panic, or run past the timeout) ends up as exactly one entry in
/// [`ScanResult::errors`]; it never aborts the scan or its siblings.
pub struct ScanOrchestrator {
    parsers: Vec<Arc<dyn ComponentParser>>,
    timeout: Option<Duration>,
}

impl ScanOrchestrator {
    pub fn new(parsers: Vec<Arc<dyn ComponentParser>>) -> Self {
        Self {
            parsers,
            timeout: None,
        }
    }

    /// Orchestrator over the registry's parsers for `platform`
    pub fn for_platform(platform: Platform) -> Self {
        Self::new(tooldex_scanners::parsers_for(platform))
    }

    /// Report parsers still running after `timeout`. The task itself is
    /// detached, not cancelled.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn scan(&self, platform: Platform, root: &Path, config: &ScanConfig) -> ScanResult {
        let mut result = ScanResult::new(Utc::now());

        if !root.is_dir() {
            tracing::warn!(platform = %platform, root = %root.display(), "platform root not found");
            result.errors.push(ScanError::new(
                platform.as_str(),
                ScanErrorKind::Unavailable,
                format!("root {} does not exist", root.display()),
            ));
            return result;
        }

        let ctx = Arc::new(ScanContext::new(platform, root, config.clone()));

        let tasks = self.parsers.iter().map(|parser| {
            let parser = Arc::clone(parser);
            let ctx = Arc::clone(&ctx);
            let timeout = self.timeout;
            async move {
                let name = parser.name();
                let kind = parser.kind();
                let handle = tokio::task::spawn_blocking(move || parser.parse(&ctx));

                let outcome = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, handle).await {
                        Ok(joined) => ParserOutcome::from(joined),
                        Err(_) => ParserOutcome::TimedOut(limit),
                    },
                    None => ParserOutcome::from(handle.await),
                };
                (name, kind, outcome)
            }
        });

        for (name, kind, outcome) in join_all(tasks).await {
            collect_outcome(&mut result, platform, name, kind, outcome);
        }

        tracing::debug!(platform = %platform, summary = %result.summary(), "platform scan finished");
        result
    }
}

fn collect_outcome(
    result: &mut ScanResult,
    platform: Platform,
    parser: &str,
    kind: ComponentKind,
    outcome: ParserOutcome,
) {
    let source = format!("{}:{}", platform, parser);

    match outcome {
        ParserOutcome::Completed(output) => {
            tracing::debug!(
                source = %source,
                records = output.records.len(),
                errors = output.errors.len(),
                "parser completed"
            );
            result.coverage.insert((platform, kind));

            for mut record in output.records {
                if let Some(problem) = identity_problem(&record, kind) {
                    tracing::warn!(source = %source, name = %record.name, "dropping record: {}", problem);
                    result
                        .errors
                        .push(ScanError::new(source.as_str(), ScanErrorKind::Parse, problem));
                    continue;
                }
                record.platform = platform;
                result.components.push(record);
            }

            result.errors.extend(
                output
                    .errors
                    .into_iter()
                    .map(|message| ScanError::new(source.as_str(), ScanErrorKind::Parse, message)),
            );
        }
        ParserOutcome::Failed(message) => {
            tracing::warn!(source = %source, error = %message, "parser failed");
            result
                .errors
                .push(ScanError::new(source, ScanErrorKind::Failed, message));
        }
        ParserOutcome::Panicked(message) => {
            tracing::warn!(source = %source, panic = %message, "parser panicked");
            result
                .errors
                .push(ScanError::new(source, ScanErrorKind::Panic, message));
        }
        ParserOutcome::TimedOut(limit) => {
            tracing::warn!(source = %source, timeout_secs = limit.as_secs_f64(), "parser timed out");
            result.errors.push(ScanError::new(
                source,
                ScanErrorKind::Timeout,
                format!("still running after {:.1}s", limit.as_secs_f64()),
            ));
        }
    }
}

/// Why a parser's record cannot be indexed under this parser's coverage
fn identity_problem(record: &ComponentRecord, parser_kind: ComponentKind) -> Option<String> {
    if record.name.trim().is_empty() {
        return Some("record has an empty name".to_string());
    }
    if record.details.kind() != record.kind {
        return Some(format!(
            "record {} is a {} with {} details",
            record.name,
            record.kind,
            record.details.kind()
        ));
    }
    if record.kind != parser_kind {
        return Some(format!(
            "record {} is a {}, expected {}",
            record.name, record.kind, parser_kind
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tooldex_types::{ComponentDetails, HookDetails, SkillDetails};

    struct FixedParser {
        names: Vec<&'static str>,
    }

    impl ComponentParser for FixedParser {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::Skill
        }

        fn parse(&self, _ctx: &ScanContext) -> tooldex_scanners::Result<ParseOutput> {
            let mut output = ParseOutput::default();
            for name in &self.names {
                // Wrong platform; the orchestrator retags it
                output.push(ComponentRecord::new(
                    Platform::Codex,
                    *name,
                    ComponentDetails::Skill(SkillDetails::default()),
                ));
            }
            output.errors.push("skills/broken: invalid frontmatter".to_string());
            Ok(output)
        }
    }

    struct FailingParser;

    impl ComponentParser for FailingParser {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::Hook
        }

        fn parse(&self, _ctx: &ScanContext) -> tooldex_scanners::Result<ParseOutput> {
            Err(tooldex_scanners::Error::Parse("settings.json is not an object".into()))
        }
    }

    #[tokio::test]
    async fn test_records_are_retagged_and_blank_names_dropped() {
        let root = TempDir::new().unwrap();
        let orchestrator = ScanOrchestrator::new(vec![Arc::new(FixedParser {
            names: vec!["gmail", "  ", "pdf"],
        })]);

        let result = orchestrator
            .scan(Platform::Claude, root.path(), &ScanConfig::default())
            .await;

        let names: Vec<_> = result.components.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["gmail", "pdf"]);
        assert!(result.components.iter().all(|r| r.platform == Platform::Claude));
        assert_eq!(result.errors_of(ScanErrorKind::Parse).count(), 2);
        assert!(result.covers(Platform::Claude, ComponentKind::Skill));
    }

    struct MislabelledParser;

    impl ComponentParser for MislabelledParser {
        fn name(&self) -> &'static str {
            "mislabelled"
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::Skill
        }

        fn parse(&self, ctx: &ScanContext) -> tooldex_scanners::Result<ParseOutput> {
            let mut output = ParseOutput::default();
            output.push(ComponentRecord::new(
                ctx.platform,
                "good",
                ComponentDetails::Skill(SkillDetails::default()),
            ));
            let mut mismatched = ComponentRecord::new(
                ctx.platform,
                "mismatched",
                ComponentDetails::Hook(HookDetails::default()),
            );
            mismatched.kind = ComponentKind::Skill;
            output.push(mismatched);
            output.push(ComponentRecord::new(
                ctx.platform,
                "stray-hook",
                ComponentDetails::Hook(HookDetails::default()),
            ));
            Ok(output)
        }
    }

    #[tokio::test]
    async fn test_records_outside_parser_kind_are_parse_errors() {
        let root = TempDir::new().unwrap();
        let orchestrator = ScanOrchestrator::new(vec![Arc::new(MislabelledParser)]);

        let result = orchestrator
            .scan(Platform::Claude, root.path(), &ScanConfig::default())
            .await;

        let names: Vec<_> = result.components.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["good"]);
        let errors: Vec<_> = result.errors_of(ScanErrorKind::Parse).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.source == "claude:mislabelled"));
        assert!(!result.covers(Platform::Claude, ComponentKind::Hook));
        assert_eq!(result.summary(), "1 components indexed, 2 errors");
    }

    #[tokio::test]
    async fn test_failed_parser_is_one_error_without_coverage() {
        let root = TempDir::new().unwrap();
        let orchestrator = ScanOrchestrator::new(vec![
            Arc::new(FailingParser),
            Arc::new(FixedParser {
                names: vec!["gmail"],
            }),
        ]);

        let result = orchestrator
            .scan(Platform::Claude, root.path(), &ScanConfig::default())
            .await;

        let failed: Vec<_> = result.errors_of(ScanErrorKind::Failed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].source, "claude:failing");
        assert!(!result.covers(Platform::Claude, ComponentKind::Hook));
        assert_eq!(result.components.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_root_is_unavailable() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope");

        let result = ScanOrchestrator::for_platform(Platform::Codex)
            .scan(Platform::Codex, &missing, &ScanConfig::default())
            .await;

        assert!(result.components.is_empty());
        assert!(result.coverage.is_empty());
        let errors: Vec<_> = result.errors_of(ScanErrorKind::Unavailable).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].source, "codex");
    }

    #[test]
    fn test_panic_message_is_truncated() {
        let long = "x".repeat(500);
        let payload: Box<dyn Any + Send> = Box::new(long);
        assert_eq!(panic_message(payload.as_ref()).chars().count(), PANIC_MESSAGE_MAX);

        let payload: Box<dyn Any + Send> = Box::new("short");
        assert_eq!(panic_message(payload.as_ref()), "short");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "parser panicked");
    }
}
