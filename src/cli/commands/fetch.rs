//! Batch acquisition command.

use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::runtime::Runtime;

use crate::acquisition::{
    AcquireError, AcquisitionService, Artifact, Credentials, RetryPolicy, identifier,
};
use crate::config::Config;
use crate::delivery::{ArtifactSink, DirectorySink, deliver_with_retry};
use crate::error::{Error, ResultExt};
use crate::guard::InFlightGuard;

/// Arguments of `fetch`
#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub token: Option<String>,
    pub cookies: Option<String>,
    pub jobs: usize,
    pub json: bool,
}

/// Outcome for one input, printed as text or JSON
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub input: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub watermark_removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// RFC 3339 completion time
    pub finished_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchReport {
    fn delivered(input: &str, artifact: &Artifact, file: PathBuf) -> Self {
        Self {
            input: input.to_string(),
            ok: true,
            file: Some(file),
            source: Some(artifact.source.display_name().to_string()),
            watermark_removed: artifact.watermark_removed,
            size: Some(artifact.size_label.clone()),
            sha256: Some(format!("{:x}", Sha256::digest(&artifact.bytes))),
            finished_at: chrono::Utc::now().to_rfc3339(),
            error: None,
        }
    }

    fn failed(input: &str, error: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            ok: false,
            file: None,
            source: None,
            watermark_removed: false,
            size: None,
            sha256: None,
            finished_at: chrono::Utc::now().to_rfc3339(),
            error: Some(error.into()),
        }
    }
}

/// Acquire every input and deliver it into the output directory
pub fn cmd_fetch(rt: &Runtime, config: &Config, args: &FetchArgs) -> anyhow::Result<()> {
    let credentials = resolve_credentials(config, args);
    if !credentials.has_token() {
        tracing::debug!("No bearer token, the authenticated API source will be skipped");
    }

    if args.output.is_file() {
        return Err(Error::output(&args.output).into());
    }

    let service =
        AcquisitionService::new(config).with_context("Failed to set up the acquisition pipeline")?;
    let sink = DirectorySink::new(&args.output, config.limits.max_bytes);
    let policy = RetryPolicy::new(
        config.retry.delivery_attempts,
        Duration::from_secs(config.retry.delivery_delay_secs),
        AcquireError::is_retryable,
    );
    let guard = InFlightGuard::new();

    if !args.json {
        println!(
            "Fetching {} video(s) into {:?}...\n",
            args.inputs.len(),
            sink.dir()
        );
    }

    let reports = rt.block_on(fetch_all(
        &service,
        &sink,
        &policy,
        &guard,
        &credentials,
        &args.inputs,
        args.jobs,
    ));

    for report in &reports {
        if args.json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            print_report(report);
        }
    }

    let failed = reports.iter().filter(|r| !r.ok).count();
    if !args.json {
        println!();
        println!("Fetched {} of {} video(s)", reports.len() - failed, reports.len());
    }
    if failed > 0 {
        anyhow::bail!("{} of {} video(s) failed", failed, reports.len());
    }
    Ok(())
}

/// Command-line values win over the config file
fn resolve_credentials(config: &Config, args: &FetchArgs) -> Credentials {
    let token = args
        .token
        .clone()
        .or_else(|| config.credentials.bearer_token.clone())
        .unwrap_or_default();
    let cookies = args
        .cookies
        .clone()
        .or_else(|| config.credentials.cookie_header.clone())
        .unwrap_or_default();
    Credentials::new(token, cookies)
}

/// Run the batch with at most `jobs` acquisitions in flight, reports in input order
pub(crate) async fn fetch_all(
    service: &AcquisitionService,
    sink: &dyn ArtifactSink,
    policy: &RetryPolicy<AcquireError>,
    guard: &InFlightGuard<String>,
    credentials: &Credentials,
    inputs: &[String],
    jobs: usize,
) -> Vec<FetchReport> {
    futures::stream::iter(inputs)
        .map(|input| fetch_one(service, sink, policy, guard, credentials, input))
        .buffered(jobs.max(1))
        .collect()
        .await
}

async fn fetch_one(
    service: &AcquisitionService,
    sink: &dyn ArtifactSink,
    policy: &RetryPolicy<AcquireError>,
    guard: &InFlightGuard<String>,
    credentials: &Credentials,
    input: &str,
) -> FetchReport {
    let key = identifier::extract(input)
        .map(|id| id.to_string())
        .unwrap_or_else(|| input.to_string());

    let Some(ticket) = guard.try_begin(key.clone()) else {
        tracing::info!("{} is already being fetched, skipping duplicate", key);
        return FetchReport::failed(input, format!("{} is already being fetched", key));
    };
    tracing::debug!("Fetching {} ({} in flight)", ticket.key(), guard.len());

    let delivered = async {
        let artifact = service.acquire(input, credentials).await?;
        let path = deliver_with_retry(sink, &artifact, policy).await?;
        Ok::<_, AcquireError>((artifact, path))
    }
    .await;

    match delivered {
        Ok((artifact, path)) => FetchReport::delivered(input, &artifact, path),
        Err(e) => {
            if let AcquireError::SourceUnavailable { reasons } = &e {
                tracing::warn!("{}: {}", key, reasons.join("; "));
            }
            FetchReport::failed(input, e.to_string())
        }
    }
}

fn print_report(report: &FetchReport) {
    match (&report.file, &report.error) {
        (Some(file), _) => {
            println!(
                "✓ {} ({}, {}{})",
                file.display(),
                report.source.as_deref().unwrap_or("?"),
                report.size.as_deref().unwrap_or("?"),
                if report.watermark_removed {
                    ", watermark removed"
                } else {
                    ""
                }
            );
            if let Some(sha) = &report.sha256 {
                println!("  sha256: {}", sha);
            }
        }
        (None, error) => {
            eprintln!(
                "✗ {}: {}",
                report.input,
                error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::SourceKind;
    use crate::acquisition::sources::SourceChain;
    use crate::acquisition::traits::mocks::{MockFilter, MockSource};
    use crate::test_utils::{ArcSource, test_config};
    use std::sync::Arc;

    const VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake video payload";

    fn service(temp: &std::path::Path, proxy: Arc<MockSource>) -> AcquisitionService {
        AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(ArcSource(proxy))]),
            Arc::new(MockFilter::succeeding()),
            test_config(temp),
        )
    }

    fn inputs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_delivers_and_reports_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::streaming(SourceKind::PrimaryProxy, VIDEO, false));
        let service = service(temp.path(), proxy.clone());
        let sink = DirectorySink::new(out.path(), 1024);

        let reports = fetch_all(
            &service,
            &sink,
            &RetryPolicy::delivery(),
            &InFlightGuard::new(),
            &Credentials::default(),
            &inputs(&["https://sora.chatgpt.com/p/s_abc12345", "not a link", "s_zzz98765"]),
            2,
        )
        .await;

        assert_eq!(reports.len(), 3);
        assert!(reports[0].ok);
        assert!(!reports[1].ok);
        assert_eq!(reports[1].error.as_deref(), Some("Invalid video URL or code"));
        assert!(reports[2].ok);
        assert_eq!(proxy.calls(), 2);

        let first = reports[0].file.as_ref().unwrap();
        assert_eq!(first, &out.path().join("s_abc12345_HD.mp4"));
        assert_eq!(std::fs::read(first).unwrap(), VIDEO);
        assert_eq!(reports[0].source.as_deref(), Some("CDN Proxy (No Watermark)"));
        assert_eq!(
            reports[0].sha256.as_deref(),
            Some(format!("{:x}", Sha256::digest(VIDEO)).as_str())
        );
    }

    #[tokio::test]
    async fn test_in_flight_asset_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::streaming(SourceKind::PrimaryProxy, VIDEO, false));
        let service = service(temp.path(), proxy.clone());
        let guard = InFlightGuard::new();
        let _held = guard.try_begin("s_abc12345".to_string()).unwrap();

        let reports = fetch_all(
            &service,
            &DirectorySink::new(out.path(), 1024),
            &RetryPolicy::delivery(),
            &guard,
            &Credentials::default(),
            &inputs(&["https://sora.chatgpt.com/p/s_abc12345"]),
            1,
        )
        .await;

        assert!(!reports[0].ok);
        assert!(reports[0].error.as_deref().unwrap().contains("already being fetched"));
        assert_eq!(proxy.calls(), 0);
    }

    #[tokio::test]
    async fn test_guard_released_after_batch() {
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::absent(SourceKind::PrimaryProxy));
        let service = service(temp.path(), proxy);
        let guard = InFlightGuard::new();

        let reports = fetch_all(
            &service,
            &DirectorySink::new(out.path(), 1024),
            &RetryPolicy::delivery(),
            &guard,
            &Credentials::default(),
            &inputs(&["s_abc12345"]),
            1,
        )
        .await;

        assert_eq!(reports[0].error.as_deref(), Some("Video source unavailable"));
        assert!(guard.is_empty());
    }

    #[test]
    fn test_failed_report_json_omits_empty_fields() {
        let report = FetchReport::failed("x", "Invalid video URL or code");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "Invalid video URL or code");
        assert!(json.get("sha256").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(json["finished_at"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_cli_credentials_override_config() {
        let mut config = Config::default();
        config.credentials.bearer_token = Some("from-config".into());
        config.credentials.cookie_header = Some("a=1".into());
        let args = FetchArgs {
            inputs: vec![],
            output: PathBuf::from("."),
            token: Some("from-cli".into()),
            cookies: None,
            jobs: 1,
            json: false,
        };

        let creds = resolve_credentials(&config, &args);
        assert_eq!(creds.bearer_token, "from-cli");
        assert_eq!(creds.cookie_header, "a=1");
    }
}
