use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::alert::{AlertLedger, Mailer};
use crate::config::{GlobalSettings, MonitorConfig, Target};
use crate::content;
use crate::models::{CertificateStatus, ProbeOutcome, Severity, Verdict};
use crate::probe;
use crate::report;
use crate::tls;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// The monitoring engine: one evaluation pass per target per cycle, plus the
/// alert gate. Targets and settings are immutable after construction; the
/// alert ledger is the only mutable state.
pub struct Monitor {
    pub config: MonitorConfig,
    client: reqwest::Client,
    insecure_client: reqwest::Client,
    ledger: AlertLedger,
    mailer: Mailer,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        // Served to targets with verify_tls=false; the certificate inspector
        // still verifies those hosts strictly on its own connection.
        let insecure_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build insecure HTTP client")?;
        let mailer = Mailer::new(&config.global_settings)?;

        Ok(Self {
            config,
            client,
            insecure_client,
            ledger: AlertLedger::new(),
            mailer,
        })
    }

    /// Continuous mode: check every target, sleep the configured interval,
    /// repeat. A slow cycle simply delays the next one.
    pub async fn run(&self) -> Result<()> {
        let interval = Duration::from_secs(self.config.global_settings.monitor_interval_seconds);
        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            info!("Cycle {cycle}: checking {} targets", self.config.targets.len());
            self.run_cycle().await;
            info!("Cycle {cycle} complete; next check in {}s", interval.as_secs());
            tokio::time::sleep(interval).await;
        }
    }

    /// One full pass over all targets, strictly sequential.
    pub async fn run_cycle(&self) {
        for target in &self.config.targets {
            info!("Checking {} ({})", target.name, target.url);
            let verdict = self.evaluate(target).await;
            println!("\n{}\n", report::render(&verdict));
            if verdict.severity == Severity::Error {
                error!("{} is failing: {}", target.name, verdict.errors.join("; "));
            } else if verdict.severity == Severity::Warning {
                warn!("{} has warnings: {}", target.name, verdict.warnings.join("; "));
            }
            self.maybe_alert(target, &verdict).await;
        }
    }

    /// Runs the checks for one target and folds them into a Verdict.
    ///
    /// The keyword check only runs when the probe succeeded; the certificate
    /// check is independent and runs even when the probe failed.
    pub async fn evaluate(&self, target: &Target) -> Verdict {
        let settings = &self.config.global_settings;
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let client = if target.verify_tls {
            &self.client
        } else {
            &self.insecure_client
        };

        let outcome = probe::probe(client, &target.url, timeout, target.retries).await;

        let keyword_found = match (&outcome, &target.expected_text) {
            (ProbeOutcome::Success(success), Some(keyword)) => {
                Some(content::contains_keyword(&success.body, keyword))
            }
            _ => None,
        };

        let certificate = if target.url.starts_with("https://") && target.check_tls_expiry {
            Some(tls::inspect_certificate(&target.url, timeout).await)
        } else {
            None
        };

        build_verdict(target, settings, outcome, keyword_found, certificate, Utc::now())
    }

    /// Alert gate: only ERROR verdicts with configured recipients are
    /// eligible, and only outside the per-target cooldown window. The ledger
    /// is updated only when the dispatch actually went through.
    async fn maybe_alert(&self, target: &Target, verdict: &Verdict) {
        if verdict.severity != Severity::Error || target.alert_recipients.is_empty() {
            return;
        }

        let now = Utc::now();
        if !self.ledger.should_alert(&target.name, now).await {
            info!("Alert for {} suppressed by cooldown", target.name);
            return;
        }

        let subject = format!("{} monitoring failure", target.name);
        let body = report::render_alert_body(verdict);
        if self
            .mailer
            .send(&subject, &body, &target.alert_recipients)
            .await
        {
            self.ledger.record_sent(&target.name, Utc::now()).await;
        }
    }
}

/// Pure composition of the check outcomes into a Verdict. Severity is the
/// monotonic maximum of everything appended; message order follows check
/// order.
pub fn build_verdict(
    target: &Target,
    settings: &GlobalSettings,
    outcome: ProbeOutcome,
    keyword_found: Option<bool>,
    certificate: Option<CertificateStatus>,
    now: DateTime<Utc>,
) -> Verdict {
    let mut verdict = Verdict::new(&target.name, &target.url, now);

    match outcome {
        ProbeOutcome::Failure { attempts, message } => {
            verdict.attempts = Some(attempts);
            verdict.push_error(message);
        }
        ProbeOutcome::Success(success) => {
            verdict.latency_ms = Some(success.latency_ms);
            verdict.status_code = Some(success.status_code);
            verdict.attempts = Some(success.attempts);
            verdict.final_url = Some(success.final_url);

            if success.status_code != target.expected_status {
                verdict.push_error(format!(
                    "HTTP status {} (expected {})",
                    success.status_code, target.expected_status
                ));
            }

            let threshold = target
                .max_response_time_ms
                .unwrap_or(settings.max_response_time_ms);
            if success.latency_ms > threshold {
                verdict.push_warning(format!(
                    "response time exceeded threshold: {:.2}ms (limit {:.0}ms)",
                    success.latency_ms, threshold
                ));
            }

            if let (Some(found), Some(keyword)) = (keyword_found, &target.expected_text) {
                if !found {
                    verdict.push_error(format!("content anomaly: keyword '{keyword}' not found"));
                }
            }
        }
    }

    match certificate {
        Some(CertificateStatus::Inspected {
            days_left,
            expiry_date,
            ..
        }) => {
            verdict.cert_days_left = Some(days_left);
            verdict.cert_expiry = Some(expiry_date);
            if days_left <= 0 {
                verdict.push_error("certificate expired");
            } else if days_left < settings.tls_warning_days {
                verdict.push_warning(format!("certificate expiring soon: {days_left} days left"));
            }
        }
        Some(CertificateStatus::Unavailable { message }) => {
            verdict.push_warning(format!("certificate check failed: {message}"));
        }
        None => {}
    }

    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeSuccess;

    fn target() -> Target {
        serde_json::from_str(r#"{"name": "portal", "url": "https://portal.example.com"}"#).unwrap()
    }

    fn settings() -> GlobalSettings {
        GlobalSettings::default()
    }

    fn success(status_code: u16, latency_ms: f64) -> ProbeOutcome {
        ProbeOutcome::Success(ProbeSuccess {
            status_code,
            latency_ms,
            final_url: "https://portal.example.com/".into(),
            body: Vec::new(),
            attempts: 1,
        })
    }

    #[test]
    fn unexpected_status_escalates_to_error() {
        let verdict = build_verdict(
            &target(),
            &settings(),
            success(500, 120.0),
            None,
            None,
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Error);
        assert_eq!(verdict.errors, vec!["HTTP status 500 (expected 200)"]);
        assert!(verdict.warnings.is_empty());
        assert_eq!(verdict.status_code, Some(500));
    }

    #[test]
    fn slow_response_with_keyword_present_is_a_warning() {
        let mut target = target();
        target.expected_text = Some("welcome".into());

        let verdict = build_verdict(
            &target,
            &settings(),
            success(200, 6000.0),
            Some(true),
            None,
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Warning);
        assert!(verdict.errors.is_empty());
        assert_eq!(verdict.warnings.len(), 1);
        assert!(verdict.warnings[0].starts_with("response time exceeded threshold"));
    }

    #[test]
    fn per_target_latency_threshold_overrides_the_global_one() {
        let mut target = target();
        target.max_response_time_ms = Some(10_000.0);

        let verdict = build_verdict(
            &target,
            &settings(),
            success(200, 6000.0),
            None,
            None,
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Ok);
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn missing_keyword_is_an_error() {
        let mut target = target();
        target.expected_text = Some("狀態正常".into());

        let verdict = build_verdict(
            &target,
            &settings(),
            success(200, 100.0),
            Some(false),
            None,
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Error);
        assert_eq!(
            verdict.errors,
            vec!["content anomaly: keyword '狀態正常' not found"]
        );
    }

    #[test]
    fn probe_failure_skips_content_checks_but_not_the_certificate() {
        let outcome = ProbeOutcome::Failure {
            attempts: 3,
            message: "All 3 attempts failed. Last error: connection failed".into(),
        };
        let certificate = CertificateStatus::Inspected {
            days_left: 5,
            expiry_date: "2026-09-04".into(),
            issuer: "Example CA".into(),
        };

        let verdict = build_verdict(
            &target(),
            &settings(),
            outcome,
            None,
            Some(certificate),
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Error);
        assert_eq!(verdict.errors.len(), 1);
        assert_eq!(
            verdict.warnings,
            vec!["certificate expiring soon: 5 days left"]
        );
        assert_eq!(verdict.cert_days_left, Some(5));
        assert!(verdict.status_code.is_none());
    }

    #[test]
    fn certificate_expiring_soon_is_a_warning_not_an_error() {
        let certificate = CertificateStatus::Inspected {
            days_left: 5,
            expiry_date: "2026-09-04".into(),
            issuer: "Example CA".into(),
        };

        let verdict = build_verdict(
            &target(),
            &settings(),
            success(200, 100.0),
            None,
            Some(certificate),
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Warning);
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn expired_certificate_is_an_error() {
        let certificate = CertificateStatus::Inspected {
            days_left: -1,
            expiry_date: "2026-08-29".into(),
            issuer: "Example CA".into(),
        };

        let verdict = build_verdict(
            &target(),
            &settings(),
            success(200, 100.0),
            None,
            Some(certificate),
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Error);
        assert_eq!(verdict.errors, vec!["certificate expired"]);
    }

    #[test]
    fn certificate_inspection_failure_stays_advisory() {
        let certificate = CertificateStatus::fail("TLS handshake timed out");

        let verdict = build_verdict(
            &target(),
            &settings(),
            success(200, 100.0),
            None,
            Some(certificate),
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Warning);
        assert!(verdict.errors.is_empty());
        assert_eq!(
            verdict.warnings,
            vec!["certificate check failed: TLS handshake timed out"]
        );
    }

    #[test]
    fn severity_is_the_maximum_across_all_checks() {
        let mut target = target();
        target.expected_text = Some("welcome".into());

        // Slow response (warning) plus missing keyword (error) plus expiring
        // certificate (warning): the error must win.
        let certificate = CertificateStatus::Inspected {
            days_left: 10,
            expiry_date: "2026-09-09".into(),
            issuer: "Example CA".into(),
        };
        let verdict = build_verdict(
            &target,
            &settings(),
            success(200, 9000.0),
            Some(false),
            Some(certificate),
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Error);
        assert_eq!(verdict.errors.len(), 1);
        assert_eq!(verdict.warnings.len(), 2);
        assert!(verdict.warnings[0].starts_with("response time exceeded threshold"));
        assert!(verdict.warnings[1].starts_with("certificate expiring soon"));
    }

    #[test]
    fn all_checks_passing_yields_ok() {
        let mut target = target();
        target.expected_text = Some("welcome".into());

        let certificate = CertificateStatus::Inspected {
            days_left: 90,
            expiry_date: "2026-11-28".into(),
            issuer: "Example CA".into(),
        };
        let verdict = build_verdict(
            &target,
            &settings(),
            success(200, 100.0),
            Some(true),
            Some(certificate),
            Utc::now(),
        );

        assert_eq!(verdict.severity, Severity::Ok);
        assert!(verdict.errors.is_empty());
        assert!(verdict.warnings.is_empty());
        assert_eq!(verdict.cert_days_left, Some(90));
    }
}
