use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall outcome class for one target in one cycle. Ordering matters:
/// `Error` dominates `Warning` dominates `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProbeSuccess {
    pub status_code: u16,
    pub latency_ms: f64,
    pub final_url: String,
    pub body: Vec<u8>,
    pub attempts: u32,
}

/// Result of one full retry sequence against a target URL.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Success(ProbeSuccess),
    Failure { attempts: u32, message: String },
}

/// What the certificate inspector learned from a direct TLS connection.
/// An `Unavailable` result is advisory only and never blocks reachability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CertificateStatus {
    Inspected {
        days_left: i64,
        expiry_date: String,
        issuer: String,
    },
    Unavailable {
        message: String,
    },
}

impl CertificateStatus {
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Inspected { days_left, .. } if *days_left > 0)
    }
}

/// Per-cycle, per-target evaluation outcome. Built fresh every cycle;
/// `severity` only ever escalates while checks append their messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub target_name: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub latency_ms: Option<f64>,
    pub status_code: Option<u16>,
    pub attempts: Option<u32>,
    pub final_url: Option<String>,
    pub cert_days_left: Option<i64>,
    pub cert_expiry: Option<String>,
}

impl Verdict {
    pub fn new(target_name: &str, url: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            target_name: target_name.to_string(),
            url: url.to_string(),
            timestamp,
            severity: Severity::Ok,
            errors: Vec::new(),
            warnings: Vec::new(),
            latency_ms: None,
            status_code: None,
            attempts: None,
            final_url: None,
            cert_days_left: None,
            cert_expiry: None,
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.severity = self.severity.max(Severity::Error);
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
        self.severity = self.severity.max(Severity::Warning);
    }
}
