use crate::models::Verdict;

const RULE_WIDTH: usize = 50;

/// Renders the per-target console report for one cycle.
pub fn render(verdict: &Verdict) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{} check report", verdict.target_name));
    lines.push("=".repeat(RULE_WIDTH));
    lines.push(format!("status: {}", verdict.severity));
    lines.push(format!("url: {}", verdict.url));
    lines.push(format!(
        "checked at: {}",
        verdict.timestamp.format("%Y-%m-%d %H:%M:%S")
    ));

    if let Some(latency) = verdict.latency_ms {
        let attempts = match verdict.attempts {
            Some(n) if n > 1 => format!(" ({n} attempts)"),
            _ => String::new(),
        };
        lines.push(format!("response time: {latency}ms{attempts}"));
    }
    if let Some(code) = verdict.status_code {
        lines.push(format!("HTTP status: {code}"));
    }
    if let Some(final_url) = verdict.final_url.as_deref() {
        if final_url != verdict.url {
            lines.push(format!("redirected to: {final_url}"));
        }
    }
    if let (Some(days), Some(expiry)) = (verdict.cert_days_left, verdict.cert_expiry.as_deref()) {
        lines.push(format!("certificate: {days} days left (expires {expiry})"));
    }

    if !verdict.errors.is_empty() {
        lines.push("errors:".to_string());
        for error in &verdict.errors {
            lines.push(format!("  - {error}"));
        }
    }
    if !verdict.warnings.is_empty() {
        lines.push("warnings:".to_string());
        for warning in &verdict.warnings {
            lines.push(format!("  - {warning}"));
        }
    }

    lines.push("=".repeat(RULE_WIDTH));
    lines.join("\n")
}

/// Builds the plain-text body for an alert email.
pub fn render_alert_body(verdict: &Verdict) -> String {
    let format_option = |value: Option<String>| value.unwrap_or_else(|| "n/a".to_string());

    let mut sections = vec![
        "Site monitoring alert".to_string(),
        String::new(),
        format!("Target: {}", verdict.target_name),
        format!("URL: {}", verdict.url),
        format!(
            "Detected at: {}",
            verdict.timestamp.format("%Y-%m-%d %H:%M:%S")
        ),
        format!("Status: {}", verdict.severity),
    ];

    if !verdict.errors.is_empty() {
        sections.push(String::new());
        sections.push("Errors:".to_string());
        for error in &verdict.errors {
            sections.push(format!("  - {error}"));
        }
    }
    if !verdict.warnings.is_empty() {
        sections.push(String::new());
        sections.push("Warnings:".to_string());
        for warning in &verdict.warnings {
            sections.push(format!("  - {warning}"));
        }
    }

    sections.push(String::new());
    sections.push("Technical details:".to_string());
    sections.push(format!(
        "  - response time: {}",
        format_option(verdict.latency_ms.map(|ms| format!("{ms}ms")))
    ));
    sections.push(format!(
        "  - HTTP status: {}",
        format_option(verdict.status_code.map(|code| code.to_string()))
    ));
    sections.push(format!(
        "  - certificate: {}",
        format_option(
            verdict
                .cert_days_left
                .map(|days| format!("{days} days left"))
        )
    ));
    sections.push(String::new());
    sections.push("Please check the service immediately.".to_string());

    sections.join("\n")
}
