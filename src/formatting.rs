// src/formatting.rs

use crate::core::RunReport;

/// Prefix of Microsoft Teams incoming webhook URLs.
const TEAMS_WEBHOOK_PREFIX: &str = "https://outlook.office.com";

/// A trait for formatting a run report into a single message.
pub trait TextFormatter: Send + Sync {
    fn format_report(&self, report: &RunReport) -> String;
}

/// Plain-text summary, one statistic per line.
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format_report(&self, report: &RunReport) -> String {
        let summary = &report.summary;
        let mut message = format!(
            "*Results from NoiseWatch the last {} days*\n\
             Amount of Noisy IPs: {}\n\
             Non Noisy IPs: {}\n\
             Top Classifications: {}\n\
             Top Names: {}\n",
            report.max_age_days,
            summary.noisy_count,
            summary.non_noisy_count,
            join_or_none(&summary.top_classifications),
            join_or_none(&summary.top_actor_names),
        );
        if report.failed_lookups > 0 || report.unprocessed > 0 {
            message.push_str(&format!(
                "Lookups failed: {}, not attempted: {} (of {} addresses)\n",
                report.failed_lookups, report.unprocessed, report.addresses_scanned
            ));
        }
        message
    }
}

/// Teams collapses single newlines, so every row gets a blank line after it.
/// Other webhook targets receive the message untouched.
pub fn adapt_for_webhook(message: &str, webhook_url: &str) -> String {
    if !webhook_url.starts_with(TEAMS_WEBHOOK_PREFIX) {
        return message.to_string();
    }
    message.split('\n').map(|line| format!("{line}\n\n")).collect()
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}
