//! Utility functions for building and validating benchmark inputs.
//!
//! This module contains helpers for URL generation from templates, input file
//! parsing, URL validation, and timeout parsing used by config loading and the CLI.

use crate::error::SettleError;
use std::time::Duration;

/// Placeholders substituted by [`generate_urls`]
const PLACEHOLDERS: [&str; 2] = ["{n}", "{}"];

/// Generate `count` URLs from a template.
///
/// Every `{n}` (or `{}`) in the template is replaced by the 1-based item number.
///
/// # Arguments
///
/// * `template` - URL template, e.g. `https://api.example.com/items/{n}`
/// * `count` - Number of URLs to generate
///
/// # Errors
///
/// Returns `SettleError::InvalidUrl` if the template has no placeholder.
pub fn generate_urls(template: &str, count: usize) -> Result<Vec<String>, SettleError> {
    let template = template.trim();

    if !has_placeholder(template) {
        return Err(SettleError::invalid_url(
            template,
            "Template must contain a '{n}' or '{}' placeholder",
        ));
    }

    Ok((1..=count)
        .map(|n| {
            let n = n.to_string();
            PLACEHOLDERS
                .iter()
                .fold(template.to_string(), |url, placeholder| {
                    url.replace(placeholder, &n)
                })
        })
        .collect())
}

/// Whether a URL template contains a substitution placeholder.
pub fn has_placeholder(template: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| template.contains(p))
}

/// Parse input lines: one entry per line, blank lines and `#` comments skipped.
pub fn parse_input_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Validate that a URL is an absolute http(s) URL with a host.
///
/// This is a basic check; the HTTP client does full parsing on request.
pub fn validate_url(url: &str) -> Result<(), SettleError> {
    let url = url.trim();

    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| SettleError::invalid_url(url, "URL must start with http:// or https://"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(SettleError::invalid_url(url, "URL has no host"));
    }

    if url.chars().any(char::is_whitespace) {
        return Err(SettleError::invalid_url(url, "URL contains whitespace"));
    }

    Ok(())
}

/// Parse a timeout string like "5s", "30s", "2m", "750ms", or bare seconds.
///
/// # Returns
///
/// The parsed duration, or None if parsing fails or the duration is zero.
pub fn parse_timeout(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let duration = if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    };

    duration.filter(|d| !d.is_zero())
}
