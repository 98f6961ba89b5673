//! Sequential, throttled message dispatch.
//!
//! One outstanding send at a time, a fixed delay between attempts, successes
//! and failures counted per item, and an early abort when the provider
//! reports a credential problem. The throttle is a correctness requirement
//! against the provider's rate limits, not a politeness delay — dispatch must
//! never be parallelized.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::cache;
use crate::config::Config;
use crate::contacts::ContactBook;
use crate::models::Contact;
use crate::report::{Event, EventReporter};
use crate::template::render_message;
use crate::whatsapp::{MessageSender, SendError, WhatsappClient};

/// Fixed delay between consecutive send attempts.
pub const SEND_THROTTLE: Duration = Duration::from_millis(500);

/// Provider error fragments that mean the credential itself is bad. Any
/// match aborts the remaining loop: retrying other contacts with a dead
/// token only burns the rate limit.
const AUTH_ERROR_MARKERS: &[&str] = &["Invalid OAuth", "access token"];

/// Final tally of one dispatch invocation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: u64,
    pub failed: u64,
    /// True when the loop stopped early on an authentication failure;
    /// remaining contacts were never attempted.
    pub auth_aborted: bool,
}

/// Prepends the country prefix unless the number already starts with it.
///
/// A plain string-prefix check, not a real country-code validation: a local
/// number that happens to start with the same digits is treated as already
/// prefixed. Idempotent under re-application.
pub fn format_phone(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with(country_code) {
        digits
    } else {
        format!("{}{}", country_code, digits)
    }
}

fn is_auth_error(error: &SendError) -> bool {
    match error {
        SendError::Provider(msg) => AUTH_ERROR_MARKERS.iter().any(|m| msg.contains(m)),
        SendError::Network(_) => false,
    }
}

/// Runs the dispatch loop over an already-filtered contact slice.
///
/// Contacts are messaged strictly in slice order; per-item events reach the
/// reporter in that same order. Fails fast (no network calls) when
/// credentials are missing from the config.
pub async fn run_dispatch(
    contacts: &[Contact],
    config: &Config,
    sender: &dyn MessageSender,
    reporter: &dyn EventReporter,
) -> Result<DispatchReport> {
    if config.whatsapp.token.is_empty() || config.whatsapp.phone_id.is_empty() {
        bail!("WhatsApp credentials missing: set whatsapp.token and whatsapp.phone_id in the config");
    }

    let mut report = DispatchReport::default();

    for (i, contact) in contacts.iter().enumerate() {
        let to = format_phone(&contact.phone, &config.whatsapp.country_code);
        let body = render_message(&config.message.template, &contact.name);

        match sender.send_text(&to, &body).await {
            Ok(()) => {
                report.sent += 1;
                reporter.report(Event::Sent {
                    name: contact.name.clone(),
                    phone: to,
                });
            }
            Err(err) => {
                report.failed += 1;
                reporter.report(Event::SendFailed {
                    name: contact.name.clone(),
                    phone: to,
                    error: err.to_string(),
                });
                if is_auth_error(&err) {
                    report.auth_aborted = true;
                    reporter.report(Event::AuthAborted {
                        error: err.to_string(),
                    });
                    break;
                }
            }
        }

        if i + 1 < contacts.len() {
            tokio::time::sleep(SEND_THROTTLE).await;
        }
    }

    reporter.report(Event::DispatchFinished {
        sent: report.sent,
        failed: report.failed,
    });
    Ok(report)
}

/// `followup send`: load the cached contacts, apply the send filter
/// (configured value > ad-hoc `--days` > everyone), and dispatch.
pub async fn run_send(
    config: &Config,
    ad_hoc_days: Option<i64>,
    dry_run: bool,
    reporter: &dyn EventReporter,
) -> Result<()> {
    let book = ContactBook::new(cache::load_contacts(&config.cache.path)?);
    let selected: Vec<Contact> = book
        .for_dispatch(config.send.days, ad_hoc_days)
        .into_iter()
        .cloned()
        .collect();

    let filter_desc = match (config.send.days, ad_hoc_days) {
        (Some(d), _) => format!("{} days (config)", d),
        (None, Some(d)) => format!("{} days", d),
        (None, None) => "none".to_string(),
    };

    println!("send{}", if dry_run { " (dry-run)" } else { "" });
    println!("  filter: {}", filter_desc);
    println!("  contacts: {}", selected.len());

    if selected.is_empty() {
        println!("  nothing to send");
        println!("ok");
        return Ok(());
    }

    if dry_run {
        for contact in &selected {
            println!(
                "  would send to {} (+{})",
                contact.name,
                format_phone(&contact.phone, &config.whatsapp.country_code)
            );
        }
        println!("ok");
        return Ok(());
    }

    let client = WhatsappClient::new(&config.whatsapp)?;
    let report = run_dispatch(&selected, config, &client, reporter).await?;

    println!("  sent: {}", report.sent);
    println!("  failed: {}", report.failed);
    if report.auth_aborted {
        bail!("authentication failed; dispatch aborted — re-issue the access token and retry");
    }
    println!("ok");
    Ok(())
}
