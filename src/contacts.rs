//! In-memory contact store and its two filter queries.
//!
//! The store holds the contact list materialized by the most recent import
//! (wholly replaced each time, never merged) and answers the display filter
//! and the send filter. Both queries are pure over the current list.

use crate::cache;
use crate::config::Config;
use crate::dispatch::format_phone;
use crate::models::{Contact, ElapsedDays};
use anyhow::Result;

/// Ordered sequence of contacts from the last import. Order is row order,
/// then per-row phone-column order, then per-cell extraction order.
#[derive(Debug, Default)]
pub struct ContactBook {
    contacts: Vec<Contact>,
}

impl ContactBook {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Display filter: everything when unset, otherwise exact equality on
    /// elapsed days.
    pub fn for_display(&self, filter: Option<i64>) -> Vec<&Contact> {
        match filter {
            None => self.contacts.iter().collect(),
            Some(days) => self
                .contacts
                .iter()
                .filter(|c| c.days.matches(days))
                .collect(),
        }
    }

    /// Send filter: the configured value wins over the ad-hoc one, which
    /// wins over "everyone". Equality only, no ranges.
    pub fn for_dispatch(&self, configured: Option<i64>, ad_hoc: Option<i64>) -> Vec<&Contact> {
        self.for_display(configured.or(ad_hoc))
    }

    /// Distinct elapsed-days values present, ascending, `Unknown` last.
    /// Shown after an import so the operator can sanity-check the data.
    pub fn distinct_days(&self) -> Vec<ElapsedDays> {
        let mut known: Vec<i64> = Vec::new();
        let mut has_unknown = false;
        for c in &self.contacts {
            match c.days {
                ElapsedDays::Known(n) => {
                    if !known.contains(&n) {
                        known.push(n);
                    }
                }
                ElapsedDays::Unknown => has_unknown = true,
            }
        }
        known.sort_unstable();
        let mut out: Vec<ElapsedDays> = known.into_iter().map(ElapsedDays::Known).collect();
        if has_unknown {
            out.push(ElapsedDays::Unknown);
        }
        out
    }
}

/// `followup list`: print the cached contacts, optionally narrowed to one
/// elapsed-days value.
pub fn run_list(config: &Config, days: Option<i64>) -> Result<()> {
    let book = ContactBook::new(cache::load_contacts(&config.cache.path)?);
    let shown = book.for_display(days);

    match days {
        Some(d) => println!("contacts ({} days): {} / {}", d, shown.len(), book.len()),
        None => println!("contacts: {}", book.len()),
    }
    for contact in &shown {
        println!(
            "  {}  +{}  {} days",
            contact.name,
            format_phone(&contact.phone, &config.whatsapp.country_code),
            contact.days
        );
    }
    if shown.is_empty() {
        match days {
            Some(d) => println!("  (no contacts with {} days)", d),
            None => println!("  (no contacts imported yet)"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, phone: &str, days: ElapsedDays) -> Contact {
        Contact {
            name: name.to_string(),
            phone: phone.to_string(),
            days,
        }
    }

    fn sample_book() -> ContactBook {
        ContactBook::new(vec![
            contact("Ana", "3001234567", ElapsedDays::Known(30)),
            contact("Luis", "3007654321", ElapsedDays::Known(7)),
            contact("Marta", "3110000000", ElapsedDays::Known(30)),
            contact("Nora", "3220000000", ElapsedDays::Unknown),
        ])
    }

    #[test]
    fn display_unfiltered_returns_all() {
        let book = sample_book();
        assert_eq!(book.for_display(None).len(), 4);
    }

    #[test]
    fn display_filter_is_exact_equality() {
        let book = sample_book();
        let shown = book.for_display(Some(30));
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|c| c.days == ElapsedDays::Known(30)));
    }

    #[test]
    fn unknown_days_never_match_a_filter() {
        let book = sample_book();
        // Nora has an unparsable days cell; a filter of 0 must not pick her up
        assert!(book.for_display(Some(0)).is_empty());
    }

    #[test]
    fn configured_filter_wins_over_ad_hoc() {
        let book = sample_book();
        let selected = book.for_dispatch(Some(30), Some(7));
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|c| c.days == ElapsedDays::Known(30)));
    }

    #[test]
    fn ad_hoc_filter_used_when_no_configured_value() {
        let book = sample_book();
        let selected = book.for_dispatch(None, Some(7));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Luis");
    }

    #[test]
    fn no_filters_means_everyone() {
        let book = sample_book();
        assert_eq!(book.for_dispatch(None, None).len(), 4);
    }

    #[test]
    fn dispatch_order_preserves_store_order() {
        let book = sample_book();
        let selected = book.for_dispatch(Some(30), None);
        let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Marta"]);
    }

    #[test]
    fn distinct_days_sorted_with_unknown_last() {
        let book = sample_book();
        assert_eq!(
            book.distinct_days(),
            vec![
                ElapsedDays::Known(7),
                ElapsedDays::Known(30),
                ElapsedDays::Unknown
            ]
        );
    }
}
