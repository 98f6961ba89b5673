//! # Followup
//!
//! Spreadsheet-driven WhatsApp visit reminders.
//!
//! Followup extracts contact records from messy spreadsheet exports,
//! normalizes and deduplicates the phone numbers, filters contacts by days
//! elapsed since their last visit, and dispatches templated messages
//! through the WhatsApp Cloud API — sequentially, throttled, and with an
//! early abort on credential failure. A daily schedule can run the whole
//! send unattended.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ xlsx file │──▶│ materializer │──▶│ contact book │──▶│ dispatch loop │
//! │ (decode)  │   │ (extract)    │   │ + cache      │   │ (throttled)   │
//! └───────────┘   └──────────────┘   └──────┬───────┘   └───────┬───────┘
//!                                           │                   ▼
//!                                      list/filter       WhatsApp Cloud API
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! followup init                                  # write followup.toml
//! followup import clients.xlsx \
//!   --name-col CLIENT --phone-col "PHONE 1" --days-col "DAYS"
//! followup list --days 30                        # preview the filter
//! followup send --days 30                        # dispatch now
//! followup schedule                              # daily at the configured time
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and the `init` scaffold |
//! | [`models`] | Contact, elapsed-days, and column-mapping types |
//! | [`extract`] | 10-digit phone extraction from free-form cells |
//! | [`workbook`] | Minimal xlsx/xlsm decoding |
//! | [`import`] | Row materialization and the import command |
//! | [`contacts`] | Contact store with display and send filters |
//! | [`template`] | `{name}` message rendering |
//! | [`dispatch`] | Sequential throttled send loop |
//! | [`whatsapp`] | WhatsApp Cloud API client |
//! | [`schedule`] | Daily timer (arm/disarm) |
//! | [`cache`] | Contact list persistence |
//! | [`report`] | Structured progress/log events |

pub mod cache;
pub mod config;
pub mod contacts;
pub mod dispatch;
pub mod extract;
pub mod import;
pub mod models;
pub mod report;
pub mod schedule;
pub mod template;
pub mod whatsapp;
pub mod workbook;
