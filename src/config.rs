use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::template::NAME_PLACEHOLDER;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub whatsapp: WhatsappConfig,
    #[serde(default)]
    pub message: MessageConfig,
    #[serde(default)]
    pub send: SendConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// WhatsApp Cloud API credentials and the dial prefix for bare local numbers.
#[derive(Debug, Deserialize, Clone)]
pub struct WhatsappConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub phone_id: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            phone_id: String::new(),
            country_code: default_country_code(),
        }
    }
}

fn default_country_code() -> String {
    "57".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessageConfig {
    /// Message template; `{name}` is replaced with the contact's name.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

fn default_template() -> String {
    "Hello {name},\n\nit has been 30 days since your last visit.\n\nWould you like to book a new appointment?\n\nThank you!".to_string()
}

/// Configured send filter. When set it overrides any ad-hoc `--days` flag.
/// The ad-hoc value itself is CLI-only on purpose: it must never survive a
/// session, or a scheduled send would silently reuse a stale filter.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SendConfig {
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Daily firing time, wall clock, `HH:MM`.
    #[serde(default = "default_schedule_time")]
    pub time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: default_schedule_time(),
        }
    }
}

fn default_schedule_time() -> String {
    "08:00".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Where the imported contact list is cached between runs.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./contacts.json")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !config.message.template.contains(NAME_PLACEHOLDER) {
        bail!(
            "message.template must contain the {} placeholder",
            NAME_PLACEHOLDER
        );
    }

    if config.whatsapp.country_code.is_empty()
        || !config
            .whatsapp
            .country_code
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        bail!("whatsapp.country_code must be a non-empty digit string");
    }

    // Validates early so `followup schedule` cannot arm with a bad time
    parse_schedule_time(&config.schedule.time)?;

    Ok(config)
}

/// Parses `HH:MM` into (hour, minute), 24-hour clock.
pub fn parse_schedule_time(time: &str) -> Result<(u32, u32)> {
    let (h, m) = time
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("schedule.time must be HH:MM, got '{}'", time))?;
    let hour: u32 = h
        .parse()
        .with_context(|| format!("invalid hour in schedule.time '{}'", time))?;
    let minute: u32 = m
        .parse()
        .with_context(|| format!("invalid minute in schedule.time '{}'", time))?;
    if hour > 23 || minute > 59 {
        bail!("schedule.time out of range: '{}'", time);
    }
    Ok((hour, minute))
}

/// `followup init`: writes a commented starter config. Refuses to overwrite
/// unless forced.
pub fn scaffold_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let template = r#"# followup configuration

[whatsapp]
# Permanent access token from Meta Business Suite (starts with "EAA...").
token = ""
# Phone Number ID from WhatsApp Manager (the ID, not the phone number).
phone_id = ""
# Dial prefix prepended to bare 10-digit numbers.
country_code = "57"

[message]
# {name} is replaced with the contact's name (first occurrence only).
template = """
Hello {name},

it has been 30 days since your last visit.

Would you like to book a new appointment?

Thank you!"""

[send]
# Optional: only message contacts with exactly this many elapsed days.
# When set it overrides the --days flag. Leave commented to send to all.
# days = 30

[schedule]
# Daily send time for `followup schedule` (24h wall clock).
time = "08:00"

[cache]
# Imported contacts are kept here so a restart does not need a re-import.
path = "./contacts.json"
"#;

    std::fs::write(path, template)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
