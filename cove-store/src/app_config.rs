use cove_booking::BookingRules;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
    pub business_rules: BusinessRules,
    pub sweep: SweepConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// HS256 secret for signed action links
    pub link_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_response_deadline")]
    pub response_deadline_hours: i64,
    #[serde(default = "default_payment_deadline")]
    pub payment_deadline_hours: i64,
    #[serde(default = "default_minimum_cutoff")]
    pub minimum_cutoff_hours: i64,
    #[serde(default = "default_completion_ttl")]
    pub completion_token_ttl_hours: i64,
    pub link_base_url: String,
    pub payment_success_url: String,
    pub payment_cancel_url: String,
}

fn default_response_deadline() -> i64 { 48 }
fn default_payment_deadline() -> i64 { 24 }
fn default_minimum_cutoff() -> i64 { 48 }
fn default_completion_ttl() -> i64 { 24 * 30 }

impl BusinessRules {
    pub fn booking_rules(&self) -> BookingRules {
        BookingRules {
            response_deadline_hours: self.response_deadline_hours,
            payment_deadline_hours: self.payment_deadline_hours,
            minimum_cutoff_hours: self.minimum_cutoff_hours,
            completion_token_ttl_hours: self.completion_token_ttl_hours,
            link_base_url: self.link_base_url.clone(),
            payment_success_url: self.payment_success_url.clone(),
            payment_cancel_url: self.payment_cancel_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    /// Shared secret the scheduler presents; unset means the deployment
    /// trusts its scheduler boundary and the endpoint is open
    pub secret: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. `COVE__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("COVE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
