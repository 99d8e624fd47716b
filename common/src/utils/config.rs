use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStoreKind {
    #[default]
    Memory,
    Surrealdb,
    Redis,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DispatchKind {
    /// In-process bounded queue drained by the worker loop.
    #[default]
    Channel,
    /// POST to the background endpoint of `callback_base_url`.
    Http,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_search_model")]
    pub search_model: String,
    pub http_port: u16,
    #[serde(default)]
    pub job_store: JobStoreKind,
    #[serde(default = "default_surrealdb_address")]
    pub surrealdb_address: String,
    #[serde(default = "default_surrealdb_credential")]
    pub surrealdb_username: String,
    #[serde(default = "default_surrealdb_credential")]
    pub surrealdb_password: String,
    #[serde(default = "default_surrealdb_namespace")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_surrealdb_database")]
    pub surrealdb_database: String,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
    #[serde(default)]
    pub dispatch: DispatchKind,
    #[serde(default)]
    pub callback_base_url: Option<String>,
    #[serde(default)]
    pub worker_secret: Option<String>,
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_dispatch_attempts")]
    pub dispatch_attempts: usize,
    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_sweep_secs: u64,
}

impl AppConfig {
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_secs.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            search_model: default_search_model(),
            http_port: 8888,
            job_store: JobStoreKind::default(),
            surrealdb_address: default_surrealdb_address(),
            surrealdb_username: default_surrealdb_credential(),
            surrealdb_password: default_surrealdb_credential(),
            surrealdb_namespace: default_surrealdb_namespace(),
            surrealdb_database: default_surrealdb_database(),
            redis_url: None,
            job_ttl_secs: default_job_ttl_secs(),
            dispatch: DispatchKind::default(),
            callback_base_url: None,
            worker_secret: None,
            search_timeout_secs: default_search_timeout_secs(),
            worker_concurrency: default_worker_concurrency(),
            queue_capacity: default_queue_capacity(),
            dispatch_attempts: default_dispatch_attempts(),
            expiry_sweep_secs: default_expiry_sweep_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_search_model() -> String {
    "gpt-4o-mini-search-preview".to_string()
}

fn default_surrealdb_address() -> String {
    "mem://".to_string()
}

fn default_surrealdb_credential() -> String {
    "root".to_string()
}

fn default_surrealdb_namespace() -> String {
    "recovery".to_string()
}

fn default_surrealdb_database() -> String {
    "jobs".to_string()
}

fn default_job_ttl_secs() -> u64 {
    600
}

fn default_search_timeout_secs() -> u64 {
    300
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_dispatch_attempts() -> usize {
    3
}

fn default_expiry_sweep_secs() -> u64 {
    60
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
