use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::charts::ChartSettings;
use crate::data::Dataset;
use crate::filter::FilterOptions;

pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/vqrca/dashboard_salarios_dados/refs/heads/main/dados-imersao-final.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub dataset_url: String,
    /// Local CSV; takes precedence over `dataset_url` when set.
    pub dataset_path: Option<PathBuf>,
    pub bind_addr: String,
    pub focus_title: String,
    pub top_n: usize,
    pub histogram_bins: usize,
    pub fetch_timeout_secs: u64,
    /// Deadline for a client to send its request head.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            dataset_path: None,
            bind_addr: "127.0.0.1:8501".to_string(),
            focus_title: "Data Scientist".to_string(),
            top_n: 10,
            histogram_bins: 30,
            fetch_timeout_secs: 30,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            dataset_url: std::env::var("DATASET_URL").unwrap_or(d.dataset_url),
            dataset_path: std::env::var("DATASET_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(d.bind_addr),
            focus_title: std::env::var("FOCUS_TITLE").unwrap_or(d.focus_title),
            top_n: env_parse::<usize>("TOP_N")
                .filter(|n| *n > 0)
                .unwrap_or(d.top_n),
            histogram_bins: env_parse::<usize>("HISTOGRAM_BINS")
                .filter(|n| *n > 0)
                .unwrap_or(d.histogram_bins),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS").unwrap_or(d.fetch_timeout_secs),
            request_timeout_secs: env_parse::<u64>("REQUEST_TIMEOUT_SECS")
                .filter(|n| *n > 0)
                .unwrap_or(d.request_timeout_secs),
        }
    }

    pub fn chart_settings(&self) -> ChartSettings {
        ChartSettings {
            top_n: self.top_n,
            histogram_bins: self.histogram_bins,
            focus_title: self.focus_title.clone(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read-only state shared by every request: the loaded table and the
/// options derived from it once at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub options: Arc<FilterOptions>,
    pub settings: Arc<ChartSettings>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(dataset: Dataset, cfg: &Config) -> Self {
        let options = FilterOptions::from_dataset(&dataset);
        Self {
            dataset: Arc::new(dataset),
            options: Arc::new(options),
            settings: Arc::new(cfg.chart_settings()),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard() {
        let cfg = Config::default();
        assert_eq!(cfg.top_n, 10);
        assert_eq!(cfg.histogram_bins, 30);
        assert_eq!(cfg.focus_title, "Data Scientist");
        assert!(cfg.dataset_path.is_none());
        assert!(cfg.dataset_url.ends_with(".csv"));
        assert_eq!(cfg.request_timeout_secs, 10);
    }

    #[test]
    fn test_chart_settings_follow_config() {
        let cfg = Config {
            top_n: 3,
            focus_title: "Data Engineer".to_string(),
            ..Config::default()
        };
        let s = cfg.chart_settings();
        assert_eq!(s.top_n, 3);
        assert_eq!(s.histogram_bins, 30);
        assert_eq!(s.focus_title, "Data Engineer");
    }

    #[test]
    fn test_env_parse_trims_and_rejects_garbage() {
        std::env::set_var("SALARYDASH_TEST_ENV_PARSE", " 42 ");
        assert_eq!(env_parse::<u64>("SALARYDASH_TEST_ENV_PARSE"), Some(42));
        std::env::set_var("SALARYDASH_TEST_ENV_PARSE", "forty");
        assert_eq!(env_parse::<u64>("SALARYDASH_TEST_ENV_PARSE"), None);
        std::env::remove_var("SALARYDASH_TEST_ENV_PARSE");
        assert_eq!(env_parse::<u64>("SALARYDASH_TEST_ENV_PARSE"), None);
    }
}
