use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use mapsift_crawler::Proxy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeConfig {
    /// Set to false to watch the crawl in a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_sandbox")]
    pub sandbox: bool,

    #[serde(default = "default_window_size")]
    pub window_size: (u32, u32),

    /// Chrome executable, detected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    #[serde(default)]
    pub chrome_args: Vec<String>,

    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            sandbox: default_sandbox(),
            window_size: default_window_size(),
            chrome_path: None,
            chrome_args: vec![],
            idle_timeout_secs: default_idle_timeout_secs(),
            poll_ms: default_poll_ms(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_sandbox() -> bool {
    true
}

fn default_window_size() -> (u32, u32) {
    (1920, 1080)
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_poll_ms() -> u64 {
    250
}

impl ChromeConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// Command line flags for one launch, routed through `proxy` if any.
    pub fn launch_args(&self, proxy: Option<&Proxy>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.chrome_args.iter().map(OsString::from).collect();
        if let Some(proxy) = proxy {
            args.push(format!("--proxy-server={}", proxy.as_str()).into());
        }
        args
    }
}
