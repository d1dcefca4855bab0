use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use headless_chrome::{Browser as Chrome, LaunchOptions, Tab};
use mapsift_crawler::{poll, Browser, Proxy, SessionFactory};
use serde_json::Value;

use crate::config::ChromeConfig;
use crate::script;

/// Launches one Chrome process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeFactory {
    config: ChromeConfig,
}

impl ChromeFactory {
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for ChromeFactory {
    type Session = ChromeSession;

    fn launch(&mut self, proxy: Option<&Proxy>) -> anyhow::Result<ChromeSession> {
        let args = self.config.launch_args(proxy);
        let options = LaunchOptions {
            headless: self.config.headless,
            sandbox: self.config.sandbox,
            window_size: Some(self.config.window_size),
            path: self.config.chrome_path.clone(),
            args: args.iter().map(OsStr::new).collect(),
            idle_browser_timeout: self.config.idle_timeout(),
            ..Default::default()
        };
        let chrome = Chrome::new(options).context("Couldn't launch Chrome")?;
        let home = chrome.wait_for_initial_tab()?;
        log::debug!("Chrome started (pid {:?})", chrome.get_process_id());
        Ok(ChromeSession {
            chrome: Some(chrome),
            current: Some(home),
            frame: None,
            poll_interval: self.config.poll_interval(),
        })
    }
}

/// A live Chrome process driven over the DevTools protocol.
///
/// Frame focus is emulated: scripts resolve their root document from the
/// entered frame locator on every call.
pub struct ChromeSession {
    chrome: Option<Chrome>,
    current: Option<Arc<Tab>>,
    frame: Option<String>,
    poll_interval: Duration,
}

impl ChromeSession {
    fn chrome(&self) -> anyhow::Result<&Chrome> {
        self.chrome.as_ref().ok_or_else(|| anyhow!("Browser session was quit"))
    }

    fn tab(&self) -> anyhow::Result<&Arc<Tab>> {
        self.current.as_ref().ok_or_else(|| anyhow!("Browser session was quit"))
    }

    fn tabs(&self) -> anyhow::Result<Vec<Arc<Tab>>> {
        let tabs = self
            .chrome()?
            .get_tabs()
            .lock()
            .map_err(|_| anyhow!("Tab list lock poisoned"))?;
        Ok(tabs.clone())
    }

    fn focus(&mut self, tab: Arc<Tab>) {
        self.current = Some(tab);
        self.frame = None;
    }

    fn run(&self, body: &str, args: &[Value]) -> anyhow::Result<Value> {
        let expression = script::wrap(body, self.frame.as_deref(), args);
        let result = self.tab()?.evaluate(&expression, false)?;
        script::unwrap_result(result.value)
    }
}

impl Browser for ChromeSession {
    fn open(&mut self, url: &str) -> anyhow::Result<()> {
        let tab = self.tab()?.clone();
        tab.navigate_to(url)?.wait_until_navigated()?;
        self.frame = None;
        Ok(())
    }

    fn refresh(&mut self) -> anyhow::Result<()> {
        self.tab()?.reload(false, None)?;
        self.frame = None;
        Ok(())
    }

    fn find_element(&mut self, locator: &str, timeout: Duration) -> anyhow::Result<bool> {
        let interval = self.poll_interval;
        let found = poll(self, timeout, interval, |b| {
            Ok((b.count(locator)? > 0).then_some(()))
        })?;
        Ok(found.is_some())
    }

    fn count(&mut self, locator: &str) -> anyhow::Result<usize> {
        let n = self.run(script::COUNT, &[locator.into()])?;
        n.as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| anyhow!("Bad element count {n}"))
    }

    fn text(&mut self, locator: &str, timeout: Duration) -> anyhow::Result<Option<String>> {
        let interval = self.poll_interval;
        poll(self, timeout, interval, |b| {
            match b.run(script::TEXT, &[locator.into()])? {
                Value::String(text) => Ok(Some(text)),
                _ => Ok(None),
            }
        })
    }

    fn attributes(&mut self, locator: &str, name: &str) -> anyhow::Result<Vec<Option<String>>> {
        let values = self.run(script::ATTRIBUTES, &[locator.into(), name.into()])?;
        Ok(serde_json::from_value(values)?)
    }

    fn type_text(&mut self, locator: &str, text: &str) -> anyhow::Result<()> {
        self.run(script::FOCUS, &[locator.into()])?;
        let tab = self.tab()?;
        match text.strip_suffix('\n') {
            Some(line) => {
                tab.type_str(line)?.press_key("Enter")?;
            }
            None => {
                tab.type_str(text)?;
            }
        }
        Ok(())
    }

    fn click(&mut self, locator: &str, index: usize) -> anyhow::Result<()> {
        self.run(script::CLICK, &[locator.into(), index.into()])
            .map(drop)
    }

    fn execute_script(&mut self, script: &str, args: &[Value]) -> anyhow::Result<Value> {
        self.run(script, args)
    }

    fn switch_to_frame(&mut self, locator: &str) -> anyhow::Result<()> {
        if self.frame.is_some() {
            bail!("Already inside frame {:?}", self.frame);
        }
        match self.run(script::FRAME_READY, &[locator.into()])? {
            Value::Bool(true) => {
                self.frame = Some(locator.to_string());
                Ok(())
            }
            _ => bail!("No accessible frame at {locator}"),
        }
    }

    fn switch_to_default_content(&mut self) -> anyhow::Result<()> {
        self.frame = None;
        Ok(())
    }

    fn tab_count(&mut self) -> anyhow::Result<usize> {
        Ok(self.tabs()?.len())
    }

    fn switch_to_newest_tab(&mut self) -> anyhow::Result<()> {
        let newest = self
            .tabs()?
            .pop()
            .ok_or_else(|| anyhow!("Browser has no tab"))?;
        self.focus(newest);
        Ok(())
    }

    fn switch_to_tab(&mut self, index: usize) -> anyhow::Result<()> {
        let mut tabs = self.tabs()?;
        if index >= tabs.len() {
            bail!("No tab {index}, {} open", tabs.len());
        }
        self.focus(tabs.swap_remove(index));
        Ok(())
    }

    fn current_url(&mut self) -> anyhow::Result<String> {
        Ok(self.tab()?.get_url())
    }

    fn close_current_tab(&mut self) -> anyhow::Result<()> {
        let tab = self.tab()?.clone();
        let id = tab.get_target_id().clone();
        tab.close(true)?;

        // The tab list only forgets a target once Chrome reports it destroyed
        let start = Instant::now();
        while self.tabs()?.iter().any(|t| *t.get_target_id() == id) {
            if start.elapsed() > Duration::from_secs(5) {
                log::warn!("Tab {id} still listed after closing");
                break;
            }
            thread::sleep(self.poll_interval);
        }
        self.switch_to_tab(0)
    }

    fn wait(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    fn quit(&mut self) -> anyhow::Result<()> {
        self.current = None;
        self.frame = None;
        match self.chrome.take() {
            // Dropping the handle kills the process
            Some(chrome) => {
                log::debug!("Stopping Chrome (pid {:?})", chrome.get_process_id());
                Ok(())
            }
            None => bail!("Browser session was already quit"),
        }
    }
}
