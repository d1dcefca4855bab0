use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Blocking browser-automation capability.
///
/// Locators are XPath expressions evaluated against the current context:
/// the focused tab's document, or the document of the frame entered with
/// [`Browser::switch_to_frame`]. Tab indices follow opening order, `0` being
/// the tab the session started with.
pub trait Browser {
    fn open(&mut self, url: &str) -> anyhow::Result<()>;

    fn refresh(&mut self) -> anyhow::Result<()>;

    /// Polls until an element matches `locator`, `false` once `timeout` runs out.
    fn find_element(&mut self, locator: &str, timeout: Duration) -> anyhow::Result<bool>;

    /// Number of elements currently matching `locator`.
    fn count(&mut self, locator: &str) -> anyhow::Result<usize>;

    /// Text of the first match, `None` if nothing matched within `timeout`.
    fn text(&mut self, locator: &str, timeout: Duration) -> anyhow::Result<Option<String>>;

    /// The `name` attribute of every match, in document order.
    fn attributes(&mut self, locator: &str, name: &str) -> anyhow::Result<Vec<Option<String>>>;

    /// Types into the first match, a trailing `\n` submits.
    fn type_text(&mut self, locator: &str, text: &str) -> anyhow::Result<()>;

    fn click(&mut self, locator: &str, index: usize) -> anyhow::Result<()>;

    /// Runs `script` as a function body receiving `args`, returning its JSON result.
    fn execute_script(&mut self, script: &str, args: &[Value]) -> anyhow::Result<Value>;

    fn scroll_into_view(&mut self, locator: &str, index: usize) -> anyhow::Result<()> {
        self.execute_script(SCROLL_INTO_VIEW, &[locator.into(), index.into()])
            .map(drop)
    }

    fn scroll_by(&mut self, locator: &str, delta: i64) -> anyhow::Result<()> {
        self.execute_script(SCROLL_BY, &[locator.into(), delta.into()])
            .map(drop)
    }

    fn switch_to_frame(&mut self, locator: &str) -> anyhow::Result<()>;

    fn switch_to_default_content(&mut self) -> anyhow::Result<()>;

    fn tab_count(&mut self) -> anyhow::Result<usize>;

    fn switch_to_newest_tab(&mut self) -> anyhow::Result<()>;

    fn switch_to_tab(&mut self, index: usize) -> anyhow::Result<()>;

    fn current_url(&mut self) -> anyhow::Result<String>;

    /// Closes the focused tab, focus falls back to tab `0`.
    fn close_current_tab(&mut self) -> anyhow::Result<()>;

    fn wait(&mut self, duration: Duration);

    fn quit(&mut self) -> anyhow::Result<()>;
}

/// Scripts receive `locate(xpath, index)` from the browser implementation.
const SCROLL_INTO_VIEW: &str = r#"
const el = locate(args[0], args[1]);
if (!el) { throw new Error('No element at ' + args[0] + '[' + args[1] + ']'); }
el.scrollIntoView();
return null;
"#;

const SCROLL_BY: &str = r#"
const el = locate(args[0], 0);
if (!el) { throw new Error('No element at ' + args[0]); }
el.scrollTop = el.scrollTop + args[1];
return el.scrollTop;
"#;

/// Launches browser sessions, one per network identity.
pub trait SessionFactory {
    type Session: Browser;

    fn launch(&mut self, proxy: Option<&Proxy>) -> anyhow::Result<Self::Session>;
}

/// A proxy server address such as `socks5://127.0.0.1:1080`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proxy(pub String);

impl Proxy {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Repeats `probe` every `interval` until it yields a value or `timeout` elapses.
///
/// `probe` always runs at least once.
pub fn poll<B, T, F>(
    browser: &mut B,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> anyhow::Result<Option<T>>
where
    B: Browser + ?Sized,
    F: FnMut(&mut B) -> anyhow::Result<Option<T>>,
{
    let start = Instant::now();
    loop {
        if let Some(found) = probe(browser)? {
            return Ok(Some(found));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        browser.wait(interval);
    }
}
