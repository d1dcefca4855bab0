use crate::browser::{Browser, Proxy, SessionFactory};
use crate::error::{CrawlError, Result};

/// Round-robin over the configured proxies.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<Proxy>,
    next: usize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<Proxy>) -> Self {
        Self { proxies, next: 0 }
    }

    /// The next identity, `None` when sessions go out directly.
    pub fn next_proxy(&mut self) -> Option<Proxy> {
        if self.proxies.is_empty() {
            return None;
        }
        let proxy = self.proxies[self.next % self.proxies.len()].clone();
        self.next = (self.next + 1) % self.proxies.len();
        Some(proxy)
    }
}

/// Owns the single live browser session and its proxy identity.
///
/// Rotation quits the old browser before launching the next one, so at most
/// one browser process is alive. A failed launch leaves no session behind and
/// the next [`SessionManager::current`] call tries again.
pub struct SessionManager<F>
where
    F: SessionFactory,
{
    factory: F,
    proxies: ProxyPool,
    landing_url: String,
    session: Option<F::Session>,
    rotations: usize,
}

impl<F> SessionManager<F>
where
    F: SessionFactory,
{
    pub fn new(factory: F, proxies: ProxyPool, landing_url: impl Into<String>) -> Self {
        Self {
            factory,
            proxies,
            landing_url: landing_url.into(),
            session: None,
            rotations: 0,
        }
    }

    /// The live session, launching one if none exists.
    pub fn current(&mut self) -> Result<&mut F::Session> {
        if self.session.is_none() {
            self.establish()?;
        }
        self.session
            .as_mut()
            .ok_or_else(|| CrawlError::NoSession(anyhow::anyhow!("Session vanished")))
    }

    /// Replaces the live session with one behind a fresh proxy.
    pub fn rotate(&mut self) -> Result<&mut F::Session> {
        log::info!("Rotating browser session");
        self.rotations += 1;
        self.teardown();
        self.establish()?;
        self.current()
    }

    /// Full teardown and relaunch, used between targets.
    pub fn reset(&mut self) -> Result<&mut F::Session> {
        log::info!("Resetting browser session");
        self.teardown();
        self.establish()?;
        self.current()
    }

    pub fn shutdown(&mut self) {
        self.teardown();
    }

    pub fn rotations(&self) -> usize {
        self.rotations
    }

    pub fn is_live(&self) -> bool {
        self.session.is_some()
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.quit() {
                log::error!("Failed to quit browser session: {e}");
            }
        }
    }

    fn establish(&mut self) -> Result<()> {
        let proxy = self.proxies.next_proxy();
        match &proxy {
            Some(p) => log::info!("Launching browser session through {}", p.as_str()),
            None => log::info!("Launching browser session without proxy"),
        }
        let mut session = self
            .factory
            .launch(proxy.as_ref())
            .map_err(CrawlError::NoSession)?;
        if let Err(e) = session.open(&self.landing_url) {
            session.quit().ok();
            return Err(CrawlError::NoSession(e));
        }
        self.session = Some(session);
        Ok(())
    }
}

impl<F> Drop for SessionManager<F>
where
    F: SessionFactory,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
