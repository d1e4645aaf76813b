use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::routes::HostRoute;

/// One-shot navigation that fires after a delay.
///
/// Dropping the handle cancels the timer, so a view that goes away never
/// navigates late. Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct DeferredNavigation {
    route: HostRoute,
    after: Duration,
    timer: JoinHandle<()>,
    fired: Option<oneshot::Receiver<HostRoute>>,
}

impl DeferredNavigation {
    #[must_use]
    pub fn schedule(route: HostRoute, after: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let payload = route.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(payload);
        });
        debug!(%route, delay_ms = after.as_millis(), "navigation scheduled");
        Self {
            route,
            after,
            timer,
            fired: Some(rx),
        }
    }

    #[must_use]
    pub fn route(&self) -> &HostRoute {
        &self.route
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.after
    }

    /// Wait for the timer. Returns `None` if it was cancelled before firing.
    pub async fn wait(mut self) -> Option<HostRoute> {
        let rx = self.fired.take()?;
        rx.await.ok()
    }

    pub fn cancel(self) {
        debug!(route = %self.route, "navigation cancelled");
    }

    /// Detach the delivery channel, leaving the timer running.
    #[cfg(test)]
    pub(crate) fn take_receiver(&mut self) -> Option<oneshot::Receiver<HostRoute>> {
        self.fired.take()
    }
}

impl Drop for DeferredNavigation {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::oneshot::error::TryRecvError;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let nav = DeferredNavigation::schedule(HostRoute::Home, Duration::from_secs(1));
        let start = tokio::time::Instant::now();
        assert_eq!(nav.wait().await, Some(HostRoute::Home));
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_delivers() {
        let mut nav = DeferredNavigation::schedule(HostRoute::Home, Duration::from_secs(1));
        let mut rx = nav.take_receiver().unwrap();
        nav.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn detached_receiver_still_gets_route_while_handle_lives() {
        let mut nav = DeferredNavigation::schedule(HostRoute::Home, Duration::from_secs(1));
        let mut rx = nav.take_receiver().unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv(), Ok(HostRoute::Home));
        assert_eq!(nav.wait().await, None);
    }
}
