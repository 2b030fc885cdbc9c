//! Rejoining the host's match after an invitation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::host::HostGame;

use super::transport::{HostStatus, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub host_addr: SocketAddr,
    /// Probes after the first one
    pub retries: u32,
    pub backoff: Duration,
    pub ping_timeout: Duration,
}

/// Probe the host until it answers or the retries run out.
/// Sleeps `backoff` before every probe.
pub async fn poll_host(transport: &dyn Transport, config: &JoinConfig) -> HostStatus {
    let mut status = HostStatus::Unknown;
    let mut attempts = 0;
    while status != HostStatus::Online && attempts <= config.retries {
        tokio::time::sleep(config.backoff).await;
        attempts += 1;
        status = tokio::time::timeout(
            config.ping_timeout,
            transport.ping_host(config.host_addr, config.ping_timeout),
        )
        .await
        .unwrap_or(HostStatus::Offline);
    }
    status
}

/// Background join attempt; the join is issued whatever the probe says
pub struct JoinTask {
    handle: JoinHandle<HostStatus>,
}

impl JoinTask {
    pub fn spawn(
        runtime: &Handle,
        transport: Arc<dyn Transport>,
        host: Arc<dyn HostGame>,
        config: JoinConfig,
    ) -> Self {
        let handle = runtime.spawn(async move {
            let status = poll_host(transport.as_ref(), &config).await;
            match status {
                HostStatus::Online => info!(addr = %config.host_addr, "Host reachable, joining"),
                _ => warn!(addr = %config.host_addr, ?status, "Host did not answer, joining anyway"),
            }
            host.join_game();
            status
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Final probe status, or None when cancelled
    pub async fn wait(self) -> Option<HostStatus> {
        self.handle.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::host::{Ball, Camera, Vehicle};
    use crate::net::transport::ReceiveCallback;

    struct ScriptedTransport {
        answers: Mutex<Vec<HostStatus>>,
        pings: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(mut answers: Vec<HostStatus>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                pings: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn send_bytes(&self, _bytes: bytes::Bytes) {}
        fn ping_host(&self, _addr: SocketAddr, _timeout: Duration) -> BoxFuture<'static, HostStatus> {
            self.pings.fetch_add(1, Ordering::Relaxed);
            let answer = self.answers.lock().pop().unwrap_or(HostStatus::Offline);
            async move { answer }.boxed()
        }
        fn set_receiver(&self, _callback: ReceiveCallback) {}
    }

    #[derive(Default)]
    struct JoinCounter {
        joins: AtomicUsize,
    }

    impl HostGame for JoinCounter {
        fn is_in_game(&self) -> bool {
            false
        }
        fn is_paused(&self) -> bool {
            false
        }
        fn cars(&self) -> Vec<Arc<dyn Vehicle>> {
            Vec::new()
        }
        fn ball(&self) -> Option<Arc<dyn Ball>> {
            None
        }
        fn camera(&self) -> Option<Camera> {
            None
        }
        fn target_fps(&self) -> Option<f32> {
            None
        }
        fn join_game(&self) {
            self.joins.fetch_add(1, Ordering::Relaxed);
        }
        fn next_game_in_match(&self) {}
    }

    fn config() -> JoinConfig {
        JoinConfig {
            host_addr: ([127, 0, 0, 1], 7777).into(),
            retries: 4,
            backoff: Duration::from_millis(250),
            ping_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_probing_once_online() {
        let transport = ScriptedTransport::new(vec![HostStatus::Offline, HostStatus::Online]);
        let status = poll_host(&transport, &config()).await;
        assert_eq!(status, HostStatus::Online);
        assert_eq!(transport.pings.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_online_host_answers_first_ping() {
        let transport = ScriptedTransport::new(vec![HostStatus::Online]);
        let immediate = JoinConfig {
            backoff: Duration::ZERO,
            ..config()
        };
        let status = tokio_test::block_on(poll_host(&transport, &immediate));
        assert_eq!(status, HostStatus::Online);
        assert_eq!(transport.pings.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_retries() {
        let transport = ScriptedTransport::new(Vec::new());
        let started = tokio::time::Instant::now();
        let status = poll_host(&transport, &config()).await;
        assert_eq!(status, HostStatus::Offline);
        assert_eq!(transport.pings.load(Ordering::Relaxed), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(5 * 250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_joins_even_when_host_silent() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let host = Arc::new(JoinCounter::default());
        let task = JoinTask::spawn(&Handle::current(), transport, host.clone(), config());
        assert_eq!(task.wait().await, Some(HostStatus::Offline));
        assert_eq!(host.joins.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_joins() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let host = Arc::new(JoinCounter::default());
        let task = JoinTask::spawn(&Handle::current(), transport, host.clone(), config());
        task.cancel();
        assert_eq!(task.wait().await, None);
        assert_eq!(host.joins.load(Ordering::Relaxed), 0);
    }
}
