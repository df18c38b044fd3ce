use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{tick, unbounded, Receiver, Sender};

use crate::post::Post;
use crate::service::FeedService;

#[derive(Debug)]
pub enum FeedEvent {
    Posts(Vec<Post>),
    Error(String),
}

/// Background fetch loop: one fetch at startup, then one per interval tick
/// or refresh signal. A failed fetch surfaces as an `Error` event and the
/// next tick retries implicitly; there is no backoff.
pub struct Poller {
    refresh: Sender<()>,
    stop: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Poller {
    pub fn spawn(
        service: Arc<dyn FeedService>,
        limit: usize,
        interval: Duration,
        events: Sender<FeedEvent>,
    ) -> Self {
        Self::spawn_with_ticks(service, limit, tick(interval), events)
    }

    /// The tick source is injected so tests can drive time by hand.
    pub fn spawn_with_ticks(
        service: Arc<dyn FeedService>,
        limit: usize,
        ticks: Receiver<Instant>,
        events: Sender<FeedEvent>,
    ) -> Self {
        let (refresh_tx, refresh_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();
        let handle =
            thread::spawn(move || run_loop(service, limit, ticks, refresh_rx, stop_rx, events));
        Self {
            refresh: refresh_tx,
            stop: stop_tx,
            handle: Some(handle),
        }
    }

    /// Requests an immediate out-of-band fetch, e.g. right after a submit.
    pub fn refresh(&self) {
        let _ = self.refresh.send(());
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(
    service: Arc<dyn FeedService>,
    limit: usize,
    ticks: Receiver<Instant>,
    refresh: Receiver<()>,
    stop: Receiver<()>,
    events: Sender<FeedEvent>,
) {
    fetch_once(service.as_ref(), limit, &events);
    loop {
        crossbeam_channel::select! {
            recv(stop) -> _ => break,
            recv(ticks) -> msg => match msg {
                Ok(_) => fetch_once(service.as_ref(), limit, &events),
                Err(_) => break,
            },
            recv(refresh) -> msg => match msg {
                Ok(_) => fetch_once(service.as_ref(), limit, &events),
                Err(_) => break,
            },
        }
    }
}

fn fetch_once(service: &dyn FeedService, limit: usize, events: &Sender<FeedEvent>) {
    match service.fetch_page(limit) {
        Ok(posts) => {
            let _ = events.send(FeedEvent::Posts(posts));
        }
        Err(err) => {
            let _ = events.send(FeedEvent::Error(format!("{:#}", err)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockFeedService;

    const WAIT: Duration = Duration::from_secs(2);
    const SETTLE: Duration = Duration::from_millis(100);

    fn post(postid: i64) -> Post {
        Post {
            msg: format!("post {}", postid),
            uid: "usera".into(),
            txtime: postid as f64,
            rxtime: 0.0,
            postid,
            perms: 2,
            hashid: Some(format!("hash-{}", postid)),
        }
    }

    #[test]
    fn fetches_once_at_startup() {
        let service = Arc::new(MockFeedService::with_pages(vec![vec![post(1)]]));
        let (tick_tx, tick_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let _keep_ticks_open = tick_tx;

        let poller =
            Poller::spawn_with_ticks(service.clone(), 10, tick_rx, event_tx);

        match event_rx.recv_timeout(WAIT).unwrap() {
            FeedEvent::Posts(posts) => assert_eq!(posts.len(), 1),
            FeedEvent::Error(err) => panic!("unexpected error: {}", err),
        }
        assert_eq!(service.fetch_count(), 1);
        assert!(event_rx.recv_timeout(SETTLE).is_err());
        drop(poller);
    }

    #[test]
    fn one_tick_means_one_more_fetch() {
        let service = Arc::new(MockFeedService::default());
        let (tick_tx, tick_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let poller = Poller::spawn_with_ticks(service.clone(), 10, tick_rx, event_tx);
        event_rx.recv_timeout(WAIT).unwrap();

        tick_tx.send(Instant::now()).unwrap();
        assert!(matches!(
            event_rx.recv_timeout(WAIT).unwrap(),
            FeedEvent::Posts(_)
        ));
        assert_eq!(service.fetch_count(), 2);
        assert!(event_rx.recv_timeout(SETTLE).is_err());
        drop(poller);
    }

    #[test]
    fn failure_surfaces_and_next_tick_retries() {
        let service = Arc::new(MockFeedService::default());
        service.fail_next_fetch();
        let (tick_tx, tick_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let poller = Poller::spawn_with_ticks(service.clone(), 10, tick_rx, event_tx);

        match event_rx.recv_timeout(WAIT).unwrap() {
            FeedEvent::Error(err) => assert!(err.contains("mock fetch failure")),
            FeedEvent::Posts(_) => panic!("expected the startup fetch to fail"),
        }

        tick_tx.send(Instant::now()).unwrap();
        assert!(matches!(
            event_rx.recv_timeout(WAIT).unwrap(),
            FeedEvent::Posts(_)
        ));
        assert_eq!(service.fetch_count(), 2);
        drop(poller);
    }

    #[test]
    fn refresh_triggers_out_of_band_fetch() {
        let service = Arc::new(MockFeedService::default());
        let (_tick_tx, tick_rx) = unbounded::<Instant>();
        let (event_tx, event_rx) = unbounded();

        let poller = Poller::spawn_with_ticks(service.clone(), 10, tick_rx, event_tx);
        event_rx.recv_timeout(WAIT).unwrap();

        poller.refresh();
        event_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(service.fetch_count(), 2);
    }
}
