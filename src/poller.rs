//! Background refresh of the top-3 keyword ranking.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{RankingItem, SphereApi};

pub const MAX_KEYWORDS: usize = 3;

/// Last successfully fetched ranking. Empty and unstamped until the first success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordBoard {
    pub items: Vec<RankingItem>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl KeywordBoard {
    /// False means the renderer should show a placeholder.
    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }
}

struct Running {
    cancel: CancellationToken,
    ticker: JoinHandle<()>,
}

pub struct KeywordPoller<A> {
    api: Arc<A>,
    period: Duration,
    board: Arc<watch::Sender<KeywordBoard>>,
    running: Mutex<Option<Running>>,
}

impl<A> KeywordPoller<A> {
    pub fn subscribe(&self) -> watch::Receiver<KeywordBoard> {
        self.board.subscribe()
    }

    pub fn board(&self) -> KeywordBoard {
        self.board.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Cancels the schedule. Fetches still in flight are dropped or ignored.
    pub fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return;
        };

        // Cancel while holding the board lock so no apply can interleave
        self.board.send_if_modified(|_| {
            running.cancel.cancel();
            false
        });
        running.ticker.abort();
        info!("keyword poller stopped");
    }
}

impl<A: SphereApi + 'static> KeywordPoller<A> {
    pub fn new(api: Arc<A>, period: Duration) -> Self {
        let (board, _) = watch::channel(KeywordBoard::default());
        KeywordPoller {
            api,
            period,
            board: Arc::new(board),
            running: Mutex::new(None),
        }
    }

    /// Fetches once right away, then once per period until [`stop`](Self::stop).
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            debug!("keyword poller already running");
            return;
        }

        let cancel = CancellationToken::new();
        let ticker = tokio::spawn(tick_loop(
            self.api.clone(),
            self.board.clone(),
            cancel.clone(),
            self.period,
        ));
        info!(period_secs = self.period.as_secs(), "keyword poller started");
        *running = Some(Running { cancel, ticker });
    }
}

impl<A> Drop for KeywordPoller<A> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop<A: SphereApi + 'static>(
    api: Arc<A>,
    board: Arc<watch::Sender<KeywordBoard>>,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Each fetch runs on its own so a slow one never holds back the schedule
                tokio::spawn(refresh(api.clone(), board.clone(), cancel.clone()));
            }
        }
    }
}

async fn refresh<A: SphereApi>(
    api: Arc<A>,
    board: Arc<watch::Sender<KeywordBoard>>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => return,
        outcome = api.top3_keywords() => outcome,
    };

    match outcome.map(|envelope| envelope.into_result()) {
        Ok(Ok(items)) => {
            let count = items.len();
            if apply(&board, &cancel, items) {
                debug!(count, "keyword ranking refreshed");
            }
        }
        Ok(Err(rejection)) => {
            warn!(code = %rejection.code, message = %rejection.message, "ranking fetch rejected");
        }
        Err(err) => {
            warn!(error = %err, "ranking fetch failed");
        }
    }
}

/// Replaces the whole board unless the poller was stopped. Returns whether it applied.
fn apply(
    board: &watch::Sender<KeywordBoard>,
    cancel: &CancellationToken,
    items: Vec<RankingItem>,
) -> bool {
    board.send_if_modified(move |b| {
        if cancel.is_cancelled() {
            return false;
        }
        b.items = items.into_iter().take(MAX_KEYWORDS).collect();
        b.fetched_at = Some(Utc::now());
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::api::{AskRequest, AskResult, BaseResponse, Percentage};
    use crate::error::{AppError, Result};

    const PERIOD: Duration = Duration::from_secs(20 * 60);

    #[derive(Default)]
    struct FakeRanking {
        calls: AtomicUsize,
        replies: Mutex<VecDeque<Result<BaseResponse<Vec<RankingItem>>>>>,
        gated: bool,
        entered: Notify,
        release: Notify,
    }

    impl FakeRanking {
        fn replying(replies: Vec<Result<BaseResponse<Vec<RankingItem>>>>) -> Arc<Self> {
            Arc::new(FakeRanking {
                replies: Mutex::new(replies.into()),
                ..FakeRanking::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SphereApi for FakeRanking {
        async fn ask(&self, _request: &AskRequest) -> Result<BaseResponse<AskResult>> {
            unreachable!("poller never asks")
        }

        async fn top3_keywords(&self) -> Result<BaseResponse<Vec<RankingItem>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(AppError::FetchError("no more replies".into())))
        }
    }

    fn item(keyword: &str, pct: &str) -> RankingItem {
        RankingItem {
            keyword: keyword.to_string(),
            percentage: Percentage::Text(pct.to_string()),
        }
    }

    fn three() -> Vec<RankingItem> {
        vec![item("a", "50%"), item("b", "30%"), item("c", "20%")]
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_on_start() {
        let api = FakeRanking::replying(vec![Ok(BaseResponse::success(three()))]);
        let poller = KeywordPoller::new(api.clone(), PERIOD);
        let mut rx = poller.subscribe();
        assert!(!poller.board().is_loaded());

        let started = tokio::time::Instant::now();
        poller.start();
        rx.changed().await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(api.calls(), 1);
        assert_eq!(poller.board().items, three());
        assert!(poller.board().is_loaded());
    }

    #[tokio::test(start_paused = true)]
    async fn success_replaces_whole_list_in_response_order() {
        let two = vec![item("y", "60%"), item("x", "40%")];
        let api = FakeRanking::replying(vec![
            Ok(BaseResponse::success(three())),
            Ok(BaseResponse::success(two.clone())),
        ]);
        let poller = KeywordPoller::new(api.clone(), PERIOD);
        let mut rx = poller.subscribe();

        let started = tokio::time::Instant::now();
        poller.start();
        rx.changed().await.unwrap();
        rx.changed().await.unwrap();

        assert!(started.elapsed() >= PERIOD);
        assert_eq!(api.calls(), 2);
        assert_eq!(poller.board().items, two);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_keep_last_known_good() {
        let api = FakeRanking::replying(vec![
            Ok(BaseResponse::success(three())),
            Err(AppError::FetchError("timed out".into())),
            Ok(BaseResponse::failure("RANK500", "ranking unavailable")),
        ]);
        let poller = KeywordPoller::new(api.clone(), PERIOD);
        let mut rx = poller.subscribe();

        poller.start();
        rx.changed().await.unwrap();
        let cached = poller.board();

        tokio::time::sleep(PERIOD * 2 + PERIOD / 2).await;

        assert_eq!(api.calls(), 3);
        assert_eq!(poller.board(), cached);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_applies_after_stop() {
        let api = Arc::new(FakeRanking {
            gated: true,
            replies: Mutex::new(vec![Ok(BaseResponse::success(three()))].into()),
            ..FakeRanking::default()
        });
        let poller = KeywordPoller::new(api.clone(), PERIOD);

        poller.start();
        api.entered.notified().await;
        poller.stop();
        api.release.notify_one();

        tokio::time::sleep(PERIOD * 3).await;

        assert!(!poller.is_running());
        assert_eq!(api.calls(), 1);
        assert_eq!(poller.board(), KeywordBoard::default());
    }

    #[test]
    fn apply_is_refused_once_cancelled() {
        let (board, _) = watch::channel(KeywordBoard::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!apply(&board, &cancel, three()));
        assert!(!board.borrow().is_loaded());
    }

    #[test]
    fn apply_keeps_at_most_three() {
        let (board, _) = watch::channel(KeywordBoard::default());
        let mut four = three();
        four.push(item("d", "5%"));

        assert!(apply(&board, &CancellationToken::new(), four));
        assert_eq!(board.borrow().items, three());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_restartable() {
        let api = FakeRanking::replying(vec![
            Ok(BaseResponse::success(three())),
            Ok(BaseResponse::success(vec![item("z", "100%")])),
        ]);
        let poller = KeywordPoller::new(api.clone(), PERIOD);
        let mut rx = poller.subscribe();

        poller.start();
        poller.start();
        rx.changed().await.unwrap();
        assert_eq!(api.calls(), 1);

        poller.stop();
        poller.start();
        rx.changed().await.unwrap();
        assert_eq!(api.calls(), 2);
        assert_eq!(poller.board().items, vec![item("z", "100%")]);
    }
}
