//! 事件流适配器
//!
//! 基于 `EventSource` trait 的统一适配器实现，将原生推送源包装为可取消的订阅。
//! 适配器不丢弃、不合并事件；取消后到达的事件直接丢弃（帧随之释放）。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{unbounded, Receiver};
use contracts::{EventCallback, EventSource, SourceEvent};
use tracing::{debug, trace, warn};

use crate::config::AdapterMetrics;
use crate::error::{IngestionError, Result};

/// 订阅句柄
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    source_id: String,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// 订阅是否仍然有效
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// 事件流适配器
///
/// 每个适配器同时最多一个活动订阅。
pub struct EventStreamAdapter<T> {
    source_id: String,
    source: Box<dyn EventSource<T>>,
    current: Mutex<Option<(u64, Arc<AtomicBool>)>>,
    next_id: AtomicU64,
    metrics: Arc<AdapterMetrics>,
}

impl<T: Send + 'static> EventStreamAdapter<T> {
    /// 创建新的适配器
    pub fn new(source: Box<dyn EventSource<T>>) -> Self {
        Self {
            source_id: source.source_id().to_string(),
            source,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            metrics: Arc::new(AdapterMetrics::new()),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn metrics(&self) -> Arc<AdapterMetrics> {
        self.metrics.clone()
    }

    /// 是否存在活动订阅
    pub fn is_listening(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|(_, active)| active.load(Ordering::SeqCst))
    }

    /// 订阅事件，`handler` 在原生源的回调线程上被调用
    pub fn subscribe(&self, handler: EventCallback<T>) -> Result<Subscription> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current
            .as_ref()
            .is_some_and(|(_, active)| active.load(Ordering::SeqCst))
        {
            return Err(IngestionError::AlreadyListening {
                source_id: self.source_id.clone(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        *current = Some((id, active.clone()));
        drop(current);

        let counters = self.metrics.clone();
        let source_id = self.source_id.clone();
        let gate = active.clone();

        let callback: EventCallback<T> = Arc::new(move |event| {
            counters.record_received();
            if !gate.load(Ordering::SeqCst) {
                counters.record_discarded();
                metrics::counter!(
                    "gesture_sync_adapter_events_total",
                    "source_id" => source_id.clone(),
                    "status" => "discarded"
                )
                .increment(1);
                trace!(source_id = %source_id, "event after cancel discarded");
                return;
            }
            match &event {
                SourceEvent::Next(_) => {}
                SourceEvent::Completed => counters.record_completion(),
                SourceEvent::Failed(reason) => {
                    counters.record_fault();
                    warn!(source_id = %source_id, reason = %reason, "source failed");
                }
            }
            counters.record_forwarded();
            metrics::counter!(
                "gesture_sync_adapter_events_total",
                "source_id" => source_id.clone(),
                "status" => "forwarded"
            )
            .increment(1);
            handler(event);
        });

        debug!(source_id = %self.source_id, subscription_id = id, "subscribing");
        self.source.listen(callback);

        Ok(Subscription {
            id,
            source_id: self.source_id.clone(),
            active,
        })
    }

    /// 以惰性序列形式订阅：事件进入无界通道，由消费者 `recv().await` 拉取
    pub fn subscribe_channel(&self) -> Result<(Subscription, Receiver<SourceEvent<T>>)> {
        let (tx, rx) = unbounded();
        let counters = self.metrics.clone();
        let source_id = self.source_id.clone();

        let subscription = self.subscribe(Arc::new(move |event| {
            if tx.try_send(event).is_err() {
                counters.record_discarded();
                trace!(source_id = %source_id, "receiver dropped, event discarded");
            }
        }))?;

        Ok((subscription, rx))
    }

    /// 取消订阅并停止原生源（幂等）
    pub fn cancel(&self, subscription: &Subscription) -> Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some((id, _)) if *id == subscription.id => {}
            _ if !subscription.is_active() => return Ok(()),
            _ => {
                return Err(IngestionError::NotListening {
                    source_id: self.source_id.clone(),
                    subscription_id: subscription.id,
                })
            }
        }

        if subscription.active.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source_id, subscription_id = subscription.id, "cancelling");
            self.source.stop();
        }
        *current = None;
        Ok(())
    }

    /// 取消当前订阅（若有）
    pub fn cancel_current(&self) {
        let taken = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((id, active)) = taken {
            if active.swap(false, Ordering::SeqCst) {
                debug!(source_id = %self.source_id, subscription_id = id, "cancelling");
                self.source.stop();
            }
        }
    }
}

impl<T> Drop for EventStreamAdapter<T> {
    fn drop(&mut self) {
        let current = self
            .current
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((_, active)) = current {
            active.store(false, Ordering::SeqCst);
        }
        if self.source.is_listening() {
            self.source.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ManualSource;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_forwards_events() {
        let source = ManualSource::<u32>::new("numbers");
        let handle = source.handle();
        let adapter = EventStreamAdapter::new(Box::new(source));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = adapter
            .subscribe(Arc::new(move |event| {
                if let SourceEvent::Next(n) = event {
                    sink.lock().unwrap().push(n);
                }
            }))
            .unwrap();

        assert!(handle.emit(1));
        assert!(handle.emit(2));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert!(sub.is_active());
        assert_eq!(adapter.metrics().snapshot().events_forwarded, 2);
    }

    #[test]
    fn test_second_subscription_rejected() {
        let adapter = EventStreamAdapter::new(Box::new(ManualSource::<u32>::new("s")));
        let _sub = adapter.subscribe(Arc::new(|_| {})).unwrap();
        let err = adapter.subscribe(Arc::new(|_| {})).unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyListening { .. }));
    }

    #[test]
    fn test_cancel_is_idempotent_and_stops_source() {
        let source = ManualSource::<u32>::new("s");
        let handle = source.handle();
        let adapter = EventStreamAdapter::new(Box::new(source));

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = adapter
            .subscribe(Arc::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        adapter.cancel(&sub).unwrap();
        adapter.cancel(&sub).unwrap();

        assert!(!sub.is_active());
        assert!(!adapter.is_listening());
        assert_eq!(handle.stop_count(), 1);
        assert!(!handle.emit(3));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resubscribe_after_cancel() {
        let source = ManualSource::<u32>::new("s");
        let handle = source.handle();
        let adapter = EventStreamAdapter::new(Box::new(source));

        let first = adapter.subscribe(Arc::new(|_| {})).unwrap();
        adapter.cancel(&first).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let second = adapter
            .subscribe(Arc::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_ne!(first.id(), second.id());

        handle.emit(9);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_subscription() {
        let source = ManualSource::<&'static str>::new("words");
        let handle = source.handle();
        let adapter = EventStreamAdapter::new(Box::new(source));

        let (sub, rx) = adapter.subscribe_channel().unwrap();
        handle.emit("a");
        handle.complete();

        assert!(matches!(rx.recv().await, Ok(SourceEvent::Next("a"))));
        assert!(matches!(rx.recv().await, Ok(SourceEvent::Completed)));

        adapter.cancel(&sub).unwrap();
        assert_eq!(adapter.metrics().snapshot().completions, 1);
    }
}
