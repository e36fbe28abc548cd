//! Mock 事件源
//!
//! 用于无传感器环境的测试：
//! - `ManualSource`：由测试线程手动推送事件
//! - `MockDetectorSource`：后台线程按频率产生手势帧
//! - `MockTrackedSource`：后台线程循环推送脚本化的跟踪集合
//! - `MockDetectorFactory`：为每个槽位创建 `MockDetectorSource`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use contracts::{
    ContinuousGestureResult, ContractError, DetectorFactory, DetectorSource,
    DiscreteGestureResult, EventCallback, EventSource, FrameEvent, Gesture, GestureFrame,
    GestureKind, GestureResult, GestureResults, SlotBindings, SlotIndex, SourceEvent, TrackedSet,
};
use tracing::{debug, trace};

use crate::error::IngestionError;

struct ManualShared<T> {
    callback: Mutex<Option<EventCallback<T>>>,
    listening: AtomicBool,
    stop_count: AtomicUsize,
}

/// 手动驱动的事件源
pub struct ManualSource<T> {
    source_id: String,
    shared: Arc<ManualShared<T>>,
}

/// `ManualSource` 的推送句柄，可跨线程克隆
pub struct ManualSourceHandle<T> {
    shared: Arc<ManualShared<T>>,
}

impl<T> Clone for ManualSourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> ManualSource<T> {
    pub fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            shared: Arc::new(ManualShared {
                callback: Mutex::new(None),
                listening: AtomicBool::new(false),
                stop_count: AtomicUsize::new(0),
            }),
        }
    }

    pub fn handle(&self) -> ManualSourceHandle<T> {
        ManualSourceHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<T> ManualSourceHandle<T> {
    /// 推送一个元素；未监听时返回 `false`，元素被丢弃
    pub fn emit(&self, item: T) -> bool {
        self.deliver(SourceEvent::Next(item))
    }

    /// 推送完成信号
    pub fn complete(&self) -> bool {
        self.deliver(SourceEvent::Completed)
    }

    /// 推送故障信号
    pub fn fail(&self, reason: &str) -> bool {
        self.deliver(SourceEvent::Failed(reason.to_string()))
    }

    pub fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::SeqCst)
    }

    /// `stop()` 实际生效的次数
    pub fn stop_count(&self) -> usize {
        self.shared.stop_count.load(Ordering::SeqCst)
    }

    fn deliver(&self, event: SourceEvent<T>) -> bool {
        let callback = self
            .shared
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) if self.is_listening() => {
                callback(event);
                true
            }
            _ => false,
        }
    }
}

impl<T: Send + 'static> EventSource<T> for ManualSource<T> {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: EventCallback<T>) {
        if self.shared.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self
            .shared
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn stop(&self) {
        if self.shared.listening.swap(false, Ordering::SeqCst) {
            self.shared.stop_count.fetch_add(1, Ordering::SeqCst);
            self.shared
                .callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
    }

    fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::SeqCst)
    }
}

/// 帧资源账本：记录获取与释放次数
#[derive(Debug, Default)]
pub struct FrameLedger {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl FrameLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 创建帧并挂上释放计数钩子
    pub fn track(self: &Arc<Self>, frame: GestureFrame) -> GestureFrame {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let ledger = self.clone();
        frame.with_release(move || {
            ledger.released.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// 尚未释放的帧数
    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

/// Mock 检测器配置
#[derive(Debug, Clone)]
pub struct MockDetectorConfig {
    /// 发送频率 (Hz)
    pub frequency_hz: f64,

    /// 每隔多少个事件产生一次空事件（无帧），0 表示从不
    pub missing_every: u64,

    /// 发送多少个事件后报告完成，None 表示不限
    pub max_events: Option<u64>,
}

impl Default for MockDetectorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 30.0,
            missing_every: 0,
            max_events: None,
        }
    }
}

/// 频率转换为发送间隔；非有限正数视为非法
fn tick_interval(source_id: &str, frequency_hz: f64) -> Result<Duration, IngestionError> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(IngestionError::InvalidFrequency {
            source_id: source_id.to_string(),
            frequency_hz,
        });
    }
    Duration::try_from_secs_f64(1.0 / frequency_hz).map_err(|_| IngestionError::InvalidFrequency {
        source_id: source_id.to_string(),
        frequency_hz,
    })
}

/// 后台生产线程的运行标志
///
/// `stop` 推进代数，旧线程醒来后发现代数变化即退出，
/// 因此 `stop` 之后立即重新 `listen` 不会留下两个生产线程。
#[derive(Debug, Default)]
struct Worker {
    listening: AtomicBool,
    generation: AtomicU64,
}

impl Worker {
    /// 开启新一代；已在运行时返回 `None`
    fn start(&self) -> Option<u64> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.generation.load(Ordering::SeqCst))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.listening.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

/// Mock 检测器
///
/// 在后台线程按频率产生帧，帧上标记产生时槽位的绑定。
pub struct MockDetectorSource {
    source_id: String,
    slot: SlotIndex,
    gestures: Vec<Gesture>,
    bindings: SlotBindings,
    config: MockDetectorConfig,
    interval: Duration,
    ledger: Arc<FrameLedger>,
    worker: Arc<Worker>,
}

impl MockDetectorSource {
    pub fn new(
        slot: SlotIndex,
        gestures: Vec<Gesture>,
        bindings: SlotBindings,
        config: MockDetectorConfig,
        ledger: Arc<FrameLedger>,
    ) -> Result<Self, IngestionError> {
        let source_id = format!("detector_{slot}");
        let interval = tick_interval(&source_id, config.frequency_hz)?;
        Ok(Self {
            source_id,
            slot,
            gestures,
            bindings,
            config,
            interval,
            ledger,
            worker: Arc::new(Worker::default()),
        })
    }

    /// 根据帧序号生成确定性的检测结果
    pub fn generate_results(gestures: &[Gesture], frame_id: u64) -> GestureResults {
        let phase = (frame_id % 10) as f32 / 10.0;
        gestures
            .iter()
            .map(|gesture| {
                let result = match gesture.kind {
                    GestureKind::Discrete => GestureResult::Discrete(DiscreteGestureResult {
                        detected: phase >= 0.5,
                        confidence: phase,
                        first_frame_detected: frame_id % 10 == 5,
                    }),
                    GestureKind::Continuous => {
                        GestureResult::Continuous(ContinuousGestureResult { progress: phase })
                    }
                };
                (gesture.clone(), result)
            })
            .collect()
    }

    fn produce(
        slot: SlotIndex,
        gestures: &[Gesture],
        bindings: &SlotBindings,
        ledger: &Arc<FrameLedger>,
        frame_id: u64,
    ) -> GestureFrame {
        let binding = bindings.get(slot).unwrap_or_default();
        let results = if binding.tracking_id.is_assigned() && binding.valid {
            Some(Self::generate_results(gestures, frame_id))
        } else {
            None
        };
        ledger.track(GestureFrame::new(slot, binding, results))
    }
}

impl EventSource<FrameEvent> for MockDetectorSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: EventCallback<FrameEvent>) {
        let Some(generation) = self.worker.start() else {
            return;
        };

        let source_id = self.source_id.clone();
        let slot = self.slot;
        let gestures = self.gestures.clone();
        let bindings = self.bindings.clone();
        let config = self.config.clone();
        let ledger = self.ledger.clone();
        let worker = self.worker.clone();
        let interval = self.interval;

        thread::spawn(move || {
            let mut frame_id: u64 = 0;
            debug!(source_id = %source_id, generation, frequency_hz = config.frequency_hz, "mock detector started");

            while worker.is_current(generation) {
                frame_id += 1;
                let missing = config.missing_every > 0 && frame_id % config.missing_every == 0;
                let event = if missing {
                    None
                } else {
                    Some(Self::produce(slot, &gestures, &bindings, &ledger, frame_id))
                };
                callback(SourceEvent::Next(event));
                trace!(source_id = %source_id, frame_id, missing, "mock frame sent");

                if config.max_events.is_some_and(|max| frame_id >= max) {
                    callback(SourceEvent::Completed);
                    break;
                }
                thread::sleep(interval);
            }

            debug!(source_id = %source_id, "mock detector stopped");
        });
    }

    fn stop(&self) {
        self.worker.stop();
    }

    fn is_listening(&self) -> bool {
        self.worker.is_listening()
    }
}

/// Mock 跟踪集合源，循环推送脚本
pub struct MockTrackedSource {
    source_id: String,
    script: Vec<TrackedSet>,
    interval: Duration,
    worker: Arc<Worker>,
}

impl MockTrackedSource {
    pub fn new(script: Vec<TrackedSet>, frequency_hz: f64) -> Result<Self, IngestionError> {
        let source_id = "body_tracker".to_string();
        let interval = tick_interval(&source_id, frequency_hz)?;
        Ok(Self {
            source_id,
            script,
            interval,
            worker: Arc::new(Worker::default()),
        })
    }
}

impl EventSource<TrackedSet> for MockTrackedSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: EventCallback<TrackedSet>) {
        let Some(generation) = self.worker.start() else {
            return;
        };

        let source_id = self.source_id.clone();
        let script = self.script.clone();
        let worker = self.worker.clone();
        let interval = self.interval;

        thread::spawn(move || {
            debug!(source_id = %source_id, generation, steps = script.len(), "mock tracker started");
            let mut step = script.iter().cycle();
            while worker.is_current(generation) {
                let tracked = step.next().cloned().unwrap_or_default();
                trace!(source_id = %source_id, tracked = tracked.len(), "tracked set sent");
                callback(SourceEvent::Next(tracked));
                thread::sleep(interval);
            }
            debug!(source_id = %source_id, "mock tracker stopped");
        });
    }

    fn stop(&self) {
        self.worker.generation.fetch_add(1, Ordering::SeqCst);
        self.worker.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.worker.listening.load(Ordering::SeqCst)
    }
}

/// Mock 检测器工厂
pub struct MockDetectorFactory {
    config: MockDetectorConfig,
    ledger: Arc<FrameLedger>,
    fail_on_slot: Option<SlotIndex>,
    created: Mutex<HashMap<SlotIndex, usize>>,
}

impl MockDetectorFactory {
    pub fn new(config: MockDetectorConfig) -> Self {
        Self {
            config,
            ledger: FrameLedger::new(),
            fail_on_slot: None,
            created: Mutex::new(HashMap::new()),
        }
    }

    /// 为指定槽位模拟打开失败
    pub fn failing_on(mut self, slot: SlotIndex) -> Self {
        self.fail_on_slot = Some(slot);
        self
    }

    /// 所有检测器共享的帧账本
    pub fn ledger(&self) -> Arc<FrameLedger> {
        self.ledger.clone()
    }

    /// 每个槽位传入的手势数量
    pub fn gestures_per_slot(&self) -> HashMap<SlotIndex, usize> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DetectorFactory for MockDetectorFactory {
    fn create_detector(
        &self,
        slot: SlotIndex,
        gestures: &[Gesture],
        bindings: SlotBindings,
    ) -> Result<DetectorSource, ContractError> {
        if self.fail_on_slot == Some(slot) {
            return Err(ContractError::factory(slot, "mock detector unavailable"));
        }
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, gestures.len());
        let source = MockDetectorSource::new(
            slot,
            gestures.to_vec(),
            bindings,
            self.config.clone(),
            self.ledger.clone(),
        )
        .map_err(|e| ContractError::factory(slot, e.to_string()))?;
        Ok(Box::new(source))
    }
}
