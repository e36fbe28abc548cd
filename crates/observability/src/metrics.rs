//! 同步周期指标收集模块
//!
//! 基于 CycleMeta 收集和统计手势同步管道的运行指标。

use contracts::CycleMeta;
use metrics::{counter, gauge, histogram};

/// 从 CycleMeta 记录指标
///
/// 每次产生 GestureBatch 时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_cycle_metrics;
///
/// while let Some(Ok(batch)) = stream.next().await {
///     record_cycle_metrics(&batch.meta, batch.cycle_id, batch.tracked.len());
/// }
/// ```
pub fn record_cycle_metrics(meta: &CycleMeta, cycle_id: u64, tracked: usize) {
    // 周期计数器
    counter!("gesture_sync_cycles_total").increment(1);

    // 周期 ID (用于检测跳周期)
    gauge!("gesture_sync_last_cycle_id").set(cycle_id as f64);

    // 跟踪实体数
    gauge!("gesture_sync_tracked_entities").set(tracked as f64);
    histogram!("gesture_sync_tracked_entities_hist").record(tracked as f64);

    // 积压深度
    gauge!("gesture_sync_backlog_depth").set(meta.max_backlog as f64);
    histogram!("gesture_sync_backlog_depth_hist").record(meta.max_backlog as f64);

    // 槽位重新绑定
    if !meta.assignments.is_empty() {
        counter!("gesture_sync_cycles_with_rebinding_total").increment(1);
    }

    // 容量不足
    gauge!("gesture_sync_ids_unassigned_current").set(meta.unassigned.len() as f64);
    if !meta.unassigned.is_empty() {
        counter!("gesture_sync_cycles_over_capacity_total").increment(1);
    }

    // 缺失帧
    gauge!("gesture_sync_frames_absent_current").set(f64::from(meta.absent_frames));
    if meta.absent_frames > 0 {
        counter!("gesture_sync_cycles_with_absent_frames_total").increment(1);
    }
}

/// 记录路由到周期任务的事件
pub fn record_event_routed(stream: &str) {
    counter!(
        "gesture_sync_events_routed_total",
        "stream" => stream.to_string()
    )
    .increment(1);
}

/// 记录管道终止原因
pub fn record_pipeline_terminated(reason: &str) {
    counter!(
        "gesture_sync_pipeline_terminated_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录周期处理延迟 (从批次对齐到投影完成)
pub fn record_cycle_latency_ms(latency_ms: f64) {
    histogram!("gesture_sync_cycle_latency_ms").record(latency_ms);
}

/// 周期指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CycleMetricsAggregator {
    /// 总周期数
    pub total_cycles: u64,

    /// 槽位绑定总数
    pub total_assignments: u64,

    /// 槽位释放总数
    pub total_released_slots: u64,

    /// 未分配 ID 总数（按周期累计）
    pub total_unassigned: u64,

    /// 容量不足的周期数
    pub cycles_over_capacity: u64,

    /// 缺失帧总数
    pub total_absent_frames: u64,

    /// 未跟踪帧总数
    pub total_untracked_frames: u64,

    /// 已释放帧总数
    pub total_frames_released: u64,

    /// 积压深度统计
    pub backlog_stats: RunningStats,

    /// 跟踪实体数统计
    pub tracked_stats: RunningStats,

    /// 周期延迟统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl CycleMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, meta: &CycleMeta, tracked: usize) {
        self.total_cycles += 1;
        self.total_assignments += meta.assignments.len() as u64;
        self.total_released_slots += meta.released_slots.len() as u64;
        self.total_unassigned += meta.unassigned.len() as u64;
        if !meta.unassigned.is_empty() {
            self.cycles_over_capacity += 1;
        }
        self.total_absent_frames += u64::from(meta.absent_frames);
        self.total_untracked_frames += u64::from(meta.untracked_frames);
        self.total_frames_released += u64::from(meta.frames_released);

        self.backlog_stats.push(meta.max_backlog as f64);
        self.tracked_stats.push(tracked as f64);
    }

    /// 记录一次周期延迟
    pub fn record_latency_ms(&mut self, latency_ms: f64) {
        self.latency_stats.push(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_cycles: self.total_cycles,
            total_assignments: self.total_assignments,
            total_released_slots: self.total_released_slots,
            total_unassigned: self.total_unassigned,
            total_absent_frames: self.total_absent_frames,
            total_frames_released: self.total_frames_released,
            over_capacity_rate: if self.total_cycles > 0 {
                self.cycles_over_capacity as f64 / self.total_cycles as f64 * 100.0
            } else {
                0.0
            },
            backlog: StatsSummary::from(&self.backlog_stats),
            tracked_entities: StatsSummary::from(&self.tracked_stats),
            cycle_latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_cycles: u64,
    pub total_assignments: u64,
    pub total_released_slots: u64,
    pub total_unassigned: u64,
    pub total_absent_frames: u64,
    pub total_frames_released: u64,
    pub over_capacity_rate: f64,
    pub backlog: StatsSummary,
    pub tracked_entities: StatsSummary,
    pub cycle_latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Gesture Sync Metrics Summary ===")?;
        writeln!(f, "Total cycles: {}", self.total_cycles)?;
        writeln!(
            f,
            "Slot assignments: {} (released: {})",
            self.total_assignments, self.total_released_slots
        )?;
        writeln!(
            f,
            "Unassigned ids: {} ({:.2}% of cycles over capacity)",
            self.total_unassigned, self.over_capacity_rate
        )?;
        writeln!(f, "Absent frames: {}", self.total_absent_frames)?;
        writeln!(f, "Frames released: {}", self.total_frames_released)?;
        writeln!(f, "Backlog depth: {}", self.backlog)?;
        writeln!(f, "Tracked entities: {}", self.tracked_entities)?;
        writeln!(f, "Cycle latency (ms): {}", self.cycle_latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
