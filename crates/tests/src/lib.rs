//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 手动驱动的确定性 e2e 测试（ManualSource）
//! - 基于线程 Mock 源的 e2e 测试

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{EngineConfig, GestureKind};

    #[test]
    fn test_engine_config_round_trip_through_loader() {
        let config = EngineConfig {
            slot_count: 2,
            gesture_kind: GestureKind::Continuous,
            ..Default::default()
        };
        let text = ConfigLoader::to_toml(&config).unwrap();
        let loaded = ConfigLoader::load_engine_config_from_str(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(loaded, config);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, DetectorFactory, DetectorSource, DiscreteGestureResult, EngineConfig,
        FrameEvent, Gesture, GestureBatch, GestureFrame, GestureResult, GestureResults,
        SlotBinding, SlotBindings, SlotIndex, TrackedSet, TrackingId,
    };
    use ingestion::{
        FrameLedger, ManualSource, ManualSourceHandle, MockDetectorConfig, MockDetectorFactory,
        MockTrackedSource,
    };
    use pipeline::{GestureStream, Orchestrator, PipelineError};

    const WAIT: Duration = Duration::from_secs(5);

    /// Factory handing out manually driven detectors
    struct ManualDetectorFactory {
        handles: Mutex<Vec<ManualSourceHandle<FrameEvent>>>,
    }

    impl ManualDetectorFactory {
        fn new() -> Self {
            Self {
                handles: Mutex::new(Vec::new()),
            }
        }

        fn handles(&self) -> Vec<ManualSourceHandle<FrameEvent>> {
            self.handles.lock().unwrap().clone()
        }
    }

    impl DetectorFactory for ManualDetectorFactory {
        fn create_detector(
            &self,
            slot: SlotIndex,
            _gestures: &[Gesture],
            _bindings: SlotBindings,
        ) -> Result<DetectorSource, ContractError> {
            let source = ManualSource::new(&format!("detector_{slot}"));
            self.handles.lock().unwrap().push(source.handle());
            Ok(Box::new(source))
        }
    }

    struct Harness {
        stream: GestureStream,
        detectors: Vec<ManualSourceHandle<FrameEvent>>,
        tracker: ManualSourceHandle<TrackedSet>,
        ledger: Arc<FrameLedger>,
    }

    impl Harness {
        fn start(slot_count: usize) -> Self {
            let factory = ManualDetectorFactory::new();
            let tracker = ManualSource::new("tracker");
            let tracker_handle = tracker.handle();
            let config = EngineConfig {
                slot_count,
                ..Default::default()
            };

            let orchestrator =
                Orchestrator::new(config, &factory, Box::new(tracker), &[wave()]).unwrap();
            let stream = orchestrator.start().unwrap();

            Self {
                stream,
                detectors: factory.handles(),
                tracker: tracker_handle,
                ledger: FrameLedger::new(),
            }
        }

        /// Emit one frame per slot, stamped with the slot's current binding
        fn emit_cycle_frames(&self) {
            let bindings = self.stream.bindings();
            for (slot, handle) in self.detectors.iter().enumerate() {
                let binding = bindings.get(slot).unwrap();
                assert!(handle.emit(self.frame(slot, binding)));
            }
        }

        fn frame(&self, slot: SlotIndex, binding: SlotBinding) -> FrameEvent {
            Some(self.ledger.track(GestureFrame::new(
                slot,
                binding,
                Some(detected_results()),
            )))
        }

        async fn next_batch(&mut self) -> GestureBatch {
            tokio::time::timeout(WAIT, self.stream.next())
                .await
                .expect("timed out waiting for batch")
                .expect("stream ended")
                .expect("pipeline faulted")
        }
    }

    fn wave() -> Gesture {
        Gesture::discrete("wave")
    }

    fn detected_results() -> GestureResults {
        GestureResults::from([(
            wave(),
            GestureResult::Discrete(DiscreteGestureResult {
                detected: true,
                confidence: 0.95,
                first_frame_detected: false,
            }),
        )])
    }

    fn bound_ids(batch: &GestureBatch) -> Vec<u64> {
        batch.bindings.iter().map(|b| b.tracking_id.get()).collect()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    /// Two empty slots pick up both tracked bodies; results follow on the next cycle
    #[tokio::test]
    async fn test_two_slots_bind_and_project() {
        let mut h = Harness::start(2);

        h.tracker.emit(TrackedSet::from_ids([9, 5]));
        h.emit_cycle_frames();
        let first = h.next_batch().await;

        assert_eq!(first.cycle_id, 1);
        assert_eq!(bound_ids(&first), vec![5, 9]);
        assert_eq!(first.meta.assignments.len(), 2);
        // Frames were produced before the slots were bound
        assert!(first.results.iter().all(|r| r.is_empty()));
        assert_eq!(first.meta.untracked_frames, 2);

        h.tracker.emit(TrackedSet::from_ids([5, 9]));
        h.emit_cycle_frames();
        let second = h.next_batch().await;

        assert_eq!(second.cycle_id, 2);
        assert_eq!(bound_ids(&second), vec![5, 9]);
        assert!(second.meta.assignments.is_empty());
        assert!(second
            .results
            .iter()
            .all(|r| r[&wave()].as_discrete().unwrap().detected));

        h.stream.cancel().await.unwrap();
        assert_eq!(h.ledger.outstanding(), 0);
        assert_eq!(h.ledger.acquired(), 4);
    }

    /// A lost body frees its slot for the next unclaimed one
    #[tokio::test]
    async fn test_lost_body_slot_is_reused() {
        let mut h = Harness::start(2);

        h.tracker.emit(TrackedSet::from_ids([5, 9]));
        h.emit_cycle_frames();
        assert_eq!(bound_ids(&h.next_batch().await), vec![5, 9]);

        h.tracker.emit(TrackedSet::from_ids([5, 7]));
        h.emit_cycle_frames();
        let batch = h.next_batch().await;

        assert_eq!(bound_ids(&batch), vec![5, 7]);
        assert!(!batch.results[0].is_empty());
        // Slot 1 still carried identifier 9, which is gone
        assert!(batch.results[1].is_empty());
    }

    /// More bodies than slots: the extra body stays unassigned
    #[tokio::test]
    async fn test_single_slot_overcapacity() {
        let mut h = Harness::start(1);

        h.tracker.emit(TrackedSet::from_ids([5, 9]));
        h.emit_cycle_frames();
        let batch = h.next_batch().await;

        assert_eq!(bound_ids(&batch), vec![5]);
        assert_eq!(batch.meta.unassigned, vec![TrackingId::new(9)]);
        assert_eq!(batch.slot_count(), 1);
    }

    /// A missing frame yields an empty mapping for that slot only
    #[tokio::test]
    async fn test_missing_frame_is_empty_mapping() {
        let mut h = Harness::start(2);

        h.tracker.emit(TrackedSet::from_ids([1, 2]));
        h.emit_cycle_frames();
        h.next_batch().await;

        let bindings = h.stream.bindings();
        h.tracker.emit(TrackedSet::from_ids([1, 2]));
        h.detectors[0].emit(None);
        h.detectors[1].emit(h.frame(1, bindings.get(1).unwrap()));
        let batch = h.next_batch().await;

        assert!(batch.results[0].is_empty());
        assert_eq!(batch.results[1].len(), 1);
        assert_eq!(batch.meta.absent_frames, 1);
    }

    /// No batch is emitted until every detector and the tracker delivered
    #[tokio::test]
    async fn test_waits_for_every_stream() {
        let mut h = Harness::start(3);
        let bindings = h.stream.bindings();

        h.detectors[0].emit(h.frame(0, bindings.get(0).unwrap()));
        h.detectors[0].emit(h.frame(0, bindings.get(0).unwrap()));
        h.detectors[2].emit(h.frame(2, bindings.get(2).unwrap()));
        h.tracker.emit(TrackedSet::from_ids([4]));

        let pending = tokio::time::timeout(Duration::from_millis(100), h.stream.next()).await;
        assert!(pending.is_err(), "batch emitted before slot 1 delivered");

        h.detectors[1].emit(h.frame(1, bindings.get(1).unwrap()));
        let batch = h.next_batch().await;
        assert_eq!(batch.cycle_id, 1);
        assert_eq!(batch.meta.max_backlog, 1);

        let stats = h.stream.cancel().await.unwrap();
        assert_eq!(stats.cycles_emitted, 1);
        // The queued second frame of slot 0 is released on cancel
        assert_eq!(h.ledger.outstanding(), 0);
    }

    /// A detector fault surfaces once, then the stream ends and everything is released
    #[tokio::test]
    async fn test_detector_fault_terminates_stream() {
        let mut h = Harness::start(2);
        let bindings = h.stream.bindings();

        h.tracker.emit(TrackedSet::from_ids([3]));
        h.detectors[0].emit(h.frame(0, bindings.get(0).unwrap()));
        h.detectors[1].fail("sensor unplugged");

        let item = tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .unwrap();
        let err = item.unwrap_err();
        assert!(err.is_upstream_fault());
        assert!(err.to_string().contains("sensor unplugged"));

        assert!(tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .is_none());
        assert_eq!(h.ledger.outstanding(), 0);
        assert!(h.detectors.iter().all(|d| !d.is_listening()));
        assert!(!h.tracker.is_listening());
    }

    /// A tracked-set fault surfaces once, then the stream ends and everything is released
    #[tokio::test]
    async fn test_tracker_fault_terminates_stream() {
        let mut h = Harness::start(2);

        h.emit_cycle_frames();
        h.emit_cycle_frames();
        h.tracker.fail("tracker disconnected");

        let item = tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .unwrap();
        let err = item.unwrap_err();
        assert!(err.is_upstream_fault());
        assert!(err.to_string().contains("tracker disconnected"));

        assert!(tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .is_none());
        assert!(wait_until(|| h.stream.is_terminated()).await);
        assert_eq!(h.ledger.acquired(), 4);
        assert_eq!(h.ledger.outstanding(), 0);
        assert!(h.detectors.iter().all(|d| !d.is_listening()));
        assert_eq!(h.stream.stats().faults, 1);
    }

    /// A detector fault after the detector zip completed does not spoil the pending cycle
    #[tokio::test]
    async fn test_fault_after_detector_completion_is_ignored() {
        let mut h = Harness::start(2);

        h.detectors[0].emit(None);
        h.detectors[1].emit(None);
        h.detectors[0].complete();
        h.detectors[1].fail("late fault");
        h.tracker.emit(TrackedSet::from_ids([1]));

        let batch = h.next_batch().await;
        assert_eq!(batch.cycle_id, 1);
        assert_eq!(batch.meta.absent_frames, 2);
        assert_eq!(bound_ids(&batch), vec![1, 0]);

        assert!(tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .is_none());
        assert_eq!(h.stream.stats().faults, 0);
        assert!(h.detectors.iter().all(|d| !d.is_listening()));
    }

    /// Tracker completion drains fully available cycles, then ends the stream
    #[tokio::test]
    async fn test_tracker_completion_drains_then_ends() {
        let mut h = Harness::start(1);

        h.tracker.emit(TrackedSet::from_ids([1]));
        h.tracker.emit(TrackedSet::from_ids([1]));
        h.tracker.complete();

        h.emit_cycle_frames();
        h.emit_cycle_frames();
        h.next_batch().await;
        let last = h.next_batch().await;
        assert_eq!(last.cycle_id, 2);

        assert!(tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .is_none());
        assert!(wait_until(|| h.stream.is_terminated()).await);

        // Frames arriving after completion are released immediately
        let bindings = h.stream.bindings();
        let late = h.frame(0, bindings.get(0).unwrap());
        assert!(!h.detectors[0].emit(late));
        assert_eq!(h.ledger.outstanding(), 0);
    }

    /// Detector completion with nothing queued ends the stream
    #[tokio::test]
    async fn test_detector_completion_ends_stream() {
        let mut h = Harness::start(2);
        h.detectors[1].complete();
        assert!(tokio::time::timeout(WAIT, h.stream.next())
            .await
            .unwrap()
            .is_none());
    }

    /// Cancel mid-cycle releases held frames and stops every source exactly once
    #[tokio::test]
    async fn test_cancel_releases_partial_cycle() {
        let mut h = Harness::start(2);
        let bindings = h.stream.bindings();

        h.detectors[0].emit(h.frame(0, bindings.get(0).unwrap()));
        h.detectors[0].emit(h.frame(0, bindings.get(0).unwrap()));
        h.tracker.emit(TrackedSet::from_ids([8]));

        h.stream.cancel().await.unwrap();
        h.stream.cancel().await.unwrap();

        assert_eq!(h.ledger.acquired(), 2);
        assert_eq!(h.ledger.outstanding(), 0);
        assert!(h.detectors.iter().all(|d| d.stop_count() == 1));
        assert_eq!(h.tracker.stop_count(), 1);
        assert!(!h.detectors[1].emit(None));
        assert!(h.stream.next().await.is_none());
    }

    /// Dropping the stream cancels the pipeline
    #[tokio::test]
    async fn test_drop_cancels_pipeline() {
        let h = Harness::start(2);
        let bindings = h.stream.bindings();
        h.detectors[1].emit(h.frame(1, bindings.get(1).unwrap()));

        let Harness {
            stream,
            detectors,
            tracker,
            ledger,
        } = h;
        drop(stream);

        assert!(detectors.iter().all(|d| !d.is_listening()));
        assert!(!tracker.is_listening());
        assert!(wait_until(|| ledger.outstanding() == 0).await);
    }

    #[test]
    fn test_construction_failures() {
        let zero = EngineConfig {
            slot_count: 0,
            ..Default::default()
        };
        let err = Orchestrator::new(
            zero,
            &ManualDetectorFactory::new(),
            Box::new(ManualSource::<TrackedSet>::new("tracker")),
            &[wave()],
        )
        .err()
        .unwrap();
        assert!(matches!(err, PipelineError::Construction { .. }));

        let factory = MockDetectorFactory::new(MockDetectorConfig::default()).failing_on(1);
        let err = Orchestrator::new(
            EngineConfig {
                slot_count: 3,
                ..Default::default()
            },
            &factory,
            Box::new(ManualSource::<TrackedSet>::new("tracker")),
            &[wave()],
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            PipelineError::Contract(ContractError::Factory { slot: 1, .. })
        ));
    }

    /// Catalogue filtering feeds only the configured kind to every detector
    #[test]
    fn test_catalogue_kind_filter() {
        let toml = r#"
[[gestures]]
name = "wave"
kind = "discrete"

[[gestures]]
name = "swipe_progress"
kind = "continuous"

[[gestures]]
name = "clap"
"#;
        let catalogue = ConfigLoader::load_catalogue_from_str(toml, ConfigFormat::Toml).unwrap();
        let factory = MockDetectorFactory::new(MockDetectorConfig::default());
        let orchestrator = Orchestrator::with_catalogue(
            EngineConfig {
                slot_count: 2,
                ..Default::default()
            },
            &factory,
            Box::new(ManualSource::<TrackedSet>::new("tracker")),
            &catalogue,
        )
        .unwrap();

        assert_eq!(orchestrator.gestures().len(), 2);
        assert_eq!(factory.gestures_per_slot().get(&0), Some(&2));
        assert_eq!(factory.gestures_per_slot().get(&1), Some(&2));
    }

    /// Threaded mock sources: bindings stay exclusive under concurrent producers
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_threaded_mock_pipeline() {
        let factory = MockDetectorFactory::new(MockDetectorConfig {
            frequency_hz: 200.0,
            missing_every: 7,
            max_events: None,
        });
        let ledger = factory.ledger();
        let tracker = MockTrackedSource::new(
            vec![
                TrackedSet::from_ids([1, 2]),
                TrackedSet::from_ids([1, 2, 3]),
                TrackedSet::from_ids([2, 3]),
            ],
            200.0,
        )
        .unwrap();
        let config = EngineConfig {
            slot_count: 2,
            ..Default::default()
        };

        let orchestrator =
            Orchestrator::new(config, &factory, Box::new(tracker), &[wave()]).unwrap();
        let mut stream = orchestrator.start().unwrap();

        let target = 10u64;
        for expected in 1..=target {
            let batch = tokio::time::timeout(WAIT, stream.next())
                .await
                .expect("timed out")
                .expect("stream ended")
                .expect("pipeline faulted");
            assert_eq!(batch.cycle_id, expected);
            assert_eq!(batch.results.len(), 2);

            let live: Vec<_> = batch
                .bindings
                .iter()
                .filter(|b| b.is_live(&batch.tracked))
                .map(|b| b.tracking_id)
                .collect();
            let mut unique = live.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(live.len(), unique.len(), "identifier bound twice");
            assert_eq!(live.len(), 2.min(batch.tracked.len()));
        }

        let stats = stream.cancel().await.unwrap();
        assert!(stats.cycles_emitted >= target);
        assert!(stats.frames_released > 0);
        assert!(wait_until(|| ledger.outstanding() == 0).await);
    }
}
