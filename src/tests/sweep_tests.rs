#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result;

    use crate::impairment::{ImpairmentSpec, Shaper};
    use crate::mode::TransferMode;
    use crate::sweep::{SweepConfig, run_sweep, throughput_mbps};
    use crate::trial::{PairOutput, TrialError, TrialRunner};

    const MIB: u64 = 1_048_576;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum ShaperEvent {
        Apply(ImpairmentSpec),
        Clear,
    }

    #[derive(Default)]
    struct RecordingShaper {
        events: Mutex<Vec<ShaperEvent>>,
        fail_apply: bool,
    }

    impl RecordingShaper {
        fn events(&self) -> Vec<ShaperEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Shaper for RecordingShaper {
        fn apply(&self, _interface: &str, _port: u16, spec: ImpairmentSpec) -> Result<()> {
            self.events.lock().unwrap().push(ShaperEvent::Apply(spec));
            if self.fail_apply {
                anyhow::bail!("tc exploded");
            }
            Ok(())
        }

        fn clear(&self, _interface: &str) {
            self.events.lock().unwrap().push(ShaperEvent::Clear);
        }
    }

    /// Runner returning the same canned output for every trial.
    struct CannedRunner {
        output: PairOutput,
    }

    impl TrialRunner for CannedRunner {
        fn run(&self, _mode: TransferMode, _size: u64) -> Result<PairOutput, TrialError> {
            Ok(self.output.clone())
        }
    }

    /// Runner whose receiver never becomes ready.
    struct NeverReadyRunner;

    impl TrialRunner for NeverReadyRunner {
        fn run(&self, _mode: TransferMode, _size: u64) -> Result<PairOutput, TrialError> {
            Err(TrialError::ReadinessTimeout {
                receiver_log: "[Receiver] EC_FALLBACK_SR: coding disabled\n".into(),
            })
        }
    }

    fn canned(receiver_ms: Option<u64>, sender_ms: Option<u64>) -> CannedRunner {
        CannedRunner {
            output: PairOutput {
                sender_ms,
                receiver_ms,
                ..Default::default()
            },
        }
    }

    fn cfg(loss_levels: Vec<f64>, iterations: u32) -> SweepConfig {
        SweepConfig {
            interface: "lo".into(),
            udp_port: 9999,
            loss_levels,
            delay_ms: 50,
            jitter_ms: 10,
            sizes: vec![MIB],
            modes: TransferMode::ALL.to_vec(),
            iterations,
            manage_impairment: true,
        }
    }

    #[test]
    fn test_sweep_shape_and_order() {
        let shaper = RecordingShaper::default();
        let results =
            run_sweep(&cfg(vec![0.0, 5.0], 1), &shaper, &canned(Some(1000), None)).unwrap();

        // 1 baseline trial (loss 0 only) + 2 sr + 2 ec.
        let seen: Vec<(TransferMode, f64)> = results.iter().map(|r| (r.mode, r.loss_pct)).collect();
        assert_eq!(
            seen,
            [
                (TransferMode::Sdr, 0.0),
                (TransferMode::Sr, 0.0),
                (TransferMode::Ec, 0.0),
                (TransferMode::Sr, 5.0),
                (TransferMode::Ec, 5.0),
            ]
        );
    }

    #[test]
    fn test_baseline_rows_never_impaired() {
        let shaper = RecordingShaper::default();
        let results = run_sweep(
            &cfg(vec![0.0, 1.0, 5.0], 2),
            &shaper,
            &canned(Some(1000), None),
        )
        .unwrap();

        for r in results.iter().filter(|r| r.mode.is_baseline()) {
            assert_eq!(r.loss_pct, 0.0);
            assert_eq!(r.delay_ms, 0);
            assert_eq!(r.jitter_ms, 0);
        }
    }

    #[test]
    fn test_zero_loss_zeroes_delay_even_with_base_delay_configured() {
        let shaper = RecordingShaper::default();
        let results =
            run_sweep(&cfg(vec![0.0, 5.0], 1), &shaper, &canned(Some(1000), None)).unwrap();

        for r in &results {
            if r.loss_pct == 0.0 {
                assert_eq!((r.delay_ms, r.jitter_ms), (0, 0));
            } else {
                assert_eq!((r.delay_ms, r.jitter_ms), (50, 10));
            }
        }

        for event in shaper.events() {
            if let ShaperEvent::Apply(spec) = event
                && spec.loss_pct == 0.0
            {
                assert_eq!((spec.delay_ms, spec.jitter_ms), (0, 0));
            }
        }
    }

    #[test]
    fn test_apply_clear_strictly_paired() {
        let shaper = RecordingShaper::default();
        let _ = run_sweep(&cfg(vec![0.0, 5.0], 3), &shaper, &canned(Some(1000), None)).unwrap();

        let events = shaper.events();
        // Alternating apply/clear, one pair per surviving combination.
        assert_eq!(events.len(), 5 * 2);
        for pair in events.chunks(2) {
            assert!(matches!(pair[0], ShaperEvent::Apply(_)));
            assert_eq!(pair[1], ShaperEvent::Clear);
        }
    }

    #[test]
    fn test_readiness_failure_degrades_but_sweep_continues() {
        let shaper = RecordingShaper::default();
        let results = run_sweep(&cfg(vec![0.0, 5.0], 1), &shaper, &NeverReadyRunner).unwrap();

        assert_eq!(results.len(), 5);
        for r in &results {
            assert_eq!(r.sender_ms, None);
            assert_eq!(r.receiver_ms, None);
            assert_eq!(r.throughput_mbps, None);
            // Partial output captured before the timeout is authoritative.
            assert!(r.fallback);
            assert!(r.receiver_log.contains("EC_FALLBACK_SR"));
        }
        // Impairment was still cleared after every combination.
        assert_eq!(shaper.events().last(), Some(&ShaperEvent::Clear));
    }

    #[test]
    fn test_apply_failure_aborts_run_but_clears() {
        let shaper = RecordingShaper {
            fail_apply: true,
            ..Default::default()
        };
        let err = run_sweep(&cfg(vec![5.0], 1), &shaper, &canned(Some(1000), None)).unwrap_err();
        assert!(err.to_string().contains("apply impairment"));

        // The guard released the interface on the way out.
        assert_eq!(shaper.events().last(), Some(&ShaperEvent::Clear));
    }

    #[test]
    fn test_no_netem_never_touches_shaper() {
        let shaper = RecordingShaper::default();
        let mut config = cfg(vec![0.0, 5.0], 2);
        config.manage_impairment = false;

        let results = run_sweep(&config, &shaper, &canned(Some(1000), None)).unwrap();
        assert_eq!(results.len(), 10);
        assert!(shaper.events().is_empty());
    }

    #[test]
    fn test_throughput_from_receiver_time() {
        let t = throughput_mbps(MIB, Some(1000), None).unwrap();
        assert!((t - 8.388608).abs() < 0.001);
    }

    #[test]
    fn test_throughput_falls_back_to_sender_time() {
        let t = throughput_mbps(MIB, None, Some(500)).unwrap();
        assert!((t - 16.777216).abs() < 0.001);
    }

    #[test]
    fn test_throughput_prefers_receiver_time() {
        let t = throughput_mbps(MIB, Some(1000), Some(500)).unwrap();
        assert!((t - 8.388608).abs() < 0.001);
    }

    #[test]
    fn test_throughput_null_when_no_timing() {
        assert_eq!(throughput_mbps(MIB, None, None), None);
    }

    #[test]
    fn test_throughput_zero_duration_unusable() {
        // A parsed 0 ms falls through to the other timing, or to null.
        let t = throughput_mbps(MIB, Some(0), Some(500)).unwrap();
        assert!((t - 16.777216).abs() < 0.001);
        assert_eq!(throughput_mbps(MIB, Some(0), None), None);
    }
}
