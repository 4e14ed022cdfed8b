use rstest::rstest;
use totalizer_hardware::{SensorError, SimulatedSource};
use totalizer_traits::{Countby, WeightSource};

#[rstest]
#[case(Countby { decimals: 1, increment: 0.5 }, 50)]
#[case(Countby { decimals: 0, increment: 2.0 }, 200)]
fn reports_configured_countby_and_interval(#[case] countby: Countby, #[case] interval_ms: u32) {
    let mut src = SimulatedSource::new();
    let ch = src.add_channel(countby, interval_ms);
    assert_eq!(src.display_countby(ch), countby);
    assert_eq!(src.filter_interval_ms(ch), interval_ms);
}

#[test]
fn channels_are_independent() {
    let mut src = SimulatedSource::new();
    let a = src.add_channel(Countby::default(), 100);
    let b = src.add_channel(Countby::default(), 100);
    let h = src.handle();
    h.set_weight(a, 40.0);
    h.set_overload(b, true);
    h.set_active(b, false);

    let sa = src.snapshot(a).expect("channel a");
    let sb = src.snapshot(b).expect("channel b");
    assert_eq!(sa.weight, 40.0);
    assert!(!sa.overloaded);
    assert_eq!(sb.weight, 0.0);
    assert!(sb.overloaded);
    assert!(!sb.active);
    assert_eq!(src.channel_count(), 2);
}

#[test]
fn offline_channel_recovers() {
    let mut src = SimulatedSource::new();
    let ch = src.add_channel(Countby::default(), 100);
    let h = src.handle();
    h.set_offline(ch, true);
    let err = src.snapshot(ch).expect_err("offline read must fail");
    match err.downcast_ref::<SensorError>() {
        Some(SensorError::Offline(c)) => assert_eq!(*c, ch),
        other => panic!("expected Offline, got {other:?}"),
    }
    h.set_offline(ch, false);
    assert!(src.snapshot(ch).is_ok());
}

#[test]
fn unknown_channel_defaults() {
    let src = SimulatedSource::new();
    assert_eq!(src.display_countby(3), Countby::default());
    assert_eq!(src.filter_interval_ms(3), 0);
}
