use rstest::rstest;
use totalizer_core::mocks::{NoopSource, NullStore};
use totalizer_core::{BuildError, ChannelConfig, TotalMode, TotalStatus, Totalizer};

fn err_of(r: totalizer_core::Result<Totalizer>) -> BuildError {
    let e = r.expect_err("build should fail");
    e.downcast_ref::<BuildError>()
        .cloned()
        .expect("typed BuildError")
}

#[test]
fn missing_source_is_reported() {
    let r = Totalizer::builder()
        .with_store(NullStore)
        .with_channel(ChannelConfig::default())
        .try_build();
    assert!(matches!(err_of(r), BuildError::MissingSource));
}

#[test]
fn missing_store_is_reported() {
    let r = Totalizer::builder()
        .with_source(NoopSource)
        .with_channel(ChannelConfig::default())
        .try_build();
    assert!(matches!(err_of(r), BuildError::MissingStore));
}

#[test]
fn no_channels_is_reported() {
    let r = Totalizer::builder()
        .with_source(NoopSource)
        .with_store(NullStore)
        .build();
    assert!(matches!(err_of(r), BuildError::NoChannels));
}

#[rstest]
#[case::zero_capacity(ChannelConfig { capacity: 0.0, ..ChannelConfig::default() })]
#[case::nan_capacity(ChannelConfig { capacity: f32::NAN, ..ChannelConfig::default() })]
#[case::pct_over_100(ChannelConfig { rise_pct: 150.0, ..ChannelConfig::default() })]
#[case::negative_pct(ChannelConfig { drop_pct: -1.0, ..ChannelConfig::default() })]
#[case::drop_above_rise(ChannelConfig { rise_pct: 1.0, drop_pct: 3.0, ..ChannelConfig::default() })]
#[case::inverted_window(ChannelConfig {
    mode: TotalMode::OnAccept,
    accept_lower: 30.0,
    accept_upper: 20.0,
    ..ChannelConfig::default()
})]
#[case::empty_window(ChannelConfig { mode: TotalMode::OnAccept, ..ChannelConfig::default() })]
#[case::window_in_drop_band(ChannelConfig {
    mode: TotalMode::OnAccept,
    rise_pct: 5.0,
    drop_pct: 2.0,
    accept_lower: 1.0,
    accept_upper: 30.0,
    ..ChannelConfig::default()
})]
fn invalid_channel_config_is_rejected(#[case] bad: ChannelConfig) {
    let r = Totalizer::builder()
        .with_source(NoopSource)
        .with_store(NullStore)
        .with_channel(ChannelConfig::default())
        .with_channel(bad)
        .build();
    assert!(matches!(err_of(r), BuildError::InvalidConfig(_)));
}

#[test]
fn zero_pct_is_accepted_and_heals() {
    let t = Totalizer::builder()
        .with_source(NoopSource)
        .with_store(NullStore)
        .with_channel(ChannelConfig {
            capacity: 2000.0,
            ..ChannelConfig::default()
        })
        .build()
        .unwrap();
    let th = t.channel(0).unwrap().thresholds();
    assert_eq!(th.rise, 0.005 * 2000.0);
    assert_eq!(th.drop, 0.005 * 2000.0);
}

#[test]
fn unreadable_source_freezes_every_channel() {
    let mut t = Totalizer::builder()
        .with_source(NoopSource)
        .with_store(NullStore)
        .with_channels([
            ChannelConfig::default(),
            ChannelConfig {
                mode: TotalMode::AutoLoad,
                ..ChannelConfig::default()
            },
        ])
        .build()
        .unwrap();
    assert_eq!(t.evaluate_all(), vec![TotalStatus::Frozen; 2]);
}
