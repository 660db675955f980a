use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(3), SimTime(3_000));
    assert_eq!(SimTime::from_millis(500), SimTime(500_000_000));
    assert_eq!(SimTime::from_secs(2), SimTime(2_000_000_000));
    assert_eq!(SimTime::from_millis(1).as_nanos(), 1_000_000);
    assert!((SimTime::from_millis(250).as_secs_f64() - 0.25).abs() < 1e-12);
}

#[test]
fn sim_time_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime::MAX);
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime::MAX);
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime::MAX);
}

#[test]
fn saturating_add_and_since() {
    let t = SimTime::from_millis(600);
    assert_eq!(
        t.saturating_since(SimTime::from_millis(100)),
        SimTime::from_millis(500)
    );
    assert_eq!(SimTime::ZERO.saturating_since(t), SimTime::ZERO);
    assert_eq!(SimTime::MAX.saturating_add(t), SimTime::MAX);
    assert_eq!(
        SimTime::from_micros(1).saturating_add(SimTime::from_micros(2)),
        SimTime::from_micros(3)
    );
}
