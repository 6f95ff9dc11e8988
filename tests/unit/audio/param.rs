use super::*;

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn default_holds_without_events() {
    let p = AudioParam::new(0.25);
    assert_eq!(p.value_at(-5.0), 0.25);
    assert_eq!(p.value_at(100.0), 0.25);
}

#[test]
fn set_value_holds_until_next_event() {
    let mut p = AudioParam::new(1.0);
    p.set_value_at_time(0.5, 2.0).unwrap();
    p.set_value_at_time(0.1, 4.0).unwrap();
    assert_eq!(p.value_at(1.999), 1.0);
    assert_eq!(p.value_at(2.0), 0.5);
    assert_eq!(p.value_at(3.9), 0.5);
    assert_eq!(p.value_at(4.0), 0.1);
}

#[test]
fn exponential_ramp_interpolates_geometrically() {
    let mut p = AudioParam::new(0.0);
    p.set_value_at_time(1.0, 1.0).unwrap();
    p.exponential_ramp_to_value_at_time(0.25, 3.0).unwrap();
    assert!(close(p.value_at(1.0), 1.0));
    assert!(close(p.value_at(2.0), 0.5));
    assert!(close(p.value_at(3.0), 0.25));
    assert!(close(p.value_at(10.0), 0.25));
}

#[test]
fn linear_ramp_interpolates() {
    let mut p = AudioParam::new(0.0);
    p.set_value_at_time(0.0, 0.0).unwrap();
    p.linear_ramp_to_value_at_time(1.0, 2.0).unwrap();
    assert!(close(p.value_at(0.5), 0.25));
}

#[test]
fn leading_ramp_starts_from_default_at_zero() {
    let mut p = AudioParam::new(1.0);
    p.linear_ramp_to_value_at_time(0.0, 4.0).unwrap();
    assert!(close(p.value_at(1.0), 0.75));
}

#[test]
fn exponential_ramp_with_zero_endpoint_holds_start() {
    let mut p = AudioParam::new(0.0);
    p.set_value_at_time(0.5, 0.0).unwrap();
    p.exponential_ramp_to_value_at_time(0.0, 1.0).unwrap();
    assert_eq!(p.value_at(0.5), 0.5);
    assert_eq!(p.value_at(1.0), 0.0);

    let mut q = AudioParam::new(0.0);
    q.set_value_at_time(0.5, 0.0).unwrap();
    q.exponential_ramp_to_value_at_time(-0.5, 1.0).unwrap();
    assert_eq!(q.value_at(0.5), 0.5);
}

#[test]
fn same_time_events_keep_insertion_order() {
    let mut p = AudioParam::new(1.0);
    p.set_value_at_time(0.2, 1.0).unwrap();
    p.set_value_at_time(0.7, 1.0).unwrap();
    assert_eq!(p.value_at(1.0), 0.7);
    assert_eq!(p.event_count(), 2);
}

#[test]
fn non_finite_inputs_are_rejected() {
    let mut p = AudioParam::new(1.0);
    assert!(p.set_value_at_time(f32::NAN, 0.0).is_err());
    assert!(p.exponential_ramp_to_value_at_time(0.5, f64::INFINITY).is_err());
    assert_eq!(p.event_count(), 0);
}

#[test]
fn fill_values_samples_on_a_grid() {
    let mut p = AudioParam::new(1.0);
    p.set_value_at_time(0.5, 1.0).unwrap();
    let mut out = [0.0f32; 4];
    p.fill_values(0.0, 0.5, &mut out);
    assert_eq!(out, [1.0, 1.0, 0.5, 0.5]);
}
