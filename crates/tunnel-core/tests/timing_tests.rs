// Time-driven components: boosts, breath, debounce, quality and evolution.

use tunnel_core::constants::*;
use tunnel_core::random::stream;
use tunnel_core::*;

#[test]
fn boost_holds_then_decays_monotonically() {
    let mut boost = Boost::new(1.0);
    assert_eq!(boost.value(0.0), 0.0);
    boost.trigger(0.3, 1000.0, 0.0);
    assert_eq!(boost.value(0.0), 0.3);
    assert_eq!(boost.value(1000.0), 0.3);

    let mut prev = f32::MAX;
    let mut t = 0.0;
    while t <= 4000.0 {
        let v = boost.value(t);
        assert!(v >= 0.0, "negative boost at {t}");
        assert!(v <= prev, "boost rose at {t}");
        prev = v;
        t += 10.0;
    }
    assert_eq!(boost.value(boost.settled_at() + 1.0), 0.0);
    assert!(!boost.is_active(boost.settled_at() + 1.0));
}

#[test]
fn overlapping_boosts_do_not_stack() {
    let mut boost = Boost::new(1.0);
    boost.trigger(0.3, 1000.0, 0.0);
    boost.trigger(0.3, 1000.0, 500.0);
    assert_eq!(boost.value(500.0), 0.3);
    // the window was extended by the second trigger
    assert_eq!(boost.value(1400.0), 0.3);
    boost.trigger(0.2, 100.0, 1400.0);
    assert_eq!(boost.value(1400.0), 0.3);
}

#[test]
fn boost_is_capped() {
    let mut boost = Boost::new(0.5);
    boost.trigger(2.0, 100.0, 0.0);
    assert_eq!(boost.value(0.0), 0.5);
    boost.trigger(-1.0, 100.0, 0.0);
    assert_eq!(boost.value(0.0), 0.5);
}

#[test]
fn custom_decay_shortens_the_tail() {
    let mut boost = Boost::new(1.0).with_decay(100.0);
    boost.trigger(1.0, 0.0, 0.0);
    assert!((boost.value(50.0) - 0.5).abs() < 1e-6);
    assert_eq!(boost.value(100.0), 0.0);
}

fn breath(reduced: bool) -> FieldBreathModulator {
    FieldBreathModulator::new(0.0, reduced, SeededRandom::derive(42, stream::BREATH))
}

/// Run one full breath from `start`, returning the peak intensity.
fn run_breath(b: &mut FieldBreathModulator, start: f64) -> f32 {
    let mut peak = 0.0f32;
    let mut t = start;
    while t <= start + BREATH_DURATION_MS + 32.0 {
        b.update(t);
        assert!(b.intensity() >= 1.0 - 1e-6);
        peak = peak.max(b.intensity());
        t += 16.0;
    }
    peak
}

#[test]
fn breath_is_idle_until_the_first_interval() {
    let mut b = breath(false);
    let next = b.next_breath_ms();
    assert!((BREATH_INTERVAL_MS.0..BREATH_INTERVAL_MS.1).contains(&next));
    b.update(next - 1.0);
    assert!(!b.is_breathing());
    assert_eq!(b.intensity(), 1.0);
    assert_eq!(b.scale(), 1.0);
    assert_eq!(b.twist_delta(), 0.0);
}

#[test]
fn breath_peaks_at_one_fifteen_and_returns_to_one() {
    let mut b = breath(false);
    let start = b.next_breath_ms();
    let peak = run_breath(&mut b, start);
    assert!((peak - (1.0 + BREATH_PEAK)).abs() < 1e-3, "peak {peak}");
    assert!(!b.is_breathing());
    assert_eq!(b.intensity(), 1.0);
    assert_eq!(b.twist_delta(), 0.0);

    let next = b.next_breath_ms();
    assert!(next - start >= BREATH_INTERVAL_MS.0);
    assert!(next - start <= BREATH_INTERVAL_MS.1 + BREATH_DURATION_MS + 32.0);
}

#[test]
fn reduced_motion_halves_the_breath() {
    let mut b = breath(true);
    let start = b.next_breath_ms();
    let peak = run_breath(&mut b, start);
    assert!((peak - (1.0 + BREATH_PEAK * 0.5)).abs() < 1e-3, "peak {peak}");
}

#[test]
fn twist_delta_stays_within_bounds() {
    let mut b = breath(false);
    let start = b.next_breath_ms();
    let mut t = start;
    while t < start + BREATH_DURATION_MS {
        b.update(t);
        assert!(b.twist_delta().abs() <= BREATH_TWIST_MAX + 1e-6);
        t += 16.0;
    }
}

#[test]
fn link_boost_lifts_intensity_and_fades() {
    let mut b = breath(false);
    b.boost_amplitude(LINK_BREATH_BOOST, LINK_BREATH_BOOST_MS, 100.0);
    b.update(100.0);
    assert!((b.intensity() - (1.0 + LINK_BREATH_BOOST)).abs() < 1e-6);
    assert!(b.scale() > 1.0);
    b.update(100.0 + LINK_BREATH_BOOST_MS + BOOST_DECAY_MS + 1.0);
    assert_eq!(b.boost_value(), 0.0);
    assert_eq!(b.intensity(), 1.0);
}

#[test]
fn debouncer_keeps_a_single_slot() {
    let mut d = Debouncer::new(REBUILD_WINDOW_MS);
    assert!(!d.take_due(0.0));
    assert!(d.request(0.0));
    assert!(!d.request(10.0));
    assert!(d.is_pending());
    assert!(d.take_due(16.0));
    assert!(!d.is_pending());
    assert!(!d.take_due(32.0));
}

#[test]
fn debouncer_drops_requests_inside_the_window() {
    let mut d = Debouncer::new(2000.0);
    let mut fired = Vec::new();
    // a milestone request every 100ms for 5s
    let mut t = 0.0;
    while t < 5000.0 {
        d.request(t);
        if d.take_due(t) {
            fired.push(t);
        }
        t += 100.0;
    }
    assert_eq!(fired, vec![0.0, 2000.0, 4000.0]);
    for w in fired.windows(2) {
        assert!(w[1] - w[0] >= 2000.0);
    }
}

#[test]
fn debouncer_cancel_clears_the_slot() {
    let mut d = Debouncer::new(2000.0);
    d.request(0.0);
    d.cancel();
    assert!(!d.is_pending());
    assert!(!d.take_due(1.0));
    // nothing fired, so the window never started
    assert!(d.request(2.0));
}

#[test]
fn quality_steps_down_then_recovers() {
    let mut q = QualityMonitor::new(10);
    assert_eq!(q.tier(), QualityTier::High);
    for _ in 0..9 {
        assert_eq!(q.tick(30.0), None);
    }
    assert_eq!(q.tick(30.0), Some(QualityTier::Medium));
    // window restarts after a change
    assert_eq!(q.average_ms(), None);
    let changes: Vec<_> = (0..10).filter_map(|_| q.tick(30.0)).collect();
    assert_eq!(changes, vec![QualityTier::Low]);
    let changes: Vec<_> = (0..30).filter_map(|_| q.tick(30.0)).collect();
    assert!(changes.is_empty());

    let changes: Vec<_> = (0..20).filter_map(|_| q.tick(8.0)).collect();
    assert_eq!(changes, vec![QualityTier::Medium, QualityTier::High]);
}

#[test]
fn quality_holds_inside_the_hysteresis_band() {
    let mut q = QualityMonitor::default();
    for _ in 0..(QUALITY_WINDOW * 3) {
        assert_eq!(q.tick(18.0), None);
    }
    assert_eq!(q.tier(), QualityTier::High);
    assert_eq!(q.tick(f32::NAN), None);
}

#[test]
fn device_class_budgets_shrink_down_the_range() {
    let d = DeviceClass::Desktop;
    let m = DeviceClass::Mobile;
    let l = DeviceClass::LowEnd;
    assert!(d.max_rings() > m.max_rings() && m.max_rings() > l.max_rings());
    assert!(d.ambient_capacity() > m.ambient_capacity());
    assert!(m.ambient_capacity() > l.ambient_capacity());
    assert!(d.reactive_capacity() >= m.reactive_capacity());
    assert!(QualityTier::Low.ambient_rate_scale() < QualityTier::High.ambient_rate_scale());
}

#[test]
fn evolution_only_grows_on_multiples_of_five() {
    let mut evo = TunnelEvolution::new(TunnelConfig::default(), DeviceClass::Desktop);
    for n in [1, 2, 3, 4, 6, 7, 0] {
        assert!(!evo.apply(Theme::Logic, 0, n));
    }
    assert_eq!(evo.config().rings, DEFAULT_RINGS);
    assert!(evo.apply(Theme::Logic, 1, 5));
    assert_eq!(evo.config().rings, DEFAULT_RINGS + RING_STEP);
    assert!((evo.config().base_twist - (DEFAULT_BASE_TWIST + TWIST_STEP)).abs() < 1e-6);
    assert!(evo.apply(Theme::Logic, 2, 10));
}

#[test]
fn evolution_respects_device_and_twist_caps() {
    let mut evo = TunnelEvolution::new(TunnelConfig::default(), DeviceClass::LowEnd);
    let mut grew = 0;
    for level in 1..=40 {
        if evo.apply(Theme::Focus, level, level * 5) {
            grew += 1;
        }
    }
    assert_eq!(evo.config().rings, DeviceClass::LowEnd.max_rings());
    assert!((evo.config().base_twist - TWIST_CAP).abs() < 1e-5);
    // twist needs ten steps to reach the cap (one more if f32 rounding lands
    // just below it); rings hit theirs after three
    assert!((10..=11).contains(&grew), "grew {grew}");
    assert!(!evo.apply(Theme::Focus, 41, 205));
}
