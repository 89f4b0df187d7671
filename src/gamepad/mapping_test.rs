use crate::gamepad::mapping::{
    apply_deadzone, normalize_axis, normalize_trigger, resolve, PLAYSTATION_VID, XBOX_PIDS,
    XBOX_VID,
};

#[test]
fn test_normalize_axis_bounds() {
    // The asymmetric i16 range must clamp at the negative extreme
    assert_eq!(normalize_axis(i16::MIN), -1.0);
    assert_eq!(normalize_axis(i16::MAX), 1.0);
    assert_eq!(normalize_axis(0), 0.0);

    let mut raw = i16::MIN;
    loop {
        let value = normalize_axis(raw);
        assert!((-1.0..=1.0).contains(&value), "raw {raw} -> {value}");
        let Some(next) = raw.checked_add(997) else {
            break;
        };
        raw = next;
    }
}

#[test]
fn test_normalize_trigger_bounds() {
    assert_eq!(normalize_trigger(i16::MIN, i16::MIN, i16::MAX), 0.0);
    assert_eq!(normalize_trigger(i16::MAX, i16::MIN, i16::MAX), 1.0);
    assert_eq!(normalize_trigger(0, 0, i16::MAX), 0.0);
    assert_eq!(normalize_trigger(i16::MAX, 0, i16::MAX), 1.0);

    // Values outside the declared raw range clamp instead of escaping
    // [0, 1]
    assert_eq!(normalize_trigger(-100, 0, i16::MAX), 0.0);

    let mut raw = i16::MIN;
    loop {
        let value = normalize_trigger(raw, -1000, 1000);
        assert!((0.0..=1.0).contains(&value), "raw {raw} -> {value}");
        let Some(next) = raw.checked_add(997) else {
            break;
        };
        raw = next;
    }
}

#[test]
fn test_normalize_trigger_degenerate_range() {
    assert_eq!(normalize_trigger(500, 300, 300), 0.0);
    assert_eq!(normalize_trigger(0, 0, 0), 0.0);
}

#[test]
fn test_deadzone() {
    assert_eq!(apply_deadzone(0.04, 0.05), 0.0);
    assert_eq!(apply_deadzone(-0.04, 0.05), 0.0);
    assert_eq!(apply_deadzone(0.06, 0.05), 0.06);
    assert_eq!(apply_deadzone(-0.06, 0.05), -0.06);
}

#[test]
fn test_deadzone_idempotent() {
    let values = [-1.0, -0.5, -0.051, -0.05, -0.01, 0.0, 0.01, 0.05, 0.051, 0.5, 1.0];
    let thresholds = [0.0, 0.01, 0.05, 0.2];
    for v in values {
        for t in thresholds {
            let once = apply_deadzone(v, t);
            assert_eq!(apply_deadzone(once, t), once, "v={v} t={t}");
        }
    }
}

#[test]
fn test_resolve_known_devices() {
    for pid in XBOX_PIDS {
        assert_eq!(resolve(XBOX_VID, pid).name, "xbox");
    }
    assert_eq!(resolve(PLAYSTATION_VID, 0x0CE6).name, "playstation");
}

#[test]
fn test_resolve_unknown_falls_back_to_generic() {
    let first = resolve(0x1234, 0x5678);
    assert_eq!(first.name, "generic");

    // Stable across repeated calls
    let second = resolve(0x1234, 0x5678);
    assert!(std::ptr::eq(first, second));

    // A known vendor with an unknown product still degrades
    assert_eq!(resolve(XBOX_VID, 0xFFFF).name, "generic");
}

#[test]
fn test_generic_profile_covers_common_layout() {
    let mapping = resolve(0, 0);
    assert!(mapping.has_hat);
    assert_eq!(mapping.axes.len(), 6);
    assert_eq!(mapping.buttons.len(), 11);
    assert_eq!(mapping.axes.iter().filter(|a| a.target.is_trigger()).count(), 2);
}
