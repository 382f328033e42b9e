use crate::config::GameSettings;

pub const MIN_SPAWN_INTERVAL_MS: f64 = 300.0;
pub const MIN_TARGET_LIFESPAN_MS: f64 = 500.0;

const SUCCESS_FACTOR: f64 = 0.98;
const FAILURE_FACTOR: f64 = 1.05;

/// Retune pacing from the single most recent motor outcome: success
/// tightens spawn interval and target lifespan, failure loosens them.
/// Memoryless by design; only the floors bound the walk downward.
pub fn adjust(settings: &mut GameSettings, success: bool) {
    let factor = if success {
        SUCCESS_FACTOR
    } else {
        FAILURE_FACTOR
    };

    settings.spawn_interval_ms = (settings.spawn_interval_ms * factor).max(MIN_SPAWN_INTERVAL_MS);
    settings.target_lifespan_ms =
        (settings.target_lifespan_ms * factor).max(MIN_TARGET_LIFESPAN_MS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_tightens_both_knobs() {
        let mut settings = GameSettings::default();
        adjust(&mut settings, true);
        assert_eq!(settings.spawn_interval_ms, 980.0);
        assert_eq!(settings.target_lifespan_ms, 1470.0);
    }

    #[test]
    fn failure_loosens_both_knobs() {
        let mut settings = GameSettings::default();
        adjust(&mut settings, false);
        assert_eq!(settings.spawn_interval_ms, 1050.0);
        assert!((settings.target_lifespan_ms - 1575.0).abs() < 1e-9);
    }

    #[test]
    fn five_straight_hits_decay_from_defaults() {
        let mut settings = GameSettings::default();
        for _ in 0..5 {
            adjust(&mut settings, true);
        }
        assert!((settings.spawn_interval_ms - 1000.0 * 0.98f64.powi(5)).abs() < 1e-6);
        assert!((settings.target_lifespan_ms - 1500.0 * 0.98f64.powi(5)).abs() < 1e-6);
    }

    #[test]
    fn floors_hold_under_sustained_success() {
        let mut settings = GameSettings::default();
        for _ in 0..1000 {
            adjust(&mut settings, true);
        }
        assert_eq!(settings.spawn_interval_ms, MIN_SPAWN_INTERVAL_MS);
        assert_eq!(settings.target_lifespan_ms, MIN_TARGET_LIFESPAN_MS);

        // At the floor, success holds rather than dipping below
        adjust(&mut settings, true);
        assert_eq!(settings.spawn_interval_ms, MIN_SPAWN_INTERVAL_MS);
        assert_eq!(settings.target_lifespan_ms, MIN_TARGET_LIFESPAN_MS);
    }

    #[test]
    fn failure_climbs_back_off_the_floor() {
        let mut settings = GameSettings {
            spawn_interval_ms: MIN_SPAWN_INTERVAL_MS,
            target_lifespan_ms: MIN_TARGET_LIFESPAN_MS,
            ..GameSettings::default()
        };
        adjust(&mut settings, false);
        assert!(settings.spawn_interval_ms > MIN_SPAWN_INTERVAL_MS);
        assert!(settings.target_lifespan_ms > MIN_TARGET_LIFESPAN_MS);
    }
}
