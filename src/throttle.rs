/// Milliseconds since the game clock's epoch.
pub type Millis = u64;

pub const DRAW_SETTLE_MS: Millis = 2000;
pub const PREDICTION_THROTTLE_MS: Millis = 2000;

/// Snapshot of everything the throttle looks at on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleInputs {
    pub now: Millis,
    pub last_draw: Millis,
    pub last_prediction: Millis,
    pub has_drawn: bool,
    pub in_flight: bool,
}

/// Decides whether a classification call may be issued right now.
///
/// The user must have drawn something, paused for `draw_settle`, and the
/// previous call must be at least `prediction_throttle` old and finished.
/// Evaluated once per tick; missed ticks are never made up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub draw_settle: Millis,
    pub prediction_throttle: Millis,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            draw_settle: DRAW_SETTLE_MS,
            prediction_throttle: PREDICTION_THROTTLE_MS,
        }
    }
}

impl ThrottlePolicy {
    pub fn new(draw_settle: Millis, prediction_throttle: Millis) -> Self {
        Self {
            draw_settle,
            prediction_throttle,
        }
    }

    pub fn should_predict(&self, inputs: &ThrottleInputs) -> bool {
        inputs.has_drawn
            && !inputs.in_flight
            && inputs.now.saturating_sub(inputs.last_draw) >= self.draw_settle
            && inputs.now.saturating_sub(inputs.last_prediction) >= self.prediction_throttle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_at(now: Millis) -> ThrottleInputs {
        ThrottleInputs {
            now,
            last_draw: 0,
            last_prediction: 0,
            has_drawn: true,
            in_flight: false,
        }
    }

    #[test]
    fn never_predicts_without_drawing() {
        let policy = ThrottlePolicy::default();
        for now in [0, 1_999, 2_000, 60_000, Millis::MAX] {
            let inputs = ThrottleInputs {
                has_drawn: false,
                ..ready_at(now)
            };
            assert!(!policy.should_predict(&inputs), "now = {now}");
        }
    }

    #[test]
    fn never_predicts_while_in_flight() {
        let policy = ThrottlePolicy::default();
        let inputs = ThrottleInputs {
            in_flight: true,
            ..ready_at(100_000)
        };
        assert!(!policy.should_predict(&inputs));
    }

    #[test]
    fn draw_settle_boundary_is_inclusive() {
        let policy = ThrottlePolicy::default();
        let t = 10_000;
        let at = |now| ThrottleInputs {
            last_draw: t,
            ..ready_at(now)
        };

        assert!(!policy.should_predict(&at(t)));
        assert!(!policy.should_predict(&at(t + DRAW_SETTLE_MS - 1)));
        assert!(policy.should_predict(&at(t + DRAW_SETTLE_MS)));
    }

    #[test]
    fn rate_limits_since_last_prediction() {
        let policy = ThrottlePolicy::default();
        let inputs = ThrottleInputs {
            last_prediction: 5_000,
            ..ready_at(6_999)
        };
        assert!(!policy.should_predict(&inputs));

        let inputs = ThrottleInputs {
            last_prediction: 5_000,
            ..ready_at(7_000)
        };
        assert!(policy.should_predict(&inputs));
    }

    #[test]
    fn clock_behind_timestamps_does_not_underflow() {
        let policy = ThrottlePolicy::default();
        let inputs = ThrottleInputs {
            last_draw: 5_000,
            ..ready_at(1_000)
        };
        assert!(!policy.should_predict(&inputs));
    }

    #[test]
    fn zero_windows_only_need_a_drawing() {
        let policy = ThrottlePolicy::new(0, 0);
        assert!(policy.should_predict(&ready_at(0)));
    }
}
