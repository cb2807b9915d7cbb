//! Trailing stop after take-profit — two-phase exit rule.
//!
//! Phase 1: wait until a close after the entry day exceeds
//!          buy_price * (1 + take_profit_fraction).
//! Phase 2: exit when the close falls below
//!          highest_close * (1 - trail_distance).
//!
//! Phase detection uses `highest_close_after_entry`: once any close after the
//! entry day has cleared the take-profit level, the peak has too. No extra
//! state is needed in the position.

use crate::domain::ExitReason;

use super::{ExitRule, ExitSignal, HeldPosition};

#[derive(Debug, Clone)]
pub struct TrailingStopRule {
    /// Gain that arms the trail, as a fraction (e.g., 0.10 for 10%).
    pub take_profit_fraction: f64,
    /// Distance below the peak, as a positive fraction (e.g., 0.03 for 3%).
    pub trail_distance: f64,
}

impl TrailingStopRule {
    pub fn new(take_profit_fraction: f64, trail_distance: f64) -> Self {
        Self {
            take_profit_fraction,
            trail_distance: trail_distance.abs(),
        }
    }

    pub fn is_armed(&self, position: &HeldPosition) -> bool {
        let trigger = position.buy_price * (1.0 + self.take_profit_fraction);
        position
            .highest_close_after_entry
            .is_some_and(|h| h > trigger)
    }

    pub fn level(&self, position: &HeldPosition) -> f64 {
        position.highest_close * (1.0 - self.trail_distance)
    }
}

impl ExitRule for TrailingStopRule {
    fn name(&self) -> &str {
        "trailing_stop"
    }

    fn on_close(&self, position: &HeldPosition, close: f64) -> ExitSignal {
        if self.is_armed(position) && close < self.level(position) {
            ExitSignal::Exit(ExitReason::TrailingStop)
        } else {
            ExitSignal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(buy: f64, closes: &[f64]) -> HeldPosition {
        let mut pos = HeldPosition::open(buy);
        for &c in closes {
            pos.mark(c);
        }
        pos
    }

    #[test]
    fn unarmed_below_take_profit() {
        let rule = TrailingStopRule::new(0.10, 0.03);
        // Peak 108 never cleared 110, so the 20% drop is not a trailing exit.
        let pos = walk(100.0, &[108.0, 86.0]);
        assert!(!rule.is_armed(&pos));
        assert_eq!(rule.on_close(&pos, 86.0), ExitSignal::Hold);
    }

    #[test]
    fn armed_holds_within_trail() {
        let rule = TrailingStopRule::new(0.10, 0.03);
        let pos = walk(100.0, &[112.0, 110.0]);
        assert!(rule.is_armed(&pos));
        // level = 112 * 0.97 = 108.64
        assert_eq!(rule.on_close(&pos, 110.0), ExitSignal::Hold);
    }

    #[test]
    fn armed_exits_below_trail() {
        let rule = TrailingStopRule::new(0.10, 0.03);
        let pos = walk(100.0, &[112.0, 108.0]);
        assert_eq!(
            rule.on_close(&pos, 108.0),
            ExitSignal::Exit(ExitReason::TrailingStop)
        );
    }

    #[test]
    fn arming_requires_strictly_above_trigger() {
        let rule = TrailingStopRule::new(0.10, 0.03);
        let pos = walk(100.0, &[110.0]);
        assert!(!rule.is_armed(&pos));
    }

    #[test]
    fn negative_distance_is_treated_as_magnitude() {
        let rule = TrailingStopRule::new(0.10, -0.03);
        assert_eq!(rule.trail_distance, 0.03);
    }

    #[test]
    fn entry_close_alone_does_not_arm_negative_take_profit() {
        let rule = TrailingStopRule::new(-0.01, 0.03);
        let pos = HeldPosition::open(100.0);
        assert!(!rule.is_armed(&pos));
    }
}
