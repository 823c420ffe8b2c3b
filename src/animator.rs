use crate::{agent::AgentState, config::AnimatorConfig, domain::Money};

/// Smooths tick-wise jumps of portfolio values into a continuously sampled stream.
///
/// Each step closes a fixed fraction of the remaining gap and snaps once the
/// gap falls below the threshold, so convergence always terminates.
#[derive(Clone, Copy, Debug)]
pub struct ValueAnimator {
    config: AnimatorConfig,
}

impl ValueAnimator {
    pub fn new(config: AnimatorConfig) -> Self {
        Self { config }
    }

    /// Advances a single value one frame toward `target`.
    pub fn advance(&self, current: Money, target: Money) -> Money {
        if current == target {
            return target;
        }
        let next = current + (target - current) * self.config.rate;
        if (target - next).abs().0 < self.config.snap_threshold {
            target
        } else {
            next
        }
    }

    /// Advances every agent one frame. Returns the number of agents still animating.
    pub fn step(&self, agents: &mut [AgentState]) -> usize {
        agents
            .iter_mut()
            .filter(|agent| agent.is_animating())
            .map(|agent| {
                agent.portfolio_value =
                    self.advance(agent.portfolio_value, agent.target_portfolio_value);
                agent.is_animating()
            })
            .filter(|still_moving| *still_moving)
            .count()
    }

    /// Upper bound on the frames needed to settle a gap of `gap` dollars.
    pub fn ticks_to_converge(&self, gap: f64) -> usize {
        let gap = gap.abs();
        if gap < self.config.snap_threshold || gap == 0.0 {
            return usize::from(gap > 0.0);
        }
        let keep = 1.0 - self.config.rate;
        if keep <= 0.0 {
            return 1;
        }
        // gap * keep^n < threshold
        let n = (self.config.snap_threshold / gap).ln() / keep.ln();
        n.floor() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{agent::BehaviorBias, config::AgentSpec, domain::AgentId};

    fn animator() -> ValueAnimator {
        ValueAnimator::new(AnimatorConfig::default())
    }

    fn agent(value: f64, target: f64) -> AgentState {
        AgentState::new(
            AgentId(1),
            &AgentSpec::new("A", "tok", BehaviorBias::Balanced),
            Money(value),
        )
        .with_target(Money(target))
    }

    #[test]
    fn test_single_frame_closes_ten_percent_of_gap() {
        let next = animator().advance(Money(100_000.0), Money(110_000.0));
        assert!((next.0 - 101_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_snaps_inside_threshold() {
        assert_eq!(
            animator().advance(Money(99_950.0), Money(100_000.0)),
            Money(100_000.0)
        );
    }

    #[test]
    fn test_reaches_target_exactly_within_bound() {
        // Arrange
        let animator = animator();
        let mut agents = vec![agent(100_000.0, 250_000.0)];
        let bound = animator.ticks_to_converge(150_000.0);

        // Act
        let mut frames = 0;
        while agents[0].is_animating() {
            animator.step(&mut agents);
            frames += 1;
            assert!(frames <= bound, "exceeded bound of {bound} frames");
        }

        // Assert
        assert_eq!(agents[0].portfolio_value(), Money(250_000.0));
        assert_eq!(frames, bound);
    }

    #[test]
    fn test_converges_downward_too() {
        let animator = animator();
        let mut agents = vec![agent(120_000.0, 90_000.0)];

        for _ in 0..animator.ticks_to_converge(30_000.0) {
            animator.step(&mut agents);
        }

        assert_eq!(agents[0].portfolio_value(), Money(90_000.0));
        assert_eq!(animator.step(&mut agents), 0);
    }

    #[test]
    fn test_step_reports_animating_count_and_skips_settled() {
        let animator = animator();
        let mut agents = vec![agent(100.0, 100.0), agent(0.0, 1_000_000.0)];

        let moving = animator.step(&mut agents);

        assert_eq!(moving, 1);
        assert_eq!(agents[0].portfolio_value(), Money(100.0));
        assert_eq!(agents[1].portfolio_value(), Money(100_000.0));
    }
}
