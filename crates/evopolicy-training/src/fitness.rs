//! Scoring an agent by one rollout in an environment.

use evopolicy_env::{Action, ActionSpace, Environment, Frame, RenderMode, SimulationError};
use evopolicy_network::{Agent, ShapeMismatchError};

/// What to do besides accumulating reward during a rollout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloutOptions {
    /// Call `render(Human)` after reset and after every step.
    pub render: bool,
    /// Collect `render(RgbArray)` frames after reset and after every step.
    pub record_frames: bool,
    /// Stop after this many steps even if the episode is not done.
    pub max_steps: Option<usize>,
}

impl RolloutOptions {
    #[must_use]
    pub fn with_max_steps(max_steps: Option<usize>) -> Self {
        Self {
            max_steps,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    /// Sum of rewards over the episode.
    pub score: f32,
    pub steps: usize,
    pub frames: Vec<Frame>,
    /// The step budget ran out before the environment reported `done`.
    pub truncated: bool,
}

/// Plays one episode of `env` with `agent` choosing every action.
///
/// Environment errors and observations the agent cannot consume end the
/// rollout with an error; nothing is retried.
///
/// # Arguments
///
/// * `agent` - Policy choosing actions from observations
/// * `env` - Environment to play; it is reset first
/// * `options` - Rendering, frame recording and the optional step budget
///
/// # Returns
///
/// The summed reward and step count, plus the captured frames when
/// `options.record_frames` is set (one after reset and one per step).
pub fn simulate<E>(
    agent: &Agent,
    env: &mut E,
    options: &RolloutOptions,
) -> Result<Rollout, SimulationError>
where
    E: Environment + ?Sized,
{
    let action_space = env.action_space();
    let mut observation = env.reset()?;
    let mut frames = vec![];
    capture(env, options, &mut frames)?;

    let mut score = 0.0;
    let mut steps = 0;
    let mut truncated = false;
    loop {
        if options.max_steps.is_some_and(|max| steps >= max) {
            truncated = true;
            break;
        }
        let action = choose_action(agent, &observation, action_space)?;
        let step = env.step(&action)?;
        score += step.reward;
        steps += 1;
        observation = step.observation;
        capture(env, options, &mut frames)?;
        if step.done {
            break;
        }
    }

    Ok(Rollout {
        score,
        steps,
        frames,
        truncated,
    })
}

fn choose_action(
    agent: &Agent,
    observation: &[f32],
    space: ActionSpace,
) -> Result<Action, SimulationError> {
    let to_failure =
        |e: ShapeMismatchError| SimulationError::failure(format!("agent cannot act: {e}"));
    match space {
        ActionSpace::Discrete(_) => agent
            .predict(observation)
            .map(Action::Discrete)
            .map_err(to_failure),
        ActionSpace::Continuous(_) => agent
            .forward(observation)
            .map(Action::Continuous)
            .map_err(to_failure),
    }
}

fn capture<E>(
    env: &mut E,
    options: &RolloutOptions,
    frames: &mut Vec<Frame>,
) -> Result<(), SimulationError>
where
    E: Environment + ?Sized,
{
    if options.render {
        env.render(RenderMode::Human)?;
    }
    if options.record_frames
        && let Some(frame) = env.render(RenderMode::RgbArray)?
    {
        frames.push(frame);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use evopolicy_env::{ObservationSpace, Step};
    use evopolicy_network::{AgentFactory, SeedPolicy, Topology};

    use super::*;

    /// Rewards `1.0` per step and finishes after `length` steps.
    #[derive(Debug, Clone)]
    pub(crate) struct CountingEnv {
        length: usize,
        fail_at: Option<usize>,
        steps: usize,
    }

    impl CountingEnv {
        pub(crate) fn new(length: usize) -> Self {
            Self {
                length,
                fail_at: None,
                steps: 0,
            }
        }

        pub(crate) fn failing(at: usize) -> Self {
            Self {
                fail_at: Some(at),
                ..Self::new(usize::MAX)
            }
        }
    }

    impl Environment for CountingEnv {
        fn observation_space(&self) -> ObservationSpace {
            ObservationSpace::new(3)
        }

        fn action_space(&self) -> ActionSpace {
            ActionSpace::Discrete(2)
        }

        fn reset(&mut self) -> Result<Vec<f32>, SimulationError> {
            self.steps = 0;
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn step(&mut self, _action: &Action) -> Result<Step, SimulationError> {
            if self.fail_at == Some(self.steps) {
                return Err(SimulationError::failure("boom"));
            }
            self.steps += 1;
            Ok(Step {
                observation: vec![0.1, 0.2, 0.3],
                reward: 1.0,
                done: self.steps >= self.length,
            })
        }

        fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>, SimulationError> {
            Ok(match mode {
                RenderMode::Human => None,
                RenderMode::RgbArray => Some(Frame::filled(1, 1, [0, 0, 0])),
            })
        }
    }

    pub(crate) fn agent(hidden: usize) -> Agent {
        AgentFactory::new(
            Topology::new(3, vec![hidden], 2).unwrap(),
            1,
            SeedPolicy::PerAgent,
        )
        .create(0)
    }

    #[test]
    fn test_score_is_sum_of_rewards() {
        let rollout = simulate(&agent(4), &mut CountingEnv::new(5), &RolloutOptions::default())
            .unwrap();
        assert!((rollout.score - 5.0).abs() < f32::EPSILON);
        assert_eq!(rollout.steps, 5);
        assert!(!rollout.truncated);
        assert!(rollout.frames.is_empty());
    }

    #[test]
    fn test_step_budget_truncates() {
        let options = RolloutOptions::with_max_steps(Some(3));
        let rollout = simulate(&agent(4), &mut CountingEnv::new(10), &options).unwrap();
        assert_eq!(rollout.steps, 3);
        assert!(rollout.truncated);
        assert!((rollout.score - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_records_one_frame_per_state() {
        let options = RolloutOptions {
            render: true,
            record_frames: true,
            max_steps: None,
        };
        let rollout = simulate(&agent(4), &mut CountingEnv::new(4), &options).unwrap();
        assert_eq!(rollout.frames.len(), 5);
    }

    #[test]
    fn test_environment_errors_propagate() {
        let err = simulate(
            &agent(4),
            &mut CountingEnv::failing(2),
            &RolloutOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, SimulationError::failure("boom"));
    }

    #[test]
    fn test_incompatible_agent_is_a_failure() {
        let wide = AgentFactory::new(Topology::new(5, vec![4], 2).unwrap(), 1, SeedPolicy::Shared)
            .create(0);
        let err = simulate(&wide, &mut CountingEnv::new(5), &RolloutOptions::default())
            .unwrap_err();
        assert!(matches!(err, SimulationError::Failure { .. }));
    }
}
