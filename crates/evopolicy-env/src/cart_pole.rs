//! Classic cart-pole balancing task.
//!
//! A pole is hinged on a cart moving along a frictionless track. Each step
//! the agent pushes the cart left (`0`) or right (`1`) and receives a reward
//! of `1.0`. The episode ends when the pole tilts more than 12 degrees, the
//! cart leaves the track (`|x| > 2.4`), or the step limit is reached.
//!
//! Observation: `[x, x_dot, theta, theta_dot]`.

use std::f32::consts::PI;

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{
    Action, ActionSpace, Environment, Frame, ObservationSpace, RenderMode, SimulationError, Step,
};

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const TOTAL_MASS: f32 = CART_MASS + POLE_MASS;
const HALF_POLE_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = POLE_MASS * HALF_POLE_LENGTH;
const FORCE: f32 = 10.0;
const TAU: f32 = 0.02;
const THETA_LIMIT: f32 = 12.0 * 2.0 * PI / 360.0;
const X_LIMIT: f32 = 2.4;

/// Step limit used by [`CartPole::new`].
pub const DEFAULT_STEP_LIMIT: usize = 500;

const FRAME_WIDTH: usize = 120;
const FRAME_HEIGHT: usize = 80;

#[derive(Debug, Clone)]
pub struct CartPole {
    rng: Pcg32,
    state: Option<[f32; 4]>,
    steps: usize,
    step_limit: usize,
    done: bool,
}

impl CartPole {
    /// Creates an environment whose initial states are drawn from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_step_limit(seed, DEFAULT_STEP_LIMIT)
    }

    #[must_use]
    pub fn with_step_limit(seed: u64, step_limit: usize) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            state: None,
            steps: 0,
            step_limit,
            done: false,
        }
    }
}

impl Environment for CartPole {
    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::new(4)
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(2)
    }

    fn reset(&mut self) -> Result<Vec<f32>, SimulationError> {
        let state: [f32; 4] = std::array::from_fn(|_| self.rng.random_range(-0.05..0.05));
        self.state = Some(state);
        self.steps = 0;
        self.done = false;
        Ok(state.to_vec())
    }

    fn step(&mut self, action: &Action) -> Result<Step, SimulationError> {
        let Some([x, x_dot, theta, theta_dot]) = self.state else {
            return Err(SimulationError::NotReset);
        };
        if !self.action_space().contains(action) {
            return Err(SimulationError::InvalidAction {
                action: action.clone(),
                space: self.action_space(),
            });
        }
        let force = if *action == Action::Discrete(0) {
            -FORCE
        } else {
            FORCE
        };
        if self.done {
            return Ok(Step {
                observation: vec![x, x_dot, theta, theta_dot],
                reward: 0.0,
                done: true,
            });
        }

        let (sin, cos) = theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (HALF_POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        let next = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.state = Some(next);
        self.steps += 1;

        let fell = next[0].abs() > X_LIMIT || next[2].abs() > THETA_LIMIT;
        self.done = fell || self.steps >= self.step_limit;

        Ok(Step {
            observation: next.to_vec(),
            reward: 1.0,
            done: self.done,
        })
    }

    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>, SimulationError> {
        let Some([x, _, theta, _]) = self.state else {
            return Err(SimulationError::NotReset);
        };
        match mode {
            RenderMode::Human => {
                log::trace!(
                    "cart-pole step {}: x={x:+.3} theta={:+.2}deg",
                    self.steps,
                    theta.to_degrees()
                );
                Ok(None)
            }
            RenderMode::RgbArray => Ok(Some(draw(x, theta))),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn draw(x: f32, theta: f32) -> Frame {
    const BACKGROUND: [u8; 3] = [255, 255, 255];
    const TRACK: [u8; 3] = [0, 0, 0];
    const CART: [u8; 3] = [40, 40, 40];
    const POLE: [u8; 3] = [202, 152, 101];

    let mut frame = Frame::filled(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND);
    let scale = FRAME_WIDTH as f32 / (2.0 * X_LIMIT);
    let track_y = (FRAME_HEIGHT * 3 / 4) as isize;
    for px in 0..FRAME_WIDTH as isize {
        frame.put(px, track_y, TRACK);
    }

    let cart_x = (x * scale + FRAME_WIDTH as f32 / 2.0) as isize;
    for dx in -6..=6 {
        for dy in -4..=0 {
            frame.put(cart_x + dx, track_y - 1 + dy, CART);
        }
    }

    let pole_length = 2.0 * HALF_POLE_LENGTH * scale;
    let (sin, cos) = theta.sin_cos();
    let base_y = (track_y - 5) as f32;
    let steps = pole_length.ceil() as usize;
    for i in 0..=steps {
        let t = i as f32;
        let px = cart_x as f32 + sin * t;
        let py = base_y - cos * t;
        frame.put(px.round() as isize, py.round() as isize, POLE);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_requires_reset() {
        let mut env = CartPole::new(0);
        assert_eq!(
            env.step(&Action::Discrete(0)),
            Err(SimulationError::NotReset)
        );
    }

    #[test]
    fn test_reset_is_seeded() {
        let mut a = CartPole::new(42);
        let mut b = CartPole::new(42);
        let obs = a.reset().unwrap();
        assert_eq!(obs, b.reset().unwrap());
        assert_eq!(obs.len(), 4);
        assert!(obs.iter().all(|v| v.abs() <= 0.05));
    }

    #[test]
    fn test_constant_push_falls_over() {
        let mut env = CartPole::new(1);
        env.reset().unwrap();
        let mut total = 0.0;
        let mut done = false;
        while !done {
            let step = env.step(&Action::Discrete(1)).unwrap();
            total += step.reward;
            done = step.done;
        }
        // Pushing one way topples the pole long before the step limit.
        assert!(total > 5.0 && total < 100.0, "{total}");
        let after = env.step(&Action::Discrete(1)).unwrap();
        assert!(after.done);
        assert!(after.reward.abs() < f32::EPSILON);
    }

    #[test]
    fn test_step_limit_truncates() {
        let mut env = CartPole::with_step_limit(3, 3);
        env.reset().unwrap();
        let dones: Vec<_> = (0..3)
            .map(|i| env.step(&Action::Discrete(i % 2)).unwrap().done)
            .collect();
        assert_eq!(dones, [false, false, true]);
    }

    #[test]
    fn test_invalid_action() {
        let mut env = CartPole::new(0);
        env.reset().unwrap();
        for action in [Action::Discrete(2), Action::Continuous(vec![0.0, 1.0])] {
            assert!(!env.action_space().contains(&action));
            let err = env.step(&action).unwrap_err();
            assert_eq!(
                err,
                SimulationError::InvalidAction {
                    action,
                    space: ActionSpace::Discrete(2),
                }
            );
        }
        env.step(&Action::Discrete(1)).unwrap();
    }

    #[test]
    fn test_render_rgb_frame() {
        let mut env = CartPole::new(0);
        env.reset().unwrap();
        let frame = env.render(RenderMode::RgbArray).unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (FRAME_WIDTH, FRAME_HEIGHT));
        assert_eq!(frame.pixel(0, FRAME_HEIGHT * 3 / 4), [0, 0, 0]);
        assert!(env.render(RenderMode::Human).unwrap().is_none());
    }
}
