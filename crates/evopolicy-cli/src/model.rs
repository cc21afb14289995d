use chrono::{DateTime, Utc};
use evopolicy_network::Agent;
use evopolicy_training::config::TrainingConfig;
use serde::{Deserialize, Serialize};

/// A trained policy as written by `train` and read by `replay`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub final_fitness: f32,
    /// Seed the training run used, for reproducing it.
    pub seed: u64,
    pub config: TrainingConfig,
    pub agent: Agent,
}

#[cfg(test)]
mod tests {
    use evopolicy_network::{AgentFactory, SeedPolicy, Topology};

    use super::*;

    #[test]
    fn test_model_json_round_trip() {
        let agent = AgentFactory::new(
            Topology::new(4, vec![4], 2).unwrap(),
            1,
            SeedPolicy::PerAgent,
        )
        .create(0);
        let model = PolicyModel {
            name: "cart-pole".to_owned(),
            trained_at: Utc::now(),
            final_fitness: 500.0,
            seed: 1,
            config: TrainingConfig::default(),
            agent: agent.clone(),
        };
        let json = serde_json::to_string(&model).unwrap();
        let back: PolicyModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agent, agent);
        assert_eq!(back.config, model.config);
        assert_eq!(back.trained_at, model.trained_at);
    }
}
