//! NEAT hyperparameter configuration
//!
//! Settings are grouped the same way as the classic NEAT key-value file: a
//! top-level `neat` section plus one section per collaborator (genome, species
//! set, stagnation, reproduction). Files are YAML.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::activation::Activation;

/// How a set of fitness values is reduced to a single number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessAggregate {
    Max,
    Min,
    Mean,
}

impl FitnessAggregate {
    /// Reduce `values`; an empty slice reduces to negative infinity
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NEG_INFINITY;
        }
        match self {
            FitnessAggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            FitnessAggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            FitnessAggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

/// Initial wiring of freshly created genomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialConnection {
    /// Every input to every hidden node (or output when there are no hidden nodes),
    /// every hidden node to every output
    Full,
    /// No connections at all
    Unconnected,
}

/// Top-level run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Reduction of all genome fitnesses compared against the threshold
    pub fitness_criterion: FitnessAggregate,
    /// Evolution stops once the criterion reaches this value
    pub fitness_threshold: f64,
    /// Ignore the threshold and always run the requested generations
    #[serde(default)]
    pub no_fitness_termination: bool,
    /// Number of genomes per generation
    pub pop_size: usize,
    /// Start over with a random population when every species dies out
    pub reset_on_extinction: bool,
}

/// Genome shape and mutation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub num_hidden: usize,
    /// Reject connections that would create a cycle
    pub feed_forward: bool,
    pub initial_connection: InitialConnection,

    pub activation_default: Activation,
    pub activation_mutate_rate: f64,
    pub activation_options: Vec<Activation>,

    pub bias_init_mean: f64,
    pub bias_init_stdev: f64,
    pub bias_max_value: f64,
    pub bias_min_value: f64,
    pub bias_mutate_power: f64,
    pub bias_mutate_rate: f64,
    pub bias_replace_rate: f64,

    pub weight_init_mean: f64,
    pub weight_init_stdev: f64,
    pub weight_max_value: f64,
    pub weight_min_value: f64,
    pub weight_mutate_power: f64,
    pub weight_mutate_rate: f64,
    pub weight_replace_rate: f64,

    pub enabled_default: bool,
    pub enabled_mutate_rate: f64,

    pub conn_add_prob: f64,
    pub conn_delete_prob: f64,
    pub node_add_prob: f64,
    pub node_delete_prob: f64,

    pub compatibility_disjoint_coefficient: f64,
    pub compatibility_weight_coefficient: f64,
}

impl GenomeConfig {
    /// Keys of the input pins: -1, -2, ...
    pub fn input_keys(&self) -> Vec<i64> {
        (1..=self.num_inputs as i64).map(|i| -i).collect()
    }

    /// Keys of the output nodes: 0, 1, ...
    pub fn output_keys(&self) -> Vec<i64> {
        (0..self.num_outputs as i64).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSetConfig {
    /// Genomes closer than this to a representative join its species
    pub compatibility_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagnationConfig {
    pub species_fitness_func: FitnessAggregate,
    /// Generations without improvement before a species is removed
    pub max_stagnation: u32,
    /// Number of best species protected from stagnation
    pub species_elitism: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Best members copied unchanged into the next generation, per species
    pub elitism: usize,
    /// Fraction of each species allowed to reproduce
    pub survival_threshold: f64,
    pub min_species_size: usize,
}

/// Complete NEAT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeatConfig {
    pub neat: RunConfig,
    pub genome: GenomeConfig,
    pub species_set: SpeciesSetConfig,
    pub stagnation: StagnationConfig,
    pub reproduction: ReproductionConfig,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            neat: RunConfig {
                fitness_criterion: FitnessAggregate::Max,
                fitness_threshold: 100.0,
                no_fitness_termination: false,
                pop_size: 50,
                reset_on_extinction: false,
            },
            genome: GenomeConfig {
                num_inputs: 3,
                num_outputs: 1,
                num_hidden: 0,
                feed_forward: true,
                initial_connection: InitialConnection::Full,
                activation_default: Activation::Tanh,
                activation_mutate_rate: 0.0,
                activation_options: vec![Activation::Tanh],
                bias_init_mean: 0.0,
                bias_init_stdev: 1.0,
                bias_max_value: 30.0,
                bias_min_value: -30.0,
                bias_mutate_power: 0.5,
                bias_mutate_rate: 0.7,
                bias_replace_rate: 0.1,
                weight_init_mean: 0.0,
                weight_init_stdev: 1.0,
                weight_max_value: 30.0,
                weight_min_value: -30.0,
                weight_mutate_power: 0.5,
                weight_mutate_rate: 0.8,
                weight_replace_rate: 0.1,
                enabled_default: true,
                enabled_mutate_rate: 0.01,
                conn_add_prob: 0.5,
                conn_delete_prob: 0.5,
                node_add_prob: 0.2,
                node_delete_prob: 0.2,
                compatibility_disjoint_coefficient: 1.0,
                compatibility_weight_coefficient: 0.5,
            },
            species_set: SpeciesSetConfig {
                compatibility_threshold: 3.0,
            },
            stagnation: StagnationConfig {
                species_fitness_func: FitnessAggregate::Max,
                max_stagnation: 20,
                species_elitism: 2,
            },
            reproduction: ReproductionConfig {
                elitism: 2,
                survival_threshold: 0.2,
                min_species_size: 2,
            },
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{name} must be in [0, 1], got {value}"));
    }
    Ok(())
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), String> {
    if min > max {
        return Err(format!(
            "{name}_min_value ({min}) cannot exceed {name}_max_value ({max})"
        ));
    }
    Ok(())
}

impl NeatConfig {
    /// Load and validate a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read NEAT config {:?}", path))?;
        let config: NeatConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse NEAT config {:?}", path))?;
        config
            .validate()
            .map_err(|e| anyhow!("Invalid NEAT config {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Save the configuration as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize NEAT config")?;
        std::fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write NEAT config {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.neat.pop_size == 0 {
            return Err("pop_size must be at least 1".to_string());
        }

        let genome = &self.genome;
        if genome.num_inputs == 0 || genome.num_outputs == 0 {
            return Err("num_inputs and num_outputs must be at least 1".to_string());
        }
        if genome.activation_options.is_empty() {
            return Err("activation_options cannot be empty".to_string());
        }
        if genome.bias_init_stdev < 0.0 || genome.weight_init_stdev < 0.0 {
            return Err("init stdev values must be non-negative".to_string());
        }
        if genome.bias_mutate_power < 0.0 || genome.weight_mutate_power < 0.0 {
            return Err("mutate power values must be non-negative".to_string());
        }
        check_range("bias", genome.bias_min_value, genome.bias_max_value)?;
        check_range("weight", genome.weight_min_value, genome.weight_max_value)?;

        for (name, value) in [
            ("activation_mutate_rate", genome.activation_mutate_rate),
            ("bias_mutate_rate", genome.bias_mutate_rate),
            ("bias_replace_rate", genome.bias_replace_rate),
            ("weight_mutate_rate", genome.weight_mutate_rate),
            ("weight_replace_rate", genome.weight_replace_rate),
            ("enabled_mutate_rate", genome.enabled_mutate_rate),
            ("conn_add_prob", genome.conn_add_prob),
            ("conn_delete_prob", genome.conn_delete_prob),
            ("node_add_prob", genome.node_add_prob),
            ("node_delete_prob", genome.node_delete_prob),
            ("survival_threshold", self.reproduction.survival_threshold),
        ] {
            check_probability(name, value)?;
        }

        if self.species_set.compatibility_threshold <= 0.0 {
            return Err(format!(
                "compatibility_threshold must be positive, got {}",
                self.species_set.compatibility_threshold
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NeatConfig::default();
        assert_eq!(config.neat.pop_size, 50);
        assert_eq!(config.neat.fitness_threshold, 100.0);
        assert_eq!(config.genome.num_inputs, 3);
        assert_eq!(config.genome.num_outputs, 1);
        assert_eq!(config.genome.activation_default, Activation::Tanh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_keys() {
        let config = NeatConfig::default();
        assert_eq!(config.genome.input_keys(), vec![-1, -2, -3]);
        assert_eq!(config.genome.output_keys(), vec![0]);
    }

    #[test]
    fn test_validation_zero_population() {
        let mut config = NeatConfig::default();
        config.neat.pop_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_probability_out_of_range() {
        let mut config = NeatConfig::default();
        config.genome.conn_add_prob = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_inverted_weight_range() {
        let mut config = NeatConfig::default();
        config.genome.weight_min_value = 10.0;
        config.genome.weight_max_value = -10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fitness_aggregate() {
        let values = [1.0, 4.0, 7.0];
        assert_eq!(FitnessAggregate::Max.apply(&values), 7.0);
        assert_eq!(FitnessAggregate::Min.apply(&values), 1.0);
        assert_eq!(FitnessAggregate::Mean.apply(&values), 4.0);
        assert_eq!(FitnessAggregate::Max.apply(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("neat.yaml");

        let mut config = NeatConfig::default();
        config.neat.pop_size = 12;
        config.save(&path).unwrap();

        let loaded = NeatConfig::from_file(&path).unwrap();
        assert_eq!(loaded.neat.pop_size, 12);
        assert_eq!(loaded.genome.activation_options, vec![Activation::Tanh]);
        assert_eq!(loaded.stagnation.species_fitness_func, FitnessAggregate::Max);
    }

    #[test]
    fn test_shipped_config_parses() {
        let yaml = include_str!("../../config/neat.yaml");
        let config: NeatConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.genome.num_inputs, 3);
    }
}
