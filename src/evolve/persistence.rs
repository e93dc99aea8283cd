//! Saving and loading the winning genome
//!
//! A genome is written as JSON next to a `.meta.json` sidecar describing how it
//! was trained:
//! - `<path>` - the genome
//! - `<path>.meta.json` - metadata

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::observation::validate_controller;
use crate::neat::{Genome, GenomeConfig};

/// Metadata saved with a genome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Genome settings the network was evolved with
    pub genome_config: GenomeConfig,

    /// Generations evaluated before the genome was saved
    pub generations: u32,

    /// Fitness of the saved genome
    pub fitness: Option<f64>,

    /// Most pipes cleared in any generation
    pub best_score: u32,

    /// Version identifier for compatibility checking
    pub version: String,
}

impl ModelMetadata {
    pub fn new(
        genome_config: GenomeConfig,
        generations: u32,
        fitness: Option<f64>,
        best_score: u32,
    ) -> Self {
        Self {
            genome_config,
            generations,
            fitness,
            best_score,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn meta_path(path: &Path) -> PathBuf {
    path.with_extension("meta.json")
}

/// Save a genome and its metadata. Creates parent directories if needed.
pub fn save_genome(genome: &Genome, metadata: &ModelMetadata, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    let genome_json = serde_json::to_string_pretty(genome).context("Failed to serialize genome")?;
    std::fs::write(path, genome_json)
        .with_context(|| format!("Failed to write genome to {:?}", path))?;

    let meta_path = meta_path(path);
    let meta_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(&meta_path, meta_json)
        .with_context(|| format!("Failed to write metadata to {:?}", meta_path))?;

    log::info!("Saved genome {} to {:?}", genome.key, path);
    Ok(())
}

/// Load a genome saved by [`save_genome`] together with its metadata
pub fn load_genome(path: &Path) -> Result<(Genome, ModelMetadata)> {
    let meta_path = meta_path(path);
    let meta_json = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata from {:?}", meta_path))?;
    let metadata: ModelMetadata =
        serde_json::from_str(&meta_json).context("Failed to deserialize metadata")?;

    let genome_json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read genome from {:?}", path))?;
    let genome: Genome =
        serde_json::from_str(&genome_json).context("Failed to deserialize genome")?;

    if let Err(e) = validate_controller(&metadata.genome_config) {
        bail!("Genome in {:?} cannot fly this game: {}", path, e);
    }

    let outputs = metadata.genome_config.output_keys();
    if let Some(missing) = outputs.iter().find(|key| !genome.nodes.contains_key(key)) {
        bail!("Genome in {:?} has no output node {}", path, missing);
    }

    if metadata.version != env!("CARGO_PKG_VERSION") {
        log::warn!(
            "Genome was saved by version {}, running {}",
            metadata.version,
            env!("CARGO_PKG_VERSION")
        );
    }

    Ok((genome, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::NeatConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn trained_genome(config: &GenomeConfig) -> Genome {
        let mut rng = StdRng::seed_from_u64(17);
        let mut genome = Genome::configure_new(42, config, &mut rng);
        genome.mutate_add_node(config, &mut rng);
        genome.fitness = Some(57.3);
        genome
    }

    #[test]
    fn test_metadata_creation() {
        let config = NeatConfig::default().genome;
        let metadata = ModelMetadata::new(config, 12, Some(57.3), 9);

        assert_eq!(metadata.generations, 12);
        assert_eq!(metadata.best_score, 9);
        assert_eq!(metadata.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("models").join("winner.json");
        let config = NeatConfig::default().genome;
        let genome = trained_genome(&config);
        let metadata = ModelMetadata::new(config, 12, genome.fitness, 9);

        save_genome(&genome, &metadata, &path).unwrap();
        assert!(path.exists());
        assert!(temp_dir.path().join("models").join("winner.meta.json").exists());

        let (loaded, loaded_meta) = load_genome(&path).unwrap();
        assert_eq!(loaded, genome);
        assert_eq!(loaded_meta.generations, 12);
        assert_eq!(loaded_meta.fitness, Some(57.3));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_genome(&temp_dir.path().join("nothing.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_genome_without_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        let config = NeatConfig::default().genome;
        let metadata = ModelMetadata::new(config, 1, None, 0);

        save_genome(&Genome::new(1), &metadata, &path).unwrap();
        assert!(load_genome(&path).is_err());
    }

    #[test]
    fn test_load_rejects_wrong_input_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("two_inputs.json");
        let mut config = NeatConfig::default().genome;
        config.num_inputs = 2;
        let genome = trained_genome(&config);
        let metadata = ModelMetadata::new(config, 1, genome.fitness, 0);

        save_genome(&genome, &metadata, &path).unwrap();
        let err = load_genome(&path).unwrap_err();
        assert!(err.to_string().contains("inputs"), "{err}");
    }
}
