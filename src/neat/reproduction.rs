//! Fitness-shared reproduction across species

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::{GenomeConfig, NeatConfig};
use super::genome::Genome;
use super::reporting::Reporter;
use super::species::{index_population, SpeciesSet};
use super::stagnation::Stagnation;

/// Number of offspring per species.
///
/// Each species moves halfway from its previous size towards its share of
/// `pop_size` (proportional to adjusted fitness, at least `min_species_size`);
/// the results are then rescaled so they roughly sum to `pop_size`.
pub fn compute_spawn(
    adjusted_fitness: &[f64],
    previous_sizes: &[usize],
    pop_size: usize,
    min_species_size: usize,
) -> Vec<usize> {
    let af_sum: f64 = adjusted_fitness.iter().sum();

    let spawn_amounts: Vec<f64> = adjusted_fitness
        .iter()
        .zip(previous_sizes)
        .map(|(&af, &ps)| {
            let share = if af_sum > 0.0 {
                (af / af_sum * pop_size as f64).max(min_species_size as f64)
            } else {
                min_species_size as f64
            };

            let ps = ps as f64;
            let d = (share - ps) * 0.5;
            let c = d.round();
            if c.abs() > 0.0 {
                ps + c
            } else if d > 0.0 {
                ps + 1.0
            } else if d < 0.0 {
                ps - 1.0
            } else {
                ps
            }
        })
        .collect();

    let total: f64 = spawn_amounts.iter().sum();
    let norm = if total > 0.0 {
        pop_size as f64 / total
    } else {
        0.0
    };

    spawn_amounts
        .into_iter()
        .map(|n| ((n * norm).round().max(0.0) as usize).max(min_species_size))
        .collect()
}

/// Creates new genomes and breeds generations
pub struct Reproduction {
    stagnation: Stagnation,
    next_genome_key: u64,
    /// child key -> parent keys
    ancestors: HashMap<u64, (u64, u64)>,
}

impl Reproduction {
    pub fn new(config: &NeatConfig) -> Self {
        Self {
            stagnation: Stagnation::new(config.stagnation.clone()),
            next_genome_key: 1,
            ancestors: HashMap::new(),
        }
    }

    fn next_key(&mut self) -> u64 {
        let key = self.next_genome_key;
        self.next_genome_key += 1;
        key
    }

    /// `count` brand-new genomes
    pub fn create_new<R: Rng>(
        &mut self,
        config: &GenomeConfig,
        count: usize,
        rng: &mut R,
    ) -> Vec<Genome> {
        (0..count)
            .map(|_| {
                let key = self.next_key();
                Genome::configure_new(key, config, rng)
            })
            .collect()
    }

    /// Parents of a bred genome
    pub fn parents_of(&self, key: u64) -> Option<(u64, u64)> {
        self.ancestors.get(&key).copied()
    }

    /// Breed the next generation from the evaluated `population`.
    ///
    /// Stagnant species are removed first. An empty result with an empty species
    /// set means every species went extinct.
    pub fn reproduce<R: Rng>(
        &mut self,
        config: &NeatConfig,
        species_set: &mut SpeciesSet,
        population: &[Genome],
        generation: u32,
        reporter: &mut dyn Reporter,
        rng: &mut R,
    ) -> Vec<Genome> {
        let reports = self.stagnation.update(species_set, population, generation);
        let index = index_population(population);

        let mut all_fitnesses = Vec::new();
        let mut remaining = Vec::new();
        for report in reports {
            let Some(species) = species_set.species.remove(&report.species_key) else {
                continue;
            };
            if report.stagnant {
                reporter.species_stagnant(species.key, species.members.len());
            } else {
                all_fitnesses.extend(species.member_fitnesses(&index));
                remaining.push(species);
            }
        }
        species_set.species.clear();

        if remaining.is_empty() {
            return Vec::new();
        }

        let min_fitness = all_fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let max_fitness = all_fitnesses
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        // Keeps adjusted fitness sane when the whole population scored alike
        let fitness_range = (max_fitness - min_fitness).max(1.0);

        for species in remaining.iter_mut() {
            let fitnesses = species.member_fitnesses(&index);
            let msf = fitnesses.iter().sum::<f64>() / fitnesses.len().max(1) as f64;
            species.adjusted_fitness = Some((msf - min_fitness) / fitness_range);
        }

        let adjusted: Vec<f64> = remaining
            .iter()
            .map(|s| s.adjusted_fitness.unwrap_or(0.0))
            .collect();
        let previous_sizes: Vec<usize> = remaining.iter().map(|s| s.members.len()).collect();
        let reproduction = &config.reproduction;
        let min_species_size = reproduction.min_species_size.max(reproduction.elitism);
        let spawn_amounts = compute_spawn(
            &adjusted,
            &previous_sizes,
            config.neat.pop_size,
            min_species_size,
        );

        log::debug!(
            "Average adjusted fitness: {:.3}",
            adjusted.iter().sum::<f64>() / adjusted.len() as f64
        );

        let mut next_population = Vec::with_capacity(config.neat.pop_size);
        for (spawn, mut species) in spawn_amounts.into_iter().zip(remaining) {
            let mut spawn = spawn.max(reproduction.elitism);

            let mut old_members: Vec<&Genome> = species
                .members
                .iter()
                .filter_map(|key| index.get(key).copied())
                .collect();
            species.members.clear();
            species_set.species.insert(species.key, species);

            old_members.sort_by(|a, b| b.fitness_or_min().total_cmp(&a.fitness_or_min()));

            for elite in old_members.iter().take(reproduction.elitism) {
                next_population.push((*elite).clone());
                spawn = spawn.saturating_sub(1);
            }

            if spawn == 0 || old_members.is_empty() {
                continue;
            }

            // Only the best fraction of each species may breed
            let cutoff = (reproduction.survival_threshold * old_members.len() as f64).ceil() as usize;
            old_members.truncate(cutoff.max(2));

            for _ in 0..spawn {
                let (Some(parent1), Some(parent2)) =
                    (old_members.choose(rng), old_members.choose(rng))
                else {
                    break;
                };
                let key = self.next_key();
                let mut child = Genome::configure_crossover(key, parent1, parent2, rng);
                child.mutate(&config.genome, rng);
                self.ancestors.insert(key, (parent1.key, parent2.key));
                next_population.push(child);
            }
        }

        next_population
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::reporting::ReporterSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_compute_spawn_even_split() {
        let spawn = compute_spawn(&[0.5, 0.5], &[10, 10], 20, 2);
        assert_eq!(spawn, vec![10, 10]);
    }

    #[test]
    fn test_compute_spawn_moves_halfway() {
        // Targets are 16 and 4; each species moves halfway from 10
        let spawn = compute_spawn(&[0.8, 0.2], &[10, 10], 20, 2);
        assert_eq!(spawn, vec![13, 7]);
    }

    #[test]
    fn test_compute_spawn_respects_minimum() {
        let spawn = compute_spawn(&[1.0, 0.0], &[18, 2], 20, 2);
        assert!(spawn[1] >= 2);
    }

    #[test]
    fn test_compute_spawn_zero_fitness() {
        let spawn = compute_spawn(&[0.0, 0.0], &[5, 5], 10, 2);
        assert_eq!(spawn, vec![5, 5]);
    }

    fn evaluated_population(config: &NeatConfig, reproduction: &mut Reproduction) -> Vec<Genome> {
        let mut rng = StdRng::seed_from_u64(1);
        let mut population =
            reproduction.create_new(&config.genome, config.neat.pop_size, &mut rng);
        for (i, genome) in population.iter_mut().enumerate() {
            genome.fitness = Some(i as f64);
        }
        population
    }

    #[test]
    fn test_create_new_assigns_unique_keys() {
        let config = NeatConfig::default();
        let mut reproduction = Reproduction::new(&config);
        let mut rng = StdRng::seed_from_u64(1);

        let genomes = reproduction.create_new(&config.genome, 5, &mut rng);
        let keys: Vec<u64> = genomes.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reproduce_keeps_population_size_and_elites() {
        let mut config = NeatConfig::default();
        config.neat.pop_size = 20;
        config.species_set.compatibility_threshold = 100.0;
        let mut reproduction = Reproduction::new(&config);
        let population = evaluated_population(&config, &mut reproduction);

        let mut species = SpeciesSet::new();
        species.speciate(&config, &population, 0);
        let mut reporters = ReporterSet::new();
        let mut rng = StdRng::seed_from_u64(2);

        let next =
            reproduction.reproduce(&config, &mut species, &population, 0, &mut reporters, &mut rng);

        assert_eq!(next.len(), 20);
        assert_eq!(species.len(), 1);

        // The fittest genome survives unchanged
        let best = &population[19];
        assert!(next.iter().any(|g| g == best));

        // Children record their parents
        let child = next.iter().find(|g| g.key > 20).unwrap();
        assert!(reproduction.parents_of(child.key).is_some());
    }

    #[test]
    fn test_stagnant_population_goes_extinct() {
        let mut config = NeatConfig::default();
        config.neat.pop_size = 10;
        config.stagnation.max_stagnation = 1;
        config.stagnation.species_elitism = 0;
        config.species_set.compatibility_threshold = 100.0;
        let mut reproduction = Reproduction::new(&config);
        let population = evaluated_population(&config, &mut reproduction);

        let mut species = SpeciesSet::new();
        species.speciate(&config, &population, 0);
        let mut reporters = ReporterSet::new();
        let mut rng = StdRng::seed_from_u64(2);

        reproduction.reproduce(&config, &mut species, &population, 0, &mut reporters, &mut rng);
        species.speciate(&config, &population, 1);
        let next =
            reproduction.reproduce(&config, &mut species, &population, 1, &mut reporters, &mut rng);

        assert!(next.is_empty());
        assert!(species.is_empty());
    }
}
