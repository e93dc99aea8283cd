//! Detection of species that stopped improving

use super::config::StagnationConfig;
use super::genome::Genome;
use super::species::{index_population, SpeciesSet};

/// Verdict for one species after a generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagnationReport {
    pub species_key: u64,
    pub fitness: f64,
    pub stagnant: bool,
}

pub struct Stagnation {
    config: StagnationConfig,
}

impl Stagnation {
    pub fn new(config: StagnationConfig) -> Self {
        Self { config }
    }

    /// Refresh every species' fitness and history, then flag the stagnant ones.
    ///
    /// Reports are ordered from worst to best species fitness. The
    /// `species_elitism` best species are never flagged, and flagging stops once
    /// only that many non-stagnant species would remain.
    pub fn update(
        &self,
        species_set: &mut SpeciesSet,
        population: &[Genome],
        generation: u32,
    ) -> Vec<StagnationReport> {
        let index = index_population(population);

        let mut data = Vec::with_capacity(species_set.len());
        for species in species_set.species.values_mut() {
            let previous_best = species
                .fitness_history
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);

            let fitness = self
                .config
                .species_fitness_func
                .apply(&species.member_fitnesses(&index));
            species.fitness = Some(fitness);
            species.fitness_history.push(fitness);
            species.adjusted_fitness = None;

            if fitness > previous_best {
                species.last_improved = generation;
            }

            data.push((species.key, fitness, species.last_improved));
        }

        data.sort_by(|a, b| a.1.total_cmp(&b.1));

        let total = data.len();
        let mut non_stagnant = total;
        data.into_iter()
            .enumerate()
            .map(|(idx, (species_key, fitness, last_improved))| {
                let stagnant_time = generation.saturating_sub(last_improved);

                let mut stagnant = false;
                if non_stagnant > self.config.species_elitism {
                    stagnant = stagnant_time >= self.config.max_stagnation;
                }
                if total - idx <= self.config.species_elitism {
                    stagnant = false;
                }
                if stagnant {
                    non_stagnant -= 1;
                }

                StagnationReport {
                    species_key,
                    fitness,
                    stagnant,
                }
            })
            .collect()
    }
}
