//! Hooks that observe a NEAT run

use std::collections::BTreeMap;
use std::time::Instant;

use super::config::NeatConfig;
use super::genome::Genome;
use super::species::SpeciesSet;

/// Observer of population events. Every method has a no-op default.
pub trait Reporter {
    fn start_generation(&mut self, _generation: u32) {}

    fn post_evaluate(
        &mut self,
        _config: &NeatConfig,
        _population: &[Genome],
        _species: &SpeciesSet,
        _best: &Genome,
    ) {
    }

    fn end_generation(&mut self, _config: &NeatConfig, _population: &[Genome], _species: &SpeciesSet) {}

    fn species_stagnant(&mut self, _species_key: u64, _size: usize) {}

    fn complete_extinction(&mut self) {}

    fn found_solution(&mut self, _config: &NeatConfig, _generation: u32, _best: &Genome) {}
}

/// Fan-out over several reporters
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for ReporterSet {
    fn start_generation(&mut self, generation: u32) {
        for r in &mut self.reporters {
            r.start_generation(generation);
        }
    }

    fn post_evaluate(
        &mut self,
        config: &NeatConfig,
        population: &[Genome],
        species: &SpeciesSet,
        best: &Genome,
    ) {
        for r in &mut self.reporters {
            r.post_evaluate(config, population, species, best);
        }
    }

    fn end_generation(&mut self, config: &NeatConfig, population: &[Genome], species: &SpeciesSet) {
        for r in &mut self.reporters {
            r.end_generation(config, population, species);
        }
    }

    fn species_stagnant(&mut self, species_key: u64, size: usize) {
        for r in &mut self.reporters {
            r.species_stagnant(species_key, size);
        }
    }

    fn complete_extinction(&mut self) {
        for r in &mut self.reporters {
            r.complete_extinction();
        }
    }

    fn found_solution(&mut self, config: &NeatConfig, generation: u32, best: &Genome) {
        for r in &mut self.reporters {
            r.found_solution(config, generation, best);
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stdev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Writes run progress through the `log` facade
pub struct LogReporter {
    show_species_detail: bool,
    generation: u32,
    generation_start: Option<Instant>,
}

impl LogReporter {
    pub fn new(show_species_detail: bool) -> Self {
        Self {
            show_species_detail,
            generation: 0,
            generation_start: None,
        }
    }
}

impl Reporter for LogReporter {
    fn start_generation(&mut self, generation: u32) {
        self.generation = generation;
        self.generation_start = Some(Instant::now());
        log::info!("****** Running generation {} ******", generation);
    }

    fn post_evaluate(
        &mut self,
        _config: &NeatConfig,
        population: &[Genome],
        species: &SpeciesSet,
        best: &Genome,
    ) {
        let fitnesses: Vec<f64> = population.iter().map(Genome::fitness_or_min).collect();
        log::info!(
            "Population's average fitness: {:.5} stdev: {:.5}",
            mean(&fitnesses),
            stdev(&fitnesses)
        );
        log::info!(
            "Best fitness: {:.5} - size: {:?} - species {:?} - id {}",
            best.fitness_or_min(),
            best.size(),
            species.species_of(best.key),
            best.key
        );
    }

    fn end_generation(&mut self, _config: &NeatConfig, population: &[Genome], species: &SpeciesSet) {
        log::info!(
            "Population of {} members in {} species",
            population.len(),
            species.len()
        );

        if self.show_species_detail {
            for s in species.species.values() {
                log::debug!(
                    "  species {:>4} age {:>3} size {:>4} fitness {} adjusted {} stagnant {}",
                    s.key,
                    self.generation.saturating_sub(s.created),
                    s.members.len(),
                    s.fitness.map_or("--".to_string(), |f| format!("{:.3}", f)),
                    s.adjusted_fitness
                        .map_or("--".to_string(), |f| format!("{:.3}", f)),
                    self.generation.saturating_sub(s.last_improved)
                );
            }
        }

        if let Some(start) = self.generation_start {
            log::info!("Generation time: {:.3} sec", start.elapsed().as_secs_f64());
        }
    }

    fn species_stagnant(&mut self, species_key: u64, size: usize) {
        log::info!(
            "Species {} with {} members is stagnated: removing it",
            species_key,
            size
        );
    }

    fn complete_extinction(&mut self) {
        log::warn!("All species extinct");
    }

    fn found_solution(&mut self, _config: &NeatConfig, generation: u32, best: &Genome) {
        log::info!(
            "Best individual in generation {} meets fitness threshold - complexity: {:?}",
            generation,
            best.size()
        );
    }
}

/// Per-generation fitness and species statistics, kept for the whole run
#[derive(Debug, Clone, Default)]
pub struct StatisticsReporter {
    most_fit_genomes: Vec<Genome>,
    /// species key -> member fitnesses, one map per generation
    generation_statistics: Vec<BTreeMap<u64, Vec<f64>>>,
}

impl StatisticsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean population fitness of every generation
    pub fn fitness_mean(&self) -> Vec<f64> {
        self.fitness_stat(mean)
    }

    pub fn fitness_stdev(&self) -> Vec<f64> {
        self.fitness_stat(stdev)
    }

    fn fitness_stat(&self, f: fn(&[f64]) -> f64) -> Vec<f64> {
        self.generation_statistics
            .iter()
            .map(|stats| {
                let all: Vec<f64> = stats.values().flatten().copied().collect();
                f(&all)
            })
            .collect()
    }

    /// Best genome of every generation
    pub fn most_fit_genomes(&self) -> &[Genome] {
        &self.most_fit_genomes
    }

    /// Best genome seen in any generation
    pub fn best_genome(&self) -> Option<&Genome> {
        self.most_fit_genomes
            .iter()
            .max_by(|a, b| a.fitness_or_min().total_cmp(&b.fitness_or_min()))
    }

    /// Species sizes per generation, one column per species ever seen
    pub fn species_sizes(&self) -> Vec<Vec<usize>> {
        let all_species: Vec<u64> = {
            let mut keys: Vec<u64> = self
                .generation_statistics
                .iter()
                .flat_map(|stats| stats.keys().copied())
                .collect();
            keys.sort_unstable();
            keys.dedup();
            keys
        };

        self.generation_statistics
            .iter()
            .map(|stats| {
                all_species
                    .iter()
                    .map(|key| stats.get(key).map_or(0, Vec::len))
                    .collect()
            })
            .collect()
    }

    pub fn generations(&self) -> usize {
        self.generation_statistics.len()
    }
}

impl Reporter for StatisticsReporter {
    fn post_evaluate(
        &mut self,
        _config: &NeatConfig,
        population: &[Genome],
        species: &SpeciesSet,
        best: &Genome,
    ) {
        self.most_fit_genomes.push(best.clone());

        let mut stats: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
        for genome in population {
            if let Some(key) = species.species_of(genome.key) {
                stats.entry(key).or_default().push(genome.fitness_or_min());
            }
        }
        self.generation_statistics.push(stats);
    }
}
