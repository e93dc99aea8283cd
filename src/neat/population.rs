//! The NEAT generation loop

use std::ops::ControlFlow;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::NeatConfig;
use super::genome::Genome;
use super::reporting::{Reporter, ReporterSet, StatisticsReporter};
use super::reproduction::Reproduction;
use super::species::SpeciesSet;

/// An evolving population of genomes
pub struct Population {
    config: NeatConfig,
    genomes: Vec<Genome>,
    species: SpeciesSet,
    reproduction: Reproduction,
    reporters: ReporterSet,
    statistics: StatisticsReporter,
    generation: u32,
    best_genome: Option<Genome>,
    rng: StdRng,
}

impl Population {
    /// Create the initial population. `seed` makes the run reproducible.
    pub fn new(config: NeatConfig, seed: Option<u64>) -> Result<Self> {
        if let Err(e) = config.validate() {
            bail!("Invalid NEAT config: {}", e);
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut reproduction = Reproduction::new(&config);
        let genomes = reproduction.create_new(&config.genome, config.neat.pop_size, &mut rng);
        let mut species = SpeciesSet::new();
        species.speciate(&config, &genomes, 0);

        Ok(Self {
            config,
            genomes,
            species,
            reproduction,
            reporters: ReporterSet::new(),
            statistics: StatisticsReporter::new(),
            generation: 0,
            best_genome: None,
            rng,
        })
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.add(reporter);
    }

    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn species(&self) -> &SpeciesSet {
        &self.species
    }

    pub fn statistics(&self) -> &StatisticsReporter {
        &self.statistics
    }

    /// Index of the next generation to be evaluated
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genome.as_ref()
    }

    /// Evolve for at most `generations` generations (unbounded when `None`).
    ///
    /// `fitness_fn` must assign a fitness to every genome it is given; it may
    /// return `ControlFlow::Break` to end the run after the current generation's
    /// evaluation. Returns the best genome seen.
    pub fn run<F>(&mut self, mut fitness_fn: F, generations: Option<u32>) -> Result<Genome>
    where
        F: FnMut(&mut [Genome], &NeatConfig) -> Result<ControlFlow<()>>,
    {
        if self.config.neat.no_fitness_termination && generations.is_none() {
            bail!("Cannot have no generational limit with no fitness termination");
        }

        let mut completed = 0;
        while generations.map_or(true, |n| completed < n) {
            completed += 1;
            self.reporters.start_generation(self.generation);

            let flow = fitness_fn(self.genomes.as_mut_slice(), &self.config)?;

            let best = match self
                .genomes
                .iter()
                .filter(|g| g.fitness.is_some())
                .max_by(|a, b| a.fitness_or_min().total_cmp(&b.fitness_or_min()))
            {
                Some(best) => best.clone(),
                None => bail!(
                    "Fitness function assigned no fitness in generation {}",
                    self.generation
                ),
            };
            if flow.is_continue() {
                if let Some(genome) = self.genomes.iter().find(|g| g.fitness.is_none()) {
                    bail!("Fitness not assigned to genome {}", genome.key);
                }
            }

            self.reporters
                .post_evaluate(&self.config, &self.genomes, &self.species, &best);
            self.statistics
                .post_evaluate(&self.config, &self.genomes, &self.species, &best);

            let improved = self
                .best_genome
                .as_ref()
                .map_or(true, |current| best.fitness_or_min() > current.fitness_or_min());
            if improved {
                self.best_genome = Some(best.clone());
            }

            if flow.is_break() {
                log::info!("Evolution stopped during generation {}", self.generation);
                break;
            }

            if !self.config.neat.no_fitness_termination {
                let fitnesses: Vec<f64> =
                    self.genomes.iter().map(Genome::fitness_or_min).collect();
                let criterion = self.config.neat.fitness_criterion.apply(&fitnesses);
                if criterion >= self.config.neat.fitness_threshold {
                    self.reporters
                        .found_solution(&self.config, self.generation, &best);
                    break;
                }
            }

            self.genomes = self.reproduction.reproduce(
                &self.config,
                &mut self.species,
                &self.genomes,
                self.generation,
                &mut self.reporters,
                &mut self.rng,
            );

            if self.species.is_empty() {
                self.reporters.complete_extinction();
                if self.config.neat.reset_on_extinction {
                    self.genomes = self.reproduction.create_new(
                        &self.config.genome,
                        self.config.neat.pop_size,
                        &mut self.rng,
                    );
                } else {
                    bail!("All species went extinct in generation {}", self.generation);
                }
            }

            self.species
                .speciate(&self.config, &self.genomes, self.generation);
            self.reporters
                .end_generation(&self.config, &self.genomes, &self.species);

            self.generation += 1;
        }

        if self.config.neat.no_fitness_termination {
            if let Some(best) = &self.best_genome {
                self.reporters
                    .found_solution(&self.config, self.generation, best);
            }
        }

        match &self.best_genome {
            Some(best) => Ok(best.clone()),
            None => bail!("No generation was evaluated"),
        }
    }
}
