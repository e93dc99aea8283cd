//! Representative-based speciation

use std::collections::{BTreeMap, HashMap};

use super::config::NeatConfig;
use super::genome::Genome;

/// A cluster of genomes within the compatibility threshold of a representative
#[derive(Debug, Clone)]
pub struct Species {
    pub key: u64,
    pub created: u32,
    pub last_improved: u32,
    pub representative: Genome,
    /// Keys of the member genomes in the current population
    pub members: Vec<u64>,
    pub fitness: Option<f64>,
    pub adjusted_fitness: Option<f64>,
    pub fitness_history: Vec<f64>,
}

impl Species {
    fn new(key: u64, generation: u32, representative: Genome) -> Self {
        Self {
            key,
            created: generation,
            last_improved: generation,
            representative,
            members: Vec::new(),
            fitness: None,
            adjusted_fitness: None,
            fitness_history: Vec::new(),
        }
    }

    /// Fitness of every member found in `population`
    pub fn member_fitnesses(&self, population: &HashMap<u64, &Genome>) -> Vec<f64> {
        self.members
            .iter()
            .filter_map(|key| population.get(key))
            .map(|genome| genome.fitness_or_min())
            .collect()
    }
}

/// Index genomes by key
pub fn index_population(population: &[Genome]) -> HashMap<u64, &Genome> {
    population.iter().map(|genome| (genome.key, genome)).collect()
}

#[derive(Debug, Clone)]
pub struct SpeciesSet {
    pub species: BTreeMap<u64, Species>,
    genome_to_species: HashMap<u64, u64>,
    next_key: u64,
}

impl SpeciesSet {
    pub fn new() -> Self {
        Self {
            species: BTreeMap::new(),
            genome_to_species: HashMap::new(),
            next_key: 1,
        }
    }

    /// Partition `population` into species.
    ///
    /// Every existing species first claims the closest genome as its new
    /// representative; the rest join the closest representative within the
    /// compatibility threshold or found a new species. Species that find no
    /// representative are dropped.
    pub fn speciate(&mut self, config: &NeatConfig, population: &[Genome], generation: u32) {
        let threshold = config.species_set.compatibility_threshold;
        let genome_config = &config.genome;

        let mut unspeciated: Vec<&Genome> = population.iter().collect();
        let mut assignments: BTreeMap<u64, (&Genome, Vec<u64>)> = BTreeMap::new();

        for (&species_key, species) in &self.species {
            let closest = unspeciated
                .iter()
                .enumerate()
                .map(|(i, genome)| (i, species.representative.distance(genome, genome_config)))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((index, _)) = closest {
                let representative = unspeciated.remove(index);
                assignments.insert(species_key, (representative, vec![representative.key]));
            }
        }

        for genome in unspeciated {
            let closest = assignments
                .iter()
                .map(|(&key, (rep, _))| (key, rep.distance(genome, genome_config)))
                .filter(|&(_, d)| d < threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match closest {
                Some((key, _)) => {
                    if let Some((_, members)) = assignments.get_mut(&key) {
                        members.push(genome.key);
                    }
                }
                None => {
                    let key = self.next_key;
                    self.next_key += 1;
                    assignments.insert(key, (genome, vec![genome.key]));
                }
            }
        }

        let mut species = BTreeMap::new();
        self.genome_to_species.clear();
        for (key, (representative, members)) in assignments {
            let mut entry = self
                .species
                .remove(&key)
                .unwrap_or_else(|| Species::new(key, generation, representative.clone()));
            entry.representative = representative.clone();
            for &member in &members {
                self.genome_to_species.insert(member, key);
            }
            entry.members = members;
            species.insert(key, entry);
        }
        self.species = species;

        log::debug!(
            "Speciated {} genomes into {} species (generation {})",
            population.len(),
            self.species.len(),
            generation
        );
    }

    /// Species key of a genome in the current population
    pub fn species_of(&self, genome_key: u64) -> Option<u64> {
        self.genome_to_species.get(&genome_key).copied()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

impl Default for SpeciesSet {
    fn default() -> Self {
        Self::new()
    }
}
