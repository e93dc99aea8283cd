//! Genomes: node and connection genes plus the operators NEAT applies to them

use std::collections::BTreeMap;

use rand::seq::IteratorRandom;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::activation::Activation;
use super::config::{GenomeConfig, InitialConnection};
use super::network::creates_cycle;

/// Node identifier. Inputs are negative, outputs start at 0.
pub type NodeKey = i64;

/// A connection is identified by its (source, target) pair
pub type ConnectionKey = (NodeKey, NodeKey);

/// Initialization and mutation parameters of one float attribute
struct FloatAttribute {
    init_mean: f64,
    init_stdev: f64,
    min: f64,
    max: f64,
    mutate_power: f64,
    mutate_rate: f64,
    replace_rate: f64,
}

impl FloatAttribute {
    fn bias(config: &GenomeConfig) -> Self {
        Self {
            init_mean: config.bias_init_mean,
            init_stdev: config.bias_init_stdev,
            min: config.bias_min_value,
            max: config.bias_max_value,
            mutate_power: config.bias_mutate_power,
            mutate_rate: config.bias_mutate_rate,
            replace_rate: config.bias_replace_rate,
        }
    }

    fn weight(config: &GenomeConfig) -> Self {
        Self {
            init_mean: config.weight_init_mean,
            init_stdev: config.weight_init_stdev,
            min: config.weight_min_value,
            max: config.weight_max_value,
            mutate_power: config.weight_mutate_power,
            mutate_rate: config.weight_mutate_rate,
            replace_rate: config.weight_replace_rate,
        }
    }

    fn init<R: Rng>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        (self.init_mean + self.init_stdev * z).clamp(self.min, self.max)
    }

    /// Perturb with probability `mutate_rate`, otherwise re-draw with
    /// probability `replace_rate`, otherwise keep
    fn mutate<R: Rng>(&self, value: f64, rng: &mut R) -> f64 {
        let roll: f64 = rng.gen();
        if roll < self.mutate_rate {
            let z: f64 = rng.sample(StandardNormal);
            (value + self.mutate_power * z).clamp(self.min, self.max)
        } else if roll < self.mutate_rate + self.replace_rate {
            self.init(rng)
        } else {
            value
        }
    }
}

/// Pick one of two values with equal probability
fn inherit<T: Copy, R: Rng>(a: T, b: T, rng: &mut R) -> T {
    if rng.gen_bool(0.5) {
        a
    } else {
        b
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub key: NodeKey,
    pub bias: f64,
    pub activation: Activation,
}

impl NodeGene {
    pub fn new<R: Rng>(key: NodeKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            bias: FloatAttribute::bias(config).init(rng),
            activation: config.activation_default,
        }
    }

    fn mutate<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.bias = FloatAttribute::bias(config).mutate(self.bias, rng);
        if rng.gen::<f64>() < config.activation_mutate_rate {
            self.activation = self.activation.choose(&config.activation_options, rng);
        }
    }

    fn crossover<R: Rng>(&self, other: &NodeGene, rng: &mut R) -> NodeGene {
        NodeGene {
            key: self.key,
            bias: inherit(self.bias, other.bias, rng),
            activation: inherit(self.activation, other.activation, rng),
        }
    }

    fn distance(&self, other: &NodeGene, config: &GenomeConfig) -> f64 {
        let mut d = (self.bias - other.bias).abs();
        if self.activation != other.activation {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub key: ConnectionKey,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new<R: Rng>(key: ConnectionKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            weight: FloatAttribute::weight(config).init(rng),
            enabled: config.enabled_default,
        }
    }

    fn mutate<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.weight = FloatAttribute::weight(config).mutate(self.weight, rng);
        if rng.gen::<f64>() < config.enabled_mutate_rate {
            self.enabled = rng.gen_bool(0.5);
        }
    }

    fn crossover<R: Rng>(&self, other: &ConnectionGene, rng: &mut R) -> ConnectionGene {
        ConnectionGene {
            key: self.key,
            weight: inherit(self.weight, other.weight, rng),
            enabled: inherit(self.enabled, other.enabled, rng),
        }
    }

    fn distance(&self, other: &ConnectionGene, config: &GenomeConfig) -> f64 {
        let mut d = (self.weight - other.weight).abs();
        if self.enabled != other.enabled {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }
}

/// A candidate network description
///
/// Genes are kept in ordered maps so iteration, and with it every random choice
/// made from a seeded generator, is reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GenomeRecord", into = "GenomeRecord")]
pub struct Genome {
    pub key: u64,
    pub nodes: BTreeMap<NodeKey, NodeGene>,
    pub connections: BTreeMap<ConnectionKey, ConnectionGene>,
    /// Assigned by the fitness function; `None` until evaluated
    pub fitness: Option<f64>,
}

/// On-disk form of a genome. JSON object keys must be strings, so the gene maps
/// are stored as lists.
#[derive(Serialize, Deserialize)]
struct GenomeRecord {
    key: u64,
    fitness: Option<f64>,
    nodes: Vec<NodeGene>,
    connections: Vec<ConnectionGene>,
}

impl From<GenomeRecord> for Genome {
    fn from(record: GenomeRecord) -> Self {
        Self {
            key: record.key,
            fitness: record.fitness,
            nodes: record.nodes.into_iter().map(|n| (n.key, n)).collect(),
            connections: record.connections.into_iter().map(|c| (c.key, c)).collect(),
        }
    }
}

impl From<Genome> for GenomeRecord {
    fn from(genome: Genome) -> Self {
        Self {
            key: genome.key,
            fitness: genome.fitness,
            nodes: genome.nodes.into_values().collect(),
            connections: genome.connections.into_values().collect(),
        }
    }
}

impl Genome {
    /// An empty genome with no genes
    pub fn new(key: u64) -> Self {
        Self {
            key,
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            fitness: None,
        }
    }

    /// Fitness for ranking purposes; unevaluated genomes rank last
    pub fn fitness_or_min(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    /// A fresh genome with output (and hidden) nodes and the configured initial wiring
    pub fn configure_new<R: Rng>(key: u64, config: &GenomeConfig, rng: &mut R) -> Self {
        let mut genome = Self::new(key);

        let outputs = config.output_keys();
        for &node in &outputs {
            genome.nodes.insert(node, NodeGene::new(node, config, rng));
        }

        let first_hidden = config.num_outputs as NodeKey;
        let hidden: Vec<NodeKey> = (first_hidden..first_hidden + config.num_hidden as NodeKey)
            .collect();
        for &node in &hidden {
            genome.nodes.insert(node, NodeGene::new(node, config, rng));
        }

        if config.initial_connection == InitialConnection::Full {
            let inputs = config.input_keys();
            let mut links = Vec::new();
            if hidden.is_empty() {
                for &i in &inputs {
                    links.extend(outputs.iter().map(|&o| (i, o)));
                }
            } else {
                for &i in &inputs {
                    links.extend(hidden.iter().map(|&h| (i, h)));
                }
                for &h in &hidden {
                    links.extend(outputs.iter().map(|&o| (h, o)));
                }
            }
            for key in links {
                genome
                    .connections
                    .insert(key, ConnectionGene::new(key, config, rng));
            }
        }

        genome
    }

    /// Child of two evaluated parents.
    ///
    /// Matching genes take each attribute from a random parent; genes only one
    /// parent has are inherited from the fitter one.
    pub fn configure_crossover<R: Rng>(
        key: u64,
        parent1: &Genome,
        parent2: &Genome,
        rng: &mut R,
    ) -> Self {
        let (fit, other) = if parent1.fitness_or_min() >= parent2.fitness_or_min() {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };

        let mut child = Self::new(key);

        for (key, gene) in &fit.connections {
            let inherited = match other.connections.get(key) {
                Some(other_gene) => gene.crossover(other_gene, rng),
                None => gene.clone(),
            };
            child.connections.insert(*key, inherited);
        }

        for (key, gene) in &fit.nodes {
            let inherited = match other.nodes.get(key) {
                Some(other_gene) => gene.crossover(other_gene, rng),
                None => gene.clone(),
            };
            child.nodes.insert(*key, inherited);
        }

        child
    }

    /// Apply structural mutations, then perturb every gene's attributes
    pub fn mutate<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        if rng.gen::<f64>() < config.node_add_prob {
            self.mutate_add_node(config, rng);
        }
        if rng.gen::<f64>() < config.node_delete_prob {
            self.mutate_delete_node(config, rng);
        }
        if rng.gen::<f64>() < config.conn_add_prob {
            self.mutate_add_connection(config, rng);
        }
        if rng.gen::<f64>() < config.conn_delete_prob {
            self.mutate_delete_connection(rng);
        }

        for gene in self.connections.values_mut() {
            gene.mutate(config, rng);
        }
        for gene in self.nodes.values_mut() {
            gene.mutate(config, rng);
        }
    }

    fn next_node_key(&self, config: &GenomeConfig) -> NodeKey {
        self.nodes
            .keys()
            .next_back()
            .map(|max| max + 1)
            .unwrap_or(config.num_outputs as NodeKey)
    }

    /// Split a random connection `a -> b` into `a -> new -> b`. The old
    /// connection is disabled; the incoming half has weight 1 and the outgoing
    /// half keeps the old weight.
    pub fn mutate_add_node<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let Some(split) = self.connections.values_mut().choose(rng) else {
            return;
        };
        split.enabled = false;
        let (source, target) = split.key;
        let weight = split.weight;

        let node = self.next_node_key(config);
        self.nodes.insert(node, NodeGene::new(node, config, rng));

        for (key, weight) in [((source, node), 1.0), ((node, target), weight)] {
            self.connections.insert(
                key,
                ConnectionGene {
                    key,
                    weight,
                    enabled: true,
                },
            );
        }
    }

    /// Connect a random source (input or node) to a random non-input node
    pub fn mutate_add_connection<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let Some(&target) = self.nodes.keys().choose(rng) else {
            return;
        };
        let Some(source) = self
            .nodes
            .keys()
            .copied()
            .chain(config.input_keys())
            .choose(rng)
        else {
            return;
        };

        let key = (source, target);
        if self.connections.contains_key(&key) {
            return;
        }

        let outputs = config.output_keys();
        if outputs.contains(&source) && outputs.contains(&target) {
            return;
        }

        if config.feed_forward {
            let existing: Vec<ConnectionKey> = self.connections.keys().copied().collect();
            if creates_cycle(&existing, key) {
                return;
            }
        }

        self.connections
            .insert(key, ConnectionGene::new(key, config, rng));
    }

    /// Remove a random hidden node along with every connection touching it
    pub fn mutate_delete_node<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let outputs = config.output_keys();
        let Some(&node) = self
            .nodes
            .keys()
            .filter(|key| !outputs.contains(*key))
            .choose(rng)
        else {
            return;
        };

        self.connections
            .retain(|&(source, target), _| source != node && target != node);
        self.nodes.remove(&node);
    }

    pub fn mutate_delete_connection<R: Rng>(&mut self, rng: &mut R) {
        if let Some(&key) = self.connections.keys().choose(rng) {
            self.connections.remove(&key);
        }
    }

    /// Compatibility distance used for speciation.
    ///
    /// Node and connection genes each contribute
    /// `(attribute differences + disjoint_coefficient * disjoint) / larger gene count`.
    pub fn distance(&self, other: &Genome, config: &GenomeConfig) -> f64 {
        let node_distance = gene_distance(
            &self.nodes,
            &other.nodes,
            config.compatibility_disjoint_coefficient,
            |a, b| a.distance(b, config),
        );
        let connection_distance = gene_distance(
            &self.connections,
            &other.connections,
            config.compatibility_disjoint_coefficient,
            |a, b| a.distance(b, config),
        );
        node_distance + connection_distance
    }

    /// (node count, enabled connection count)
    pub fn size(&self) -> (usize, usize) {
        let enabled = self.connections.values().filter(|c| c.enabled).count();
        (self.nodes.len(), enabled)
    }
}

fn gene_distance<K: Ord, G>(
    ours: &BTreeMap<K, G>,
    theirs: &BTreeMap<K, G>,
    disjoint_coefficient: f64,
    homologous: impl Fn(&G, &G) -> f64,
) -> f64 {
    if ours.is_empty() && theirs.is_empty() {
        return 0.0;
    }

    let mut disjoint = theirs.keys().filter(|k| !ours.contains_key(k)).count();
    let mut distance = 0.0;
    for (key, gene) in ours {
        match theirs.get(key) {
            Some(other) => distance += homologous(gene, other),
            None => disjoint += 1,
        }
    }

    let larger = ours.len().max(theirs.len()) as f64;
    (distance + disjoint_coefficient * disjoint as f64) / larger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::{FeedForwardNetwork, NeatConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> GenomeConfig {
        NeatConfig::default().genome
    }

    #[test]
    fn test_configure_new_full() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(7);
        let genome = Genome::configure_new(1, &config, &mut rng);

        assert_eq!(genome.nodes.len(), 1);
        assert!(genome.nodes.contains_key(&0));
        assert_eq!(genome.connections.len(), 3);
        for key in [(-1, 0), (-2, 0), (-3, 0)] {
            assert!(genome.connections[&key].enabled);
        }
        assert_eq!(genome.fitness, None);
    }

    #[test]
    fn test_configure_new_with_hidden() {
        let mut config = config();
        config.num_hidden = 2;
        let mut rng = StdRng::seed_from_u64(7);
        let genome = Genome::configure_new(1, &config, &mut rng);

        assert_eq!(genome.nodes.len(), 3);
        // 3 inputs x 2 hidden + 2 hidden x 1 output
        assert_eq!(genome.connections.len(), 8);
        assert!(genome.connections.contains_key(&(-1, 1)));
        assert!(genome.connections.contains_key(&(2, 0)));
    }

    #[test]
    fn test_add_node_splits_connection() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(3);
        let mut genome = Genome::configure_new(1, &config, &mut rng);
        let before = genome.clone();

        genome.mutate_add_node(&config, &mut rng);

        assert_eq!(genome.nodes.len(), 2);
        assert!(genome.nodes.contains_key(&1));
        assert_eq!(genome.connections.len(), 5);

        let disabled: Vec<&ConnectionGene> =
            genome.connections.values().filter(|c| !c.enabled).collect();
        assert_eq!(disabled.len(), 1);
        let (source, target) = disabled[0].key;
        let old_weight = before.connections[&(source, target)].weight;

        assert_eq!(genome.connections[&(source, 1)].weight, 1.0);
        assert_eq!(genome.connections[&(1, target)].weight, old_weight);
    }

    #[test]
    fn test_add_node_without_connections_is_noop() {
        let mut config = config();
        config.initial_connection = InitialConnection::Unconnected;
        let mut rng = StdRng::seed_from_u64(3);
        let mut genome = Genome::configure_new(1, &config, &mut rng);

        genome.mutate_add_node(&config, &mut rng);
        assert_eq!(genome.nodes.len(), 1);
    }

    #[test]
    fn test_structural_mutations_stay_acyclic() {
        let mut config = config();
        config.node_add_prob = 0.8;
        config.conn_add_prob = 0.9;
        config.conn_delete_prob = 0.1;
        config.node_delete_prob = 0.1;
        let mut rng = StdRng::seed_from_u64(11);
        let mut genome = Genome::configure_new(1, &config, &mut rng);

        for _ in 0..200 {
            genome.mutate(&config, &mut rng);

            let keys: Vec<ConnectionKey> = genome.connections.keys().copied().collect();
            for (i, &key) in keys.iter().enumerate() {
                let mut rest = keys.clone();
                rest.remove(i);
                assert!(!creates_cycle(&rest, key), "cycle through {:?}", key);
            }
            // Connections never point at inputs nor come from missing nodes
            for &(source, target) in &keys {
                assert!(target >= 0);
                assert!(source < 0 || genome.nodes.contains_key(&source));
                assert!(genome.nodes.contains_key(&target));
            }
        }

        let network = FeedForwardNetwork::create(&genome, &config);
        assert_eq!(network.activate(&[1.0, 2.0, 3.0]).len(), 1);
    }

    #[test]
    fn test_delete_node_removes_attached_connections() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(5);
        let mut genome = Genome::configure_new(1, &config, &mut rng);
        genome.mutate_add_node(&config, &mut rng);

        genome.mutate_delete_node(&config, &mut rng);

        assert_eq!(genome.nodes.len(), 1);
        assert!(genome
            .connections
            .keys()
            .all(|&(source, target)| source != 1 && target != 1));
    }

    #[test]
    fn test_delete_node_keeps_outputs() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(5);
        let mut genome = Genome::configure_new(1, &config, &mut rng);

        genome.mutate_delete_node(&config, &mut rng);
        assert!(genome.nodes.contains_key(&0));
    }

    #[test]
    fn test_crossover_inherits_disjoint_from_fitter() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(9);
        let mut fit = Genome::configure_new(1, &config, &mut rng);
        let mut weak = fit.clone();
        weak.key = 2;
        fit.mutate_add_node(&config, &mut rng);
        weak.connections
            .insert((-1, 5), ConnectionGene::new((-1, 5), &config, &mut rng));
        fit.fitness = Some(10.0);
        weak.fitness = Some(1.0);

        let child = Genome::configure_crossover(3, &weak, &fit, &mut rng);

        assert_eq!(child.key, 3);
        assert_eq!(child.fitness, None);
        assert_eq!(
            child.connections.keys().collect::<Vec<_>>(),
            fit.connections.keys().collect::<Vec<_>>()
        );
        assert!(child.nodes.contains_key(&1));
    }

    #[test]
    fn test_distance() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(2);
        let genome = Genome::configure_new(1, &config, &mut rng);
        assert_eq!(genome.distance(&genome, &config), 0.0);

        let mut other = genome.clone();
        other.connections.get_mut(&(-1, 0)).unwrap().weight += 2.0;
        // 0.5 * |2.0| over 3 connections
        assert!((genome.distance(&other, &config) - 1.0 / 3.0).abs() < 1e-9);

        let mut grown = genome.clone();
        grown.mutate_add_node(&config, &mut rng);
        let d = genome.distance(&grown, &config);
        assert!((d - grown.distance(&genome, &config)).abs() < 1e-9);
        assert!(d > 0.0);
    }

    #[test]
    fn test_attributes_stay_in_range() {
        let mut config = config();
        config.weight_mutate_power = 50.0;
        config.bias_mutate_power = 50.0;
        let mut rng = StdRng::seed_from_u64(4);
        let mut genome = Genome::configure_new(1, &config, &mut rng);

        for _ in 0..100 {
            genome.mutate(&config, &mut rng);
        }
        for conn in genome.connections.values() {
            assert!((-30.0..=30.0).contains(&conn.weight));
        }
        for node in genome.nodes.values() {
            assert!((-30.0..=30.0).contains(&node.bias));
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(8);
        let mut genome = Genome::configure_new(4, &config, &mut rng);
        genome.mutate_add_node(&config, &mut rng);
        genome.fitness = Some(12.5);

        let json = serde_json::to_string(&genome).unwrap();
        let loaded: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, genome);
    }
}
