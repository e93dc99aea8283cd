//! Feed-forward phenotype built from a genome

use std::collections::{BTreeSet, HashMap, HashSet};

use super::activation::Activation;
use super::config::GenomeConfig;
use super::genome::{ConnectionKey, Genome, NodeKey};

/// Whether adding `test` to `connections` would create a cycle
pub fn creates_cycle(connections: &[ConnectionKey], test: ConnectionKey) -> bool {
    let (input, output) = test;
    if input == output {
        return true;
    }

    // Walk forward from the new connection's target; reaching its source closes a loop
    let mut visited = HashSet::from([output]);
    loop {
        let mut added = 0;
        for &(a, b) in connections {
            if visited.contains(&a) && !visited.contains(&b) {
                if b == input {
                    return true;
                }
                visited.insert(b);
                added += 1;
            }
        }
        if added == 0 {
            return false;
        }
    }
}

/// Nodes whose value can reach an output. Inputs are never included.
pub fn required_for_output(
    inputs: &[NodeKey],
    outputs: &[NodeKey],
    connections: &[ConnectionKey],
) -> BTreeSet<NodeKey> {
    let mut required: BTreeSet<NodeKey> = outputs.iter().copied().collect();
    let mut frontier: HashSet<NodeKey> = outputs.iter().copied().collect();

    loop {
        let layer: HashSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| frontier.contains(b) && !frontier.contains(a))
            .map(|&(a, _)| a)
            .collect();

        if layer.is_empty() {
            break;
        }

        let layer_nodes: HashSet<NodeKey> = layer
            .into_iter()
            .filter(|node| !inputs.contains(node))
            .collect();
        if layer_nodes.is_empty() {
            break;
        }

        required.extend(layer_nodes.iter().copied());
        frontier.extend(layer_nodes);
    }

    required
}

/// Group required nodes into layers that only depend on earlier layers
pub fn feed_forward_layers(
    inputs: &[NodeKey],
    outputs: &[NodeKey],
    connections: &[ConnectionKey],
) -> Vec<BTreeSet<NodeKey>> {
    let required = required_for_output(inputs, outputs, connections);

    let mut layers = Vec::new();
    let mut ready: HashSet<NodeKey> = inputs.iter().copied().collect();

    loop {
        // Nodes fed by something already evaluated
        let candidates: HashSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| ready.contains(a) && !ready.contains(b))
            .map(|&(_, b)| b)
            .collect();

        // ...whose every input is already evaluated
        let layer: BTreeSet<NodeKey> = candidates
            .into_iter()
            .filter(|node| {
                required.contains(node)
                    && connections
                        .iter()
                        .filter(|(_, b)| b == node)
                        .all(|(a, _)| ready.contains(a))
            })
            .collect();

        if layer.is_empty() {
            break;
        }

        ready.extend(layer.iter().copied());
        layers.push(layer);
    }

    layers
}

/// Evaluation recipe for one node
#[derive(Debug, Clone, PartialEq)]
struct NodeEval {
    node: NodeKey,
    activation: Activation,
    bias: f64,
    links: Vec<(NodeKey, f64)>,
}

/// A network evaluated in topological order, sum aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardNetwork {
    inputs: Vec<NodeKey>,
    outputs: Vec<NodeKey>,
    evals: Vec<NodeEval>,
}

impl FeedForwardNetwork {
    /// Build the phenotype of `genome`. Disabled connections are ignored and nodes
    /// that cannot influence an output are pruned.
    pub fn create(genome: &Genome, config: &GenomeConfig) -> Self {
        let inputs = config.input_keys();
        let outputs = config.output_keys();

        let connections: Vec<ConnectionKey> = genome
            .connections
            .values()
            .filter(|conn| conn.enabled)
            .map(|conn| conn.key)
            .collect();

        let mut evals = Vec::new();
        for layer in feed_forward_layers(&inputs, &outputs, &connections) {
            for node in layer {
                let links = genome
                    .connections
                    .values()
                    .filter(|conn| conn.enabled && conn.key.1 == node)
                    .map(|conn| (conn.key.0, conn.weight))
                    .collect();

                let (bias, activation) = genome
                    .nodes
                    .get(&node)
                    .map(|gene| (gene.bias, gene.activation))
                    .unwrap_or((0.0, config.activation_default));

                evals.push(NodeEval {
                    node,
                    activation,
                    bias,
                    links,
                });
            }
        }

        Self {
            inputs,
            outputs,
            evals,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of evaluated (non-input) nodes
    pub fn num_nodes(&self) -> usize {
        self.evals.len()
    }

    /// Feed `inputs` through the network. Outputs that no path reaches read 0.
    pub fn activate(&self, inputs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(inputs.len(), self.inputs.len());

        let mut values: HashMap<NodeKey, f64> = self
            .inputs
            .iter()
            .copied()
            .zip(inputs.iter().copied())
            .collect();
        for &output in &self.outputs {
            values.entry(output).or_insert(0.0);
        }

        for eval in &self.evals {
            let sum: f64 = eval
                .links
                .iter()
                .map(|(source, weight)| values.get(source).copied().unwrap_or(0.0) * weight)
                .sum();
            values.insert(eval.node, eval.activation.apply(eval.bias + sum));
        }

        self.outputs
            .iter()
            .map(|output| values.get(output).copied().unwrap_or(0.0))
            .collect()
    }
}
