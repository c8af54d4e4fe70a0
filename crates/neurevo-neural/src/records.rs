// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Serialization Records
//!
//! Plain `serde` records for handing a network across the serialization
//! boundary. Neurons are listed in index order; synapses reference them by
//! index. The core performs no I/O: callers read and write the JSON.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::network::Network;
use crate::squash::Squash;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, Neuron, NeuronKind, StructuralError, SynapseTag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronRecord {
    pub uuid: Uuid,
    pub kind: NeuronKind,
    #[serde(default)]
    pub bias: f64,
    pub squash: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseRecord {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<SynapseTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gater: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub input_count: usize,
    pub output_count: usize,
    pub neurons: Vec<NeuronRecord>,
    #[serde(default)]
    pub synapses: Vec<SynapseRecord>,
}

impl NetworkRecord {
    pub fn to_json(&self) -> NeuralResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> NeuralResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Network {
    /// Build a network from a record, checking every structural invariant
    ///
    /// # Errors
    /// - `UnknownSquash` for a squash name outside the catalog
    /// - `InvalidTopology` for mismatched counts, broken ordering or a
    ///   repeated UUID
    /// - `DuplicateEdge`, `InvalidIndex`, `ImmutableNeuron` for bad synapses
    /// - `NonFinite` for non-finite biases or weights
    pub fn from_record(record: &NetworkRecord) -> NeuralResult<Self> {
        let mut seen = HashSet::with_capacity(record.neurons.len());
        let mut neurons = Vec::with_capacity(record.neurons.len());
        for (index, entry) in record.neurons.iter().enumerate() {
            if !seen.insert(entry.uuid) {
                return Err(StructuralError::InvalidTopology(format!(
                    "neuron {} repeats uuid {}",
                    index, entry.uuid
                ))
                .into());
            }
            let squash = Squash::from_name(&entry.squash)?;
            neurons.push(
                Neuron::new(entry.kind, squash, entry.bias)
                    .with_uuid(entry.uuid)
                    .with_tags(entry.tags.clone()),
            );
        }

        let mut graph = TopologyGraph::from_neurons(neurons)?;
        if graph.input_count() != record.input_count || graph.output_count() != record.output_count
        {
            return Err(StructuralError::InvalidTopology(format!(
                "record declares {} inputs and {} outputs, neurons have {} and {}",
                record.input_count,
                record.output_count,
                graph.input_count(),
                graph.output_count()
            ))
            .into());
        }

        for synapse in &record.synapses {
            graph.connect(synapse.from, synapse.to, synapse.weight, synapse.tag)?;
            if synapse.gater.is_some() {
                graph.set_gater(synapse.from, synapse.to, synapse.gater)?;
            }
        }
        graph.validate()?;
        Ok(Network::from_graph(graph))
    }

    pub fn to_record(&self) -> NetworkRecord {
        let graph = self.graph();
        NetworkRecord {
            input_count: graph.input_count(),
            output_count: graph.output_count(),
            neurons: graph
                .neurons()
                .iter()
                .map(|neuron| NeuronRecord {
                    uuid: neuron.uuid,
                    kind: neuron.kind,
                    bias: neuron.bias,
                    squash: neuron.squash.name().to_string(),
                    tags: neuron.tags.clone(),
                })
                .collect(),
            synapses: graph
                .synapses()
                .map(|synapse| SynapseRecord {
                    from: synapse.from,
                    to: synapse.to,
                    weight: synapse.weight,
                    tag: synapse.tag,
                    gater: synapse.gater,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NeuralError;

    fn neuron(kind: NeuronKind, squash: &str, bias: f64) -> NeuronRecord {
        NeuronRecord {
            uuid: Uuid::new_v4(),
            kind,
            bias,
            squash: squash.to_string(),
            tags: Vec::new(),
        }
    }

    fn record() -> NetworkRecord {
        NetworkRecord {
            input_count: 1,
            output_count: 1,
            neurons: vec![
                neuron(NeuronKind::Input, "IDENTITY", 0.0),
                neuron(NeuronKind::Hidden, "TANH", 0.25),
                neuron(NeuronKind::Output, "IDENTITY", -1.0),
            ],
            synapses: vec![
                SynapseRecord {
                    from: 0,
                    to: 1,
                    weight: 0.5,
                    tag: None,
                    gater: None,
                },
                SynapseRecord {
                    from: 1,
                    to: 2,
                    weight: 2.0,
                    tag: Some(SynapseTag::Positive),
                    gater: Some(1),
                },
            ],
        }
    }

    #[test]
    fn test_record_round_trip() {
        let original = record();
        let network = Network::from_record(&original).unwrap();
        assert_eq!(network.to_record(), original);

        let json = original.to_json().unwrap();
        assert!(json.contains("\"kind\": \"hidden\""));
        assert!(json.contains("\"tag\": \"positive\""));
        assert_eq!(NetworkRecord::from_json(&json).unwrap(), original);
    }

    #[test]
    fn test_unknown_squash() {
        let mut bad = record();
        bad.neurons[1].squash = "SWISH".to_string();
        assert!(matches!(
            Network::from_record(&bad),
            Err(NeuralError::Structural(StructuralError::UnknownSquash(name))) if name == "SWISH"
        ));
    }

    #[test]
    fn test_duplicate_uuid() {
        let mut bad = record();
        bad.neurons[2].uuid = bad.neurons[1].uuid;
        assert!(matches!(
            Network::from_record(&bad),
            Err(NeuralError::Structural(StructuralError::InvalidTopology(_)))
        ));
    }

    #[test]
    fn test_bad_synapses() {
        let mut duplicate = record();
        duplicate.synapses.push(duplicate.synapses[0].clone());
        assert!(matches!(
            Network::from_record(&duplicate),
            Err(NeuralError::Structural(StructuralError::DuplicateEdge { from: 0, to: 1 }))
        ));

        let mut out_of_range = record();
        out_of_range.synapses[1].gater = Some(9);
        assert!(matches!(
            Network::from_record(&out_of_range),
            Err(NeuralError::Structural(StructuralError::InvalidIndex { index: 9, .. }))
        ));

        let mut into_input = record();
        into_input.synapses[0].to = 0;
        assert!(matches!(
            Network::from_record(&into_input),
            Err(NeuralError::Structural(StructuralError::ImmutableNeuron { index: 0, .. }))
        ));

        let mut non_finite = record();
        non_finite.synapses[0].weight = f64::INFINITY;
        assert!(matches!(
            Network::from_record(&non_finite),
            Err(NeuralError::Numeric(_))
        ));
    }

    #[test]
    fn test_counts_and_ordering() {
        let mut counts = record();
        counts.output_count = 2;
        assert!(Network::from_record(&counts).is_err());

        let mut ordering = record();
        ordering.neurons.swap(1, 2);
        assert!(matches!(
            Network::from_record(&ordering),
            Err(NeuralError::Structural(StructuralError::InvalidTopology(_)))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            NetworkRecord::from_json("{\"input_count\": 1"),
            Err(NeuralError::Serialization(_))
        ));
    }
}
