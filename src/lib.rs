// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurevo - Neuroevolution Engine Core
//!
//! Forward activation and topology-aware target propagation for evolved
//! networks. Topology mutation and the evolutionary loop live elsewhere;
//! this crate evaluates one network, assigns credit toward target outputs
//! and commits the resulting weights and biases.
//!
//! ## Crates
//! - **`neural`**: topology graph, squash catalog, forward and propagate
//!   passes, accumulators, serialization records
//! - **`config`**: `BackPropagationConfig` and the TOML/env/CLI loader
//! - **`observability`**: logging initialisation and per-crate debug flags
//!
//! ## Usage
//!
//! ```rust,no_run
//! use neurevo::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut network = Network::new(2, 1);
//! network.connect(0, 2, 0.5, None)?;
//! network.connect(1, 2, -0.5, None)?;
//!
//! let config = BackPropagationConfig::default();
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! network.activate_and_trace(&[1.0, 0.0])?;
//! network.propagate(&[1.0], &config, &mut rng)?;
//! network.apply(&config)?;
//! # Ok::<(), neurevo::neural::NeuralError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use neurevo_config as config;
pub use neurevo_neural as neural;
pub use neurevo_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{BackPropagationConfig, TrainingConfig};
    pub use crate::neural::{
        ActivationStrategy, AggregateSquash, ElementarySquash, Network, NetworkRecord,
        NeuralError, NeuralResult, NeuronKind, Squash, SynapseTag,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let network = Network::new(1, 1);
        assert_eq!(network.output_count(), 1);
        assert!(BackPropagationConfig::default().plank_constant > 0.0);
    }
}
