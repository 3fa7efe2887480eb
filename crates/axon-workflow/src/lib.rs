//! Axon workflows
//!
//! A [`Workflow`] chains compute units into a forward pass. It can be built
//! by hand from units, or from a serializable [`WorkflowConfig`] that names
//! each layer's kind and shape settings:
//!
//! ```rust
//! use axon_units::UnitRegistry;
//! use axon_workflow::{LayerSpec, Workflow, WorkflowConfig};
//!
//! let config = WorkflowConfig::default()
//!     .with_layer(LayerSpec::new("all2all").named("fc"))
//!     .with_layer(LayerSpec::new("softmax").with("length", 2usize));
//!
//! let mut workflow = Workflow::from_config(&config, &UnitRegistry::new())?;
//! workflow.set_named_parameter("fc", "weights", vec![1.0, 0.0, 0.0, 1.0].into())?;
//! workflow.set_named_parameter("fc", "bias", vec![0.0, 0.0].into())?;
//!
//! let probs = workflow.execute(&[1.0, 1.0])?;
//! assert!((probs[0] - 0.5).abs() < 1e-6);
//! # Ok::<(), axon_core::CoreError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod workflow;

pub use config::{LayerSpec, Setting, WorkflowConfig};
pub use workflow::{UnitId, Workflow};
