//! # lrnn-core - Values, Settings and Logging
//!
//! Foundations shared by the network and training crates:
//!
//! - **Values**: scalar/vector/matrix operands with shape-checked,
//!   double-dispatched arithmetic ([`value`])
//! - **Shapes**: what a shape mismatch reports ([`shape`])
//! - **Initialization**: seeded distributions for learnable weights ([`init`])
//! - **Settings**: the configuration object every stage reads ([`settings`])
//! - **Errors**: algebra and configuration failures ([`error`])

pub mod error;
pub mod init;
pub mod logging;
pub mod settings;
pub mod shape;
pub mod value;

pub use error::{AlgebraError, ConfigError};
pub use init::{Distribution, SimpleInitializer, ValueInitializer};
pub use settings::{ErrorFunction, IterationMode, RestartPolicy, Settings};
pub use shape::Shape;
pub use value::{Matrix, Value};
