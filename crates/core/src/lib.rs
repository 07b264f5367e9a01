/// Token generator core types and utilities
pub mod chains;
pub mod config;
pub mod contract;
pub mod editor;

/// Re-export common types from generator-common
pub use generator_common::{Error, Result};

pub use chains::{ChainConfig, ChainRegistry};
pub use config::{ConfigManager, ConfigValidator, Environment, GeneratorConfig};
pub use contract::{
    ContractName, ContractType, DisabledFeatures, GenerateContractRequest, GeneratedContract,
    TokenArguments, VerifyContractRequest,
};
pub use editor::{clean, edit, ContentEditor, EditMode, EditStep, MarkerMatching};
