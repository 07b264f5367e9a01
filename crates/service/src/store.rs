//! Filesystem layout of templates, generated sources and compiled artifacts

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use generator_common::{Error, Result};
use generator_core::config::PathsConfig;
use generator_core::contract::{ContractName, ContractType, GeneratedContract};

/// ABI, bytecode and source of a compiled contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAbi {
    pub abi: Vec<Value>,
    pub bytecode: String,
    pub source_name: String,
}

/// Contract files on disk
#[derive(Debug, Clone)]
pub struct ContractStore {
    paths: PathsConfig,
}

impl ContractStore {
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    pub fn original_path(&self, contract_type: ContractType) -> PathBuf {
        self.paths
            .original_dir()
            .join(contract_type.as_str())
            .join(contract_type.template_file_name())
    }

    pub fn generated_path(&self, contract: &GeneratedContract) -> PathBuf {
        self.paths
            .generated_dir()
            .join(contract.contract_type.as_str())
            .join(format!("{}.sol", contract.contract_name))
    }

    pub fn compiled_path(&self, contract: &GeneratedContract) -> PathBuf {
        let name = contract.contract_name.as_str();
        self.paths
            .compiled_dir()
            .join("artifacts")
            .join("contracts")
            .join("generated")
            .join(contract.contract_type.as_str())
            .join(format!("{}.sol", name))
            .join(format!("{}.json", name))
    }

    pub fn args_path(&self, name: &ContractName) -> PathBuf {
        self.paths.args_dir().join(format!("{}.js", name))
    }

    pub async fn read_original(&self, contract_type: ContractType) -> Result<String> {
        read_text(
            &self.original_path(contract_type),
            "This original contract type does not exist",
        )
        .await
    }

    pub async fn read_generated(&self, contract: &GeneratedContract) -> Result<String> {
        read_text(
            &self.generated_path(contract),
            "This generated contract does not exist",
        )
        .await
    }

    pub async fn generated_exists(&self, contract: &GeneratedContract) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.generated_path(contract)).await?)
    }

    /// Read the hardhat artifact of a generated contract
    pub async fn read_compiled(&self, contract: &GeneratedContract) -> Result<Value> {
        let raw = read_text(
            &self.compiled_path(contract),
            "This compiled contract does not exist",
        )
        .await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write a generated contract, creating its type directory
    pub async fn write_generated(&self, contract: &GeneratedContract, content: &str) -> Result<PathBuf> {
        let path = self.generated_path(contract);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), bytes = content.len(), "wrote generated contract");
        Ok(path)
    }

    pub async fn remove_generated(&self, contract: &GeneratedContract) -> Result<()> {
        let path = self.generated_path(contract);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed generated contract");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::not_found("This generated contract does not exist"))
            }
            Err(e) => Err(Error::io(format!("Failed to remove contract: {}", e))),
        }
    }

    pub async fn read_abi(&self, contract: &GeneratedContract) -> Result<ContractAbi> {
        let artifact = self.read_compiled(contract).await?;
        let field = |name: &str| {
            artifact.get(name).cloned().ok_or_else(|| {
                Error::serialization(format!(
                    "Compiled artifact of {} has no '{}' field",
                    contract.relative_path(),
                    name
                ))
            })
        };

        Ok(ContractAbi {
            abi: serde_json::from_value(field("abi")?)?,
            bytecode: serde_json::from_value(field("bytecode")?)?,
            source_name: serde_json::from_value(field("sourceName")?)?,
        })
    }
}

async fn read_text(path: &Path, missing: &str) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found(missing)),
        Err(e) => Err(Error::io(format!("Failed to read {}: {}", path.display(), e))),
    }
}
