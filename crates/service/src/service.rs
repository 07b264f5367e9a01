//! Contract generation, compilation and verification

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use generator_common::{Error, Result};
use generator_core::chains::ChainRegistry;
use generator_core::config::GeneratorConfig;
use generator_core::contract::{
    apply_features, rename_placeholder, validate_address, GenerateContractRequest,
    GeneratedContract, VerifyContractRequest,
};
use generator_core::editor::{clean, ContentEditor};
use generator_hardhat::{write_constructor_args, CommandRunner, Hardhat};

use crate::queue::{JobContext, JobHandler, JobPayload};
use crate::store::{ContractAbi, ContractStore};

/// Generates contracts from templates and drives hardhat over them
pub struct ContractService<R: CommandRunner> {
    store: ContractStore,
    hardhat: Hardhat<R>,
    chains: ChainRegistry,
    editor: ContentEditor,
    clean_patterns: Option<Vec<String>>,
}

impl<R: CommandRunner> ContractService<R> {
    pub fn new(config: &GeneratorConfig, runner: Arc<R>) -> Self {
        let clean_patterns = config
            .editor
            .clean_markers
            .then(|| config.editor.marker_patterns.clone());

        Self {
            store: ContractStore::new(config.paths.clone()),
            hardhat: Hardhat::new(runner, config.hardhat.clone(), config.hardhat_working_dir()),
            chains: ChainRegistry::with_chains(config.chains.clone()),
            editor: ContentEditor::new(config.editor.matching),
            clean_patterns,
        }
    }

    pub fn store(&self) -> &ContractStore {
        &self.store
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    /// Generate a contract and return its path relative to the generated directory
    #[instrument(skip(self, request), fields(contract = %request.contract_name, kind = %request.contract_type))]
    pub async fn generate_contract(&self, request: &GenerateContractRequest) -> Result<String> {
        let target = request.target();
        let relative_path = target.relative_path();

        if self.store.generated_exists(&target).await? {
            return Err(Error::conflict(format!(
                "This contract name is already in use: {}",
                relative_path
            )));
        }

        let raw = self.store.read_original(request.contract_type).await?;
        let renamed = rename_placeholder(&raw, request.contract_type, &request.contract_name);
        let mut generated = apply_features(&renamed, &request.disable, &self.editor)?;

        if let Some(patterns) = &self.clean_patterns {
            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            generated = clean(&generated, &patterns)?;
        }

        self.store.write_generated(&target, &generated).await?;
        info!(path = %relative_path, "generated contract");

        Ok(relative_path)
    }

    /// Compile every generated contract and return hardhat's output
    pub async fn compile_contract(&self) -> Result<String> {
        self.hardhat.compile().await
    }

    /// Verify a deployed contract with its constructor arguments
    #[instrument(skip(self, request), fields(contract = %request.contract_name, chain = %request.chain_name))]
    pub async fn verify_contract(&self, request: &VerifyContractRequest) -> Result<String> {
        validate_address(&request.address)?;
        let chain = self.chains.resolve(&request.chain_name)?;
        request.body.validate()?;

        let args_path = self.store.args_path(&request.contract_name);
        write_constructor_args(&args_path, &request.body).await?;

        self.hardhat
            .verify(&chain.symbol, &request.address, &args_path)
            .await
    }

    /// Delete a generated contract
    pub async fn remove_contract(&self, contract: &GeneratedContract) -> Result<()> {
        self.store.remove_generated(contract).await?;
        info!(path = %contract.relative_path(), "removed contract");
        Ok(())
    }

    pub async fn read_abi(&self, contract: &GeneratedContract) -> Result<ContractAbi> {
        self.store.read_abi(contract).await
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> JobHandler for ContractService<R> {
    async fn handle(&self, payload: &JobPayload, ctx: &JobContext) -> Result<String> {
        ctx.set_progress(10).await;
        let output = match payload {
            JobPayload::Compile(_) => self.compile_contract().await?,
            JobPayload::Verify(request) => self.verify_contract(request).await?,
        };
        ctx.set_progress(90).await;
        Ok(output)
    }
}
