use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use generator_common::Error;
use generator_core::config::{GeneratorConfig, PathsConfig};
use generator_core::contract::{
    ContractName, ContractType, DisabledFeatures, GenerateContractRequest, GeneratedContract,
    TokenArguments, VerifyContractRequest,
};
use generator_hardhat::testing::ScriptedRunner;
use generator_service::{ContractService, JobQueue, CONTRACT_QUEUE};
use tempfile::TempDir;

const ADDRESS: &str = "0x1234567890123456789012345678901234567890";

fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../contracts/original")
}

fn test_config(root: &Path) -> GeneratorConfig {
    let mut config = GeneratorConfig::default();
    config.paths = PathsConfig {
        original: templates_dir(),
        ..PathsConfig::rooted_at(root)
    };
    config
}

fn service(root: &Path, runner: &Arc<ScriptedRunner>) -> ContractService<ScriptedRunner> {
    ContractService::new(&test_config(root), runner.clone())
}

fn request(name: &str, disable: DisabledFeatures) -> GenerateContractRequest {
    GenerateContractRequest {
        contract_type: ContractType::Erc20,
        contract_name: ContractName::new(name).unwrap(),
        disable,
    }
}

fn verify_request(chain_name: &str, address: &str) -> VerifyContractRequest {
    VerifyContractRequest {
        contract_type: ContractType::Erc20,
        contract_name: ContractName::new("Peach").unwrap(),
        chain_name: chain_name.to_string(),
        address: address.to_string(),
        source_name: None,
        body: TokenArguments {
            symbol: "PH_TOKEN".to_string(),
            name: "Peaches_Token".to_string(),
            initial_supply: "2000000000000000000000000".to_string(),
            supply_cap: Some("5000000000000000000000000".to_string()),
            mintable: true,
            burnable: false,
            pausable: false,
        },
    }
}

#[tokio::test]
async fn test_generate_contract_with_all_features() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);

    let path = service.generate_contract(&request("Peach", DisabledFeatures::default())).await?;
    assert_eq!(path, "erc20/Peach.sol");

    let generated = tokio::fs::read_to_string(temp_dir.path().join("contracts/generated/erc20/Peach.sol")).await?;
    assert!(generated.contains("contract Peach is ERC20, Ownable, Pausable {"));
    assert!(generated.contains("function mint("));
    assert!(!generated.contains("ERC20Generator"));
    Ok(())
}

#[tokio::test]
async fn test_generate_contract_strips_disabled_features() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);

    let disable = DisabledFeatures {
        supply_cap: true,
        mint: true,
        pause: true,
        ..Default::default()
    };
    service.generate_contract(&request("Plum", disable)).await?;

    let target = request("Plum", disable).target();
    let generated = service.store().read_generated(&target).await?;
    assert!(generated.contains("contract Plum is ERC20, Ownable {"));
    assert!(!generated.contains("_cap"));
    assert!(!generated.contains("function mint("));
    assert!(!generated.contains("Pausable"));
    assert!(!generated.contains("whenNotPaused"));
    assert!(!generated.contains("function pause("));
    assert!(generated.contains("function burn("));
    assert!(generated.contains("function adminTransfer("));
    Ok(())
}

#[tokio::test]
async fn test_generate_contract_with_marker_cleanup() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let mut config = test_config(temp_dir.path());
    config.editor.clean_markers = true;
    let service = ContractService::new(&config, runner);

    let disable = DisabledFeatures {
        burn: true,
        admin_burn: true,
        ..Default::default()
    };
    service.generate_contract(&request("Fig", disable)).await?;

    let generated = service.store().read_generated(&request("Fig", disable).target()).await?;
    assert!(!generated.contains("// @"));
    assert!(!generated.contains("burn"));
    assert!(generated.contains("uint256 private immutable _cap;\n"));
    Ok(())
}

#[tokio::test]
async fn test_generate_existing_contract_conflicts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);

    service.generate_contract(&request("Peach", DisabledFeatures::default())).await?;
    let err = service
        .generate_contract(&request("Peach", DisabledFeatures::default()))
        .await
        .unwrap_err();
    match err {
        Error::Conflict(message) => assert!(message.contains("erc20/Peach.sol")),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_generate_unknown_template_is_not_found() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);

    let request = GenerateContractRequest {
        contract_type: ContractType::Erc1155,
        contract_name: ContractName::new("Grape")?,
        disable: DisabledFeatures::default(),
    };
    assert!(service.generate_contract(&request).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_remove_contract() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);
    let target = GeneratedContract::new(ContractType::Erc20, ContractName::new("Peach")?);

    assert!(service.remove_contract(&target).await.unwrap_err().is_not_found());
    service.generate_contract(&request("Peach", DisabledFeatures::default())).await?;
    service.remove_contract(&target).await?;
    assert!(!service.store().generated_exists(&target).await?);
    Ok(())
}

#[tokio::test]
async fn test_verify_contract_writes_args_and_runs_hardhat() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    runner.push_success("Successfully verified contract Peach");
    let service = service(temp_dir.path(), &runner);

    let output = service.verify_contract(&verify_request("jfint", ADDRESS)).await?;
    assert_eq!(output, "Successfully verified contract Peach");

    let args_path = temp_dir.path().join("contracts/args/Peach.js");
    let args = tokio::fs::read_to_string(&args_path).await?;
    assert!(args.starts_with("module.exports = ["));
    assert!(args.contains("\"supplyCap\": \"5000000000000000000000000\""));

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].display(),
        format!(
            "npx hardhat verify --network JFINT {} --constructor-args {}",
            ADDRESS,
            args_path.display()
        )
    );
    Ok(())
}

#[tokio::test]
async fn test_verify_rejects_bad_input_before_running_hardhat() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);

    let bad_address = service.verify_contract(&verify_request("JFIN", "0x1234")).await;
    assert!(matches!(bad_address, Err(Error::Validation(_))));

    let bad_chain = service.verify_contract(&verify_request("goerli", ADDRESS)).await;
    assert!(matches!(bad_chain, Err(Error::Validation(_))));

    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_compile_failure_surfaces_hardhat_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    runner.push_exit(1, "HH600: Compilation failed");
    let service = service(temp_dir.path(), &runner);

    let err = service.compile_contract().await.unwrap_err();
    assert!(matches!(err, Error::Hardhat { ref cause, .. } if cause == "compile"));
    Ok(())
}

#[tokio::test]
async fn test_queue_runs_contract_jobs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    runner.push_success("Compiled 1 Solidity file successfully");
    runner.push_exit(1, "Error: contract verification failed");
    let service = Arc::new(service(temp_dir.path(), &runner));

    let queue = JobQueue::new(CONTRACT_QUEUE, GeneratorConfig::default().queue);
    let target = GeneratedContract::new(ContractType::Erc20, ContractName::new("Peach")?);
    let compile_id = queue.add_compile_job(target).await?;
    queue.start(service).await;

    let mut status = queue.job_status(compile_id).await?;
    for _ in 0..200 {
        if status.is_completed || status.is_failed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        status = queue.job_status(compile_id).await?;
    }
    assert!(status.is_completed);
    assert_eq!(status.progress, 100);
    assert_eq!(
        status.completed_message.as_deref(),
        Some("Compiled 1 Solidity file successfully")
    );

    let verify_id = queue.add_verify_job(verify_request("JFIN", ADDRESS)).await?;
    assert_eq!(verify_id, compile_id + 1);
    let mut status = queue.job_status(verify_id).await?;
    for _ in 0..200 {
        if status.is_completed || status.is_failed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        status = queue.job_status(verify_id).await?;
    }
    assert!(status.is_failed);
    assert!(status
        .failed_reason
        .as_deref()
        .is_some_and(|reason| reason.contains("contract verification failed")));

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_generate_erc721_contract() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let runner = Arc::new(ScriptedRunner::new());
    let service = service(temp_dir.path(), &runner);

    let request = GenerateContractRequest {
        contract_type: ContractType::Erc721,
        contract_name: ContractName::new("Kiwi")?,
        disable: DisabledFeatures {
            burn: true,
            ..Default::default()
        },
    };
    assert_eq!(service.generate_contract(&request).await?, "erc721/Kiwi.sol");

    let generated = service.store().read_generated(&request.target()).await?;
    assert!(generated.contains("contract Kiwi is ERC721, Ownable, Pausable {"));
    assert!(!generated.contains("function burn("));
    assert!(generated.contains("function safeMint("));
    Ok(())
}
