//! Contract types, request payloads and the feature plan
//!
//! Disabling a feature maps to an ordered list of [`EditStep`]s that the
//! [`ContentEditor`] folds over the contract template.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::editor::{ContentEditor, EditMode, EditStep};
use crate::{Error, Result};

/// Supported contract standards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Erc20,
    Erc721,
    Erc1155,
}

impl ContractType {
    /// Directory name used by the contract store
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Erc20 => "erc20",
            ContractType::Erc721 => "erc721",
            ContractType::Erc1155 => "erc1155",
        }
    }

    /// Contract name used inside the original template, e.g. `ERC20Generator`
    pub fn placeholder_name(&self) -> String {
        format!("{}Generator", self.as_str().to_uppercase())
    }

    /// File name of the original template
    pub fn template_file_name(&self) -> String {
        format!("{}.sol", self.placeholder_name())
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "erc20" => Ok(ContractType::Erc20),
            "erc721" => Ok(ContractType::Erc721),
            "erc1155" => Ok(ContractType::Erc1155),
            _ => Err(Error::validation(format!("Unsupported contract type: {}", s))),
        }
    }
}

/// A Solidity contract identifier: a letter followed by letters, digits or `_`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractName(String);

impl ContractName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::invalid_argument(
                "Contract name must be alphanumeric and start with a letter",
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContractName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContractName> for String {
    fn from(name: ContractName) -> Self {
        name.0
    }
}

impl AsRef<str> for ContractName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one generated contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContract {
    pub contract_type: ContractType,
    pub contract_name: ContractName,
}

impl GeneratedContract {
    pub fn new(contract_type: ContractType, contract_name: ContractName) -> Self {
        Self {
            contract_type,
            contract_name,
        }
    }

    /// Path relative to the generated directory, e.g. `erc20/MyToken.sol`
    pub fn relative_path(&self) -> String {
        format!("{}/{}.sol", self.contract_type, self.contract_name)
    }
}

/// Features to strip from a template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisabledFeatures {
    pub supply_cap: bool,
    #[serde(alias = "mintable")]
    pub mint: bool,
    #[serde(alias = "burnable")]
    pub burn: bool,
    pub admin_burn: bool,
    #[serde(alias = "pausable")]
    pub pause: bool,
    pub admin_transfer: bool,
}

impl DisabledFeatures {
    /// Build from feature names such as `supplyCap` or `mintable`
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut disabled = Self::default();
        for name in names {
            match name.as_ref().trim() {
                "" => {}
                "supplyCap" => disabled.supply_cap = true,
                "mint" | "mintable" => disabled.mint = true,
                "burn" | "burnable" => disabled.burn = true,
                "adminBurn" => disabled.admin_burn = true,
                "pause" | "pausable" => disabled.pause = true,
                "adminTransfer" => disabled.admin_transfer = true,
                other => {
                    return Err(Error::validation(format!("Unknown contract feature: {}", other)))
                }
            }
        }
        Ok(disabled)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request to generate a customized contract from its template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContractRequest {
    pub contract_type: ContractType,
    pub contract_name: ContractName,
    #[serde(default)]
    pub disable: DisabledFeatures,
}

impl GenerateContractRequest {
    pub fn target(&self) -> GeneratedContract {
        GeneratedContract::new(self.contract_type, self.contract_name.clone())
    }
}

/// Constructor arguments of the generated ERC20 contract
///
/// Amounts are decimal strings so values beyond `u64` survive untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenArguments {
    pub symbol: String,
    pub name: String,
    pub initial_supply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_cap: Option<String>,
    #[serde(default)]
    pub mintable: bool,
    #[serde(default)]
    pub burnable: bool,
    #[serde(default)]
    pub pausable: bool,
}

impl TokenArguments {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::validation("Token symbol cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::validation("Token name cannot be empty"));
        }
        validate_amount("initialSupply", &self.initial_supply)?;
        if let Some(cap) = &self.supply_cap {
            validate_amount("supplyCap", cap)?;
        }
        Ok(())
    }
}

fn validate_amount(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "{} must be a non-negative integer string, got '{}'",
            field, value
        )));
    }
    Ok(())
}

/// Request to verify a deployed contract on a block explorer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyContractRequest {
    pub contract_type: ContractType,
    pub contract_name: ContractName,
    pub chain_name: String,
    pub address: String,
    #[serde(default)]
    pub source_name: Option<String>,
    pub body: TokenArguments,
}

impl VerifyContractRequest {
    pub fn target(&self) -> GeneratedContract {
        GeneratedContract::new(self.contract_type, self.contract_name.clone())
    }
}

/// Validate an Ethereum address (`0x` followed by 40 hex characters)
pub fn validate_address(address: &str) -> Result<()> {
    let hex_part = address.strip_prefix("0x").ok_or_else(|| {
        Error::validation("Contract address should start with 0x")
    })?;
    if hex_part.len() != 40 {
        return Err(Error::validation(
            "Contract address should be a valid Ethereum address (0x followed by 40 hex characters)",
        ));
    }
    hex::decode(hex_part)
        .map_err(|e| Error::validation(format!("Contract address is not valid hex: {}", e)))?;
    Ok(())
}

/// Ordered edits that strip the disabled features from a template
pub fn feature_plan(disabled: &DisabledFeatures) -> Vec<EditStep> {
    let mut plan = Vec::new();
    let mut strip = |pattern: &str, modes: &[EditMode]| {
        plan.extend(modes.iter().map(|mode| EditStep::new(*mode, pattern)));
    };

    if disabled.supply_cap {
        strip("supplyCap", &[EditMode::Line, EditMode::Range]);
    }
    if disabled.mint {
        strip("mint", &[EditMode::Line, EditMode::Range]);
    }
    if disabled.burn {
        strip("selfBurn", &[EditMode::Line, EditMode::Range]);
    }
    if disabled.admin_burn {
        strip("adminBurn", &[EditMode::Line, EditMode::Range]);
    }
    if disabled.burn && disabled.admin_burn {
        strip("burn", &[EditMode::Line, EditMode::Range]);
    }
    if disabled.pause {
        strip("pause", &[EditMode::Replace, EditMode::Line, EditMode::Range]);
    }
    if disabled.admin_transfer {
        strip("adminTransfer", &[EditMode::Range, EditMode::Line]);
    }

    plan
}

/// Rename the template contract to `name`
pub fn rename_placeholder(raw: &str, contract_type: ContractType, name: &ContractName) -> String {
    raw.replace(&contract_type.placeholder_name(), name.as_str())
}

/// Strip every disabled feature from `raw`
pub fn apply_features(raw: &str, disabled: &DisabledFeatures, editor: &ContentEditor) -> Result<String> {
    editor.apply_all(raw, &feature_plan(disabled))
}
