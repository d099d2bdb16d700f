//! Loading of Hardhat compilation artifacts

use std::{
    collections::HashMap,
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;

use crate::{
    constants::{ARTIFACT_EXTENSION, DEBUG_FILE_EXTENSION},
    errors::ScriptError,
};

/// A fully-qualified contract name, e.g. `contracts/Tokens/BaseToken.sol:BaseToken`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractId {
    /// The path of the source file, relative to the project root
    source: String,
    /// The name of the contract within the source file
    name: String,
}

impl ContractId {
    /// Parse a fully-qualified contract name
    pub fn parse(fq_name: &str) -> Result<Self, ScriptError> {
        let (source, name) = fq_name.rsplit_once(':').ok_or_else(|| {
            ScriptError::ArtifactParsing(format!("{fq_name} is not a fully-qualified name"))
        })?;

        if source.is_empty() || name.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{fq_name} is not a fully-qualified name"
            )));
        }

        Ok(Self {
            source: source.to_string(),
            name: name.to_string(),
        })
    }

    /// The source file the contract is defined in
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The name of the contract
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ContractId {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.name)
    }
}

/// The subset of a Hardhat artifact the scripts need
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    /// The contract ABI
    abi: JsonAbi,
    /// The creation bytecode, hex-encoded
    bytecode: String,
}

/// A Hardhat debug file, which points at the build-info of an artifact
#[derive(Deserialize)]
struct HardhatDebugFile {
    /// Path of the build-info file, relative to the debug file
    #[serde(rename = "buildInfo")]
    build_info: String,
}

/// A compiled contract, ready to be deployed or attached to
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// The contract this artifact was compiled from
    pub id: ContractId,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
    /// The build-info file holding the compiler input, if one was found
    pub build_info: Option<PathBuf>,
}

impl ContractArtifact {
    /// Read the artifact for `id` out of a Hardhat artifacts directory
    pub fn load(artifacts_dir: &Path, id: &ContractId) -> Result<Self, ScriptError> {
        let contract_dir = artifacts_dir.join(id.source());
        let artifact_path = contract_dir.join(format!("{}.{ARTIFACT_EXTENSION}", id.name()));

        let contents = fs::read_to_string(&artifact_path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", artifact_path.display())))?;
        let artifact: HardhatArtifact = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{id}: {e}")))?;

        let bytecode = Bytes::from_str(&artifact.bytecode)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{id} bytecode: {e}")))?;

        Ok(Self {
            id: id.clone(),
            abi: artifact.abi,
            bytecode,
            build_info: find_build_info(&contract_dir, id),
        })
    }
}

/// Resolve the build-info file referenced by a contract's debug file
///
/// A missing or unreadable debug file only disables source verification,
/// so it is not an error here.
fn find_build_info(contract_dir: &Path, id: &ContractId) -> Option<PathBuf> {
    let debug_path = contract_dir.join(format!("{}.{DEBUG_FILE_EXTENSION}", id.name()));
    let contents = fs::read_to_string(debug_path).ok()?;
    let debug: HardhatDebugFile = serde_json::from_str(&contents).ok()?;

    Some(contract_dir.join(debug.build_info))
}

/// A cache of contract artifacts, loaded from disk on first use
#[derive(Debug, Default)]
pub struct ArtifactStore {
    /// The Hardhat artifacts directory, if artifacts should be read from disk
    root: Option<PathBuf>,
    /// Artifacts loaded so far
    cache: HashMap<ContractId, ContractArtifact>,
}

impl ArtifactStore {
    /// Create a store backed by a Hardhat artifacts directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            cache: HashMap::new(),
        }
    }

    /// Create a store that only serves artifacts added with [`ArtifactStore::insert`]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Add an artifact to the store
    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.cache.insert(artifact.id.clone(), artifact);
    }

    /// Fetch the artifact for `id`, reading it from disk if it is not cached
    pub fn get(&mut self, id: &ContractId) -> Result<&ContractArtifact, ScriptError> {
        if !self.cache.contains_key(id) {
            let root = self.root.as_ref().ok_or_else(|| {
                ScriptError::ArtifactParsing(format!("no artifact registered for {id}"))
            })?;

            let artifact = ContractArtifact::load(root, id)?;
            self.cache.insert(id.clone(), artifact);
        }

        self.cache
            .get(id)
            .ok_or_else(|| ScriptError::ArtifactParsing(format!("no artifact registered for {id}")))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use eyre::Result;

    use super::{ArtifactStore, ContractId};
    use crate::{constants::DISTRIBUTOR_GENERATOR_CONTRACT, errors::ScriptError};

    const GENERATOR_ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "DistributorGenerator",
        "sourceName": "contracts/Generators/DistributorGenerator.sol",
        "abi": [
            {
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [{ "name": "implementation", "type": "address", "internalType": "address" }]
            }
        ],
        "bytecode": "0x6080604052",
        "deployedBytecode": "0x6080",
        "linkReferences": {},
        "deployedLinkReferences": {}
    }"#;

    /// A scratch artifacts directory unique to the calling test
    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("generator-scripts-artifacts")
            .join(format!("{test}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_parse_contract_id() -> Result<()> {
        let id = ContractId::parse(DISTRIBUTOR_GENERATOR_CONTRACT)?;
        assert_eq!(id.source(), "contracts/Generators/DistributorGenerator.sol");
        assert_eq!(id.name(), "DistributorGenerator");
        assert_eq!(id.to_string(), DISTRIBUTOR_GENERATOR_CONTRACT);

        assert!(ContractId::parse("DistributorGenerator").is_err());
        assert!(ContractId::parse("contracts/Foo.sol:").is_err());
        Ok(())
    }

    #[test]
    fn test_load_artifact_with_build_info() -> Result<()> {
        let root = scratch_dir("build-info");
        let id = ContractId::parse(DISTRIBUTOR_GENERATOR_CONTRACT)?;
        let contract_dir = root.join(id.source());
        fs::create_dir_all(&contract_dir)?;
        fs::write(contract_dir.join("DistributorGenerator.json"), GENERATOR_ARTIFACT)?;
        fs::write(
            contract_dir.join("DistributorGenerator.dbg.json"),
            r#"{ "_format": "hh-sol-dbg-1", "buildInfo": "../../../build-info/abc123.json" }"#,
        )?;

        let mut store = ArtifactStore::new(&root);
        let artifact = store.get(&id)?;

        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(artifact.abi.constructor().map(|c| c.inputs.len()), Some(1));
        assert_eq!(
            artifact.build_info,
            Some(contract_dir.join("../../../build-info/abc123.json"))
        );

        fs::remove_dir_all(root)?;
        Ok(())
    }

    #[test]
    fn test_missing_artifact() -> Result<()> {
        let root = scratch_dir("missing");
        let id = ContractId::parse(DISTRIBUTOR_GENERATOR_CONTRACT)?;

        let mut store = ArtifactStore::new(&root);
        assert!(matches!(store.get(&id), Err(ScriptError::ReadFile(_))));

        let mut in_memory = ArtifactStore::in_memory();
        assert!(matches!(in_memory.get(&id), Err(ScriptError::ArtifactParsing(_))));
        Ok(())
    }
}
