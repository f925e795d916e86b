use serde::{Deserialize, Serialize};

/// Polymer chain as the service expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainSpec {
    pub id: String,
    pub sequence: String,
}

/// Ligand source: either a SMILES string or a CCD code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LigandSource {
    Smiles(String),
    Ccd(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LigandSpec {
    pub id: String,
    #[serde(flatten)]
    pub source: LigandSource,
}

/// One entry of the request's `sequences` array, keyed by molecule kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SequenceEntry {
    Protein(ChainSpec),
    Dna(ChainSpec),
    Rna(ChainSpec),
    Ligand(LigandSpec),
}

impl SequenceEntry {
    pub fn id(&self) -> &str {
        match self {
            SequenceEntry::Protein(chain) | SequenceEntry::Dna(chain) | SequenceEntry::Rna(chain) => {
                &chain.id
            }
            SequenceEntry::Ligand(ligand) => &ligand.id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SequenceEntry::Protein(_) => "protein",
            SequenceEntry::Dna(_) => "dna",
            SequenceEntry::Rna(_) => "rna",
            SequenceEntry::Ligand(_) => "ligand",
        }
    }

    /// The residue sequence, SMILES string, or CCD code carried by this entry.
    pub fn value(&self) -> &str {
        match self {
            SequenceEntry::Protein(chain) | SequenceEntry::Dna(chain) | SequenceEntry::Rna(chain) => {
                &chain.sequence
            }
            SequenceEntry::Ligand(LigandSpec {
                source: LigandSource::Smiles(value) | LigandSource::Ccd(value),
                ..
            }) => value,
        }
    }
}

/// Model run parameters forwarded to the prediction worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionParameters {
    pub recycling_steps: u32,
    pub diffusion_samples: u32,
    pub use_msa_server: bool,
}

impl Default for PredictionParameters {
    fn default() -> Self {
        Self {
            recycling_steps: 3,
            diffusion_samples: 1,
            use_msa_server: true,
        }
    }
}

/// Request document posted to `POST /jobs`. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionRequest {
    pub name: String,
    pub sequences: Vec<SequenceEntry>,
    pub params: PredictionParameters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ligand_entries_serialize_with_source_key() {
        let smiles = SequenceEntry::Ligand(LigandSpec {
            id: "B".into(),
            source: LigandSource::Smiles("CCO".into()),
        });
        let ccd = SequenceEntry::Ligand(LigandSpec {
            id: "C".into(),
            source: LigandSource::Ccd("ATP".into()),
        });
        assert_eq!(
            serde_json::to_value(&smiles).unwrap(),
            json!({"ligand": {"id": "B", "smiles": "CCO"}})
        );
        assert_eq!(
            serde_json::to_value(&ccd).unwrap(),
            json!({"ligand": {"id": "C", "ccd": "ATP"}})
        );
    }

    #[test]
    fn request_parses_from_service_shape() {
        let request: PredictionRequest = serde_json::from_value(json!({
            "name": "T1",
            "sequences": [{"dna": {"id": "A", "sequence": "ACGT"}}],
            "params": {"recycling_steps": 1, "diffusion_samples": 2, "use_msa_server": false}
        }))
        .unwrap();
        assert_eq!(request.sequences[0].kind_name(), "dna");
        assert_eq!(request.sequences[0].value(), "ACGT");
        assert_eq!(request.params.diffusion_samples, 2);
    }
}
