use serde::{Deserialize, Serialize};

/// How a ligand value should be read by the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LigandKind {
    #[default]
    Smiles,
    Ccd,
}

/// Molecule kind with its kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Molecule {
    Protein { sequence: String },
    Dna { sequence: String },
    Rna { sequence: String },
    Ligand { value: String, value_kind: LigandKind },
}

impl Molecule {
    pub fn protein(sequence: impl Into<String>) -> Self {
        Molecule::Protein {
            sequence: sequence.into(),
        }
    }

    pub fn dna(sequence: impl Into<String>) -> Self {
        Molecule::Dna {
            sequence: sequence.into(),
        }
    }

    pub fn rna(sequence: impl Into<String>) -> Self {
        Molecule::Rna {
            sequence: sequence.into(),
        }
    }

    pub fn smiles(value: impl Into<String>) -> Self {
        Molecule::Ligand {
            value: value.into(),
            value_kind: LigandKind::Smiles,
        }
    }

    pub fn ccd(value: impl Into<String>) -> Self {
        Molecule::Ligand {
            value: value.into(),
            value_kind: LigandKind::Ccd,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Molecule::Protein { .. } => "protein",
            Molecule::Dna { .. } => "dna",
            Molecule::Rna { .. } => "rna",
            Molecule::Ligand { .. } => "ligand",
        }
    }
}

/// One molecular component of a prediction request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub local_id: String,
    #[serde(flatten)]
    pub molecule: Molecule,
}

impl Entity {
    pub fn new(local_id: impl Into<String>, molecule: Molecule) -> Self {
        Self {
            local_id: local_id.into(),
            molecule,
        }
    }
}
