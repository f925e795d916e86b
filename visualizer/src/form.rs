use boltzcore::model::{Entity, LigandKind, Molecule, PredictionParameters, PredictionRequest};
use boltzcore::{build, next_local_id, ValidationError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Protein,
    Dna,
    Rna,
    Ligand,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Protein,
        EntityKind::Dna,
        EntityKind::Rna,
        EntityKind::Ligand,
    ];

    pub fn placeholder(&self, ligand_kind: LigandKind) -> &'static str {
        match (self, ligand_kind) {
            (EntityKind::Protein, _) => "Amino-acid sequence (FASTA accepted)",
            (EntityKind::Dna, _) => "DNA sequence",
            (EntityKind::Rna, _) => "RNA sequence",
            (EntityKind::Ligand, LigandKind::Smiles) => "SMILES string",
            (EntityKind::Ligand, LigandKind::Ccd) => "CCD code",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Protein => "Protein",
            EntityKind::Dna => "DNA",
            EntityKind::Rna => "RNA",
            EntityKind::Ligand => "Ligand",
        })
    }
}

/// One editable entity row of the submission form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub local_id: String,
    pub kind: EntityKind,
    pub value: String,
    pub ligand_kind: LigandKind,
}

impl EntityRow {
    fn new(local_id: String) -> Self {
        Self {
            local_id,
            kind: EntityKind::Protein,
            value: String::new(),
            ligand_kind: LigandKind::Smiles,
        }
    }

    fn to_entity(&self) -> Entity {
        let value = self.value.clone();
        let molecule = match self.kind {
            EntityKind::Protein => Molecule::protein(value),
            EntityKind::Dna => Molecule::dna(value),
            EntityKind::Rna => Molecule::rna(value),
            EntityKind::Ligand => Molecule::Ligand {
                value,
                value_kind: self.ligand_kind,
            },
        };
        Entity::new(self.local_id.clone(), molecule)
    }
}

#[derive(Debug, Clone)]
pub enum FormEdit {
    Name(String),
    AddEntity,
    RemoveEntity(usize),
    LocalId(usize, String),
    Kind(usize, EntityKind),
    Value(usize, String),
    ToggleLigandKind(usize),
    RecyclingSteps(String),
    DiffusionSamples(String),
    ToggleMsaServer,
}

/// Raw user input for a new prediction; validated only on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionForm {
    pub name: String,
    pub entities: Vec<EntityRow>,
    pub recycling_steps: String,
    pub diffusion_samples: String,
    pub use_msa_server: bool,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        let defaults = PredictionParameters::default();
        Self {
            name: String::new(),
            entities: vec![EntityRow::new("A".into())],
            recycling_steps: defaults.recycling_steps.to_string(),
            diffusion_samples: defaults.diffusion_samples.to_string(),
            use_msa_server: defaults.use_msa_server,
        }
    }
}

impl SubmissionForm {
    pub fn apply(&mut self, edit: FormEdit) {
        match edit {
            FormEdit::Name(name) => self.name = name,
            FormEdit::AddEntity => {
                let id = next_local_id(&self.to_entities());
                self.entities.push(EntityRow::new(id));
            }
            FormEdit::RemoveEntity(index) => {
                if index < self.entities.len() {
                    self.entities.remove(index);
                }
            }
            FormEdit::LocalId(index, id) => {
                if let Some(row) = self.entities.get_mut(index) {
                    row.local_id = id.to_uppercase();
                }
            }
            FormEdit::Kind(index, kind) => {
                if let Some(row) = self.entities.get_mut(index) {
                    row.kind = kind;
                }
            }
            FormEdit::Value(index, value) => {
                if let Some(row) = self.entities.get_mut(index) {
                    row.value = value;
                }
            }
            FormEdit::ToggleLigandKind(index) => {
                if let Some(row) = self.entities.get_mut(index) {
                    row.ligand_kind = match row.ligand_kind {
                        LigandKind::Smiles => LigandKind::Ccd,
                        LigandKind::Ccd => LigandKind::Smiles,
                    };
                }
            }
            FormEdit::RecyclingSteps(value) => self.recycling_steps = value,
            FormEdit::DiffusionSamples(value) => self.diffusion_samples = value,
            FormEdit::ToggleMsaServer => self.use_msa_server = !self.use_msa_server,
        }
    }

    pub fn to_entities(&self) -> Vec<Entity> {
        self.entities.iter().map(EntityRow::to_entity).collect()
    }

    pub fn parameters(&self) -> Result<PredictionParameters, ValidationError> {
        Ok(PredictionParameters {
            recycling_steps: parse_count("recycling_steps", &self.recycling_steps)?,
            diffusion_samples: parse_count("diffusion_samples", &self.diffusion_samples)?,
            use_msa_server: self.use_msa_server,
        })
    }

    pub fn to_request(&self) -> Result<PredictionRequest, ValidationError> {
        build(&self.to_entities(), self.parameters()?, &self.name)
    }
}

fn parse_count(name: &'static str, raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidParameter {
            name,
            reason: "must be a whole number",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boltzcore::model::{LigandSource, SequenceEntry};

    #[test]
    fn added_rows_get_next_free_id() {
        let mut form = SubmissionForm::default();
        form.apply(FormEdit::AddEntity);
        form.apply(FormEdit::AddEntity);
        let ids: Vec<_> = form.entities.iter().map(|row| row.local_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        form.apply(FormEdit::RemoveEntity(1));
        form.apply(FormEdit::AddEntity);
        assert_eq!(form.entities[2].local_id, "B");
    }

    #[test]
    fn form_builds_protein_ligand_request() {
        let mut form = SubmissionForm::default();
        form.apply(FormEdit::Name("T1".into()));
        form.apply(FormEdit::Value(0, "MKTAYIAK".into()));
        form.apply(FormEdit::AddEntity);
        form.apply(FormEdit::Kind(1, EntityKind::Ligand));
        form.apply(FormEdit::ToggleLigandKind(1));
        form.apply(FormEdit::Value(1, "atp".into()));

        let request = form.to_request().unwrap();
        assert_eq!(request.sequences.len(), 2);
        match &request.sequences[1] {
            SequenceEntry::Ligand(ligand) => {
                assert_eq!(ligand.source, LigandSource::Ccd("ATP".into()))
            }
            other => panic!("unexpected entry {other:?}"),
        }
        assert_eq!(request.params, PredictionParameters::default());
    }

    #[test]
    fn bad_parameters_are_rejected_before_building() {
        let mut form = SubmissionForm::default();
        form.apply(FormEdit::Name("T1".into()));
        form.apply(FormEdit::Value(0, "MKT".into()));
        form.apply(FormEdit::DiffusionSamples("many".into()));
        assert_eq!(
            form.to_request(),
            Err(ValidationError::InvalidParameter {
                name: "diffusion_samples",
                reason: "must be a whole number",
            })
        );
    }

    #[test]
    fn local_ids_are_uppercased_on_edit() {
        let mut form = SubmissionForm::default();
        form.apply(FormEdit::LocalId(0, "b".into()));
        assert_eq!(form.entities[0].local_id, "B");
    }
}
