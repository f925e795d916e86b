use crate::model::{
    ChainSpec, Entity, LigandKind, LigandSource, LigandSpec, Molecule, PredictionParameters,
    PredictionRequest, SequenceEntry,
};
use crate::prelude::ValidationError;
use std::collections::HashMap;

/// Translates user-entered entities into the request document the service accepts.
///
/// Entity order is preserved. Local ids are trimmed and upper-cased before the
/// uniqueness check; sequences lose whitespace and FASTA header lines.
pub fn build(
    entities: &[Entity],
    parameters: PredictionParameters,
    name: &str,
) -> Result<PredictionRequest, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if entities.is_empty() {
        return Err(ValidationError::NoEntities);
    }
    if parameters.diffusion_samples == 0 {
        return Err(ValidationError::InvalidParameter {
            name: "diffusion_samples",
            reason: "must be at least 1",
        });
    }

    let mut seen: HashMap<String, usize> = HashMap::with_capacity(entities.len());
    let mut sequences = Vec::with_capacity(entities.len());

    for (index, entity) in entities.iter().enumerate() {
        let id = normalize_id(&entity.local_id);
        if id.is_empty() {
            return Err(ValidationError::MissingField {
                index,
                field: "local_id",
            });
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidId { index, id });
        }
        if let Some(&first) = seen.get(&id) {
            return Err(ValidationError::DuplicateId { index, first, id });
        }
        seen.insert(id.clone(), index);

        sequences.push(build_entry(index, id, &entity.molecule)?);
    }

    Ok(PredictionRequest {
        name: name.to_string(),
        sequences,
        params: parameters,
    })
}

fn build_entry(
    index: usize,
    id: String,
    molecule: &Molecule,
) -> Result<SequenceEntry, ValidationError> {
    let chain = |sequence: &str| -> Result<ChainSpec, ValidationError> {
        let sequence = normalize_sequence(sequence);
        if sequence.is_empty() {
            return Err(ValidationError::MissingField {
                index,
                field: "sequence",
            });
        }
        Ok(ChainSpec {
            id: id.clone(),
            sequence,
        })
    };

    let entry = match molecule {
        Molecule::Protein { sequence } => SequenceEntry::Protein(chain(sequence)?),
        Molecule::Dna { sequence } => SequenceEntry::Dna(chain(sequence)?),
        Molecule::Rna { sequence } => SequenceEntry::Rna(chain(sequence)?),
        Molecule::Ligand { value, value_kind } => {
            let value = value.trim();
            if value.is_empty() {
                let field = match value_kind {
                    LigandKind::Smiles => "smiles",
                    LigandKind::Ccd => "ccd",
                };
                return Err(ValidationError::MissingField { index, field });
            }
            let source = match value_kind {
                LigandKind::Smiles => LigandSource::Smiles(value.to_string()),
                LigandKind::Ccd => LigandSource::Ccd(value.to_uppercase()),
            };
            SequenceEntry::Ligand(LigandSpec { id, source })
        }
    };
    Ok(entry)
}

fn normalize_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn normalize_sequence(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .flat_map(|line| line.chars())
        .filter(|c| !c.is_ascii_whitespace())
        .collect()
}

/// First unused label in `A..Z, AA, AB, ..` for a newly added entity.
pub fn next_local_id(existing: &[Entity]) -> String {
    let used: Vec<String> = existing
        .iter()
        .map(|entity| normalize_id(&entity.local_id))
        .collect();
    (0usize..)
        .map(column_label)
        .find(|label| !used.contains(label))
        .unwrap_or_default()
}

fn column_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> PredictionParameters {
        PredictionParameters {
            recycling_steps: 3,
            diffusion_samples: 1,
            use_msa_server: true,
        }
    }

    #[test]
    fn single_protein_request_matches_service_body() {
        let entities = vec![Entity::new("A", Molecule::protein("MKT"))];
        let request = build(&entities, params(), "T1").unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "T1",
                "sequences": [{"protein": {"id": "A", "sequence": "MKT"}}],
                "params": {"recycling_steps": 3, "diffusion_samples": 1, "use_msa_server": true}
            })
        );
    }

    #[test]
    fn entries_recover_kind_and_value_in_order() {
        let entities = vec![
            Entity::new("A", Molecule::protein("MKTAYIAK")),
            Entity::new("B", Molecule::dna("ACGT")),
            Entity::new("C", Molecule::rna("ACGU")),
            Entity::new("D", Molecule::smiles("CC(=O)O")),
            Entity::new("E", Molecule::ccd("ATP")),
        ];
        let request = build(&entities, params(), "complex").unwrap();
        let recovered: Vec<(&str, &str, &str)> = request
            .sequences
            .iter()
            .map(|entry| (entry.id(), entry.kind_name(), entry.value()))
            .collect();
        assert_eq!(
            recovered,
            vec![
                ("A", "protein", "MKTAYIAK"),
                ("B", "dna", "ACGT"),
                ("C", "rna", "ACGU"),
                ("D", "ligand", "CC(=O)O"),
                ("E", "ligand", "ATP"),
            ]
        );
        assert!(matches!(
            &request.sequences[4],
            SequenceEntry::Ligand(LigandSpec {
                source: LigandSource::Ccd(_),
                ..
            })
        ));
    }

    #[test]
    fn empty_sequence_is_rejected_with_index() {
        let entities = vec![
            Entity::new("A", Molecule::protein("MKT")),
            Entity::new("B", Molecule::protein("  \n ")),
        ];
        assert_eq!(
            build(&entities, params(), "T1"),
            Err(ValidationError::MissingField {
                index: 1,
                field: "sequence"
            })
        );
    }

    #[test]
    fn empty_ligand_value_names_its_kind() {
        let entities = vec![Entity::new("A", Molecule::ccd(""))];
        assert_eq!(
            build(&entities, params(), "T1"),
            Err(ValidationError::MissingField {
                index: 0,
                field: "ccd"
            })
        );
    }

    #[test]
    fn colliding_ids_are_rejected_after_normalization() {
        let entities = vec![
            Entity::new("A", Molecule::protein("MKT")),
            Entity::new(" a ", Molecule::smiles("CCO")),
        ];
        assert_eq!(
            build(&entities, params(), "T1"),
            Err(ValidationError::DuplicateId {
                index: 1,
                first: 0,
                id: "A".into()
            })
        );
    }

    #[test]
    fn malformed_requests_are_rejected() {
        let entities = vec![Entity::new("A", Molecule::protein("MKT"))];
        assert_eq!(build(&entities, params(), "  "), Err(ValidationError::EmptyName));
        assert_eq!(build(&[], params(), "T1"), Err(ValidationError::NoEntities));
        let zero_samples = PredictionParameters {
            diffusion_samples: 0,
            ..params()
        };
        assert!(matches!(
            build(&entities, zero_samples, "T1"),
            Err(ValidationError::InvalidParameter { .. })
        ));
        let bad_id = vec![Entity::new("A-1", Molecule::protein("MKT"))];
        assert!(matches!(
            build(&bad_id, params(), "T1"),
            Err(ValidationError::InvalidId { index: 0, .. })
        ));
    }

    #[test]
    fn fasta_headers_and_whitespace_are_stripped() {
        let entities = vec![Entity::new("a", Molecule::protein(">sp|P1\nMKT AYI\nAKQR\n"))];
        let request = build(&entities, params(), "T1").unwrap();
        assert_eq!(request.sequences[0].id(), "A");
        assert_eq!(request.sequences[0].value(), "MKTAYIAKQR");
    }

    #[test]
    fn next_local_id_skips_used_labels_and_rolls_past_z() {
        assert_eq!(next_local_id(&[]), "A");
        let entities = vec![
            Entity::new("A", Molecule::protein("M")),
            Entity::new("c", Molecule::protein("M")),
        ];
        assert_eq!(next_local_id(&entities), "B");

        let full: Vec<Entity> = (0..26)
            .map(|i| Entity::new(column_label(i), Molecule::protein("M")))
            .collect();
        assert_eq!(next_local_id(&full), "AA");
        assert_eq!(column_label(27), "AB");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
    }
}
