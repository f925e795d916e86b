use crate::generator::template::helix_trace;
use boltzcore::model::{Affinity, LigandSource, Metrics, PredictionRequest, SequenceEntry};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Configuration for synthetic prediction output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Distance between neighbouring chains in Ångström.
    pub chain_spacing: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chain_spacing: 12.0,
        }
    }
}

/// Files and metrics the simulator reports for a completed job.
#[derive(Debug, Clone)]
pub struct SyntheticPrediction {
    pub structure: String,
    pub metrics: Metrics,
    pub confidence_json: String,
}

/// Builds a placeholder model: each chain is an ideal helix, each ligand a single atom.
pub fn synthesize(
    job_seed: u64,
    request: &PredictionRequest,
    config: &GeneratorConfig,
) -> SyntheticPrediction {
    let mut rng = StdRng::seed_from_u64(config.seed ^ job_seed);

    let chains = request
        .sequences
        .iter()
        .filter(|entry| !matches!(entry, SequenceEntry::Ligand(_)))
        .count();
    let has_ligand = request
        .sequences
        .iter()
        .any(|entry| matches!(entry, SequenceEntry::Ligand(_)));

    let metrics = Metrics {
        confidence_score: Some(rng.gen_range(0.55..0.95)),
        complex_plddt: Some(rng.gen_range(0.60..0.95)),
        iptm: (chains > 1).then(|| rng.gen_range(0.40..0.90)),
        affinity: has_ligand.then(|| Affinity {
            affinity_pred_value: rng.gen_range(-3.0..1.0),
        }),
    };

    let plddt = metrics.complex_plddt.unwrap_or_default();
    let structure = render_mmcif(request, config, &mut rng, plddt);
    let confidence_json = serde_json::to_string_pretty(&metrics).unwrap_or_default();

    SyntheticPrediction {
        structure,
        metrics,
        confidence_json,
    }
}

fn render_mmcif(
    request: &PredictionRequest,
    config: &GeneratorConfig,
    rng: &mut StdRng,
    plddt: f64,
) -> String {
    let block: String = request
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "data_{}", if block.is_empty() { "model" } else { &block });
    out.push_str("#\nloop_\n");
    for column in [
        "group_PDB",
        "id",
        "type_symbol",
        "label_atom_id",
        "label_comp_id",
        "label_asym_id",
        "label_seq_id",
        "Cartn_x",
        "Cartn_y",
        "Cartn_z",
        "B_iso_or_equiv",
    ] {
        let _ = writeln!(out, "_atom_site.{column}");
    }

    let mut serial = 1usize;
    for (index, entry) in request.sequences.iter().enumerate() {
        let origin = [config.chain_spacing * index as f32, 0.0, 0.0];
        let base_b = (plddt * 100.0) as f32;
        match entry {
            SequenceEntry::Protein(chain) | SequenceEntry::Dna(chain) | SequenceEntry::Rna(chain) => {
                let (atom, element) = match entry {
                    SequenceEntry::Protein(_) => ("CA", "C"),
                    _ => ("P", "P"),
                };
                let residues: Vec<char> = chain.sequence.chars().collect();
                for (seq, (residue, pos)) in residues
                    .iter()
                    .zip(helix_trace(residues.len(), origin))
                    .enumerate()
                {
                    let b = (base_b + rng.gen_range(-8.0..8.0)).clamp(0.0, 100.0);
                    let _ = writeln!(
                        out,
                        "ATOM {serial} {element} {atom} {comp} {asym} {seq_id} {:.3} {:.3} {:.3} {b:.2}",
                        pos[0],
                        pos[1],
                        pos[2],
                        comp = residue_name(entry, *residue),
                        asym = chain.id,
                        seq_id = seq + 1,
                    );
                    serial += 1;
                }
            }
            SequenceEntry::Ligand(ligand) => {
                let comp = match &ligand.source {
                    LigandSource::Ccd(code) if code.len() <= 3 => code.as_str(),
                    _ => "LIG",
                };
                let _ = writeln!(
                    out,
                    "HETATM {serial} C C1 {comp} {} . {:.3} {:.3} {:.3} {base_b:.2}",
                    ligand.id, origin[0], origin[1], origin[2],
                );
                serial += 1;
            }
        }
    }
    out.push_str("#\n");
    out
}

fn residue_name(entry: &SequenceEntry, code: char) -> String {
    let code = code.to_ascii_uppercase();
    match entry {
        SequenceEntry::Dna(_) => format!("D{code}"),
        SequenceEntry::Rna(_) => code.to_string(),
        _ => amino_acid(code).to_string(),
    }
}

fn amino_acid(code: char) -> &'static str {
    match code {
        'A' => "ALA",
        'R' => "ARG",
        'N' => "ASN",
        'D' => "ASP",
        'C' => "CYS",
        'Q' => "GLN",
        'E' => "GLU",
        'G' => "GLY",
        'H' => "HIS",
        'I' => "ILE",
        'L' => "LEU",
        'K' => "LYS",
        'M' => "MET",
        'F' => "PHE",
        'P' => "PRO",
        'S' => "SER",
        'T' => "THR",
        'W' => "TRP",
        'Y' => "TYR",
        'V' => "VAL",
        _ => "UNK",
    }
}
