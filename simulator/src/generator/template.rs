use std::f32::consts::PI;

/// Alpha-helix trace parameters in Ångström and degrees.
const HELIX_RADIUS: f32 = 2.3;
const HELIX_RISE: f32 = 1.5;
const HELIX_TWIST_DEG: f32 = 100.0;

/// One backbone position per residue along an ideal helix starting at `origin`.
pub fn helix_trace(length: usize, origin: [f32; 3]) -> Vec<[f32; 3]> {
    let twist = HELIX_TWIST_DEG * PI / 180.0;
    (0..length)
        .map(|i| {
            let angle = i as f32 * twist;
            [
                origin[0] + HELIX_RADIUS * angle.cos(),
                origin[1] + HELIX_RADIUS * angle.sin(),
                origin[2] + HELIX_RISE * i as f32,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helix_rises_evenly() {
        let trace = helix_trace(4, [0.0, 0.0, 0.0]);
        assert_eq!(trace.len(), 4);
        assert!((trace[3][2] - 4.5).abs() < 1e-5);
        let radius = (trace[2][0].powi(2) + trace[2][1].powi(2)).sqrt();
        assert!((radius - HELIX_RADIUS).abs() < 1e-4);
    }
}
