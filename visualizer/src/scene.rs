use async_trait::async_trait;
use boltzcore::prelude::{RenderError, RenderResult};
use boltzcore::viewer::{Preset, StructureFormat, StructureRenderer};
use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, Path, Stroke},
    Color, Point, Rectangle, Renderer, Theme,
};
use log::info;
use std::sync::{Arc, PoisonError, RwLock};

/// One atom read from an mmCIF `_atom_site` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub chain: String,
    pub element: String,
    pub hetero: bool,
    pub position: [f32; 3],
}

/// Reads the `_atom_site` loop of an mmCIF document.
pub fn parse_mmcif(data: &str) -> RenderResult<Vec<Atom>> {
    let mut lines = data.lines().map(str::trim).peekable();
    while let Some(line) = lines.next() {
        if line != "loop_" {
            continue;
        }
        let mut columns = Vec::new();
        while let Some(header) = lines.peek() {
            if !header.starts_with('_') {
                break;
            }
            columns.push(header.split_whitespace().next().unwrap_or_default().to_string());
            lines.next();
        }
        if !columns.iter().any(|column| column.starts_with("_atom_site.")) {
            continue;
        }

        let index = |name: &str| columns.iter().position(|column| column == name);
        let coords = [
            index("_atom_site.Cartn_x"),
            index("_atom_site.Cartn_y"),
            index("_atom_site.Cartn_z"),
        ];
        let [Some(x), Some(y), Some(z)] = coords else {
            return Err(RenderError("atom_site table has no coordinates".into()));
        };
        let chain = index("_atom_site.label_asym_id").or(index("_atom_site.auth_asym_id"));
        let element = index("_atom_site.type_symbol");
        let group = index("_atom_site.group_PDB");

        let mut atoms = Vec::new();
        for row in lines.by_ref() {
            if row.is_empty() {
                continue;
            }
            if row.starts_with('#') || row.starts_with("loop_") || row.starts_with('_') {
                break;
            }
            let fields = tokenize(row);
            if fields.len() != columns.len() {
                return Err(RenderError(format!(
                    "atom row has {} fields, expected {}",
                    fields.len(),
                    columns.len()
                )));
            }
            let coordinate = |column: usize| {
                fields[column]
                    .parse::<f32>()
                    .map_err(|_| RenderError(format!("bad coordinate {:?}", fields[column])))
            };
            let field = |column: Option<usize>| {
                column
                    .map(|column| fields[column].to_string())
                    .unwrap_or_default()
            };
            atoms.push(Atom {
                chain: field(chain),
                element: field(element),
                hetero: field(group) == "HETATM",
                position: [coordinate(x)?, coordinate(y)?, coordinate(z)?],
            });
        }
        if atoms.is_empty() {
            return Err(RenderError("structure contains no atoms".into()));
        }
        return Ok(atoms);
    }
    Err(RenderError("no atom_site table found".into()))
}

fn tokenize(row: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = row.trim_start();
    while !rest.is_empty() {
        let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"');
        let (token, remainder) = match quote {
            Some(quote) => {
                let body = &rest[1..];
                let end = body
                    .char_indices()
                    .find(|(i, c)| {
                        *c == quote
                            && body[i + 1..]
                                .chars()
                                .next()
                                .map_or(true, char::is_whitespace)
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(body.len());
                (&body[..end], body.get(end + 1..).unwrap_or_default())
            }
            None => {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                (&rest[..end], &rest[end..])
            }
        };
        tokens.push(token);
        rest = remainder.trim_start();
    }
    tokens
}

/// A parsed structure ready to draw, centred on the origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub atoms: Vec<Atom>,
    pub chains: Vec<String>,
    pub radius: f32,
}

impl Scene {
    fn from_atoms(mut atoms: Vec<Atom>) -> Self {
        let count = atoms.len().max(1) as f32;
        let mut centre = [0.0f32; 3];
        for atom in &atoms {
            for axis in 0..3 {
                centre[axis] += atom.position[axis];
            }
        }
        for value in &mut centre {
            *value /= count;
        }
        let mut radius = 1.0f32;
        let mut chains: Vec<String> = Vec::new();
        for atom in &mut atoms {
            for axis in 0..3 {
                atom.position[axis] -= centre[axis];
            }
            let [x, y, z] = atom.position;
            radius = radius.max((x * x + y * y + z * z).sqrt());
            if !chains.contains(&atom.chain) {
                chains.push(atom.chain.clone());
            }
        }
        Self {
            atoms,
            chains,
            radius,
        }
    }

    fn chain_color(&self, chain: &str) -> Color {
        const PALETTE: [Color; 6] = [
            Color::from_rgb(0.18, 0.72, 0.89),
            Color::from_rgb(0.95, 0.55, 0.2),
            Color::from_rgb(0.45, 0.85, 0.4),
            Color::from_rgb(0.85, 0.4, 0.75),
            Color::from_rgb(0.95, 0.85, 0.3),
            Color::from_rgb(0.6, 0.6, 0.95),
        ];
        let index = self
            .chains
            .iter()
            .position(|known| known == chain)
            .unwrap_or_default();
        PALETTE[index % PALETTE.len()]
    }
}

fn element_color(element: &str) -> Option<Color> {
    match element.to_ascii_uppercase().as_str() {
        "C" => Some(Color::from_rgb(0.7, 0.7, 0.7)),
        "N" => Some(Color::from_rgb(0.3, 0.4, 0.95)),
        "O" => Some(Color::from_rgb(0.95, 0.25, 0.25)),
        "S" => Some(Color::from_rgb(0.95, 0.85, 0.3)),
        "P" => Some(Color::from_rgb(1.0, 0.6, 0.1)),
        _ => None,
    }
}

pub type SharedScene = Arc<RwLock<Option<Scene>>>;

/// Renderer that publishes parsed structures to a scene the canvas draws from.
pub struct CanvasRenderer {
    scene: SharedScene,
}

impl CanvasRenderer {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }

    fn publish(&self, scene: Option<Scene>) {
        *self.scene.write().unwrap_or_else(PoisonError::into_inner) = scene;
    }
}

#[async_trait]
impl StructureRenderer for CanvasRenderer {
    type Trajectory = Vec<Atom>;

    async fn clear(&mut self) -> RenderResult<()> {
        self.publish(None);
        Ok(())
    }

    async fn parse_trajectory(
        &mut self,
        data: &str,
        format: StructureFormat,
    ) -> RenderResult<Vec<Atom>> {
        match format {
            StructureFormat::MmCif => parse_mmcif(data),
        }
    }

    async fn apply_preset(&mut self, trajectory: Vec<Atom>, preset: Preset) -> RenderResult<()> {
        match preset {
            Preset::Default => self.publish(Some(Scene::from_atoms(trajectory))),
        }
        Ok(())
    }

    fn dispose(&mut self) {
        self.publish(None);
        info!("canvas renderer released");
    }
}

/// Orthographic view of the shared scene, tilted so helices read as coils.
pub struct StructureCanvas {
    pub scene: SharedScene,
}

impl<Message> canvas::Program<Message> for StructureCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.02, 0.02, 0.04),
        );

        let guard = self.scene.read().unwrap_or_else(PoisonError::into_inner);
        let Some(scene) = guard.as_ref() else {
            return vec![frame.into_geometry()];
        };

        let centre = Point::new(bounds.width / 2.0, bounds.height / 2.0);
        let scale = (bounds.width.min(bounds.height) / 2.0 - 12.0) / scene.radius;
        let (sin, cos) = 0.5f32.sin_cos();
        let project = |position: [f32; 3]| {
            let [x, y, z] = position;
            let depth = x * sin + z * cos;
            let point = Point::new(
                centre.x + (x * cos - z * sin) * scale,
                centre.y - y * scale,
            );
            (point, depth)
        };

        for chain in &scene.chains {
            let color = scene.chain_color(chain);
            let trace: Vec<Point> = scene
                .atoms
                .iter()
                .filter(|atom| &atom.chain == chain && !atom.hetero)
                .map(|atom| project(atom.position).0)
                .collect();
            if trace.len() > 1 {
                let path = Path::new(|builder| {
                    builder.move_to(trace[0]);
                    for point in &trace[1..] {
                        builder.line_to(*point);
                    }
                });
                frame.stroke(&path, Stroke::default().with_width(2.0).with_color(color));
            }
        }

        let mut ordered: Vec<_> = scene
            .atoms
            .iter()
            .map(|atom| (atom, project(atom.position)))
            .collect();
        ordered.sort_by(|a, b| a.1 .1.total_cmp(&b.1 .1));
        for (atom, (point, _)) in ordered {
            let (radius, color) = if atom.hetero {
                (5.0, element_color(&atom.element).unwrap_or(scene.chain_color(&atom.chain)))
            } else {
                (2.5, scene.chain_color(&atom.chain))
            };
            let marker = Path::new(|builder| builder.circle(point, radius));
            frame.fill(&marker, color);
        }

        vec![frame.into_geometry()]
    }
}
