//! Static mesh models: a small Wavefront OBJ reader and the built-in pyramid.
//!
//! Each `o` or `g` statement starts a new part. Parts keep the order in which they
//! appear in the file, so callers can address them by index (the table file keeps
//! its chairs in parts 0 and 1 and the table top in part 2).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::error::AssetError;
use crate::utils::{Mesh, Vertex};

/// A named sub-mesh of a model.
#[derive(Debug, Clone)]
pub struct MeshPart {
    pub name: String,
    pub mesh: Mesh,
}

/// A loaded model with one or more parts.
#[derive(Debug, Clone)]
pub struct Model {
    pub path: PathBuf,
    pub parts: Vec<MeshPart>,
}

impl Model {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::parse(&source, path)?;
        tracing::info!(
            path = %path.display(),
            parts = model.parts.len(),
            triangles = model.triangle_count(),
            "loaded model"
        );
        Ok(model)
    }

    /// Parse OBJ text. `path` is only used for error messages.
    pub fn parse(source: &str, path: &Path) -> Result<Self, AssetError> {
        let mut reader = ObjReader::new(path);
        for (idx, line) in source.lines().enumerate() {
            reader.line(idx + 1, line)?;
        }
        let parts = reader.finish();
        if parts.is_empty() {
            return Err(AssetError::Empty { path: path.to_path_buf() });
        }
        Ok(Self { path: path.to_path_buf(), parts })
    }

    /// Build a single-part model from an existing mesh.
    pub fn from_mesh(name: &str, mesh: Mesh) -> Self {
        Self {
            path: PathBuf::from(name),
            parts: vec![MeshPart { name: name.to_string(), mesh }],
        }
    }

    /// Fail unless the model has at least `count` parts.
    pub fn require_parts(&self, count: usize) -> Result<(), AssetError> {
        if self.parts.len() < count {
            return Err(AssetError::MissingPart {
                path: self.path.clone(),
                index: count - 1,
                count: self.parts.len(),
            });
        }
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

struct ObjReader<'a> {
    path: &'a Path,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    parts: Vec<MeshPart>,
    current: PartBuilder,
}

/// Vertices are shared per (position, normal) pair; vertices without an explicit
/// normal accumulate the normals of the faces that use them.
struct PartBuilder {
    name: String,
    mesh: Mesh,
    lookup: HashMap<(usize, Option<usize>), u32>,
    accumulated: Vec<Option<Vec3>>,
}

impl PartBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mesh: Mesh::default(),
            lookup: HashMap::new(),
            accumulated: Vec::new(),
        }
    }

    fn vertex(&mut self, position: usize, normal: Option<usize>, positions: &[Vec3], normals: &[Vec3]) -> u32 {
        if let Some(&idx) = self.lookup.get(&(position, normal)) {
            return idx;
        }
        let idx = self.mesh.vertices.len() as u32;
        let n = normal.map(|n| normals[n]).unwrap_or(Vec3::ZERO);
        self.mesh.vertices.push(Vertex {
            pos: positions[position].to_array(),
            normal: n.to_array(),
        });
        self.accumulated.push(normal.is_none().then_some(Vec3::ZERO));
        self.lookup.insert((position, normal), idx);
        idx
    }

    fn triangle(&mut self, tri: [u32; 3]) {
        let [a, b, c] = tri.map(|i| Vec3::from(self.mesh.vertices[i as usize].pos));
        let face = (b - a).cross(c - a);
        for i in tri {
            if let Some(sum) = self.accumulated[i as usize].as_mut() {
                *sum += face;
            }
        }
        self.mesh.indices.extend_from_slice(&tri);
    }

    fn finish(mut self) -> Option<MeshPart> {
        if self.mesh.is_empty() {
            return None;
        }
        for (vertex, sum) in self.mesh.vertices.iter_mut().zip(self.accumulated) {
            if let Some(sum) = sum {
                vertex.normal = sum.normalize_or_zero().to_array();
            }
        }
        Some(MeshPart { name: self.name, mesh: self.mesh })
    }
}

impl<'a> ObjReader<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            positions: Vec::new(),
            normals: Vec::new(),
            parts: Vec::new(),
            current: PartBuilder::new("default"),
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> AssetError {
        AssetError::Parse {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    fn line(&mut self, line_no: usize, line: &str) -> Result<(), AssetError> {
        let line = line.split('#').next().unwrap_or("").trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(());
        };
        match keyword {
            "v" => {
                let v = self.vec3(line_no, tokens)?;
                self.positions.push(v);
            }
            "vn" => {
                let n = self.vec3(line_no, tokens)?;
                self.normals.push(n.normalize_or_zero());
            }
            "o" | "g" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                self.start_part(if name.is_empty() { "unnamed" } else { &name });
            }
            "f" => self.face(line_no, tokens)?,
            // vt, s, usemtl, mtllib and friends carry nothing we draw
            _ => {}
        }
        Ok(())
    }

    fn start_part(&mut self, name: &str) {
        let previous = std::mem::replace(&mut self.current, PartBuilder::new(name));
        if let Some(part) = previous.finish() {
            self.parts.push(part);
        }
    }

    fn vec3<'t>(&self, line_no: usize, mut tokens: impl Iterator<Item = &'t str>) -> Result<Vec3, AssetError> {
        let mut out = [0.0f32; 3];
        for slot in out.iter_mut() {
            let token = tokens
                .next()
                .ok_or_else(|| self.error(line_no, "expected three components"))?;
            *slot = token
                .parse()
                .map_err(|_| self.error(line_no, format!("invalid number `{token}`")))?;
        }
        Ok(Vec3::from(out))
    }

    fn resolve(&self, line_no: usize, token: &str, len: usize, what: &str) -> Result<usize, AssetError> {
        let raw: i64 = token
            .parse()
            .map_err(|_| self.error(line_no, format!("invalid {what} index `{token}`")))?;
        let idx = if raw < 0 { len as i64 + raw } else { raw - 1 };
        if idx < 0 || idx as usize >= len {
            return Err(self.error(line_no, format!("{what} index {raw} out of range")));
        }
        Ok(idx as usize)
    }

    fn face<'t>(&mut self, line_no: usize, tokens: impl Iterator<Item = &'t str>) -> Result<(), AssetError> {
        let mut corners = Vec::with_capacity(4);
        for token in tokens {
            let mut fields = token.split('/');
            let position = fields.next().unwrap_or("");
            let position = self.resolve(line_no, position, self.positions.len(), "vertex")?;
            let normal = match fields.nth(1) {
                Some(n) if !n.is_empty() => Some(self.resolve(line_no, n, self.normals.len(), "normal")?),
                _ => None,
            };
            corners.push(self.current.vertex(position, normal, &self.positions, &self.normals));
        }
        if corners.len() < 3 {
            return Err(self.error(line_no, "face needs at least three vertices"));
        }
        for i in 1..corners.len() - 1 {
            self.current.triangle([corners[0], corners[i], corners[i + 1]]);
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<MeshPart> {
        self.start_part("");
        self.parts
    }
}

const PYRAMID_VERTICES: [[f32; 3]; 16] = [
    [-4.0, 0.0, -4.0], [4.0, 0.0, -4.0], [0.0, 7.0, 0.0],
    [-4.0, 0.0, 4.0], [4.0, 0.0, 4.0], [0.0, 7.0, 0.0],
    [-4.0, 0.0, -4.0], [-4.0, 0.0, 4.0], [0.0, 7.0, 0.0],
    [4.0, 0.0, -4.0], [4.0, 0.0, 4.0], [0.0, 7.0, 0.0],
    [-4.0, 0.0, -4.0], [-4.0, 0.0, 4.0], [4.0, 0.0, -4.0], [4.0, 0.0, 4.0],
];

const PYRAMID_NORMALS: [[f32; 3]; 16] = [
    [0.0, 4.0, -7.0], [0.0, 4.0, -7.0], [0.0, 4.0, -7.0],
    [0.0, 4.0, 7.0], [0.0, 4.0, 7.0], [0.0, 4.0, 7.0],
    [-7.0, 4.0, 0.0], [-7.0, 4.0, 0.0], [-7.0, 4.0, 0.0],
    [7.0, 4.0, 0.0], [7.0, 4.0, 0.0], [7.0, 4.0, 0.0],
    [0.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.0, -1.0, 0.0],
];

const PYRAMID_INDICES: [u32; 18] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 13, 14, 15];

/// Square pyramid of base 8 and height 7 standing on the XZ plane.
pub fn pyramid() -> Mesh {
    let vertices = PYRAMID_VERTICES
        .iter()
        .zip(PYRAMID_NORMALS.iter())
        .map(|(pos, normal)| Vertex {
            pos: *pos,
            normal: Vec3::from(*normal).normalize().to_array(),
        })
        .collect();
    Mesh { vertices, indices: PYRAMID_INDICES.to_vec() }
}
