//! Triangle meshes in a line-oriented text format, expanded at load time
//! into a flat array of per-corner vertices.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{RenderError, RenderResult};
use crate::math::{Vec2, Vec3, Vec4};

/// One triangle corner. Tangents carry handedness in `w`; joints and
/// weights drive skinning and stay zero for rigid meshes.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Vec3,
    pub texcoord: Vec2,
    pub normal: Vec3,
    pub tangent: Vec4,
    pub joint: Vec4,
    pub weight: Vec4,
}

/// An immutable triangle mesh: `3 * num_faces` vertices laid out corner by
/// corner, plus the cached bounding-box midpoint.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    center: Vec3,
}

impl Mesh {
    /// Loads a mesh file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Mesh> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RenderError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mesh = Mesh::parse(&text)?;
        debug!("loaded mesh {} ({} faces)", path.display(), mesh.num_faces());
        Ok(mesh)
    }

    /// Parses the text format: `v`/`vt`/`vn` attribute lines, `f` faces
    /// with three 1-based `p/t/n` corners, and optional `# ext.tangent`,
    /// `# ext.joint`, `# ext.weight` lines indexed by position. Unknown
    /// lines are ignored.
    pub fn parse(text: &str) -> RenderResult<Mesh> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut texcoords: Vec<Vec2> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut tangents: Vec<Vec4> = Vec::new();
        let mut joints: Vec<Vec4> = Vec::new();
        let mut weights: Vec<Vec4> = Vec::new();
        let mut faces: Vec<[[usize; 3]; 3]> = Vec::new();

        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("v ") {
                let [x, y, z] = parse_floats::<3>(rest, line)?;
                positions.push(Vec3::new(x, y, z));
            } else if let Some(rest) = line.strip_prefix("vt ") {
                let [u, v] = parse_floats::<2>(rest, line)?;
                texcoords.push(Vec2::new(u, v));
            } else if let Some(rest) = line.strip_prefix("vn ") {
                let [x, y, z] = parse_floats::<3>(rest, line)?;
                normals.push(Vec3::new(x, y, z));
            } else if let Some(rest) = line.strip_prefix("f ") {
                faces.push(parse_face(rest, line)?);
            } else if let Some(rest) = line.strip_prefix("# ext.tangent ") {
                let [x, y, z, w] = parse_floats::<4>(rest, line)?;
                tangents.push(Vec4::new(x, y, z, w));
            } else if let Some(rest) = line.strip_prefix("# ext.joint ") {
                let [a, b, c, d] = parse_floats::<4>(rest, line)?;
                joints.push(Vec4::new(a, b, c, d));
            } else if let Some(rest) = line.strip_prefix("# ext.weight ") {
                let [a, b, c, d] = parse_floats::<4>(rest, line)?;
                weights.push(Vec4::new(a, b, c, d));
            }
        }

        if faces.is_empty() {
            return Err(RenderError::malformed("mesh has no faces"));
        }
        for extension in [&tangents, &joints, &weights] {
            if !extension.is_empty() && extension.len() != positions.len() {
                return Err(RenderError::malformed(
                    "extension attribute count does not match position count",
                ));
            }
        }

        let mut vertices = Vec::with_capacity(faces.len() * 3);
        let mut bbox_min = Vec3::repeat(f32::INFINITY);
        let mut bbox_max = Vec3::repeat(f32::NEG_INFINITY);
        for face in &faces {
            for &[position_index, texcoord_index, normal_index] in face {
                let position = *lookup(&positions, position_index, "position")?;
                let vertex = Vertex {
                    position,
                    texcoord: *lookup(&texcoords, texcoord_index, "texcoord")?,
                    normal: *lookup(&normals, normal_index, "normal")?,
                    tangent: extension_or(&tangents, position_index, Vec4::new(1.0, 0.0, 0.0, 1.0)),
                    joint: extension_or(&joints, position_index, Vec4::zeros()),
                    weight: extension_or(&weights, position_index, Vec4::zeros()),
                };
                bbox_min = bbox_min.inf(&position);
                bbox_max = bbox_max.sup(&position);
                vertices.push(vertex);
            }
        }

        Ok(Mesh {
            vertices,
            center: (bbox_min + bbox_max) / 2.0,
        })
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.vertices.len() / 3
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Midpoint of the axis-aligned bounding box, in model space.
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.center
    }
}

fn parse_floats<const N: usize>(text: &str, line: &str) -> RenderResult<[f32; N]> {
    let mut values = [0.0; N];
    let mut fields = text.split_whitespace();
    for value in values.iter_mut() {
        *value = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| RenderError::malformed(format!("bad mesh line: {line:?}")))?;
    }
    Ok(values)
}

/// Parses three `p/t/n` corners into zero-based index triples.
fn parse_face(text: &str, line: &str) -> RenderResult<[[usize; 3]; 3]> {
    let mut corners = [[0usize; 3]; 3];
    let mut fields = text.split_whitespace();
    for corner in corners.iter_mut() {
        let field = fields
            .next()
            .ok_or_else(|| RenderError::malformed(format!("bad face line: {line:?}")))?;
        let mut indices = field.split('/');
        for index in corner.iter_mut() {
            let one_based: usize = indices
                .next()
                .and_then(|part| part.parse().ok())
                .filter(|&index| index > 0)
                .ok_or_else(|| RenderError::malformed(format!("bad face line: {line:?}")))?;
            *index = one_based - 1;
        }
    }
    Ok(corners)
}

fn lookup<'a, T>(values: &'a [T], index: usize, kind: &str) -> RenderResult<&'a T> {
    values
        .get(index)
        .ok_or_else(|| RenderError::malformed(format!("{kind} index {} out of range", index + 1)))
}

fn extension_or(values: &[Vec4], index: usize, default: Vec4) -> Vec4 {
    if values.is_empty() {
        default
    } else {
        values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
this line is ignored
";

    #[test]
    fn parses_faces_into_corner_vertices() {
        let mesh = Mesh::parse(QUAD).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.vertices().len(), 6);
        let first = mesh.vertices()[0];
        assert_eq!(first.position, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(first.texcoord, Vec2::new(0.0, 0.0));
        assert_eq!(first.normal, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn missing_extensions_get_defaults() {
        let mesh = Mesh::parse(QUAD).unwrap();
        let vertex = mesh.vertices()[0];
        assert_eq!(vertex.tangent, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(vertex.joint, Vec4::zeros());
        assert_eq!(vertex.weight, Vec4::zeros());
    }

    #[test]
    fn center_is_bbox_midpoint() {
        let mesh = Mesh::parse(QUAD).unwrap();
        assert_eq!(mesh.center(), Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn extension_lines_apply_by_position_index() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vn 0 0 1
# ext.tangent 0 1 0 -1
# ext.tangent 0 1 0 -1
# ext.tangent 0 1 0 -1
# ext.joint 1 2 0 0
# ext.joint 1 2 0 0
# ext.joint 1 2 0 0
# ext.weight 0.75 0.25 0 0
# ext.weight 0.75 0.25 0 0
# ext.weight 0.75 0.25 0 0
f 1/1/1 2/1/1 3/1/1
";
        let mesh = Mesh::parse(text).unwrap();
        let vertex = mesh.vertices()[1];
        assert_eq!(vertex.tangent, Vec4::new(0.0, 1.0, 0.0, -1.0));
        assert_eq!(vertex.joint, Vec4::new(1.0, 2.0, 0.0, 0.0));
        assert_eq!(vertex.weight, Vec4::new(0.75, 0.25, 0.0, 0.0));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let text = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 1/1/1\n";
        assert!(Mesh::parse(text).is_err());
    }

    #[test]
    fn meshes_without_faces_are_rejected() {
        assert!(Mesh::parse("v 0 0 0\n").is_err());
    }
}
