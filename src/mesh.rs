use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// Axis-aligned bounding box in mesh space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vector3::zeros(),
            max: Vector3::zeros(),
        }
    }
}

impl Aabb {
    /// Tight box around `points`; an empty set yields a zero-sized box at the origin.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vector3<f32>>) -> Self {
        let mut min = Vector3::repeat(f32::INFINITY);
        let mut max = Vector3::repeat(f32::NEG_INFINITY);

        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }

        if min.iter().all(|v| v.is_finite()) && max.iter().all(|v| v.is_finite()) {
            Self { min, max }
        } else {
            Self::default()
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vector3<f32>>,
    pub normals: Option<Vec<Vector3<f32>>>,
    pub uvs: Option<Vec<Vector2<f32>>>,
    /// xyz = tangent direction, w = bitangent handedness (±1).
    pub tangents: Option<Vec<Vector4<f32>>>,
    /// Triangle list.
    pub indices: Vec<u32>,
    pub bounds: Aabb,
    /// Per bone slot: skeleton space to bone-local space at rest.
    pub bind_poses: Option<Vec<Matrix4<f32>>>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<Vector3<f32>>) -> Self {
        let bounds = Aabb::from_points(&vertices);
        Self {
            name: name.into(),
            vertices,
            normals: None,
            uvs: None,
            tangents: None,
            indices: Vec::new(),
            bounds,
            bind_poses: None,
        }
    }

    pub fn recalculate_bounds(&mut self) {
        self.bounds = Aabb::from_points(&self.vertices);
    }

    /// Regenerate per-vertex tangents from positions, normals, UVs and triangles.
    ///
    /// Returns `false` (and clears tangents) when normals or UVs are missing,
    /// since no tangent frame can be derived without them.
    pub fn recalculate_tangents(&mut self) -> bool {
        let (Some(normals), Some(uvs)) = (self.normals.as_ref(), self.uvs.as_ref()) else {
            self.tangents = None;
            return false;
        };

        let vertex_count = self.vertices.len();
        if normals.len() != vertex_count || uvs.len() != vertex_count {
            self.tangents = None;
            return false;
        }

        let mut tan_u = vec![Vector3::<f32>::zeros(); vertex_count];
        let mut tan_v = vec![Vector3::<f32>::zeros(); vertex_count];

        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let edge1 = self.vertices[i1] - self.vertices[i0];
            let edge2 = self.vertices[i2] - self.vertices[i0];
            let duv1 = uvs[i1] - uvs[i0];
            let duv2 = uvs[i2] - uvs[i0];

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let sdir = (edge1 * duv2.y - edge2 * duv1.y) * r;
            let tdir = (edge2 * duv1.x - edge1 * duv2.x) * r;

            for index in [i0, i1, i2] {
                tan_u[index] += sdir;
                tan_v[index] += tdir;
            }
        }

        let tangents = (0..vertex_count)
            .map(|i| {
                let n = normals[i];
                let t = tan_u[i];
                // Gram-Schmidt against the normal.
                let ortho = t - n * n.dot(&t);
                let ortho = if ortho.norm_squared() > 1e-12 {
                    ortho.normalize()
                } else {
                    fallback_tangent(&n)
                };
                let w = if n.cross(&ortho).dot(&tan_v[i]) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
                Vector4::new(ortho.x, ortho.y, ortho.z, w)
            })
            .collect();

        self.tangents = Some(tangents);
        true
    }
}

/// Any unit vector perpendicular to `normal`.
fn fallback_tangent(normal: &Vector3<f32>) -> Vector3<f32> {
    let axis = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let t = axis - normal * normal.dot(&axis);
    if t.norm_squared() > 1e-12 {
        t.normalize()
    } else {
        Vector3::x()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new(
            "quad",
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        );
        mesh.normals = Some(vec![Vector3::z(); 4]);
        mesh.uvs = Some(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ]);
        mesh.indices = vec![0, 1, 2, 0, 2, 3];
        mesh
    }

    #[test]
    fn given_points_when_building_bounds_then_box_is_tight() {
        let points = [Vector3::new(-1.0, 2.0, 0.5), Vector3::new(3.0, -2.0, 1.5)];
        let bounds = Aabb::from_points(&points);

        assert_eq!(bounds.min, Vector3::new(-1.0, -2.0, 0.5));
        assert_eq!(bounds.max, Vector3::new(3.0, 2.0, 1.5));
        assert_eq!(bounds.center(), Vector3::new(1.0, 0.0, 1.0));
        assert_eq!(bounds.extents(), Vector3::new(2.0, 2.0, 0.5));
    }

    #[test]
    fn given_no_points_when_building_bounds_then_zero_box_is_returned() {
        let bounds = Aabb::from_points(&Vec::<Vector3<f32>>::new());
        assert_eq!(bounds, Aabb::default());
    }

    #[test]
    fn given_uv_aligned_quad_when_recalculating_tangents_then_tangent_follows_u() {
        let mut mesh = quad();

        assert!(mesh.recalculate_tangents());

        let tangents = mesh.tangents.expect("tangents should be generated");
        assert_eq!(tangents.len(), 4);
        for tangent in tangents {
            assert!((tangent.xyz() - Vector3::x()).norm() < 0.0001);
            assert_eq!(tangent.w, 1.0);
        }
    }

    #[test]
    fn given_mirrored_uvs_when_recalculating_tangents_then_handedness_is_negative() {
        let mut mesh = quad();
        mesh.uvs = Some(vec![
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 0.0),
        ]);

        assert!(mesh.recalculate_tangents());
        let tangents = mesh.tangents.expect("tangents should be generated");
        assert!(tangents.iter().all(|t| t.w == -1.0));
    }

    #[test]
    fn given_mesh_without_uvs_when_recalculating_tangents_then_tangents_are_cleared() {
        let mut mesh = quad();
        mesh.uvs = None;
        mesh.tangents = Some(vec![Vector4::zeros(); 4]);

        assert!(!mesh.recalculate_tangents());
        assert!(mesh.tangents.is_none());
    }
}
