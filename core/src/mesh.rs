// Terrain geometry: the rendered surface and the coarse collision surface.

use crate::TerrainSurface;
use crate::biome::Biome;
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::utils::HeightGradient;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainMaterial {
    pub color: [f32; 3],
    pub roughness: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    // normalized over the whole terrain
    pub uvs: Vec<[f32; 2]>,
    // CCW seen from above
    pub indices: Vec<u32>,
    pub material: TerrainMaterial,
    pub aabb_min: [f32; 3],
    pub aabb_max: [f32; 3],
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

// Simplified surface used only for simulation queries. It is never drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionMesh {
    field: HeightField,
    simplification: usize,
}

impl CollisionMesh {
    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn simplification(&self) -> usize {
        self.simplification
    }

    // Vertex and triangle arrays for an external trimesh collider.
    pub fn trimesh_data(&self) -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        let vertices = grid_positions(&self.field);
        let triangles = grid_indices(self.field.cols(), self.field.rows())
            .chunks(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        (vertices, triangles)
    }
}

impl TerrainSurface for CollisionMesh {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self.field.height_at_position(x, z)
    }
}

fn check_index_range(field: &HeightField) -> Result<()> {
    let count = field.cols() * field.rows();
    if count > u32::MAX as usize {
        return Err(TerrainError::GenerationFailed(format!(
            "{count} vertices do not fit 32-bit indices"
        )));
    }
    Ok(())
}

fn grid_positions(field: &HeightField) -> Vec<[f32; 3]> {
    let mut positions = Vec::with_capacity(field.cols() * field.rows());
    for row in 0..field.rows() {
        for col in 0..field.cols() {
            positions.push([field.world_x(col), field.get(col, row), field.world_z(row)]);
        }
    }
    positions
}

// Two triangles per quad (top-left, bottom-left, bottom-right), (top-left, bottom-right, top-right)
fn grid_indices(cols: usize, rows: usize) -> Vec<u32> {
    if cols < 2 || rows < 2 {
        return Vec::new();
    }
    let cols32 = cols as u32;
    let mut indices = Vec::with_capacity((cols - 1) * (rows - 1) * 6);
    for qz in 0..rows as u32 - 1 {
        for qx in 0..cols32 - 1 {
            let tl = qz * cols32 + qx;
            let tr = tl + 1;
            let bl = tl + cols32;
            let br = bl + 1;
            indices.extend_from_slice(&[tl, bl, br, tl, br, tr]);
        }
    }
    indices
}

// Area-weighted vertex normals from the displaced triangles.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![[0.0f32; 3]; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
        let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &v in &[a, b, c] {
            for k in 0..3 {
                acc[v][k] += n[k];
            }
        }
    }
    acc.into_iter()
        .map(|n| {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > f32::EPSILON {
                [n[0] / len, n[1] / len, n[2] / len]
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

// Full-resolution render mesh coloured for the biome.
pub fn build_terrain_mesh(field: &HeightField, biome: Biome) -> Result<TerrainMesh> {
    check_index_range(field)?;
    let positions = grid_positions(field);
    let indices = grid_indices(field.cols(), field.rows());
    let normals = compute_vertex_normals(&positions, &indices);

    let (lo, hi) = field.min_max();
    let gradient = HeightGradient::for_biome(biome);
    let colors = field
        .heights()
        .iter()
        .map(|&h| gradient.color_at(h, lo, hi))
        .collect();

    let u_span = (field.cols().max(2) - 1) as f32;
    let v_span = (field.rows().max(2) - 1) as f32;
    let mut uvs = Vec::with_capacity(positions.len());
    for row in 0..field.rows() {
        for col in 0..field.cols() {
            uvs.push([col as f32 / u_span, row as f32 / v_span]);
        }
    }

    let mut aabb_min = [f32::MAX; 3];
    let mut aabb_max = [f32::MIN; 3];
    for p in &positions {
        for i in 0..3 {
            aabb_min[i] = aabb_min[i].min(p[i]);
            aabb_max[i] = aabb_max[i].max(p[i]);
        }
    }

    Ok(TerrainMesh {
        positions,
        normals,
        colors,
        uvs,
        indices,
        material: TerrainMaterial {
            color: biome.config().terrain_color,
            roughness: 0.9,
        },
        aabb_min,
        aabb_max,
    })
}

// Coarse copy of the field: every `factor`-th sample by nearest-point
// selection. The last row and column always take the field's edge samples.
pub fn build_collision_mesh(field: &HeightField, factor: usize) -> Result<CollisionMesh> {
    let factor = factor.max(1);
    let coarse = |n: usize| if n <= 1 { 1 } else { (n - 1).div_ceil(factor) + 1 };
    let cols = coarse(field.cols());
    let rows = coarse(field.rows());

    let mut heights = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        let src_row = (row * factor).min(field.rows() - 1);
        for col in 0..cols {
            let src_col = (col * factor).min(field.cols() - 1);
            heights.push(field.get(src_col, src_row));
        }
    }

    let (ox, oz) = field.origin();
    let coarse_field = HeightField::new(
        cols,
        rows,
        field.resolution() * factor as f32,
        ox,
        oz,
        heights,
    )?;
    check_index_range(&coarse_field)?;
    Ok(CollisionMesh {
        field: coarse_field,
        simplification: factor,
    })
}
