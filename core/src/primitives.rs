// Procedural primitives (cone, sphere, cylinder, box) and instanced
// vegetation batches built from them.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};

use crate::biome::{Primitive, VegetationType};
use crate::vegetation::VegetationItem;

// Small indexed mesh; the base of every primitive rests on y = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl PrimitiveGeometry {
    fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn push(&mut self, p: [f32; 3], n: [f32; 3]) -> u32 {
        self.positions.push(p);
        self.normals.push(n);
        self.positions.len() as u32 - 1
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

// One draw call: a shared primitive and a transform per placed item.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedMesh {
    pub vegetation_type: VegetationType,
    pub geometry: PrimitiveGeometry,
    pub color: [f32; 3],
    pub instances: Vec<Mat4>,
}

impl InstancedMesh {
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

pub fn create_cone(radius: f32, height: f32, segments: u32) -> PrimitiveGeometry {
    let segments = segments.max(3);
    let mut g = PrimitiveGeometry::new();
    let slant = (radius * radius + height * height).sqrt();
    let (ny, nr) = (radius / slant, height / slant);

    // side: one apex per segment so each face gets its own normal
    for i in 0..segments {
        let a0 = i as f32 / segments as f32 * std::f32::consts::TAU;
        let a1 = (i + 1) as f32 / segments as f32 * std::f32::consts::TAU;
        let mid = (a0 + a1) * 0.5;
        let b0 = g.push([a0.cos() * radius, 0.0, a0.sin() * radius], [a0.cos() * nr, ny, a0.sin() * nr]);
        let b1 = g.push([a1.cos() * radius, 0.0, a1.sin() * radius], [a1.cos() * nr, ny, a1.sin() * nr]);
        let apex = g.push([0.0, height, 0.0], [mid.cos() * nr, ny, mid.sin() * nr]);
        g.indices.extend_from_slice(&[b0, apex, b1]);
    }
    add_disc(&mut g, radius, 0.0, segments, -1.0);
    g
}

pub fn create_cylinder(radius: f32, height: f32, segments: u32) -> PrimitiveGeometry {
    let segments = segments.max(3);
    let mut g = PrimitiveGeometry::new();
    for i in 0..=segments {
        let a = i as f32 / segments as f32 * std::f32::consts::TAU;
        let (s, c) = a.sin_cos();
        g.push([c * radius, 0.0, s * radius], [c, 0.0, s]);
        g.push([c * radius, height, s * radius], [c, 0.0, s]);
    }
    for i in 0..segments {
        let b0 = i * 2;
        let t0 = b0 + 1;
        let b1 = b0 + 2;
        let t1 = b0 + 3;
        g.indices.extend_from_slice(&[b0, t0, b1, b1, t0, t1]);
    }
    add_disc(&mut g, radius, 0.0, segments, -1.0);
    add_disc(&mut g, radius, height, segments, 1.0);
    g
}

// Cap at height y facing up (dir = 1) or down (dir = -1)
fn add_disc(g: &mut PrimitiveGeometry, radius: f32, y: f32, segments: u32, dir: f32) {
    let centre = g.push([0.0, y, 0.0], [0.0, dir, 0.0]);
    let first = centre + 1;
    for i in 0..segments {
        let a = i as f32 / segments as f32 * std::f32::consts::TAU;
        g.push([a.cos() * radius, y, a.sin() * radius], [0.0, dir, 0.0]);
    }
    for i in 0..segments {
        let a = first + i;
        let b = first + (i + 1) % segments;
        if dir > 0.0 {
            g.indices.extend_from_slice(&[centre, b, a]);
        } else {
            g.indices.extend_from_slice(&[centre, a, b]);
        }
    }
}

pub fn create_sphere(radius: f32, rings: u32, segments: u32) -> PrimitiveGeometry {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut g = PrimitiveGeometry::new();
    for r in 0..=rings {
        let phi = r as f32 / rings as f32 * std::f32::consts::PI;
        let (sp, cp) = phi.sin_cos();
        for s in 0..=segments {
            let theta = s as f32 / segments as f32 * std::f32::consts::TAU;
            let (st, ct) = theta.sin_cos();
            let n = [sp * ct, cp, sp * st];
            // lifted so the sphere sits on the ground
            g.push([n[0] * radius, n[1] * radius + radius, n[2] * radius], n);
        }
    }
    let stride = segments + 1;
    for r in 0..rings {
        for s in 0..segments {
            let a = r * stride + s;
            let b = a + stride;
            g.indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }
    g
}

pub fn create_box(width: f32, height: f32, depth: f32) -> PrimitiveGeometry {
    let (hw, hd) = (width / 2.0, depth / 2.0);
    let mut g = PrimitiveGeometry::new();
    // each face: normal plus two in-plane axes (u × v = normal) spanning it
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let half = [hw, height / 2.0, hd];
    for (n, u, v) in faces {
        let centre = [n[0] * half[0], n[1] * half[1] + half[1], n[2] * half[2]];
        let base = g.positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = [
                centre[0] + (u[0] * su + v[0] * sv) * half[0],
                centre[1] + (u[1] * su + v[1] * sv) * half[1],
                centre[2] + (u[2] * su + v[2] * sv) * half[2],
            ];
            g.push(p, n);
        }
        g.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    g
}

// Unit-scale geometry for a vegetation type.
pub fn geometry_for(vegetation_type: VegetationType) -> PrimitiveGeometry {
    match vegetation_type.primitive() {
        Primitive::Cone => create_cone(0.8, 3.0, 8),
        Primitive::Sphere => {
            let r = if vegetation_type == VegetationType::Bush { 0.6 } else { 1.2 };
            create_sphere(r, 6, 8)
        }
        Primitive::Cylinder => create_cylinder(0.25, 2.4, 6),
        Primitive::Box => create_box(1.2, 0.9, 1.2),
    }
}

pub fn instance_transform(item: &VegetationItem) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::splat(item.scale),
        Quat::from_rotation_y(item.rotation),
        item.position,
    )
}

// Batch items into one instanced mesh per vegetation type, ordered by type.
// Instance order within a batch follows the input order.
pub fn build_vegetation_meshes(items: &[VegetationItem]) -> Vec<InstancedMesh> {
    let mut batches: BTreeMap<VegetationType, Vec<Mat4>> = BTreeMap::new();
    for item in items {
        batches
            .entry(item.vegetation_type)
            .or_default()
            .push(instance_transform(item));
    }
    batches
        .into_iter()
        .map(|(vegetation_type, instances)| InstancedMesh {
            vegetation_type,
            geometry: geometry_for(vegetation_type),
            color: vegetation_type.color(),
            instances,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(g: &PrimitiveGeometry) -> bool {
        g.indices.iter().all(|&i| (i as usize) < g.positions.len())
    }

    #[test]
    fn primitives_are_well_formed_and_grounded() {
        for g in [
            create_cone(1.0, 2.0, 8),
            create_cylinder(0.5, 2.0, 6),
            create_sphere(1.0, 4, 6),
            create_box(1.0, 1.0, 1.0),
        ] {
            assert!(in_range(&g));
            assert_eq!(g.positions.len(), g.normals.len());
            assert_eq!(g.indices.len() % 3, 0);
            let min_y = g.positions.iter().map(|p| p[1]).fold(f32::MAX, f32::min);
            assert!(min_y.abs() < 1e-5);
        }
    }

    #[test]
    fn box_faces_wind_outwards() {
        let g = create_box(2.0, 2.0, 2.0);
        for tri in g.indices.chunks(3) {
            let (a, b, c) = (
                Vec3::from(g.positions[tri[0] as usize]),
                Vec3::from(g.positions[tri[1] as usize]),
                Vec3::from(g.positions[tri[2] as usize]),
            );
            let face = (b - a).cross(c - a);
            let n = Vec3::from(g.normals[tri[0] as usize]);
            assert!(face.dot(n) > 0.0);
        }
    }

    #[test]
    fn vegetation_batches_by_type() {
        let item = |t, x| VegetationItem {
            position: Vec3::new(x, 1.0, 0.0),
            vegetation_type: t,
            scale: 2.0,
            rotation: std::f32::consts::FRAC_PI_2,
        };
        let items = [
            item(VegetationType::Rock, 1.0),
            item(VegetationType::PineTree, 2.0),
            item(VegetationType::Rock, 3.0),
        ];
        let meshes = build_vegetation_meshes(&items);
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].vegetation_type, VegetationType::PineTree);
        assert_eq!(meshes[1].instance_count(), 2);

        // translation, Y rotation and uniform scale all land in the matrix
        let m = meshes[1].instances[1];
        let p = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.0, 1.0, -2.0)).length() < 1e-5);
    }
}
