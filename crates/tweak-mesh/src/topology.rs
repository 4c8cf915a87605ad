//! Mesh connectivity.
//!
//! Vertices split for UV seams or hard normals share a position but not an
//! index, so every query here runs on a welded view of the mesh: vertices
//! within a small epsilon of each other count as one. Results are reported in
//! original vertex indices, with every member of a welded group included.

use glam::Vec3;
use std::collections::HashMap;

use crate::buffers::valid_triangles;

/// Default weld distance.
pub const WELD_EPSILON: f32 = 1e-5;

/// Canonical edge representation (smaller index first).
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Quantizes a position for spatial hashing.
fn quantize_position(p: Vec3, epsilon: f32) -> (i32, i32, i32) {
    let scale = 1.0 / epsilon;
    (
        (p.x * scale).round() as i32,
        (p.y * scale).round() as i32,
        (p.z * scale).round() as i32,
    )
}

/// Builds a mapping from vertex indices to welded vertex indices.
/// Vertices at the same position (within epsilon) get the same index.
fn build_weld_map(positions: &[Vec3], epsilon: f32) -> (Vec<u32>, usize) {
    let mut position_to_index: HashMap<(i32, i32, i32), u32> = HashMap::new();
    let mut weld_map = Vec::with_capacity(positions.len());
    let mut next_index = 0u32;

    for pos in positions {
        let key = quantize_position(*pos, epsilon);
        let index = *position_to_index.entry(key).or_insert_with(|| {
            let idx = next_index;
            next_index += 1;
            idx
        });
        weld_map.push(index);
    }

    (weld_map, next_index as usize)
}

/// Welded adjacency of a triangle mesh.
#[derive(Debug, Clone)]
pub struct Topology {
    weld_map: Vec<u32>,
    members: Vec<Vec<u32>>,
    neighbors: Vec<Vec<u32>>,
    boundary_edges: Vec<(u32, u32)>,
}

impl Topology {
    /// Builds topology with the default weld epsilon.
    pub fn new(positions: &[Vec3], indices: &[u32]) -> Self {
        Self::with_epsilon(positions, indices, WELD_EPSILON)
    }

    /// Builds topology welding vertices closer than `epsilon`.
    ///
    /// Triangles referencing missing vertices are ignored.
    pub fn with_epsilon(positions: &[Vec3], indices: &[u32], epsilon: f32) -> Self {
        let (weld_map, welded_count) = build_weld_map(positions, epsilon.max(f32::MIN_POSITIVE));

        let mut members = vec![Vec::new(); welded_count];
        for (v, &w) in weld_map.iter().enumerate() {
            members[w as usize].push(v as u32);
        }

        let mut edge_faces: HashMap<(u32, u32), usize> = HashMap::new();
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); welded_count];

        for (_, [i0, i1, i2]) in valid_triangles(indices, positions.len()) {
            let tri = [weld_map[i0], weld_map[i1], weld_map[i2]];
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                if a == b {
                    continue;
                }
                *edge_faces.entry(edge_key(a, b)).or_insert(0) += 1;
                if !neighbors[a as usize].contains(&b) {
                    neighbors[a as usize].push(b);
                    neighbors[b as usize].push(a);
                }
            }
        }

        let mut boundary_edges: Vec<(u32, u32)> = edge_faces
            .into_iter()
            .filter(|&(_, count)| count == 1)
            .map(|(edge, _)| edge)
            .collect();
        boundary_edges.sort_unstable();

        Self {
            weld_map,
            members,
            neighbors,
            boundary_edges,
        }
    }

    /// Returns the number of original vertices.
    pub fn vertex_count(&self) -> usize {
        self.weld_map.len()
    }

    /// Returns the number of distinct welded vertices.
    pub fn welded_count(&self) -> usize {
        self.members.len()
    }

    /// Returns the welded index of a vertex.
    pub fn welded_index(&self, vertex: usize) -> Option<u32> {
        self.weld_map.get(vertex).copied()
    }

    /// Returns the vertices sharing a position with `vertex`, itself included.
    pub fn coincident(&self, vertex: usize) -> &[u32] {
        self.welded_index(vertex)
            .map_or(&[], |w| &self.members[w as usize])
    }

    /// Returns one representative vertex for each edge neighbour of `vertex`.
    pub fn vertex_neighbors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        let welded = self.welded_index(vertex);
        welded
            .into_iter()
            .flat_map(|w| self.neighbors[w as usize].iter())
            .filter_map(|&n| self.members[n as usize].first().map(|&v| v as usize))
    }

    /// Returns boundary edges (used by exactly one triangle) as welded index pairs.
    pub fn boundary_edges(&self) -> &[(u32, u32)] {
        &self.boundary_edges
    }

    /// Returns true if the mesh has no boundary edges.
    pub fn is_closed(&self) -> bool {
        self.boundary_edges.is_empty()
    }

    /// Returns every vertex lying on a boundary edge, sorted.
    pub fn boundary_vertices(&self) -> Vec<usize> {
        let mut on_boundary = vec![false; self.welded_count()];
        for &(a, b) in &self.boundary_edges {
            on_boundary[a as usize] = true;
            on_boundary[b as usize] = true;
        }
        (0..self.vertex_count())
            .filter(|&v| on_boundary[self.weld_map[v] as usize])
            .collect()
    }

    /// Extracts boundary loops as ordered vertex sequences.
    ///
    /// Each loop lists welded vertices in walk order, expanded to every
    /// original vertex at that position. Open chains (non-manifold
    /// boundaries) are returned as far as they can be walked.
    pub fn boundary_loops(&self) -> Vec<Vec<usize>> {
        let mut adj: Vec<Vec<u32>> = vec![Vec::new(); self.welded_count()];
        for &(a, b) in &self.boundary_edges {
            adj[a as usize].push(b);
            adj[b as usize].push(a);
        }

        let mut visited = vec![false; self.boundary_edges.len()];
        let edge_slot = |a: u32, b: u32| self.boundary_edges.binary_search(&edge_key(a, b)).ok();
        let mut loops = Vec::new();

        for (first, &(start, next)) in self.boundary_edges.iter().enumerate() {
            if visited[first] {
                continue;
            }
            visited[first] = true;

            // Trace the loop
            let mut loop_verts = vec![start];
            let mut prev = start;
            let mut current = next;

            while current != start {
                loop_verts.push(current);

                let step = adj[current as usize].iter().find_map(|&n| {
                    let slot = edge_slot(current, n)?;
                    (!visited[slot]).then_some((n, slot))
                });
                let Some((n, slot)) = step else {
                    break;
                };
                visited[slot] = true;
                prev = current;
                current = n;
            }

            loops.push(
                loop_verts
                    .into_iter()
                    .flat_map(|w| self.members[w as usize].iter().map(|&v| v as usize))
                    .collect(),
            );
        }

        loops
    }

    /// Flood-fills across shared edges from `seeds` and returns a flag per
    /// vertex marking the reached region.
    pub fn connected_region(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<bool> {
        let mut reached = vec![false; self.welded_count()];
        let mut stack: Vec<u32> = seeds
            .into_iter()
            .filter_map(|v| self.welded_index(v))
            .collect();

        while let Some(w) = stack.pop() {
            if std::mem::replace(&mut reached[w as usize], true) {
                continue;
            }
            stack.extend(
                self.neighbors[w as usize]
                    .iter()
                    .filter(|&&n| !reached[n as usize]),
            );
        }

        self.weld_map.iter().map(|&w| reached[w as usize]).collect()
    }

    /// Counts connected components among vertices used by triangles.
    pub fn component_count(&self) -> usize {
        let mut reached = vec![false; self.welded_count()];
        let mut count = 0;
        for w in 0..self.welded_count() {
            if reached[w] || self.neighbors[w].is_empty() {
                continue;
            }
            count += 1;
            let mut stack = vec![w as u32];
            while let Some(c) = stack.pop() {
                if std::mem::replace(&mut reached[c as usize], true) {
                    continue;
                }
                stack.extend(self.neighbors[c as usize].iter().copied());
            }
        }
        count
    }
}
