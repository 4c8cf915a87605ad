//! Benchmarks for spatial data structures.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec3;
use rhizome_tweak_spatial::{Ray, SpatialHash, TriangleBvh};

/// Builds an `n x n` grid of quads in the XZ plane with a gentle bump.
fn grid(n: usize) -> (Vec<Vec3>, Vec<u32>) {
    let mut positions = Vec::with_capacity((n + 1) * (n + 1));
    for z in 0..=n {
        for x in 0..=n {
            let fx = x as f32 / n as f32;
            let fz = z as f32 / n as f32;
            let y = (fx * 6.0).sin() * (fz * 6.0).cos() * 0.1;
            positions.push(Vec3::new(fx, y, fz));
        }
    }

    let mut indices = Vec::with_capacity(n * n * 6);
    let row = (n + 1) as u32;
    for z in 0..n as u32 {
        for x in 0..n as u32 {
            let i00 = z * row + x;
            let i10 = i00 + 1;
            let i01 = i00 + row;
            let i11 = i01 + 1;
            indices.extend_from_slice(&[i00, i01, i10, i10, i01, i11]);
        }
    }

    (positions, indices)
}

fn bench_triangle_bvh_build(c: &mut Criterion) {
    let (positions, indices) = grid(100);

    c.bench_function("triangle_bvh_build_20000", |b| {
        b.iter(|| black_box(TriangleBvh::build(&positions, &indices)))
    });
}

fn bench_triangle_bvh_raycast(c: &mut Criterion) {
    let (positions, indices) = grid(100);
    let bvh = TriangleBvh::build(&positions, &indices);

    c.bench_function("triangle_bvh_raycast_1000", |b| {
        b.iter(|| {
            let mut hits = 0;
            for i in 0..1000 {
                let x = (i % 32) as f32 / 32.0;
                let z = (i / 32) as f32 / 32.0;
                let ray = Ray::new(Vec3::new(x, 1.0, z), Vec3::NEG_Y);
                if bvh.raycast(&ray, f32::MAX).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
}

fn bench_spatial_hash_mirror_lookup(c: &mut Criterion) {
    let (positions, _) = grid(100);
    let mut hash = SpatialHash::new(0.0002);
    for (i, p) in positions.iter().enumerate() {
        hash.insert(*p, i);
    }

    c.bench_function("spatial_hash_reflected_lookup_10201", |b| {
        b.iter(|| {
            let mut found = 0;
            for p in &positions {
                let reflected = Vec3::new(1.0 - p.x, p.y, p.z);
                found += hash.query_radius(reflected, 0.0001).count();
            }
            black_box(found)
        })
    });
}

criterion_group!(
    benches,
    bench_triangle_bvh_build,
    bench_triangle_bvh_raycast,
    bench_spatial_hash_mirror_lookup,
);
criterion_main!(benches);
