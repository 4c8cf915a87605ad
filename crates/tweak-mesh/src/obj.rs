//! Wavefront OBJ export.

use std::fmt::{self, Write};

use glam::Vec3;

use crate::buffers::MeshBuffers;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for OBJ export.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjExportOptions {
    /// Object name written as an `o` line.
    pub name: Option<String>,
    /// Negate X to convert between left- and right-handed coordinates.
    pub flip_handedness: bool,
    /// Reverse triangle winding.
    pub flip_faces: bool,
    /// Bake the mesh transform into the written vertices.
    pub apply_transform: bool,
}

impl Default for ObjExportOptions {
    fn default() -> Self {
        Self {
            name: None,
            flip_handedness: true,
            flip_faces: false,
            apply_transform: false,
        }
    }
}

impl ObjExportOptions {
    /// Sets the object name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keeps coordinates unchanged.
    pub fn raw() -> Self {
        Self {
            flip_handedness: false,
            ..Self::default()
        }
    }
}

/// Writes a mesh in OBJ format to any [`fmt::Write`] sink.
pub fn write_obj<W: Write>(
    out: &mut W,
    mesh: &MeshBuffers,
    options: &ObjExportOptions,
) -> fmt::Result {
    let (positions, normals) = if options.apply_transform {
        (mesh.world_positions(), mesh.world_normals())
    } else {
        (mesh.positions.clone(), mesh.normals.clone())
    };
    let handed = |v: Vec3| {
        if options.flip_handedness {
            Vec3::new(-v.x, v.y, v.z)
        } else {
            v
        }
    };

    // Header
    writeln!(out, "# OBJ exported by tweak")?;
    if let Some(name) = &options.name {
        writeln!(out, "o {name}")?;
    }
    writeln!(out)?;

    // Vertex positions
    for pos in positions.iter().map(|&p| handed(p)) {
        writeln!(out, "v {} {} {}", pos.x, pos.y, pos.z)?;
    }
    writeln!(out)?;

    // Texture coordinates
    let has_uvs = mesh.has_uvs();
    if has_uvs {
        for uv in &mesh.uvs {
            writeln!(out, "vt {} {}", uv.x, uv.y)?;
        }
        writeln!(out)?;
    }

    // Vertex normals
    let has_normals = mesh.has_normals();
    if has_normals {
        for normal in normals.iter().map(|&n| handed(n)) {
            writeln!(out, "vn {} {} {}", normal.x, normal.y, normal.z)?;
        }
        writeln!(out)?;
    }

    // Faces (triangles)
    for tri in mesh.indices.chunks_exact(3) {
        // OBJ uses 1-based indexing
        let (i0, i1, i2) = if options.flip_faces {
            (tri[0] + 1, tri[2] + 1, tri[1] + 1)
        } else {
            (tri[0] + 1, tri[1] + 1, tri[2] + 1)
        };

        match (has_uvs, has_normals) {
            (true, true) => writeln!(out, "f {i0}/{i0}/{i0} {i1}/{i1}/{i1} {i2}/{i2}/{i2}")?,
            (true, false) => writeln!(out, "f {i0}/{i0} {i1}/{i1} {i2}/{i2}")?,
            (false, true) => writeln!(out, "f {i0}//{i0} {i1}//{i1} {i2}//{i2}")?,
            (false, false) => writeln!(out, "f {i0} {i1} {i2}")?,
        }
    }

    Ok(())
}

/// Exports a mesh to an OBJ string.
pub fn export_obj(mesh: &MeshBuffers, options: &ObjExportOptions) -> String {
    let mut output = String::new();
    // Writing to a String cannot fail
    let _ = write_obj(&mut output, mesh, options);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec2};

    fn triangle() -> MeshBuffers {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut mesh = MeshBuffers::from_positions(positions, vec![0, 1, 2]);
        mesh.compute_smooth_normals();
        mesh
    }

    #[test]
    fn test_export_raw() {
        let obj = export_obj(&triangle(), &ObjExportOptions::raw().with_name("tri"));
        assert!(obj.contains("o tri"));
        assert!(obj.contains("v 1 0 0"));
        assert!(obj.contains("vn 0 0 1"));
        assert!(obj.contains("f 1//1 2//2 3//3"));
        assert!(!obj.contains("vt"));
    }

    #[test]
    fn test_export_flipped() {
        let mut mesh = triangle();
        mesh.uvs = vec![Vec2::ZERO, Vec2::X, Vec2::Y];
        let options = ObjExportOptions {
            flip_faces: true,
            ..ObjExportOptions::default()
        };
        let obj = export_obj(&mesh, &options);
        assert!(obj.contains("v -1 0 0"));
        assert!(obj.contains("vt 1 0"));
        assert!(obj.contains("f 1/1/1 3/3/3 2/2/2"));
    }

    #[test]
    fn test_export_applies_transform() {
        let mesh = triangle().with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)));
        let options = ObjExportOptions {
            apply_transform: true,
            ..ObjExportOptions::raw()
        };
        let obj = export_obj(&mesh, &options);
        assert!(obj.contains("v 1 0 2"));
    }
}
