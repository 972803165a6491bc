//! # Built-in Meshes
//!
//! Small interleaved meshes for getting something on screen before any
//! model loading exists.

use super::GeometryData;

/// Attribute widths of [`textured_quad`]: position, color, texture coordinate.
pub const QUAD_LAYOUT: [u32; 3] = [3, 3, 2];

/// Attribute widths of [`textured_cube`]: position, texture coordinate.
pub const CUBE_LAYOUT: [u32; 2] = [3, 2];

/// A unit quad in the XY plane with per-corner colors, drawn as two indexed
/// triangles.
///
/// Corners are top right (red), bottom right (green), bottom left (blue) and
/// top left (white).
#[rustfmt::skip]
pub fn textured_quad() -> GeometryData {
    GeometryData {
        vertices: vec![
            // position          color             tex coord
             0.5,  0.5, 0.0,    1.0, 0.0, 0.0,    1.0, 1.0,
             0.5, -0.5, 0.0,    0.0, 1.0, 0.0,    1.0, 0.0,
            -0.5, -0.5, 0.0,    0.0, 0.0, 1.0,    0.0, 0.0,
            -0.5,  0.5, 0.0,    1.0, 1.0, 1.0,    0.0, 1.0,
        ],
        widths: QUAD_LAYOUT.to_vec(),
        indices: vec![
            0, 2, 3,
            1, 2, 3,
        ],
    }
}

/// A unit cube centered at the origin, four vertices per face so every face
/// gets the full texture.
#[rustfmt::skip]
pub fn textured_cube() -> GeometryData {
    let positions: [[f32; 3]; 24] = [
        // Front face
        [-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5],
        // Back face
        [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5, -0.5, -0.5],
        // Left face
        [-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5],
        // Right face
        [ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5],
        // Top face
        [-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5],
        // Bottom face
        [-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5],
    ];

    let tex_coords: [[f32; 2]; 24] = [
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0],
        [1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [1.0, 1.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
    ];

    let vertices = positions
        .iter()
        .zip(tex_coords.iter())
        .flat_map(|(p, t)| [p[0], p[1], p[2], t[0], t[1]])
        .collect();

    // Two counter-clockwise triangles per face
    let indices = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect();

    GeometryData {
        vertices,
        widths: CUBE_LAYOUT.to_vec(),
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_generation() {
        let quad = textured_quad();
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.indices, vec![0, 2, 3, 1, 2, 3]);
        assert_eq!(quad.triangle_count(), 2);
    }

    #[test]
    fn test_cube_generation() {
        let cube = textured_cube();
        assert_eq!(cube.vertices.len(), 24 * 5);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36); // 6 faces * 2 triangles * 3 indices
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.indices.iter().all(|&i| i < 24));
    }
}
