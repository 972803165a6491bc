//! # Vertex Layouts
//!
//! A vertex record is a run of `f32`s split into attributes by width, e.g.
//! `[3, 3, 2]` for position + color + texture coordinate. Attribute `i` is
//! bound to shader location `i` and starts at the sum of the widths before it.

use crate::error::GfxError;

const FLOAT_SIZE: u32 = std::mem::size_of::<f32>() as u32;

/// One attribute of a vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader location, assigned in declaration order starting at 0.
    pub location: u32,
    /// Number of `f32` components (1..=4).
    pub width: u32,
    /// Offset from the start of the record, in floats.
    pub offset: u32,
}

impl VertexAttribute {
    pub fn offset_bytes(&self) -> u64 {
        u64::from(self.offset * FLOAT_SIZE)
    }

    pub fn format(&self) -> wgpu::VertexFormat {
        match self.width {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }
}

/// Declarative per-vertex attribute layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    widths: Vec<u32>,
}

impl VertexLayout {
    /// Builds a layout from attribute widths.
    ///
    /// # Errors
    /// [`GfxError::InvalidLayout`] when `widths` is empty or any width is
    /// outside `1..=4`.
    pub fn new(widths: &[u32]) -> Result<Self, GfxError> {
        if widths.is_empty() {
            return Err(GfxError::InvalidLayout {
                widths: Vec::new(),
                reason: "a vertex needs at least one attribute",
            });
        }
        if widths.iter().any(|w| !(1..=4).contains(w)) {
            return Err(GfxError::InvalidLayout {
                widths: widths.to_vec(),
                reason: "attribute widths must be between 1 and 4 floats",
            });
        }
        Ok(Self {
            widths: widths.to_vec(),
        })
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Floats per vertex: the sum of all widths.
    pub fn stride(&self) -> u32 {
        self.widths.iter().sum()
    }

    pub fn stride_bytes(&self) -> u64 {
        u64::from(self.stride() * FLOAT_SIZE)
    }

    /// Attributes with locations and prefix-sum offsets.
    pub fn attributes(&self) -> Vec<VertexAttribute> {
        let mut offset = 0;
        self.widths
            .iter()
            .enumerate()
            .map(|(location, &width)| {
                let attribute = VertexAttribute {
                    location: location as u32,
                    width,
                    offset,
                };
                offset += width;
                attribute
            })
            .collect()
    }

    /// The attributes in the form a wgpu pipeline expects.
    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes()
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                offset: attribute.offset_bytes(),
                shader_location: attribute.location,
                format: attribute.format(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_is_sum_of_widths() {
        let layout = VertexLayout::new(&[3, 3, 2]).unwrap();
        assert_eq!(layout.stride(), 8);
        assert_eq!(layout.stride_bytes(), 32);
    }

    #[test]
    fn test_offsets_are_prefix_sums() {
        let cases: [&[u32]; 4] = [&[3, 3, 2], &[4], &[1, 2, 3, 4], &[2, 2, 2, 2, 2]];
        for widths in cases {
            let layout = VertexLayout::new(widths).unwrap();
            let attributes = layout.attributes();

            let mut expected = 0;
            for (i, attribute) in attributes.iter().enumerate() {
                assert_eq!(attribute.location, i as u32);
                assert_eq!(attribute.offset, expected);
                expected += attribute.width;
            }
            assert_eq!(expected, layout.stride());
            assert!(attributes.windows(2).all(|w| w[0].offset < w[1].offset));
        }
    }

    #[test]
    fn test_wgpu_attributes() {
        let layout = VertexLayout::new(&[3, 3, 2]).unwrap();
        let attributes = layout.wgpu_attributes();
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[2].offset, 24);
        assert_eq!(attributes[2].shader_location, 2);
        assert_eq!(attributes[2].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn test_invalid_layouts_are_rejected() {
        assert!(matches!(
            VertexLayout::new(&[]),
            Err(GfxError::InvalidLayout { .. })
        ));
        assert!(matches!(
            VertexLayout::new(&[3, 0]),
            Err(GfxError::InvalidLayout { .. })
        ));
        assert!(matches!(
            VertexLayout::new(&[5]),
            Err(GfxError::InvalidLayout { .. })
        ));
    }
}
