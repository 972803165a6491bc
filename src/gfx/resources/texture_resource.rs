//! Texture resource management
//!
//! [`TextureImage`] describes decoded pixels, [`Texture`] is the caller-owned
//! handle, and [`TextureResource`] bundles the wgpu texture, view and sampler
//! behind it.

use crate::{
    error::GfxError,
    gfx::context::{ReleaseQueue, RenderContext, Resource, TextureId},
};

/// Channel layout of decoded pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFormat {
    Rgb,
    Rgba,
}

impl ChannelFormat {
    pub fn channels(self) -> usize {
        match self {
            ChannelFormat::Rgb => 3,
            ChannelFormat::Rgba => 4,
        }
    }
}

/// Decoded 8-bit pixels, rows top to bottom.
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub format: ChannelFormat,
    pub pixels: &'a [u8],
    /// Store rows bottom to top, so texture coordinate (0, 0) is the
    /// bottom-left corner of the image.
    pub flip_vertically: bool,
}

impl<'a> TextureImage<'a> {
    pub fn new(width: u32, height: u32, format: ChannelFormat, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
            flip_vertically: true,
        }
    }

    pub fn flipped(mut self, flip_vertically: bool) -> Self {
        self.flip_vertically = flip_vertically;
        self
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channels()
    }

    /// # Errors
    /// - [`GfxError::InvalidImage`] when either dimension is zero
    /// - [`GfxError::DataTooShort`] when `pixels` cannot cover the image
    pub fn validate(&self) -> Result<(), GfxError> {
        if self.width == 0 || self.height == 0 {
            return Err(GfxError::InvalidImage {
                width: self.width,
                height: self.height,
                reason: "width and height must be non-zero",
            });
        }
        let expected = self.expected_len();
        if self.pixels.len() < expected {
            return Err(GfxError::DataTooShort {
                what: "texture",
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// Tightly packed RGBA8 rows in upload order. RGB gets an opaque alpha.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let channels = self.format.channels();
        let row_len = self.width as usize * channels;
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);

        let mut rows: Vec<&[u8]> = self.pixels[..self.expected_len()]
            .chunks_exact(row_len.max(1))
            .collect();
        if self.flip_vertically {
            rows.reverse();
        }

        for row in rows {
            match self.format {
                ChannelFormat::Rgba => rgba.extend_from_slice(row),
                ChannelFormat::Rgb => {
                    for px in row.chunks_exact(3) {
                        rgba.extend_from_slice(&[px[0], px[1], px[2], u8::MAX]);
                    }
                }
            }
        }
        rgba
    }
}

/// A sampled 2D texture owned by the caller.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
    format: ChannelFormat,
    release: ReleaseQueue,
}

impl Texture {
    /// Uploads `image`.
    ///
    /// # Errors
    /// [`GfxError::InvalidImage`] for an empty or oversized image and
    /// [`GfxError::DataTooShort`] when the pixel data does not cover it.
    /// The failure is logged and nothing is created.
    pub fn new<C: RenderContext + ?Sized>(ctx: &mut C, image: &TextureImage<'_>) -> Result<Self, GfxError> {
        if let Err(err) = image.validate() {
            log::error!("failed to load texture: {err}");
            return Err(err);
        }
        let id = ctx
            .create_texture(image)
            .inspect_err(|err| log::error!("failed to load texture: {err}"))?;
        log::debug!(
            "texture {id}: {}x{} {:?}",
            image.width,
            image.height,
            image.format
        );
        Ok(Self {
            id,
            width: image.width,
            height: image.height,
            format: image.format,
            release: ctx.release_queue(),
        })
    }

    /// Binds the texture to texture unit `unit`.
    pub fn activate<C: RenderContext + ?Sized>(&self, ctx: &mut C, unit: u32) {
        ctx.bind_texture(unit, self.id);
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> ChannelFormat {
        self.format
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release.push(Resource::Texture(self.id));
    }
}

/// GPU texture resource containing texture, view, and sampler
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the crate
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates a depth texture for a render target of the given size
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads a decoded image with mirrored-repeat wrapping and linear
    /// filtering.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage<'_>,
        label: &str,
    ) -> Self {
        let rgba = image.to_rgba8();
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::MirrorRepeat,
            address_mode_v: wgpu::AddressMode::MirrorRepeat,
            address_mode_w: wgpu::AddressMode::MirrorRepeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::{Command, RecordingContext};

    // 1x2 RGB image: red row on top, blue row below
    const RED_OVER_BLUE: [u8; 6] = [255, 0, 0, 0, 0, 255];

    #[test]
    fn test_rgb_expands_to_rgba() {
        let image = TextureImage::new(1, 2, ChannelFormat::Rgb, &RED_OVER_BLUE).flipped(false);
        assert_eq!(image.to_rgba8(), vec![255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn test_flip_reverses_rows() {
        let image = TextureImage::new(1, 2, ChannelFormat::Rgb, &RED_OVER_BLUE);
        assert!(image.flip_vertically);
        assert_eq!(image.to_rgba8(), vec![0, 0, 255, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn test_short_pixels_leave_nothing_bound() {
        let mut ctx = RecordingContext::new();
        let image = TextureImage::new(2, 2, ChannelFormat::Rgba, &[0; 15]);

        let err = Texture::new(&mut ctx, &image).unwrap_err();
        assert_eq!(
            err,
            GfxError::DataTooShort {
                what: "texture",
                expected: 16,
                actual: 15
            }
        );
        assert!(ctx.commands().is_empty());
        assert_eq!(ctx.live_textures(), 0);
    }

    #[test]
    fn test_zero_sized_image_is_rejected() {
        let mut ctx = RecordingContext::new();

        for (width, height) in [(0, 0), (0, 4), (4, 0)] {
            let image = TextureImage::new(width, height, ChannelFormat::Rgb, &[]);
            let err = Texture::new(&mut ctx, &image).unwrap_err();
            assert!(matches!(err, GfxError::InvalidImage { .. }));
        }
        assert!(ctx.commands().is_empty());
        assert_eq!(ctx.live_textures(), 0);
    }

    #[test]
    fn test_activate_binds_unit() {
        let mut ctx = RecordingContext::new();
        let pixels = [7u8; 16];
        let texture = Texture::new(&mut ctx, &TextureImage::new(2, 2, ChannelFormat::Rgba, &pixels)).unwrap();

        texture.activate(&mut ctx, 1);
        assert_eq!(ctx.bound_texture(1), Some(texture.id()));
        assert_eq!(ctx.bound_texture(0), None);
        assert_eq!(
            ctx.commands().last(),
            Some(&Command::BindTexture {
                unit: 1,
                texture: texture.id()
            })
        );
    }
}
