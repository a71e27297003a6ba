//! Offscreen render targets for the forward path.
//!
//! The scene is shaded into a multisampled HDR color target with a matching
//! depth buffer, resolved into a single-sample HDR texture, and bloom works on
//! a half-resolution ping-pong pair. Everything here is recreated whenever the
//! drawable size changes.

/// HDR intermediate format. Filterable and blendable on all wgpu backends.
pub(crate) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Scene depth format.
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) struct RenderTargets {
    size: (u32, u32),
    sample_count: u32,

    /// Multisampled scene color; `None` when MSAA is disabled (count 1).
    pub msaa_color: Option<wgpu::TextureView>,
    /// Scene depth, sampled like the color target.
    pub depth: wgpu::TextureView,
    /// Single-sample HDR scene result (resolve target, bloom/composite input).
    pub hdr_resolve: wgpu::TextureView,

    /// Half-resolution bloom ping-pong pair.
    pub bloom_a: wgpu::TextureView,
    pub bloom_b: wgpu::TextureView,
    bloom_size: (u32, u32),
}

impl RenderTargets {
    pub fn create(device: &wgpu::Device, width: u32, height: u32, sample_count: u32) -> Self {
        debug_assert!(width > 0 && height > 0);

        let msaa_color = (sample_count > 1).then(|| {
            make_texture(
                device,
                "tiamat msaa color",
                width,
                height,
                sample_count,
                HDR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
        });

        let depth = make_texture(
            device,
            "tiamat depth",
            width,
            height,
            sample_count,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let hdr_resolve = make_texture(
            device,
            "tiamat hdr resolve",
            width,
            height,
            1,
            HDR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        // Bloom at half resolution: cheaper, and the downsample is the first
        // tap of the blur anyway.
        let bloom_size = ((width / 2).max(1), (height / 2).max(1));
        let bloom = |label| {
            make_texture(
                device,
                label,
                bloom_size.0,
                bloom_size.1,
                1,
                HDR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            )
        };

        Self {
            size: (width, height),
            sample_count,
            msaa_color,
            depth,
            hdr_resolve,
            bloom_a: bloom("tiamat bloom a"),
            bloom_b: bloom("tiamat bloom b"),
            bloom_size,
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    pub fn bloom_size(&self) -> (u32, u32) {
        self.bloom_size
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Color attachment for the scene pass: multisampled with a resolve
    /// target when MSAA is on, the resolve texture directly otherwise.
    pub fn scene_color_attachment(
        &self,
        clear: wgpu::Color,
    ) -> wgpu::RenderPassColorAttachment<'_> {
        let (view, resolve_target) = match &self.msaa_color {
            Some(msaa) => (msaa, Some(&self.hdr_resolve)),
            None => (&self.hdr_resolve, None),
        };

        wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }
}

fn make_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    sample_count: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
