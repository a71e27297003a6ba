//! Bloom + composite post-processing.
//!
//! Four full-screen passes after the scene resolve:
//! 1. threshold: extract HDR pixels above the bloom threshold (half res)
//! 2. blur horizontal (ping)
//! 3. blur vertical (pong)
//! 4. composite: scene + bloom, tonemapped, into the backbuffer

use bytemuck::{Pod, Zeroable};

use super::targets::{RenderTargets, HDR_FORMAT};

/// Uniforms for the threshold and blur stages (`BloomParams` in bloom.wgsl).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct BloomParams {
    threshold: f32,
    intensity: f32,
    texel_step: [f32; 2],
}

/// Uniforms for the composite stage (`CompositeParams` in composite.wgsl).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CompositeParams {
    bloom_intensity: f32,
    exposure: f32,
    _pad: [f32; 2],
}

/// Bloom/composite settings, owned by `RendererConfig`.
#[derive(Debug, Copy, Clone)]
pub(crate) struct BloomSettings {
    pub threshold: f32,
    pub intensity: f32,
    pub exposure: f32,
}

pub(crate) struct BloomPass {
    sampler: wgpu::Sampler,

    filter_bgl: wgpu::BindGroupLayout,
    composite_bgl: wgpu::BindGroupLayout,

    threshold_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,

    composite_shader: wgpu::ShaderModule,
    composite_pipeline: Option<wgpu::RenderPipeline>,
    composite_format: Option<wgpu::TextureFormat>,

    threshold_params: wgpu::Buffer,
    blur_h_params: wgpu::Buffer,
    blur_v_params: wgpu::Buffer,
    composite_params: wgpu::Buffer,

    // Bind groups reference target views; rebuilt whenever targets change.
    threshold_bind: Option<wgpu::BindGroup>,
    blur_h_bind: Option<wgpu::BindGroup>,
    blur_v_bind: Option<wgpu::BindGroup>,
    composite_bind: Option<wgpu::BindGroup>,
}

impl BloomPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let bloom_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat bloom shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bloom.wgsl").into()),
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat composite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tiamat bloom sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let filter_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat bloom filter bgl"),
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        });

        let composite_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat composite bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3),
            ],
        });

        let threshold_pipeline = fullscreen_pipeline(
            device,
            "tiamat bloom threshold",
            &bloom_shader,
            "fs_threshold",
            &filter_bgl,
            HDR_FORMAT,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "tiamat bloom blur",
            &bloom_shader,
            "fs_blur",
            &filter_bgl,
            HDR_FORMAT,
        );

        let params_buffer = |label: &str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let bloom_params_size = std::mem::size_of::<BloomParams>() as u64;

        Self {
            sampler,
            filter_bgl,
            composite_bgl,
            threshold_pipeline,
            blur_pipeline,
            composite_shader,
            composite_pipeline: None,
            composite_format: None,
            threshold_params: params_buffer("tiamat bloom threshold params", bloom_params_size),
            blur_h_params: params_buffer("tiamat bloom blur h params", bloom_params_size),
            blur_v_params: params_buffer("tiamat bloom blur v params", bloom_params_size),
            composite_params: params_buffer(
                "tiamat composite params",
                std::mem::size_of::<CompositeParams>() as u64,
            ),
            threshold_bind: None,
            blur_h_bind: None,
            blur_v_bind: None,
            composite_bind: None,
        }
    }

    /// Rebuilds the bind groups against freshly created targets.
    pub fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        let filter_bind = |label: &str, view: &wgpu::TextureView, params: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.filter_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params.as_entire_binding(),
                    },
                ],
            })
        };

        self.threshold_bind = Some(filter_bind(
            "tiamat bloom threshold bind",
            &targets.hdr_resolve,
            &self.threshold_params,
        ));
        self.blur_h_bind = Some(filter_bind(
            "tiamat bloom blur h bind",
            &targets.bloom_a,
            &self.blur_h_params,
        ));
        self.blur_v_bind = Some(filter_bind(
            "tiamat bloom blur v bind",
            &targets.bloom_b,
            &self.blur_v_params,
        ));

        self.composite_bind = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat composite bind"),
            layout: &self.composite_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.hdr_resolve),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.bloom_a),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.composite_params.as_entire_binding(),
                },
            ],
        }));
    }

    /// Uploads per-frame parameters.
    pub fn update_params(
        &self,
        queue: &wgpu::Queue,
        settings: BloomSettings,
        targets: &RenderTargets,
    ) {
        let (bw, bh) = targets.bloom_size();
        let texel = (1.0 / bw as f32, 1.0 / bh as f32);

        let write = |buffer: &wgpu::Buffer, step: [f32; 2]| {
            queue.write_buffer(
                buffer,
                0,
                bytemuck::bytes_of(&BloomParams {
                    threshold: settings.threshold,
                    intensity: settings.intensity,
                    texel_step: step,
                }),
            );
        };
        write(&self.threshold_params, [0.0, 0.0]);
        write(&self.blur_h_params, [texel.0, 0.0]);
        write(&self.blur_v_params, [0.0, texel.1]);

        queue.write_buffer(
            &self.composite_params,
            0,
            bytemuck::bytes_of(&CompositeParams {
                bloom_intensity: settings.intensity,
                exposure: settings.exposure,
                _pad: [0.0; 2],
            }),
        );
    }

    /// Encodes the four post passes. Call after the scene pass has resolved.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        backbuffer: &wgpu::TextureView,
        surface_format: wgpu::TextureFormat,
    ) {
        self.ensure_composite_pipeline(device, surface_format);

        let (Some(threshold_bind), Some(blur_h_bind), Some(blur_v_bind), Some(composite_bind)) = (
            self.threshold_bind.as_ref(),
            self.blur_h_bind.as_ref(),
            self.blur_v_bind.as_ref(),
            self.composite_bind.as_ref(),
        ) else {
            log::error!("bloom pass encoded before rebind(); skipping post-processing");
            return;
        };
        let Some(composite_pipeline) = self.composite_pipeline.as_ref() else {
            return;
        };

        // hdr_resolve → bloom_a (threshold + downsample)
        run_fullscreen_pass(
            encoder,
            "tiamat bloom threshold pass",
            &targets.bloom_a,
            &self.threshold_pipeline,
            threshold_bind,
        );
        // bloom_a → bloom_b (horizontal blur)
        run_fullscreen_pass(
            encoder,
            "tiamat bloom blur h pass",
            &targets.bloom_b,
            &self.blur_pipeline,
            blur_h_bind,
        );
        // bloom_b → bloom_a (vertical blur)
        run_fullscreen_pass(
            encoder,
            "tiamat bloom blur v pass",
            &targets.bloom_a,
            &self.blur_pipeline,
            blur_v_bind,
        );
        // hdr_resolve + bloom_a → backbuffer
        run_fullscreen_pass(
            encoder,
            "tiamat composite pass",
            backbuffer,
            composite_pipeline,
            composite_bind,
        );
    }

    fn ensure_composite_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.composite_format == Some(format) && self.composite_pipeline.is_some() {
            return;
        }

        self.composite_pipeline = Some(fullscreen_pipeline(
            device,
            "tiamat composite",
            &self.composite_shader,
            "fs_composite",
            &self.composite_bgl,
            format,
        ));
        self.composite_format = Some(format);
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    fs_entry: &str,
    bgl: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bgl],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

fn run_fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind: &wgpu::BindGroup,
) {
    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                // Every pixel is overwritten by the fullscreen triangle.
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    rpass.set_pipeline(pipeline);
    rpass.set_bind_group(0, bind, &[]);
    rpass.draw(0..3, 0..1);
}
