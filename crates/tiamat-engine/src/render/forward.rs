//! The forward rendering path.
//!
//! Per frame:
//! 1. collect visible `(mesh, material, world)` draw items from the scene
//! 2. sort by packed draw key (queue bucket, depth direction per bucket,
//!    material batching; stable ties)
//! 3. shade everything against the full light array in one pass over the
//!    MSAA HDR targets (opaque first, blended after, by construction of the
//!    sort) and resolve
//! 4. draw particles and the debug line overlay into the same pass
//! 5. bloom + tonemap composite into the backbuffer
//!
//! The renderer also owns the GPU-side mesh and material arenas; scenes refer
//! to both through copyable handles.

use std::collections::HashMap;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use slotmap::{Key, SlotMap};
use wgpu::util::DeviceExt;

use crate::color::Color;
use crate::debug::{DebugDraw, LineVertex};
use crate::material::{Material, MaterialId, ShaderKind, ShaderPass};
use crate::mesh::{MeshData, MeshId, Vertex};
use crate::particles::{ParticleInstance, ParticleSystem};
use crate::scene::{pack_lights, Camera, Light, NodeId, Scene, MAX_LIGHTS};

use super::bloom::{BloomPass, BloomSettings};
use super::ctx::{RenderCtx, RenderTarget};
use super::key::draw_key;
use super::targets::{RenderTargets, DEPTH_FORMAT, HDR_FORMAT};
use super::uniforms::{FrameUniforms, ObjectUniforms, OBJECT_UNIFORM_STRIDE};

/// Renderer configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// HDR clear color for the scene target.
    pub clear_color: Color,
    /// Ambient light term (linear, pre-scaled).
    pub ambient: Color,
    /// MSAA sample count for the scene pass; 1 disables multisampling.
    pub msaa_samples: u32,
    /// Luminance above which pixels feed the bloom chain.
    pub bloom_threshold: f32,
    /// Bloom contribution in the composite.
    pub bloom_intensity: f32,
    /// Exposure multiplier applied before tonemapping.
    pub exposure: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::new(0.013, 0.015, 0.022, 1.0),
            ambient: Color::rgb(0.035, 0.04, 0.055),
            msaa_samples: 4,
            bloom_threshold: 1.0,
            bloom_intensity: 0.6,
            exposure: 1.0,
        }
    }
}

/// Everything the renderer needs for one frame besides the scene itself.
pub struct FramePacket<'a> {
    /// Node whose `Camera` component drives the view. Its aspect ratio is
    /// updated to the drawable size every frame.
    pub camera: NodeId,
    /// Seconds since startup; forwarded to shaders.
    pub time: f32,
    /// Particle systems simulated by the app and drawn this frame.
    pub particles: Vec<&'a mut ParticleSystem>,
}

impl<'a> FramePacket<'a> {
    pub fn new(camera: NodeId) -> Self {
        Self {
            camera,
            time: 0.0,
            particles: Vec::new(),
        }
    }
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

struct MaterialEntry {
    material: Material,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Copy, Clone)]
struct DrawItem {
    key: u64,
    mesh: MeshId,
    material: MaterialId,
    model: glam::Mat4,
}

/// Quad corner for particle billboards.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ParticleCorner {
    corner: [f32; 2],
}

impl ParticleCorner {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleCorner>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const PARTICLE_CORNERS: [ParticleCorner; 4] = [
    ParticleCorner { corner: [-0.5, -0.5] },
    ParticleCorner { corner: [0.5, -0.5] },
    ParticleCorner { corner: [0.5, 0.5] },
    ParticleCorner { corner: [-0.5, 0.5] },
];

const PARTICLE_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// The forward renderer.
///
/// Owns GPU resources for meshes, materials, the per-frame/per-object uniform
/// buffers, all scene-pass pipelines and the bloom chain.
pub struct ForwardRenderer {
    config: RendererConfig,

    meshes: SlotMap<MeshId, GpuMesh>,
    materials: SlotMap<MaterialId, MaterialEntry>,

    targets: Option<RenderTargets>,
    bloom: BloomPass,

    frame_bgl: wgpu::BindGroupLayout,
    object_bgl: wgpu::BindGroupLayout,
    material_bgl: wgpu::BindGroupLayout,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_capacity: usize,
    object_scratch: Vec<u8>,

    mesh_shader: wgpu::ShaderModule,
    mesh_pipelines: HashMap<ShaderPass, wgpu::RenderPipeline>,

    line_pipeline: wgpu::RenderPipeline,
    line_vbo: wgpu::Buffer,
    line_capacity: usize,

    particle_pipeline: wgpu::RenderPipeline,
    particle_quad_vbo: wgpu::Buffer,
    particle_quad_ibo: wgpu::Buffer,
    particle_instance_vbo: wgpu::Buffer,
    particle_capacity: usize,
    particle_scratch: Vec<ParticleInstance>,

    draws: Vec<DrawItem>,
    lights_scratch: Vec<(Light, glam::Mat4)>,

    warned_light_overflow: bool,
    warned_stale_handle: bool,
}

impl ForwardRenderer {
    pub fn new(device: &wgpu::Device, config: RendererConfig) -> Self {
        debug_assert!(matches!(config.msaa_samples, 1 | 2 | 4 | 8));

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat forward shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/forward.wgsl").into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat line shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/line.wgsl").into()),
        });
        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat particle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/particle.wgsl").into()),
        });

        // Bind group layouts: 0 = frame, 1 = object (dynamic), 2 = material.
        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat frame bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let object_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat object bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ObjectUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let material_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat material bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat frame ubo"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat frame bind group"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let object_capacity = 128;
        let (object_buffer, object_bind_group) =
            create_object_buffer(device, &object_bgl, object_capacity);

        let line_capacity = 4096;
        let line_vbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat line vbo"),
            size: (line_capacity * std::mem::size_of::<LineVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let particle_capacity = 1024;
        let particle_instance_vbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat particle instance vbo"),
            size: (particle_capacity * std::mem::size_of::<ParticleInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let particle_quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat particle quad vbo"),
            contents: bytemuck::cast_slice(&PARTICLE_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let particle_quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat particle quad ibo"),
            contents: bytemuck::cast_slice(&PARTICLE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let line_pipeline = {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tiamat line pipeline layout"),
                bind_group_layouts: &[&frame_bgl],
                immediate_size: 0,
            });
            scene_pipeline(
                device,
                "tiamat line pipeline",
                &layout,
                &line_shader,
                "vs_main",
                "fs_main",
                &[LineVertex::layout()],
                wgpu::PrimitiveTopology::LineList,
                Some(wgpu::BlendState::ALPHA_BLENDING),
                // Overlay: tested against scene depth, never written.
                false,
                config.msaa_samples,
            )
        };

        let particle_pipeline = {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tiamat particle pipeline layout"),
                bind_group_layouts: &[&frame_bgl],
                immediate_size: 0,
            });
            scene_pipeline(
                device,
                "tiamat particle pipeline",
                &layout,
                &particle_shader,
                "vs_main",
                "fs_main",
                &[ParticleCorner::layout(), ParticleInstance::layout()],
                wgpu::PrimitiveTopology::TriangleList,
                ShaderPass::additive().blend_state(),
                false,
                config.msaa_samples,
            )
        };

        Self {
            bloom: BloomPass::new(device),
            config,
            meshes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            targets: None,
            frame_bgl,
            object_bgl,
            material_bgl,
            frame_buffer,
            frame_bind_group,
            object_buffer,
            object_bind_group,
            object_capacity,
            object_scratch: Vec::new(),
            mesh_shader,
            mesh_pipelines: HashMap::new(),
            line_pipeline,
            line_vbo,
            line_capacity,
            particle_pipeline,
            particle_quad_vbo,
            particle_quad_ibo,
            particle_instance_vbo,
            particle_capacity,
            particle_scratch: Vec::new(),
            draws: Vec::new(),
            lights_scratch: Vec::new(),
            warned_light_overflow: false,
            warned_stale_handle: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    // ── assets ────────────────────────────────────────────────────────────

    /// Uploads a mesh and returns its handle.
    pub fn add_mesh(&mut self, device: &wgpu::Device, data: &MeshData) -> MeshId {
        debug_assert!(!data.vertices.is_empty(), "uploading an empty mesh");

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat mesh vbo"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat mesh ibo"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.meshes.insert(GpuMesh {
            vertices,
            indices,
            index_count: data.indices.len() as u32,
        })
    }

    /// Frees a mesh. Scene nodes still referencing it are skipped at draw
    /// time (with a one-time warning).
    pub fn remove_mesh(&mut self, id: MeshId) {
        self.meshes.remove(id);
    }

    /// Registers a material and its uniform buffer, returns its handle.
    pub fn add_material(&mut self, device: &wgpu::Device, material: Material) -> MaterialId {
        // The built-in shaders declare a 64-byte material block; keep the
        // buffer at least that large so smaller custom layouts still bind.
        let size = (material.properties().layout().size() as u64).max(64);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat material ubo"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat material bind group"),
            layout: &self.material_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        self.ensure_mesh_pipeline(device, material.pass);

        self.materials.insert(MaterialEntry {
            material,
            buffer,
            bind_group,
        })
    }

    /// Frees a material; see [`ForwardRenderer::remove_mesh`].
    pub fn remove_material(&mut self, id: MaterialId) {
        self.materials.remove(id);
    }

    /// Mutable access to a registered material (properties, queue, pass).
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id).map(|e| &mut e.material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id).map(|e| &e.material)
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Renders one frame into `target`.
    ///
    /// `scene` is mutated only through its transform cache (and the camera
    /// aspect); `debug` is drained.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        scene: &mut Scene,
        debug: &mut DebugDraw,
        packet: &mut FramePacket<'_>,
    ) -> Result<()> {
        if ctx.width == 0 || ctx.height == 0 {
            return Ok(());
        }

        // Camera: update aspect, then resolve matrices from the flushed tree.
        let camera = {
            let node = scene
                .node_mut(packet.camera)
                .context("frame packet camera refers to a dead node")?;
            let camera = node
                .camera
                .as_mut()
                .context("frame packet camera node has no Camera component")?;
            camera.aspect = ctx.aspect_ratio();
            *camera
        };

        scene.flush_transforms();

        let cam_world = scene
            .node(packet.camera)
            .context("frame packet camera refers to a dead node")?
            .world();
        let view = Camera::view_matrix(cam_world);
        let proj = camera.projection_matrix();

        self.ensure_targets(ctx);
        self.collect(scene, view);
        self.draws.sort_by_key(|d| d.key);

        self.upload_frame_uniforms(ctx, view, proj, cam_world, packet.time);
        self.upload_object_uniforms(ctx);
        self.upload_materials(ctx);
        let line_count = self.upload_lines(ctx, debug);
        let particle_count = self.upload_particles(ctx, packet);

        self.encode_scene_pass(ctx, target, line_count, particle_count);

        let targets = self
            .targets
            .as_ref()
            .context("render targets missing after ensure_targets")?;
        self.bloom.update_params(
            ctx.queue,
            BloomSettings {
                threshold: self.config.bloom_threshold,
                intensity: self.config.bloom_intensity,
                exposure: self.config.exposure,
            },
            targets,
        );
        self.bloom.encode(
            ctx.device,
            target.encoder,
            targets,
            target.color_view,
            ctx.surface_format,
        );

        Ok(())
    }

    fn ensure_targets(&mut self, ctx: &RenderCtx<'_>) {
        let recreate = match &self.targets {
            Some(t) => t.size() != (ctx.width, ctx.height),
            None => true,
        };
        if !recreate {
            return;
        }

        let targets =
            RenderTargets::create(ctx.device, ctx.width, ctx.height, self.config.msaa_samples);
        self.bloom.rebind(ctx.device, &targets);
        self.targets = Some(targets);

        log::debug!(
            "render targets (re)created: {}x{} @ {}x MSAA",
            ctx.width,
            ctx.height,
            self.config.msaa_samples
        );
    }

    /// Walks the visible scene, producing sorted draw items and the light list.
    fn collect(&mut self, scene: &Scene, view: glam::Mat4) {
        self.draws.clear();
        self.lights_scratch.clear();

        let draws = &mut self.draws;
        let lights = &mut self.lights_scratch;
        let meshes = &self.meshes;
        let materials = &self.materials;
        let mut stale = false;

        scene.visit_visible(|_, node| {
            if let Some(instance) = node.mesh {
                match (meshes.get(instance.mesh), materials.get(instance.material)) {
                    (Some(_), Some(entry)) => {
                        let world = node.world();
                        // View-space depth: distance in front of the camera.
                        let view_depth = -(view * world.w_axis).z;
                        let slot = (instance.material.data().as_ffi() & 0xFFFF) as u16;

                        draws.push(DrawItem {
                            key: draw_key(entry.material.queue, view_depth, slot),
                            mesh: instance.mesh,
                            material: instance.material,
                            model: world,
                        });
                    }
                    _ => stale = true,
                }
            }

            if let Some(light) = node.light {
                lights.push((light, node.world()));
            }
        });

        if stale && !self.warned_stale_handle {
            log::warn!("scene references removed meshes/materials; draws skipped");
            self.warned_stale_handle = true;
        }
    }

    fn upload_frame_uniforms(
        &mut self,
        ctx: &RenderCtx<'_>,
        view: glam::Mat4,
        proj: glam::Mat4,
        cam_world: glam::Mat4,
        time: f32,
    ) {
        if self.lights_scratch.len() > MAX_LIGHTS && !self.warned_light_overflow {
            log::warn!(
                "{} lights in scene, forward path shades the first {}",
                self.lights_scratch.len(),
                MAX_LIGHTS
            );
            self.warned_light_overflow = true;
        }
        let (lights, light_count) = pack_lights(&self.lights_scratch);

        let cam_pos = cam_world.w_axis.truncate();
        let right = cam_world.x_axis.truncate().normalize_or(Vec3::X);
        let up = cam_world.y_axis.truncate().normalize_or(Vec3::Y);
        let ambient = self.config.ambient;

        let uniforms = FrameUniforms {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            camera_pos: [cam_pos.x, cam_pos.y, cam_pos.z, 0.0],
            camera_right: [right.x, right.y, right.z, 0.0],
            camera_up: [up.x, up.y, up.z, 0.0],
            ambient: [ambient.r, ambient.g, ambient.b, 0.0],
            time: [time, 0.0, 0.0, 0.0],
            counts: [light_count, 0, 0, 0],
            lights,
        };

        ctx.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn upload_object_uniforms(&mut self, ctx: &RenderCtx<'_>) {
        if self.draws.is_empty() {
            return;
        }

        if self.draws.len() > self.object_capacity {
            self.object_capacity = self.draws.len().next_power_of_two();
            let (buffer, bind_group) =
                create_object_buffer(ctx.device, &self.object_bgl, self.object_capacity);
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
        }

        let stride = OBJECT_UNIFORM_STRIDE as usize;
        self.object_scratch.clear();
        self.object_scratch.resize(self.draws.len() * stride, 0);

        for (i, draw) in self.draws.iter().enumerate() {
            let uniforms = ObjectUniforms::new(draw.model);
            let offset = i * stride;
            self.object_scratch[offset..offset + std::mem::size_of::<ObjectUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }

        ctx.queue
            .write_buffer(&self.object_buffer, 0, &self.object_scratch);
    }

    fn upload_materials(&mut self, ctx: &RenderCtx<'_>) {
        for entry in self.materials.values_mut() {
            if !entry.material.properties().is_dirty() {
                continue;
            }
            let bytes = entry.material.properties().bytes();
            if !bytes.is_empty() {
                ctx.queue.write_buffer(&entry.buffer, 0, bytes);
            }
            entry.material.properties_mut().clear_dirty();
        }
    }

    fn upload_lines(&mut self, ctx: &RenderCtx<'_>, debug: &mut DebugDraw) -> u32 {
        let vertices = debug.drain_lines();
        if vertices.is_empty() {
            return 0;
        }

        if vertices.len() > self.line_capacity {
            self.line_capacity = vertices.len().next_power_of_two();
            self.line_vbo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tiamat line vbo"),
                size: (self.line_capacity * std::mem::size_of::<LineVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }

        ctx.queue
            .write_buffer(&self.line_vbo, 0, bytemuck::cast_slice(vertices));
        vertices.len() as u32
    }

    fn upload_particles(&mut self, ctx: &RenderCtx<'_>, packet: &mut FramePacket<'_>) -> u32 {
        self.particle_scratch.clear();
        for system in packet.particles.iter_mut() {
            self.particle_scratch.extend_from_slice(system.instances());
        }
        if self.particle_scratch.is_empty() {
            return 0;
        }

        if self.particle_scratch.len() > self.particle_capacity {
            self.particle_capacity = self.particle_scratch.len().next_power_of_two();
            self.particle_instance_vbo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tiamat particle instance vbo"),
                size: (self.particle_capacity * std::mem::size_of::<ParticleInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }

        ctx.queue.write_buffer(
            &self.particle_instance_vbo,
            0,
            bytemuck::cast_slice(&self.particle_scratch),
        );
        self.particle_scratch.len() as u32
    }

    fn encode_scene_pass(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        line_count: u32,
        particle_count: u32,
    ) {
        // Materials can change pass state after registration; make sure every
        // referenced pipeline exists before the render pass borrows `self`.
        let passes: Vec<ShaderPass> =
            self.materials.values().map(|e| e.material.pass).collect();
        for pass in passes {
            self.ensure_mesh_pipeline(ctx.device, pass);
        }

        let Some(targets) = self.targets.as_ref() else {
            return;
        };

        let clear = self.config.clear_color;
        let clear = wgpu::Color {
            r: clear.r as f64,
            g: clear.g as f64,
            b: clear.b as f64,
            a: clear.a as f64,
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tiamat scene pass"),
            color_attachments: &[Some(targets.scene_color_attachment(clear))],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_bind_group(0, &self.frame_bind_group, &[]);

        // Meshes, in sorted order. Pipeline switches only on pass-state change.
        let mut bound_pass: Option<ShaderPass> = None;
        for (i, draw) in self.draws.iter().enumerate() {
            let Some(entry) = self.materials.get(draw.material) else {
                continue;
            };
            let Some(mesh) = self.meshes.get(draw.mesh) else {
                continue;
            };

            if bound_pass != Some(entry.material.pass) {
                let Some(pipeline) = self.mesh_pipelines.get(&entry.material.pass) else {
                    continue;
                };
                rpass.set_pipeline(pipeline);
                bound_pass = Some(entry.material.pass);
            }

            let dynamic_offset = (i as u64 * OBJECT_UNIFORM_STRIDE) as u32;
            rpass.set_bind_group(1, &self.object_bind_group, &[dynamic_offset]);
            rpass.set_bind_group(2, &entry.bind_group, &[]);
            rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
            rpass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        // Particles: additive billboards over the blended geometry.
        if particle_count > 0 {
            rpass.set_pipeline(&self.particle_pipeline);
            rpass.set_vertex_buffer(0, self.particle_quad_vbo.slice(..));
            rpass.set_vertex_buffer(1, self.particle_instance_vbo.slice(..));
            rpass.set_index_buffer(self.particle_quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..6, 0, 0..particle_count);
        }

        // Debug overlay, last.
        if line_count > 0 {
            rpass.set_pipeline(&self.line_pipeline);
            rpass.set_vertex_buffer(0, self.line_vbo.slice(..));
            rpass.draw(0..line_count, 0..1);
        }
    }

    fn ensure_mesh_pipeline(&mut self, device: &wgpu::Device, pass: ShaderPass) {
        if self.mesh_pipelines.contains_key(&pass) {
            return;
        }

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiamat mesh pipeline layout"),
            bind_group_layouts: &[&self.frame_bgl, &self.object_bgl, &self.material_bgl],
            immediate_size: 0,
        });

        let fs_entry = match pass.shader {
            ShaderKind::Lit => "fs_lit",
            ShaderKind::Unlit => "fs_unlit",
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tiamat mesh pipeline"),
            layout: Some(&layout),

            vertex: wgpu::VertexState {
                module: &self.mesh_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &self.mesh_shader,
                entry_point: Some(fs_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: pass.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: pass.cull_mode(),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: pass.depth_write,
                depth_compare: if pass.depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),

            multisample: wgpu::MultisampleState {
                count: self.config.msaa_samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },

            multiview_mask: None,
            cache: None,
        });

        self.mesh_pipelines.insert(pass, pipeline);
    }
}

fn create_object_buffer(
    device: &wgpu::Device,
    bgl: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tiamat object ubo"),
        size: capacity as u64 * OBJECT_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("tiamat object bind group"),
        layout: bgl,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniforms>() as u64),
            }),
        }],
    });

    (buffer, bind_group)
}

/// Shared shape for the scene-pass pipelines that are not per-material
/// (lines, particles).
#[allow(clippy::too_many_arguments)]
fn scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    vs_entry: &str,
    fs_entry: &str,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    topology: wgpu::PrimitiveTopology,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs_entry),
            compilation_options: Default::default(),
            buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),

        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },

        multiview_mask: None,
        cache: None,
    })
}
