//! Tiamat tech demo.
//!
//! A small scene exercising the whole engine end to end: a lit spinning
//! hierarchy over a ground plane, an emissive beacon driving bloom, a particle
//! fountain, the debug overlay, and an orbit camera.
//!
//! Controls:
//! - left mouse drag: orbit, wheel: zoom
//! - space: pause animation, F1: toggle debug overlay, escape: quit

use anyhow::Result;
use glam::{Quat, Vec3};

use tiamat_engine::color::Color;
use tiamat_engine::core::{App, AppControl, FrameCtx};
use tiamat_engine::debug::DebugDraw;
use tiamat_engine::device::GpuInit;
use tiamat_engine::input::{InputState, Key, MouseButton};
use tiamat_engine::logging::{init_logging, LoggingConfig};
use tiamat_engine::material::{Material, MaterialId};
use tiamat_engine::mesh::MeshData;
use tiamat_engine::particles::{ParticleEmitter, ParticleSystem};
use tiamat_engine::render::{ForwardRenderer, FramePacket, RendererConfig};
use tiamat_engine::scene::{Camera, Light, MeshInstance, NodeId, Scene};
use tiamat_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    log::info!("tiamat demo starting");

    Runtime::run(
        RuntimeConfig {
            title: "Tiamat — forward renderer demo".to_string(),
            ..Default::default()
        },
        GpuInit::default(),
        DemoApp::new(),
    )
}

/// Spherical-coordinate orbit around a fixed target.
struct OrbitCamera {
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl OrbitCamera {
    fn new() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            yaw: 0.6,
            pitch: 0.45,
            distance: 12.0,
        }
    }

    fn apply_input(&mut self, input: &InputState) {
        if input.button_down(MouseButton::Left) {
            let (dx, dy) = input.pointer_delta;
            self.yaw -= dx * 0.008;
            self.pitch = (self.pitch + dy * 0.008).clamp(-1.5, 1.5);
        }
        self.distance = (self.distance * (1.0 - input.wheel_delta * 0.1)).clamp(2.0, 60.0);
    }

    fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + Vec3::new(
                cos_pitch * sin_yaw,
                sin_pitch,
                cos_pitch * cos_yaw,
            ) * self.distance
    }
}

/// Everything that needs a live GPU device; built on the first frame.
struct DemoState {
    renderer: ForwardRenderer,
    scene: Scene,
    debug: DebugDraw,
    fountain: ParticleSystem,

    camera: NodeId,
    rotor: NodeId,
    moon: NodeId,
    beacon_material: MaterialId,
}

struct DemoApp {
    state: Option<DemoState>,
    orbit: OrbitCamera,
    animate: bool,
    show_overlay: bool,
    sim_time: f32,
}

impl DemoApp {
    fn new() -> Self {
        Self {
            state: None,
            orbit: OrbitCamera::new(),
            animate: true,
            show_overlay: true,
            sim_time: 0.0,
        }
    }

    fn build_state(device: &wgpu::Device) -> DemoState {
        let mut renderer = ForwardRenderer::new(device, RendererConfig::default());
        let mut scene = Scene::new();

        // Meshes.
        let cube = renderer.add_mesh(device, &MeshData::cube(1.5));
        let small_cube = renderer.add_mesh(device, &MeshData::cube(0.6));
        let sphere = renderer.add_mesh(device, &MeshData::uv_sphere(0.8, 24, 32));
        let ground = renderer.add_mesh(device, &MeshData::plane(24.0, 24.0));

        // Materials.
        let slate = renderer.add_material(
            device,
            Material::lit("slate", Color::from_srgb_u8(96, 102, 112, 255)),
        );
        let copper = renderer.add_material(
            device,
            Material::lit("copper", Color::from_srgb_u8(188, 110, 72, 255)),
        );
        let jade = renderer.add_material(
            device,
            Material::lit("jade", Color::from_srgb_u8(64, 160, 118, 255)),
        );
        let glass = renderer.add_material(
            device,
            Material::transparent("glass", Color::new(0.55, 0.7, 0.9, 0.35)),
        );

        // Emissive beacon: values above 1.0 feed the bloom threshold.
        let mut beacon = Material::unlit("beacon", Color::BLACK);
        beacon
            .properties_mut()
            .set_vec4("emissive", [3.0, 1.6, 0.5, 0.0])
            .expect("standard material has an emissive slot");
        let beacon_material = renderer.add_material(device, beacon);

        // Ground.
        let floor = scene.spawn("floor");
        scene.node_mut(floor).unwrap().mesh = Some(MeshInstance {
            mesh: ground,
            material: slate,
        });

        // Spinning hierarchy: rotor → arm cube → moon cube.
        let rotor = scene.spawn("rotor");
        scene.set_position(rotor, Vec3::new(0.0, 1.2, 0.0)).unwrap();

        let arm = scene.spawn_child(rotor, "arm").unwrap();
        scene.set_position(arm, Vec3::new(3.0, 0.0, 0.0)).unwrap();
        scene.node_mut(arm).unwrap().mesh = Some(MeshInstance {
            mesh: cube,
            material: copper,
        });

        let moon = scene.spawn_child(arm, "moon").unwrap();
        scene.set_position(moon, Vec3::new(1.6, 0.9, 0.0)).unwrap();
        scene.node_mut(moon).unwrap().mesh = Some(MeshInstance {
            mesh: small_cube,
            material: jade,
        });

        // Static props.
        let orb = scene.spawn("orb");
        scene.set_position(orb, Vec3::new(-3.0, 0.8, -2.0)).unwrap();
        scene.node_mut(orb).unwrap().mesh = Some(MeshInstance {
            mesh: sphere,
            material: glass,
        });

        let beacon_node = scene.spawn("beacon");
        scene.set_position(beacon_node, Vec3::new(0.0, 3.6, 0.0)).unwrap();
        scene
            .set_scale(beacon_node, Vec3::splat(0.45))
            .unwrap();
        scene.node_mut(beacon_node).unwrap().mesh = Some(MeshInstance {
            mesh: sphere,
            material: beacon_material,
        });
        // The beacon also casts warm light into the scene.
        scene.node_mut(beacon_node).unwrap().light =
            Some(Light::point(Color::rgb(1.0, 0.6, 0.25), 6.0, 12.0));

        // Key light.
        let sun = scene.spawn("sun");
        scene
            .update_transform(sun, |t| {
                t.position = Vec3::new(6.0, 10.0, 4.0);
                t.look_at(Vec3::ZERO, Vec3::Y);
            })
            .unwrap();
        scene.node_mut(sun).unwrap().light =
            Some(Light::directional(Color::rgb(1.0, 0.97, 0.9), 1.4));

        // Cool rim spot from behind.
        let spot = scene.spawn("rim-spot");
        scene
            .update_transform(spot, |t| {
                t.position = Vec3::new(-6.0, 6.0, 6.0);
                t.look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
            })
            .unwrap();
        scene.node_mut(spot).unwrap().light = Some(Light::spot(
            Color::rgb(0.4, 0.55, 1.0),
            8.0,
            30.0,
            0.25,
            0.45,
        ));

        // Camera.
        let camera = scene.spawn("camera");
        scene.node_mut(camera).unwrap().camera = Some(Camera::default());

        // Particle fountain next to the hierarchy.
        let mut fountain = ParticleSystem::new(ParticleEmitter::default(), 0xC0FFEE);
        fountain.origin = Vec3::new(3.5, 0.1, -3.0);

        DemoState {
            renderer,
            scene,
            debug: DebugDraw::new(),
            fountain,
            camera,
            rotor,
            moon,
            beacon_material,
        }
    }
}

impl App for DemoApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.input.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }
        if ctx.input.key_pressed(Key::Space) {
            self.animate = !self.animate;
        }
        if ctx.input.key_pressed(Key::F1) {
            self.show_overlay = !self.show_overlay;
        }

        if self.state.is_none() {
            self.state = Some(Self::build_state(ctx.gpu.device()));
            log::info!("demo scene built");
        }
        let state = self.state.as_mut().expect("state built above");

        let dt = ctx.time.dt;
        if self.animate {
            self.sim_time += dt;
        }
        let t = self.sim_time;

        // Animate the hierarchy: the rotor spins, the moon counter-spins.
        if self.animate {
            let _ = state
                .scene
                .set_rotation(state.rotor, Quat::from_rotation_y(t * 0.8));
            let _ = state
                .scene
                .set_rotation(state.moon, Quat::from_rotation_y(-t * 2.4));

            state.fountain.update(dt);

            // Pulse the beacon between dim and bloom-hot.
            if let Some(mat) = state.renderer.material_mut(state.beacon_material) {
                let pulse = 1.6 + 1.6 * (t * 2.0).sin();
                let _ = mat
                    .properties_mut()
                    .set_vec4("emissive", [pulse * 1.9, pulse, pulse * 0.3, 0.0]);
            }
        }

        // Camera follows the orbit controller.
        self.orbit.apply_input(ctx.input);
        let orbit_pos = self.orbit.position();
        let orbit_target = self.orbit.target;
        let _ = state.scene.update_transform(state.camera, |tr| {
            tr.position = orbit_pos;
            tr.look_at(orbit_target, Vec3::Y);
        });

        if self.show_overlay {
            state
                .debug
                .grid(0.01, 12.0, 1.0, Color::new(0.25, 0.28, 0.33, 0.8));
            state.debug.axes(glam::Mat4::IDENTITY, 1.5);
            state.debug.wire_sphere(
                Vec3::new(0.0, 3.6, 0.0),
                0.7,
                Color::new(1.0, 0.7, 0.2, 0.6),
            );
        }

        let clear = state.renderer.config().clear_color;
        let DemoState {
            renderer,
            scene,
            debug,
            fountain,
            camera,
            ..
        } = state;

        ctx.render(clear, |rctx, target| {
            let mut packet = FramePacket::new(*camera);
            packet.time = t;
            packet.particles.push(fountain);

            if let Err(e) = renderer.render(rctx, target, scene, debug, &mut packet) {
                log::error!("frame dropped: {e:#}");
            }
        })
    }
}
