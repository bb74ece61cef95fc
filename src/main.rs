// Interactive holiday particle scene with INSTANCED rendering:
// ~15k particles morphing between a tree and a nebula, driven by mouse
// clicks or hand gestures (simulated hand via keyboard + mouse).

mod engine;

use clap::Parser;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::blend::{self, Centerpiece, FrameParams, SceneRotation};
use engine::camera::SceneCamera;
use engine::error::TrackerError;
use engine::gesture::{GestureTracker, SharedGesture, SimInput, SimPose, SyntheticHandSource};
use engine::input::InputState;
use engine::mesh::{self, triangulate_smooth, GpuVertex, RenderMesh};
use engine::overlay::{Hud, HudStats};
use engine::star;
use engine::state::{GestureState, SessionState};
use engine::targets::{self, GroupBuffers, GroupKind, GroupStyle};

// ============================================================================
// CLI
// ============================================================================

/// Gesture-driven holiday particle scene.
#[derive(Parser)]
#[command(name = "tinsel_nebula")]
struct Args {
    /// Start in gesture mode. The simulated hand follows the mouse cursor;
    /// keys: Space = fist (pinch), T = thumbs up, 1-4 = extended fingers,
    /// 0 = open palm, H = hand absent.
    #[arg(long)]
    gestures: bool,
}

// ============================================================================
// INSTANCE DATA (per-particle)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    position: [f32; 3],
    scale: f32,
    color: [f32; 4],
}

impl InstanceData {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance, // One per instance, not per vertex
            attributes: &[
                // Position (location 2)
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Uniform scale (location 3)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32,
                },
                // Color (location 4)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// ============================================================================
// UNIFORM DATA (camera + scene orientation)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// One instanced draw: the group's unit mesh plus its per-particle buffer.
struct GroupDraw {
    kind: GroupKind,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    capacity: usize,
}

/// The centerpiece ornament: a single non-instanced star with its own model
/// matrix (spin + scale live in the uniform, not the instance).
struct StarDraw {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

// The particle scene sits below the camera's look-at point, like a tree on
// the floor of the frame.
const SCENE_PIVOT: Vec3 = Vec3::new(0.0, -5.0, 0.0);

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    group_draws: Vec<GroupDraw>,
    star_draw: StarDraw,

    // ECS world holding the particle groups
    world: World,

    // Presentation + choreography state
    session: SessionState,
    rotation: SceneRotation,
    centerpiece: Centerpiece,
    camera: SceneCamera,
    input: InputState,
    hud: Hud,

    // Gesture tracking (None = mouse-only session)
    tracker: Option<GestureTracker>,
    gesture_cell: Option<SharedGesture>,
    sim_tx: Option<std::sync::mpsc::Sender<SimInput>>,
    latest_gesture: GestureState,

    started: std::time::Instant,
    last_update: std::time::Instant,
    frame_time_avg_ms: f32,
    fps: u32,
}

fn upload_mesh(device: &wgpu::Device, label: &str, mesh: &RenderMesh) -> (wgpu::Buffer, wgpu::Buffer, u32) {
    use wgpu::util::DeviceExt;
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Vertex Buffer")),
        contents: mesh.vertex_bytes(),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Index Buffer")),
        contents: mesh.index_bytes(),
        usage: wgpu::BufferUsages::INDEX,
    });
    (vertex_buffer, index_buffer, mesh.index_count() as u32)
}

impl State {
    async fn new(window: std::sync::Arc<winit::window::Window>, args: &Args) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .unwrap();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        use wgpu::util::DeviceExt;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        // Generate the particle groups; a malformed group is a construction
        // bug and refuses to start.
        let mut world = World::new();
        targets::build_groups(&mut world).expect("particle target generation failed");

        // One instanced draw per group, each with its own unit mesh.
        let mut group_draws = Vec::new();
        let mut query = world.query::<(&GroupKind, &GroupBuffers)>();
        for (kind, buffers) in query.iter(&world) {
            let poly = match kind {
                GroupKind::Canopy => mesh::octahedron(),
                GroupKind::Glint => mesh::icosahedron(),
                GroupKind::Orbit => mesh::uv_sphere(5, 5),
                GroupKind::Backdrop => mesh::uv_sphere(4, 4),
            };
            let render_mesh = triangulate_smooth(&poly);
            let (vertex_buffer, index_buffer, num_indices) =
                upload_mesh(&device, &format!("{kind:?}"), &render_mesh);

            let capacity = buffers.len();
            let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{kind:?} Instance Buffer")),
                size: (capacity * std::mem::size_of::<InstanceData>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            group_draws.push(GroupDraw {
                kind: *kind,
                vertex_buffer,
                index_buffer,
                instance_buffer,
                num_indices,
                capacity,
            });
        }

        // Centerpiece star: one instance, its own model uniform.
        let star_mesh = triangulate_smooth(&star::ornament());
        let (vertex_buffer, index_buffer, num_indices) =
            upload_mesh(&device, "Star", &star_mesh);
        let star_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let star_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: star_uniform_buffer.as_entire_binding(),
            }],
            label: Some("star_bind_group"),
        });
        let star_instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Star Instance Buffer"),
            size: std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let star_draw = StarDraw {
            vertex_buffer,
            index_buffer,
            instance_buffer: star_instance_buffer,
            num_indices,
            uniform_buffer: star_uniform_buffer,
            bind_group: star_bind_group,
        };

        let hud = Hud::new(&window, &device, surface_format);

        // Gesture mode is a one-time choice at session start. A backend that
        // fails to open degrades to mouse-only control instead of crashing.
        let mut session = SessionState::new(args.gestures);
        let (tracker, gesture_cell, sim_tx) = if args.gestures {
            match open_gesture_backend() {
                Ok((source, sim_tx)) => {
                    let tracker = GestureTracker::spawn(source);
                    let cell = tracker.shared();
                    (Some(tracker), Some(cell), Some(sim_tx))
                }
                Err(err) => {
                    log::warn!("gesture backend unavailable, falling back to mouse control: {err}");
                    session.gesture_mode = false;
                    (None, None, None)
                }
            }
        } else {
            (None, None, None)
        };

        Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            uniform_buffer,
            uniform_bind_group,
            group_draws,
            star_draw,
            world,
            session,
            rotation: SceneRotation::new(),
            centerpiece: Centerpiece::new(),
            camera: SceneCamera::new(),
            input: InputState::new(),
            hud,
            tracker,
            gesture_cell,
            sim_tx,
            latest_gesture: GestureState::neutral(),
            started: std::time::Instant::now(),
            last_update: std::time::Instant::now(),
            frame_time_avg_ms: 0.0,
            fps: 0,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Forward simulated-hand input to the tracker thread.
    fn pump_sim_input(&mut self) {
        let Some(tx) = &self.sim_tx else { return };

        let pose_keys = [
            (KeyCode::Space, SimPose::Fist),
            (KeyCode::KeyT, SimPose::ThumbsUp),
            (KeyCode::Digit0, SimPose::Open),
            (KeyCode::Digit1, SimPose::Fingers(1)),
            (KeyCode::Digit2, SimPose::Fingers(2)),
            (KeyCode::Digit3, SimPose::Fingers(3)),
            (KeyCode::Digit4, SimPose::Fingers(4)),
            (KeyCode::KeyH, SimPose::Absent),
        ];
        for (key, pose) in pose_keys {
            if self.input.was_key_pressed(key) {
                let _ = tx.send(SimInput::Pose(pose));
            }
        }

        let (x, y) = self.input.normalized_cursor();
        let _ = tx.send(SimInput::Cursor(x, y));
    }

    fn update(&mut self) {
        let now = std::time::Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;
        let time = (now - self.started).as_secs_f32();

        if self.input.was_key_pressed(KeyCode::F3) {
            self.hud.toggle();
        }
        if self.input.was_clicked() {
            self.session.toggle_mode();
        }
        self.pump_sim_input();

        // Latest gesture snapshot; stale reads are fine, the tracker runs at
        // its own cadence.
        self.latest_gesture = self
            .gesture_cell
            .as_ref()
            .map(|cell| cell.snapshot())
            .unwrap_or_else(GestureState::neutral);
        self.session.evaluate_gesture(&self.latest_gesture);

        let params = FrameParams {
            mode: self.session.mode,
            gesture: self.latest_gesture,
            time,
            dt,
        };
        self.rotation.update(&params);
        self.centerpiece
            .update(self.session.mode, self.session.theme, time);
        blend::update_particles(&mut self.world, &params, self.session.theme);

        self.input.end_frame();
    }

    fn render(&mut self, window: &winit::window::Window) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Collect instance data from the ECS world BEFORE creating the
        // render pass.
        let mut query = self.world.query::<(&GroupKind, &GroupBuffers, &GroupStyle)>();
        for (kind, buffers, style) in query.iter(&self.world) {
            let draw = self
                .group_draws
                .iter()
                .find(|d| d.kind == *kind)
                .expect("draw data missing for particle group");
            assert_eq!(buffers.len(), draw.capacity, "particle group resized");

            let color = [style.color.x, style.color.y, style.color.z, style.alpha];
            let instance_data: Vec<InstanceData> = buffers
                .current
                .iter()
                .zip(buffers.scale.iter())
                .map(|(pos, scale)| InstanceData {
                    position: pos.to_array(),
                    scale: *scale,
                    color,
                })
                .collect();

            self.queue
                .write_buffer(&draw.instance_buffer, 0, bytemuck::cast_slice(&instance_data));
        }

        // Camera + scene orientation uniforms
        let aspect = self.size.width as f32 / self.size.height as f32;
        let view_proj = self.camera.view_projection(aspect).to_cols_array_2d();
        let scene_model = self.rotation.model_matrix(SCENE_PIVOT);
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Uniforms {
                view_proj,
                model: scene_model.to_cols_array_2d(),
            }]),
        );

        // The star spins on its own axis and rides the scene rotation.
        let star = &self.centerpiece;
        let star_model = scene_model
            * Mat4::from_translation(Vec3::new(0.0, star.height, 0.0))
            * Mat4::from_rotation_y(star.spin)
            * Mat4::from_scale(Vec3::splat(star.scale.max(1e-5)));
        self.queue.write_buffer(
            &self.star_draw.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Uniforms {
                view_proj,
                model: star_model.to_cols_array_2d(),
            }]),
        );
        let star_color = star.color * 0.4 + star.emissive * 0.6;
        self.queue.write_buffer(
            &self.star_draw.instance_buffer,
            0,
            bytemuck::cast_slice(&[InstanceData {
                position: [0.0; 3],
                scale: 1.0,
                color: [star_color.x, star_color.y, star_color.z, 1.0],
            }]),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.002,
                            b: 0.012,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);

            // One draw call per particle group
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            for draw in &self.group_draws {
                render_pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, draw.instance_buffer.slice(..));
                render_pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.num_indices, 0, 0..draw.capacity as u32);
            }

            // Centerpiece ornament
            render_pass.set_bind_group(0, &self.star_draw.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.star_draw.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.star_draw.instance_buffer.slice(..));
            render_pass
                .set_index_buffer(self.star_draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.star_draw.num_indices, 0, 0..1);
        }

        if self.hud.visible {
            let particle_count = self.group_draws.iter().map(|d| d.capacity).sum();
            let stats = HudStats {
                fps: self.fps,
                frame_time_avg_ms: self.frame_time_avg_ms,
                particle_count,
                mode: self.session.mode,
                theme: self.session.theme,
                gesture_mode: self.session.gesture_mode,
                gesture: self.latest_gesture,
            };
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: window.scale_factor() as f32,
            };
            self.hud.render(
                &self.device,
                &self.queue,
                &mut encoder,
                window,
                &view,
                &screen_descriptor,
                &stats,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Synchronously stop the gesture tracker (joins the capture thread and
    /// releases the backend). GPU buffers are released when State drops.
    fn shutdown(&mut self) {
        self.sim_tx = None;
        if let Some(mut tracker) = self.tracker.take() {
            tracker.stop();
        }
    }
}

/// Open the landmark backend for this session. The default build ships the
/// keyboard/mouse simulator; a real camera backend would be constructed here
/// and can fail (no device, permission denied), which degrades the session
/// to mouse-only control.
fn open_gesture_backend()
-> Result<(SyntheticHandSource, std::sync::mpsc::Sender<SimInput>), TrackerError> {
    let (tx, rx) = std::sync::mpsc::channel();
    Ok((SyntheticHandSource::new(rx), tx))
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::init();
    let args = Args::parse();

    let event_loop = EventLoop::new().unwrap();

    let window_attributes = Window::default_attributes()
        .with_title("Tinsel Nebula — click to morph, F3 for stats")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = std::sync::Arc::new(event_loop.create_window(window_attributes).unwrap());

    let mut state = pollster::block_on(State::new(window.clone(), &args));
    log::info!(
        "scene ready: {} particles in {} groups, gesture mode {}",
        state.group_draws.iter().map(|d| d.capacity).sum::<usize>(),
        state.group_draws.len(),
        if state.session.gesture_mode { "on" } else { "off" },
    );

    let mut frame_count = 0u32;
    let mut frame_time_accum = 0.0f32;
    let mut last_fps_update = std::time::Instant::now();

    event_loop
        .run(move |event, control_flow| {
            match event {
                WinitEvent::WindowEvent {
                    ref event,
                    window_id,
                } if window_id == window.id() => {
                    state.input.process_event(event);
                    let response = state.hud.handle_window_event(&window, event);
                    if response.consumed {
                        return;
                    }

                    match event {
                        WindowEvent::CloseRequested
                        | WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    state: ElementState::Pressed,
                                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                                    ..
                                },
                            ..
                        } => {
                            state.shutdown();
                            control_flow.exit();
                        }
                        WindowEvent::Resized(physical_size) => {
                            state.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            let frame_start = std::time::Instant::now();
                            state.update();
                            match state.render(&window) {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    state.shutdown();
                                    control_flow.exit();
                                }
                                Err(e) => log::error!("render error: {e:?}"),
                            }

                            frame_count += 1;
                            frame_time_accum += frame_start.elapsed().as_secs_f32() * 1000.0;
                            let now = std::time::Instant::now();
                            if (now - last_fps_update).as_secs_f32() >= 1.0 {
                                state.fps = frame_count;
                                state.frame_time_avg_ms =
                                    frame_time_accum / frame_count.max(1) as f32;
                                log::debug!(
                                    "fps {} | frame {:.2} ms | mode {:?}",
                                    state.fps,
                                    state.frame_time_avg_ms,
                                    state.session.mode,
                                );
                                frame_count = 0;
                                frame_time_accum = 0.0;
                                last_fps_update = now;
                            }
                        }
                        _ => {}
                    }
                }
                WinitEvent::AboutToWait => {
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .unwrap();
}
