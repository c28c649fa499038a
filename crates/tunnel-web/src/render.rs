mod helpers;

use helpers::PipelineDesc;
use tunnel_core::{ArcVertex, EffectPool, NodeInstance, Orchestrator, Regenerated};
use web_sys as web;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct Globals {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    // x: time (s), y: field intensity
    params: [f32; 4],
}

/// Per-frame vertex buffer for one effect pool; grows if the pool does.
struct ArcBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

impl ArcBuffer {
    fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            buffer: helpers::dynamic_vertex_buffer::<ArcVertex>(device, label, capacity),
            capacity,
            count: 0,
        }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, pool: &EffectPool) {
        let verts = pool.vertices();
        if verts.len() > self.capacity {
            self.capacity = verts.len().max(pool.max_vertices());
            self.buffer =
                helpers::dynamic_vertex_buffer::<ArcVertex>(device, self.label, self.capacity);
        }
        if !verts.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(verts));
        }
        self.count = verts.len() as u32;
    }
}

pub struct GpuState<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    tunnel_pipeline: wgpu::RenderPipeline,
    nodes_pipeline: wgpu::RenderPipeline,
    arcs_pipeline: wgpu::RenderPipeline,

    // rebuilt on each `Regenerated` from the engine
    tunnel_vbuf: Option<wgpu::Buffer>,
    tunnel_vcount: u32,
    node_ibuf: Option<wgpu::Buffer>,
    node_capacity: usize,
    node_count: u32,
    generation: Option<u32>,

    quad_vbuf: wgpu::Buffer,
    ambient: ArcBuffer,
    reactive: ArcBuffer,

    width: u32,
    height: u32,
    clear_color: wgpu::Color,
}

impl GpuState<'static> {
    /// The surface holds its own handle to `canvas`.
    pub async fn new(canvas: &web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // default limits keep older WebGPU implementations happy
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<Globals>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bg"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });
        let scene_pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&globals_bgl],
            push_constant_ranges: &[],
        });

        let tunnel_shader = helpers::shader(&device, "tunnel_wgsl", tunnel_core::TUNNEL_WGSL);
        let nodes_shader = helpers::shader(&device, "nodes_wgsl", tunnel_core::NODES_WGSL);
        let arcs_shader = helpers::shader(&device, "arcs_wgsl", tunnel_core::ARCS_WGSL);

        let tunnel_pipeline = helpers::make_scene_pipeline(
            &device,
            &scene_pl,
            PipelineDesc {
                label: "tunnel_pipeline",
                shader: &tunnel_shader,
                buffers: &[helpers::tunnel_layout()],
                topology: wgpu::PrimitiveTopology::LineList,
            },
            format,
        );
        let nodes_pipeline = helpers::make_scene_pipeline(
            &device,
            &scene_pl,
            PipelineDesc {
                label: "nodes_pipeline",
                shader: &nodes_shader,
                buffers: &[helpers::quad_layout(), helpers::node_instance_layout()],
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
            format,
        );
        let arcs_pipeline = helpers::make_scene_pipeline(
            &device,
            &scene_pl,
            PipelineDesc {
                label: "arcs_pipeline",
                shader: &arcs_shader,
                buffers: &[helpers::arc_layout()],
                topology: wgpu::PrimitiveTopology::LineList,
            },
            format,
        );

        let quad_vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vbuf"),
            contents: bytemuck::cast_slice(&helpers::QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ambient = ArcBuffer::new(&device, "ambient_arcs", 0);
        let reactive = ArcBuffer::new(&device, "reactive_arcs", 0);

        log::info!("[web] WebGPU ready: {:?} {}x{}", format, width, height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            globals_buffer,
            globals_bind_group,
            tunnel_pipeline,
            nodes_pipeline,
            arcs_pipeline,
            tunnel_vbuf: None,
            tunnel_vcount: 0,
            node_ibuf: None,
            node_capacity: 0,
            node_count: 0,
            generation: None,
            quad_vbuf,
            ambient,
            reactive,
            width,
            height,
            clear_color: wgpu::Color {
                r: 0.005,
                g: 0.008,
                b: 0.02,
                a: 1.0,
            },
        })
    }
}

impl<'a> GpuState<'a> {
    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.reconfigure();
        }
    }

    pub fn reconfigure(&mut self) {
        self.config.width = self.width;
        self.config.height = self.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Rebind scene buffers to a freshly rebuilt tunnel. Buffers from the
    /// previous generation are dropped here.
    pub fn rebind(&mut self, engine: &Orchestrator, regenerated: Regenerated) {
        if self.generation == Some(regenerated.generation) {
            return;
        }
        self.upload_scene(engine, regenerated.generation, regenerated.node_count);
    }

    fn upload_scene(&mut self, engine: &Orchestrator, generation: u32, node_len: usize) {
        let lines = engine.mesh().line_vertices();
        self.tunnel_vcount = lines.len() as u32;
        self.tunnel_vbuf = (!lines.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("tunnel_vbuf"),
                    contents: bytemuck::cast_slice(&lines),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        if node_len > self.node_capacity || self.node_ibuf.is_none() {
            self.node_capacity = node_len;
            self.node_ibuf = Some(helpers::dynamic_vertex_buffer::<NodeInstance>(
                &self.device,
                "node_instances",
                node_len,
            ));
        }
        self.generation = Some(generation);
        log::debug!(
            "[web] scene generation {} uploaded: {} line verts, {} nodes",
            generation,
            self.tunnel_vcount,
            node_len
        );
    }

    pub fn render(&mut self, engine: &Orchestrator, time_sec: f32) -> Result<(), wgpu::SurfaceError> {
        if self.generation.is_none() {
            self.upload_scene(
                engine,
                engine.scene_generation(),
                engine.nodes().instances().len(),
            );
        }

        let camera = engine.camera();
        let globals = Globals {
            view_proj: camera.view_projection().to_cols_array_2d(),
            model: engine.root_transform().matrix().to_cols_array_2d(),
            params: [time_sec, engine.breath().intensity(), 0.0, 0.0],
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let instances = engine.nodes().instances();
        self.node_count = instances.len().min(self.node_capacity) as u32;
        if let Some(buf) = &self.node_ibuf {
            if self.node_count > 0 {
                self.queue.write_buffer(
                    buf,
                    0,
                    bytemuck::cast_slice(&instances[..self.node_count as usize]),
                );
            }
        }
        self.ambient
            .upload(&self.device, &self.queue, engine.ambient_pool());
        self.reactive
            .upload(&self.device, &self.queue, engine.reactive_pool());

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.globals_bind_group, &[]);

            if let Some(vbuf) = &self.tunnel_vbuf {
                rpass.set_pipeline(&self.tunnel_pipeline);
                rpass.set_vertex_buffer(0, vbuf.slice(..));
                rpass.draw(0..self.tunnel_vcount, 0..1);
            }

            for arcs in [&self.ambient, &self.reactive] {
                if arcs.count > 0 {
                    rpass.set_pipeline(&self.arcs_pipeline);
                    rpass.set_vertex_buffer(0, arcs.buffer.slice(..));
                    rpass.draw(0..arcs.count, 0..1);
                }
            }

            if let (Some(ibuf), true) = (&self.node_ibuf, self.node_count > 0) {
                rpass.set_pipeline(&self.nodes_pipeline);
                rpass.set_vertex_buffer(0, self.quad_vbuf.slice(..));
                rpass.set_vertex_buffer(1, ibuf.slice(..));
                rpass.draw(0..helpers::QUAD_CORNERS.len() as u32, 0..self.node_count);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
