use std::num::NonZeroU64;
use std::path::Path;

use wgpu::*;

use crate::config::AppConfig;
use crate::controller::frame_loop::{CameraUniform, LightingUniform, ObjectUniform};
use crate::error::InitError;
use crate::model::{DrawCommand, MeshRef, Projection, SceneModels};
use crate::utils::{align_to, MeshBuffer, Vertex};
use crate::view::gpu_init::GpuContext;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const OBJECT_UNIFORM_SIZE: u64 = std::mem::size_of::<ObjectUniform>() as u64;
const INITIAL_OBJECT_CAPACITY: u64 = 16;

/// Projection and lighting uniforms, bind group 0
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

/// Per-draw uniforms, bind group 1, addressed with a dynamic offset
pub struct ObjectResources {
    pub buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    pub stride: u64,
    pub capacity: u64,
}

/// egui output for one frame, tessellated and ready to draw
pub struct EguiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub screen: egui_wgpu::ScreenDescriptor,
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

fn object_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("object_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(OBJECT_UNIFORM_SIZE),
            },
            count: None,
        }],
    })
}

impl ObjectResources {
    pub fn new(device: &wgpu::Device, capacity: u64) -> Self {
        let bind_group_layout = object_bind_group_layout(device);
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_to(OBJECT_UNIFORM_SIZE, alignment);
        let (buffer, bind_group) = Self::allocate(device, &bind_group_layout, stride, capacity);
        Self { buffer, bind_group_layout, bind_group, stride, capacity }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_buffer"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(OBJECT_UNIFORM_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Grow the buffer so that `count` objects fit.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, count: u64) {
        if count <= self.capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        tracing::debug!(from = self.capacity, to = capacity, "growing object uniform buffer");
        let (buffer, bind_group) = Self::allocate(device, &self.bind_group_layout, self.stride, capacity);
        self.buffer = buffer;
        self.bind_group = bind_group;
        self.capacity = capacity;
    }

    /// Pack one uniform per draw at `stride` intervals.
    pub fn pack(&self, draw_list: &[DrawCommand]) -> Vec<u8> {
        pack_objects(draw_list, self.stride)
    }
}

fn pack_objects(draw_list: &[DrawCommand], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; draw_list.len() * stride];
    for (i, cmd) in draw_list.iter().enumerate() {
        let uniform = ObjectUniform::from(cmd);
        let src = bytemuck::bytes_of(&uniform);
        bytes[i * stride..i * stride + src.len()].copy_from_slice(src);
    }
    bytes
}

fn read_shader(path: &Path) -> Result<String, InitError> {
    std::fs::read_to_string(path).map_err(|source| InitError::ShaderSource {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the scene pipeline from WGSL source. Validation errors surface as `InitError::Shader`.
pub fn create_scene_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    shader_path: &Path,
    shader_src: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> Result<wgpu::RenderPipeline, InitError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pipeline_layout"),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState { format, blend: Some(wgpu::BlendState::REPLACE), write_mask: wgpu::ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // meshes come with mixed winding
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(InitError::Shader { path: shader_path.to_path_buf(), message: err.to_string() });
    }
    Ok(pipeline)
}

///////////////////////////////////////////////////////////////////////////////

/// Scene renderer: owns the pipeline, uniforms, uploaded meshes and the egui renderer
pub struct Renderer {
    pipeline: RenderPipeline,
    camera: CameraResources,
    objects: ObjectResources,
    /// Indexed by `ModelId::index()`, then by part.
    meshes: Vec<Vec<MeshBuffer>>,
    _depth_texture: Texture,
    depth_view: TextureView,
    clear_color: Color,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub fn new(gpu: &GpuContext, config: &AppConfig, models: &SceneModels) -> Result<Self, InitError> {
        let device = gpu.device.as_ref();
        let shader_src = read_shader(&config.shader_path)?;

        let camera = create_camera_resources(device);
        let objects = ObjectResources::new(device, INITIAL_OBJECT_CAPACITY);
        let pipeline = create_scene_pipeline(
            device,
            gpu.format,
            &config.shader_path,
            &shader_src,
            &[&camera.bind_group_layout, &objects.bind_group_layout],
        )?;
        tracing::info!(path = %config.shader_path.display(), "shader program built");

        let light = &config.lighting;
        let lighting = LightingUniform {
            light_dir: glam::Vec3::from(light.direction).normalize_or_zero().to_array(),
            diffuse: light.diffuse,
            ambient: light.ambient,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        };
        gpu.queue.write_buffer(&camera.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        let meshes: Vec<Vec<MeshBuffer>> = models
            .iter()
            .map(|(id, model)| {
                model
                    .parts
                    .iter()
                    .map(|part| part.mesh.upload(device, &format!("{id:?}/{}", part.name)))
                    .collect()
            })
            .collect();

        let (width, height) = gpu.size();
        let (depth_texture, depth_view) = create_depth_texture(device, width, height);
        let [r, g, b] = config.clear_color;

        let egui_renderer = egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        Ok(Self {
            pipeline,
            camera,
            objects,
            meshes,
            _depth_texture: depth_texture,
            depth_view,
            clear_color: Color { r, g, b, a: 1.0 },
            egui_renderer,
        })
    }

    /// Recreate the depth buffer for a new surface size.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (depth_texture, depth_view) = create_depth_texture(device, width, height);
        self._depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    fn buffers_for(&self, mesh: MeshRef) -> &[MeshBuffer] {
        let parts = &self.meshes[mesh.model.index()];
        match mesh.part {
            Some(i) => parts.get(i..=i).unwrap_or(&[]),
            None => parts,
        }
    }

    /// Draw the scene followed by the overlay and present.
    pub fn draw_frame(
        &mut self,
        gpu: &GpuContext,
        draw_list: &[DrawCommand],
        projection: &Projection,
        egui: Option<EguiFrame>,
    ) -> Result<(), SurfaceError> {
        let device = gpu.device.as_ref();
        let queue = gpu.queue.as_ref();

        let frame = gpu.surface.get_current_texture()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());

        let camera = CameraUniform { projection: projection.matrix.to_cols_array_2d() };
        queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&camera));
        self.objects.ensure_capacity(device, draw_list.len() as u64);
        if !draw_list.is_empty() {
            queue.write_buffer(&self.objects.buffer, 0, &self.objects.pack(draw_list));
        }

        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            for (i, cmd) in draw_list.iter().enumerate() {
                let offset = (i as u64 * self.objects.stride) as u32;
                rp.set_bind_group(1, &self.objects.bind_group, &[offset]);
                for mesh_buffer in self.buffers_for(cmd.mesh) {
                    if mesh_buffer.index_count == 0 {
                        continue;
                    }
                    rp.set_vertex_buffer(0, mesh_buffer.vertex_buffer.slice(..));
                    rp.set_index_buffer(mesh_buffer.index_buffer.slice(..), IndexFormat::Uint32);
                    rp.draw_indexed(0..mesh_buffer.index_count, 0, 0..1);
                }
            }
        }

        if let Some(egui) = egui {
            for (id, image_delta) in &egui.textures_delta.set {
                self.egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            self.egui_renderer
                .update_buffers(device, queue, &mut encoder, &egui.primitives, &egui.screen);

            {
                let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("egui_render_pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Load,
                            store: StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                self.egui_renderer
                    .render(&mut egui_pass.forget_lifetime(), &egui.primitives, &egui.screen);
            }

            for id in &egui.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelId, Scene};
    use glam::Mat4;

    #[test]
    fn objects_are_packed_at_stride() {
        let list = Scene::new().draw_list(Mat4::IDENTITY);
        let bytes = pack_objects(&list, 256);
        assert_eq!(bytes.len(), 13 * 256);

        let vase: ObjectUniform = bytemuck::pod_read_unaligned(&bytes[9 * 256..9 * 256 + 80]);
        assert_eq!(vase.material, [0.2, 0.2, 0.8, 1.0]);
        assert_eq!(vase.model_view, list[9].model_view.to_cols_array_2d());
        // padding between entries stays zeroed
        assert!(bytes[80..256].iter().all(|&b| b == 0));
    }

    #[test]
    fn pack_with_tight_stride() {
        let list = vec![DrawCommand {
            mesh: MeshRef::whole(ModelId::Pyramid),
            model_view: Mat4::IDENTITY,
            material: glam::Vec3::X,
        }];
        let bytes = pack_objects(&list, OBJECT_UNIFORM_SIZE);
        assert_eq!(bytes.len(), 80);
        assert!(pack_objects(&[], 256).is_empty());
    }

    #[test]
    fn missing_shader_is_reported() {
        let err = read_shader(Path::new("no/such/shader.wgsl")).unwrap_err();
        assert!(matches!(err, InitError::ShaderSource { .. }));
    }
}
