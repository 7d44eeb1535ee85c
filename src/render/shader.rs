use bytemuck::{Pod, Zeroable};

use crate::gallery::{PlaneDraw, TitleDraw};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Per-plane constants shared by the image and caption pipelines.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct PlaneUniform {
    pub model: [[f32; 4]; 4],
    pub plane_sizes: [f32; 2],
    pub image_sizes: [f32; 2],
    pub border_radius: f32,
    pub time: f32,
    pub speed: f32,
    pub _pad: f32,
}

impl PlaneUniform {
    pub fn image(draw: &PlaneDraw) -> Self {
        Self {
            model: draw.model.to_cols_array_2d(),
            plane_sizes: draw.plane_size.into(),
            image_sizes: draw.image_size.into(),
            border_radius: draw.border_radius,
            time: draw.time,
            speed: draw.speed,
            _pad: 0.0,
        }
    }

    pub fn title(draw: &TitleDraw) -> Self {
        Self {
            model: draw.model.to_cols_array_2d(),
            plane_sizes: [1.0, 1.0],
            image_sizes: [1.0, 1.0],
            border_radius: 0.0,
            time: 0.0,
            speed: 0.0,
            _pad: 0.0,
        }
    }
}

pub(crate) const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
}

struct PlaneUniform {
    model: mat4x4<f32>,
    plane_sizes: vec2<f32>,
    image_sizes: vec2<f32>,
    border_radius: f32,
    time: f32,
    speed: f32,
    _pad: f32,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> plane: PlaneUniform;
@group(1) @binding(1)
var plane_texture: texture_2d<f32>;
@group(1) @binding(2)
var plane_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_image(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    var p = input.position;
    p.z = (sin(p.x * 4.0 + plane.time) * 1.5 + cos(p.y * 2.0 + plane.time) * 1.5)
        * (0.1 + plane.speed * 0.5);
    out.position = globals.view_proj * plane.model * vec4<f32>(p, 1.0);
    out.uv = input.uv;
    return out;
}

@vertex
fn vs_title(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = globals.view_proj * plane.model * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}

fn rounded_box_sdf(p: vec2<f32>, b: vec2<f32>, r: f32) -> f32 {
    let d = abs(p) - b;
    return length(max(d, vec2<f32>(0.0))) + min(max(d.x, d.y), 0.0) - r;
}

@fragment
fn fs_image(input: VertexOutput) -> @location(0) vec4<f32> {
    let plane_aspect = plane.plane_sizes.x / plane.plane_sizes.y;
    let image_aspect = plane.image_sizes.x / plane.image_sizes.y;
    let ratio = vec2<f32>(
        min(plane_aspect / image_aspect, 1.0),
        min(image_aspect / plane_aspect, 1.0)
    );
    let uv = input.uv * ratio + (vec2<f32>(1.0) - ratio) * 0.5;
    let color = textureSample(plane_texture, plane_sampler, uv);

    let radius = plane.border_radius;
    let d = rounded_box_sdf(input.uv - vec2<f32>(0.5), vec2<f32>(0.5 - radius), radius);
    if (d > 0.0) {
        discard;
    }
    return vec4<f32>(color.rgb, 1.0);
}

@fragment
fn fs_title(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(plane_texture, plane_sampler, input.uv);
    if (color.a < 0.1) {
        discard;
    }
    return color;
}
"#;
