//! Fixed-function state for render pipelines.

use super::{RasterState, StencilCompare, StencilMode, VertexFormat};
use crate::shader::AttributeDecl;
use crate::state::BlendMode;

pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn component(
    src_factor: wgpu::BlendFactor,
    dst_factor: wgpu::BlendFactor,
    operation: wgpu::BlendOperation,
) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation,
    }
}

/// Blend state for premultiplied fragment output. `None` writes the source unchanged.
pub fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    use wgpu::BlendFactor::*;
    use wgpu::BlendOperation::*;

    let over = component(One, OneMinusSrcAlpha, Add);
    let state = match mode {
        BlendMode::Replace => return None,
        BlendMode::Add => wgpu::BlendState {
            color: component(One, One, Add),
            alpha: component(One, One, Add),
        },
        BlendMode::Subtract => wgpu::BlendState {
            color: component(One, One, ReverseSubtract),
            alpha: over,
        },
        BlendMode::Darkest => wgpu::BlendState {
            color: component(One, One, Min),
            alpha: over,
        },
        BlendMode::Lightest => wgpu::BlendState {
            color: component(One, One, Max),
            alpha: over,
        },
        BlendMode::Multiply => wgpu::BlendState {
            color: component(Dst, OneMinusSrcAlpha, Add),
            alpha: over,
        },
        BlendMode::Screen => wgpu::BlendState {
            color: component(One, OneMinusSrc, Add),
            alpha: over,
        },
        BlendMode::Exclusion => wgpu::BlendState {
            color: component(OneMinusDst, OneMinusSrc, Add),
            alpha: component(One, One, Add),
        },
        BlendMode::Remove => wgpu::BlendState {
            color: component(Zero, OneMinusSrcAlpha, Add),
            alpha: component(Zero, OneMinusSrcAlpha, Add),
        },
        _ => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
    };
    Some(state)
}

fn stencil_state(mode: StencilMode) -> wgpu::StencilState {
    let face = |compare, pass_op| wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    match mode {
        StencilMode::Disabled => wgpu::StencilState::default(),
        // Replaces the stored value with the reference wherever geometry lands.
        StencilMode::Write { .. } => {
            let face_state = face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Replace);
            wgpu::StencilState {
                front: face_state,
                back: face_state,
                read_mask: 0xff,
                write_mask: 0xff,
            }
        }
        StencilMode::Test { compare, .. } => {
            let compare = match compare {
                StencilCompare::Equal => wgpu::CompareFunction::Equal,
                StencilCompare::NotEqual => wgpu::CompareFunction::NotEqual,
            };
            let face_state = face(compare, wgpu::StencilOperation::Keep);
            wgpu::StencilState {
                front: face_state,
                back: face_state,
                read_mask: 0xff,
                write_mask: 0,
            }
        }
    }
}

pub fn stencil_reference(mode: StencilMode) -> u32 {
    match mode {
        StencilMode::Disabled => 0,
        StencilMode::Write { reference } | StencilMode::Test { reference, .. } => reference,
    }
}

pub fn depth_stencil_state(raster: &RasterState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_STENCIL_FORMAT,
        depth_write_enabled: raster.depth_test && raster.depth_write,
        depth_compare: if raster.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: stencil_state(raster.stencil),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub fn color_target(raster: &RasterState) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format: COLOR_FORMAT,
        blend: blend_state(raster.blend),
        write_mask: if raster.color_write {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        },
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Attributes laid out back to back, starting at `first_location`.
pub fn packed_attributes(components: &[u32], first_location: u32) -> (Vec<wgpu::VertexAttribute>, u64) {
    let mut offset = 0u64;
    let attributes = components
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let attribute = wgpu::VertexAttribute {
                format: float_format(count),
                offset,
                shader_location: first_location + i as u32,
            };
            offset += u64::from(count.clamp(1, 4)) * 4;
            attribute
        })
        .collect();
    (attributes, offset)
}

/// Attribute lists and strides of each vertex buffer a format consumes.
pub fn vertex_buffers(
    format: VertexFormat,
    custom: &[AttributeDecl],
) -> Vec<(Vec<wgpu::VertexAttribute>, u64)> {
    let mut buffers = match format {
        // position, normal, uv, color
        VertexFormat::Fill => vec![packed_attributes(&[3, 3, 2, 4], 0)],
        // position, tangent, color, side, end, start_neighbor, end_neighbor
        VertexFormat::Stroke => vec![packed_attributes(&[3, 3, 4, 1, 1, 3, 3], 0)],
        // position, corner
        VertexFormat::Point => vec![packed_attributes(&[3, 2], 0)],
        VertexFormat::Fullscreen => Vec::new(),
    };
    if format == VertexFormat::Fill && !custom.is_empty() {
        let components: Vec<u32> = custom.iter().map(|attribute| attribute.components).collect();
        buffers.push(packed_attributes(&components, 4));
    }
    buffers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FillVertex, PointVertex, StrokeVertex};

    #[test]
    fn strides_match_vertex_structs() {
        let stride = |format| vertex_buffers(format, &[])[0].1;
        assert_eq!(stride(VertexFormat::Fill), std::mem::size_of::<FillVertex>() as u64);
        assert_eq!(stride(VertexFormat::Stroke), std::mem::size_of::<StrokeVertex>() as u64);
        assert_eq!(stride(VertexFormat::Point), std::mem::size_of::<PointVertex>() as u64);
    }

    #[test]
    fn custom_attributes_follow_builtin_locations() {
        let buffers = vertex_buffers(
            VertexFormat::Fill,
            &[AttributeDecl::new("offset", 2), AttributeDecl::new("weight", 1)],
        );
        assert_eq!(buffers.len(), 2);
        let (attributes, stride) = &buffers[1];
        assert_eq!(*stride, 12);
        assert_eq!(attributes[0].shader_location, 4);
        assert_eq!(attributes[1].offset, 8);
        assert_eq!(attributes[1].format, wgpu::VertexFormat::Float32);
    }

    #[test]
    fn stencil_write_replaces_and_test_keeps() {
        let write = stencil_state(StencilMode::Write { reference: 1 });
        assert_eq!(write.front.pass_op, wgpu::StencilOperation::Replace);
        let test = stencil_state(StencilMode::Test {
            compare: StencilCompare::NotEqual,
            reference: 0,
        });
        assert_eq!(test.front.compare, wgpu::CompareFunction::NotEqual);
        assert_eq!(test.write_mask, 0);
    }

    #[test]
    fn unsupported_blend_modes_fall_back_to_source_over() {
        assert_eq!(
            blend_state(BlendMode::Overlay),
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING)
        );
        assert_eq!(blend_state(BlendMode::Replace), None);
    }
}
