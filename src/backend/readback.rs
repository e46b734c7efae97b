//! Copying a texture into tightly packed rows on the CPU.

use tracing::warn;

pub fn compute_padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> (u32, u32) {
    let unpadded_bytes_per_row = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
    (unpadded_bytes_per_row, padded_bytes_per_row)
}

pub fn copy_padded_readback_rows(
    data: &[u8],
    height: u32,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    output: &mut Vec<u8>,
) {
    let output_size = (unpadded_bytes_per_row * height) as usize;
    output.resize(output_size, 0);

    if padded_bytes_per_row == unpadded_bytes_per_row {
        output.copy_from_slice(&data[..output_size]);
        return;
    }

    for row in 0..height {
        let padded_offset = (row * padded_bytes_per_row) as usize;
        let unpadded_offset = (row * unpadded_bytes_per_row) as usize;
        let row_data = &data[padded_offset..padded_offset + unpadded_bytes_per_row as usize];
        output[unpadded_offset..unpadded_offset + unpadded_bytes_per_row as usize]
            .copy_from_slice(row_data);
    }
}

/// Reads mip level 0 of an RGBA8 texture. Returns an empty vector if mapping fails.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let (unpadded_bytes_per_row, padded_bytes_per_row) = compute_padded_bytes_per_row(width, 4);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_buffer"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        if sender.send(result).is_err() {
            warn!("Failed to send map_async result from callback");
        }
    });

    let _ = device.poll(wgpu::MaintainBase::Wait);

    match receiver.recv() {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            warn!("Failed to map readback buffer: {:?}", error);
            return Vec::new();
        }
        Err(error) => {
            warn!("Failed to receive mapped buffer result: {}", error);
            return Vec::new();
        }
    }

    let mut output = Vec::new();
    {
        let mapped_range = buffer_slice.get_mapped_range();
        copy_padded_readback_rows(
            &mapped_range,
            height,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
            &mut output,
        );
    }
    buffer.unmap();
    output
}
