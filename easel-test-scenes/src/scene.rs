use easel::{
    ClipOptions, EndShape, Renderer, Result, ShapeMode, UniformDecl, UniformKind, WgpuBackend,
};

use crate::expectations::PixelExpectation;
use crate::shaders::CHANNEL_SWAP_FS;

const TILE_SIZE: u32 = 80;
const COLUMNS: u32 = 3;
const ROWS: u32 = 2;

pub const CANVAS_WIDTH: u32 = TILE_SIZE * COLUMNS;
pub const CANVAS_HEIGHT: u32 = TILE_SIZE * ROWS;

const WHITE: [u8; 3] = [255, 255, 255];

/// Pixel at the center of tile `n` (1-based, row major).
fn tile_center(tile_number: u32) -> (u32, u32) {
    let index = tile_number - 1;
    (
        (index % COLUMNS) * TILE_SIZE + TILE_SIZE / 2,
        (index / COLUMNS) * TILE_SIZE + TILE_SIZE / 2,
    )
}

/// Center of tile `n` in world units under the default camera, which puts the origin in the
/// middle of the canvas.
fn tile_origin(tile_number: u32) -> (f32, f32) {
    let (x, y) = tile_center(tile_number);
    (
        x as f32 - CANVAS_WIDTH as f32 / 2.0,
        y as f32 - CANVAS_HEIGHT as f32 / 2.0,
    )
}

/// Draws every tile on a white background and returns what the read-back frame must contain.
pub fn build_main_scene(renderer: &mut Renderer<WgpuBackend>) -> Result<Vec<PixelExpectation>> {
    renderer.begin_frame();
    renderer.background([1.0, 1.0, 1.0, 1.0]);
    renderer.no_stroke();

    let mut expectations = Vec::new();
    expectations.extend(tile_01_rect(renderer)?);
    expectations.extend(tile_02_ellipse(renderer)?);
    expectations.extend(tile_03_immediate_triangle(renderer)?);
    expectations.extend(tile_04_clipped_rect(renderer)?);
    expectations.extend(tile_05_framebuffer_texture(renderer)?);
    expectations.extend(tile_06_filtered_framebuffer(renderer)?);
    Ok(expectations)
}

fn tile_01_rect(renderer: &mut Renderer<WgpuBackend>) -> Result<Vec<PixelExpectation>> {
    let (x, y) = tile_origin(1);
    renderer.fill([1.0, 0.0, 0.0, 1.0]);
    renderer.rect(x - 30.0, y - 30.0, 60.0, 60.0)?;

    let (cx, cy) = tile_center(1);
    Ok(vec![
        PixelExpectation::opaque(cx, cy, [255, 0, 0], "rect_center"),
        PixelExpectation::opaque(cx - 37, cy - 37, WHITE, "rect_outside"),
    ])
}

fn tile_02_ellipse(renderer: &mut Renderer<WgpuBackend>) -> Result<Vec<PixelExpectation>> {
    let (x, y) = tile_origin(2);
    renderer.fill([0.0, 1.0, 0.0, 1.0]);
    renderer.ellipse(x, y, 60.0, 60.0)?;

    let (cx, cy) = tile_center(2);
    Ok(vec![
        PixelExpectation::opaque(cx, cy, [0, 255, 0], "ellipse_center"),
        // Inside the bounding box but outside the circle.
        PixelExpectation::opaque(cx - 26, cy - 26, WHITE, "ellipse_corner"),
    ])
}

fn tile_03_immediate_triangle(
    renderer: &mut Renderer<WgpuBackend>,
) -> Result<Vec<PixelExpectation>> {
    let (x, y) = tile_origin(3);
    renderer.fill([0.0, 0.0, 1.0, 1.0]);
    renderer.begin_shape(ShapeMode::Triangles)?;
    renderer.vertex([x - 30.0, y + 25.0, 0.0])?;
    renderer.vertex([x + 30.0, y + 25.0, 0.0])?;
    renderer.vertex([x, y - 30.0, 0.0])?;
    renderer.end_shape(EndShape::Close)?;

    let (cx, cy) = tile_center(3);
    Ok(vec![
        PixelExpectation::opaque(cx, cy, [0, 0, 255], "triangle_center"),
        PixelExpectation::opaque(cx - 25, cy - 25, WHITE, "triangle_outside"),
    ])
}

fn tile_04_clipped_rect(renderer: &mut Renderer<WgpuBackend>) -> Result<Vec<PixelExpectation>> {
    let (x, y) = tile_origin(4);
    renderer.with_saved_state(|r| {
        r.clip(ClipOptions::default(), |r| r.ellipse(x, y, 50.0, 50.0))?;
        r.fill([1.0, 1.0, 0.0, 1.0]);
        r.rect(x - 40.0, y - 40.0, 80.0, 80.0)
    })?;

    let (cx, cy) = tile_center(4);
    Ok(vec![
        PixelExpectation::opaque(cx, cy, [255, 255, 0], "clip_inside"),
        PixelExpectation::opaque(cx - 35, cy - 35, WHITE, "clip_outside"),
    ])
}

fn tile_05_framebuffer_texture(
    renderer: &mut Renderer<WgpuBackend>,
) -> Result<Vec<PixelExpectation>> {
    let framebuffer = renderer.create_framebuffer(40, 40);
    renderer.draw_into(framebuffer, |r| {
        r.background([1.0, 0.0, 1.0, 1.0]);
        Ok(())
    })?;
    let texture = renderer.framebuffer_texture(framebuffer)?;
    let (x, y) = tile_origin(5);
    renderer.image_texture(texture, x - 30.0, y - 30.0, 60.0, 60.0)?;
    renderer.remove_framebuffer(framebuffer)?;

    let (cx, cy) = tile_center(5);
    Ok(vec![
        PixelExpectation::opaque(cx, cy, [255, 0, 255], "framebuffer_center"),
        PixelExpectation::opaque(cx - 36, cy, WHITE, "framebuffer_outside"),
    ])
}

fn tile_06_filtered_framebuffer(
    renderer: &mut Renderer<WgpuBackend>,
) -> Result<Vec<PixelExpectation>> {
    let swap = renderer.create_filter_shader(
        CHANNEL_SWAP_FS,
        &[UniformDecl::new("swap_amount", UniformKind::Float)],
    );
    swap.set_uniform("swap_amount", 1.0);

    let framebuffer = renderer.create_framebuffer(40, 40);
    renderer.draw_into(framebuffer, |r| {
        r.background([1.0, 0.0, 0.0, 1.0]);
        r.filter(swap.clone())
    })?;
    let texture = renderer.framebuffer_texture(framebuffer)?;
    let (x, y) = tile_origin(6);
    renderer.image_texture(texture, x - 30.0, y - 30.0, 60.0, 60.0)?;
    renderer.remove_framebuffer(framebuffer)?;

    let (cx, cy) = tile_center(6);
    Ok(vec![
        PixelExpectation::opaque(cx, cy, [0, 0, 255], "filter_swapped"),
        PixelExpectation::opaque(cx + 36, cy, WHITE, "filter_outside"),
    ])
}
