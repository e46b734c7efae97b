/// Swaps the red and blue channels, blended in by `swap_amount`.
pub const CHANNEL_SWAP_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = textureSample(tex0, tex0_sampler, in.uv);
    let swapped = vec4<f32>(color.b, color.g, color.r, color.a);
    return mix(color, swapped, u.swap_amount);
}
"#;
