use std::time::{Duration, Instant};

use pinhole::gfx::recording::Command;
use pinhole::prelude::*;
use winit::{event::ElementState, keyboard::KeyCode};

const SHADER: &str = "/* textured cube */";

fn cube_program(ctx: &mut RecordingContext) -> ShaderProgram {
    ShaderProgram::new(
        ctx,
        &ProgramDesc::new("cube", SHADER)
            .with_uniform("model", UniformKind::Mat4)
            .with_uniform("view", UniformKind::Mat4)
            .with_uniform("projection", UniformKind::Mat4)
            .with_uniform("mix_value", UniformKind::Float)
            .with_sampler("texture1")
            .with_sampler("texture2"),
    )
    .unwrap()
}

#[test]
fn frames_push_camera_and_draw_every_mesh() {
    let mut ctx = RecordingContext::new();
    let mut frame = FrameContext::new(800, 600);

    let cube = textured_cube()
        .upload(&mut ctx, "cube", BufferUsage::Static)
        .unwrap();
    let quad = textured_quad()
        .upload(&mut ctx, "quad", BufferUsage::Dynamic)
        .unwrap();
    let program = cube_program(&mut ctx);

    let pixels = [200u8; 4 * 4 * 3];
    let texture = Texture::new(&mut ctx, &TextureImage::new(4, 4, ChannelFormat::Rgb, &pixels)).unwrap();
    program.bind_texture_unit(&mut ctx, "texture1", 0);
    program.bind_texture_unit(&mut ctx, "texture2", 1);

    let start = Instant::now();
    frame.handle_key(KeyCode::KeyW, ElementState::Pressed);
    for i in 0..3 {
        frame.advance(start + Duration::from_millis(100 * i));

        ctx.clear_commands();
        texture.activate(&mut ctx, 0);
        program.use_program(&mut ctx);
        program.set_float(&mut ctx, "mix_value", 0.2);
        frame
            .camera
            .push_to_shader(&mut ctx, &program, "view", "projection", "model");
        cube.draw_indexed(&mut ctx, Primitive::Triangles, 36).unwrap();
        quad.draw_indexed(&mut ctx, Primitive::Triangles, 6).unwrap();

        let draws: Vec<&Command> = ctx.draw_calls().collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(
            ctx.uniform(program.id(), "view"),
            Some(UniformValue::from(frame.camera.view()))
        );
    }

    // 0.2 seconds of forward movement from z = 3
    assert!((frame.camera.position.z - 2.5).abs() < 1e-4);
    assert_eq!(ctx.sampler_unit(program.id(), "texture2"), Some(1));
    assert_eq!(ctx.bound_texture(0), Some(texture.id()));
}

#[test]
fn dropped_resources_are_released_once() {
    let mut ctx = RecordingContext::new();
    {
        let _cube = textured_cube()
            .upload(&mut ctx, "cube", BufferUsage::Static)
            .unwrap();
        let _program = cube_program(&mut ctx);
        assert_eq!(ctx.live_vertex_arrays(), 1);
        assert_eq!(ctx.live_programs(), 1);
    }

    assert_eq!(ctx.collect_garbage(), 2);
    assert_eq!(ctx.live_vertex_arrays(), 0);
    assert_eq!(ctx.live_programs(), 0);

    let releases = ctx
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::Release(_)))
        .count();
    assert_eq!(releases, 2);
    assert_eq!(ctx.collect_garbage(), 0);
}

#[test]
fn unknown_uniforms_and_missing_indices_do_not_draw() {
    let mut ctx = RecordingContext::new();
    let program = cube_program(&mut ctx);
    program.set_float(&mut ctx, "does_not_exist", 1.0);
    program.set_int(&mut ctx, "mix_value", 3);
    assert_eq!(ctx.uniform(program.id(), "does_not_exist"), None);
    assert_eq!(ctx.uniform(program.id(), "mix_value"), None);

    let points = GeometryBuffer::new(
        &mut ctx,
        2,
        &[3],
        &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        0,
        &[],
        BufferUsage::Static,
    )
    .unwrap();
    assert_eq!(
        points.draw_indexed(&mut ctx, Primitive::Points, 2),
        Err(GfxError::NoIndexBuffer)
    );
    points.draw_arrays(&mut ctx, Primitive::Points, 0, 2);
    assert_eq!(ctx.draw_calls().count(), 1);
}
