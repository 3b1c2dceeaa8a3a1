#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu {
    use primitive_scene::{Engine, EngineOptions, Scene, demo::build_scene, wgpu::Color};

    use crate::common::test_utils::{covered_pixels, f_to_u8};

    const WIDTH: u32 = 160;
    const HEIGHT: u32 = 120;

    async fn engine(options: EngineOptions) -> Engine {
        Engine::headless(WIDTH, HEIGHT, options)
            .await
            .expect("no adapter available for headless rendering")
    }

    #[tokio::test]
    async fn should_render_clear_colour() {
        let mut engine = engine(EngineOptions::default()).await;
        let mut scene = Scene::new();
        scene.clear_colour = Color::WHITE;
        scene.render(&mut engine).unwrap();

        let image = engine.read_pixels().await.unwrap();
        let white = image::Rgba([f_to_u8(1.0); 4]);
        assert!(image.pixels().all(|pixel| *pixel == white));
    }

    #[tokio::test]
    async fn demo_scene_draws_over_the_clear_colour() {
        let mut engine = engine(EngineOptions {
            antialias: false,
            ..EngineOptions::default()
        })
        .await;
        let mut scene = Scene::new();
        build_scene(&mut scene);
        scene.render(&mut engine).unwrap();
        assert_eq!(engine.sample_count(), 1);
        assert_eq!(engine.uploaded_mesh_count(), 5);

        let image = engine.read_pixels().await.unwrap();
        assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
        let background = *image.get_pixel(0, 0);
        assert!(covered_pixels(&image, background) > (WIDTH * HEIGHT / 100) as usize);
    }

    #[tokio::test]
    async fn consecutive_frames_are_identical() {
        let mut engine = engine(EngineOptions {
            stencil: true,
            ..EngineOptions::default()
        })
        .await;
        let mut scene = Scene::new();
        build_scene(&mut scene);
        let transforms: Vec<_> = scene.meshes().map(|m| m.instance()).collect();

        scene.render(&mut engine).unwrap();
        let first = engine.read_pixels().await.unwrap();
        scene.render(&mut engine).unwrap();
        let second = engine.read_pixels().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(scene.meshes().map(|m| m.instance()).collect::<Vec<_>>(), transforms);
        assert_eq!(engine.frame_count(), 2);
    }

    #[tokio::test]
    async fn repeated_resizes_keep_the_engine_renderable() {
        let mut engine = engine(EngineOptions::default()).await;
        let mut scene = Scene::new();
        build_scene(&mut scene);

        engine.resize(64, 48);
        engine.resize(64, 48);
        engine.resize(0, 0);
        assert_eq!(engine.size(), [64, 48]);
        scene.render(&mut engine).unwrap();
        assert_eq!(engine.read_pixels().await.unwrap().dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn headless_engine_always_preserves() {
        let engine = engine(EngineOptions::default()).await;
        assert!(engine.options().preserve_drawing_buffer);
        assert!(engine.surface().is_none());
        assert!(matches!(engine.sample_count(), 1 | 4));
    }
}
