#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

/// Render the primitive scene in a window.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Initial window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Disable multisampling
    #[arg(long)]
    no_antialias: bool,

    /// Use a depth buffer without stencil
    #[arg(long)]
    no_stencil: bool,

    /// Do not keep the last frame in an offscreen buffer
    #[arg(long)]
    no_preserve_drawing_buffer: bool,

    /// Save the first rendered frame to this PNG file and exit
    #[arg(long, value_name = "PNG")]
    capture: Option<std::path::PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Cli {
    fn into_config(self) -> anyhow::Result<primitive_scene::DemoConfig> {
        if self.capture.is_some() && self.no_preserve_drawing_buffer {
            anyhow::bail!("--capture needs the preserved drawing buffer");
        }
        let defaults = primitive_scene::DemoConfig::default();
        Ok(primitive_scene::DemoConfig {
            width: self.width,
            height: self.height,
            engine: primitive_scene::EngineOptions {
                antialias: !self.no_antialias,
                preserve_drawing_buffer: !self.no_preserve_drawing_buffer,
                stencil: !self.no_stencil,
            },
            capture: self.capture,
            ..defaults
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    primitive_scene::run(config)
}

// the web build starts through `wasm_bindgen(start)` in the library
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> anyhow::Result<primitive_scene::DemoConfig> {
        let argv = std::iter::once("primitive-scene").chain(args.iter().copied());
        Cli::try_parse_from(argv)?.into_config()
    }

    #[test]
    fn no_flags_give_the_demo_defaults() {
        assert_eq!(config(&[]).unwrap(), primitive_scene::DemoConfig::default());
    }

    #[test]
    fn flags_turn_engine_options_off() {
        let config = config(&[
            "--width",
            "640",
            "--height",
            "480",
            "--no-antialias",
            "--no-stencil",
            "--no-preserve-drawing-buffer",
        ])
        .unwrap();
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(
            config.engine,
            primitive_scene::EngineOptions {
                antialias: false,
                preserve_drawing_buffer: false,
                stencil: false,
            }
        );
        assert_eq!(config.capture, None);
    }

    #[test]
    fn capture_keeps_the_path() {
        let config = config(&["--capture", "frame.png"]).unwrap();
        assert_eq!(config.capture, Some(std::path::PathBuf::from("frame.png")));
        assert!(config.engine.preserve_drawing_buffer);
    }

    #[test]
    fn capture_without_preserved_buffer_is_rejected() {
        let error =
            config(&["--capture", "frame.png", "--no-preserve-drawing-buffer"]).unwrap_err();
        assert_eq!(error.to_string(), "--capture needs the preserved drawing buffer");
    }
}
