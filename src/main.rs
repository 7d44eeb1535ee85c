#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    match native::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::any::Any;
    use std::fmt;
    use std::fs;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::PathBuf;
    use std::process::ExitCode;
    use std::str::FromStr;
    use std::sync::Arc;

    use anyhow::{anyhow, Context, Result};
    use clap::{Args, Parser, Subcommand};
    use log::info;
    use pollster::block_on;
    use winit::dpi::LogicalSize;
    use winit::event_loop::{ControlFlow, EventLoop};
    use winit::window::WindowBuilder;

    use circular_gallery::app::{print_summary, GalleryApp, WindowContainer};
    use circular_gallery::site::{
        load_catalog, mailto_link, CatalogFilter, ContactError, ContactSubmission,
        CONTACT_ENDPOINT,
    };
    use circular_gallery::{
        CardSize, DeviceProfile, GalleryConfig, GalleryFacade, GalleryOptions, Renderer,
    };

    #[derive(Parser, Debug)]
    #[command(
        author,
        version,
        about = "Circular image gallery and studio site tools",
        long_about = None
    )]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Open a gallery manifest in a window (keys: b bend, c card size, Esc quit)
        View(ViewArgs),
        /// List catalog services matching a category and search text
        Catalog(CatalogArgs),
        /// Validate a contact submission and print the mailto link and API body
        Contact(ContactArgs),
    }

    #[derive(Args, Debug)]
    struct ViewArgs {
        /// Manifest JSON: an item array or an object with `items` and options
        manifest: PathBuf,

        /// Arc strength; 0 keeps the track flat
        #[arg(long, allow_negative_numbers = true)]
        bend: Option<f32>,

        /// Card preset: small, normal or large
        #[arg(long)]
        card_size: Option<CardSize>,

        /// Gap between cards in world units, replacing the preset padding
        #[arg(long)]
        spacing: Option<f32>,

        #[arg(long)]
        border_radius: Option<f32>,

        #[arg(long)]
        text_color: Option<String>,

        /// CSS font shorthand for captions, e.g. "bold 24px Inter"
        #[arg(long)]
        font: Option<String>,

        /// TrueType/OpenType file used to rasterise captions
        #[arg(long)]
        font_file: Option<PathBuf>,

        /// Window size in logical pixels
        #[arg(long, default_value = "1280x720")]
        size: WindowSize,

        /// Print the plane layout instead of opening a window
        #[arg(long)]
        summary_only: bool,
    }

    impl ViewArgs {
        fn apply(&self, config: &mut GalleryConfig) {
            if let Some(bend) = self.bend {
                config.bend = bend;
            }
            if let Some(card_size) = self.card_size {
                config.card_size = card_size;
            }
            if let Some(spacing) = self.spacing {
                config.spacing = Some(spacing);
            }
            if let Some(radius) = self.border_radius {
                config.border_radius = radius;
            }
            if let Some(color) = &self.text_color {
                config.text_color = color.clone();
            }
            if let Some(font) = &self.font {
                config.font = font.clone();
            }
            if let Some(file) = &self.font_file {
                config.font_file = Some(file.to_string_lossy().into_owned());
            }
        }
    }

    #[derive(Args, Debug)]
    struct CatalogArgs {
        /// Services JSON: an array or an object with a `services` array
        path: PathBuf,

        /// Category id; "all" matches every service
        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive text searched in titles, descriptions, features and technologies
        #[arg(long)]
        query: Option<String>,
    }

    #[derive(Args, Debug)]
    struct ContactArgs {
        /// Submission JSON with name, email, message and optional phone, company, service
        path: PathBuf,

        #[arg(long, default_value = "studio@example.com")]
        recipient: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct WindowSize {
        width: u32,
        height: u32,
    }

    impl FromStr for WindowSize {
        type Err = String;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            let (width, height) = value
                .split_once(['x', 'X'])
                .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
            let parse = |part: &str| {
                part.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("invalid dimension `{part}`"))
            };
            Ok(Self {
                width: parse(width)?,
                height: parse(height)?,
            })
        }
    }

    pub fn run() -> Result<ExitCode> {
        let cli = Cli::parse();
        match cli.command {
            Command::View(args) => view(args).map(|()| ExitCode::SUCCESS),
            Command::Catalog(args) => catalog(args).map(|()| ExitCode::SUCCESS),
            Command::Contact(args) => contact(args),
        }
    }

    fn view(args: ViewArgs) -> Result<()> {
        let mut options = GalleryOptions::load(&args.manifest)
            .with_context(|| format!("failed to load manifest {}", args.manifest.display()))?;
        args.apply(&mut options.config);
        let size = (args.size.width, args.size.height);

        if args.summary_only {
            print_summary(&options, size, None);
            return Ok(());
        }

        match run_interactive(options.clone(), size) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    print_summary(&options, size, None);
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    fn run_interactive(options: GalleryOptions, (width, height): (u32, u32)) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Circular Gallery")
                .with_inner_size(LogicalSize::new(width as f64, height as f64))
                .build(&event_loop)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let logical = window
            .inner_size()
            .to_logical::<u32>(window.scale_factor());
        let container = Arc::new(WindowContainer::new(logical.width, logical.height));
        let facade = GalleryFacade::create(container.clone(), options)
            .context("failed to mount gallery")?;
        let segments = facade
            .scene()
            .map(|scene| scene.profile().segments)
            .unwrap_or(DeviceProfile::DESKTOP.segments);
        let renderer = block_on(Renderer::new(Arc::clone(&window), segments))?;
        info!("rendering gallery at {}x{}", logical.width, logical.height);

        let mut app = GalleryApp::new(renderer, facade, container);
        let mut last_error = None;
        event_loop
            .run(|event, target| {
                target.set_control_flow(ControlFlow::Poll);
                if let Err(err) = app.process_event(&event, target) {
                    last_error = Some(err);
                    target.exit();
                }
            })
            .context("event loop terminated abnormally")?;

        app.shutdown();
        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn catalog(args: CatalogArgs) -> Result<()> {
        let services = load_catalog(&args.path)?;
        let filter = CatalogFilter::new(args.category, args.query);
        let matches = filter.apply(&services);
        println!("{} of {} services match", matches.len(), services.len());
        for service in matches {
            println!(" - {} [{}] {}", service.id, service.category, service.title);
        }
        Ok(())
    }

    fn contact(args: ContactArgs) -> Result<ExitCode> {
        let json = fs::read_to_string(&args.path)
            .with_context(|| format!("unable to read {}", args.path.display()))?;
        let submission: ContactSubmission = serde_json::from_str(&json)
            .with_context(|| format!("invalid submission {}", args.path.display()))?;
        match submission.validate() {
            Ok(()) => {
                println!("{}", mailto_link(&args.recipient, &submission));
                println!("POST {CONTACT_ENDPOINT} {}", submission.to_request_json()?);
                Ok(ExitCode::SUCCESS)
            }
            Err(ContactError::Invalid(fields)) => {
                for field in &fields {
                    eprintln!("invalid {field}");
                }
                Ok(ExitCode::FAILURE)
            }
            Err(err) => Err(anyhow!(err)),
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }
}
