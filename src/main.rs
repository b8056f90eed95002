use std::{path::PathBuf, time::Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use mandelbrot_video::{
    sequencer::{Both, Fixed, IncrementIterations, MutationPolicy, ShrinkViewport},
    AcceleratedEngine, DeviceKind, Error, Ffmpeg, Fractal, FrameConfig, FrameSequencer,
    RgbaImageStore, SequentialEngine, VideoConfig,
};

#[derive(Parser)]
#[command(version, about = "Renders Mandelbrot set images and zoom videos")]
struct Cli {
    /// Which escape-time engine renders the frames.
    #[arg(long, value_enum, default_value_t = Engine::Sequential)]
    engine: Engine,

    /// Keep the compute device across frames instead of acquiring it per frame.
    #[arg(long)]
    hold_device: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    Sequential,
    Cpu,
    Gpu,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Raise the iteration budget by `--step` per frame.
    Iterations,
    /// Zoom in by `--delta` per frame.
    Shrink,
    Both,
    Fixed,
}

#[derive(Subcommand)]
enum Command {
    /// Render a single image.
    Image(FrameArgs),
    /// Render a frame sequence and encode it with ffmpeg.
    Video(VideoArgs),
}

#[derive(Args)]
struct FrameArgs {
    #[arg(long, default_value_t = 1920)]
    width: u32,
    #[arg(long, default_value_t = 1080)]
    height: u32,
    #[arg(long, default_value_t = 60)]
    max_iterations: u32,
    #[arg(long, default_value_t = -0.758703023456444, allow_negative_numbers = true)]
    min_re: f64,
    #[arg(long, default_value_t = -0.757731022039653, allow_negative_numbers = true)]
    max_re: f64,
    #[arg(long, default_value_t = 0.076033921475166, allow_negative_numbers = true)]
    min_im: f64,
    /// Output file; its extension picks the image format.
    #[arg(long, default_value = "out/ms.png")]
    name: String,
}

impl From<FrameArgs> for FrameConfig {
    fn from(args: FrameArgs) -> Self {
        FrameConfig {
            width: args.width,
            height: args.height,
            max_iterations: args.max_iterations,
            min_re: args.min_re,
            max_re: args.max_re,
            min_im: args.min_im,
            name: args.name,
        }
    }
}

#[derive(Args)]
struct VideoArgs {
    #[command(flatten)]
    frame: FrameArgs,
    #[arg(long, default_value_t = 600)]
    frames: usize,
    #[arg(long, default_value_t = 0.001)]
    delta: f64,
    #[arg(long, value_enum, default_value_t = Policy::Iterations)]
    policy: Policy,
    #[arg(long, default_value_t = 1)]
    step: u32,
    #[arg(long, default_value_t = 30)]
    frame_rate: u32,
    #[arg(long, default_value = "out.mp4")]
    video_output: PathBuf,
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

fn policy(policy: Policy, step: u32) -> Box<dyn MutationPolicy> {
    match policy {
        Policy::Iterations => Box::new(IncrementIterations { step }),
        Policy::Shrink => Box::new(ShrinkViewport),
        Policy::Both => Box::new(Both(IncrementIterations { step }, ShrinkViewport)),
        Policy::Fixed => Box::new(Fixed),
    }
}

fn run<F: Fractal>(fractal: F, command: Command) -> Result<(), Error> {
    match command {
        Command::Image(args) => {
            FrameSequencer::new(fractal, Ffmpeg::new()).render_image(&args.into())
        }
        Command::Video(args) => {
            let mut sequencer = FrameSequencer::new(fractal, Ffmpeg::with_program(args.ffmpeg))
                .with_policy(policy(args.policy, args.step))
                .with_frame_rate(args.frame_rate)
                .with_video_output(args.video_output);
            let video = VideoConfig {
                frames: args.frames,
                per_frame_delta: args.delta,
            };
            sequencer.render_video(&args.frame.into(), &video).map(|_| ())
        }
    }
}

fn accelerated(kind: DeviceKind, hold_device: bool) -> AcceleratedEngine<RgbaImageStore> {
    let engine = AcceleratedEngine::new(RgbaImageStore::new(), kind);
    if hold_device {
        engine.holding_device()
    } else {
        engine
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let cli = Cli::parse();

    let started = Instant::now();
    let result = match cli.engine {
        Engine::Sequential => run(SequentialEngine::new(RgbaImageStore::new()), cli.command),
        Engine::Cpu => run(accelerated(DeviceKind::Cpu, cli.hold_device), cli.command),
        Engine::Gpu => run(accelerated(DeviceKind::Gpu, cli.hold_device), cli.command),
    };
    if let Err(error) = &result {
        error!("stopped program because of {}", error);
    }

    let elapsed = started.elapsed();
    info!(
        "program took {} sec ({} ms)",
        elapsed.as_secs(),
        elapsed.as_millis()
    );
    result
}
