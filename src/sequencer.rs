//! Rendering frame sequences for video.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use log::{debug, info};

use crate::{
    config::{FrameConfig, VideoConfig},
    encoder::{EncodeRequest, VideoEncoder},
    error::{invalid, Result},
    fractal::Fractal,
};

pub const DEFAULT_FRAME_RATE: u32 = 30;
pub const DEFAULT_VIDEO_OUTPUT: &str = "out.mp4";

/// How a frame's configuration changes on the way to the next frame.
pub trait MutationPolicy {
    fn advance(&self, config: &mut FrameConfig, video: &VideoConfig);
}

impl<M: MutationPolicy + ?Sized> MutationPolicy for Box<M> {
    fn advance(&self, config: &mut FrameConfig, video: &VideoConfig) {
        (**self).advance(config, video)
    }
}

/// Every frame is the same.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fixed;

impl MutationPolicy for Fixed {
    fn advance(&self, _config: &mut FrameConfig, _video: &VideoConfig) {}
}

/// Raises the iteration budget by `step` per frame.
#[derive(Clone, Copy, Debug)]
pub struct IncrementIterations {
    pub step: u32,
}

impl MutationPolicy for IncrementIterations {
    fn advance(&self, config: &mut FrameConfig, _video: &VideoConfig) {
        config.max_iterations = config.max_iterations.saturating_add(self.step);
    }
}

/// Zooms in about the viewport's centre by `per_frame_delta` on each real bound.
///
/// The imaginary bound moves by the same delta scaled to the frame's aspect
/// ratio, so the derived top bound comes down by as much as the bottom goes up.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShrinkViewport;

impl MutationPolicy for ShrinkViewport {
    fn advance(&self, config: &mut FrameConfig, video: &VideoConfig) {
        let delta = video.per_frame_delta;
        config.min_re += delta;
        config.max_re -= delta;
        config.min_im += delta * config.height as f64 / config.width as f64;
    }
}

/// Applies `A`, then `B`.
#[derive(Clone, Copy, Debug)]
pub struct Both<A, B>(pub A, pub B);

impl<A: MutationPolicy, B: MutationPolicy> MutationPolicy for Both<A, B> {
    fn advance(&self, config: &mut FrameConfig, video: &VideoConfig) {
        self.0.advance(config, video);
        self.1.advance(config, video);
    }
}

pub struct FrameSequencer<F, E> {
    fractal: F,
    encoder: E,
    policy: Box<dyn MutationPolicy>,
    frame_rate: u32,
    video_output: PathBuf,
}

impl<F: Fractal, E: VideoEncoder> FrameSequencer<F, E> {
    /// Raises the iteration budget by one per frame unless told otherwise.
    pub fn new(fractal: F, encoder: E) -> Self {
        FrameSequencer {
            fractal,
            encoder,
            policy: Box::new(IncrementIterations { step: 1 }),
            frame_rate: DEFAULT_FRAME_RATE,
            video_output: PathBuf::from(DEFAULT_VIDEO_OUTPUT),
        }
    }

    pub fn with_policy(mut self, policy: impl MutationPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_video_output(mut self, video_output: impl Into<PathBuf>) -> Self {
        self.video_output = video_output.into();
        self
    }

    pub fn fractal(&self) -> &F {
        &self.fractal
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn render_image(&mut self, config: &FrameConfig) -> Result<()> {
        config.split_name()?;
        create_output_directory(&config.name)?;
        self.render_single_frame(config)
    }

    /// Renders `video.frames` frames named `<prefix>_<index>.<ext>`, then
    /// encodes them. Returns the frame paths in order.
    pub fn render_video(&mut self, base: &FrameConfig, video: &VideoConfig) -> Result<Vec<PathBuf>> {
        if video.frames == 0 {
            return Err(invalid("a video needs at least one frame"));
        }
        let input_pattern = base.frame_pattern()?;
        create_output_directory(&base.name)?;

        let started = Instant::now();
        let mut config = base.clone();
        let mut frames = Vec::with_capacity(video.frames);
        for frame in 0..video.frames {
            config.name = base.frame_name(frame)?;
            self.render_single_frame(&config)?;
            frames.push(PathBuf::from(&config.name));

            self.policy.advance(&mut config, video);
        }
        info!(
            "{} frames took {} ms",
            video.frames,
            started.elapsed().as_millis()
        );

        debug!("rendering video {}", self.video_output.display());
        let output = self.encoder.encode(&EncodeRequest {
            frame_rate: self.frame_rate,
            input_pattern,
            output: self.video_output.clone(),
        })?;
        debug!("output from encoder: {}", output);

        Ok(frames)
    }

    fn render_single_frame(&mut self, config: &FrameConfig) -> Result<()> {
        let started = Instant::now();

        self.fractal
            .init_frame(config.width, config.height, config.max_iterations)?;
        self.fractal
            .render_frame(config.min_re, config.max_re, config.min_im)?;
        self.fractal.save_frame(Path::new(&config.name))?;

        let elapsed = started.elapsed();
        info!(
            "frame {} generation took {} sec ({} ms)",
            config.name,
            elapsed.as_secs(),
            elapsed.as_millis()
        );
        Ok(())
    }
}

/// Creates the directory an output name points into, if it has one.
fn create_output_directory(name: &str) -> Result<()> {
    if let Some(directory) = Path::new(name).parent() {
        if !directory.as_os_str().is_empty() {
            fs::create_dir_all(directory)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// Records every call instead of rendering.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        frames: Vec<(u32, f64, f64, f64)>,
        max_iterations: u32,
    }

    impl Fractal for Recorder {
        fn init_frame(&mut self, width: u32, height: u32, max_iterations: u32) -> Result<()> {
            self.calls.push(format!("init {}x{}", width, height));
            self.max_iterations = max_iterations;
            Ok(())
        }

        fn render_frame(&mut self, min_re: f64, max_re: f64, min_im: f64) -> Result<()> {
            self.calls.push("render".into());
            self.frames.push((self.max_iterations, min_re, max_re, min_im));
            Ok(())
        }

        fn save_frame(&mut self, name: &Path) -> Result<()> {
            self.calls.push(format!("save {}", name.display()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeEncoder {
        requests: Vec<EncodeRequest>,
        fail: bool,
    }

    impl VideoEncoder for FakeEncoder {
        fn encode(&mut self, request: &EncodeRequest) -> Result<String> {
            self.requests.push(request.clone());
            if self.fail {
                Err(Error::EncodingFailed {
                    status: "exit status: 1".into(),
                    output: String::new(),
                })
            } else {
                Ok("done".into())
            }
        }
    }

    fn base() -> FrameConfig {
        FrameConfig {
            width: 40,
            height: 20,
            max_iterations: 30,
            min_re: -2.0,
            max_re: 1.0,
            min_im: -1.0,
            name: "ms.png".into(),
        }
    }

    fn video(frames: usize) -> VideoConfig {
        VideoConfig {
            frames,
            per_frame_delta: 0.25,
        }
    }

    #[test]
    fn names_frames_and_encodes_once() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default());
        let frames = sequencer.render_video(&base(), &video(3)).unwrap();

        assert_eq!(
            frames,
            vec![
                PathBuf::from("ms_0.png"),
                PathBuf::from("ms_1.png"),
                PathBuf::from("ms_2.png")
            ]
        );
        assert_eq!(
            sequencer.fractal().calls,
            [
                "init 40x20",
                "render",
                "save ms_0.png",
                "init 40x20",
                "render",
                "save ms_1.png",
                "init 40x20",
                "render",
                "save ms_2.png",
            ]
        );
        assert_eq!(
            sequencer.encoder().requests,
            [EncodeRequest {
                frame_rate: DEFAULT_FRAME_RATE,
                input_pattern: "ms_%d.png".into(),
                output: PathBuf::from(DEFAULT_VIDEO_OUTPUT),
            }]
        );
    }

    #[test]
    fn iterations_increase_by_the_step() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default())
            .with_policy(IncrementIterations { step: 5 });
        sequencer.render_video(&base(), &video(3)).unwrap();

        let iterations: Vec<u32> = sequencer.fractal().frames.iter().map(|f| f.0).collect();
        assert_eq!(iterations, [30, 35, 40]);
    }

    #[test]
    fn shrinking_keeps_the_viewport_centred() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default())
            .with_policy(ShrinkViewport);
        sequencer.render_video(&base(), &video(2)).unwrap();

        let frames = &sequencer.fractal().frames;
        assert_eq!(frames[0], (30, -2.0, 1.0, -1.0));
        assert_eq!(frames[1], (30, -1.75, 0.75, -0.875));

        let centre = |(_, min_re, max_re, min_im): (u32, f64, f64, f64)| {
            let max_im = crate::config::derive_max_im(40, 20, min_re, max_re, min_im);
            ((min_re + max_re) / 2.0, (min_im + max_im) / 2.0)
        };
        assert_eq!(centre(frames[0]), centre(frames[1]));
    }

    #[test]
    fn both_policies_apply() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default())
            .with_policy(Both(IncrementIterations { step: 2 }, ShrinkViewport));
        sequencer.render_video(&base(), &video(2)).unwrap();
        assert_eq!(sequencer.fractal().frames[1], (32, -1.75, 0.75, -0.875));
    }

    #[test]
    fn fixed_policy_repeats_the_frame() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default())
            .with_policy(Fixed);
        sequencer.render_video(&base(), &video(2)).unwrap();
        let frames = &sequencer.fractal().frames;
        assert_eq!(frames[0], frames[1]);
    }

    #[test]
    fn name_without_extension_renders_nothing() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default());
        let base = FrameConfig {
            name: "ms".into(),
            ..base()
        };
        assert!(matches!(
            sequencer.render_video(&base, &video(3)),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(sequencer.fractal().calls.is_empty());
        assert!(sequencer.encoder().requests.is_empty());
    }

    #[test]
    fn image_name_without_extension_renders_nothing() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default());
        let config = FrameConfig {
            name: "ms".into(),
            ..base()
        };
        assert!(matches!(
            sequencer.render_image(&config),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(sequencer.fractal().calls.is_empty());
    }

    #[test]
    fn render_image_creates_the_output_directory() {
        let directory = tempfile::tempdir().unwrap();
        let name = directory.path().join("out").join("ms.png");
        let config = FrameConfig {
            name: name.display().to_string(),
            ..base()
        };

        let mut sequencer = FrameSequencer::new(
            crate::SequentialEngine::new(crate::RgbaImageStore::new()),
            FakeEncoder::default(),
        );
        sequencer.render_image(&config).unwrap();

        let image = image::open(&name).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (40, 20));
        assert!(sequencer.encoder().requests.is_empty());
    }

    #[test]
    fn zero_frames_is_invalid() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default());
        assert!(matches!(
            sequencer.render_video(&base(), &video(0)),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn encoder_failure_surfaces_after_every_frame() {
        let encoder = FakeEncoder {
            fail: true,
            ..FakeEncoder::default()
        };
        let mut sequencer = FrameSequencer::new(Recorder::default(), encoder)
            .with_frame_rate(24)
            .with_video_output("zoom.mp4");
        assert!(matches!(
            sequencer.render_video(&base(), &video(2)),
            Err(Error::EncodingFailed { .. })
        ));
        assert_eq!(sequencer.fractal().frames.len(), 2);
        assert_eq!(sequencer.encoder().requests[0].frame_rate, 24);
        assert_eq!(sequencer.encoder().requests[0].output, PathBuf::from("zoom.mp4"));
    }

    #[test]
    fn render_image_is_a_single_frame() {
        let mut sequencer = FrameSequencer::new(Recorder::default(), FakeEncoder::default());
        sequencer.render_image(&base()).unwrap();
        assert_eq!(sequencer.fractal().calls, ["init 40x20", "render", "save ms.png"]);
        assert!(sequencer.encoder().requests.is_empty());
    }
}
