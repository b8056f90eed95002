//! Assembling rendered frames into a video.

use std::{
    ffi::OsString,
    path::PathBuf,
    process::{Command, Stdio},
};

use log::debug;

use crate::error::{Error, Result};

/// What the encoder is asked to do, spelled out in full.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeRequest {
    pub frame_rate: u32,
    /// A `printf`-style pattern such as `out/ms_%d.png`.
    pub input_pattern: String,
    pub output: PathBuf,
}

pub trait VideoEncoder {
    /// Runs to completion and returns the encoder's diagnostic output.
    fn encode(&mut self, request: &EncodeRequest) -> Result<String>;
}

/// Runs an `ffmpeg` executable.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    /// `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Ffmpeg {
            program: program.into(),
        }
    }

    pub fn arguments(&self, request: &EncodeRequest) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-r".into(),
            request.frame_rate.to_string().into(),
            "-i".into(),
            request.input_pattern.clone().into(),
            request.output.clone().into_os_string(),
        ]
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoder for Ffmpeg {
    fn encode(&mut self, request: &EncodeRequest) -> Result<String> {
        let arguments = self.arguments(request);
        debug!("running {} {:?}", self.program.display(), arguments);

        let output = Command::new(&self.program)
            .args(&arguments)
            .stdin(Stdio::null())
            .output()
            .map_err(|error| Error::EncodingFailed {
                status: format!("could not start {}", self.program.display()),
                output: error.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("output from process: {}", stdout);

        if !output.status.success() {
            return Err(Error::EncodingFailed {
                status: output.status.to_string(),
                output: format!("{}{}", stdout, String::from_utf8_lossy(&output.stderr)),
            });
        }
        Ok(stdout)
    }
}
