//! Video encoding through an external ffmpeg process.
//!
//! Frames are streamed to ffmpeg's stdin as raw RGB24. The encoded file is
//! written to a hidden temporary file next to the requested output.
//! Finishing the encoder yields a [`StagedVideo`]; the file only appears at
//! the output path when that is committed, so a failed or interrupted job
//! never leaves a video at the output path.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tempfile::TempPath;

use crate::schema::EncoderSettings;

/// Encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Failed to start encoder {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Encoder exited with {status}: {stderr}")]
    Rejected { status: ExitStatus, stderr: String },
    #[error("Encoder input stream closed: {0}")]
    Pipe(#[source] io::Error),
    #[error("Frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
    #[error("Encoder I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Geometry and destination of one encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub width: usize,
    pub height: usize,
    pub fps: f64,
    pub output: PathBuf,
}

impl EncodeRequest {
    /// Bytes in one RGB24 frame.
    pub fn frame_len(&self) -> usize {
        self.width * self.height * 3
    }
}

/// A finished encode that is not yet visible at its destination.
pub trait StagedOutput {
    /// What committing produces.
    type Committed;

    /// Publish the result. Dropping without committing discards it.
    fn commit(self) -> Result<Self::Committed, EncodeError>;
}

/// Sink for composed RGB24 frames.
pub trait VideoEncoder {
    /// What a successful encode produces.
    type Output: StagedOutput;

    /// Append one frame of `width * height * 3` bytes.
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), EncodeError>;

    /// Number of frames accepted so far.
    fn frames_written(&self) -> usize;

    /// Flush and finalize into a staged result. Dropping an encoder without
    /// calling this discards everything written.
    fn finish(self) -> Result<Self::Output, EncodeError>;
}

/// Encoded video waiting in its temporary file.
#[derive(Debug)]
pub struct StagedVideo {
    staged: TempPath,
    output: PathBuf,
    frames: usize,
}

impl StagedVideo {
    /// Where [`commit`](StagedOutput::commit) will move the video.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl StagedOutput for StagedVideo {
    type Committed = PathBuf;

    fn commit(self) -> Result<PathBuf, EncodeError> {
        self.staged
            .persist(&self.output)
            .map_err(|e| EncodeError::Io(e.error))?;
        log::info!("Wrote {} frames to {}", self.frames, self.output.display());
        Ok(self.output)
    }
}

/// Encoder backed by an ffmpeg child process.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    staged: Option<TempPath>,
    output: PathBuf,
    frame_len: usize,
    frames: usize,
}

impl FfmpegEncoder {
    /// Start ffmpeg for `request`, creating the output's parent directory.
    pub fn spawn(settings: &EncoderSettings, request: &EncodeRequest) -> Result<Self, EncodeError> {
        let parent = match request.output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let ext = request
            .output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let staged = tempfile::Builder::new()
            .prefix(".automata-")
            .suffix(&format!(".{ext}"))
            .tempfile_in(&parent)?
            .into_temp_path();

        let mut cmd = Command::new(&settings.ffmpeg);
        cmd.args(ffmpeg_args(settings, request, &staged))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        log::debug!("Running {} {:?}", settings.ffmpeg, cmd.get_args().collect::<Vec<_>>());

        let mut child = cmd.spawn().map_err(|source| EncodeError::Spawn {
            program: settings.ffmpeg.clone(),
            source,
        })?;

        // Drain stderr concurrently so a chatty encoder can't block on a full pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Self {
            stdin: child.stdin.take(),
            child,
            stderr,
            staged: Some(staged),
            output: request.output.clone(),
            frame_len: request.frame_len(),
            frames: 0,
        })
    }

    /// Wait for ffmpeg and turn a non-zero exit into [`EncodeError::Rejected`].
    fn wait(&mut self) -> Result<(), EncodeError> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(EncodeError::Rejected {
                status,
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

impl VideoEncoder for FfmpegEncoder {
    type Output = StagedVideo;

    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), EncodeError> {
        if rgb.len() != self.frame_len {
            return Err(EncodeError::FrameSize {
                expected: self.frame_len,
                actual: rgb.len(),
            });
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EncodeError::Pipe(io::ErrorKind::BrokenPipe.into()));
        };
        if let Err(err) = stdin.write_all(rgb) {
            // ffmpeg closed its input; its exit status says why.
            self.wait()?;
            return Err(EncodeError::Pipe(err));
        }
        self.frames += 1;
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.frames
    }

    fn finish(mut self) -> Result<StagedVideo, EncodeError> {
        self.wait()?;
        let staged = self
            .staged
            .take()
            .ok_or_else(|| EncodeError::Io(io::Error::other("encoder output already taken")))?;
        Ok(StagedVideo {
            staged,
            output: self.output.clone(),
            frames: self.frames,
        })
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        // `staged` removes the temporary file when dropped.
    }
}

fn ffmpeg_args(settings: &EncoderSettings, request: &EncodeRequest, staged: &Path) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(format!("{}x{}", request.width, request.height));
    args.extend(["-r".into(), request.fps.to_string(), "-i".into(), "-".into()]);
    args.extend([
        "-c:v".into(),
        settings.codec.clone(),
        "-preset".into(),
        settings.preset.clone(),
        "-crf".into(),
        settings.crf.to_string(),
        "-pix_fmt".into(),
        settings.pixel_format.clone(),
    ]);
    if settings.max_bitrate_kbps > 0 {
        args.extend([
            "-maxrate".into(),
            format!("{}k", settings.max_bitrate_kbps),
            "-bufsize".into(),
            format!("{}k", settings.max_bitrate_kbps * 2),
        ]);
    }
    args.extend([
        "-movflags".into(),
        "+faststart".into(),
        "-metadata".into(),
        format!("artist={}", settings.artist),
    ]);
    args.push(staged.to_string_lossy().into_owned());
    args
}
