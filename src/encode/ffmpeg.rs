use std::fs::File;
use std::io::{BufWriter, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::OnceLock;

use crate::audio::mix::f32le_bytes;
use crate::encode::format::{AudioCodec, Container, OutputFormat, VideoCodec};
use crate::encode::sink::{MediaSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    /// Directory for intermediate video/audio files; the system temp dir when `None`.
    pub work_dir: Option<PathBuf>,
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            bg_rgba: [0, 0, 0, 255],
            video_bitrate_kbps: 12_000,
            audio_bitrate_kbps: 192,
            work_dir: None,
        }
    }
}

/// Removes its file when dropped.
struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

struct Recording {
    cfg: SinkConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    video_tmp: TempFileGuard,
    audio_tmp: TempFileGuard,
    audio_out: Option<BufWriter<File>>,
    audio_samples: u64,
    scratch: Vec<u8>,
    last_idx: Option<FrameIndex>,
}

/// Sink that streams raw frames into a system `ffmpeg` encoder, spools program audio to a temp
/// `f32le` file, and muxes both into the negotiated container on `finish`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    rec: Option<Recording>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self { opts, rec: None }
    }

    fn temp_path(&self, tag: &str, ext: &str) -> PathBuf {
        let dir = self
            .opts
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        dir.join(format!(
            "adreel_{tag}_{}_{}.{ext}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ))
    }
}

impl MediaSink for FfmpegSink {
    fn supports(&self, format: &OutputFormat) -> bool {
        if !format.is_muxable() {
            return false;
        }
        let Some(encoders) = ffmpeg_encoders() else {
            return false;
        };
        let has = |name: &str| encoders.iter().any(|e| e == name);
        let video = match format.video {
            VideoCodec::H264 => has("libx264"),
            VideoCodec::Vp9 => has("libvpx-vp9"),
        };
        let audio = match format.audio {
            AudioCodec::Aac => has("aac"),
            AudioCodec::Opus => has("libopus"),
        };
        video && audio
    }

    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if cfg.audio.sample_rate == 0 || cfg.audio.channels == 0 {
            return Err(ReelError::validation(
                "audio sample_rate and channels must be non-zero",
            ));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::capture(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }
        if self.rec.is_some() {
            self.abort();
        }

        let video_tmp = TempFileGuard(Some(self.temp_path("video", cfg.format.extension())));
        let audio_tmp = TempFileGuard(Some(self.temp_path("audio", "f32le")));
        let (Some(video_path), Some(audio_path)) = (video_tmp.path(), audio_tmp.path()) else {
            return Err(ReelError::capture("temp paths missing (unexpected)"));
        };
        ensure_parent_dir(video_path)?;

        let audio_out = File::create(audio_path).map(BufWriter::new).map_err(|e| {
            ReelError::capture(format!(
                "failed to create audio spool '{}': {e}",
                audio_path.display()
            ))
        })?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input: raw premultiplied RGBA8 frames. `ffmpeg` does not understand premul, so we
        // flatten alpha before writing to stdin (push_frame).
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"]);
        cmd.args(video_codec_args(cfg.format.video, self.opts.video_bitrate_kbps));
        cmd.arg(video_path);

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::capture(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::capture("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::capture("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(format = %cfg.format, width = cfg.width, height = cfg.height, "ffmpeg encoder started");
        self.rec = Some(Recording {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            video_tmp,
            audio_tmp,
            audio_out: Some(audio_out),
            audio_samples: 0,
            last_idx: None,
        });
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let bg = self.opts.bg_rgba;
        let rec = self
            .rec
            .as_mut()
            .ok_or_else(|| ReelError::capture("ffmpeg sink not started"))?;
        if let Some(last) = rec.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::capture(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        rec.last_idx = Some(idx);

        if frame.width != rec.cfg.width || frame.height != rec.cfg.height {
            return Err(ReelError::capture(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, rec.cfg.width, rec.cfg.height
            )));
        }
        flatten_premul_over_bg_to_opaque_rgba8(&mut rec.scratch, &frame.data, bg)?;

        let Some(stdin) = rec.stdin.as_mut() else {
            return Err(ReelError::capture("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&rec.scratch).map_err(|e| {
            ReelError::capture(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> ReelResult<()> {
        let rec = self
            .rec
            .as_mut()
            .ok_or_else(|| ReelError::capture("ffmpeg sink not started"))?;
        let Some(out) = rec.audio_out.as_mut() else {
            return Err(ReelError::capture("ffmpeg sink is already finalized"));
        };
        out.write_all(&f32le_bytes(samples))
            .map_err(|e| ReelError::capture(format!("failed to spool audio: {e}")))?;
        rec.audio_samples += samples.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<Vec<u8>> {
        let mut rec = self
            .rec
            .take()
            .ok_or_else(|| ReelError::capture("ffmpeg sink not started"))?;

        drop(rec.stdin.take());
        let status = rec.child.wait().map_err(|e| {
            ReelError::capture(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match rec.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::capture("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::capture(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::capture(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if let Some(mut out) = rec.audio_out.take() {
            out.flush()
                .map_err(|e| ReelError::capture(format!("failed to flush audio spool: {e}")))?;
        }

        let muxed = TempFileGuard(Some(self.temp_path("muxed", rec.cfg.format.extension())));
        let (Some(video_path), Some(audio_path), Some(muxed_path)) =
            (rec.video_tmp.path(), rec.audio_tmp.path(), muxed.path())
        else {
            return Err(ReelError::capture("temp paths missing (unexpected)"));
        };

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-loglevel", "error", "-i"]).arg(video_path);
        if rec.audio_samples > 0 {
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &rec.cfg.audio.sample_rate.to_string(),
                "-ac",
                &rec.cfg.audio.channels.to_string(),
                "-i",
            ])
            .arg(audio_path)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy"])
            .args(audio_codec_args(rec.cfg.format.audio, self.opts.audio_bitrate_kbps));
        } else {
            cmd.args(["-c:v", "copy", "-an"]);
        }
        if rec.cfg.format.container == Container::Mp4 {
            cmd.args(["-movflags", "+faststart"]);
        }
        cmd.arg(muxed_path);

        let out = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ReelError::capture(format!("failed to run ffmpeg mux: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::capture(format!(
                "ffmpeg mux failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        let bytes = std::fs::read(muxed_path).map_err(|e| {
            ReelError::capture(format!(
                "failed to read muxed output '{}': {e}",
                muxed_path.display()
            ))
        })?;
        tracing::debug!(bytes = bytes.len(), "ffmpeg mux finished");
        Ok(bytes)
    }

    fn abort(&mut self) {
        if let Some(mut rec) = self.rec.take() {
            drop(rec.stdin.take());
            drop(rec.audio_out.take());
            let _ = rec.child.kill();
            let _ = rec.child.wait();
            if let Some(handle) = rec.stderr_drain.take() {
                let _ = handle.join();
            }
            tracing::debug!("ffmpeg encoder aborted");
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, use `-r` before `-i` to specify the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn video_codec_args(codec: VideoCodec, kbps: u32) -> Vec<String> {
    let rate = format!("{kbps}k");
    let codec = match codec {
        VideoCodec::H264 => "libx264",
        VideoCodec::Vp9 => "libvpx-vp9",
    };
    ["-c:v", codec, "-pix_fmt", "yuv420p", "-b:v", rate.as_str()]
        .map(String::from)
        .to_vec()
}

fn audio_codec_args(codec: AudioCodec, kbps: u32) -> Vec<String> {
    let rate = format!("{kbps}k");
    let codec = match codec {
        AudioCodec::Aac => "aac",
        AudioCodec::Opus => "libopus",
    };
    ["-c:a", codec, "-b:a", rate.as_str()].map(String::from).to_vec()
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::capture(
            "frame.data size mismatch with width*height*4",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

/// Encoder names reported by `ffmpeg -encoders`, probed once per process.
fn ffmpeg_encoders() -> Option<&'static [String]> {
    static ENCODERS: OnceLock<Option<Vec<String>>> = OnceLock::new();
    ENCODERS
        .get_or_init(|| {
            let out = Command::new("ffmpeg")
                .args(["-hide_banner", "-encoders"])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .ok()?;
            out.status
                .success()
                .then(|| parse_encoder_list(&String::from_utf8_lossy(&out.stdout)))
        })
        .as_deref()
}

/// Extract encoder names from `ffmpeg -encoders` output (lines like ` V....D libx264  ...`).
fn parse_encoder_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            let is_flags = flags.len() == 6
                && flags.starts_with(['V', 'A', 'S'])
                && flags.chars().all(|c| c == '.' || c.is_ascii_alphabetic());
            (is_flags && name != "=").then(|| name.to_string())
        })
        .collect()
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
