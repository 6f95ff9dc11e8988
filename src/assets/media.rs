use std::io::Read;
use std::process::{ChildStdout, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

use crate::assets::audio::AudioClip;
use crate::assets::clip::{ClipDecodeOpts, ClipFrames};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::motion::PAN_TRAVEL;

/// Sample rate of the mixed program audio.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Stream facts reported by `ffprobe` for a clip source.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Path or URL handed to ffmpeg.
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
}

impl VideoSourceInfo {
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Dimensions that cover `canvas` while keeping the source aspect ratio (rounded to even).
pub fn cover_dimensions(src_w: u32, src_h: u32, canvas: Canvas) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (canvas.width, canvas.height);
    }
    let scale = (f64::from(canvas.width) / f64::from(src_w))
        .max(f64::from(canvas.height) / f64::from(src_h));
    let even = |v: f64| -> u32 {
        let v = v.round().max(2.0) as u32;
        v + (v % 2)
    };
    (even(f64::from(src_w) * scale), even(f64::from(src_h) * scale))
}

/// How one clip is sampled, scaled and cropped before it enters the frame ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipDecodePlan {
    /// Ring sampling rate, never above the source rate.
    pub fps: u32,
    /// Cover-fit size the source is scaled to.
    pub scale_w: u32,
    pub scale_h: u32,
    /// Centred crop kept per frame: the canvas plus the horizontal pan margin.
    pub width: u32,
    pub height: u32,
    pub frames: u32,
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
impl ClipDecodePlan {
    /// Size the ring so it spans the whole clip, or as much of it as `ring_budget_bytes` holds.
    pub fn new(info: &VideoSourceInfo, canvas: Canvas, opts: &ClipDecodeOpts) -> ReelResult<Self> {
        if opts.decode_fps == 0 {
            return Err(ReelError::validation("clip decode_fps must be non-zero"));
        }
        let source_fps = info.source_fps();
        let fps = if source_fps.is_finite() && source_fps > 0.0 {
            opts.decode_fps.min(source_fps.ceil() as u32).max(1)
        } else {
            opts.decode_fps
        };

        let (scale_w, scale_h) = cover_dimensions(info.width, info.height, canvas);
        let pan = (PAN_TRAVEL * f64::from(canvas.width) / 720.0).ceil() as u32;
        let width = scale_w.min(canvas.width + pan);
        let height = scale_h.min(canvas.height);

        let frame_bytes = u64::from(width) * u64::from(height) * 4;
        let budget_frames = (opts.ring_budget_bytes / frame_bytes).max(1);
        let wanted = if info.duration_sec.is_finite() && info.duration_sec > 0.0 {
            (info.duration_sec * f64::from(fps)).ceil() as u64
        } else {
            budget_frames
        };
        if wanted > budget_frames {
            tracing::debug!(
                wanted,
                kept = budget_frames,
                "clip ring truncated to the byte budget"
            );
        }
        let frames = wanted.clamp(1, budget_frames).min(u64::from(u32::MAX)) as u32;

        Ok(Self {
            fps,
            scale_w,
            scale_h,
            width,
            height,
            frames,
        })
    }

    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// ffmpeg `-vf` chain; `crop` centres by default.
    pub fn filter(&self) -> String {
        format!(
            "fps={},scale={}:{},crop={}:{}",
            self.fps, self.scale_w, self.scale_h, self.width, self.height
        )
    }
}

/// Time left before `deadline`, or a decode error once it has passed.
pub(crate) fn remaining_until(deadline: Instant, what: &str) -> ReelResult<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(ReelError::asset_decode(format!(
            "{what} ran out of time before completing"
        )));
    }
    Ok(left)
}

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// stdout/stderr are drained on background threads so a chatty child cannot block on a full pipe.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn run_with_timeout(cmd: Command, timeout: Duration) -> ReelResult<Output> {
    let (status, stdout, stderr) = run_collecting(cmd, timeout, |mut pipe| {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })?;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Like [`run_with_timeout`], but stdout is consumed by `read_stdout` on the drain thread.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn run_collecting<T, F>(
    mut cmd: Command,
    timeout: Duration,
    read_stdout: F,
) -> ReelResult<(ExitStatus, T, Vec<u8>)>
where
    T: Default + Send + 'static,
    F: FnOnce(ChildStdout) -> T + Send + 'static,
{
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReelError::asset_decode(format!("failed to spawn {program}: {e}")))?;

    let stdout = child.stdout.take();
    let stdout_thread = std::thread::spawn(move || stdout.map(read_stdout).unwrap_or_default());
    let stderr = child.stderr.take();
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = stderr {
            let _ = p.read_to_end(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                // Grandchildren may still hold the pipes; leave the drain threads detached.
                return Err(ReelError::asset_decode(format!(
                    "{program} did not finish within {:.1}s",
                    timeout.as_secs_f64()
                )));
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                let _ = child.kill();
                return Err(ReelError::asset_decode(format!(
                    "failed waiting for {program}: {e}"
                )));
            }
        }
    };

    Ok((
        status,
        stdout_thread.join().unwrap_or_default(),
        stderr_thread.join().unwrap_or_default(),
    ))
}

/// Split a raw video stream into owned frames of `frame_len` bytes, keeping at most `max`.
///
/// A trailing partial frame is dropped; anything past `max` is drained and discarded.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn read_frames(mut pipe: impl Read, frame_len: usize, max: usize) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    if frame_len == 0 {
        return frames;
    }
    while frames.len() < max {
        let mut buf = vec![0u8; frame_len];
        if pipe.read_exact(&mut buf).is_err() {
            break;
        }
        frames.push(buf);
    }
    let _ = std::io::copy(&mut pipe, &mut std::io::sink());
    frames
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source: &str, timeout: Duration) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_streams",
        "-show_format",
    ])
    .arg(source);
    let out = run_with_timeout(cmd, timeout)?;
    if !out.status.success() {
        return Err(ReelError::asset_decode(format!(
            "ffprobe failed for '{source}': {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::asset_decode(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::asset_decode("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelError::asset_decode("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelError::asset_decode("missing video height from ffprobe"))?;
    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| ReelError::asset_decode("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoSourceInfo {
        source: source.to_string(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_source: &str, _timeout: Duration) -> ReelResult<VideoSourceInfo> {
    Err(ReelError::asset_decode(
        "clip assets require the 'media-ffmpeg' feature",
    ))
}

/// Decode a clip into a ring of premultiplied frames cropped to cover `canvas`.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_clip_frames(
    info: &VideoSourceInfo,
    canvas: Canvas,
    opts: &ClipDecodeOpts,
    timeout: Duration,
) -> ReelResult<ClipFrames> {
    use crate::assets::decode::PreparedImage;
    use crate::foundation::math::premultiply_rgba8_in_place;
    use std::sync::Arc;

    let plan = ClipDecodePlan::new(info, canvas, opts)?;
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"])
        .arg(&info.source)
        .args([
            "-an",
            "-vf",
            &plan.filter(),
            "-frames:v",
            &plan.frames.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ]);
    let frame_len = plan.frame_bytes();
    let max = plan.frames as usize;
    let (status, raw, stderr) =
        run_collecting(cmd, timeout, move |pipe| read_frames(pipe, frame_len, max))?;
    if !status.success() {
        return Err(ReelError::asset_decode(format!(
            "ffmpeg clip decode failed for '{}': {}",
            info.source,
            String::from_utf8_lossy(&stderr).trim()
        )));
    }
    if raw.is_empty() {
        return Err(ReelError::asset_decode(format!(
            "ffmpeg returned no clip frames for '{}'",
            info.source
        )));
    }

    let frames = raw
        .into_iter()
        .map(|mut rgba| {
            premultiply_rgba8_in_place(&mut rgba);
            PreparedImage {
                width: plan.width,
                height: plan.height,
                rgba8_premul: Arc::new(rgba),
            }
        })
        .collect::<Vec<_>>();
    ClipFrames::new(plan.fps, frames)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_clip_frames(
    _info: &VideoSourceInfo,
    _canvas: Canvas,
    _opts: &ClipDecodeOpts,
    _timeout: Duration,
) -> ReelResult<ClipFrames> {
    Err(ReelError::asset_decode(
        "clip assets require the 'media-ffmpeg' feature",
    ))
}

/// Decode any ffmpeg-readable audio file or URL into interleaved f32 at `sample_rate`.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_audio_f32(
    source: &str,
    sample_rate: u32,
    channels: u16,
    timeout: Duration,
) -> ReelResult<AudioClip> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"]).arg(source).args([
        "-vn",
        "-f",
        "f32le",
        "-acodec",
        "pcm_f32le",
        "-ac",
        &channels.to_string(),
        "-ar",
        &sample_rate.to_string(),
        "pipe:1",
    ]);
    let out = run_with_timeout(cmd, timeout)?;
    if !out.status.success() {
        return Err(ReelError::asset_decode(format!(
            "ffmpeg audio decode failed for '{source}': {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if out.stdout.is_empty() {
        return Err(ReelError::asset_decode(format!(
            "'{source}' holds no audio samples"
        )));
    }
    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::asset_decode(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let pcm = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect::<Vec<_>>();
    AudioClip::new(sample_rate, channels, pcm)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_audio_f32(
    _source: &str,
    _sample_rate: u32,
    _channels: u16,
    _timeout: Duration,
) -> ReelResult<AudioClip> {
    Err(ReelError::asset_decode(
        "encoded audio sources require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
