use super::*;

#[test]
fn cover_dimensions_fill_portrait_canvas() {
    let canvas = Canvas::PORTRAIT_720;
    // Landscape source: height drives the scale.
    let (w, h) = cover_dimensions(1920, 1080, canvas);
    assert_eq!(h, 1280);
    assert!(w >= 720 && w.is_multiple_of(2));
    // Tall source: width drives the scale.
    let (w, h) = cover_dimensions(360, 1000, canvas);
    assert_eq!(w, 720);
    assert!(h >= 1280 && h.is_multiple_of(2));
}

#[test]
fn cover_dimensions_handle_degenerate_source() {
    assert_eq!(cover_dimensions(0, 10, Canvas::PORTRAIT_720), (720, 1280));
}

fn source(
    width: u32,
    height: u32,
    fps_num: u32,
    fps_den: u32,
    duration_sec: f64,
) -> VideoSourceInfo {
    VideoSourceInfo {
        source: "a.mp4".to_string(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    }
}

#[test]
fn source_fps_guards_zero_den() {
    assert_eq!(source(2, 2, 30000, 0, 1.0).source_fps(), 0.0);
}

#[test]
fn clip_plan_crops_to_canvas_plus_pan_margin() {
    let plan = ClipDecodePlan::new(
        &source(1920, 1080, 30, 1, 3.0),
        Canvas::PORTRAIT_720,
        &ClipDecodeOpts::default(),
    )
    .unwrap();
    assert_eq!((plan.scale_w, plan.scale_h), (2276, 1280));
    assert_eq!((plan.width, plan.height), (780, 1280));
    assert_eq!(plan.frame_bytes(), 780 * 1280 * 4);
    assert_eq!(plan.filter(), "fps=24,scale=2276:1280,crop=780:1280");
    // The whole 3 s clip fits in the default budget.
    assert_eq!(plan.frames, 72);

    // A tall source is already narrower than the pan margin.
    let tall = ClipDecodePlan::new(
        &source(360, 1000, 24, 1, 1.0),
        Canvas::PORTRAIT_720,
        &ClipDecodeOpts::default(),
    )
    .unwrap();
    assert_eq!(tall.width, 720);
    assert_eq!(tall.height, 1280);
}

#[test]
fn clip_plan_spans_duration_under_byte_budget() {
    let canvas = Canvas::PORTRAIT_720;
    let frame = 780u64 * 1280 * 4;
    let opts = ClipDecodeOpts {
        ring_budget_bytes: 100 * frame,
        ..ClipDecodeOpts::default()
    };
    let short = ClipDecodePlan::new(&source(1920, 1080, 30, 1, 2.5), canvas, &opts).unwrap();
    assert_eq!(short.frames, 60);
    let long = ClipDecodePlan::new(&source(1920, 1080, 30, 1, 10.0), canvas, &opts).unwrap();
    assert_eq!(long.frames, 100);
    assert!(long.frames as u64 * long.frame_bytes() as u64 <= opts.ring_budget_bytes);

    // Unknown duration fills the budget; a tiny budget still keeps one frame.
    let unknown = ClipDecodePlan::new(&source(1920, 1080, 30, 1, 0.0), canvas, &opts).unwrap();
    assert_eq!(unknown.frames, 100);
    let starved = ClipDecodeOpts {
        ring_budget_bytes: 1,
        ..opts.clone()
    };
    let one = ClipDecodePlan::new(&source(1920, 1080, 30, 1, 10.0), canvas, &starved).unwrap();
    assert_eq!(one.frames, 1);
}

#[test]
fn clip_plan_never_samples_above_source_rate() {
    let opts = ClipDecodeOpts {
        decode_fps: 60,
        ..ClipDecodeOpts::default()
    };
    let ntsc = ClipDecodePlan::new(
        &source(1280, 720, 30000, 1001, 1.0),
        Canvas::PORTRAIT_720,
        &opts,
    )
    .unwrap();
    assert_eq!(ntsc.fps, 30);
    assert_eq!(ntsc.frames, 30);
    let unknown_rate =
        ClipDecodePlan::new(&source(1280, 720, 0, 1, 1.0), Canvas::PORTRAIT_720, &opts).unwrap();
    assert_eq!(unknown_rate.fps, 60);

    let zero = ClipDecodeOpts {
        decode_fps: 0,
        ..ClipDecodeOpts::default()
    };
    assert!(matches!(
        ClipDecodePlan::new(&source(2, 2, 24, 1, 1.0), Canvas::PORTRAIT_720, &zero),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn read_frames_yields_owned_whole_frames() {
    let bytes: Vec<u8> = (0..10).collect();
    let frames = read_frames(std::io::Cursor::new(bytes.clone()), 4, 8);
    assert_eq!(frames, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);

    let capped = read_frames(std::io::Cursor::new(bytes), 4, 1);
    assert_eq!(capped, vec![vec![0, 1, 2, 3]]);
    assert!(read_frames(std::io::empty(), 4, 8).is_empty());
}

#[test]
fn remaining_until_fails_once_deadline_passes() {
    let left = remaining_until(Instant::now() + Duration::from_secs(5), "clip decode").unwrap();
    assert!(left > Duration::from_secs(4) && left <= Duration::from_secs(5));

    let past = Instant::now();
    std::thread::sleep(Duration::from_millis(2));
    assert!(matches!(
        remaining_until(past, "clip decode"),
        Err(ReelError::AssetDecode(_))
    ));
}

#[cfg(unix)]
#[test]
fn run_with_timeout_collects_output() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "printf hello; printf oops 1>&2"]);
    let out = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
    assert!(out.status.success());
    assert_eq!(out.stdout, b"hello");
    assert_eq!(out.stderr, b"oops");
}

#[cfg(unix)]
#[test]
fn run_with_timeout_kills_slow_children() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "exec sleep 5"]);
    let started = Instant::now();
    let err = run_with_timeout(cmd, Duration::from_millis(100)).unwrap_err();
    assert!(matches!(err, ReelError::AssetDecode(_)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[test]
fn run_collecting_hands_stdout_to_reader() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "printf abcdefg"]);
    let (status, frames, _) =
        run_collecting(cmd, Duration::from_secs(5), |pipe| read_frames(pipe, 3, 8)).unwrap();
    assert!(status.success());
    assert_eq!(frames, vec![b"abc".to_vec(), b"def".to_vec()]);
}

#[test]
fn missing_program_is_a_decode_error() {
    let cmd = Command::new("adreel-definitely-not-a-real-binary");
    assert!(matches!(
        run_with_timeout(cmd, Duration::from_secs(1)),
        Err(ReelError::AssetDecode(_))
    ));
}
