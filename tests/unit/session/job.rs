use super::*;

const MANIFEST: &str = r#"{
  "scenes": [
    { "visual": { "image": "shots/01.png" }, "narration": { "pcm16_file": "vo/01.pcm" } },
    { "visual": { "clip": "https://cdn.adreel.test/02.mp4" } },
    { "visual": { "image": "data:image/png;base64,AAAA" },
      "narration": { "pcm16_base64": "AAEAAQ==", "sample_rate": 16000 } }
  ],
  "music": { "file": "music/bed.mp3" },
  "settings": { "music_volume": 0.3, "fps": 30, "ducking": "merged" }
}"#;

#[test]
fn settings_default_every_field() {
    let job = AdJob::from_reader(r#"{"scenes":[{"visual":{"image":"a.png"}}]}"#.as_bytes()).unwrap();
    assert_eq!(job.settings, RenderSettings::default());
    assert_eq!(job.settings.canvas().unwrap(), Canvas::PORTRAIT_720);
    assert_eq!(job.settings.fps().unwrap(), Fps { num: 60, den: 1 });
    assert_eq!(job.settings.lead_in(), LEAD_IN);
    assert!(job.music.is_none());
}

#[test]
fn partial_settings_keep_other_defaults() {
    let job = AdJob::from_reader(MANIFEST.as_bytes()).unwrap();
    assert_eq!(job.settings.fps, 30);
    assert_eq!(job.settings.width, 720);
    assert_eq!(job.settings.ducking, DuckingPolicy::Merged);
    assert_eq!(job.settings.mix_opts().ducking, DuckingPolicy::Merged);
    assert_eq!(job.settings.clip, ClipDecodeOpts::default());
}

#[test]
fn relative_paths_resolve_against_manifest_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.json");
    std::fs::write(&path, MANIFEST).unwrap();

    let job = AdJob::from_path(&path).unwrap();
    let inputs = job.scene_inputs().unwrap();
    assert_eq!(inputs.len(), 3);
    assert_eq!(
        inputs[0].visual,
        VisualAsset::image(dir.path().join("shots/01.png").to_string_lossy())
    );
    assert_eq!(
        inputs[0].narration,
        Some(AudioPayload::Pcm16File {
            path: dir.path().join("vo/01.pcm"),
            sample_rate: NARRATION_SAMPLE_RATE,
            channels: 1,
        })
    );
    assert_eq!(
        inputs[1].visual,
        VisualAsset::clip("https://cdn.adreel.test/02.mp4")
    );
    assert!(inputs[2].visual.source.starts_with("data:image/png"));
    assert_eq!(
        inputs[2].narration,
        Some(AudioPayload::Pcm16 {
            bytes: vec![0, 1, 0, 1],
            sample_rate: 16_000,
            channels: 1,
        })
    );

    let music = job.music_payload().unwrap().unwrap();
    assert_eq!(
        music,
        AudioPayload::Encoded(dir.path().join("music/bed.mp3").to_string_lossy().into_owned())
    );
}

#[test]
fn audio_reference_needs_exactly_one_source() {
    let none: AudioSource = serde_json::from_str(r#"{"sample_rate": 24000}"#).unwrap();
    assert!(matches!(
        none.to_payload(Path::new(".")),
        Err(ReelError::Validation(_))
    ));
    let two: AudioSource =
        serde_json::from_str(r#"{"file": "a.wav", "url": "https://x/y.mp3"}"#).unwrap();
    assert!(matches!(
        two.to_payload(Path::new(".")),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn undecodable_inline_narration_is_dropped() {
    let job = AdJob::from_reader(
        r#"{"scenes":[{"visual":{"image":"a.png"},"narration":{"pcm16_base64":"%%%"}}]}"#
            .as_bytes(),
    )
    .unwrap();
    let inputs = job.scene_inputs().unwrap();
    assert!(inputs[0].narration.is_none());
}

#[test]
fn absolute_paths_and_urls_pass_through() {
    let mut job = AdJob::from_reader(
        r#"{"scenes":[{"visual":{"image":"/srv/a.png"}}],"music":{"url":"https://x/bed.mp3"}}"#
            .as_bytes(),
    )
    .unwrap();
    job.base_dir = PathBuf::from("/jobs/42");
    assert_eq!(job.scene_inputs().unwrap()[0].visual.source, "/srv/a.png");
    assert_eq!(
        job.music_payload().unwrap(),
        Some(AudioPayload::Encoded("https://x/bed.mp3".to_owned()))
    );
}

#[test]
fn malformed_manifests_are_validation_errors() {
    for bad in [
        r#"{"scenes":[]}"#,
        r#"{"scenes":[{"visual":{"image":"a.png"}}],"extra":1}"#,
        r#"{"scenes":[{"visual":{"gif":"a.gif"}}]}"#,
        "not json",
    ] {
        assert!(
            matches!(AdJob::from_reader(bad.as_bytes()), Err(ReelError::Validation(_))),
            "{bad}"
        );
    }
    assert!(AdJob::from_path("/definitely/missing/job.json").is_err());
}

#[test]
fn invalid_settings_are_rejected() {
    let odd = RenderSettings {
        width: 721,
        ..RenderSettings::default()
    };
    assert!(odd.canvas().is_err());
    assert!(odd.resolver_opts().is_err());
    let zero = RenderSettings {
        fps: 0,
        ..RenderSettings::default()
    };
    assert!(zero.fps().is_err());
}
