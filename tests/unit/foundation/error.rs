use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::asset_decode("x")
            .to_string()
            .contains("asset decode error:")
    );
    assert!(
        ReelError::unsupported_format("x")
            .to_string()
            .contains("unsupported output format:")
    );
    assert!(
        ReelError::capture("x")
            .to_string()
            .contains("capture failure:")
    );
    assert_eq!(ReelError::Cancelled.to_string(), "render cancelled");
}

#[test]
fn only_cancelled_reports_cancellation() {
    assert!(ReelError::Cancelled.is_cancelled());
    assert!(!ReelError::capture("boom").is_cancelled());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
