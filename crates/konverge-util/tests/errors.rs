use konverge_util::errors::KonvergeError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = KonvergeError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_manifest_error_display() {
    let err = KonvergeError::Manifest {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Manifest error: bad syntax");
}

#[test]
fn test_config_error_display() {
    let err = KonvergeError::Config {
        message: "unknown format".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: unknown format");
}

#[test]
fn test_reconcile_error_display() {
    let err = KonvergeError::Reconcile {
        message: "2 diagnostics".to_string(),
    };
    assert_eq!(err.to_string(), "Reconciliation failed: 2 diagnostics");
}

#[test]
fn test_artifact_error_display() {
    let err = KonvergeError::Artifact {
        message: "read-only".to_string(),
    };
    assert_eq!(err.to_string(), "Artifact error: read-only");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: KonvergeError = io_err.into();
    assert!(matches!(err, KonvergeError::Io(_)));
}
