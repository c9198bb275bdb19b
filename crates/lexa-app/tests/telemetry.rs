use lexa_app::telemetry::init_tracing;

#[test]
fn subscriber_installs_once_per_process() {
    init_tracing(true).unwrap();
    tracing::info!(check = "json", "subscriber installed");

    let err = init_tracing(false).unwrap_err();
    assert!(err.to_string().contains("failed to install tracing subscriber"));
}
