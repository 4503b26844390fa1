use tracing_subscriber::EnvFilter;

/// Routes engine logs through the test harness. Filter with `RUST_LOG`.
pub fn init() {
	drop(tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init());
}
