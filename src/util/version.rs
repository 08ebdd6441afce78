pub const APP_NAME: &str = "Lane Rate Scanner";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_label() -> String {
    format!("v{}", APP_VERSION)
}

/// `User-Agent` sent with every backend request.
pub fn user_agent() -> String {
    format!("lane-rate-scanner/{APP_VERSION}")
}
