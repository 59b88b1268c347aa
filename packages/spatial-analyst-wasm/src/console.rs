// Browser console on wasm32, tracing events everywhere else.
// The console_log / console_warn macros are defined in lib.rs.

#[cfg(target_arch = "wasm32")]
pub fn log(s: &str) {
    web_sys::console::log_1(&s.into());
}

#[cfg(target_arch = "wasm32")]
pub fn warn(s: &str) {
    web_sys::console::warn_1(&s.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(s: &str) {
    tracing::debug!(target: "spatial_analyst", "{}", s);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(s: &str) {
    tracing::warn!(target: "spatial_analyst", "{}", s);
}
