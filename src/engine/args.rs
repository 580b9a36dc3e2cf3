//! Engine command line construction.

use crate::config::GpuPreference;

/// Flag the engines use to opt into GPU inference.
pub const USE_GPU_FLAG: &str = "--use_gpu";

/// Build the engine argument vector.
///
/// Order: `--port=<backend_port>`, the configured arguments, then the arguments
/// passed on the proxy's own command line. GPU reconciliation runs last.
pub fn build_args(
    backend_port: u16,
    configured: &[String],
    passthrough: &[String],
    gpu: GpuPreference,
) -> Vec<String> {
    let mut args = Vec::with_capacity(1 + configured.len() + passthrough.len() + 1);
    args.push(format!("--port={}", backend_port));
    args.extend(configured.iter().cloned());
    args.extend(passthrough.iter().cloned());
    reconcile_gpu(&mut args, gpu);
    args
}

/// Add or remove `--use_gpu` according to the configured preference.
///
/// Idempotent: running it twice leaves the same vector as running it once.
pub fn reconcile_gpu(args: &mut Vec<String>, gpu: GpuPreference) {
    match gpu {
        GpuPreference::Enable => {
            if !args.iter().any(|a| a == USE_GPU_FLAG) {
                args.push(USE_GPU_FLAG.to_string());
            }
        }
        GpuPreference::Disable => args.retain(|a| a != USE_GPU_FLAG),
        GpuPreference::Unspecified => {}
    }
}
