//! Accelerator probe.
//!
//! The service assumes exactly one accelerator. At startup we ask
//! `nvidia-smi` for the GPU's name and total memory; if the binary is
//! missing or the query fails, execution falls back to the CPU with an
//! unbounded (host-memory) budget.

/// Execution device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cuda,
    Cpu,
}

/// Probed device identity and memory budget.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    /// Marketing name reported by the driver (CUDA only).
    pub name: Option<String>,
    /// Total dedicated memory in bytes. `None` means unbounded (CPU).
    pub total_memory_bytes: Option<u64>,
}

impl DeviceInfo {
    /// CPU fallback device.
    pub fn cpu() -> Self {
        Self {
            kind: DeviceKind::Cpu,
            name: None,
            total_memory_bytes: None,
        }
    }

    /// A CUDA device with a known memory size.
    pub fn cuda(name: impl Into<String>, total_memory_bytes: u64) -> Self {
        Self {
            kind: DeviceKind::Cuda,
            name: Some(name.into()),
            total_memory_bytes: Some(total_memory_bytes),
        }
    }

    /// Replace the memory budget (operator override, e.g. to leave headroom
    /// for a desktop compositor sharing the card).
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.total_memory_bytes = Some(bytes);
        self
    }

    pub fn is_cuda(&self) -> bool {
        self.kind == DeviceKind::Cuda
    }

    /// Bytes available for a pipeline's device working set. `None` means
    /// no admission check applies (host execution).
    pub fn memory_budget(&self) -> Option<u64> {
        self.total_memory_bytes
    }

    /// Short label for logs and the health payload.
    pub fn label(&self) -> &'static str {
        match self.kind {
            DeviceKind::Cuda => "cuda",
            DeviceKind::Cpu => "cpu",
        }
    }
}

/// Probe the accelerator via `nvidia-smi`. Falls back to CPU on any
/// failure -- a missing driver is a supported configuration, not an error.
pub async fn probe() -> DeviceInfo {
    let output = tokio::process::Command::new("nvidia-smi")
        .args(["--query-gpu=name,memory.total", "--format=csv,noheader,nounits"])
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            match stdout.lines().next().and_then(parse_smi_line) {
                Some(device) => device,
                None => {
                    tracing::warn!("Could not parse nvidia-smi output, falling back to CPU");
                    DeviceInfo::cpu()
                }
            }
        }
        _ => DeviceInfo::cpu(),
    }
}

/// Parse one `name, memory.total` CSV line (memory in MiB).
fn parse_smi_line(line: &str) -> Option<DeviceInfo> {
    let (name, mem) = line.rsplit_once(',')?;
    let mem_mib: u64 = mem.trim().parse().ok()?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(DeviceInfo::cuda(name, mem_mib * 1024 * 1024))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gpu_line() {
        let device = parse_smi_line("NVIDIA GeForce GTX 1050 Ti, 4096").expect("parse");
        assert_eq!(device.kind, DeviceKind::Cuda);
        assert_eq!(device.name.as_deref(), Some("NVIDIA GeForce GTX 1050 Ti"));
        assert_eq!(device.total_memory_bytes, Some(4096 * 1024 * 1024));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_smi_line("").is_none());
        assert!(parse_smi_line("no comma here").is_none());
        assert!(parse_smi_line("name, not-a-number").is_none());
    }

    #[test]
    fn cpu_device_has_no_budget() {
        assert_eq!(DeviceInfo::cpu().memory_budget(), None);
        assert_eq!(DeviceInfo::cpu().label(), "cpu");
    }

    #[test]
    fn budget_override_applies() {
        let device = DeviceInfo::cuda("test", 4096).with_memory_budget(1024);
        assert_eq!(device.memory_budget(), Some(1024));
    }
}
