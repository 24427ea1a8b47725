// session/owner.rs
use std::io;

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};

use super::KubeselError;

/// The shell that owns an overlay file.
///
/// PIDs are recycled, so the boot time of the system is recorded with the
/// PID. An owner from a previous boot is always dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerIdentity {
    #[serde(rename = "pid")]
    pub process: u32,
    pub epoch: u64,
}

impl OwnerIdentity {
    pub fn new(process: u32, epoch: u64) -> Self {
        Self { process, epoch }
    }

    /// Identifies a running process as an owner. Fails if the process does
    /// not currently exist.
    pub fn for_process(pid: u32, probe: &dyn ProcessProbe) -> Result<Self, KubeselError> {
        let epoch = probe.boot_epoch().map_err(KubeselError::Probe)?;
        if !probe.process_exists(pid).map_err(KubeselError::Probe)? {
            return Err(KubeselError::OwnerProcessNotExist(pid));
        }

        Ok(Self::new(pid, epoch))
    }

    /// Name of the overlay file belonging to this owner.
    pub fn file_name(&self) -> String {
        format!("kubesel-{:x}-{:x}-kubeconfig.yaml", self.epoch, self.process)
    }

    pub fn is_alive(&self, probe: &dyn ProcessProbe) -> Result<bool, KubeselError> {
        let epoch = probe.boot_epoch().map_err(KubeselError::Probe)?;
        if epoch != self.epoch {
            return Ok(false);
        }

        probe.process_exists(self.process).map_err(KubeselError::Probe)
    }
}

/// Source of process liveness information.
pub trait ProcessProbe: Send + Sync {
    /// Boot time of the running system, in seconds since the Unix epoch.
    fn boot_epoch(&self) -> io::Result<u64>;

    fn process_exists(&self, pid: u32) -> io::Result<bool>;
}

/// [`ProcessProbe`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn boot_epoch(&self) -> io::Result<u64> {
        match System::boot_time() {
            0 => Err(io::Error::new(
                io::ErrorKind::Other,
                "unable to determine system boot time",
            )),
            boot_time => Ok(boot_time),
        }
    }

    fn process_exists(&self, pid: u32) -> io::Result<bool> {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        Ok(system.process(pid).is_some())
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{BrokenProbe, FakeProbe};
    use super::*;

    fn probe(epoch: u64, running: &[u32]) -> FakeProbe {
        FakeProbe::new(epoch, running)
    }

    #[test]
    fn file_name_is_hex_encoded() {
        let owner = OwnerIdentity::new(1234, 99);
        assert_eq!(owner.file_name(), "kubesel-63-4d2-kubeconfig.yaml");
    }

    #[test]
    fn for_process_requires_a_running_process() {
        let probe = probe(99, &[1234]);
        assert_eq!(
            OwnerIdentity::for_process(1234, &probe).unwrap(),
            OwnerIdentity::new(1234, 99)
        );
        assert!(matches!(
            OwnerIdentity::for_process(4321, &probe),
            Err(KubeselError::OwnerProcessNotExist(4321))
        ));
        assert!(matches!(
            OwnerIdentity::for_process(1234, &BrokenProbe),
            Err(KubeselError::Probe(_))
        ));
    }

    #[test]
    fn owner_from_previous_boot_is_dead_even_if_pid_is_running() {
        let probe = probe(100, &[1234]);
        assert!(!OwnerIdentity::new(1234, 99).is_alive(&probe).unwrap());
        assert!(OwnerIdentity::new(1234, 100).is_alive(&probe).unwrap());
        assert!(!OwnerIdentity::new(4321, 100).is_alive(&probe).unwrap());
    }

    #[test]
    fn serializes_process_as_pid() {
        let json = serde_json::to_value(OwnerIdentity::new(7, 8)).unwrap();
        assert_eq!(json, serde_json::json!({"pid": 7, "epoch": 8}));
    }

    #[test]
    fn system_probe_sees_the_current_process() {
        let probe = SystemProbe;
        assert!(probe.boot_epoch().unwrap() > 0);
        assert!(probe.process_exists(std::process::id()).unwrap());
    }
}
