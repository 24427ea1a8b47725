#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kubesel::loader::LoadedKubeconfigCollection;
use kubesel::session::{Kubesel, ProcessProbe};

/// A process table that tests can edit while kubesel is using it.
pub struct FakeProbe {
    pub epoch: u64,
    running: Mutex<HashSet<u32>>,
}

impl FakeProbe {
    pub fn new(epoch: u64, running: &[u32]) -> Self {
        Self {
            epoch,
            running: Mutex::new(running.iter().copied().collect()),
        }
    }
}

impl ProcessProbe for FakeProbe {
    fn boot_epoch(&self) -> io::Result<u64> {
        Ok(self.epoch)
    }

    fn process_exists(&self, pid: u32) -> io::Result<bool> {
        Ok(self.running.lock().unwrap().contains(&pid))
    }
}

pub fn empty_kubesel(data_dir: &Path, probe: FakeProbe) -> Kubesel {
    Kubesel::from_collection(LoadedKubeconfigCollection::default(), data_dir, Box::new(probe))
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
