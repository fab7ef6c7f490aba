use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tyrant_manager::{
    Filesystem, InstanceDescriptor, LaunchUnitRef, ManagerError, ProcessSupervisor, Result,
};

/// In-memory supervisor that records every call it receives.
#[derive(Default)]
pub struct RecordingSupervisor {
    pub calls: RefCell<Vec<String>>,
    pub installed: RefCell<BTreeMap<String, InstanceDescriptor>>,
    pub running: RefCell<HashSet<String>>,
}

#[allow(dead_code)]
impl RecordingSupervisor {
    pub fn with_running(units: &[&str]) -> Self {
        let supervisor = Self::default();
        supervisor
            .running
            .borrow_mut()
            .extend(units.iter().map(|unit| unit.to_string()));
        supervisor
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls other than liveness queries.
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| !call.starts_with("is_running"))
            .cloned()
            .collect()
    }

    pub fn installed(&self, unit: &str) -> Option<InstanceDescriptor> {
        self.installed.borrow().get(unit).cloned()
    }
}

impl ProcessSupervisor for RecordingSupervisor {
    fn install(&self, unit: &LaunchUnitRef, descriptor: &InstanceDescriptor) -> Result<()> {
        self.calls.borrow_mut().push(format!("install {}", unit));
        self.installed
            .borrow_mut()
            .insert(unit.name().to_string(), descriptor.clone());
        Ok(())
    }

    fn remove(&self, unit: &LaunchUnitRef) -> Result<()> {
        self.calls.borrow_mut().push(format!("remove {}", unit));
        self.installed.borrow_mut().remove(unit.name());
        Ok(())
    }

    fn start(&self, unit: &LaunchUnitRef) -> Result<()> {
        self.calls.borrow_mut().push(format!("start {}", unit));
        if !self.installed.borrow().contains_key(unit.name()) {
            return Err(ManagerError::Supervision {
                unit: unit.name().to_string(),
                message: "Unknown job".to_string(),
            });
        }
        self.running.borrow_mut().insert(unit.name().to_string());
        Ok(())
    }

    fn stop(&self, unit: &LaunchUnitRef) -> Result<()> {
        self.calls.borrow_mut().push(format!("stop {}", unit));
        if !self.running.borrow_mut().remove(unit.name()) {
            return Err(ManagerError::Supervision {
                unit: unit.name().to_string(),
                message: "Unknown instance".to_string(),
            });
        }
        Ok(())
    }

    fn is_running(&self, unit: &LaunchUnitRef) -> Result<bool> {
        self.calls.borrow_mut().push(format!("is_running {}", unit));
        Ok(self.running.borrow().contains(unit.name()))
    }
}

/// In-memory filesystem.
#[derive(Default)]
pub struct MemoryFilesystem {
    pub files: RefCell<BTreeMap<PathBuf, String>>,
    pub deletes: RefCell<Vec<PathBuf>>,
}

#[allow(dead_code)]
impl MemoryFilesystem {
    pub fn with_file(path: impl Into<PathBuf>, content: &str) -> Self {
        let fs = Self::default();
        fs.files.borrow_mut().insert(path.into(), content.to_string());
        fs
    }
}

impl Filesystem for MemoryFilesystem {
    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.deletes.borrow_mut().push(path.to_path_buf());
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }
}
