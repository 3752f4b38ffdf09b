//! Resolves a window tree to the processes behind it and their loaded modules.

use log::debug;
use std::collections::BTreeSet;

use crate::platform::{file_basename, ProcessId, WindowHandle, WindowSystem};

/// Names gathered from a window and all of its descendants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowInspection {
    pub process_names: BTreeSet<String>,
    pub module_names: BTreeSet<String>,
}

#[cfg(test)]
impl WindowInspection {
    pub fn is_empty(&self) -> bool {
        self.process_names.is_empty() && self.module_names.is_empty()
    }
}

/// Inspects `hwnd` and its child windows.
///
/// Games often render into a child window owned by a different process than
/// the frame, so every descendant is resolved. Windows or processes that
/// vanish mid-walk are skipped; if nothing resolves the result is empty.
pub fn inspect(os: &dyn WindowSystem, hwnd: WindowHandle) -> WindowInspection {
    let mut handles = vec![hwnd];
    match os.child_windows(hwnd) {
        Ok(children) => handles.extend(children),
        Err(e) => debug!("Child enumeration failed for {:?}: {:#}", hwnd, e),
    }

    // Several windows usually share one process; read each process once.
    let mut pids: Vec<ProcessId> = Vec::new();
    for handle in handles {
        match os.owner_process(handle) {
            Ok(pid) if !pids.contains(&pid) => pids.push(pid),
            Ok(_) => {}
            Err(e) => debug!("Skipping window {:?}: {:#}", handle, e),
        }
    }

    let mut inspection = WindowInspection::default();
    for pid in pids {
        match os.process_name(pid) {
            Ok(name) => {
                inspection.process_names.insert(name);
            }
            Err(e) => debug!("No name for process {}: {:#}", pid.0, e),
        }
        match os.loaded_modules(pid) {
            Ok(paths) => inspection.module_names.extend(
                paths
                    .iter()
                    .map(|path| file_basename(path))
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            ),
            Err(e) => debug!("No modules for process {}: {:#}", pid.0, e),
        }
    }

    inspection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeDesktop;

    #[test]
    fn test_inspect_single_window() {
        let desktop = FakeDesktop::new();
        desktop.add_process(
            10,
            "game.exe",
            &[
                r"C:\Windows\System32\kernel32.dll",
                r"C:\Windows\System32\XInput1_4.dll",
            ],
        );
        let hwnd = desktop.add_window(1, 10, "Game");

        let inspection = inspect(&desktop, hwnd);
        assert_eq!(
            inspection.process_names.into_iter().collect::<Vec<_>>(),
            vec!["game.exe"]
        );
        assert_eq!(
            inspection.module_names.into_iter().collect::<Vec<_>>(),
            vec!["XInput1_4.dll", "kernel32.dll"]
        );
    }

    #[test]
    fn test_inspect_includes_child_processes() {
        let desktop = FakeDesktop::new();
        desktop.add_process(10, "launcher.exe", &[r"C:\x\user32.dll"]);
        desktop.add_process(20, "engine.exe", &[r"C:\x\xinput1_3.dll", r"C:\x\user32.dll"]);
        let frame = desktop.add_window(1, 10, "Frame");
        let render = desktop.add_window(2, 20, "");
        let nested = desktop.add_window(3, 20, "");
        desktop.add_child(frame, render);
        desktop.add_child(render, nested);

        let inspection = inspect(&desktop, frame);
        assert!(inspection.process_names.contains("launcher.exe"));
        assert!(inspection.process_names.contains("engine.exe"));
        assert_eq!(
            inspection.module_names.into_iter().collect::<Vec<_>>(),
            vec!["user32.dll", "xinput1_3.dll"]
        );
        // engine.exe owns two windows but is read once
        assert_eq!(desktop.module_reads.get(), 2);
    }

    #[test]
    fn test_inspect_skips_vanished_child() {
        let desktop = FakeDesktop::new();
        desktop.add_process(10, "game.exe", &["d3d11.dll"]);
        let frame = desktop.add_window(1, 10, "Game");
        let gone = desktop.add_window(2, 10, "");
        desktop.add_child(frame, gone);
        desktop.close_window(gone);

        let inspection = inspect(&desktop, frame);
        assert!(inspection.process_names.contains("game.exe"));
        assert!(inspection.module_names.contains("d3d11.dll"));
    }

    #[test]
    fn test_inspect_skips_exited_process() {
        let desktop = FakeDesktop::new();
        desktop.add_process(10, "frame.exe", &["user32.dll"]);
        desktop.add_process(20, "helper.exe", &["xinput1_4.dll"]);
        let frame = desktop.add_window(1, 10, "Frame");
        let child = desktop.add_window(2, 20, "");
        desktop.add_child(frame, child);
        desktop.kill_process(20);

        let inspection = inspect(&desktop, frame);
        assert_eq!(
            inspection.process_names.into_iter().collect::<Vec<_>>(),
            vec!["frame.exe"]
        );
        assert!(!inspection.module_names.contains("xinput1_4.dll"));
    }

    #[test]
    fn test_inspect_closed_window_is_empty() {
        let desktop = FakeDesktop::new();
        desktop.add_process(10, "game.exe", &["xinput1_4.dll"]);
        let hwnd = desktop.add_window(1, 10, "Game");
        desktop.close_window(hwnd);

        let inspection = inspect(&desktop, hwnd);
        assert!(inspection.is_empty());
    }
}
