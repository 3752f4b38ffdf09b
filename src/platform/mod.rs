//! OS window and process query surface.
//!
//! The scanner and inspector only talk to the desktop through [`WindowSystem`].
//! Handles may go stale at any moment, so every query is fallible.

#[cfg(windows)]
pub mod win32;

use anyhow::Result;

#[cfg(windows)]
pub use win32::Win32WindowSystem;

/// Opaque window identifier (the raw HWND value on Windows).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowHandle(pub usize);

/// Operating system process id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

/// A window rectangle in virtual-screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowRect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// True when the rectangle covers no pixels (minimized or collapsed windows).
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Final path component of a Windows or POSIX style path.
pub fn file_basename(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Read-only queries against the desktop's windows and their owning processes.
pub trait WindowSystem {
    /// The window currently receiving input focus, if any.
    fn foreground_window(&self) -> Option<WindowHandle>;

    /// All descendant windows of `handle`.
    fn child_windows(&self, handle: WindowHandle) -> Result<Vec<WindowHandle>>;

    fn owner_process(&self, handle: WindowHandle) -> Result<ProcessId>;

    /// Executable file name of the process, e.g. `game.exe`.
    fn process_name(&self, pid: ProcessId) -> Result<String>;

    /// Full paths of every module mapped into the process.
    fn loaded_modules(&self, pid: ProcessId) -> Result<Vec<String>>;

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect>;

    fn window_title(&self, handle: WindowHandle) -> Result<String>;
}

impl<T: WindowSystem + ?Sized> WindowSystem for &T {
    fn foreground_window(&self) -> Option<WindowHandle> {
        (**self).foreground_window()
    }

    fn child_windows(&self, handle: WindowHandle) -> Result<Vec<WindowHandle>> {
        (**self).child_windows(handle)
    }

    fn owner_process(&self, handle: WindowHandle) -> Result<ProcessId> {
        (**self).owner_process(handle)
    }

    fn process_name(&self, pid: ProcessId) -> Result<String> {
        (**self).process_name(pid)
    }

    fn loaded_modules(&self, pid: ProcessId) -> Result<Vec<String>> {
        (**self).loaded_modules(pid)
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect> {
        (**self).window_rect(handle)
    }

    fn window_title(&self, handle: WindowHandle) -> Result<String> {
        (**self).window_title(handle)
    }
}

#[cfg(test)]
pub mod fake {
    //! Scriptable in-memory desktop used by tests.

    use super::*;
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug)]
    pub struct FakeWindow {
        pub pid: ProcessId,
        pub title: String,
        pub rect: WindowRect,
        pub children: Vec<WindowHandle>,
    }

    #[derive(Clone, Debug)]
    pub struct FakeProcess {
        pub name: String,
        pub modules: Vec<String>,
    }

    /// In-memory desktop. The foreground window follows a script, one entry
    /// per `foreground_window` call; the last entry repeats.
    #[derive(Default)]
    pub struct FakeDesktop {
        pub windows: RefCell<HashMap<WindowHandle, FakeWindow>>,
        pub processes: RefCell<HashMap<ProcessId, FakeProcess>>,
        pub foreground_script: RefCell<Vec<Option<WindowHandle>>>,
        /// Shared so tests can watch polls made from the scanner thread.
        pub foreground_polls: Arc<AtomicUsize>,
        pub module_reads: Cell<usize>,
    }

    impl FakeDesktop {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_process(&self, pid: u32, name: &str, modules: &[&str]) {
            self.processes.borrow_mut().insert(
                ProcessId(pid),
                FakeProcess {
                    name: name.to_string(),
                    modules: modules.iter().map(|m| m.to_string()).collect(),
                },
            );
        }

        pub fn add_window(&self, handle: usize, pid: u32, title: &str) -> WindowHandle {
            let handle = WindowHandle(handle);
            self.windows.borrow_mut().insert(
                handle,
                FakeWindow {
                    pid: ProcessId(pid),
                    title: title.to_string(),
                    rect: WindowRect {
                        left: 0,
                        top: 0,
                        right: 640,
                        bottom: 480,
                    },
                    children: Vec::new(),
                },
            );
            handle
        }

        pub fn add_child(&self, parent: WindowHandle, child: WindowHandle) {
            if let Some(window) = self.windows.borrow_mut().get_mut(&parent) {
                window.children.push(child);
            }
        }

        pub fn close_window(&self, handle: WindowHandle) {
            self.windows.borrow_mut().remove(&handle);
        }

        pub fn kill_process(&self, pid: u32) {
            self.processes.borrow_mut().remove(&ProcessId(pid));
        }

        pub fn script_foreground(&self, script: &[Option<WindowHandle>]) {
            *self.foreground_script.borrow_mut() = script.to_vec();
        }

        fn window(&self, handle: WindowHandle) -> Result<FakeWindow> {
            self.windows
                .borrow()
                .get(&handle)
                .cloned()
                .ok_or_else(|| anyhow!("invalid window handle {:?}", handle))
        }

        fn process(&self, pid: ProcessId) -> Result<FakeProcess> {
            self.processes
                .borrow()
                .get(&pid)
                .cloned()
                .ok_or_else(|| anyhow!("process {:?} has exited", pid))
        }
    }

    impl WindowSystem for FakeDesktop {
        fn foreground_window(&self) -> Option<WindowHandle> {
            let poll = self.foreground_polls.fetch_add(1, Ordering::SeqCst);
            let script = self.foreground_script.borrow();
            script
                .get(poll)
                .or_else(|| script.last())
                .copied()
                .flatten()
        }

        fn child_windows(&self, handle: WindowHandle) -> Result<Vec<WindowHandle>> {
            let mut found = Vec::new();
            let mut pending = self.window(handle)?.children;
            while let Some(child) = pending.pop() {
                found.push(child);
                if let Ok(window) = self.window(child) {
                    pending.extend(window.children);
                }
            }
            Ok(found)
        }

        fn owner_process(&self, handle: WindowHandle) -> Result<ProcessId> {
            Ok(self.window(handle)?.pid)
        }

        fn process_name(&self, pid: ProcessId) -> Result<String> {
            Ok(self.process(pid)?.name)
        }

        fn loaded_modules(&self, pid: ProcessId) -> Result<Vec<String>> {
            self.module_reads.set(self.module_reads.get() + 1);
            Ok(self.process(pid)?.modules)
        }

        fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect> {
            Ok(self.window(handle)?.rect)
        }

        fn window_title(&self, handle: WindowHandle) -> Result<String> {
            Ok(self.window(handle)?.title)
        }
    }
}
