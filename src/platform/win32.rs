//! Win32 implementation of [`WindowSystem`].

use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::mem;
use std::os::windows::ffi::OsStringExt;

use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, BOOL, HANDLE, HMODULE, HWND, LPARAM, RECT, TRUE};
use windows::Win32::System::ProcessStatus::{
    EnumProcessModulesEx, GetModuleFileNameExW, LIST_MODULES_ALL,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_ACCESS_RIGHTS, PROCESS_NAME_WIN32,
    PROCESS_QUERY_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumChildWindows, GetForegroundWindow, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindow,
};

use super::{file_basename, ProcessId, WindowHandle, WindowRect, WindowSystem};

/// Initial module handle buffer; grown if the process has more modules.
const INITIAL_MODULE_CAPACITY: usize = 512;

/// Desktop queries backed by user32/kernel32/psapi.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32WindowSystem;

impl Win32WindowSystem {
    pub fn new() -> Self {
        Self
    }
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut std::ffi::c_void)
}

fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as usize)
}

fn ensure_window(hwnd: HWND) -> Result<()> {
    if unsafe { IsWindow(hwnd) }.as_bool() {
        Ok(())
    } else {
        Err(anyhow!("Window {:?} no longer exists", hwnd))
    }
}

/// Process handle closed on drop.
struct ProcessHandle(HANDLE);

impl ProcessHandle {
    fn open(access: PROCESS_ACCESS_RIGHTS, pid: ProcessId) -> Result<Self> {
        let handle = unsafe { OpenProcess(access, false, pid.0) }
            .with_context(|| format!("Failed to open process {}", pid.0))?;
        Ok(Self(handle))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

unsafe extern "system" fn collect_child(hwnd: HWND, lparam: LPARAM) -> BOOL {
    unsafe {
        let children = &mut *(lparam.0 as *mut Vec<WindowHandle>);
        children.push(from_hwnd(hwnd));
    }
    TRUE
}

fn wide_to_string(buf: &[u16]) -> String {
    OsString::from_wide(buf).to_string_lossy().to_string()
}

impl WindowSystem for Win32WindowSystem {
    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            None
        } else {
            Some(from_hwnd(hwnd))
        }
    }

    fn child_windows(&self, handle: WindowHandle) -> Result<Vec<WindowHandle>> {
        let hwnd = to_hwnd(handle);
        ensure_window(hwnd)?;

        let mut children: Vec<WindowHandle> = Vec::new();
        unsafe {
            // EnumChildWindows already recurses into grandchildren. Its return
            // value carries no error information and is ignored.
            let _ = EnumChildWindows(
                hwnd,
                Some(collect_child),
                LPARAM(&mut children as *mut _ as isize),
            );
        }
        Ok(children)
    }

    fn owner_process(&self, handle: WindowHandle) -> Result<ProcessId> {
        let mut process_id: u32 = 0;
        unsafe { GetWindowThreadProcessId(to_hwnd(handle), Some(&mut process_id)) };
        if process_id == 0 {
            return Err(anyhow!("No owning process for window {:?}", handle));
        }
        Ok(ProcessId(process_id))
    }

    fn process_name(&self, pid: ProcessId) -> Result<String> {
        let process = ProcessHandle::open(PROCESS_QUERY_LIMITED_INFORMATION, pid)?;

        let mut name_buf: Vec<u16> = vec![0; 1024];
        let mut len = name_buf.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                process.0,
                PROCESS_NAME_WIN32,
                PWSTR(name_buf.as_mut_ptr()),
                &mut len,
            )
        }
        .with_context(|| format!("Failed to query image name of process {}", pid.0))?;

        if len == 0 {
            return Err(anyhow!("Empty image name for process {}", pid.0));
        }
        let full_path = wide_to_string(&name_buf[..len as usize]);
        Ok(file_basename(&full_path).to_string())
    }

    fn loaded_modules(&self, pid: ProcessId) -> Result<Vec<String>> {
        let process = ProcessHandle::open(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, pid)?;

        let mut modules: Vec<HMODULE> = vec![HMODULE::default(); INITIAL_MODULE_CAPACITY];
        loop {
            let mut needed: u32 = 0;
            unsafe {
                EnumProcessModulesEx(
                    process.0,
                    modules.as_mut_ptr(),
                    (modules.len() * mem::size_of::<HMODULE>()) as u32,
                    &mut needed,
                    LIST_MODULES_ALL,
                )
            }
            .with_context(|| format!("Failed to enumerate modules of process {}", pid.0))?;

            let count = needed as usize / mem::size_of::<HMODULE>();
            if count <= modules.len() {
                modules.truncate(count);
                break;
            }
            // Modules were loaded between calls; retry with the reported size
            modules.resize(count, HMODULE::default());
        }

        let mut paths = Vec::with_capacity(modules.len());
        let mut path_buf: Vec<u16> = vec![0; 1024];
        for module in modules {
            let len = unsafe { GetModuleFileNameExW(process.0, module, &mut path_buf) };
            // Zero means the module was unloaded mid-walk
            if len > 0 {
                paths.push(wide_to_string(&path_buf[..len as usize]));
            }
        }
        Ok(paths)
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect> {
        let hwnd = to_hwnd(handle);
        ensure_window(hwnd)?;

        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }
            .with_context(|| format!("GetWindowRect failed for {:?}", handle))?;

        Ok(WindowRect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    fn window_title(&self, handle: WindowHandle) -> Result<String> {
        let hwnd = to_hwnd(handle);
        ensure_window(hwnd)?;

        let title_len = unsafe { GetWindowTextLengthW(hwnd) };
        if title_len <= 0 {
            return Ok(String::new());
        }
        let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
        let copied = unsafe { GetWindowTextW(hwnd, &mut title_buf) };
        let copied = copied.clamp(0, title_len) as usize;
        Ok(wide_to_string(&title_buf[..copied]))
    }
}
