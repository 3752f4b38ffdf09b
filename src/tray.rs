//! System tray shell.
//!
//! Owns a hidden message window and the notification icon. The scanner runs on
//! its own thread; choosing Exit ends the message loop and stops it.

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::OnceLock;

use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, HWND, LPARAM, LRESULT, POINT, WPARAM,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::CreateMutexW;
use windows::Win32::UI::Shell::{
    ShellExecuteW, Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE,
    NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow, DispatchMessageW,
    GetCursorPos, GetMessageW, InsertMenuW, LoadIconW, PostQuitMessage, RegisterClassW,
    SetForegroundWindow, TrackPopupMenu, TranslateMessage, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT,
    IDI_APPLICATION, MF_BYPOSITION, MF_SEPARATOR, MF_STRING, MSG, SW_SHOWNORMAL, TPM_BOTTOMALIGN,
    TPM_LEFTALIGN, TPM_RIGHTBUTTON, WM_COMMAND, WM_DESTROY, WM_RBUTTONUP, WM_USER, WNDCLASSW,
    WS_OVERLAPPEDWINDOW,
};

use crate::capture::{GdiScreenGrabber, ScreenshotSink};
use crate::platform::Win32WindowSystem;
use crate::scanner::{start_scanner, ScannerRuntime};

const WM_TRAYICON: u32 = WM_USER + 1;

// Menu item IDs
const MENU_OPEN_FOLDER: usize = 1001;
const MENU_EXIT: usize = 1002;

const TRAY_TIP: &str = "Auto Game Screenshot";

/// Screenshot root shown by the "Open Screenshots Folder" menu item.
static OUTPUT_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Named mutex held for the lifetime of the process.
struct InstanceLock(HANDLE);

impl InstanceLock {
    /// Returns `None` if another instance in this session holds the lock.
    fn acquire() -> Result<Option<Self>> {
        unsafe {
            let handle = CreateMutexW(None, true, w!("Local\\AutoGameScreenshot"))
                .context("Failed to create instance mutex")?;
            if GetLastError() == ERROR_ALREADY_EXISTS {
                let _ = CloseHandle(handle);
                return Ok(None);
            }
            Ok(Some(Self(handle)))
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Runs the tray application until the user chooses Exit.
pub fn run_tray_app(runtime: ScannerRuntime) -> Result<()> {
    let Some(_instance) = InstanceLock::acquire()? else {
        warn!("Another instance is already running; exiting");
        return Ok(());
    };

    let _ = OUTPUT_ROOT.set(runtime.config.output_root.clone());

    let hwnd = create_message_window()?;
    add_tray_icon(hwnd)?;

    let sink = ScreenshotSink::new(
        Win32WindowSystem::new(),
        GdiScreenGrabber,
        runtime.config.output_root.clone(),
        runtime.config.image_quality,
    );
    let scanner = match start_scanner(&runtime, Win32WindowSystem::new(), sink) {
        Ok(scanner) => scanner,
        Err(e) => {
            remove_tray_icon(hwnd);
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(e);
        }
    };

    info!("Auto Game Screenshot started. Right-click the tray icon to exit");

    // Message loop
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    info!("Stopping scanner...");
    scanner.stop();

    remove_tray_icon(hwnd);
    unsafe {
        let _ = DestroyWindow(hwnd);
    }
    info!("Exited");
    Ok(())
}

fn create_message_window() -> Result<HWND> {
    unsafe {
        let hinstance = GetModuleHandleW(None)?;
        let class_name = w!("AutoGameScreenshotClass");

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };

        let atom = RegisterClassW(&wc);
        if atom == 0 {
            return Err(anyhow!("Failed to register window class"));
        }

        let hwnd = CreateWindowExW(
            Default::default(),
            class_name,
            w!("Auto Game Screenshot"),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            None,
            None,
            hinstance,
            None,
        )?;

        Ok(hwnd)
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        match msg {
            WM_TRAYICON => {
                let event = (lparam.0 & 0xFFFF) as u32;
                if event == WM_RBUTTONUP {
                    show_context_menu(hwnd);
                }
                LRESULT(0)
            }
            WM_COMMAND => {
                let cmd = wparam.0 & 0xFFFF;
                if cmd == MENU_OPEN_FOLDER {
                    open_output_folder(hwnd);
                } else if cmd == MENU_EXIT {
                    info!("Exit requested");
                    PostQuitMessage(0);
                }
                LRESULT(0)
            }
            WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}

fn add_tray_icon(hwnd: HWND) -> Result<()> {
    unsafe {
        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: 1,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_TRAYICON,
            hIcon: LoadIconW(None, IDI_APPLICATION)?,
            ..Default::default()
        };

        let tip_wide: Vec<u16> = TRAY_TIP.encode_utf16().chain(std::iter::once(0)).collect();
        let len = tip_wide.len().min(nid.szTip.len());
        nid.szTip[..len].copy_from_slice(&tip_wide[..len]);

        if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
            return Err(anyhow!("Failed to add tray icon"));
        }

        Ok(())
    }
}

fn remove_tray_icon(hwnd: HWND) {
    unsafe {
        let nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: 1,
            ..Default::default()
        };
        let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
    }
}

fn show_context_menu(hwnd: HWND) {
    unsafe {
        let menu = match CreatePopupMenu() {
            Ok(menu) => menu,
            Err(e) => {
                error!("Failed to create tray menu: {}", e);
                return;
            }
        };

        // Inserted in reverse order since position 0
        let _ = InsertMenuW(menu, 0, MF_BYPOSITION | MF_STRING, MENU_EXIT, w!("Exit"));
        let _ = InsertMenuW(menu, 0, MF_BYPOSITION | MF_SEPARATOR, 0, None);
        let _ = InsertMenuW(
            menu,
            0,
            MF_BYPOSITION | MF_STRING,
            MENU_OPEN_FOLDER,
            w!("Open Screenshots Folder"),
        );

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for the menu to close when clicking elsewhere
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_BOTTOMALIGN | TPM_LEFTALIGN | TPM_RIGHTBUTTON,
            pt.x,
            pt.y,
            0,
            hwnd,
            None,
        );

        let _ = DestroyMenu(menu);
    }
}

fn open_output_folder(hwnd: HWND) {
    let Some(root) = OUTPUT_ROOT.get() else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(root) {
        error!("Failed to create {}: {}", root.display(), e);
        return;
    }

    let target = HSTRING::from(root.as_path());
    let result = unsafe {
        ShellExecuteW(
            hwnd,
            w!("open"),
            &target,
            PCWSTR::null(),
            PCWSTR::null(),
            SW_SHOWNORMAL,
        )
    };
    // Values up to 32 are error codes
    if result.0 as isize <= 32 {
        error!("Failed to open {}", root.display());
    }
}
