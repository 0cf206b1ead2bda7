//! System-wide hotkey that activates the control from any window.
//!
//! `global-hotkey` only delivers events when the platform's event loop runs
//! on the thread that owns the manager. On Linux the crate runs its own X11
//! thread. On Windows the manager lives on a dedicated thread that pumps
//! Win32 messages. macOS needs the main-thread NSApp loop, which a terminal
//! program does not run, so the hotkey is reported as unsupported there.

use crate::app::{AppEvent, Source};
use crate::error::{GreenDotError, Result};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::str::FromStr;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Keeps the toggle hotkey registered for as long as it lives.
pub struct HotkeyManager {
    _registration: platform::Registration,
}

impl HotkeyManager {
    /// Register `hotkey_str` and forward its presses to the event loop.
    ///
    /// The forwarding thread exits once the loop drops its receiver.
    pub fn start(hotkey_str: &str, events: UnboundedSender<AppEvent>) -> Result<Self> {
        let hotkey = parse_hotkey(hotkey_str)?;
        let registration = platform::Registration::register(hotkey, hotkey_str)?;
        info!(hotkey = hotkey_str, "toggle hotkey registered");

        let id = hotkey.id();
        std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                forward_presses(GlobalHotKeyEvent::receiver().iter(), id, &events);
                debug!("hotkey listener stopped");
            })?;

        Ok(Self {
            _registration: registration,
        })
    }
}

/// Send an activation for every press of hotkey `id` until the loop is gone.
fn forward_presses<I>(hotkey_events: I, id: u32, events: &UnboundedSender<AppEvent>)
where
    I: IntoIterator<Item = GlobalHotKeyEvent>,
{
    for event in hotkey_events {
        if event.id != id || event.state != HotKeyState::Pressed {
            continue;
        }
        if events.send(AppEvent::Activate(Source::Hotkey)).is_err() {
            break;
        }
    }
}

#[cfg(all(not(windows), not(target_os = "macos")))]
mod platform {
    use crate::error::{GreenDotError, Result};
    use global_hotkey::hotkey::HotKey;
    use global_hotkey::GlobalHotKeyManager;

    pub struct Registration {
        manager: GlobalHotKeyManager,
        hotkey: HotKey,
    }

    impl Registration {
        pub fn register(hotkey: HotKey, hotkey_str: &str) -> Result<Self> {
            let manager = GlobalHotKeyManager::new().map_err(|e| {
                GreenDotError::hotkey(format!("failed to create hotkey manager: {e}"))
            })?;
            manager.register(hotkey).map_err(|e| {
                GreenDotError::hotkey(format!("failed to register '{hotkey_str}': {e}"))
            })?;
            Ok(Self { manager, hotkey })
        }
    }

    impl Drop for Registration {
        fn drop(&mut self) {
            let _ = self.manager.unregister(self.hotkey);
        }
    }
}

#[cfg(windows)]
mod platform {
    use crate::error::{GreenDotError, Result};
    use global_hotkey::hotkey::HotKey;
    use global_hotkey::GlobalHotKeyManager;
    use std::sync::mpsc::sync_channel;
    use tracing::debug;
    use winapi::um::processthreadsapi::GetCurrentThreadId;
    use winapi::um::winuser::{
        DispatchMessageW, GetMessageW, PostThreadMessageW, TranslateMessage, MSG, WM_QUIT,
    };

    /// Owner of the pump thread; the manager never leaves that thread.
    pub struct Registration {
        thread_id: u32,
    }

    impl Registration {
        pub fn register(hotkey: HotKey, hotkey_str: &str) -> Result<Self> {
            let (ready_tx, ready_rx) = sync_channel::<std::result::Result<u32, String>>(1);
            let hotkey_str = hotkey_str.to_string();

            std::thread::Builder::new()
                .name("hotkey-pump".into())
                .spawn(move || {
                    let manager = match GlobalHotKeyManager::new() {
                        Ok(manager) => manager,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!(
                                "failed to create hotkey manager: {e}"
                            )));
                            return;
                        }
                    };
                    if let Err(e) = manager.register(hotkey) {
                        let _ = ready_tx.send(Err(format!(
                            "failed to register '{hotkey_str}': {e}"
                        )));
                        return;
                    }

                    let thread_id = unsafe { GetCurrentThreadId() };
                    let _ = ready_tx.send(Ok(thread_id));

                    let mut msg: MSG = unsafe { std::mem::zeroed() };
                    // GetMessageW returns 0 on WM_QUIT and -1 on error.
                    while unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) } > 0 {
                        unsafe {
                            TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    let _ = manager.unregister(hotkey);
                    debug!("hotkey message pump stopped");
                })?;

            let thread_id = ready_rx
                .recv()
                .map_err(|_| GreenDotError::hotkey("hotkey thread exited during startup"))?
                .map_err(GreenDotError::hotkey)?;
            Ok(Self { thread_id })
        }
    }

    impl Drop for Registration {
        fn drop(&mut self) {
            unsafe {
                PostThreadMessageW(self.thread_id, WM_QUIT, 0, 0);
            }
        }
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use crate::error::{GreenDotError, Result};
    use global_hotkey::hotkey::HotKey;

    pub struct Registration;

    impl Registration {
        pub fn register(_hotkey: HotKey, _hotkey_str: &str) -> Result<Self> {
            Err(GreenDotError::hotkey(
                "unsupported on this platform: macOS delivers hotkeys only to a main-thread event loop",
            ))
        }
    }
}

/// Parse strings like `ctrl+alt+g` or `super+shift+F5`.
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let parts: Vec<String> = hotkey_str
        .split('+')
        .map(|part| normalize_token(part.trim()))
        .collect();

    if parts.iter().any(String::is_empty) {
        return Err(GreenDotError::hotkey(format!(
            "empty key in hotkey '{hotkey_str}'"
        )));
    }

    HotKey::from_str(&parts.join("+"))
        .map_err(|e| GreenDotError::hotkey(format!("invalid hotkey '{hotkey_str}': {e}")))
}

fn normalize_token(token: &str) -> String {
    match token.to_lowercase().as_str() {
        "control" => "ctrl".to_string(),
        "meta" | "win" => "super".to_string(),
        "return" => "enter".to_string(),
        "esc" => "escape".to_string(),
        "option" => "alt".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use global_hotkey::hotkey::{Code, Modifiers};
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_parse_default_hotkey() {
        let hotkey = parse_hotkey("ctrl+alt+g").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::ALT), Code::KeyG)
        );
    }

    #[test]
    fn test_parse_aliases() {
        let hotkey = parse_hotkey("Control + Meta + F5").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SUPER), Code::F5)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_hotkey("").is_err());
        assert!(parse_hotkey("ctrl++g").is_err());
        assert!(parse_hotkey("ctrl+notakey").is_err());
    }

    #[test]
    fn test_forward_only_presses_of_our_hotkey() {
        let id = parse_hotkey("ctrl+alt+g").unwrap().id();
        let (tx, mut rx) = unbounded_channel();
        let presses = vec![
            GlobalHotKeyEvent {
                id,
                state: HotKeyState::Pressed,
            },
            GlobalHotKeyEvent {
                id,
                state: HotKeyState::Released,
            },
            GlobalHotKeyEvent {
                id: id.wrapping_add(1),
                state: HotKeyState::Pressed,
            },
            GlobalHotKeyEvent {
                id,
                state: HotKeyState::Pressed,
            },
        ];

        forward_presses(presses, id, &tx);
        drop(tx);

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                AppEvent::Activate(Source::Hotkey),
                AppEvent::Activate(Source::Hotkey)
            ]
        );
    }

    #[test]
    fn test_forward_stops_when_loop_is_gone() {
        let id = 7;
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let endless = std::iter::repeat_with(|| GlobalHotKeyEvent {
            id,
            state: HotKeyState::Pressed,
        });

        // Returns instead of spinning forever on a closed channel.
        forward_presses(endless, id, &tx);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_macos_reports_unsupported() {
        let (tx, _rx) = unbounded_channel();
        let err = HotkeyManager::start("ctrl+alt+g", tx).err().unwrap();
        assert!(err.to_string().contains("unsupported on this platform"));
    }
}
