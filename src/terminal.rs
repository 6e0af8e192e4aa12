use crate::convert::{PixelBuffer, RowOrder};
use crate::render::{Frame, Painter};
use crate::surface::{Key, KeyQuery, KeyState, Surface};
use anyhow::Context;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    ModifierKeyCode, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{
    ExecutableCommand, cursor,
    terminal::{self, ClearType},
};
use log::debug;
use std::io::{BufWriter, Stdout, Write, stdout};
use std::time::Duration;

pub struct TerminalGuard {
    enhanced_keys: bool,
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Create the guard immediately so Drop will disable raw mode if
        // any subsequent setup step fails.
        let mut guard = Self {
            enhanced_keys: false,
        };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            out.execute(PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES,
            ))
            .context("enable key release reporting")?;
            guard.enhanced_keys = true;
        }

        Ok(guard)
    }

    /// Whether the terminal reports key releases, making held keys observable.
    pub fn reports_release(&self) -> bool {
        self.enhanced_keys
    }

    pub fn stdout() -> Stdout {
        stdout()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = stdout();
        if self.enhanced_keys {
            let _ = out.execute(PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
        // Best-effort: undo modes enabled while rendering.
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
    }
}

/// A terminal acting as the presentation surface. The painter decides whether
/// it behaves like a window (half-block cells) or an image canvas (kitty).
pub struct TerminalSurface {
    painter: Box<dyn Painter>,
    out: BufWriter<Stdout>,
    keys: KeyState,
    closed: bool,
    status: String,
    sync_updates: bool,
    size: (u16, u16),
    _guard: TerminalGuard,
}

impl TerminalSurface {
    pub fn open(painter: Box<dyn Painter>, sync_updates: bool) -> anyhow::Result<Self> {
        let guard = TerminalGuard::new()?;
        let size = terminal::size().context("get terminal size")?;
        if size.1 < 2 || size.0 < 4 {
            return Err(anyhow::anyhow!(
                "terminal too small (need at least 4x2, got {}x{})",
                size.0,
                size.1
            ));
        }
        debug!(
            "terminal surface: painter={} size={}x{} key-release={}",
            painter.name(),
            size.0,
            size.1,
            guard.reports_release()
        );
        Ok(Self {
            painter,
            out: BufWriter::new(TerminalGuard::stdout()),
            keys: KeyState::new(guard.reports_release()),
            closed: false,
            status: String::new(),
            sync_updates,
            size,
            _guard: guard,
        })
    }

    fn handle_key(&mut self, k: KeyEvent) {
        if k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c')) {
            self.closed = true;
            return;
        }
        if matches!(
            k.code,
            KeyCode::Modifier(ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift)
        ) {
            self.apply(Key::Shift, k.kind);
            return;
        }
        self.keys
            .set_held(Key::Shift, k.modifiers.contains(KeyModifiers::SHIFT));
        if let Some(key) = map_key(k.code) {
            self.apply(key, k.kind);
        }
    }

    fn apply(&mut self, key: Key, kind: KeyEventKind) {
        match kind {
            KeyEventKind::Press => self.keys.press(key),
            KeyEventKind::Repeat => self.keys.repeat(key),
            KeyEventKind::Release => self.keys.release(key),
        }
    }
}

pub fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Char(c @ '0'..='9') => Some(Key::Digit(c as u8 - b'0')),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Key::NearEnd),
        KeyCode::Char(' ') => Some(Key::Freeze),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Key::Exit),
        _ => None,
    }
}

impl KeyQuery for TerminalSurface {
    fn just_pressed(&self, key: Key) -> bool {
        self.keys.just_pressed(key)
    }

    fn pressed(&self, key: Key) -> bool {
        self.keys.pressed(key)
    }
}

impl Surface for TerminalSurface {
    fn name(&self) -> &'static str {
        self.painter.name()
    }

    fn poll(&mut self) -> anyhow::Result<()> {
        self.keys.begin_frame();
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) => self.handle_key(k),
                Event::Resize(c, r) => self.size = (c, r),
                _ => {}
            }
        }
        Ok(())
    }

    fn close_requested(&self) -> bool {
        self.closed
    }

    fn request_close(&mut self) {
        self.closed = true;
    }

    fn row_order(&self) -> RowOrder {
        self.painter.row_order()
    }

    fn set_title(&mut self, title: &str) {
        self.status = title.to_string();
        let _ = self.out.execute(terminal::SetTitle(title));
    }

    fn present(&mut self, pixels: &PixelBuffer) -> anyhow::Result<()> {
        let (term_cols, term_rows) = self.size;
        let hud_rows = 1u16.min(term_rows.saturating_sub(1));
        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows: term_rows.saturating_sub(hud_rows).max(1),
            pixels,
            hud: &self.status,
            hud_rows,
            sync_updates: self.sync_updates,
        };
        self.painter.paint(&frame, &mut self.out)
    }
}
