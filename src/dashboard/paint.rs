//! In-place frame painting
//!
//! Repaints the dashboard by moving the cursor back over the previous frame
//! and clearing down, so the dashboard stays pinned instead of scrolling.
//! All terminal writes go through the gate: a completion-driven repaint and a
//! keypress-driven export message can never interleave bytes.

use std::io::{self, Write};

use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    queue,
    terminal::{Clear, ClearType},
};

use crate::gate::Gate;

pub struct Painter {
    gate: Gate,
    enabled: bool,
    last_lines: u16,
}

impl Painter {
    /// A disabled painter swallows every frame (non-tty runs, tests).
    pub fn new(enabled: bool, gate: Gate) -> Self {
        Self {
            gate,
            enabled,
            last_lines: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the previous frame with `lines`.
    pub fn repaint(&mut self, lines: &[String]) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let previous = self.last_lines;
        self.last_lines = lines.len() as u16;

        self.gate.run(|| {
            let mut out = io::stdout();
            queue!(out, MoveToColumn(0))?;
            if previous > 0 {
                queue!(out, MoveUp(previous))?;
            }
            queue!(out, Clear(ClearType::FromCursorDown))?;
            for line in lines {
                // Raw mode needs the explicit carriage return.
                write!(out, "{line}\r\n")?;
            }
            out.flush()
        })
    }

    /// Print a block of lines as normal scrolling output (log views, export
    /// failure messages). The next repaint starts fresh below it.
    pub fn print_block(&mut self, lines: &[String]) -> io::Result<()> {
        self.last_lines = 0;
        self.gate.run(|| {
            let mut out = io::stdout();
            queue!(out, MoveToColumn(0))?;
            for line in lines {
                write!(out, "{line}\r\n")?;
            }
            out.flush()
        })
    }
}

impl std::fmt::Debug for Painter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Painter")
            .field("enabled", &self.enabled)
            .field("last_lines", &self.last_lines)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_painter_is_inert() {
        let mut painter = Painter::new(false, Gate::new());
        assert!(!painter.enabled());
        painter.repaint(&["one".into(), "two".into()]).unwrap();
        assert_eq!(painter.last_lines, 0);
    }

    #[test]
    fn print_block_resets_frame_height() {
        let mut painter = Painter::new(false, Gate::new());
        painter.last_lines = 7;
        painter.print_block(&[]).unwrap();
        assert_eq!(painter.last_lines, 0);
    }
}
