//! "Copy text" capability.

use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::Result;

pub trait Clipboard {
    fn copy_text(&mut self, text: &str) -> Result<()>;
}

/// Copies through the terminal using the OSC 52 escape sequence.
pub struct Osc52Clipboard<W: Write> {
    out: W,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Osc52Clipboard { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn copy_text(&mut self, text: &str) -> Result<()> {
        write!(self.out, "\x1b]52;c;{}\x07", STANDARD.encode(text))?;
        self.out.flush()?;
        Ok(())
    }
}
