use crate::error::TetherError;
use crate::phase::Phase;
use dialoguer::console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use std::io::{self, IsTerminal, Write};

/// One modal prompt: text plus a fixed set of buttons. Button 0 is always the
/// affirmative choice for the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub phase: Phase,
    pub title: String,
    pub body: String,
    pub buttons: &'static [&'static str],
}

/// Presents a page and blocks until the user picks a button, returning its
/// index into `page.buttons`.
pub trait Shell {
    fn present(&mut self, page: &Page) -> Result<usize, TetherError>;
}

pub struct TerminalShell {
    term: Term,
    theme: ColorfulTheme,
}

impl TerminalShell {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl Shell for TerminalShell {
    fn present(&mut self, page: &Page) -> Result<usize, TetherError> {
        if io::stderr().is_terminal() {
            let _ = self.term.clear_screen();
        }
        self.term
            .write_line(&style(&page.title).bold().cyan().to_string())?;
        self.term.write_line("")?;
        for line in page.body.lines() {
            self.term.write_line(line)?;
        }
        self.term.write_line("")?;
        let choice = Select::with_theme(&self.theme)
            .items(page.buttons)
            .default(0)
            .interact_on(&self.term)?;
        Ok(choice)
    }
}

/// Answers every page with its first button, echoing the page so scripted
/// runs still leave a readable record.
pub struct UnattendedShell<W: Write> {
    out: W,
}

impl<W: Write> UnattendedShell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Shell for UnattendedShell<W> {
    fn present(&mut self, page: &Page) -> Result<usize, TetherError> {
        writeln!(self.out, "== {}", page.title)?;
        for line in page.body.lines() {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out, "> {}", page.buttons[0])?;
        Ok(0)
    }
}
