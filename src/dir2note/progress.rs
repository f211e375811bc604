use std::io::{stdout, Write};
use std::iter::repeat;
use std::time::{Duration, Instant};

use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::{Attribute, SetAttribute},
    terminal::{Clear, ClearType},
    tty::IsTty,
};

use crate::errors::Result;

/// widest the bar itself gets
pub static BAR_WIDTH: usize = 40;

pub fn istty() -> bool {
    stdout().is_tty()
}

pub fn termsize() -> usize {
    if let Ok((cols, _rows)) = crossterm::terminal::size() {
        cols as usize
    } else {
        0
    }
}

pub fn pretty_line(bold: &str, plain: &str, tty: bool) -> Result<()> {
    let mut stdout = stdout();
    if tty {
        execute!(stdout, SetAttribute(Attribute::Bold))?;
    }
    print!("{}", bold);
    if tty {
        execute!(stdout, SetAttribute(Attribute::Reset))?;
    }
    print!("{}", plain);
    Ok(())
}

fn format_secs(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}

/// `42%|████      |  21/50  elapsed: 3.0s  eta: 4.1s`
pub fn render_bar(current: usize, total: usize, elapsed: Duration, width: usize) -> String {
    let ratio = if total == 0 { 1.0 } else { current.min(total) as f64 / total as f64 };
    let filled = (ratio * width as f64).round() as usize;
    let eta = if current == 0 {
        Duration::ZERO
    } else {
        elapsed.mul_f64((total.saturating_sub(current)) as f64 / current as f64)
    };
    format!("{:>3}%|{}{}|  {}/{}  elapsed: {}  eta: {}",
            (ratio * 100.0).floor() as usize,
            repeat('█').take(filled).collect::<String>(),
            repeat(' ').take(width - filled).collect::<String>(),
            current,
            total,
            format_secs(elapsed),
            format_secs(eta))
}

/// Draws run progress on stdout. Silent when disabled or not on a terminal.
pub struct Progress {
    enabled: bool,
    total: usize,
    current: usize,
    started: Instant,
}

impl Progress {
    pub fn new(enabled: bool) -> Progress {
        Progress {
            enabled: enabled && istty(),
            total: 0,
            current: 0,
            started: Instant::now(),
        }
    }

    pub fn calculating(&mut self) -> Result<()> {
        if self.enabled {
            print!("Calculating...");
            stdout().flush()?;
        }
        Ok(())
    }

    pub fn start(&mut self, total: usize) -> Result<()> {
        self.total = total;
        self.current = 0;
        self.started = Instant::now();
        self.draw()
    }

    pub fn tick(&mut self) -> Result<()> {
        self.current += 1;
        self.draw()
    }

    /// Clear the bar so normal output can follow.
    pub fn finish(&mut self) -> Result<()> {
        if self.enabled {
            execute!(stdout(), MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }
        Ok(())
    }

    fn draw(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        // leave room for the counters around the bar
        let cols = termsize();
        let width = if cols > 60 { BAR_WIDTH.min(cols - 60) } else { 10 };
        let line = render_bar(self.current, self.total, self.started.elapsed(), width);
        let mut out = stdout();
        execute!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        write!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}
