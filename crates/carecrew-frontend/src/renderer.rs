use std::{
    io::{self, Write},
    sync::{Mutex, PoisonError},
};

use crate::overlay::{DismissReason, OverlayRenderer, OverlayView, RenderTarget, Rgb};

/// Draws overlays as coloured lines on a terminal.
pub struct TerminalRenderer<W> {
    out: Mutex<W>,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn draw(out: &mut W, target: &RenderTarget, view: &OverlayView) -> io::Result<()> {
        let style = view.style;
        let Rgb(r, g, b) = style.color;
        writeln!(
            out,
            "\x1b[38;2;{r};{g};{b}m{} {}\x1b[0m {} [{}, {:.1}s, top {}px]",
            style.icon,
            style.label,
            view.title,
            target.id,
            view.duration.as_secs_f32(),
            target.position.top,
        )?;
        if !view.description.is_empty() {
            writeln!(out, "    {}", view.description)?;
        }
        out.flush()
    }
}

impl<W: Write + Send + 'static> OverlayRenderer for TerminalRenderer<W> {
    fn mount(&self, target: &RenderTarget, view: &OverlayView) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = Self::draw(&mut out, target, view) {
            log::warn!("Failed to draw {}: {error}", target.id);
        }
    }

    fn unmount(&self, target: &RenderTarget, reason: DismissReason) {
        log::debug!("Removed {} ({reason:?})", target.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use carecrew_bridge::alert::AlertKind;

    use super::*;
    use crate::overlay::{AlertStyle, OverlayHost};

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn mounted_overlay_is_written_with_its_style() {
        let renderer = std::sync::Arc::new(TerminalRenderer::new(Vec::new()));
        let host = OverlayHost::new(
            renderer.clone(),
            Duration::from_millis(3000),
            Default::default(),
        );
        host.show(
            carecrew_bridge::alert::AlertPayload::new("Training Completed", "28 workers certified")
                .with_kind(AlertKind::Success),
        );

        let written = String::from_utf8(renderer.out.lock().unwrap().clone()).unwrap();
        let style = AlertStyle::for_kind(AlertKind::Success);
        assert!(written.contains(style.icon));
        assert!(written.contains("Success\x1b[0m Training Completed"));
        assert!(written.contains("3.0s, top 16px"));
        assert!(written.ends_with("    28 workers certified\n"));
    }
}
