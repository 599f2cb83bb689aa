use std::sync::Arc;

use crate::{
    channel::{AnimationInput, AnimationSubscriber},
    visual::VisualState,
    visualizer::{ArtWidget, Surface},
};

/// The render-domain half of a session.
///
/// Owns the only [`Surface`] and a frame counter. Each [`tick`](Self::tick)
/// reads the published cell without blocking and repaints the surface from
/// `(input, frame)`. Nothing the data pipeline does can replace the surface.
pub struct Renderer {
    subscriber: AnimationSubscriber,
    input: Arc<AnimationInput>,
    frame: u64,
    visual: VisualState,
    surface: Surface,
}

impl Renderer {
    pub fn new(subscriber: AnimationSubscriber, cols: u16, rows: u16) -> Self {
        let input = subscriber.latest();
        let visual = VisualState::derive(&input, 0);
        Renderer {
            subscriber,
            input,
            frame: 0,
            visual,
            surface: Surface::new(cols, rows),
        }
    }

    /// Advance one frame.
    pub fn tick(&mut self) -> VisualState {
        // A publish in progress just means we draw last frame's input again.
        if let Some(latest) = self.subscriber.try_latest() {
            self.input = latest;
        }
        self.frame = self.frame.wrapping_add(1);
        self.visual = VisualState::derive(&self.input, self.frame);
        self.surface.paint(&self.visual, self.frame);
        self.visual
    }

    pub fn resize(&mut self, cols: u16) {
        self.surface.resize(cols);
        self.surface.paint(&self.visual, self.frame);
    }

    pub fn input(&self) -> &AnimationInput {
        &self.input
    }

    pub fn visual(&self) -> &VisualState {
        &self.visual
    }

    #[cfg(test)]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn widget(&self) -> ArtWidget<'_> {
        ArtWidget::new(&self.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{published, PlaybackStatus};

    fn playing(progress_ms: u64, line: &str, version: u64) -> AnimationInput {
        AnimationInput {
            status: PlaybackStatus::Active,
            progress_ms,
            duration_ms: 200_000,
            is_playing: true,
            active_line: Some(line.into()),
            version,
            ..AnimationInput::default()
        }
    }

    #[test]
    fn frame_counter_only_increases() {
        let (_tx, rx) = published(AnimationInput::default());
        let mut r = Renderer::new(rx, 40, 10);
        assert_eq!(r.frame(), 0);
        for expected in 1..=5 {
            r.tick();
            assert_eq!(r.frame(), expected);
        }
    }

    #[test]
    fn publications_never_replace_the_surface() {
        let (tx, rx) = published(AnimationInput::default());
        let mut r = Renderer::new(rx, 40, 10);
        let id = r.surface().id();

        tx.publish(playing(53_000, "same line", 1));
        let a = r.tick();
        tx.publish(playing(53_000, "same line", 2));
        let b = r.tick();

        assert_eq!(r.surface().id(), id);
        assert_eq!(a.intensity, b.intensity);
        // Identical inputs: differences come from the frame counter alone.
        assert_eq!(a, VisualState::derive(&playing(53_000, "same line", 1), 1));
        assert_eq!(b, VisualState::derive(&playing(53_000, "same line", 1), 2));
        assert_ne!(a.hue, b.hue);
    }

    #[test]
    fn picks_up_latest_input() {
        let (tx, rx) = published(AnimationInput::default());
        let mut r = Renderer::new(rx, 40, 10);
        r.tick();
        assert_eq!(r.input().status, PlaybackStatus::Connecting);
        tx.publish(playing(1_000, "abc", 1));
        tx.publish(playing(2_000, "abcd", 2));
        let v = r.tick();
        assert_eq!(r.input().progress_ms, 2_000);
        assert_eq!(v.intensity, 4.0);
        assert!(v.is_playing);
    }

    #[test]
    fn keeps_drawing_without_updates() {
        let (tx, rx) = published(playing(10_000, "line", 1));
        let mut r = Renderer::new(rx, 40, 10);
        drop(tx);
        let first = r.tick();
        let later = (0..30).map(|_| r.tick()).last().unwrap();
        assert_ne!(first.hue, later.hue);
        assert!(r.surface().lit_cells() > 0);
    }

    #[test]
    fn resize_is_in_place() {
        let (_tx, rx) = published(AnimationInput::default());
        let mut r = Renderer::new(rx, 40, 10);
        let id = r.surface().id();
        r.resize(120);
        assert_eq!(r.surface().id(), id);
        assert_eq!(r.surface().cols(), 120);
        assert_eq!(r.surface().rows(), 10);
    }
}
