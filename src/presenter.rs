//! Presentation of tracking results.
//!
//! Rendering is done by an external UI layer implementing [`Presenter`]. UI toolkits usually
//! require such calls to happen on a dedicated thread; [`PresenterThread`] forwards all calls to a
//! worker thread owning the actual presenter.

use std::io;

use itertools::Itertools;
use pawawwewism::Worker;

use crate::hand::landmark::{Finger, NUM_LANDMARKS, WRIST_INDEX};
use crate::mapping::DisplayPoint;

/// Receives the skeleton overlay and predicted label for display.
pub trait Presenter {
    /// Draws the hand skeleton. `points` are in canonical joint order.
    fn render(&mut self, points: &[DisplayPoint; NUM_LANDMARKS]);

    /// Displays the predicted label.
    fn set_label(&mut self, text: &str);

    /// Removes the overlay and the label.
    fn clear(&mut self);
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn render(&mut self, points: &[DisplayPoint; NUM_LANDMARKS]) {
        (**self).render(points)
    }

    fn set_label(&mut self, text: &str) {
        (**self).set_label(text)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn render(&mut self, points: &[DisplayPoint; NUM_LANDMARKS]) {
        (**self).render(points)
    }

    fn set_label(&mut self, text: &str) {
        (**self).set_label(text)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

/// A [`Presenter`] that only logs what it is given.
///
/// Useful when running without a display.
#[derive(Debug, Default)]
pub struct LogPresenter {
    label: Option<String>,
}

impl Presenter for LogPresenter {
    fn render(&mut self, points: &[DisplayPoint; NUM_LANDMARKS]) {
        let wrist = points[WRIST_INDEX];
        log::debug!("render: wrist at ({:.1}, {:.1})", wrist.x, wrist.y);
    }

    fn set_label(&mut self, text: &str) {
        if self.label.as_deref() != Some(text) {
            log::info!("label: {text}");
            self.label = Some(text.to_string());
        }
    }

    fn clear(&mut self) {
        if self.label.take().is_some() {
            log::debug!("cleared");
        }
    }
}

enum Command {
    Render(Box<[DisplayPoint; NUM_LANDMARKS]>),
    SetLabel(String),
    Clear,
}

/// Runs a [`Presenter`] on its own thread.
///
/// Calls are forwarded in order. Dropping the [`PresenterThread`] waits until all forwarded calls
/// have been processed.
pub struct PresenterThread {
    worker: Worker<Command>,
}

impl PresenterThread {
    /// Spawns the presentation thread, moving `presenter` onto it.
    pub fn spawn<P: Presenter + Send + 'static>(presenter: P) -> io::Result<Self> {
        let mut presenter = presenter;
        let worker = Worker::builder()
            .name("presenter")
            .spawn(move |command: Command| match command {
                Command::Render(points) => presenter.render(&points),
                Command::SetLabel(text) => presenter.set_label(&text),
                Command::Clear => presenter.clear(),
            })?;
        Ok(Self { worker })
    }
}

impl Presenter for PresenterThread {
    fn render(&mut self, points: &[DisplayPoint; NUM_LANDMARKS]) {
        self.worker.send(Command::Render(Box::new(*points)));
    }

    fn set_label(&mut self, text: &str) {
        self.worker.send(Command::SetLabel(text.to_string()));
    }

    fn clear(&mut self) {
        self.worker.send(Command::Clear);
    }
}

/// Colors used for each finger's overlay, as sRGB.
pub fn finger_color(finger: Finger) -> [u8; 3] {
    match finger {
        Finger::Thumb => [171, 80, 94],
        Finger::Index => [217, 160, 113],
        Finger::Middle => [207, 200, 143],
        Finger::Ring => [165, 176, 144],
        Finger::Little => [96, 120, 115],
    }
}

/// Returns the line segments that make up the overlay of `finger`.
///
/// Each finger is drawn as a chain from its tip down to its base joint, and from there to the
/// wrist.
pub fn finger_segments(
    points: &[DisplayPoint; NUM_LANDMARKS],
    finger: Finger,
) -> impl Iterator<Item = (DisplayPoint, DisplayPoint)> + '_ {
    finger
        .indices()
        .chain([WRIST_INDEX])
        .map(move |i| points[i])
        .tuple_windows()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use nalgebra::Point2;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Render,
        Label(String),
        Clear,
    }

    struct Recorder(Arc<Mutex<Vec<Call>>>);

    impl Presenter for Recorder {
        fn render(&mut self, _: &[DisplayPoint; NUM_LANDMARKS]) {
            self.0.lock().unwrap().push(Call::Render);
        }
        fn set_label(&mut self, text: &str) {
            self.0.lock().unwrap().push(Call::Label(text.into()));
        }
        fn clear(&mut self) {
            self.0.lock().unwrap().push(Call::Clear);
        }
    }

    #[test]
    fn presenter_thread_preserves_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut thread = PresenterThread::spawn(Recorder(calls.clone())).unwrap();
        thread.clear();
        thread.render(&[Point2::origin(); NUM_LANDMARKS]);
        thread.set_label("A");
        thread.set_label("B");
        drop(thread);

        assert_eq!(
            *calls.lock().unwrap(),
            [
                Call::Clear,
                Call::Render,
                Call::Label("A".into()),
                Call::Label("B".into())
            ]
        );
    }

    #[test]
    fn segments_end_at_wrist() {
        let points: [DisplayPoint; NUM_LANDMARKS] =
            std::array::from_fn(|i| Point2::new(i as f32, 0.0));
        let segments = finger_segments(&points, Finger::Index).collect::<Vec<_>>();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], (points[4], points[5]));
        assert_eq!(segments[3], (points[7], points[WRIST_INDEX]));
    }

    #[test]
    fn finger_colors_are_distinct() {
        let colors = Finger::ALL.map(finger_color);
        assert!(colors.iter().all_unique());
    }

    #[test]
    fn log_presenter_tracks_label() {
        let mut presenter = LogPresenter::default();
        presenter.set_label("A");
        presenter.set_label("A");
        assert_eq!(presenter.label.as_deref(), Some("A"));
        presenter.clear();
        assert_eq!(presenter.label, None);
    }
}
