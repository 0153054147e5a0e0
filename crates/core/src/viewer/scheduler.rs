use std::cell::Cell;
use std::rc::Rc;

/// Frame scheduler state for a mounted viewer.
///
/// The host calls [`AnimationLoop::begin_frame`] once per display frame; it
/// reports whether the viewer should update. Stopping is observed by every
/// [`Liveness`] handle, so callbacks that outlive the viewer become no-ops.
#[derive(Debug, Default)]
pub struct AnimationLoop {
    running: Rc<Cell<bool>>,
    frames: u64,
}

/// Cheap handle that tells a host callback whether its loop is still live.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn is_live(&self) -> bool {
        self.0.get()
    }
}

impl AnimationLoop {
    pub fn start(&mut self) {
        // A fresh flag so handles from a previous run stay dead.
        if !self.running.get() {
            self.running = Rc::new(Cell::new(true));
        }
    }

    pub fn stop(&mut self) {
        self.running.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn liveness(&self) -> Liveness {
        Liveness(Rc::clone(&self.running))
    }

    /// Returns true when a frame should be processed.
    pub fn begin_frame(&mut self) -> bool {
        if !self.running.get() {
            return false;
        }
        self.frames += 1;
        true
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_only_run_while_started() {
        let mut anim = AnimationLoop::default();
        assert!(!anim.begin_frame());
        anim.start();
        assert!(anim.begin_frame());
        assert!(anim.begin_frame());
        anim.stop();
        assert!(!anim.begin_frame());
        assert_eq!(anim.frames(), 2);
    }

    #[test]
    fn liveness_follows_stop_and_restart() {
        let mut anim = AnimationLoop::default();
        anim.start();
        let first = anim.liveness();
        assert!(first.is_live());
        anim.stop();
        assert!(!first.is_live());

        anim.start();
        assert!(anim.liveness().is_live());
        assert!(!first.is_live(), "handles from an earlier run stay dead");
    }
}
