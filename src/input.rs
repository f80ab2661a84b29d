use crate::throttle::Millis;

/// Tracks drawing activity within the current round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputTracker {
    has_drawn: bool,
    pen_down: bool,
    last_draw: Millis,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_drawn(&self) -> bool {
        self.has_drawn
    }

    pub fn last_draw(&self) -> Millis {
        self.last_draw
    }

    pub fn pen_down(&mut self, now: Millis) {
        self.has_drawn = true;
        self.pen_down = true;
        self.last_draw = now;
    }

    /// Only counts as activity while the pen is down
    pub fn pen_move(&mut self, now: Millis) {
        if self.pen_down {
            self.last_draw = now;
        }
    }

    pub fn pen_up(&mut self, now: Millis) {
        self.pen_down = false;
        if self.has_drawn {
            self.last_draw = now;
        }
    }

    /// Canvas was wiped: nothing is drawn any more, pen state is kept
    pub fn clear(&mut self) {
        self.has_drawn = false;
        self.last_draw = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
