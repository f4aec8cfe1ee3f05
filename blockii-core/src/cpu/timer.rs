/// Cycle accumulator behind the counter registers. The value starts at
/// a (possibly negative) phase offset and collects the MCTs of every
/// executed step; each time it climbs past the interval it sheds one
/// interval and reports the wrap so the CPU can queue the counter's
/// increment sequence.
#[derive(Debug)]
pub struct CycleTimer {
    name: &'static str,
    value: i32,
    interval: i32,
}

impl CycleTimer {
    pub fn new(name: &'static str, interval: i32, offset: i32) -> CycleTimer {
        CycleTimer {
            name,
            value: offset,
            interval,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inc(&mut self, delta: i32) -> bool {
        self.value += delta;
        if self.value >= self.interval {
            self.value -= self.interval;
            return true;
        }
        false
    }
}
