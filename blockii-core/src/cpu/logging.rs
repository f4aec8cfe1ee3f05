use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::info;

/// Events the CPU narrates while running. They cross a channel to a
/// consumer thread so formatting never happens on the simulation path.
#[derive(Debug, Clone)]
pub enum LogEvent {
    Instruction {
        z: u16,
        code: u16,
        name: &'static str,
        operand: u16,
    },
    Sequence {
        name: &'static str,
    },
    Timer {
        name: &'static str,
    },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogEvent::Instruction {
                z,
                code,
                name,
                operand,
            } => write!(
                f,
                "{:04o}: {:05o} ({:04x}) {{{:<6} {:05o}}}",
                z, code, code, name, operand
            ),
            LogEvent::Sequence { name } => write!(f, "----: {}", name),
            LogEvent::Timer { name } => write!(f, "Timer {} fired!", name),
        }
    }
}

/// Sending half of the event channel. The queue is bounded and the
/// send never blocks: when the consumer falls behind, events are
/// dropped and counted instead of stalling the simulation.
pub struct EventLogger {
    tx: Sender<LogEvent>,
    dropped: u64,
}

impl EventLogger {
    pub fn channel(capacity: usize) -> (EventLogger, Receiver<LogEvent>) {
        let (tx, rx) = bounded(capacity);
        (EventLogger { tx, dropped: 0 }, rx)
    }

    pub fn log(&mut self, event: LogEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Which event types the consumer prints.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub instructions: bool,
    pub sequences: bool,
    pub timers: bool,
}

impl EventFilter {
    pub fn all() -> EventFilter {
        EventFilter {
            instructions: true,
            sequences: true,
            timers: true,
        }
    }

    fn enabled(&self, event: &LogEvent) -> bool {
        match event {
            LogEvent::Instruction { .. } => self.instructions,
            LogEvent::Sequence { .. } => self.sequences,
            LogEvent::Timer { .. } => self.timers,
        }
    }
}

/// Drains the channel until every sender is gone. Meant to run on its
/// own thread next to the CPU.
pub fn consume(rx: Receiver<LogEvent>, filter: EventFilter) {
    for event in rx {
        if filter.enabled(&event) {
            println!("{}", event);
        }
    }
    info!("event consumer drained");
}

#[cfg(test)]
mod logging_tests {
    use super::*;

    #[test]
    fn full_queue_drops_and_counts() {
        let (mut logger, rx) = EventLogger::channel(2);
        logger.log(LogEvent::Timer { name: "TIME4" });
        logger.log(LogEvent::Timer { name: "TIME5" });
        logger.log(LogEvent::Timer { name: "TIME4" });

        assert_eq!(1, logger.dropped());
        assert_eq!(2, rx.len());
    }

    #[test]
    fn disconnected_consumer_never_blocks() {
        let (mut logger, rx) = EventLogger::channel(1);
        drop(rx);
        logger.log(LogEvent::Sequence { name: "PINC TIME1" });
        assert_eq!(1, logger.dropped());
    }

    #[test]
    fn instruction_event_format() {
        let e = LogEvent::Instruction {
            z: 0o4000,
            code: 0o14000,
            name: "TCF",
            operand: 0o4000,
        };
        assert_eq!("4000: 14000 (1800) {TCF    04000}", e.to_string());
    }
}
