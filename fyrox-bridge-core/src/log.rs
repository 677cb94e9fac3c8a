// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Process-wide logger. Messages go to stdout and, optionally, to a file. Every message is also
//! forwarded to registered listeners, which is how tests and tools observe what the bridge
//! reports from places that cannot return errors (drop-time reclamation, for example).

use crate::parking_lot::Mutex;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{
    collections::hash_map::Entry,
    fmt::{Debug, Display},
    io::{self, Write},
    path::Path,
    sync::{mpsc::Sender, LazyLock},
    time::{Duration, Instant},
};

/// A message delivered to every log listener.
#[derive(Debug, Clone)]
pub struct LogMessage {
    /// Severity of the message.
    pub kind: MessageKind,
    /// Message text without the severity prefix.
    pub content: String,
    /// Time elapsed since the logger was first touched.
    pub time: Duration,
}

static LOG: LazyLock<Mutex<Log>> = LazyLock::new(|| {
    Mutex::new(Log {
        file: None,
        verbosity: MessageKind::Information,
        listeners: Default::default(),
        time_origin: Instant::now(),
        one_shot_sources: Default::default(),
    })
});

/// Severity of a log message.
#[derive(
    Debug, Default, Copy, Clone, PartialOrd, PartialEq, Eq, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum MessageKind {
    /// Some useful information.
    #[default]
    Information = 0,
    /// Something suspicious that did not stop the operation.
    Warning = 1,
    /// An operation failed.
    Error = 2,
}

impl MessageKind {
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

/// See module docs.
pub struct Log {
    file: Option<std::fs::File>,
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
    time_origin: Instant,
    one_shot_sources: FxHashMap<u64, String>,
}

impl Log {
    /// Creates (or truncates) a log file at the given path. All subsequent messages are
    /// duplicated into it.
    pub fn set_file_name<P: AsRef<Path>>(path: P) {
        LOG.lock().file = std::fs::File::create(path).ok();
    }

    fn write_internal(&mut self, id: Option<u64>, kind: MessageKind, message: &str) -> bool {
        if kind < self.verbosity {
            return false;
        }

        if let Some(id) = id {
            match self.one_shot_sources.entry(id) {
                Entry::Occupied(mut previous) => {
                    if previous.get() == message {
                        return false;
                    }
                    previous.insert(message.to_owned());
                }
                Entry::Vacant(entry) => {
                    entry.insert(message.to_owned());
                }
            }
        }

        let time = self.time_origin.elapsed();
        self.listeners.retain(|listener| {
            listener
                .send(LogMessage {
                    kind,
                    content: message.to_owned(),
                    time,
                })
                .is_ok()
        });

        let mut line = String::with_capacity(message.len() + 16);
        line.push_str(kind.prefix());
        line.push_str(message);
        line.push('\n');

        let _ = io::stdout().write_all(line.as_bytes());
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }

        true
    }

    /// Writes a line of the given severity.
    pub fn writeln<S>(kind: MessageKind, msg: S)
    where
        S: AsRef<str>,
    {
        LOG.lock().write_internal(None, kind, msg.as_ref());
    }

    /// Writes a line only if the last message written with the same `id` differs from this one.
    /// Useful for diagnostics that could otherwise be repeated every frame. Returns `true` if
    /// the message was written.
    pub fn writeln_once<S>(id: u64, kind: MessageKind, msg: S) -> bool
    where
        S: AsRef<str>,
    {
        LOG.lock().write_internal(Some(id), kind, msg.as_ref())
    }

    /// Writes an information message.
    pub fn info<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Information, msg)
    }

    /// Writes a warning message.
    pub fn warn<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Warning, msg)
    }

    /// Writes an error message.
    pub fn err<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Error, msg)
    }

    /// Writes a warning once per `id`. See [`Self::writeln_once`].
    pub fn warn_once<S>(id: u64, msg: S) -> bool
    where
        S: AsRef<str>,
    {
        Self::writeln_once(id, MessageKind::Warning, msg)
    }

    /// Sets the minimal severity that will be written.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Returns the minimal severity that will be written.
    pub fn verbosity() -> MessageKind {
        LOG.lock().verbosity
    }

    /// Adds a listener that receives a copy of every written message.
    pub fn add_listener(listener: Sender<LogMessage>) {
        LOG.lock().listeners.push(listener)
    }

    /// Writes the error of a failed operation, if any. Use it where an error can be ignored but
    /// should still end up in the log.
    pub fn verify<T, E>(result: Result<T, E>)
    where
        E: Debug,
    {
        if let Err(e) = result {
            Self::err(format!("Operation failed! Reason: {e:?}"));
        }
    }

    /// Same as [`Self::verify`], but prefixes the reason with a custom message.
    pub fn verify_message<S, T, E>(result: Result<T, E>, msg: S)
    where
        E: Debug,
        S: Display,
    {
        if let Err(e) = result {
            Self::err(format!("{msg}. Reason: {e:?}"));
        }
    }
}

/// Formats and writes an information message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::Log::info(format!($($arg)*))
    };
}

/// Formats and writes a warning message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::Log::warn(format!($($arg)*))
    };
}

/// Formats and writes an error message.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::log::Log::err(format!($($arg)*))
    };
}
