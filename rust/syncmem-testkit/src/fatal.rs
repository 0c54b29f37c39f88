use std::sync::Mutex;

use syncmem::{Error, FatalHandler};

/// Records every fatal diagnostic, then panics so the test can catch the unwind.
#[derive(Debug, Default)]
pub struct RecordingFatal {
    messages: Mutex<Vec<String>>,
}

impl RecordingFatal {
    pub fn new() -> RecordingFatal {
        RecordingFatal::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl FatalHandler for RecordingFatal {
    fn fatal(&self, error: &Error) -> ! {
        let message = error.to_string();
        self.messages.lock().unwrap().push(message.clone());
        panic!("fatal memory error: {message}")
    }
}
