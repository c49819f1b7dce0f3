//! Recording collaborators for driving the bridge without a UI.

use std::sync::Arc;

use core_abi::{BridgeError, ErrorCode};
use hub::{
    Collaborators, DeviceLeds, Inspector, Notices, Preferences, SerialLog, SoundCues, StatusBar,
    Toolbar,
};
use parking_lot::Mutex;
use world::{DeviceSlot, PowerLed, SerialDirection, SoundCue, SpeedSample};

/// One observed collaborator call.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Status,
    Speed(SpeedSample),
    DriveLed { slot: usize, on: bool },
    PowerLed(PowerLed),
    DriveVisible { slot: DeviceSlot, visible: bool },
    Sound(SoundCue),
    Toolbar,
    Serial(SerialDirection, u8),
    SerialClear,
    Inspector,
    Preferences,
    Notice(BridgeError),
}

/// Implements every collaborator trait by appending to a shared log.
#[derive(Debug, Default)]
pub struct Recorder {
    records: Mutex<Vec<Record>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, record: Record) {
        self.records.lock().push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Returns and clears everything recorded so far.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn count(&self, pred: impl Fn(&Record) -> bool) -> usize {
        self.records.lock().iter().filter(|r| pred(r)).count()
    }

    /// Serial bytes seen in one direction, as text. Cleared by `SerialClear`.
    pub fn serial_text(&self, direction: SerialDirection) -> String {
        let records = self.records.lock();
        let start = records
            .iter()
            .rposition(|r| *r == Record::SerialClear)
            .map_or(0, |i| i + 1);
        records[start..]
            .iter()
            .filter_map(|r| match r {
                Record::Serial(d, byte) if *d == direction => Some(char::from(*byte)),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<BridgeError> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                Record::Notice(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notice_codes(&self) -> Vec<ErrorCode> {
        self.notices().iter().map(BridgeError::code).collect()
    }

    /// Latest state reported for a drive LED.
    pub fn drive_led(&self, slot: usize) -> Option<bool> {
        self.records.lock().iter().rev().find_map(|r| match r {
            Record::DriveLed { slot: s, on } if *s == slot => Some(*on),
            _ => None,
        })
    }

    pub fn power_led(&self) -> Option<PowerLed> {
        self.records.lock().iter().rev().find_map(|r| match r {
            Record::PowerLed(led) => Some(*led),
            _ => None,
        })
    }
}

impl StatusBar for Recorder {
    fn refresh(&self) {
        self.push(Record::Status);
    }

    fn show_speed(&self, sample: SpeedSample) {
        self.push(Record::Speed(sample));
    }
}

impl DeviceLeds for Recorder {
    fn set_drive_led(&self, slot: usize, on: bool) {
        self.push(Record::DriveLed { slot, on });
    }

    fn set_power_led(&self, led: PowerLed) {
        self.push(Record::PowerLed(led));
    }

    fn set_drive_visible(&self, slot: DeviceSlot, visible: bool) {
        self.push(Record::DriveVisible { slot, visible });
    }
}

impl SoundCues for Recorder {
    fn play(&self, cue: SoundCue) {
        self.push(Record::Sound(cue));
    }
}

impl Toolbar for Recorder {
    fn validate(&self) {
        self.push(Record::Toolbar);
    }
}

impl SerialLog for Recorder {
    fn append(&self, direction: SerialDirection, byte: u8) {
        self.push(Record::Serial(direction, byte));
    }

    fn clear(&self) {
        self.push(Record::SerialClear);
    }
}

impl Inspector for Recorder {
    fn refresh(&self) {
        self.push(Record::Inspector);
    }
}

impl Preferences for Recorder {
    fn open(&self) {
        self.push(Record::Preferences);
    }
}

impl Notices for Recorder {
    fn notify(&self, error: &BridgeError) {
        self.push(Record::Notice(error.clone()));
    }
}

/// Builds a hub whose every collaborator is the returned recorder.
pub fn make_collaborators() -> (Collaborators, Arc<Recorder>) {
    let recorder = Recorder::new();
    let hub = Collaborators::builder()
        .status_bar(recorder.clone())
        .leds(recorder.clone())
        .sounds(recorder.clone())
        .toolbar(recorder.clone())
        .serial(recorder.clone())
        .inspector(recorder.clone())
        .preferences(recorder.clone())
        .notices(recorder.clone())
        .build()
        .expect("mock hub build");
    (hub, recorder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub::Action;

    #[test]
    fn serial_text_restarts_after_clear() {
        let (hub, recorder) = make_collaborators();
        for byte in *b"ab" {
            hub.apply(Action::AppendSerial {
                direction: SerialDirection::Out,
                byte,
            });
        }
        hub.apply(Action::ClearSerial);
        hub.apply(Action::AppendSerial {
            direction: SerialDirection::In,
            byte: b'x',
        });
        hub.apply(Action::AppendSerial {
            direction: SerialDirection::Out,
            byte: b'c',
        });
        assert_eq!(recorder.serial_text(SerialDirection::Out), "c");
        assert_eq!(recorder.serial_text(SerialDirection::In), "x");
    }

    #[test]
    fn latest_led_state_wins() {
        let (hub, recorder) = make_collaborators();
        hub.apply(Action::SetDriveLed { slot: 0, on: true });
        hub.apply(Action::SetDriveLed { slot: 1, on: true });
        hub.apply(Action::SetDriveLed { slot: 0, on: false });
        assert_eq!(recorder.drive_led(0), Some(false));
        assert_eq!(recorder.drive_led(1), Some(true));
        assert_eq!(recorder.drive_led(2), None);
        assert_eq!(recorder.power_led(), None);
        assert_eq!(recorder.take().len(), 3);
        assert!(recorder.is_empty());
    }
}
