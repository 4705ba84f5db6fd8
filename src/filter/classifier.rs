//! Byte-level classifier that strips terminal focus events from input.
//!
//! Focus reporting sends `ESC [ I` when the window gains focus and `ESC [ O`
//! when it loses it. The classifier holds back at most two bytes (`ESC` or
//! `ESC [`) while it waits to see whether a focus event is forming. Anything
//! else is released unchanged, in order. A stalled prefix is released by
//! [`Classifier::on_timeout`].

/// Escape
pub const ESC: u8 = 0x1b;
/// Ctrl+Z
pub const CTRL_Z: u8 = 0x1a;
/// Ctrl+\
pub const CTRL_BACKSLASH: u8 = 0x1c;

const CSI: u8 = b'[';
const FOCUS_IN: u8 = b'I';
const FOCUS_OUT: u8 = b'O';

/// Up to three literal bytes released to the child in one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    bytes: [u8; 3],
    len: u8,
}

impl Chunk {
    fn from_slice(data: &[u8]) -> Self {
        debug_assert!(!data.is_empty() && data.len() <= 3);
        let mut bytes = [0u8; 3];
        bytes[..data.len()].copy_from_slice(data);
        Self {
            bytes,
            len: data.len() as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Something the classifier decided about the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Bytes to write to the child, as-is.
    Forward(Chunk),
    /// Ctrl+Z was typed: suspend the wrapper.
    Suspend,
    /// Ctrl+\ was typed: kill the child and exit.
    Quit,
}

impl Event {
    fn forward(data: &[u8]) -> Self {
        Event::Forward(Chunk::from_slice(data))
    }
}

/// Events produced by a single classifier step. A step never yields more
/// than two (a flushed prefix plus one new event).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Emitted {
    events: [Option<Event>; 2],
}

impl Emitted {
    fn push(&mut self, event: Event) {
        if let Some(slot) = self.events.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events[0].is_none()
    }
}

impl IntoIterator for Emitted {
    type Item = Event;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Option<Event>, 2>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter().flatten()
    }
}

/// Prefix currently held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pending {
    #[default]
    Empty,
    Esc,
    EscBracket,
}

impl Pending {
    fn bytes(self) -> &'static [u8] {
        match self {
            Pending::Empty => &[],
            Pending::Esc => &[ESC],
            Pending::EscBracket => &[ESC, CSI],
        }
    }
}

/// Focus-event filter state machine.
///
/// The classifier does no I/O and keeps no clock. Callers arm a timer whenever
/// [`Classifier::is_pending`] is true after a step and call
/// [`Classifier::on_timeout`] when it fires.
#[derive(Debug, Default)]
pub struct Classifier {
    pending: Pending,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a prefix is being held back.
    pub fn is_pending(&self) -> bool {
        self.pending != Pending::Empty
    }

    /// Bytes currently held back.
    pub fn pending(&self) -> &'static [u8] {
        self.pending.bytes()
    }

    /// Consume one input byte.
    pub fn process(&mut self, byte: u8) -> Emitted {
        let mut out = Emitted::default();

        // Control bytes win over any escape prefix; the prefix is released first.
        let control = match byte {
            CTRL_Z => Some(Event::Suspend),
            CTRL_BACKSLASH => Some(Event::Quit),
            _ => None,
        };
        if let Some(control) = control {
            self.flush_into(&mut out);
            out.push(control);
            return out;
        }

        match (self.pending, byte) {
            (Pending::Empty, ESC) => self.pending = Pending::Esc,
            (Pending::Empty, _) => out.push(Event::forward(&[byte])),

            (Pending::Esc, CSI) => self.pending = Pending::EscBracket,
            // Back-to-back ESC presses: release the first, hold the second.
            (Pending::Esc, ESC) => out.push(Event::forward(&[ESC])),
            (Pending::Esc, _) => {
                out.push(Event::forward(&[ESC, byte]));
                self.pending = Pending::Empty;
            }

            (Pending::EscBracket, FOCUS_IN | FOCUS_OUT) => self.pending = Pending::Empty,
            (Pending::EscBracket, ESC) => {
                out.push(Event::forward(&[ESC, CSI]));
                self.pending = Pending::Esc;
            }
            (Pending::EscBracket, _) => {
                out.push(Event::forward(&[ESC, CSI, byte]));
                self.pending = Pending::Empty;
            }
        }

        out
    }

    /// Release the held prefix unchanged. Called when the escape window lapses
    /// and when input ends.
    pub fn on_timeout(&mut self) -> Emitted {
        let mut out = Emitted::default();
        self.flush_into(&mut out);
        out
    }

    fn flush_into(&mut self, out: &mut Emitted) {
        let held = std::mem::take(&mut self.pending);
        if held != Pending::Empty {
            out.push(Event::forward(held.bytes()));
        }
    }
}
