//! Telnet control-sequence parser.
//!
//! The device console speaks a small subset of the telnet protocol:
//! option negotiation (`IAC WILL/WONT/DO/DONT <option>`), the escaped
//! literal `0xFF` byte, and a vendor quirk where a caret introduces a
//! three-byte control sequence. Everything else passes through as text.

use log::{debug, trace};
use memchr::memchr2;

/// Telnet "interpret as command" escape byte.
pub(crate) const IAC: u8 = 255;

/// Suppress go-ahead, the only option granted to the peer.
pub(crate) const OPT_SGA: u8 = 3;

/// Caret control sequences carry two more bytes after the introducer.
const NOISE_INTRO: u8 = b'^';
const NOISE_LEN: u8 = 2;

/// Telnet negotiation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verb {
    Will = 251,
    Wont = 252,
    Do = 253,
    Dont = 254,
}

impl Verb {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            251 => Some(Verb::Will),
            252 => Some(Verb::Wont),
            253 => Some(Verb::Do),
            254 => Some(Verb::Dont),
            _ => None,
        }
    }

    /// Verb that grants the option: WILL answers DO, DO answers the rest.
    fn granting(self) -> Verb {
        if self == Verb::Do { Verb::Will } else { Verb::Do }
    }

    /// Verb that refuses the option: WONT answers DO, DONT answers the rest.
    fn refusing(self) -> Verb {
        if self == Verb::Do { Verb::Wont } else { Verb::Dont }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain text.
    Normal,

    /// Consumed an escape byte, expecting a verb.
    Escape,

    /// Consumed an escape byte and a verb, expecting an option.
    Option(Verb),

    /// Discarding the remainder of a caret sequence.
    Noise(u8),
}

/// Incremental telnet parser for a single read pass.
///
/// Raw bytes are fed in as they arrive from the socket. Printable text
/// accumulates in the output buffer while negotiation replies queue
/// separately for the transport to write back. Dropping the parser
/// mid-sequence abandons the partial control sequence, which is what a
/// read pass ending on a truncated negotiation calls for.
#[derive(Debug)]
pub(crate) struct TelnetParser {
    state: State,
    output: Vec<u8>,
    replies: Vec<u8>,
}

impl TelnetParser {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            output: Vec::with_capacity(4096),
            replies: Vec::new(),
        }
    }

    /// Consume a chunk of raw bytes from the wire.
    pub fn feed(&mut self, data: &[u8]) {
        let mut rest = data;
        while !rest.is_empty() {
            match self.state {
                State::Normal => match memchr2(IAC, NOISE_INTRO, rest) {
                    Some(idx) => {
                        self.output.extend_from_slice(&rest[..idx]);
                        self.state = if rest[idx] == IAC {
                            State::Escape
                        } else {
                            State::Noise(NOISE_LEN)
                        };
                        rest = &rest[idx + 1..];
                    }
                    None => {
                        self.output.extend_from_slice(rest);
                        rest = &[];
                    }
                },
                State::Escape => {
                    let byte = rest[0];
                    rest = &rest[1..];
                    if byte == IAC {
                        // Escaped literal 0xFF.
                        self.output.push(IAC);
                        self.state = State::Normal;
                    } else if let Some(verb) = Verb::from_byte(byte) {
                        self.state = State::Option(verb);
                    } else {
                        trace!("discarding unsupported telnet command {byte}");
                        self.state = State::Normal;
                    }
                }
                State::Option(verb) => {
                    let option = rest[0];
                    rest = &rest[1..];
                    self.reply(verb, option);
                    self.state = State::Normal;
                }
                State::Noise(remaining) => {
                    let skip = (remaining as usize).min(rest.len());
                    rest = &rest[skip..];
                    let left = remaining - skip as u8;
                    self.state = if left == 0 {
                        State::Normal
                    } else {
                        State::Noise(left)
                    };
                }
            }
        }
    }

    /// Drain the queued negotiation replies for writing back to the peer.
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }

    /// Consume the parser, returning the accumulated text.
    pub fn into_text(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Accumulated printable bytes.
    #[cfg(test)]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Queue the response to a negotiation request. Suppress go-ahead
    /// is granted, every other option is refused.
    fn reply(&mut self, verb: Verb, option: u8) {
        let answer = if option == OPT_SGA {
            verb.granting()
        } else {
            verb.refusing()
        };
        debug!("negotiation: {verb:?} option {option} answered with {answer:?}");
        self.replies.extend_from_slice(&[IAC, answer as u8, option]);
    }
}
