// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::codec::{self, Decoded};
use crate::error::{Error, Result, Transmission};
use crate::protocol::*;
use crate::serial::{drain, read_byte, SerialPort};

// ============================================================================
// States
// ============================================================================

/// ENQ written, waiting for the camera to grant the line
pub struct SeekAck;
/// Both sides asked to send; waiting for the camera to back off
pub struct Collision;
/// Frame written, waiting for ACK or NACK
pub struct Sending;
/// Waiting for the camera to ask to send
pub struct AwaitPeerEnq;
pub struct Receiving;
/// Frame accepted, waiting for the camera to close it
pub struct AwaitEot;
/// Continuation frame accepted, waiting for the camera's next ENQ
pub struct AwaitNextEnq;

// ============================================================================
// FSM Structure
// ============================================================================

pub struct LinkFsm<'p, State> {
    state: PhantomData<State>,
    port: &'p mut dyn SerialPort,
    frames: VecDeque<Vec<u8>>,
    received: Vec<u8>,
    more: bool,
    timeout: Duration,
    attempts: u32,
}

/// What a state hands back to the runner.
pub enum Step<'p> {
    Next(Box<dyn LinkState<'p> + 'p>),
    Sent,
    Received(Vec<u8>),
}

// ============================================================================
// Trait
// ============================================================================

pub trait LinkState<'p> {
    fn step(self: Box<Self>) -> Result<Step<'p>>;
}

// ============================================================================
// Helpers
// ============================================================================

fn state_name<S>() -> &'static str {
    let type_name = std::any::type_name::<S>();
    type_name.rsplit("::").next().unwrap_or(type_name)
}

fn is_timeout(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::TimedOut
}

impl<'p, S: 'p> LinkFsm<'p, S> {
    fn transition<T: 'p>(self) -> Box<LinkFsm<'p, T>> {
        trace!(from = state_name::<S>(), to = state_name::<T>(), "link transition");
        Box::new(LinkFsm {
            state: PhantomData,
            port: self.port,
            frames: self.frames,
            received: self.received,
            more: self.more,
            timeout: self.timeout,
            attempts: 0,
        })
    }

    fn stay(self) -> Result<Step<'p>>
    where
        LinkFsm<'p, S>: LinkState<'p>,
    {
        Ok(Step::Next(Box::new(self)))
    }

    fn io_error(&self, e: std::io::Error) -> Error {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name::<S>()),
        ))
    }

    fn unexpected(&self, byte: u8, context: &'static str) -> Error {
        warn!(byte, state = state_name::<S>(), "unexpected byte from camera");
        Transmission::UnexpectedByte { byte, context }.into()
    }

    fn write(&mut self, byte: u8) -> Result<()> {
        trace!(byte, "write control byte");
        self.port.write_all(&[byte]).map_err(|e| self.io_error(e))
    }

    fn read(&mut self, timeout: Duration) -> std::io::Result<u8> {
        let byte = read_byte(&mut *self.port, timeout)?;
        trace!(byte, "read control byte");
        Ok(byte)
    }
}

// ============================================================================
// Sending States
// ============================================================================

impl<'p> LinkState<'p> for LinkFsm<'p, SeekAck> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        fsm.attempts += 1;
        fsm.write(ENQ)?;

        match fsm.read(DEFAULT_TIMEOUT) {
            Ok(ACK) => Ok(Step::Next(fsm.transition::<Sending>())),
            Ok(ENQ) => {
                debug!("camera also wants to send; refusing");
                fsm.write(NACK)?;
                Ok(Step::Next(fsm.transition::<Collision>()))
            }
            Ok(byte) => {
                if byte != NACK {
                    let dropped = drain(&mut *fsm.port).map_err(|e| fsm.io_error(e))?;
                    warn!(byte, dropped, "discarded unsolicited data while asking to send");
                }
                if fsm.attempts >= ENQ_ATTEMPTS {
                    return Err(Transmission::HandshakeRejected { attempts: fsm.attempts }.into());
                }
                fsm.stay()
            }
            Err(e) if is_timeout(&e) && fsm.attempts < ENQ_ATTEMPTS => fsm.stay(),
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

impl<'p> LinkState<'p> for LinkFsm<'p, Collision> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        match fsm.read(DEFAULT_TIMEOUT) {
            Ok(ACK) => Ok(Step::Next(fsm.transition::<Sending>())),
            Ok(ENQ) => {
                fsm.attempts += 1;
                if fsm.attempts > PEER_ENQ_REPEATS {
                    return Err(Transmission::CollisionUnresolved.into());
                }
                fsm.stay()
            }
            Ok(byte) => Err(fsm.unexpected(byte, "resolving a send collision")),
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

impl<'p> LinkState<'p> for LinkFsm<'p, Sending> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        let written = match fsm.frames.front() {
            Some(frame) => fsm.port.write_all(frame),
            None => return Ok(Step::Sent),
        };
        written.map_err(|e| fsm.io_error(e))?;
        fsm.attempts += 1;

        match fsm.read(DEFAULT_TIMEOUT) {
            Ok(ACK) => {
                fsm.write(EOT)?;
                fsm.frames.pop_front();
                if fsm.frames.is_empty() {
                    Ok(Step::Sent)
                } else {
                    Ok(Step::Next(fsm.transition::<SeekAck>()))
                }
            }
            Ok(NACK) => {
                warn!(attempt = fsm.attempts, "camera rejected frame");
                if fsm.attempts >= SEND_ATTEMPTS {
                    return Err(Transmission::FrameNacked { attempts: fsm.attempts }.into());
                }
                fsm.stay()
            }
            Ok(byte) => Err(fsm.unexpected(byte, "waiting for the frame to be acknowledged")),
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

// ============================================================================
// Receiving States
// ============================================================================

impl<'p> LinkState<'p> for LinkFsm<'p, AwaitPeerEnq> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        match fsm.read(fsm.timeout) {
            Ok(ENQ) => {
                fsm.write(ACK)?;
                Ok(Step::Next(fsm.transition::<Receiving>()))
            }
            Ok(ACK) => {
                fsm.attempts += 1;
                if fsm.attempts >= UNWANTED_ACKS {
                    return Err(Transmission::LinkStuck { acks: fsm.attempts }.into());
                }
                fsm.stay()
            }
            Ok(byte) => {
                warn!(byte, "discarding data until the camera asks to send");
                loop {
                    match fsm.read(DEFAULT_TIMEOUT) {
                        Ok(ENQ) => break,
                        Ok(_) => {}
                        Err(e) => return Err(fsm.io_error(e)),
                    }
                }
                fsm.write(ACK)?;
                Ok(Step::Next(fsm.transition::<Receiving>()))
            }
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

impl<'p> LinkState<'p> for LinkFsm<'p, Receiving> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        let port = &mut *fsm.port;
        let decoded = codec::decode_one(|| read_byte(&mut *port, DEFAULT_TIMEOUT));

        match decoded {
            Ok(Decoded::Valid(frame)) => {
                trace!(len = frame.payload.len(), is_final = frame.is_final, "frame accepted");
                fsm.received.extend_from_slice(&frame.payload);
                fsm.more = !frame.is_final;
                fsm.write(ACK)?;
                Ok(Step::Next(fsm.transition::<AwaitEot>()))
            }
            Ok(Decoded::Rejected(reason)) => {
                fsm.attempts += 1;
                fsm.write(NACK)?;
                if fsm.attempts >= RECEIVE_ATTEMPTS {
                    return Err(Transmission::FrameRejected { reason, attempts: fsm.attempts }.into());
                }
                fsm.stay()
            }
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

impl<'p> LinkState<'p> for LinkFsm<'p, AwaitEot> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        match fsm.read(DEFAULT_TIMEOUT) {
            Ok(EOT) if fsm.more => Ok(Step::Next(fsm.transition::<AwaitNextEnq>())),
            Ok(EOT) => Ok(Step::Received(std::mem::take(&mut fsm.received))),
            Ok(byte) => Err(fsm.unexpected(byte, "waiting for end of transmission")),
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

impl<'p> LinkState<'p> for LinkFsm<'p, AwaitNextEnq> {
    fn step(self: Box<Self>) -> Result<Step<'p>> {
        let mut fsm = *self;

        match fsm.read(DEFAULT_TIMEOUT) {
            Ok(ENQ) => {
                fsm.write(ACK)?;
                Ok(Step::Next(fsm.transition::<Receiving>()))
            }
            Ok(byte) => Err(fsm.unexpected(byte, "waiting for the next frame")),
            Err(e) => Err(fsm.io_error(e)),
        }
    }
}

// ============================================================================
// Constructors & Runner
// ============================================================================

impl<'p> LinkFsm<'p, SeekAck> {
    /// Start sending `payload`, split into as many frames as it needs.
    pub fn send(port: &'p mut dyn SerialPort, payload: &[u8]) -> Box<dyn LinkState<'p> + 'p> {
        Box::new(LinkFsm {
            state: PhantomData::<SeekAck>,
            port,
            frames: codec::encode_chunks(payload, MAX_FRAME_PAYLOAD).into(),
            received: Vec::new(),
            more: false,
            timeout: DEFAULT_TIMEOUT,
            attempts: 0,
        })
    }
}

impl<'p> LinkFsm<'p, AwaitPeerEnq> {
    /// Start receiving one logical message. `timeout` bounds the wait for
    /// the camera's first ENQ only.
    pub fn receive(port: &'p mut dyn SerialPort, timeout: Duration) -> Box<dyn LinkState<'p> + 'p> {
        Box::new(LinkFsm {
            state: PhantomData::<AwaitPeerEnq>,
            port,
            frames: VecDeque::new(),
            received: Vec::new(),
            more: false,
            timeout,
            attempts: 0,
        })
    }
}

/// Step a machine until it finishes or fails.
pub fn run<'p>(mut state: Box<dyn LinkState<'p> + 'p>) -> Result<Step<'p>> {
    loop {
        match state.step()? {
            Step::Next(next) => state = next,
            done => return Ok(done),
        }
    }
}

// ============================================================================
// Link
// ============================================================================

/// One open session with a camera. Owns the transport exclusively.
pub struct Link {
    port: Box<dyn SerialPort>,
}

impl Link {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Link { port }
    }

    /// Session handshake run once after opening the port.
    pub fn init(&mut self) -> Result<()> {
        debug!("initializing session");
        self.handshake()
    }

    /// Session handshake run before closing the port.
    pub fn exit(&mut self) -> Result<()> {
        debug!("closing session");
        self.handshake()
    }

    fn handshake(&mut self) -> Result<()> {
        let mut timeouts = 0;
        let mut noise = 0;
        loop {
            self.port.write_all(&[ENQ])?;
            match read_byte(self.port.as_mut(), DEFAULT_TIMEOUT) {
                Ok(ACK) => return Ok(()),
                Ok(byte) => {
                    noise += 1;
                    let dropped = drain(self.port.as_mut())?;
                    warn!(byte, dropped, "discarded line noise during handshake");
                    if noise >= NOISE_ROUNDS {
                        return Err(Transmission::UnexpectedByte {
                            byte,
                            context: "waiting for the session handshake",
                        }
                        .into());
                    }
                }
                Err(e) if is_timeout(&e) => {
                    timeouts += 1;
                    if timeouts >= ENQ_ATTEMPTS {
                        return Err(e.into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send one logical message.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        debug!(len = payload.len(), "sending message");
        run(LinkFsm::send(self.port.as_mut(), payload))?;
        Ok(())
    }

    /// Receive one logical message, waiting up to `timeout` for the camera
    /// to start.
    pub fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let data = into_message(run(LinkFsm::receive(self.port.as_mut(), timeout))?)?;
        debug!(len = data.len(), "received message");
        Ok(data)
    }

    pub fn port_mut(&mut self) -> &mut dyn SerialPort {
        self.port.as_mut()
    }
}

fn into_message(step: Step<'_>) -> Result<Vec<u8>> {
    match step {
        Step::Received(data) => Ok(data),
        Step::Sent | Step::Next(_) => Err(Transmission::NoMessage.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
