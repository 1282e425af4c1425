//! OSC packets: messages and bundles
//!
//! A packet is either a single message or a bundle of packets. VMC senders
//! usually ship one bundle per frame holding the root, every bone, the
//! blendshape values and a final `/VMC/Ext/Blend/Apply`.

use bytes::Bytes;
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use vmc_core::{Message, Value, VmcError, VmcResult};

/// Time tag meaning "apply immediately"
pub const IMMEDIATE: u64 = 1;

/// Largest datagram accepted from the network
pub const MAX_PACKET_SIZE: usize = 65536;

/// Nesting limit for bundles inside bundles
pub const MAX_BUNDLE_DEPTH: usize = 16;

/// OSC bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    /// NTP time tag, seconds in the high word
    pub time_tag: u64,
    /// Contained packets in wire order
    pub packets: Vec<Packet>,
}

impl Bundle {
    pub fn new(packets: Vec<Packet>) -> Self {
        Bundle {
            time_tag: IMMEDIATE,
            packets,
        }
    }
}

/// OSC packet
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl Packet {
    /// Parse a packet from a datagram
    pub fn parse(buf: &[u8]) -> VmcResult<Self> {
        let (_, packet) = rosc::decoder::decode_udp(buf)
            .map_err(|e| VmcError::InvalidWireFormat(format!("{:?}", e)))?;
        from_osc(packet, 0)
    }

    /// Flatten into messages, depth-first in wire order
    pub fn into_messages(self) -> Vec<Message> {
        let mut out = Vec::new();
        self.collect_messages(&mut out);
        out
    }

    fn collect_messages(self, out: &mut Vec<Message>) {
        match self {
            Packet::Message(msg) => out.push(msg),
            Packet::Bundle(bundle) => {
                for packet in bundle.packets {
                    packet.collect_messages(out);
                }
            }
        }
    }

    /// Serialize to a new buffer
    pub fn to_bytes(&self) -> VmcResult<Bytes> {
        let bytes = rosc::encoder::encode(&to_osc(self))
            .map_err(|e| VmcError::InvalidWireFormat(format!("{:?}", e)))?;
        Ok(Bytes::from(bytes))
    }
}

impl From<Message> for Packet {
    fn from(msg: Message) -> Self {
        Packet::Message(msg)
    }
}

fn from_osc(packet: OscPacket, depth: usize) -> VmcResult<Packet> {
    match packet {
        OscPacket::Message(msg) => message_from_osc(msg).map(Packet::Message),
        OscPacket::Bundle(bundle) => {
            if depth >= MAX_BUNDLE_DEPTH {
                return Err(VmcError::InvalidWireFormat("Bundle nested too deep".into()));
            }
            let packets = bundle
                .content
                .into_iter()
                .map(|p| from_osc(p, depth + 1))
                .collect::<VmcResult<Vec<_>>>()?;
            Ok(Packet::Bundle(Bundle {
                time_tag: time_tag_from_osc(bundle.timetag),
                packets,
            }))
        }
    }
}

fn message_from_osc(msg: OscMessage) -> VmcResult<Message> {
    let values = msg
        .args
        .into_iter()
        .map(value_from_osc)
        .collect::<VmcResult<Vec<_>>>()?;
    Ok(Message::new(msg.addr, values))
}

fn value_from_osc(arg: OscType) -> VmcResult<Value> {
    let value = match arg {
        OscType::Int(v) => Value::Int(v),
        OscType::Float(v) => Value::Float(v),
        OscType::String(v) => Value::String(v),
        OscType::Blob(v) => Value::Blob(v),
        OscType::Long(v) => Value::Long(v),
        OscType::Double(v) => Value::Double(v),
        OscType::Bool(v) => Value::Bool(v),
        // Impulse carries no data
        OscType::Nil | OscType::Inf => Value::Nil,
        OscType::Time(_) => return Err(VmcError::UnsupportedTypeTag('t')),
        OscType::Char(_) => return Err(VmcError::UnsupportedTypeTag('c')),
        OscType::Color(_) => return Err(VmcError::UnsupportedTypeTag('r')),
        OscType::Midi(_) => return Err(VmcError::UnsupportedTypeTag('m')),
        OscType::Array(_) => return Err(VmcError::UnsupportedTypeTag('[')),
    };
    Ok(value)
}

fn to_osc(packet: &Packet) -> OscPacket {
    match packet {
        Packet::Message(msg) => OscPacket::Message(OscMessage {
            addr: msg.address.clone(),
            args: msg.values.iter().map(value_to_osc).collect(),
        }),
        Packet::Bundle(bundle) => OscPacket::Bundle(OscBundle {
            timetag: time_tag_to_osc(bundle.time_tag),
            content: bundle.packets.iter().map(to_osc).collect(),
        }),
    }
}

fn value_to_osc(value: &Value) -> OscType {
    match value {
        Value::Int(v) => OscType::Int(*v),
        Value::Float(v) => OscType::Float(*v),
        Value::String(v) => OscType::String(v.clone()),
        Value::Blob(v) => OscType::Blob(v.clone()),
        Value::Long(v) => OscType::Long(*v),
        Value::Double(v) => OscType::Double(*v),
        Value::Bool(v) => OscType::Bool(*v),
        Value::Nil => OscType::Nil,
    }
}

fn time_tag_from_osc(time: OscTime) -> u64 {
    (u64::from(time.seconds) << 32) | u64::from(time.fractional)
}

fn time_tag_to_osc(time_tag: u64) -> OscTime {
    OscTime {
        seconds: (time_tag >> 32) as u32,
        fractional: time_tag as u32,
    }
}
