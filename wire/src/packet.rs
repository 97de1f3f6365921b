//! Typed inbound and outbound packets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::framing::{encode_frame, Frame, Framing};
use crate::limits::Limits;

/// Key carrying the packet type in every object.
pub const TYPE_KEY: &str = "Type";

/// Anatomical type of a joint with six degrees of freedom.
pub const ANATOMICAL_SIX_DOF: i64 = 7;

/// One joint entry of a `JointsStream` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSample {
    #[serde(rename = "Name")]
    pub name: String,

    /// Local rotation as `[x, y, z, w]`.
    #[serde(rename = "R", alias = "LocalRotation")]
    pub rotation: [f64; 4],

    /// Local translation in meters.
    #[serde(rename = "T", alias = "LocalTranslation", default)]
    pub translation: [f64; 3],

    #[serde(
        rename = "Anatom",
        alias = "AnatomicalType",
        default,
        deserialize_with = "deserialize_anatomical_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub anatomical_type: Option<i64>,
}

impl JointSample {
    /// Returns `true` if the translation part should be applied.
    #[must_use]
    pub fn carries_translation(&self) -> bool {
        self.anatomical_type == Some(ANATOMICAL_SIX_DOF)
    }
}

/// Integral numbers in either JSON form. Anything else reads as absent.
#[allow(clippy::cast_possible_truncation)]
fn deserialize_anatomical_type<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.abs() <= i64::MAX as f64)
                .map(|float| float as i64)
        }),
        _ => None,
    })
}

/// Hierarchy handshake: the peer's joint names in hierarchy order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hierarchy {
    #[serde(rename = "Joints")]
    pub joints: Vec<String>,
}

/// Peer-assigned joint identifiers, as a list of `{name: uuid}` maps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JointsUuids {
    #[serde(rename = "Joints")]
    pub joints: Vec<Map<String, Value>>,
}

impl JointsUuids {
    /// Iterates `(name, uuid)` pairs. Numeric ids are stringified; any other
    /// value is skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.joints.iter().flat_map(|entry| {
            entry.iter().filter_map(|(name, uuid)| {
                let uuid = match uuid {
                    Value::String(uuid) => uuid.clone(),
                    Value::Number(uuid) => uuid.to_string(),
                    _ => return None,
                };
                Some((name.as_str(), uuid))
            })
        })
    }
}

/// Pose stream: one sample per joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointsStream {
    #[serde(rename = "Joints")]
    pub joints: Vec<JointSample>,
}

/// Packets the peer sends to this side.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPacket {
    Hierarchy(Hierarchy),
    JointsUuids(JointsUuids),
    JointsStream(JointsStream),
}

impl InboundPacket {
    /// Decodes a frame by its declared `Type`.
    pub fn decode(frame: Frame, limits: &Limits) -> WireResult<Self> {
        let packet_type = frame
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(DecodeError::MissingType)?;
        let packet = match packet_type.as_str() {
            "Hierarchy" => Self::Hierarchy(decode_body("Hierarchy", frame)?),
            "JointsUuids" => Self::JointsUuids(decode_body("JointsUuids", frame)?),
            "JointsStream" => Self::JointsStream(decode_body("JointsStream", frame)?),
            other => {
                return Err(DecodeError::UnknownType {
                    found: other.to_string(),
                })
            }
        };

        let joints = packet.joint_count();
        if joints > limits.max_joints_per_packet {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::JointsPerPacket,
                limit: limits.max_joints_per_packet,
                actual: joints,
            });
        }
        Ok(packet)
    }

    #[must_use]
    pub const fn packet_type(&self) -> &'static str {
        match self {
            Self::Hierarchy(_) => "Hierarchy",
            Self::JointsUuids(_) => "JointsUuids",
            Self::JointsStream(_) => "JointsStream",
        }
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        match self {
            Self::Hierarchy(hierarchy) => hierarchy.joints.len(),
            Self::JointsUuids(uuids) => uuids.joints.len(),
            Self::JointsStream(stream) => stream.joints.len(),
        }
    }
}

fn decode_body<T: for<'de> Deserialize<'de>>(
    packet_type: &'static str,
    frame: Frame,
) -> WireResult<T> {
    serde_json::from_value(Value::Object(frame)).map_err(|err| DecodeError::InvalidPacket {
        packet_type,
        reason: err.to_string(),
    })
}

/// Peer-side orientation handling requested by `setOrientationMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrientationMode {
    /// Use the streamed rotations as they are.
    UseAsIs,
    /// Treat the initial pose as the zero rotation.
    DiscardInitialRotation,
}

/// Peer-side joint space requested by `setJointSpace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JointSpace {
    /// Parent-relative, in parent axes.
    Parent,
    /// Parent-relative, expressed in world axes.
    ParentWorldAxes,
}

/// Command addressed to a peer-side object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub object: String,
    pub command: String,
    pub parameters: Value,
}

impl Command {
    #[must_use]
    pub fn set_orientation_mode(mode: OrientationMode) -> Self {
        Self::scene("setOrientationMode", serde_json::json!({ "mode": mode }))
    }

    #[must_use]
    pub fn set_joint_space(space: JointSpace) -> Self {
        Self::scene("setJointSpace", serde_json::json!({ "space": space }))
    }

    fn scene(command: &str, parameters: Value) -> Self {
        Self {
            object: "scene".to_string(),
            command: command.to_string(),
            parameters,
        }
    }
}

/// Packets this side sends to the peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum OutboundPacket {
    HierarchyInitializedAck,
    JointsUuidsAck,
    JointsStreamAck,
    JointsStream {
        #[serde(rename = "Joints")]
        joints: Vec<JointSample>,
    },
    MosketchCommand(Command),
}

impl OutboundPacket {
    #[must_use]
    pub const fn packet_type(&self) -> &'static str {
        match self {
            Self::HierarchyInitializedAck => "HierarchyInitializedAck",
            Self::JointsUuidsAck => "JointsUuidsAck",
            Self::JointsStreamAck => "JointsStreamAck",
            Self::JointsStream { .. } => "JointsStream",
            Self::MosketchCommand(_) => "MosketchCommand",
        }
    }

    /// Pose updates are latest-wins; everything else is queued.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        match self {
            Self::JointsStream { .. } => Framing::Latest,
            _ => Framing::Queued,
        }
    }
}

/// Encodes an outbound packet as one delimited frame.
pub fn encode_packet(packet: &OutboundPacket) -> Result<Vec<u8>, EncodeError> {
    encode_frame(packet, packet.framing(), packet.packet_type())
}
