//! Connection state machine for the peer link.
//!
//! The session never touches a socket. The driver calls [`Session::connect`],
//! forwards transport notifications and received bytes, then drains
//! [`Session::poll_transmit`] into the socket and [`Session::poll_event`] into
//! whatever shows status. A transition to [`ConnectionState::Disconnected`]
//! tells the driver to close its socket.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;

use log::{debug, error, info, warn};
use wire::{
    encode_packet, Command, DecodeError, Frame, FrameBuffer, Framing, Hierarchy, InboundPacket,
    JointSample, JointSpace, JointsStream, JointsUuids, OrientationMode, OutboundPacket,
};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::mapping::{map_controllers, map_joints, MappingTable, MappingWarning};
use crate::scene::{ControlRigScene, Scene};
use crate::types::{ConnectionState, PoseSample, StreamingMode};

/// Severity of a user-facing status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportLevel {
    Success,
    Warning,
    Error,
}

/// Status message for the GUI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
}

impl Report {
    #[must_use]
    pub fn new(level: ReportLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.level {
            ReportLevel::Success => "SUCCESS",
            ReportLevel::Warning => "WARNING",
            ReportLevel::Error => "ERROR",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}

/// Notifications drained with [`Session::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    Report(Report),
}

/// One encoded frame waiting for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    pub framing: Framing,
    pub packet_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Peer-assigned joint identifiers, append-only for the life of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UuidTable {
    ids: HashMap<String, String>,
}

impl UuidTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `uuid` for `name`.
    ///
    /// Returns `false` if the name already holds a different id, which is kept.
    pub fn record(&mut self, name: &str, uuid: String) -> bool {
        match self.ids.get(name) {
            Some(existing) => *existing == uuid,
            None => {
                self.ids.insert(name.to_string(), uuid);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// Protocol state machine for a single peer connection.
#[derive(Debug)]
pub struct Session<N> {
    config: SessionConfig,
    state: ConnectionState,
    peer: Option<SocketAddr>,
    mode: StreamingMode,
    buffer: FrameBuffer,
    joints: MappingTable<N>,
    controllers: MappingTable<N>,
    hierarchy: Vec<String>,
    uuids: UuidTable,
    outbox: VecDeque<Transmit>,
    events: VecDeque<SessionEvent>,
}

impl<N: Copy> Default for Session<N> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<N: Copy> Session<N> {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            mode: config.mode,
            buffer: FrameBuffer::new(config.limits.clone()),
            config,
            state: ConnectionState::Disconnected,
            peer: None,
            joints: MappingTable::new(),
            controllers: MappingTable::new(),
            hierarchy: Vec::new(),
            uuids: UuidTable::new(),
            outbox: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    #[must_use]
    pub const fn mode(&self) -> StreamingMode {
        self.mode
    }

    /// Direct joints table. The update path always reads this one.
    #[must_use]
    pub const fn joints_table(&self) -> &MappingTable<N> {
        &self.joints
    }

    #[must_use]
    pub const fn controllers_table(&self) -> &MappingTable<N> {
        &self.controllers
    }

    /// Table that receives streamed poses in the current mode.
    #[must_use]
    pub const fn active_table(&self) -> &MappingTable<N> {
        match self.mode {
            StreamingMode::Joints => &self.joints,
            StreamingMode::Controllers => &self.controllers,
        }
    }

    #[must_use]
    pub const fn uuids(&self) -> &UuidTable {
        &self.uuids
    }

    /// Bytes held by the reassembly buffer.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Starts opening a connection and returns the address to dial.
    ///
    /// A malformed address or an already open connection leaves the state
    /// untouched.
    pub fn connect(&mut self, address: &str) -> SessionResult<SocketAddr> {
        let peer = match self.config.resolve_address(address) {
            Ok(peer) => peer,
            Err(err) => return Err(self.fail(err)),
        };
        if self.state != ConnectionState::Disconnected {
            let err = SessionError::AlreadyOpen {
                peer: self
                    .peer
                    .map_or_else(|| address.to_string(), |open| open.to_string()),
                state: self.state,
            };
            return Err(self.fail(err));
        }

        self.reset();
        self.peer = Some(peer);
        self.transition(ConnectionState::Connecting);
        Ok(peer)
    }

    /// Transport finished opening.
    pub fn on_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("ignoring connect notification while {}", self.state);
            return;
        }
        self.transition(ConnectionState::Connected);
        let peer = self.peer_label();
        self.report(ReportLevel::Success, format!("connected to {peer}"));
    }

    /// Transport failed; the session is torn down.
    pub fn on_transport_error(&mut self, message: &str) {
        self.report(ReportLevel::Error, format!("connection error: {message}"));
        self.close();
    }

    /// Peer closed the connection.
    pub fn on_disconnected(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        let peer = self.peer_label();
        self.report(
            ReportLevel::Success,
            format!("connection to {peer} closed by peer"),
        );
        self.close();
    }

    /// Closes the connection locally. Safe to call in any state.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.report(ReportLevel::Error, SessionError::AlreadyClosed.to_string());
            return;
        }
        let peer = self.peer_label();
        self.report(ReportLevel::Success, format!("disconnected from {peer}"));
        self.close();
    }

    /// Chooses the authoritative table.
    ///
    /// While connected with a hierarchy in place, the tables are rebuilt
    /// against `scene` and the peer is sent the conventions of the new mode.
    pub fn set_streaming_mode<S>(&mut self, mode: StreamingMode, scene: &S)
    where
        S: ControlRigScene<Node = N> + ?Sized,
    {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        info!("streaming mode set to {mode}");
        if self.state != ConnectionState::Connected || self.hierarchy.is_empty() {
            return;
        }

        let names = std::mem::take(&mut self.hierarchy);
        let mapped = self.build_tables(&names, scene);
        let requested = names.len();
        self.hierarchy = names;
        if mapped == 0 {
            self.report(
                ReportLevel::Warning,
                format!("no joints mapped in {mode} mode, a new hierarchy handshake is required"),
            );
            return;
        }
        self.report(
            ReportLevel::Success,
            format!("mapped {mapped} joints out of {requested}"),
        );
        self.send_mode_commands();
    }

    /// Feeds received bytes and handles every complete packet.
    pub fn handle_data<S>(&mut self, bytes: &[u8], scene: &mut S)
    where
        S: ControlRigScene<Node = N> + ?Sized,
    {
        if self.state != ConnectionState::Connected {
            debug!("dropping {} bytes received while {}", bytes.len(), self.state);
            return;
        }

        let outcome = self.buffer.feed(bytes);
        for err in outcome.errors {
            self.report(ReportLevel::Error, err.to_string());
        }
        for frame in outcome.frames {
            if self.state != ConnectionState::Connected {
                break;
            }
            self.dispatch(frame, scene);
        }
    }

    fn dispatch<S>(&mut self, frame: Frame, scene: &mut S)
    where
        S: ControlRigScene<Node = N> + ?Sized,
    {
        let packet = match InboundPacket::decode(frame, &self.config.limits) {
            Ok(packet) => packet,
            Err(DecodeError::UnknownType { found }) => {
                self.report(ReportLevel::Error, format!("unknown packet type: {found}"));
                return;
            }
            Err(err) => {
                self.report(ReportLevel::Error, err.to_string());
                return;
            }
        };
        debug!(
            "received {} packet with {} joints",
            packet.packet_type(),
            packet.joint_count()
        );

        match packet {
            InboundPacket::Hierarchy(hierarchy) => self.handle_hierarchy(&hierarchy, scene),
            InboundPacket::JointsUuids(uuids) => self.handle_uuids(&uuids),
            InboundPacket::JointsStream(stream) => self.apply_stream(&stream, scene),
        }
    }

    fn handle_hierarchy<S>(&mut self, hierarchy: &Hierarchy, scene: &S)
    where
        S: ControlRigScene<Node = N> + ?Sized,
    {
        self.hierarchy.clone_from(&hierarchy.joints);
        let mapped = self.build_tables(&hierarchy.joints, scene);
        let requested = hierarchy.joints.len();
        if mapped == 0 {
            let err = SessionError::MappingFailed {
                requested,
                mode: self.mode,
            };
            self.report(ReportLevel::Error, err.to_string());
            self.close();
            return;
        }
        self.report(
            ReportLevel::Success,
            format!("mapped {mapped} joints out of {requested}"),
        );
        self.send_mode_commands();
        self.send(OutboundPacket::HierarchyInitializedAck);
    }

    /// Rebuilds the joints table, plus the controller table in controllers
    /// mode. Returns the size of the authoritative table.
    fn build_tables<S>(&mut self, names: &[String], scene: &S) -> usize
    where
        S: ControlRigScene<Node = N> + ?Sized,
    {
        let direct = map_joints(names, scene);
        self.report_warnings(&direct.warnings);
        debug!(
            "matched {} of {} joint-like scene nodes",
            direct.table.len(),
            direct.candidates
        );
        self.joints = direct.table;

        self.controllers = if self.mode == StreamingMode::Controllers {
            let retarget = map_controllers(names, scene);
            self.report_warnings(&retarget.warnings);
            retarget.table
        } else {
            MappingTable::new()
        };
        self.active_table().len()
    }

    fn send_mode_commands(&mut self) {
        let (orientation, space) = match self.mode {
            StreamingMode::Joints => (OrientationMode::UseAsIs, JointSpace::Parent),
            StreamingMode::Controllers => (
                OrientationMode::DiscardInitialRotation,
                JointSpace::ParentWorldAxes,
            ),
        };
        self.send(OutboundPacket::MosketchCommand(Command::set_orientation_mode(
            orientation,
        )));
        self.send(OutboundPacket::MosketchCommand(Command::set_joint_space(space)));
    }

    fn handle_uuids(&mut self, uuids: &JointsUuids) {
        let mut recorded = 0usize;
        for (name, uuid) in uuids.pairs() {
            if self.uuids.record(name, uuid) {
                recorded += 1;
            } else {
                self.report(
                    ReportLevel::Warning,
                    format!("joint {name:?} already has a different uuid, keeping the first"),
                );
            }
        }
        if recorded > 0 {
            self.send(OutboundPacket::JointsUuidsAck);
        } else {
            debug!("no uuid recorded, not acknowledging");
        }
    }

    /// Writes every mapped sample of `stream` to the scene and acknowledges.
    fn apply_stream<S>(&mut self, stream: &JointsStream, scene: &mut S)
    where
        S: Scene<Node = N> + ?Sized,
    {
        let table = match self.mode {
            StreamingMode::Joints => &self.joints,
            StreamingMode::Controllers => &self.controllers,
        };
        for sample in &stream.joints {
            let pose = PoseSample::from(sample);
            let Some(binding) = table.get(&pose.joint_name) else {
                debug!("skipping unmapped joint {:?}", pose.joint_name);
                continue;
            };
            let (rotation, translation) = binding.to_scene_space(
                pose.rotation,
                pose.translation,
                pose.carries_translation(),
            );
            scene.set_local_rotation(binding.node(), rotation);
            if let Some(translation) = translation {
                scene.set_local_translation(binding.node(), translation);
            }
        }
        self.send(OutboundPacket::JointsStreamAck);
    }

    /// Sends the current scene pose of every directly mapped joint.
    ///
    /// Returns the number of joints queued.
    pub fn update_peer<S>(&mut self, scene: &S) -> SessionResult<usize>
    where
        S: Scene<Node = N> + ?Sized,
    {
        if self.state != ConnectionState::Connected {
            return Err(self.fail(SessionError::NotConnected));
        }

        let joints: Vec<JointSample> = self
            .joints
            .iter()
            .map(|binding| {
                let node = binding.node();
                let (rotation, translation) =
                    binding.to_peer_space(scene.local_rotation(node), scene.local_translation(node));
                PoseSample {
                    joint_name: binding.name().to_string(),
                    rotation,
                    translation,
                    anatomical_type: None,
                }
                .to_wire()
            })
            .collect();
        let count = joints.len();
        self.queue(OutboundPacket::JointsStream { joints })?;
        Ok(count)
    }

    /// Next frame for the transport, in send order.
    pub fn poll_transmit(&mut self) -> Option<Transmit> {
        self.outbox.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<SessionEvent> {
        self.events.pop_front()
    }

    fn queue(&mut self, packet: OutboundPacket) -> SessionResult<()> {
        let bytes = encode_packet(&packet)?;
        let framing = packet.framing();
        if framing == Framing::Latest {
            self.outbox
                .retain(|pending| pending.framing != Framing::Latest);
        }
        self.outbox.push_back(Transmit {
            framing,
            packet_type: packet.packet_type(),
            bytes,
        });
        Ok(())
    }

    fn send(&mut self, packet: OutboundPacket) {
        if let Err(err) = self.queue(packet) {
            self.report(ReportLevel::Error, err.to_string());
        }
    }

    fn close(&mut self) {
        self.reset();
        self.transition(ConnectionState::Disconnected);
    }

    fn reset(&mut self) {
        self.peer = None;
        self.buffer.clear();
        self.joints = MappingTable::new();
        self.controllers = MappingTable::new();
        self.hierarchy.clear();
        self.uuids.clear();
        self.outbox.clear();
    }

    fn transition(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("connection {} -> {}", self.state, state);
        self.state = state;
        self.events.push_back(SessionEvent::StateChanged(state));
    }

    fn report(&mut self, level: ReportLevel, message: String) {
        match level {
            ReportLevel::Success => info!("{message}"),
            ReportLevel::Warning => warn!("{message}"),
            ReportLevel::Error => error!("{message}"),
        }
        self.events
            .push_back(SessionEvent::Report(Report::new(level, message)));
    }

    fn report_warnings(&mut self, warnings: &[MappingWarning]) {
        for warning in warnings {
            self.report(ReportLevel::Warning, warning.to_string());
        }
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.report(ReportLevel::Error, err.to_string());
        err
    }

    fn peer_label(&self) -> String {
        self.peer
            .map_or_else(|| "peer".to_string(), |peer| peer.to_string())
    }
}
