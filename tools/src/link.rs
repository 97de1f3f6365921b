use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use retarget::{ConnectionState, ControlRigScene, Report, Session, SessionEvent};

/// Knobs for [`drive`].
#[derive(Debug, Clone, Default)]
pub struct DriveOptions {
    /// Push the scene pose to the peer after every hierarchy handshake.
    pub update_on_connect: bool,
    /// Close the session locally once this instant passes.
    pub deadline: Option<Instant>,
}

/// What happened during one driven session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub bytes_received: usize,
    pub bytes_sent: usize,
    pub frames_sent: usize,
    pub reports: Vec<Report>,
}

const READ_CHUNK: usize = 64 * 1024;

/// Blocking read timeout, so deadlines are checked while the peer is idle.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Dials the session's peer over TCP and drives it until it closes.
pub fn run_tcp<S>(
    address: &str,
    session: &mut Session<S::Node>,
    scene: &mut S,
    options: &DriveOptions,
    capture: Option<&mut dyn Write>,
) -> Result<LinkSummary>
where
    S: ControlRigScene,
{
    let peer = session.connect(address)?;
    info!("dialing {peer}");
    let mut stream = match TcpStream::connect_timeout(&peer, Duration::from_secs(5)) {
        Ok(stream) => stream,
        Err(err) => {
            session.on_transport_error(&err.to_string());
            collect_reports(session, LinkSummary::default());
            bail!("connect to {peer}: {err}");
        }
    };
    stream
        .set_read_timeout(Some(POLL_INTERVAL))
        .context("set socket read timeout")?;
    stream.set_nodelay(true).context("set TCP_NODELAY")?;
    session.on_connected();

    drive(&mut stream, session, scene, options, capture)
}

/// Pumps bytes between `transport` and a connected `session` until the
/// session leaves [`ConnectionState::Connected`].
pub fn drive<T, S>(
    transport: &mut T,
    session: &mut Session<S::Node>,
    scene: &mut S,
    options: &DriveOptions,
    mut capture: Option<&mut dyn Write>,
) -> Result<LinkSummary>
where
    T: Read + Write,
    S: ControlRigScene,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut summary = collect_reports(session, LinkSummary::default());

    while session.state() == ConnectionState::Connected {
        if options.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("run time elapsed, closing");
            session.disconnect();
            break;
        }

        match transport.read(&mut buf) {
            Ok(0) => session.on_disconnected(),
            Ok(read) => {
                summary.bytes_received += read;
                if let Some(capture) = capture.as_mut() {
                    capture
                        .write_all(&buf[..read])
                        .context("write capture")?;
                }
                session.handle_data(&buf[..read], scene);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(err) => session.on_transport_error(&err.to_string()),
        }

        flush(transport, session, scene, options, &mut summary);
        summary = collect_reports(session, summary);
    }

    summary = collect_reports(session, summary);
    if let Some(capture) = capture.as_mut() {
        capture.flush().context("flush capture")?;
    }
    Ok(summary)
}

fn flush<T, S>(
    transport: &mut T,
    session: &mut Session<S::Node>,
    scene: &S,
    options: &DriveOptions,
    summary: &mut LinkSummary,
) where
    T: Write,
    S: ControlRigScene,
{
    while let Some(transmit) = session.poll_transmit() {
        if let Err(err) = transport.write_all(&transmit.bytes) {
            session.on_transport_error(&err.to_string());
            return;
        }
        debug!("sent {} ({} bytes)", transmit.packet_type, transmit.bytes.len());
        summary.bytes_sent += transmit.bytes.len();
        summary.frames_sent += 1;

        if options.update_on_connect && transmit.packet_type == "HierarchyInitializedAck" {
            match session.update_peer(scene) {
                Ok(count) => debug!("queued scene pose for {count} joints"),
                Err(err) => debug!("scene pose not sent: {err}"),
            }
        }
    }
    if let Err(err) = transport.flush() {
        session.on_transport_error(&err.to_string());
    }
}

fn collect_reports<N: Copy>(session: &mut Session<N>, mut summary: LinkSummary) -> LinkSummary {
    let mut fresh = Vec::new();
    while let Some(event) = session.poll_event() {
        match event {
            SessionEvent::Report(report) => fresh.push(report),
            SessionEvent::StateChanged(state) => debug!("state changed: {state}"),
        }
    }
    print_reports(&fresh);
    summary.reports.extend(fresh);
    summary
}

fn print_reports(reports: &[Report]) {
    for report in reports {
        println!("{report}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;
    use retarget::{MemoryScene, ReportLevel, SessionConfig};
    use std::collections::VecDeque;

    /// Scripted peer: hands out queued reads, then end of stream.
    #[derive(Default)]
    struct ScriptedPeer {
        reads: VecDeque<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for ScriptedPeer {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(chunk) = self.reads.pop_front() else {
                return Ok(0);
            };
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    impl Write for ScriptedPeer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn connected_session() -> Session<retarget::NodeId> {
        let mut session = Session::new(SessionConfig::default());
        session.connect("127.0.0.1").unwrap();
        session.on_connected();
        session
    }

    #[test]
    fn drives_handshake_until_peer_closes() {
        let mut scene = MemoryScene::new();
        scene.add_joint("hips", DQuat::IDENTITY);
        let mut peer = ScriptedPeer::default();
        peer.reads
            .push_back(b"{\"Type\":\"Hierarchy\",\"Joi".to_vec());
        peer.reads.push_back(b"nts\":[\"hips\"]}\n".to_vec());

        let mut session = connected_session();
        let mut capture = Vec::new();
        let summary = drive(
            &mut peer,
            &mut session,
            &mut scene,
            &DriveOptions::default(),
            Some(&mut capture),
        )
        .unwrap();

        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(summary.frames_sent, 3);
        assert_eq!(capture.len(), summary.bytes_received);
        let written = String::from_utf8(peer.written).unwrap();
        assert!(written.ends_with("[{\"Type\":\"HierarchyInitializedAck\"}]\n"));
        assert!(summary
            .reports
            .iter()
            .any(|report| report.message.contains("closed by peer")));
    }

    #[test]
    fn update_on_connect_follows_ack() {
        let mut scene = MemoryScene::new();
        scene.add_joint("hips", DQuat::IDENTITY);
        let mut peer = ScriptedPeer::default();
        peer.reads
            .push_back(b"{\"Type\":\"Hierarchy\",\"Joints\":[\"hips\"]}\n".to_vec());

        let mut session = connected_session();
        let options = DriveOptions {
            update_on_connect: true,
            ..DriveOptions::default()
        };
        let summary = drive(&mut peer, &mut session, &mut scene, &options, None).unwrap();

        assert_eq!(summary.frames_sent, 4);
        let written = String::from_utf8(peer.written).unwrap();
        let last = written.lines().last().unwrap();
        assert!(last.starts_with("{\"Type\":\"JointsStream\""));
    }

    #[test]
    fn deadline_closes_locally() {
        let mut scene = MemoryScene::new();
        let mut peer = ScriptedPeer::default();
        let mut session = connected_session();
        let options = DriveOptions {
            deadline: Some(Instant::now()),
            ..DriveOptions::default()
        };
        let summary = drive(&mut peer, &mut session, &mut scene, &options, None).unwrap();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(summary
            .reports
            .iter()
            .any(|report| report.level == ReportLevel::Success
                && report.message.starts_with("disconnected")));
    }

    #[test]
    fn mapping_failure_ends_drive() {
        let mut scene = MemoryScene::new();
        let mut peer = ScriptedPeer::default();
        peer.reads
            .push_back(b"{\"Type\":\"Hierarchy\",\"Joints\":[\"hips\"]}\n".to_vec());
        peer.reads
            .push_back(b"{\"Type\":\"JointsStream\",\"Joints\":[]}\n".to_vec());

        let mut session = connected_session();
        let summary =
            drive(&mut peer, &mut session, &mut scene, &DriveOptions::default(), None).unwrap();
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(peer.reads.len(), 1);
    }
}
