use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use wire::{DecodeError, Frame, FrameBuffer, InboundPacket, Limits};

/// One packet found in a captured byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketSummary {
    pub packet_type: String,
    pub joints: usize,
}

/// Everything found in a captured byte stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub bytes: usize,
    pub packets: Vec<PacketSummary>,
    pub errors: Vec<String>,
    /// Bytes of an unfinished frame at the end of the capture.
    pub trailing_bytes: usize,
}

impl InspectReport {
    #[must_use]
    pub fn counts_by_type(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for packet in &self.packets {
            *counts.entry(packet.packet_type.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Runs `bytes` through the reassembly buffer and summarizes each frame.
///
/// Frames of a type this side never receives (acks, commands, outbound
/// streams) are listed by their declared type.
#[must_use]
pub fn inspect_stream(bytes: &[u8], limits: &Limits) -> InspectReport {
    let mut buffer = FrameBuffer::new(limits.clone());
    let outcome = buffer.feed(bytes);

    let mut report = InspectReport {
        bytes: bytes.len(),
        trailing_bytes: buffer.len(),
        ..InspectReport::default()
    };
    report
        .errors
        .extend(outcome.errors.iter().map(ToString::to_string));
    for frame in outcome.frames {
        let joints = joints_in(&frame);
        match InboundPacket::decode(frame, limits) {
            Ok(packet) => report.packets.push(PacketSummary {
                packet_type: packet.packet_type().to_string(),
                joints: packet.joint_count(),
            }),
            Err(DecodeError::UnknownType { found }) => report.packets.push(PacketSummary {
                packet_type: found,
                joints,
            }),
            Err(err) => report.errors.push(err.to_string()),
        }
    }
    report
}

fn joints_in(frame: &Frame) -> usize {
    frame
        .get("Joints")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len)
}

/// Human-readable rendering of a report.
#[must_use]
pub fn format_report_pretty(report: &InspectReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} bytes, {} packets, {} errors",
        report.bytes,
        report.packets.len(),
        report.errors.len()
    );
    for (packet_type, count) in report.counts_by_type() {
        let _ = writeln!(out, "  {packet_type}: {count}");
    }
    for error in &report.errors {
        let _ = writeln!(out, "  error: {error}");
    }
    if report.trailing_bytes > 0 {
        let _ = writeln!(
            out,
            "  trailing: {} bytes of an unfinished frame",
            report.trailing_bytes
        );
    }
    out
}
