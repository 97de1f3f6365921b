use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::DQuat;
use retarget::{EulerAngles, MemoryScene, NodeId, Session, SessionConfig};
use serde_json::json;

fn skeleton(joints: usize) -> (MemoryScene, Vec<String>) {
    let mut scene = MemoryScene::new();
    let names: Vec<String> = (0..joints).map(|index| format!("joint_{index}")).collect();
    for (index, name) in names.iter().enumerate() {
        let node = scene.add_joint(name, DQuat::from_rotation_x(0.01 * index as f64));
        scene.set_rotate_axis(node, EulerAngles::new(0.0, 0.02 * index as f64, 0.0));
    }
    (scene, names)
}

fn frame(value: &serde_json::Value) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(value).unwrap_or_default();
    bytes.push(b'\n');
    bytes
}

fn connected(scene: &mut MemoryScene, names: &[String]) -> Session<NodeId> {
    let mut session = Session::new(SessionConfig::default());
    session.connect("127.0.0.1").unwrap();
    session.on_connected();
    session.handle_data(&frame(&json!({"Type": "Hierarchy", "Joints": names})), scene);
    while session.poll_transmit().is_some() {}
    while session.poll_event().is_some() {}
    session
}

fn bench_apply_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_stream");
    for joints in [32usize, 128, 512] {
        let (mut scene, names) = skeleton(joints);
        let mut session = connected(&mut scene, &names);
        let samples: Vec<_> = names
            .iter()
            .map(|name| json!({"Name": name, "R": [0.0, 0.0, 0.1, 0.995], "T": [0.0, 0.0, 0.0], "Anatom": 7}))
            .collect();
        let bytes = frame(&json!({"Type": "JointsStream", "Joints": samples}));

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(joints), &bytes, |b, bytes| {
            b.iter(|| {
                session.handle_data(black_box(bytes), &mut scene);
                while session.poll_transmit().is_some() {}
            });
        });
    }
    group.finish();
}

fn bench_update_peer(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_peer");
    for joints in [32usize, 128, 512] {
        let (mut scene, names) = skeleton(joints);
        let mut session = connected(&mut scene, &names);
        group.bench_function(BenchmarkId::from_parameter(joints), |b| {
            b.iter(|| {
                let sent = session.update_peer(black_box(&scene)).unwrap_or(0);
                while session.poll_transmit().is_some() {}
                sent
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply_stream, bench_update_peer);
criterion_main!(benches);
